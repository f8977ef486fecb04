//! Backend Arduino (Uno/Mega/Nano).
//!
//! Este archivo también aloja las bajadas compartidas por la familia
//! Arduino de C++ embebido: el backend ESP32 delega aquí todo lo que no
//! difiere entre ambas placas (≈70% de la lógica).

use super::{Backend, Gen, Style};
use crate::ast::{Expr, FunctionDef, Program};
use std::fmt::{self, Write};

pub(crate) struct Arduino;

impl Backend for Arduino {
    const STYLE: Style = Style::CLike;
    const INDENT: &'static str = "  ";

    fn program(gen: &mut Gen<Self>, program: &Program) -> fmt::Result {
        emit!(gen, "#include <Wire.h>\n\n")?;

        gen.hoisted_functions(program)?;

        emit!(gen, "void setup() {{\n")?;
        gen.with_indent(|gen| {
            emit_line!(gen, "Serial.begin(9600);")?;
            emit_line!(gen, "Serial.setTimeout(100);")?;
            emit_line!(gen, "for (int i = 2; i <= 13; i++) pinMode(i, OUTPUT);")
        })?;
        emit!(gen, "}}\n\n")?;

        emit!(gen, "void loop() {{\n")?;
        gen.with_indent(|gen| gen.top_level(program))?;
        emit!(gen, "}}\n")
    }

    fn bool_lit(gen: &mut Gen<Self>, value: bool) -> fmt::Result {
        bool_lit(gen, value)
    }

    fn call(gen: &mut Gen<Self>, name: &str, args: &[Expr]) -> fmt::Result {
        call(gen, name, args)
    }

    fn analog_read(gen: &mut Gen<Self>, pin: &Expr) -> fmt::Result {
        analog_read(gen, pin)
    }

    fn gpio_read(gen: &mut Gen<Self>, pin: &Expr) -> fmt::Result {
        gpio_read(gen, pin)
    }

    fn pulse_read(gen: &mut Gen<Self>, pin: &Expr) -> fmt::Result {
        pulse_read(gen, pin)
    }

    fn i2c_read(gen: &mut Gen<Self>, address: &Expr) -> fmt::Result {
        i2c_read(gen, address)
    }

    fn var_decl(gen: &mut Gen<Self>, name: &str, init: Option<&Expr>) -> fmt::Result {
        var_decl(gen, name, init)
    }

    fn array_decl(gen: &mut Gen<Self>, name: &str, size: i32) -> fmt::Result {
        array_decl(gen, name, size)
    }

    fn gpio_write(gen: &mut Gen<Self>, pin: &Expr, value: &Expr) -> fmt::Result {
        gpio_write(gen, pin, value)
    }

    fn analog_write(gen: &mut Gen<Self>, pin: &Expr, value: &Expr) -> fmt::Result {
        analog_write(gen, pin, value)
    }

    fn servo_write(gen: &mut Gen<Self>, pin: &Expr, angle: &Expr) -> fmt::Result {
        servo_write(gen, pin, angle)
    }

    fn tone(gen: &mut Gen<Self>, pin: &Expr, frequency: &Expr) -> fmt::Result {
        tone(gen, pin, frequency)
    }

    fn no_tone(gen: &mut Gen<Self>, pin: &Expr) -> fmt::Result {
        no_tone(gen, pin)
    }

    fn i2c_begin(gen: &mut Gen<Self>) -> fmt::Result {
        i2c_begin(gen)
    }

    fn i2c_start(gen: &mut Gen<Self>, address: &Expr) -> fmt::Result {
        i2c_start(gen, address)
    }

    fn i2c_send(gen: &mut Gen<Self>, data: &Expr) -> fmt::Result {
        i2c_send(gen, data)
    }

    fn i2c_stop(gen: &mut Gen<Self>) -> fmt::Result {
        i2c_stop(gen)
    }

    fn wait(gen: &mut Gen<Self>, duration: &Expr) -> fmt::Result {
        wait(gen, duration)
    }

    fn print(gen: &mut Gen<Self>, value: &Expr) -> fmt::Result {
        print(gen, value)
    }

    fn function_def(gen: &mut Gen<Self>, def: &FunctionDef) -> fmt::Result {
        function_def(gen, def)
    }
}

// ── Bajadas compartidas de la familia Arduino ─────────────────────────

pub(super) fn bool_lit<B: Backend>(gen: &mut Gen<B>, value: bool) -> fmt::Result {
    emit!(gen, "{}", if value { 1 } else { 0 })
}

pub(super) fn call<B: Backend>(gen: &mut Gen<B>, name: &str, args: &[Expr]) -> fmt::Result {
    match (name, args.len()) {
        ("map", 5) => gen.affine_map(args, "(int)((", "/"),
        ("constrain", 3) => gen.clamp(args, "max", "min"),
        _ => gen.plain_call(name, args),
    }
}

pub(super) fn analog_read<B: Backend>(gen: &mut Gen<B>, pin: &Expr) -> fmt::Result {
    emit!(gen, "analogRead(A")?;
    gen.expr(pin)?;
    emit!(gen, ")")
}

pub(super) fn gpio_read<B: Backend>(gen: &mut Gen<B>, pin: &Expr) -> fmt::Result {
    emit!(gen, "digitalRead(")?;
    gen.expr(pin)?;
    emit!(gen, ")")
}

pub(super) fn pulse_read<B: Backend>(gen: &mut Gen<B>, pin: &Expr) -> fmt::Result {
    emit!(gen, "pulseIn(")?;
    gen.expr(pin)?;
    emit!(gen, ", HIGH)")
}

pub(super) fn i2c_read<B: Backend>(gen: &mut Gen<B>, address: &Expr) -> fmt::Result {
    emit!(gen, "(Wire.requestFrom(")?;
    gen.expr(address)?;
    emit!(gen, ", 1), Wire.read())")
}

pub(super) fn var_decl<B: Backend>(gen: &mut Gen<B>, name: &str, init: Option<&Expr>) -> fmt::Result {
    gen.write_indent()?;
    emit!(gen, "float {}", name)?;
    if let Some(init) = init {
        emit!(gen, " = ")?;
        gen.expr(init)?;
    }

    emit!(gen, ";\n")
}

pub(super) fn array_decl<B: Backend>(gen: &mut Gen<B>, name: &str, size: i32) -> fmt::Result {
    emit_line!(gen, "float {}[{}];", name, size)
}

pub(super) fn gpio_write<B: Backend>(gen: &mut Gen<B>, pin: &Expr, value: &Expr) -> fmt::Result {
    gen.write_indent()?;
    emit!(gen, "digitalWrite(")?;
    gen.expr(pin)?;
    emit!(gen, ", ")?;
    gen.expr(value)?;
    emit!(gen, ");\n")
}

pub(super) fn analog_write<B: Backend>(gen: &mut Gen<B>, pin: &Expr, value: &Expr) -> fmt::Result {
    gen.write_indent()?;
    emit!(gen, "analogWrite(")?;
    gen.expr(pin)?;
    emit!(gen, ", ")?;
    gen.expr(value)?;
    emit!(gen, ");\n")
}

/// El ángulo esperado (0-180) se reescala al duty de 8 bits del PWM.
pub(super) fn servo_write<B: Backend>(gen: &mut Gen<B>, pin: &Expr, angle: &Expr) -> fmt::Result {
    gen.write_indent()?;
    emit!(gen, "analogWrite(")?;
    gen.expr(pin)?;
    emit!(gen, ", (")?;
    gen.expr(angle)?;
    emit!(gen, " * 255 / 180));\n")
}

pub(super) fn tone<B: Backend>(gen: &mut Gen<B>, pin: &Expr, frequency: &Expr) -> fmt::Result {
    gen.write_indent()?;
    emit!(gen, "tone(")?;
    gen.expr(pin)?;
    emit!(gen, ", ")?;
    gen.expr(frequency)?;
    emit!(gen, ");\n")
}

pub(super) fn no_tone<B: Backend>(gen: &mut Gen<B>, pin: &Expr) -> fmt::Result {
    gen.write_indent()?;
    emit!(gen, "noTone(")?;
    gen.expr(pin)?;
    emit!(gen, ");\n")
}

pub(super) fn i2c_begin<B: Backend>(gen: &mut Gen<B>) -> fmt::Result {
    emit_line!(gen, "Wire.begin();")
}

pub(super) fn i2c_start<B: Backend>(gen: &mut Gen<B>, address: &Expr) -> fmt::Result {
    gen.write_indent()?;
    emit!(gen, "Wire.beginTransmission(")?;
    gen.expr(address)?;
    emit!(gen, ");\n")
}

pub(super) fn i2c_send<B: Backend>(gen: &mut Gen<B>, data: &Expr) -> fmt::Result {
    gen.write_indent()?;
    emit!(gen, "Wire.write((byte)(")?;
    gen.expr(data)?;
    emit!(gen, "));\n")
}

pub(super) fn i2c_stop<B: Backend>(gen: &mut Gen<B>) -> fmt::Result {
    emit_line!(gen, "Wire.endTransmission();")
}

pub(super) fn wait<B: Backend>(gen: &mut Gen<B>, duration: &Expr) -> fmt::Result {
    gen.write_indent()?;
    emit!(gen, "delay(")?;
    gen.expr(duration)?;
    emit!(gen, ");\n")
}

pub(super) fn print<B: Backend>(gen: &mut Gen<B>, value: &Expr) -> fmt::Result {
    gen.write_indent()?;
    emit!(gen, "Serial.println(")?;
    gen.expr(value)?;
    emit!(gen, ");\n")
}

/// Funciones de usuario como `void f(float a, …)`; las externas solo se
/// declaran.
pub(super) fn function_def<B: Backend>(gen: &mut Gen<B>, def: &FunctionDef) -> fmt::Result {
    if def.is_extern() {
        emit!(gen, "extern void {}(", def.name)?;
        float_params(gen, &def.params)?;
        return emit!(gen, ");\n\n");
    }

    emit!(gen, "void {}(", def.name)?;
    float_params(gen, &def.params)?;
    emit!(gen, ") {{\n")?;

    if let Some(body) = &def.body {
        gen.with_indent(|gen| gen.stmt(body))?;
    }

    emit!(gen, "}}\n\n")
}

fn float_params<B: Backend>(gen: &mut Gen<B>, params: &[String]) -> fmt::Result {
    for (i, param) in params.iter().enumerate() {
        if i > 0 {
            emit!(gen, ", ")?;
        }

        emit!(gen, "float {}", param)?;
    }

    Ok(())
}
