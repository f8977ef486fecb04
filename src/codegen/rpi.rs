//! Backend Raspberry Pi (Python 3 + RPi.GPIO).
//!
//! Emite un script lineal: funciones primero y el resto del programa
//! envuelto en `try`/`except`/`finally` para garantizar `GPIO.cleanup()`
//! ante una interrupción. Las lecturas analógicas pasan por un ADC
//! MCP3008 conectado por SPI. Este archivo aloja además las bajadas
//! compartidas por la familia Python, que el backend Pico reutiliza.

use super::{Backend, Gen, Style};
use crate::ast::{Expr, FunctionDef, Program};
use std::fmt::{self, Write};

pub(crate) struct Rpi;

impl Backend for Rpi {
    const STYLE: Style = Style::Python;
    const INDENT: &'static str = "    ";
    const COLLAPSE_ELIF: bool = true;

    fn program(gen: &mut Gen<Self>, program: &Program) -> fmt::Result {
        emit!(gen, "#!/usr/bin/env python3\n")?;
        emit!(gen, "# Run with: python3 robot.py\n")?;
        emit!(gen, "# Requirements: pip install RPi.GPIO Adafruit-MCP3008\n\n")?;
        emit!(gen, "import RPi.GPIO as GPIO\n")?;
        emit!(gen, "import time\n")?;
        emit!(gen, "import random\n")?;
        emit!(gen, "import math\n")?;
        emit!(gen, "import busio\n")?;
        emit!(gen, "import digitalio\n")?;
        emit!(gen, "import board\n")?;
        emit!(gen, "import adafruit_mcp3xxx.mcp3008 as MCP\n")?;
        emit!(gen, "from adafruit_mcp3xxx.analog_in import AnalogIn\n\n")?;
        emit!(gen, "# GPIO setup\n")?;
        emit!(gen, "GPIO.setmode(GPIO.BCM)\n")?;
        emit!(gen, "GPIO.setwarnings(False)\n")?;
        emit!(gen, "for _pin in range(2, 28): GPIO.setup(_pin, GPIO.OUT)\n\n")?;
        emit!(gen, "# ADC setup (MCP3008 via SPI)\n")?;
        emit!(gen, "try:\n")?;
        emit!(
            gen,
            "    _spi = busio.SPI(clock=board.SCK, MISO=board.MISO, MOSI=board.MOSI)\n"
        )?;
        emit!(gen, "    _cs = digitalio.DigitalInOut(board.CE0)\n")?;
        emit!(gen, "    mcp = MCP.MCP3008(_spi, _cs)\n")?;
        emit!(gen, "except: mcp = None  # No ADC connected\n\n")?;

        gen.hoisted_functions(program)?;

        emit!(gen, "try:\n")?;
        gen.with_indent(|gen| gen.top_level(program))?;
        emit!(gen, "except KeyboardInterrupt:\n")?;
        emit!(gen, "    print(\"\\nStopped by user\")\n")?;
        emit!(gen, "finally:\n")?;
        emit!(gen, "    GPIO.cleanup()\n")?;
        emit!(gen, "    print(\"GPIO cleaned up\")\n")
    }

    fn bool_lit(gen: &mut Gen<Self>, value: bool) -> fmt::Result {
        bool_lit(gen, value)
    }

    fn call(gen: &mut Gen<Self>, name: &str, args: &[Expr]) -> fmt::Result {
        match (name, args.len()) {
            ("map", 5) => gen.affine_map(args, "int((", "/"),
            ("constrain", 3) => gen.clamp(args, "max", "min"),
            ("random", 2) => {
                emit!(gen, "random.randint(")?;
                gen.arg_list(args)?;
                emit!(gen, ")")
            }

            ("delayMicroseconds", 1) => {
                emit!(gen, "time.sleep(")?;
                gen.expr(&args[0])?;
                emit!(gen, " / 1000000.0)")
            }

            _ => gen.plain_call(name, args),
        }
    }

    fn math_call(
        gen: &mut Gen<Self>,
        func: crate::ast::MathFunc,
        arg1: &Expr,
        arg2: Option<&Expr>,
    ) -> fmt::Result {
        math_call(gen, func, arg1, arg2)
    }

    fn analog_read(gen: &mut Gen<Self>, pin: &Expr) -> fmt::Result {
        // Lectura por el chip ADC externo
        emit!(gen, "mcp.read_adc(")?;
        gen.expr(pin)?;
        emit!(gen, ")")
    }

    fn gpio_read(gen: &mut Gen<Self>, pin: &Expr) -> fmt::Result {
        emit!(gen, "GPIO.input(")?;
        gen.expr(pin)?;
        emit!(gen, ")")
    }

    fn var_decl(gen: &mut Gen<Self>, name: &str, init: Option<&Expr>) -> fmt::Result {
        var_decl(gen, name, init)
    }

    fn array_decl(gen: &mut Gen<Self>, name: &str, size: i32) -> fmt::Result {
        array_decl(gen, name, size)
    }

    fn gpio_write(gen: &mut Gen<Self>, pin: &Expr, value: &Expr) -> fmt::Result {
        gen.write_indent()?;
        emit!(gen, "GPIO.output(")?;
        gen.expr(pin)?;
        emit!(gen, ", ")?;
        gen.expr(value)?;
        emit!(gen, ")\n")
    }

    fn analog_write(gen: &mut Gen<Self>, pin: &Expr, value: &Expr) -> fmt::Result {
        software_pwm(gen, pin, value)
    }

    fn servo_write(gen: &mut Gen<Self>, pin: &Expr, angle: &Expr) -> fmt::Result {
        software_pwm(gen, pin, angle)
    }

    fn wait(gen: &mut Gen<Self>, duration: &Expr) -> fmt::Result {
        gen.write_indent()?;
        emit!(gen, "time.sleep(")?;
        gen.expr(duration)?;
        emit!(gen, " / 1000.0)\n")
    }

    fn print(gen: &mut Gen<Self>, value: &Expr) -> fmt::Result {
        print(gen, value)
    }

    fn function_def(gen: &mut Gen<Self>, def: &FunctionDef) -> fmt::Result {
        function_def(gen, def)
    }
}

/// PWM por software: el duty esperado (0-255) se reescala a porcentaje.
fn software_pwm(gen: &mut Gen<Rpi>, pin: &Expr, value: &Expr) -> fmt::Result {
    gen.write_indent()?;
    emit!(gen, "_pwm_")?;
    gen.expr(pin)?;
    emit!(gen, ".ChangeDutyCycle(")?;
    gen.expr(value)?;
    emit!(gen, " * 100.0 / 255.0)\n")
}

// ── Bajadas compartidas de la familia Python ──────────────────────────

pub(super) fn bool_lit<B: Backend>(gen: &mut Gen<B>, value: bool) -> fmt::Result {
    emit!(gen, "{}", if value { "True" } else { "False" })
}

pub(super) fn var_decl<B: Backend>(gen: &mut Gen<B>, name: &str, init: Option<&Expr>) -> fmt::Result {
    gen.write_indent()?;
    emit!(gen, "{} = ", name)?;
    match init {
        Some(init) => gen.expr(init)?,
        None => emit!(gen, "0")?,
    }

    gen.blank_line()
}

pub(super) fn array_decl<B: Backend>(gen: &mut Gen<B>, name: &str, size: i32) -> fmt::Result {
    emit_line!(gen, "{} = [0] * {}", name, size)
}

pub(super) fn math_call<B: Backend>(
    gen: &mut Gen<B>,
    func: crate::ast::MathFunc,
    arg1: &Expr,
    arg2: Option<&Expr>,
) -> fmt::Result {
    emit!(gen, "math.{}(", func.name())?;
    gen.expr(arg1)?;
    if let Some(arg2) = arg2 {
        emit!(gen, ", ")?;
        gen.expr(arg2)?;
    }

    emit!(gen, ")")
}

pub(super) fn print<B: Backend>(gen: &mut Gen<B>, value: &Expr) -> fmt::Result {
    gen.write_indent()?;
    emit!(gen, "print(")?;
    gen.expr(value)?;
    emit!(gen, ")\n")
}

pub(super) fn function_def<B: Backend>(gen: &mut Gen<B>, def: &FunctionDef) -> fmt::Result {
    if let Some(lang) = &def.extern_lang {
        emit_line!(gen, "# Extern {} function: {}", lang, def.name)?;
        return gen.blank_line();
    }

    gen.write_indent()?;
    emit!(gen, "def {}(", def.name)?;
    for (i, param) in def.params.iter().enumerate() {
        if i > 0 {
            emit!(gen, ", ")?;
        }

        emit!(gen, "{}", param)?;
    }
    emit!(gen, "):\n")?;

    match &def.body {
        Some(body) => gen.python_suite(body)?,
        None => gen.with_indent(|gen| emit_line!(gen, "pass"))?,
    }

    gen.blank_line()
}
