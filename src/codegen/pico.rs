//! Backend Raspberry Pi Pico (MicroPython).
//!
//! Script lineal sobre el módulo `machine`. El ADC del RP2040 entrega
//! 16 bits; la lectura se desplaza 6 bits para aproximar el rango de 10
//! bits de los demás objetivos. El PWM usa duty de 16 bits.

use super::{rpi, Backend, Gen, Style};
use crate::ast::{Expr, FunctionDef, MathFunc, Program};
use std::fmt::{self, Write};

pub(crate) struct Pico;

impl Backend for Pico {
    const STYLE: Style = Style::Python;
    const INDENT: &'static str = "    ";

    fn program(gen: &mut Gen<Self>, program: &Program) -> fmt::Result {
        emit!(gen, "# Flash: Thonny IDE  OR  mpremote copy robot.py :main.py\n\n")?;
        emit!(gen, "from machine import Pin, ADC, PWM, I2C, UART\n")?;
        emit!(gen, "import utime, math, random\n\n")?;

        gen.hoisted_functions(program)?;
        gen.top_level(program)
    }

    fn bool_lit(gen: &mut Gen<Self>, value: bool) -> fmt::Result {
        rpi::bool_lit(gen, value)
    }

    fn call(gen: &mut Gen<Self>, name: &str, args: &[Expr]) -> fmt::Result {
        match (name, args.len()) {
            ("map", 5) => gen.affine_map(args, "int((", "//"),
            ("constrain", 3) => gen.clamp(args, "max", "min"),
            ("random", 2) => {
                emit!(gen, "random.randint(")?;
                gen.arg_list(args)?;
                emit!(gen, ")")
            }

            ("delayMicroseconds", 1) => {
                emit!(gen, "utime.sleep_us(int(")?;
                gen.expr(&args[0])?;
                emit!(gen, "))")
            }

            _ => gen.plain_call(name, args),
        }
    }

    fn math_call(
        gen: &mut Gen<Self>,
        func: MathFunc,
        arg1: &Expr,
        arg2: Option<&Expr>,
    ) -> fmt::Result {
        rpi::math_call(gen, func, arg1, arg2)
    }

    fn analog_read(gen: &mut Gen<Self>, pin: &Expr) -> fmt::Result {
        // 0-65535 → 0-1023
        emit!(gen, "ADC(")?;
        gen.expr(pin)?;
        emit!(gen, ").read_u16() >> 6")
    }

    fn gpio_read(gen: &mut Gen<Self>, pin: &Expr) -> fmt::Result {
        emit!(gen, "Pin(")?;
        gen.expr(pin)?;
        emit!(gen, ", Pin.IN).value()")
    }

    fn var_decl(gen: &mut Gen<Self>, name: &str, init: Option<&Expr>) -> fmt::Result {
        rpi::var_decl(gen, name, init)
    }

    fn array_decl(gen: &mut Gen<Self>, name: &str, size: i32) -> fmt::Result {
        rpi::array_decl(gen, name, size)
    }

    fn gpio_write(gen: &mut Gen<Self>, pin: &Expr, value: &Expr) -> fmt::Result {
        gen.write_indent()?;
        emit!(gen, "Pin(")?;
        gen.expr(pin)?;
        emit!(gen, ", Pin.OUT).value(")?;
        gen.expr(value)?;
        emit!(gen, ")\n")
    }

    fn analog_write(gen: &mut Gen<Self>, pin: &Expr, value: &Expr) -> fmt::Result {
        duty_u16(gen, pin, value)
    }

    fn servo_write(gen: &mut Gen<Self>, pin: &Expr, angle: &Expr) -> fmt::Result {
        duty_u16(gen, pin, angle)
    }

    fn wait(gen: &mut Gen<Self>, duration: &Expr) -> fmt::Result {
        gen.write_indent()?;
        emit!(gen, "utime.sleep_ms(int(")?;
        gen.expr(duration)?;
        emit!(gen, "))\n")
    }

    fn print(gen: &mut Gen<Self>, value: &Expr) -> fmt::Result {
        rpi::print(gen, value)
    }

    fn function_def(gen: &mut Gen<Self>, def: &FunctionDef) -> fmt::Result {
        rpi::function_def(gen, def)
    }
}

/// PWM de 16 bits: el duty esperado (0-255) se reescala con `* 257`.
fn duty_u16(gen: &mut Gen<Pico>, pin: &Expr, value: &Expr) -> fmt::Result {
    let temp = gen.next_temp_id();
    gen.write_indent()?;
    emit!(gen, "_pwm{} = PWM(Pin(", temp)?;
    gen.expr(pin)?;
    emit!(gen, ")); _pwm{}.duty_u16(int(", temp)?;
    gen.expr(value)?;
    emit!(gen, " * 257))\n")
}
