//! Backend ESP32 / ESP8266.
//!
//! Dialecto casi idéntico al de Arduino; difiere en el preludio (el
//! sketch incluye `<Arduino.h>`), la velocidad serial, la declaración de
//! resolución del ADC de 12 bits y el rango de pines inicializados.
//! Todas las demás bajadas se delegan a la familia compartida.

use super::{arduino, Backend, Gen, Style};
use crate::ast::{Expr, FunctionDef, Program};
use std::fmt::{self, Write};

pub(crate) struct Esp32;

impl Backend for Esp32 {
    const STYLE: Style = Style::CLike;
    const INDENT: &'static str = "  ";

    fn program(gen: &mut Gen<Self>, program: &Program) -> fmt::Result {
        emit!(gen, "// Board: ESP32 Dev Module\n")?;
        emit!(gen, "// Upload via: Arduino IDE with ESP32 board package\n\n")?;
        emit!(gen, "#include <Arduino.h>\n\n")?;

        gen.hoisted_functions(program)?;

        emit!(gen, "void setup() {{\n")?;
        gen.with_indent(|gen| {
            emit_line!(gen, "Serial.begin(115200);")?;
            emit_line!(gen, "analogReadResolution(12);")?;
            emit_line!(gen, "for (int i = 2; i <= 33; i++) pinMode(i, OUTPUT);")
        })?;
        emit!(gen, "}}\n\n")?;

        emit!(gen, "void loop() {{\n")?;
        gen.with_indent(|gen| gen.top_level(program))?;
        emit!(gen, "}}\n")
    }

    fn bool_lit(gen: &mut Gen<Self>, value: bool) -> fmt::Result {
        arduino::bool_lit(gen, value)
    }

    fn call(gen: &mut Gen<Self>, name: &str, args: &[Expr]) -> fmt::Result {
        arduino::call(gen, name, args)
    }

    fn analog_read(gen: &mut Gen<Self>, pin: &Expr) -> fmt::Result {
        // La resolución de 12 bits (0-4095) se declara en setup(); la
        // lectura expone el valor crudo
        arduino::analog_read(gen, pin)
    }

    fn gpio_read(gen: &mut Gen<Self>, pin: &Expr) -> fmt::Result {
        arduino::gpio_read(gen, pin)
    }

    fn pulse_read(gen: &mut Gen<Self>, pin: &Expr) -> fmt::Result {
        arduino::pulse_read(gen, pin)
    }

    fn i2c_read(gen: &mut Gen<Self>, address: &Expr) -> fmt::Result {
        arduino::i2c_read(gen, address)
    }

    fn var_decl(gen: &mut Gen<Self>, name: &str, init: Option<&Expr>) -> fmt::Result {
        arduino::var_decl(gen, name, init)
    }

    fn array_decl(gen: &mut Gen<Self>, name: &str, size: i32) -> fmt::Result {
        arduino::array_decl(gen, name, size)
    }

    fn gpio_write(gen: &mut Gen<Self>, pin: &Expr, value: &Expr) -> fmt::Result {
        arduino::gpio_write(gen, pin, value)
    }

    fn analog_write(gen: &mut Gen<Self>, pin: &Expr, value: &Expr) -> fmt::Result {
        arduino::analog_write(gen, pin, value)
    }

    fn servo_write(gen: &mut Gen<Self>, pin: &Expr, angle: &Expr) -> fmt::Result {
        arduino::servo_write(gen, pin, angle)
    }

    fn tone(gen: &mut Gen<Self>, pin: &Expr, frequency: &Expr) -> fmt::Result {
        arduino::tone(gen, pin, frequency)
    }

    fn no_tone(gen: &mut Gen<Self>, pin: &Expr) -> fmt::Result {
        arduino::no_tone(gen, pin)
    }

    fn i2c_begin(gen: &mut Gen<Self>) -> fmt::Result {
        arduino::i2c_begin(gen)
    }

    fn i2c_start(gen: &mut Gen<Self>, address: &Expr) -> fmt::Result {
        arduino::i2c_start(gen, address)
    }

    fn i2c_send(gen: &mut Gen<Self>, data: &Expr) -> fmt::Result {
        arduino::i2c_send(gen, data)
    }

    fn i2c_stop(gen: &mut Gen<Self>) -> fmt::Result {
        arduino::i2c_stop(gen)
    }

    fn wait(gen: &mut Gen<Self>, duration: &Expr) -> fmt::Result {
        arduino::wait(gen, duration)
    }

    fn print(gen: &mut Gen<Self>, value: &Expr) -> fmt::Result {
        arduino::print(gen, value)
    }

    fn function_def(gen: &mut Gen<Self>, def: &FunctionDef) -> fmt::Result {
        arduino::function_def(gen, def)
    }
}
