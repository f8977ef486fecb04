//! Generación de código multiobjetivo.
//!
//! Este módulo implementa un único recorrido genérico del AST,
//! parametrizado por una política de objetivo ([`Backend`]) que resuelve
//! cada diferencia observable entre plataformas: forma del programa,
//! primitivas de E/S, deletreo de operadores y booleanos, y las
//! reescrituras de funciones incorporadas. Los cinco backends comparten
//! así la lógica de caminata en vez de duplicarla.
//!
//! El recorrido trata al árbol como solo lectura. Todo el estado mutable
//! de una emisión vive en el contexto [`Gen`]: la salida, la profundidad
//! de indentación y los contadores monótonos de variables de inducción y
//! temporales. Cada invocación de [`generate`] crea un contexto nuevo,
//! por lo cual generar para varios objetivos en cualquier orden produce
//! salidas idénticas byte a byte.

use crate::ast::{BinOp, Expr, ExprKind, FunctionDef, MathFunc, Program, Stmt, StmtKind, UnOp};
use std::fmt::{self, Display, Write};
use std::marker::PhantomData;
use std::str::FromStr;

pub(crate) mod arduino;
pub(crate) mod esp32;
pub(crate) mod pico;
pub(crate) mod ros2;
pub(crate) mod rpi;

/// Plataforma de salida.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Arduino,
    Esp32,
    Rpi,
    Pico,
    Ros2,
}

impl Target {
    pub fn name(self) -> &'static str {
        match self {
            Target::Arduino => "Arduino",
            Target::Esp32 => "ESP32",
            Target::Rpi => "Raspberry Pi (Python)",
            Target::Pico => "Raspberry Pi Pico (MicroPython)",
            Target::Ros2 => "ROS2",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Target::Arduino => ".ino",
            Target::Esp32 => ".cpp",
            Target::Rpi => ".py",
            Target::Pico => ".py",
            Target::Ros2 => ".cpp",
        }
    }

    pub fn all() -> [Target; 5] {
        [
            Target::Arduino,
            Target::Esp32,
            Target::Rpi,
            Target::Pico,
            Target::Ros2,
        ]
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "arduino" => Ok(Target::Arduino),
            "esp32" => Ok(Target::Esp32),
            "rpi" => Ok(Target::Rpi),
            "pico" => Ok(Target::Pico),
            "ros2" => Ok(Target::Ros2),
            other => Err(format!(
                "Unknown target '{}', valid targets: arduino, esp32, rpi, pico, ros2",
                other
            )),
        }
    }
}

impl Display for Target {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.name())
    }
}

/// Genera el texto fuente completo para un objetivo.
///
/// La generación nunca falla una vez que el análisis sintáctico terminó
/// sin errores: los constructos sin soporte en un objetivo degradan a
/// marcadores visibles en el lenguaje de salida.
pub fn generate(target: Target, program: &Program) -> String {
    dispatch_target!(B: target => Gen::<B>::run(program))
}

/// Familia sintáctica de un objetivo.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Style {
    /// Llaves y `;` terminal (Arduino, ESP32, ROS2).
    CLike,

    /// Suites por indentación con `:` (CPython, MicroPython).
    Python,
}

/// Política de objetivo: cada backend implementa aquí sus diferencias.
///
/// Los métodos con implementación por omisión cubren el comportamiento
/// compartido por familia sintáctica; las primitivas de E/S no tienen
/// omisión razonable y cada backend debe proveerlas.
pub(crate) trait Backend: Sized {
    const STYLE: Style;
    const INDENT: &'static str;

    /// Colapsar `else { if … }` a `elif` (solo CPython).
    const COLLAPSE_ELIF: bool = false;

    /// Emite el programa completo: preludio, funciones izadas y la forma
    /// de ejecución propia del objetivo.
    fn program(gen: &mut Gen<Self>, program: &Program) -> fmt::Result;

    // ── Expresiones ───────────────────────────────────────────────────

    fn ident(gen: &mut Gen<Self>, name: &str) -> fmt::Result {
        emit!(gen, "{}", name)
    }

    fn string_lit(gen: &mut Gen<Self>, value: &str) -> fmt::Result {
        emit!(gen, "\"{}\"", value)
    }

    fn bool_lit(gen: &mut Gen<Self>, value: bool) -> fmt::Result;

    fn modulo(gen: &mut Gen<Self>, left: &Expr, right: &Expr) -> fmt::Result {
        match Self::STYLE {
            Style::CLike => {
                emit!(gen, "((int)(")?;
                gen.expr(left)?;
                emit!(gen, ") % (int)(")?;
                gen.expr(right)?;
                emit!(gen, "))")
            }

            Style::Python => {
                emit!(gen, "(")?;
                gen.expr(left)?;
                emit!(gen, " % ")?;
                gen.expr(right)?;
                emit!(gen, ")")
            }
        }
    }

    /// Llamadas: reescrituras de funciones incorporadas y llamadas de
    /// usuario.
    fn call(gen: &mut Gen<Self>, name: &str, args: &[Expr]) -> fmt::Result;

    fn math_call(
        gen: &mut Gen<Self>,
        func: MathFunc,
        arg1: &Expr,
        arg2: Option<&Expr>,
    ) -> fmt::Result {
        emit!(gen, "{}(", func.name())?;
        gen.expr(arg1)?;
        if let Some(arg2) = arg2 {
            emit!(gen, ", ")?;
            gen.expr(arg2)?;
        }
        emit!(gen, ")")
    }

    fn analog_read(gen: &mut Gen<Self>, pin: &Expr) -> fmt::Result;
    fn gpio_read(gen: &mut Gen<Self>, pin: &Expr) -> fmt::Result;

    fn pulse_read(gen: &mut Gen<Self>, _pin: &Expr) -> fmt::Result {
        gen.unsupported_expr()
    }

    fn i2c_read(gen: &mut Gen<Self>, _address: &Expr) -> fmt::Result {
        gen.unsupported_expr()
    }

    // ── Sentencias ────────────────────────────────────────────────────

    fn var_decl(gen: &mut Gen<Self>, name: &str, init: Option<&Expr>) -> fmt::Result;
    fn array_decl(gen: &mut Gen<Self>, name: &str, size: i32) -> fmt::Result;
    fn gpio_write(gen: &mut Gen<Self>, pin: &Expr, value: &Expr) -> fmt::Result;
    fn analog_write(gen: &mut Gen<Self>, pin: &Expr, value: &Expr) -> fmt::Result;
    fn servo_write(gen: &mut Gen<Self>, pin: &Expr, angle: &Expr) -> fmt::Result;

    fn tone(gen: &mut Gen<Self>, _pin: &Expr, _frequency: &Expr) -> fmt::Result {
        gen.unsupported_stmt("tone")
    }

    fn no_tone(gen: &mut Gen<Self>, _pin: &Expr) -> fmt::Result {
        gen.unsupported_stmt("notone")
    }

    fn i2c_begin(gen: &mut Gen<Self>) -> fmt::Result {
        gen.unsupported_stmt("i2c begin")
    }

    fn i2c_start(gen: &mut Gen<Self>, _address: &Expr) -> fmt::Result {
        gen.unsupported_stmt("i2c start")
    }

    fn i2c_send(gen: &mut Gen<Self>, _data: &Expr) -> fmt::Result {
        gen.unsupported_stmt("i2c send")
    }

    fn i2c_stop(gen: &mut Gen<Self>) -> fmt::Result {
        gen.unsupported_stmt("i2c stop")
    }

    fn wait(gen: &mut Gen<Self>, duration: &Expr) -> fmt::Result;
    fn print(gen: &mut Gen<Self>, value: &Expr) -> fmt::Result;
    fn function_def(gen: &mut Gen<Self>, def: &FunctionDef) -> fmt::Result;

    fn forever(gen: &mut Gen<Self>, body: &Stmt) -> fmt::Result {
        gen.write_indent()?;
        match Self::STYLE {
            Style::CLike => {
                emit!(gen, "while (1) {{\n")?;
                gen.with_indent(|gen| gen.stmt(body))?;
                gen.write_indent()?;
                emit!(gen, "}}\n")
            }

            Style::Python => {
                emit!(gen, "while True:\n")?;
                gen.python_suite(body)?;
                gen.blank_line()
            }
        }
    }
}

/// Contexto de emisión por (backend, compilación).
pub(crate) struct Gen<B> {
    pub(crate) out: String,
    indent: usize,
    loop_counter: u32,
    temp_counter: u32,
    _backend: PhantomData<B>,
}

impl<B: Backend> Gen<B> {
    fn run(program: &Program) -> String {
        let mut gen = Gen {
            out: String::new(),
            indent: 0,
            loop_counter: 0,
            temp_counter: 0,
            _backend: PhantomData,
        };

        B::program(&mut gen, program).expect("writing to a String cannot fail");
        gen.out
    }

    // ── Primitivas de emisión ─────────────────────────────────────────

    pub(crate) fn write_indent(&mut self) -> fmt::Result {
        for _ in 0..self.indent {
            self.out.push_str(B::INDENT);
        }

        Ok(())
    }

    pub(crate) fn blank_line(&mut self) -> fmt::Result {
        self.out.write_char('\n')
    }

    pub(crate) fn with_indent<F>(&mut self, body: F) -> fmt::Result
    where
        F: FnOnce(&mut Self) -> fmt::Result,
    {
        self.indent += 1;
        let result = body(self);
        self.indent -= 1;
        result
    }

    /// Identificador fresco para la variable de inducción de un `repeat`.
    ///
    /// Estrictamente creciente dentro de una compilación: dos lazos,
    /// anidados o hermanos, nunca comparten variable.
    pub(crate) fn next_loop_id(&mut self) -> u32 {
        let id = self.loop_counter;
        self.loop_counter += 1;
        id
    }

    /// Identificador fresco para nombres temporales.
    pub(crate) fn next_temp_id(&mut self) -> u32 {
        let id = self.temp_counter;
        self.temp_counter += 1;
        id
    }

    // ── Estructura del programa ───────────────────────────────────────

    /// Emite las definiciones de función del nivel superior, en orden.
    pub(crate) fn hoisted_functions(&mut self, program: &Program) -> fmt::Result {
        for def in program.function_defs() {
            B::function_def(self, def)?;
        }

        Ok(())
    }

    /// Emite las sentencias del nivel superior que no son funciones.
    pub(crate) fn top_level(&mut self, program: &Program) -> fmt::Result {
        for stmt in program.top_level() {
            self.stmt(stmt)?;
        }

        Ok(())
    }

    // ── Caminata de sentencias ────────────────────────────────────────

    pub(crate) fn stmt(&mut self, stmt: &Stmt) -> fmt::Result {
        match &stmt.kind {
            StmtKind::VarDecl { name, init } => B::var_decl(self, name, init.as_ref()),
            StmtKind::ArrayDecl { name, size } => B::array_decl(self, name, *size),
            StmtKind::Assign { target, value } => self.assign(target, value),
            StmtKind::If {
                condition,
                then_block,
                else_block,
            } => self.if_stmt(condition, then_block, else_block.as_deref()),
            StmtKind::While { condition, body } => self.while_stmt(condition, body),
            StmtKind::Repeat { count, body } => self.repeat_stmt(count, body),
            StmtKind::Forever { body } => B::forever(self, body),
            StmtKind::Block(stmts) => {
                for stmt in stmts {
                    self.stmt(stmt)?;
                }

                Ok(())
            }
            StmtKind::Return(value) => self.return_stmt(value.as_ref()),
            StmtKind::Break => self.break_stmt(),
            StmtKind::GpioWrite { pin, value } => B::gpio_write(self, pin, value),
            StmtKind::AnalogWrite { pin, value } => B::analog_write(self, pin, value),
            StmtKind::ServoWrite { pin, angle } => B::servo_write(self, pin, angle),
            StmtKind::Tone { pin, frequency } => B::tone(self, pin, frequency),
            StmtKind::NoTone { pin } => B::no_tone(self, pin),
            StmtKind::I2cBegin => B::i2c_begin(self),
            StmtKind::I2cStart { address } => B::i2c_start(self, address),
            StmtKind::I2cSend { data } => B::i2c_send(self, data),
            StmtKind::I2cStop => B::i2c_stop(self),
            StmtKind::Wait { duration } => B::wait(self, duration),
            StmtKind::Print { value } => B::print(self, value),
            StmtKind::Expr(expr) => self.expr_stmt(expr),
            StmtKind::FunctionDef(def) => B::function_def(self, def),
        }
    }

    // ── Caminata de expresiones ───────────────────────────────────────

    pub(crate) fn expr(&mut self, expr: &Expr) -> fmt::Result {
        match &expr.kind {
            ExprKind::Number(value) => emit!(self, "{}", value),
            ExprKind::Str(value) => B::string_lit(self, value),
            ExprKind::Bool(value) => B::bool_lit(self, *value),
            ExprKind::Ident(name) => B::ident(self, name),
            ExprKind::Binary { op, left, right } => self.binary(*op, left, right),
            ExprKind::Unary { op, operand } => self.unary(*op, operand),
            ExprKind::Call { name, args } => B::call(self, name, args),
            ExprKind::ArrayAccess { array, index } => self.array_access(array, index),
            ExprKind::ArrayLiteral(elements) => self.array_literal(elements),
            ExprKind::AnalogRead(pin) => B::analog_read(self, pin),
            ExprKind::GpioRead(pin) => B::gpio_read(self, pin),
            ExprKind::PulseRead(pin) => B::pulse_read(self, pin),
            ExprKind::I2cRead(address) => B::i2c_read(self, address),
            ExprKind::MathCall { func, arg1, arg2 } => {
                B::math_call(self, *func, arg1, arg2.as_deref())
            }
        }
    }

    fn binary(&mut self, op: BinOp, left: &Expr, right: &Expr) -> fmt::Result {
        if op == BinOp::Mod {
            return B::modulo(self, left, right);
        }

        emit!(self, "(")?;
        self.expr(left)?;
        emit!(self, " {} ", binop_text(op, B::STYLE))?;
        self.expr(right)?;
        emit!(self, ")")
    }

    fn unary(&mut self, op: UnOp, operand: &Expr) -> fmt::Result {
        let prefix = match (op, B::STYLE) {
            (UnOp::Not, Style::CLike) => "!(",
            (UnOp::Not, Style::Python) => "not (",
            (UnOp::Neg, _) => "-(",
        };

        emit!(self, "{}", prefix)?;
        self.expr(operand)?;
        emit!(self, ")")
    }

    fn array_access(&mut self, array: &Expr, index: &Expr) -> fmt::Result {
        self.expr(array)?;
        match B::STYLE {
            Style::CLike => emit!(self, "[(int)(")?,
            Style::Python => emit!(self, "[int(")?,
        }

        self.expr(index)?;
        emit!(self, ")]")
    }

    fn array_literal(&mut self, elements: &[Expr]) -> fmt::Result {
        let (open, close) = match B::STYLE {
            Style::CLike => ("{", "}"),
            Style::Python => ("[", "]"),
        };

        emit!(self, "{}", open)?;
        self.arg_list(elements)?;
        emit!(self, "{}", close)
    }

    // ── Ayudantes compartidos por los backends ────────────────────────

    pub(crate) fn arg_list(&mut self, args: &[Expr]) -> fmt::Result {
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                emit!(self, ", ")?;
            }

            self.expr(arg)?;
        }

        Ok(())
    }

    pub(crate) fn plain_call(&mut self, name: &str, args: &[Expr]) -> fmt::Result {
        emit!(self, "{}(", name)?;
        self.arg_list(args)?;
        emit!(self, ")")
    }

    /// Transformación afín de `map(v, fl, fh, tl, th)`.
    ///
    /// `cast_open` abre el cast entero del objetivo (p. ej. `(int)((`) y
    /// `div_op` es su división entera, de modo que los cinco objetivos
    /// produzcan el mismo resultado numérico.
    pub(crate) fn affine_map(
        &mut self,
        args: &[Expr],
        cast_open: &str,
        div_op: &str,
    ) -> fmt::Result {
        emit!(self, "{}", cast_open)?;
        self.expr(&args[0])?;
        emit!(self, " - ")?;
        self.expr(&args[1])?;
        emit!(self, ") * (")?;
        self.expr(&args[4])?;
        emit!(self, " - ")?;
        self.expr(&args[3])?;
        emit!(self, ") {} (", div_op)?;
        self.expr(&args[2])?;
        emit!(self, " - ")?;
        self.expr(&args[1])?;
        emit!(self, ") + ")?;
        self.expr(&args[3])?;
        emit!(self, ")")
    }

    /// `constrain(v, mn, mx)` como `max(mn, min(mx, v))`.
    pub(crate) fn clamp(&mut self, args: &[Expr], max_fn: &str, min_fn: &str) -> fmt::Result {
        emit!(self, "{}(", max_fn)?;
        self.expr(&args[1])?;
        emit!(self, ", {}(", min_fn)?;
        self.expr(&args[2])?;
        emit!(self, ", ")?;
        self.expr(&args[0])?;
        emit!(self, "))")
    }

    pub(crate) fn unsupported_expr(&mut self) -> fmt::Result {
        match B::STYLE {
            Style::CLike => emit!(self, "0 /* unsupported expr */"),
            Style::Python => emit!(self, "0  # unsupported expression"),
        }
    }

    pub(crate) fn unsupported_stmt(&mut self, what: &str) -> fmt::Result {
        self.write_indent()?;
        match B::STYLE {
            Style::CLike => writeln!(self.out, "/* {} unsupported on this target */", what),
            Style::Python => writeln!(self.out, "# {} unsupported on this target", what),
        }
    }

    // ── Andamiaje de sentencias por familia sintáctica ────────────────

    fn stmt_end(&mut self) -> fmt::Result {
        match B::STYLE {
            Style::CLike => self.out.write_str(";\n"),
            Style::Python => self.out.write_char('\n'),
        }
    }

    fn assign(&mut self, target: &Expr, value: &Expr) -> fmt::Result {
        self.write_indent()?;
        self.expr(target)?;
        emit!(self, " = ")?;
        self.expr(value)?;
        self.stmt_end()
    }

    fn expr_stmt(&mut self, expr: &Expr) -> fmt::Result {
        self.write_indent()?;
        self.expr(expr)?;
        self.stmt_end()
    }

    fn return_stmt(&mut self, value: Option<&Expr>) -> fmt::Result {
        self.write_indent()?;
        emit!(self, "return")?;
        if let Some(value) = value {
            emit!(self, " ")?;
            self.expr(value)?;
        }

        self.stmt_end()
    }

    fn break_stmt(&mut self) -> fmt::Result {
        self.write_indent()?;
        emit!(self, "break")?;
        self.stmt_end()
    }

    fn if_stmt(
        &mut self,
        condition: &Expr,
        then_block: &Stmt,
        else_block: Option<&Stmt>,
    ) -> fmt::Result {
        match B::STYLE {
            Style::CLike => {
                self.write_indent()?;
                emit!(self, "if (")?;
                self.expr(condition)?;
                emit!(self, ") {{\n")?;
                self.with_indent(|gen| gen.stmt(then_block))?;
                self.write_indent()?;

                if let Some(else_block) = else_block {
                    emit!(self, "}} else {{\n")?;
                    self.with_indent(|gen| gen.stmt(else_block))?;
                    self.write_indent()?;
                }

                emit!(self, "}}\n")
            }

            Style::Python => {
                self.write_indent()?;
                emit!(self, "if ")?;
                self.expr(condition)?;
                emit!(self, ":\n")?;
                self.python_suite(then_block)?;

                if let Some(else_block) = else_block {
                    self.python_else(else_block)?;
                }

                self.blank_line()
            }
        }
    }

    fn python_else(&mut self, else_block: &Stmt) -> fmt::Result {
        // `else { if … }` de un solo nivel colapsa a `elif` donde el
        // objetivo lo pide
        if B::COLLAPSE_ELIF {
            if let StmtKind::Block(stmts) = &else_block.kind {
                if let [only] = stmts.as_slice() {
                    if let StmtKind::If {
                        condition,
                        then_block,
                        else_block,
                    } = &only.kind
                    {
                        self.write_indent()?;
                        emit!(self, "elif ")?;
                        self.expr(condition)?;
                        emit!(self, ":\n")?;
                        self.python_suite(then_block)?;

                        if let Some(inner_else) = else_block {
                            emit_line!(self, "else:")?;
                            self.python_suite(inner_else)?;
                        }

                        return Ok(());
                    }
                }
            }
        }

        emit_line!(self, "else:")?;
        self.python_suite(else_block)
    }

    /// Suite de Python: cuerpo indentado, con `pass` si quedó vacío.
    pub(crate) fn python_suite(&mut self, body: &Stmt) -> fmt::Result {
        let empty = matches!(&body.kind, StmtKind::Block(stmts) if stmts.is_empty());

        self.with_indent(|gen| {
            if empty {
                emit_line!(gen, "pass")
            } else {
                gen.stmt(body)
            }
        })
    }

    fn while_stmt(&mut self, condition: &Expr, body: &Stmt) -> fmt::Result {
        self.write_indent()?;
        match B::STYLE {
            Style::CLike => {
                emit!(self, "while (")?;
                self.expr(condition)?;
                emit!(self, ") {{\n")?;
                self.with_indent(|gen| gen.stmt(body))?;
                self.write_indent()?;
                emit!(self, "}}\n")
            }

            Style::Python => {
                emit!(self, "while ")?;
                self.expr(condition)?;
                emit!(self, ":\n")?;
                self.python_suite(body)?;
                self.blank_line()
            }
        }
    }

    fn repeat_stmt(&mut self, count: &Expr, body: &Stmt) -> fmt::Result {
        let id = self.next_loop_id();
        self.write_indent()?;

        match B::STYLE {
            Style::CLike => {
                emit!(self, "for (int _i{} = 0; _i{} < (int)(", id, id)?;
                self.expr(count)?;
                emit!(self, "); _i{}++) {{\n", id)?;
                self.with_indent(|gen| gen.stmt(body))?;
                self.write_indent()?;
                emit!(self, "}}\n")
            }

            Style::Python => {
                emit!(self, "for _i{} in range(int(", id)?;
                self.expr(count)?;
                emit!(self, ")):\n")?;
                self.python_suite(body)?;
                self.blank_line()
            }
        }
    }
}

fn binop_text(op: BinOp, style: Style) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::Eq => "==",
        BinOp::Ne => "!=",
        BinOp::Lt => "<",
        BinOp::Gt => ">",
        BinOp::Le => "<=",
        BinOp::Ge => ">=",
        BinOp::And => match style {
            Style::CLike => "&&",
            Style::Python => "and",
        },
        BinOp::Or => match style {
            Style::CLike => "||",
            Style::Python => "or",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn compile(source: &str, target: Target) -> String {
        let program = parse::parse(source, 10).expect("parse failed");
        generate(target, &program)
    }

    /// Programa que ejercita todos los tipos de nodo que el parser puede
    /// producir.
    const EXHAUSTIVE: &str = r#"
        extern "C++" def motor_boost(level)
        def helper(a, b) {
            if a < b { return a }
            return b
        }
        program {
            make var x = 0
            make array buf size 4
            const LIMIT = 10
            set index 0 of buf to 1
            set pin 6 to map(read analog pin 3, 0, 1023, 0, 255)
            set x to constrain(x + 1, 0, LIMIT)
            change x by 2
            turn on pin 13
            turn off pin 13
            servo pin 9 set 90
            tone pin 8 freq 440
            notone pin 8
            i2c begin
            i2c start 104
            i2c send buf[0]
            i2c stop
            make var r = read i2c 104
            make var p = read pulse pin 7
            make var d = read pin 4
            make var m = sin(x) + atan2(x, 2)
            make var n = min(x, max(1, 2)) + abs(x) + random(0, 9)
            make var q = x % 3
            wait_us 500
            print "ready"
            print not (x is 1 and x < 5 or x != 2)
            helper(1, 2)
            for i from 0 to 3 { wait 1 }
            repeat 5 { wait 100 }
            while x <= LIMIT { change x by 1
                break }
            if x is 1 { print "one" } else if x is 2 { print "two" } else { print "other" }
            loop forever { wait 10 }
        }
    "#;

    #[test]
    fn every_target_terminates_with_nonempty_output() {
        for target in Target::all() {
            let output = compile(EXHAUSTIVE, target);
            assert!(!output.is_empty(), "{} produced empty output", target);
        }
    }

    #[test]
    fn generation_is_idempotent_per_backend() {
        let program = parse::parse(EXHAUSTIVE, 10).expect("parse failed");
        for target in Target::all() {
            let first = generate(target, &program);
            let second = generate(target, &program);
            assert_eq!(first, second, "{} is not idempotent", target);
        }
    }

    #[test]
    fn backend_order_does_not_change_output() {
        let program = parse::parse(EXHAUSTIVE, 10).expect("parse failed");

        let forward: Vec<_> = Target::all()
            .iter()
            .map(|&t| generate(t, &program))
            .collect();
        let mut backward: Vec<_> = Target::all()
            .iter()
            .rev()
            .map(|&t| generate(t, &program))
            .collect();
        backward.reverse();

        assert_eq!(forward, backward);
    }

    #[test]
    fn gpio_write_lowers_per_target() {
        let source = "program { turn on pin 13 }";
        assert!(compile(source, Target::Arduino).contains("digitalWrite(13, 1);"));
        assert!(compile(source, Target::Rpi).contains("GPIO.output(13, 1)"));
        assert!(compile(source, Target::Pico).contains("Pin(13, Pin.OUT).value(1)"));
        assert!(compile(source, Target::Ros2).contains("gpio_pub_->publish(_m);"));
    }

    #[test]
    fn repeat_gets_a_fresh_counted_loop() {
        let output = compile("program { repeat 5 { wait 100 } }", Target::Arduino);
        assert!(output.contains("for (int _i0 = 0; _i0 < (int)(5); _i0++) {"));
        assert!(output.contains("delay(100);"));
    }

    #[test]
    fn repeat_counters_never_repeat_within_a_compilation() {
        let source = "program { repeat 2 { repeat 2 { wait 1 } } repeat 2 { wait 1 } }";

        for target in [Target::Arduino, Target::Pico] {
            let output = compile(source, target);
            for var in ["_i0", "_i1", "_i2"] {
                assert!(output.contains(var), "{}: {} missing from output", target, var);
            }
            assert!(!output.contains("_i3"), "{}: counter overshoot", target);
        }
    }

    #[test]
    fn servo_scaling_differs_per_target() {
        let source = "program { servo pin 9 set 90 }";
        assert!(compile(source, Target::Arduino).contains("(90 * 255 / 180)"));
        assert!(compile(source, Target::Esp32).contains("(90 * 255 / 180)"));
        assert!(compile(source, Target::Pico).contains("* 257"));
        assert!(compile(source, Target::Rpi).contains("ChangeDutyCycle"));
        assert!(compile(source, Target::Ros2).contains("pwm_pub_->publish(_m);"));
    }

    #[test]
    fn analog_read_scaling_differs_per_target() {
        let source = "program { make var v = read analog pin 2 }";
        assert!(compile(source, Target::Arduino).contains("analogRead(A2)"));
        assert!(compile(source, Target::Esp32).contains("analogRead(A2)"));
        assert!(compile(source, Target::Pico).contains("ADC(2).read_u16() >> 6"));
        assert!(compile(source, Target::Rpi).contains("mcp.read_adc(2)"));
        assert!(compile(source, Target::Ros2).contains("sensor_val_2"));
    }

    #[test]
    fn map_lowers_to_the_same_affine_transform_everywhere() {
        let source = "program { set pin 3 to map(5, 0, 10, 0, 100) }";

        assert!(compile(source, Target::Arduino)
            .contains("(int)((5 - 0) * (100 - 0) / (10 - 0) + 0)"));
        assert!(compile(source, Target::Ros2)
            .contains("(int)((5 - 0) * (100 - 0) / (10 - 0) + 0)"));
        assert!(compile(source, Target::Rpi).contains("int((5 - 0) * (100 - 0) / (10 - 0) + 0)"));
        assert!(compile(source, Target::Pico).contains("int((5 - 0) * (100 - 0) // (10 - 0) + 0)"));
    }

    #[test]
    fn boolean_operators_spell_per_family() {
        let source = "program { if 1 and 0 or 1 { wait 1 } }";
        assert!(compile(source, Target::Arduino).contains("&&"));
        assert!(compile(source, Target::Ros2).contains("||"));
        assert!(compile(source, Target::Rpi).contains(" and "));
        assert!(compile(source, Target::Pico).contains(" or "));
    }

    #[test]
    fn modulo_casts_to_int_only_on_c_like_gpio_targets() {
        let source = "program { make var q = 7 % 3 }";
        assert!(compile(source, Target::Arduino).contains("((int)(7) % (int)(3))"));
        assert!(compile(source, Target::Esp32).contains("((int)(7) % (int)(3))"));
        assert!(compile(source, Target::Pico).contains("(7 % 3)"));
        assert!(compile(source, Target::Ros2).contains("(7 % 3)"));
    }

    #[test]
    fn arduino_program_shape_has_setup_and_loop() {
        let output = compile("def f(x) { }\nprogram { wait 1 }", Target::Arduino);
        assert!(output.contains("#include <Wire.h>"));
        assert!(output.contains("void setup() {"));
        assert!(output.contains("Serial.begin(9600);"));
        assert!(output.contains("void loop() {"));

        // Las funciones se izan antes de setup()
        let f_at = output.find("void f(float x)").expect("function not hoisted");
        let setup_at = output.find("void setup()").expect("setup missing");
        assert!(f_at < setup_at);
    }

    #[test]
    fn esp32_declares_adc_resolution_and_arduino_header() {
        let output = compile("program { wait 1 }", Target::Esp32);
        assert!(output.contains("#include <Arduino.h>"));
        assert!(output.contains("Serial.begin(115200);"));
        assert!(output.contains("analogReadResolution(12);"));
    }

    #[test]
    fn rpi_wraps_execution_for_gpio_cleanup() {
        let output = compile("program { turn on pin 5 }", Target::Rpi);
        assert!(output.contains("import RPi.GPIO as GPIO"));
        assert!(output.contains("try:"));
        assert!(output.contains("except KeyboardInterrupt:"));
        assert!(output.contains("finally:"));
        assert!(output.contains("GPIO.cleanup()"));
    }

    #[test]
    fn rpi_collapses_else_if_to_elif() {
        let source = r#"program {
            make var a = 1
            if a is 1 { print "yes" } else if a is 2 { print "two" } else { print "other" }
        }"#;

        let rpi = compile(source, Target::Rpi);
        assert!(rpi.contains("elif "));

        // Pico mantiene el anidamiento expandido
        let pico = compile(source, Target::Pico);
        assert!(!pico.contains("elif "));
    }

    #[test]
    fn ros2_emits_a_timer_driven_node() {
        let output = compile("program { loop forever { turn on pin 2 } }", Target::Ros2);
        assert!(output.contains("#include <rclcpp/rclcpp.hpp>"));
        assert!(output.contains("class KinetrixNode : public rclcpp::Node {"));
        assert!(output.contains("create_wall_timer"));
        assert!(output.contains("rclcpp::spin(std::make_shared<KinetrixNode>());"));

        // `loop forever` degrada a una ejecución por tick del timer
        assert!(!output.contains("while (1)"));
    }

    #[test]
    fn i2c_lowers_only_on_the_wire_targets() {
        let source = "program { i2c begin\ni2c start 104\ni2c send 7\ni2c stop }";

        let arduino = compile(source, Target::Arduino);
        assert!(arduino.contains("Wire.begin();"));
        assert!(arduino.contains("Wire.beginTransmission(104);"));
        assert!(arduino.contains("Wire.write((byte)(7));"));
        assert!(arduino.contains("Wire.endTransmission();"));

        for target in [Target::Rpi, Target::Pico, Target::Ros2] {
            let output = compile(source, target);
            assert!(
                output.contains("unsupported on this target"),
                "{} should mark i2c as unsupported",
                target
            );
        }
    }

    #[test]
    fn wait_us_lowers_to_each_target_primitive() {
        let source = "program { wait_us 500 }";
        assert!(compile(source, Target::Arduino).contains("delayMicroseconds(500);"));
        assert!(compile(source, Target::Rpi).contains("time.sleep(500 / 1000000.0)"));
        assert!(compile(source, Target::Pico).contains("utime.sleep_us(int(500))"));
        assert!(compile(source, Target::Ros2).contains("std::chrono::microseconds"));
    }

    #[test]
    fn target_names_parse_back() {
        for target in Target::all() {
            let spelled = match target {
                Target::Arduino => "arduino",
                Target::Esp32 => "esp32",
                Target::Rpi => "rpi",
                Target::Pico => "pico",
                Target::Ros2 => "ros2",
            };

            assert_eq!(spelled.parse::<Target>(), Ok(target));
        }

        assert!("avr".parse::<Target>().is_err());
    }
}
