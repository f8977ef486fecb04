//! Rastreo de pines GPIO para diagnóstico de hardware.
//!
//! Recorrido de mejor esfuerzo sobre el AST: solo se registran los
//! operandos de pin que son literales numéricos constantes. El resultado
//! se usa únicamente para reportar un conteo de pines al usuario.

use crate::ast::{Expr, ExprKind, Program, Stmt, StmtKind};

/// Cantidad máxima de pines rastreados.
const MAX_PINS: usize = 50;

/// Recolecta los pines constantes usados por las sentencias de E/S.
pub fn track_pins(program: &Program) -> Vec<i32> {
    let mut pins = Vec::new();

    for stmt in &program.body {
        scan_stmt(stmt, &mut pins);
    }

    pins
}

fn note_pin(pin: &Expr, pins: &mut Vec<i32>) {
    if pins.len() >= MAX_PINS {
        return;
    }

    if let ExprKind::Number(value) = pin.kind {
        let pin = value as i32;
        if !pins.contains(&pin) {
            pins.push(pin);
        }
    }
}

fn scan_stmt(stmt: &Stmt, pins: &mut Vec<i32>) {
    match &stmt.kind {
        StmtKind::GpioWrite { pin, .. }
        | StmtKind::AnalogWrite { pin, .. }
        | StmtKind::ServoWrite { pin, .. }
        | StmtKind::Tone { pin, .. }
        | StmtKind::NoTone { pin } => note_pin(pin, pins),

        StmtKind::Block(stmts) => {
            for stmt in stmts {
                scan_stmt(stmt, pins);
            }
        }

        StmtKind::If {
            then_block,
            else_block,
            ..
        } => {
            scan_stmt(then_block, pins);
            if let Some(else_block) = else_block {
                scan_stmt(else_block, pins);
            }
        }

        StmtKind::While { body, .. }
        | StmtKind::Repeat { body, .. }
        | StmtKind::Forever { body } => scan_stmt(body, pins),

        StmtKind::FunctionDef(def) => {
            if let Some(body) = &def.body {
                scan_stmt(body, pins);
            }
        }

        _ => (),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn pins_of(source: &str) -> Vec<i32> {
        track_pins(&parse::parse(source, 10).expect("parse failed"))
    }

    #[test]
    fn constant_pins_are_collected_once() {
        let pins = pins_of("program { turn on pin 13\nturn off pin 13\nset pin 5 to 128 }");
        assert_eq!(pins, vec![13, 5]);
    }

    #[test]
    fn pins_inside_control_flow_and_functions_are_found() {
        let source = r#"
            def blink(times) { turn on pin 7 }
            program {
                repeat 3 { turn on pin 2 }
                if 1 { servo pin 9 set 90 } else { tone pin 8 freq 440 }
            }
        "#;

        let pins = pins_of(source);
        assert_eq!(pins, vec![7, 2, 9, 8]);
    }

    #[test]
    fn non_constant_pins_are_ignored() {
        let pins = pins_of("program { make var p = 4\nturn on pin p }");
        assert!(pins.is_empty());
    }
}
