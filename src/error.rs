//! Acumulación y reporte de errores de compilación.
//!
//! Todas las fases delanteras reportan sus errores a una misma
//! [`ErrorList`] ordenada. La lista se encuentra acotada por un máximo
//! definido por el invocador: una vez alcanzado el límite, los errores
//! subsiguientes se descartan en silencio en vez de abortar la
//! compilación. Las fases continúan ejecutándose hasta el final de la
//! entrada sin importar cuántos errores hayan ocurrido.

use std::fmt::{self, Display};
use thiserror::Error;

/// Clase de error reportable.
///
/// Las clases `Semantic`, `Type` e `Internal` existen en la taxonomía
/// para verificaciones futuras; el front end actual emite `Semantic`
/// solamente para control de flujo fuera de contexto.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Lexical,
    Syntax,
    Semantic,
    Type,
    Internal,
}

impl Display for ErrorKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Lexical => "Lexical Error",
            ErrorKind::Syntax => "Syntax Error",
            ErrorKind::Semantic => "Semantic Error",
            ErrorKind::Type => "Type Error",
            ErrorKind::Internal => "Internal Error",
        };

        fmt.write_str(name)
    }
}

/// Un error con ubicación en el código fuente original.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} at line {line}, column {column}: {message}")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

/// Lista ordenada y acotada de errores.
#[derive(Debug)]
pub struct ErrorList {
    errors: Vec<CompileError>,
    max_errors: usize,
}

impl ErrorList {
    /// Crea una lista vacía que acepta hasta `max_errors` errores.
    pub fn new(max_errors: usize) -> Self {
        ErrorList {
            errors: Vec::new(),
            max_errors,
        }
    }

    /// Agrega un error a la lista, descartándolo si se alcanzó el límite.
    pub fn report<S: Into<String>>(&mut self, kind: ErrorKind, line: u32, column: u32, message: S) {
        if self.errors.len() >= self.max_errors {
            return;
        }

        self.errors.push(CompileError {
            kind,
            line,
            column,
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompileError> {
        self.errors.iter()
    }
}

impl Display for ErrorList {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(fmt, "{}", error)?;
        }

        if !self.errors.is_empty() {
            writeln!(fmt, "\n{} error(s) found.", self.errors.len())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_kept_in_report_order() {
        let mut errors = ErrorList::new(10);
        errors.report(ErrorKind::Lexical, 1, 1, "first");
        errors.report(ErrorKind::Syntax, 2, 5, "second");

        let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["first", "second"]);
        assert_eq!(errors.iter().next().unwrap().kind, ErrorKind::Lexical);
    }

    #[test]
    fn reports_past_the_cap_are_dropped() {
        let mut errors = ErrorList::new(2);
        for i in 0..5 {
            errors.report(ErrorKind::Syntax, i, 1, format!("error {}", i));
        }

        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.message != "error 2"));
    }

    #[test]
    fn display_includes_location_and_kind() {
        let error = CompileError {
            kind: ErrorKind::Syntax,
            line: 3,
            column: 7,
            message: String::from("Expected `{`"),
        };

        assert_eq!(
            error.to_string(),
            "Syntax Error at line 3, column 7: Expected `{`"
        );
    }
}
