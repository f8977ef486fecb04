//! Compilador multiobjetivo para el lenguaje Kinetrix.
//!
//! # Front end
//! Cada programa deriva de un único flujo de código fuente (el driver
//! concatena los módulos instalados antes de esta fase). Este flujo se
//! somete primero a análisis léxico en [`lex`], de lo cual se obtiene un
//! flujo de tokens. El flujo de tokens se dispone en un AST por medio de
//! análisis sintáctico descendente en [`parse`]. Los errores de ambas
//! fases se acumulan en una lista ordenada y acotada definida en
//! [`error`]; la presencia de al menos un error impide el avance a la
//! generación de código.
//!
//! # Back end
//! En esta sección el compilador deja de ser agnóstico al sistema
//! objetivo. El módulo [`codegen`] recorre el AST una vez por objetivo y
//! emite texto fuente idiomático para cada una de las cinco plataformas
//! soportadas: Arduino, ESP32, Raspberry Pi (CPython), Raspberry Pi Pico
//! (MicroPython) y ROS2. El árbol es de solo lectura durante esta fase,
//! por lo cual los distintos backends pueden ejecutarse en cualquier
//! orden sobre el mismo programa.

#[macro_use]
mod macros;

pub mod ast;
pub mod codegen;
pub mod error;
pub mod lex;
pub mod parse;
pub mod pins;
pub mod symbols;
