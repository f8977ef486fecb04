//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone el texto fuente en
//! unidades léxicas denominadas tokens. Los espacios en blanco y los
//! comentarios de línea (iniciados con `#`) se descartan durante esta
//! operación, en un ciclo que admite cualquier cantidad de alternancias
//! entre ambos antes del siguiente token. Cada token emitido está
//! asociado a la línea y columna donde inicia en el código fuente, lo
//! cual permite rastrear errores tanto en esta fase como en constructos
//! más elevados de fases posteriores.
//!
//! # Reglas importantes del lenguaje
//! - El lenguaje es case-sensitive: `Repeat` es un identificador, no la
//!   palabra clave `repeat`.
//! - Los literales de cadena no procesan secuencias de escape, terminan
//!   en la segunda comilla o en el fin del archivo, y se truncan a 255
//!   bytes.
//! - Los literales numéricos admiten dígitos y a lo sumo un punto
//!   decimal. No existe notación hexadecimal en esta gramática.
//! - `true` y `false` se reescriben como literales numéricos `1` y `0`
//!   durante esta fase.
//! - Ciertas palabras reservadas por la gramática (`not`, `for`, `from`,
//!   `const`, `wait_us`, `map`, `constrain`, `abs`, `random`, `min`,
//!   `max`, `freq`) se emiten deliberadamente como identificadores
//!   simples; es el parser, no el lexer, quien reconoce su texto.
//!
//! # Errores
//! El lexer nunca se detiene: un carácter desconocido produce un error
//! léxico, se descarta, y la búsqueda del siguiente token continúa. Una
//! cadena sin terminar produce un error léxico pero emite de todas
//! formas el contenido acumulado.

use crate::error::{ErrorKind, ErrorList};
use std::fmt::{self, Display};
use std::str::{Chars, FromStr};

/// Longitud máxima de un literal de cadena, en bytes.
const MAX_STRING_LEN: usize = 255;

/// Objeto resultante del análisis léxico.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub column: u32,
}

/// Contenido de un token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Fin del flujo de entrada.
    Eof,

    /// Identificador.
    Id(String),

    /// Literal numérico.
    Number(f64),

    /// Literal de cadena.
    Str(String),

    /// Palabra clave.
    Keyword(Keyword),

    /// `=`
    Assign,

    /// `==`
    Eq,

    /// `!=`
    Ne,

    /// `<`
    Lt,

    /// `<=`
    Le,

    /// `>`
    Gt,

    /// `>=`
    Ge,

    /// `+`
    Plus,

    /// `-`
    Minus,

    /// `*`
    Star,

    /// `/`
    Slash,

    /// `%`
    Percent,

    /// `{`
    LBrace,

    /// `}`
    RBrace,

    /// `(`
    LParen,

    /// `)`
    RParen,

    /// `[`
    LBracket,

    /// `]`
    RBracket,

    /// `,`
    Comma,
}

impl Display for TokenKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TokenKind::*;

        match self {
            Eof => fmt.write_str("end of file"),
            Id(name) => write!(fmt, "identifier `{}`", name),
            Number(value) => write!(fmt, "number `{}`", value),
            Str(value) => write!(fmt, "string \"{}\"", value),
            Keyword(keyword) => write!(fmt, "keyword `{}`", keyword),
            Assign => fmt.write_str("`=`"),
            Eq => fmt.write_str("`==`"),
            Ne => fmt.write_str("`!=`"),
            Lt => fmt.write_str("`<`"),
            Le => fmt.write_str("`<=`"),
            Gt => fmt.write_str("`>`"),
            Ge => fmt.write_str("`>=`"),
            Plus => fmt.write_str("`+`"),
            Minus => fmt.write_str("`-`"),
            Star => fmt.write_str("`*`"),
            Slash => fmt.write_str("`/`"),
            Percent => fmt.write_str("`%`"),
            LBrace => fmt.write_str("`{`"),
            RBrace => fmt.write_str("`}`"),
            LParen => fmt.write_str("`(`"),
            RParen => fmt.write_str("`)`"),
            LBracket => fmt.write_str("`[`"),
            RBracket => fmt.write_str("`]`"),
            Comma => fmt.write_str("`,`"),
        }
    }
}

/// Una palabra clave.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    Program,
    Extern,
    Def,
    Repeat,
    Loop,
    Turn,
    On,
    Off,
    Wait,
    Forever,
    If,
    Else,
    Make,
    Var,
    Set,
    Change,
    To,
    By,
    Read,
    Analog,
    Pulse,
    Serial,
    Servo,
    Print,
    Tone,
    NoTone,
    Return,
    While,
    Break,
    Array,
    Size,
    Index,
    Of,
    I2c,
    Begin,
    Start,
    Send,
    Stop,
    Pin,
    Is,
    High,
    Low,
    And,
    Or,
    Sin,
    Cos,
    Tan,
    Sqrt,
    Asin,
    Acos,
    Atan,
    Atan2,
    Include,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("program", Keyword::Program),
    ("extern", Keyword::Extern),
    ("def", Keyword::Def),
    ("repeat", Keyword::Repeat),
    ("loop", Keyword::Loop),
    ("turn", Keyword::Turn),
    ("on", Keyword::On),
    ("off", Keyword::Off),
    ("wait", Keyword::Wait),
    ("forever", Keyword::Forever),
    ("if", Keyword::If),
    ("else", Keyword::Else),
    ("make", Keyword::Make),
    ("var", Keyword::Var),
    ("set", Keyword::Set),
    ("change", Keyword::Change),
    ("to", Keyword::To),
    ("by", Keyword::By),
    ("read", Keyword::Read),
    ("analog", Keyword::Analog),
    ("pulse", Keyword::Pulse),
    ("serial", Keyword::Serial),
    ("servo", Keyword::Servo),
    ("print", Keyword::Print),
    ("tone", Keyword::Tone),
    ("notone", Keyword::NoTone),
    ("return", Keyword::Return),
    ("while", Keyword::While),
    ("break", Keyword::Break),
    ("array", Keyword::Array),
    ("size", Keyword::Size),
    ("index", Keyword::Index),
    ("of", Keyword::Of),
    ("i2c", Keyword::I2c),
    ("begin", Keyword::Begin),
    ("start", Keyword::Start),
    ("send", Keyword::Send),
    ("stop", Keyword::Stop),
    ("pin", Keyword::Pin),
    ("is", Keyword::Is),
    ("high", Keyword::High),
    ("low", Keyword::Low),
    ("and", Keyword::And),
    ("or", Keyword::Or),
    ("sin", Keyword::Sin),
    ("cos", Keyword::Cos),
    ("tan", Keyword::Tan),
    ("sqrt", Keyword::Sqrt),
    ("asin", Keyword::Asin),
    ("acos", Keyword::Acos),
    ("atan", Keyword::Atan),
    ("atan2", Keyword::Atan2),
    ("include", Keyword::Include),
];

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = KEYWORDS
            .iter()
            .find(|&&(_, keyword)| keyword == *self)
            .map(|&(text, _)| text)
            .unwrap_or("?");

        fmt.write_str(text)
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        KEYWORDS
            .iter()
            .find(|&&(name, _)| name == string)
            .map(|&(_, keyword)| keyword)
            .ok_or(())
    }
}

/// Analizador léxico sobre un flujo de caracteres.
///
/// El lexer mantiene exactamente un carácter de lookahead y avanza token
/// por token bajo demanda del parser; no existe un búfer de tokens.
pub struct Lexer<'a> {
    chars: Chars<'a>,
    current: Option<char>,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    /// Crea un lexer en estado inicial a partir del texto fuente.
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.chars();
        let current = chars.next();

        Lexer {
            chars,
            current,
            line: 1,
            column: 1,
        }
    }

    /// Consume el carácter actual y actualiza línea y columna.
    fn advance(&mut self) {
        if self.current == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        self.current = self.chars.next();
    }

    /// Descarta espacios en blanco y comentarios, alternados entre sí
    /// cualquier cantidad de veces.
    fn skip_trivia(&mut self) {
        loop {
            match self.current {
                Some(c) if c.is_ascii_whitespace() => self.advance(),
                Some('#') => {
                    while self.current.is_some() && self.current != Some('\n') {
                        self.advance();
                    }
                }

                _ => break,
            }
        }
    }

    /// Obtiene el siguiente token lógico del flujo.
    ///
    /// Los errores léxicos se reportan a `errors` y no interrumpen el
    /// escaneo: el lexer descarta la entrada problemática y continúa con
    /// el siguiente token.
    pub fn next_token(&mut self, errors: &mut ErrorList) -> Token {
        loop {
            self.skip_trivia();

            let (line, column) = (self.line, self.column);
            let at = |kind| Token { kind, line, column };

            let c = match self.current {
                None => return at(TokenKind::Eof),
                Some(c) => c,
            };

            match c {
                '"' => return at(self.string_literal(errors)),

                '{' => return self.single(at, TokenKind::LBrace),
                '}' => return self.single(at, TokenKind::RBrace),
                '(' => return self.single(at, TokenKind::LParen),
                ')' => return self.single(at, TokenKind::RParen),
                '[' => return self.single(at, TokenKind::LBracket),
                ']' => return self.single(at, TokenKind::RBracket),
                ',' => return self.single(at, TokenKind::Comma),
                '+' => return self.single(at, TokenKind::Plus),
                '-' => return self.single(at, TokenKind::Minus),
                '*' => return self.single(at, TokenKind::Star),
                '/' => return self.single(at, TokenKind::Slash),
                '%' => return self.single(at, TokenKind::Percent),

                '=' => {
                    self.advance();
                    if self.current == Some('=') {
                        self.advance();
                        return at(TokenKind::Eq);
                    }

                    return at(TokenKind::Assign);
                }

                '!' => {
                    self.advance();
                    if self.current == Some('=') {
                        self.advance();
                        return at(TokenKind::Ne);
                    }

                    errors.report(
                        ErrorKind::Lexical,
                        line,
                        column,
                        "Unexpected character: '!'",
                    );
                    continue;
                }

                '<' => {
                    self.advance();
                    if self.current == Some('=') {
                        self.advance();
                        return at(TokenKind::Le);
                    }

                    return at(TokenKind::Lt);
                }

                '>' => {
                    self.advance();
                    if self.current == Some('=') {
                        self.advance();
                        return at(TokenKind::Ge);
                    }

                    return at(TokenKind::Gt);
                }

                c if c.is_ascii_digit() => return at(self.number_literal()),
                c if c.is_ascii_alphabetic() || c == '_' => return at(self.word()),

                c => {
                    errors.report(
                        ErrorKind::Lexical,
                        line,
                        column,
                        format!("Unexpected character: '{}'", c),
                    );
                    self.advance();
                }
            }
        }
    }

    fn single(&mut self, at: impl FnOnce(TokenKind) -> Token, kind: TokenKind) -> Token {
        self.advance();
        at(kind)
    }

    fn string_literal(&mut self, errors: &mut ErrorList) -> TokenKind {
        let (line, column) = (self.line, self.column);
        self.advance();

        let mut value = String::new();
        while let Some(c) = self.current {
            if c == '"' || value.len() >= MAX_STRING_LEN {
                break;
            }

            value.push(c);
            self.advance();
        }

        if self.current == Some('"') {
            self.advance();
        } else if self.current.is_none() {
            errors.report(ErrorKind::Lexical, line, column, "Unterminated string literal");
        }

        TokenKind::Str(value)
    }

    fn number_literal(&mut self) -> TokenKind {
        let mut text = String::new();
        let mut has_dot = false;

        while let Some(c) = self.current {
            if c.is_ascii_digit() {
                text.push(c);
            } else if c == '.' && !has_dot {
                has_dot = true;
                text.push(c);
            } else {
                break;
            }

            self.advance();
        }

        TokenKind::Number(text.parse().unwrap_or(0.0))
    }

    fn word(&mut self) -> TokenKind {
        let mut text = String::new();
        while let Some(c) = self.current {
            if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }

            text.push(c);
            self.advance();
        }

        // Reescritura de literales booleanos
        match text.as_str() {
            "true" => return TokenKind::Number(1.0),
            "false" => return TokenKind::Number(0.0),
            _ => (),
        }

        match Keyword::from_str(&text) {
            Ok(keyword) => TokenKind::Keyword(keyword),
            Err(()) => TokenKind::Id(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &str) -> (Vec<TokenKind>, ErrorList) {
        let mut errors = ErrorList::new(100);
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();

        loop {
            let token = lexer.next_token(&mut errors);
            if token.kind == TokenKind::Eof {
                break;
            }

            tokens.push(token.kind);
        }

        (tokens, errors)
    }

    #[test]
    fn keywords_and_literals() {
        let (tokens, errors) = lex_all("turn on pin 13");
        assert!(!errors.has_errors());
        assert_eq!(
            tokens,
            vec![
                TokenKind::Keyword(Keyword::Turn),
                TokenKind::Keyword(Keyword::On),
                TokenKind::Keyword(Keyword::Pin),
                TokenKind::Number(13.0),
            ]
        );
    }

    #[test]
    fn keywords_are_case_sensitive() {
        let (tokens, _) = lex_all("Repeat repeat");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Id(String::from("Repeat")),
                TokenKind::Keyword(Keyword::Repeat),
            ]
        );
    }

    #[test]
    fn true_and_false_become_numbers() {
        let (tokens, _) = lex_all("true false");
        assert_eq!(tokens, vec![TokenKind::Number(1.0), TokenKind::Number(0.0)]);
    }

    #[test]
    fn parser_reserved_words_stay_identifiers() {
        for word in &["not", "for", "from", "const", "wait_us", "map", "constrain", "abs"] {
            let (tokens, _) = lex_all(word);
            assert_eq!(tokens, vec![TokenKind::Id(String::from(*word))], "{}", word);
        }
    }

    #[test]
    fn comments_interleave_with_whitespace() {
        let (tokens, errors) = lex_all("# first\n  # second\nwait # trailing\n100");
        assert!(!errors.has_errors());
        assert_eq!(
            tokens,
            vec![TokenKind::Keyword(Keyword::Wait), TokenKind::Number(100.0)]
        );
    }

    #[test]
    fn two_character_operators() {
        let (tokens, _) = lex_all("== != <= >= < > =");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Eq,
                TokenKind::Ne,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Assign,
            ]
        );
    }

    #[test]
    fn numbers_take_at_most_one_dot() {
        let (tokens, _) = lex_all("3.14 1.2.3");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Number(3.14),
                TokenKind::Number(1.2),
                // El segundo punto termina el literal y no forma token
                TokenKind::Number(3.0),
            ]
        );
    }

    #[test]
    fn hex_literals_are_not_recognized() {
        // `0x68` se descompone en el número 0 y el identificador `x68`
        let (tokens, _) = lex_all("0x68");
        assert_eq!(
            tokens,
            vec![TokenKind::Number(0.0), TokenKind::Id(String::from("x68"))]
        );
    }

    #[test]
    fn unknown_character_is_skipped_and_reported() {
        let (tokens, errors) = lex_all("wait $ 100");
        assert_eq!(errors.len(), 1);
        assert_eq!(
            tokens,
            vec![TokenKind::Keyword(Keyword::Wait), TokenKind::Number(100.0)]
        );
    }

    #[test]
    fn unterminated_string_reports_but_still_lexes() {
        let (tokens, errors) = lex_all("print \"hello");
        assert_eq!(errors.len(), 1);
        assert_eq!(
            tokens,
            vec![
                TokenKind::Keyword(Keyword::Print),
                TokenKind::Str(String::from("hello")),
            ]
        );
    }

    #[test]
    fn string_truncates_at_255_bytes() {
        let long = "a".repeat(300);
        let (tokens, _) = lex_all(&format!("\"{}\"", long));
        match &tokens[0] {
            TokenKind::Str(s) => assert_eq!(s.len(), 255),
            other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn tokens_carry_line_and_column() {
        let mut errors = ErrorList::new(10);
        let mut lexer = Lexer::new("wait\n  100");

        let first = lexer.next_token(&mut errors);
        assert_eq!((first.line, first.column), (1, 1));

        let second = lexer.next_token(&mut errors);
        assert_eq!((second.line, second.column), (2, 3));
    }
}
