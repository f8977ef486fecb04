//! Análisis sintáctico descendente.
//!
//! El parser consume el único token de lookahead del lexer y produce la
//! raíz del programa, acumulando errores sin abortar: ante un token
//! inesperado dentro de un bloque se reporta el error, se avanza
//! exactamente un token y el análisis continúa hasta el fin de la
//! entrada. La gramática de expresiones tiene tres niveles de
//! precedencia (aritmético, comparación, lógico); cada nivel es un
//! plegado plano asociativo por la izquierda, por lo cual `a + b * c`
//! se agrupa como `(a + b) * c` y la aritmética mixta debe escribirse
//! con paréntesis explícitos.

use crate::ast::{BinOp, Expr, ExprKind, FunctionDef, MathFunc, Program, Stmt, StmtKind, Type, UnOp};
use crate::error::{ErrorKind, ErrorList};
use crate::lex::{Keyword, Lexer, Token, TokenKind};
use crate::symbols::{SymbolKind, SymbolTable};

/// Analiza una unidad de compilación completa.
///
/// Retorna el programa solamente si no se acumuló ningún error; en caso
/// contrario la lista de errores reemplaza al árbol y la generación de
/// código no debe ejecutarse.
pub fn parse(source: &str, max_errors: usize) -> Result<Program, ErrorList> {
    let mut parser = Parser::new(source, max_errors);
    let program = parser.program();

    if parser.errors.has_errors() {
        Err(parser.errors)
    } else {
        Ok(program)
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    errors: ErrorList,
    symbols: SymbolTable,
    in_loop: u32,
    in_function: u32,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, max_errors: usize) -> Self {
        let mut lexer = Lexer::new(source);
        let mut errors = ErrorList::new(max_errors);
        let current = lexer.next_token(&mut errors);

        Parser {
            lexer,
            current,
            errors,
            symbols: SymbolTable::new(),
            in_loop: 0,
            in_function: 0,
        }
    }

    // ── Token helpers ─────────────────────────────────────────────────

    fn advance(&mut self) {
        self.current = self.lexer.next_token(&mut self.errors);
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.current.kind == *kind
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.current.kind == TokenKind::Keyword(keyword)
    }

    fn check_word(&self, text: &str) -> bool {
        matches!(&self.current.kind, TokenKind::Id(name) if name == text)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }

        false
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        self.eat(&TokenKind::Keyword(keyword))
    }

    fn expect(&mut self, kind: &TokenKind) -> bool {
        if self.eat(kind) {
            return true;
        }

        self.syntax_error(format!("Expected {}, found {}", kind, self.current.kind));
        false
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> bool {
        self.expect(&TokenKind::Keyword(keyword))
    }

    fn identifier(&mut self) -> Option<String> {
        if let TokenKind::Id(name) = &self.current.kind {
            let name = name.clone();
            self.advance();
            return Some(name);
        }

        self.syntax_error(format!("Expected identifier, found {}", self.current.kind));
        None
    }

    fn syntax_error<S: Into<String>>(&mut self, message: S) {
        self.errors.report(
            ErrorKind::Syntax,
            self.current.line,
            self.current.column,
            message,
        );
    }

    fn semantic_error<S: Into<String>>(&mut self, message: S) {
        self.errors.report(
            ErrorKind::Semantic,
            self.current.line,
            self.current.column,
            message,
        );
    }

    fn position(&self) -> (u32, u32) {
        (self.current.line, self.current.column)
    }

    // ── Program structure ─────────────────────────────────────────────

    fn program(&mut self) -> Program {
        // Las directivas include ya fueron resueltas por el driver; aquí
        // solo se consumen y descartan.
        while self.eat_keyword(Keyword::Include) {
            if matches!(self.current.kind, TokenKind::Str(_)) {
                self.advance();
            } else {
                self.syntax_error("Expected string literal after `include`");
            }
        }

        let mut body = Vec::new();

        while self.check_keyword(Keyword::Def) || self.check_keyword(Keyword::Extern) {
            if let Some(stmt) = self.statement() {
                body.push(stmt);
            }
        }

        self.eat_keyword(Keyword::Program);

        if self.eat(&TokenKind::LBrace) {
            let line = self.current.line;
            if let StmtKind::Block(stmts) = self.block_body(line).kind {
                body.extend(stmts);
            }

            self.expect(&TokenKind::RBrace);
        }

        Program {
            body,
            pins_used: Vec::new(),
        }
    }

    /// Secuencia de sentencias hasta `}` o fin de archivo.
    ///
    /// Un token que no inicia ninguna sentencia se reporta y se descarta
    /// (exactamente uno), garantizando progreso.
    fn block_body(&mut self, line: u32) -> Stmt {
        let mut statements = Vec::new();

        while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
            match self.statement() {
                Some(stmt) => statements.push(stmt),
                None => {
                    self.syntax_error("Unexpected token, skipping");
                    self.advance();
                }
            }
        }

        Stmt::new(StmtKind::Block(statements), line)
    }

    fn braced_block(&mut self) -> Stmt {
        let line = self.current.line;
        self.expect(&TokenKind::LBrace);
        let block = self.block_body(line);
        self.expect(&TokenKind::RBrace);
        block
    }

    // ── Statements ────────────────────────────────────────────────────

    fn statement(&mut self) -> Option<Stmt> {
        let line = self.current.line;

        match self.current.kind.clone() {
            TokenKind::Keyword(keyword) => match keyword {
                Keyword::Make => Some(self.make_statement(line)),
                Keyword::Set => Some(self.set_statement(line)),
                Keyword::Change => Some(self.change_statement(line)),
                Keyword::Turn => Some(self.turn_statement(line)),
                Keyword::Wait => Some(self.wait_statement(line)),
                Keyword::Print => Some(self.print_statement(line)),
                Keyword::I2c => self.i2c_statement(line),
                Keyword::If => Some(self.if_statement(line)),
                Keyword::While => Some(self.while_statement(line)),
                Keyword::Extern => Some(self.extern_statement(line)),
                Keyword::Def => Some(self.def_statement(line)),
                Keyword::Loop => Some(self.forever_statement(line)),
                Keyword::Repeat => Some(self.repeat_statement(line)),
                Keyword::Return => Some(self.return_statement(line)),
                Keyword::Break => Some(self.break_statement(line)),
                Keyword::Servo => Some(self.servo_statement(line)),
                Keyword::Tone => Some(self.tone_statement(line)),
                Keyword::NoTone => Some(self.notone_statement(line)),
                _ => None,
            },

            TokenKind::Id(name) => Some(self.identifier_statement(name, line)),
            _ => None,
        }
    }

    fn make_statement(&mut self, line: u32) -> Stmt {
        self.advance();

        if self.eat_keyword(Keyword::Array) {
            let name = self.identifier().unwrap_or_default();
            self.expect_keyword(Keyword::Size);

            let size = if let TokenKind::Number(value) = self.current.kind {
                self.advance();
                value as i32
            } else {
                self.syntax_error(format!("Expected array size, found {}", self.current.kind));
                Type::DYNAMIC
            };

            let ty = Type::Array {
                element: Box::new(Type::Float),
                size,
            };
            self.symbols.define(&name, SymbolKind::Variable, ty, line);

            return Stmt::new(StmtKind::ArrayDecl { name, size }, line);
        }

        self.expect_keyword(Keyword::Var);
        let name = self.identifier().unwrap_or_default();

        let init = if self.eat(&TokenKind::Assign) {
            Some(self.expression())
        } else {
            None
        };

        self.symbols
            .define(&name, SymbolKind::Variable, Type::Inferred, line);

        Stmt::new(StmtKind::VarDecl { name, init }, line)
    }

    fn set_statement(&mut self, line: u32) -> Stmt {
        self.advance();

        // La forma `set pin P to V` es siempre una escritura analógica;
        // no existe variante digital de esta sentencia.
        if self.eat_keyword(Keyword::Pin) {
            let pin = self.expression();
            self.expect_keyword(Keyword::To);
            let value = self.expression();
            return Stmt::new(StmtKind::AnalogWrite { pin, value }, line);
        }

        let target = if self.eat_keyword(Keyword::Index) {
            let index = self.expression();
            self.expect_keyword(Keyword::Of);
            let array = self.identifier().unwrap_or_default();

            Expr::new(
                ExprKind::ArrayAccess {
                    array: Box::new(Expr::ident(array, line)),
                    index: Box::new(index),
                },
                line,
            )
        } else {
            let name = self.identifier().unwrap_or_default();
            Expr::ident(name, line)
        };

        self.expect_keyword(Keyword::To);
        let value = self.expression();
        Stmt::new(StmtKind::Assign { target, value }, line)
    }

    fn change_statement(&mut self, line: u32) -> Stmt {
        self.advance();
        let name = self.identifier().unwrap_or_default();
        self.expect_keyword(Keyword::By);
        let delta = self.expression();

        // Desugar: `change x by d` es `x = x + d`
        let value = Expr::binary(BinOp::Add, Expr::ident(name.clone(), line), delta, line);
        Stmt::new(
            StmtKind::Assign {
                target: Expr::ident(name, line),
                value,
            },
            line,
        )
    }

    fn turn_statement(&mut self, line: u32) -> Stmt {
        self.advance();
        let is_on = self.check_keyword(Keyword::On);
        if !self.eat_keyword(Keyword::On) && !self.eat_keyword(Keyword::Off) {
            self.syntax_error(format!("Expected `on` or `off`, found {}", self.current.kind));
        }

        self.expect_keyword(Keyword::Pin);
        let pin = self.expression();
        let value = Expr::number(if is_on { 1.0 } else { 0.0 }, line);

        Stmt::new(StmtKind::GpioWrite { pin, value }, line)
    }

    fn wait_statement(&mut self, line: u32) -> Stmt {
        self.advance();
        let duration = self.expression();
        Stmt::new(StmtKind::Wait { duration }, line)
    }

    fn print_statement(&mut self, line: u32) -> Stmt {
        self.advance();
        let value = self.expression();
        Stmt::new(StmtKind::Print { value }, line)
    }

    fn i2c_statement(&mut self, line: u32) -> Option<Stmt> {
        self.advance();

        if self.eat_keyword(Keyword::Begin) {
            return Some(Stmt::new(StmtKind::I2cBegin, line));
        }

        if self.eat_keyword(Keyword::Start) {
            let address = self.expression();
            return Some(Stmt::new(StmtKind::I2cStart { address }, line));
        }

        if self.eat_keyword(Keyword::Send) {
            let data = self.expression();
            return Some(Stmt::new(StmtKind::I2cSend { data }, line));
        }

        if self.eat_keyword(Keyword::Stop) {
            return Some(Stmt::new(StmtKind::I2cStop, line));
        }

        self.syntax_error(format!(
            "Expected `begin`, `start`, `send` or `stop` after `i2c`, found {}",
            self.current.kind
        ));
        None
    }

    fn if_statement(&mut self, line: u32) -> Stmt {
        self.advance();
        let condition = self.expression();
        let then_block = Box::new(self.braced_block());

        let else_block = if self.eat_keyword(Keyword::Else) {
            if self.check_keyword(Keyword::If) {
                // `else if` se anida recursivamente como un `if` dentro
                // de un bloque de una sola sentencia
                let elif_line = self.current.line;
                let elif = self.if_statement(elif_line);
                Some(Box::new(Stmt::new(StmtKind::Block(vec![elif]), elif_line)))
            } else {
                Some(Box::new(self.braced_block()))
            }
        } else {
            None
        };

        Stmt::new(
            StmtKind::If {
                condition,
                then_block,
                else_block,
            },
            line,
        )
    }

    fn while_statement(&mut self, line: u32) -> Stmt {
        self.advance();
        let condition = self.expression();

        self.in_loop += 1;
        let body = Box::new(self.braced_block());
        self.in_loop -= 1;

        Stmt::new(StmtKind::While { condition, body }, line)
    }

    fn extern_statement(&mut self, line: u32) -> Stmt {
        self.advance();

        let lang = if let TokenKind::Str(lang) = &self.current.kind {
            let lang = lang.clone();
            self.advance();
            lang
        } else {
            self.syntax_error(format!(
                "Expected language string after `extern`, found {}",
                self.current.kind
            ));
            String::new()
        };

        self.expect_keyword(Keyword::Def);
        let name = self.identifier().unwrap_or_default();
        let params = self.parameter_list();
        let param_types = vec![Type::Float; params.len()];

        let ty = Type::Function {
            ret: Box::new(Type::Void),
            params: param_types.clone(),
        };
        self.symbols.define(&name, SymbolKind::Function, ty, line);

        Stmt::new(
            StmtKind::FunctionDef(FunctionDef {
                name,
                params,
                param_types,
                return_type: Type::Void,
                body: None,
                extern_lang: Some(lang),
            }),
            line,
        )
    }

    fn def_statement(&mut self, line: u32) -> Stmt {
        self.advance();
        let name = self.identifier().unwrap_or_default();
        let params = self.parameter_list();

        // No existe sintaxis de tipos declarados: todo parámetro es float
        let param_types = vec![Type::Float; params.len()];
        let ty = Type::Function {
            ret: Box::new(Type::Void),
            params: param_types.clone(),
        };
        self.symbols.define(&name, SymbolKind::Function, ty, line);

        self.expect(&TokenKind::LBrace);
        self.in_function += 1;
        self.symbols.enter_scope();
        for param in &params {
            self.symbols
                .define(param, SymbolKind::Parameter, Type::Float, line);
        }

        let body = self.block_body(line);

        self.symbols.exit_scope();
        self.in_function -= 1;
        self.expect(&TokenKind::RBrace);

        Stmt::new(
            StmtKind::FunctionDef(FunctionDef {
                name,
                params,
                param_types,
                return_type: Type::Void,
                body: Some(Box::new(body)),
                extern_lang: None,
            }),
            line,
        )
    }

    fn parameter_list(&mut self) -> Vec<String> {
        self.expect(&TokenKind::LParen);
        let mut params = Vec::new();

        while !self.check(&TokenKind::RParen) && !self.check(&TokenKind::Eof) {
            match self.identifier() {
                Some(param) => params.push(param),
                None => self.advance(),
            }

            if self.check(&TokenKind::Comma) {
                self.advance();
            }
        }

        self.expect(&TokenKind::RParen);
        params
    }

    fn forever_statement(&mut self, line: u32) -> Stmt {
        self.advance();
        self.expect_keyword(Keyword::Forever);

        self.in_loop += 1;
        let body = Box::new(self.braced_block());
        self.in_loop -= 1;

        Stmt::new(StmtKind::Forever { body }, line)
    }

    fn repeat_statement(&mut self, line: u32) -> Stmt {
        self.advance();
        let count = self.expression();

        self.in_loop += 1;
        let body = Box::new(self.braced_block());
        self.in_loop -= 1;

        Stmt::new(StmtKind::Repeat { count, body }, line)
    }

    fn return_statement(&mut self, line: u32) -> Stmt {
        self.advance();

        if self.in_function == 0 {
            self.semantic_error("`return` outside of a function");
        }

        let value = if self.check(&TokenKind::RBrace) {
            None
        } else {
            Some(self.expression())
        };

        Stmt::new(StmtKind::Return(value), line)
    }

    fn break_statement(&mut self, line: u32) -> Stmt {
        self.advance();

        if self.in_loop == 0 {
            self.semantic_error("`break` outside of a loop");
        }

        Stmt::new(StmtKind::Break, line)
    }

    fn servo_statement(&mut self, line: u32) -> Stmt {
        self.advance();
        self.eat_keyword(Keyword::Pin);
        let pin = self.expression();
        self.eat_keyword(Keyword::Set);
        let angle = self.expression();

        Stmt::new(StmtKind::ServoWrite { pin, angle }, line)
    }

    fn tone_statement(&mut self, line: u32) -> Stmt {
        self.advance();
        self.eat_keyword(Keyword::Pin);
        let pin = self.expression();

        // `freq` es azúcar opcional entre pin y frecuencia
        if self.check_word("freq") {
            self.advance();
        }

        let frequency = self.expression();
        Stmt::new(StmtKind::Tone { pin, frequency }, line)
    }

    fn notone_statement(&mut self, line: u32) -> Stmt {
        self.advance();
        self.eat_keyword(Keyword::Pin);
        let pin = self.expression();
        Stmt::new(StmtKind::NoTone { pin }, line)
    }

    /// Sentencias que comienzan con un identificador: los pseudo-keywords
    /// `for`, `const` y `wait_us`, llamadas a funciones de usuario y
    /// asignaciones sin `set`.
    fn identifier_statement(&mut self, name: String, line: u32) -> Stmt {
        match name.as_str() {
            "for" => return self.for_statement(line),
            "const" => return self.const_statement(line),
            "wait_us" => return self.wait_us_statement(line),
            _ => (),
        }

        self.advance();

        if self.eat(&TokenKind::LParen) {
            let mut args = Vec::new();
            while !self.check(&TokenKind::RParen) && !self.check(&TokenKind::Eof) {
                let before = self.position();
                args.push(self.expression());

                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else if self.position() == before {
                    // La expresión no consumió nada; forzar progreso
                    self.advance();
                }
            }

            self.expect(&TokenKind::RParen);
            return Stmt::new(
                StmtKind::Expr(Expr::new(ExprKind::Call { name, args }, line)),
                line,
            );
        }

        if self.eat(&TokenKind::Assign) {
            let value = self.expression();
            return Stmt::new(
                StmtKind::Assign {
                    target: Expr::ident(name, line),
                    value,
                },
                line,
            );
        }

        Stmt::new(StmtKind::Expr(Expr::ident(name, line)), line)
    }

    fn for_statement(&mut self, line: u32) -> Stmt {
        self.advance();
        let var = self.identifier().unwrap_or_default();

        if self.check_word("from") {
            self.advance();
        }
        let start = self.expression();
        self.eat_keyword(Keyword::To);
        let end = self.expression();

        self.expect(&TokenKind::LBrace);
        self.in_loop += 1;
        let body = self.block_body(line);
        self.in_loop -= 1;
        self.expect(&TokenKind::RBrace);

        self.symbols
            .define(&var, SymbolKind::Variable, Type::Inferred, line);

        // Desugar: { var i = start; while i <= end { body; i = i + 1 } }
        let increment = Stmt::new(
            StmtKind::Assign {
                target: Expr::ident(var.clone(), line),
                value: Expr::binary(
                    BinOp::Add,
                    Expr::ident(var.clone(), line),
                    Expr::number(1.0, line),
                    line,
                ),
            },
            line,
        );

        let Stmt { kind, .. } = body;
        let mut body_stmts = match kind {
            StmtKind::Block(stmts) => stmts,
            other => vec![Stmt::new(other, line)],
        };
        body_stmts.push(increment);

        let condition = Expr::binary(BinOp::Le, Expr::ident(var.clone(), line), end, line);
        let while_stmt = Stmt::new(
            StmtKind::While {
                condition,
                body: Box::new(Stmt::new(StmtKind::Block(body_stmts), line)),
            },
            line,
        );
        let init = Stmt::new(
            StmtKind::VarDecl {
                name: var,
                init: Some(start),
            },
            line,
        );

        Stmt::new(StmtKind::Block(vec![init, while_stmt]), line)
    }

    fn const_statement(&mut self, line: u32) -> Stmt {
        self.advance();
        let name = self.identifier().unwrap_or_default();
        self.expect(&TokenKind::Assign);
        let value = self.expression();

        self.symbols
            .define(&name, SymbolKind::Variable, Type::Inferred, line);

        // Se trata como una variable común
        Stmt::new(
            StmtKind::VarDecl {
                name,
                init: Some(value),
            },
            line,
        )
    }

    fn wait_us_statement(&mut self, line: u32) -> Stmt {
        self.advance();
        let duration = self.expression();

        // Se reescribe como llamada; cada backend la baja a su primitiva
        // de espera en microsegundos
        Stmt::new(
            StmtKind::Expr(Expr::new(
                ExprKind::Call {
                    name: String::from("delayMicroseconds"),
                    args: vec![duration],
                },
                line,
            )),
            line,
        )
    }

    // ── Expressions ───────────────────────────────────────────────────

    fn expression(&mut self) -> Expr {
        let mut left = self.comparison();

        loop {
            let op = match self.current.kind {
                TokenKind::Keyword(Keyword::And) => BinOp::And,
                TokenKind::Keyword(Keyword::Or) => BinOp::Or,
                _ => break,
            };

            self.advance();
            let right = self.comparison();
            let line = left.line;
            left = Expr::binary(op, left, right, line);
        }

        left
    }

    fn comparison(&mut self) -> Expr {
        let mut left = self.arithmetic();

        loop {
            let op = match self.current.kind {
                TokenKind::Eq => BinOp::Eq,
                TokenKind::Ne => BinOp::Ne,
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Le => BinOp::Le,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Ge => BinOp::Ge,
                TokenKind::Keyword(Keyword::Is) => BinOp::Eq,
                _ => break,
            };

            self.advance();
            let right = self.arithmetic();
            let line = left.line;
            left = Expr::binary(op, left, right, line);
        }

        left
    }

    fn arithmetic(&mut self) -> Expr {
        let mut left = self.primary();

        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };

            self.advance();
            let right = self.primary();
            let line = left.line;
            left = Expr::binary(op, left, right, line);
        }

        left
    }

    fn primary(&mut self) -> Expr {
        let line = self.current.line;

        match self.current.kind.clone() {
            TokenKind::Number(value) => {
                self.advance();
                Expr::number(value, line)
            }

            TokenKind::Str(value) => {
                self.advance();
                Expr::new(ExprKind::Str(value), line)
            }

            TokenKind::Keyword(Keyword::High) => {
                self.advance();
                Expr::number(1.0, line)
            }

            TokenKind::Keyword(Keyword::Low) => {
                self.advance();
                Expr::number(0.0, line)
            }

            TokenKind::LParen => {
                self.advance();
                let expr = self.expression();
                self.expect(&TokenKind::RParen);
                expr
            }

            TokenKind::Keyword(Keyword::Read) => self.read_expression(line),

            TokenKind::Keyword(keyword) if math_func(keyword).is_some() => {
                let func = math_func(keyword).expect("guarded by match arm");
                self.advance();
                self.expect(&TokenKind::LParen);
                let arg1 = Box::new(self.expression());

                let arg2 = if func == MathFunc::Atan2 {
                    self.expect(&TokenKind::Comma);
                    Some(Box::new(self.expression()))
                } else {
                    None
                };

                self.expect(&TokenKind::RParen);
                Expr::new(ExprKind::MathCall { func, arg1, arg2 }, line)
            }

            TokenKind::Id(name) => match name.as_str() {
                "not" => {
                    self.advance();
                    let operand = Box::new(self.primary());
                    Expr::new(
                        ExprKind::Unary {
                            op: UnOp::Not,
                            operand,
                        },
                        line,
                    )
                }

                // Funciones incorporadas de aridad fija
                "map" => self.builtin_call("map", 5, line),
                "constrain" => self.builtin_call("constrain", 3, line),
                "abs" => self.builtin_call("abs", 1, line),
                "random" => self.builtin_call("random", 2, line),
                "min" => self.builtin_call("min", 2, line),
                "max" => self.builtin_call("max", 2, line),

                _ => {
                    self.advance();

                    if self.eat(&TokenKind::LParen) {
                        let mut args = Vec::new();
                        while !self.check(&TokenKind::RParen) && !self.check(&TokenKind::Eof) {
                            let before = self.position();
                            args.push(self.expression());

                            if self.check(&TokenKind::Comma) {
                                self.advance();
                            } else if self.position() == before {
                                self.advance();
                            }
                        }

                        self.expect(&TokenKind::RParen);
                        return Expr::new(ExprKind::Call { name, args }, line);
                    }

                    if self.eat(&TokenKind::LBracket) {
                        let index = Box::new(self.expression());
                        self.expect(&TokenKind::RBracket);
                        return Expr::new(
                            ExprKind::ArrayAccess {
                                array: Box::new(Expr::ident(name, line)),
                                index,
                            },
                            line,
                        );
                    }

                    Expr::ident(name, line)
                }
            },

            TokenKind::Minus => {
                self.advance();
                let operand = Box::new(self.primary());
                Expr::new(
                    ExprKind::Unary {
                        op: UnOp::Neg,
                        operand,
                    },
                    line,
                )
            }

            _ => {
                self.syntax_error(format!(
                    "Unexpected token in expression: {}",
                    self.current.kind
                ));

                // Recuperación: la expresión degrada a cero sin consumir
                Expr::number(0.0, line)
            }
        }
    }

    fn read_expression(&mut self, line: u32) -> Expr {
        self.advance();

        if self.eat_keyword(Keyword::Analog) {
            self.expect_keyword(Keyword::Pin);
            let pin = Box::new(self.expression());
            return Expr::new(ExprKind::AnalogRead(pin), line);
        }

        if self.eat_keyword(Keyword::Pulse) {
            self.expect_keyword(Keyword::Pin);
            let pin = Box::new(self.expression());
            return Expr::new(ExprKind::PulseRead(pin), line);
        }

        if self.eat_keyword(Keyword::I2c) {
            let address = Box::new(self.expression());
            return Expr::new(ExprKind::I2cRead(address), line);
        }

        if self.eat_keyword(Keyword::Serial) {
            // Sin lectura serial portable; degrada a cero
            return Expr::number(0.0, line);
        }

        // Por omisión: lectura digital
        self.expect_keyword(Keyword::Pin);
        let pin = Box::new(self.expression());
        Expr::new(ExprKind::GpioRead(pin), line)
    }

    fn builtin_call(&mut self, name: &str, arity: usize, line: u32) -> Expr {
        self.advance();
        self.expect(&TokenKind::LParen);

        let mut args = Vec::new();
        for i in 0..arity {
            if i > 0 {
                self.expect(&TokenKind::Comma);
            }

            args.push(self.expression());
        }

        self.expect(&TokenKind::RParen);
        Expr::new(
            ExprKind::Call {
                name: String::from(name),
                args,
            },
            line,
        )
    }
}

fn math_func(keyword: Keyword) -> Option<MathFunc> {
    match keyword {
        Keyword::Sin => Some(MathFunc::Sin),
        Keyword::Cos => Some(MathFunc::Cos),
        Keyword::Tan => Some(MathFunc::Tan),
        Keyword::Sqrt => Some(MathFunc::Sqrt),
        Keyword::Asin => Some(MathFunc::Asin),
        Keyword::Acos => Some(MathFunc::Acos),
        Keyword::Atan => Some(MathFunc::Atan),
        Keyword::Atan2 => Some(MathFunc::Atan2),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Program {
        parse(source, 10).expect("parse failed")
    }

    #[test]
    fn turn_statement_becomes_gpio_write() {
        let program = parse_ok("program { turn on pin 13 }");
        assert_eq!(program.body.len(), 1);

        match &program.body[0].kind {
            StmtKind::GpioWrite { pin, value } => {
                assert_eq!(pin.kind, ExprKind::Number(13.0));
                assert_eq!(value.kind, ExprKind::Number(1.0));
            }
            other => panic!("expected GpioWrite, got {:?}", other),
        }
    }

    #[test]
    fn set_pin_is_always_an_analog_write() {
        let program = parse_ok("program { set pin 5 to 128 }");
        assert!(matches!(
            program.body[0].kind,
            StmtKind::AnalogWrite { .. }
        ));
    }

    #[test]
    fn set_variable_is_an_assignment() {
        let program = parse_ok("program { make var x\nset x to 3 }");
        match &program.body[1].kind {
            StmtKind::Assign { target, .. } => {
                assert_eq!(target.kind, ExprKind::Ident(String::from("x")));
            }
            other => panic!("expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn set_index_assigns_through_array_access() {
        let program = parse_ok("program { make array buf size 4\nset index 2 of buf to 9 }");
        match &program.body[1].kind {
            StmtKind::Assign { target, .. } => {
                assert!(matches!(target.kind, ExprKind::ArrayAccess { .. }));
            }
            other => panic!("expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn change_desugars_to_self_addition() {
        let program = parse_ok("program { make var x = 0\nchange x by 5 }");
        match &program.body[1].kind {
            StmtKind::Assign { target, value } => {
                assert_eq!(target.kind, ExprKind::Ident(String::from("x")));
                match &value.kind {
                    ExprKind::Binary { op, left, .. } => {
                        assert_eq!(*op, BinOp::Add);
                        assert_eq!(left.kind, ExprKind::Ident(String::from("x")));
                    }
                    other => panic!("expected Binary, got {:?}", other),
                }
            }
            other => panic!("expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn arithmetic_is_a_flat_left_fold() {
        // Sin precedencia entre operadores aritméticos: (1 + 2) * 3
        let program = parse_ok("program { make var x = 1 + 2 * 3 }");
        match &program.body[0].kind {
            StmtKind::VarDecl { init: Some(init), .. } => match &init.kind {
                ExprKind::Binary { op, left, right } => {
                    assert_eq!(*op, BinOp::Mul);
                    assert_eq!(right.kind, ExprKind::Number(3.0));
                    assert!(matches!(
                        left.kind,
                        ExprKind::Binary { op: BinOp::Add, .. }
                    ));
                }
                other => panic!("expected Binary, got {:?}", other),
            },
            other => panic!("expected VarDecl, got {:?}", other),
        }
    }

    #[test]
    fn is_keyword_compares_for_equality() {
        let program = parse_ok("program { if a is 1 { } }");
        match &program.body[0].kind {
            StmtKind::If { condition, .. } => {
                assert!(matches!(
                    condition.kind,
                    ExprKind::Binary { op: BinOp::Eq, .. }
                ));
            }
            other => panic!("expected If, got {:?}", other),
        }
    }

    #[test]
    fn else_if_nests_recursively_in_single_statement_blocks() {
        let source = r#"program {
            if a is 1 { print "yes" }
            else if a is 2 { print "two" }
            else { print "other" }
        }"#;

        let program = parse_ok(source);
        let (else_block, _) = match &program.body[0].kind {
            StmtKind::If {
                else_block: Some(else_block),
                then_block,
                ..
            } => (else_block, then_block),
            other => panic!("expected If with else, got {:?}", other),
        };

        // La rama else es un bloque de una sola sentencia que envuelve
        // al siguiente if, no una lista aplanada de alternativas
        match &else_block.kind {
            StmtKind::Block(stmts) => {
                assert_eq!(stmts.len(), 1);
                match &stmts[0].kind {
                    StmtKind::If {
                        else_block: Some(inner_else),
                        ..
                    } => {
                        assert!(matches!(inner_else.kind, StmtKind::Block(_)));
                    }
                    other => panic!("expected nested If, got {:?}", other),
                }
            }
            other => panic!("expected Block, got {:?}", other),
        }
    }

    #[test]
    fn for_desugars_into_var_decl_and_while() {
        let program = parse_ok("program { for i from 0 to 9 { wait 1 } }");
        match &program.body[0].kind {
            StmtKind::Block(stmts) => {
                assert_eq!(stmts.len(), 2);
                assert!(matches!(stmts[0].kind, StmtKind::VarDecl { .. }));

                match &stmts[1].kind {
                    StmtKind::While { condition, body } => {
                        assert!(matches!(
                            condition.kind,
                            ExprKind::Binary { op: BinOp::Le, .. }
                        ));

                        // El cuerpo lleva el incremento inyectado al final
                        match &body.kind {
                            StmtKind::Block(inner) => {
                                assert_eq!(inner.len(), 2);
                                assert!(matches!(inner[1].kind, StmtKind::Assign { .. }));
                            }
                            other => panic!("expected Block, got {:?}", other),
                        }
                    }
                    other => panic!("expected While, got {:?}", other),
                }
            }
            other => panic!("expected Block, got {:?}", other),
        }
    }

    #[test]
    fn def_parameters_are_inferred_as_float() {
        let program = parse_ok("def blink(times, delay_ms) { }\nprogram { }");
        let def = program.function_defs().next().expect("missing function");
        assert_eq!(def.params, ["times", "delay_ms"]);
        assert_eq!(def.param_types, vec![Type::Float, Type::Float]);
        assert!(!def.is_extern());
    }

    #[test]
    fn extern_def_keeps_language_and_has_no_body() {
        let program = parse_ok("extern \"C++\" def motor_init(speed)\nprogram { }");
        let def = program.function_defs().next().expect("missing function");
        assert_eq!(def.extern_lang.as_deref(), Some("C++"));
        assert!(def.body.is_none());
    }

    #[test]
    fn not_parses_as_unary_operator() {
        let program = parse_ok("program { if not 0 { } }");
        match &program.body[0].kind {
            StmtKind::If { condition, .. } => {
                assert!(matches!(
                    condition.kind,
                    ExprKind::Unary { op: UnOp::Not, .. }
                ));
            }
            other => panic!("expected If, got {:?}", other),
        }
    }

    #[test]
    fn high_and_low_lower_to_numbers() {
        let program = parse_ok("program { set pin 3 to high }");
        match &program.body[0].kind {
            StmtKind::AnalogWrite { value, .. } => {
                assert_eq!(value.kind, ExprKind::Number(1.0));
            }
            other => panic!("expected AnalogWrite, got {:?}", other),
        }
    }

    #[test]
    fn read_forms_select_their_node_kind() {
        let program = parse_ok(
            "program { make var a = read analog pin 2\nmake var d = read pin 4\nmake var p = read pulse pin 7 }",
        );

        let inits: Vec<_> = program
            .body
            .iter()
            .map(|stmt| match &stmt.kind {
                StmtKind::VarDecl { init: Some(init), .. } => &init.kind,
                other => panic!("expected VarDecl, got {:?}", other),
            })
            .collect();

        assert!(matches!(inits[0], ExprKind::AnalogRead(_)));
        assert!(matches!(inits[1], ExprKind::GpioRead(_)));
        assert!(matches!(inits[2], ExprKind::PulseRead(_)));
    }

    #[test]
    fn servo_statement_parses_pin_and_angle() {
        let program = parse_ok("program { servo pin 9 set 90 }");
        match &program.body[0].kind {
            StmtKind::ServoWrite { pin, angle } => {
                assert_eq!(pin.kind, ExprKind::Number(9.0));
                assert_eq!(angle.kind, ExprKind::Number(90.0));
            }
            other => panic!("expected ServoWrite, got {:?}", other),
        }
    }

    #[test]
    fn i2c_statements_parse() {
        let program = parse_ok("program { i2c begin\ni2c start 104\ni2c send 7\ni2c stop }");
        assert!(matches!(program.body[0].kind, StmtKind::I2cBegin));
        assert!(matches!(program.body[1].kind, StmtKind::I2cStart { .. }));
        assert!(matches!(program.body[2].kind, StmtKind::I2cSend { .. }));
        assert!(matches!(program.body[3].kind, StmtKind::I2cStop));
    }

    #[test]
    fn break_outside_a_loop_is_a_semantic_error() {
        let errors = parse("program { break }", 10).expect_err("should fail");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.iter().next().unwrap().kind, ErrorKind::Semantic);
    }

    #[test]
    fn break_inside_a_loop_is_accepted() {
        let program = parse_ok("program { loop forever { break } }");
        match &program.body[0].kind {
            StmtKind::Forever { body } => match &body.kind {
                StmtKind::Block(stmts) => assert!(matches!(stmts[0].kind, StmtKind::Break)),
                other => panic!("expected Block, got {:?}", other),
            },
            other => panic!("expected Forever, got {:?}", other),
        }
    }

    #[test]
    fn error_accumulation_stops_exactly_at_the_cap() {
        // Cada `$` produce un error léxico; solo los primeros tres
        // deben quedar registrados
        let errors = parse("program { $ $ $ $ $ $ }", 3).expect_err("should fail");
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn recovery_skips_one_token_and_continues() {
        let errors = parse("program { wait 10 ] wait 20 }", 10).expect_err("should fail");
        // Un único error por el token inesperado; el resto del bloque
        // se analiza con normalidad
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.iter().next().unwrap().kind, ErrorKind::Syntax);
    }

    #[test]
    fn include_directives_are_consumed() {
        let program = parse_ok("include \"servo\"\nprogram { wait 1 }");
        assert_eq!(program.body.len(), 1);
    }

    #[test]
    fn map_requires_five_arguments() {
        let program = parse_ok("program { set pin 3 to map(read analog pin 0, 0, 1023, 0, 255) }");
        match &program.body[0].kind {
            StmtKind::AnalogWrite { value, .. } => match &value.kind {
                ExprKind::Call { name, args } => {
                    assert_eq!(name, "map");
                    assert_eq!(args.len(), 5);
                }
                other => panic!("expected Call, got {:?}", other),
            },
            other => panic!("expected AnalogWrite, got {:?}", other),
        }
    }

    #[test]
    fn wait_us_lowers_to_a_delay_microseconds_call() {
        let program = parse_ok("program { wait_us 500 }");
        match &program.body[0].kind {
            StmtKind::Expr(expr) => match &expr.kind {
                ExprKind::Call { name, args } => {
                    assert_eq!(name, "delayMicroseconds");
                    assert_eq!(args.len(), 1);
                }
                other => panic!("expected Call, got {:?}", other),
            },
            other => panic!("expected Expr, got {:?}", other),
        }
    }
}
