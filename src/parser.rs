//! Recursive-descent parser: token stream → `ast` tree.
//!
//! One function per production, mirroring `program / vars / function / body /
//! statement / expression / exp / term / factor`. No error recovery: the
//! first unexpected token aborts parsing.

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{lex, Spanned, Token};

pub fn parse(source: &str) -> Result<Program, ParseError> {
    let tokens = lex(source)?;
    let mut p = Parser { tokens, pos: 0 };
    let program = p.program()?;
    p.expect(&Token::Eof, "end of input")?;
    Ok(program)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn line(&self) -> usize {
        self.tokens[self.pos].line
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].token.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<Token, ParseError> {
        if self.peek() == expected {
            Ok(self.advance())
        } else if *self.peek() == Token::Eof {
            Err(ParseError::UnexpectedEof { expected: what.to_string() })
        } else {
            Err(ParseError::UnexpectedToken {
                expected: what.to_string(),
                found: format!("{:?}", self.peek()),
                line: self.line(),
            })
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match self.peek().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            Token::Eof => Err(ParseError::UnexpectedEof { expected: "identifier".to_string() }),
            other => Err(ParseError::UnexpectedToken {
                expected: "identifier".to_string(),
                found: format!("{other:?}"),
                line: self.line(),
            }),
        }
    }

    fn expect_type(&mut self) -> Result<VarType, ParseError> {
        match self.peek().clone() {
            Token::Int => {
                self.advance();
                Ok(VarType::Int)
            }
            Token::Float => {
                self.advance();
                Ok(VarType::Float)
            }
            Token::Eof => Err(ParseError::UnexpectedEof { expected: "'int' or 'float'".to_string() }),
            other => Err(ParseError::UnexpectedToken {
                expected: "'int' or 'float'".to_string(),
                found: format!("{other:?}"),
                line: self.line(),
            }),
        }
    }

    // program := 'program' ID ';' vars? funcs* 'main' body 'end'
    fn program(&mut self) -> Result<Program, ParseError> {
        self.expect(&Token::Program, "'program'")?;
        let id = self.expect_identifier()?;
        self.expect(&Token::Semicolon, "';'")?;

        let vars = if *self.peek() == Token::Var { Some(self.vars()?) } else { None };

        let mut funcs = Vec::new();
        while *self.peek() == Token::Void {
            funcs.push(self.function()?);
        }

        self.expect(&Token::Main, "'main'")?;
        let body = self.body()?;
        self.expect(&Token::End, "'end'")?;

        Ok(Program { id, vars, funcs, body })
    }

    // vars := 'var' vardecl+
    fn vars(&mut self) -> Result<Vars, ParseError> {
        self.expect(&Token::Var, "'var'")?;
        let mut decls = Vec::new();
        decls.push(self.var_decl()?);
        while self.looks_like_var_decl() {
            decls.push(self.var_decl()?);
        }
        Ok(Vars { decls })
    }

    fn looks_like_var_decl(&self) -> bool {
        matches!(self.peek(), Token::Identifier(_))
    }

    // vardecl := ID (',' ID)* ':' type ';'
    fn var_decl(&mut self) -> Result<VarDecl, ParseError> {
        let mut names = vec![self.expect_identifier()?];
        while *self.peek() == Token::Comma {
            self.advance();
            names.push(self.expect_identifier()?);
        }
        self.expect(&Token::Colon, "':'")?;
        let var_type = self.expect_type()?;
        self.expect(&Token::Semicolon, "';'")?;
        Ok(VarDecl { var_type, names })
    }

    // function := 'void' ID '(' paramlist? ')' body ';'
    fn function(&mut self) -> Result<Function, ParseError> {
        self.expect(&Token::Void, "'void'")?;
        let id = self.expect_identifier()?;
        self.expect(&Token::LParen, "'('")?;
        let mut params = Vec::new();
        if *self.peek() != Token::RParen {
            params.push(self.param()?);
            while *self.peek() == Token::Comma {
                self.advance();
                params.push(self.param()?);
            }
        }
        self.expect(&Token::RParen, "')'")?;
        let vars = if *self.peek() == Token::Var { Some(self.vars()?) } else { None };
        let body = self.body()?;
        self.expect(&Token::Semicolon, "';'")?;
        Ok(Function { id, params, vars, body })
    }

    fn param(&mut self) -> Result<Param, ParseError> {
        let name = self.expect_identifier()?;
        self.expect(&Token::Colon, "':'")?;
        let var_type = self.expect_type()?;
        Ok(Param { name, var_type })
    }

    // body := '{' statement* '}'
    fn body(&mut self) -> Result<Body, ParseError> {
        self.expect(&Token::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while *self.peek() != Token::RBrace {
            stmts.push(self.statement()?);
        }
        self.expect(&Token::RBrace, "'}'")?;
        Ok(Body { stmts })
    }

    fn statement(&mut self) -> Result<Statement, ParseError> {
        let stmt = match self.peek().clone() {
            Token::Print => Statement::Print(self.print_stmt()?),
            Token::If => Statement::Condition(self.condition()?),
            Token::While => Statement::Cycle(self.cycle()?),
            Token::Identifier(name) => {
                self.advance();
                if *self.peek() == Token::LParen {
                    Statement::FCall(self.fcall_tail(name)?)
                } else {
                    Statement::Assign(self.assign_tail(name)?)
                }
            }
            Token::Eof => return Err(ParseError::UnexpectedEof { expected: "statement".to_string() }),
            other => {
                return Err(ParseError::UnexpectedToken {
                    expected: "statement".to_string(),
                    found: format!("{other:?}"),
                    line: self.line(),
                })
            }
        };
        self.expect(&Token::Semicolon, "';'")?;
        Ok(stmt)
    }

    // assign := ID '=' expression   (ID already consumed)
    fn assign_tail(&mut self, id: String) -> Result<Assign, ParseError> {
        self.expect(&Token::Assign, "'='")?;
        let expr = self.expression()?;
        Ok(Assign { id, expr })
    }

    // print := 'print' '(' printitem (',' printitem)* ')'
    fn print_stmt(&mut self) -> Result<Print, ParseError> {
        self.expect(&Token::Print, "'print'")?;
        self.expect(&Token::LParen, "'('")?;
        let mut items = vec![self.print_item()?];
        while *self.peek() == Token::Comma {
            self.advance();
            items.push(self.print_item()?);
        }
        self.expect(&Token::RParen, "')'")?;
        Ok(Print { items })
    }

    fn print_item(&mut self) -> Result<PrintItem, ParseError> {
        if let Token::StringLiteral(s) = self.peek().clone() {
            self.advance();
            Ok(PrintItem::Str(s))
        } else {
            Ok(PrintItem::Expr(self.expression()?))
        }
    }

    // condition := 'if' '(' expression ')' body ('else' body)?
    fn condition(&mut self) -> Result<Condition, ParseError> {
        self.expect(&Token::If, "'if'")?;
        self.expect(&Token::LParen, "'('")?;
        let cond = self.expression()?;
        self.expect(&Token::RParen, "')'")?;
        let if_body = self.body()?;
        let else_body = if *self.peek() == Token::Else {
            self.advance();
            Some(self.body()?)
        } else {
            None
        };
        Ok(Condition { cond, if_body, else_body })
    }

    // cycle := 'while' '(' expression ')' 'do' body
    fn cycle(&mut self) -> Result<Cycle, ParseError> {
        self.expect(&Token::While, "'while'")?;
        self.expect(&Token::LParen, "'('")?;
        let cond = self.expression()?;
        self.expect(&Token::RParen, "')'")?;
        self.expect(&Token::Do, "'do'")?;
        let body = self.body()?;
        Ok(Cycle { cond, body })
    }

    // fcall := ID '(' (expression (',' expression)*)? ')'   (ID already consumed)
    fn fcall_tail(&mut self, id: String) -> Result<FCall, ParseError> {
        self.expect(&Token::LParen, "'('")?;
        let mut args = Vec::new();
        if *self.peek() != Token::RParen {
            args.push(self.expression()?);
            while *self.peek() == Token::Comma {
                self.advance();
                args.push(self.expression()?);
            }
        }
        self.expect(&Token::RParen, "')'")?;
        Ok(FCall { id, args })
    }

    // expression := exp (relop exp)?
    fn expression(&mut self) -> Result<Expression, ParseError> {
        let left = self.exp()?;
        let op = match self.peek() {
            Token::Lt => Some(RelOp::Lt),
            Token::Gt => Some(RelOp::Gt),
            Token::Ne => Some(RelOp::Ne),
            _ => None,
        };
        let right = if op.is_some() {
            self.advance();
            Some(self.exp()?)
        } else {
            None
        };
        Ok(Expression { left, op, right })
    }

    // exp := term (addop term)*
    fn exp(&mut self) -> Result<Exp, ParseError> {
        let left_term = self.term()?;
        let mut ops = Vec::new();
        loop {
            let op = match self.peek() {
                Token::Plus => AddOp::Plus,
                Token::Minus => AddOp::Minus,
                _ => break,
            };
            self.advance();
            ops.push((op, self.term()?));
        }
        Ok(Exp { left_term, ops })
    }

    // term := factor (mulop factor)*
    fn term(&mut self) -> Result<Term, ParseError> {
        let left_factor = self.factor()?;
        let mut ops = Vec::new();
        loop {
            let op = match self.peek() {
                Token::Star => MulOp::Mult,
                Token::Slash => MulOp::Div,
                _ => break,
            };
            self.advance();
            ops.push((op, self.factor()?));
        }
        Ok(Term { left_factor, ops })
    }

    // factor := sign? (ID | NUMBER | '(' expression ')')
    fn factor(&mut self) -> Result<Factor, ParseError> {
        let sign = match self.peek() {
            Token::Plus => {
                self.advance();
                Sign::Plus
            }
            Token::Minus => {
                self.advance();
                Sign::Minus
            }
            _ => Sign::Plus,
        };

        let value = match self.peek().clone() {
            Token::IntLiteral(n) => {
                self.advance();
                FactorValue::Number(NumberLiteral::Int(n))
            }
            Token::FloatLiteral(n) => {
                self.advance();
                FactorValue::Number(NumberLiteral::Float(n))
            }
            Token::Identifier(name) => {
                self.advance();
                FactorValue::Identifier(name)
            }
            Token::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.expect(&Token::RParen, "')'")?;
                FactorValue::Nested(Box::new(inner))
            }
            Token::Eof => return Err(ParseError::UnexpectedEof { expected: "factor".to_string() }),
            other => {
                return Err(ParseError::UnexpectedToken {
                    expected: "factor".to_string(),
                    found: format!("{other:?}"),
                    line: self.line(),
                })
            }
        };

        Ok(Factor { value, sign })
    }
}
