use std::{error, fmt};

/// Errors raised while lexing `.baby` source.
#[derive(Debug, Clone)]
pub enum LexError {
    UnexpectedChar { ch: char, line: usize },
    UnterminatedString { line: usize },
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedChar { ch, line } => {
                write!(f, "unexpected character '{ch}' on line {line}")
            }
            Self::UnterminatedString { line } => {
                write!(f, "unterminated string literal on line {line}")
            }
        }
    }
}

impl error::Error for LexError {}

/// Errors raised while parsing a token stream into an AST.
#[derive(Debug, Clone)]
pub enum ParseError {
    UnexpectedToken { expected: String, found: String, line: usize },
    UnexpectedEof { expected: String },
    Lex(LexError),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedToken { expected, found, line } => {
                write!(f, "line {line}: expected {expected}, found {found}")
            }
            Self::UnexpectedEof { expected } => {
                write!(f, "unexpected end of input: expected {expected}")
            }
            Self::Lex(err) => err.fmt(f),
        }
    }
}

impl error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        Self::Lex(err)
    }
}

/// Compile-time semantic errors. The first one raised aborts compilation.
#[derive(Debug, Clone)]
pub enum CompileError {
    Undeclared { name: String },
    Redeclaration { name: String, scope: String },
    Type { message: String },
    Arity { function: String, expected: usize, found: usize },
    UndefinedFunction { name: String },
    NonIntCondition { found: &'static str },
    MemoryOverflow { segment: &'static str },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undeclared { name } => write!(f, "UndeclaredError: '{name}' is not declared"),
            Self::Redeclaration { name, scope } => {
                write!(f, "RedeclarationError: '{name}' already declared in scope '{scope}'")
            }
            Self::Type { message } => write!(f, "TypeError: {message}"),
            Self::Arity { function, expected, found } => write!(
                f,
                "ArityError: '{function}' expects {expected} argument(s), found {found}"
            ),
            Self::UndefinedFunction { name } => {
                write!(f, "UndefinedFunction: '{name}' is not declared")
            }
            Self::NonIntCondition { found } => {
                write!(f, "NonIntCondition: condition must be int, found {found}")
            }
            Self::MemoryOverflow { segment } => {
                write!(f, "MemoryOverflow: segment {segment} is exhausted")
            }
        }
    }
}

impl error::Error for CompileError {}

impl From<ParseError> for CompileError {
    fn from(err: ParseError) -> Self {
        Self::Type { message: err.to_string() }
    }
}

/// Runtime errors. Any one of these aborts the virtual machine.
#[derive(Debug, Clone)]
pub enum RuntimeError {
    InvalidAddress { address: i32 },
    UndefinedConstant { address: i32 },
    DivisionByZero,
    StackUnderflow,
    UnknownOpcode { op: i32 },
    MissingOperand { op: &'static str, slot: &'static str },
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAddress { address } => {
                write!(f, "InvalidAddress: {address} is not a valid vdir")
            }
            Self::UndefinedConstant { address } => {
                write!(f, "UndefinedConstant: no constant at {address}")
            }
            Self::DivisionByZero => write!(f, "DivisionByZero"),
            Self::StackUnderflow => write!(f, "StackUnderflow: ENDFUNC from global scope"),
            Self::UnknownOpcode { op } => write!(f, "UnknownOpcode: {op}"),
            Self::MissingOperand { op, slot } => {
                write!(f, "MissingOperand: {op} requires {slot}")
            }
        }
    }
}

impl error::Error for RuntimeError {}

/// Errors raised while encoding/decoding the object bundle.
#[derive(Debug)]
pub enum BundleError {
    UnsupportedVersion { found: u32, expected: u32 },
    Io(std::io::Error),
    Codec(bincode::Error),
}

impl fmt::Display for BundleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found, expected } => write!(
                f,
                "object bundle version {found} is not supported (expected {expected})"
            ),
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::Codec(err) => write!(f, "codec error: {err}"),
        }
    }
}

impl error::Error for BundleError {}

impl From<std::io::Error> for BundleError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<bincode::Error> for BundleError {
    fn from(err: bincode::Error) -> Self {
        Self::Codec(err)
    }
}
