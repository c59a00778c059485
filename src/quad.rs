//! Shared opcode and quadruple vocabulary used by both the generator (C4)
//! and the virtual machine (C5).

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// Integer-tagged opcode. Ordinals match the original implementation's
/// `Operations` enum so serialised bundles are stable across versions of
/// this crate that agree on `BUNDLE_VERSION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    Plus = 1,
    Minus = 2,
    Mult = 3,
    Div = 4,
    LessThan = 5,
    GreaterThan = 6,
    NotEqual = 7,
    Assign = 8,
    Print = 9,
    Gotof = 10,
    Goto = 11,
    End = 12,
    Alloc = 13,
    Param = 14,
    Gosub = 15,
    Endfunc = 16,
}

/// A three-address instruction. `arg1`/`arg2`/`result` are vdirs or quad
/// indices depending on `op`; `label` carries a function name for
/// `Alloc`/`Gosub`. `scope` is debug metadata only — the function the quad
/// was emitted in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quadruple {
    pub op: Opcode,
    pub arg1: Option<i32>,
    pub arg2: Option<i32>,
    pub result: Option<i32>,
    pub label: Option<String>,
    pub scope: String,
}

impl Quadruple {
    #[must_use]
    pub fn new(op: Opcode, scope: &str) -> Self {
        Self { op, arg1: None, arg2: None, result: None, label: None, scope: scope.to_string() }
    }

    #[must_use]
    pub fn with_args(mut self, arg1: Option<i32>, arg2: Option<i32>, result: Option<i32>) -> Self {
        self.arg1 = arg1;
        self.arg2 = arg2;
        self.result = result;
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }
}
