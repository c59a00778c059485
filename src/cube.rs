//! Semantic cube: the static `(left_type, right_type, operator) -> result_type`
//! table. Pure functions only, no state.

use crate::ast::{AddOp, MulOp, RelOp, VarType};

/// Arithmetic: `int op int -> int`; any `float` operand widens the result to `float`.
#[must_use]
pub fn arith_result(left: VarType, _op: ArithOp, right: VarType) -> VarType {
    match (left, right) {
        (VarType::Int, VarType::Int) => VarType::Int,
        _ => VarType::Float,
    }
}

/// Relational operators always yield `int` (0 or 1) regardless of operand types.
#[must_use]
pub fn relational_result(_op: RelOp, _left: VarType, _right: VarType) -> VarType {
    VarType::Int
}

/// Assignment compatibility: `int<-int`, `int<-float`, `float<-int`, `float<-float`
/// are all legal (int<-float truncates, float<-int widens). `str` never appears here.
#[must_use]
pub fn assignment_compatible(from: VarType, to: VarType) -> bool {
    matches!(
        (from, to),
        (VarType::Int, VarType::Int)
            | (VarType::Int, VarType::Float)
            | (VarType::Float, VarType::Int)
            | (VarType::Float, VarType::Float)
    )
}

/// A binary `+`/`-`/`*`/`/` operator, unified across `AddOp` and `MulOp` for the cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add(AddOp),
    Mul(MulOp),
}

impl From<AddOp> for ArithOp {
    fn from(op: AddOp) -> Self {
        Self::Add(op)
    }
}

impl From<MulOp> for ArithOp {
    fn from(op: MulOp) -> Self {
        Self::Mul(op)
    }
}

#[test]
fn arithmetic_widens_on_any_float_operand() {
    assert_eq!(arith_result(VarType::Int, AddOp::Plus.into(), VarType::Int), VarType::Int);
    assert_eq!(arith_result(VarType::Int, AddOp::Plus.into(), VarType::Float), VarType::Float);
    assert_eq!(arith_result(VarType::Float, AddOp::Plus.into(), VarType::Int), VarType::Float);
}

#[test]
fn relational_always_yields_int() {
    assert_eq!(relational_result(RelOp::Lt, VarType::Float, VarType::Float), VarType::Int);
}

#[test]
fn assignment_compatibility_matches_table() {
    assert!(assignment_compatible(VarType::Int, VarType::Int));
    assert!(assignment_compatible(VarType::Int, VarType::Float));
    assert!(assignment_compatible(VarType::Float, VarType::Int));
    assert!(assignment_compatible(VarType::Float, VarType::Float));
}
