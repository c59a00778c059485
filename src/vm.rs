//! Virtual Machine (C5): dispatches a flat quad list over a stack of
//! activation records.

use std::collections::HashMap;

use crate::bundle::ObjectBundle;
use crate::error::RuntimeError;
use crate::memory::ConstValue;
use crate::quad::{Opcode, Quadruple};
use crate::symtab::{Scope, GLOBAL_SCOPE};

const GLOBAL_INT_BASE: i32 = 1000;
const GLOBAL_FLOAT_BASE: i32 = 2000;
const LOCAL_INT_BASE: i32 = 3000;
const LOCAL_FLOAT_BASE: i32 = 4000;
const TEMP_INT_BASE: i32 = 5000;
const TEMP_FLOAT_BASE: i32 = 6000;
const CONSTANT_BASE: i32 = 7000;
const SEGMENT_SIZE: i32 = 1000;

/// An `int`-or-`float` runtime value, carried without a static type tag in
/// the slot arrays — the segment the slot lives in determines the type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f64),
}

impl Value {
    fn as_int(self) -> i32 {
        match self {
            Value::Int(n) => n,
            Value::Float(n) => n as i32,
        }
    }

    fn as_float(self) -> f64 {
        match self {
            Value::Int(n) => f64::from(n),
            Value::Float(n) => n,
        }
    }
}

/// Per-call runtime container: local/temp storage, return address and
/// function name. Sized from the function's `segment_sizes` at `GOSUB`.
struct ActivationRecord {
    local_int: Vec<i32>,
    local_float: Vec<f64>,
    temp_int: Vec<i32>,
    temp_float: Vec<f64>,
    return_address: usize,
    function_name: String,
}

impl ActivationRecord {
    fn sized(scope: &Scope, return_address: usize) -> Self {
        let sizes = scope.segment_sizes;
        Self {
            local_int: vec![0; sizes.local_int as usize],
            local_float: vec![0.0; sizes.local_float as usize],
            temp_int: vec![0; sizes.temp_int as usize],
            temp_float: vec![0.0; sizes.temp_float as usize],
            return_address,
            function_name: scope.name.clone(),
        }
    }

    fn global(scope: &Scope) -> Self {
        Self::sized(scope, 0)
    }
}

pub struct VirtualMachine<'a> {
    quads: &'a [Quadruple],
    constants: HashMap<i32, ConstValue>,
    scopes: HashMap<String, Scope>,
    ip: usize,
    stack: Vec<ActivationRecord>,
    pending_args: Vec<Vec<Value>>,
    output: Vec<String>,
}

impl<'a> VirtualMachine<'a> {
    #[must_use]
    pub fn new(bundle: &'a ObjectBundle) -> Self {
        let constants = bundle.constants.iter().cloned().collect();
        let scopes: HashMap<String, Scope> =
            bundle.scopes.iter().cloned().map(|s| (s.name.clone(), s)).collect();
        let global_ar = ActivationRecord::global(
            scopes.get(GLOBAL_SCOPE).expect("bundle always carries a global scope"),
        );
        Self {
            quads: &bundle.quads,
            constants,
            scopes,
            ip: 0,
            stack: vec![global_ar],
            pending_args: Vec::new(),
            output: Vec::new(),
        }
    }

    /// Runs until `END`. Returns the lines written by executed `PRINT`s.
    pub fn run(mut self) -> Result<Vec<String>, RuntimeError> {
        loop {
            let quad = self.quads.get(self.ip).cloned().ok_or(RuntimeError::InvalidAddress { address: self.ip as i32 })?;
            if self.step(&quad)? {
                break;
            }
        }
        Ok(self.output)
    }

    /// Executes one quad. Returns `true` if the VM should halt.
    fn step(&mut self, quad: &Quadruple) -> Result<bool, RuntimeError> {
        match quad.op {
            Opcode::Plus | Opcode::Minus | Opcode::Mult | Opcode::Div => {
                self.arithmetic(quad)?;
                self.ip += 1;
            }
            Opcode::LessThan | Opcode::GreaterThan | Opcode::NotEqual => {
                self.relational(quad)?;
                self.ip += 1;
            }
            Opcode::Assign => {
                let src = self.required_arg2(quad)?;
                let dst = self.required_arg1(quad)?;
                let value = self.read(src)?;
                self.write(dst, value)?;
                self.ip += 1;
            }
            Opcode::Print => {
                let src = self.required_arg1(quad)?;
                let value = self.read(src)?;
                self.output.push(render_value(value));
                self.ip += 1;
            }
            Opcode::Goto => {
                let target = self.required_arg1(quad)?;
                self.ip = target as usize;
            }
            Opcode::Gotof => {
                let cond = self.required_arg1(quad)?;
                let target = quad.result.ok_or(RuntimeError::MissingOperand { op: "GOTOF", slot: "result" })?;
                if self.read(cond)?.as_int() == 0 {
                    self.ip = target as usize;
                } else {
                    self.ip += 1;
                }
            }
            Opcode::Alloc => {
                self.pending_args.push(Vec::new());
                self.ip += 1;
            }
            Opcode::Param => {
                let v = self.required_arg1(quad)?;
                let value = self.read(v)?;
                let frame = self.pending_args.last_mut().ok_or(RuntimeError::StackUnderflow)?;
                frame.push(value);
            }
            Opcode::Gosub => {
                self.gosub(quad)?;
            }
            Opcode::Endfunc => {
                let ar = self.stack.pop().ok_or(RuntimeError::StackUnderflow)?;
                if self.stack.is_empty() {
                    return Err(RuntimeError::StackUnderflow);
                }
                self.ip = ar.return_address;
                return Ok(false);
            }
            Opcode::End => return Ok(true),
        }
        Ok(false)
    }

    fn gosub(&mut self, quad: &Quadruple) -> Result<(), RuntimeError> {
        let entry_quad = self.required_arg1(quad)?;
        let label = quad.label.clone().ok_or(RuntimeError::MissingOperand { op: "GOSUB", slot: "label" })?;
        let scope = self.scopes.get(&label).cloned().ok_or(RuntimeError::MissingOperand { op: "GOSUB", slot: "scope" })?;
        let args = self.pending_args.pop().unwrap_or_default();

        let mut ar = ActivationRecord::sized(&scope, self.ip + 1);
        for (value, name) in args.iter().zip(&scope.param_list) {
            let symbol = &scope.symbols_by_name[name];
            store_local(&mut ar, symbol.vdir, *value)?;
        }

        self.stack.push(ar);
        self.ip = entry_quad as usize;
        Ok(())
    }

    fn arithmetic(&mut self, quad: &Quadruple) -> Result<(), RuntimeError> {
        let lhs = self.read(self.required_arg1(quad)?)?;
        let rhs = self.read(self.required_arg2(quad)?)?;
        let dst = quad.result.ok_or(RuntimeError::MissingOperand { op: "arithmetic", slot: "result" })?;

        let is_float = matches!(lhs, Value::Float(_)) || matches!(rhs, Value::Float(_));
        let result = if is_float {
            let (a, b) = (lhs.as_float(), rhs.as_float());
            Value::Float(match quad.op {
                Opcode::Plus => a + b,
                Opcode::Minus => a - b,
                Opcode::Mult => a * b,
                Opcode::Div => {
                    if b == 0.0 {
                        return Err(RuntimeError::DivisionByZero);
                    }
                    a / b
                }
                _ => unreachable!(),
            })
        } else {
            let (a, b) = (lhs.as_int(), rhs.as_int());
            Value::Int(match quad.op {
                Opcode::Plus => a + b,
                Opcode::Minus => a - b,
                Opcode::Mult => a * b,
                Opcode::Div => {
                    if b == 0 {
                        return Err(RuntimeError::DivisionByZero);
                    }
                    a / b
                }
                _ => unreachable!(),
            })
        };
        self.write(dst, result)
    }

    fn relational(&mut self, quad: &Quadruple) -> Result<(), RuntimeError> {
        let lhs = self.read(self.required_arg1(quad)?)?;
        let rhs = self.read(self.required_arg2(quad)?)?;
        let dst = quad.result.ok_or(RuntimeError::MissingOperand { op: "relational", slot: "result" })?;

        let is_float = matches!(lhs, Value::Float(_)) || matches!(rhs, Value::Float(_));
        let truth = if is_float {
            let (a, b) = (lhs.as_float(), rhs.as_float());
            match quad.op {
                Opcode::LessThan => a < b,
                Opcode::GreaterThan => a > b,
                Opcode::NotEqual => a != b,
                _ => unreachable!(),
            }
        } else {
            let (a, b) = (lhs.as_int(), rhs.as_int());
            match quad.op {
                Opcode::LessThan => a < b,
                Opcode::GreaterThan => a > b,
                Opcode::NotEqual => a != b,
                _ => unreachable!(),
            }
        };
        self.write(dst, Value::Int(i32::from(truth)))
    }

    fn required_arg1(&self, quad: &Quadruple) -> Result<i32, RuntimeError> {
        quad.arg1.ok_or(RuntimeError::MissingOperand { op: "quad", slot: "arg1" })
    }

    fn required_arg2(&self, quad: &Quadruple) -> Result<i32, RuntimeError> {
        quad.arg2.ok_or(RuntimeError::MissingOperand { op: "quad", slot: "arg2" })
    }

    fn read(&self, vdir: i32) -> Result<Value, RuntimeError> {
        if vdir >= CONSTANT_BASE && vdir < CONSTANT_BASE + SEGMENT_SIZE {
            return match self.constants.get(&vdir) {
                Some(ConstValue::Int(n)) => Ok(Value::Int(*n)),
                Some(ConstValue::Float(n)) => Ok(Value::Float(*n)),
                Some(ConstValue::Str(_)) | None => Err(RuntimeError::UndefinedConstant { address: vdir }),
            };
        }
        if vdir >= GLOBAL_INT_BASE && vdir < GLOBAL_INT_BASE + SEGMENT_SIZE {
            let ar = &self.stack[0];
            return ar
                .local_int
                .get((vdir - GLOBAL_INT_BASE) as usize)
                .copied()
                .map(Value::Int)
                .ok_or(RuntimeError::InvalidAddress { address: vdir });
        }
        if vdir >= GLOBAL_FLOAT_BASE && vdir < GLOBAL_FLOAT_BASE + SEGMENT_SIZE {
            let ar = &self.stack[0];
            return ar
                .local_float
                .get((vdir - GLOBAL_FLOAT_BASE) as usize)
                .copied()
                .map(Value::Float)
                .ok_or(RuntimeError::InvalidAddress { address: vdir });
        }

        let ar = self.stack.last().ok_or(RuntimeError::StackUnderflow)?;
        read_local(ar, vdir)
    }

    fn write(&mut self, vdir: i32, value: Value) -> Result<(), RuntimeError> {
        if vdir >= CONSTANT_BASE && vdir < CONSTANT_BASE + SEGMENT_SIZE {
            return Err(RuntimeError::InvalidAddress { address: vdir });
        }
        if vdir >= GLOBAL_INT_BASE && vdir < GLOBAL_INT_BASE + SEGMENT_SIZE {
            let ar = &mut self.stack[0];
            let slot = ar.local_int.get_mut((vdir - GLOBAL_INT_BASE) as usize).ok_or(RuntimeError::InvalidAddress { address: vdir })?;
            *slot = value.as_int();
            return Ok(());
        }
        if vdir >= GLOBAL_FLOAT_BASE && vdir < GLOBAL_FLOAT_BASE + SEGMENT_SIZE {
            let ar = &mut self.stack[0];
            let slot = ar.local_float.get_mut((vdir - GLOBAL_FLOAT_BASE) as usize).ok_or(RuntimeError::InvalidAddress { address: vdir })?;
            *slot = value.as_float();
            return Ok(());
        }

        let ar = self.stack.last_mut().ok_or(RuntimeError::StackUnderflow)?;
        store_local(ar, vdir, value)
    }
}

fn read_local(ar: &ActivationRecord, vdir: i32) -> Result<Value, RuntimeError> {
    if vdir >= LOCAL_INT_BASE && vdir < LOCAL_INT_BASE + SEGMENT_SIZE {
        return ar
            .local_int
            .get((vdir - LOCAL_INT_BASE) as usize)
            .copied()
            .map(Value::Int)
            .ok_or(RuntimeError::InvalidAddress { address: vdir });
    }
    if vdir >= LOCAL_FLOAT_BASE && vdir < LOCAL_FLOAT_BASE + SEGMENT_SIZE {
        return ar
            .local_float
            .get((vdir - LOCAL_FLOAT_BASE) as usize)
            .copied()
            .map(Value::Float)
            .ok_or(RuntimeError::InvalidAddress { address: vdir });
    }
    if vdir >= TEMP_INT_BASE && vdir < TEMP_INT_BASE + SEGMENT_SIZE {
        return ar
            .temp_int
            .get((vdir - TEMP_INT_BASE) as usize)
            .copied()
            .map(Value::Int)
            .ok_or(RuntimeError::InvalidAddress { address: vdir });
    }
    if vdir >= TEMP_FLOAT_BASE && vdir < TEMP_FLOAT_BASE + SEGMENT_SIZE {
        return ar
            .temp_float
            .get((vdir - TEMP_FLOAT_BASE) as usize)
            .copied()
            .map(Value::Float)
            .ok_or(RuntimeError::InvalidAddress { address: vdir });
    }
    Err(RuntimeError::InvalidAddress { address: vdir })
}

fn store_local(ar: &mut ActivationRecord, vdir: i32, value: Value) -> Result<(), RuntimeError> {
    if vdir >= LOCAL_INT_BASE && vdir < LOCAL_INT_BASE + SEGMENT_SIZE {
        let slot = ar.local_int.get_mut((vdir - LOCAL_INT_BASE) as usize).ok_or(RuntimeError::InvalidAddress { address: vdir })?;
        *slot = value.as_int();
        return Ok(());
    }
    if vdir >= LOCAL_FLOAT_BASE && vdir < LOCAL_FLOAT_BASE + SEGMENT_SIZE {
        let slot = ar.local_float.get_mut((vdir - LOCAL_FLOAT_BASE) as usize).ok_or(RuntimeError::InvalidAddress { address: vdir })?;
        *slot = value.as_float();
        return Ok(());
    }
    if vdir >= TEMP_INT_BASE && vdir < TEMP_INT_BASE + SEGMENT_SIZE {
        let slot = ar.temp_int.get_mut((vdir - TEMP_INT_BASE) as usize).ok_or(RuntimeError::InvalidAddress { address: vdir })?;
        *slot = value.as_int();
        return Ok(());
    }
    if vdir >= TEMP_FLOAT_BASE && vdir < TEMP_FLOAT_BASE + SEGMENT_SIZE {
        let slot = ar.temp_float.get_mut((vdir - TEMP_FLOAT_BASE) as usize).ok_or(RuntimeError::InvalidAddress { address: vdir })?;
        *slot = value.as_float();
        return Ok(());
    }
    Err(RuntimeError::InvalidAddress { address: vdir })
}

/// `{:?}` on `f64` always carries at least one decimal digit (`3.0`, `1.5`),
/// matching both S2 and S5. Ints use plain `Display`.
fn render_value(value: Value) -> String {
    match value {
        Value::Int(n) => n.to_string(),
        Value::Float(n) => format!("{n:?}"),
    }
}
