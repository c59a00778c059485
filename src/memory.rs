//! Memory Manager (C2): allocates virtual directions across the seven typed
//! segments and interns constants.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ast::VarType;
use crate::error::CompileError;

pub const SEGMENT_SIZE: i32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Segment {
    GlobalInt,
    GlobalFloat,
    LocalInt,
    LocalFloat,
    TempInt,
    TempFloat,
    Constant,
}

impl Segment {
    #[must_use]
    pub fn base(self) -> i32 {
        match self {
            Self::GlobalInt => 1000,
            Self::GlobalFloat => 2000,
            Self::LocalInt => 3000,
            Self::LocalFloat => 4000,
            Self::TempInt => 5000,
            Self::TempFloat => 6000,
            Self::Constant => 7000,
        }
    }

    /// Which segment a vdir falls into, by range check.
    #[must_use]
    pub fn of(vdir: i32) -> Option<Self> {
        for seg in [
            Self::GlobalInt,
            Self::GlobalFloat,
            Self::LocalInt,
            Self::LocalFloat,
            Self::TempInt,
            Self::TempFloat,
            Self::Constant,
        ] {
            let base = seg.base();
            if vdir >= base && vdir < base + SEGMENT_SIZE {
                return Some(seg);
            }
        }
        None
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::GlobalInt => "GLOBAL_INT",
            Self::GlobalFloat => "GLOBAL_FLOAT",
            Self::LocalInt => "LOCAL_INT",
            Self::LocalFloat => "LOCAL_FLOAT",
            Self::TempInt => "TEMP_INT",
            Self::TempFloat => "TEMP_FLOAT",
            Self::Constant => "CONSTANT",
        }
    }

    #[must_use]
    pub fn is_local_or_temp(self) -> bool {
        matches!(self, Self::LocalInt | Self::LocalFloat | Self::TempInt | Self::TempFloat)
    }
}

/// A constant value as stored in the constants table: `int`, `float`, or `str`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstValue {
    Int(i32),
    Float(f64),
    Str(String),
}

/// Name-indexed interning maps plus the inverse `vdir -> value` map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstantsTable {
    ints: HashMap<i32, i32>,
    floats: HashMap<u64, i32>,
    strs: HashMap<String, i32>,
    by_vdir: HashMap<i32, ConstValue>,
}

impl ConstantsTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, vdir: i32) -> Option<&ConstValue> {
        self.by_vdir.get(&vdir)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &ConstValue)> {
        self.by_vdir.iter().map(|(&vdir, value)| (vdir, value))
    }
}

/// Allocates virtual directions. Local/temp cursors reset at the start of
/// every function compilation; global and constant cursors persist for the
/// whole compilation.
pub struct MemoryManager {
    global_int: i32,
    global_float: i32,
    local_int: i32,
    local_float: i32,
    temp_int: i32,
    temp_float: i32,
    constant: i32,
    constants: ConstantsTable,
}

impl Default for MemoryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            global_int: 0,
            global_float: 0,
            local_int: 0,
            local_float: 0,
            temp_int: 0,
            temp_float: 0,
            constant: 0,
            constants: ConstantsTable::new(),
        }
    }

    pub fn constants(&self) -> &ConstantsTable {
        &self.constants
    }

    /// Resets the local/temp cursors. Called at the start of every function
    /// compilation so two functions may share overlapping vdir ranges.
    pub fn reset_local_scope(&mut self) {
        self.local_int = 0;
        self.local_float = 0;
        self.temp_int = 0;
        self.temp_float = 0;
    }

    /// Current high-water marks for the four local/temp segments, in the
    /// order `(local_int, local_float, temp_int, temp_float)`.
    #[must_use]
    pub fn local_scope_sizes(&self) -> (i32, i32, i32, i32) {
        (self.local_int, self.local_float, self.temp_int, self.temp_float)
    }

    /// Current high-water marks for `GLOBAL_INT`/`GLOBAL_FLOAT`, used to size
    /// the VM's global activation record.
    #[must_use]
    pub fn global_scope_sizes(&self) -> (i32, i32) {
        (self.global_int, self.global_float)
    }

    pub fn allocate(&mut self, segment: Segment) -> Result<i32, CompileError> {
        let cursor = match segment {
            Segment::GlobalInt => &mut self.global_int,
            Segment::GlobalFloat => &mut self.global_float,
            Segment::LocalInt => &mut self.local_int,
            Segment::LocalFloat => &mut self.local_float,
            Segment::TempInt => &mut self.temp_int,
            Segment::TempFloat => &mut self.temp_float,
            Segment::Constant => {
                return Err(CompileError::Type {
                    message: "constants must be allocated via intern_*".to_string(),
                })
            }
        };
        if *cursor >= SEGMENT_SIZE {
            return Err(CompileError::MemoryOverflow { segment: segment.name() });
        }
        let vdir = segment.base() + *cursor;
        *cursor += 1;
        Ok(vdir)
    }

    pub fn allocate_for_type(&mut self, var_type: VarType, temp: bool) -> Result<i32, CompileError> {
        let segment = match (var_type, temp) {
            (VarType::Int, false) => Segment::LocalInt,
            (VarType::Float, false) => Segment::LocalFloat,
            (VarType::Int, true) => Segment::TempInt,
            (VarType::Float, true) => Segment::TempFloat,
        };
        self.allocate(segment)
    }

    pub fn intern_int(&mut self, value: i32) -> Result<i32, CompileError> {
        if let Some(&vdir) = self.constants.ints.get(&value) {
            return Ok(vdir);
        }
        let vdir = self.next_constant_vdir()?;
        self.constants.ints.insert(value, vdir);
        self.constants.by_vdir.insert(vdir, ConstValue::Int(value));
        Ok(vdir)
    }

    pub fn intern_float(&mut self, value: f64) -> Result<i32, CompileError> {
        let key = value.to_bits();
        if let Some(&vdir) = self.constants.floats.get(&key) {
            return Ok(vdir);
        }
        let vdir = self.next_constant_vdir()?;
        self.constants.floats.insert(key, vdir);
        self.constants.by_vdir.insert(vdir, ConstValue::Float(value));
        Ok(vdir)
    }

    pub fn intern_str(&mut self, value: &str) -> Result<i32, CompileError> {
        if let Some(&vdir) = self.constants.strs.get(value) {
            return Ok(vdir);
        }
        let vdir = self.next_constant_vdir()?;
        self.constants.strs.insert(value.to_string(), vdir);
        self.constants.by_vdir.insert(vdir, ConstValue::Str(value.to_string()));
        Ok(vdir)
    }

    fn next_constant_vdir(&mut self) -> Result<i32, CompileError> {
        if self.constant >= SEGMENT_SIZE {
            return Err(CompileError::MemoryOverflow { segment: Segment::Constant.name() });
        }
        let vdir = Segment::Constant.base() + self.constant;
        self.constant += 1;
        Ok(vdir)
    }
}

#[test]
fn equal_valued_constants_share_one_vdir() {
    let mut mem = MemoryManager::new();
    let a = mem.intern_int(42).unwrap();
    let b = mem.intern_int(42).unwrap();
    assert_eq!(a, b);
    let c = mem.intern_int(43).unwrap();
    assert_ne!(a, c);
}

#[test]
fn local_cursors_reset_between_functions() {
    let mut mem = MemoryManager::new();
    let first = mem.allocate(Segment::LocalInt).unwrap();
    mem.reset_local_scope();
    let second = mem.allocate(Segment::LocalInt).unwrap();
    assert_eq!(first, second);
}

#[test]
fn exhausting_a_segment_overflows() {
    let mut mem = MemoryManager::new();
    for _ in 0..SEGMENT_SIZE {
        mem.allocate(Segment::GlobalInt).unwrap();
    }
    assert!(matches!(mem.allocate(Segment::GlobalInt), Err(CompileError::MemoryOverflow { .. })));
}

#[test]
fn segment_of_recovers_from_vdir_range() {
    assert_eq!(Segment::of(1000), Some(Segment::GlobalInt));
    assert_eq!(Segment::of(1999), Some(Segment::GlobalInt));
    assert_eq!(Segment::of(7000), Some(Segment::Constant));
    assert_eq!(Segment::of(500), None);
}
