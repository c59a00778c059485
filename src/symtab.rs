//! Symbol Table & Function Directory (C3): per-scope name/vdir bookkeeping,
//! parameter lists, function entry points and per-function segment sizes.
//!
//! Owns scopes, which own symbols by value — breaking the scope/symbol/
//! function-directory cycle the source has, per the resolution noted in
//! SPEC_FULL.md: the function directory here is just the set of scope names
//! that are functions, re-consulted through this same table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ast::VarType;
use crate::error::CompileError;
use crate::memory::MemoryManager;

pub const GLOBAL_SCOPE: &str = "global";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub value_type: VarType,
    pub vdir: i32,
    pub is_param: bool,
    pub param_index: Option<usize>,
}

/// Per-function high-water marks for the four local/temp segments, snapshotted
/// at `finalize_function` and used by C5 to size activation records.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SegmentSizes {
    pub local_int: i32,
    pub local_float: i32,
    pub temp_int: i32,
    pub temp_float: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    pub name: String,
    pub entry_quad: Option<usize>,
    pub symbols_by_name: HashMap<String, Symbol>,
    pub symbols_by_vdir: HashMap<i32, String>,
    pub param_list: Vec<String>,
    pub segment_sizes: SegmentSizes,
}

impl Scope {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entry_quad: None,
            symbols_by_name: HashMap::new(),
            symbols_by_vdir: HashMap::new(),
            param_list: Vec::new(),
            segment_sizes: SegmentSizes::default(),
        }
    }

    fn insert(&mut self, symbol: Symbol) {
        self.symbols_by_vdir.insert(symbol.vdir, symbol.name.clone());
        self.symbols_by_name.insert(symbol.name.clone(), symbol);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolTable {
    scopes: HashMap<String, Scope>,
    function_order: Vec<String>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        let mut scopes = HashMap::new();
        scopes.insert(GLOBAL_SCOPE.to_string(), Scope::new(GLOBAL_SCOPE));
        Self { scopes, function_order: Vec::new() }
    }

    pub fn scope(&self, name: &str) -> Option<&Scope> {
        self.scopes.get(name)
    }

    pub fn scopes(&self) -> &HashMap<String, Scope> {
        &self.scopes
    }

    pub fn is_function(&self, name: &str) -> bool {
        self.function_order.iter().any(|f| f == name)
    }

    pub fn function_params(&self, name: &str) -> Option<Vec<&Symbol>> {
        let scope = self.scopes.get(name)?;
        Some(scope.param_list.iter().map(|n| &scope.symbols_by_name[n]).collect())
    }

    pub fn add_global(&mut self, name: &str, var_type: VarType, memory: &mut MemoryManager) -> Result<(), CompileError> {
        self.add_to_scope(GLOBAL_SCOPE, name, var_type, memory, false, None)
    }

    pub fn add_local(&mut self, scope: &str, name: &str, var_type: VarType, memory: &mut MemoryManager) -> Result<(), CompileError> {
        self.add_to_scope(scope, name, var_type, memory, false, None)
    }

    pub fn add_param(
        &mut self,
        scope: &str,
        name: &str,
        var_type: VarType,
        index: usize,
        memory: &mut MemoryManager,
    ) -> Result<(), CompileError> {
        self.add_to_scope(scope, name, var_type, memory, true, Some(index))
    }

    fn add_to_scope(
        &mut self,
        scope_name: &str,
        name: &str,
        var_type: VarType,
        memory: &mut MemoryManager,
        is_param: bool,
        param_index: Option<usize>,
    ) -> Result<(), CompileError> {
        {
            let scope = self.scopes.get(scope_name).expect("scope exists");
            if scope.symbols_by_name.contains_key(name) {
                return Err(CompileError::Redeclaration { name: name.to_string(), scope: scope_name.to_string() });
            }
        }
        let vdir = memory.allocate_for_type(var_type, false)?;
        let symbol = Symbol { name: name.to_string(), value_type: var_type, vdir, is_param, param_index };
        let scope = self.scopes.get_mut(scope_name).expect("scope exists");
        if is_param {
            scope.param_list.push(name.to_string());
        }
        scope.insert(symbol);
        Ok(())
    }

    /// Looks up `name` in `current_scope` (params and locals), then `global`.
    pub fn resolve(&self, name: &str, current_scope: &str) -> Result<&Symbol, CompileError> {
        if let Some(scope) = self.scopes.get(current_scope) {
            if let Some(symbol) = scope.symbols_by_name.get(name) {
                return Ok(symbol);
            }
        }
        if current_scope != GLOBAL_SCOPE {
            if let Some(symbol) = self.scopes[GLOBAL_SCOPE].symbols_by_name.get(name) {
                return Ok(symbol);
            }
        }
        Err(CompileError::Undeclared { name: name.to_string() })
    }

    /// Creates a new scope for function `name`, registering its parameters in
    /// declaration order. Rejects a duplicate function name or a collision
    /// with an existing global variable name.
    pub fn add_function(
        &mut self,
        name: &str,
        params: &[(String, VarType)],
        entry_quad: usize,
        memory: &mut MemoryManager,
    ) -> Result<(), CompileError> {
        if self.scopes.contains_key(name) {
            return Err(CompileError::Redeclaration { name: name.to_string(), scope: GLOBAL_SCOPE.to_string() });
        }
        if self.scopes[GLOBAL_SCOPE].symbols_by_name.contains_key(name) {
            return Err(CompileError::Redeclaration { name: name.to_string(), scope: GLOBAL_SCOPE.to_string() });
        }
        let mut scope = Scope::new(name);
        scope.entry_quad = Some(entry_quad);
        self.scopes.insert(name.to_string(), scope);
        self.function_order.push(name.to_string());

        for (index, (pname, ptype)) in params.iter().enumerate() {
            self.add_param(name, pname, *ptype, index, memory)?;
        }
        Ok(())
    }

    /// Snapshots C2's current per-scope segment counts into `name`'s scope.
    pub fn finalize_function(&mut self, name: &str, memory: &MemoryManager) {
        let (local_int, local_float, temp_int, temp_float) = memory.local_scope_sizes();
        if let Some(scope) = self.scopes.get_mut(name) {
            scope.segment_sizes = SegmentSizes { local_int, local_float, temp_int, temp_float };
        }
    }

    /// Snapshots C2's `GLOBAL_INT`/`GLOBAL_FLOAT` high-water marks into the
    /// global scope's `segment_sizes.local_*` fields, which is where the VM
    /// looks to size the global activation record's backing arrays. `main`'s
    /// own temporaries also live in the global AR (it's the top-of-stack
    /// record while `main` runs), so the temp high-water marks from `main`'s
    /// compilation are snapshotted alongside them.
    pub fn finalize_global(&mut self, memory: &MemoryManager) {
        let (global_int, global_float) = memory.global_scope_sizes();
        let (_, _, temp_int, temp_float) = memory.local_scope_sizes();
        let scope = self.scopes.get_mut(GLOBAL_SCOPE).expect("global scope always exists");
        scope.segment_sizes.local_int = global_int;
        scope.segment_sizes.local_float = global_float;
        scope.segment_sizes.temp_int = temp_int;
        scope.segment_sizes.temp_float = temp_float;
    }
}

#[test]
fn duplicate_name_in_same_scope_is_rejected() {
    let mut symtab = SymbolTable::new();
    let mut memory = MemoryManager::new();
    symtab.add_global("a", VarType::Int, &mut memory).unwrap();
    assert!(matches!(
        symtab.add_global("a", VarType::Float, &mut memory),
        Err(CompileError::Redeclaration { .. })
    ));
}

#[test]
fn resolve_prefers_current_scope_over_global() {
    let mut symtab = SymbolTable::new();
    let mut memory = MemoryManager::new();
    symtab.add_global("x", VarType::Int, &mut memory).unwrap();
    symtab.add_function("f", &[], 0, &mut memory).unwrap();
    symtab.add_local("f", "x", VarType::Float, &mut memory).unwrap();

    assert_eq!(symtab.resolve("x", "f").unwrap().value_type, VarType::Float);
    assert_eq!(symtab.resolve("x", GLOBAL_SCOPE).unwrap().value_type, VarType::Int);
}

#[test]
fn resolve_falls_back_to_global() {
    let mut symtab = SymbolTable::new();
    let mut memory = MemoryManager::new();
    symtab.add_global("g", VarType::Int, &mut memory).unwrap();
    symtab.add_function("f", &[], 0, &mut memory).unwrap();
    assert_eq!(symtab.resolve("g", "f").unwrap().name, "g");
}

#[test]
fn undeclared_name_is_an_error() {
    let symtab = SymbolTable::new();
    assert!(matches!(symtab.resolve("nope", GLOBAL_SCOPE), Err(CompileError::Undeclared { .. })));
}
