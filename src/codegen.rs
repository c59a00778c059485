//! Quadruple Generator (C4): walks the AST, type-checks via the semantic
//! cube, allocates storage via the memory manager and symbol table, and
//! emits a flat quadruple list with backpatched jump targets.
//!
//! Field conventions for jump quads (not load-bearing in the opcode table,
//! but fixed by the backpatching algorithm below): `GOTO`'s target lives in
//! `arg1`; `GOTOF`'s condition lives in `arg1` and its target in `result`.

use crate::ast::{
    self, AddOp, Condition, Cycle, Expression, Exp, FCall, Factor, FactorValue, Function,
    MulOp, NumberLiteral, Print, PrintItem, Program, Sign, Statement, Term, VarType,
};
use crate::cube;
use crate::error::CompileError;
use crate::memory::{ConstantsTable, MemoryManager};
use crate::quad::{Opcode, Quadruple};
use crate::symtab::{SymbolTable, GLOBAL_SCOPE};

/// Everything C6 needs to assemble an object bundle.
pub struct GeneratedProgram {
    pub quads: Vec<Quadruple>,
    pub constants: ConstantsTable,
    pub symtab: SymbolTable,
}

pub fn generate(program: &Program) -> Result<GeneratedProgram, CompileError> {
    let mut gen = CodeGenerator {
        quads: Vec::new(),
        memory: MemoryManager::new(),
        symtab: SymbolTable::new(),
        current_scope: GLOBAL_SCOPE.to_string(),
    };

    // Placeholder: skip over function bodies straight into main.
    gen.emit(Opcode::Goto, None, None, None);

    if let Some(vars) = &program.vars {
        for decl in &vars.decls {
            for name in &decl.names {
                gen.symtab.add_global(name, decl.var_type, &mut gen.memory)?;
            }
        }
    }

    for func in &program.funcs {
        gen.visit_function(func)?;
    }

    let main_entry = gen.quads.len() as i32;
    gen.quads[0].arg1 = Some(main_entry);

    gen.memory.reset_local_scope();
    gen.visit_body(&program.body)?;
    gen.emit(Opcode::End, None, None, None);
    gen.symtab.finalize_global(&gen.memory);

    Ok(GeneratedProgram { quads: gen.quads, constants: gen.memory.constants().clone(), symtab: gen.symtab })
}

struct CodeGenerator {
    quads: Vec<Quadruple>,
    memory: MemoryManager,
    symtab: SymbolTable,
    current_scope: String,
}

impl CodeGenerator {
    fn emit(&mut self, op: Opcode, arg1: Option<i32>, arg2: Option<i32>, result: Option<i32>) -> usize {
        let quad = Quadruple::new(op, &self.current_scope).with_args(arg1, arg2, result);
        self.quads.push(quad);
        self.quads.len() - 1
    }

    fn visit_function(&mut self, func: &Function) -> Result<(), CompileError> {
        self.memory.reset_local_scope();
        let entry_quad = self.quads.len();
        let params: Vec<(String, VarType)> =
            func.params.iter().map(|p| (p.name.clone(), p.var_type)).collect();
        self.symtab.add_function(&func.id, &params, entry_quad, &mut self.memory)?;

        self.current_scope = func.id.clone();

        if let Some(vars) = &func.vars {
            for decl in &vars.decls {
                for name in &decl.names {
                    self.symtab.add_local(&func.id, name, decl.var_type, &mut self.memory)?;
                }
            }
        }

        self.visit_body(&func.body)?;
        self.symtab.finalize_function(&func.id, &self.memory);
        self.emit(Opcode::Endfunc, None, None, None);
        self.current_scope = GLOBAL_SCOPE.to_string();
        Ok(())
    }

    fn visit_body(&mut self, body: &ast::Body) -> Result<(), CompileError> {
        for stmt in &body.stmts {
            self.visit_statement(stmt)?;
        }
        Ok(())
    }

    fn visit_statement(&mut self, stmt: &Statement) -> Result<(), CompileError> {
        match stmt {
            Statement::Assign(assign) => self.visit_assign(assign),
            Statement::Print(print) => self.visit_print(print),
            Statement::Condition(cond) => self.visit_condition(cond),
            Statement::Cycle(cycle) => self.visit_cycle(cycle),
            Statement::FCall(call) => self.lower_fcall(call).map(|_| ()),
        }
    }

    fn visit_assign(&mut self, assign: &ast::Assign) -> Result<(), CompileError> {
        let (rhs_vdir, rhs_type) = self.lower_expression(&assign.expr)?;
        let symbol = self.symtab.resolve(&assign.id, &self.current_scope)?.clone();
        if !cube::assignment_compatible(rhs_type, symbol.value_type) {
            return Err(CompileError::Type {
                message: format!(
                    "cannot assign {} to '{}' of type {}",
                    rhs_type.as_str(),
                    assign.id,
                    symbol.value_type.as_str()
                ),
            });
        }
        self.emit(Opcode::Assign, Some(symbol.vdir), Some(rhs_vdir), None);
        Ok(())
    }

    fn visit_print(&mut self, print: &Print) -> Result<(), CompileError> {
        for item in &print.items {
            let vdir = match item {
                PrintItem::Str(s) => self.memory.intern_str(s)?,
                PrintItem::Expr(expr) => self.lower_expression(expr)?.0,
            };
            self.emit(Opcode::Print, Some(vdir), None, None);
        }
        Ok(())
    }

    fn visit_condition(&mut self, cond: &Condition) -> Result<(), CompileError> {
        let (cond_vdir, cond_type) = self.lower_expression(&cond.cond)?;
        if cond_type != VarType::Int {
            return Err(CompileError::NonIntCondition { found: cond_type.as_str() });
        }
        let p = self.emit(Opcode::Gotof, Some(cond_vdir), None, None);
        self.visit_body(&cond.if_body)?;

        if let Some(else_body) = &cond.else_body {
            let q = self.emit(Opcode::Goto, None, None, None);
            self.quads[p].result = Some(self.quads.len() as i32);
            self.visit_body(else_body)?;
            self.quads[q].arg1 = Some(self.quads.len() as i32);
        } else {
            self.quads[p].result = Some(self.quads.len() as i32);
        }
        Ok(())
    }

    fn visit_cycle(&mut self, cycle: &Cycle) -> Result<(), CompileError> {
        let loop_start = self.quads.len() as i32;
        let (cond_vdir, cond_type) = self.lower_expression(&cycle.cond)?;
        if cond_type != VarType::Int {
            return Err(CompileError::NonIntCondition { found: cond_type.as_str() });
        }
        let p = self.emit(Opcode::Gotof, Some(cond_vdir), None, None);
        self.visit_body(&cycle.body)?;
        self.emit(Opcode::Goto, Some(loop_start), None, None);
        self.quads[p].result = Some(self.quads.len() as i32);
        Ok(())
    }

    fn lower_fcall(&mut self, call: &FCall) -> Result<(), CompileError> {
        if !self.symtab.is_function(&call.id) {
            return Err(CompileError::UndefinedFunction { name: call.id.clone() });
        }
        let params: Vec<(String, VarType)> = self
            .symtab
            .function_params(&call.id)
            .expect("checked is_function above")
            .into_iter()
            .map(|s| (s.name.clone(), s.value_type))
            .collect();

        if params.len() != call.args.len() {
            return Err(CompileError::Arity {
                function: call.id.clone(),
                expected: params.len(),
                found: call.args.len(),
            });
        }

        let alloc_idx = self.emit(Opcode::Alloc, None, None, None);
        self.quads[alloc_idx].label = Some(call.id.clone());

        for (i, arg) in call.args.iter().enumerate() {
            let (vdir, vtype) = self.lower_expression(arg)?;
            let param_type = params[i].1;
            if !cube::assignment_compatible(vtype, param_type) {
                return Err(CompileError::Type {
                    message: format!(
                        "argument {} of '{}' expects {}, found {}",
                        i,
                        call.id,
                        param_type.as_str(),
                        vtype.as_str()
                    ),
                });
            }
            let materialised = if vtype != param_type {
                let temp = self.memory.allocate_for_type(param_type, true)?;
                self.emit(Opcode::Assign, Some(temp), Some(vdir), None);
                temp
            } else {
                vdir
            };
            self.emit(Opcode::Param, Some(materialised), Some(i as i32), None);
        }

        let entry_quad = self
            .symtab
            .scope(&call.id)
            .and_then(|s| s.entry_quad)
            .expect("function scope always carries an entry_quad");
        let gosub_idx = self.emit(Opcode::Gosub, Some(entry_quad as i32), None, None);
        self.quads[gosub_idx].label = Some(call.id.clone());
        Ok(())
    }

    fn lower_expression(&mut self, expr: &Expression) -> Result<(i32, VarType), CompileError> {
        let (left_vdir, left_type) = self.lower_exp(&expr.left)?;
        match (expr.op, &expr.right) {
            (Some(op), Some(right)) => {
                let (right_vdir, right_type) = self.lower_exp(right)?;
                let result_type = cube::relational_result(op, left_type, right_type);
                let dst = self.memory.allocate_for_type(result_type, true)?;
                let opcode = match op {
                    ast::RelOp::Lt => Opcode::LessThan,
                    ast::RelOp::Gt => Opcode::GreaterThan,
                    ast::RelOp::Ne => Opcode::NotEqual,
                };
                self.emit(opcode, Some(left_vdir), Some(right_vdir), Some(dst));
                Ok((dst, result_type))
            }
            _ => Ok((left_vdir, left_type)),
        }
    }

    fn lower_exp(&mut self, exp: &Exp) -> Result<(i32, VarType), CompileError> {
        let (mut acc_vdir, mut acc_type) = self.lower_term(&exp.left_term)?;
        for (op, term) in &exp.ops {
            let (rhs_vdir, rhs_type) = self.lower_term(term)?;
            let result_type = cube::arith_result(acc_type, cube::ArithOp::from(*op), rhs_type);
            let dst = self.memory.allocate_for_type(result_type, true)?;
            let opcode = match op {
                AddOp::Plus => Opcode::Plus,
                AddOp::Minus => Opcode::Minus,
            };
            self.emit(opcode, Some(acc_vdir), Some(rhs_vdir), Some(dst));
            acc_vdir = dst;
            acc_type = result_type;
        }
        Ok((acc_vdir, acc_type))
    }

    fn lower_term(&mut self, term: &Term) -> Result<(i32, VarType), CompileError> {
        let (mut acc_vdir, mut acc_type) = self.lower_factor(&term.left_factor)?;
        for (op, factor) in &term.ops {
            let (rhs_vdir, rhs_type) = self.lower_factor(factor)?;
            let result_type = cube::arith_result(acc_type, cube::ArithOp::from(*op), rhs_type);
            let dst = self.memory.allocate_for_type(result_type, true)?;
            let opcode = match op {
                MulOp::Mult => Opcode::Mult,
                MulOp::Div => Opcode::Div,
            };
            self.emit(opcode, Some(acc_vdir), Some(rhs_vdir), Some(dst));
            acc_vdir = dst;
            acc_type = result_type;
        }
        Ok((acc_vdir, acc_type))
    }

    fn lower_factor(&mut self, factor: &Factor) -> Result<(i32, VarType), CompileError> {
        let (vdir, var_type) = match &factor.value {
            FactorValue::Identifier(name) => {
                let symbol = self.symtab.resolve(name, &self.current_scope)?;
                (symbol.vdir, symbol.value_type)
            }
            FactorValue::Number(NumberLiteral::Int(n)) => {
                let value = if factor.sign == Sign::Minus { -n } else { *n };
                (self.memory.intern_int(value)?, VarType::Int)
            }
            FactorValue::Number(NumberLiteral::Float(n)) => {
                let value = if factor.sign == Sign::Minus { -n } else { *n };
                (self.memory.intern_float(value)?, VarType::Float)
            }
            FactorValue::Nested(inner) => return self.lower_signed_expression(inner, factor.sign),
        };

        if factor.sign == Sign::Minus && matches!(factor.value, FactorValue::Identifier(_)) {
            return self.negate(vdir, var_type);
        }
        Ok((vdir, var_type))
    }

    fn lower_signed_expression(
        &mut self,
        expr: &Expression,
        sign: Sign,
    ) -> Result<(i32, VarType), CompileError> {
        let (vdir, var_type) = self.lower_expression(expr)?;
        if sign == Sign::Minus {
            self.negate(vdir, var_type)
        } else {
            Ok((vdir, var_type))
        }
    }

    fn negate(&mut self, vdir: i32, var_type: VarType) -> Result<(i32, VarType), CompileError> {
        let zero = match var_type {
            VarType::Int => self.memory.intern_int(0)?,
            VarType::Float => self.memory.intern_float(0.0)?,
        };
        let temp = self.memory.allocate_for_type(var_type, true)?;
        self.emit(Opcode::Minus, Some(zero), Some(vdir), Some(temp));
        Ok((temp, var_type))
    }
}
