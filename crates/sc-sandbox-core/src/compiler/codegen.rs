//! Lowers a parsed [`Module`] to bytecode.
//!
//! Layout: `Main` first (so the entry point sits at offset 0), then every
//! other function in source order. Each function opens with `INITSLOT` and
//! ends with an implicit `return None`. Call targets are patched once every
//! function has been placed.

use std::collections::HashMap;

use crate::debug_info::{FunctionInfo, FunctionSignature, SequencePoint};
use crate::script::{ContractScript, OpCode, ScriptBuilder};
use crate::vm::interop::Syscall;

use super::ast::{BinaryOp, Expr, FunctionDef, Module, Stmt, StmtKind, UnaryOp};
use super::CompileError;

/// Name of the contract entry point.
pub const ENTRY_POINT: &str = "Main";

const SOURCE_FILE_ID: u32 = 1;

/// Bytecode plus the tables that go into the debug sidecar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCode {
    pub script: ContractScript,
    pub entry_point: FunctionSignature,
    pub functions: Vec<FunctionInfo>,
    pub map: Vec<SequencePoint>,
}

/// Callable names visible to a function body.
enum Callee<'m> {
    Function(&'m FunctionDef),
    Syscall(Syscall),
    Len,
}

struct Scope {
    args: HashMap<String, u8>,
    locals: HashMap<String, u8>,
}

pub fn generate(module: &Module) -> Result<GeneratedCode, CompileError> {
    CodeGenerator::new(module)?.run()
}

struct CodeGenerator<'m> {
    module: &'m Module,
    functions: HashMap<&'m str, &'m FunctionDef>,
    builder: ScriptBuilder,
    starts: HashMap<&'m str, usize>,
    call_fixups: Vec<(usize, &'m str)>,
    infos: Vec<FunctionInfo>,
    map: Vec<SequencePoint>,
}

impl<'m> CodeGenerator<'m> {
    fn new(module: &'m Module) -> Result<Self, CompileError> {
        let mut functions = HashMap::new();
        for function in &module.functions {
            if functions.insert(function.name.as_str(), function).is_some() {
                return Err(semantic(
                    function.line,
                    format!("function '{}' is defined more than once", function.name),
                ));
            }
        }
        Ok(Self {
            module,
            functions,
            builder: ScriptBuilder::new(),
            starts: HashMap::new(),
            call_fixups: Vec::new(),
            infos: Vec::new(),
            map: Vec::new(),
        })
    }

    fn run(mut self) -> Result<GeneratedCode, CompileError> {
        let entry = *self.functions.get(ENTRY_POINT).ok_or_else(|| {
            semantic(0, format!("no '{}' entry point is defined", ENTRY_POINT))
        })?;
        let entry_arity = u8::try_from(entry.params.len())
            .map_err(|_| semantic(entry.line, "entry point declares too many parameters"))?;

        self.emit_function(entry)?;
        let module = self.module;
        for function in &module.functions {
            if function.name != ENTRY_POINT {
                self.emit_function(function)?;
            }
        }

        for (operand_pos, name) in std::mem::take(&mut self.call_fixups) {
            // every callee was checked against `functions` when the call was emitted
            if let Some(&start) = self.starts.get(name) {
                self.builder.patch_target(operand_pos, start);
            }
        }

        Ok(GeneratedCode {
            script: ContractScript::new(entry_arity, self.builder.into_code()),
            entry_point: FunctionSignature {
                name: entry.name.clone(),
                params: entry.params.clone(),
            },
            functions: self.infos,
            map: self.map,
        })
    }

    fn emit_function(&mut self, function: &'m FunctionDef) -> Result<(), CompileError> {
        let start = self.builder.offset();
        self.starts.insert(function.name.as_str(), start);

        let too_many = |what: &str| {
            semantic(function.line, format!("'{}' has too many {}", function.name, what))
        };

        let arg_count = u8::try_from(function.params.len()).map_err(|_| too_many("parameters"))?;
        let args: HashMap<String, u8> = function
            .params
            .iter()
            .zip(0u8..)
            .map(|(param, index)| (param.clone(), index))
            .collect();

        let mut assigned = Vec::new();
        function.body.iter().for_each(|s| s.assigned_names(&mut assigned));
        let mut locals: HashMap<String, u8> = HashMap::new();
        for name in assigned {
            if args.contains_key(name) || locals.contains_key(name) {
                continue;
            }
            let index = u8::try_from(locals.len()).map_err(|_| too_many("local variables"))?;
            locals.insert(name.to_string(), index);
        }
        let local_count = u8::try_from(locals.len()).map_err(|_| too_many("local variables"))?;

        self.builder.emit_init_slot(local_count, arg_count);
        let scope = Scope { args, locals };

        self.emit_block(&function.body, &scope)?;

        // implicit `return None`
        self.push_data(&[], function.line)?;
        self.builder.emit(OpCode::Ret);

        self.infos.push(FunctionInfo {
            name: function.name.clone(),
            params: function.params.clone(),
            start,
            end: self.builder.offset(),
        });
        Ok(())
    }

    // ── Statements ──────────────────────────────────────────────────

    fn emit_block(&mut self, body: &'m [Stmt], scope: &Scope) -> Result<(), CompileError> {
        for stmt in body {
            self.emit_stmt(stmt, scope)?;
        }
        Ok(())
    }

    fn emit_stmt(&mut self, stmt: &'m Stmt, scope: &Scope) -> Result<(), CompileError> {
        let start = self.builder.offset();

        match &stmt.kind {
            StmtKind::Assign { target, value } => {
                self.emit_expr(value, scope)?;
                if let Some(&index) = scope.args.get(target) {
                    self.builder.emit_u8(OpCode::StArg, index);
                } else if let Some(&index) = scope.locals.get(target) {
                    self.builder.emit_u8(OpCode::StLoc, index);
                } else {
                    return Err(semantic(stmt.line, format!("cannot assign to '{}'", target)));
                }
            }
            StmtKind::If { branches, orelse } => {
                let mut end_jumps = Vec::new();
                for (cond, body) in branches {
                    self.emit_expr(cond, scope)?;
                    let skip = self.builder.emit_jump(OpCode::JmpIfNot);
                    self.emit_block(body, scope)?;
                    end_jumps.push(self.builder.emit_jump(OpCode::Jmp));
                    let next = self.builder.offset();
                    self.builder.patch_target(skip, next);
                }
                self.emit_block(orelse, scope)?;
                let end = self.builder.offset();
                for jump in end_jumps {
                    self.builder.patch_target(jump, end);
                }
            }
            StmtKind::While { cond, body } => {
                let top = self.builder.offset();
                self.emit_expr(cond, scope)?;
                let exit = self.builder.emit_jump(OpCode::JmpIfNot);
                self.emit_block(body, scope)?;
                let back = self.builder.emit_jump(OpCode::Jmp);
                self.builder.patch_target(back, top);
                let end = self.builder.offset();
                self.builder.patch_target(exit, end);
            }
            StmtKind::Return(value) => {
                match value {
                    Some(expr) => self.emit_expr(expr, scope)?,
                    None => self.push_data(&[], stmt.line)?,
                }
                self.builder.emit(OpCode::Ret);
            }
            StmtKind::Pass => {}
            // docstrings and bare literals compile to nothing
            StmtKind::Expr(Expr::Str(_) | Expr::Int(_) | Expr::Bool(_) | Expr::None) => {}
            StmtKind::Expr(expr) => {
                let pushes = self.emit_value_or_effect(expr, scope)?;
                if pushes {
                    self.builder.emit(OpCode::Drop);
                }
            }
        }

        let end = self.builder.offset();
        if end > start {
            self.map.push(SequencePoint {
                start,
                end,
                file: SOURCE_FILE_ID,
                line: stmt.line,
            });
        }
        Ok(())
    }

    // ── Expressions ─────────────────────────────────────────────────

    /// Emit an expression whose value is needed on the stack.
    fn emit_expr(&mut self, expr: &'m Expr, scope: &Scope) -> Result<(), CompileError> {
        if !self.emit_value_or_effect(expr, scope)? {
            let (name, line) = match expr {
                Expr::Call { name, line, .. } => (name.as_str(), *line),
                _ => ("expression", 0),
            };
            return Err(semantic(line, format!("'{}' does not return a value", name)));
        }
        Ok(())
    }

    /// Emit an expression, returning whether it left a value on the stack.
    fn emit_value_or_effect(&mut self, expr: &'m Expr, scope: &Scope) -> Result<bool, CompileError> {
        match expr {
            Expr::Int(n) => self.builder.emit_push_int(*n),
            Expr::Str(s) => self.push_data(s.as_bytes(), 0)?,
            Expr::Bool(b) => self.builder.emit_push_bool(*b),
            Expr::None => self.push_data(&[], 0)?,
            Expr::Name { name, line } => {
                if let Some(&index) = scope.args.get(name) {
                    self.builder.emit_u8(OpCode::LdArg, index);
                } else if let Some(&index) = scope.locals.get(name) {
                    self.builder.emit_u8(OpCode::LdLoc, index);
                } else {
                    return Err(semantic(*line, format!("name '{}' is not defined", name)));
                }
            }
            Expr::Unary { op, operand } => {
                self.emit_expr(operand, scope)?;
                self.builder.emit(match op {
                    UnaryOp::Neg => OpCode::Negate,
                    UnaryOp::Not => OpCode::Not,
                });
            }
            Expr::Binary { op, lhs, rhs } => {
                self.emit_expr(lhs, scope)?;
                self.emit_expr(rhs, scope)?;
                self.builder.emit(binary_opcode(*op));
            }
            Expr::Call { name, args, line } => return self.emit_call(name, args, *line, scope),
        }
        Ok(true)
    }

    fn emit_call(
        &mut self,
        name: &'m str,
        args: &'m [Expr],
        line: usize,
        scope: &Scope,
    ) -> Result<bool, CompileError> {
        let callee = self.resolve(name).ok_or_else(|| {
            semantic(line, format!("call to undefined function '{}'", name))
        })?;

        let expected = match &callee {
            Callee::Function(f) => f.params.len(),
            Callee::Syscall(s) => s.arity(),
            Callee::Len => 1,
        };
        if args.len() != expected {
            return Err(semantic(
                line,
                format!(
                    "'{}' takes {} argument{} but {} were given",
                    name,
                    expected,
                    if expected == 1 { "" } else { "s" },
                    args.len()
                ),
            ));
        }

        for arg in args {
            self.emit_expr(arg, scope)?;
        }

        match callee {
            Callee::Function(f) => {
                let operand = self.builder.emit_jump(OpCode::Call);
                self.call_fixups.push((operand, f.name.as_str()));
                Ok(true)
            }
            Callee::Syscall(syscall) => {
                self.builder.emit_u8(OpCode::Syscall, syscall.id());
                Ok(syscall.returns_value())
            }
            Callee::Len => {
                self.builder.emit(OpCode::Size);
                Ok(true)
            }
        }
    }

    /// Contract functions shadow builtins of the same name.
    fn resolve(&self, name: &str) -> Option<Callee<'m>> {
        if let Some(&f) = self.functions.get(name) {
            return Some(Callee::Function(f));
        }
        if name == "len" {
            return Some(Callee::Len);
        }
        Syscall::from_name(name).map(Callee::Syscall)
    }

    fn push_data(&mut self, data: &[u8], line: usize) -> Result<(), CompileError> {
        self.builder
            .emit_push_data(data)
            .map_err(|e| semantic(line, e.to_string()))
    }
}

fn binary_opcode(op: BinaryOp) -> OpCode {
    match op {
        BinaryOp::Add => OpCode::Add,
        BinaryOp::Sub => OpCode::Sub,
        BinaryOp::Mul => OpCode::Mul,
        BinaryOp::Div => OpCode::Div,
        BinaryOp::Mod => OpCode::Mod,
        BinaryOp::Eq => OpCode::Equal,
        BinaryOp::NotEq => OpCode::NotEqual,
        BinaryOp::Lt => OpCode::Lt,
        BinaryOp::Le => OpCode::Le,
        BinaryOp::Gt => OpCode::Gt,
        BinaryOp::Ge => OpCode::Ge,
        BinaryOp::And => OpCode::BoolAnd,
        BinaryOp::Or => OpCode::BoolOr,
    }
}

fn semantic(line: usize, message: impl Into<String>) -> CompileError {
    CompileError::Semantic {
        line,
        message: message.into(),
    }
}
