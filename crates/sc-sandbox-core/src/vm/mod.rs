//! Gas-metered stack machine that runs contract bytecode.
//!
//! # Execution model
//!
//! - One evaluation stack shared by all frames. Calls pass arguments on it.
//! - `INITSLOT locals args` pops `args` items into the current frame's
//!   argument slots; the deepest popped item becomes argument 0.
//! - `RET` from the outermost frame halts; the evaluation stack then holds
//!   the results.
//! - Every fault is a [`VmFault`] value recorded on the engine. Nothing in
//!   the step loop panics on malformed bytecode.
//!
//! # Example
//!
//! ```ignore
//! let mut engine = ExecutionEngine::new(script, context, limits, meter);
//! engine.load_arguments(args);
//! if engine.execute() == VmState::Halt {
//!     println!("{:?}", engine.result_stack());
//! }
//! ```

pub mod interop;
pub mod stack_item;

use serde::Serialize;
use std::fmt;
use tracing::{debug, info, trace};

use sc_sandbox_types::{Fixed8, ScriptHash};

use crate::gas::{syscall_cost, GasError, GasMeter, OPCODE_COST};
use crate::script::{ContractScript, Instruction, ScriptError};

pub use interop::{InvocationContext, LogEntry, Notification, Storage, Syscall};
pub use stack_item::StackItem;

// =============================================================================
// State and faults
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VmState {
    /// Loaded but not yet run to completion.
    None,
    Halt,
    Fault,
}

impl fmt::Display for VmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmState::None => write!(f, "NONE"),
            VmState::Halt => write!(f, "HALT"),
            VmState::Fault => write!(f, "FAULT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmFault {
    /// Entry point received a different number of arguments than it declares.
    ArgumentCount { expected: usize, provided: usize },
    InvalidScript(ScriptError),
    StackUnderflow { offset: usize },
    StackOverflow { limit: usize },
    InvocationDepth { limit: usize },
    StepLimit { limit: u64 },
    ItemTooLarge { size: usize, limit: usize },
    InvalidSlot { offset: usize, index: u8 },
    SlotAlreadyInitialized { offset: usize },
    InvalidJump { offset: usize, target: u32 },
    TypeMismatch { offset: usize, found: &'static str },
    IntegerOverflow { offset: usize },
    DivisionByZero { offset: usize },
    UnknownSyscall { offset: usize, id: u8 },
    StorageDisabled { offset: usize, syscall: &'static str },
    OutOfGas(GasError),
}

impl fmt::Display for VmFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmFault::ArgumentCount { expected, provided } if provided < expected => write!(
                f,
                "insufficient arguments: entry point expects {}, got {}",
                expected, provided
            ),
            VmFault::ArgumentCount { expected, provided } => write!(
                f,
                "too many arguments: entry point expects {}, got {}",
                expected, provided
            ),
            VmFault::InvalidScript(e) => write!(f, "invalid script: {}", e),
            VmFault::StackUnderflow { offset } => {
                write!(f, "stack underflow at offset {}", offset)
            }
            VmFault::StackOverflow { limit } => {
                write!(f, "evaluation stack exceeded {} items", limit)
            }
            VmFault::InvocationDepth { limit } => {
                write!(f, "invocation depth exceeded {}", limit)
            }
            VmFault::StepLimit { limit } => write!(f, "step limit of {} exceeded", limit),
            VmFault::ItemTooLarge { size, limit } => {
                write!(f, "item of {} bytes exceeds limit of {}", size, limit)
            }
            VmFault::InvalidSlot { offset, index } => {
                write!(f, "invalid slot {} at offset {}", index, offset)
            }
            VmFault::SlotAlreadyInitialized { offset } => {
                write!(f, "slots initialized twice at offset {}", offset)
            }
            VmFault::InvalidJump { offset, target } => {
                write!(f, "jump to invalid target {} at offset {}", target, offset)
            }
            VmFault::TypeMismatch { offset, found } => write!(
                f,
                "expected an integer at offset {}, found {}",
                offset, found
            ),
            VmFault::IntegerOverflow { offset } => {
                write!(f, "integer overflow at offset {}", offset)
            }
            VmFault::DivisionByZero { offset } => {
                write!(f, "division by zero at offset {}", offset)
            }
            VmFault::UnknownSyscall { offset, id } => {
                write!(f, "unknown syscall 0x{:02x} at offset {}", id, offset)
            }
            VmFault::StorageDisabled { offset, syscall } => write!(
                f,
                "{} at offset {} requires storage, but the invocation did not request it",
                syscall, offset
            ),
            VmFault::OutOfGas(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for VmFault {}

impl From<GasError> for VmFault {
    fn from(e: GasError) -> Self {
        VmFault::OutOfGas(e)
    }
}

// =============================================================================
// Limits
// =============================================================================

/// Resource limits applied to a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineLimits {
    pub max_steps: u64,
    pub max_stack_size: usize,
    pub max_invocation_depth: usize,
    pub max_item_size: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_steps: 1_000_000,
            max_stack_size: 2 * 1024,
            max_invocation_depth: 1024,
            max_item_size: 1024 * 1024,
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    ip: usize,
    /// `None` for the entry frame.
    return_ip: Option<usize>,
    args: Vec<StackItem>,
    locals: Vec<StackItem>,
    slots_initialized: bool,
}

impl Frame {
    fn at(ip: usize, return_ip: Option<usize>) -> Self {
        Self {
            ip,
            return_ip,
            args: Vec::new(),
            locals: Vec::new(),
            slots_initialized: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionEngine {
    script: ContractScript,
    context: InvocationContext,
    limits: EngineLimits,
    gas: GasMeter,
    state: VmState,
    eval_stack: Vec<StackItem>,
    frames: Vec<Frame>,
    storage: Storage,
    notifications: Vec<Notification>,
    logs: Vec<LogEntry>,
    ops_executed: u64,
    fault: Option<VmFault>,
    fault_offset: Option<usize>,
    arguments_provided: usize,
}

impl ExecutionEngine {
    pub fn new(
        script: ContractScript,
        context: InvocationContext,
        limits: EngineLimits,
        gas: GasMeter,
    ) -> Self {
        Self {
            script,
            context,
            limits,
            gas,
            state: VmState::None,
            eval_stack: Vec::new(),
            frames: vec![Frame::at(0, None)],
            storage: Storage::new(),
            notifications: Vec::new(),
            logs: Vec::new(),
            ops_executed: 0,
            fault: None,
            fault_offset: None,
            arguments_provided: 0,
        }
    }

    /// Push entry-point arguments in declaration order.
    pub fn load_arguments(&mut self, args: impl IntoIterator<Item = StackItem>) {
        for item in args {
            self.eval_stack.push(item);
            self.arguments_provided += 1;
        }
    }

    /// Run until halt or fault. Calling again after completion is a no-op.
    pub fn execute(&mut self) -> VmState {
        if self.state != VmState::None {
            return self.state;
        }

        let expected = self.script.entry_arity as usize;
        if self.arguments_provided != expected {
            self.set_fault(
                VmFault::ArgumentCount {
                    expected,
                    provided: self.arguments_provided,
                },
                Some(0),
            );
            return self.state;
        }

        debug!(
            script_hash = %self.context.script_hash,
            gas_limit = %self.gas.limit(),
            "starting execution"
        );

        while self.state == VmState::None {
            let offset = self.current_ip();
            if let Err(fault) = self.step() {
                self.set_fault(fault, offset);
            }
        }

        debug!(
            state = %self.state,
            ops = self.ops_executed,
            gas = %self.gas.consumed(),
            "execution finished"
        );
        self.state
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn state(&self) -> VmState {
        self.state
    }

    /// Evaluation stack, top first.
    pub fn result_stack(&self) -> Vec<StackItem> {
        self.eval_stack.iter().rev().cloned().collect()
    }

    pub fn ops_executed(&self) -> u64 {
        self.ops_executed
    }

    pub fn gas_consumed(&self) -> Fixed8 {
        self.gas.consumed()
    }

    pub fn gas_limit(&self) -> Fixed8 {
        self.gas.limit()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn fault(&self) -> Option<&VmFault> {
        self.fault.as_ref()
    }

    /// Code offset of the instruction that faulted.
    pub fn fault_offset(&self) -> Option<usize> {
        self.fault_offset
    }

    pub fn script_hash(&self) -> ScriptHash {
        self.context.script_hash
    }

    // ── Step loop ───────────────────────────────────────────────────

    fn current_ip(&self) -> Option<usize> {
        self.frames.last().map(|f| f.ip)
    }

    fn set_fault(&mut self, fault: VmFault, offset: Option<usize>) {
        debug!(error = %fault, offset = ?offset, "vm fault");
        self.state = VmState::Fault;
        self.fault = Some(fault);
        self.fault_offset = offset;
    }

    fn step(&mut self) -> Result<(), VmFault> {
        let Some(offset) = self.current_ip() else {
            self.state = VmState::Halt;
            return Ok(());
        };

        // running off the end of the code behaves like RET
        if offset >= self.script.code.len() {
            return self.ret();
        }

        if self.ops_executed >= self.limits.max_steps {
            return Err(VmFault::StepLimit {
                limit: self.limits.max_steps,
            });
        }

        let (instruction, next) =
            Instruction::decode(&self.script.code, offset).map_err(VmFault::InvalidScript)?;

        let cost = match &instruction {
            Instruction::Syscall(id) => Syscall::from_id(*id)
                .map(syscall_cost)
                .unwrap_or(OPCODE_COST),
            _ => OPCODE_COST,
        };
        self.gas.charge(cost)?;
        self.ops_executed += 1;
        trace!(offset, %instruction, "step");

        if let Some(frame) = self.frames.last_mut() {
            frame.ip = next;
        }

        self.dispatch(instruction, offset, next)?;

        if self.eval_stack.len() > self.limits.max_stack_size {
            return Err(VmFault::StackOverflow {
                limit: self.limits.max_stack_size,
            });
        }
        Ok(())
    }

    fn dispatch(&mut self, instruction: Instruction, offset: usize, next: usize) -> Result<(), VmFault> {
        match instruction {
            Instruction::Nop => {}
            Instruction::PushInt(v) => self.push(StackItem::Integer(v as i128))?,
            Instruction::PushData(data) => self.push(StackItem::ByteArray(data))?,
            Instruction::PushBool(b) => self.push(StackItem::Boolean(b))?,

            Instruction::InitSlot { locals, args } => self.init_slot(offset, locals, args)?,
            Instruction::LdArg(i) => {
                let item = self.frame()?.args.get(i as usize).cloned();
                let item = item.ok_or(VmFault::InvalidSlot { offset, index: i })?;
                self.push(item)?;
            }
            Instruction::StArg(i) => {
                let item = self.pop(offset)?;
                let slot = self.frame_mut()?.args.get_mut(i as usize);
                *slot.ok_or(VmFault::InvalidSlot { offset, index: i })? = item;
            }
            Instruction::LdLoc(i) => {
                let item = self.frame()?.locals.get(i as usize).cloned();
                let item = item.ok_or(VmFault::InvalidSlot { offset, index: i })?;
                self.push(item)?;
            }
            Instruction::StLoc(i) => {
                let item = self.pop(offset)?;
                let slot = self.frame_mut()?.locals.get_mut(i as usize);
                *slot.ok_or(VmFault::InvalidSlot { offset, index: i })? = item;
            }

            Instruction::Add => self.binary_int(offset, i128::checked_add)?,
            Instruction::Sub => self.binary_int(offset, i128::checked_sub)?,
            Instruction::Mul => self.binary_int(offset, i128::checked_mul)?,
            Instruction::Div | Instruction::Mod => {
                let b = self.pop_integer(offset)?;
                let a = self.pop_integer(offset)?;
                if b == 0 {
                    return Err(VmFault::DivisionByZero { offset });
                }
                let result = if instruction == Instruction::Div {
                    a.checked_div(b)
                } else {
                    a.checked_rem(b)
                };
                let result = result.ok_or(VmFault::IntegerOverflow { offset })?;
                self.push(StackItem::Integer(result))?;
            }
            Instruction::Negate => {
                let a = self.pop_integer(offset)?;
                let result = a.checked_neg().ok_or(VmFault::IntegerOverflow { offset })?;
                self.push(StackItem::Integer(result))?;
            }

            Instruction::Equal | Instruction::NotEqual => {
                let b = self.pop(offset)?;
                let a = self.pop(offset)?;
                let equal = a.equals(&b);
                self.push(StackItem::Boolean(if instruction == Instruction::Equal {
                    equal
                } else {
                    !equal
                }))?;
            }
            Instruction::Lt => self.compare(offset, |a, b| a < b)?,
            Instruction::Le => self.compare(offset, |a, b| a <= b)?,
            Instruction::Gt => self.compare(offset, |a, b| a > b)?,
            Instruction::Ge => self.compare(offset, |a, b| a >= b)?,
            Instruction::Not => {
                let a = self.pop(offset)?;
                self.push(StackItem::Boolean(!a.to_bool()))?;
            }
            Instruction::BoolAnd | Instruction::BoolOr => {
                let b = self.pop(offset)?.to_bool();
                let a = self.pop(offset)?.to_bool();
                let result = if instruction == Instruction::BoolAnd {
                    a && b
                } else {
                    a || b
                };
                self.push(StackItem::Boolean(result))?;
            }
            Instruction::Size => {
                let a = self.pop(offset)?;
                self.push(StackItem::Integer(a.byte_len() as i128))?;
            }

            Instruction::Jmp(target) => self.jump(offset, target)?,
            Instruction::JmpIf(target) => {
                if self.pop(offset)?.to_bool() {
                    self.jump(offset, target)?;
                }
            }
            Instruction::JmpIfNot(target) => {
                if !self.pop(offset)?.to_bool() {
                    self.jump(offset, target)?;
                }
            }
            Instruction::Call(target) => {
                if self.frames.len() >= self.limits.max_invocation_depth {
                    return Err(VmFault::InvocationDepth {
                        limit: self.limits.max_invocation_depth,
                    });
                }
                self.check_target(offset, target)?;
                self.frames.push(Frame::at(target as usize, Some(next)));
            }
            Instruction::Ret => self.ret()?,
            Instruction::Syscall(id) => self.syscall(offset, id)?,
            Instruction::Drop => {
                self.pop(offset)?;
            }
        }
        Ok(())
    }

    // ── Stack helpers ───────────────────────────────────────────────

    fn push(&mut self, item: StackItem) -> Result<(), VmFault> {
        let size = item.byte_len();
        if size > self.limits.max_item_size {
            return Err(VmFault::ItemTooLarge {
                size,
                limit: self.limits.max_item_size,
            });
        }
        self.eval_stack.push(item);
        Ok(())
    }

    fn pop(&mut self, offset: usize) -> Result<StackItem, VmFault> {
        self.eval_stack
            .pop()
            .ok_or(VmFault::StackUnderflow { offset })
    }

    fn pop_integer(&mut self, offset: usize) -> Result<i128, VmFault> {
        let item = self.pop(offset)?;
        item.to_integer().ok_or(VmFault::TypeMismatch {
            offset,
            found: item.type_name(),
        })
    }

    fn binary_int(
        &mut self,
        offset: usize,
        op: impl Fn(i128, i128) -> Option<i128>,
    ) -> Result<(), VmFault> {
        let b = self.pop_integer(offset)?;
        let a = self.pop_integer(offset)?;
        let result = op(a, b).ok_or(VmFault::IntegerOverflow { offset })?;
        self.push(StackItem::Integer(result))
    }

    fn compare(&mut self, offset: usize, op: impl Fn(i128, i128) -> bool) -> Result<(), VmFault> {
        let b = self.pop_integer(offset)?;
        let a = self.pop_integer(offset)?;
        self.push(StackItem::Boolean(op(a, b)))
    }

    // ── Frames ──────────────────────────────────────────────────────

    fn frame(&self) -> Result<&Frame, VmFault> {
        self.frames
            .last()
            .ok_or(VmFault::InvocationDepth { limit: 0 })
    }

    fn frame_mut(&mut self) -> Result<&mut Frame, VmFault> {
        self.frames
            .last_mut()
            .ok_or(VmFault::InvocationDepth { limit: 0 })
    }

    fn init_slot(&mut self, offset: usize, locals: u8, args: u8) -> Result<(), VmFault> {
        if self.frame()?.slots_initialized {
            return Err(VmFault::SlotAlreadyInitialized { offset });
        }
        let wanted = args as usize;
        if self.eval_stack.len() < wanted {
            return Err(VmFault::ArgumentCount {
                expected: wanted,
                provided: self.eval_stack.len(),
            });
        }
        let popped = self.eval_stack.split_off(self.eval_stack.len() - wanted);
        let frame = self.frame_mut()?;
        frame.args = popped;
        frame.locals = vec![StackItem::empty(); locals as usize];
        frame.slots_initialized = true;
        Ok(())
    }

    fn check_target(&self, offset: usize, target: u32) -> Result<(), VmFault> {
        if target as usize >= self.script.code.len() {
            return Err(VmFault::InvalidJump { offset, target });
        }
        Ok(())
    }

    fn jump(&mut self, offset: usize, target: u32) -> Result<(), VmFault> {
        self.check_target(offset, target)?;
        self.frame_mut()?.ip = target as usize;
        Ok(())
    }

    fn ret(&mut self) -> Result<(), VmFault> {
        let frame = self
            .frames
            .pop()
            .ok_or(VmFault::InvocationDepth { limit: 0 })?;
        match frame.return_ip {
            Some(ip) => self.frame_mut()?.ip = ip,
            None => self.state = VmState::Halt,
        }
        Ok(())
    }

    // ── Interop ─────────────────────────────────────────────────────

    fn expect_context(&self, offset: usize, item: &StackItem) -> Result<(), VmFault> {
        match item {
            StackItem::InteropContext => Ok(()),
            other => Err(VmFault::TypeMismatch {
                offset,
                found: other.type_name(),
            }),
        }
    }

    fn syscall(&mut self, offset: usize, id: u8) -> Result<(), VmFault> {
        let syscall = Syscall::from_id(id).ok_or(VmFault::UnknownSyscall { offset, id })?;
        if syscall.touches_storage() && !self.context.storage_enabled {
            return Err(VmFault::StorageDisabled {
                offset,
                syscall: syscall.name(),
            });
        }
        let contract = self.context.script_hash;

        match syscall {
            Syscall::GetContext => self.push(StackItem::InteropContext)?,
            Syscall::Get => {
                let key = self.pop(offset)?;
                let ctx = self.pop(offset)?;
                self.expect_context(offset, &ctx)?;
                let value = self.storage.get(&contract, &key.to_bytes());
                self.push(StackItem::ByteArray(value))?;
            }
            Syscall::Put => {
                let value = self.pop(offset)?;
                let key = self.pop(offset)?;
                let ctx = self.pop(offset)?;
                self.expect_context(offset, &ctx)?;
                self.storage.put(&contract, key.to_bytes(), value.to_bytes());
            }
            Syscall::Delete => {
                let key = self.pop(offset)?;
                let ctx = self.pop(offset)?;
                self.expect_context(offset, &ctx)?;
                self.storage.delete(&contract, &key.to_bytes());
            }
            Syscall::Notify => {
                let state = self.pop(offset)?;
                debug!(%state, "notify");
                self.notifications.push(Notification {
                    script_hash: contract,
                    state,
                });
            }
            Syscall::Log => {
                let message = self.pop(offset)?;
                let message = String::from_utf8_lossy(&message.to_bytes()).into_owned();
                info!(contract = %contract, %message, "contract log");
                self.logs.push(LogEntry {
                    script_hash: contract,
                    message,
                });
            }
            Syscall::CheckWitness => {
                let hash = self.pop(offset)?;
                let witnessed = ScriptHash::from_slice(&hash.to_bytes())
                    .map(|h| self.context.witnesses.contains(&h))
                    .unwrap_or(false);
                self.push(StackItem::Boolean(witnessed))?;
            }
            Syscall::GetAttachedGas => {
                let units = self.context.attached_gas.units() as i128;
                self.push(StackItem::Integer(units))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{OpCode, ScriptBuilder};

    fn engine_for(builder: ScriptBuilder, arity: u8, storage: bool) -> ExecutionEngine {
        let script = ContractScript::new(arity, builder.into_code());
        let context = InvocationContext {
            script_hash: script.script_hash(),
            storage_enabled: storage,
            ..Default::default()
        };
        ExecutionEngine::new(
            script,
            context,
            EngineLimits::default(),
            GasMeter::new(Fixed8::from_whole(10).unwrap(), Fixed8::ONE),
        )
    }

    #[test]
    fn test_add_arguments() {
        let mut b = ScriptBuilder::new();
        b.emit_init_slot(0, 2);
        b.emit_u8(OpCode::LdArg, 0);
        b.emit_u8(OpCode::LdArg, 1);
        b.emit(OpCode::Sub);
        b.emit(OpCode::Ret);

        let mut engine = engine_for(b, 2, false);
        engine.load_arguments([StackItem::Integer(10), StackItem::Integer(3)]);
        assert_eq!(engine.execute(), VmState::Halt);
        assert_eq!(engine.result_stack(), vec![StackItem::Integer(7)]);
        assert_eq!(engine.ops_executed(), 5);
        assert_eq!(engine.gas_consumed(), Fixed8::from_units(500_000));
    }

    #[test]
    fn test_argument_count_mismatch_faults() {
        let mut b = ScriptBuilder::new();
        b.emit_init_slot(0, 3);
        b.emit(OpCode::Ret);

        let mut engine = engine_for(b, 3, false);
        engine.load_arguments([StackItem::Integer(1), StackItem::Integer(2)]);
        assert_eq!(engine.execute(), VmState::Fault);
        let fault = engine.fault().unwrap();
        assert!(fault.to_string().contains("insufficient arguments"));
        assert_eq!(engine.ops_executed(), 0);
    }

    #[test]
    fn test_call_and_return() {
        let mut b = ScriptBuilder::new();
        // Main: return double(21)
        b.emit_init_slot(0, 0);
        b.emit_push_int(21);
        let call = b.emit_jump(OpCode::Call);
        b.emit(OpCode::Ret);
        let double = b.offset();
        b.emit_init_slot(0, 1);
        b.emit_u8(OpCode::LdArg, 0);
        b.emit_push_int(2);
        b.emit(OpCode::Mul);
        b.emit(OpCode::Ret);
        b.patch_target(call, double);

        let mut engine = engine_for(b, 0, false);
        assert_eq!(engine.execute(), VmState::Halt);
        assert_eq!(engine.result_stack(), vec![StackItem::Integer(42)]);
    }

    #[test]
    fn test_storage_round_trip_and_notify() {
        let mut b = ScriptBuilder::new();
        b.emit_u8(OpCode::Syscall, Syscall::GetContext.id());
        b.emit_push_data(b"key").unwrap();
        b.emit_push_int(5);
        b.emit_u8(OpCode::Syscall, Syscall::Put.id());
        b.emit_u8(OpCode::Syscall, Syscall::GetContext.id());
        b.emit_push_data(b"key").unwrap();
        b.emit_u8(OpCode::Syscall, Syscall::Get.id());
        b.emit_push_data(b"done").unwrap();
        b.emit_u8(OpCode::Syscall, Syscall::Notify.id());
        b.emit(OpCode::Ret);

        let mut engine = engine_for(b, 0, true);
        assert_eq!(engine.execute(), VmState::Halt);
        assert_eq!(engine.result_stack(), vec![StackItem::ByteArray(vec![5])]);
        assert_eq!(engine.storage().len(), 1);
        assert_eq!(engine.notifications().len(), 1);
        // two storage writes/reads dominate the bill
        assert!(engine.gas_consumed() > Fixed8::ONE);
    }

    #[test]
    fn test_storage_disabled_faults() {
        let mut b = ScriptBuilder::new();
        b.emit_u8(OpCode::Syscall, Syscall::GetContext.id());
        b.emit(OpCode::Ret);

        let mut engine = engine_for(b, 0, false);
        assert_eq!(engine.execute(), VmState::Fault);
        assert!(matches!(
            engine.fault(),
            Some(VmFault::StorageDisabled { offset: 0, .. })
        ));
        assert_eq!(engine.fault_offset(), Some(0));
    }

    #[test]
    fn test_infinite_loop_hits_gas_limit() {
        let mut b = ScriptBuilder::new();
        let jump = b.emit_jump(OpCode::Jmp);
        b.patch_target(jump, 0);

        let mut engine = engine_for(b, 0, false);
        assert_eq!(engine.execute(), VmState::Fault);
        assert!(matches!(engine.fault(), Some(VmFault::OutOfGas(_))));
        assert_eq!(engine.ops_executed(), 10_000);
    }

    #[test]
    fn test_division_by_zero() {
        let mut b = ScriptBuilder::new();
        b.emit_push_int(1);
        b.emit_push_int(0);
        b.emit(OpCode::Div);
        b.emit(OpCode::Ret);

        let mut engine = engine_for(b, 0, false);
        assert_eq!(engine.execute(), VmState::Fault);
        assert_eq!(engine.fault(), Some(&VmFault::DivisionByZero { offset: 18 }));
    }

    #[test]
    fn test_execute_twice_is_noop() {
        let mut b = ScriptBuilder::new();
        b.emit_push_bool(true);
        b.emit(OpCode::Ret);
        let mut engine = engine_for(b, 0, false);
        assert_eq!(engine.execute(), VmState::Halt);
        assert_eq!(engine.execute(), VmState::Halt);
        assert_eq!(engine.ops_executed(), 2);
    }
}
