//! Contract bytecode.
//!
//! A compiled contract is stored as an `.avm` file:
//!
//! ```text
//! [format version: u8][entry arity: u8][code ...]
//! ```
//!
//! The entry point always starts at code offset 0. Multi-byte operands are
//! little-endian. Jump and call targets are absolute code offsets.

use std::fmt;

use sc_sandbox_types::ScriptHash;

/// Current `.avm` container version.
pub const AVM_FORMAT_VERSION: u8 = 1;

const HEADER_LEN: usize = 2;

/// Errors from encoding or decoding bytecode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// File shorter than the two-byte header.
    MissingHeader,
    /// Header names a container version this build does not understand.
    UnsupportedVersion(u8),
    /// An opcode byte that is not part of the instruction set.
    UnknownOpcode { offset: usize, byte: u8 },
    /// An operand runs past the end of the code.
    Truncated { offset: usize },
    /// A `PUSHDATA` payload longer than `u16::MAX` bytes.
    DataTooLong(usize),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::MissingHeader => write!(f, "bytecode is missing its header"),
            ScriptError::UnsupportedVersion(v) => {
                write!(f, "unsupported bytecode format version {}", v)
            }
            ScriptError::UnknownOpcode { offset, byte } => {
                write!(f, "unknown opcode 0x{:02x} at offset {}", byte, offset)
            }
            ScriptError::Truncated { offset } => {
                write!(f, "truncated instruction at offset {}", offset)
            }
            ScriptError::DataTooLong(len) => {
                write!(f, "data push of {} bytes exceeds {} bytes", len, u16::MAX)
            }
        }
    }
}

impl std::error::Error for ScriptError {}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Nop = 0x00,
    PushInt = 0x01,
    PushData = 0x02,
    PushTrue = 0x03,
    PushFalse = 0x04,

    InitSlot = 0x10,
    LdArg = 0x11,
    StArg = 0x12,
    LdLoc = 0x13,
    StLoc = 0x14,

    Add = 0x20,
    Sub = 0x21,
    Mul = 0x22,
    Div = 0x23,
    Mod = 0x24,
    Negate = 0x25,

    Equal = 0x30,
    NotEqual = 0x31,
    Lt = 0x32,
    Le = 0x33,
    Gt = 0x34,
    Ge = 0x35,
    Not = 0x38,
    BoolAnd = 0x39,
    BoolOr = 0x3a,
    Size = 0x3b,

    Jmp = 0x40,
    JmpIf = 0x41,
    JmpIfNot = 0x42,
    Call = 0x43,
    Ret = 0x44,
    Syscall = 0x45,
    Drop = 0x46,
}

impl OpCode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        use OpCode::*;
        let op = match byte {
            0x00 => Nop,
            0x01 => PushInt,
            0x02 => PushData,
            0x03 => PushTrue,
            0x04 => PushFalse,
            0x10 => InitSlot,
            0x11 => LdArg,
            0x12 => StArg,
            0x13 => LdLoc,
            0x14 => StLoc,
            0x20 => Add,
            0x21 => Sub,
            0x22 => Mul,
            0x23 => Div,
            0x24 => Mod,
            0x25 => Negate,
            0x30 => Equal,
            0x31 => NotEqual,
            0x32 => Lt,
            0x33 => Le,
            0x34 => Gt,
            0x35 => Ge,
            0x38 => Not,
            0x39 => BoolAnd,
            0x3a => BoolOr,
            0x3b => Size,
            0x40 => Jmp,
            0x41 => JmpIf,
            0x42 => JmpIfNot,
            0x43 => Call,
            0x44 => Ret,
            0x45 => Syscall,
            0x46 => Drop,
            _ => return None,
        };
        Some(op)
    }
}

/// A decoded instruction with its operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Nop,
    PushInt(i64),
    PushData(Vec<u8>),
    PushBool(bool),
    InitSlot { locals: u8, args: u8 },
    LdArg(u8),
    StArg(u8),
    LdLoc(u8),
    StLoc(u8),
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Negate,
    Equal,
    NotEqual,
    Lt,
    Le,
    Gt,
    Ge,
    Not,
    BoolAnd,
    BoolOr,
    Size,
    Jmp(u32),
    JmpIf(u32),
    JmpIfNot(u32),
    Call(u32),
    Ret,
    Syscall(u8),
    Drop,
}

impl Instruction {
    /// Decode the instruction at `offset`, returning it with the offset of the
    /// next instruction.
    pub fn decode(code: &[u8], offset: usize) -> Result<(Instruction, usize), ScriptError> {
        let byte = *code
            .get(offset)
            .ok_or(ScriptError::Truncated { offset })?;
        let op = OpCode::from_byte(byte).ok_or(ScriptError::UnknownOpcode { offset, byte })?;
        let mut cursor = Cursor {
            code,
            pos: offset + 1,
            start: offset,
        };

        let instruction = match op {
            OpCode::Nop => Instruction::Nop,
            OpCode::PushInt => {
                let bytes = cursor.take(8)?;
                let mut buf = [0u8; 8];
                buf.copy_from_slice(bytes);
                Instruction::PushInt(i64::from_le_bytes(buf))
            }
            OpCode::PushData => {
                let len = cursor.u16()? as usize;
                Instruction::PushData(cursor.take(len)?.to_vec())
            }
            OpCode::PushTrue => Instruction::PushBool(true),
            OpCode::PushFalse => Instruction::PushBool(false),
            OpCode::InitSlot => {
                let locals = cursor.u8()?;
                let args = cursor.u8()?;
                Instruction::InitSlot { locals, args }
            }
            OpCode::LdArg => Instruction::LdArg(cursor.u8()?),
            OpCode::StArg => Instruction::StArg(cursor.u8()?),
            OpCode::LdLoc => Instruction::LdLoc(cursor.u8()?),
            OpCode::StLoc => Instruction::StLoc(cursor.u8()?),
            OpCode::Add => Instruction::Add,
            OpCode::Sub => Instruction::Sub,
            OpCode::Mul => Instruction::Mul,
            OpCode::Div => Instruction::Div,
            OpCode::Mod => Instruction::Mod,
            OpCode::Negate => Instruction::Negate,
            OpCode::Equal => Instruction::Equal,
            OpCode::NotEqual => Instruction::NotEqual,
            OpCode::Lt => Instruction::Lt,
            OpCode::Le => Instruction::Le,
            OpCode::Gt => Instruction::Gt,
            OpCode::Ge => Instruction::Ge,
            OpCode::Not => Instruction::Not,
            OpCode::BoolAnd => Instruction::BoolAnd,
            OpCode::BoolOr => Instruction::BoolOr,
            OpCode::Size => Instruction::Size,
            OpCode::Jmp => Instruction::Jmp(cursor.u32()?),
            OpCode::JmpIf => Instruction::JmpIf(cursor.u32()?),
            OpCode::JmpIfNot => Instruction::JmpIfNot(cursor.u32()?),
            OpCode::Call => Instruction::Call(cursor.u32()?),
            OpCode::Ret => Instruction::Ret,
            OpCode::Syscall => Instruction::Syscall(cursor.u8()?),
            OpCode::Drop => Instruction::Drop,
        };

        Ok((instruction, cursor.pos))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::PushInt(v) => write!(f, "PUSHINT {}", v),
            Instruction::PushData(d) => write!(f, "PUSHDATA 0x{}", hex::encode(d)),
            Instruction::PushBool(true) => write!(f, "PUSHT"),
            Instruction::PushBool(false) => write!(f, "PUSHF"),
            Instruction::InitSlot { locals, args } => {
                write!(f, "INITSLOT locals={} args={}", locals, args)
            }
            Instruction::LdArg(i) => write!(f, "LDARG {}", i),
            Instruction::StArg(i) => write!(f, "STARG {}", i),
            Instruction::LdLoc(i) => write!(f, "LDLOC {}", i),
            Instruction::StLoc(i) => write!(f, "STLOC {}", i),
            Instruction::Jmp(t) => write!(f, "JMP {}", t),
            Instruction::JmpIf(t) => write!(f, "JMPIF {}", t),
            Instruction::JmpIfNot(t) => write!(f, "JMPIFNOT {}", t),
            Instruction::Call(t) => write!(f, "CALL {}", t),
            Instruction::Syscall(id) => write!(f, "SYSCALL 0x{:02x}", id),
            other => write!(f, "{}", format!("{:?}", other).to_uppercase()),
        }
    }
}

struct Cursor<'a> {
    code: &'a [u8],
    pos: usize,
    start: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], ScriptError> {
        let code = self.code;
        let start = self.pos;
        match start.checked_add(len).and_then(|end| code.get(start..end)) {
            Some(slice) => {
                self.pos += len;
                Ok(slice)
            }
            None => Err(ScriptError::Truncated { offset: self.start }),
        }
    }

    fn u8(&mut self) -> Result<u8, ScriptError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ScriptError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, ScriptError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// Executable contract code plus the arity of its entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractScript {
    pub entry_arity: u8,
    pub code: Vec<u8>,
}

impl ContractScript {
    pub fn new(entry_arity: u8, code: Vec<u8>) -> Self {
        Self { entry_arity, code }
    }

    /// Serialize into the `.avm` container.
    pub fn to_avm_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.code.len());
        out.push(AVM_FORMAT_VERSION);
        out.push(self.entry_arity);
        out.extend_from_slice(&self.code);
        out
    }

    /// Parse an `.avm` container. Instructions are validated lazily by the VM.
    pub fn from_avm_bytes(bytes: &[u8]) -> Result<Self, ScriptError> {
        if bytes.len() < HEADER_LEN {
            return Err(ScriptError::MissingHeader);
        }
        if bytes[0] != AVM_FORMAT_VERSION {
            return Err(ScriptError::UnsupportedVersion(bytes[0]));
        }
        Ok(Self {
            entry_arity: bytes[1],
            code: bytes[HEADER_LEN..].to_vec(),
        })
    }

    /// Script hash of the serialized container.
    pub fn script_hash(&self) -> ScriptHash {
        ScriptHash::of_script(&self.to_avm_bytes())
    }

    /// Decode every instruction in order.
    pub fn instructions(&self) -> Result<Vec<(usize, Instruction)>, ScriptError> {
        let mut out = Vec::new();
        let mut offset = 0;
        while offset < self.code.len() {
            let (instruction, next) = Instruction::decode(&self.code, offset)?;
            out.push((offset, instruction));
            offset = next;
        }
        Ok(out)
    }

    /// Human-readable listing, one instruction per line.
    pub fn disassemble(&self) -> Result<String, ScriptError> {
        let mut out = String::new();
        for (offset, instruction) in self.instructions()? {
            out.push_str(&format!("{:05} {}\n", offset, instruction));
        }
        Ok(out)
    }
}

/// Incremental bytecode writer.
#[derive(Debug, Default)]
pub struct ScriptBuilder {
    code: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset at which the next instruction will be written.
    pub fn offset(&self) -> usize {
        self.code.len()
    }

    pub fn emit(&mut self, op: OpCode) {
        self.code.push(op as u8);
    }

    pub fn emit_u8(&mut self, op: OpCode, operand: u8) {
        self.code.push(op as u8);
        self.code.push(operand);
    }

    pub fn emit_push_int(&mut self, value: i64) {
        self.emit(OpCode::PushInt);
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        let len = u16::try_from(data.len()).map_err(|_| ScriptError::DataTooLong(data.len()))?;
        self.emit(OpCode::PushData);
        self.code.extend_from_slice(&len.to_le_bytes());
        self.code.extend_from_slice(data);
        Ok(())
    }

    pub fn emit_push_bool(&mut self, value: bool) {
        self.emit(if value {
            OpCode::PushTrue
        } else {
            OpCode::PushFalse
        });
    }

    pub fn emit_init_slot(&mut self, locals: u8, args: u8) {
        self.emit(OpCode::InitSlot);
        self.code.push(locals);
        self.code.push(args);
    }

    /// Emit a jump or call with a placeholder target. Returns the operand
    /// position to hand to [`ScriptBuilder::patch_target`].
    pub fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit(op);
        let pos = self.code.len();
        self.code.extend_from_slice(&[0u8; 4]);
        pos
    }

    pub fn patch_target(&mut self, operand_pos: usize, target: usize) {
        let target = target as u32;
        self.code[operand_pos..operand_pos + 4].copy_from_slice(&target.to_le_bytes());
    }

    pub fn into_code(self) -> Vec<u8> {
        self.code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_decode() {
        let mut builder = ScriptBuilder::new();
        builder.emit_init_slot(1, 2);
        builder.emit_push_int(-7);
        builder.emit_push_data(b"add").unwrap();
        builder.emit(OpCode::Equal);
        let jump = builder.emit_jump(OpCode::JmpIfNot);
        builder.emit_push_bool(true);
        builder.emit(OpCode::Ret);
        let target = builder.offset();
        builder.patch_target(jump, target);
        builder.emit_u8(OpCode::Syscall, 0x05);
        builder.emit(OpCode::Ret);

        let script = ContractScript::new(2, builder.into_code());
        let listing: Vec<Instruction> = script
            .instructions()
            .unwrap()
            .into_iter()
            .map(|(_, i)| i)
            .collect();

        assert_eq!(
            listing,
            vec![
                Instruction::InitSlot { locals: 1, args: 2 },
                Instruction::PushInt(-7),
                Instruction::PushData(b"add".to_vec()),
                Instruction::Equal,
                Instruction::JmpIfNot(target as u32),
                Instruction::PushBool(true),
                Instruction::Ret,
                Instruction::Syscall(0x05),
                Instruction::Ret,
            ]
        );
    }

    #[test]
    fn test_avm_container() {
        let script = ContractScript::new(3, vec![OpCode::Ret as u8]);
        let bytes = script.to_avm_bytes();
        assert_eq!(bytes, vec![AVM_FORMAT_VERSION, 3, 0x44]);
        assert_eq!(ContractScript::from_avm_bytes(&bytes).unwrap(), script);
        assert_eq!(
            ContractScript::from_avm_bytes(&[1]),
            Err(ScriptError::MissingHeader)
        );
        assert_eq!(
            ContractScript::from_avm_bytes(&[9, 0]),
            Err(ScriptError::UnsupportedVersion(9))
        );
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            Instruction::decode(&[0xff], 0),
            Err(ScriptError::UnknownOpcode {
                offset: 0,
                byte: 0xff
            })
        );
        assert_eq!(
            Instruction::decode(&[OpCode::PushInt as u8, 1, 2], 0),
            Err(ScriptError::Truncated { offset: 0 })
        );
    }

    #[test]
    fn test_push_data_limit() {
        let mut builder = ScriptBuilder::new();
        let big = vec![0u8; u16::MAX as usize + 1];
        assert_eq!(
            builder.emit_push_data(&big),
            Err(ScriptError::DataTooLong(big.len()))
        );
    }

    #[test]
    fn test_disassemble() {
        let mut builder = ScriptBuilder::new();
        builder.emit_push_int(1);
        builder.emit(OpCode::Ret);
        let text = ContractScript::new(0, builder.into_code())
            .disassemble()
            .unwrap();
        assert_eq!(text, "00000 PUSHINT 1\n00009 RET\n");
    }
}
