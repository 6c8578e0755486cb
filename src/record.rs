/// One encoded instruction: 19 bytes on the wire, little-endian field order
/// (opcode, flags, reserved, data1, data2). The reserved byte is always
/// written as zero; the interpreter keeps the slot for operand sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u8,
    pub flags: u8,
    pub data1: u64,
    pub data2: u64,
}

impl Instruction {
    pub fn to_bytes(self) -> [u8; 19] {
        let mut bytes = [0u8; 19];
        bytes[0] = self.opcode;
        bytes[1] = self.flags;
        // bytes[2] reserved
        bytes[3..11].copy_from_slice(&self.data1.to_le_bytes());
        bytes[11..19].copy_from_slice(&self.data2.to_le_bytes());
        bytes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    Instruction(Instruction),
    /// A raw data word from the `dw` directive: 8 bytes, no header.
    Data(u64),
}

impl Record {
    pub fn length(&self) -> usize {
        match self {
            Record::Instruction(_) => 19,
            Record::Data(_) => 8,
        }
    }
}

/// Serialize the final record list. The output is a flat concatenation with
/// no per-record length tag; a reader has to replay the same 19/8-byte
/// layout arithmetic to parse it back.
pub fn emit(records: &[Record]) -> Vec<u8> {
    let mut out = Vec::with_capacity(records.iter().map(Record::length).sum());
    for record in records {
        match record {
            Record::Instruction(instruction) => out.extend_from_slice(&instruction.to_bytes()),
            Record::Data(word) => out.extend_from_slice(&word.to_le_bytes()),
        }
    }
    out
}
