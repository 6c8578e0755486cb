use std::collections::HashMap;
use std::str::FromStr;

use once_cell::sync::OnceCell;
use strum_macros::{EnumString, IntoStaticStr};

pub const INST_FLAG_SRC_MEM: u8 = 1 << 0;
pub const INST_FLAG_DST_MEM: u8 = 1 << 1;
pub const INST_FLAG_SRC_CONST: u8 = 1 << 2;
pub const INST_FLAG_DST_CONST: u8 = 1 << 3;
pub const INST_FLAG_SRC_REG: u8 = 1 << 4;
pub const INST_FLAG_DST_REG: u8 = 1 << 5;

/// Every instruction occupies 19 bytes in the output stream; a data word
/// occupies 8. Pass 1 and pass 2 both advance addresses by these amounts and
/// must never disagree.
pub const INSTRUCTION_SIZE: u64 = 19;
pub const DATA_WORD_SIZE: u64 = 8;

static REGISTERS: OnceCell<HashMap<String, u8>> = OnceCell::new();

/// Operand-addressable registers. `ip` and `sp` exist on the CPU but can't be
/// named in an operand.
pub fn register(name: &str) -> Option<u8> {
    REGISTERS
        .get_or_init(|| {
            (0u8..8)
                .map(|index| (format!("r{}", index), index))
                .collect()
        })
        .get(name)
        .copied()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Zero,
    One,
    Two,
}

impl Arity {
    pub fn operands(self) -> usize {
        match self {
            Arity::Zero => 0,
            Arity::One => 1,
            Arity::Two => 2,
        }
    }
}

/// Per-mnemonic operand grammar descriptor. One state machine in pass 2 is
/// driven by these instead of a hand-written parser per mnemonic.
#[derive(Debug, Clone, Copy)]
pub struct OperandRules {
    pub arity: Arity,
    /// Whether the first operand may be a bare (unbracketed) literal or
    /// label address. False for mnemonics that write through their first
    /// operand, where a constant target is meaningless.
    pub bare_const_first: bool,
}

/// Discriminants are the wire opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Mnemonic {
    Nop = 0,
    Mov = 1,
    Hlt = 2,
    Jmp = 3,
    Inc = 4,
    Dec = 5,
    Push = 6,
    Pop = 7,
    Call = 8,
    Ret = 9,
}

impl Mnemonic {
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_str(name).ok()
    }

    pub fn opcode(self) -> u8 {
        self as u8
    }

    pub fn rules(self) -> OperandRules {
        use Mnemonic::*;
        match self {
            Hlt | Nop | Ret => OperandRules {
                arity: Arity::Zero,
                bare_const_first: false,
            },
            Jmp | Call | Push => OperandRules {
                arity: Arity::One,
                bare_const_first: true,
            },
            Inc | Dec | Pop | Mov => OperandRules {
                arity: if self == Mov { Arity::Two } else { Arity::One },
                bare_const_first: false,
            },
        }
    }
}

/// Pseudo-instructions that materialize data instead of code. Exactly one
/// exists: `dw` lays down one raw 64-bit word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Directive {
    Dw,
}

impl Directive {
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_str(name).ok()
    }
}
