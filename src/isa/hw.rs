use derive_more::Display;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use static_assertions::const_assert;
use strum_macros::EnumIter;

pub type Byte = u8;
pub type Word = u16;

pub const BYTE_WIDTH: usize = 8;
pub const BYTE_MAX: Word = 0xFF;

/// Width of the register field inside an opcode (`ddd`/`sss`).
pub const REGISTER_FIELD_WIDTH: u32 = 3;
const_assert!(1 << REGISTER_FIELD_WIDTH == 8);

/// Offset of the register pair selector (`pp`) inside an opcode.
pub const PAIR_FIELD_OFFSET: u32 = 4;

pub const fn byte_flip(v: Word) -> Word {
    ((v & 0x00FF) << BYTE_WIDTH) | ((v & 0xFF00) >> BYTE_WIDTH)
}

pub const fn lo(v: Word) -> Byte {
    (v & 0x00FF) as Byte
}

pub const fn hi(v: Word) -> Byte {
    (v >> BYTE_WIDTH) as Byte
}

/// The eight 8-bit operand slots, in encoding order. `M` is the memory
/// cell addressed by `HL`.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, FromPrimitive, EnumIter)]
pub enum Register {
    B,
    C,
    D,
    E,
    H,
    L,
    M,
    A,
}

impl Register {
    pub fn from_index(idx: Word) -> Option<Self> {
        Register::from_u16(idx)
    }

    pub const fn index(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum RegisterPair {
    BC,
    DE,
    HL,
    SP,
    PSW,
}

impl RegisterPair {
    /// Register pairs are written by their first register, plus the two
    /// dedicated names.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "B" => Some(RegisterPair::BC),
            "D" => Some(RegisterPair::DE),
            "H" => Some(RegisterPair::HL),
            "SP" => Some(RegisterPair::SP),
            "PSW" => Some(RegisterPair::PSW),
            _ => None,
        }
    }

    /// `SP` and `PSW` share the last slot; which one an opcode means is
    /// decided by the opcode itself.
    pub const fn selector(self) -> u32 {
        match self {
            RegisterPair::BC => 0b00,
            RegisterPair::DE => 0b01,
            RegisterPair::HL => 0b10,
            RegisterPair::SP | RegisterPair::PSW => 0b11,
        }
    }

    pub fn is_pseudo_register(name: &str) -> bool {
        name == "SP" || name == "PSW"
    }
}
