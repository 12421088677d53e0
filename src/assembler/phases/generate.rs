use crate::assembler::eval::{self, EvalContext};
use crate::assembler::model::Operand;
use crate::isa::{
    hw::{Byte, Register, RegisterPair, Word, PAIR_FIELD_OFFSET, REGISTER_FIELD_WIDTH},
    inst::Mnemonic,
};
use itertools::Itertools;
use log::trace;
use std::fmt::Display;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Error {
    ArgCount {
        mnemonic: Mnemonic,
        expected: usize,
        given: usize,
    },
    TooWide {
        value: Word,
        bits: usize,
    },
    NotARegister(Word),
    NotARegisterPair(String),
    AddressLabelAs {
        name: String,
        target: &'static str,
    },
    PairNotAllowed {
        mnemonic: Mnemonic,
        pair: RegisterPair,
    },
    PairAsValue(RegisterPair),
    MemoryToMemory,
    BadRestartVector(Word),
    TextOutsideDb,
    Eval(eval::Error),
}

impl From<eval::Error> for Error {
    fn from(err: eval::Error) -> Self {
        Error::Eval(err)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ArgCount {
                mnemonic,
                expected,
                given,
            } => write!(
                f,
                "Instruction '{}' expects {} operand(s), but {} were given",
                mnemonic, expected, given
            ),
            Error::TooWide { value, bits } => {
                write!(f, "Value {:04X}h exceeds {} bits", value, bits)
            }
            Error::NotARegister(value) => {
                write!(f, "Value {:X}h does not name a register (0-7)", value)
            }
            Error::NotARegisterPair(name) => write!(
                f,
                "'{}' is not a register pair, expected one of B, D, H, SP, PSW",
                name
            ),
            Error::AddressLabelAs { name, target } => {
                write!(f, "Cannot use address label '{}' as {}", name, target)
            }
            Error::PairNotAllowed { mnemonic, pair } => {
                write!(f, "Instruction '{}' cannot operate on {}", mnemonic, pair)
            }
            Error::PairAsValue(pair) => write!(f, "Register pair {} has no value", pair),
            Error::MemoryToMemory => write!(f, "'MOV M,M' is not a valid instruction"),
            Error::BadRestartVector(n) => {
                write!(f, "Restart vector {} is out of range (0-7)", n)
            }
            Error::TextOutsideDb => write!(f, "Strings longer than one character are only allowed in DB"),
            Error::Eval(err) => write!(f, "{}", err),
        }
    }
}

/// Which register pairs an instruction rejects.
#[derive(Debug, Clone, Copy)]
enum PairRule {
    NoSp,
    NoPsw,
    BcDeOnly,
}

impl PairRule {
    fn allows(self, pair: RegisterPair) -> bool {
        match self {
            PairRule::NoSp => pair != RegisterPair::SP,
            PairRule::NoPsw => pair != RegisterPair::PSW,
            PairRule::BcDeOnly => pair == RegisterPair::BC || pair == RegisterPair::DE,
        }
    }
}

/// The operand shape of an instruction, along with its base opcode.
#[derive(Debug, Clone, Copy)]
enum Form {
    /// `opcode`
    Implied(Byte),
    /// `00 rrr 10x`, register in the destination field.
    RegHigh(Byte),
    /// `10 ooo rrr`, register in the source field.
    RegLow(Byte),
    /// `01 ddd sss`
    Move,
    /// `xx pp xxxx`
    Pair(Byte, PairRule),
    /// `00 pp 0001`, then a little-endian word.
    PairImm(Byte),
    /// `00 rrr 110`, then a byte.
    RegImm(Byte),
    /// `opcode`, then a byte.
    Imm(Byte),
    /// `opcode`, then a little-endian address.
    Addr(Byte),
    /// `11 nnn 111`
    Restart,
    Bytes,
    Words,
    Space,
}

impl Form {
    /// `None` for the variadic data definitions.
    fn arity(self) -> Option<usize> {
        match self {
            Form::Implied(_) => Some(0),
            Form::RegHigh(_) | Form::RegLow(_) | Form::Pair(..) => Some(1),
            Form::Imm(_) | Form::Addr(_) | Form::Restart | Form::Space => Some(1),
            Form::Move | Form::PairImm(_) | Form::RegImm(_) => Some(2),
            Form::Bytes | Form::Words => None,
        }
    }
}

impl Mnemonic {
    fn form(self) -> Form {
        use Form::*;
        use Mnemonic::*;

        match self {
            NOP => Implied(0x00),
            HLT => Implied(0x76),
            RLC => Implied(0x07),
            RRC => Implied(0x0F),
            RAL => Implied(0x17),
            RAR => Implied(0x1F),
            DAA => Implied(0x27),
            CMA => Implied(0x2F),
            STC => Implied(0x37),
            CMC => Implied(0x3F),
            XCHG => Implied(0xEB),
            XTHL => Implied(0xE3),
            SPHL => Implied(0xF9),
            PCHL => Implied(0xE9),
            EI => Implied(0xFB),
            DI => Implied(0xF3),
            RET => Implied(0xC9),
            RNZ => Implied(0xC0),
            RZ => Implied(0xC8),
            RNC => Implied(0xD0),
            RC => Implied(0xD8),
            RPO => Implied(0xE0),
            RPE => Implied(0xE8),
            RP => Implied(0xF0),
            RM => Implied(0xF8),

            INR => RegHigh(0x04),
            DCR => RegHigh(0x05),

            ADD => RegLow(0x80),
            ADC => RegLow(0x88),
            SUB => RegLow(0x90),
            SBB => RegLow(0x98),
            ANA => RegLow(0xA0),
            XRA => RegLow(0xA8),
            ORA => RegLow(0xB0),
            CMP => RegLow(0xB8),

            MOV => Move,

            PUSH => Pair(0xC5, PairRule::NoSp),
            POP => Pair(0xC1, PairRule::NoSp),
            DAD => Pair(0x09, PairRule::NoPsw),
            INX => Pair(0x03, PairRule::NoPsw),
            DCX => Pair(0x0B, PairRule::NoPsw),
            STAX => Pair(0x02, PairRule::BcDeOnly),
            LDAX => Pair(0x0A, PairRule::BcDeOnly),

            LXI => PairImm(0x01),
            MVI => RegImm(0x06),

            ADI => Imm(0xC6),
            ACI => Imm(0xCE),
            SUI => Imm(0xD6),
            SBI => Imm(0xDE),
            ANI => Imm(0xE6),
            XRI => Imm(0xEE),
            ORI => Imm(0xF6),
            CPI => Imm(0xFE),
            IN => Imm(0xDB),
            OUT => Imm(0xD3),

            SHLD => Addr(0x22),
            LHLD => Addr(0x2A),
            STA => Addr(0x32),
            LDA => Addr(0x3A),
            JMP => Addr(0xC3),
            JNZ => Addr(0xC2),
            JZ => Addr(0xCA),
            JNC => Addr(0xD2),
            JC => Addr(0xDA),
            JPO => Addr(0xE2),
            JPE => Addr(0xEA),
            JP => Addr(0xF2),
            JM => Addr(0xFA),
            CALL => Addr(0xCD),
            CNZ => Addr(0xC4),
            CZ => Addr(0xCC),
            CNC => Addr(0xD4),
            CC => Addr(0xDC),
            CPO => Addr(0xE4),
            CPE => Addr(0xEC),
            CP => Addr(0xF4),
            CM => Addr(0xFC),

            RST => Restart,

            DB => Bytes,
            DW => Words,
            DS => Space,
        }
    }
}

/// The result of encoding one statement: either an opcode word to be
/// split into bytes, or raw data.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Encoding {
    Packed { mnemonic: Mnemonic, pattern: u32 },
    Data(Vec<Byte>),
}

impl Encoding {
    /// Packed patterns drop their insignificant leading zero bytes. `NOP` is
    /// all zeroes and so would otherwise vanish entirely.
    pub fn into_bytes(self) -> Vec<Byte> {
        match self {
            Encoding::Data(bytes) => bytes,
            Encoding::Packed {
                mnemonic: Mnemonic::NOP,
                ..
            } => vec![0x00],
            Encoding::Packed { pattern, .. } => pattern
                .to_be_bytes()
                .iter()
                .copied()
                .skip_while(|b| *b == 0)
                .collect(),
        }
    }
}

fn reg_field(reg: u32, offset: u32) -> u32 {
    reg << offset
}

fn pair_field(pair: RegisterPair) -> u32 {
    pair.selector() << PAIR_FIELD_OFFSET
}

fn checked_pair(
    mnemonic: Mnemonic,
    op: &Operand,
    rule: PairRule,
) -> Result<RegisterPair, Error> {
    let pair = op.to_register_pair()?;
    if rule.allows(pair) {
        Ok(pair)
    } else {
        Err(Error::PairNotAllowed { mnemonic, pair })
    }
}

pub fn encode(
    mnemonic: Mnemonic,
    operands: &[Operand],
    ctx: &EvalContext,
) -> Result<Encoding, Error> {
    let form = mnemonic.form();

    match form.arity() {
        Some(expected) if expected != operands.len() => {
            return Err(Error::ArgCount {
                mnemonic,
                expected,
                given: operands.len(),
            })
        }
        None if operands.is_empty() => {
            return Err(Error::ArgCount {
                mnemonic,
                expected: 1,
                given: 0,
            })
        }
        _ => (),
    }

    let packed = |pattern: u32| -> Result<Encoding, Error> {
        Ok(Encoding::Packed { mnemonic, pattern })
    };
    let opcode = u32::from;

    let encoding = match form {
        Form::Implied(base) => packed(opcode(base)),
        Form::RegHigh(base) => packed(
            opcode(base) | reg_field(operands[0].to_register(ctx)?.index(), REGISTER_FIELD_WIDTH),
        ),
        Form::RegLow(base) => packed(opcode(base) | operands[0].to_register(ctx)?.index()),
        Form::Move => {
            let dst = operands[0].to_register(ctx)?;
            let src = operands[1].to_register(ctx)?;
            if dst == Register::M && src == Register::M {
                return Err(Error::MemoryToMemory);
            }
            packed(0x40 | reg_field(dst.index(), REGISTER_FIELD_WIDTH) | src.index())
        }
        Form::Pair(base, rule) => {
            packed(opcode(base) | pair_field(checked_pair(mnemonic, &operands[0], rule)?))
        }
        Form::PairImm(base) => {
            let pair = checked_pair(mnemonic, &operands[0], PairRule::NoPsw)?;
            let data = operands[1].to_address(ctx)?;
            packed(((opcode(base) | pair_field(pair)) << 16) | u32::from(data))
        }
        Form::RegImm(base) => {
            let reg = operands[0].to_register(ctx)?;
            let data = operands[1].to_immediate(ctx)?;
            packed(
                ((opcode(base) | reg_field(reg.index(), REGISTER_FIELD_WIDTH)) << 8)
                    | u32::from(data),
            )
        }
        Form::Imm(base) => packed((opcode(base) << 8) | u32::from(operands[0].to_immediate(ctx)?)),
        Form::Addr(base) => packed((opcode(base) << 16) | u32::from(operands[0].to_address(ctx)?)),
        Form::Restart => {
            let vector = operands[0].to_raw(ctx)?;
            if vector > 7 {
                return Err(Error::BadRestartVector(vector));
            }
            packed(0xC7 | reg_field(u32::from(vector), REGISTER_FIELD_WIDTH))
        }
        Form::Bytes => Ok(Encoding::Data(
            operands
                .iter()
                .map(|op| op.to_data_bytes(ctx))
                .collect::<Result<Vec<_>, _>>()?
                .concat(),
        )),
        Form::Words => Ok(Encoding::Data(
            operands
                .iter()
                .map(|op| op.to_address(ctx).map(|w| w.to_be_bytes().to_vec()))
                .collect::<Result<Vec<_>, _>>()?
                .concat(),
        )),
        Form::Space => {
            let count = operands[0].to_raw(ctx)?;
            Ok(Encoding::Data(vec![0; usize::from(count)]))
        }
    };

    if let Ok(enc) = &encoding {
        trace!(
            "{} {} => {:?}",
            mnemonic,
            operands.iter().join(","),
            enc
        );
    }

    encoding
}
