use super::eval::{Atom, EvalContext, Expression};
use super::phases::{generate::Error, types::Loc};
use super::symbols::{SymbolId, SymbolKind};
use crate::isa::{
    hw::{self, Byte, Register, RegisterPair, Word, BYTE_MAX},
    inst::{Keyword, Mnemonic},
};
use itertools::Itertools;
use std::convert::TryFrom;
use std::fmt::Display;

/*
    Operands are stored as written, and only turned into numbers when an
    instruction asks for a particular shape (register index, register pair,
    8-bit immediate, 16-bit address). The same operand is converted again in
    the second pass if it referred to a symbol which was not yet defined the
    first time around: until then every conversion hands back a placeholder
    (`0` or register `B`) without range checking, so that the first pass can
    still measure the instruction.
*/

#[derive(Debug, PartialEq, Clone)]
pub enum Operand {
    /// A literal, kept in its source spelling for the listing.
    Number { value: Word, text: String },
    CurrentAddress,
    Symbol { id: SymbolId, name: String },
    PairRegister(RegisterPair),
    Char(Byte),
    Text(String),
    Expression(Expression),
}

impl From<Atom> for Operand {
    fn from(atom: Atom) -> Self {
        match atom {
            Atom::Number(v) => Operand::number(v),
            Atom::CurrentAddress => Operand::CurrentAddress,
            Atom::Symbol { id, name } => Operand::Symbol { id, name },
            Atom::Char(c) => Operand::Char(c),
        }
    }
}

fn fmt_hex(v: Word) -> String {
    let digits = format!("{:X}", v);
    if digits.starts_with(|c: char| c.is_ascii_alphabetic()) {
        format!("0{}H", digits)
    } else {
        format!("{}H", digits)
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Number { text, .. } => write!(f, "{}", text),
            Operand::CurrentAddress => write!(f, "$"),
            Operand::Symbol { name, .. } => write!(f, "{}", name),
            Operand::PairRegister(pair) => write!(f, "{}", pair),
            Operand::Char(c) => write!(f, "'{}'", char::from(*c)),
            Operand::Text(s) => write!(f, "'{}'", s),
            Operand::Expression(expr) => write!(f, "{}", expr),
        }
    }
}

impl Operand {
    /// A literal spelled in hex, for operands which have no source text.
    pub fn number(value: Word) -> Self {
        Operand::Number {
            value,
            text: fmt_hex(value),
        }
    }

    /// Whether this operand mentions a symbol which is still `Unknown`.
    pub fn is_deferred(&self, ctx: &EvalContext) -> bool {
        match self {
            Operand::Symbol { id, .. } => ctx.is_unknown(*id),
            Operand::Expression(expr) => expr.is_deferred(ctx),
            _ => false,
        }
    }

    fn reject_address_label(&self, ctx: &EvalContext, target: &'static str) -> Result<(), Error> {
        match self {
            Operand::Symbol { id, name } if ctx.symbols.get(*id).kind() == SymbolKind::Address => {
                Err(Error::AddressLabelAs {
                    name: name.clone(),
                    target,
                })
            }
            _ => Ok(()),
        }
    }

    pub fn to_raw(&self, ctx: &EvalContext) -> Result<Word, Error> {
        if self.is_deferred(ctx) {
            return Ok(0);
        }

        match self {
            Operand::Number { value, .. } => Ok(*value),
            Operand::CurrentAddress => Ok(ctx.address),
            Operand::Symbol { id, .. } => Ok(ctx.symbols.get(*id).value().unwrap_or(0)),
            Operand::Char(c) => Ok(Word::from(*c)),
            Operand::PairRegister(pair) => Err(Error::PairAsValue(*pair)),
            Operand::Text(_) => Err(Error::TextOutsideDb),
            Operand::Expression(expr) => Ok(expr.evaluate(ctx)?),
        }
    }

    /// The 16-bit value with its bytes swapped, so that packing it after an
    /// opcode puts the low byte first.
    pub fn to_address(&self, ctx: &EvalContext) -> Result<Word, Error> {
        Ok(hw::byte_flip(self.to_raw(ctx)?))
    }

    pub fn to_immediate(&self, ctx: &EvalContext) -> Result<Byte, Error> {
        if self.is_deferred(ctx) {
            return Ok(0);
        }
        self.reject_address_label(ctx, "an immediate value")?;

        let value = self.to_raw(ctx)?;
        if value <= BYTE_MAX {
            Ok(hw::lo(value))
        } else {
            Err(Error::TooWide { value, bits: 8 })
        }
    }

    pub fn to_register(&self, ctx: &EvalContext) -> Result<Register, Error> {
        if self.is_deferred(ctx) {
            return Ok(Register::B);
        }
        self.reject_address_label(ctx, "a register")?;

        let value = self.to_raw(ctx)?;
        Register::from_index(value).ok_or(Error::NotARegister(value))
    }

    /// Register pairs are chosen by name rather than by value.
    pub fn to_register_pair(&self) -> Result<RegisterPair, Error> {
        match self {
            Operand::PairRegister(pair) => Ok(*pair),
            Operand::Symbol { name, .. } => RegisterPair::from_name(name)
                .ok_or_else(|| Error::NotARegisterPair(name.clone())),
            other => Err(Error::NotARegisterPair(other.to_string())),
        }
    }

    /// The bytes a `DB` operand contributes.
    pub fn to_data_bytes(&self, ctx: &EvalContext) -> Result<Vec<Byte>, Error> {
        match self {
            Operand::Text(s) => s
                .chars()
                .map(|c| {
                    Byte::try_from(u32::from(c)).map_err(|_| Error::TooWide {
                        value: Word::try_from(u32::from(c)).unwrap_or(Word::MAX),
                        bits: 8,
                    })
                })
                .collect(),
            other => Ok(vec![other.to_immediate(ctx)?]),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct StatementLabel {
    pub id: SymbolId,
    pub name: String,
    pub colon: bool,
}

/// One logical source line.
#[derive(Debug, PartialEq, Clone)]
pub struct Statement {
    pub loc: Loc,
    pub label: Option<StatementLabel>,
    pub keyword: Option<Keyword>,
    pub operands: Vec<Operand>,
    pub comment: Option<String>,
}

impl Statement {
    pub fn new(loc: Loc) -> Self {
        Statement {
            loc,
            label: None,
            keyword: None,
            operands: Vec::new(),
            comment: None,
        }
    }

    pub fn mnemonic(&self) -> Option<Mnemonic> {
        match self.keyword {
            Some(Keyword::Mnemonic(m)) => Some(m),
            _ => None,
        }
    }

    pub fn label_text(&self) -> String {
        match &self.label {
            None => String::new(),
            Some(label) if label.colon => format!("{}:", label.name),
            Some(label) => label.name.clone(),
        }
    }

    /// The mnemonic and its operands, as they would be written back out.
    pub fn asm_text(&self) -> String {
        let operands = self.operands.iter().join(",");
        match (&self.keyword, operands.is_empty()) {
            (None, _) => String::new(),
            (Some(kw), true) => kw.to_string(),
            (Some(kw), false) => format!("{} {}", kw, operands),
        }
    }
}

/// The output of the assembler for one statement. `address` is only present
/// for statements which were run through the instruction encoder.
#[derive(Debug, PartialEq, Clone)]
pub struct AssembledLine {
    pub address: Option<Word>,
    pub bytes: Vec<Byte>,
    pub statement: Statement,
}
