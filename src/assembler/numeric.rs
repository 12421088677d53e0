use crate::isa::hw::{Byte, Word};
use derive_more::Display;
use std::convert::TryFrom;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Radix {
    #[display(fmt = "binary")]
    Binary,
    #[display(fmt = "octal")]
    Octal,
    #[display(fmt = "decimal")]
    Decimal,
    #[display(fmt = "hexadecimal")]
    Hexadecimal,
}

impl Radix {
    pub fn base(self) -> u32 {
        match self {
            Radix::Binary => 2,
            Radix::Octal => 8,
            Radix::Decimal => 10,
            Radix::Hexadecimal => 16,
        }
    }

    /// Splits a literal into its radix and digit run by looking at the
    /// trailing suffix character.
    fn dispatch(literal: &str) -> (Radix, &str) {
        let body = literal
            .char_indices()
            .last()
            .map_or("", |(idx, _)| &literal[..idx]);
        match literal.chars().last() {
            Some('H') => (Radix::Hexadecimal, body),
            Some('O') | Some('Q') => (Radix::Octal, body),
            Some('B') => (Radix::Binary, body),
            Some('D') => (Radix::Decimal, body),
            _ => (Radix::Decimal, literal),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Error {
    Malformed { literal: String, radix: Radix },
    MisplacedUnderscore(String),
    Overflow(String),
    MissingHexSuffix(String),
    BadCharLiteral(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Malformed { literal, radix } => {
                write!(f, "Could not parse '{}' as a {} number", literal, radix)
            }
            Error::MisplacedUnderscore(literal) => write!(
                f,
                "Cannot put underscores at the end of a literal or prior to its suffix: '{}'",
                literal
            ),
            Error::Overflow(literal) => {
                write!(f, "Numeric literal '{}' does not fit in 16 bits", literal)
            }
            Error::MissingHexSuffix(literal) => write!(
                f,
                "Could not parse '{}' as a decimal number. Did you mean \"{}H\"?",
                literal, literal
            ),
            Error::BadCharLiteral(literal) => {
                write!(f, "Character literal '{}' is not a single ASCII character", literal)
            }
        }
    }
}

fn is_digit_of(c: char, radix: Radix) -> bool {
    c.is_digit(radix.base())
}

/// Parses a suffixed numeric literal (`0FFH`, `255`, `255D`, `377O`,
/// `377Q`, `1111_1111B`) into a 16-bit value.
pub fn parse_literal(literal: &str) -> Result<Word, Error> {
    let literal = literal.to_ascii_uppercase();
    let (radix, body) = Radix::dispatch(&literal);

    if literal.ends_with('_') || body.ends_with('_') {
        return Err(Error::MisplacedUnderscore(literal));
    }

    let digits: String = body.chars().filter(|c| *c != '_').collect();
    let well_formed = digits.chars().next().map_or(false, |c| c.is_ascii_digit())
        && digits.chars().all(|c| is_digit_of(c, radix));

    if !well_formed {
        if radix == Radix::Decimal
            && !literal.is_empty()
            && literal
                .chars()
                .all(|c| is_digit_of(c, Radix::Hexadecimal))
        {
            return Err(Error::MissingHexSuffix(literal));
        }
        return Err(Error::Malformed { literal, radix });
    }

    u32::from_str_radix(&digits, radix.base())
        .ok()
        .and_then(|v| Word::try_from(v).ok())
        .ok_or(Error::Overflow(literal))
}

/// The value of a one-character string literal.
pub fn parse_char(literal: &str) -> Result<Byte, Error> {
    let mut cs = literal.chars();
    match (cs.next(), cs.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c as Byte),
        _ => Err(Error::BadCharLiteral(literal.to_owned())),
    }
}
