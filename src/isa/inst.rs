use derive_more::Display;
use strum_macros::{EnumIter, EnumString};

/// Every instruction the assembler can encode, plus the three data
/// definition pseudo-ops.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString)]
pub enum Mnemonic {
    // Data transfer
    MOV,
    MVI,
    LXI,
    LDA,
    STA,
    LHLD,
    SHLD,
    LDAX,
    STAX,
    XCHG,

    // Arithmetic and logic
    ADD,
    ADC,
    SUB,
    SBB,
    ANA,
    XRA,
    ORA,
    CMP,
    ADI,
    ACI,
    SUI,
    SBI,
    ANI,
    XRI,
    ORI,
    CPI,
    INR,
    DCR,
    INX,
    DCX,
    DAD,
    DAA,
    CMA,
    CMC,
    STC,
    RLC,
    RRC,
    RAL,
    RAR,

    // Branching
    JMP,
    JNZ,
    JZ,
    JNC,
    JC,
    JPO,
    JPE,
    JP,
    JM,
    CALL,
    CNZ,
    CZ,
    CNC,
    CC,
    CPO,
    CPE,
    CP,
    CM,
    RET,
    RNZ,
    RZ,
    RNC,
    RC,
    RPO,
    RPE,
    RP,
    RM,
    RST,
    PCHL,

    // Stack, I/O and machine control
    PUSH,
    POP,
    XTHL,
    SPHL,
    IN,
    OUT,
    EI,
    DI,
    HLT,
    NOP,

    // Data definition
    DB,
    DW,
    DS,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString)]
pub enum Directive {
    ORG,
    EQU,
    SET,
    END,
}

/// Anything which may sit in the mnemonic column of a statement.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Mnemonic(Mnemonic),
    Directive(Directive),
}

impl From<Mnemonic> for Keyword {
    fn from(m: Mnemonic) -> Self {
        Keyword::Mnemonic(m)
    }
}

impl From<Directive> for Keyword {
    fn from(d: Directive) -> Self {
        Keyword::Directive(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn names_parse_back() {
        for m in Mnemonic::iter() {
            assert_eq!(Mnemonic::from_str(&m.to_string()), Ok(m));
        }
        assert_eq!(Directive::from_str("EQU"), Ok(Directive::EQU));
        assert!(Mnemonic::from_str("ORG").is_err());
    }

    #[test]
    fn keyword_display() {
        assert_eq!(Keyword::from(Mnemonic::LXI).to_string(), "LXI");
        assert_eq!(Keyword::from(Directive::END).to_string(), "END");
    }
}
