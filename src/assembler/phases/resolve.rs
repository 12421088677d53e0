use super::types::Located;
use crate::assembler::model::StatementLabel;
use crate::assembler::symbols::{Symbol, SymbolKind, SymbolTable};
use crate::isa::{
    hw::Word,
    inst::{Directive, Keyword},
};
use std::fmt::Display;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Error {
    DoubleLabel(String),
    LabelRedefined { name: String, kind: SymbolKind },
    LabelNeedsColon(String),
    MissingDirectiveLabel(Directive),
    DirectiveLabelHasColon { name: String, directive: Directive },
    EquRedefined(String),
    SetOverridesEqu(String),
    EquOverridesSet(String),
    FixedSymbol(String),
    DirectiveArgCount { directive: Directive, given: usize },
    ForwardReference(Keyword),
    UndefinedLabel { name: String, hint: Option<String> },
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::DoubleLabel(name) => write!(f, "Label '{}' is declared twice", name),
            Error::LabelRedefined { name, kind } => write!(
                f,
                "'{}' is already defined as {} and cannot be redefined",
                name, kind
            ),
            Error::LabelNeedsColon(name) => write!(
                f,
                "Label '{}' must be followed by a colon, did you mean \"{}:\"?",
                name, name
            ),
            Error::MissingDirectiveLabel(directive) => {
                write!(f, "{} requires a label to bind", directive)
            }
            Error::DirectiveLabelHasColon { name, directive } => write!(
                f,
                "The label of an {} directive is written without a colon, did you mean \"{} {}\"?",
                directive, name, directive
            ),
            Error::EquRedefined(name) => {
                write!(f, "'{}' was defined with EQU and cannot be redefined", name)
            }
            Error::SetOverridesEqu(name) => {
                write!(f, "'{}' was defined with EQU and cannot be SET", name)
            }
            Error::EquOverridesSet(name) => {
                write!(f, "'{}' was defined with SET and cannot be EQU", name)
            }
            Error::FixedSymbol(name) => write!(f, "'{}' is a register and cannot be redefined", name),
            Error::DirectiveArgCount { directive, given } => write!(
                f,
                "{} expects exactly one operand, but {} were given",
                directive, given
            ),
            Error::ForwardReference(kw) => write!(
                f,
                "The operand of {} must only refer to symbols defined before it",
                kw
            ),
            Error::UndefinedLabel { name, hint } => {
                write!(f, "Undefined label '{}'", name)?;
                if let Some(hint) = hint {
                    write!(f, ", did you mean the number \"{}\"?", hint)?;
                }
                Ok(())
            }
        }
    }
}

/// Binds a statement label to the address of the statement.
pub fn bind_address(
    symbols: &mut SymbolTable,
    label: &StatementLabel,
    address: Word,
) -> Result<(), Error> {
    let sym = symbols.get_mut(label.id);
    if sym.is_fixed() {
        return Err(Error::FixedSymbol(label.name.clone()));
    }
    if !label.colon {
        return Err(Error::LabelNeedsColon(label.name.clone()));
    }

    match sym.kind() {
        SymbolKind::Unknown => {
            sym.bind(SymbolKind::Address, address);
            Ok(())
        }
        SymbolKind::Address => Err(Error::DoubleLabel(label.name.clone())),
        kind => Err(Error::LabelRedefined {
            name: label.name.clone(),
            kind,
        }),
    }
}

/// Binds the label of an `EQU` or `SET` statement to a value.
pub fn bind_constant(
    symbols: &mut SymbolTable,
    label: Option<&StatementLabel>,
    directive: Directive,
    value: Word,
) -> Result<(), Error> {
    let label = label.ok_or(Error::MissingDirectiveLabel(directive))?;
    if label.colon {
        return Err(Error::DirectiveLabelHasColon {
            name: label.name.clone(),
            directive,
        });
    }

    let sym = symbols.get_mut(label.id);
    if sym.is_fixed() {
        return Err(Error::FixedSymbol(label.name.clone()));
    }

    let name = || label.name.clone();
    let kind = match (directive, sym.kind()) {
        (Directive::EQU, SymbolKind::Unknown) => SymbolKind::Equ,
        (Directive::EQU, SymbolKind::Equ) => return Err(Error::EquRedefined(name())),
        (Directive::EQU, SymbolKind::Set) => return Err(Error::EquOverridesSet(name())),
        (Directive::SET, SymbolKind::Unknown) | (Directive::SET, SymbolKind::Set) => {
            SymbolKind::Set
        }
        (Directive::SET, SymbolKind::Equ) => return Err(Error::SetOverridesEqu(name())),
        (_, kind) => {
            return Err(Error::LabelRedefined {
                name: name(),
                kind,
            })
        }
    };

    sym.bind(kind, value);
    Ok(())
}

fn looks_like_hex(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_hexdigit())
}

fn undefined(sym: &Symbol) -> Error {
    let name = sym.name().to_owned();
    let hint = if looks_like_hex(&name) {
        Some(format!("0{}H", name))
    } else if name.ends_with('H') && looks_like_hex(&name[..name.len() - 1]) {
        Some(format!("0{}", name))
    } else {
        None
    };
    Error::UndefinedLabel { name, hint }
}

/// Fails on the first symbol which was referenced but never defined.
pub fn validate(symbols: &SymbolTable) -> Result<(), Located<Error>> {
    match symbols.unresolved().next() {
        None => Ok(()),
        Some(sym) => Err(Located::new(sym.declared_at(), undefined(sym))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(symbols: &mut SymbolTable, name: &str, colon: bool) -> StatementLabel {
        StatementLabel {
            id: symbols.add_or_get(name, None),
            name: name.to_owned(),
            colon,
        }
    }

    #[test]
    fn addresses_are_write_once() {
        let mut symbols = SymbolTable::new();
        let l = label(&mut symbols, "LOOP", true);
        assert_eq!(bind_address(&mut symbols, &l, 0x10), Ok(()));
        assert_eq!(symbols.get(l.id).value(), Some(0x10));
        assert_eq!(
            bind_address(&mut symbols, &l, 0x20),
            Err(Error::DoubleLabel("LOOP".to_owned()))
        );
    }

    #[test]
    fn address_labels_need_colons() {
        let mut symbols = SymbolTable::new();
        let l = label(&mut symbols, "LOOP", false);
        assert_eq!(
            bind_address(&mut symbols, &l, 0),
            Err(Error::LabelNeedsColon("LOOP".to_owned()))
        );
    }

    #[test]
    fn registers_are_fixed() {
        let mut symbols = SymbolTable::new();
        let l = label(&mut symbols, "A", false);
        assert_eq!(
            bind_constant(&mut symbols, Some(&l), Directive::SET, 1),
            Err(Error::FixedSymbol("A".to_owned()))
        );
    }

    #[test]
    fn equ_and_set() {
        let mut symbols = SymbolTable::new();
        let x = label(&mut symbols, "X", false);
        let y = label(&mut symbols, "Y", false);

        assert_eq!(bind_constant(&mut symbols, Some(&x), Directive::EQU, 5), Ok(()));
        assert_eq!(
            bind_constant(&mut symbols, Some(&x), Directive::EQU, 6),
            Err(Error::EquRedefined("X".to_owned()))
        );
        assert_eq!(
            bind_constant(&mut symbols, Some(&x), Directive::SET, 6),
            Err(Error::SetOverridesEqu("X".to_owned()))
        );

        assert_eq!(bind_constant(&mut symbols, Some(&y), Directive::SET, 5), Ok(()));
        assert_eq!(bind_constant(&mut symbols, Some(&y), Directive::SET, 6), Ok(()));
        assert_eq!(symbols.get(y.id).value(), Some(6));
        assert_eq!(
            bind_constant(&mut symbols, Some(&y), Directive::EQU, 7),
            Err(Error::EquOverridesSet("Y".to_owned()))
        );

        assert_eq!(
            bind_constant(&mut symbols, None, Directive::EQU, 7),
            Err(Error::MissingDirectiveLabel(Directive::EQU))
        );
    }

    #[test]
    fn undefined_hints() {
        let mut symbols = SymbolTable::new();
        symbols.add_or_get("FF", None);
        assert_eq!(
            validate(&symbols).map_err(Located::value),
            Err(Error::UndefinedLabel {
                name: "FF".to_owned(),
                hint: Some("0FFH".to_owned())
            })
        );

        let mut symbols = SymbolTable::new();
        symbols.add_or_get("NOWHERE", None);
        assert_eq!(
            validate(&symbols).map_err(Located::value),
            Err(Error::UndefinedLabel {
                name: "NOWHERE".to_owned(),
                hint: None
            })
        );
    }
}
