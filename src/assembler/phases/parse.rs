use super::tokenize::{Operator, Token, Tokenizer};
use super::types::{Error as AsmError, Loc, Located};
use crate::assembler::eval::{self, Atom, Expression, Item};
use crate::assembler::model::{Operand, Statement, StatementLabel};
use crate::assembler::numeric;
use crate::assembler::symbols::SymbolTable;
use crate::isa::hw::RegisterPair;
use std::fmt::Display;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Error {
    UnexpectedToken(Token, &'static str),
    MissingOperand,
    StringInExpression(String),
    Literal(numeric::Error),
    Expression(eval::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnexpectedToken(tk, msg) => {
                write!(f, "Unexpected token: '{}', expected {}", tk, msg)
            }
            Error::MissingOperand => write!(f, "Expected an operand"),
            Error::StringInExpression(s) => {
                write!(f, "String '{}' cannot be used inside an expression", s)
            }
            Error::Literal(err) => write!(f, "{}", err),
            Error::Expression(err) => write!(f, "{}", err),
        }
    }
}

impl From<numeric::Error> for Error {
    fn from(err: numeric::Error) -> Self {
        Error::Literal(err)
    }
}

impl From<eval::Error> for Error {
    fn from(err: eval::Error) -> Self {
        Error::Expression(err)
    }
}

impl Token {
    fn starts_operand(&self) -> bool {
        matches!(
            self,
            Token::Symbol(_)
                | Token::Number(_)
                | Token::String(_)
                | Token::CurrentAddress
                | Token::Operator(_)
        )
    }

    fn ends_statement(&self) -> bool {
        matches!(self, Token::Newline | Token::EndOfInput)
    }
}

enum Piece {
    Item(Item),
    Text(String),
}

/// Pulls tokens from a `Tokenizer` one statement (source line) at a time.
/// Symbols mentioned by a statement are entered into the table passed to
/// `next_statement` as they are read.
pub struct Parser {
    tokens: Tokenizer,
    lookahead: Option<Located<Token>>,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        Parser {
            tokens: Tokenizer::new(source),
            lookahead: None,
        }
    }

    fn peek(&mut self) -> Result<&Located<Token>, AsmError> {
        let tk = match self.lookahead.take() {
            Some(tk) => tk,
            None => self.tokens.next_token()?,
        };
        Ok(self.lookahead.get_or_insert(tk))
    }

    fn bump(&mut self) -> Result<Located<Token>, AsmError> {
        match self.lookahead.take() {
            Some(tk) => Ok(tk),
            None => Ok(self.tokens.next_token()?),
        }
    }

    fn unexpected(tk: Located<Token>, expected: &'static str) -> AsmError {
        tk.map(|tk| Error::UnexpectedToken(tk, expected)).into()
    }

    /// Returns `None` once the source is exhausted.
    pub fn next_statement(
        &mut self,
        symbols: &mut SymbolTable,
    ) -> Result<Option<Statement>, AsmError> {
        while *self.peek()?.as_value() == Token::Newline {
            self.bump()?;
        }

        let first = self.peek()?;
        if *first.as_value() == Token::EndOfInput {
            return Ok(None);
        }

        let loc = first.loc().unwrap_or_else(|| Loc::new(0, 0));
        let mut stmt = Statement::new(loc);

        stmt.label = self.parse_label(symbols)?;

        if let Token::Keyword(kw) = self.peek()?.as_value() {
            stmt.keyword = Some(*kw);
            self.bump()?;

            if self.peek()?.as_value().starts_operand() {
                stmt.operands = self.parse_operand_list(symbols)?;
            }
        }

        if let Token::Comment(text) = self.peek()?.as_value() {
            stmt.comment = Some(text.clone());
            self.bump()?;
        }

        let end = self.bump()?;
        if !end.as_value().ends_statement() {
            let expected = match (&stmt.keyword, stmt.operands.is_empty()) {
                (None, _) => "a label or instruction",
                (Some(_), true) => "an operand or end of line",
                (Some(_), false) => "',' or end of line",
            };
            return Err(Parser::unexpected(end, expected));
        }

        Ok(Some(stmt))
    }

    fn parse_label(
        &mut self,
        symbols: &mut SymbolTable,
    ) -> Result<Option<StatementLabel>, AsmError> {
        let (name, colon) = match self.peek()?.as_value() {
            Token::LabelDecl(name) => (name.clone(), true),
            Token::Symbol(name) if !RegisterPair::is_pseudo_register(name) => {
                (name.clone(), false)
            }
            _ => return Ok(None),
        };

        let tk = self.bump()?;
        let id = symbols.add_or_get(&name, tk.loc());
        Ok(Some(StatementLabel { id, name, colon }))
    }

    fn parse_operand_list(
        &mut self,
        symbols: &mut SymbolTable,
    ) -> Result<Vec<Operand>, AsmError> {
        let mut operands = vec![self.parse_operand(symbols)?];
        while *self.peek()?.as_value() == Token::Comma {
            self.bump()?;
            operands.push(self.parse_operand(symbols)?);
        }
        Ok(operands)
    }

    fn can_extend(tk: &Token, after_value: bool) -> bool {
        match tk {
            Token::Symbol(_) | Token::Number(_) | Token::String(_) | Token::CurrentAddress => {
                !after_value
            }
            Token::Operator(_) => true,
            _ => false,
        }
    }

    /// Absorbs one operand: either a single value, or a run of values and
    /// operators which is then handed to the expression parser. Two values
    /// in a row end the run.
    fn parse_operand(&mut self, symbols: &mut SymbolTable) -> Result<Operand, AsmError> {
        let start = self.peek()?.loc();
        let mut pieces = Vec::new();
        let mut text = String::new();
        let mut after_value = false;
        let mut after_word = false;

        while Parser::can_extend(self.peek()?.as_value(), after_value) {
            let tk = self.bump()?;
            let loc = tk.loc();
            let tk = tk.value();

            let word = matches!(&tk, Token::Operator(op) if op.is_word());
            if !text.is_empty() && (word || after_word) {
                text.push(' ');
            }
            text.push_str(&tk.to_string());
            after_word = word;

            after_value = match &tk {
                Token::Operator(Operator::RParen) => true,
                Token::Operator(_) => false,
                _ => true,
            };

            pieces.push(
                Parser::to_piece(tk, symbols, loc).map_err(|err| Located::new(loc, err))?,
            );
        }

        match pieces.len() {
            0 => Err(Located::new(start, Error::MissingOperand).into()),
            1 => match pieces.pop() {
                Some(Piece::Item(Item::Atom(Atom::Number(value)))) => {
                    Ok(Operand::Number { value, text })
                }
                Some(Piece::Item(Item::Atom(atom))) => Ok(Operand::from(atom)),
                Some(Piece::Item(Item::Pair(pair))) => Ok(Operand::PairRegister(pair)),
                Some(Piece::Text(s)) => Ok(Operand::Text(s)),
                Some(Piece::Item(Item::Operator(_))) | None => {
                    Err(Located::new(start, Error::from(eval::Error::MissingOperand(text))).into())
                }
            },
            _ => {
                let items = pieces
                    .into_iter()
                    .map(|piece| match piece {
                        Piece::Item(item) => Ok(item),
                        Piece::Text(s) => Err(Error::StringInExpression(s)),
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|err| Located::new(start, err))?;

                Ok(Operand::Expression(
                    Expression::parse(items, text)
                        .map_err(|err| Located::new(start, Error::from(err)))?,
                ))
            }
        }
    }

    fn to_piece(tk: Token, symbols: &mut SymbolTable, loc: Option<Loc>) -> Result<Piece, Error> {
        Ok(Piece::Item(match tk {
            Token::Symbol(name) => match RegisterPair::from_name(&name) {
                Some(pair) if RegisterPair::is_pseudo_register(&name) => Item::Pair(pair),
                _ => Item::Atom(Atom::Symbol {
                    id: symbols.add_or_get(&name, loc),
                    name,
                }),
            },
            Token::Number(text) => Item::Atom(Atom::Number(numeric::parse_literal(&text)?)),
            Token::String(s) => {
                if s.chars().count() == 1 {
                    Item::Atom(Atom::Char(numeric::parse_char(&s)?))
                } else {
                    return Ok(Piece::Text(s));
                }
            }
            Token::CurrentAddress => Item::Atom(Atom::CurrentAddress),
            Token::Operator(op) => Item::Operator(op),
            tk => return Err(Error::UnexpectedToken(tk, "an operand")),
        }))
    }
}

/// Parses every statement in `source`, for callers which do not need the
/// two-pass driver.
pub fn parse(source: &str, symbols: &mut SymbolTable) -> Result<Vec<Statement>, AsmError> {
    let mut parser = Parser::new(source);
    let mut stmts = Vec::new();
    while let Some(stmt) = parser.next_statement(symbols)? {
        stmts.push(stmt);
    }
    Ok(stmts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::inst::{Directive, Keyword, Mnemonic};

    fn parse_one(source: &str) -> Result<Statement, AsmError> {
        let mut symbols = SymbolTable::new();
        let mut stmts = parse(source, &mut symbols)?;
        assert_eq!(stmts.len(), 1);
        Ok(stmts.remove(0))
    }

    #[test]
    fn full_line() {
        let stmt = parse_one("start: mvi a, 5 ; load\n").unwrap();
        assert_eq!(stmt.loc, Loc::new(1, 1));
        assert_eq!(stmt.label.as_ref().map(|l| l.name.as_str()), Some("START"));
        assert!(stmt.label.as_ref().unwrap().colon);
        assert_eq!(stmt.keyword, Some(Keyword::Mnemonic(Mnemonic::MVI)));
        assert_eq!(stmt.operands.len(), 2);
        assert_eq!(
            stmt.operands[1],
            Operand::Number {
                value: 5,
                text: "5".to_owned()
            }
        );
        assert_eq!(stmt.comment.as_deref(), Some("LOAD"));
    }

    #[test]
    fn literals_keep_their_spelling() {
        let stmt = parse_one("DB 1010b, 0ffh, 12\n").unwrap();
        let written: Vec<_> = stmt.operands.iter().map(|op| op.to_string()).collect();
        assert_eq!(written, vec!["1010B", "0FFH", "12"]);
        assert_eq!(
            stmt.operands[0],
            Operand::Number {
                value: 10,
                text: "1010B".to_owned()
            }
        );
    }

    #[test]
    fn blank_lines_are_skipped() {
        let mut symbols = SymbolTable::new();
        let stmts = parse("\n\n  NOP\n\n; note\nHLT", &mut symbols).unwrap();
        assert_eq!(stmts.len(), 3);
        assert_eq!(stmts[0].loc.line(), 3);
        assert_eq!(stmts[1].keyword, None);
        assert_eq!(stmts[1].comment.as_deref(), Some("NOTE"));
        assert_eq!(stmts[2].loc.line(), 6);
    }

    #[test]
    fn label_without_colon() {
        let stmt = parse_one("X EQU 5").unwrap();
        let label = stmt.label.unwrap();
        assert_eq!(label.name, "X");
        assert!(!label.colon);
        assert_eq!(stmt.keyword, Some(Keyword::Directive(Directive::EQU)));
    }

    #[test]
    fn expressions() {
        let stmt = parse_one("MVI A, (2+3)*4").unwrap();
        match &stmt.operands[1] {
            Operand::Expression(expr) => assert_eq!(expr.text(), "(2+3)*4"),
            other => panic!("expected an expression, got {:?}", other),
        }

        let stmt = parse_one("LXI H, X SHL 2").unwrap();
        match &stmt.operands[1] {
            Operand::Expression(expr) => assert_eq!(expr.text(), "X SHL 2"),
            other => panic!("expected an expression, got {:?}", other),
        }
    }

    #[test]
    fn pseudo_registers() {
        let stmt = parse_one("PUSH PSW").unwrap();
        assert_eq!(stmt.operands, vec![Operand::PairRegister(RegisterPair::PSW)]);

        assert_eq!(
            parse_one("LXI B, SP+1"),
            Err(AsmError::Parse(Located::with_loc(
                Loc::new(1, 8),
                Error::Expression(eval::Error::RegisterInExpression("SP+1".to_owned()))
            )))
        );
    }

    #[test]
    fn strings() {
        let stmt = parse_one("DB 'hello', 'x'").unwrap();
        assert_eq!(
            stmt.operands,
            vec![Operand::Text("HELLO".to_owned()), Operand::Char(b'X')]
        );
    }

    #[test]
    fn missing_comma() {
        assert_eq!(
            parse_one("LXI B 100H"),
            Err(AsmError::Parse(Located::with_loc(
                Loc::new(1, 7),
                Error::UnexpectedToken(Token::Number("100H".to_owned()), "',' or end of line")
            )))
        );
    }

    #[test]
    fn dangling_comma() {
        assert_eq!(
            parse_one("MVI A,"),
            Err(AsmError::Parse(Located::with_loc(
                Loc::new(1, 7),
                Error::MissingOperand
            )))
        );
    }

    #[test]
    fn number_in_label_position() {
        assert_eq!(
            parse_one("12 NOP"),
            Err(AsmError::Parse(Located::with_loc(
                Loc::new(1, 1),
                Error::UnexpectedToken(Token::Number("12".to_owned()), "a label or instruction")
            )))
        );
    }

    #[test]
    fn bad_literal() {
        assert_eq!(
            parse_one("MVI A, 0FF"),
            Err(AsmError::Parse(Located::with_loc(
                Loc::new(1, 8),
                Error::Literal(numeric::Error::MissingHexSuffix("0FF".to_owned()))
            )))
        );
    }
}
