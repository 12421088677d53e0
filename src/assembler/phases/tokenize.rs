use super::types::{Loc, Located};
use crate::assembler::lang::Lang;
use crate::isa::inst::Keyword;
use derive_more::Display;
use std::fmt::Display as FmtDisplay;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Error {
    UnterminatedString,
    UnexpectedChar(char),
    MnemonicAsLabel(String),
}

impl FmtDisplay for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnterminatedString => write!(f, "No end quote found for string literal"),
            Error::UnexpectedChar(c) => write!(f, "Unknown token starting with '{}'", c),
            Error::MnemonicAsLabel(name) => write!(
                f,
                "Label cannot be named by existing instruction name '{}'",
                name
            ),
        }
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    #[display(fmt = "+")]
    Plus,
    #[display(fmt = "-")]
    Minus,
    #[display(fmt = "*")]
    Star,
    #[display(fmt = "/")]
    Slash,
    #[display(fmt = "(")]
    LParen,
    #[display(fmt = ")")]
    RParen,
    #[display(fmt = "MOD")]
    Mod,
    #[display(fmt = "NOT")]
    Not,
    #[display(fmt = "AND")]
    And,
    #[display(fmt = "OR")]
    Or,
    #[display(fmt = "XOR")]
    Xor,
    #[display(fmt = "SHR")]
    Shr,
    #[display(fmt = "SHL")]
    Shl,
}

impl Operator {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Operator::Plus),
            '-' => Some(Operator::Minus),
            '*' => Some(Operator::Star),
            '/' => Some(Operator::Slash),
            '(' => Some(Operator::LParen),
            ')' => Some(Operator::RParen),
            _ => None,
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        match word {
            "MOD" => Some(Operator::Mod),
            "NOT" => Some(Operator::Not),
            "AND" => Some(Operator::And),
            "OR" => Some(Operator::Or),
            "XOR" => Some(Operator::Xor),
            "SHR" => Some(Operator::Shr),
            "SHL" => Some(Operator::Shl),
            _ => None,
        }
    }

    pub fn is_word(self) -> bool {
        !matches!(
            self,
            Operator::Plus
                | Operator::Minus
                | Operator::Star
                | Operator::Slash
                | Operator::LParen
                | Operator::RParen
        )
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Token {
    EndOfInput,
    Newline,
    LabelDecl(String),
    Symbol(String),
    Keyword(Keyword),
    Number(String),
    String(String),
    CurrentAddress,
    Comma,
    Comment(String),
    Operator(Operator),
}

impl FmtDisplay for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::EndOfInput => write!(f, "<end of input>"),
            Token::Newline => write!(f, "<newline>"),
            Token::LabelDecl(name) => write!(f, "{}:", name),
            Token::Symbol(name) => write!(f, "{}", name),
            Token::Keyword(kw) => write!(f, "{}", kw),
            Token::Number(text) => write!(f, "{}", text),
            Token::String(s) => write!(f, "'{}'", s),
            Token::CurrentAddress => write!(f, "$"),
            Token::Comma => write!(f, ","),
            Token::Comment(text) => write!(f, ";{}", text),
            Token::Operator(op) => write!(f, "{}", op),
        }
    }
}

const NEWLINE_CHAR: char = '\n';
const COMMENT_CHAR: char = ';';
const STRING_LITERAL_CHAR: char = '\'';
const LABEL_CHAR: char = ':';

fn is_name_start(c: char) -> bool {
    c.is_ascii_uppercase() || matches!(c, '?' | '@' | '_')
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit()
}

fn is_blank(c: char) -> bool {
    c.is_whitespace() && c != NEWLINE_CHAR
}

fn ends_number(c: char) -> bool {
    c.is_whitespace()
        || c == ','
        || c == COMMENT_CHAR
        || c == STRING_LITERAL_CHAR
        || Operator::from_char(c).is_some()
}

/// Lazily splits (case-folded) source text into tokens. Exactly one
/// `Token::EndOfInput` is produced, after which the stream is exhausted.
pub struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    finished: bool,
}

impl Tokenizer {
    pub fn new(source: &str) -> Self {
        Tokenizer {
            chars: source.to_uppercase().chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            finished: false,
        }
    }

    fn loc(&self) -> Loc {
        Loc::new(self.line, self.col)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == NEWLINE_CHAR {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn take_while<F: Fn(char) -> bool>(&mut self, pred: F) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            s.push(c);
            self.bump();
        }
        s
    }

    pub fn next_token(&mut self) -> Result<Located<Token>, Located<Error>> {
        self.take_while(is_blank);

        let loc = self.loc();

        let c = match self.peek() {
            None => {
                self.finished = true;
                return Ok(Located::with_loc(loc, Token::EndOfInput));
            }
            Some(c) => c,
        };

        let tk = match c {
            NEWLINE_CHAR => {
                self.bump();
                Token::Newline
            }
            STRING_LITERAL_CHAR => {
                self.bump();
                let s = self.take_while(|c| c != STRING_LITERAL_CHAR && c != NEWLINE_CHAR);
                if self.peek() != Some(STRING_LITERAL_CHAR) {
                    return Err(Located::with_loc(loc, Error::UnterminatedString));
                }
                self.bump();
                Token::String(s)
            }
            COMMENT_CHAR => {
                self.bump();
                Token::Comment(self.take_while(|c| c != NEWLINE_CHAR).trim().to_owned())
            }
            ',' => {
                self.bump();
                Token::Comma
            }
            '$' => {
                self.bump();
                Token::CurrentAddress
            }
            c => {
                if let Some(op) = Operator::from_char(c) {
                    self.bump();
                    Token::Operator(op)
                } else if is_name_start(c) {
                    self.consume_name()
                        .map_err(|err| Located::with_loc(loc, err))?
                } else if c.is_ascii_digit() {
                    Token::Number(self.take_while(|c| !ends_number(c)))
                } else {
                    return Err(Located::with_loc(loc, Error::UnexpectedChar(c)));
                }
            }
        };

        Ok(Located::with_loc(loc, tk))
    }

    fn consume_name(&mut self) -> Result<Token, Error> {
        let name = self.take_while(is_name_char);
        let colon = self.peek() == Some(LABEL_CHAR);

        if let Some(kw) = Lang::get().lookup_keyword(&name) {
            if colon {
                return Err(Error::MnemonicAsLabel(name));
            }
            return Ok(Token::Keyword(kw));
        }

        if let Some(op) = Operator::from_word(&name) {
            return Ok(Token::Operator(op));
        }

        if colon {
            self.bump();
            return Ok(Token::LabelDecl(name));
        }

        Ok(Token::Symbol(name))
    }
}

impl Iterator for Tokenizer {
    type Item = Result<Located<Token>, Located<Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let res = self.next_token();
        if res.is_err() {
            self.finished = true;
        }
        Some(res)
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Located<Token>>, Located<Error>> {
    Tokenizer::new(source).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::inst::{Directive, Mnemonic};

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(Located::value)
            .collect()
    }

    #[test]
    fn simple_instruction() {
        assert_eq!(
            kinds("mov a,b"),
            vec![
                Token::Keyword(Keyword::Mnemonic(Mnemonic::MOV)),
                Token::Symbol("A".to_owned()),
                Token::Comma,
                Token::Symbol("B".to_owned()),
                Token::EndOfInput,
            ]
        );
    }

    #[test]
    fn label_and_comment() {
        assert_eq!(
            kinds("loop: jmp loop ; again\n"),
            vec![
                Token::LabelDecl("LOOP".to_owned()),
                Token::Keyword(Keyword::Mnemonic(Mnemonic::JMP)),
                Token::Symbol("LOOP".to_owned()),
                Token::Comment("AGAIN".to_owned()),
                Token::Newline,
                Token::EndOfInput,
            ]
        );
    }

    #[test]
    fn locations() {
        let tks = tokenize("NOP\n  HLT").unwrap();
        assert_eq!(tks[0].loc(), Some(Loc::new(1, 1)));
        assert_eq!(tks[1].loc(), Some(Loc::new(1, 4)));
        assert_eq!(tks[2].loc(), Some(Loc::new(2, 3)));
    }

    #[test]
    fn numbers_stop_at_operators() {
        assert_eq!(
            kinds("0FFH+10B*(3)"),
            vec![
                Token::Number("0FFH".to_owned()),
                Token::Operator(Operator::Plus),
                Token::Number("10B".to_owned()),
                Token::Operator(Operator::Star),
                Token::Operator(Operator::LParen),
                Token::Number("3".to_owned()),
                Token::Operator(Operator::RParen),
                Token::EndOfInput,
            ]
        );
    }

    #[test]
    fn numbers_stop_at_comment() {
        assert_eq!(
            kinds("5;x"),
            vec![
                Token::Number("5".to_owned()),
                Token::Comment("X".to_owned()),
                Token::EndOfInput,
            ]
        );
    }

    #[test]
    fn word_operators() {
        assert_eq!(
            kinds("X SHL 2 AND NOT Y"),
            vec![
                Token::Symbol("X".to_owned()),
                Token::Operator(Operator::Shl),
                Token::Number("2".to_owned()),
                Token::Operator(Operator::And),
                Token::Operator(Operator::Not),
                Token::Symbol("Y".to_owned()),
                Token::EndOfInput,
            ]
        );
    }

    #[test]
    fn directives_and_current_address() {
        assert_eq!(
            kinds("X EQU $"),
            vec![
                Token::Symbol("X".to_owned()),
                Token::Keyword(Keyword::Directive(Directive::EQU)),
                Token::CurrentAddress,
                Token::EndOfInput,
            ]
        );
    }

    #[test]
    fn strings_keep_spaces() {
        assert_eq!(
            kinds("DB 'a b'"),
            vec![
                Token::Keyword(Keyword::Mnemonic(Mnemonic::DB)),
                Token::String("A B".to_owned()),
                Token::EndOfInput,
            ]
        );
    }

    #[test]
    fn unterminated_string() {
        assert_eq!(
            tokenize("DB 'abc\nNOP"),
            Err(Located::with_loc(Loc::new(1, 4), Error::UnterminatedString))
        );
        assert_eq!(
            tokenize("DB 'abc"),
            Err(Located::with_loc(Loc::new(1, 4), Error::UnterminatedString))
        );
    }

    #[test]
    fn mnemonic_as_label() {
        assert_eq!(
            tokenize("mov: nop"),
            Err(Located::with_loc(
                Loc::new(1, 1),
                Error::MnemonicAsLabel("MOV".to_owned())
            ))
        );
    }

    #[test]
    fn unexpected_char() {
        assert_eq!(
            tokenize("NOP\n  #"),
            Err(Located::with_loc(Loc::new(2, 3), Error::UnexpectedChar('#')))
        );
    }

    #[test]
    fn iterator_stops_after_end() {
        let mut it = Tokenizer::new("");
        assert_eq!(
            it.next(),
            Some(Ok(Located::with_loc(Loc::new(1, 1), Token::EndOfInput)))
        );
        assert_eq!(it.next(), None);
    }
}
