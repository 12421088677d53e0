use super::phases::tokenize::Operator;
use super::symbols::{SymbolId, SymbolKind, SymbolTable};
use crate::isa::hw::{Byte, RegisterPair, Word};
use std::fmt::Display;

/// How deeply parentheses and unary operators may nest in one expression.
pub const MAX_NESTING: usize = 64;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Error {
    UnbalancedParens(String),
    TrailingTokens(String),
    MissingOperand(String),
    DivideByZero(String),
    RegisterInExpression(String),
    TooDeep(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnbalancedParens(text) => write!(f, "Unbalanced parentheses in '{}'", text),
            Error::TrailingTokens(text) => write!(f, "Invalid expression '{}'", text),
            Error::MissingOperand(text) => {
                write!(f, "Operator without an operand in '{}'", text)
            }
            Error::DivideByZero(text) => write!(f, "Division by zero in '{}'", text),
            Error::RegisterInExpression(text) => write!(
                f,
                "Register pair names have no value and cannot be used in '{}'",
                text
            ),
            Error::TooDeep(text) => write!(
                f,
                "Expression '{}' nests deeper than {} levels",
                text, MAX_NESTING
            ),
        }
    }
}

/// Everything an operand needs from its surroundings to produce a value.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub symbols: &'a SymbolTable,
    pub address: Word,
}

impl<'a> EvalContext<'a> {
    pub fn new(symbols: &'a SymbolTable, address: Word) -> Self {
        EvalContext { symbols, address }
    }

    pub fn is_unknown(&self, id: SymbolId) -> bool {
        self.symbols.get(id).kind() == SymbolKind::Unknown
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Atom {
    Number(Word),
    CurrentAddress,
    Symbol { id: SymbolId, name: String },
    Char(Byte),
}

impl Atom {
    /// Unresolved symbols read as zero; callers check deferral first.
    pub fn value(&self, ctx: &EvalContext) -> Word {
        match self {
            Atom::Number(v) => *v,
            Atom::CurrentAddress => ctx.address,
            Atom::Symbol { id, .. } => ctx.symbols.get(*id).value().unwrap_or(0),
            Atom::Char(c) => Word::from(*c),
        }
    }

    pub fn is_deferred(&self, ctx: &EvalContext) -> bool {
        match self {
            Atom::Symbol { id, .. } => ctx.is_unknown(*id),
            _ => false,
        }
    }
}

/// One element of the flat token run an expression is built from.
#[derive(Debug, PartialEq, Clone)]
pub enum Item {
    Atom(Atom),
    Pair(RegisterPair),
    Operator(Operator),
}

#[derive(Debug, PartialEq, Clone, Copy)]
enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, PartialEq, Clone, Copy)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    fn apply(self, lhs: Word, rhs: Word) -> Option<Word> {
        Some(match self {
            BinaryOp::Add => lhs.wrapping_add(rhs),
            BinaryOp::Sub => lhs.wrapping_sub(rhs),
            BinaryOp::Mul => lhs.wrapping_mul(rhs),
            BinaryOp::Div => lhs.checked_div(rhs)?,
            BinaryOp::Mod => lhs.checked_rem(rhs)?,
            BinaryOp::Shl => lhs.checked_shl(u32::from(rhs)).unwrap_or(0),
            BinaryOp::Shr => lhs.checked_shr(u32::from(rhs)).unwrap_or(0),
            BinaryOp::And => lhs & rhs,
            BinaryOp::Or => lhs | rhs,
            BinaryOp::Xor => lhs ^ rhs,
        })
    }
}

#[derive(Debug, PartialEq, Clone)]
enum Node {
    Atom(Atom),
    Unary(UnaryOp, Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
}

impl Node {
    fn eval(&self, ctx: &EvalContext) -> Option<Word> {
        match self {
            Node::Atom(atom) => Some(atom.value(ctx)),
            Node::Unary(op, inner) => {
                let v = inner.eval(ctx)?;
                Some(match op {
                    UnaryOp::Neg => v.wrapping_neg(),
                    UnaryOp::Pos => v,
                    UnaryOp::Not => !v,
                })
            }
            Node::Binary(op, lhs, rhs) => op.apply(lhs.eval(ctx)?, rhs.eval(ctx)?),
        }
    }

    fn is_deferred(&self, ctx: &EvalContext) -> bool {
        match self {
            Node::Atom(atom) => atom.is_deferred(ctx),
            Node::Unary(_, inner) => inner.is_deferred(ctx),
            Node::Binary(_, lhs, rhs) => lhs.is_deferred(ctx) || rhs.is_deferred(ctx),
        }
    }
}

/// A multi-token operand, kept as a tree so it can be re-evaluated once
/// forward references are resolved.
#[derive(Debug, PartialEq, Clone)]
pub struct Expression {
    text: String,
    root: Node,
}

impl Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl Expression {
    pub fn parse(items: Vec<Item>, text: String) -> Result<Expression, Error> {
        let mut parser = Parser {
            items: &items,
            pos: 0,
            depth: 0,
            text: &text,
        };

        let root = parser.parse_logical()?;
        match parser.peek() {
            None => Ok(Expression { text, root }),
            Some(Item::Operator(Operator::RParen)) => Err(Error::UnbalancedParens(text)),
            Some(_) => Err(Error::TrailingTokens(text)),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn evaluate(&self, ctx: &EvalContext) -> Result<Word, Error> {
        self.root
            .eval(ctx)
            .ok_or_else(|| Error::DivideByZero(self.text.clone()))
    }

    /// Whether the expression mentions a symbol which has not been defined
    /// yet.
    pub fn is_deferred(&self, ctx: &EvalContext) -> bool {
        self.root.is_deferred(ctx)
    }
}

struct Parser<'a> {
    items: &'a [Item],
    pos: usize,
    depth: usize,
    text: &'a str,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Item> {
        self.items.get(self.pos)
    }

    fn peek_operator(&self) -> Option<Operator> {
        match self.peek() {
            Some(Item::Operator(op)) => Some(*op),
            _ => None,
        }
    }

    fn next(&mut self) -> Option<&'a Item> {
        let item = self.items.get(self.pos);
        self.pos += 1;
        item
    }

    fn binary_loop<F, G>(&mut self, operand: F, select: G) -> Result<Node, Error>
    where
        F: Fn(&mut Self) -> Result<Node, Error>,
        G: Fn(Operator) -> Option<BinaryOp>,
    {
        let mut lhs = operand(self)?;
        while let Some(op) = self.peek_operator().and_then(|op| select(op)) {
            self.pos += 1;
            let rhs = operand(self)?;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_logical(&mut self) -> Result<Node, Error> {
        self.binary_loop(Self::parse_additive, |op| match op {
            Operator::And => Some(BinaryOp::And),
            Operator::Or => Some(BinaryOp::Or),
            Operator::Xor => Some(BinaryOp::Xor),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<Node, Error> {
        self.binary_loop(Self::parse_term, |op| match op {
            Operator::Plus => Some(BinaryOp::Add),
            Operator::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn parse_term(&mut self) -> Result<Node, Error> {
        self.binary_loop(Self::parse_unary, |op| match op {
            Operator::Star => Some(BinaryOp::Mul),
            Operator::Slash => Some(BinaryOp::Div),
            Operator::Mod => Some(BinaryOp::Mod),
            Operator::Shl => Some(BinaryOp::Shl),
            Operator::Shr => Some(BinaryOp::Shr),
            _ => None,
        })
    }

    fn nested<F>(&mut self, inner: F) -> Result<Node, Error>
    where
        F: FnOnce(&mut Self) -> Result<Node, Error>,
    {
        if self.depth >= MAX_NESTING {
            return Err(Error::TooDeep(self.text.to_owned()));
        }
        self.depth += 1;
        let node = inner(self);
        self.depth -= 1;
        node
    }

    fn parse_unary(&mut self) -> Result<Node, Error> {
        let unary = |p: &mut Self, op: UnaryOp| -> Result<Node, Error> {
            p.nested(|p| Ok(Node::Unary(op, Box::new(p.parse_unary()?))))
        };

        match self.next() {
            Some(Item::Atom(atom)) => Ok(Node::Atom(atom.clone())),
            Some(Item::Pair(_)) => Err(Error::RegisterInExpression(self.text.to_owned())),
            Some(Item::Operator(Operator::LParen)) => {
                let inner = self.nested(Self::parse_logical)?;
                match self.next() {
                    Some(Item::Operator(Operator::RParen)) => Ok(inner),
                    _ => Err(Error::UnbalancedParens(self.text.to_owned())),
                }
            }
            Some(Item::Operator(Operator::Minus)) => unary(self, UnaryOp::Neg),
            Some(Item::Operator(Operator::Plus)) => unary(self, UnaryOp::Pos),
            Some(Item::Operator(Operator::Not)) => unary(self, UnaryOp::Not),
            Some(Item::Operator(_)) | None => Err(Error::MissingOperand(self.text.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(v: Word) -> Item {
        Item::Atom(Atom::Number(v))
    }

    fn op(op: Operator) -> Item {
        Item::Operator(op)
    }

    fn eval(items: Vec<Item>) -> Result<Word, Error> {
        let symbols = SymbolTable::new();
        let ctx = EvalContext::new(&symbols, 0x100);
        Expression::parse(items, "<test>".to_owned())?.evaluate(&ctx)
    }

    #[test]
    fn precedence() {
        // 2+3*4
        assert_eq!(
            eval(vec![
                num(2),
                op(Operator::Plus),
                num(3),
                op(Operator::Star),
                num(4)
            ]),
            Ok(14)
        );
        // (2+3)*4
        assert_eq!(
            eval(vec![
                op(Operator::LParen),
                num(2),
                op(Operator::Plus),
                num(3),
                op(Operator::RParen),
                op(Operator::Star),
                num(4)
            ]),
            Ok(20)
        );
        // 1 OR 2+4 == 1 | 6
        assert_eq!(
            eval(vec![num(1), op(Operator::Or), num(2), op(Operator::Plus), num(4)]),
            Ok(7)
        );
    }

    #[test]
    fn unary_and_shifts() {
        assert_eq!(eval(vec![op(Operator::Minus), num(1)]), Ok(0xFFFF));
        assert_eq!(eval(vec![op(Operator::Not), num(0)]), Ok(0xFFFF));
        assert_eq!(eval(vec![num(1), op(Operator::Shl), num(4)]), Ok(0x10));
        assert_eq!(eval(vec![num(0x80), op(Operator::Shr), num(7)]), Ok(1));
        assert_eq!(eval(vec![num(1), op(Operator::Shl), num(16)]), Ok(0));
        assert_eq!(eval(vec![num(7), op(Operator::Mod), num(4)]), Ok(3));
    }

    #[test]
    fn current_address() {
        assert_eq!(
            eval(vec![
                Item::Atom(Atom::CurrentAddress),
                op(Operator::Plus),
                num(2)
            ]),
            Ok(0x102)
        );
    }

    #[test]
    fn errors() {
        assert_eq!(
            eval(vec![op(Operator::LParen), num(1), op(Operator::Plus), num(2)]),
            Err(Error::UnbalancedParens("<test>".to_owned()))
        );
        assert_eq!(
            eval(vec![num(1), op(Operator::RParen)]),
            Err(Error::UnbalancedParens("<test>".to_owned()))
        );
        assert_eq!(
            eval(vec![num(1), op(Operator::Plus)]),
            Err(Error::MissingOperand("<test>".to_owned()))
        );
        assert_eq!(
            eval(vec![num(1), op(Operator::Not), num(2)]),
            Err(Error::TrailingTokens("<test>".to_owned()))
        );
        assert_eq!(
            eval(vec![num(1), op(Operator::Slash), num(0)]),
            Err(Error::DivideByZero("<test>".to_owned()))
        );
        assert_eq!(
            eval(vec![Item::Pair(RegisterPair::SP), op(Operator::Plus), num(1)]),
            Err(Error::RegisterInExpression("<test>".to_owned()))
        );
    }

    #[test]
    fn deferral() {
        let mut symbols = SymbolTable::new();
        let id = symbols.add_or_get("LATER", None);
        let expr = Expression::parse(
            vec![
                Item::Atom(Atom::Symbol {
                    id,
                    name: "LATER".to_owned(),
                }),
                op(Operator::Plus),
                num(1),
            ],
            "LATER+1".to_owned(),
        )
        .unwrap();

        assert!(expr.is_deferred(&EvalContext::new(&symbols, 0)));
        assert_eq!(expr.evaluate(&EvalContext::new(&symbols, 0)), Ok(1));

        symbols.get_mut(id).bind(SymbolKind::Address, 0x0800);
        let ctx = EvalContext::new(&symbols, 0);
        assert!(!expr.is_deferred(&ctx));
        assert_eq!(expr.evaluate(&ctx), Ok(0x0801));
    }

    #[test]
    fn nesting_is_capped() {
        let negations = |n: usize| {
            let mut items = vec![op(Operator::Minus); n];
            items.push(num(1));
            items
        };
        assert_eq!(eval(negations(MAX_NESTING)), Ok(1));
        assert_eq!(
            eval(negations(MAX_NESTING + 1)),
            Err(Error::TooDeep("<test>".to_owned()))
        );

        let mut parens = vec![op(Operator::LParen); 1000];
        parens.push(num(1));
        parens.extend(vec![op(Operator::RParen); 1000]);
        assert_eq!(eval(parens), Err(Error::TooDeep("<test>".to_owned())));
    }
}
