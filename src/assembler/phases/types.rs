use super::{generate, parse, resolve, tokenize};
use derive_more::Constructor;
use std::fmt::Display;

#[derive(Debug, PartialEq, Clone, Copy, Eq, Constructor)]
pub struct Loc {
    line: usize,
    col: usize,
}

impl Loc {
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn col(&self) -> usize {
        self.col
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Located<T: Sized> {
    loc: Option<Loc>,
    val: T,
}

impl Display for Loc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(line: {}, col: {})", self.line, self.col)
    }
}

impl<T: Display> Display for Located<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.loc {
            None => write!(f, "@<unknown location>: {}", self.val),
            Some(loc) => write!(f, "@{}: {}", loc, self.val),
        }
    }
}

impl<T> Located<T> {
    pub fn new(loc: Option<Loc>, val: T) -> Self {
        Located { loc, val }
    }

    pub fn with_loc(loc: Loc, val: T) -> Self {
        Located::new(Some(loc), val)
    }

    pub fn loc(&self) -> Option<Loc> {
        self.loc
    }

    pub fn value(self) -> T {
        self.val
    }

    pub fn as_value(&self) -> &T {
        &self.val
    }

    pub fn map<S, F>(self, f: F) -> Located<S>
    where
        F: FnOnce(T) -> S,
    {
        Located::new(self.loc, f(self.val))
    }
}

impl<T> From<T> for Located<T> {
    fn from(val: T) -> Self {
        Located { loc: None, val }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    Tokenize(Located<tokenize::Error>),
    Parse(Located<parse::Error>),
    Generate(Located<generate::Error>),
    Resolve(Located<resolve::Error>),
}

impl Error {
    pub fn phase(&self) -> &'static str {
        match self {
            Error::Tokenize(_) => "Tokenizer",
            Error::Parse(_) => "Parser",
            Error::Generate(_) => "Generator",
            Error::Resolve(_) => "Resolver",
        }
    }

    pub fn loc(&self) -> Option<Loc> {
        match self {
            Error::Tokenize(err) => err.loc(),
            Error::Parse(err) => err.loc(),
            Error::Generate(err) => err.loc(),
            Error::Resolve(err) => err.loc(),
        }
    }

    /// The 1-based source line the error was raised on, where known.
    pub fn line(&self) -> Option<usize> {
        self.loc().map(|loc| loc.line())
    }

    pub fn message(&self) -> String {
        match self {
            Error::Tokenize(err) => err.as_value().to_string(),
            Error::Parse(err) => err.as_value().to_string(),
            Error::Generate(err) => err.as_value().to_string(),
            Error::Resolve(err) => err.as_value().to_string(),
        }
    }
}

impl From<Located<tokenize::Error>> for Error {
    fn from(err: Located<tokenize::Error>) -> Self {
        Error::Tokenize(err)
    }
}

impl From<Located<parse::Error>> for Error {
    fn from(err: Located<parse::Error>) -> Self {
        Error::Parse(err)
    }
}

impl From<Located<generate::Error>> for Error {
    fn from(err: Located<generate::Error>) -> Self {
        Error::Generate(err)
    }
}

impl From<Located<resolve::Error>> for Error {
    fn from(err: Located<resolve::Error>) -> Self {
        Error::Resolve(err)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Assembly Error (in {}): ", self.phase())?;
        match self {
            Error::Tokenize(err) => write!(f, "{}", err),
            Error::Parse(err) => write!(f, "{}", err),
            Error::Generate(err) => write!(f, "{}", err),
            Error::Resolve(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {}
