pub mod types;

pub mod generate;
pub mod parse;
pub mod resolve;
pub mod tokenize;

pub use generate::encode;
pub use parse::{parse, Parser};
pub use resolve::validate;
pub use tokenize::{tokenize, Tokenizer};
