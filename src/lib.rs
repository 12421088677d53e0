pub mod isa;

pub mod assembler;

pub mod cli;
pub mod frontend;
