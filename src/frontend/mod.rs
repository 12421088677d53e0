pub mod assemble;
pub mod image;
pub mod listing;
