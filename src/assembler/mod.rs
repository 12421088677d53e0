pub mod conductor;
pub mod eval;
pub mod lang;
pub mod model;
pub mod numeric;
pub mod phases;
pub mod symbols;

pub use model::AssembledLine;
pub use phases::types::Error;

use crate::isa::hw::Byte;

/// Assembles a whole program, returning one record per source statement.
pub fn assemble(source: &str) -> Result<Vec<AssembledLine>, Error> {
    conductor::Assembler::new().run(source)
}

/// Assembles a program into a flat memory image, starting at its lowest
/// address.
pub fn assemble_bytes(source: &str) -> Result<Vec<Byte>, Error> {
    Ok(crate::frontend::image::binary_image(&assemble(source)?))
}
