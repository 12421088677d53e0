use crate::assembler::{self, AssembledLine};
use anyhow::Context;
use log::info;
use std::path::Path;

pub fn assemble_path(path: &Path) -> anyhow::Result<Vec<AssembledLine>> {
    let prog_src = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read '{}'", path.display()))?;
    info!("assembling {} ({} bytes)", path.display(), prog_src.len());

    Ok(assembler::assemble(&prog_src)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file() {
        let err = assemble_path(Path::new("does/not/exist.asm")).unwrap_err();
        assert!(err.to_string().contains("does/not/exist.asm"));
        assert!(err.downcast_ref::<assembler::Error>().is_none());
    }
}
