use crate::assembler::{self, AssembledLine};
use crate::frontend::{
    assemble::assemble_path,
    image,
    listing::{ByteLayout, Listing, ListingFormat},
};
use ansi_term::Color::{Green, Red};
use anyhow::Context;
use log::info;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

#[cfg(windows)]
pub fn terminal_init() {
    if let Err(code) = ansi_term::enable_ansi_support() {
        log::warn!("Could not enable terminal ANSI support (error {})", code);
    }
}

#[cfg(not(windows))]
pub fn terminal_init() {}

#[derive(StructOpt, Debug)]
#[structopt(name = "asm8080", about = "Two-pass assembler for the Intel 8080")]
pub struct CommandAsm {
    #[structopt(name = "in.asm", parse(from_os_str))]
    in_src: PathBuf,

    /// Output path without extension, defaults to the source path.
    #[structopt(short, long, parse(from_os_str))]
    out: Option<PathBuf>,

    /// Also write a CSV listing.
    #[structopt(short, long)]
    csv: bool,

    /// Also write a Markdown listing.
    #[structopt(short, long)]
    md: bool,

    /// Also write a raw binary image.
    #[structopt(short, long)]
    bin: bool,

    /// Also write an Intel HEX image.
    #[structopt(short = "x", long)]
    hex: bool,

    /// Put all machine code bytes of a statement on one listing row.
    #[structopt(short, long)]
    same_line_bytes: bool,

    /// Do not print the listing.
    #[structopt(short, long)]
    quiet: bool,
}

impl CommandAsm {
    fn layout(&self) -> ByteLayout {
        if self.same_line_bytes {
            ByteLayout::SameLine
        } else {
            ByteLayout::PerByte
        }
    }

    fn out_stem(&self) -> PathBuf {
        self.out
            .clone()
            .unwrap_or_else(|| self.in_src.with_extension(""))
    }

    fn listing_formats(&self) -> Vec<ListingFormat> {
        let mut formats = vec![ListingFormat::Text];
        if self.md {
            formats.push(ListingFormat::Markdown);
        }
        if self.csv {
            formats.push(ListingFormat::Csv);
        }
        formats
    }
}

fn write_output(path: &Path, contents: impl AsRef<[u8]>) -> anyhow::Result<()> {
    std::fs::write(path, contents).with_context(|| format!("Could not write '{}'", path.display()))?;
    info!("wrote {}", path.display());
    Ok(())
}

fn write_all(cmd: &CommandAsm, lines: &[AssembledLine]) -> anyhow::Result<()> {
    let stem = cmd.out_stem();
    let listing = Listing::new(lines, cmd.layout());

    if !cmd.quiet {
        print!("{}", listing.render(ListingFormat::Text));
    }

    for format in cmd.listing_formats() {
        write_output(
            &stem.with_extension(format.extension()),
            listing.render(format),
        )?;
    }

    if cmd.bin {
        write_output(&stem.with_extension("bin"), image::binary_image(lines))?;
    }

    if cmd.hex {
        write_output(&stem.with_extension("hex"), image::intel_hex(lines)?)?;
    }

    Ok(())
}

fn report(src: &Path, err: &anyhow::Error) {
    match err.downcast_ref::<assembler::Error>() {
        Some(asm_err) => {
            eprintln!(
                "{} [{}] {}",
                Red.bold().paint("[ERR]"),
                asm_err.phase(),
                src.display()
            );
            match asm_err.line() {
                Some(line) => eprintln!("[Line {}] {}", line, asm_err.message()),
                None => eprintln!("{}", asm_err.message()),
            }
        }
        None => eprintln!("{} {:#}", Red.bold().paint("[ERR]"), err),
    }
}

pub fn asm(cmd: CommandAsm) -> ! {
    let result = assemble_path(&cmd.in_src).and_then(|lines| write_all(&cmd, &lines));

    match result {
        Ok(()) => {
            if !cmd.quiet {
                eprintln!("{} {}", Green.bold().paint("[OK]"), cmd.in_src.display());
            }
            std::process::exit(0)
        }
        Err(err) => {
            report(&cmd.in_src, &err);
            std::process::exit(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags() {
        let cmd = CommandAsm::from_iter(&["asm8080", "prog.asm", "-c", "--md", "-s"]);
        assert_eq!(cmd.layout(), ByteLayout::SameLine);
        assert_eq!(cmd.out_stem(), PathBuf::from("prog"));
        assert_eq!(
            cmd.listing_formats(),
            vec![
                ListingFormat::Text,
                ListingFormat::Markdown,
                ListingFormat::Csv
            ]
        );
        assert!(!cmd.bin && !cmd.hex && !cmd.quiet);
    }

    #[test]
    fn explicit_output_stem() {
        let cmd = CommandAsm::from_iter(&["asm8080", "prog.asm", "-o", "out/listing", "-x"]);
        assert_eq!(cmd.out_stem(), PathBuf::from("out/listing"));
        assert_eq!(cmd.layout(), ByteLayout::PerByte);
        assert!(cmd.hex);
    }
}
