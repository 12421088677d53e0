use crate::assembler::AssembledLine;
use crate::isa::hw::{self, Byte, Word};
use itertools::Itertools;
use std::convert::TryFrom;
use std::fmt::Display;

pub const HEX_EOF_RECORD: &str = ":00000001FF";
const HEX_DATA_RECORD: Byte = 0x00;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ImageError {
    RecordTooLong { address: Word, len: usize },
}

impl Display for ImageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageError::RecordTooLong { address, len } => write!(
                f,
                "The {} bytes at {:04X}H do not fit in a single Intel HEX record (at most 255)",
                len, address
            ),
        }
    }
}

impl std::error::Error for ImageError {}

/// The lines which occupy memory, lowest address first.
fn placed(lines: &[AssembledLine]) -> Vec<(Word, &[Byte])> {
    let mut placed: Vec<_> = lines
        .iter()
        .filter_map(|line| line.address.map(|addr| (addr, line.bytes.as_slice())))
        .filter(|(_, bytes)| !bytes.is_empty())
        .collect();
    placed.sort_by_key(|(addr, _)| *addr);
    placed
}

/// A flat memory image starting at the lowest assembled address. Gaps are
/// zero-filled and later lines win where two overlap.
pub fn binary_image(lines: &[AssembledLine]) -> Vec<Byte> {
    let placed = placed(lines);
    let base = match placed.first() {
        Some((addr, _)) => usize::from(*addr),
        None => return Vec::new(),
    };
    let end = placed
        .iter()
        .map(|(addr, bytes)| usize::from(*addr) + bytes.len())
        .max()
        .unwrap_or(base);

    let mut image = vec![0; end - base];
    for (addr, bytes) in placed {
        let start = usize::from(addr) - base;
        image[start..start + bytes.len()].copy_from_slice(bytes);
    }
    image
}

fn hex_record(address: Word, bytes: &[Byte]) -> Result<String, ImageError> {
    let len = Byte::try_from(bytes.len()).map_err(|_| ImageError::RecordTooLong {
        address,
        len: bytes.len(),
    })?;

    let checksum = bytes.iter().fold(
        len.wrapping_add(hw::hi(address))
            .wrapping_add(hw::lo(address))
            .wrapping_add(HEX_DATA_RECORD),
        |acc, b| acc.wrapping_add(*b),
    );

    Ok(format!(
        ":{:02X}{:04X}{:02X}{}{:02X}",
        len,
        address,
        HEX_DATA_RECORD,
        bytes.iter().map(|b| format!("{:02X}", b)).join(""),
        checksum.wrapping_neg()
    ))
}

/// One data record per assembled line, in address order, followed by the
/// end-of-file record.
pub fn intel_hex(lines: &[AssembledLine]) -> Result<String, ImageError> {
    let mut out = String::new();
    for (addr, bytes) in placed(lines) {
        out.push_str(&hex_record(addr, bytes)?);
        out.push('\n');
    }
    out.push_str(HEX_EOF_RECORD);
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler;

    fn verify_checksum(record: &str) {
        let bytes: Vec<u8> = (1..record.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&record[i..i + 2], 16).unwrap())
            .collect();
        let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        assert_eq!(sum, 0, "checksum mismatch for {}", record);
    }

    #[test]
    fn hex_records() {
        let lines = assembler::assemble("ORG 100H\nMVI A,1\nHLT\n").unwrap();
        let hex = intel_hex(&lines).unwrap();
        let records: Vec<_> = hex.lines().collect();

        assert_eq!(records, vec![":020100003E01BE", ":010102007686", HEX_EOF_RECORD]);
        for record in records {
            verify_checksum(record);
        }
    }

    #[test]
    fn hex_rejects_long_records() {
        let text = "A".repeat(256);
        let lines = assembler::assemble(&format!("DB '{}'\n", text)).unwrap();
        assert_eq!(
            intel_hex(&lines),
            Err(ImageError::RecordTooLong {
                address: 0,
                len: 256
            })
        );
    }

    #[test]
    fn binary_fills_gaps() {
        let lines = assembler::assemble("ORG 10H\nNOP\nORG 13H\nHLT\n").unwrap();
        assert_eq!(binary_image(&lines), vec![0x00, 0x00, 0x00, 0x76]);
    }

    #[test]
    fn binary_orders_by_address() {
        let lines = assembler::assemble("ORG 2\nHLT\nORG 0\nMVI B,7\n").unwrap();
        assert_eq!(binary_image(&lines), vec![0x06, 0x07, 0x76]);
    }

    #[test]
    fn empty_program() {
        let lines = assembler::assemble("; nothing\n").unwrap();
        assert_eq!(binary_image(&lines), Vec::<u8>::new());
        assert_eq!(intel_hex(&lines).unwrap(), format!("{}\n", HEX_EOF_RECORD));
    }
}
