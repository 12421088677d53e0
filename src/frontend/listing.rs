use crate::assembler::AssembledLine;
use crate::isa::hw::Word;
use itertools::Itertools;
use std::cmp::max;

const MIN_ADDRESS_WIDTH: usize = 4;
const MIN_MACHINE_CODE_WIDTH: usize = 2;
const MIN_LABEL_WIDTH: usize = 5;
const MIN_COMMENT_WIDTH: usize = 7;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ListingFormat {
    Text,
    Markdown,
    Csv,
}

impl ListingFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ListingFormat::Text => "txt",
            ListingFormat::Markdown => "md",
            ListingFormat::Csv => "csv",
        }
    }
}

/// Whether each machine code byte of a statement gets its own listing row.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ByteLayout {
    PerByte,
    SameLine,
}

impl Default for ByteLayout {
    fn default() -> Self {
        ByteLayout::PerByte
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Row {
    pub address: String,
    pub machine_code: String,
    pub label: String,
    pub asm: String,
    pub comment: String,
}

impl Row {
    fn csv(&self) -> String {
        let suffixed = |s: &str| {
            if s.is_empty() {
                String::new()
            } else {
                format!("{}h", s)
            }
        };
        format!(
            "{};{};{};{};{};",
            suffixed(&self.address),
            suffixed(&self.machine_code),
            self.label,
            self.asm,
            self.comment
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct Widths {
    address: usize,
    machine_code: usize,
    label: usize,
    asm: usize,
    comment: usize,
}

impl Widths {
    fn of(rows: &[Row]) -> Self {
        let widest = |f: fn(&Row) -> usize| rows.iter().map(f).max().unwrap_or(0);
        Widths {
            address: MIN_ADDRESS_WIDTH,
            machine_code: max(MIN_MACHINE_CODE_WIDTH, widest(|r| r.machine_code.len())),
            label: max(MIN_LABEL_WIDTH, widest(|r| r.label.len())),
            asm: widest(|r| r.asm.len()),
            comment: max(MIN_COMMENT_WIDTH, widest(|r| r.comment.len())),
        }
    }
}

/// A printable table of an assembled program: address, machine code,
/// label, instruction and comment.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Listing {
    rows: Vec<Row>,
}

impl Listing {
    pub fn new(lines: &[AssembledLine], layout: ByteLayout) -> Self {
        let mut rows = Vec::new();

        for line in lines {
            let stmt = &line.statement;
            let address = line.address.map(|a| format!("{:04X}", a)).unwrap_or_default();
            let machine_code = match layout {
                ByteLayout::PerByte => line
                    .bytes
                    .first()
                    .map(|b| format!("{:02X}", b))
                    .unwrap_or_default(),
                ByteLayout::SameLine => line.bytes.iter().map(|b| format!("{:02X}", b)).join(""),
            };

            rows.push(Row {
                address,
                machine_code,
                label: stmt.label_text(),
                asm: stmt.asm_text(),
                comment: stmt.comment.clone().unwrap_or_default(),
            });

            if layout == ByteLayout::PerByte {
                if let Some(base) = line.address {
                    for (i, b) in line.bytes.iter().enumerate().skip(1) {
                        rows.push(Row {
                            address: format!("{:04X}", base.wrapping_add(i as Word)),
                            machine_code: format!("{:02X}", b),
                            ..Row::default()
                        });
                    }
                }
            }
        }

        Listing { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn render(&self, format: ListingFormat) -> String {
        let w = Widths::of(&self.rows);
        let mut out = String::new();
        let mut push = |line: String| {
            out.push_str(line.trim_end());
            out.push('\n');
        };

        match format {
            ListingFormat::Text => {
                push(format!(
                    "{:>aw$} | {:>mw$} | {:<lw$} | {:<sw$} ; COMMENT",
                    "ADR",
                    "MC",
                    "LABEL",
                    "ASM",
                    aw = w.address,
                    mw = w.machine_code,
                    lw = w.label,
                    sw = w.asm,
                ));
                for r in &self.rows {
                    push(format!(
                        "{:>aw$} | {:>mw$} | {:<lw$} | {:<sw$} ; {}",
                        r.address,
                        r.machine_code,
                        r.label,
                        r.asm,
                        r.comment,
                        aw = w.address,
                        mw = w.machine_code,
                        lw = w.label,
                        sw = w.asm,
                    ));
                }
            }
            ListingFormat::Markdown => {
                let row = |cells: [&str; 5]| {
                    format!(
                        "| {:>aw$} | {:>mw$} | {:<lw$} | {:<sw$} | {:<cw$} |",
                        cells[0],
                        cells[1],
                        cells[2],
                        cells[3],
                        cells[4],
                        aw = w.address,
                        mw = w.machine_code,
                        lw = w.label,
                        sw = w.asm,
                        cw = w.comment,
                    )
                };
                push(row(["ADR", "MC", "LABEL", "ASM", "COMMENT"]));
                push(format!(
                    "|{}|",
                    [w.address, w.machine_code, w.label, w.asm, w.comment]
                        .iter()
                        .map(|n| "-".repeat(n + 2))
                        .join("|")
                ));
                for r in &self.rows {
                    push(row([
                        r.address.as_str(),
                        r.machine_code.as_str(),
                        r.label.as_str(),
                        r.asm.as_str(),
                        r.comment.as_str(),
                    ]));
                }
            }
            ListingFormat::Csv => {
                for r in &self.rows {
                    push(r.csv());
                }
            }
        }

        out
    }
}
