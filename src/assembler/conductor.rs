use super::eval::EvalContext;
use super::model::{AssembledLine, Operand, Statement};
use super::phases::{
    generate::{self, Encoding},
    parse::Parser,
    resolve::{self, Error},
    types::{self, Located},
};
use super::symbols::SymbolTable;
use crate::isa::{
    hw::Word,
    inst::{Directive, Keyword, Mnemonic},
};
use derive_more::Display;
use log::debug;
use std::convert::TryFrom;

/*
    Assembly makes two passes over the statements.

    Pass 1 pulls statements from the parser one at a time. Labels are bound to
    the current address as they are met, directives are applied immediately,
    and every instruction is encoded at the current address, which then moves
    past its bytes. An instruction with an operand naming a symbol which is
    not yet defined is encoded with placeholder values (which never changes its
    length) and remembered.

    Once the source is exhausted (or `END` is met) every symbol must have a
    value. Pass 2 then encodes the remembered instructions again, in place and
    at the addresses chosen during pass 1.
*/

#[derive(Debug, Display, PartialEq, Eq, Clone, Copy)]
pub enum Pass {
    #[display(fmt = "pass 1 (collecting)")]
    CollectingPass1,
    #[display(fmt = "label validation")]
    ValidatingLabels,
    #[display(fmt = "pass 2 (reassembling)")]
    ReassemblingPass2,
    #[display(fmt = "done")]
    Done,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum Flow {
    Continue,
    Stop,
}

/// Drives the parser over a source text and lays the statements out in
/// memory. Each instance owns its own symbol table.
pub struct Assembler {
    symbols: SymbolTable,
    lines: Vec<AssembledLine>,
    queue: Vec<usize>,
    address: Word,
    pass: Pass,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

fn at(stmt: &Statement, err: Error) -> types::Error {
    Located::with_loc(stmt.loc, err).into()
}

fn single_operand(stmt: &Statement, directive: Directive) -> Result<&Operand, types::Error> {
    match stmt.operands.as_slice() {
        [op] => Ok(op),
        ops => Err(at(
            stmt,
            Error::DirectiveArgCount {
                directive,
                given: ops.len(),
            },
        )),
    }
}

impl Assembler {
    pub fn new() -> Self {
        Assembler {
            symbols: SymbolTable::new(),
            lines: Vec::new(),
            queue: Vec::new(),
            address: 0,
            pass: Pass::CollectingPass1,
        }
    }

    pub fn pass(&self) -> Pass {
        self.pass
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    fn enter(&mut self, pass: Pass) {
        debug!("{} -> {}", self.pass, pass);
        self.pass = pass;
    }

    pub fn run(mut self, source: &str) -> Result<Vec<AssembledLine>, types::Error> {
        self.collect(source)?;

        self.enter(Pass::ValidatingLabels);
        resolve::validate(&self.symbols)?;

        self.enter(Pass::ReassemblingPass2);
        self.reassemble()?;

        self.enter(Pass::Done);
        Ok(self.lines)
    }

    fn collect(&mut self, source: &str) -> Result<(), types::Error> {
        let mut parser = Parser::new(source);

        while let Some(stmt) = parser.next_statement(&mut self.symbols)? {
            match stmt.keyword {
                Some(Keyword::Directive(directive)) => {
                    if self.directive(directive, stmt)? == Flow::Stop {
                        break;
                    }
                }
                Some(Keyword::Mnemonic(mnemonic)) => self.instruction(mnemonic, stmt)?,
                None => {
                    self.bind_label(&stmt)?;
                    self.push(None, Vec::new(), stmt);
                }
            }
        }

        Ok(())
    }

    fn push(&mut self, address: Option<Word>, bytes: Vec<u8>, statement: Statement) -> usize {
        self.lines.push(AssembledLine {
            address,
            bytes,
            statement,
        });
        self.lines.len() - 1
    }

    fn bind_label(&mut self, stmt: &Statement) -> Result<(), types::Error> {
        if let Some(label) = &stmt.label {
            resolve::bind_address(&mut self.symbols, label, self.address)
                .map_err(|err| at(stmt, err))?;
            debug!("{} = {:04X}", label.name, self.address);
        }
        Ok(())
    }

    /// Evaluates the operand of a layout directive, which cannot wait for
    /// pass 2.
    fn eager_value(
        &self,
        stmt: &Statement,
        directive: Directive,
        op: &Operand,
    ) -> Result<Word, types::Error> {
        let ctx = EvalContext::new(&self.symbols, self.address);
        if op.is_deferred(&ctx) {
            return Err(at(stmt, Error::ForwardReference(directive.into())));
        }
        op.to_raw(&ctx)
            .map_err(|err| Located::with_loc(stmt.loc, err).into())
    }

    fn directive(&mut self, directive: Directive, stmt: Statement) -> Result<Flow, types::Error> {
        let flow = match directive {
            Directive::ORG => {
                self.bind_label(&stmt)?;
                let op = single_operand(&stmt, directive)?;
                self.address = self.eager_value(&stmt, directive, op)?;
                debug!("origin moved to {:04X}", self.address);
                Flow::Continue
            }
            Directive::EQU | Directive::SET => {
                let op = single_operand(&stmt, directive)?;
                let value = self.eager_value(&stmt, directive, op)?;
                resolve::bind_constant(&mut self.symbols, stmt.label.as_ref(), directive, value)
                    .map_err(|err| at(&stmt, err))?;
                debug!("{} {} {:04X}", stmt.label_text(), directive, value);
                Flow::Continue
            }
            Directive::END => {
                self.bind_label(&stmt)?;
                Flow::Stop
            }
        };

        self.push(None, Vec::new(), stmt);
        Ok(flow)
    }

    fn encode(
        &self,
        mnemonic: Mnemonic,
        stmt: &Statement,
        address: Word,
    ) -> Result<Encoding, types::Error> {
        let ctx = EvalContext::new(&self.symbols, address);
        generate::encode(mnemonic, &stmt.operands, &ctx)
            .map_err(|err| Located::with_loc(stmt.loc, err).into())
    }

    fn instruction(&mut self, mnemonic: Mnemonic, stmt: Statement) -> Result<(), types::Error> {
        self.bind_label(&stmt)?;

        let deferred = {
            let ctx = EvalContext::new(&self.symbols, self.address);
            stmt.operands.iter().any(|op| op.is_deferred(&ctx))
        };
        if deferred && mnemonic == Mnemonic::DS {
            return Err(at(&stmt, Error::ForwardReference(mnemonic.into())));
        }

        let bytes = self.encode(mnemonic, &stmt, self.address)?.into_bytes();
        let address = self.address;
        let len = Word::try_from(bytes.len()).unwrap_or(Word::MAX);
        self.address = self.address.wrapping_add(len);

        let idx = self.push(Some(address), bytes, stmt);
        if deferred && self.pass == Pass::CollectingPass1 {
            self.queue.push(idx);
        }
        Ok(())
    }

    fn reassemble(&mut self) -> Result<(), types::Error> {
        for idx in std::mem::take(&mut self.queue) {
            let line = &self.lines[idx];
            if let (Some(mnemonic), Some(address)) = (line.statement.mnemonic(), line.address) {
                let bytes = self.encode(mnemonic, &line.statement, address)?.into_bytes();
                self.lines[idx].bytes = bytes;
            }
        }
        Ok(())
    }
}
