//! Provenance log: which input graphs collapsed into which output graph.
//!
//! One block per non-trivial class:
//!
//! ```text
//!   4 :   2   7  11
//! ```
//!
//! The label is an output index and the members are input sequence indices.
//! Blocks are written as the class streams past, so a class of any size
//! costs nothing to log. The header counts as one slot however many members
//! it carries; after it fifteen members fit per line, and continuation lines
//! are indented under the first member.

use std::io::{self, Write};

pub const MEMBERS_PER_LINE: usize = 15;

const CONTINUATION: &str = "\n     ";

/// Destination for provenance blocks.
pub struct ProvenanceLog<L> {
    out: L,
    blocks: u64,
    /// Slots used on the current line of the open block.
    line: usize,
}

impl<L: Write> ProvenanceLog<L> {
    pub fn new(out: L) -> Self {
        Self {
            out,
            blocks: 0,
            line: 0,
        }
    }

    /// Start a block with its label and the members already known.
    pub fn open_block(&mut self, label: u64, members: &[u64]) -> io::Result<()> {
        write!(self.out, "{:3} :", label)?;
        for member in members {
            write!(self.out, " {:3}", member)?;
        }
        self.line = 1;
        Ok(())
    }

    pub fn push_member(&mut self, member: u64) -> io::Result<()> {
        if self.line == MEMBERS_PER_LINE {
            self.out.write_all(CONTINUATION.as_bytes())?;
            self.line = 0;
        }
        write!(self.out, " {:3}", member)?;
        self.line += 1;
        Ok(())
    }

    pub fn close_block(&mut self) -> io::Result<()> {
        self.out.write_all(b"\n")?;
        self.blocks += 1;
        Ok(())
    }

    pub fn blocks(&self) -> u64 {
        self.blocks
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> L {
        self.out
    }
}
