//! Run-length classification of the sorted key stream.

use super::policy::OutputPolicy;
use super::provenance::ProvenanceLog;
use crate::errors::{FilterError, FilterResult};
use crate::protocol::KeyLine;
use std::io::{self, Write};

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassStats {
    /// Key lines consumed; equals the sum of all class sizes.
    pub lines: u64,
    pub classes: u64,
    /// Classes of size 2 or more.
    pub non_trivial: u64,
    /// Graphs written, or that would have been written with output suppressed.
    pub written: u64,
}

struct OpenClass {
    /// First member, withheld until the class size is known to be > 1 or the
    /// class closes.
    first: KeyLine,
    size: u64,
}

enum ClassState {
    AwaitingFirst,
    InClass(OpenClass),
    Done,
}

/// Consumes key lines in sort order and writes graphs according to an
/// `OutputPolicy`.
///
/// Consecutive lines with equal canonical form make up one isomorphism
/// class. Only the open class is held in memory.
pub struct Classifier<W, L = io::Sink> {
    policy: OutputPolicy,
    out: W,
    log: Option<ProvenanceLog<L>>,
    state: ClassState,
    stats: ClassStats,
}

impl<W: Write> Classifier<W> {
    pub fn new(policy: OutputPolicy, out: W) -> Self {
        Self {
            policy,
            out,
            log: None,
            state: ClassState::AwaitingFirst,
            stats: ClassStats::default(),
        }
    }
}

impl<W: Write, L: Write> Classifier<W, L> {
    /// Send provenance blocks to `log`. Only used if the policy asks for
    /// provenance.
    pub fn with_log<M: Write>(self, log: M) -> Classifier<W, M> {
        Classifier {
            policy: self.policy,
            out: self.out,
            log: Some(ProvenanceLog::new(log)),
            state: self.state,
            stats: self.stats,
        }
    }

    pub fn stats(&self) -> ClassStats {
        self.stats
    }

    pub fn push(&mut self, line: KeyLine) -> FilterResult<()> {
        self.stats.lines += 1;
        let state = std::mem::replace(&mut self.state, ClassState::AwaitingFirst);
        self.state = match state {
            ClassState::Done => {
                self.state = ClassState::Done;
                return Err(FilterError::Protocol(
                    "key line received after the stream was finished".to_string(),
                ));
            }
            ClassState::AwaitingFirst => ClassState::InClass(self.open(line)?),
            ClassState::InClass(mut class) => {
                if class.first.canonical_form == line.canonical_form {
                    self.extend(&mut class, line)?;
                    ClassState::InClass(class)
                } else {
                    self.close(class)?;
                    ClassState::InClass(self.open(line)?)
                }
            }
        };
        Ok(())
    }

    /// Close the last class and flush. Further calls are no-ops.
    pub fn finish(&mut self) -> FilterResult<ClassStats> {
        if let ClassState::InClass(class) = std::mem::replace(&mut self.state, ClassState::Done) {
            self.close(class)?;
        }
        self.out
            .flush()
            .map_err(|e| FilterError::io("can't write output", e))?;
        if let Some(log) = self.log.as_mut() {
            log.flush().map_err(log_error)?;
            tracing::debug!(blocks = log.blocks(), "provenance log complete");
        }
        Ok(self.stats)
    }

    pub fn into_parts(self) -> (W, Option<L>) {
        (self.out, self.log.map(ProvenanceLog::into_inner))
    }

    /// The provenance log, if the policy wants one and one was attached.
    fn active_log(&mut self) -> Option<&mut ProvenanceLog<L>> {
        let enabled = self.policy.log_provenance;
        self.log.as_mut().filter(|_| enabled)
    }

    fn open(&mut self, line: KeyLine) -> FilterResult<OpenClass> {
        if self.policy.log_provenance {
            sequence_index(&line)?;
        }
        Ok(OpenClass {
            first: line,
            size: 1,
        })
    }

    fn extend(&mut self, class: &mut OpenClass, line: KeyLine) -> FilterResult<()> {
        class.size += 1;
        let member = if self.policy.log_provenance {
            Some(sequence_index(&line)?)
        } else {
            None
        };
        if class.size > 2 {
            if self.policy.emit_all_members {
                self.emit(&line)?;
            }
            if let (Some(member), Some(log)) = (member, self.active_log()) {
                log.push_member(member).map_err(log_error)?;
            }
            return Ok(());
        }

        self.stats.non_trivial += 1;
        let first_written = self.emit(&class.first)?;
        if self.policy.emit_all_members {
            self.emit(&line)?;
        }
        let Some(member) = member else {
            return Ok(());
        };
        let first = sequence_index(&class.first)?;
        // With only non-trivial classes written the block is labelled after
        // both members are out and its first line holds one extra member.
        let duplicates_only = self.policy.only_non_trivial;
        let written = self.stats.written;
        if let Some(log) = self.active_log() {
            if duplicates_only {
                log.open_block(written, &[first, member]).map_err(log_error)?;
            } else {
                log.open_block(first_written, &[first]).map_err(log_error)?;
                log.push_member(member).map_err(log_error)?;
            }
        }
        Ok(())
    }

    fn close(&mut self, class: OpenClass) -> FilterResult<()> {
        self.stats.classes += 1;
        if class.size == 1 {
            if !self.policy.only_non_trivial {
                self.emit(&class.first)?;
            }
            return Ok(());
        }
        if let Some(log) = self.active_log() {
            log.close_block().map_err(log_error)?;
        }
        Ok(())
    }

    /// Write one member and return its 1-based output index.
    fn emit(&mut self, line: &KeyLine) -> FilterResult<u64> {
        self.stats.written += 1;
        if !self.policy.suppress_output {
            let text = if self.policy.use_original_labelling {
                line.original_text.as_deref().ok_or_else(|| {
                    FilterError::Protocol(format!(
                        "no original text for key {}",
                        line.canonical_form
                    ))
                })?
            } else {
                line.canonical_form.as_str()
            };
            writeln!(self.out, "{}", text).map_err(|e| FilterError::io("can't write output", e))?;
        }
        Ok(self.stats.written)
    }
}

fn log_error(e: io::Error) -> FilterError {
    FilterError::io("can't write provenance log", e)
}

fn sequence_index(line: &KeyLine) -> FilterResult<u64> {
    line.sequence_index.ok_or_else(|| {
        FilterError::Protocol(format!(
            "no sequence index for key {}",
            line.canonical_form
        ))
    })
}
