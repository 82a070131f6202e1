//! Turns input graphs into sort-key lines.

use crate::canon::{Canonicalizer, InvariantSpec, Partition};
use crate::codec::{self, GraphFormat, GraphRecord};
use crate::errors::{FilterError, FilterResult};
use crate::protocol::KeyLine;

/// Canonicalises each record and builds its `KeyLine`.
///
/// Which optional fields a line carries is fixed at construction: the
/// original text when output keeps input labelling, the sequence index when
/// a provenance log is wanted.
pub struct CanonicalEncoder<C> {
    canonicalizer: C,
    partition: Partition,
    invariant: InvariantSpec,
    format: GraphFormat,
    carry_original: bool,
    carry_index: bool,
}

impl<C: Canonicalizer> CanonicalEncoder<C> {
    /// Fails with `UnsupportedInvariant` if `canonicalizer` can't apply
    /// `invariant`, before any graph is seen.
    pub fn new(
        canonicalizer: C,
        partition: Partition,
        invariant: InvariantSpec,
        format: GraphFormat,
    ) -> FilterResult<Self> {
        canonicalizer.validate(&invariant)?;
        Ok(Self {
            canonicalizer,
            partition,
            invariant,
            format,
            carry_original: false,
            carry_index: false,
        })
    }

    pub fn carry_original(mut self, yes: bool) -> Self {
        self.carry_original = yes;
        self
    }

    pub fn carry_index(mut self, yes: bool) -> Self {
        self.carry_index = yes;
        self
    }

    pub fn format(&self) -> GraphFormat {
        self.format
    }

    pub fn encode(&self, record: &GraphRecord) -> FilterResult<KeyLine> {
        let canonical = self
            .canonicalizer
            .canonicalize(&record.graph, &self.partition, &self.invariant)
            .map_err(|source| FilterError::AtGraph {
                index: record.sequence_index,
                source,
            })?;

        let mut line = KeyLine::new(codec::encode(&canonical.graph, self.format));
        if self.carry_original {
            line = line.with_original(record.original_text.clone());
        }
        if self.carry_index {
            line = line.with_index(record.sequence_index);
        }
        Ok(line)
    }
}
