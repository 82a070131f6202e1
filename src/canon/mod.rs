//! Canonical labelling.
//!
//! A `Canonicalizer` maps a graph to a relabelled copy that is identical for
//! all graphs in the same isomorphism class (with respect to the initial
//! ordered partition). The three `CanonMode`s differ only in how the search
//! chooses the cell to individualise, so each gives a different but
//! self-consistent canonical form.

pub mod invariant;
pub mod partition;
mod search;

pub use invariant::{Invariant, InvariantSpec};
pub use partition::Partition;

use crate::errors::CanonError;
use crate::graph::Graph;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default upper bound on graph order.
pub const DEFAULT_MAX_VERTICES: usize = 1024;

/// Result of canonicalising one graph.
#[derive(Debug, Clone)]
pub struct Canonical {
    pub graph: Graph,
    /// `labelling[i]` is the input vertex placed at position `i`.
    pub labelling: Vec<usize>,
}

/// Computes canonical forms.
pub trait Canonicalizer {
    /// Reject invariant choices this canonicalizer can't honour. Called once
    /// per run before any graph is read.
    fn validate(&self, invariant: &InvariantSpec) -> Result<(), CanonError>;

    fn canonicalize(
        &self,
        g: &Graph,
        partition: &Partition,
        invariant: &InvariantSpec,
    ) -> Result<Canonical, CanonError>;
}

/// Search strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonMode {
    /// First non-trivial cell.
    #[default]
    Dense,
    /// Smallest non-trivial cell.
    Sparse,
    /// Largest non-trivial cell. Undirected loop-free graphs only.
    Traces,
}

impl CanonMode {
    /// Whether `kind` can be used in this mode.
    pub fn supports(self, kind: Invariant) -> bool {
        if kind == Invariant::None {
            return true;
        }
        match self {
            CanonMode::Dense => invariant::is_implemented(kind),
            CanonMode::Sparse => matches!(kind, Invariant::Distances | Invariant::Adjacencies),
            CanonMode::Traces => false,
        }
    }
}

impl fmt::Display for CanonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonMode::Dense => write!(f, "dense"),
            CanonMode::Sparse => write!(f, "sparse"),
            CanonMode::Traces => write!(f, "traces"),
        }
    }
}

impl FromStr for CanonMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dense" => Ok(CanonMode::Dense),
            "sparse" => Ok(CanonMode::Sparse),
            "traces" => Ok(CanonMode::Traces),
            other => Err(format!(
                "unknown canonicalizer mode '{}' (expected dense, sparse or traces)",
                other
            )),
        }
    }
}

/// The built-in individualisation-refinement canonicalizer.
#[derive(Debug, Clone)]
pub struct SearchCanonicalizer {
    mode: CanonMode,
    max_vertices: usize,
}

impl SearchCanonicalizer {
    pub fn new(mode: CanonMode) -> Self {
        Self {
            mode,
            max_vertices: DEFAULT_MAX_VERTICES,
        }
    }

    pub fn with_max_vertices(mut self, max_vertices: usize) -> Self {
        self.max_vertices = max_vertices;
        self
    }

    pub fn mode(&self) -> CanonMode {
        self.mode
    }
}

impl Canonicalizer for SearchCanonicalizer {
    fn validate(&self, invariant: &InvariantSpec) -> Result<(), CanonError> {
        if self.mode.supports(invariant.kind) {
            Ok(())
        } else {
            Err(CanonError::UnsupportedInvariant {
                invariant: invariant.kind.to_string(),
                mode: self.mode.to_string(),
            })
        }
    }

    fn canonicalize(
        &self,
        g: &Graph,
        partition: &Partition,
        invariant: &InvariantSpec,
    ) -> Result<Canonical, CanonError> {
        let n = g.order();
        if n > self.max_vertices {
            return Err(CanonError::GraphTooLarge {
                order: n,
                capacity: self.max_vertices,
            });
        }
        if self.mode == CanonMode::Traces {
            if g.is_directed() {
                return Err(CanonError::Unsupported(
                    "traces mode can't handle directed graphs".to_string(),
                ));
            }
            if g.loop_count() > 0 {
                return Err(CanonError::Unsupported(
                    "traces mode can't handle loops".to_string(),
                ));
            }
        }

        let (labelling, graph) =
            search::Search::new(g, invariant, self.mode).run(partition.cells(n));
        Ok(Canonical { graph, labelling })
    }
}
