//! Vertex invariants used to split cells that refinement cannot.
//!
//! An invariant maps each vertex to a value that depends only on the graph
//! and the current ordered partition, so isomorphic inputs get the same
//! split. Choosing one only changes how fast the search converges and which
//! labelling is canonical; it never changes which graphs compare equal.

use crate::errors::FilterError;
use crate::graph::Graph;
use std::fmt;

/// The invariants recognised on the command line, numbered as `-i#`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Invariant {
    #[default]
    None,
    Twopaths,
    Adjtriang,
    Triples,
    Quadruples,
    Celltrips,
    Cellquads,
    Cellquins,
    Distances,
    Indsets,
    Cliques,
    Cellcliq,
    Cellind,
    Adjacencies,
    Cellfano,
    Cellfano2,
    Refinvar,
}

const ALL: [Invariant; 17] = [
    Invariant::None,
    Invariant::Twopaths,
    Invariant::Adjtriang,
    Invariant::Triples,
    Invariant::Quadruples,
    Invariant::Celltrips,
    Invariant::Cellquads,
    Invariant::Cellquins,
    Invariant::Distances,
    Invariant::Indsets,
    Invariant::Cliques,
    Invariant::Cellcliq,
    Invariant::Cellind,
    Invariant::Adjacencies,
    Invariant::Cellfano,
    Invariant::Cellfano2,
    Invariant::Refinvar,
];

impl Invariant {
    pub fn from_index(index: u32) -> Result<Self, FilterError> {
        ALL.get(index as usize)
            .copied()
            .ok_or_else(|| FilterError::config("-i value must be 0..16"))
    }

    pub fn name(self) -> &'static str {
        match self {
            Invariant::None => "none",
            Invariant::Twopaths => "twopaths",
            Invariant::Adjtriang => "adjtriang",
            Invariant::Triples => "triples",
            Invariant::Quadruples => "quadruples",
            Invariant::Celltrips => "celltrips",
            Invariant::Cellquads => "cellquads",
            Invariant::Cellquins => "cellquins",
            Invariant::Distances => "distances",
            Invariant::Indsets => "indsets",
            Invariant::Cliques => "cliques",
            Invariant::Cellcliq => "cellcliq",
            Invariant::Cellind => "cellind",
            Invariant::Adjacencies => "adjacencies",
            Invariant::Cellfano => "cellfano",
            Invariant::Cellfano2 => "cellfano2",
            Invariant::Refinvar => "refinvar",
        }
    }
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which invariant to apply, at which search levels, with which argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvariantSpec {
    pub kind: Invariant,
    /// First search level (the root is level 1) at which the invariant runs.
    pub min_level: usize,
    pub max_level: usize,
    /// Strength argument; its meaning depends on the invariant.
    pub arg: i32,
}

impl Default for InvariantSpec {
    fn default() -> Self {
        Self {
            kind: Invariant::None,
            min_level: 1,
            max_level: 1,
            arg: 3,
        }
    }
}

impl InvariantSpec {
    pub fn new(kind: Invariant) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn with_levels(mut self, min_level: usize, max_level: usize) -> Self {
        self.min_level = min_level;
        self.max_level = max_level;
        self
    }

    pub fn with_arg(mut self, arg: i32) -> Self {
        self.arg = arg;
        self
    }

    pub fn is_none(&self) -> bool {
        self.kind == Invariant::None
    }

    pub fn applies_at(&self, level: usize) -> bool {
        !self.is_none() && self.min_level <= level && level <= self.max_level
    }
}

impl fmt::Display for InvariantSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}:{},{}]",
            self.kind, self.min_level, self.max_level, self.arg
        )
    }
}

fn fuzz(x: u64) -> u64 {
    let x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    let x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

fn common_neighbours(g: &Graph, vertices: &[usize]) -> u64 {
    let m = g.row_words();
    (0..m)
        .map(|w| {
            vertices
                .iter()
                .fold(u64::MAX, |acc, &v| acc & g.row(v)[w])
                .count_ones() as u64
        })
        .sum()
}

/// Order-independent code for a set of cells.
fn cell_code(cell_of: &[usize], vertices: &[usize]) -> u64 {
    vertices
        .iter()
        .map(|&v| fuzz(cell_of[v] as u64))
        .fold(0u64, u64::wrapping_add)
}

/// Compute `kind` for every vertex. Returns `None` for invariants this
/// module does not implement.
pub(crate) fn compute(g: &Graph, cell_of: &[usize], spec: &InvariantSpec) -> Option<Vec<u64>> {
    let values = match spec.kind {
        Invariant::None => return None,
        Invariant::Twopaths => twopaths(g, cell_of),
        Invariant::Adjtriang => adjtriang(g, cell_of, spec.arg),
        Invariant::Triples => triples(g, cell_of),
        Invariant::Distances => distances(g, cell_of, spec.arg),
        Invariant::Indsets => subsets(g, cell_of, spec.arg, false),
        Invariant::Cliques => subsets(g, cell_of, spec.arg, true),
        Invariant::Adjacencies => adjacencies(g, cell_of),
        _ => return None,
    };
    Some(values)
}

pub(crate) fn is_implemented(kind: Invariant) -> bool {
    matches!(
        kind,
        Invariant::None
            | Invariant::Twopaths
            | Invariant::Adjtriang
            | Invariant::Triples
            | Invariant::Distances
            | Invariant::Indsets
            | Invariant::Cliques
            | Invariant::Adjacencies
    )
}

/// Cells reachable by paths of length two.
fn twopaths(g: &Graph, cell_of: &[usize]) -> Vec<u64> {
    let n = g.order();
    (0..n)
        .map(|v| {
            let mut reach = vec![false; n];
            for u in g.neighbours(v) {
                for w in g.neighbours(u) {
                    reach[w] = true;
                }
            }
            reach
                .iter()
                .enumerate()
                .filter(|(_, r)| **r)
                .map(|(w, _)| fuzz(cell_of[w] as u64))
                .fold(0u64, u64::wrapping_add)
        })
        .collect()
}

/// Common-neighbour counts over pairs: adjacent pairs when `arg == 0`,
/// non-adjacent pairs when `arg == 1`, all pairs otherwise.
fn adjtriang(g: &Graph, cell_of: &[usize], arg: i32) -> Vec<u64> {
    let n = g.order();
    let mut values = vec![0u64; n];
    for v in 0..n {
        for w in (v + 1)..n {
            let adjacent = g.has_edge(v, w);
            let wanted = match arg {
                0 => adjacent,
                1 => !adjacent,
                _ => true,
            };
            if !wanted {
                continue;
            }
            let count = common_neighbours(g, &[v, w]);
            let code = fuzz(count ^ cell_code(cell_of, &[v, w]) ^ (adjacent as u64) << 40);
            values[v] = values[v].wrapping_add(code);
            values[w] = values[w].wrapping_add(code);
        }
    }
    values
}

fn triples(g: &Graph, cell_of: &[usize]) -> Vec<u64> {
    let n = g.order();
    let mut values = vec![0u64; n];
    for v in 0..n {
        for w in (v + 1)..n {
            for x in (w + 1)..n {
                let count = common_neighbours(g, &[v, w, x]);
                let code = fuzz(count.wrapping_add(cell_code(cell_of, &[v, w, x])));
                for &u in &[v, w, x] {
                    values[u] = values[u].wrapping_add(code);
                }
            }
        }
    }
    values
}

/// Cells met at each distance up to `arg` (all distances when `arg <= 0`).
fn distances(g: &Graph, cell_of: &[usize], arg: i32) -> Vec<u64> {
    let n = g.order();
    let limit = if arg <= 0 { n } else { arg as usize };
    (0..n)
        .map(|v| {
            let mut seen = vec![false; n];
            seen[v] = true;
            let mut frontier = vec![v];
            let mut value = 0u64;
            for d in 1..=limit {
                let mut next = Vec::new();
                for &u in &frontier {
                    for w in g.neighbours(u) {
                        if !seen[w] {
                            seen[w] = true;
                            next.push(w);
                        }
                    }
                }
                if next.is_empty() {
                    break;
                }
                value = value.wrapping_add(fuzz(cell_code(cell_of, &next) ^ fuzz(d as u64)));
                frontier = next;
            }
            value
        })
        .collect()
}

/// Cliques (or independent sets) of size `arg`, clamped to 3..=7, through
/// each vertex.
fn subsets(g: &Graph, cell_of: &[usize], arg: i32, cliques: bool) -> Vec<u64> {
    let n = g.order();
    let size = arg.clamp(3, 7) as usize;
    let mut values = vec![0u64; n];
    let linked = |a: usize, b: usize| {
        let edge = g.has_edge(a, b) || g.has_edge(b, a);
        if cliques { edge } else { !edge }
    };
    let mut chosen = Vec::with_capacity(size);
    fn extend(
        start: usize,
        n: usize,
        size: usize,
        chosen: &mut Vec<usize>,
        linked: &dyn Fn(usize, usize) -> bool,
        cell_of: &[usize],
        values: &mut [u64],
    ) {
        if chosen.len() == size {
            let code = fuzz(cell_code(cell_of, chosen));
            for &u in chosen.iter() {
                values[u] = values[u].wrapping_add(code);
            }
            return;
        }
        for v in start..n {
            if chosen.iter().all(|&u| linked(u, v)) {
                chosen.push(v);
                extend(v + 1, n, size, chosen, linked, cell_of, values);
                chosen.pop();
            }
        }
    }
    extend(0, n, size, &mut chosen, &linked, cell_of, &mut values);
    values
}

/// Cells of out-neighbours and of in-neighbours, kept apart.
fn adjacencies(g: &Graph, cell_of: &[usize]) -> Vec<u64> {
    let n = g.order();
    let mut values = vec![0u64; n];
    for v in 0..n {
        for w in g.neighbours(v) {
            values[v] = values[v].wrapping_add(fuzz(cell_of[w] as u64));
            values[w] = values[w].wrapping_add(fuzz((cell_of[v] as u64) | 1 << 48));
        }
    }
    values
}
