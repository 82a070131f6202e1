//! Dense adjacency-matrix graphs.
//!
//! Each vertex owns a row of `u64` set words. Bit `63 - (j % 64)` of word
//! `j / 64` in row `i` is set when there is an arc `i -> j`, so comparing two
//! rows word by word compares the lower-numbered neighbours first.

/// Number of set words needed to hold `n` vertices.
pub fn words_needed(n: usize) -> usize {
    n.div_ceil(64)
}

#[inline]
fn bit(j: usize) -> u64 {
    1u64 << (63 - (j % 64))
}

/// A simple graph or digraph on vertices `0..n`, loops allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    n: usize,
    m: usize,
    directed: bool,
    rows: Vec<u64>,
}

impl Graph {
    /// An undirected graph with `n` vertices and no edges.
    pub fn new(n: usize) -> Self {
        let m = words_needed(n);
        Self {
            n,
            m,
            directed: false,
            rows: vec![0; n * m],
        }
    }

    /// A directed graph with `n` vertices and no arcs.
    pub fn new_directed(n: usize) -> Self {
        Self {
            directed: true,
            ..Self::new(n)
        }
    }

    pub fn order(&self) -> usize {
        self.n
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Words per row.
    pub fn row_words(&self) -> usize {
        self.m
    }

    pub fn row(&self, v: usize) -> &[u64] {
        &self.rows[v * self.m..(v + 1) * self.m]
    }

    /// All rows concatenated; two graphs of equal order compare by this slice.
    pub fn words(&self) -> &[u64] {
        &self.rows
    }

    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        self.rows[u * self.m + v / 64] & bit(v) != 0
    }

    /// Add the arc `u -> v`, and `v -> u` as well if the graph is undirected.
    pub fn add_edge(&mut self, u: usize, v: usize) {
        self.add_arc(u, v);
        if !self.directed {
            self.add_arc(v, u);
        }
    }

    /// Add only the arc `u -> v`.
    pub fn add_arc(&mut self, u: usize, v: usize) {
        self.rows[u * self.m + v / 64] |= bit(v);
    }

    /// Out-neighbours of `v` in increasing order.
    pub fn neighbours(&self, v: usize) -> impl Iterator<Item = usize> + '_ {
        self.row(v).iter().enumerate().flat_map(|(w, &word)| {
            let mut word = word;
            std::iter::from_fn(move || {
                if word == 0 {
                    return None;
                }
                let lead = word.leading_zeros() as usize;
                word &= !(1u64 << (63 - lead));
                Some(w * 64 + lead)
            })
        })
    }

    pub fn out_degree(&self, v: usize) -> usize {
        self.row(v).iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn loop_count(&self) -> usize {
        (0..self.n).filter(|&v| self.has_edge(v, v)).count()
    }

    /// Edges for undirected graphs (each counted once, loops included),
    /// arcs for directed ones.
    pub fn edge_count(&self) -> usize {
        if self.directed {
            return (0..self.n).map(|v| self.out_degree(v)).sum();
        }
        (0..self.n)
            .map(|v| self.neighbours(v).filter(|&w| w >= v).count())
            .sum()
    }

    /// The graph with all arcs reversed.
    pub fn transpose(&self) -> Graph {
        let mut t = Graph {
            n: self.n,
            m: self.m,
            directed: self.directed,
            rows: vec![0; self.rows.len()],
        };
        for u in 0..self.n {
            for v in self.neighbours(u) {
                t.add_arc(v, u);
            }
        }
        t
    }

    /// Relabel so that vertex `i` of the result is vertex `lab[i]` of `self`.
    ///
    /// `lab` must be a permutation of `0..n`.
    pub fn relabel(&self, lab: &[usize]) -> Graph {
        debug_assert_eq!(lab.len(), self.n);
        let mut position = vec![0usize; self.n];
        for (i, &v) in lab.iter().enumerate() {
            position[v] = i;
        }
        let mut h = Graph {
            n: self.n,
            m: self.m,
            directed: self.directed,
            rows: vec![0; self.rows.len()],
        };
        for (i, &v) in lab.iter().enumerate() {
            for w in self.neighbours(v) {
                h.add_arc(i, position[w]);
            }
        }
        h
    }
}
