//! Individualisation-refinement search for a canonical labelling.
//!
//! The search tree is rooted at the equitable refinement of the initial
//! ordered partition. A child individualises one vertex of the target cell
//! and refines again; leaves are discrete partitions, i.e. labellings. The
//! canonical labelling is the leaf whose relabelled graph has the smallest
//! adjacency rows.
//!
//! Two prunings keep symmetric graphs cheap:
//! - a leaf that produces the same graph as the first or best leaf yields an
//!   automorphism, and the search jumps back to where the two paths diverge;
//! - at each node, a candidate in the same orbit as an already explored one
//!   (under automorphisms fixing the current path) is skipped.

use super::invariant::{self, InvariantSpec};
use super::CanonMode;
use crate::graph::Graph;

type Cells = Vec<Vec<usize>>;

struct Leaf {
    lab: Vec<usize>,
    path: Vec<usize>,
    graph: Graph,
}

pub(super) struct Search<'a> {
    g: &'a Graph,
    transpose: Option<Graph>,
    spec: &'a InvariantSpec,
    mode: CanonMode,
    first: Option<Leaf>,
    best: Option<Leaf>,
    automorphisms: Vec<Vec<usize>>,
}

impl<'a> Search<'a> {
    pub(super) fn new(g: &'a Graph, spec: &'a InvariantSpec, mode: CanonMode) -> Self {
        Self {
            g,
            transpose: g.is_directed().then(|| g.transpose()),
            spec,
            mode,
            first: None,
            best: None,
            automorphisms: Vec::new(),
        }
    }

    /// Run the search from `cells` and return `(labelling, canonical graph)`.
    pub(super) fn run(mut self, cells: Cells) -> (Vec<usize>, Graph) {
        if self.g.order() == 0 {
            return (Vec::new(), self.g.clone());
        }
        let mut path = Vec::new();
        self.explore(cells, &mut path);
        match self.best {
            Some(best) => (best.lab, best.graph),
            None => (Vec::new(), self.g.clone()),
        }
    }

    /// Explore the subtree at `cells`. Returns `Some(depth)` to abandon
    /// everything below the node at `depth`.
    fn explore(&mut self, mut cells: Cells, path: &mut Vec<usize>) -> Option<usize> {
        let depth = path.len();
        self.refine(&mut cells);
        if self.spec.applies_at(depth + 1) && cells.iter().any(|c| c.len() > 1) {
            let cell_of = cell_index(&cells, self.g.order());
            if let Some(values) = invariant::compute(self.g, &cell_of, self.spec)
                && split_by(&mut cells, |v| values[v])
            {
                self.refine(&mut cells);
            }
        }

        let Some(target) = self.target_cell(&cells) else {
            return self.leaf(&cells, path);
        };

        let candidates = cells[target].clone();
        let mut explored: Vec<usize> = Vec::new();
        for &v in &candidates {
            if !explored.is_empty() && self.same_orbit_as_explored(v, &explored, path) {
                continue;
            }
            explored.push(v);
            let child = individualise(&cells, target, v);
            path.push(v);
            let jump = self.explore(child, path);
            path.pop();
            if let Some(d) = jump
                && d < depth
            {
                return Some(d);
            }
        }
        None
    }

    fn leaf(&mut self, cells: &Cells, path: &[usize]) -> Option<usize> {
        let lab: Vec<usize> = cells.iter().map(|c| c[0]).collect();
        let graph = self.g.relabel(&lab);
        let leaf = Leaf {
            lab,
            path: path.to_vec(),
            graph,
        };

        let Some(first) = &self.first else {
            self.first = Some(Leaf {
                lab: leaf.lab.clone(),
                path: leaf.path.clone(),
                graph: leaf.graph.clone(),
            });
            self.best = Some(leaf);
            return None;
        };

        if leaf.graph.words() == first.graph.words() {
            let gamma = mapping(&first.lab, &leaf.lab);
            let diverge = divergence(&first.path, &leaf.path);
            self.automorphisms.push(gamma);
            return Some(diverge);
        }

        let Some(best) = &self.best else {
            self.best = Some(leaf);
            return None;
        };
        match leaf.graph.words().cmp(best.graph.words()) {
            std::cmp::Ordering::Less => {
                self.best = Some(leaf);
                None
            }
            std::cmp::Ordering::Equal => {
                let gamma = mapping(&best.lab, &leaf.lab);
                let diverge = divergence(&best.path, &leaf.path);
                self.automorphisms.push(gamma);
                Some(diverge)
            }
            std::cmp::Ordering::Greater => None,
        }
    }

    /// True if `v` shares an orbit with an explored candidate under the
    /// automorphisms that fix every vertex on `path`.
    fn same_orbit_as_explored(&self, v: usize, explored: &[usize], path: &[usize]) -> bool {
        let n = self.g.order();
        let mut parent: Vec<usize> = (0..n).collect();
        fn find(parent: &mut [usize], mut x: usize) -> usize {
            while parent[x] != x {
                parent[x] = parent[parent[x]];
                x = parent[x];
            }
            x
        }
        let mut any = false;
        for gamma in &self.automorphisms {
            if path.iter().any(|&p| gamma[p] != p) {
                continue;
            }
            any = true;
            for (x, &y) in gamma.iter().enumerate() {
                let (rx, ry) = (find(&mut parent, x), find(&mut parent, y));
                if rx != ry {
                    parent[rx] = ry;
                }
            }
        }
        if !any {
            return false;
        }
        let rv = find(&mut parent, v);
        explored.iter().any(|&u| find(&mut parent, u) == rv)
    }

    fn target_cell(&self, cells: &Cells) -> Option<usize> {
        let open = cells.iter().enumerate().filter(|(_, c)| c.len() > 1);
        match self.mode {
            CanonMode::Dense => open.map(|(i, _)| i).next(),
            CanonMode::Sparse => open.min_by_key(|(i, c)| (c.len(), *i)).map(|(i, _)| i),
            CanonMode::Traces => open
                .max_by_key(|(i, c)| (c.len(), std::cmp::Reverse(*i)))
                .map(|(i, _)| i),
        }
    }

    /// Split cells until the partition is equitable.
    ///
    /// Each pass takes the cells in order as splitters and splits every other
    /// cell by arc counts into the splitter; the pass restarts after any split.
    fn refine(&self, cells: &mut Cells) {
        let n = self.g.order();
        'pass: loop {
            for w in 0..cells.len() {
                let mut member = vec![false; n];
                for &v in &cells[w] {
                    member[v] = true;
                }
                let out_count = |v: usize| self.g.neighbours(v).filter(|&x| member[x]).count();
                let changed = match &self.transpose {
                    Some(t) => split_by(cells, |v| {
                        let ins = t.neighbours(v).filter(|&x| member[x]).count();
                        ((out_count(v) as u64) << 32) | ins as u64
                    }),
                    None => split_by(cells, |v| out_count(v) as u64),
                };
                if changed {
                    continue 'pass;
                }
            }
            break;
        }
    }
}

/// Split every cell by `key`, fragments in increasing key order.
/// Returns true if anything split.
fn split_by<F: Fn(usize) -> u64>(cells: &mut Cells, key: F) -> bool {
    let mut changed = false;
    let mut out = Vec::with_capacity(cells.len());
    for cell in cells.drain(..) {
        if cell.len() == 1 {
            out.push(cell);
            continue;
        }
        let mut keyed: Vec<(u64, usize)> = cell.iter().map(|&v| (key(v), v)).collect();
        keyed.sort_unstable();
        let mut current: Vec<usize> = Vec::new();
        let mut last = keyed[0].0;
        for (k, v) in keyed {
            if k != last {
                out.push(std::mem::take(&mut current));
                changed = true;
                last = k;
            }
            current.push(v);
        }
        out.push(current);
    }
    *cells = out;
    changed
}

fn individualise(cells: &Cells, target: usize, v: usize) -> Cells {
    let mut out = Vec::with_capacity(cells.len() + 1);
    for (i, cell) in cells.iter().enumerate() {
        if i == target {
            out.push(vec![v]);
            out.push(cell.iter().copied().filter(|&x| x != v).collect());
        } else {
            out.push(cell.clone());
        }
    }
    out
}

fn cell_index(cells: &Cells, n: usize) -> Vec<usize> {
    let mut cell_of = vec![0; n];
    for (i, cell) in cells.iter().enumerate() {
        for &v in cell {
            cell_of[v] = i;
        }
    }
    cell_of
}

/// The permutation taking `from[i]` to `to[i]`.
fn mapping(from: &[usize], to: &[usize]) -> Vec<usize> {
    let mut gamma = vec![0; from.len()];
    for (&a, &b) in from.iter().zip(to) {
        gamma[a] = b;
    }
    gamma
}

fn divergence(a: &[usize], b: &[usize]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(n: usize) -> Cells {
        vec![(0..n).collect()]
    }

    fn canon(g: &Graph) -> Graph {
        let spec = InvariantSpec::default();
        Search::new(g, &spec, CanonMode::Dense).run(unit(g.order())).1
    }

    #[test]
    fn test_refine_separates_degrees() {
        let mut g = Graph::new(4);
        g.add_edge(0, 1);
        g.add_edge(1, 2);
        g.add_edge(1, 3);
        let spec = InvariantSpec::default();
        let search = Search::new(&g, &spec, CanonMode::Dense);
        let mut cells = unit(4);
        search.refine(&mut cells);
        assert_eq!(cells, vec![vec![0, 2, 3], vec![1]]);
    }

    #[test]
    fn test_split_by_orders_fragments_by_key() {
        let mut cells = vec![vec![0, 1, 2, 3]];
        assert!(split_by(&mut cells, |v| [5, 1, 5, 0][v]));
        assert_eq!(cells, vec![vec![3], vec![1], vec![0, 2]]);
        assert!(!split_by(&mut cells, |_| 7));
    }

    #[test]
    fn test_path_labellings_agree() {
        let mut a = Graph::new(3);
        a.add_edge(0, 1);
        a.add_edge(1, 2);
        let mut b = Graph::new(3);
        b.add_edge(1, 0);
        b.add_edge(0, 2);
        assert_eq!(canon(&a), canon(&b));
    }

    #[test]
    fn test_empty_graph_is_cheap() {
        let g = Graph::new(60);
        let spec = InvariantSpec::default();
        let search = Search::new(&g, &spec, CanonMode::Dense);
        let (lab, h) = search.run(unit(60));
        assert_eq!(lab.len(), 60);
        assert_eq!(h.edge_count(), 0);
    }

    #[test]
    fn test_individualise_puts_vertex_first() {
        let cells = vec![vec![4], vec![0, 1, 2]];
        assert_eq!(
            individualise(&cells, 1, 2),
            vec![vec![4], vec![2], vec![0, 1]]
        );
    }

    #[test]
    fn test_mapping_and_divergence() {
        assert_eq!(mapping(&[0, 1, 2], &[1, 0, 2]), vec![1, 0, 2]);
        assert_eq!(divergence(&[3, 1, 2], &[3, 2, 1]), 1);
    }
}
