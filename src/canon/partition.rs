//! Initial vertex colouring from a partition string.
//!
//! One character is associated with each vertex, in vertex order. The string
//! is treated as extended to infinity on the right with `z`, and `x^N` is
//! shorthand for `x` repeated `N` times. A leading `-` assigns characters
//! starting at the last vertex and orders the cells by decreasing character.

use super::DEFAULT_MAX_VERTICES;
use crate::errors::FilterError;
use std::fmt;
use std::str::FromStr;

const FILL: u8 = b'z';

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    colours: Vec<u8>,
    reversed: bool,
    source: Option<String>,
}

impl Partition {
    /// The trivial partition: every vertex in one cell.
    pub fn unit() -> Self {
        Self::default()
    }

    pub fn is_unit(&self) -> bool {
        self.source.is_none()
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// Colour of every vertex of an `n`-vertex graph.
    pub fn colours(&self, n: usize) -> Vec<u8> {
        let mut out = vec![FILL; n];
        for (i, &c) in self.colours.iter().take(n).enumerate() {
            let v = if self.reversed { n - 1 - i } else { i };
            out[v] = c;
        }
        out
    }

    /// Ordered cells for an `n`-vertex graph.
    ///
    /// Cells are sorted by colour (descending when reversed); vertices within
    /// a cell are in increasing order.
    pub fn cells(&self, n: usize) -> Vec<Vec<usize>> {
        if n == 0 {
            return Vec::new();
        }
        let colours = self.colours(n);
        let mut order: Vec<usize> = (0..n).collect();
        if self.reversed {
            order.sort_by(|&a, &b| colours[b].cmp(&colours[a]).then(a.cmp(&b)));
        } else {
            order.sort_by(|&a, &b| colours[a].cmp(&colours[b]).then(a.cmp(&b)));
        }
        let mut cells: Vec<Vec<usize>> = Vec::new();
        let mut last: Option<u8> = None;
        for v in order {
            if last == Some(colours[v]) {
                if let Some(cell) = cells.last_mut() {
                    cell.push(v);
                }
            } else {
                cells.push(vec![v]);
                last = Some(colours[v]);
            }
        }
        cells
    }
}

impl FromStr for Partition {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_within(s, DEFAULT_MAX_VERTICES)
    }
}

impl Partition {
    /// Parse a partition string for graphs of at most `max_vertices`
    /// vertices. A string assigning more colours than that is refused.
    pub fn parse_within(s: &str, max_vertices: usize) -> Result<Self, FilterError> {
        let too_long = || {
            FilterError::config(format!(
                "partition string '{}' colours more than {} vertices",
                s, max_vertices
            ))
        };
        let (reversed, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        if !body.is_ascii() || body.contains('\0') {
            return Err(FilterError::config(
                "partition string must be ASCII without NUL",
            ));
        }
        let bytes = body.as_bytes();
        let mut colours = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i];
            i += 1;
            if bytes.get(i) == Some(&b'^') {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                if end == start {
                    return Err(FilterError::config(format!(
                        "partition string '{}': '^' must be followed by a count",
                        s
                    )));
                }
                let count: usize = body[start..end].parse().map_err(|_| too_long())?;
                if count > max_vertices - colours.len() {
                    return Err(too_long());
                }
                colours.extend(std::iter::repeat_n(c, count));
                i = end;
            } else {
                if colours.len() == max_vertices {
                    return Err(too_long());
                }
                colours.push(c);
            }
        }
        Ok(Self {
            colours,
            reversed,
            source: Some(s.to_string()),
        })
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(s) => write!(f, "{}", s),
            None => write!(f, "(unit)"),
        }
    }
}
