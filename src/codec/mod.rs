//! Textual graph encodings: graph6, sparse6 and digraph6.
//!
//! All three encode a graph as a single line of printable ASCII in the range
//! `'?'..='~'` (plus the `:`/`&` prefixes), so an encoded graph never contains
//! a space, tab or newline and can travel through the sort line protocol
//! unchanged.
//!
//! | Format   | Prefix | Loops | Direction |
//! |----------|--------|-------|-----------|
//! | graph6   | none   | no    | no        |
//! | sparse6  | `:`    | yes   | no        |
//! | digraph6 | `&`    | yes   | yes       |

mod digraph6;
mod graph6;
pub mod reader;
pub mod scan;
mod sparse6;

pub use reader::{GraphReader, GraphRecord};
pub use scan::ScannedInput;

use crate::graph::Graph;
use std::fmt;
use std::str::FromStr;

pub const GRAPH6_HEADER: &str = ">>graph6<<";
pub const SPARSE6_HEADER: &str = ">>sparse6<<";
pub const DIGRAPH6_HEADER: &str = ">>digraph6<<";

const BIAS: u8 = 63;
const MAX_SIX_BIT: u8 = 126;

/// The encoding used for a graph line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphFormat {
    Graph6,
    Sparse6,
    Digraph6,
}

impl GraphFormat {
    pub fn header(self) -> &'static str {
        match self {
            GraphFormat::Graph6 => GRAPH6_HEADER,
            GraphFormat::Sparse6 => SPARSE6_HEADER,
            GraphFormat::Digraph6 => DIGRAPH6_HEADER,
        }
    }

    /// Format of an encoded line, judged by its first byte.
    ///
    /// Returns `None` for the incremental sparse6 form (`;`), which this
    /// crate does not read.
    pub fn of_line(line: &str) -> Option<GraphFormat> {
        match line.as_bytes().first() {
            Some(b':') => Some(GraphFormat::Sparse6),
            Some(b'&') => Some(GraphFormat::Digraph6),
            Some(b';') => None,
            _ => Some(GraphFormat::Graph6),
        }
    }

    /// Split a header off the start of `line`, returning the format and the rest.
    pub fn strip_header(line: &str) -> Option<(GraphFormat, &str)> {
        [GraphFormat::Graph6, GraphFormat::Sparse6, GraphFormat::Digraph6]
            .into_iter()
            .find_map(|f| line.strip_prefix(f.header()).map(|rest| (f, rest)))
    }
}

impl fmt::Display for GraphFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphFormat::Graph6 => write!(f, "graph6"),
            GraphFormat::Sparse6 => write!(f, "sparse6"),
            GraphFormat::Digraph6 => write!(f, "digraph6"),
        }
    }
}

impl FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "graph6" | "g6" => Ok(GraphFormat::Graph6),
            "sparse6" | "s6" => Ok(GraphFormat::Sparse6),
            "digraph6" | "d6" => Ok(GraphFormat::Digraph6),
            _ => Err(format!(
                "Invalid graph format '{}'. Valid values: graph6, sparse6, digraph6",
                s
            )),
        }
    }
}

/// Encode `g` in `format`. The result has no trailing newline.
///
/// A directed graph written as graph6 or sparse6 loses its direction; the
/// caller is expected to pick digraph6 for directed input.
pub fn encode(g: &Graph, format: GraphFormat) -> String {
    let bytes = match format {
        GraphFormat::Graph6 => graph6::encode(g),
        GraphFormat::Sparse6 => sparse6::encode(g),
        GraphFormat::Digraph6 => digraph6::encode(g),
    };
    // every byte pushed by the encoders is ASCII
    String::from_utf8(bytes).unwrap_or_default()
}

/// Why a graph line was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    Malformed(String),
    /// The size field asks for more vertices than the caller allows.
    TooLarge { order: usize },
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineError::Malformed(message) => f.write_str(message),
            LineError::TooLarge { order } => write!(f, "graph has {} vertices", order),
        }
    }
}

/// Decode one graph line (without header or newline) of any supported format.
///
/// The size field is checked against `max_vertices` before anything is
/// allocated.
pub fn decode_line(line: &str, max_vertices: usize) -> Result<Graph, LineError> {
    let bytes = line.as_bytes();
    let (format, body) = match GraphFormat::of_line(line) {
        Some(GraphFormat::Graph6) => (GraphFormat::Graph6, bytes),
        Some(format) => (format, &bytes[1..]),
        None => {
            return Err(LineError::Malformed(
                "incremental sparse6 is not supported".to_string(),
            ));
        }
    };
    let (order, _) = decode_size(body).map_err(LineError::Malformed)?;
    if order > max_vertices {
        return Err(LineError::TooLarge { order });
    }
    match format {
        GraphFormat::Graph6 => graph6::decode(body),
        GraphFormat::Sparse6 => sparse6::decode(body),
        GraphFormat::Digraph6 => digraph6::decode(body),
    }
    .map_err(LineError::Malformed)
}

/// Append the `N(n)` size field.
fn encode_size(n: usize, out: &mut Vec<u8>) {
    if n <= 62 {
        out.push(BIAS + n as u8);
    } else if n <= 258_047 {
        out.push(MAX_SIX_BIT);
        for shift in [12, 6, 0] {
            out.push(BIAS + ((n >> shift) & 0x3f) as u8);
        }
    } else {
        out.push(MAX_SIX_BIT);
        out.push(MAX_SIX_BIT);
        for shift in [30, 24, 18, 12, 6, 0] {
            out.push(BIAS + ((n >> shift) & 0x3f) as u8);
        }
    }
}

/// Parse the `N(n)` size field, returning `n` and the number of bytes used.
fn decode_size(bytes: &[u8]) -> Result<(usize, usize), String> {
    let six = |i: usize| -> Result<usize, String> {
        match bytes.get(i) {
            Some(&b) if (BIAS..=MAX_SIX_BIT).contains(&b) => Ok((b - BIAS) as usize),
            Some(&b) => Err(format!("illegal character {:?} in size field", b as char)),
            None => Err("truncated size field".to_string()),
        }
    };
    match bytes.first() {
        None => Err("empty graph line".to_string()),
        Some(&MAX_SIX_BIT) if bytes.get(1) == Some(&MAX_SIX_BIT) => {
            let mut n = 0usize;
            for i in 2..8 {
                n = (n << 6) | six(i)?;
            }
            Ok((n, 8))
        }
        Some(&MAX_SIX_BIT) => {
            let mut n = 0usize;
            for i in 1..4 {
                n = (n << 6) | six(i)?;
            }
            Ok((n, 4))
        }
        Some(_) => Ok((six(0)?, 1)),
    }
}

/// Packs bits six at a time into biased bytes.
struct BitWriter {
    out: Vec<u8>,
    acc: u8,
    filled: u8,
}

impl BitWriter {
    fn new(out: Vec<u8>) -> Self {
        Self {
            out,
            acc: 0,
            filled: 0,
        }
    }

    fn push(&mut self, bit: bool) {
        self.acc = (self.acc << 1) | bit as u8;
        self.filled += 1;
        if self.filled == 6 {
            self.out.push(BIAS + self.acc);
            self.acc = 0;
            self.filled = 0;
        }
    }

    fn push_value(&mut self, value: usize, width: u32) {
        for shift in (0..width).rev() {
            self.push((value >> shift) & 1 == 1);
        }
    }

    /// Bits still free in the current partial byte (0 when byte-aligned).
    fn free_in_byte(&self) -> u8 {
        if self.filled == 0 { 0 } else { 6 - self.filled }
    }

    /// Pad the partial byte with zeros and return the bytes.
    fn finish(mut self) -> Vec<u8> {
        while self.filled != 0 {
            self.push(false);
        }
        self.out
    }
}

/// Reads six-bit groups MSB first.
struct BitReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    current: u8,
    left: u8,
}

impl<'a> BitReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            current: 0,
            left: 0,
        }
    }

    fn next_bit(&mut self) -> Result<Option<bool>, String> {
        if self.left == 0 {
            let Some(&b) = self.bytes.get(self.pos) else {
                return Ok(None);
            };
            if !(BIAS..=MAX_SIX_BIT).contains(&b) {
                return Err(format!("illegal character {:?}", b as char));
            }
            self.current = b - BIAS;
            self.pos += 1;
            self.left = 6;
        }
        self.left -= 1;
        Ok(Some((self.current >> self.left) & 1 == 1))
    }

    fn next_value(&mut self, width: u32) -> Result<Option<usize>, String> {
        let mut value = 0usize;
        for _ in 0..width {
            match self.next_bit()? {
                Some(bit) => value = (value << 1) | bit as usize,
                None => return Ok(None),
            }
        }
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_field_short() {
        let mut out = Vec::new();
        encode_size(3, &mut out);
        assert_eq!(out, b"B");
        assert_eq!(decode_size(b"B").unwrap(), (3, 1));
    }

    #[test]
    fn test_size_field_medium_and_long() {
        for n in [63usize, 1000, 258_047, 258_048, 1 << 30] {
            let mut out = Vec::new();
            encode_size(n, &mut out);
            let (decoded, used) = decode_size(&out).unwrap();
            assert_eq!(decoded, n);
            assert_eq!(used, out.len());
        }
    }

    #[test]
    fn test_format_of_line() {
        assert_eq!(GraphFormat::of_line("Bw"), Some(GraphFormat::Graph6));
        assert_eq!(GraphFormat::of_line(":Bc"), Some(GraphFormat::Sparse6));
        assert_eq!(GraphFormat::of_line("&B?"), Some(GraphFormat::Digraph6));
        assert_eq!(GraphFormat::of_line(";Bc"), None);
    }

    #[test]
    fn test_strip_header() {
        assert_eq!(
            GraphFormat::strip_header(">>graph6<<Bw"),
            Some((GraphFormat::Graph6, "Bw"))
        );
        assert_eq!(
            GraphFormat::strip_header(">>digraph6<<"),
            Some((GraphFormat::Digraph6, ""))
        );
        assert_eq!(GraphFormat::strip_header("Bw"), None);
    }

    #[test]
    fn test_decode_rejects_incremental_sparse6() {
        assert!(matches!(
            decode_line(";Bc", 1024),
            Err(LineError::Malformed(_))
        ));
    }

    #[test]
    fn test_huge_size_field_is_refused_before_allocation() {
        for line in [":~~~~~~~~", "&~~~~~~~~", "~~~~~~~~"] {
            assert_eq!(
                decode_line(line, 1024),
                Err(LineError::TooLarge {
                    order: (1usize << 36) - 1
                }),
                "line {}",
                line
            );
        }
    }

    #[test]
    fn test_edgeless_sparse6_over_limit_is_refused() {
        // 200000 vertices, no edges
        let mut bytes = vec![b':'];
        encode_size(200_000, &mut bytes);
        let line = String::from_utf8(bytes).unwrap();
        assert_eq!(
            decode_line(&line, 1024),
            Err(LineError::TooLarge { order: 200_000 })
        );
    }

    #[test]
    fn test_order_at_limit_is_accepted() {
        assert_eq!(decode_line("Bw", 3).unwrap().order(), 3);
        assert!(decode_line("Bw", 2).is_err());
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("G6".parse::<GraphFormat>().unwrap(), GraphFormat::Graph6);
        assert_eq!(
            "digraph6".parse::<GraphFormat>().unwrap(),
            GraphFormat::Digraph6
        );
        assert!("dot".parse::<GraphFormat>().is_err());
    }
}
