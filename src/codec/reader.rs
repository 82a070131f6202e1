//! Single-pass reader turning encoded lines into `GraphRecord`s.

use super::{GraphFormat, LineError, decode_line};
use crate::canon::DEFAULT_MAX_VERTICES;
use crate::errors::{CanonError, DecodeError, FilterError, FilterResult};
use crate::graph::Graph;
use std::io::BufRead;

/// One input graph.
#[derive(Debug, Clone)]
pub struct GraphRecord {
    /// 1-based position in the input, counting graphs only.
    pub sequence_index: u64,
    /// The encoded line exactly as read, minus header and line terminator.
    pub original_text: String,
    pub graph: Graph,
    pub directed: bool,
}

/// Reads graphs one line at a time.
///
/// A header is recognised only at the very start of the input; the first
/// graph may follow it on the same line. Blank lines are skipped. A graph
/// whose size field exceeds the vertex limit is refused with
/// `GraphTooLarge` before it is decoded.
pub struct GraphReader<R> {
    input: R,
    header: Option<GraphFormat>,
    started: bool,
    next_index: u64,
    max_vertices: usize,
    buf: String,
}

impl<R: BufRead> GraphReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            header: None,
            started: false,
            next_index: 1,
            max_vertices: DEFAULT_MAX_VERTICES,
            buf: String::new(),
        }
    }

    pub fn with_max_vertices(mut self, max_vertices: usize) -> Self {
        self.max_vertices = max_vertices;
        self
    }

    /// Header seen at the start of the input, once the first line is read.
    pub fn header(&self) -> Option<GraphFormat> {
        self.header
    }

    fn next_line(&mut self) -> Result<Option<String>, DecodeError> {
        loop {
            self.buf.clear();
            let read = self
                .input
                .read_line(&mut self.buf)
                .map_err(|e| DecodeError::new(self.next_index, format!("read failed: {}", e)))?;
            if read == 0 {
                return Ok(None);
            }
            let mut line = self.buf.trim_end_matches(['\n', '\r']);
            if !self.started {
                self.started = true;
                if let Some((format, rest)) = GraphFormat::strip_header(line) {
                    tracing::debug!(%format, "input header");
                    self.header = Some(format);
                    line = rest;
                }
            }
            if line.is_empty() {
                continue;
            }
            return Ok(Some(line.to_string()));
        }
    }
}

impl<R: BufRead> Iterator for GraphReader<R> {
    type Item = FilterResult<GraphRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = match self.next_line() {
            Ok(Some(line)) => line,
            Ok(None) => return None,
            Err(e) => return Some(Err(e.into())),
        };
        let index = self.next_index;
        self.next_index += 1;

        if line.contains([' ', '\t']) {
            return Some(Err(DecodeError::new(
                index,
                "embedded space or tab in graph line",
            )
            .into()));
        }
        Some(match decode_line(&line, self.max_vertices) {
            Ok(graph) => Ok(GraphRecord {
                sequence_index: index,
                directed: graph.is_directed(),
                original_text: line,
                graph,
            }),
            Err(LineError::Malformed(message)) => Err(DecodeError::new(index, message).into()),
            Err(LineError::TooLarge { order }) => Err(FilterError::AtGraph {
                index,
                source: CanonError::GraphTooLarge {
                    order,
                    capacity: self.max_vertices,
                },
            }),
        })
    }
}
