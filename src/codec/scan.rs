//! Pre-scan of the input to fix the output encoding before any graph is
//! canonicalised.
//!
//! A directed graph anywhere in the input forces digraph6 for the whole run,
//! so the decision needs the whole input. Regular files are scanned and then
//! re-opened; anything else (stdin, FIFOs, process substitution) is copied to
//! an anonymous temporary file while scanning so that memory use stays
//! bounded.

use super::{GraphFormat, GraphReader};
use crate::errors::{FilterError, FilterResult};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

enum ScanSource {
    File(PathBuf),
    Spooled(File),
}

/// What the pre-scan learned, plus a way to read the input again.
pub struct ScannedInput {
    pub header: Option<GraphFormat>,
    pub first_format: Option<GraphFormat>,
    pub has_directed: bool,
    /// Non-blank graph lines seen.
    pub graph_lines: u64,
    source: ScanSource,
}

#[derive(Default)]
struct ScanState {
    started: bool,
    header: Option<GraphFormat>,
    first_format: Option<GraphFormat>,
    has_directed: bool,
    graph_lines: u64,
}

impl ScanState {
    fn observe(&mut self, raw: &str) {
        let mut line = raw.trim_end_matches(['\n', '\r']);
        if !self.started {
            self.started = true;
            if let Some((format, rest)) = GraphFormat::strip_header(line) {
                self.header = Some(format);
                line = rest;
            }
        }
        if line.is_empty() {
            return;
        }
        self.graph_lines += 1;
        let format = GraphFormat::of_line(line);
        if self.first_format.is_none() {
            self.first_format = format;
        }
        if format == Some(GraphFormat::Digraph6) {
            self.has_directed = true;
        }
    }
}

impl ScannedInput {
    /// Scan a named input. Regular files are scanned in place; anything that
    /// can only be read once is spooled through `temp_dir`.
    pub fn scan_path(path: &Path, temp_dir: Option<&Path>) -> FilterResult<Self> {
        let context = || format!("can't read {}", path.display());
        let file = File::open(path).map_err(|e| FilterError::io(context(), e))?;
        let metadata = file.metadata().map_err(|e| FilterError::io(context(), e))?;
        if !metadata.is_file() {
            tracing::debug!(path = %path.display(), "input is not a regular file, spooling");
            return Self::scan_reader(file, temp_dir);
        }

        let mut reader = BufReader::new(file);
        let mut state = ScanState::default();
        let mut line = String::new();
        loop {
            line.clear();
            let read = reader
                .read_line(&mut line)
                .map_err(|e| FilterError::io(context(), e))?;
            if read == 0 {
                break;
            }
            state.observe(&line);
        }
        Ok(Self::from_state(state, ScanSource::File(path.to_path_buf())))
    }

    /// Scan a stream, spooling it to an anonymous temporary file.
    pub fn scan_reader<R: Read>(input: R, temp_dir: Option<&Path>) -> FilterResult<Self> {
        let spool = match temp_dir {
            Some(dir) => tempfile::tempfile_in(dir),
            None => tempfile::tempfile(),
        }
        .map_err(|e| FilterError::io("can't create spool file", e))?;

        let mut writer = BufWriter::new(spool);
        let mut reader = BufReader::new(input);
        let mut state = ScanState::default();
        let mut line = String::new();
        loop {
            line.clear();
            let read = reader
                .read_line(&mut line)
                .map_err(|e| FilterError::io("can't read input", e))?;
            if read == 0 {
                break;
            }
            state.observe(&line);
            writer
                .write_all(line.as_bytes())
                .map_err(|e| FilterError::io("can't write spool file", e))?;
        }
        let mut spool = writer
            .into_inner()
            .map_err(|e| FilterError::io("can't write spool file", e.into_error()))?;
        spool
            .seek(SeekFrom::Start(0))
            .map_err(|e| FilterError::io("can't rewind spool file", e))?;
        Ok(Self::from_state(state, ScanSource::Spooled(spool)))
    }

    fn from_state(state: ScanState, source: ScanSource) -> Self {
        tracing::debug!(
            header = ?state.header,
            first = ?state.first_format,
            directed = state.has_directed,
            lines = state.graph_lines,
            "input scanned"
        );
        Self {
            header: state.header,
            first_format: state.first_format,
            has_directed: state.has_directed,
            graph_lines: state.graph_lines,
            source,
        }
    }

    /// Encoding for canonical output.
    ///
    /// Any directed graph forces digraph6. Otherwise an explicit choice wins,
    /// then the header, then the first graph, then graph6.
    pub fn resolve_format(&self, explicit: Option<GraphFormat>) -> GraphFormat {
        if self.has_directed {
            return GraphFormat::Digraph6;
        }
        explicit
            .or(self.header)
            .or(self.first_format)
            .unwrap_or(GraphFormat::Graph6)
    }

    /// Re-open the input for the real pass, refusing graphs with more than
    /// `max_vertices` vertices.
    pub fn open(self, max_vertices: usize) -> FilterResult<GraphReader<Box<dyn BufRead + Send>>> {
        let reader: Box<dyn BufRead + Send> = match self.source {
            ScanSource::File(path) => {
                let file = File::open(&path)
                    .map_err(|e| FilterError::io(format!("can't read {}", path.display()), e))?;
                Box::new(BufReader::new(file))
            }
            ScanSource::Spooled(file) => Box::new(BufReader::new(file)),
        };
        Ok(GraphReader::new(reader).with_max_vertices(max_vertices))
    }
}
