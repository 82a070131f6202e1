//! Output destination for filtered graphs.
//!
//! A named output file is written to a temporary file beside it and only
//! moved into place by `commit`. A failed run leaves the target untouched.

use crate::config::OutputTarget;
use crate::errors::{FilterError, FilterResult};
use std::io::{self, BufWriter, Stdout, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub enum OutputSink {
    Stdout(BufWriter<Stdout>),
    File {
        staged: BufWriter<NamedTempFile>,
        target: PathBuf,
    },
    Discard,
}

impl OutputSink {
    pub fn open(target: &OutputTarget) -> FilterResult<Self> {
        match target {
            OutputTarget::Stdout => Ok(Self::stdout()),
            OutputTarget::File(path) => Self::create(path),
            OutputTarget::Discard => Ok(OutputSink::Discard),
        }
    }

    pub fn stdout() -> Self {
        OutputSink::Stdout(BufWriter::new(io::stdout()))
    }

    /// Stage output for `path` in the same directory.
    pub fn create(path: &Path) -> FilterResult<Self> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let staged = NamedTempFile::new_in(dir)
            .map_err(|e| FilterError::io(format!("can't open {} for writing", path.display()), e))?;
        Ok(OutputSink::File {
            staged: BufWriter::new(staged),
            target: path.to_path_buf(),
        })
    }

    /// Flush, and move a staged file over its target.
    pub fn commit(self) -> FilterResult<()> {
        match self {
            OutputSink::Stdout(mut out) => out
                .flush()
                .map_err(|e| FilterError::io("can't write to stdout", e)),
            OutputSink::File { staged, target } => {
                let context = || format!("can't write {}", target.display());
                let staged = staged
                    .into_inner()
                    .map_err(|e| FilterError::io(context(), e.into_error()))?;
                staged
                    .persist(&target)
                    .map_err(|e| FilterError::io(context(), e.error))?;
                tracing::debug!(path = %target.display(), "output committed");
                Ok(())
            }
            OutputSink::Discard => Ok(()),
        }
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputSink::Stdout(out) => out.write(buf),
            OutputSink::File { staged, .. } => staged.write(buf),
            OutputSink::Discard => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputSink::Stdout(out) => out.flush(),
            OutputSink::File { staged, .. } => staged.flush(),
            OutputSink::Discard => Ok(()),
        }
    }
}
