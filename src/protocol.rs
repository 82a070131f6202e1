//! Line protocol spoken with the sort process.
//!
//! ```text
//! <canonical>[SP <original>][TAB <index>]\n
//! ```
//!
//! The sort key is the first space-delimited field. Neither text field may
//! contain a space, tab or newline.

use crate::errors::{FilterError, FilterResult};
use std::fmt::Write as _;

/// One record sent to, and read back from, the sort process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLine {
    pub canonical_form: String,
    /// Present only when original labelling is requested.
    pub original_text: Option<String>,
    /// Present only when provenance logging is requested.
    pub sequence_index: Option<u64>,
}

fn check_field(name: &str, value: &str) -> FilterResult<()> {
    if value.is_empty() {
        return Err(FilterError::Protocol(format!("empty {}", name)));
    }
    if let Some(c) = value.chars().find(|c| matches!(c, ' ' | '\t' | '\n' | '\r')) {
        return Err(FilterError::Protocol(format!(
            "{} contains {:?}: {}",
            name, c, value
        )));
    }
    Ok(())
}

impl KeyLine {
    pub fn new(canonical_form: impl Into<String>) -> Self {
        Self {
            canonical_form: canonical_form.into(),
            original_text: None,
            sequence_index: None,
        }
    }

    pub fn with_original(mut self, text: impl Into<String>) -> Self {
        self.original_text = Some(text.into());
        self
    }

    pub fn with_index(mut self, index: u64) -> Self {
        self.sequence_index = Some(index);
        self
    }

    /// Serialise to one protocol line, newline included.
    pub fn to_line(&self) -> FilterResult<String> {
        check_field("canonical form", &self.canonical_form)?;
        let mut line = self.canonical_form.clone();
        if let Some(original) = &self.original_text {
            check_field("original text", original)?;
            line.push(' ');
            line.push_str(original);
        }
        if let Some(index) = self.sequence_index {
            if index == 0 {
                return Err(FilterError::Protocol(
                    "sequence index must be positive".to_string(),
                ));
            }
            let _ = write!(line, "\t{}", index);
        }
        line.push('\n');
        Ok(line)
    }

    /// Parse a line read back from the sort process (terminator optional).
    pub fn parse(line: &str) -> FilterResult<Self> {
        let line = line.trim_end_matches(['\n', '\r']);
        let (body, index) = match line.split_once('\t') {
            Some((body, index)) => {
                let index: u64 = index.parse().map_err(|_| {
                    FilterError::Protocol(format!("bad sequence index in line: {}", line))
                })?;
                if index == 0 {
                    return Err(FilterError::Protocol(format!(
                        "zero sequence index in line: {}",
                        line
                    )));
                }
                (body, Some(index))
            }
            None => (line, None),
        };
        let (canonical, original) = match body.split_once(' ') {
            Some((canonical, original)) => (canonical, Some(original)),
            None => (body, None),
        };
        if canonical.is_empty() {
            return Err(FilterError::Protocol(format!(
                "missing canonical form in line: {:?}",
                line
            )));
        }
        if let Some(original) = original {
            check_field("original text", original)?;
        }
        Ok(Self {
            canonical_form: canonical.to_string(),
            original_text: original.map(str::to_string),
            sequence_index: index,
        })
    }
}
