use std::fmt;

/// Which members of each class are written, and how.
///
/// Resolved once before streaming starts and never changed during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputPolicy {
    /// Write every member of a qualifying class, not just its first.
    pub emit_all_members: bool,
    /// Drop classes of size 1.
    pub only_non_trivial: bool,
    /// Write the input text instead of the canonical form.
    pub use_original_labelling: bool,
    /// Count everything, write nothing.
    pub suppress_output: bool,
    /// Write a provenance block for every class of size 2 or more.
    pub log_provenance: bool,
}

impl OutputPolicy {
    /// One canonical representative per class.
    pub fn representative() -> Self {
        Self::default()
    }

    pub fn all_members() -> Self {
        Self {
            emit_all_members: true,
            ..Self::default()
        }
    }

    pub fn duplicates() -> Self {
        Self {
            only_non_trivial: true,
            ..Self::default()
        }
    }

    pub fn with_all_members(mut self, yes: bool) -> Self {
        self.emit_all_members = yes;
        self
    }

    pub fn with_only_non_trivial(mut self, yes: bool) -> Self {
        self.only_non_trivial = yes;
        self
    }

    pub fn with_original_labelling(mut self, yes: bool) -> Self {
        self.use_original_labelling = yes;
        self
    }

    pub fn with_suppressed_output(mut self, yes: bool) -> Self {
        self.suppress_output = yes;
        self
    }

    pub fn with_provenance(mut self, yes: bool) -> Self {
        self.log_provenance = yes;
        self
    }

    /// Sort-key lines must carry the input text.
    pub fn needs_original(&self) -> bool {
        self.use_original_labelling
    }

    /// Sort-key lines must carry the sequence index.
    pub fn needs_index(&self) -> bool {
        self.log_provenance
    }
}

impl fmt::Display for OutputPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let members = if self.emit_all_members {
            "all members"
        } else {
            "representatives"
        };
        let classes = if self.only_non_trivial {
            "non-trivial classes"
        } else {
            "all classes"
        };
        let labels = if self.use_original_labelling {
            "original"
        } else {
            "canonical"
        };
        write!(f, "{} of {}, {} labelling", members, classes, labels)?;
        if self.suppress_output {
            write!(f, ", output suppressed")?;
        }
        if self.log_provenance {
            write!(f, ", provenance logged")?;
        }
        Ok(())
    }
}
