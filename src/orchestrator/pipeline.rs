//! Two-phase run: feed every key line to the sort process, then drain its
//! output into the classifier.
//!
//! The phases never overlap, so the sort process must buffer its whole input
//! (to disk if needed) before producing output. `sort` does.

use super::oracle::{OracleCommand, OracleProcess};
use crate::canon::Canonicalizer;
use crate::classify::{ClassStats, Classifier, OutputPolicy};
use crate::codec::GraphRecord;
use crate::encoder::CanonicalEncoder;
use crate::errors::{FilterError, FilterResult};
use std::io::Write;
use tokio_util::sync::CancellationToken;

/// Counters for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub num_read: u64,
    pub stats: ClassStats,
}

impl RunSummary {
    pub fn num_written(&self) -> u64 {
        self.stats.written
    }
}

pub struct Pipeline<C> {
    encoder: CanonicalEncoder<C>,
    oracle: OracleCommand,
    cancel: CancellationToken,
}

impl<C: Canonicalizer> Pipeline<C> {
    /// The encoder is set up to carry whatever fields `policy` needs.
    pub fn new(encoder: CanonicalEncoder<C>, oracle: OracleCommand, policy: &OutputPolicy) -> Self {
        Self {
            encoder: encoder
                .carry_original(policy.needs_original())
                .carry_index(policy.needs_index()),
            oracle,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run `records` through the sort process into `classifier`.
    ///
    /// On any failure the sort process is killed and reaped before this
    /// returns.
    pub async fn run<I, W, L>(
        &self,
        records: I,
        classifier: &mut Classifier<W, L>,
    ) -> FilterResult<RunSummary>
    where
        I: IntoIterator<Item = FilterResult<GraphRecord>>,
        W: Write,
        L: Write,
    {
        let mut oracle = self.oracle.spawn()?;
        match self.exchange(&mut oracle, records, classifier).await {
            Ok(num_read) => {
                let stats = classifier.finish()?;
                tracing::info!(
                    read = num_read,
                    written = stats.written,
                    classes = stats.classes,
                    non_trivial = stats.non_trivial,
                    "run complete"
                );
                Ok(RunSummary { num_read, stats })
            }
            Err(e) => {
                tracing::debug!(error = %e, "run failed, stopping sort process");
                oracle.abort().await;
                Err(e)
            }
        }
    }

    async fn exchange<I, W, L>(
        &self,
        oracle: &mut OracleProcess,
        records: I,
        classifier: &mut Classifier<W, L>,
    ) -> FilterResult<u64>
    where
        I: IntoIterator<Item = FilterResult<GraphRecord>>,
        W: Write,
        L: Write,
    {
        let mut num_read = 0u64;
        for record in records {
            if self.cancel.is_cancelled() {
                return Err(FilterError::Cancelled);
            }
            let record = record?;
            num_read += 1;
            let line = self.encoder.encode(&record)?;
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(FilterError::Cancelled),
                sent = oracle.send(&line) => sent?,
            }
        }
        oracle.finish_input().await?;
        tracing::debug!(records = num_read, "feed phase complete");

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(FilterError::Cancelled),
                next = oracle.next_line() => next?,
            };
            match next {
                Some(line) => classifier.push(line)?,
                None => break,
            }
        }
        oracle.wait().await?;
        tracing::debug!(lines = oracle.received(), "drain phase complete");
        Ok(num_read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canon::{CanonMode, InvariantSpec, Partition, SearchCanonicalizer};
    use crate::codec::{GraphFormat, GraphReader};
    use crate::errors::{DecodeError, OracleFailure};
    use std::io::Cursor;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    fn create_test_script(dir: &Path, name: &str, content: &str) -> PathBuf {
        let script_path = dir.join(name);
        std::fs::write(&script_path, content).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&script_path).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&script_path, perms).unwrap();
        }
        script_path
    }

    fn pipeline(oracle: OracleCommand, policy: &OutputPolicy) -> Pipeline<SearchCanonicalizer> {
        let encoder = CanonicalEncoder::new(
            SearchCanonicalizer::new(CanonMode::Dense),
            Partition::unit(),
            InvariantSpec::default(),
            GraphFormat::Graph6,
        )
        .unwrap();
        Pipeline::new(encoder, oracle, policy)
    }

    fn records(text: &str) -> GraphReader<Cursor<String>> {
        GraphReader::new(Cursor::new(text.to_string()))
    }

    async fn run(policy: OutputPolicy, text: &str) -> (String, String, RunSummary) {
        let pipeline = pipeline(OracleCommand::default(), &policy);
        let mut classifier = Classifier::new(policy, Vec::new()).with_log(Vec::new());
        let summary = pipeline.run(records(text), &mut classifier).await.unwrap();
        let (out, log) = classifier.into_parts();
        (
            String::from_utf8(out).unwrap(),
            String::from_utf8(log.unwrap_or_default()).unwrap(),
            summary,
        )
    }

    #[tokio::test]
    async fn test_three_triangles() {
        let input = "Bw\nBw\nBw\n";
        let (out, _, summary) = run(OutputPolicy::representative(), input).await;
        assert_eq!(out, "Bw\n");
        assert_eq!(summary.num_read, 3);
        assert_eq!(summary.num_written(), 1);

        let (out, _, _) = run(OutputPolicy::all_members(), input).await;
        assert_eq!(out, "Bw\nBw\nBw\n");

        let (_, log, _) = run(OutputPolicy::representative().with_provenance(true), input).await;
        assert_eq!(log, "  1 :   1   2   3\n");
    }

    #[tokio::test]
    async fn test_triangle_and_path() {
        let input = "Bw\nBg\n";
        let (out, _, _) = run(OutputPolicy::duplicates(), input).await;
        assert_eq!(out, "");
        let (out, _, summary) = run(OutputPolicy::representative(), input).await;
        assert_eq!(out, "BW\nBw\n");
        assert_eq!(summary.stats.classes, 2);
    }

    #[tokio::test]
    async fn test_original_labels_keep_input_order_within_class() {
        let policy = OutputPolicy::all_members().with_original_labelling(true);
        let (out, _, _) = run(policy, "BW\nBw\nBg\nBo\n").await;
        assert_eq!(out, "BW\nBg\nBo\nBw\n");
    }

    #[tokio::test]
    async fn test_empty_input() {
        let (out, _, summary) = run(OutputPolicy::representative(), "").await;
        assert_eq!(out, "");
        assert_eq!(summary.num_read, 0);
    }

    #[tokio::test]
    async fn test_oracle_failure_mid_drain() {
        let dir = tempdir().unwrap();
        let script = create_test_script(
            dir.path(),
            "sort.sh",
            "#!/bin/sh\nsort \"$@\" | head -n 1\nexit 2\n",
        );
        let policy = OutputPolicy::representative();
        let pipeline = pipeline(OracleCommand::new(script.to_string_lossy()), &policy);
        let mut classifier = Classifier::new(policy, Vec::new());
        let err = pipeline
            .run(records("Bw\nBg\nBw\n"), &mut classifier)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FilterError::OracleFailed(OracleFailure::ExitCode(2))
        ));
    }

    #[tokio::test]
    async fn test_decode_error_aborts_run() {
        let policy = OutputPolicy::representative();
        let pipeline = pipeline(OracleCommand::default(), &policy);
        let mut classifier = Classifier::new(policy, Vec::new());
        let err = pipeline
            .run(records("Bw\nB\n"), &mut classifier)
            .await
            .unwrap_err();
        assert!(matches!(err, FilterError::Decode(DecodeError { index: 2, .. })));
        assert_eq!(classifier.stats().written, 0);
    }

    #[tokio::test]
    async fn test_cancelled_run_stops() {
        let policy = OutputPolicy::representative();
        let pipeline = pipeline(OracleCommand::default(), &policy);
        pipeline.cancellation_token().cancel();
        let mut classifier = Classifier::new(policy, Vec::new());
        let err = pipeline
            .run(records("Bw\n"), &mut classifier)
            .await
            .unwrap_err();
        assert!(matches!(err, FilterError::Cancelled));
    }
}
