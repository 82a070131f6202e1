//! Resolution of command-line flags and settings into one run configuration.
//!
//! `FilterOptions` mirrors the flags as typed by the user. `FilterConfig` is
//! what a run actually uses; it is built once and every incompatibility is
//! reported before any input is read.

use crate::canon::{
    CanonMode, Canonicalizer, Invariant, InvariantSpec, Partition, SearchCanonicalizer,
};
use crate::classify::OutputPolicy;
use crate::codec::GraphFormat;
use crate::errors::{FilterError, FilterResult};
use crate::orchestrator::OracleCommand;
use crate::settings::{Settings, is_valid_buffer_size};
use std::path::{Path, PathBuf};

/// Raw filter flags.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    pub quiet: bool,
    pub provenance: bool,
    pub keep_labels: bool,
    pub duplicates: bool,
    pub all_members: bool,
    pub count_only: bool,
    pub sparse6: bool,
    pub graph6: bool,
    pub digraph6: bool,
    pub sparse_mode: bool,
    pub traces: bool,
    pub invariant: Option<u32>,
    pub levels: Option<String>,
    pub invariant_arg: Option<i32>,
    pub partition: Option<String>,
    pub temp_dir: Option<String>,
    pub buffer_size: Option<String>,
    pub infile: Option<PathBuf>,
    pub outfile: Option<PathBuf>,
}

/// Where graphs come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

impl InputSource {
    pub fn name(&self) -> String {
        match self {
            InputSource::Stdin => "stdin".to_string(),
            InputSource::File(path) => path.display().to_string(),
        }
    }
}

/// Where graphs go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
    /// Output suppressed; only counts are reported.
    Discard,
}

impl OutputTarget {
    pub fn name(&self) -> String {
        match self {
            OutputTarget::Stdout => "stdout".to_string(),
            OutputTarget::File(path) => path.display().to_string(),
            OutputTarget::Discard => "nowhere".to_string(),
        }
    }
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub policy: OutputPolicy,
    /// Explicit output encoding, if any. Directed input overrides it.
    pub format: Option<GraphFormat>,
    pub mode: CanonMode,
    pub max_vertices: usize,
    pub partition: Partition,
    pub invariant: InvariantSpec,
    pub oracle: OracleCommand,
    /// Where stdin is spooled during the format pre-scan.
    pub spool_dir: Option<PathBuf>,
    pub input: InputSource,
    pub output: OutputTarget,
    pub quiet: bool,
    options_line: String,
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Parse an `-I` level range: `a:b`, `a-b` or a single level.
pub fn parse_levels(text: &str) -> FilterResult<(usize, usize)> {
    let bad = || FilterError::config(format!("-I expects min:max, got '{}'", text));
    let (min, max) = match text.split_once([':', '-']) {
        Some((min, max)) => (min, max),
        None => (text, text),
    };
    let min: usize = min.trim().parse().map_err(|_| bad())?;
    let max: usize = max.trim().parse().map_err(|_| bad())?;
    if min > max {
        return Err(FilterError::config(format!(
            "-I range {}:{} has min greater than max",
            min, max
        )));
    }
    Ok((min, max))
}

impl FilterConfig {
    pub fn resolve(opts: &FilterOptions, settings: &Settings) -> FilterResult<Self> {
        if opts.count_only && opts.outfile.is_some() {
            return Err(FilterError::config("-u and outfile are incompatible"));
        }
        let exclusive = [opts.sparse6, opts.graph6, opts.digraph6, opts.keep_labels];
        if exclusive.iter().filter(|&&set| set).count() > 1 {
            return Err(FilterError::config("-s, -g, -z and -k are incompatible"));
        }
        if opts.traces && opts.sparse_mode {
            return Err(FilterError::config("-t is incompatible with -S"));
        }
        if let Some(dir) = &opts.temp_dir
            && dir.is_empty()
        {
            return Err(FilterError::config("-T needs a non-empty argument"));
        }
        if let Some(size) = &opts.buffer_size
            && !is_valid_buffer_size(size)
        {
            return Err(FilterError::config(format!(
                "-Z expects a number followed by K, M, G or %, got '{}'",
                size
            )));
        }

        let mode = if opts.traces {
            CanonMode::Traces
        } else if opts.sparse_mode {
            CanonMode::Sparse
        } else {
            settings.canon.mode
        };

        let kind = match opts.invariant {
            Some(index) => Invariant::from_index(index)?,
            None => Invariant::None,
        };
        let mut invariant = InvariantSpec::new(kind);
        if let Some(levels) = &opts.levels {
            let (min, max) = parse_levels(levels)?;
            invariant = invariant.with_levels(min, max);
        }
        if let Some(arg) = opts.invariant_arg {
            invariant = invariant.with_arg(arg);
        }

        let partition = match &opts.partition {
            Some(text) => Partition::parse_within(text, settings.canon.max_vertices)?,
            None => Partition::unit(),
        };

        let format = if opts.sparse6 {
            Some(GraphFormat::Sparse6)
        } else if opts.graph6 {
            Some(GraphFormat::Graph6)
        } else if opts.digraph6 {
            Some(GraphFormat::Digraph6)
        } else {
            None
        };

        let policy = OutputPolicy::representative()
            .with_all_members(opts.all_members || (opts.duplicates && opts.keep_labels))
            .with_only_non_trivial(opts.duplicates)
            .with_original_labelling(opts.keep_labels)
            .with_suppressed_output(opts.count_only)
            .with_provenance(opts.provenance);

        let input = match &opts.infile {
            Some(path) if !is_stdio(path) => InputSource::File(path.clone()),
            _ => InputSource::Stdin,
        };
        let output = if opts.count_only {
            OutputTarget::Discard
        } else {
            // with only an input file, the output replaces it
            match opts.outfile.as_ref().or(opts.infile.as_ref()) {
                Some(path) if !is_stdio(path) => OutputTarget::File(path.clone()),
                _ => OutputTarget::Stdout,
            }
        };

        let temp_dir = opts
            .temp_dir
            .as_ref()
            .map(PathBuf::from)
            .or_else(|| settings.temp_dir());
        let buffer_size = opts
            .buffer_size
            .clone()
            .or_else(|| settings.oracle.buffer_size.clone());
        let oracle = OracleCommand::new(settings.sort_command())
            .with_temp_dir(temp_dir.clone())
            .with_buffer_size(buffer_size);

        let config = Self {
            policy,
            format,
            mode,
            max_vertices: settings.canon.max_vertices,
            partition,
            invariant,
            oracle,
            spool_dir: temp_dir,
            input,
            output,
            quiet: opts.quiet,
            options_line: options_line(opts, &invariant),
        };
        config.canonicalizer().validate(&config.invariant)?;
        Ok(config)
    }

    pub fn canonicalizer(&self) -> SearchCanonicalizer {
        SearchCanonicalizer::new(self.mode).with_max_vertices(self.max_vertices)
    }

    /// The `>A` line echoing the effective options.
    pub fn options_line(&self) -> &str {
        &self.options_line
    }
}

fn options_line(opts: &FilterOptions, invariant: &InvariantSpec) -> String {
    let mut line = String::from(">A isofilter");
    let switches: String = [
        (opts.sparse6, 's'),
        (opts.graph6, 'g'),
        (opts.digraph6, 'z'),
        (opts.sparse_mode, 'S'),
        (opts.traces, 't'),
        (opts.keep_labels, 'k'),
        (opts.provenance, 'v'),
        (opts.all_members, 'a'),
        (opts.duplicates, 'd'),
        (opts.count_only, 'u'),
    ]
    .iter()
    .filter(|(set, _)| *set)
    .map(|(_, c)| *c)
    .collect();
    if !switches.is_empty() {
        line.push_str(" -");
        line.push_str(&switches);
    }
    if let Some(size) = &opts.buffer_size {
        line.push_str(&format!(" -Z{}", size));
    }
    if !invariant.is_none() {
        line.push_str(&format!(" i={}", invariant));
    }
    if let Some(partition) = &opts.partition {
        line.push_str(&format!(" -f{}", partition));
    }
    if let Some(dir) = &opts.temp_dir {
        line.push_str(&format!(" -T{}", dir));
    }
    if let Some(infile) = &opts.infile {
        line.push_str(&format!(" {}", infile.display()));
    }
    if let Some(outfile) = &opts.outfile {
        line.push_str(&format!(" {}", outfile.display()));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CanonError;

    fn resolve(opts: FilterOptions) -> FilterResult<FilterConfig> {
        FilterConfig::resolve(&opts, &Settings::default())
    }

    fn config_message(result: FilterResult<FilterConfig>) -> String {
        match result {
            Err(FilterError::Configuration(message)) => message,
            Err(other) => panic!("expected configuration error, got {}", other),
            Ok(_) => panic!("expected configuration error"),
        }
    }

    #[test]
    fn test_defaults() {
        let config = resolve(FilterOptions::default()).unwrap();
        assert_eq!(config.policy, OutputPolicy::representative());
        assert_eq!(config.mode, CanonMode::Dense);
        assert_eq!(config.format, None);
        assert_eq!(config.input, InputSource::Stdin);
        assert_eq!(config.output, OutputTarget::Stdout);
        assert!(config.partition.is_unit());
        assert_eq!(config.options_line(), ">A isofilter");
    }

    #[test]
    fn test_count_only_with_outfile_is_rejected() {
        let opts = FilterOptions {
            count_only: true,
            infile: Some("in.g6".into()),
            outfile: Some("out.g6".into()),
            ..Default::default()
        };
        assert!(config_message(resolve(opts)).contains("-u"));
    }

    #[test]
    fn test_format_switches_are_exclusive() {
        let opts = FilterOptions {
            sparse6: true,
            keep_labels: true,
            ..Default::default()
        };
        assert!(config_message(resolve(opts)).contains("incompatible"));
    }

    #[test]
    fn test_traces_with_sparse_mode_is_rejected() {
        let opts = FilterOptions {
            traces: true,
            sparse_mode: true,
            ..Default::default()
        };
        assert!(config_message(resolve(opts)).contains("-t"));
    }

    #[test]
    fn test_invariant_out_of_range() {
        let opts = FilterOptions {
            invariant: Some(17),
            ..Default::default()
        };
        assert!(config_message(resolve(opts)).contains("0..16"));
    }

    #[test]
    fn test_empty_temp_dir_is_rejected() {
        let opts = FilterOptions {
            temp_dir: Some(String::new()),
            ..Default::default()
        };
        assert!(config_message(resolve(opts)).contains("-T"));
    }

    #[test]
    fn test_bad_buffer_size_is_rejected() {
        let opts = FilterOptions {
            buffer_size: Some("10X".to_string()),
            ..Default::default()
        };
        assert!(config_message(resolve(opts)).contains("-Z"));
    }

    #[test]
    fn test_invariant_unsupported_in_sparse_mode() {
        let opts = FilterOptions {
            sparse_mode: true,
            invariant: Some(1),
            ..Default::default()
        };
        assert!(matches!(
            resolve(opts),
            Err(FilterError::Canon(CanonError::UnsupportedInvariant { .. }))
        ));
    }

    #[test]
    fn test_invariant_spec_from_flags() {
        let opts = FilterOptions {
            invariant: Some(8),
            levels: Some("2:4".to_string()),
            invariant_arg: Some(0),
            ..Default::default()
        };
        let config = resolve(opts).unwrap();
        assert_eq!(config.invariant.kind, Invariant::Distances);
        assert_eq!(config.invariant.min_level, 2);
        assert_eq!(config.invariant.max_level, 4);
        assert_eq!(config.invariant.arg, 0);
        assert_eq!(config.options_line(), ">A isofilter i=distances[2:4,0]");
    }

    #[test]
    fn test_level_ranges() {
        assert_eq!(parse_levels("1:3").unwrap(), (1, 3));
        assert_eq!(parse_levels("2-5").unwrap(), (2, 5));
        assert_eq!(parse_levels("4").unwrap(), (4, 4));
        assert!(parse_levels("5:2").is_err());
        assert!(parse_levels("a:b").is_err());
    }

    #[test]
    fn test_duplicates_with_keep_labels_emits_all_members() {
        let opts = FilterOptions {
            duplicates: true,
            keep_labels: true,
            ..Default::default()
        };
        let policy = resolve(opts).unwrap().policy;
        assert!(policy.only_non_trivial);
        assert!(policy.emit_all_members);
        assert!(policy.use_original_labelling);
    }

    #[test]
    fn test_single_file_is_replaced_in_place() {
        let opts = FilterOptions {
            infile: Some("graphs.g6".into()),
            ..Default::default()
        };
        let config = resolve(opts).unwrap();
        assert_eq!(config.input, InputSource::File("graphs.g6".into()));
        assert_eq!(config.output, OutputTarget::File("graphs.g6".into()));
    }

    #[test]
    fn test_dash_means_standard_streams() {
        let opts = FilterOptions {
            infile: Some("-".into()),
            outfile: Some("-".into()),
            ..Default::default()
        };
        let config = resolve(opts).unwrap();
        assert_eq!(config.input, InputSource::Stdin);
        assert_eq!(config.output, OutputTarget::Stdout);
    }

    #[test]
    fn test_count_only_discards_output() {
        let opts = FilterOptions {
            count_only: true,
            infile: Some("graphs.g6".into()),
            ..Default::default()
        };
        let config = resolve(opts).unwrap();
        assert_eq!(config.output, OutputTarget::Discard);
        assert!(config.policy.suppress_output);
    }

    #[test]
    fn test_oracle_takes_flags_over_settings() {
        let mut settings = Settings::default();
        settings.oracle.command = Some("gsort".to_string());
        settings.oracle.buffer_size = Some("1G".to_string());
        let opts = FilterOptions {
            buffer_size: Some("10%".to_string()),
            temp_dir: Some("/scratch".to_string()),
            ..Default::default()
        };
        let config = FilterConfig::resolve(&opts, &settings).unwrap();
        assert_eq!(config.oracle.args(), vec!["-s", "-k", "1,1", "-T", "/scratch", "-S", "10%"]);
        assert_eq!(config.spool_dir, Some(PathBuf::from("/scratch")));
    }

    #[test]
    fn test_options_line_lists_switches() {
        let opts = FilterOptions {
            sparse6: true,
            provenance: true,
            duplicates: true,
            partition: Some("ab".to_string()),
            infile: Some("in.s6".into()),
            outfile: Some("out.s6".into()),
            ..Default::default()
        };
        let config = resolve(opts).unwrap();
        assert_eq!(config.options_line(), ">A isofilter -svd -fab in.s6 out.s6");
    }

    #[test]
    fn test_bad_partition_is_configuration_error() {
        let opts = FilterOptions {
            partition: Some("a^".to_string()),
            ..Default::default()
        };
        config_message(resolve(opts));
    }

    #[test]
    fn test_partition_repeat_count_is_bounded() {
        let opts = FilterOptions {
            partition: Some("a^18446744073709551615".to_string()),
            ..Default::default()
        };
        let message = config_message(resolve(opts));
        assert!(message.contains("more than 1024 vertices"), "{}", message);
    }
}
