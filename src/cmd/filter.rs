//! The filter run: `isofilter filter`.

use anyhow::{Context, Result};
use clap::Args;
use isofilter::classify::Classifier;
use isofilter::codec::ScannedInput;
use isofilter::config::{FilterConfig, FilterOptions, InputSource, OutputTarget};
use isofilter::encoder::CanonicalEncoder;
use isofilter::orchestrator::Pipeline;
use isofilter::settings::Settings;
use isofilter::sink::OutputSink;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// Suppress the auxiliary >A and >Z lines
    #[arg(short, long)]
    pub quiet: bool,

    /// Write a provenance log to stderr: for each class of two or more
    /// graphs, the output index followed by the input indices of its members
    #[arg(short = 'v', long)]
    pub provenance: bool,

    /// Write graphs in their input labelling instead of canonical labelling
    #[arg(short, long)]
    pub keep_labels: bool,

    /// Only write classes containing two or more graphs
    #[arg(short, long)]
    pub duplicates: bool,

    /// Write every member of each class, not one representative
    #[arg(short, long)]
    pub all_members: bool,

    /// Write nothing; just count
    #[arg(short = 'u', long)]
    pub count_only: bool,

    /// Force sparse6 output
    #[arg(short = 's', long)]
    pub sparse6: bool,

    /// Force graph6 output
    #[arg(short = 'g', long)]
    pub graph6: bool,

    /// Force digraph6 output
    #[arg(short = 'z', long)]
    pub digraph6: bool,

    /// Canonicalise in sparse mode
    #[arg(short = 'S', long)]
    pub sparse_mode: bool,

    /// Canonicalise in traces mode (undirected, loop-free graphs only)
    #[arg(short = 't', long)]
    pub traces: bool,

    /// Vertex invariant to use, 0..16
    #[arg(short = 'i', long, value_name = "N")]
    pub invariant: Option<u32>,

    /// Search levels at which the invariant is applied, as MIN:MAX
    #[arg(short = 'I', long, value_name = "MIN:MAX")]
    pub levels: Option<String>,

    /// Invariant argument
    #[arg(short = 'K', long, value_name = "N", allow_negative_numbers = true)]
    pub invariant_arg: Option<i32>,

    /// Initial vertex colouring, one character per vertex
    #[arg(short = 'f', long, value_name = "COLOURS", allow_hyphen_values = true)]
    pub partition: Option<String>,

    /// Temporary directory for the sort process
    #[arg(short = 'T', long, value_name = "DIR")]
    pub temp_dir: Option<String>,

    /// Memory budget for the sort process, e.g. 64M or 50%
    #[arg(short = 'Z', long, value_name = "SIZE")]
    pub buffer_size: Option<String>,

    /// Input file ("-" or absent for stdin)
    pub infile: Option<PathBuf>,

    /// Output file ("-" for stdout); defaults to INFILE
    pub outfile: Option<PathBuf>,
}

impl From<FilterArgs> for FilterOptions {
    fn from(args: FilterArgs) -> Self {
        FilterOptions {
            quiet: args.quiet,
            provenance: args.provenance,
            keep_labels: args.keep_labels,
            duplicates: args.duplicates,
            all_members: args.all_members,
            count_only: args.count_only,
            sparse6: args.sparse6,
            graph6: args.graph6,
            digraph6: args.digraph6,
            sparse_mode: args.sparse_mode,
            traces: args.traces,
            invariant: args.invariant,
            levels: args.levels,
            invariant_arg: args.invariant_arg,
            partition: args.partition,
            temp_dir: args.temp_dir,
            buffer_size: args.buffer_size,
            infile: args.infile,
            outfile: args.outfile,
        }
    }
}

pub async fn cmd_filter(args: FilterArgs, settings_path: Option<&Path>) -> Result<()> {
    let settings = Settings::load_or_default(settings_path)?;
    let config = FilterConfig::resolve(&args.into(), &settings)?;
    if !config.quiet {
        eprintln!("{}", config.options_line());
    }

    let scanned = match &config.input {
        InputSource::Stdin => {
            ScannedInput::scan_reader(std::io::stdin().lock(), config.spool_dir.as_deref())?
        }
        InputSource::File(path) => ScannedInput::scan_path(path, config.spool_dir.as_deref())?,
    };
    let format = scanned.resolve_format(config.format);
    if scanned.has_directed && config.format.is_some_and(|f| f != format) {
        tracing::warn!(%format, "directed input graph, output format overridden");
    }
    let header = scanned.header.map(|input_header| {
        if config.policy.use_original_labelling {
            input_header
        } else {
            format
        }
    });

    let encoder = CanonicalEncoder::new(
        config.canonicalizer(),
        config.partition.clone(),
        config.invariant,
        format,
    )?;
    let pipeline = Pipeline::new(encoder, config.oracle.clone(), &config.policy);

    let cancel = pipeline.cancellation_token();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("interrupted");
            cancel.cancel();
        }
    });

    let mut sink = OutputSink::open(&config.output)?;
    if let Some(header) = header
        && config.output != OutputTarget::Discard
    {
        sink.write_all(header.header().as_bytes())
            .context("can't write output header")?;
    }

    let records = scanned.open(config.max_vertices)?;
    let mut classifier = Classifier::new(config.policy, sink).with_log(std::io::stderr());
    let result = pipeline.run(records, &mut classifier).await;
    ctrl_c.abort();
    let summary = result?;

    let (sink, _) = classifier.into_parts();
    sink.commit()?;

    if !config.quiet {
        eprintln!(
            ">Z {} graphs read from {}",
            summary.num_read,
            config.input.name()
        );
        if config.output == OutputTarget::Discard {
            eprintln!(">Z {} graphs produced", summary.num_written());
        } else {
            eprintln!(
                ">Z {} graphs written to {}",
                summary.num_written(),
                config.output.name()
            );
        }
    }
    Ok(())
}
