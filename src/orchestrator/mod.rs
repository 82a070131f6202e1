pub mod oracle;
pub mod pipeline;

pub use oracle::{DEFAULT_SORT_COMMAND, OracleCommand, OracleProcess};
pub use pipeline::{Pipeline, RunSummary};
