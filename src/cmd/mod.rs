//! CLI command implementations.
//!
//! | Module   | Commands handled |
//! |----------|------------------|
//! | `filter` | `Filter`         |
//! | `config` | `Config`         |

pub mod config;
pub mod filter;

pub use config::cmd_config;
pub use filter::{FilterArgs, cmd_filter};
