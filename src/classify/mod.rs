//! Grouping of the sorted key stream into isomorphism classes.

pub mod classifier;
pub mod policy;
pub mod provenance;

pub use classifier::{ClassStats, Classifier};
pub use policy::OutputPolicy;
pub use provenance::ProvenanceLog;
