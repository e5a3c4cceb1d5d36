//! Report rendering and README splicing.

pub mod generator;
pub mod splice;
pub mod writer;

pub use generator::{bootstrap_document, generate_json_snapshot, generate_markdown_section, Identities};
pub use splice::{splice, Markers, SpliceError};
pub use writer::write_atomic;
