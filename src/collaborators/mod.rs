//! Boundary to the collaborators the compiler relies on but does not own
//!
//! - [`schema`]: validating author-supplied configuration documents
//! - [`loader`]: loading bundled resource files (scripts)
//! - [`writer`]: serializing rendered manifests to YAML or JSON

pub mod loader;
pub mod schema;
pub mod writer;

pub use loader::{FsResourceLoader, ResourceLoader};
pub use schema::{validate_document, SchemaValidator};
pub use writer::{manifest_to_string, write_manifest, write_manifest_file, OutputFormat};
