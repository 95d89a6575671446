//! Validation rules, one per file
//!
//! - `missing_entrypoint.rs` - no entrypoint, or one naming nothing
//! - `unreachable_template.rs` - templates the entrypoint never reaches
//! - `unused_input.rs` - inputs a template declares but never reads
//! - `empty_body.rs` - steps/DAG templates with nothing to run

mod empty_body;
mod missing_entrypoint;
mod unreachable_template;
mod unused_input;

pub use empty_body::EmptyBodyRule;
pub use missing_entrypoint::MissingEntrypointRule;
pub use unreachable_template::UnreachableTemplateRule;
pub use unused_input::UnusedInputRule;
