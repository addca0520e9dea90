//! Template renderer
//!
//! Evaluates the tags found by the scanner against a render context and
//! splices the results back into the template.

mod collection;
pub mod config;
mod template;

pub use collection::CollectionTemplates;
pub use config::RenderOptions;
pub use template::{RenderedTag, Renderer, TagOutcome};
