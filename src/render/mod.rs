//! Template rendering.
//!
//! | Piece | Role |
//! |---|---|
//! | [`TemplateEngine`] | Capability the generator drives, one call per target |
//! | [`RenderContext`] | Explicit per-target state: paths, diagnostic stack, dependency buffer |
//! | [`Scope`] | Immutable layered variables handed down through nested renders |
//! | [`PlaceholderEngine`] | Built-in engine: `{{ var }}` and `{{> partial }}` |
//!
//! The module is split into:
//! - **Engine**: the trait, request, context and error types
//! - **Scope**: variable lookup, no I/O (unit testable)
//! - **Placeholder**: the engine shipped with the binary

pub mod engine;
mod placeholder;
mod scope;

pub use engine::{Dependency, RenderContext, RenderError, RenderRequest, TemplateEngine};
pub use placeholder::PlaceholderEngine;
pub use scope::Scope;
