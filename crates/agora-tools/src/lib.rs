//! # Agora Tools
//!
//! - [`catalogue`]: descriptors of the builtin tools seeded into every actor
//! - [`calculator`]: sanitized arithmetic evaluation for the `calculator` tool
//! - [`handler`]: the [`ToolHandler`] trait and [`HandlerRegistry`] for
//!   tools registered at runtime

pub mod calculator;
pub mod catalogue;
pub mod handler;

pub use calculator::{INVALID_EXPRESSION, evaluate};
pub use catalogue::{builtin_descriptor, builtin_registry};
pub use handler::{ExecutionResult, FnHandler, HandlerRegistry, ToolHandler};
