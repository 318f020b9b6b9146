//! Document model (Intermediate Representation).
//!
//! This module defines the format-neutral tree that sits between source
//! adapters and renderers. A [`Document`] is built once and then only read.

mod document;
mod node;

pub use document::*;
pub use node::*;
