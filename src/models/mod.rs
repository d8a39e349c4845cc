//! Domain models for notevault.
//!
//! # Core Concepts
//!
//! - [`Item`]: a folder or a document. Folders nest other items, forming an
//!   ordered forest; documents carry free-form text.
//! - [`ItemKind`]: the folder/document discriminator, fixed when an item is created.
//!
//! The forest as a whole, with its recursive operations, lives in [`crate::store`].

mod item;

pub use item::*;
