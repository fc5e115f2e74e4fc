//! Core primitives shared by the mintab schema registry and compiler.
//!
//! Three small pieces:
//! - [`IntTable`]: an integer-keyed table with a dense fast-lookup path for
//!   small keys and a hashed fallback for the rest.
//! - [`wire`]: wire-format tag math (wire types, encoded tags, fast-table
//!   slot computation).
//! - [`ident`]: C identifier helpers for emitted code.

pub mod ident;
pub mod wire;

mod inttable;

pub use inttable::IntTable;
