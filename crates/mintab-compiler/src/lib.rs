//! Mini-table compiler.
//!
//! Consumes parsed file descriptors, builds a linked schema through the
//! registry, and emits per-file C artifacts for the upb runtime: an
//! accessor header and a source file with mini-table literals and (when
//! enabled via the `fasttable` parameter) sparse fast-decode dispatch
//! tables.
//!
//! ```
//! use mintab_compiler::{Generator, GeneratorParams};
//!
//! let file: mintab_compiler::FileDescriptor = serde_json::from_str(
//!     r#"{"name": "hello.proto", "messages": [{"name": "Hello"}]}"#,
//! ).unwrap();
//! let params = GeneratorParams::parse("fasttable").unwrap();
//!
//! let (mut header, mut source) = (Vec::new(), Vec::new());
//! Generator::new()
//!     .generate(&file, &params, &mut header, &mut source)
//!     .unwrap();
//! assert!(String::from_utf8(header).unwrap().contains("Hello_new"));
//! ```

pub mod descriptor;
pub mod emit;
pub mod fasttable;
pub mod file_layout;
pub mod minitable;
pub mod names;
pub mod params;
pub mod schema;

mod error;
mod generator;

#[cfg(test)]
mod minitable_tests;

pub use descriptor::{FileDescriptor, Syntax};
pub use error::GenError;
pub use generator::Generator;
pub use params::GeneratorParams;
