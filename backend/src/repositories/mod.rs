//! Data-access seam for the hosted user/organization directory.
//!
//! The session core only needs identity lookup, credential checks and
//! membership queries; everything else about the store stays behind
//! [`DirectoryRepository`].

pub mod directory;
pub mod memory;

pub use directory::*;
pub use memory::InMemoryDirectory;
