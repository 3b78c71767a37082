//! # mobiview
//!
//! Assembles a single, self-contained HTML preview document from a decoded
//! MOBI/KF8 container.
//!
//! Container decoding is someone else's job: an external decoder supplies an
//! ordered list of parts (markup fragments, images, fonts, stylesheets),
//! each addressable by a stable zero-based index. This crate does the tree
//! work on top of that:
//!
//! - a mutable, namespace-aware document tree ([`Document`]) that can be
//!   queried, copied into, renamed, and serialized
//! - a path-query engine ([`Document::query`], [`QueryResult`]) for
//!   selecting and mutating nodes by ordinal position
//! - resolution of in-place `kindle:embed:NNNN` references
//!   ([`Assembler`]), merging split flow fragments back into one coherent
//!   body
//!
//! ## Quick Start
//!
//! ```
//! use mobiview::{assemble, MemoryStore};
//!
//! // Parts as handed over by the container decoder.
//! let mut store = MemoryStore::default().with_kf8(true).with_title("Demo");
//! store.push("text/html", b"<body><p>Chapter one.</p></body>".to_vec());
//! store.push("image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0]);
//!
//! let preview = assemble(&store).unwrap();
//! assert!(String::from_utf8(preview.html).unwrap().contains("Chapter one."));
//! ```
//!
//! Assembly is single-threaded and synchronous; a [`Document`] and every
//! [`QueryResult`] derived from it belong to one assembly task. Callers
//! wanting parallelism assemble independent containers on separate tasks.

pub mod assemble;
pub mod container;
pub mod dom;
pub mod error;
pub mod query;
pub(crate) mod util;

pub use assemble::{
    Assembled, Assembler, AssembleOptions, EmbedRef, ResolvedResource, assemble, EMBED_PREFIX,
};
pub use container::{MemoryStore, Part, PartKind, PartStore};
pub use dom::{Document, NodeId, NodeKind};
pub use error::{Error, Result};
pub use query::QueryResult;
