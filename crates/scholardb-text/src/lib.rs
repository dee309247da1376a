//! scholardb-text
//!
//! In-memory BM25 keyword index over document chunks. Built wholesale
//! from a chunk set, queried for top-k term matches alongside the vector
//! engine in hybrid retrieval.

pub mod index;

pub use index::{Bm25Config, Bm25Index, Bm25Stats};
