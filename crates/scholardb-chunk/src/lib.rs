//! scholardb-chunk
//!
//! Section-aware semantic chunking for long documents: recursive
//! splitting with overlap stitching, plus metadata enrichment (pages,
//! section correction, hierarchical ids, optional semantic tags).

pub mod chunker;
pub mod enricher;
pub mod overlap;

pub use chunker::{ChunkerConfig, SemanticChunker};
pub use enricher::{EnricherConfig, MetadataEnricher};
pub use overlap::{OverlapConfig, OverlapManager, OverlapStats};
