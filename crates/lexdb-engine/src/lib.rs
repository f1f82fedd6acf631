//! lexdb-engine
//!
//! Ingestion and three-tier retrieval over document chunks: the exact index
//! when it is available, then term frequency, then prefix matching. Exactly
//! one tier answers each query.
pub mod context;
pub mod engine;
pub mod orchestrator;
pub mod store;
pub mod tier;

pub use context::{build_context, format_reference};
pub use engine::{SearchEngine, SearchResponse};
pub use orchestrator::{SearchOrchestrator, SearchOutcome, TierStatus};
pub use store::{ChunkStore, StoredChunk};
pub use tier::{ExactTier, FrequencyTier, PrefixTier, SearchTier, TierOutcome};
