//! Retrieval orchestration.
//!
//! - [`RetrievalOrchestrator`] sequences search → expansion → rerank →
//!   truncate; built with [`OrchestratorBuilder`].
//! - [`CachedPipeline`] puts the [`ResultCache`](crate::ResultCache) and
//!   answer generation around it.
//! - [`rerank`] holds the score conversion and the alignment-rebuilding
//!   reorder.

mod builder;
mod cached;
mod orchestrator;
pub mod rerank;

pub use builder::{DEFAULT_TOP_K, OrchestratorBuilder};
pub use cached::{Answer, CachedPipeline};
pub use orchestrator::{OVERFETCH_FACTOR, RetrievalOrchestrator};
pub use rerank::{apply_rerank, score_to_distance};
