//! Sampling engine
//!
//! - `table`: per-pid entries, reconcile and finalize
//! - `metrics`: CPU and memory share formulas
//! - `sampler`: one tick of enumerate, ingest and finalize
//! - `ranker`: ordered, bounded rows for rendering

pub mod metrics;
pub mod ranker;
pub mod sampler;
pub mod table;

pub use ranker::{ProcessRow, RankSettings, Ranker, SortColumn, SortOrder};
pub use sampler::{Phase, Sampler, TickSummary};
pub use table::{ProcessEntry, ProcessIdentity, ProcessSample, ProcessTable, SystemCounters};
