//! Per-user inference history.

mod memory;
mod store;

pub use memory::MemoryHistoryStore;
pub use store::{
    ClassProbabilities, HistoryPage, HistoryRecord, HistoryStore, HistorySummary,
};
