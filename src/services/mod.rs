pub mod history;
pub mod signals;

pub use history::HistoryStore;
pub use signals::{CompositeScorer, SignalEngine};
