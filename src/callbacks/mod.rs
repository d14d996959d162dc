mod callback;
pub mod checkpoint;
pub mod history;
pub mod storage;

pub use callback::{apply_callbacks, Callback, Process};
pub use checkpoint::{CheckPoint, CheckPointState, Checkpoint};
pub use history::HistoryLogger;
