pub mod appender;
pub mod diagnostics;
pub mod store;
pub mod strategy;

pub use appender::{AppendOptions, AppendReport, RecordAppender};
pub use diagnostics::StoreDiagnostics;
pub use store::{JsonArrayStore, LoadOutcome, Loaded, RecordStore, StoredRecord};
pub use strategy::{PersistError, WriteStrategy, default_strategies};
