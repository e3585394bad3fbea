pub mod config;
pub mod error;
pub mod record;

pub use config::FormdropConfig;
pub use error::AppendError;
pub use record::{ClientInfo, FormFields, Record, UNKNOWN};
