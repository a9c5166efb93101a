//! paperlens core: paper records, SQLite storage, configuration.

pub mod config;
pub mod error;
pub mod models;
pub mod storage;
pub mod text;

pub use config::{AiConfig, AppConfig, ExplorerConfig, PipelineConfig, StageGap};
pub use error::{CoreError, Result};
pub use models::*;

pub use storage::database::{ConnectionPool, open_database, open_in_memory};
pub use storage::repositories::{PaperStore, SqlitePaperStore};
