mod paper_repository;

pub use paper_repository::{PaperStore, SqlitePaperStore};
