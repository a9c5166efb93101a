mod connection;
mod migrations;
mod schema;

pub use connection::ConnectionPool;
pub use migrations::{Migration, get_applied_versions, run_migrations};
pub use schema::SCHEMA_VERSION;

use std::path::Path;

use crate::error::Result;

pub fn open_database(path: &Path) -> Result<ConnectionPool> {
    let pool = ConnectionPool::open(path)?;
    {
        let conn = pool.get_connection();
        migrations::run_migrations(&conn)?;
    }
    Ok(pool)
}

pub fn open_in_memory() -> Result<ConnectionPool> {
    let pool = ConnectionPool::open_in_memory()?;
    {
        let conn = pool.get_connection();
        migrations::run_migrations(&conn)?;
    }
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_recorded_once() {
        let pool = open_in_memory().unwrap();
        let conn = pool.get_connection();
        run_migrations(&conn).unwrap();
        assert_eq!(get_applied_versions(&conn).unwrap(), vec![SCHEMA_VERSION]);
    }

    #[test]
    fn on_disk_database_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("papers.db");
        open_database(&path).unwrap();
        assert!(path.exists());
    }
}
