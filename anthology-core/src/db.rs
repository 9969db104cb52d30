use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::error::RecordError;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("../migrations");

/// Open the SQLite database and run pending migrations.
pub fn establish(database_url: &str) -> Result<SqliteConnection, RecordError> {
    let mut conn = SqliteConnection::establish(database_url)?;

    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| RecordError::Migration(e.to_string()))?;

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_establish_in_memory_runs_migrations() {
        use crate::schema::recommendations::dsl::*;

        let mut conn = establish(":memory:").unwrap();
        let count: i64 = recommendations.count().get_result(&mut conn).unwrap();
        assert_eq!(count, 0);
    }
}
