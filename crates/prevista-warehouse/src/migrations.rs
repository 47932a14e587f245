use ::duckdb::{Connection, ToSql};

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_historico_acoes",
        sql: r#"
CREATE TABLE IF NOT EXISTS historico_acoes (
    InfoDate DATE NOT NULL,
    Ticker VARCHAR NOT NULL,
    OpenPrice DOUBLE,
    ClosePrice DOUBLE,
    HighPrice DOUBLE,
    LowPrice DOUBLE,
    Volume DOUBLE,
    PRIMARY KEY(Ticker, InfoDate)
);
"#,
    },
    Migration {
        version: "0002_ticker_model",
        sql: r#"
CREATE TABLE IF NOT EXISTS ticker_model (
    ticker VARCHAR PRIMARY KEY,
    model_path VARCHAR NOT NULL,
    updated_at TIMESTAMP NOT NULL
);
"#,
    },
];

/// Apply every migration not yet recorded in `schema_migrations`.
pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version VARCHAR PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let params: [&dyn ToSql; 1] = [&migration.version];
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            params.as_slice(),
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                params.as_slice(),
            )?;
        }
    }

    Ok(())
}
