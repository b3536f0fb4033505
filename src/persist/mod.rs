//! Relational persistence for collected records
//!
//! One table, `fipe_carros`, written through the sqlx `Any` driver so the
//! same code targets PostgreSQL in production and SQLite in tests.

pub mod writer;

pub use writer::{FipeWriter, WriteReport, BATCH_SIZE, TABLE_NAME};

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Pool could not be opened
    #[error("database connection failed: {0}")]
    Connect(String),

    /// URL scheme is neither PostgreSQL nor SQLite
    #[error("unsupported database URL scheme: {0}")]
    UnsupportedDatabase(String),

    /// DDL failed
    #[error("schema creation failed: {0}")]
    Schema(String),

    /// A batch could not be written
    #[error("batch {batch} failed: {message}")]
    Batch {
        /// 1-based batch number
        batch: usize,
        /// Driver message
        message: String,
    },

    /// Ad-hoc query failed
    #[error("query failed: {0}")]
    Query(String),
}

/// Database flavour behind a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// `postgres://`, `postgresql://`, `postgresql+driver://`
    Postgres,
    /// `sqlite:`
    Sqlite,
}

impl Backend {
    /// Detect the backend and return the URL in the form sqlx expects.
    ///
    /// SQLAlchemy driver suffixes (`postgresql+psycopg2://`) are stripped.
    /// File-backed SQLite URLs get `mode=rwc` so the file is created on first
    /// use.
    pub fn detect(url: &str) -> Result<(Backend, String), PersistError> {
        let url = url.trim();
        let (scheme, rest) = url
            .split_once(':')
            .ok_or_else(|| PersistError::UnsupportedDatabase(url.to_string()))?;
        let base_scheme = scheme.split('+').next().unwrap_or(scheme).to_ascii_lowercase();

        match base_scheme.as_str() {
            "postgres" | "postgresql" => Ok((Backend::Postgres, format!("postgresql:{rest}"))),
            "sqlite" => {
                let normalized = format!("sqlite:{rest}");
                if rest.contains(":memory:") || rest.contains("mode=") {
                    Ok((Backend::Sqlite, normalized))
                } else if rest.contains('?') {
                    Ok((Backend::Sqlite, format!("{normalized}&mode=rwc")))
                } else {
                    Ok((Backend::Sqlite, format!("{normalized}?mode=rwc")))
                }
            }
            _ => Err(PersistError::UnsupportedDatabase(scheme.to_string())),
        }
    }

    /// DDL for the auto-increment id column
    pub fn id_column(&self) -> &'static str {
        match self {
            Backend::Postgres => "id SERIAL PRIMARY KEY",
            Backend::Sqlite => "id INTEGER PRIMARY KEY AUTOINCREMENT",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Postgres => f.write_str("postgresql"),
            Backend::Sqlite => f.write_str("sqlite"),
        }
    }
}

/// Drop the password from a URL before it reaches a log line
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.split_once('@') {
        Some((credentials, host)) => {
            let user = credentials.split(':').next().unwrap_or_default();
            format!("{scheme}://{user}:***@{host}")
        }
        None => url.to_string(),
    }
}
