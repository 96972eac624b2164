// ABOUTME: Typed database URL parsing for the SQLite relational store
// ABOUTME: Distinguishes file-backed databases from the in-memory test database
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// Type-safe database location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseUrl {
    /// `SQLite` database file
    SQLite {
        /// Path to the database file
        path: PathBuf,
    },
    /// In-memory `SQLite` (tests)
    Memory,
}

impl DatabaseUrl {
    /// Parse from string with validation
    ///
    /// Accepts `sqlite:<path>`, `sqlite::memory:`, or a bare file path.
    ///
    /// # Errors
    ///
    /// Returns an error for non-`SQLite` schemes or an empty path.
    pub fn parse_url(s: &str) -> AppResult<Self> {
        let trimmed = s.trim();
        if trimmed.starts_with("postgres://") || trimmed.starts_with("postgresql://") {
            return Err(AppError::config(
                "only SQLite database URLs are supported",
            ));
        }

        let path_str = trimmed
            .strip_prefix("sqlite://")
            .or_else(|| trimmed.strip_prefix("sqlite:"))
            .unwrap_or(trimmed);

        match path_str {
            "" => Err(AppError::config("DATABASE_URL must not be empty")),
            ":memory:" => Ok(Self::Memory),
            path => Ok(Self::SQLite {
                path: PathBuf::from(path),
            }),
        }
    }

    /// Connection string understood by `sqlx`
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { path } => format!("sqlite:{}?mode=rwc", path.display()),
            Self::Memory => "sqlite::memory:".into(),
        }
    }

    /// Check if this is an in-memory database
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl Default for DatabaseUrl {
    fn default() -> Self {
        Self::SQLite {
            path: PathBuf::from("./data/blueprint.db"),
        }
    }
}

impl Display for DatabaseUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.to_connection_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants() {
        assert_eq!(DatabaseUrl::parse_url("sqlite::memory:").unwrap(), DatabaseUrl::Memory);
        assert_eq!(
            DatabaseUrl::parse_url("sqlite:./data/app.db").unwrap(),
            DatabaseUrl::SQLite {
                path: PathBuf::from("./data/app.db")
            }
        );
        assert_eq!(
            DatabaseUrl::parse_url("/var/lib/blueprint.db").unwrap(),
            DatabaseUrl::SQLite {
                path: PathBuf::from("/var/lib/blueprint.db")
            }
        );
        assert!(DatabaseUrl::parse_url("postgres://localhost/db").is_err());
        assert!(DatabaseUrl::parse_url("sqlite:").is_err());
    }

    #[test]
    fn test_file_urls_create_missing_databases() {
        let url = DatabaseUrl::parse_url("sqlite:app.db").unwrap();
        assert_eq!(url.to_connection_string(), "sqlite:app.db?mode=rwc");
    }
}
