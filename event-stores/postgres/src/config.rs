//! Environment-driven configuration for the PostgreSQL backend.

use envconfig::Envconfig;

/// Configuration read from the process environment.
///
/// The table name is the only knob `venty-postgres` exposes: everything
/// else (pooling, TLS, connection string) is the caller's
/// responsibility, supplied directly as a `bb8` pool to
/// [`crate::EventStoreBuilder`].
#[derive(Debug, Clone, Envconfig)]
pub struct Config {
    /// Overrides the name of the table events are recorded into.
    #[envconfig(from = "VENTY_SQL_RECORDED_EVENTS_TABLE_NAME", default = "venty_recorded_events_v2")]
    pub recorded_events_table_name: String,
}

impl Config {
    /// Validates that the configured table name is safe to interpolate
    /// into SQL: migrations and queries build the table name into the
    /// statement text, since `tokio_postgres` has no parameter
    /// placeholder for identifiers.
    pub fn validate(&self) -> Result<(), InvalidTableName> {
        let name = &self.recorded_events_table_name;
        let is_valid = !name.is_empty()
            && name.len() <= 63
            && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

        if is_valid {
            Ok(())
        } else {
            Err(InvalidTableName(name.clone()))
        }
    }
}

/// The configured table name is not a valid, unquoted PostgreSQL
/// identifier.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0:?} is not a valid table name")]
pub struct InvalidTableName(String);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_table_name_is_valid() {
        let config = Config {
            recorded_events_table_name: "venty_recorded_events_v2".to_string(),
        };

        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_names_that_could_break_out_of_the_identifier() {
        let config = Config {
            recorded_events_table_name: "events; drop table users;--".to_string(),
        };

        assert!(config.validate().is_err());
    }
}
