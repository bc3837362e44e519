use crate::catalog::{CatalogOperation, Side};
use driftwatch_config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),

    #[error("connection to {side} database {target} failed: {source}")]
    Connection {
        side: Side,
        /// Redacted connection target
        target: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("{side} catalog query failed ({operation}): {source}")]
    CatalogQuery {
        side: Side,
        operation: CatalogOperation,
        #[source]
        source: sqlx::Error,
    },
}

impl Error {
    /// The database the error concerns, if it concerns one.
    pub fn side(&self) -> Option<Side> {
        match self {
            Error::Configuration(_) => None,
            Error::Connection { side, .. } | Error::CatalogQuery { side, .. } => Some(*side),
        }
    }
}
