mod config;
mod connection;
mod error;
mod models;
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoContestStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::InvalidSetting { key, value } => StorageError::InvalidDocument {
                collection: "settings",
                message: format!("`{key}` holds out-of-range value {value}"),
            },
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
