use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};
use crate::config::StorageConfig;

#[derive(Clone)]
pub struct MongoConfig {
    pub options: ClientOptions,
    pub database_name: String,
}

impl MongoConfig {
    pub async fn from_uri(uri: &str, database_name: &str) -> MongoResult<Self> {
        let mut options =
            ClientOptions::parse(uri)
                .await
                .map_err(|source| MongoDaoError::InvalidUri {
                    uri: uri.to_owned(),
                    source,
                })?;
        options.app_name.get_or_insert_with(|| "noodle-judge".to_owned());

        Ok(Self {
            options,
            database_name: database_name.to_owned(),
        })
    }

    pub async fn from_storage(storage: &StorageConfig) -> MongoResult<Self> {
        Self::from_uri(&storage.mongo_uri, &storage.mongo_db).await
    }
}
