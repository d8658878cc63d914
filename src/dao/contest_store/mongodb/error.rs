use mongodb::error::Error as MongoError;
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to insert trivia question `{id}`")]
    InsertQuestion {
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to load trivia question `{id}`")]
    LoadQuestion {
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to list trivia questions")]
    ListQuestions {
        #[source]
        source: MongoError,
    },
    #[error("failed to claim trivia question `{id}`")]
    ClaimQuestion {
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete trivia question `{id}`")]
    DeleteQuestion {
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to load score record for user `{user}`")]
    LoadScore {
        user: u64,
        #[source]
        source: MongoError,
    },
    #[error("failed to list score records")]
    ListScores {
        #[source]
        source: MongoError,
    },
    #[error("failed to update score record for user `{user}`")]
    UpdateScore {
        user: u64,
        #[source]
        source: MongoError,
    },
    #[error("failed to load setting `{key}`")]
    LoadSetting {
        key: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to save setting `{key}`")]
    SaveSetting {
        key: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("setting `{key}` holds out-of-range value {value}")]
    InvalidSetting { key: &'static str, value: i64 },
}
