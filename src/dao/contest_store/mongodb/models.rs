use mongodb::bson::{Document, doc};
use serde::{Deserialize, Serialize};

/// Singleton document in the `on` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPostingFlagDocument {
    #[serde(default)]
    pub on: bool,
}

/// Key/value document in the `settings` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSettingDocument {
    pub key: String,
    pub value: i64,
}

pub fn question_id(id: &str) -> Document {
    doc! { "id": id }
}

/// Matches the question `id` only while it is still unused.
pub fn unused_question_id(id: &str) -> Document {
    doc! { "id": id, "used": { "$ne": true } }
}

/// Matches questions that were never posted, including legacy documents without `used`.
pub fn unused_filter() -> Document {
    doc! { "used": { "$ne": true } }
}

pub fn score_user(user: u64) -> Document {
    doc! { "user": user.to_string() }
}
