use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Document, doc},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoPostingFlagDocument, MongoSettingDocument, question_id, score_user, unused_filter,
        unused_question_id,
    },
};
use crate::dao::{
    contest_store::ContestStore,
    models::{ScoreRecordEntity, TriviaQuestionEntity},
    storage::StorageResult,
};
use crate::state::community::Community;

const TRIVIA_COLLECTION_NAME: &str = "trivia";
const POINTS_COLLECTION_NAME: &str = "points";
const POSTING_FLAG_COLLECTION_NAME: &str = "on";
const SETTINGS_COLLECTION_NAME: &str = "settings";
const COOLDOWN_SETTING_KEY: &str = "cd";

/// MongoDB-backed [`ContestStore`].
#[derive(Clone)]
pub struct MongoContestStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoContestStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let trivia = database.collection::<Document>(TRIVIA_COLLECTION_NAME);
        let indexes = [
            (
                IndexModel::builder()
                    .keys(doc! { "id": 1 })
                    .options(
                        IndexOptions::builder()
                            .name(Some("trivia_id_idx".to_owned()))
                            .unique(Some(true))
                            .build(),
                    )
                    .build(),
                "id",
            ),
            (
                IndexModel::builder()
                    .keys(doc! { "used": 1 })
                    .options(
                        IndexOptions::builder()
                            .name(Some("trivia_used_idx".to_owned()))
                            .build(),
                    )
                    .build(),
                "used",
            ),
        ];
        for (model, index) in indexes {
            trivia
                .create_index(model)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection: TRIVIA_COLLECTION_NAME,
                    index,
                    source,
                })?;
        }

        // Unique so concurrent upserts for a new user converge on one record.
        let points = database.collection::<Document>(POINTS_COLLECTION_NAME);
        let user_index = IndexModel::builder()
            .keys(doc! { "user": 1 })
            .options(
                IndexOptions::builder()
                    .name(Some("points_user_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        points
            .create_index(user_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: POINTS_COLLECTION_NAME,
                index: "user",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn trivia(&self) -> Collection<TriviaQuestionEntity> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<TriviaQuestionEntity>(TRIVIA_COLLECTION_NAME)
    }

    async fn points(&self) -> Collection<ScoreRecordEntity> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<ScoreRecordEntity>(POINTS_COLLECTION_NAME)
    }

    async fn posting_flag(&self) -> Collection<MongoPostingFlagDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoPostingFlagDocument>(POSTING_FLAG_COLLECTION_NAME)
    }

    async fn settings(&self) -> Collection<MongoSettingDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoSettingDocument>(SETTINGS_COLLECTION_NAME)
    }

    async fn insert_question(&self, question: TriviaQuestionEntity) -> MongoResult<()> {
        let id = question.id.clone();
        self.trivia()
            .await
            .insert_one(&question)
            .await
            .map_err(|source| MongoDaoError::InsertQuestion { id, source })?;
        Ok(())
    }

    async fn find_question(&self, id: String) -> MongoResult<Option<TriviaQuestionEntity>> {
        self.trivia()
            .await
            .find_one(question_id(&id))
            .await
            .map_err(|source| MongoDaoError::LoadQuestion { id, source })
    }

    async fn list_questions_matching(
        &self,
        filter: Document,
    ) -> MongoResult<Vec<TriviaQuestionEntity>> {
        self.trivia()
            .await
            .find(filter)
            .await
            .map_err(|source| MongoDaoError::ListQuestions { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListQuestions { source })
    }

    async fn claim_question(&self, id: String) -> MongoResult<bool> {
        let claimed = self
            .trivia()
            .await
            .find_one_and_update(unused_question_id(&id), doc! { "$set": { "used": true } })
            .await
            .map_err(|source| MongoDaoError::ClaimQuestion {
                id: id.clone(),
                source,
            })?;

        if claimed.is_none() {
            debug!(%id, "trivia question already claimed or missing");
        }
        Ok(claimed.is_some())
    }

    async fn delete_question(&self, id: String) -> MongoResult<bool> {
        let result = self
            .trivia()
            .await
            .delete_one(question_id(&id))
            .await
            .map_err(|source| MongoDaoError::DeleteQuestion { id, source })?;
        Ok(result.deleted_count > 0)
    }

    async fn find_score(&self, user: u64) -> MongoResult<Option<ScoreRecordEntity>> {
        self.points()
            .await
            .find_one(score_user(user))
            .await
            .map_err(|source| MongoDaoError::LoadScore { user, source })
    }

    async fn list_scores(&self) -> MongoResult<Vec<ScoreRecordEntity>> {
        self.points()
            .await
            .find(doc! {})
            .await
            .map_err(|source| MongoDaoError::ListScores { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListScores { source })
    }

    async fn update_score(&self, user: u64, update: Document) -> MongoResult<()> {
        self.points()
            .await
            .update_one(score_user(user), update)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::UpdateScore { user, source })?;
        Ok(())
    }

    async fn posting_enabled(&self) -> MongoResult<bool> {
        let flag = self
            .posting_flag()
            .await
            .find_one(doc! { "on": true })
            .await
            .map_err(|source| MongoDaoError::LoadSetting {
                key: POSTING_FLAG_COLLECTION_NAME,
                source,
            })?;
        Ok(flag.is_some_and(|flag| flag.on))
    }

    async fn set_posting_enabled(&self, enabled: bool) -> MongoResult<()> {
        self.posting_flag()
            .await
            .update_one(doc! {}, doc! { "$set": { "on": enabled } })
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveSetting {
                key: POSTING_FLAG_COLLECTION_NAME,
                source,
            })?;
        Ok(())
    }

    async fn cooldown_minutes(&self) -> MongoResult<Option<u32>> {
        let setting = self
            .settings()
            .await
            .find_one(doc! { "key": COOLDOWN_SETTING_KEY })
            .await
            .map_err(|source| MongoDaoError::LoadSetting {
                key: COOLDOWN_SETTING_KEY,
                source,
            })?;

        setting
            .map(|setting| {
                u32::try_from(setting.value).map_err(|_| MongoDaoError::InvalidSetting {
                    key: COOLDOWN_SETTING_KEY,
                    value: setting.value,
                })
            })
            .transpose()
    }

    async fn set_cooldown_minutes(&self, minutes: u32) -> MongoResult<()> {
        self.settings()
            .await
            .update_one(
                doc! { "key": COOLDOWN_SETTING_KEY },
                doc! { "$set": { "value": i64::from(minutes) } },
            )
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveSetting {
                key: COOLDOWN_SETTING_KEY,
                source,
            })?;
        Ok(())
    }
}

impl ContestStore for MongoContestStore {
    fn insert_question(
        &self,
        question: TriviaQuestionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_question(question).await.map_err(Into::into) })
    }

    fn find_question(
        &self,
        id: String,
    ) -> BoxFuture<'static, StorageResult<Option<TriviaQuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_question(id).await.map_err(Into::into) })
    }

    fn list_questions(&self) -> BoxFuture<'static, StorageResult<Vec<TriviaQuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_questions_matching(doc! {})
                .await
                .map_err(Into::into)
        })
    }

    fn list_unused_questions(
        &self,
    ) -> BoxFuture<'static, StorageResult<Vec<TriviaQuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_questions_matching(unused_filter())
                .await
                .map_err(Into::into)
        })
    }

    fn claim_question(&self, id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.claim_question(id).await.map_err(Into::into) })
    }

    fn delete_question(&self, id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_question(id).await.map_err(Into::into) })
    }

    fn find_score(
        &self,
        user: u64,
    ) -> BoxFuture<'static, StorageResult<Option<ScoreRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_score(user).await.map_err(Into::into) })
    }

    fn list_scores(&self) -> BoxFuture<'static, StorageResult<Vec<ScoreRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_scores().await.map_err(Into::into) })
    }

    fn increment_score(
        &self,
        user: u64,
        community: Community,
        amount: f64,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut increment = Document::new();
            increment.insert(community.field(), amount);
            store
                .update_score(user, doc! { "$inc": increment })
                .await
                .map_err(Into::into)
        })
    }

    fn set_disqualified(
        &self,
        user: u64,
        disqualified: bool,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_score(user, doc! { "$set": { "dq": disqualified } })
                .await
                .map_err(Into::into)
        })
    }

    fn posting_enabled(&self) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.posting_enabled().await.map_err(Into::into) })
    }

    fn set_posting_enabled(&self, enabled: bool) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.set_posting_enabled(enabled).await.map_err(Into::into) })
    }

    fn cooldown_minutes(&self) -> BoxFuture<'static, StorageResult<Option<u32>>> {
        let store = self.clone();
        Box::pin(async move { store.cooldown_minutes().await.map_err(Into::into) })
    }

    fn set_cooldown_minutes(&self, minutes: u32) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .set_cooldown_minutes(minutes)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
