//! Application-facing handle over the sync engine.

use std::sync::Arc;

use letras_core::content::{CachedStory, GameDataEntry};
use letras_core::envelope::CacheEnvelope;
use letras_core::policy::STORY_RETENTION;
use letras_core::profile::{ChildSummary, ProfileSnapshot};
use letras_core::progress::{NewProgress, ProgressRecord};
use letras_core::types::DbId;
use letras_db::repositories::{GameDataRepo, ProgressRepo, StoryRepo};
use letras_db::Partition;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::context::SyncContext;
use crate::error::SyncError;
use crate::outbox::Outbox;
use crate::reader::{CacheAsideReader, CacheSlot};
use crate::reconciler::{DrainOutcome, Reconciler};
use crate::remote::RemoteError;
use crate::writer::{WriteBehindWriter, WriteOutcome};

/// Snapshot of the engine's sync state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub online: bool,
    pub is_syncing: bool,
    /// Mutations waiting in the outbox.
    pub pending: usize,
}

/// One handle per process, built at startup and shared via `Arc`.
pub struct OfflineClient {
    ctx: SyncContext,
    outbox: Outbox,
    reader: CacheAsideReader,
    writer: WriteBehindWriter,
    reconciler: Arc<Reconciler>,
}

impl OfflineClient {
    pub fn new(ctx: SyncContext) -> Self {
        let outbox = Outbox::new(Arc::clone(&ctx.store), Arc::clone(&ctx.clock));
        let reader = CacheAsideReader::new(&ctx);
        let writer = WriteBehindWriter::new(&ctx, outbox.clone());
        let reconciler = Arc::new(Reconciler::new(&ctx, outbox.clone()));
        Self {
            ctx,
            outbox,
            reader,
            writer,
            reconciler,
        }
    }

    /// The reconciler, for spawning its trigger loop.
    pub fn reconciler(&self) -> Arc<Reconciler> {
        Arc::clone(&self.reconciler)
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    // -- Progress -------------------------------------------------------------

    /// Record a finished game session. Only invalid input is an error.
    pub async fn save_progress(
        &self,
        child_id: DbId,
        input: NewProgress,
    ) -> Result<WriteOutcome, SyncError> {
        input.validate()?;
        Ok(self.writer.save_progress(child_id, input).await)
    }

    pub async fn progress_history(&self, child_id: DbId) -> Result<Vec<ProgressRecord>, SyncError> {
        Ok(ProgressRepo::list_for_child(self.ctx.store.as_ref(), child_id).await?)
    }

    pub async fn unsynced_progress(&self) -> Result<Vec<ProgressRecord>, SyncError> {
        Ok(ProgressRepo::list_unsynced(self.ctx.store.as_ref()).await?)
    }

    // -- Cache-aside reads ----------------------------------------------------

    pub async fn child_profile(
        &self,
        child_id: DbId,
    ) -> Result<CacheEnvelope<ProfileSnapshot>, SyncError> {
        let url = self.ctx.routes.child_profile(child_id);
        self.reader
            .read(&CacheSlot::child_profile(child_id), || self.fetch(url))
            .await
    }

    /// Children of the signed-in parent.
    pub async fn children(&self) -> Result<CacheEnvelope<Vec<ChildSummary>>, SyncError> {
        let url = self.ctx.routes.children();
        self.reader
            .read(&CacheSlot::children(), || self.fetch(url))
            .await
    }

    async fn fetch<T: DeserializeOwned>(&self, url: String) -> Result<T, RemoteError> {
        let token = self.ctx.credentials.bearer_token();
        let body = self.ctx.remote.get_json(&url, token.as_deref()).await?;
        Ok(serde_json::from_value(body)?)
    }

    // -- Stories --------------------------------------------------------------

    pub async fn cache_story(&self, story: &CachedStory) -> Result<(), SyncError> {
        Ok(StoryRepo::upsert(self.ctx.store.as_ref(), story).await?)
    }

    pub async fn cached_stories(&self, age_group: Option<&str>) -> Result<Vec<CachedStory>, SyncError> {
        Ok(StoryRepo::list(self.ctx.store.as_ref(), age_group).await?)
    }

    /// Delete stories cached longer than [`STORY_RETENTION`]. Returns how
    /// many were removed.
    pub async fn purge_expired_stories(&self) -> Result<usize, SyncError> {
        let now = self.ctx.clock.now();
        Ok(StoryRepo::delete_expired(self.ctx.store.as_ref(), now, STORY_RETENTION).await?)
    }

    // -- Game data ------------------------------------------------------------

    pub async fn save_game_data(&self, key: &str, value: serde_json::Value) -> Result<(), SyncError> {
        let now = self.ctx.clock.now();
        Ok(GameDataRepo::save(self.ctx.store.as_ref(), key, value, now).await?)
    }

    pub async fn game_data(&self, key: &str) -> Result<Option<GameDataEntry>, SyncError> {
        Ok(GameDataRepo::find(self.ctx.store.as_ref(), key).await?)
    }

    // -- Sync -----------------------------------------------------------------

    /// Drain the outbox now, unless a drain is already running or the
    /// device is offline.
    pub async fn sync_now(&self) -> Result<DrainOutcome, SyncError> {
        Ok(self.reconciler.drain().await?)
    }

    pub async fn sync_status(&self) -> Result<SyncStatus, SyncError> {
        Ok(SyncStatus {
            online: self.ctx.connectivity.is_online(),
            is_syncing: self.reconciler.is_syncing(),
            pending: self.outbox.len().await?,
        })
    }

    /// Wipe every partition, pending mutations included. Used on logout.
    pub async fn clear_all(&self) -> Result<(), SyncError> {
        for partition in Partition::ALL {
            self.ctx.store.clear(partition).await?;
        }
        tracing::info!("Local store cleared");
        Ok(())
    }
}
