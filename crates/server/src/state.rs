use std::sync::Arc;

use axum::extract::FromRef;
use tethered_core::blob::BlobStore;
use tethered_core::{DayClock, EventHub};
use tethered_store::{
    ConnectionManager, DailyPrompts, Db, InviteService, LocalBlobStore, StreakSweeper,
    StreakTracker, UserDirectory,
};

use crate::config::AppConfig;
use crate::prompt_client::GeminiGenerator;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub clock: DayClock,
    pub events: EventHub,
    pub users: UserDirectory,
    pub invites: InviteService,
    pub connections: ConnectionManager,
    pub tracker: StreakTracker,
    pub sweeper: StreakSweeper,
    pub prompts: Arc<DailyPrompts<GeminiGenerator>>,
    pub blobs: Arc<dyn BlobStore>,
}

impl AppState {
    pub fn builder(config: AppConfig) -> AppStateBuilder {
        AppStateBuilder { config, db: None }
    }
}

/// Wires every service to one explicitly opened store.
pub struct AppStateBuilder {
    config: AppConfig,
    db: Option<Db>,
}

impl AppStateBuilder {
    pub fn db(mut self, db: Db) -> Self {
        self.db = Some(db);
        self
    }

    pub fn build(self) -> Result<AppState, tethered_core::Error> {
        let db = self.db.ok_or(tethered_core::Error::NotConfigured)?;
        let config = self.config;
        let clock = DayClock::with_offset_minutes(config.streak_utc_offset_minutes);
        let events = EventHub::new();

        let prompts = DailyPrompts::new(db.clone(), GeminiGenerator::new(config.prompt.clone()))
            .with_clock(clock);
        let blobs = LocalBlobStore::new(db.blobs_dir(), &config.base_url);

        Ok(AppState {
            clock,
            users: UserDirectory::new(db.clone()),
            invites: InviteService::new(db.clone())
                .with_clock(clock)
                .pairing_counts_as_interaction(config.pairing_counts_as_interaction),
            connections: ConnectionManager::new(db.clone()).with_events(events.clone()),
            tracker: StreakTracker::new(db.clone())
                .with_clock(clock)
                .with_events(events.clone()),
            sweeper: StreakSweeper::new(db)
                .with_clock(clock)
                .with_events(events.clone()),
            prompts: Arc::new(prompts),
            blobs: Arc::new(blobs),
            events,
            config,
        })
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for UserDirectory {
    fn from_ref(state: &AppState) -> Self {
        state.users.clone()
    }
}
