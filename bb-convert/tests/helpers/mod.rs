//! Test Helper Utilities
//!
//! Scripted catalogs standing in for the live platform APIs

#![allow(dead_code)]

use async_trait::async_trait;
use bb_common::events::{BridgeEvent, EventBus};
use bb_convert::catalog::{
    CatalogAdapter, CatalogError, CatalogProvider, CatalogResult, CreatedPlaylist, SearchQuery,
};
use bb_convert::models::{MatchCandidate, Platform, Playlist, Track};
use bb_convert::services::{ConversionService, JobManager, OrchestratorSettings};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Catalog with canned responses keyed by lowercase track title
pub struct MockCatalog {
    platform: Platform,
    playlist: CatalogResult<Playlist>,
    searches: HashMap<String, CatalogResult<Vec<MatchCandidate>>>,
    search_delays: HashMap<String, Duration>,
    create_result: CatalogResult<CreatedPlaylist>,
    created: Mutex<Vec<(String, Vec<String>)>>,
    search_calls: AtomicUsize,
}

impl MockCatalog {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            playlist: Err(CatalogError::NotFound("no playlist scripted".to_string())),
            searches: HashMap::new(),
            search_delays: HashMap::new(),
            create_result: Ok(CreatedPlaylist {
                playlist_id: "created-1".to_string(),
                playlist_url: "https://example.test/playlist/created-1".to_string(),
            }),
            created: Mutex::new(Vec::new()),
            search_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_playlist(mut self, playlist: Playlist) -> Self {
        self.playlist = Ok(playlist);
        self
    }

    pub fn with_fetch_error(mut self, error: CatalogError) -> Self {
        self.playlist = Err(error);
        self
    }

    /// Search for `title` returns `candidates` (best first)
    pub fn with_search(mut self, title: &str, candidates: Vec<Track>) -> Self {
        self.searches.insert(
            title.to_lowercase(),
            Ok(candidates.into_iter().map(MatchCandidate::new).collect()),
        );
        self
    }

    pub fn with_search_error(mut self, title: &str, error: CatalogError) -> Self {
        self.searches.insert(title.to_lowercase(), Err(error));
        self
    }

    pub fn with_search_delay(mut self, title: &str, delay: Duration) -> Self {
        self.search_delays.insert(title.to_lowercase(), delay);
        self
    }

    pub fn with_create_error(mut self, error: CatalogError) -> Self {
        self.create_result = Err(error);
        self
    }

    /// Every create_playlist call as (name, track ids)
    pub fn created(&self) -> Vec<(String, Vec<String>)> {
        self.created.lock().unwrap().clone()
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogAdapter for MockCatalog {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch_playlist(&self, _playlist_id: &str) -> CatalogResult<Playlist> {
        self.playlist.clone()
    }

    async fn search_candidates(&self, query: &SearchQuery) -> CatalogResult<Vec<MatchCandidate>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let key = query.title.to_lowercase();
        if let Some(delay) = self.search_delays.get(&key) {
            tokio::time::sleep(*delay).await;
        }
        self.searches.get(&key).cloned().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn create_playlist(
        &self,
        name: &str,
        _description: Option<&str>,
        track_ids: &[String],
    ) -> CatalogResult<CreatedPlaylist> {
        self.created
            .lock()
            .unwrap()
            .push((name.to_string(), track_ids.to_vec()));
        self.create_result.clone()
    }
}

/// Hands out the registered mock for each platform
#[derive(Default)]
pub struct MockCatalogProvider {
    catalogs: HashMap<Platform, Arc<MockCatalog>>,
}

impl MockCatalogProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, catalog: Arc<MockCatalog>) -> Self {
        self.catalogs.insert(catalog.platform, catalog);
        self
    }
}

impl CatalogProvider for MockCatalogProvider {
    fn open(
        &self,
        platform: Platform,
        _user_token: Option<&str>,
    ) -> CatalogResult<Arc<dyn CatalogAdapter>> {
        match self.catalogs.get(&platform) {
            Some(catalog) => Ok(Arc::clone(catalog) as Arc<dyn CatalogAdapter>),
            None => Err(CatalogError::Unauthorized(format!(
                "{} is not configured",
                platform.display_name()
            ))),
        }
    }

    fn is_configured(&self, platform: Platform) -> bool {
        self.catalogs.contains_key(&platform)
    }
}

/// Orchestrator settings with short timeouts for tests
pub fn test_settings() -> OrchestratorSettings {
    OrchestratorSettings {
        adapter_call_timeout: Duration::from_secs(5),
        ..OrchestratorSettings::default()
    }
}

/// Wire a conversion service around `provider`
pub fn create_test_service(provider: MockCatalogProvider) -> (ConversionService, JobManager, EventBus) {
    let event_bus = EventBus::new(1000);
    let jobs = JobManager::new(event_bus.clone());
    let service = ConversionService::new(jobs.clone(), Arc::new(provider), test_settings());
    (service, jobs, event_bus)
}

/// Poll until the job reaches a terminal status
pub async fn wait_for_terminal(jobs: &JobManager, job_id: Uuid) -> bb_convert::models::Job {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let job = jobs.get(job_id).await.expect("job should exist");
        if job.is_terminal() {
            return job;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {} did not finish in time",
            job_id
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Drain everything currently buffered on a subscription
pub fn drain_events(rx: &mut tokio::sync::broadcast::Receiver<BridgeEvent>) -> Vec<BridgeEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Source playlist from the conversion walkthrough: Bohemian Rhapsody,
/// Imagine, Obscure Track
pub fn walkthrough_playlist() -> Playlist {
    Playlist::new(
        "Classics",
        vec![
            Track::new("Bohemian Rhapsody", "Queen")
                .with_album("A Night at the Opera")
                .with_duration(354)
                .with_platform_id("spotify:track:bohemian"),
            Track::new("Imagine", "John Lennon")
                .with_album("Imagine")
                .with_duration(183)
                .with_platform_id("spotify:track:imagine"),
            Track::new("Obscure Track", "Unknown Band")
                .with_duration(200)
                .with_platform_id("spotify:track:obscure"),
        ],
    )
}

/// Destination catalog that finds the first two walkthrough tracks
pub fn walkthrough_destination() -> MockCatalog {
    MockCatalog::new(Platform::AppleMusic)
        .with_search(
            "Bohemian Rhapsody",
            vec![Track::new("Bohemian Rhapsody (Remastered 2011)", "Queen")
                .with_album("A Night at the Opera")
                .with_duration(355)
                .with_platform_id("am-bohemian")],
        )
        .with_search(
            "Imagine",
            vec![Track::new("Imagine", "John Lennon")
                .with_album("Imagine")
                .with_duration(183)
                .with_platform_id("am-imagine")],
        )
}
