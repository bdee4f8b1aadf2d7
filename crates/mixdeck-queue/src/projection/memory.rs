use std::collections::HashMap;

use async_trait::async_trait;
use mixdeck_models::{Track, TrackId, TrackUpdate};
use tokio::sync::RwLock;
use tracing::debug;

use super::{ProjectionResult, TrackStatusProjection};

/// Track store held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryTrackStore {
    tracks: RwLock<HashMap<TrackId, Track>>,
}

impl InMemoryTrackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a track.
    pub async fn insert(&self, track: Track) {
        self.tracks.write().await.insert(track.id.clone(), track);
    }

    pub async fn get(&self, id: &TrackId) -> Option<Track> {
        self.tracks.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.tracks.read().await.len()
    }
}

#[async_trait]
impl TrackStatusProjection for InMemoryTrackStore {
    async fn read_track(&self, id: &TrackId) -> ProjectionResult<Option<Track>> {
        Ok(self.get(id).await)
    }

    async fn write_processing_result(
        &self,
        id: &TrackId,
        update: TrackUpdate,
    ) -> ProjectionResult<()> {
        match self.tracks.write().await.get_mut(id) {
            Some(track) => track.apply(&update),
            None => debug!(track_id = %id, "Ignoring update for unknown track"),
        }
        Ok(())
    }
}
