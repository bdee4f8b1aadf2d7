//! In-crate fakes for queue tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mixdeck_media::{
    DerivedArtifacts, MediaError, MediaKind, MediaMetadata, MediaProcessor, MediaResult,
    ProcessPlan,
};
use mixdeck_models::{Track, TrackId, TrackUpdate};
use mixdeck_storage::{MediaStore, StorageError, StorageResult};
use tokio::sync::Semaphore;

use crate::manager::JobQueueManager;
use crate::projection::{
    InMemoryTrackStore, ProjectionError, ProjectionResult, TrackStatusProjection,
};

/// Store that "downloads" by writing the URL into a local file.
///
/// URLs containing `unreachable` fail like a refused connection.
#[derive(Default)]
pub struct FakeStore {
    pub uploads: Mutex<Vec<(String, String)>>,
    pub unconfigured: bool,
}

impl FakeStore {
    pub fn unconfigured() -> Self {
        Self {
            unconfigured: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl MediaStore for FakeStore {
    fn is_configured(&self) -> bool {
        !self.unconfigured
    }

    async fn download_to(&self, url: &str, dest_dir: &Path) -> StorageResult<PathBuf> {
        if url.contains("unreachable") {
            return Err(StorageError::download_failed(format!(
                "{}: connection refused",
                url
            )));
        }
        tokio::fs::create_dir_all(dest_dir).await?;
        let name = url.rsplit('/').next().unwrap_or("source");
        let path = dest_dir.join(name);
        tokio::fs::write(&path, url.as_bytes()).await?;
        Ok(path)
    }

    async fn upload_path(
        &self,
        path: &Path,
        key: &str,
        content_type: &str,
    ) -> StorageResult<String> {
        assert!(path.exists(), "uploaded file must exist: {}", path.display());
        self.uploads
            .lock()
            .unwrap()
            .push((key.to_string(), content_type.to_string()));
        Ok(format!("https://cdn.test/{}", key))
    }
}

/// Processor returning fixed artifacts.
///
/// Inputs named `corrupt*` fail to decode, inputs named `nometa*` fail
/// metadata reads, inputs named `panic*` panic. With a gate, each `process`
/// call waits for one permit.
pub struct FakeProcessor {
    pub gate: Option<Arc<Semaphore>>,
    pub calls: Mutex<Vec<(String, String)>>,
    active: AtomicUsize,
    /// Most `process` calls ever in flight at once.
    pub max_active: AtomicUsize,
}

impl FakeProcessor {
    pub fn new() -> Self {
        Self {
            gate: None,
            calls: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let processor = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::new()
        };
        (processor, gate)
    }

    pub fn call_names(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[async_trait]
impl MediaProcessor for FakeProcessor {
    async fn process(
        &self,
        input: &Path,
        mime_type: &str,
        plan: &ProcessPlan,
    ) -> MediaResult<DerivedArtifacts> {
        let name = file_name(input);
        self.calls
            .lock()
            .unwrap()
            .push((name.clone(), mime_type.to_string()));

        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(running, Ordering::SeqCst);
        let result = self.run(&name, mime_type, plan).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn read_metadata(&self, path: &Path) -> MediaResult<MediaMetadata> {
        if file_name(path).starts_with("nometa") {
            return Err(MediaError::invalid_media("no metadata"));
        }
        Ok(MediaMetadata {
            duration_seconds: Some(42.0),
            has_audio: true,
            has_video: false,
        })
    }
}

impl FakeProcessor {
    async fn run(
        &self,
        name: &str,
        mime_type: &str,
        plan: &ProcessPlan,
    ) -> MediaResult<DerivedArtifacts> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        if name.starts_with("panic") {
            panic!("decoder crashed on {}", name);
        }
        if name.starts_with("corrupt") {
            return Err(MediaError::invalid_media(format!("cannot decode {}", name)));
        }

        let mut artifacts = DerivedArtifacts {
            waveform_data: vec![0.5; 100],
            waveform_peaks: vec![0.5; 50],
            duration_seconds: Some(3.0),
            extracted_audio: None,
            transcoded_video: None,
        };

        if MediaKind::from_mime(mime_type) == Some(MediaKind::Video) {
            tokio::fs::create_dir_all(&plan.output_dir).await?;
            if plan.extract_audio {
                let path = plan.output_dir.join("audio.mp3");
                tokio::fs::write(&path, b"mp3").await?;
                artifacts.extracted_audio = Some(path);
            }
            if plan.transcode_video {
                let path = plan.output_dir.join("video.mp4");
                tokio::fs::write(&path, b"mp4").await?;
                artifacts.transcoded_video = Some(path);
            }
        }

        Ok(artifacts)
    }
}

/// In-memory projection that panics when reading tracks named `boom*` and
/// reports itself unavailable for tracks named `down*`.
#[derive(Default)]
pub struct FaultyProjection {
    pub tracks: InMemoryTrackStore,
}

#[async_trait]
impl TrackStatusProjection for FaultyProjection {
    async fn read_track(&self, id: &TrackId) -> ProjectionResult<Option<Track>> {
        if id.as_str().starts_with("boom") {
            panic!("track store crashed reading {}", id);
        }
        self.tracks.read_track(id).await
    }

    async fn write_processing_result(
        &self,
        id: &TrackId,
        update: TrackUpdate,
    ) -> ProjectionResult<()> {
        if id.as_str().starts_with("down") {
            return Err(ProjectionError::Unavailable("connection reset".into()));
        }
        self.tracks.write_processing_result(id, update).await
    }
}

/// Poll until the queue reports one job processing.
pub async fn wait_for_processing(queue: &JobQueueManager) {
    for _ in 0..200 {
        if queue.get_queue_stats().await.processing == 1 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("no job started processing");
}
