//! Waveform envelope and peak extraction.
//!
//! Audio is decoded by FFmpeg into raw mono `f32le` PCM, loaded into memory
//! and reduced to a fixed number of buckets.

use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Reduced amplitude data for one input.
#[derive(Debug, Clone, Serialize)]
pub struct Waveform {
    /// Normalized envelope, values in 0..=1
    pub data: Vec<f32>,
    /// Downsampled envelope for compact rendering
    pub peaks: Vec<f32>,
    /// Number of decoded mono samples
    pub sample_count: usize,
    pub sample_rate: u32,
}

impl Waveform {
    /// Duration implied by the decoded sample count.
    pub fn decoded_duration(&self) -> Option<f64> {
        (self.sample_count > 0 && self.sample_rate > 0)
            .then(|| self.sample_count as f64 / self.sample_rate as f64)
    }
}

/// Decode `input` to mono PCM and reduce it to `points` / `peak_points` buckets.
pub async fn generate_waveform(
    runner: &FfmpegRunner,
    input: &Path,
    scratch_dir: &Path,
    sample_rate: u32,
    points: usize,
    peak_points: usize,
) -> MediaResult<Waveform> {
    let pcm_path = scratch_dir.join("waveform.f32le");

    let cmd = FfmpegCommand::new(input, &pcm_path)
        .no_video()
        .mono(sample_rate)
        .format("f32le");
    runner.run(&cmd).await?;

    let samples = load_samples(&pcm_path).await;
    let _ = tokio::fs::remove_file(&pcm_path).await;
    let samples = samples?;

    if samples.is_empty() {
        return Err(MediaError::NoAudio(input.to_path_buf()));
    }

    let data = compute_envelope(&samples, points);
    let peaks = downsample_peaks(&data, peak_points);

    debug!(
        input = %input.display(),
        samples = samples.len(),
        points = data.len(),
        peaks = peaks.len(),
        "Computed waveform"
    );

    Ok(Waveform {
        data,
        peaks,
        sample_count: samples.len(),
        sample_rate,
    })
}

/// Load raw little-endian f32 samples.
pub async fn load_samples(path: &Path) -> MediaResult<Vec<f32>> {
    let bytes = tokio::fs::read(path).await?;
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Per-bucket absolute peak over `points` equal buckets, scaled so the
/// loudest bucket is 1.0. Silence yields all zeros.
pub fn compute_envelope(samples: &[f32], points: usize) -> Vec<f32> {
    let raw: Vec<f32> = bucket_ranges(samples.len(), points)
        .map(|range| {
            samples[range]
                .iter()
                .filter(|s| s.is_finite())
                .fold(0.0f32, |peak, s| peak.max(s.abs()))
        })
        .collect();

    let loudest = raw.iter().copied().fold(0.0f32, f32::max);
    if loudest <= f32::EPSILON {
        return vec![0.0; points];
    }

    raw.into_iter().map(|v| round3(v / loudest)).collect()
}

/// Reduce an envelope to `points` values, each the max of its bucket.
pub fn downsample_peaks(envelope: &[f32], points: usize) -> Vec<f32> {
    bucket_ranges(envelope.len(), points)
        .map(|range| round3(envelope[range].iter().copied().fold(0.0f32, f32::max)))
        .collect()
}

/// Split `len` items into `points` contiguous non-empty ranges.
///
/// When `len < points` neighbouring buckets share items; when `len == 0`
/// every range is empty.
fn bucket_ranges(len: usize, points: usize) -> impl Iterator<Item = std::ops::Range<usize>> {
    (0..points).map(move |i| {
        if len == 0 {
            return 0..0;
        }
        let start = (i * len / points).min(len - 1);
        let end = ((i + 1) * len / points).clamp(start + 1, len);
        start..end
    })
}

fn round3(v: f32) -> f32 {
    (v * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_length_and_scale() {
        let samples: Vec<f32> = (0..8000)
            .map(|i| (i as f32 / 8000.0) * if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();

        let envelope = compute_envelope(&samples, 100);
        assert_eq!(envelope.len(), 100);
        assert!(envelope.iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(envelope[99], 1.0);
        assert!(envelope[0] < envelope[50]);
    }

    #[test]
    fn test_silence_is_zero() {
        let envelope = compute_envelope(&vec![0.0; 1000], 100);
        assert_eq!(envelope, vec![0.0; 100]);
        assert_eq!(downsample_peaks(&envelope, 50), vec![0.0; 50]);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(compute_envelope(&[], 10), vec![0.0; 10]);
        assert_eq!(downsample_peaks(&[], 5), vec![0.0; 5]);
    }

    #[test]
    fn test_fewer_samples_than_points() {
        let envelope = compute_envelope(&[0.25, -1.0, 0.5], 6);
        assert_eq!(envelope.len(), 6);
        assert_eq!(envelope, vec![0.25, 0.25, 1.0, 1.0, 0.5, 0.5]);
    }

    #[test]
    fn test_peaks_take_bucket_max() {
        let envelope = vec![0.1, 0.9, 0.3, 0.2, 1.0, 0.0];
        assert_eq!(downsample_peaks(&envelope, 3), vec![0.9, 0.3, 1.0]);
    }

    #[test]
    fn test_values_rounded() {
        let envelope = compute_envelope(&[0.3, 0.9], 2);
        assert_eq!(envelope, vec![0.333, 1.0]);
    }

    #[test]
    fn test_non_finite_samples_ignored() {
        let envelope = compute_envelope(&[f32::NAN, 0.5, f32::INFINITY, 0.25], 2);
        assert_eq!(envelope, vec![1.0, 0.5]);
    }

    #[tokio::test]
    async fn test_load_samples_ignores_trailing_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pcm");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0.5f32.to_le_bytes());
        bytes.extend_from_slice(&(-1.0f32).to_le_bytes());
        bytes.extend_from_slice(&[0, 1]);
        tokio::fs::write(&path, bytes).await.unwrap();

        assert_eq!(load_samples(&path).await.unwrap(), vec![0.5, -1.0]);
    }

    #[test]
    fn test_decoded_duration() {
        let waveform = Waveform {
            data: vec![],
            peaks: vec![],
            sample_count: 16000,
            sample_rate: 8000,
        };
        assert_eq!(waveform.decoded_duration(), Some(2.0));
    }
}
