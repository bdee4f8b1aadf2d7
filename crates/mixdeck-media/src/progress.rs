//! FFmpeg `-progress` output parsing.

use serde::Serialize;

/// Running state assembled from FFmpeg's `key=value` progress stream.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FfmpegProgress {
    /// Output position in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed relative to realtime
    pub speed: f64,
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Fold one stderr line into the state.
    ///
    /// Returns `None` for lines that are not progress keys, `Some(true)` when
    /// a progress block ends, `Some(false)` for any other progress key.
    pub fn apply_line(&mut self, line: &str) -> Option<bool> {
        let (key, value) = line.trim().split_once('=')?;
        match key {
            // Both keys carry microseconds despite the name.
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.out_time_ms = us / 1000;
                }
            }
            "speed" => {
                if let Some(speed) = value.trim().strip_suffix('x').and_then(|s| s.parse().ok()) {
                    self.speed = speed;
                }
            }
            "progress" => {
                self.is_complete = value == "end";
                return Some(true);
            }
            "frame" | "fps" | "bitrate" | "total_size" | "out_time" | "dup_frames"
            | "drop_frames" => {}
            k if k.starts_with("stream_") => {}
            _ => return None,
        }
        Some(false)
    }

    /// Percentage done given the input duration.
    pub fn percentage(&self, total_seconds: f64) -> f64 {
        if total_seconds <= 0.0 {
            return 0.0;
        }
        (self.out_time_ms as f64 / (total_seconds * 1000.0) * 100.0).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_block() {
        let mut progress = FfmpegProgress::default();

        assert_eq!(progress.apply_line("out_time_us=5000000"), Some(false));
        assert_eq!(progress.out_time_ms, 5000);

        assert_eq!(progress.apply_line("speed=1.5x"), Some(false));
        assert!((progress.speed - 1.5).abs() < 0.01);

        assert_eq!(progress.apply_line("progress=end"), Some(true));
        assert!(progress.is_complete);
        assert!((progress.percentage(10.0) - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_diagnostics_are_not_progress() {
        let mut progress = FfmpegProgress::default();
        assert_eq!(progress.apply_line("Invalid data found when processing input"), None);
        assert_eq!(progress.apply_line("[mp3 @ 0x1] Header missing"), None);
        assert_eq!(progress.apply_line("speed=N/A"), Some(false));
        assert_eq!(progress.speed, 0.0);
    }
}
