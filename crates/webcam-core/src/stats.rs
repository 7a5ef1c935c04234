use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use atomic_float::AtomicF64;

pub type SharedStats = Arc<RecordingStats>;

/// Counters shared between the capture thread, the session thread and the
/// handle held by the caller.
#[derive(Debug)]
pub struct RecordingStats {
    recording: AtomicBool,
    frame_count: AtomicU64,
    last_frame_time: AtomicF64,
}

impl RecordingStats {
    pub fn new() -> Self {
        RecordingStats {
            recording: AtomicBool::new(false),
            frame_count: AtomicU64::new(0),
            last_frame_time: AtomicF64::new(-1.0),
        }
    }

    /// Count a captured frame, keeping its presentation time in seconds
    /// when the buffer carries one.
    pub fn frame(&self, pts_seconds: Option<f64>) {
        if let Some(pts) = pts_seconds {
            self.last_frame_time.store(pts, Ordering::Relaxed);
        }
        self.frame_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_recording(&self, recording: bool) {
        self.recording.store(recording, Ordering::Relaxed);
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Relaxed)
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::Relaxed)
    }

    /// PTS of the last frame in seconds, `-1.0` before the first one.
    pub fn last_frame_time(&self) -> f64 {
        self.last_frame_time.load(Ordering::Relaxed)
    }
}

impl Default for RecordingStats {
    fn default() -> Self {
        Self::new()
    }
}

pub fn new_shared() -> SharedStats {
    Arc::new(RecordingStats::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_stats() {
        let stats = RecordingStats::new();
        assert!(!stats.is_recording());
        assert_eq!(stats.frame_count(), 0);
        assert_eq!(stats.last_frame_time(), -1.0);
    }

    #[test]
    fn test_frames_are_counted_across_threads() {
        let stats = new_shared();
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        stats.frame(Some(t as f64 + i as f64 / 100.0));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.frame_count(), 100);
        assert!(stats.last_frame_time() >= 0.0);
    }

    #[test]
    fn test_frame_without_pts_keeps_last_time() {
        let stats = RecordingStats::new();
        stats.frame(Some(1.5));
        stats.frame(None);
        assert_eq!(stats.frame_count(), 2);
        assert_eq!(stats.last_frame_time(), 1.5);
    }
}
