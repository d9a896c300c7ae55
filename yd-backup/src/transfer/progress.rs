//! Human-readable progress reporting for uploads.

use super::progress_stream::{ProgressCallback, ProgressEvent};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Progress observer that writes upload progress to the debug log
pub fn log_observer(label: String) -> ProgressCallback {
    Arc::new(move |event| match event {
        ProgressEvent::Advanced {
            transferred,
            total,
            percent,
        } => {
            debug!(
                "Uploading {}: {:.2}% ({} of {})",
                label,
                percent,
                format_bytes(transferred),
                format_bytes(total)
            );
        }
        ProgressEvent::Completed { transferred } => {
            debug!("Upload stream of {} finished: {}", label, format_bytes(transferred));
        }
    })
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Average transfer speed as human-readable string
pub fn format_speed(bytes: u64, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    let bytes_per_second = if secs > 0.0 {
        (bytes as f64 / secs) as u64
    } else {
        0
    };
    format!("{}/s", format_bytes(bytes_per_second))
}
