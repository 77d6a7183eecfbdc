//! Progress bar utilities for image processing.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a progress bar for processing images.
pub fn create_image_progress(total_images: usize, enabled: bool) -> Option<ProgressBar> {
    if !enabled || total_images == 0 {
        return None;
    }

    let pb = ProgressBar::new(total_images as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} images ({per_sec}, {eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Finish a progress bar with a message.
pub fn finish_progress(pb: Option<ProgressBar>, message: &str) {
    if let Some(pb) = pb {
        pb.finish_with_message(message.to_string());
    }
}

/// Increment a progress bar.
pub fn inc_progress(pb: Option<&ProgressBar>) {
    if let Some(pb) = pb {
        pb.inc(1);
    }
}

/// Run `f` with the progress bar hidden so log lines do not interleave with it.
pub fn suspend<F: FnOnce() -> R, R>(pb: Option<&ProgressBar>, f: F) -> R {
    match pb {
        Some(pb) => pb.suspend(f),
        None => f(),
    }
}

/// Format a duration in seconds as `1h 02m 03s`, `2m 03s` or `3.4s`.
pub fn format_elapsed(seconds: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let whole = seconds.max(0.0) as u64;
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let secs = whole % 60;

    if hours > 0 {
        format!("{hours}h {minutes:02}m {secs:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs:02}s")
    } else {
        format!("{seconds:.1}s")
    }
}
