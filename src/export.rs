//! Export, render, and download conduction.
//!
//! Drives the editor's stepped export dialog as a small state machine:
//!
//! ```text
//! Idle -> Exporting -> ConfirmMenu -> ConfirmDialog -> Rendering -> Downloading -> Saved
//! ```
//!
//! Any selector or click failure in the dialog steps, and a stalled render,
//! fail the *attempt*; the whole sequence is retried from `Idle` a bounded
//! number of times, with the surface explicitly reset first so a half-open
//! dialog from the previous attempt cannot poison the next one. Exhausting
//! the attempts is an ordinary typed outcome, never a panic.

use std::cell::Cell;
use std::path::{Path, PathBuf};

use chrono::Local;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::config::ExportConfig;
use crate::overlay;
use crate::poll::{poll_until, PollOutcome};
use crate::selectors;
use crate::surface::{ElementHandle, Surface};

/// States of one export attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Idle,
    /// Clicking the header export button.
    Exporting,
    /// Clicking the download entry in the export menu.
    ConfirmMenu,
    /// Confirming the export settings dialog.
    ConfirmDialog,
    /// Polling render progress.
    Rendering,
    /// Retrieving the finished file.
    Downloading,
    Saved,
    Failed,
}

/// Book-keeping for one export attempt. Discarded on success or failure.
#[derive(Debug)]
pub struct ExportJob {
    pub attempt: u32,
    pub stage: ExportStage,
    pub progress_percent: f64,
    pub output_path: Option<PathBuf>,
}

impl ExportJob {
    fn new(attempt: u32) -> Self {
        Self {
            attempt,
            stage: ExportStage::Idle,
            progress_percent: 0.0,
            output_path: None,
        }
    }
}

/// Failure of a single attempt, recorded with the stage it died in.
#[derive(Debug)]
struct StageFailure {
    stage: ExportStage,
    reason: String,
}

impl StageFailure {
    fn new(stage: ExportStage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the export conductor.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("export failed after {attempts} attempt(s)")]
    RetriesExhausted { attempts: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Output filename for the finished video, timestamped to the second.
pub fn output_filename(now: &chrono::DateTime<Local>) -> String {
    format!("video_final_youtube_{}.mp4", now.format("%Y%m%d_%H%M%S"))
}

/// Combine the two progress readouts into a percentage.
///
/// The surface displays the integer part and the fractional digits in two
/// separate elements ("42" and "75%" mean 42.75%). A reading that fails to
/// parse contributes 0.0 for that poll instead of raising.
pub fn parse_progress(int_text: &str, decimal_text: &str) -> f64 {
    let int_part = int_text.trim().parse::<i64>().unwrap_or(0) as f64;

    let digits = decimal_text
        .trim()
        .trim_end_matches('%')
        .trim()
        .trim_start_matches('.');
    let fraction = if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        digits
            .parse::<u64>()
            .map(|v| v as f64 / 10f64.powi(digits.len() as i32))
            .unwrap_or(0.0)
    } else {
        0.0
    };

    int_part + fraction
}

/// Conducts the export sequence against one surface.
pub struct ExportConductor<'a> {
    surface: &'a dyn Surface,
    cfg: &'a ExportConfig,
    output_dir: PathBuf,
    http: reqwest::Client,
}

impl<'a> ExportConductor<'a> {
    pub fn new(surface: &'a dyn Surface, cfg: &'a ExportConfig, output_dir: PathBuf) -> Self {
        Self {
            surface,
            cfg,
            output_dir,
            http: reqwest::Client::new(),
        }
    }

    /// Run the export sequence, retrying whole attempts up to the configured
    /// bound. Returns the path of the saved video.
    ///
    /// # Errors
    ///
    /// `ExportError::RetriesExhausted` once every attempt has failed;
    /// `ExportError::Io` only for output directory creation.
    pub async fn export(&self) -> Result<PathBuf, ExportError> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let dest = self.output_dir.join(output_filename(&Local::now()));

        let attempts = self.cfg.max_retries.max(1);
        for attempt in 1..=attempts {
            if attempt > 1 {
                log::info!("waiting {:?} before retrying", self.cfg.retry_delay());
                tokio::time::sleep(self.cfg.retry_delay()).await;
                self.reset_to_idle().await;
            }

            log::info!("export attempt {} of {}", attempt, attempts);
            match self.run_attempt(attempt, &dest).await {
                Ok(job) => {
                    crate::ok!(
                        "video exported to {} (attempt {})",
                        dest.display(),
                        job.attempt
                    );
                    return Ok(dest);
                }
                Err(failure) => {
                    log::warn!(
                        "attempt {} failed during {:?}: {}",
                        attempt,
                        failure.stage,
                        failure.reason
                    );
                }
            }
        }

        log::error!("all {} export attempt(s) failed", attempts);
        Err(ExportError::RetriesExhausted { attempts })
    }

    /// Dismiss any half-open export dialog left behind by a failed attempt
    /// so the next one starts from a clean surface.
    async fn reset_to_idle(&self) {
        log::debug!("resetting export surface to idle");
        let script = format!(
            "document.querySelectorAll('{}').forEach(el => el.remove())",
            selectors::MODAL_WRAPPER
        );
        if let Err(e) = self.surface.eval(&script).await {
            log::debug!("dialog cleanup script failed: {}", e);
        }
        overlay::suppress(self.surface).await;
    }

    async fn run_attempt(&self, attempt: u32, dest: &Path) -> Result<ExportJob, StageFailure> {
        let mut job = ExportJob::new(attempt);
        overlay::suppress(self.surface).await;

        self.step(&mut job, ExportStage::Exporting, selectors::EXPORT_BUTTON)
            .await?;
        tokio::time::sleep(self.cfg.step_pause()).await;

        self.step(&mut job, ExportStage::ConfirmMenu, selectors::EXPORT_MENU_DOWNLOAD)
            .await?;
        tokio::time::sleep(self.cfg.step_pause()).await;

        self.step(&mut job, ExportStage::ConfirmDialog, selectors::EXPORT_CONFIRM)
            .await?;

        self.await_render(&mut job).await?;
        self.retrieve(&mut job, dest).await?;

        job.stage = ExportStage::Saved;
        job.output_path = Some(dest.to_path_buf());
        Ok(job)
    }

    /// One dialog step: wait for its control, click it.
    async fn step(
        &self,
        job: &mut ExportJob,
        stage: ExportStage,
        selector: &str,
    ) -> Result<(), StageFailure> {
        job.stage = stage;
        let control = self
            .surface
            .wait_for(selector, self.cfg.selector_wait())
            .await
            .map_err(|e| StageFailure::new(stage, e.to_string()))?;
        self.surface
            .click(&control)
            .await
            .map_err(|e| StageFailure::new(stage, e.to_string()))?;
        log::debug!("{:?} control clicked", stage);
        Ok(())
    }

    /// Poll the render progress readout until completion or timeout.
    async fn await_render(&self, job: &mut ExportJob) -> Result<(), StageFailure> {
        job.stage = ExportStage::Rendering;
        log::info!("waiting for render to complete");

        let latest = Cell::new(0.0f64);
        let outcome = poll_until(
            || async {
                let percent = self.read_progress().await;
                latest.set(percent);
                percent >= 100.0
            },
            self.cfg.render_poll(),
            self.cfg.render_timeout(),
        )
        .await;

        job.progress_percent = latest.get();
        match outcome {
            PollOutcome::Completed => {
                crate::ok!("render complete");
                Ok(())
            }
            PollOutcome::TimedOut => Err(StageFailure::new(
                ExportStage::Rendering,
                format!(
                    "render stalled at {:.1}% after {:?}",
                    latest.get(),
                    self.cfg.render_timeout()
                ),
            )),
        }
    }

    /// One progress reading. Missing elements or unparsable text read as 0.0
    /// for this poll.
    async fn read_progress(&self) -> f64 {
        let int_text = self.element_text(selectors::PROGRESS_INT).await;
        let decimal_text = self.element_text(selectors::PROGRESS_DECIMAL).await;
        let percent = parse_progress(&int_text, &decimal_text);
        log::debug!("rendering: {:.1}%", percent);
        percent
    }

    async fn element_text(&self, selector: &str) -> String {
        let handle = match self.surface.query_all(selector).await {
            Ok(handles) => handles.into_iter().next(),
            Err(e) => {
                log::debug!("progress query failed for '{}': {}", selector, e);
                None
            }
        };
        match handle {
            Some(h) => self.surface.text(&h).await.unwrap_or_default(),
            None => String::new(),
        }
    }

    /// Retrieve the finished file: native download first, direct link as
    /// fallback.
    async fn retrieve(&self, job: &mut ExportJob, dest: &Path) -> Result<(), StageFailure> {
        job.stage = ExportStage::Downloading;

        let button = self
            .surface
            .wait_for(selectors::DOWNLOAD_BUTTON, self.cfg.selector_wait())
            .await
            .map_err(|e| StageFailure::new(ExportStage::Downloading, e.to_string()))?;
        self.surface
            .click(&button)
            .await
            .map_err(|e| StageFailure::new(ExportStage::Downloading, e.to_string()))?;

        match self.surface.wait_for_download(self.cfg.download_wait()).await {
            Ok(temp) => {
                persist(&temp, dest)
                    .await
                    .map_err(|e| StageFailure::new(ExportStage::Downloading, e.to_string()))?;
                crate::ok!("native download saved to {}", dest.display());
                Ok(())
            }
            Err(e) => {
                log::warn!(
                    "native download failed ({}), falling back to direct link",
                    e
                );
                self.download_via_link(&button, dest).await
            }
        }
    }

    /// Fallback path: pull the direct resource link out of the download
    /// control and stream it to disk.
    async fn download_via_link(
        &self,
        button: &ElementHandle,
        dest: &Path,
    ) -> Result<(), StageFailure> {
        let fail = |reason: String| StageFailure::new(ExportStage::Downloading, reason);

        let link = self
            .surface
            .query_within(button, "a")
            .await
            .map_err(|e| fail(e.to_string()))?
            .ok_or_else(|| fail("no link element inside download control".into()))?;
        let url = self
            .surface
            .attribute(&link, "href")
            .await
            .map_err(|e| fail(e.to_string()))?
            .ok_or_else(|| fail("download link has no href".into()))?;

        log::info!("downloading via direct link");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| fail(e.to_string()))?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| fail(e.to_string()))?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| fail(e.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| fail(e.to_string()))?;
        }
        file.flush().await.map_err(|e| fail(e.to_string()))?;

        crate::ok!("direct-link download saved to {}", dest.display());
        Ok(())
    }
}

/// Move a completed download into place, falling back to copy across
/// filesystems.
async fn persist(from: &Path, to: &Path) -> std::io::Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await?;
    let _ = tokio::fs::remove_file(from).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_progress_combines_displays() {
        assert_eq!(parse_progress("42", "75%"), 42.75);
    }

    #[test]
    fn test_parse_progress_leading_dot_fraction() {
        assert_eq!(parse_progress("42", ".5%"), 42.5);
    }

    #[test]
    fn test_parse_progress_completion() {
        assert!(parse_progress("100", "0%") >= 100.0);
        assert!(parse_progress("99", "99%") < 100.0);
    }

    #[test]
    fn test_parse_progress_non_numeric_decimal_reads_zero() {
        assert_eq!(parse_progress("42", "n/a"), 42.0);
        assert_eq!(parse_progress("", ""), 0.0);
        assert_eq!(parse_progress("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_parse_progress_whitespace() {
        assert_eq!(parse_progress("  7 ", " 25% "), 7.25);
    }

    #[test]
    fn test_output_filename_shape() {
        let name = output_filename(&Local::now());
        assert!(name.starts_with("video_final_youtube_"));
        assert!(name.ends_with(".mp4"));
        // video_final_youtube_YYYYMMDD_HHMMSS.mp4
        assert_eq!(name.len(), "video_final_youtube_".len() + 15 + ".mp4".len());
    }
}
