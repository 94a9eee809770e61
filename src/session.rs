//! Editor session housekeeping.
//!
//! Opens the editor page and hosts the small one-off interactions that
//! bracket a placement run: repositioning the timeline panel, muting the
//! original track audio, and probing card durations.

use std::time::Duration;

use crate::config::Config;
use crate::locator;
use crate::overlay;
use crate::selectors;
use crate::surface::{Surface, SurfaceError};

/// One editor session over a surface.
pub struct EditorSession<'a> {
    surface: &'a dyn Surface,
    cfg: &'a Config,
}

impl<'a> EditorSession<'a> {
    pub fn new(surface: &'a dyn Surface, cfg: &'a Config) -> Self {
        Self { surface, cfg }
    }

    /// Navigate to the editor, let it settle, and clear any welcome
    /// overlays.
    pub async fn open(&self) -> Result<(), SurfaceError> {
        log::info!("opening editor: {}", self.cfg.editor.url);
        self.surface.goto(&self.cfg.editor.url).await?;

        log::info!(
            "page loaded, settling for {}s",
            self.cfg.editor.settle_secs
        );
        tokio::time::sleep(Duration::from_secs(self.cfg.editor.settle_secs)).await;

        overlay::suppress(self.surface).await;
        crate::ok!("editor ready");
        Ok(())
    }

    /// Drag the timeline panel to its working position. Best-effort.
    pub async fn arrange_timeline_panel(&self) -> bool {
        let from = self.cfg.placement.panel_drag_from;
        let to = self.cfg.placement.panel_drag_to;
        match self
            .surface
            .drag((from.x, from.y), (to.x, to.y), self.cfg.placement.drag_steps)
            .await
        {
            Ok(_) => {
                crate::ok!(
                    "timeline panel dragged ({:.0},{:.0}) -> ({:.0},{:.0})",
                    from.x,
                    from.y,
                    to.x,
                    to.y
                );
                true
            }
            Err(e) => {
                log::error!("timeline panel drag failed: {}", e);
                false
            }
        }
    }

    /// Click every track mute button. Best-effort; individual click failures
    /// are ignored.
    pub async fn mute_all_tracks(&self) -> bool {
        let buttons = match self.surface.query_all(selectors::MUTE_BUTTON).await {
            Ok(buttons) => buttons,
            Err(e) => {
                log::error!("mute button query failed: {}", e);
                return false;
            }
        };
        if buttons.is_empty() {
            log::warn!("no mute buttons found");
            return false;
        }
        for button in &buttons {
            match self.surface.click(button).await {
                Ok(_) => crate::ok!("mute button clicked"),
                Err(e) => log::debug!("mute button click failed: {}", e),
            }
        }
        true
    }

    /// Read the duration badge of the card matching `name`, in seconds.
    /// Returns 0 when the card or badge cannot be read.
    pub async fn card_duration_secs(&self, name: &str) -> u64 {
        let card = match locator::resolve(self.surface, name, self.cfg.placement.panel_wait()).await
        {
            Ok(Some(card)) => card,
            _ => return 0,
        };

        // The badge renders each digit group as its own unit element; join
        // them in one script call.
        let script = format!(
            "return Array.from(arguments[0].querySelectorAll('{}')).map(u => u.textContent.trim()).join('')",
            selectors::DURATION_UNITS
        );
        let text = match self.surface.eval_on(&card.handle, &script).await {
            Ok(value) => value.as_str().unwrap_or_default().to_string(),
            Err(e) => {
                log::warn!("duration badge read failed for '{}': {}", name, e);
                return 0;
            }
        };

        let seconds = time_str_to_seconds(&text);
        log::debug!("'{}' duration: '{}' ({}s)", name, text.trim(), seconds);
        seconds
    }
}

/// Convert a `MM:SS` or `HH:MM:SS` display string to seconds. Anything else
/// yields 0.
pub fn time_str_to_seconds(time_str: &str) -> u64 {
    let parts: Vec<u64> = time_str
        .split(':')
        .filter(|p| !p.trim().is_empty())
        .map(|p| p.trim().parse::<u64>().unwrap_or(0))
        .collect();
    match parts.len() {
        2 => parts[0] * 60 + parts[1],
        3 => parts[0] * 3600 + parts[1] * 60 + parts[2],
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_str_minutes_seconds() {
        assert_eq!(time_str_to_seconds("02:30"), 150);
    }

    #[test]
    fn test_time_str_hours() {
        assert_eq!(time_str_to_seconds("01:02:03"), 3723);
    }

    #[test]
    fn test_time_str_empty_parts_skipped() {
        assert_eq!(time_str_to_seconds(":02:30"), 150);
    }

    #[test]
    fn test_time_str_garbage_is_zero() {
        assert_eq!(time_str_to_seconds(""), 0);
        assert_eq!(time_str_to_seconds("42"), 0);
        assert_eq!(time_str_to_seconds("a:b:c:d"), 0);
    }
}
