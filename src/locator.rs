//! Resolving on-screen cards for named assets.
//!
//! A [`Card`] is a lookup result, never a cached reference: the remote
//! document shifts every time something is placed, so callers resolve a
//! fresh card before each interaction and use [`is_stale`] to detect a
//! handle that no longer matches its asset.

use std::time::Duration;

use crate::selectors;
use crate::surface::{BoundingBox, ElementHandle, Surface, SurfaceError};

/// Scroll attempts before giving up on bringing a card on-screen.
const MAX_SCROLL_ATTEMPTS: u32 = 10;

/// Scroll increment per attempt, CSS pixels.
const SCROLL_STEP: i32 = 100;

/// Pause between scroll attempts.
const SCROLL_SETTLE: Duration = Duration::from_millis(200);

/// Transient view of one asset's card in the browsing panel.
#[derive(Debug, Clone)]
pub struct Card {
    pub handle: ElementHandle,
    /// Label text as displayed, possibly truncated.
    pub label: String,
    /// Whether the added indicator is present.
    pub added: bool,
    pub bbox: Option<BoundingBox>,
    /// False when the card was found but could not be scrolled on-screen;
    /// callers must tolerate interacting with such a card failing.
    pub interactable: bool,
}

/// Fuzzy bidirectional label match: either string containing the other,
/// case-insensitive, after trimming. Tolerates truncated display labels and
/// longer display names alike.
pub fn labels_match(asset_id: &str, label: &str) -> bool {
    let a = asset_id.trim().to_lowercase();
    let b = label.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

/// Resolve the card for `name`, waiting up to `panel_wait` for the card
/// panel to exist at all.
///
/// Returns `Ok(None)` when no card label matches. A matched card that could
/// not be brought on-screen is still returned, with `interactable` false.
pub async fn resolve(
    surface: &dyn Surface,
    name: &str,
    panel_wait: Duration,
) -> Result<Option<Card>, SurfaceError> {
    if let Err(e) = surface.wait_for(selectors::CARD, panel_wait).await {
        log::warn!("card panel not present: {}", e);
        return Ok(None);
    }

    for handle in surface.query_all(selectors::CARD).await? {
        let Some(label_el) = surface.query_within(&handle, selectors::CARD_LABEL).await? else {
            continue;
        };
        let label = match surface.text(&label_el).await {
            Ok(text) => text,
            Err(SurfaceError::Stale) => continue,
            Err(e) => return Err(e),
        };
        if !labels_match(name, &label) {
            continue;
        }

        let interactable = scroll_on_screen(surface, &handle).await;
        let added = surface
            .query_within(&handle, selectors::ADDED_BADGE)
            .await?
            .is_some();
        let bbox = surface.bounding_box(&handle).await?;

        log::debug!(
            "card resolved for '{}': label='{}' added={} interactable={}",
            name,
            label.trim(),
            added,
            interactable
        );
        return Ok(Some(Card {
            handle,
            label,
            added,
            bbox,
            interactable,
        }));
    }

    log::warn!("no card found for '{}'", name);
    Ok(None)
}

/// Whether `card` no longer points at the element it was resolved from.
///
/// Re-reads the label through the stored handle; any mismatch or protocol
/// failure counts as stale.
pub async fn is_stale(surface: &dyn Surface, card: &Card) -> bool {
    match surface.query_within(&card.handle, selectors::CARD_LABEL).await {
        Ok(Some(label_el)) => match surface.text(&label_el).await {
            Ok(text) => !labels_match(&card.label, &text),
            Err(_) => true,
        },
        _ => true,
    }
}

/// Nudge the card's scroll container in all four directions until the card
/// reports a non-negative bounding box.
///
/// Returns false when attempts are exhausted; the card may still be usable,
/// so this is reported as degraded rather than failed.
async fn scroll_on_screen(surface: &dyn Surface, card: &ElementHandle) -> bool {
    for _ in 0..MAX_SCROLL_ATTEMPTS {
        match surface.bounding_box(card).await {
            Ok(Some(bbox)) if bbox.is_on_screen() => return true,
            Ok(_) => {}
            Err(e) => {
                log::debug!("bounding box read failed while scrolling: {}", e);
                return false;
            }
        }

        let nudges = [
            (0, SCROLL_STEP),
            (SCROLL_STEP, 0),
            (-SCROLL_STEP, 0),
            (0, -SCROLL_STEP),
        ];
        for (dx, dy) in nudges {
            let script = format!("arguments[0].parentElement.scrollBy({}, {})", dx, dy);
            if let Err(e) = surface.eval_on(card, &script).await {
                log::debug!("scroll nudge failed: {}", e);
                return false;
            }
        }
        tokio::time::sleep(SCROLL_SETTLE).await;
    }

    log::warn!("card still off-screen after {} scroll attempts", MAX_SCROLL_ATTEMPTS);
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_match_exact() {
        assert!(labels_match("03_intro", "03_intro"));
    }

    #[test]
    fn test_labels_match_case_and_whitespace() {
        assert!(labels_match("03_Intro", "  03_intro "));
    }

    #[test]
    fn test_labels_match_truncated_display() {
        // The panel truncates long names; the label is a prefix of the id.
        assert!(labels_match("03_a_very_long_narration_name", "03_a_very_lo"));
    }

    #[test]
    fn test_labels_match_longer_display() {
        // Display may append the extension the stem lacks.
        assert!(labels_match("03_intro", "03_intro.mp3"));
    }

    #[test]
    fn test_labels_do_not_match_disjoint() {
        assert!(!labels_match("03_intro", "04_outro"));
    }

    #[test]
    fn test_empty_labels_never_match() {
        assert!(!labels_match("", "anything"));
        assert!(!labels_match("anything", "   "));
    }
}
