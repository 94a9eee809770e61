//! Best-effort suppression of blocking overlays.
//!
//! The editor throws modal masks, popups, and tutorial banners over the
//! document at unpredictable times, and a pointer gesture that lands on one
//! is lost. Every interaction in the orchestrator is preceded by a
//! [`suppress`] pass. Suppression is housekeeping, not a correctness gate:
//! it never returns an error, and repeated calls with nothing to remove do
//! nothing.

use std::time::Duration;

use crate::selectors;
use crate::surface::Surface;

/// Upper bound on mask-removal passes so an overlay the surface keeps
/// re-inserting cannot spin the loop forever.
const MAX_MASK_PASSES: u32 = 10;

/// Pause after each mask-removal pass, giving the surface time to settle.
const MASK_SETTLE: Duration = Duration::from_millis(300);

/// Pause after dismissing a popup button.
const BUTTON_SETTLE: Duration = Duration::from_millis(500);

/// Remove modal masks and dismiss popup buttons currently on the surface.
///
/// Masks are force-removed via script in a bounded loop; any button whose
/// label matches the affirmative vocabulary is clicked once. All failures
/// are swallowed and logged.
pub async fn suppress(surface: &dyn Surface) {
    log::debug!("checking for overlays before interacting");

    let mut removed = 0u32;
    for _ in 0..MAX_MASK_PASSES {
        let masks = match surface.query_all(selectors::MODAL_MASK).await {
            Ok(masks) => masks,
            Err(e) => {
                log::debug!("overlay mask query failed: {}", e);
                break;
            }
        };
        if masks.is_empty() {
            break;
        }
        for mask in &masks {
            match surface.eval_on(mask, "arguments[0].remove()").await {
                Ok(_) => {
                    removed += 1;
                    log::debug!("modal mask removed");
                }
                Err(e) => log::debug!("failed to remove modal mask: {}", e),
            }
        }
        tokio::time::sleep(MASK_SETTLE).await;
    }

    let mut dismissed = 0u32;
    match surface.query_all("button").await {
        Ok(buttons) => {
            for button in &buttons {
                let label = match surface.text(button).await {
                    Ok(text) => text.trim().to_lowercase(),
                    Err(_) => continue,
                };
                if !selectors::DISMISS_LABELS.iter().any(|l| label == *l) {
                    continue;
                }
                match surface.click(button).await {
                    Ok(_) => {
                        dismissed += 1;
                        log::debug!("dismissed popup via '{}' button", label);
                        tokio::time::sleep(BUTTON_SETTLE).await;
                    }
                    Err(e) => log::debug!("popup button click failed: {}", e),
                }
            }
        }
        Err(e) => log::debug!("popup button query failed: {}", e),
    }

    if removed > 0 || dismissed > 0 {
        crate::ok!(
            "overlays cleared ({} mask(s) removed, {} popup(s) dismissed)",
            removed,
            dismissed
        );
    }
}
