//! Timeline placement orchestration.
//!
//! Assets are processed strictly sequentially in descending order-key order.
//! Background audio is placed with a single idempotent click; narration and
//! video are dragged from their card to a fixed per-kind drop coordinate.
//!
//! Dragged kinds carry a dependency rule: before a non-first task starts its
//! drag, the task with the next-higher order key (the one processed just
//! before it) must show its added indicator. The surface re-flows the
//! not-yet-placed cards every time an item lands on the timeline, so acting
//! before the previous insertion has settled means dragging from a stale
//! position. The wait is bounded; on timeout the drag proceeds degraded
//! rather than aborting the run.

use std::collections::HashMap;

use crate::assets::{MediaAsset, MediaKind};
use crate::config::{PlacementConfig, Point};
use crate::locator::{self, Card};
use crate::overlay;
use crate::poll::{poll_until, PollOutcome};
use crate::surface::Surface;

/// One unit of placement work, created per asset and consumed once.
#[derive(Debug, Clone)]
pub struct PlacementTask {
    pub asset: MediaAsset,
    /// Drop coordinate for dragged kinds; `None` for click placement.
    pub target: Option<Point>,
    /// First task of its kind's sequence skips the predecessor wait.
    pub first_in_sequence: bool,
}

/// Per-asset outcome of a placement run.
#[derive(Debug, Clone)]
pub struct PlacementReport {
    pub asset: MediaAsset,
    pub placed: bool,
}

/// Sequences placement of an ordered asset list against one surface.
pub struct Placer<'a> {
    surface: &'a dyn Surface,
    cfg: &'a PlacementConfig,
}

impl<'a> Placer<'a> {
    pub fn new(surface: &'a dyn Surface, cfg: &'a PlacementConfig) -> Self {
        Self { surface, cfg }
    }

    /// Place every asset, in the given order, and report per-asset outcomes.
    ///
    /// A failed placement is logged and does not halt the run; the asset
    /// still becomes the predecessor of the next task of its kind, so the
    /// dependency wait will simply time out and degrade for that successor.
    pub async fn place_all(&self, assets: &[MediaAsset]) -> Vec<PlacementReport> {
        let mut previous: HashMap<MediaKind, MediaAsset> = HashMap::new();
        let mut reports = Vec::with_capacity(assets.len());

        for asset in assets {
            let predecessor = previous.get(&asset.kind).cloned();
            let task = PlacementTask {
                asset: asset.clone(),
                target: self.drop_target(asset.kind),
                first_in_sequence: predecessor.is_none(),
            };

            overlay::suppress(self.surface).await;

            let placed = if asset.kind.is_dragged() {
                self.place_dragged(&task, predecessor.as_ref()).await
            } else {
                self.place_clicked(&task).await
            };

            if placed {
                crate::ok!("'{}' placed", asset.id);
            } else {
                log::warn!("placement failed for '{}', continuing", asset.id);
            }

            previous.insert(asset.kind, asset.clone());
            reports.push(PlacementReport {
                asset: asset.clone(),
                placed,
            });
        }

        reports
    }

    fn drop_target(&self, kind: MediaKind) -> Option<Point> {
        match kind {
            MediaKind::BackgroundAudio => None,
            MediaKind::NarrationAudio => Some(self.cfg.narration_drop),
            MediaKind::Video => Some(self.cfg.video_drop),
        }
    }

    /// Click placement for background audio. Idempotent: a card already
    /// carrying the added indicator is reported successful without a click.
    async fn place_clicked(&self, task: &PlacementTask) -> bool {
        let name = &task.asset.id;
        let Some(card) = self.resolve_fresh(name).await else {
            return false;
        };

        if card.added {
            crate::ok!("'{}' already added, skipping click", name);
            return true;
        }

        log::info!("clicking '{}'", name);
        if let Err(e) = self.surface.click(&card.handle).await {
            log::error!("click failed for '{}': {}", name, e);
            return false;
        }

        self.confirm_added(name).await
    }

    /// Drag placement for narration audio and video.
    async fn place_dragged(
        &self,
        task: &PlacementTask,
        predecessor: Option<&MediaAsset>,
    ) -> bool {
        let name = &task.asset.id;

        match predecessor {
            Some(prev) if !task.first_in_sequence => {
                self.await_predecessor(prev).await;
            }
            _ => log::debug!("first {} task '{}', dragging directly", task.asset.kind.label(), name),
        }

        // Resolve after the wait: the predecessor's insertion may have
        // shifted this card.
        overlay::suppress(self.surface).await;
        let Some(card) = self.resolve_fresh(name).await else {
            return false;
        };
        if !card.interactable {
            log::warn!("'{}' may be off-screen, attempting drag anyway", name);
        }

        let Some(bbox) = card.bbox else {
            log::warn!("no coordinates for card '{}'", name);
            return false;
        };
        let Some(target) = task.target else {
            log::error!("no drop target for kind {:?}", task.asset.kind);
            return false;
        };

        log::info!(
            "dragging '{}' to ({:.0},{:.0})",
            name,
            target.x,
            target.y
        );
        if let Err(e) = self
            .surface
            .drag(bbox.center(), (target.x, target.y), self.cfg.drag_steps)
            .await
        {
            log::error!("drag failed for '{}': {}", name, e);
            return false;
        }

        self.confirm_added(name).await
    }

    /// Bounded wait for the predecessor's added indicator. Timing out is
    /// degraded, not fatal: the drag proceeds either way.
    async fn await_predecessor(&self, prev: &MediaAsset) {
        log::debug!("waiting for added indicator on predecessor '{}'", prev.id);
        let outcome = poll_until(
            || self.badge_present(&prev.id),
            self.cfg.badge_poll(),
            self.cfg.dependency_wait(),
        )
        .await;

        match outcome {
            PollOutcome::Completed => {
                log::debug!("predecessor '{}' confirmed added", prev.id)
            }
            PollOutcome::TimedOut => log::warn!(
                "predecessor '{}' never showed its added indicator, proceeding anyway",
                prev.id
            ),
        }
    }

    /// Whether the placement of `name` is visible on its card right now.
    async fn badge_present(&self, name: &str) -> bool {
        match locator::resolve(self.surface, name, self.cfg.panel_wait()).await {
            Ok(Some(card)) => card.added,
            Ok(None) => false,
            Err(e) => {
                log::debug!("badge check failed for '{}': {}", name, e);
                false
            }
        }
    }

    /// Bounded wait for the just-placed asset's own added indicator; this is
    /// the per-task success criterion.
    async fn confirm_added(&self, name: &str) -> bool {
        let outcome = poll_until(
            || self.badge_present(name),
            self.cfg.badge_poll(),
            self.cfg.confirm_wait(),
        )
        .await;

        if outcome == PollOutcome::TimedOut {
            log::warn!("added indicator never appeared for '{}'", name);
        }
        outcome.completed()
    }

    async fn resolve_fresh(&self, name: &str) -> Option<Card> {
        match locator::resolve(self.surface, name, self.cfg.panel_wait()).await {
            Ok(card) => card,
            Err(e) => {
                log::error!("card lookup failed for '{}': {}", name, e);
                None
            }
        }
    }
}
