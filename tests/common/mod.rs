//! In-memory fake of the remote editor surface.
//!
//! Simulates just enough of the card panel, export dialog, and download
//! behavior to drive placement and export scenarios without a browser.
//! Element handles encode their meaning in the id string (`card:0`,
//! `sel:#export-video-btn`, ...), mirroring how real handles are opaque
//! tokens.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use cliprig::selectors;
use cliprig::surface::{BoundingBox, ElementHandle, Surface, SurfaceError};

pub fn bbox_at(x: f64, y: f64) -> BoundingBox {
    BoundingBox {
        x,
        y,
        width: 120.0,
        height: 80.0,
    }
}

#[derive(Debug, Clone)]
pub struct MockCard {
    pub label: String,
    pub added: bool,
    /// Badge queries remaining before a placed card shows its indicator.
    pub pending: Option<u32>,
    pub bbox: BoundingBox,
}

impl MockCard {
    pub fn new(label: &str, index: usize) -> Self {
        Self {
            label: label.to_string(),
            added: false,
            pending: None,
            bbox: bbox_at(20.0, 20.0 + index as f64 * 90.0),
        }
    }

    pub fn added(mut self) -> Self {
        self.added = true;
        self
    }

    pub fn off_screen(mut self) -> Self {
        self.bbox.x = -200.0;
        self.bbox.y = -50.0;
        self
    }
}

/// One recorded drag gesture, with the set of cards already showing their
/// indicator at the moment the drag began.
#[derive(Debug, Clone)]
pub struct DragEvent {
    pub label: String,
    pub to: (f64, f64),
    pub added_at_start: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MockState {
    pub cards: Vec<MockCard>,
    /// Badge queries a freshly placed card stays invisible for.
    pub badge_latency: u32,
    /// Labels whose placement silently never takes effect.
    pub placement_void: HashSet<String>,

    pub masks: u32,
    pub removed_masks: u32,
    pub dismiss_buttons: Vec<String>,
    pub dismissed: Vec<String>,

    pub mute_buttons: u32,
    pub mute_clicks: u32,

    /// Joined duration-badge text every card reports, e.g. "02:30".
    pub duration_text: Option<String>,

    /// Export dialog controls currently present, by selector.
    pub controls: HashSet<String>,
    pub control_clicks: Vec<String>,
    pub wait_for_calls: Vec<String>,

    /// Successive (integer, decimal) progress readings; the last one repeats.
    pub progress: Vec<(String, String)>,
    pub progress_idx: usize,

    /// Body of the native download; `None` makes interception fail.
    pub native_download: Option<Vec<u8>>,
    pub download_href: Option<String>,

    pub scroll_calls: u32,
    /// Scroll nudges after which every card becomes on-screen.
    pub scrolls_until_visible: Option<u32>,

    pub clicks: Vec<String>,
    pub drags: Vec<DragEvent>,
    pub eval_scripts: Vec<String>,
    pub navigations: Vec<String>,
}

pub struct MockSurface {
    pub state: Mutex<MockState>,
    download_dir: tempfile::TempDir,
}

impl MockSurface {
    pub fn new(state: MockState) -> Self {
        Self {
            state: Mutex::new(state),
            download_dir: tempfile::tempdir().expect("temp download dir"),
        }
    }

    pub fn with_cards(labels: &[&str]) -> Self {
        let mut state = MockState::default();
        state.cards = labels
            .iter()
            .enumerate()
            .map(|(i, l)| MockCard::new(l, i))
            .collect();
        Self::new(state)
    }

    fn card_index(handle: &ElementHandle, prefix: &str) -> Option<usize> {
        handle.0.strip_prefix(prefix).and_then(|s| s.parse().ok())
    }

    /// Consume one badge-query tick for a placed card.
    fn badge_tick(card: &mut MockCard) -> bool {
        if let Some(remaining) = card.pending {
            if remaining == 0 {
                card.added = true;
                card.pending = None;
            } else {
                card.pending = Some(remaining - 1);
            }
        }
        card.added
    }

    fn begin_placement(state: &mut MockState, index: usize) {
        let latency = state.badge_latency;
        let label = state.cards[index].label.clone();
        if state.placement_void.contains(&label) {
            return;
        }
        let card = &mut state.cards[index];
        if !card.added && card.pending.is_none() {
            card.pending = Some(latency);
        }
    }

    fn added_labels(state: &MockState) -> Vec<String> {
        state
            .cards
            .iter()
            .filter(|c| c.added)
            .map(|c| c.label.clone())
            .collect()
    }
}

#[async_trait]
impl Surface for MockSurface {
    async fn goto(&self, url: &str) -> Result<(), SurfaceError> {
        self.state.lock().unwrap().navigations.push(url.to_string());
        Ok(())
    }

    async fn wait_for(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementHandle, SurfaceError> {
        let mut state = self.state.lock().unwrap();
        state.wait_for_calls.push(selector.to_string());
        if selector == selectors::CARD {
            if !state.cards.is_empty() {
                return Ok(ElementHandle("card:0".into()));
            }
        } else if state.controls.contains(selector) {
            return Ok(ElementHandle(format!("sel:{}", selector)));
        }
        Err(SurfaceError::WaitTimeout {
            selector: selector.to_string(),
            timeout,
        })
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, SurfaceError> {
        let state = self.state.lock().unwrap();
        let handles = match selector {
            s if s == selectors::CARD => (0..state.cards.len())
                .map(|i| ElementHandle(format!("card:{}", i)))
                .collect(),
            s if s == selectors::MODAL_MASK => (0..state.masks)
                .map(|i| ElementHandle(format!("mask:{}", i)))
                .collect(),
            "button" => (0..state.dismiss_buttons.len())
                .map(|i| ElementHandle(format!("btn:{}", i)))
                .collect(),
            s if s == selectors::MUTE_BUTTON => (0..state.mute_buttons)
                .map(|i| ElementHandle(format!("mute:{}", i)))
                .collect(),
            s if s == selectors::PROGRESS_INT => {
                if state.progress.is_empty() {
                    vec![]
                } else {
                    vec![ElementHandle("stat:int".into())]
                }
            }
            s if s == selectors::PROGRESS_DECIMAL => {
                if state.progress.is_empty() {
                    vec![]
                } else {
                    vec![ElementHandle("stat:dec".into())]
                }
            }
            _ => vec![],
        };
        Ok(handles)
    }

    async fn query_within(
        &self,
        element: &ElementHandle,
        selector: &str,
    ) -> Result<Option<ElementHandle>, SurfaceError> {
        let mut state = self.state.lock().unwrap();
        if let Some(i) = Self::card_index(element, "card:") {
            if i >= state.cards.len() {
                return Err(SurfaceError::Stale);
            }
            if selector == selectors::CARD_LABEL {
                return Ok(Some(ElementHandle(format!("label:{}", i))));
            }
            if selector == selectors::ADDED_BADGE {
                let added = Self::badge_tick(&mut state.cards[i]);
                return Ok(added.then(|| ElementHandle(format!("badge:{}", i))));
            }
            return Ok(None);
        }
        if element.0 == format!("sel:{}", selectors::DOWNLOAD_BUTTON) && selector == "a" {
            return Ok(state
                .download_href
                .is_some()
                .then(|| ElementHandle("link".into())));
        }
        Ok(None)
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, SurfaceError> {
        let mut state = self.state.lock().unwrap();
        if let Some(i) = Self::card_index(element, "label:") {
            return state
                .cards
                .get(i)
                .map(|c| c.label.clone())
                .ok_or(SurfaceError::Stale);
        }
        if let Some(i) = Self::card_index(element, "btn:") {
            return Ok(state.dismiss_buttons.get(i).cloned().unwrap_or_default());
        }
        if element.0 == "stat:int" {
            let idx = state.progress_idx.min(state.progress.len().saturating_sub(1));
            return Ok(state.progress.get(idx).map(|p| p.0.clone()).unwrap_or_default());
        }
        if element.0 == "stat:dec" {
            let idx = state.progress_idx.min(state.progress.len().saturating_sub(1));
            let text = state.progress.get(idx).map(|p| p.1.clone()).unwrap_or_default();
            if state.progress_idx + 1 < state.progress.len() {
                state.progress_idx += 1;
            }
            return Ok(text);
        }
        Ok(String::new())
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SurfaceError> {
        let state = self.state.lock().unwrap();
        if element.0 == "link" && name == "href" {
            return Ok(state.download_href.clone());
        }
        Ok(None)
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), SurfaceError> {
        let mut state = self.state.lock().unwrap();
        if let Some(i) = Self::card_index(element, "card:") {
            if i >= state.cards.len() {
                return Err(SurfaceError::Stale);
            }
            let label = state.cards[i].label.clone();
            state.clicks.push(label);
            Self::begin_placement(&mut state, i);
            return Ok(());
        }
        if let Some(i) = Self::card_index(element, "btn:") {
            if i < state.dismiss_buttons.len() {
                let label = state.dismiss_buttons.remove(i);
                state.dismissed.push(label);
            }
            return Ok(());
        }
        if element.0.starts_with("mute:") {
            state.mute_clicks += 1;
            return Ok(());
        }
        if let Some(selector) = element.0.strip_prefix("sel:") {
            state.control_clicks.push(selector.to_string());
            return Ok(());
        }
        Ok(())
    }

    async fn bounding_box(
        &self,
        element: &ElementHandle,
    ) -> Result<Option<BoundingBox>, SurfaceError> {
        let state = self.state.lock().unwrap();
        if let Some(i) = Self::card_index(element, "card:") {
            return Ok(state.cards.get(i).map(|c| c.bbox));
        }
        Ok(Some(bbox_at(0.0, 0.0)))
    }

    async fn drag(
        &self,
        from: (f64, f64),
        to: (f64, f64),
        _steps: u32,
    ) -> Result<(), SurfaceError> {
        let mut state = self.state.lock().unwrap();
        let index = state.cards.iter().position(|c| {
            let (cx, cy) = c.bbox.center();
            (cx - from.0).abs() < 0.01 && (cy - from.1).abs() < 0.01
        });
        let label = index
            .map(|i| state.cards[i].label.clone())
            .unwrap_or_else(|| "?".to_string());
        let added_at_start = Self::added_labels(&state);
        state.drags.push(DragEvent {
            label,
            to,
            added_at_start,
        });
        if let Some(i) = index {
            Self::begin_placement(&mut state, i);
        }
        Ok(())
    }

    async fn eval(&self, script: &str) -> Result<serde_json::Value, SurfaceError> {
        let mut state = self.state.lock().unwrap();
        state.eval_scripts.push(script.to_string());
        Ok(serde_json::Value::Null)
    }

    async fn eval_on(
        &self,
        element: &ElementHandle,
        script: &str,
    ) -> Result<serde_json::Value, SurfaceError> {
        let mut state = self.state.lock().unwrap();
        state.eval_scripts.push(script.to_string());

        if script.contains(".remove()") && element.0.starts_with("mask:") {
            if state.masks > 0 {
                state.masks -= 1;
                state.removed_masks += 1;
            }
            return Ok(serde_json::Value::Null);
        }

        if script.contains(selectors::DURATION_UNITS) {
            let text = state.duration_text.clone().unwrap_or_default();
            return Ok(serde_json::Value::String(text));
        }

        if script.contains("scrollBy") {
            state.scroll_calls += 1;
            if let Some(threshold) = state.scrolls_until_visible {
                if state.scroll_calls >= threshold {
                    for card in &mut state.cards {
                        if !card.bbox.is_on_screen() {
                            card.bbox.x = card.bbox.x.abs();
                            card.bbox.y = card.bbox.y.abs();
                        }
                    }
                }
            }
            return Ok(serde_json::Value::Null);
        }

        Ok(serde_json::Value::Null)
    }

    async fn wait_for_download(&self, timeout: Duration) -> Result<PathBuf, SurfaceError> {
        let body = self.state.lock().unwrap().native_download.clone();
        match body {
            Some(bytes) => {
                let path = self.download_dir.path().join("export.mp4");
                std::fs::write(&path, bytes)?;
                Ok(path)
            }
            None => Err(SurfaceError::DownloadTimeout(timeout)),
        }
    }
}
