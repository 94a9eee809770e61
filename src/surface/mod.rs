//! Abstraction over the remote editor surface.
//!
//! The orchestrator only ever talks to the editor through the [`Surface`]
//! trait: the small set of control primitives the remote application exposes
//! (navigation, element lookup, clicks, pointer gestures, script evaluation,
//! download interception). The production implementation speaks the W3C
//! WebDriver protocol ([`WebDriverSurface`]); tests substitute an in-memory
//! fake.
//!
//! Element handles are lookup results, not owned references. The remote
//! document mutates as a side effect of every placement, so callers re-resolve
//! instead of caching.

mod webdriver;

pub use webdriver::WebDriverSurface;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

/// Opaque reference to one element on the remote surface.
///
/// Valid only until the remote document mutates; treat as disposable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle(pub String);

/// Axis-aligned bounding box of an element, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Negative coordinates mean the element sits outside the visible area
    /// of its scroll container.
    pub fn is_on_screen(&self) -> bool {
        self.x >= 0.0 && self.y >= 0.0
    }
}

/// Errors surfaced by remote-surface primitives.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("no element matches selector '{selector}'")]
    NotFound { selector: String },

    #[error("timed out after {timeout:?} waiting for selector '{selector}'")]
    WaitTimeout { selector: String, timeout: Duration },

    #[error("stale element reference")]
    Stale,

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("click failed: {0}")]
    Click(String),

    #[error("pointer gesture failed: {0}")]
    Pointer(String),

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("no download materialized within {0:?}")]
    DownloadTimeout(Duration),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Control primitives of the remote editor surface.
///
/// One logical caller drives one surface sequentially; concurrent use is
/// unsupported.
#[async_trait]
pub trait Surface: Send + Sync {
    /// Navigate the surface to `url` and wait for the load event.
    async fn goto(&self, url: &str) -> Result<(), SurfaceError>;

    /// Wait up to `timeout` for at least one element matching `selector`,
    /// returning the first match.
    async fn wait_for(&self, selector: &str, timeout: Duration)
        -> Result<ElementHandle, SurfaceError>;

    /// All elements currently matching `selector`. An empty result is not an
    /// error.
    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, SurfaceError>;

    /// First descendant of `element` matching `selector`, if any.
    async fn query_within(
        &self,
        element: &ElementHandle,
        selector: &str,
    ) -> Result<Option<ElementHandle>, SurfaceError>;

    /// Visible text content of `element`.
    async fn text(&self, element: &ElementHandle) -> Result<String, SurfaceError>;

    /// Attribute value of `element`, if present.
    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SurfaceError>;

    /// Click `element`.
    async fn click(&self, element: &ElementHandle) -> Result<(), SurfaceError>;

    /// Bounding box of `element`, or `None` when the surface reports no
    /// layout for it.
    async fn bounding_box(
        &self,
        element: &ElementHandle,
    ) -> Result<Option<BoundingBox>, SurfaceError>;

    /// Press at `from`, move to `to` in `steps` interpolated pointer moves,
    /// release.
    async fn drag(
        &self,
        from: (f64, f64),
        to: (f64, f64),
        steps: u32,
    ) -> Result<(), SurfaceError>;

    /// Evaluate a script against the document. The script body receives no
    /// arguments.
    async fn eval(&self, script: &str) -> Result<serde_json::Value, SurfaceError>;

    /// Evaluate a script with `element` bound to `arguments[0]`.
    async fn eval_on(
        &self,
        element: &ElementHandle,
        script: &str,
    ) -> Result<serde_json::Value, SurfaceError>;

    /// Wait for a native download triggered by the surface and return the
    /// local path it was written to.
    async fn wait_for_download(&self, timeout: Duration) -> Result<PathBuf, SurfaceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_center() {
        let bbox = BoundingBox {
            x: 10.0,
            y: 20.0,
            width: 100.0,
            height: 40.0,
        };
        assert_eq!(bbox.center(), (60.0, 40.0));
    }

    #[test]
    fn test_bounding_box_on_screen() {
        let on = BoundingBox { x: 0.0, y: 0.0, width: 1.0, height: 1.0 };
        let off_x = BoundingBox { x: -5.0, y: 10.0, width: 1.0, height: 1.0 };
        let off_y = BoundingBox { x: 5.0, y: -0.5, width: 1.0, height: 1.0 };
        assert!(on.is_on_screen());
        assert!(!off_x.is_on_screen());
        assert!(!off_y.is_on_screen());
    }
}
