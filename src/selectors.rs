//! CSS selectors and button vocabularies for the remote editor surface.
//!
//! These are the fixed hooks the editor exposes. They are obfuscated class
//! names generated by the editor's build, so they change when the editor
//! ships a new bundle; keeping them in one place makes that a one-file fix.

/// A media card in the asset browsing panel.
pub const CARD: &str = ".containter-gWXoeD";

/// The filename label inside a card.
pub const CARD_LABEL: &str = ".card-item-label-POvntE";

/// Indicator that a card's asset has been placed on the timeline.
pub const ADDED_BADGE: &str = ".badge-added-ztq24Q";

/// Digit units of the duration badge inside a card.
pub const DURATION_UNITS: &str = ".badge-duration-dYEO3g .unit-rYitVh";

/// Modal mask that blocks pointer interaction while a dialog is open.
pub const MODAL_MASK: &str = ".lv-modal-mask";

/// Modal wrapper containers removed when resetting a half-open export dialog.
pub const MODAL_WRAPPER: &str = ".lv-modal-wrapper";

/// Button labels that dismiss an informational popup, matched
/// case-insensitively against button text.
pub const DISMISS_LABELS: &[&str] = &["ok", "got it", "close", "dismiss"];

/// Top-level export button in the editor header.
pub const EXPORT_BUTTON: &str = "#export-video-btn";

/// Download entry in the menu opened by the export button.
pub const EXPORT_MENU_DOWNLOAD: &str = ".button-QK_D5I";

/// Confirm button in the export settings dialog.
pub const EXPORT_CONFIRM: &str = "#export-confirm-button";

/// Integer part of the render progress readout.
pub const PROGRESS_INT: &str = ".lv-statistic-value-int";

/// Fractional part of the render progress readout.
pub const PROGRESS_DECIMAL: &str = ".lv-statistic-value-decimal";

/// Download control shown once rendering completes.
pub const DOWNLOAD_BUTTON: &str = ".downloadButton";

/// Track mute buttons in the timeline toolbar.
pub const MUTE_BUTTON: &str = "button.lv-btn.lv-btn-text.lv-btn-size-mini.lv-btn-shape-square";
