//! Media asset discovery and ordering.
//!
//! Local media files carry a leading zero-padded numeric prefix
//! (`03_intro.mp3`) that establishes processing order. Assets are processed
//! in *descending* prefix order; the placement dependency chain relies on
//! this exact ordering, so it is a domain contract and covered by tests.

use std::io;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

/// Order key assigned to files without a numeric prefix. Sorts after every
/// real prefix in descending order.
pub const UNPREFIXED_KEY: i64 = i64::MIN;

static PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)_").expect("valid prefix regex"));

/// The kind of media an asset holds. Determines how it is placed on the
/// timeline: background audio is clicked in, the other two are dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    BackgroundAudio,
    NarrationAudio,
    Video,
}

impl MediaKind {
    /// Whether placement of this kind is a drag gesture (as opposed to a click).
    pub fn is_dragged(&self) -> bool {
        !matches!(self, MediaKind::BackgroundAudio)
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::BackgroundAudio => "background audio",
            MediaKind::NarrationAudio => "narration audio",
            MediaKind::Video => "video",
        }
    }
}

/// One local media file, identified by its filename stem.
///
/// Immutable once discovered; lives for a single orchestration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    /// Filename stem, used to match the on-screen card label.
    pub id: String,
    pub kind: MediaKind,
    /// Leading numeric prefix of the filename, or [`UNPREFIXED_KEY`].
    pub order_key: i64,
}

impl MediaAsset {
    pub fn new(id: impl Into<String>, kind: MediaKind) -> Self {
        let id = id.into();
        let order_key = order_key(&id);
        Self { id, kind, order_key }
    }
}

/// Extract the order key from a filename stem.
///
/// `"03_intro"` yields 3; a stem without a `NN_` prefix yields
/// [`UNPREFIXED_KEY`].
pub fn order_key(stem: &str) -> i64 {
    PREFIX_RE
        .captures(stem)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .unwrap_or(UNPREFIXED_KEY)
}

/// Sort assets by order key, descending, stable.
///
/// Stability means unprefixed files (all sharing [`UNPREFIXED_KEY`]) keep
/// their enumeration order after every prefixed file.
pub fn sort_assets(assets: &mut [MediaAsset]) {
    assets.sort_by(|a, b| b.order_key.cmp(&a.order_key));
}

/// List files with the given extension in `dir` and return them as assets in
/// descending prefix order.
///
/// The extension is matched case-insensitively, with or without a leading
/// dot. Subdirectories are ignored.
pub fn order_assets(dir: &Path, extension: &str, kind: MediaKind) -> io::Result<Vec<MediaAsset>> {
    let want = extension.trim_start_matches('.').to_ascii_lowercase();

    let mut assets = Vec::new();
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    // read_dir order is platform-defined; fix enumeration order by name so
    // the tie-break contract is deterministic.
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(&want))
            .unwrap_or(false);
        if !matches {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            assets.push(MediaAsset::new(stem, kind));
        }
    }

    sort_assets(&mut assets);
    log::info!(
        "{} {} file(s) found in {}",
        assets.len(),
        kind.label(),
        dir.display()
    );
    Ok(assets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(assets: &[MediaAsset]) -> Vec<&str> {
        assets.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn test_order_key_extraction() {
        assert_eq!(order_key("03_intro"), 3);
        assert_eq!(order_key("0010_end"), 10);
        assert_eq!(order_key("12"), UNPREFIXED_KEY);
        assert_eq!(order_key("intro_03"), UNPREFIXED_KEY);
        assert_eq!(order_key("ambient"), UNPREFIXED_KEY);
        assert_eq!(order_key(""), UNPREFIXED_KEY);
    }

    #[test]
    fn test_order_key_overflow_sorts_last() {
        // A prefix that does not fit in i64 is treated as unprefixed.
        assert_eq!(order_key("99999999999999999999999_x"), UNPREFIXED_KEY);
    }

    #[test]
    fn test_sort_descending_by_prefix() {
        let mut assets = vec![
            MediaAsset::new("01_z", MediaKind::NarrationAudio),
            MediaAsset::new("03_x", MediaKind::NarrationAudio),
            MediaAsset::new("02_y", MediaKind::NarrationAudio),
        ];
        sort_assets(&mut assets);
        assert_eq!(ids(&assets), vec!["03_x", "02_y", "01_z"]);
    }

    #[test]
    fn test_unprefixed_sort_after_prefixed_keeping_order() {
        let mut assets = vec![
            MediaAsset::new("ambient", MediaKind::BackgroundAudio),
            MediaAsset::new("02_beat", MediaKind::BackgroundAudio),
            MediaAsset::new("birds", MediaKind::BackgroundAudio),
            MediaAsset::new("10_bass", MediaKind::BackgroundAudio),
        ];
        sort_assets(&mut assets);
        assert_eq!(ids(&assets), vec!["10_bass", "02_beat", "ambient", "birds"]);
    }

    #[test]
    fn test_ties_preserve_enumeration_order() {
        let mut assets = vec![
            MediaAsset::new("02_first", MediaKind::Video),
            MediaAsset::new("02_second", MediaKind::Video),
            MediaAsset::new("01_last", MediaKind::Video),
        ];
        sort_assets(&mut assets);
        assert_eq!(ids(&assets), vec!["02_first", "02_second", "01_last"]);
    }

    #[test]
    fn test_order_assets_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["01_z.mp3", "03_x.mp3", "02_y.mp3", "notes.txt", "loop.mp3"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let assets = order_assets(dir.path(), ".mp3", MediaKind::NarrationAudio).unwrap();
        assert_eq!(ids(&assets), vec!["03_x", "02_y", "01_z", "loop"]);
        assert!(assets.iter().all(|a| a.kind == MediaKind::NarrationAudio));
    }

    #[test]
    fn test_order_assets_extension_without_dot() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("01_q.MP4"), b"x").unwrap();
        let assets = order_assets(dir.path(), "mp4", MediaKind::Video).unwrap();
        assert_eq!(ids(&assets), vec!["01_q"]);
    }

    #[test]
    fn test_order_assets_missing_dir_is_error() {
        let result = order_assets(Path::new("/no/such/dir/cliprig"), ".mp3", MediaKind::Video);
        assert!(result.is_err());
    }
}
