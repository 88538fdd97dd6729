//! Content-type policy for searchee enumeration.
//!
//! Three independent flags decide which release kinds are eligible for
//! cross-seeding. They combine by union; `include_episodes` supersedes
//! `include_single_episodes` for episodes that belong to season packs.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::SearcheeFile;

static EPISODE_RE: Lazy<Regex> = Lazy::new(|| {
    // S01E02-style and 1x02-style episode markers
    Regex::new(r"(?i)\bs\d{1,4}[.\s_-]?e\d{1,4}\b|\b\d{1,2}x\d{2,3}\b").unwrap()
});

static SEASON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bs(eason[.\s_-]?)?\d{1,4}\b").unwrap()
});

const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "m4v", "mov", "wmv", "mpg", "mpeg", "ts", "m2ts", "webm",
];

/// Coarse classification of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseKind {
    /// A single episode that belongs to a season pack on disk.
    PackEpisode,
    /// A standalone single-episode release.
    StandaloneEpisode,
    /// A full season pack.
    SeasonPack,
    /// Any other release containing video (movies, discographies with
    /// music videos, ...).
    Video,
    /// No video files at all.
    NonVideo,
}

/// Classify a release from its name, file listing and (for data scans)
/// the name of the directory it was found under.
pub fn classify(name: &str, files: &[SearcheeFile], parent_name: Option<&str>) -> ReleaseKind {
    let has_video = files.iter().any(|f| {
        f.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| VIDEO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false)
    });

    if !has_video {
        return ReleaseKind::NonVideo;
    }

    if EPISODE_RE.is_match(name) {
        let from_pack = parent_name
            .map(|p| SEASON_RE.is_match(p) && !EPISODE_RE.is_match(p))
            .unwrap_or(false);
        return if from_pack {
            ReleaseKind::PackEpisode
        } else {
            ReleaseKind::StandaloneEpisode
        };
    }

    if SEASON_RE.is_match(name) {
        return ReleaseKind::SeasonPack;
    }

    ReleaseKind::Video
}

/// Which release kinds are eligible, per configuration flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentPolicy {
    pub include_episodes: bool,
    pub include_single_episodes: bool,
    pub include_non_videos: bool,
}

impl ContentPolicy {
    pub fn allows(&self, kind: ReleaseKind) -> bool {
        match kind {
            // Pack episodes only when all episodes are requested
            ReleaseKind::PackEpisode => self.include_episodes,
            // include_episodes supersedes include_single_episodes
            ReleaseKind::StandaloneEpisode => {
                self.include_episodes || self.include_single_episodes
            }
            ReleaseKind::NonVideo => self.include_non_videos,
            ReleaseKind::SeasonPack | ReleaseKind::Video => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn files(paths: &[&str]) -> Vec<SearcheeFile> {
        paths
            .iter()
            .map(|p| SearcheeFile {
                path: PathBuf::from(p),
                size_bytes: 100,
            })
            .collect()
    }

    #[test]
    fn test_classify_movie() {
        let kind = classify(
            "Some.Movie.2021.1080p.BluRay",
            &files(&["Some.Movie.2021.1080p.BluRay/movie.mkv"]),
            None,
        );
        assert_eq!(kind, ReleaseKind::Video);
    }

    #[test]
    fn test_classify_standalone_episode() {
        let kind = classify(
            "Show.S02E05.1080p.WEB",
            &files(&["Show.S02E05.1080p.WEB.mkv"]),
            None,
        );
        assert_eq!(kind, ReleaseKind::StandaloneEpisode);

        let kind = classify("Show.2x05.HDTV", &files(&["Show.2x05.HDTV.avi"]), None);
        assert_eq!(kind, ReleaseKind::StandaloneEpisode);
    }

    #[test]
    fn test_classify_pack_episode() {
        let kind = classify(
            "Show.S02E05.1080p.WEB.mkv",
            &files(&["Show.S02E05.1080p.WEB.mkv"]),
            Some("Show.S02.1080p.WEB"),
        );
        assert_eq!(kind, ReleaseKind::PackEpisode);
    }

    #[test]
    fn test_classify_season_pack() {
        let kind = classify(
            "Show.S02.1080p.WEB",
            &files(&["Show.S02.1080p.WEB/Show.S02E01.mkv"]),
            None,
        );
        assert_eq!(kind, ReleaseKind::SeasonPack);

        let kind = classify(
            "Show Season 3 Complete",
            &files(&["Show Season 3 Complete/e01.mkv"]),
            None,
        );
        assert_eq!(kind, ReleaseKind::SeasonPack);
    }

    #[test]
    fn test_classify_non_video() {
        let kind = classify(
            "Artist - Album [FLAC]",
            &files(&["Artist - Album [FLAC]/01.flac", "Artist - Album [FLAC]/02.flac"]),
            None,
        );
        assert_eq!(kind, ReleaseKind::NonVideo);
    }

    #[test]
    fn test_policy_defaults_exclude_episodes_and_non_videos() {
        let policy = ContentPolicy::default();
        assert!(policy.allows(ReleaseKind::Video));
        assert!(policy.allows(ReleaseKind::SeasonPack));
        assert!(!policy.allows(ReleaseKind::StandaloneEpisode));
        assert!(!policy.allows(ReleaseKind::PackEpisode));
        assert!(!policy.allows(ReleaseKind::NonVideo));
    }

    #[test]
    fn test_policy_single_episodes_only() {
        let policy = ContentPolicy {
            include_single_episodes: true,
            ..Default::default()
        };
        assert!(policy.allows(ReleaseKind::StandaloneEpisode));
        assert!(!policy.allows(ReleaseKind::PackEpisode));
    }

    #[test]
    fn test_policy_include_episodes_supersedes_single() {
        let policy = ContentPolicy {
            include_episodes: true,
            include_single_episodes: false,
            ..Default::default()
        };
        assert!(policy.allows(ReleaseKind::StandaloneEpisode));
        assert!(policy.allows(ReleaseKind::PackEpisode));
    }

    #[test]
    fn test_policy_flags_are_a_union() {
        let policy = ContentPolicy {
            include_single_episodes: true,
            include_non_videos: true,
            ..Default::default()
        };
        assert!(policy.allows(ReleaseKind::NonVideo));
        assert!(policy.allows(ReleaseKind::StandaloneEpisode));
        assert!(policy.allows(ReleaseKind::Video));
        assert!(!policy.allows(ReleaseKind::PackEpisode));
    }
}
