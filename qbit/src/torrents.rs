//! Transfers and categories from the `api/v2/torrents/*` endpoints.
//!
//! The records mirror qBittorrent's JSON field names. Unknown fields are
//! ignored and missing fields take their default, so older and newer daemons
//! decode alike.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Form, Qbit, Result};

const TORRENTS_INFO_PATH: &str = "api/v2/torrents/info";
const TORRENTS_CATEGORIES_PATH: &str = "api/v2/torrents/categories";
const TORRENTS_SET_CATEGORY_PATH: &str = "api/v2/torrents/setCategory";

/// A transfer (torrent) from `api/v2/torrents/info`.
///
/// Byte counts and speeds are bytes and bytes per second, timestamps are Unix
/// epoch seconds, durations are seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transfer {
    /// When the transfer was added.
    pub added_on: i64,
    /// Bytes still to download.
    pub amount_left: i64,
    /// Managed by automatic torrent management.
    pub auto_tmm: bool,
    /// Distributed copies available in the swarm (`-1` when unknown).
    pub availability: f64,
    /// Category name, empty when uncategorized.
    pub category: String,
    /// Bytes completed.
    pub completed: i64,
    /// When the download finished (`-1`/`0` while incomplete).
    pub completion_on: i64,
    /// Absolute path of the content (file or root folder).
    pub content_path: String,
    /// Download limit in bytes per second (`-1` or `0` for none).
    pub dl_limit: i64,
    /// Current download speed.
    pub dlspeed: i64,
    /// Bytes downloaded in total.
    pub downloaded: i64,
    /// Bytes downloaded this session.
    pub downloaded_session: i64,
    /// Estimated time to completion (`8640000` means infinite).
    pub eta: i64,
    /// First and last pieces are prioritized.
    pub f_l_piece_prio: bool,
    /// Started regardless of queueing.
    pub force_start: bool,
    /// Info hash (v1, hex).
    pub hash: String,
    /// Last time a chunk was transferred.
    pub last_activity: i64,
    /// Magnet URI for the transfer.
    pub magnet_uri: String,
    /// Ratio at which seeding stops (`-1` for none).
    pub max_ratio: f64,
    /// Seeding time at which seeding stops, in minutes (`-1` for none).
    pub max_seeding_time: i64,
    /// Display name.
    pub name: String,
    /// Seeds in the swarm.
    pub num_complete: i64,
    /// Leechers in the swarm.
    pub num_incomplete: i64,
    /// Connected leechers.
    pub num_leechs: i64,
    /// Connected seeds.
    pub num_seeds: i64,
    /// Queue position (`0` or `-1` when not queued).
    pub priority: i64,
    /// Fraction done, `0.0..=1.0`.
    pub progress: f64,
    /// Share ratio.
    pub ratio: f64,
    /// Per-transfer ratio limit.
    pub ratio_limit: f64,
    /// Download directory.
    pub save_path: String,
    /// Time spent seeding.
    pub seeding_time: i64,
    /// Per-transfer seeding time limit, in minutes.
    pub seeding_time_limit: i64,
    /// Last time a complete copy was seen.
    pub seen_complete: i64,
    /// Pieces are downloaded in order.
    pub seq_dl: bool,
    /// Bytes of the selected files.
    pub size: i64,
    /// Raw daemon state; see [`Transfer::state`].
    pub state: String,
    /// Super seeding is enabled.
    pub super_seeding: bool,
    /// Comma separated; see [`Transfer::tags`].
    pub tags: String,
    /// Time active.
    pub time_active: i64,
    /// Bytes of all files, selected or not.
    pub total_size: i64,
    /// Current working tracker URL.
    pub tracker: String,
    /// Number of trackers.
    pub trackers_count: i64,
    /// Upload limit in bytes per second (`-1` or `0` for none).
    pub up_limit: i64,
    /// Bytes uploaded in total.
    pub uploaded: i64,
    /// Bytes uploaded this session.
    pub uploaded_session: i64,
    /// Current upload speed.
    pub upspeed: i64,
}

impl Transfer {
    /// The daemon state as an enum.
    pub fn state(&self) -> TransferState {
        self.state.parse().unwrap_or(TransferState::Unknown)
    }

    /// Individual tags, trimmed, empty entries skipped.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
    }

    /// Returns true once every wanted piece is downloaded.
    pub fn is_complete(&self) -> bool {
        self.amount_left == 0 && self.progress >= 1.0
    }
}

/// `state` values reported by qBittorrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferState {
    /// Stopped on an error.
    Error,
    /// Data files are missing.
    MissingFiles,
    /// Seeding with active uploads.
    Uploading,
    /// Done and paused (qBittorrent 4.x).
    PausedUp,
    /// Done and stopped (qBittorrent 5.x).
    StoppedUp,
    /// Done, waiting in the upload queue.
    QueuedUp,
    /// Seeding with no peers to upload to.
    StalledUp,
    /// Done, rechecking data.
    CheckingUp,
    /// Seeding, ignoring the queue.
    ForcedUp,
    /// Allocating disk space.
    Allocating,
    /// Downloading.
    Downloading,
    /// Fetching metadata.
    MetaDl,
    /// Fetching metadata, ignoring the queue.
    ForcedMetaDl,
    /// Incomplete and paused (qBittorrent 4.x).
    PausedDl,
    /// Incomplete and stopped (qBittorrent 5.x).
    StoppedDl,
    /// Waiting in the download queue.
    QueuedDl,
    /// Downloading with no peers to download from.
    StalledDl,
    /// Incomplete, rechecking data.
    CheckingDl,
    /// Downloading, ignoring the queue.
    ForcedDl,
    /// Checking resume data on startup.
    CheckingResumeData,
    /// Moving data to another location.
    Moving,
    /// Anything this crate doesn't know about.
    Unknown,
}

impl TransferState {
    const NAMES: [(&'static str, TransferState); 22] = [
        ("error", Self::Error),
        ("missingFiles", Self::MissingFiles),
        ("uploading", Self::Uploading),
        ("pausedUP", Self::PausedUp),
        ("stoppedUP", Self::StoppedUp),
        ("queuedUP", Self::QueuedUp),
        ("stalledUP", Self::StalledUp),
        ("checkingUP", Self::CheckingUp),
        ("forcedUP", Self::ForcedUp),
        ("allocating", Self::Allocating),
        ("downloading", Self::Downloading),
        ("metaDL", Self::MetaDl),
        ("forcedMetaDL", Self::ForcedMetaDl),
        ("pausedDL", Self::PausedDl),
        ("stoppedDL", Self::StoppedDl),
        ("queuedDL", Self::QueuedDl),
        ("stalledDL", Self::StalledDl),
        ("checkingDL", Self::CheckingDl),
        ("forcedDL", Self::ForcedDl),
        ("checkingResumeData", Self::CheckingResumeData),
        ("moving", Self::Moving),
        ("unknown", Self::Unknown),
    ];

    /// The wire name of this state.
    pub fn as_str(self) -> &'static str {
        Self::NAMES
            .iter()
            .find(|(_, state)| *state == self)
            .map_or("unknown", |(name, _)| *name)
    }

    /// Returns true for states where the transfer is seeding or done.
    pub fn is_upload(self) -> bool {
        matches!(
            self,
            Self::Uploading
                | Self::PausedUp
                | Self::StoppedUp
                | Self::QueuedUp
                | Self::StalledUp
                | Self::CheckingUp
                | Self::ForcedUp
        )
    }
}

/// The string was not a known qBittorrent state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transfer state: {0}")]
pub struct UnknownState(
    /// The unrecognized state string.
    pub String,
);

impl FromStr for TransferState {
    type Err = UnknownState;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::NAMES
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, state)| *state)
            .ok_or_else(|| UnknownState(s.to_owned()))
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A category from `api/v2/torrents/categories`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    /// Category name.
    pub name: String,
    /// Default download directory, empty for the global default.
    #[serde(rename = "savePath")]
    pub save_path: String,
}

impl Qbit {
    /// All transfers in the daemon.
    pub async fn transfers(&self) -> Result<Vec<Transfer>> {
        self.transfers_with_timeout(self.timeout).await
    }

    /// [`Self::transfers`] under an explicit deadline.
    pub async fn transfers_with_timeout(&self, timeout: Duration) -> Result<Vec<Transfer>> {
        self.request_with_timeout(reqwest::Method::GET, TORRENTS_INFO_PATH, &Form::new(), timeout)
            .await
    }

    /// All categories, keyed by name.
    pub async fn categories(&self) -> Result<BTreeMap<String, Category>> {
        self.categories_with_timeout(self.timeout).await
    }

    /// [`Self::categories`] under an explicit deadline.
    pub async fn categories_with_timeout(
        &self,
        timeout: Duration,
    ) -> Result<BTreeMap<String, Category>> {
        self.request_with_timeout(
            reqwest::Method::GET,
            TORRENTS_CATEGORIES_PATH,
            &Form::new(),
            timeout,
        )
        .await
    }

    /// Move one or more transfers into `category` (`""` removes the category).
    pub async fn set_torrent_category<I, S>(&self, category: &str, hashes: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_torrent_category_with_timeout(category, hashes, self.timeout)
            .await
    }

    /// [`Self::set_torrent_category`] under an explicit deadline.
    pub async fn set_torrent_category_with_timeout<I, S>(
        &self,
        category: &str,
        hashes: I,
        timeout: Duration,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let values = Form::new()
            .with("category", category)
            .with("hashes", join_hashes(hashes));

        self.request_with_timeout(
            reqwest::Method::POST,
            TORRENTS_SET_CATEGORY_PATH,
            &values,
            timeout,
        )
        .await
    }
}

fn join_hashes<I, S>(hashes: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    hashes
        .into_iter()
        .map(|hash| hash.as_ref().to_owned())
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_transfer_without_precision_loss() {
        let doc = json!({
            "added_on": 1_700_000_000,
            "amount_left": 0,
            "auto_tmm": true,
            "availability": -1,
            "category": "movies",
            "completion_on": 1_700_003_600,
            "dlspeed": 0,
            "downloaded": 9_007_199_254_740_993_i64,
            "eta": 8_640_000,
            "force_start": false,
            "hash": "8c212779b4abde7c6bc608063a0d008b7e40ce32",
            "max_ratio": -1.0,
            "name": "Big Buck Bunny",
            "progress": 0.123_456_789_012_345_67,
            "ratio": 1.618_033_988_749_895,
            "seq_dl": true,
            "size": 276_445_467,
            "state": "stalledUP",
            "super_seeding": false,
            "tags": "hd, public,",
            "total_size": 4_294_967_296_i64,
            "up_limit": -1,
            "uploaded": 447_328_122_i64,
            "upspeed": 1_024,
            "tracker_extra_field_from_newer_daemon": "ignored"
        });

        let transfer: Transfer = serde_json::from_value(doc).unwrap();

        assert_eq!(transfer.added_on, 1_700_000_000);
        assert!(transfer.auto_tmm);
        assert!((transfer.availability - -1.0).abs() < f64::EPSILON);
        assert_eq!(transfer.category, "movies");
        assert_eq!(transfer.downloaded, 9_007_199_254_740_993);
        assert_eq!(transfer.eta, 8_640_000);
        assert_eq!(transfer.hash, "8c212779b4abde7c6bc608063a0d008b7e40ce32");
        assert_eq!(transfer.progress.to_bits(), 0.123_456_789_012_345_67_f64.to_bits());
        assert_eq!(transfer.ratio.to_bits(), 1.618_033_988_749_895_f64.to_bits());
        assert!(transfer.seq_dl);
        assert!(!transfer.super_seeding);
        assert_eq!(transfer.total_size, 4_294_967_296);
        assert_eq!(transfer.up_limit, -1);
        assert_eq!(transfer.state(), TransferState::StalledUp);
        assert_eq!(transfer.tags().collect::<Vec<_>>(), vec!["hd", "public"]);
        assert!(!transfer.is_complete());
        // Missing fields default.
        assert_eq!(transfer.save_path, "");
        assert_eq!(transfer.num_seeds, 0);
    }

    #[test]
    fn unknown_state_falls_back() {
        let transfer = Transfer {
            state: "someFutureState".into(),
            ..Transfer::default()
        };
        assert_eq!(transfer.state(), TransferState::Unknown);
        assert_eq!(
            "someFutureState".parse::<TransferState>(),
            Err(UnknownState("someFutureState".into()))
        );
    }

    #[test]
    fn state_names_round_trip() {
        for (name, state) in TransferState::NAMES {
            assert_eq!(name.parse::<TransferState>().unwrap(), state);
            assert_eq!(state.to_string(), name);
        }
        assert!(TransferState::ForcedUp.is_upload());
        assert!(!TransferState::Downloading.is_upload());
    }

    #[test]
    fn decodes_categories() {
        let doc = json!({
            "movies": { "name": "movies", "savePath": "/data/movies" },
            "tv": { "name": "tv", "savePath": "" }
        });

        let categories: BTreeMap<String, Category> = serde_json::from_value(doc).unwrap();

        assert_eq!(categories.len(), 2);
        assert_eq!(categories["movies"].save_path, "/data/movies");
        assert_eq!(categories["tv"].name, "tv");
    }

    #[test]
    fn hashes_are_pipe_joined() {
        assert_eq!(join_hashes(["abc", "def"]), "abc|def");
        assert_eq!(join_hashes(vec!["abc".to_string()]), "abc");
        assert_eq!(join_hashes(Vec::<String>::new()), "");
    }
}
