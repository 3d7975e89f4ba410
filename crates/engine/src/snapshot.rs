//! Persisted snapshot schema.
//!
//! The snapshot is one JSON object mapping channel id (as a string) to a
//! [`GameRecord`]. Records are an explicit, versioned schema: every field
//! has a documented default, and a record is normalized into a
//! [`GameState`] only after its invariants check out.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use giftbot_core::channel::{ChannelId, UserId};
use giftbot_core::game::{BestGuess, GameSettings, GameState, RewardKey, RoundPhase};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

/// One channel's persisted state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(default)]
    pub channel_id: Option<ChannelId>,

    #[serde(default)]
    pub active: bool,

    #[serde(default)]
    pub paused: bool,

    #[serde(default)]
    pub number: u64,

    #[serde(default)]
    pub min_number: i64,

    #[serde(default = "default_max_number")]
    pub max_number: i64,

    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: i64,

    #[serde(default, deserialize_with = "deserialize_end_time")]
    pub end_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub closest_offset: Option<u64>,

    #[serde(default)]
    pub winning_user_id: Option<UserId>,

    #[serde(default)]
    pub keys: Vec<RewardKey>,

    #[serde(default)]
    pub current_round: u32,

    #[serde(default)]
    pub total_rounds: u32,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}
fn default_max_number() -> i64 {
    500
}
fn default_timeout_minutes() -> i64 {
    10
}

/// Accepts RFC 3339 timestamps and the offset-less ISO form older
/// snapshots used (read as UTC).
fn deserialize_end_time<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| {
        parse_timestamp(&s).ok_or_else(|| D::Error::custom(format!("invalid end_time `{s}`")))
    })
    .transpose()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc())
}

impl From<&GameState> for GameRecord {
    fn from(state: &GameState) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            channel_id: Some(state.channel_id.clone()),
            active: state.is_active(),
            paused: state.is_paused(),
            number: state.number,
            min_number: state.settings.min_number as i64,
            max_number: state.settings.max_number as i64,
            timeout_minutes: i64::from(state.settings.timeout_minutes),
            end_time: state.ends_at(),
            closest_offset: state.best.as_ref().map(|b| b.offset),
            winning_user_id: state.best.as_ref().map(|b| b.user.clone()),
            keys: state.keys.clone(),
            current_round: state.current_round,
            total_rounds: state.total_rounds,
        }
    }
}

impl GameRecord {
    /// Normalize into a [`GameState`].
    ///
    /// `key` is the snapshot map key, used when the record lacks its own
    /// `channel_id`. An active record without a deadline gets `now` so the
    /// next scheduler tick closes it.
    pub fn into_state(self, key: &str, now: DateTime<Utc>) -> Result<GameState, String> {
        if self.schema_version > SCHEMA_VERSION {
            return Err(format!(
                "schema version {} is newer than supported {SCHEMA_VERSION}",
                self.schema_version
            ));
        }

        let settings = GameSettings::new(self.min_number, self.max_number, self.timeout_minutes)
            .map_err(|e| e.to_string())?;

        let channel_id = self.channel_id.unwrap_or_else(|| ChannelId::new(key));

        // Both flags set means guesses and timeouts were both ignored: paused.
        let phase = match (self.active, self.paused) {
            (_, true) => RoundPhase::Paused,
            (true, false) => RoundPhase::Active {
                ends_at: self.end_time.unwrap_or(now),
            },
            (false, false) => RoundPhase::Idle,
        };

        let best = match (self.closest_offset, self.winning_user_id) {
            (Some(offset), Some(user)) => Some(BestGuess { offset, user }),
            _ => None,
        };

        let mut current_round = self.current_round;
        if current_round > self.total_rounds {
            warn!(
                channel = %channel_id,
                current_round,
                total_rounds = self.total_rounds,
                "Snapshot round counter past total, clamping"
            );
            current_round = self.total_rounds;
        }

        Ok(GameState {
            channel_id,
            phase,
            number: self.number,
            settings,
            best,
            keys: self.keys,
            current_round,
            total_rounds: self.total_rounds,
        })
    }
}

/// Decode a snapshot document.
///
/// Fails only when the document is not a JSON object at all; individual
/// entries that do not parse or normalize are logged and skipped.
pub fn decode(raw: &str, now: DateTime<Utc>) -> Result<Vec<GameState>, serde_json::Error> {
    let entries: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)?;
    let mut states = Vec::with_capacity(entries.len());

    for (key, value) in entries {
        let record = match serde_json::from_value::<GameRecord>(value) {
            Ok(record) => record,
            Err(e) => {
                warn!(channel = %key, error = %e, "Skipping unreadable snapshot entry");
                continue;
            }
        };
        match record.into_state(&key, now) {
            Ok(state) => states.push(state),
            Err(reason) => {
                warn!(channel = %key, %reason, "Skipping invalid snapshot entry");
            }
        }
    }

    Ok(states)
}

/// Encode records as a pretty-printed snapshot document.
pub fn encode(records: &BTreeMap<String, GameRecord>) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec_pretty(records)
}
