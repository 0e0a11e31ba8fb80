//! Domain types for the bell daemon.
//!
//! All path fields use `PathBuf`. Every record round-trips through
//! serde + serde_json in the on-disk shapes the daemon and the CLI share.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of hour slots in a day.
pub const HOURS_PER_DAY: usize = 24;

/// Volume used when the persisted value cannot be coerced to an integer.
pub const DEFAULT_VOLUME: u8 = 30;

/// First and last active hour (inclusive) of the built-in mask.
const DEFAULT_FIRST_HOUR: usize = 12;
const DEFAULT_LAST_HOUR: usize = 21;

// ---------------------------------------------------------------------------
// Volume
// ---------------------------------------------------------------------------

/// Playback volume, always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Volume(u8);

impl Volume {
    pub const MAX: u8 = 100;

    /// Clamp any integer into range.
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(0, i64::from(Self::MAX)) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Volume as a fraction in `0.0..=1.0`.
    pub fn fraction(self) -> f64 {
        f64::from(self.0) / f64::from(Self::MAX)
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self(DEFAULT_VOLUME)
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for Volume {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Ok(Self::clamped(raw))
    }
}

// ---------------------------------------------------------------------------
// ActiveHours
// ---------------------------------------------------------------------------

/// 24-slot mask of the hours during which chiming is allowed.
///
/// Serialized as an array of `0`/`1` integers; deserializes from booleans or
/// numbers (non-zero counts as active) and rejects any length other than 24.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActiveHours([bool; HOURS_PER_DAY]);

impl ActiveHours {
    pub fn new(mask: [bool; HOURS_PER_DAY]) -> Self {
        Self(mask)
    }

    /// Mask with no active hour.
    pub fn none() -> Self {
        Self([false; HOURS_PER_DAY])
    }

    /// Mask with every hour active.
    pub fn all() -> Self {
        Self([true; HOURS_PER_DAY])
    }

    /// Build a mask from the listed hours. Hours outside `0..24` are ignored.
    pub fn from_hours<I: IntoIterator<Item = usize>>(hours: I) -> Self {
        let mut mask = [false; HOURS_PER_DAY];
        for hour in hours.into_iter().filter(|h| *h < HOURS_PER_DAY) {
            mask[hour] = true;
        }
        Self(mask)
    }

    /// Whether `hour` is active. Hours outside `0..24` never are.
    pub fn is_active(&self, hour: usize) -> bool {
        self.0.get(hour).copied().unwrap_or(false)
    }

    pub fn set(&mut self, hour: usize, active: bool) {
        if let Some(slot) = self.0.get_mut(hour) {
            *slot = active;
        }
    }

    /// Active hours in ascending order.
    pub fn hours(&self) -> impl Iterator<Item = usize> + '_ {
        (0..HOURS_PER_DAY).filter(|h| self.0[*h])
    }

    pub fn any(&self) -> bool {
        self.0.iter().any(|active| *active)
    }

    pub fn as_array(&self) -> &[bool; HOURS_PER_DAY] {
        &self.0
    }
}

impl Default for ActiveHours {
    fn default() -> Self {
        Self::from_hours(DEFAULT_FIRST_HOUR..=DEFAULT_LAST_HOUR)
    }
}

impl fmt::Display for ActiveHours {
    /// Compact range notation, e.g. `9,12-21`; `none` when empty.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ranges: Vec<(usize, usize)> = Vec::new();
        for hour in self.hours() {
            match ranges.last_mut() {
                Some((_, end)) if *end + 1 == hour => *end = hour,
                _ => ranges.push((hour, hour)),
            }
        }
        if ranges.is_empty() {
            return f.write_str("none");
        }
        let rendered: Vec<String> = ranges
            .into_iter()
            .map(|(start, end)| {
                if start == end {
                    start.to_string()
                } else {
                    format!("{start}-{end}")
                }
            })
            .collect();
        f.write_str(&rendered.join(","))
    }
}

impl FromStr for ActiveHours {
    type Err = String;

    /// Parse the [`fmt::Display`] notation: `none`, `all`, or comma-separated
    /// hours and inclusive ranges such as `9,12-21`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => return Ok(Self::none()),
            "all" => return Ok(Self::all()),
            _ => {}
        }

        let parse_hour = |raw: &str| -> Result<usize, String> {
            let hour: usize = raw
                .trim()
                .parse()
                .map_err(|_| format!("'{}' is not an hour", raw.trim()))?;
            if hour >= HOURS_PER_DAY {
                return Err(format!("hour {hour} is outside 0-23"));
            }
            Ok(hour)
        };

        let mut mask = Self::none();
        for part in s.split(',').filter(|p| !p.trim().is_empty()) {
            match part.split_once('-') {
                Some((start, end)) => {
                    let (start, end) = (parse_hour(start)?, parse_hour(end)?);
                    if start > end {
                        return Err(format!("range {start}-{end} runs backwards"));
                    }
                    (start..=end).for_each(|h| mask.set(h, true));
                }
                None => mask.set(parse_hour(part)?, true),
            }
        }
        if !mask.any() {
            return Err("no hours given; use 'none' to disable every hour".to_string());
        }
        Ok(mask)
    }
}

impl Serialize for ActiveHours {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(HOURS_PER_DAY))?;
        for active in self.0 {
            seq.serialize_element(&u8::from(active))?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for ActiveHours {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(ActiveHoursVisitor)
    }
}

struct ActiveHoursVisitor;

impl<'de> Visitor<'de> for ActiveHoursVisitor {
    type Value = ActiveHours;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "an array of {HOURS_PER_DAY} booleans or 0/1 integers")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut mask = [false; HOURS_PER_DAY];
        let mut len = 0usize;
        while let Some(slot) = seq.next_element::<HourSlot>()? {
            if len < HOURS_PER_DAY {
                mask[len] = slot.0;
            }
            len += 1;
        }
        if len != HOURS_PER_DAY {
            return Err(de::Error::invalid_length(len, &self));
        }
        Ok(ActiveHours(mask))
    }
}

/// One mask entry: `true`/`false` or any number (non-zero = active).
struct HourSlot(bool);

impl<'de> Deserialize<'de> for HourSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Bool(b) => Ok(HourSlot(b)),
            serde_json::Value::Number(n) => Ok(HourSlot(n.as_f64().is_some_and(|v| v != 0.0))),
            other => Err(de::Error::custom(format!(
                "active hour entry must be a boolean or number, got {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// User settings, persisted as `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub enabled: bool,
    pub volume: Volume,
    pub active_hours: ActiveHours,
    pub bell_sound: PathBuf,
}

impl Config {
    /// Built-in defaults, with the bell sound resolved against `default_bell`.
    pub fn with_bell(default_bell: PathBuf) -> Self {
        Self {
            enabled: true,
            volume: Volume::default(),
            active_hours: ActiveHours::default(),
            bell_sound: default_bell,
        }
    }
}

// ---------------------------------------------------------------------------
// RunState
// ---------------------------------------------------------------------------

/// Recovery record of the last successful chime, persisted as `state.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    pub last_chimed_hour: Option<u8>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_run_timestamp: Option<DateTime<Local>>,
}

impl RunState {
    /// Minimum gap before the last chimed hour may ring again.
    pub const REPEAT_AFTER_SECS: i64 = 60 * 60;

    /// Record a completed chime for `hour` at `at`.
    pub fn record_chime<Tz: TimeZone>(&mut self, hour: u8, at: &DateTime<Tz>) {
        self.last_chimed_hour = Some(hour);
        self.last_run_timestamp = Some(at.with_timezone(&Local));
    }

    /// Whether the last chimed hour may ring again at `at`.
    ///
    /// Only consulted when no other hour is eligible. Without a recorded
    /// timestamp the repeat is allowed.
    pub fn allows_repeat_at<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> bool {
        match self.last_run_timestamp {
            None => true,
            Some(last) => {
                let gap = at.with_timezone(&Local) - last;
                gap.num_seconds() >= Self::REPEAT_AFTER_SECS
            }
        }
    }
}

/// RFC 3339 timestamps, or offset-less ISO 8601 read as local time. Anything
/// else is dropped so `last_chimed_hour` survives on its own.
fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Local>>, D::Error> {
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(at) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(at.with_timezone(&Local)));
    }
    Ok(raw
        .parse::<NaiveDateTime>()
        .ok()
        .and_then(|naive| Local.from_local_datetime(&naive).earliest()))
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// A control request read from the command slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Slot missing, empty, or unreadable.
    None,
    Reload,
    Test,
    Shutdown,
    /// Any other token; callers treat it as no command.
    Unrecognized(String),
}

impl Command {
    /// Parse an already trimmed, lower-cased token.
    pub fn from_token(token: &str) -> Self {
        match token {
            "" => Command::None,
            "reload" => Command::Reload,
            "test" => Command::Test,
            "shutdown" => Command::Shutdown,
            other => Command::Unrecognized(other.to_string()),
        }
    }

    /// Token written to the slot for this command.
    pub fn token(&self) -> &str {
        match self {
            Command::None => "",
            Command::Reload => "reload",
            Command::Test => "test",
            Command::Shutdown => "shutdown",
            Command::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::None => f.write_str("none"),
            other => f.write_str(other.token()),
        }
    }
}
