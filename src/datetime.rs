//! Pickup time normalization: quick-option tokens and free-text date/time
//! expressions become a concrete local date and time.

use std::sync::LazyLock;

use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Timelike, Utc,
};
use regex::Regex;

use crate::error::NormalizeError;

/// How far in the past an explicit time may be before it is rejected.
const PAST_GRACE_MINUTES: i64 = 1;

/// "tonight" times before this hour fall after midnight.
const TONIGHT_ROLLOVER_HOUR: u32 = 6;

/// Shared time-of-day pattern: `10`, `10:30`, `10am`, `10:30 pm`.
const TIME_PATTERN: &str = r"(\d{1,2})(?:[:.](\d{2}))?\s*(am|pm)?";

static RELATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^in\s+(\d{1,3})\s*(m|min|mins|minute|minutes|h|hr|hrs|hour|hours)$")
        .expect("relative regex")
});

static DAY_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(today|tonight|tomorrow|tmrw)(?:\s+at)?\s+{TIME_PATTERN}$"
    ))
    .expect("day/time regex")
});

static TIME_ONLY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(?:at\s+)?{TIME_PATTERN}$")).expect("time regex")
});

static ISO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(\d{{4}})-(\d{{1,2}})-(\d{{1,2}})(?:\s+|t)(?:at\s+)?{TIME_PATTERN}$"
    ))
    .expect("iso regex")
});

static DMY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(\d{{1,2}})[/-](\d{{1,2}})[/-](\d{{4}}),?\s+(?:at\s+)?{TIME_PATTERN}$"
    ))
    .expect("dmy regex")
});

/// Predefined pickup windows offered as a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickOption {
    Asap,
    In15,
    In30,
    In60,
}

impl QuickOption {
    pub const ALL: [QuickOption; 4] = [
        QuickOption::Asap,
        QuickOption::In15,
        QuickOption::In30,
        QuickOption::In60,
    ];

    /// List row id.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Asap => "time_asap",
            Self::In15 => "time_15",
            Self::In30 => "time_30",
            Self::In60 => "time_60",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Asap => "ASAP",
            Self::In15 => "In 15 mins",
            Self::In30 => "In 30 mins",
            Self::In60 => "In 1 hour",
        }
    }

    pub fn minutes(&self) -> i64 {
        match self {
            Self::Asap => 0,
            Self::In15 => 15,
            Self::In30 => 30,
            Self::In60 => 60,
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|q| q.id() == id)
    }

    /// Typed shorthand: `asap`, `+15m`, `15m`, `+30m`, `30m`, `+1h`, `1h`.
    pub fn from_token(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "asap" => Some(Self::Asap),
            "+15m" | "15m" => Some(Self::In15),
            "+30m" | "30m" => Some(Self::In30),
            "+1h" | "1h" => Some(Self::In60),
            _ => None,
        }
    }
}

/// A concrete local pickup date and time, minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickupTime {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl PickupTime {
    fn from_naive(dt: NaiveDateTime) -> Self {
        let t = dt.time();
        let time = NaiveTime::from_hms_opt(t.hour(), t.minute(), 0).unwrap_or(t);
        Self {
            date: dt.date(),
            time,
        }
    }

    /// `YYYY-MM-DD`.
    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// `HH:MM`, 24-hour.
    pub fn time_string(&self) -> String {
        self.time.format("%H:%M").to_string()
    }
}

/// Turns user input into a `PickupTime` relative to a reference instant,
/// interpreting wall-clock times in a fixed local offset.
#[derive(Debug, Clone, Copy)]
pub struct DateTimeNormalizer {
    offset: FixedOffset,
}

impl Default for DateTimeNormalizer {
    fn default() -> Self {
        Self::new(Utc.fix())
    }
}

impl DateTimeNormalizer {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    fn local_now(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.with_timezone(&self.offset).naive_local()
    }

    /// Resolve a quick option against `now`.
    pub fn quick(&self, option: QuickOption, now: DateTime<Utc>) -> PickupTime {
        PickupTime::from_naive(self.local_now(now) + Duration::minutes(option.minutes()))
    }

    /// Normalize a quick-option token or free-text expression.
    pub fn normalize(&self, input: &str, now: DateTime<Utc>) -> Result<PickupTime, NormalizeError> {
        let text = input.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        if text.is_empty() {
            return Err(NormalizeError::Unrecognized(input.to_string()));
        }

        if let Some(option) = QuickOption::from_token(&text) {
            return Ok(self.quick(option, now));
        }
        if matches!(text.as_str(), "now" | "right now" | "immediately") {
            return Ok(self.quick(QuickOption::Asap, now));
        }

        let local_now = self.local_now(now);

        if let Some(caps) = RELATIVE_RE.captures(&text) {
            let amount: i64 = caps[1]
                .parse()
                .map_err(|_| NormalizeError::OutOfRange(input.to_string()))?;
            let minutes = if caps[2].starts_with('h') {
                amount * 60
            } else {
                amount
            };
            return Ok(PickupTime::from_naive(local_now + Duration::minutes(minutes)));
        }

        if let Some(caps) = DAY_TIME_RE.captures(&text) {
            let day = &caps[1];
            let time = parse_time(&caps, 2, input, day == "tonight")?;
            let date = match day {
                "tomorrow" | "tmrw" => local_now.date() + Duration::days(1),
                "tonight" if time.hour() < TONIGHT_ROLLOVER_HOUR => {
                    local_now.date() + Duration::days(1)
                }
                _ => local_now.date(),
            };
            return self.not_in_past(date.and_time(time), local_now, input);
        }

        if let Some(caps) = TIME_ONLY_RE.captures(&text) {
            let time = parse_time(&caps, 1, input, false)?;
            let today = local_now.date().and_time(time);
            let at = if today < local_now - Duration::minutes(PAST_GRACE_MINUTES) {
                today + Duration::days(1)
            } else {
                today
            };
            return Ok(PickupTime::from_naive(at));
        }

        if let Some(caps) = ISO_RE.captures(&text) {
            let date = ymd(&caps[1], &caps[2], &caps[3], input)?;
            let time = parse_time(&caps, 4, input, false)?;
            return self.not_in_past(date.and_time(time), local_now, input);
        }

        if let Some(caps) = DMY_RE.captures(&text) {
            let date = ymd(&caps[3], &caps[2], &caps[1], input)?;
            let time = parse_time(&caps, 4, input, false)?;
            return self.not_in_past(date.and_time(time), local_now, input);
        }

        Err(NormalizeError::Unrecognized(input.to_string()))
    }

    fn not_in_past(
        &self,
        at: NaiveDateTime,
        local_now: NaiveDateTime,
        input: &str,
    ) -> Result<PickupTime, NormalizeError> {
        if at < local_now - Duration::minutes(PAST_GRACE_MINUTES) {
            return Err(NormalizeError::InPast(input.to_string()));
        }
        Ok(PickupTime::from_naive(at))
    }
}

fn ymd(year: &str, month: &str, day: &str, input: &str) -> Result<NaiveDate, NormalizeError> {
    let out_of_range = || NormalizeError::OutOfRange(input.to_string());
    let year: i32 = year.parse().map_err(|_| out_of_range())?;
    let month: u32 = month.parse().map_err(|_| out_of_range())?;
    let day: u32 = day.parse().map_err(|_| out_of_range())?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(out_of_range)
}

/// Read a `TIME_PATTERN` match starting at capture group `first`.
///
/// A bare hour (`10`) is only accepted with am/pm, or in the evening sense
/// when `evening` is set (`tonight 9`, `tonight 12` for midnight).
fn parse_time(
    caps: &regex::Captures<'_>,
    first: usize,
    input: &str,
    evening: bool,
) -> Result<NaiveTime, NormalizeError> {
    let out_of_range = || NormalizeError::OutOfRange(input.to_string());
    let mut hour: u32 = caps
        .get(first)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(out_of_range)?;
    let minute_str = caps.get(first + 1).map(|m| m.as_str());
    let minute: u32 = match minute_str {
        Some(m) => m.parse().map_err(|_| out_of_range())?,
        None => 0,
    };
    let meridiem = caps.get(first + 2).map(|m| m.as_str());

    match meridiem {
        Some(m) => {
            if !(1..=12).contains(&hour) {
                return Err(out_of_range());
            }
            hour %= 12;
            if m == "pm" {
                hour += 12;
            }
        }
        None if minute_str.is_none() && !evening => {
            return Err(NormalizeError::Unrecognized(input.to_string()));
        }
        None if evening && hour == 12 => hour = 0,
        None if evening && (1..12).contains(&hour) => hour += 12,
        None => {}
    }

    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(out_of_range)
}
