use crate::rollcall::payload::ReleaseAction;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;

/// Identity encoded in `<binary>_<YYYYMMDD>_<HHMMSS>_<action>.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameStamp {
    pub binary: String,
    pub at: DateTime<Utc>,
    pub action: ReleaseAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilenameParse {
    Parsed(FilenameStamp),
    NotMatched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampSource {
    Filename,
    Payload,
}

fn fixed_digits(token: &str, len: usize) -> Option<u32> {
    if token.len() != len || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse::<u32>().ok()
}

fn naive_from_tokens(date: &str, time: &str) -> Option<NaiveDateTime> {
    let ymd = fixed_digits(date, 8)?;
    let hms = fixed_digits(time, 6)?;
    let day = NaiveDate::from_ymd_opt((ymd / 10_000) as i32, (ymd / 100) % 100, ymd % 100)?;
    day.and_hms_opt(hms / 10_000, (hms / 100) % 100, hms % 100)
}

/// Strict parse of a release filename. Binary names may themselves contain `_`.
pub fn parse_release_filename(name: &str, tz: Tz) -> FilenameParse {
    let Some(stem) = name.strip_suffix(".json") else {
        return FilenameParse::NotMatched;
    };

    let mut parts = stem.rsplitn(4, '_');
    let (Some(action), Some(time), Some(date), Some(binary)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return FilenameParse::NotMatched;
    };
    if binary.is_empty() {
        return FilenameParse::NotMatched;
    }
    let Some(action) = ReleaseAction::from_token(action) else {
        return FilenameParse::NotMatched;
    };
    let Some(naive) = naive_from_tokens(date, time) else {
        return FilenameParse::NotMatched;
    };
    // Local times that fall into a DST gap do not exist and cannot be trusted.
    let Some(local) = tz.from_local_datetime(&naive).earliest() else {
        return FilenameParse::NotMatched;
    };

    FilenameParse::Parsed(FilenameStamp {
        binary: binary.to_string(),
        at: local.with_timezone(&Utc),
        action,
    })
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];
const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
];

/// Parse an ISO-8601 payload timestamp. Values without an offset are taken as UTC.
pub fn parse_payload_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("timestamp is empty".to_string());
    }

    let normalized = match trimmed.strip_suffix('Z').or_else(|| trimmed.strip_suffix('z')) {
        Some(head) => format!("{head}+00:00"),
        None => trimmed.to_string(),
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(&normalized, format) {
            return Ok(parsed.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Ok(Utc.from_utc_datetime(&parsed));
        }
    }
    // Date-only values mean midnight UTC.
    if let Ok(day) = NaiveDate::parse_from_str(&normalized, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN)));
    }
    Err(format!("unrecognized timestamp `{trimmed}`"))
}

/// Pick the authoritative event time: a parsed filename stamp, else the payload value.
pub fn resolve(
    filename: Option<DateTime<Utc>>,
    payload: Option<&str>,
) -> Result<(DateTime<Utc>, TimestampSource), String> {
    let from_payload = payload.map(parse_payload_timestamp);

    if let Some(at) = filename {
        match &from_payload {
            Some(Ok(other)) if *other != at => tracing::debug!(
                filename = %format_stored(at),
                payload = %format_stored(*other),
                "filename and payload timestamps disagree; using filename"
            ),
            Some(Err(reason)) => {
                tracing::debug!(%reason, "payload timestamp unusable; using filename")
            }
            _ => {}
        }
        return Ok((at, TimestampSource::Filename));
    }

    match from_payload {
        Some(Ok(at)) => Ok((at, TimestampSource::Payload)),
        Some(Err(reason)) => Err(reason),
        None => Err("no filename stamp and no payload timestamp".to_string()),
    }
}

/// Fixed-width UTC form so text ordering in the store equals time ordering.
pub fn format_stored(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
