//! Timestamp markers.
//!
//! Slack identifies every message by a `ts` string such as
//! `"1712345678.123456"`: decimal seconds with a fractional part. The same
//! token is used as the `oldest` bound when fetching history, so it is both a
//! message id and a cursor.
//!
//! [`Marker`] keeps the original text and orders tokens numerically without
//! going through `f64`, which would collide near-simultaneous messages.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque, totally-ordered timestamp token.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Marker(String);

impl Marker {
    /// Wrap a raw `ts` token.
    pub fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Marker for the current wall-clock instant.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Render an instant as `secs.micros` with six fractional digits.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        // Leap seconds report up to 1_999_999 micros.
        let micros = at.timestamp_subsec_micros().min(999_999);
        Self(format!("{}.{micros:06}", at.timestamp()))
    }

    /// Borrow the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the token is empty (never a valid cursor).
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    fn parts(&self) -> (&str, &str) {
        let raw = self.0.trim();
        let (int, frac) = raw.split_once('.').unwrap_or((raw, ""));
        (int.trim_start_matches('0'), frac)
    }
}

impl Ord for Marker {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a_int, a_frac) = self.parts();
        let (b_int, b_frac) = other.parts();

        a_int
            .len()
            .cmp(&b_int.len())
            .then_with(|| a_int.cmp(b_int))
            .then_with(|| cmp_fraction(a_frac, b_frac))
    }
}

impl PartialOrd for Marker {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Marker {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Marker {}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Marker {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Compare fractional digit strings as if right-padded with zeros.
fn cmp_fraction(a: &str, b: &str) -> Ordering {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(b'0');
        let y = b.get(i).copied().unwrap_or(b'0');
        match x.cmp(&y) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}
