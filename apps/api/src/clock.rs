//! Monotonic RFC 3339 timestamps.
//!
//! `updatedAt` must strictly increase under plain string comparison on every
//! mutation. Each store owns one `Stamper`; when the wall clock stalls (or
//! steps backwards) within a microsecond, the next stamp is bumped by 1 µs.
//! Fixed microsecond precision keeps lexicographic order equal to time order.

use chrono::{DateTime, Duration, SecondsFormat, Timelike, Utc};

#[derive(Debug)]
pub struct Stamper {
    last: DateTime<Utc>,
}

impl Stamper {
    pub fn new() -> Self {
        Self {
            last: DateTime::<Utc>::MIN_UTC,
        }
    }

    /// Issues the next timestamp, strictly greater than every prior one.
    pub fn next(&mut self) -> String {
        let now = truncate_to_micros(Utc::now());
        let stamped = if now <= self.last {
            self.last + Duration::microseconds(1)
        } else {
            now
        };
        self.last = stamped;
        stamped.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

impl Default for Stamper {
    fn default() -> Self {
        Self::new()
    }
}

/// Drops sub-microsecond precision so the comparison in `next` matches what
/// the formatted string can represent.
fn truncate_to_micros(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_nanosecond((ts.nanosecond() / 1_000) * 1_000)
        .unwrap_or(ts)
}
