//! Column encoding shared by the repositories.
//!
//! Timestamps are stored as fixed-width RFC 3339 text with nanoseconds, so
//! that lexical order matches chronological order.

use std::str::FromStr;

use chrono::SecondsFormat;

use flamewatch_domain::time::{Timestamp, parse_rfc3339};

pub(crate) fn encode_ts(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn decode_ts(value: &str) -> Result<Timestamp, sqlx::Error> {
    parse_rfc3339(value).map_err(decode_err)
}

/// Parse a text column through its `FromStr` impl.
pub(crate) fn decode<T>(value: &str) -> Result<T, sqlx::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    T::from_str(value).map_err(decode_err)
}

fn decode_err<E: std::error::Error + Send + Sync + 'static>(err: E) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}
