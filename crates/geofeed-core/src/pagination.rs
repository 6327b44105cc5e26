//! Cursor pagination over time-ordered views.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::error::DomainError;

/// Default page size for feeds and listings.
pub const DEFAULT_LIMIT: usize = 50;

/// Hard cap on page size.
pub const MAX_LIMIT: usize = 100;

/// Opaque pagination token wrapping a timestamp boundary.
///
/// The wire form is base64 of an RFC 3339 timestamp with nanoseconds.
/// The empty string is the unbounded cursor (the zero timestamp).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor(Option<DateTime<Utc>>);

impl Cursor {
    /// The unbounded cursor: scans start from the newest row.
    pub fn start() -> Self {
        Self(None)
    }

    /// Cursor positioned just below `boundary`.
    ///
    /// RFC 3339 only covers years 0000 through 9999. A boundary outside that
    /// range still encodes, but the token will not decode again.
    pub fn at(boundary: DateTime<Utc>) -> Self {
        Self(Some(boundary))
    }

    /// Parse a wire token. The empty string yields [`Cursor::start`].
    pub fn decode(token: &str) -> Result<Self, DomainError> {
        if token.is_empty() {
            return Ok(Self::start());
        }

        let bytes = STANDARD
            .decode(token)
            .map_err(|_| DomainError::validation("invalid cursor"))?;
        let text =
            String::from_utf8(bytes).map_err(|_| DomainError::validation("invalid cursor"))?;
        let boundary = DateTime::parse_from_rfc3339(&text)
            .map_err(|_| DomainError::validation("invalid cursor format"))?;

        Ok(Self(Some(boundary.with_timezone(&Utc))))
    }

    /// Wire form of the cursor; the unbounded cursor encodes as `""`.
    /// Round-trips through [`Cursor::decode`] for boundaries in years 0000..=9999.
    pub fn encode(&self) -> String {
        match self.0 {
            Some(t) => STANDARD.encode(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => String::new(),
        }
    }

    /// Upper time bound for the next scan, exclusive.
    pub fn boundary(&self) -> Option<DateTime<Utc>> {
        self.0
    }

    pub fn is_start(&self) -> bool {
        self.0.is_none()
    }
}

/// Clamp a requested page size into `1..=max`, substituting `default` for zero.
pub fn effective_limit(requested: usize, default: usize, max: usize) -> usize {
    match requested {
        0 => default,
        n if n > max => max,
        n => n,
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
    /// Wire cursor for the next page; empty when there is none.
    pub next_cursor: String,
}

impl<T> Page<T> {
    /// Build a page from `limit + 1` fetched rows, trimming the look-ahead row.
    pub fn from_lookahead<F>(mut items: Vec<T>, limit: usize, timestamp_of: F) -> Self
    where
        F: Fn(&T) -> DateTime<Utc>,
    {
        let has_more = items.len() > limit;
        items.truncate(limit);

        let next_cursor = match (has_more, items.last()) {
            (true, Some(last)) => Cursor::at(timestamp_of(last)).encode(),
            _ => String::new(),
        };

        Self {
            items,
            has_more,
            next_cursor,
        }
    }
}
