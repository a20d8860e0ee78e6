//! Byte-range planning and `Content-Range` parsing for partial transfers.

use std::fmt;
use std::iter::FusedIterator;
use std::sync::LazyLock;

use regex::Regex;

/// `unit SP (start-end | "*") "/" (size | "*")` per RFC 7233; an empty size is
/// accepted and treated like `*`.
#[allow(clippy::expect_used)]
static CONTENT_RANGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<unit>\S+)\s+(?:(?P<start>\d+)-(?P<end>\d+)|\*)/(?P<size>\d+|\*)?$")
        .expect("Content-Range regex is valid") // Static pattern, safe to panic
});

/// An inclusive byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    /// First byte offset.
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
}

impl ByteRange {
    /// Creates a new inclusive range.
    #[must_use]
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of bytes covered (0 for an inverted range).
    #[must_use]
    pub fn len(&self) -> u64 {
        if self.start > self.end {
            0
        } else {
            (self.end - self.start).saturating_add(1)
        }
    }

    /// Returns true for an inverted range.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Renders the value of a `Range` request header for this range.
    #[must_use]
    pub fn to_header(&self, unit: &str) -> String {
        format!("{unit}={}-{}", self.start, self.end)
    }
}

/// A parsed `Content-Range` response header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRange {
    /// Range unit, usually `bytes`.
    pub unit: String,
    /// The range carried by the response body.
    pub range: ByteRange,
    /// Complete representation length; `None` when declared as `*`.
    pub size: Option<u64>,
}

/// Why a `206` response cannot be continued with range requests.
///
/// These are not errors: the fetch strategy falls back to writing the
/// response like a plain `200`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// No `Content-Range` header was sent.
    MissingHeader,
    /// The header did not match the RFC 7233 syntax.
    Malformed(String),
    /// The header declared `*` instead of a `start-end` pair.
    UnsatisfiedRange(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingHeader => f.write_str("missing Content-Range header"),
            Self::Malformed(value) => write!(f, "malformed Content-Range '{value}'"),
            Self::UnsatisfiedRange(value) => {
                write!(f, "Content-Range '{value}' carries no start-end range")
            }
        }
    }
}

/// Parses a `Content-Range` header value.
///
/// # Errors
///
/// Returns a [`FallbackReason`] when the header is absent, malformed or has no
/// usable `start`/`end`.
pub fn parse_content_range(header: Option<&str>) -> Result<ContentRange, FallbackReason> {
    let Some(raw) = header else {
        return Err(FallbackReason::MissingHeader);
    };
    let value = raw.trim();
    let Some(captures) = CONTENT_RANGE_PATTERN.captures(value) else {
        return Err(FallbackReason::Malformed(value.to_string()));
    };

    let (Some(start), Some(end)) = (captures.name("start"), captures.name("end")) else {
        return Err(FallbackReason::UnsatisfiedRange(value.to_string()));
    };
    let (Ok(start), Ok(end)) = (start.as_str().parse::<u64>(), end.as_str().parse::<u64>())
    else {
        return Err(FallbackReason::Malformed(value.to_string()));
    };

    let size = match captures.name("size").map(|m| m.as_str()) {
        None | Some("" | "*") => None,
        Some(digits) => Some(
            digits
                .parse::<u64>()
                .map_err(|_| FallbackReason::Malformed(value.to_string()))?,
        ),
    };

    Ok(ContentRange {
        unit: captures["unit"].to_string(),
        range: ByteRange::new(start, end),
        size,
    })
}

/// Lazily yields the byte ranges needed to complete a partial transfer.
///
/// The first item is the seed range itself. When the total size is known the
/// ranges stop at byte `total_size - 1` (the last one is clamped); a seed whose
/// `end >= total_size` yields nothing. When the total size is unknown the
/// planner never ends on its own and the consumer must stop it (typically on
/// `416 Range Not Satisfiable`).
///
/// Ranges are inclusive, so `total_size` is a length, never an offset: the
/// final range ends at `total_size - 1` and the planner never asks for a range
/// starting at `total_size` (e.g. `bytes=512-512` for a 512 byte body, which a
/// server would reject). When every range is as wide as the seed, a known
/// size yields `ceil((total_size - start) / width)` ranges.
///
/// A planner is single-use; build a new one to replan.
#[derive(Debug, Clone)]
pub struct RangePlanner {
    next: Option<ByteRange>,
    total_size: Option<u64>,
    step: u64,
}

impl RangePlanner {
    /// Seeds a planner with the first range.
    ///
    /// `chunk_size` sets the width of every following range; without it each
    /// range is as wide as the seed.
    #[must_use]
    pub fn new(start: u64, end: u64, total_size: Option<u64>, chunk_size: Option<u64>) -> Self {
        let seed = ByteRange::new(start, end);
        let exhausted = seed.is_empty() || total_size.is_some_and(|total| end >= total);
        let step = chunk_size.filter(|size| *size > 0).unwrap_or(seed.len());
        Self {
            next: (!exhausted).then_some(seed),
            total_size,
            step,
        }
    }

    fn following(&self, current: ByteRange) -> Option<ByteRange> {
        let start = current.end.checked_add(1)?;
        let mut end = current.end.checked_add(self.step)?;
        if let Some(total) = self.total_size {
            let last = total.checked_sub(1)?;
            if start > last {
                return None;
            }
            end = end.min(last);
        }
        let range = ByteRange::new(start, end);
        (!range.is_empty()).then_some(range)
    }
}

impl Iterator for RangePlanner {
    type Item = ByteRange;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = self.following(current);
        Some(current)
    }
}

impl FusedIterator for RangePlanner {}
