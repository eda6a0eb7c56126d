//! `Range` header parsing for single-interval byte ranges.
//!
//! Only `bytes=<start>-<end?>` is accepted. Suffix ranges (`bytes=-N`) and
//! multi-range values are rejected as not satisfiable.

use thiserror::Error;

/// Inclusive byte interval within a blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered (`end - start + 1`).
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Content-Range` header.
    pub fn content_range(&self, total_size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total_size)
    }
}

/// Outcome of interpreting an optional `Range` header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeRequest {
    /// No header: deliver the whole blob.
    Full,
    /// A single satisfiable interval.
    Partial(ByteRange),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("requested range not satisfiable")]
pub struct RangeNotSatisfiable;

impl RangeRequest {
    /// Resolve `header` against a blob of `total_size` bytes.
    ///
    /// An open end resolves to the last byte; an end past the last byte is
    /// clamped to it. A start at or beyond `total_size` is never satisfiable.
    pub fn parse(header: Option<&str>, total_size: u64) -> Result<Self, RangeNotSatisfiable> {
        let Some(raw) = header else {
            return Ok(RangeRequest::Full);
        };

        let (unit, spec) = raw.trim().split_once('=').ok_or(RangeNotSatisfiable)?;
        if !unit.trim().eq_ignore_ascii_case("bytes") {
            return Err(RangeNotSatisfiable);
        }
        if spec.contains(',') {
            return Err(RangeNotSatisfiable);
        }

        let (start_raw, end_raw) = spec.trim().split_once('-').ok_or(RangeNotSatisfiable)?;
        let start = parse_bound(start_raw)?;
        if start >= total_size {
            return Err(RangeNotSatisfiable);
        }

        let last = total_size - 1;
        let end = match end_raw.trim() {
            "" => last,
            value => parse_bound(value)?.min(last),
        };
        if start > end {
            return Err(RangeNotSatisfiable);
        }

        Ok(RangeRequest::Partial(ByteRange { start, end }))
    }
}

fn parse_bound(value: &str) -> Result<u64, RangeNotSatisfiable> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RangeNotSatisfiable);
    }
    value.parse::<u64>().map_err(|_| RangeNotSatisfiable)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partial(header: &str, total: u64) -> ByteRange {
        match RangeRequest::parse(Some(header), total) {
            Ok(RangeRequest::Partial(range)) => range,
            other => panic!("expected partial range for {header:?}, got {other:?}"),
        }
    }

    #[test]
    fn absent_header_is_full() {
        assert_eq!(RangeRequest::parse(None, 1000), Ok(RangeRequest::Full));
    }

    #[test]
    fn closed_range() {
        let range = partial("bytes=200-499", 1000);
        assert_eq!(range, ByteRange { start: 200, end: 499 });
        assert_eq!(range.len(), 300);
        assert_eq!(range.content_range(1000), "bytes 200-499/1000");
    }

    #[test]
    fn open_ended_range_runs_to_last_byte() {
        let range = partial("bytes=900-", 1000);
        assert_eq!(range, ByteRange { start: 900, end: 999 });
        assert_eq!(range.len(), 100);
        assert_eq!(range.content_range(1000), "bytes 900-999/1000");
    }

    #[test]
    fn end_is_clamped_to_size() {
        let range = partial("bytes=10-5000", 1000);
        assert_eq!(range.end, 999);
        assert_eq!(range.len(), 990);
    }

    #[test]
    fn single_byte_ranges() {
        assert_eq!(partial("bytes=0-0", 1000).len(), 1);
        assert_eq!(partial("bytes=999-999", 1000).len(), 1);
    }

    #[test]
    fn every_valid_interval_has_matching_chunk_size() {
        let total = 16;
        for start in 0..total {
            for end in start..total {
                let header = format!("bytes={start}-{end}");
                let range = partial(&header, total);
                assert_eq!(range.len(), end - start + 1);
                assert_eq!(
                    range.content_range(total),
                    format!("bytes {start}-{end}/{total}")
                );
            }
        }
    }

    #[test]
    fn tolerates_whitespace_and_unit_case() {
        assert_eq!(partial("  Bytes = 1 - 2 ", 10), ByteRange { start: 1, end: 2 });
    }

    #[test]
    fn rejects_malformed_values() {
        for header in [
            "",
            "bytes",
            "bytes=",
            "bytes=-",
            "bytes=abc-10",
            "bytes=10-abc",
            "bytes=+1-2",
            "items=0-10",
            "bytes=0",
        ] {
            assert_eq!(
                RangeRequest::parse(Some(header), 1000),
                Err(RangeNotSatisfiable),
                "{header:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_suffix_and_multi_ranges() {
        assert_eq!(
            RangeRequest::parse(Some("bytes=-500"), 1000),
            Err(RangeNotSatisfiable)
        );
        assert_eq!(
            RangeRequest::parse(Some("bytes=0-10,20-30"), 1000),
            Err(RangeNotSatisfiable)
        );
    }

    #[test]
    fn rejects_out_of_bounds_and_inverted() {
        assert_eq!(
            RangeRequest::parse(Some("bytes=1000-"), 1000),
            Err(RangeNotSatisfiable)
        );
        assert_eq!(
            RangeRequest::parse(Some("bytes=500-100"), 1000),
            Err(RangeNotSatisfiable)
        );
        assert_eq!(
            RangeRequest::parse(Some("bytes=0-"), 0),
            Err(RangeNotSatisfiable)
        );
    }
}
