//! Conditional and range-aware asset streaming
//!
//! Modification times are compared at second precision, since that is all
//! an HTTP date can carry. Only single byte ranges are honoured; a request
//! for several ranges gets the whole asset.

use std::io::SeekFrom;
use std::time::SystemTime;

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::Response,
};
use chrono::{DateTime, Utc};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use super::error::AssetError;
use super::store::StoredAsset;
use crate::gate::AssetPath;

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Format a timestamp as an IMF-fixdate
pub fn format_http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(HTTP_DATE_FORMAT).to_string()
}

/// Parse an HTTP date into seconds since the epoch
pub fn parse_http_date(value: &str) -> Option<i64> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|date| date.timestamp())
}

fn unix_seconds(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp()
}

fn header_date(headers: &HeaderMap, name: header::HeaderName) -> Option<i64> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_http_date)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeRequest {
    /// Serve everything
    Full,
    /// Serve `length` bytes starting at `start`
    Partial { start: u64, length: u64 },
    /// Nothing in the asset matches
    Unsatisfiable,
}

/// Interpret a `Range` header against an asset of `size` bytes
fn parse_range(value: &str, size: u64) -> RangeRequest {
    let Some(spec) = value.trim().strip_prefix("bytes=") else {
        return RangeRequest::Unsatisfiable;
    };
    if spec.contains(',') {
        return RangeRequest::Full;
    }
    let Some((first, last)) = spec.trim().split_once('-') else {
        return RangeRequest::Unsatisfiable;
    };
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        // bytes=-N: the final N bytes
        return match last.parse::<u64>() {
            Ok(suffix) if suffix > 0 && size > 0 => {
                let length = suffix.min(size);
                RangeRequest::Partial {
                    start: size - length,
                    length,
                }
            }
            _ => RangeRequest::Unsatisfiable,
        };
    }

    let Ok(start) = first.parse::<u64>() else {
        return RangeRequest::Unsatisfiable;
    };
    if start >= size {
        return RangeRequest::Unsatisfiable;
    }

    let end = if last.is_empty() {
        size - 1
    } else {
        match last.parse::<u64>() {
            Ok(end) if end >= start => end.min(size - 1),
            _ => return RangeRequest::Unsatisfiable,
        }
    };

    RangeRequest::Partial {
        start,
        length: end - start + 1,
    }
}

/// Whether an `If-Range` precondition lets the range through
fn if_range_holds(headers: &HeaderMap, modified: i64) -> bool {
    match headers.get(header::IF_RANGE) {
        None => true,
        Some(_) => header_date(headers, header::IF_RANGE) == Some(modified),
    }
}

fn content_type(name: &str) -> HeaderValue {
    let mime = mime_guess::from_path(name).first_or_octet_stream();
    HeaderValue::from_str(mime.as_ref())
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}

/// `Content-Disposition` naming only the base name
///
/// Non-ASCII names get an RFC 5987 `filename*` next to a sanitized fallback.
fn content_disposition(name: &str) -> HeaderValue {
    let fallback: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c == ' ' || c.is_ascii_graphic() => c,
            _ => '_',
        })
        .collect();

    let mut value = format!("attachment; filename=\"{}\"", fallback);
    if !name.is_ascii() {
        value.push_str("; filename*=UTF-8''");
        for byte in name.bytes() {
            if byte.is_ascii_alphanumeric() || b"-._~".contains(&byte) {
                value.push(byte as char);
            } else {
                value.push_str(&format!("%{:02X}", byte));
            }
        }
    }

    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

fn build(
    status: StatusCode,
    headers: Vec<(header::HeaderName, HeaderValue)>,
    body: Body,
) -> Result<Response, AssetError> {
    let mut builder = Response::builder().status(status);
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    builder.body(body).map_err(|e| AssetError::Internal {
        reason: e.to_string(),
    })
}

fn http_value(value: String) -> Result<HeaderValue, AssetError> {
    HeaderValue::from_str(&value).map_err(|e| AssetError::Internal {
        reason: e.to_string(),
    })
}

/// Stream `asset` as the answer to a `GET` or `HEAD` request
pub async fn serve_asset(
    method: &Method,
    headers: &HeaderMap,
    path: &AssetPath,
    asset: StoredAsset,
) -> Result<Response, AssetError> {
    let StoredAsset {
        mut reader,
        size,
        modified,
    } = asset;
    let modified_secs = unix_seconds(modified);
    let last_modified = http_value(format_http_date(modified))?;

    if let Some(since) = header_date(headers, header::IF_UNMODIFIED_SINCE) {
        if modified_secs > since {
            tracing::debug!(path = %path, "If-Unmodified-Since precondition failed");
            return build(StatusCode::PRECONDITION_FAILED, Vec::new(), Body::empty());
        }
    }

    if *method == Method::GET || *method == Method::HEAD {
        if let Some(since) = header_date(headers, header::IF_MODIFIED_SINCE) {
            if modified_secs <= since {
                return build(
                    StatusCode::NOT_MODIFIED,
                    vec![(header::LAST_MODIFIED, last_modified)],
                    Body::empty(),
                );
            }
        }
    }

    let name = path.file_name();
    let mut response_headers = vec![
        (header::LAST_MODIFIED, last_modified),
        (header::ACCEPT_RANGES, HeaderValue::from_static("bytes")),
        (header::CONTENT_TYPE, content_type(name)),
        (header::CONTENT_DISPOSITION, content_disposition(name)),
    ];

    let range = match headers.get(header::RANGE) {
        Some(value) if if_range_holds(headers, modified_secs) => match value.to_str() {
            Ok(value) => parse_range(value, size),
            Err(_) => RangeRequest::Unsatisfiable,
        },
        _ => RangeRequest::Full,
    };

    let (status, start, length) = match range {
        RangeRequest::Full => (StatusCode::OK, 0, size),
        RangeRequest::Partial { start, length } => {
            response_headers.push((
                header::CONTENT_RANGE,
                http_value(format!("bytes {}-{}/{}", start, start + length - 1, size))?,
            ));
            (StatusCode::PARTIAL_CONTENT, start, length)
        }
        RangeRequest::Unsatisfiable => {
            tracing::debug!(path = %path, size, "Unsatisfiable range");
            return build(
                StatusCode::RANGE_NOT_SATISFIABLE,
                vec![(
                    header::CONTENT_RANGE,
                    http_value(format!("bytes */{}", size))?,
                )],
                Body::empty(),
            );
        }
    };

    response_headers.push((header::CONTENT_LENGTH, HeaderValue::from(length)));

    if *method == Method::HEAD {
        return build(status, response_headers, Body::empty());
    }

    if start > 0 {
        reader.seek(SeekFrom::Start(start)).await?;
    }
    let body = Body::from_stream(ReaderStream::new(reader.take(length)));

    tracing::debug!(path = %path, status = status.as_u16(), length, "Streaming asset");
    build(status, response_headers, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_http_date_round_trip() {
        let time = UNIX_EPOCH + Duration::from_secs(784111777);
        let formatted = format_http_date(time);
        assert_eq!(formatted, "Sun, 06 Nov 1994 08:49:37 GMT");
        assert_eq!(parse_http_date(&formatted), Some(784111777));
        assert_eq!(parse_http_date("yesterday"), None);
    }

    #[test]
    fn test_parse_range_forms() {
        assert_eq!(
            parse_range("bytes=0-9", 100),
            RangeRequest::Partial { start: 0, length: 10 }
        );
        assert_eq!(
            parse_range("bytes=90-", 100),
            RangeRequest::Partial { start: 90, length: 10 }
        );
        assert_eq!(
            parse_range("bytes=-10", 100),
            RangeRequest::Partial { start: 90, length: 10 }
        );
        assert_eq!(
            parse_range("bytes=95-200", 100),
            RangeRequest::Partial { start: 95, length: 5 }
        );
        assert_eq!(
            parse_range("bytes=-500", 100),
            RangeRequest::Partial { start: 0, length: 100 }
        );
    }

    #[test]
    fn test_parse_range_rejections() {
        assert_eq!(parse_range("bytes=100-", 100), RangeRequest::Unsatisfiable);
        assert_eq!(parse_range("bytes=9-3", 100), RangeRequest::Unsatisfiable);
        assert_eq!(parse_range("bytes=-0", 100), RangeRequest::Unsatisfiable);
        assert_eq!(parse_range("bytes=0-", 0), RangeRequest::Unsatisfiable);
        assert_eq!(parse_range("bytes=abc", 100), RangeRequest::Unsatisfiable);
        assert_eq!(parse_range("items=0-1", 100), RangeRequest::Unsatisfiable);
    }

    #[test]
    fn test_multiple_ranges_serve_everything() {
        assert_eq!(parse_range("bytes=0-1,5-6", 100), RangeRequest::Full);
    }

    #[test]
    fn test_content_headers() {
        assert_eq!(content_type("game.zip"), "application/zip");
        assert_eq!(content_type("noextension"), "application/octet-stream");
        assert_eq!(
            content_disposition("game.zip"),
            "attachment; filename=\"game.zip\""
        );
        assert_eq!(
            content_disposition("we\"ird.txt"),
            "attachment; filename=\"we_ird.txt\""
        );
        assert_eq!(
            content_disposition("café.txt"),
            "attachment; filename=\"caf_.txt\"; filename*=UTF-8''caf%C3%A9.txt"
        );
    }
}
