//! Header predicates and request body-length inference.

use crate::base::message::RequestMetaData;
use crate::base::neterror::NetError;
use http::header::{CONTENT_LENGTH, EXPECT, TRANSFER_ENCODING};
use http::{HeaderMap, Method};

/// How the request body is framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyLength {
    /// Exactly `n` bytes follow the headers.
    Known(u64),
    /// Chunked transfer coding.
    Chunked,
    /// No explicit framing; the encoder resolves this to chunked and
    /// declares it in the headers.
    Unspecified,
}

/// Whether the request carries `Expect: 100-continue`.
pub fn is_expect_continue(headers: &HeaderMap) -> bool {
    headers
        .get_all(EXPECT)
        .iter()
        .any(|value| value.as_bytes().eq_ignore_ascii_case(b"100-continue"))
}

/// Whether `Transfer-Encoding` names `chunked` as the final coding.
pub fn is_transfer_encoding_chunked(headers: &HeaderMap) -> bool {
    headers.get_all(TRANSFER_ENCODING).iter().any(|value| {
        value
            .to_str()
            .map(|v| {
                v.split(',')
                    .next_back()
                    .is_some_and(|coding| coding.trim().eq_ignore_ascii_case("chunked"))
            })
            .unwrap_or(false)
    })
}

/// Parse an explicit `Content-Length` header, if present.
pub fn content_length(headers: &HeaderMap) -> Result<Option<u64>, NetError> {
    let Some(value) = headers.get(CONTENT_LENGTH) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Some)
        .ok_or_else(|| {
            NetError::InvalidContentLength(String::from_utf8_lossy(value.as_bytes()).into_owned())
        })
}

/// Whether an absent length defaults to zero for this method.
///
/// Standard methods take an implicit zero length when the user supplied no
/// framing header. Nonstandard/extension methods conventionally omit
/// zero-length headers entirely, so their length stays unspecified.
pub fn has_default_zero_content_length(method: &Method) -> bool {
    const STANDARD: [Method; 9] = [
        Method::GET,
        Method::HEAD,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
        Method::TRACE,
        Method::CONNECT,
        Method::PATCH,
    ];
    STANDARD.contains(method)
}

/// Infer the outbound body framing for one request.
pub fn body_length(meta: &RequestMetaData) -> Result<BodyLength, NetError> {
    if is_transfer_encoding_chunked(meta.headers()) {
        return Ok(BodyLength::Chunked);
    }
    if let Some(len) = content_length(meta.headers())? {
        return Ok(BodyLength::Known(len));
    }
    if has_default_zero_content_length(meta.method()) {
        Ok(BodyLength::Known(0))
    } else {
        Ok(BodyLength::Unspecified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::HeaderValue;

    fn meta(method: Method) -> RequestMetaData {
        RequestMetaData::new(method, "/")
    }

    #[test]
    fn test_expect_continue_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_expect_continue(&headers));
        headers.insert(EXPECT, HeaderValue::from_static("100-Continue"));
        assert!(is_expect_continue(&headers));
    }

    #[test]
    fn test_chunked_detection() {
        let mut headers = HeaderMap::new();
        headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("gzip, chunked"));
        assert!(is_transfer_encoding_chunked(&headers));

        headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("gzip"));
        assert!(!is_transfer_encoding_chunked(&headers));
    }

    #[test]
    fn test_content_length_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(content_length(&headers).unwrap(), None);

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("42"));
        assert_eq!(content_length(&headers).unwrap(), Some(42));

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("forty-two"));
        assert!(matches!(
            content_length(&headers).unwrap_err(),
            NetError::InvalidContentLength(_)
        ));
    }

    #[test]
    fn test_standard_method_defaults_to_zero() {
        assert_eq!(body_length(&meta(Method::GET)).unwrap(), BodyLength::Known(0));
        assert_eq!(body_length(&meta(Method::POST)).unwrap(), BodyLength::Known(0));
    }

    #[test]
    fn test_extension_method_stays_unspecified() {
        let custom = Method::from_bytes(b"PURGE").unwrap();
        assert_eq!(body_length(&meta(custom)).unwrap(), BodyLength::Unspecified);
    }

    #[test]
    fn test_explicit_framing_wins() {
        let mut m = meta(Method::POST);
        m.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from_static("7"));
        assert_eq!(body_length(&m).unwrap(), BodyLength::Known(7));

        let mut m = meta(Method::POST);
        m.headers_mut().insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        assert_eq!(body_length(&m).unwrap(), BodyLength::Chunked);
    }
}
