//! Result envelopes.
//!
//! Every completed request produces exactly one envelope: the status and
//! latency of the exchange, the blocking-query metadata for reads, and the
//! decoded payload. `response` is `None` only when the response policy
//! accepted a 404 as "absent".

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;

use crate::error::ClientError;

pub const HEADER_INDEX: &str = "X-Consul-Index";
pub const HEADER_LAST_CONTACT: &str = "X-Consul-LastContact";
pub const HEADER_KNOWN_LEADER: &str = "X-Consul-KnownLeader";
pub const HEADER_TRANSLATE_ADDRESSES: &str = "X-Consul-Translate-Addresses";

/// Status and latency of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteMeta {
    pub status_code: StatusCode,
    /// Time from dispatch until response headers arrived.
    pub request_time: Duration,
}

/// Status, latency and consistency metadata of a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryMeta {
    pub status_code: StatusCode,
    pub request_time: Duration,
    /// Pass back as `wait_index` to block until the result changes.
    pub last_index: u64,
    /// Time since the answering server last heard from the leader.
    pub last_contact: Duration,
    pub known_leader: bool,
    pub address_translation_enabled: bool,
}

impl QueryMeta {
    /// Build from a response's status and headers.
    ///
    /// Missing headers take their zero value. A header that is present but
    /// unparseable is a [`ClientError::MalformedResponse`].
    pub fn from_headers(
        status_code: StatusCode,
        request_time: Duration,
        headers: &HeaderMap,
    ) -> Result<Self, ClientError> {
        let last_index = match header_str(headers, HEADER_INDEX)? {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                ClientError::MalformedResponse(format!("{HEADER_INDEX} is not an index: {raw:?}"))
            })?,
            None => 0,
        };
        let last_contact = match header_str(headers, HEADER_LAST_CONTACT)? {
            Some(raw) => raw.parse::<u64>().map(Duration::from_millis).map_err(|_| {
                ClientError::MalformedResponse(format!(
                    "{HEADER_LAST_CONTACT} is not a millisecond count: {raw:?}"
                ))
            })?,
            None => Duration::ZERO,
        };
        let known_leader = header_str(headers, HEADER_KNOWN_LEADER)?
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        let address_translation_enabled = header_str(headers, HEADER_TRANSLATE_ADDRESSES)?
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));

        Ok(Self {
            status_code,
            request_time,
            last_index,
            last_contact,
            known_leader,
            address_translation_enabled,
        })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, ClientError> {
    match headers.get(name) {
        Some(value) => value
            .to_str()
            .map(|s| Some(s.trim()))
            .map_err(|_| ClientError::MalformedResponse(format!("{name} is not valid text"))),
        None => Ok(None),
    }
}

/// Envelope for a write. `T` defaults to `()` for writes with no body.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteResult<T = ()> {
    pub meta: WriteMeta,
    pub response: Option<T>,
}

impl<T> WriteResult<T> {
    pub fn status_code(&self) -> StatusCode {
        self.meta.status_code
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> WriteResult<U> {
        WriteResult {
            meta: self.meta,
            response: self.response.map(f),
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Option<U>) -> WriteResult<U> {
        WriteResult {
            meta: self.meta,
            response: self.response.and_then(f),
        }
    }
}

/// Envelope for a read.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    pub meta: QueryMeta,
    pub response: Option<T>,
}

impl<T> QueryResult<T> {
    pub fn status_code(&self) -> StatusCode {
        self.meta.status_code
    }

    pub fn last_index(&self) -> u64 {
        self.meta.last_index
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryResult<U> {
        QueryResult {
            meta: self.meta,
            response: self.response.map(f),
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Option<U>) -> QueryResult<U> {
        QueryResult {
            meta: self.meta,
            response: self.response.and_then(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn parses_all_metadata_headers() {
        let h = headers(&[
            ("x-consul-index", "1234"),
            ("x-consul-lastcontact", "250"),
            ("x-consul-knownleader", "true"),
            ("x-consul-translate-addresses", "true"),
        ]);
        let meta = QueryMeta::from_headers(StatusCode::OK, Duration::from_millis(3), &h).unwrap();
        assert_eq!(meta.last_index, 1234);
        assert_eq!(meta.last_contact, Duration::from_millis(250));
        assert!(meta.known_leader);
        assert!(meta.address_translation_enabled);
        assert_eq!(meta.request_time, Duration::from_millis(3));
    }

    #[test]
    fn missing_headers_take_zero_values() {
        let meta = QueryMeta::from_headers(StatusCode::NOT_FOUND, Duration::ZERO, &HeaderMap::new())
            .unwrap();
        assert_eq!(meta.last_index, 0);
        assert_eq!(meta.last_contact, Duration::ZERO);
        assert!(!meta.known_leader);
        assert!(!meta.address_translation_enabled);
    }

    #[test]
    fn known_leader_false_is_false() {
        let h = headers(&[("x-consul-knownleader", "false")]);
        let meta = QueryMeta::from_headers(StatusCode::OK, Duration::ZERO, &h).unwrap();
        assert!(!meta.known_leader);
    }

    #[test]
    fn unparseable_index_is_malformed() {
        let h = headers(&[("x-consul-index", "soon")]);
        let err = QueryMeta::from_headers(StatusCode::OK, Duration::ZERO, &h).unwrap_err();
        assert!(matches!(err, ClientError::MalformedResponse(msg) if msg.contains("X-Consul-Index")));

        let h = headers(&[("x-consul-lastcontact", "-1")]);
        let err = QueryMeta::from_headers(StatusCode::OK, Duration::ZERO, &h).unwrap_err();
        assert!(matches!(err, ClientError::MalformedResponse(_)));
    }

    #[test]
    fn map_keeps_metadata() {
        let meta = WriteMeta {
            status_code: StatusCode::OK,
            request_time: Duration::from_millis(1),
        };
        let res = WriteResult { meta, response: Some("abc".to_string()) }.map(|s| s.len());
        assert_eq!(res.response, Some(3));
        assert_eq!(res.meta, meta);

        let absent: WriteResult<String> = WriteResult { meta, response: None };
        assert_eq!(absent.map(|s| s.len()).response, None);
    }
}
