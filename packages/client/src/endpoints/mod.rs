//! Endpoint wrappers.
//!
//! Each wrapper only chooses a path, method, body, response policy and
//! result type; everything else happens in [`Request`](crate::Request).

mod acl;
mod agent;
mod catalog;
mod kv;

pub use acl::Acl;
pub use agent::Agent;
pub use catalog::Catalog;
pub use kv::Kv;

/// Percent-encode one path segment.
pub(crate) fn segment(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

/// Percent-encode a KV key, keeping its `/` separators.
pub(crate) fn key_path(key: &str) -> String {
    key.trim_start_matches('/')
        .split('/')
        .map(|part| urlencoding::encode(part).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_path_keeps_separators() {
        assert_eq!(key_path("app/config/db url"), "app/config/db%20url");
        assert_eq!(key_path("/leading"), "leading");
        assert_eq!(key_path("dir/"), "dir/");
    }

    #[test]
    fn segment_escapes_slashes() {
        assert_eq!(segment("web/1"), "web%2F1");
        assert_eq!(segment("10.0.0.1:8301"), "10.0.0.1%3A8301");
    }
}
