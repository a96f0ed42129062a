//! Query string construction.
//!
//! Parameters live in a [`BTreeMap`], so the encoded form is always in sorted
//! key order: `{dc: dc2, index: 42, wait: 10s}` becomes
//! `dc=dc2&index=42&wait=10s`. A parameter with an empty value is a flag and
//! is emitted as the bare key (`stale`, `recurse`).

use std::collections::BTreeMap;
use std::time::Duration;

use consul_api::duration;

use crate::options::{ConsistencyMode, QueryOptions, WriteOptions};

/// Ordered query parameters for one request.
pub type Params = BTreeMap<String, String>;

/// Percent-encode `params` into a query string (without the leading `?`).
pub fn encode(params: &Params) -> String {
    params
        .iter()
        .map(|(key, value)| {
            if value.is_empty() {
                urlencoding::encode(key).into_owned()
            } else {
                format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Merge read options into `params`, overriding what is already there.
///
/// `default_wait` is the client-wide wait used when a blocking read sets an
/// index but no wait of its own. With neither, `wait` is left out and the
/// server default applies.
pub fn apply_query_options(params: &mut Params, opts: &QueryOptions, default_wait: Option<Duration>) {
    if opts.is_default() {
        return;
    }
    if let Some(dc) = opts.datacenter.as_deref().filter(|dc| !dc.is_empty()) {
        params.insert("dc".into(), dc.to_string());
    }
    match opts.consistency {
        ConsistencyMode::Default => {}
        ConsistencyMode::Consistent => {
            params.insert("consistent".into(), String::new());
        }
        ConsistencyMode::Stale => {
            params.insert("stale".into(), String::new());
        }
    }
    if let Some(index) = opts.wait_index {
        params.insert("index".into(), index.to_string());
        if let Some(wait) = opts.wait_time.or(default_wait) {
            params.insert("wait".into(), duration::format(wait));
        }
    }
    if let Some(near) = opts.near.as_deref().filter(|n| !n.is_empty()) {
        params.insert("near".into(), near.to_string());
    }
}

/// Merge write options into `params`, overriding what is already there.
pub fn apply_write_options(params: &mut Params, opts: &WriteOptions) {
    if opts.is_default() {
        return;
    }
    if let Some(dc) = opts.datacenter.as_deref().filter(|dc| !dc.is_empty()) {
        params.insert("dc".into(), dc.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn encodes_in_sorted_order_with_bare_flags() {
        let p = params(&[("recurse", ""), ("dc", "dc1"), ("index", "5")]);
        assert_eq!(encode(&p), "dc=dc1&index=5&recurse");
    }

    #[test]
    fn escapes_keys_and_values() {
        let p = params(&[("reason", "disk full & slow"), ("a b", "x/y")]);
        assert_eq!(encode(&p), "a%20b=x%2Fy&reason=disk%20full%20%26%20slow");
    }

    #[test]
    fn empty_params_encode_to_nothing() {
        assert_eq!(encode(&Params::new()), "");
    }

    #[test]
    fn default_options_contribute_nothing() {
        let mut p = params(&[("recurse", "")]);
        apply_query_options(&mut p, &QueryOptions::default(), Some(Duration::from_secs(30)));
        assert_eq!(encode(&p), "recurse");

        let mut p = Params::new();
        apply_write_options(&mut p, &WriteOptions::default());
        assert!(p.is_empty());
    }

    #[test]
    fn blocking_options_emit_index_and_wait() {
        let opts = QueryOptions::new()
            .datacenter("dc2")
            .wait_index(42)
            .wait_time(Duration::from_secs(10));
        let mut p = Params::new();
        apply_query_options(&mut p, &opts, None);
        assert_eq!(encode(&p), "dc=dc2&index=42&wait=10s");
    }

    #[test]
    fn wait_is_sent_at_full_precision() {
        for (wait, wire) in [
            (Duration::from_micros(1_000_500), "1.0005s"),
            (Duration::from_micros(1_500), "1.5ms"),
            (Duration::from_nanos(10_000_000_001), "10.000000001s"),
        ] {
            let mut p = Params::new();
            apply_query_options(&mut p, &QueryOptions::new().wait_index(1).wait_time(wait), None);
            assert_eq!(p["wait"], wire);
            assert_eq!(duration::parse(&p["wait"]), Ok(wait));
        }
    }

    #[test]
    fn wait_falls_back_to_client_default_then_server_default() {
        let opts = QueryOptions::new().wait_index(3);

        let mut p = Params::new();
        apply_query_options(&mut p, &opts, Some(Duration::from_secs(90)));
        assert_eq!(encode(&p), "index=3&wait=1m30s");

        let mut p = Params::new();
        apply_query_options(&mut p, &opts, None);
        assert_eq!(encode(&p), "index=3");
    }

    #[test]
    fn wait_time_without_index_is_not_sent() {
        let opts = QueryOptions::new().wait_time(Duration::from_secs(10));
        let mut p = Params::new();
        apply_query_options(&mut p, &opts, Some(Duration::from_secs(5)));
        assert!(p.is_empty());
    }

    #[test]
    fn options_override_client_datacenter() {
        let mut p = params(&[("dc", "dc1")]);
        apply_query_options(&mut p, &QueryOptions::new().datacenter("dc3"), None);
        assert_eq!(p["dc"], "dc3");

        let mut p = params(&[("dc", "dc1")]);
        apply_write_options(&mut p, &WriteOptions::new().token("t"));
        assert_eq!(p["dc"], "dc1");
    }

    #[test]
    fn consistency_and_near() {
        let mut p = Params::new();
        apply_query_options(
            &mut p,
            &QueryOptions::new().consistency(ConsistencyMode::Stale).near("_agent"),
            None,
        );
        assert_eq!(encode(&p), "near=_agent&stale");

        let mut p = Params::new();
        apply_query_options(
            &mut p,
            &QueryOptions::new().consistency(ConsistencyMode::Consistent),
            None,
        );
        assert_eq!(encode(&p), "consistent");
    }
}
