//! Key/value store types: `/v1/kv/{key}` and `/v1/txn`.
//!
//! Values are opaque bytes. In JSON bodies the agent carries them as
//! standard base64; on `PUT /v1/kv/{key}` the raw bytes are the request body.

use serde::{Deserialize, Serialize};

/// A stored key and its metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct KvPair {
    pub key: String,
    #[serde(default)]
    pub create_index: u64,
    #[serde(default)]
    pub modify_index: u64,
    #[serde(default)]
    pub lock_index: u64,
    #[serde(default)]
    pub flags: u64,
    #[serde(default, with = "base64_value", skip_serializing_if = "Option::is_none")]
    pub value: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

impl KvPair {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
            ..Default::default()
        }
    }

    /// The value as UTF-8 text, if it is valid UTF-8.
    pub fn value_str(&self) -> Option<&str> {
        self.value
            .as_deref()
            .and_then(|v| std::str::from_utf8(v).ok())
    }
}

/// Operation verbs accepted inside a KV transaction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum KvTxnVerb {
    Set,
    Delete,
    DeleteCas,
    DeleteTree,
    Cas,
    Lock,
    Unlock,
    Get,
    GetTree,
    CheckIndex,
    CheckSession,
}

/// One KV operation inside a transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct KvTxnOp {
    pub verb: KvTxnVerb,
    pub key: String,
    #[serde(default, with = "base64_value", skip_serializing_if = "Option::is_none")]
    pub value: Option<Vec<u8>>,
    #[serde(default)]
    pub flags: u64,
    #[serde(default)]
    pub index: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

impl KvTxnOp {
    pub fn new(verb: KvTxnVerb, key: impl Into<String>) -> Self {
        Self {
            verb,
            key: key.into(),
            value: None,
            flags: 0,
            index: 0,
            session: None,
        }
    }

    pub fn set(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::new(KvTxnVerb::Set, key)
        }
    }

    pub fn check_index(key: impl Into<String>, index: u64) -> Self {
        Self {
            index,
            ..Self::new(KvTxnVerb::CheckIndex, key)
        }
    }
}

/// An element of the `PUT /v1/txn` request array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxnOp {
    #[serde(rename = "KV")]
    pub kv: KvTxnOp,
}

impl From<KvTxnOp> for TxnOp {
    fn from(kv: KvTxnOp) -> Self {
        Self { kv }
    }
}

/// Body of a `/v1/txn` response.
///
/// Returned with `200` when every operation applied and with `409` when the
/// transaction was rolled back; in the latter case `errors` says which
/// operation failed and why.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct TxnResponse {
    #[serde(default)]
    pub results: Option<Vec<TxnResult>>,
    #[serde(default)]
    pub errors: Option<Vec<TxnError>>,
}

impl TxnResponse {
    /// `true` when the transaction was rolled back.
    pub fn is_rolled_back(&self) -> bool {
        self.errors.as_ref().is_some_and(|e| !e.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxnResult {
    #[serde(rename = "KV", default)]
    pub kv: Option<KvPair>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct TxnError {
    pub op_index: usize,
    pub what: String,
}

/// Serde adapter for `Option<Vec<u8>>` carried as standard base64.
pub mod base64_value {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => s.serialize_str(&STANDARD.encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(encoded) => STANDARD.decode(encoded).map(Some).map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_value_is_base64_in_json() {
        let raw = r#"[{"Key":"foo","CreateIndex":5,"ModifyIndex":6,"LockIndex":0,"Flags":0,"Value":"YmFy","Session":null}]"#;
        let pairs: Vec<KvPair> = serde_json::from_str(raw).unwrap();
        assert_eq!(pairs[0].value.as_deref(), Some(&b"bar"[..]));
        assert_eq!(pairs[0].value_str(), Some("bar"));
        assert_eq!(pairs[0].modify_index, 6);
    }

    #[test]
    fn null_value_decodes_to_none() {
        let pair: KvPair = serde_json::from_str(r#"{"Key":"dir/","Value":null}"#).unwrap();
        assert!(pair.value.is_none());
    }

    #[test]
    fn txn_ops_serialise_under_kv_key() {
        let ops: Vec<TxnOp> = vec![
            KvTxnOp::check_index("lock", 12).into(),
            KvTxnOp::set("foo", "bar").into(),
        ];
        let json = serde_json::to_value(&ops).unwrap();
        assert_eq!(json[0]["KV"]["Verb"], "check-index");
        assert_eq!(json[0]["KV"]["Index"], 12);
        assert_eq!(json[1]["KV"]["Value"], "YmFy");
    }

    #[test]
    fn rolled_back_response_reports_errors() {
        let raw = r#"{"Results":null,"Errors":[{"OpIndex":0,"What":"current modify index 13 does not match 12"}]}"#;
        let resp: TxnResponse = serde_json::from_str(raw).unwrap();
        assert!(resp.is_rolled_back());
        assert!(resp.results.is_none());
        assert_eq!(resp.errors.unwrap()[0].op_index, 0);
    }
}
