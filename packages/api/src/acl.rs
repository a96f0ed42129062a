//! Legacy ACL token types: `/v1/acl/{create,update,destroy,clone,info,list}`.

use serde::{Deserialize, Serialize};

/// Token class. Management tokens bypass all rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AclType {
    #[default]
    Client,
    Management,
}

/// An ACL token and its rules.
///
/// `CreateIndex` and `ModifyIndex` are assigned by the servers and are never
/// sent back on create/update.
///
/// ```json
/// { "ID": "8f246b77-...", "Name": "web", "Type": "client", "Rules": "key \"\" { policy = \"read\" }" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct AclEntry {
    #[serde(default, skip_serializing)]
    pub create_index: u64,

    #[serde(default, skip_serializing)]
    pub modify_index: u64,

    #[serde(rename = "ID", default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(rename = "Type", default)]
    pub acl_type: AclType,

    #[serde(default)]
    pub rules: String,
}

impl AclEntry {
    /// A client token with the given name and rules; the servers assign the ID.
    pub fn new(name: impl Into<String>, rules: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: rules.into(),
            ..Default::default()
        }
    }
}

/// Body returned by `create` and `clone`: just the new token ID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AclCreated {
    #[serde(rename = "ID")]
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_indexes_are_not_serialised() {
        let entry = AclEntry {
            create_index: 7,
            modify_index: 9,
            ..AclEntry::new("web", "")
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("CreateIndex").is_none());
        assert!(json.get("ModifyIndex").is_none());
        assert_eq!(json["Type"], "client");
        assert_eq!(json["Name"], "web");
    }

    #[test]
    fn deserialises_server_listing() {
        let raw = r#"{"CreateIndex":3,"ModifyIndex":4,"ID":"abc","Name":"ops","Type":"management","Rules":""}"#;
        let entry: AclEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.create_index, 3);
        assert_eq!(entry.acl_type, AclType::Management);
        assert_eq!(entry.id, "abc");
    }
}
