//! Public API surface shared with the remote scheduling service.
//!
//! This file consolidates the identifier newtypes and the documents exchanged
//! with the P2 store. All types derive Serialize/Deserialize so the HTTP
//! repository can send them as-is and the local repository can clone them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Container identifier (run, folder or concatenation).
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ContainerId(pub i64);

/// Observing Block identifier.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ObId(pub i64);

/// Template identifier, unique within its Observing Block.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub i64);

impl ContainerId {
    pub fn new(value: i64) -> Self {
        ContainerId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl ObId {
    pub fn new(value: i64) -> Self {
        ObId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl TemplateId {
    pub fn new(value: i64) -> Self {
        TemplateId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Display for ObId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque version tag assigned by the store on every create or save.
///
/// The P2 service transports it as an HTTP `ETag`. A save must present the
/// tag received last; the store rejects anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version(pub String);

impl Version {
    pub fn new(tag: impl Into<String>) -> Self {
        Version(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observing run as listed by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInfo {
    pub run_id: i64,
    /// Programme identifier, e.g. `60.A-9252(M)`.
    pub prog_id: String,
    pub container_id: ContainerId,
    #[serde(default)]
    pub instrument: String,
}

/// Kind of a node in the container hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    Folder,
    Concatenation,
    Group,
    TimeLink,
    OB,
    CB,
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ItemType::Folder => "Folder",
            ItemType::Concatenation => "Concatenation",
            ItemType::Group => "Group",
            ItemType::TimeLink => "TimeLink",
            ItemType::OB => "OB",
            ItemType::CB => "CB",
        };
        f.write_str(s)
    }
}

/// Entry of a container listing.
///
/// Containers carry a `containerId`, Observing Blocks an `obId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerItem {
    pub item_type: ItemType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<ContainerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ob_id: Option<ObId>,
}

/// Remote representation of an Observing Block.
///
/// Only the sections touched by this crate are typed; everything else the
/// service sends is kept in `extra` so a save round-trips it untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObDocument {
    pub ob_id: ObId,
    pub name: String,
    #[serde(default = "default_ob_item_type")]
    pub item_type: ItemType,
    #[serde(default)]
    pub target: BTreeMap<String, Value>,
    #[serde(default)]
    pub constraints: BTreeMap<String, Value>,
    #[serde(default)]
    pub obs_description: BTreeMap<String, Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_ob_item_type() -> ItemType {
    ItemType::OB
}

impl ObDocument {
    /// Empty OB shell, as returned by a freshly created remote item.
    pub fn new(ob_id: ObId, name: impl Into<String>) -> Self {
        Self {
            ob_id,
            name: name.into(),
            item_type: ItemType::OB,
            target: BTreeMap::new(),
            constraints: BTreeMap::new(),
            obs_description: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }
}

/// One named parameter of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateParam {
    pub name: String,
    pub value: Value,
}

/// Remote representation of a template attached to an Observing Block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDocument {
    pub template_id: TemplateId,
    pub template_name: String,
    #[serde(rename = "type", default)]
    pub template_type: String,
    #[serde(default)]
    pub parameters: Vec<TemplateParam>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl TemplateDocument {
    /// Look up the current value of a parameter.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ob_document_keeps_unknown_fields() {
        let json = r#"{
            "obId": 42,
            "name": "HD206893_dual",
            "itemType": "OB",
            "target": {"name": "HD 206893"},
            "obsDescription": {},
            "ipVersion": 104.13,
            "userPriority": 1
        }"#;
        let ob: ObDocument = serde_json::from_str(json).unwrap();
        assert_eq!(ob.ob_id, ObId(42));
        assert_eq!(ob.target["name"], Value::from("HD 206893"));
        assert!(ob.constraints.is_empty());
        assert_eq!(ob.extra["userPriority"], Value::from(1));

        let back = serde_json::to_value(&ob).unwrap();
        assert_eq!(back["ipVersion"], Value::from(104.13));
        assert_eq!(back["obId"], Value::from(42));
    }

    #[test]
    fn test_container_item_parses_folder_and_ob() {
        let items: Vec<ContainerItem> = serde_json::from_str(
            r#"[
                {"itemType": "Folder", "name": "HD206893", "containerId": 7},
                {"itemType": "OB", "name": "HD206893_B", "obId": 12}
            ]"#,
        )
        .unwrap();
        assert_eq!(items[0].container_id, Some(ContainerId(7)));
        assert_eq!(items[1].item_type, ItemType::OB);
        assert_eq!(items[1].ob_id, Some(ObId(12)));
    }

    #[test]
    fn test_template_param_lookup() {
        let tpl = TemplateDocument {
            template_id: TemplateId(3),
            template_name: "GRAVITY_dual_obs_exp".to_string(),
            template_type: "science".to_string(),
            parameters: vec![TemplateParam {
                name: "DET2.DIT".to_string(),
                value: Value::from(30.0),
            }],
            extra: BTreeMap::new(),
        };
        assert_eq!(tpl.param("DET2.DIT"), Some(&Value::from(30.0)));
        assert_eq!(tpl.param("DET2.NDIT.OBJECT"), None);
    }
}
