use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Instruction produced by a field handler: set `field` on the target work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetFieldOperation {
    /// Azure DevOps field reference name, e.g. `Microsoft.VSTS.Common.Priority`.
    pub field: String,
    pub value: String,
    /// Some fields (e.g. `System.State` transitions) are rejected on create
    /// and must be patched onto the item afterwards.
    pub set_after_creation: bool,
}

impl SetFieldOperation {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            set_after_creation: false,
        }
    }

    pub fn deferred(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            set_after_creation: true,
            ..Self::new(field, value)
        }
    }

    pub fn to_patch(&self) -> PatchOperation {
        PatchOperation::set_field(&self.field, self.value.clone())
    }
}

/// One entry of an `application/json-patch+json` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: String,
    pub path: String,
    pub from: Option<String>,
    pub value: Value,
}

impl PatchOperation {
    pub fn set_field(field: &str, value: impl Into<Value>) -> Self {
        Self {
            op: "add".into(),
            path: format!("/fields/{field}"),
            from: None,
            value: value.into(),
        }
    }

    /// Links an uploaded attachment to a work item under its original file name.
    pub fn attach_file(url: &str, name: &str) -> Self {
        Self {
            op: "add".into(),
            path: "/relations/-".into(),
            from: None,
            value: json!({
                "rel": "AttachedFile",
                "url": url,
                "attributes": { "name": name },
            }),
        }
    }

    /// Field reference name if this operation sets a field.
    pub fn field(&self) -> Option<&str> {
        self.path.strip_prefix("/fields/")
    }
}
