use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Keys probed, in order, when rendering a YouTrack value descriptor as text.
const DISPLAY_KEYS: &[&str] = &[
    "name",
    "presentation",
    "fullName",
    "localizedName",
    "login",
    "text",
    "minutes",
];

/// Snapshot of a source issue with everything needed to replay it.
#[derive(Debug, Clone, Default)]
pub struct Issue {
    pub id: String,
    pub summary: String,
    pub description: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub created: i64,
    pub reporter: Option<String>,
    pub custom_fields: CustomFields,
    pub comments: Vec<Comment>,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Default)]
pub struct Comment {
    pub author: Option<String>,
    pub created: i64,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct Attachment {
    pub name: String,
    /// Inline `data:<mime>;base64,<payload>` content, when the source embeds it.
    pub base64_content: Option<String>,
    pub url: Option<String>,
}

/// Raw value descriptor of a custom field as returned by YouTrack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldValue(pub Value);

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        self.display().is_none()
    }

    /// Human readable form of the value, e.g. the name of an enum bundle
    /// element or the login of a user.
    pub fn display(&self) -> Option<String> {
        display_value(&self.0)
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(arr) => {
            let parts: Vec<String> = arr.iter().filter_map(display_value).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        Value::Object(obj) => DISPLAY_KEYS
            .iter()
            .filter_map(|key| obj.get(*key))
            .find_map(display_value),
    }
}

/// Custom fields of an issue keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomFields(BTreeMap<String, FieldValue>);

impl CustomFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    /// Display string of a field, `None` when absent or empty.
    pub fn display(&self, name: &str) -> Option<String> {
        self.get(name).and_then(FieldValue::display)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, FieldValue)> for CustomFields {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
