//! Translation of YouTrack custom fields into Azure DevOps field operations.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::model::issue::CustomFields;
use crate::model::operation::SetFieldOperation;

/// Turns an issue's custom fields into field operations for the new work item.
///
/// Closures of the form `Fn(&CustomFields) -> impl IntoIterator<Item = SetFieldOperation>`
/// implement this trait, so a mapping can be written inline:
///
/// ```
/// use yt2ado::mapping::FieldHandler;
/// use yt2ado::model::issue::CustomFields;
/// use yt2ado::model::operation::SetFieldOperation;
///
/// let handler = |fields: &CustomFields| {
///     fields
///         .display("State")
///         .map(|state| SetFieldOperation::deferred("System.State", state))
/// };
/// assert_eq!(handler.translate(&CustomFields::new()).count(), 0);
/// ```
///
/// A closure's return type cannot borrow from `fields`, so closures must
/// return owned iterators (`Option`, `Vec`, ...). Implement the trait directly,
/// as [`FieldMapping`] does, to yield operations lazily while borrowing the
/// fields.
pub trait FieldHandler {
    fn translate<'a>(
        &'a self,
        fields: &'a CustomFields,
    ) -> Box<dyn Iterator<Item = SetFieldOperation> + 'a>;
}

impl<F, I> FieldHandler for F
where
    F: Fn(&CustomFields) -> I,
    I: IntoIterator<Item = SetFieldOperation>,
    I::IntoIter: 'static,
{
    fn translate<'a>(
        &'a self,
        fields: &'a CustomFields,
    ) -> Box<dyn Iterator<Item = SetFieldOperation> + 'a> {
        Box::new(self(fields).into_iter())
    }
}

/// Handler that migrates no custom fields.
pub struct NoCustomFields;

impl FieldHandler for NoCustomFields {
    fn translate<'a>(
        &'a self,
        _fields: &'a CustomFields,
    ) -> Box<dyn Iterator<Item = SetFieldOperation> + 'a> {
        Box::new(std::iter::empty())
    }
}

/// One `[[fields]]` entry of the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldRule {
    /// YouTrack custom field name.
    pub source: String,
    /// Azure DevOps field reference name.
    pub target: String,
    #[serde(default)]
    pub deferred: bool,
    /// Source display value -> target value. Empty means pass through.
    #[serde(default)]
    pub values: BTreeMap<String, String>,
    pub default: Option<String>,
}

impl FieldRule {
    fn resolve(&self, fields: &CustomFields) -> Option<SetFieldOperation> {
        let value = match fields.display(&self.source) {
            Some(display) if self.values.is_empty() => Some(display),
            Some(display) => self.values.get(&display).cloned().or_else(|| self.default.clone()),
            None => self.default.clone(),
        }?;
        Some(SetFieldOperation {
            field: self.target.clone(),
            value,
            set_after_creation: self.deferred,
        })
    }
}

/// Config driven handler: applies each rule in order.
#[derive(Debug, Clone, Default)]
pub struct FieldMapping {
    rules: Vec<FieldRule>,
}

impl FieldMapping {
    pub fn new(rules: Vec<FieldRule>) -> Self {
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FieldHandler for FieldMapping {
    fn translate<'a>(
        &'a self,
        fields: &'a CustomFields,
    ) -> Box<dyn Iterator<Item = SetFieldOperation> + 'a> {
        Box::new(self.rules.iter().filter_map(move |rule| rule.resolve(fields)))
    }
}
