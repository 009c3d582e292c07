//! Base behaviour shared by every resource model.
//!
//! A model is a thin typed wrapper around [`ModelBase`], which holds the
//! identity, the raw attribute map decoded from the server (or from local
//! storage) and the handle of the collection that produced it. Typed
//! accessors are layered on top by each resource kind; the untyped
//! [`Model::get`] stays available for projections and filters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Map, Value};
use thiserror::Error;

/// Raw attribute bag of a model
pub type Attributes = Map<String, Value>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{kind} has no attribute {field:?}")]
    AttributeNotFound { kind: &'static str, field: String },
    #[error("attribute {field:?} of {kind} is not a {expected}")]
    UnexpectedType {
        kind: &'static str,
        field: String,
        expected: &'static str,
    },
}

/// Handle identifying one collection instance.
///
/// Models carry the handle of their owning collection instead of a pointer
/// to it; the collection always outlives the references it hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectionId(u64);

impl CollectionId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        CollectionId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Extra construction options passed to [`crate::collection::Collection::add`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelOptions {
    /// Identity override; wins over the record's own `id`
    pub id: Option<String>,
    /// Properties that are not server attributes (e.g. the parent site id)
    pub properties: Map<String, Value>,
}

impl ModelOptions {
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_property(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(name.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelBase {
    kind: &'static str,
    id: String,
    collection: CollectionId,
    attributes: Attributes,
    properties: Map<String, Value>,
}

impl ModelBase {
    pub(crate) fn new(
        kind: &'static str,
        id: String,
        collection: CollectionId,
        attributes: Attributes,
        properties: Map<String, Value>,
    ) -> Self {
        Self {
            kind,
            id,
            collection,
            attributes,
            properties,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn collection(&self) -> CollectionId {
        self.collection
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn has(&self, field: &str) -> bool {
        self.attributes.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Result<&Value, ModelError> {
        self.attributes
            .get(field)
            .ok_or_else(|| ModelError::AttributeNotFound {
                kind: self.kind,
                field: field.to_string(),
            })
    }

    /// Required string attribute
    pub fn get_str(&self, field: &str) -> Result<&str, ModelError> {
        self.get(field)?
            .as_str()
            .ok_or_else(|| ModelError::UnexpectedType {
                kind: self.kind,
                field: field.to_string(),
                expected: "string",
            })
    }

    /// Optional string attribute; absent and `null` both read as `None`
    pub fn get_opt_str(&self, field: &str) -> Option<&str> {
        self.attributes.get(field).and_then(Value::as_str)
    }

    pub fn get_opt_i64(&self, field: &str) -> Option<i64> {
        self.attributes.get(field).and_then(Value::as_i64)
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

/// A resource kind produced by a [`crate::collection::Collection`].
pub trait Model: Sized {
    /// Human readable kind name, used in error messages
    const KIND: &'static str;

    /// Builds the typed model; fails when a required attribute is missing
    fn from_base(base: ModelBase) -> Result<Self, ModelError>;

    fn base(&self) -> &ModelBase;

    fn id(&self) -> &str {
        self.base().id()
    }

    fn get(&self, field: &str) -> Result<&Value, ModelError> {
        self.base().get(field)
    }

    /// Snapshot of the attributes, detached from the owning collection
    fn serialize(&self) -> Attributes {
        self.base().attributes().clone()
    }
}

/// Renders a scalar value the way it is used as a listing key or CSV cell.
pub fn scalar_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Equality used by member-list filters. Scalars compare by their rendered
/// form, so `1` matches `"1"` and `true` matches `"true"`.
pub fn loosely_equal(left: &Value, right: &Value) -> bool {
    if left == right {
        return true;
    }
    match (left, right) {
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => false,
        _ => scalar_string(left) == scalar_string(right),
    }
}
