//! Lazily populated, identity-indexed collections of models.
//!
//! A [`Collection`] produces exactly one model kind (its type parameter) and
//! fills itself from a [`RecordSource`] the first time its members are
//! needed. Remote collections use [`RemoteSource`], which turns an
//! [`Endpoint`] into a single or paged request on the shared [`Transport`];
//! the credential store plugs in a file-backed source instead.

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, trace};

use crate::model::{
    loosely_equal, scalar_string, Attributes, CollectionId, Model, ModelBase, ModelError,
    ModelOptions,
};
use crate::transport::{RequestOptions, Transport, TransportError};

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("Could not find {kind} \"{id}\"")]
    NotFound { kind: &'static str, id: String },
    #[error("cannot add a {kind} without an identity")]
    MissingIdentity { kind: &'static str },
    #[error("record {key:?} is not an object")]
    MalformedRecord { key: String },
    #[error(transparent)]
    ModelError(#[from] ModelError),
    #[error(transparent)]
    TransportError(#[from] TransportError),
    #[error("storage error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// One raw record, with the key it had in the source payload
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub key: String,
    pub data: Attributes,
}

/// The fetch routine behind a collection
pub trait RecordSource {
    fn fetch_records(&self, fetch_args: &RequestOptions) -> Result<Vec<Record>, CollectionError>;
}

/// Where and how a remote collection is fetched
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    path: String,
    paged: bool,
    single: bool,
    args: RequestOptions,
}

impl Endpoint {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            paged: false,
            single: false,
            args: RequestOptions::default(),
        }
    }

    /// Population follows every page of the listing
    pub fn paged(mut self) -> Self {
        self.paged = true;
        self
    }

    /// The endpoint answers with one object rather than a list
    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    /// Fixed arguments sent with every fetch
    pub fn with_args(mut self, args: RequestOptions) -> Self {
        self.args = args;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_paged(&self) -> bool {
        self.paged
    }
}

pub struct RemoteSource {
    transport: Rc<dyn Transport>,
    endpoint: Endpoint,
}

impl RemoteSource {
    pub fn new(transport: Rc<dyn Transport>, endpoint: Endpoint) -> Self {
        Self {
            transport,
            endpoint,
        }
    }
}

impl RecordSource for RemoteSource {
    fn fetch_records(&self, fetch_args: &RequestOptions) -> Result<Vec<Record>, CollectionError> {
        let mut args = RequestOptions::get();
        args.merge(&self.endpoint.args);
        args.merge(fetch_args);

        let path = self.endpoint.path();
        let response = if self.endpoint.paged {
            self.transport.paged_request(path, &args)?
        } else {
            self.transport.request(path, &args)?
        };

        if !response.is_success() {
            return Err(TransportError::UnexpectedStatus {
                status: response.status_code,
                path: path.to_string(),
            }
            .into());
        }

        records_from_data(response.data, self.endpoint.single)
    }
}

/// Splits a response payload into records.
///
/// Arrays are keyed by position and objects by their own keys; a `single`
/// payload is one record keyed by the empty string.
pub fn records_from_data(data: Value, single: bool) -> Result<Vec<Record>, CollectionError> {
    let entries: Vec<(String, Value)> = match data {
        Value::Null => Vec::new(),
        Value::Object(map) if single => vec![(String::new(), Value::Object(map))],
        Value::Object(map) => map.into_iter().collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(position, item)| (position.to_string(), item))
            .collect(),
        _ => {
            return Err(CollectionError::MalformedRecord {
                key: String::new(),
            })
        }
    };

    entries
        .into_iter()
        .map(|(key, value)| match value {
            Value::Object(data) => Ok(Record { key, data }),
            _ => Err(CollectionError::MalformedRecord { key }),
        })
        .collect()
}

/// Options for an explicit [`Collection::fetch`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOptions {
    pub fetch_args: RequestOptions,
}

/// Which attributes make up the values of a member list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSpec {
    Field(String),
    Fields(Vec<String>),
}

impl ValueSpec {
    pub fn field(name: &str) -> Self {
        ValueSpec::Field(name.to_string())
    }

    pub fn fields<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        ValueSpec::Fields(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&str> for ValueSpec {
    fn from(name: &str) -> Self {
        ValueSpec::field(name)
    }
}

/// Attribute filters for [`Collection::get_filtered_member_list`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters(Vec<(String, Value)>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, attribute: &str, expected: impl Into<Value>) -> Self {
        self.0.push((attribute.to_string(), expected.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn matches<M: Model>(&self, member: &M) -> Result<bool, ModelError> {
        for (attribute, expected) in &self.0 {
            if !loosely_equal(member.get(attribute)?, expected) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

pub struct Collection<M: Model> {
    id: CollectionId,
    source: Box<dyn RecordSource>,
    members: Vec<M>,
    index: HashMap<String, usize>,
    member_properties: Map<String, Value>,
    populated: bool,
}

impl<M: Model> Collection<M> {
    pub fn new(source: impl RecordSource + 'static) -> Self {
        Self {
            id: CollectionId::next(),
            source: Box::new(source),
            members: Vec::new(),
            index: HashMap::new(),
            member_properties: Map::new(),
            populated: false,
        }
    }

    /// Properties stamped on every fetched member (e.g. the parent id)
    pub fn with_member_property(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.member_properties.insert(name.to_string(), value.into());
        self
    }

    /// Collection fetched from `endpoint` through `transport`
    pub fn remote(transport: Rc<dyn Transport>, endpoint: Endpoint) -> Self {
        Self::new(RemoteSource::new(transport, endpoint))
    }

    pub fn id(&self) -> CollectionId {
        self.id
    }

    pub fn kind(&self) -> &'static str {
        M::KIND
    }

    /// Whether `model` was produced by this collection instance
    pub fn owns(&self, model: &M) -> bool {
        model.base().collection() == self.id
    }

    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Current members without triggering a fetch
    pub fn iter(&self) -> impl Iterator<Item = &M> {
        self.members.iter()
    }

    /// Identity lookup without triggering a fetch
    pub fn lookup(&self, id: &str) -> Option<&M> {
        self.index.get(id).map(|&position| &self.members[position])
    }

    /// Builds a model from `record` and stores it under its identity,
    /// replacing any member that already has that identity.
    pub fn add(&mut self, mut record: Attributes, options: ModelOptions) -> Result<&M, CollectionError> {
        let ModelOptions { id, properties } = options;
        let id = id
            .or_else(|| record.get("id").and_then(identity_of))
            .ok_or(CollectionError::MissingIdentity { kind: M::KIND })?;
        record
            .entry("id")
            .or_insert_with(|| Value::String(id.clone()));

        let model = M::from_base(ModelBase::new(M::KIND, id.clone(), self.id, record, properties))?;

        let position = match self.index.get(&id) {
            Some(&position) => {
                trace!("Replacing {} {:?}", M::KIND, id);
                self.members[position] = model;
                position
            }
            None => {
                self.members.push(model);
                let position = self.members.len() - 1;
                self.index.insert(id, position);
                position
            }
        };

        Ok(&self.members[position])
    }

    /// Fetches records from the source and adds each of them.
    pub fn fetch(&mut self, options: &FetchOptions) -> Result<&mut Self, CollectionError> {
        debug!("Fetching {} collection...", M::KIND);
        let records = self.source.fetch_records(&options.fetch_args)?;
        debug!("Received {} {} record(s)", records.len(), M::KIND);

        for Record { key, mut data } in records {
            if data.get("id").and_then(identity_of).is_none() {
                data.insert("id".to_string(), Value::String(key));
            }
            let options = ModelOptions {
                id: None,
                properties: self.member_properties.clone(),
            };
            self.add(data, options)?;
        }

        self.populated = true;
        Ok(self)
    }

    /// Fills the collection unless it was already fetched or has members.
    pub fn populate(&mut self) -> Result<(), CollectionError> {
        if !self.populated && self.members.is_empty() {
            self.fetch(&FetchOptions::default())?;
        }
        Ok(())
    }

    pub fn all(&mut self) -> Result<Vec<&M>, CollectionError> {
        self.populate()?;
        Ok(self.members.iter().collect())
    }

    pub fn get(&mut self, id: &str) -> Result<&M, CollectionError> {
        self.populate()?;
        self.lookup(id).ok_or_else(|| CollectionError::NotFound {
            kind: M::KIND,
            id: id.to_string(),
        })
    }

    pub fn ids(&mut self) -> Result<Vec<String>, CollectionError> {
        self.populate()?;
        Ok(self.members.iter().map(|m| m.id().to_string()).collect())
    }

    /// Maps `key` of every member to `value`. A field set always yields a
    /// nested map, even with one field.
    pub fn listing(&mut self, key: &str, value: &ValueSpec) -> Result<Map<String, Value>, CollectionError> {
        self.project(&Filters::new(), key, value, false)
    }

    /// Like [`Collection::listing`], restricted to members matching every
    /// filter. Field sets of fewer than two fields collapse to a scalar.
    pub fn get_filtered_member_list(
        &mut self,
        filters: &Filters,
        key: &str,
        value: &ValueSpec,
    ) -> Result<Map<String, Value>, CollectionError> {
        self.project(filters, key, value, true)
    }

    pub fn get_member_list(&mut self, key: &str, value: &ValueSpec) -> Result<Map<String, Value>, CollectionError> {
        self.get_filtered_member_list(&Filters::new(), key, value)
    }

    fn project(
        &mut self,
        filters: &Filters,
        key: &str,
        value: &ValueSpec,
        collapse: bool,
    ) -> Result<Map<String, Value>, CollectionError> {
        self.populate()?;

        let mut list = Map::new();
        for member in &self.members {
            let listed_key = scalar_string(member.get(key)?);
            if !filters.matches(member)? {
                continue;
            }
            let listed_value = match value {
                ValueSpec::Field(field) => member.get(field)?.clone(),
                ValueSpec::Fields(fields) => {
                    let mut nested = Map::new();
                    for field in fields {
                        nested.insert(field.clone(), member.get(field)?.clone());
                    }
                    if collapse && fields.len() < 2 {
                        nested.into_iter().next().map(|(_, v)| v).unwrap_or(Value::Null)
                    } else {
                        Value::Object(nested)
                    }
                }
            };
            list.insert(listed_key, listed_value);
        }

        Ok(list)
    }
}

fn identity_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
