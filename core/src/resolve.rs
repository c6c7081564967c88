//! Relationship resolution: `Resource` envelopes into domain entities.
//!
//! # Design
//! Every entity implements `Entity`. `from_attributes` decodes the flat
//! fields only; `resolve` additionally wires in the relations that came back
//! with the resource, one level deep. Related entities are built with
//! `from_attributes`, so their own relation fields stay empty even if the
//! panel sent nested data: resolving those is a separate call.
//!
//! Plural relations resolve to an empty `Vec` when absent; singular ones to
//! `None`. A relation sent with the wrong cardinality for its field is a
//! decode error.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::envelope::{List, PageInfo, Relation, Resource};
use crate::error::ApiError;
use crate::types::{
    Allocation, Database, DatabaseHost, DatabasePassword, Egg, EggVariable, Location, Nest, Node,
    Server, User,
};

/// A domain type that can be built from a panel resource.
pub trait Entity: DeserializeOwned {
    /// Decode the flat attributes. Relation fields are left empty.
    fn from_attributes(attributes: Map<String, Value>) -> Result<Self, ApiError> {
        serde_json::from_value(Value::Object(attributes)).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    /// Decode the attributes and populate relation fields from the
    /// resource's relationships. Types without relations keep the default.
    fn resolve(resource: Resource) -> Result<Self, ApiError> {
        Self::from_attributes(resource.attributes)
    }
}

/// The relationships of one resource, consumed field by field.
pub struct Relations {
    object: String,
    inner: BTreeMap<String, Relation>,
}

impl Relations {
    pub fn new(object: String, inner: BTreeMap<String, Relation>) -> Self {
        Self { object, inner }
    }

    /// Take a singular relation. `None` when it was not included.
    pub fn one<T: Entity>(&mut self, name: &str) -> Result<Option<Box<T>>, ApiError> {
        match self.inner.remove(name) {
            None | Some(Relation::Absent) => Ok(None),
            Some(Relation::One(resource)) => {
                let entity = T::from_attributes(resource.attributes).map_err(|e| self.context(name, e))?;
                Ok(Some(Box::new(entity)))
            }
            Some(Relation::Many(_)) => Err(ApiError::Deserialization(format!(
                "{}: relation `{name}` is a list, expected a single resource",
                self.object
            ))),
        }
    }

    /// Take a plural relation. Empty when it was not included; otherwise in
    /// the order the panel sent.
    pub fn many<T: Entity>(&mut self, name: &str) -> Result<Vec<T>, ApiError> {
        match self.inner.remove(name) {
            None | Some(Relation::Absent) => Ok(Vec::new()),
            Some(Relation::Many(resources)) => resources
                .into_iter()
                .map(|r| T::from_attributes(r.attributes).map_err(|e| self.context(name, e)))
                .collect(),
            Some(Relation::One(_)) => Err(ApiError::Deserialization(format!(
                "{}: relation `{name}` is a single resource, expected a list",
                self.object
            ))),
        }
    }

    /// Relations the entity has no field for. Logged, not an error: the
    /// panel adds relations over time.
    fn finish(self) {
        for name in self.inner.keys() {
            tracing::trace!(object = %self.object, relation = %name, "ignoring unknown relation");
        }
    }

    fn context(&self, name: &str, err: ApiError) -> ApiError {
        match err {
            ApiError::Deserialization(msg) => {
                ApiError::Deserialization(format!("{}: relation `{name}`: {msg}", self.object))
            }
            other => other,
        }
    }
}

/// Split a resource into its decoded attributes and its relations.
fn split<T: Entity>(resource: Resource) -> Result<(T, Relations), ApiError> {
    let object = if resource.object.is_empty() {
        std::any::type_name::<T>().rsplit("::").next().unwrap_or("resource").to_lowercase()
    } else {
        resource.object
    };
    let entity = T::from_attributes(resource.attributes).map_err(|e| match e {
        ApiError::Deserialization(msg) => ApiError::Deserialization(format!("{object}: {msg}")),
        other => other,
    })?;
    Ok((entity, Relations::new(object, resource.relationships)))
}

impl Entity for User {
    fn resolve(resource: Resource) -> Result<Self, ApiError> {
        let (mut user, mut rel) = split::<Self>(resource)?;
        user.servers = rel.many("servers")?;
        rel.finish();
        Ok(user)
    }
}

impl Entity for Server {
    fn resolve(resource: Resource) -> Result<Self, ApiError> {
        let (mut server, mut rel) = split::<Self>(resource)?;
        server.allocations = rel.many("allocations")?;
        server.user = rel.one("user")?;
        server.subusers = rel.many("subusers")?;
        server.location = rel.one("location")?;
        server.node = rel.one("node")?;
        server.nest = rel.one("nest")?;
        server.egg = rel.one("egg")?;
        server.variables = rel.many("variables")?;
        server.databases = rel.many("databases")?;
        rel.finish();
        Ok(server)
    }
}

impl Entity for Node {
    fn resolve(resource: Resource) -> Result<Self, ApiError> {
        let (mut node, mut rel) = split::<Self>(resource)?;
        node.allocations = rel.many("allocations")?;
        node.location = rel.one("location")?;
        node.servers = rel.many("servers")?;
        rel.finish();
        Ok(node)
    }
}

impl Entity for Allocation {
    fn resolve(resource: Resource) -> Result<Self, ApiError> {
        let (mut alloc, mut rel) = split::<Self>(resource)?;
        alloc.node = rel.one("node")?;
        alloc.server = rel.one("server")?;
        rel.finish();
        Ok(alloc)
    }
}

impl Entity for Location {
    fn resolve(resource: Resource) -> Result<Self, ApiError> {
        let (mut loc, mut rel) = split::<Self>(resource)?;
        loc.nodes = rel.many("nodes")?;
        loc.servers = rel.many("servers")?;
        rel.finish();
        Ok(loc)
    }
}

impl Entity for Nest {
    fn resolve(resource: Resource) -> Result<Self, ApiError> {
        let (mut nest, mut rel) = split::<Self>(resource)?;
        nest.eggs = rel.many("eggs")?;
        nest.servers = rel.many("servers")?;
        rel.finish();
        Ok(nest)
    }
}

impl Entity for Egg {
    fn resolve(resource: Resource) -> Result<Self, ApiError> {
        let (mut egg, mut rel) = split::<Self>(resource)?;
        egg.nest = rel.one("nest")?;
        egg.servers = rel.many("servers")?;
        egg.variables = rel.many("variables")?;
        rel.finish();
        Ok(egg)
    }
}

impl Entity for Database {
    fn resolve(resource: Resource) -> Result<Self, ApiError> {
        let (mut db, mut rel) = split::<Self>(resource)?;
        db.host = rel.one("host")?;
        db.password = rel.one("password")?;
        rel.finish();
        Ok(db)
    }
}

impl Entity for EggVariable {}
impl Entity for DatabaseHost {}
impl Entity for DatabasePassword {}

/// Decode a single-resource document and resolve it.
pub fn resolve_one<T: Entity>(body: &str) -> Result<T, ApiError> {
    let resource: Resource = serde_json::from_str(body)?;
    T::resolve(resource)
}

/// Decode a list document and resolve every item, keeping order.
pub fn resolve_list<T: Entity>(body: &str) -> Result<Vec<T>, ApiError> {
    Ok(resolve_page(body)?.data)
}

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Option<PageInfo>,
}

/// Like `resolve_list`, keeping the panel's pagination details.
pub fn resolve_page<T: Entity>(body: &str) -> Result<Page<T>, ApiError> {
    let list: List = serde_json::from_str(body)?;
    let data = list.data.into_iter().map(T::resolve).collect::<Result<Vec<_>, _>>()?;
    Ok(Page {
        data,
        pagination: list.meta.map(|m| m.pagination),
    })
}
