//! Generic shape of the panel's response documents.
//!
//! # Design
//! Every entity comes back as `{"object": "<kind>", "attributes": {...}}`.
//! When relations were requested with `include`, the attributes object also
//! carries a `relationships` map whose values are either a single nested
//! resource or a `{"object": "list", "data": [...]}` collection. Decoding
//! splits that map out of the attributes so the flat fields and the relations
//! can be handled separately, and classifies every relation as `Absent`,
//! `One` or `Many` up front. A relation that fits none of those shapes is a
//! decode error, never silently dropped.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

/// One entity as sent by the panel, before resolution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawResource")]
pub struct Resource {
    /// Kind tag, e.g. `"server"`. Empty when the panel omitted it.
    pub object: String,
    /// Flat attributes with `relationships` removed.
    pub attributes: Map<String, Value>,
    pub relationships: BTreeMap<String, Relation>,
}

/// A named relation of a `Resource`.
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    /// Sent as `null` or as a `null_resource`.
    Absent,
    One(Box<Resource>),
    Many(Vec<Resource>),
}

impl Relation {
    fn from_value(name: &str, value: Value) -> Result<Self, String> {
        let mut obj = match value {
            Value::Null => return Ok(Relation::Absent),
            Value::Object(obj) => obj,
            other => {
                return Err(format!(
                    "relation `{name}` must be an object, got {}",
                    kind_of(&other)
                ))
            }
        };

        if let Some(data) = obj.remove("data") {
            return match data {
                Value::Array(items) => items
                    .into_iter()
                    .map(|item| {
                        serde_json::from_value::<Resource>(item)
                            .map_err(|e| format!("relation `{name}`: {e}"))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Relation::Many),
                Value::Null => Ok(Relation::Many(Vec::new())),
                other => Err(format!(
                    "relation `{name}` has non-array `data` ({})",
                    kind_of(&other)
                )),
            };
        }

        match obj.get("attributes") {
            Some(Value::Null) => Ok(Relation::Absent),
            Some(_) => serde_json::from_value::<Resource>(Value::Object(obj))
                .map(|r| Relation::One(Box::new(r)))
                .map_err(|e| format!("relation `{name}`: {e}")),
            None if obj.get("object").and_then(Value::as_str) == Some("null_resource") => {
                Ok(Relation::Absent)
            }
            None => Err(format!(
                "relation `{name}` has neither `attributes` nor `data`"
            )),
        }
    }
}

#[derive(Deserialize)]
struct RawResource {
    #[serde(default)]
    object: String,
    attributes: Map<String, Value>,
}

impl TryFrom<RawResource> for Resource {
    type Error = String;

    fn try_from(raw: RawResource) -> Result<Self, Self::Error> {
        let mut attributes = raw.attributes;
        let relationships = match attributes.remove("relationships") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(Value::Object(map)) => map
                .into_iter()
                .map(|(name, value)| Relation::from_value(&name, value).map(|rel| (name, rel)))
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(format!(
                    "`relationships` must be an object, got {}",
                    kind_of(&other)
                ))
            }
        };

        Ok(Resource {
            object: raw.object,
            attributes,
            relationships,
        })
    }
}

/// A list response: `{"object": "list", "data": [...], "meta": {...}}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct List {
    #[serde(default)]
    pub object: String,
    pub data: Vec<Resource>,
    #[serde(default)]
    pub meta: Option<Meta>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Meta {
    pub pagination: PageInfo,
}

/// Paging details the panel attaches to list responses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageInfo {
    pub total: u64,
    pub count: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub total_pages: u64,
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> Result<Resource, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn flat_resource_has_no_relationships() {
        let r = decode(r#"{"object":"location","attributes":{"id":1,"short":"eu"}}"#).unwrap();
        assert_eq!(r.object, "location");
        assert_eq!(r.attributes["short"], "eu");
        assert!(r.relationships.is_empty());
    }

    #[test]
    fn relationships_are_split_from_attributes() {
        let r = decode(
            r#"{"object":"node","attributes":{"id":3,"name":"n1","relationships":{
                "location":{"object":"location","attributes":{"id":1,"short":"eu"}},
                "servers":{"object":"list","data":[
                    {"object":"server","attributes":{"id":10}},
                    {"object":"server","attributes":{"id":11}}
                ]}
            }}}"#,
        )
        .unwrap();

        assert!(!r.attributes.contains_key("relationships"));
        match &r.relationships["location"] {
            Relation::One(loc) => assert_eq!(loc.attributes["short"], "eu"),
            other => panic!("expected One, got {other:?}"),
        }
        match &r.relationships["servers"] {
            Relation::Many(items) => {
                let ids: Vec<_> = items.iter().map(|s| s.attributes["id"].clone()).collect();
                assert_eq!(ids, vec![Value::from(10), Value::from(11)]);
            }
            other => panic!("expected Many, got {other:?}"),
        }
    }

    #[test]
    fn null_resource_is_absent() {
        let r = decode(
            r#"{"object":"database","attributes":{"id":1,"relationships":{
                "host":{"object":"null_resource","attributes":null},
                "password":null
            }}}"#,
        )
        .unwrap();
        assert_eq!(r.relationships["host"], Relation::Absent);
        assert_eq!(r.relationships["password"], Relation::Absent);
    }

    #[test]
    fn empty_list_is_many_with_no_items() {
        let r = decode(
            r#"{"object":"user","attributes":{"id":1,"relationships":{"servers":{"object":"list","data":[]}}}}"#,
        )
        .unwrap();
        assert_eq!(r.relationships["servers"], Relation::Many(Vec::new()));
    }

    #[test]
    fn nested_relationships_are_kept_on_the_child() {
        let r = decode(
            r#"{"object":"server","attributes":{"id":1,"relationships":{
                "node":{"object":"node","attributes":{"id":2,"relationships":{
                    "location":{"object":"location","attributes":{"id":3}}
                }}}
            }}}"#,
        )
        .unwrap();
        let Relation::One(node) = &r.relationships["node"] else {
            panic!("expected node");
        };
        assert!(matches!(node.relationships["location"], Relation::One(_)));
    }

    #[test]
    fn malformed_relation_is_an_error() {
        let err = decode(
            r#"{"object":"server","attributes":{"id":1,"relationships":{"node":{"object":"node"}}}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("relation `node`"), "{err}");

        let err = decode(
            r#"{"object":"server","attributes":{"id":1,"relationships":{"allocations":{"data":{"id":1}}}}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("non-array"), "{err}");

        assert!(decode(r#"{"object":"server","attributes":{"relationships":[1]}}"#).is_err());
        assert!(decode(r#"{"object":"server","attributes":{"relationships":{"node":7}}}"#).is_err());
    }

    #[test]
    fn missing_attributes_is_an_error() {
        assert!(decode(r#"{"object":"server"}"#).is_err());
    }

    #[test]
    fn list_with_pagination_meta() {
        let list: List = serde_json::from_str(
            r#"{"object":"list","data":[{"object":"location","attributes":{"id":1}}],
                "meta":{"pagination":{"total":1,"count":1,"per_page":50,"current_page":1,"total_pages":1,"links":{}}}}"#,
        )
        .unwrap();
        assert_eq!(list.data.len(), 1);
        assert_eq!(list.meta.unwrap().pagination.per_page, 50);
    }
}
