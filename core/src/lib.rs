//! Synchronous client core for a game-server hosting panel's application API.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). The caller executes the
//! actual HTTP round-trip, making the core fully deterministic and testable.
//!
//! # Design
//! - `options` turns a per-endpoint options value (includes, filters, sort,
//!   free parameters) into the panel's canonical query string.
//! - `envelope` decodes the panel's `{object, attributes, relationships}`
//!   documents into a generic two-level shape.
//! - `resolve` flattens that shape into the entities in `types`, filling
//!   every relation field: included relations are wired in, missing plural
//!   relations become empty `Vec`s and missing singular ones `None`.
//! - `PanelClient` is stateless; it holds only the API root and key.

pub mod client;
pub mod envelope;
pub mod error;
pub mod http;
pub mod options;
pub mod params;
pub mod resolve;
pub mod types;

pub use client::{ClientConfig, PanelClient};
pub use envelope::{List, PageInfo, Relation, Resource};
pub use error::{ApiError, PanelError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use options::{encode_options, QueryPairs, RequestOptions};
pub use resolve::{resolve_list, resolve_one, resolve_page, Entity, Page};
pub use types::{
    Allocation, AllocationTarget, Container, CreateAllocations, CreateDatabase, CreateServer,
    CreateUser, Database, DatabaseHost, DatabasePassword, DeployTarget, Egg, EggVariable,
    FeatureLimits, Limits, Location, LocationDescriptor, Nest, Node, NodeConfiguration,
    NodeDescriptor, Server, UpdateServerBuild, UpdateServerDetails, UpdateServerStartup,
    UpdateUser, User,
};
