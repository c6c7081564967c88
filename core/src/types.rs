//! Domain entities and request payloads for the panel's application API.
//!
//! # Design
//! Entities decode from the flat `attributes` object of a resource. Relation
//! fields are `#[serde(skip)]`: they always start out empty (`None` or an
//! empty `Vec`) and are filled in by the resolver in `resolve.rs`. Singular
//! relations are boxed because the entity graph is recursive (a node has
//! servers, a server has a node).

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub type Timestamp = DateTime<FixedOffset>;

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// A panel account.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub id: u64,
    #[serde(default)]
    pub external_id: Option<String>,
    pub uuid: Uuid,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub root_admin: bool,
    #[serde(rename = "2fa", default)]
    pub two_factor: bool,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,

    #[serde(skip)]
    pub servers: Vec<Server>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// An update payload pre-filled with the user's current values.
    pub fn update_descriptor(&self) -> UpdateUser {
        UpdateUser {
            external_id: self.external_id.clone(),
            email: Some(self.email.clone()),
            username: Some(self.username.clone()),
            password: None,
            first_name: Some(self.first_name.clone()),
            last_name: Some(self.last_name.clone()),
            language: Some(self.language.clone()),
            root_admin: Some(self.root_admin),
        }
    }
}

/// Request payload for creating a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub root_admin: bool,
}

/// Request payload for updating a user. Only fields that are `Some` are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_admin: Option<bool>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.external_id.is_none()
            && self.email.is_none()
            && self.username.is_none()
            && self.password.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.language.is_none()
            && self.root_admin.is_none()
    }
}

// ---------------------------------------------------------------------------
// Servers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default)]
    pub memory: u64,
    #[serde(default)]
    pub swap: i64,
    #[serde(default)]
    pub disk: u64,
    #[serde(default)]
    pub io: u64,
    #[serde(default)]
    pub cpu: u64,
    #[serde(default)]
    pub threads: Option<String>,
    #[serde(default)]
    pub oom_disabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLimits {
    #[serde(default)]
    pub databases: u32,
    #[serde(default)]
    pub allocations: u32,
    #[serde(default)]
    pub backups: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Container {
    #[serde(default)]
    pub startup_command: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub installed: u8,
    #[serde(default)]
    pub environment: Map<String, Value>,
}

/// A game server. The `*_id` fields are the raw foreign keys from the
/// attributes; the boxed fields hold the related entity when it was
/// included.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Server {
    pub id: u64,
    #[serde(default)]
    pub external_id: Option<String>,
    pub uuid: Uuid,
    pub identifier: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub suspended: bool,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub feature_limits: FeatureLimits,
    #[serde(rename = "user")]
    pub user_id: u64,
    #[serde(rename = "node")]
    pub node_id: u64,
    #[serde(rename = "allocation")]
    pub allocation_id: u64,
    #[serde(rename = "nest")]
    pub nest_id: u64,
    #[serde(rename = "egg")]
    pub egg_id: u64,
    #[serde(default)]
    pub container: Container,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,

    #[serde(skip)]
    pub allocations: Vec<Allocation>,
    #[serde(skip)]
    pub user: Option<Box<User>>,
    #[serde(skip)]
    pub subusers: Vec<User>,
    #[serde(skip)]
    pub location: Option<Box<Location>>,
    #[serde(skip)]
    pub node: Option<Box<Node>>,
    #[serde(skip)]
    pub nest: Option<Box<Nest>>,
    #[serde(skip)]
    pub egg: Option<Box<Egg>>,
    #[serde(skip)]
    pub variables: Vec<EggVariable>,
    #[serde(skip)]
    pub databases: Vec<Database>,
}

impl Server {
    /// A details payload pre-filled with the server's current values.
    pub fn details_descriptor(&self) -> UpdateServerDetails {
        UpdateServerDetails {
            external_id: self.external_id.clone(),
            name: Some(self.name.clone()),
            user: Some(self.user_id),
            description: Some(self.description.clone()),
        }
    }

    /// A build payload carrying the server's current allocation and limits.
    pub fn build_descriptor(&self) -> UpdateServerBuild {
        UpdateServerBuild {
            allocation: Some(self.allocation_id),
            oom_disabled: Some(self.limits.oom_disabled),
            limits: Some(self.limits.clone()),
            add_allocations: Vec::new(),
            remove_allocations: Vec::new(),
            feature_limits: Some(self.feature_limits.clone()),
        }
    }

    pub fn startup_descriptor(&self) -> UpdateServerStartup {
        UpdateServerStartup {
            startup: self.container.startup_command.clone(),
            environment: self.container.environment.clone(),
            egg: Some(self.egg_id),
            image: self.container.image.clone(),
            skip_scripts: false,
        }
    }
}

/// Request payload for `PATCH /servers/{id}/details`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateServerDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl UpdateServerDetails {
    pub fn is_empty(&self) -> bool {
        self.external_id.is_none()
            && self.name.is_none()
            && self.user.is_none()
            && self.description.is_none()
    }
}

/// Explicit allocations for a new server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationTarget {
    pub default: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional: Vec<u64>,
}

/// Let the panel pick a node and allocation for a new server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployTarget {
    pub locations: Vec<u64>,
    pub dedicated_ip: bool,
    pub port_range: Vec<String>,
}

/// Request payload for `POST /servers`. Exactly how the server is placed
/// comes from `allocation` or `deploy`; one of them must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateServer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub user: u64,
    pub egg: u64,
    pub docker_image: String,
    pub startup: String,
    pub environment: Map<String, Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skip_scripts: bool,
    pub oom_disabled: bool,
    pub limits: Limits,
    pub feature_limits: FeatureLimits,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation: Option<AllocationTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy: Option<DeployTarget>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub start_on_completion: bool,
}

/// Request payload for `PATCH /servers/{id}/build`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateServerBuild {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oom_disabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<Limits>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add_allocations: Vec<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove_allocations: Vec<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_limits: Option<FeatureLimits>,
}

impl UpdateServerBuild {
    pub fn is_empty(&self) -> bool {
        self.allocation.is_none()
            && self.oom_disabled.is_none()
            && self.limits.is_none()
            && self.add_allocations.is_empty()
            && self.remove_allocations.is_empty()
            && self.feature_limits.is_none()
    }
}

/// Request payload for `PATCH /servers/{id}/startup`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateServerStartup {
    pub startup: String,
    pub environment: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub egg: Option<u64>,
    pub image: String,
    #[serde(default)]
    pub skip_scripts: bool,
}

// ---------------------------------------------------------------------------
// Nodes, allocations, locations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Node {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub location_id: u64,
    #[serde(default)]
    pub public: bool,
    pub fqdn: String,
    #[serde(default)]
    pub scheme: String,
    #[serde(default)]
    pub behind_proxy: bool,
    #[serde(default)]
    pub maintenance_mode: bool,
    #[serde(default)]
    pub memory: i64,
    #[serde(default)]
    pub memory_overallocate: i64,
    #[serde(default)]
    pub disk: i64,
    #[serde(default)]
    pub disk_overallocate: i64,
    #[serde(default)]
    pub upload_size: u64,
    #[serde(default)]
    pub daemon_base: String,
    #[serde(default)]
    pub daemon_sftp: u16,
    #[serde(default)]
    pub daemon_listen: u16,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,

    #[serde(skip)]
    pub location: Option<Box<Location>>,
    #[serde(skip)]
    pub allocations: Vec<Allocation>,
    #[serde(skip)]
    pub servers: Vec<Server>,
}

impl Node {
    /// A payload for `PATCH /nodes/{id}` pre-filled with the node's current
    /// values.
    pub fn update_descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            location_id: self.location_id,
            public: self.public,
            fqdn: self.fqdn.clone(),
            scheme: self.scheme.clone(),
            behind_proxy: self.behind_proxy,
            memory: self.memory,
            memory_overallocate: self.memory_overallocate,
            disk: self.disk,
            disk_overallocate: self.disk_overallocate,
            daemon_base: self.daemon_base.clone(),
            daemon_sftp: self.daemon_sftp,
            daemon_listen: self.daemon_listen,
            upload_size: self.upload_size,
        }
    }
}

/// Request payload for creating or updating a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub location_id: u64,
    pub public: bool,
    pub fqdn: String,
    pub scheme: String,
    pub behind_proxy: bool,
    pub memory: i64,
    pub memory_overallocate: i64,
    pub disk: i64,
    pub disk_overallocate: i64,
    pub daemon_base: String,
    pub daemon_sftp: u16,
    pub daemon_listen: u16,
    pub upload_size: u64,
}

/// Wings configuration for a node, as served by
/// `GET /nodes/{id}/configuration`. Not wrapped in a resource envelope.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeConfiguration {
    #[serde(default)]
    pub debug: bool,
    pub uuid: Uuid,
    pub token_id: String,
    pub token: String,
    pub api: NodeApi,
    pub system: NodeSystem,
    #[serde(default)]
    pub allowed_mounts: Vec<String>,
    pub remote: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeApi {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub ssl: NodeSsl,
    #[serde(default)]
    pub upload_limit: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NodeSsl {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub cert: String,
    #[serde(default)]
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeSystem {
    pub data: String,
    pub sftp: NodeSftp,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeSftp {
    pub bind_port: u16,
}

/// Request payload for `POST /nodes/{id}/allocations`. Ports may be single
/// values or ranges such as `"25565-25570"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAllocations {
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub ports: Vec<String>,
}

/// An IP/port pair on a node.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Allocation {
    pub id: u64,
    pub ip: String,
    #[serde(default)]
    pub alias: Option<String>,
    pub port: u16,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub assigned: bool,

    #[serde(skip)]
    pub node: Option<Box<Node>>,
    #[serde(skip)]
    pub server: Option<Box<Server>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Location {
    pub id: u64,
    pub short: String,
    #[serde(default)]
    pub long: Option<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,

    #[serde(skip)]
    pub nodes: Vec<Node>,
    #[serde(skip)]
    pub servers: Vec<Server>,
}

/// Request payload for creating or updating a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationDescriptor {
    pub short: String,
    pub long: String,
}

// ---------------------------------------------------------------------------
// Nests and eggs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Nest {
    pub id: u64,
    pub uuid: Uuid,
    #[serde(default)]
    pub author: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,

    #[serde(skip)]
    pub eggs: Vec<Egg>,
    #[serde(skip)]
    pub servers: Vec<Server>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Egg {
    pub id: u64,
    pub uuid: Uuid,
    pub name: String,
    #[serde(rename = "nest")]
    pub nest_id: u64,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub docker_image: String,
    #[serde(default)]
    pub startup: String,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,

    #[serde(skip)]
    pub nest: Option<Box<Nest>>,
    #[serde(skip)]
    pub servers: Vec<Server>,
    #[serde(skip)]
    pub variables: Vec<EggVariable>,
}

/// A startup variable defined by an egg.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EggVariable {
    pub id: u64,
    pub egg_id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub env_variable: String,
    #[serde(default)]
    pub default_value: String,
    #[serde(default)]
    pub user_viewable: bool,
    #[serde(default)]
    pub user_editable: bool,
    #[serde(default)]
    pub rules: String,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Server databases
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Database {
    pub id: u64,
    #[serde(rename = "server")]
    pub server_id: u64,
    #[serde(rename = "host")]
    pub host_id: u64,
    pub database: String,
    pub username: String,
    #[serde(default)]
    pub remote: String,
    #[serde(default)]
    pub max_connections: Option<u32>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,

    #[serde(skip)]
    pub host: Option<Box<DatabaseHost>>,
    #[serde(skip)]
    pub password: Option<Box<DatabasePassword>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseHost {
    pub id: u64,
    pub name: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub node: Option<u64>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabasePassword {
    pub password: String,
}

/// Request payload for `POST /servers/{id}/databases`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDatabase {
    pub database: String,
    /// Hosts allowed to connect, `%` for any.
    pub remote: String,
    /// The database host to create it on.
    pub host: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_decodes_renamed_two_factor_flag() {
        let user: User = serde_json::from_str(
            r#"{"id":1,"external_id":null,"uuid":"c4022c6c-9bf1-4a23-bff9-519cceb38335",
                "username":"codeco","email":"codeco@file.properties","first_name":"Rihan",
                "last_name":"Arfan","language":"en","root_admin":true,"2fa":true,
                "created_at":"2020-06-12T20:18:43+00:00","updated_at":"2020-06-12T20:18:43+00:00"}"#,
        )
        .unwrap();
        assert!(user.two_factor);
        assert_eq!(user.full_name(), "Rihan Arfan");
        assert!(user.servers.is_empty());
        assert!(user.created_at.is_some());
    }

    #[test]
    fn user_missing_required_attribute_fails() {
        let res: Result<User, _> =
            serde_json::from_str(r#"{"id":1,"uuid":"c4022c6c-9bf1-4a23-bff9-519cceb38335"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn update_user_skips_unset_fields() {
        let body = serde_json::to_value(UpdateUser {
            email: Some("new@example.com".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"email": "new@example.com"}));
        assert!(UpdateUser::default().is_empty());
    }

    #[test]
    fn server_descriptor_carries_current_details() {
        let server: Server = serde_json::from_str(
            r#"{"id":5,"external_id":"ext-5","uuid":"1a7ce997-259b-452e-8b4e-cecc464142ca",
                "identifier":"1a7ce997","name":"Gaming","description":"Matt from Wii Sports",
                "suspended":false,"user":1,"node":1,"allocation":1,"nest":1,"egg":5}"#,
        )
        .unwrap();
        let details = server.details_descriptor();
        assert_eq!(details.name.as_deref(), Some("Gaming"));
        assert_eq!(details.user, Some(1));
        assert_eq!(details.external_id.as_deref(), Some("ext-5"));
        assert!(server.node.is_none());
        assert!(server.allocations.is_empty());
    }

    #[test]
    fn create_user_omits_optional_fields() {
        let body = serde_json::to_value(CreateUser {
            external_id: None,
            email: "a@b.c".to_string(),
            username: "a".to_string(),
            password: None,
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            language: None,
            root_admin: false,
        })
        .unwrap();
        assert!(body.get("external_id").is_none());
        assert!(body.get("password").is_none());
        assert_eq!(body["root_admin"], false);
    }

    #[test]
    fn build_and_startup_descriptors_reflect_server() {
        let server: Server = serde_json::from_str(
            r#"{"id":5,"uuid":"1a7ce997-259b-452e-8b4e-cecc464142ca","identifier":"1a7ce997",
                "name":"Gaming","user":1,"node":1,"allocation":7,"nest":1,"egg":5,
                "limits":{"memory":1024,"swap":0,"disk":5120,"io":500,"cpu":100,"oom_disabled":true},
                "feature_limits":{"databases":2,"allocations":1,"backups":0},
                "container":{"startup_command":"java -jar server.jar","image":"java:17",
                "installed":1,"environment":{"SERVER_JARFILE":"server.jar"}}}"#,
        )
        .unwrap();

        let build = server.build_descriptor();
        assert_eq!(build.allocation, Some(7));
        assert_eq!(build.oom_disabled, Some(true));
        assert!(!build.is_empty());
        let body = serde_json::to_value(&build).unwrap();
        assert!(body.get("add_allocations").is_none());
        assert_eq!(body["limits"]["memory"], 1024);

        let startup = server.startup_descriptor();
        assert_eq!(startup.egg, Some(5));
        assert_eq!(startup.image, "java:17");
        assert_eq!(startup.environment["SERVER_JARFILE"], "server.jar");
        assert!(UpdateServerBuild::default().is_empty());
    }

    #[test]
    fn node_update_descriptor_round_trips_fields() {
        let node: Node = serde_json::from_str(
            r#"{"id":3,"name":"iad-1","location_id":2,"fqdn":"iad-1.example.com","scheme":"https",
                "memory":16384,"disk":102400,"daemon_sftp":2022,"daemon_listen":8080}"#,
        )
        .unwrap();
        let desc = node.update_descriptor();
        assert_eq!(desc.location_id, 2);
        assert_eq!(desc.daemon_listen, 8080);
        let body = serde_json::to_value(&desc).unwrap();
        assert!(body.get("description").is_none());
        assert_eq!(body["fqdn"], "iad-1.example.com");
    }

    #[test]
    fn create_server_omits_unset_placement() {
        let body = serde_json::to_value(CreateServer {
            name: "lobby".to_string(),
            user: 1,
            egg: 2,
            allocation: Some(AllocationTarget { default: 4, additional: Vec::new() }),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(body["allocation"], serde_json::json!({"default": 4}));
        assert!(body.get("deploy").is_none());
        assert!(body.get("skip_scripts").is_none());
    }

    #[test]
    fn node_configuration_decodes_bare_document() {
        let config: NodeConfiguration = serde_json::from_str(
            r#"{"debug":false,"uuid":"5e3c2b1a-0000-4000-8000-000000000001","token_id":"abc",
                "token":"secret","api":{"host":"0.0.0.0","port":8080,
                "ssl":{"enabled":true,"cert":"/c.pem","key":"/k.pem"},"upload_limit":100},
                "system":{"data":"/var/lib/pterodactyl/volumes","sftp":{"bind_port":2022}},
                "allowed_mounts":[],"remote":"https://panel.example.com"}"#,
        )
        .unwrap();
        assert!(config.api.ssl.enabled);
        assert_eq!(config.system.sftp.bind_port, 2022);
    }
}
