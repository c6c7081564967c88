//! In-memory mock of the panel's application API.
//!
//! Serves the same document shapes as the real panel: every entity is
//! `{"object", "attributes"}`, lists are `{"object": "list", "data", "meta"}`
//! and relations listed in `?include=` are embedded under
//! `attributes.relationships`, one level deep. Requests without a bearer
//! token are rejected with the panel's error document.

use std::{collections::BTreeMap, collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

const SEEDED_AT: &str = "2024-01-01T00:00:00+00:00";
const DEFAULT_PER_PAGE: usize = 50;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub external_id: Option<String>,
    pub uuid: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub language: String,
    pub root_admin: bool,
    #[serde(rename = "2fa")]
    pub two_factor: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Location {
    pub id: u64,
    pub short: String,
    pub long: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub location_id: u64,
    pub public: bool,
    pub fqdn: String,
    pub scheme: String,
    pub behind_proxy: bool,
    pub maintenance_mode: bool,
    pub memory: i64,
    pub memory_overallocate: i64,
    pub disk: i64,
    pub disk_overallocate: i64,
    pub upload_size: u64,
    pub daemon_base: String,
    pub daemon_sftp: u16,
    pub daemon_listen: u16,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Allocation {
    pub id: u64,
    pub ip: String,
    pub alias: Option<String>,
    pub port: u16,
    pub notes: Option<String>,
    pub assigned: bool,
    #[serde(skip)]
    pub node: u64,
    #[serde(skip)]
    pub server: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Server {
    pub id: u64,
    pub external_id: Option<String>,
    pub uuid: Uuid,
    pub identifier: String,
    pub name: String,
    pub description: String,
    pub status: Option<String>,
    pub suspended: bool,
    pub limits: Value,
    pub feature_limits: Value,
    pub user: u64,
    pub node: u64,
    pub allocation: u64,
    pub nest: u64,
    pub egg: u64,
    pub container: Value,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Nest {
    pub id: u64,
    pub uuid: Uuid,
    pub author: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Egg {
    pub id: u64,
    pub uuid: Uuid,
    pub name: String,
    pub nest: u64,
    pub author: String,
    pub description: Option<String>,
    pub docker_image: String,
    pub startup: String,
    pub created_at: String,
    pub updated_at: String,
}

/// The whole panel state.
#[derive(Debug, Default)]
pub struct Panel {
    pub users: BTreeMap<u64, User>,
    pub locations: BTreeMap<u64, Location>,
    pub nodes: BTreeMap<u64, Node>,
    pub allocations: BTreeMap<u64, Allocation>,
    pub servers: BTreeMap<u64, Server>,
    pub nests: BTreeMap<u64, Nest>,
    pub eggs: BTreeMap<u64, Egg>,
    next_id: u64,
}

pub type Db = Arc<RwLock<Panel>>;

pub fn app() -> Router {
    app_with(Panel::seeded())
}

pub fn app_with(panel: Panel) -> Router {
    let db: Db = Arc::new(RwLock::new(panel));
    let api = Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/external/{external_id}", get(get_user_external))
        .route("/users/{id}", get(get_user).patch(update_user).delete(delete_user))
        .route("/servers", get(list_servers))
        .route("/servers/external/{external_id}", get(get_server_external))
        .route("/servers/{id}", get(get_server).delete(delete_server))
        .route("/servers/{id}/force", delete(delete_server))
        .route("/servers/{id}/details", patch(update_server_details))
        .route("/servers/{id}/suspend", post(suspend_server))
        .route("/servers/{id}/unsuspend", post(unsuspend_server))
        .route("/servers/{id}/reinstall", post(reinstall_server))
        .route("/nodes", get(list_nodes))
        .route("/nodes/{id}", get(get_node))
        .route("/nodes/{id}/allocations", get(list_node_allocations))
        .route("/locations", get(list_locations).post(create_location))
        .route(
            "/locations/{id}",
            get(get_location).patch(update_location).delete(delete_location),
        )
        .route("/nests", get(list_nests))
        .route("/nests/{id}", get(get_nest))
        .route("/nests/{id}/eggs", get(list_nest_eggs))
        .route("/nests/{id}/eggs/{egg}", get(get_egg))
        .layer(middleware::from_fn(require_bearer))
        .with_state(db);

    Router::new().nest("/api/application", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

impl Panel {
    /// Two locations, three nodes, three users, three servers, one nest.
    pub fn seeded() -> Self {
        let mut p = Panel::default();

        for (id, short, long) in [(1, "eu-west", "Amsterdam"), (2, "us-east", "Virginia")] {
            p.locations.insert(
                id,
                Location {
                    id,
                    short: short.to_string(),
                    long: Some(long.to_string()),
                    created_at: SEEDED_AT.to_string(),
                    updated_at: SEEDED_AT.to_string(),
                },
            );
        }

        for (id, name, location_id) in [(1, "ams-1", 1), (2, "ams-2", 1), (3, "iad-1", 2)] {
            p.nodes.insert(
                id,
                Node {
                    id,
                    name: name.to_string(),
                    description: None,
                    location_id,
                    public: true,
                    fqdn: format!("{name}.nodes.example.com"),
                    scheme: "https".to_string(),
                    behind_proxy: false,
                    maintenance_mode: false,
                    memory: 16384,
                    memory_overallocate: 0,
                    disk: 102400,
                    disk_overallocate: 0,
                    upload_size: 100,
                    daemon_base: "/var/lib/pterodactyl/volumes".to_string(),
                    daemon_sftp: 2022,
                    daemon_listen: 8080,
                    created_at: SEEDED_AT.to_string(),
                    updated_at: SEEDED_AT.to_string(),
                },
            );
        }

        for (id, username, external_id, root_admin) in [
            (1, "admin", Some("ext-admin"), true),
            (2, "alice", Some("ext-alice"), false),
            (3, "bob", None, false),
        ] {
            p.users.insert(
                id,
                User {
                    id,
                    external_id: external_id.map(str::to_string),
                    uuid: Uuid::from_u128(0x1000 + id as u128),
                    username: username.to_string(),
                    email: format!("{username}@example.com"),
                    first_name: capitalize(username),
                    last_name: "Example".to_string(),
                    language: "en".to_string(),
                    root_admin,
                    two_factor: false,
                    created_at: SEEDED_AT.to_string(),
                    updated_at: SEEDED_AT.to_string(),
                },
            );
        }

        p.nests.insert(
            1,
            Nest {
                id: 1,
                uuid: Uuid::from_u128(0x3001),
                author: "support@pterodactyl.io".to_string(),
                name: "Minecraft".to_string(),
                description: Some("Minecraft server types".to_string()),
                created_at: SEEDED_AT.to_string(),
                updated_at: SEEDED_AT.to_string(),
            },
        );
        for (id, name) in [(1, "Paper"), (2, "Forge")] {
            p.eggs.insert(
                id,
                Egg {
                    id,
                    uuid: Uuid::from_u128(0x4000 + id as u128),
                    name: name.to_string(),
                    nest: 1,
                    author: "support@pterodactyl.io".to_string(),
                    description: None,
                    docker_image: "ghcr.io/pterodactyl/yolks:java_17".to_string(),
                    startup: "java -jar server.jar".to_string(),
                    created_at: SEEDED_AT.to_string(),
                    updated_at: SEEDED_AT.to_string(),
                },
            );
        }

        for (id, node, port, server) in [
            (1, 1, 25565, Some(1)),
            (2, 1, 25566, Some(2)),
            (3, 3, 25565, Some(3)),
            (4, 2, 25565, None),
        ] {
            p.allocations.insert(
                id,
                Allocation {
                    id,
                    ip: format!("10.0.{node}.1"),
                    alias: None,
                    port,
                    notes: None,
                    assigned: server.is_some(),
                    node,
                    server,
                },
            );
        }

        for (id, name, user, node, allocation, egg, external_id) in [
            (1, "lobby", 2, 1, 1, 1, Some("srv-lobby")),
            (2, "survival", 2, 1, 2, 2, None),
            (3, "creative", 3, 3, 3, 1, None),
        ] {
            let uuid = Uuid::from_u128(0x2000_0000_0000_0000_0000_0000_0000_0000 + id as u128);
            p.servers.insert(
                id,
                Server {
                    id,
                    external_id: external_id.map(str::to_string),
                    uuid,
                    identifier: uuid.to_string()[..8].to_string(),
                    name: name.to_string(),
                    description: String::new(),
                    status: None,
                    suspended: false,
                    limits: json!({"memory": 2048, "swap": 0, "disk": 10240, "io": 500, "cpu": 200, "threads": null, "oom_disabled": true}),
                    feature_limits: json!({"databases": 1, "allocations": 1, "backups": 2}),
                    user,
                    node,
                    allocation,
                    nest: 1,
                    egg,
                    container: json!({"startup_command": "java -jar server.jar", "image": "ghcr.io/pterodactyl/yolks:java_17", "installed": 1, "environment": {"SERVER_JARFILE": "server.jar"}}),
                    created_at: SEEDED_AT.to_string(),
                    updated_at: SEEDED_AT.to_string(),
                },
            );
        }

        p.next_id = 100;
        p
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Relation names requested through `?include=`.
#[derive(Debug, Default)]
struct Includes(Vec<String>);

impl Includes {
    fn from_query(query: &HashMap<String, String>) -> Self {
        Includes(
            query
                .get("include")
                .map(|s| {
                    s.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        )
    }

    fn has(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }
}

fn resource<T: Serialize>(object: &str, value: &T) -> Value {
    json!({
        "object": object,
        "attributes": serde_json::to_value(value).unwrap_or(Value::Null),
    })
}

fn null_resource() -> Value {
    json!({"object": "null_resource", "attributes": null})
}

fn list(items: Vec<Value>) -> Value {
    json!({"object": "list", "data": items})
}

fn with_relationships(mut doc: Value, rels: Map<String, Value>) -> Value {
    if !rels.is_empty() {
        doc["attributes"]["relationships"] = Value::Object(rels);
    }
    doc
}

fn paginate(items: Vec<Value>, query: &HashMap<String, String>) -> Value {
    let per_page = query
        .get("per_page")
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_PER_PAGE);
    let page = query
        .get("page")
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(1);
    let total = items.len();
    let total_pages = total.div_ceil(per_page).max(1);
    // A page past the end (or too large to address) is empty, not an error.
    let data: Vec<Value> = match (page - 1).checked_mul(per_page) {
        Some(offset) => items.into_iter().skip(offset).take(per_page).collect(),
        None => Vec::new(),
    };

    json!({
        "object": "list",
        "data": data,
        "meta": {
            "pagination": {
                "total": total,
                "count": data.len(),
                "per_page": per_page,
                "current_page": page,
                "total_pages": total_pages,
                "links": {},
            }
        }
    })
}

impl Panel {
    fn user_doc(&self, user: &User, inc: &Includes) -> Value {
        let mut rels = Map::new();
        if inc.has("servers") {
            let servers = self
                .servers
                .values()
                .filter(|s| s.user == user.id)
                .map(|s| resource("server", s))
                .collect();
            rels.insert("servers".to_string(), list(servers));
        }
        with_relationships(resource("user", user), rels)
    }

    fn server_doc(&self, server: &Server, inc: &Includes) -> Value {
        let mut rels = Map::new();
        if inc.has("allocations") {
            let allocs = self
                .allocations
                .values()
                .filter(|a| a.server == Some(server.id))
                .map(|a| resource("allocation", a))
                .collect();
            rels.insert("allocations".to_string(), list(allocs));
        }
        if inc.has("user") {
            rels.insert("user".to_string(), self.one("user", self.users.get(&server.user)));
        }
        if inc.has("subusers") {
            rels.insert("subusers".to_string(), list(Vec::new()));
        }
        if inc.has("location") {
            let location = self
                .nodes
                .get(&server.node)
                .and_then(|n| self.locations.get(&n.location_id));
            rels.insert("location".to_string(), self.one("location", location));
        }
        if inc.has("node") {
            rels.insert("node".to_string(), self.one("node", self.nodes.get(&server.node)));
        }
        if inc.has("nest") {
            rels.insert("nest".to_string(), self.one("nest", self.nests.get(&server.nest)));
        }
        if inc.has("egg") {
            rels.insert("egg".to_string(), self.one("egg", self.eggs.get(&server.egg)));
        }
        if inc.has("variables") {
            rels.insert("variables".to_string(), list(Vec::new()));
        }
        if inc.has("databases") {
            rels.insert("databases".to_string(), list(Vec::new()));
        }
        with_relationships(resource("server", server), rels)
    }

    fn node_doc(&self, node: &Node, inc: &Includes) -> Value {
        let mut rels = Map::new();
        if inc.has("allocations") {
            let allocs = self
                .allocations
                .values()
                .filter(|a| a.node == node.id)
                .map(|a| resource("allocation", a))
                .collect();
            rels.insert("allocations".to_string(), list(allocs));
        }
        if inc.has("location") {
            rels.insert(
                "location".to_string(),
                self.one("location", self.locations.get(&node.location_id)),
            );
        }
        if inc.has("servers") {
            let servers = self
                .servers
                .values()
                .filter(|s| s.node == node.id)
                .map(|s| resource("server", s))
                .collect();
            rels.insert("servers".to_string(), list(servers));
        }
        with_relationships(resource("node", node), rels)
    }

    fn allocation_doc(&self, alloc: &Allocation, inc: &Includes) -> Value {
        let mut rels = Map::new();
        if inc.has("node") {
            rels.insert("node".to_string(), self.one("node", self.nodes.get(&alloc.node)));
        }
        if inc.has("server") {
            let server = alloc.server.and_then(|id| self.servers.get(&id));
            rels.insert("server".to_string(), self.one("server", server));
        }
        with_relationships(resource("allocation", alloc), rels)
    }

    fn location_doc(&self, location: &Location, inc: &Includes) -> Value {
        let mut rels = Map::new();
        let node_ids: Vec<u64> = self
            .nodes
            .values()
            .filter(|n| n.location_id == location.id)
            .map(|n| n.id)
            .collect();
        if inc.has("nodes") {
            let nodes = node_ids
                .iter()
                .filter_map(|id| self.nodes.get(id))
                .map(|n| resource("node", n))
                .collect();
            rels.insert("nodes".to_string(), list(nodes));
        }
        if inc.has("servers") {
            let servers = self
                .servers
                .values()
                .filter(|s| node_ids.contains(&s.node))
                .map(|s| resource("server", s))
                .collect();
            rels.insert("servers".to_string(), list(servers));
        }
        with_relationships(resource("location", location), rels)
    }

    fn nest_doc(&self, nest: &Nest, inc: &Includes) -> Value {
        let mut rels = Map::new();
        if inc.has("eggs") {
            let eggs = self
                .eggs
                .values()
                .filter(|e| e.nest == nest.id)
                .map(|e| resource("egg", e))
                .collect();
            rels.insert("eggs".to_string(), list(eggs));
        }
        if inc.has("servers") {
            let servers = self
                .servers
                .values()
                .filter(|s| s.nest == nest.id)
                .map(|s| resource("server", s))
                .collect();
            rels.insert("servers".to_string(), list(servers));
        }
        with_relationships(resource("nest", nest), rels)
    }

    /// Eggs carry no variables in the seed, so `variables` renders as an
    /// empty list when asked for.
    fn egg_doc(&self, egg: &Egg, inc: &Includes) -> Value {
        let mut rels = Map::new();
        if inc.has("nest") {
            rels.insert("nest".to_string(), self.one("nest", self.nests.get(&egg.nest)));
        }
        if inc.has("servers") {
            let servers = self
                .servers
                .values()
                .filter(|s| s.egg == egg.id)
                .map(|s| resource("server", s))
                .collect();
            rels.insert("servers".to_string(), list(servers));
        }
        if inc.has("variables") {
            rels.insert("variables".to_string(), list(Vec::new()));
        }
        with_relationships(resource("egg", egg), rels)
    }

    fn one<T: Serialize>(&self, object: &str, value: Option<&T>) -> Value {
        value.map(|v| resource(object, v)).unwrap_or_else(null_resource)
    }
}

// ---------------------------------------------------------------------------
// Errors and auth
// ---------------------------------------------------------------------------

/// A panel error document with its status code.
#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    code: &'static str,
    detail: String,
}

impl Failure {
    fn not_found() -> Self {
        Failure {
            status: StatusCode::NOT_FOUND,
            code: "NotFoundHttpException",
            detail: "The requested resource could not be found on the server.".to_string(),
        }
    }

    fn validation(detail: impl Into<String>) -> Self {
        Failure {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            code: "ValidationException",
            detail: detail.into(),
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let body = json!({
            "errors": [{
                "code": self.code,
                "status": self.status.as_u16().to_string(),
                "detail": self.detail,
            }]
        });
        (self.status, Json(body)).into_response()
    }
}

async fn require_bearer(req: Request, next: Next) -> Response {
    let authorized = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| !token.trim().is_empty());
    if !authorized {
        tracing::warn!(uri = %req.uri(), "rejecting unauthenticated request");
        return Failure {
            status: StatusCode::UNAUTHORIZED,
            code: "AuthenticationException",
            detail: "Unauthenticated.".to_string(),
        }
        .into_response();
    }
    next.run(req).await
}

type Params = Query<HashMap<String, String>>;
type Reply = Result<Json<Value>, Failure>;

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

async fn list_users(State(db): State<Db>, Query(q): Params) -> Json<Value> {
    let panel = db.read().await;
    let inc = Includes::from_query(&q);
    let mut users: Vec<&User> = panel
        .users
        .values()
        .filter(|u| matches_filter(&q, "email", Some(&u.email)))
        .filter(|u| matches_filter(&q, "uuid", Some(&u.uuid.to_string())))
        .filter(|u| matches_filter(&q, "username", Some(&u.username)))
        .filter(|u| matches_filter(&q, "external_id", u.external_id.as_deref()))
        .collect();
    match q.get("sort").map(String::as_str) {
        Some("-id") => users.sort_by(|a, b| b.id.cmp(&a.id)),
        Some("uuid") => users.sort_by_key(|u| u.uuid),
        Some("-uuid") => users.sort_by(|a, b| b.uuid.cmp(&a.uuid)),
        _ => {}
    }
    let docs = users.into_iter().map(|u| panel.user_doc(u, &inc)).collect();
    Json(paginate(docs, &q))
}

fn matches_filter(q: &HashMap<String, String>, name: &str, value: Option<&str>) -> bool {
    match q.get(&format!("filter[{name}]")) {
        Some(wanted) => value == Some(wanted.as_str()),
        None => true,
    }
}

async fn get_user(State(db): State<Db>, Path(id): Path<u64>, Query(q): Params) -> Reply {
    let panel = db.read().await;
    let user = panel.users.get(&id).ok_or_else(Failure::not_found)?;
    Ok(Json(panel.user_doc(user, &Includes::from_query(&q))))
}

async fn get_user_external(
    State(db): State<Db>,
    Path(external_id): Path<String>,
    Query(q): Params,
) -> Reply {
    let panel = db.read().await;
    let user = panel
        .users
        .values()
        .find(|u| u.external_id.as_deref() == Some(external_id.as_str()))
        .ok_or_else(Failure::not_found)?;
    Ok(Json(panel.user_doc(user, &Includes::from_query(&q))))
}

#[derive(Debug, Default, Deserialize)]
pub struct UserInput {
    pub external_id: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language: Option<String>,
    pub root_admin: Option<bool>,
}

async fn create_user(
    State(db): State<Db>,
    Json(input): Json<UserInput>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    let mut panel = db.write().await;
    let email = input
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| Failure::validation("The email field is required."))?;
    let username = input
        .username
        .filter(|u| !u.is_empty())
        .ok_or_else(|| Failure::validation("The username field is required."))?;
    if panel.users.values().any(|u| u.email == email) {
        return Err(Failure::validation("The email has already been taken."));
    }

    let id = panel.next_id();
    let user = User {
        id,
        external_id: input.external_id,
        uuid: Uuid::new_v4(),
        username,
        email,
        first_name: input.first_name.unwrap_or_default(),
        last_name: input.last_name.unwrap_or_default(),
        language: input.language.unwrap_or_else(|| "en".to_string()),
        root_admin: input.root_admin.unwrap_or(false),
        two_factor: false,
        created_at: SEEDED_AT.to_string(),
        updated_at: SEEDED_AT.to_string(),
    };
    panel.users.insert(id, user.clone());
    tracing::info!(id, username = %user.username, "created user");
    Ok((StatusCode::CREATED, Json(resource("user", &user))))
}

async fn update_user(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<UserInput>,
) -> Reply {
    let mut panel = db.write().await;
    let user = panel.users.get_mut(&id).ok_or_else(Failure::not_found)?;
    if let Some(v) = input.external_id {
        user.external_id = Some(v);
    }
    if let Some(v) = input.email {
        user.email = v;
    }
    if let Some(v) = input.username {
        user.username = v;
    }
    if let Some(v) = input.first_name {
        user.first_name = v;
    }
    if let Some(v) = input.last_name {
        user.last_name = v;
    }
    if let Some(v) = input.language {
        user.language = v;
    }
    if let Some(v) = input.root_admin {
        user.root_admin = v;
    }
    Ok(Json(resource("user", &*user)))
}

async fn delete_user(State(db): State<Db>, Path(id): Path<u64>) -> Result<StatusCode, Failure> {
    let mut panel = db.write().await;
    if panel.servers.values().any(|s| s.user == id) {
        return Err(Failure {
            status: StatusCode::BAD_REQUEST,
            code: "DisplayException",
            detail: "Cannot delete a user with active servers attached to their account.".to_string(),
        });
    }
    panel
        .users
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(Failure::not_found)
}

// ---------------------------------------------------------------------------
// Servers
// ---------------------------------------------------------------------------

async fn list_servers(State(db): State<Db>, Query(q): Params) -> Json<Value> {
    let panel = db.read().await;
    let inc = Includes::from_query(&q);
    let mut servers: Vec<&Server> = panel
        .servers
        .values()
        .filter(|s| matches_filter(&q, "name", Some(&s.name)))
        .filter(|s| matches_filter(&q, "uuid", Some(&s.uuid.to_string())))
        .filter(|s| matches_filter(&q, "external_id", s.external_id.as_deref()))
        .filter(|s| matches_filter(&q, "image", s.container["image"].as_str()))
        .collect();
    if q.get("sort").map(String::as_str) == Some("-id") {
        servers.sort_by(|a, b| b.id.cmp(&a.id));
    }
    let docs = servers.into_iter().map(|s| panel.server_doc(s, &inc)).collect();
    Json(paginate(docs, &q))
}

async fn get_server(State(db): State<Db>, Path(id): Path<u64>, Query(q): Params) -> Reply {
    let panel = db.read().await;
    let server = panel.servers.get(&id).ok_or_else(Failure::not_found)?;
    Ok(Json(panel.server_doc(server, &Includes::from_query(&q))))
}

async fn get_server_external(
    State(db): State<Db>,
    Path(external_id): Path<String>,
    Query(q): Params,
) -> Reply {
    let panel = db.read().await;
    let server = panel
        .servers
        .values()
        .find(|s| s.external_id.as_deref() == Some(external_id.as_str()))
        .ok_or_else(Failure::not_found)?;
    Ok(Json(panel.server_doc(server, &Includes::from_query(&q))))
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerDetailsInput {
    pub external_id: Option<String>,
    pub name: Option<String>,
    pub user: Option<u64>,
    pub description: Option<String>,
}

async fn update_server_details(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<ServerDetailsInput>,
) -> Reply {
    let mut panel = db.write().await;
    if let Some(user) = input.user {
        if !panel.users.contains_key(&user) {
            return Err(Failure::validation("The selected user is invalid."));
        }
    }
    let server = panel.servers.get_mut(&id).ok_or_else(Failure::not_found)?;
    if let Some(v) = input.external_id {
        server.external_id = Some(v);
    }
    if let Some(v) = input.name {
        server.name = v;
    }
    if let Some(v) = input.user {
        server.user = v;
    }
    if let Some(v) = input.description {
        server.description = v;
    }
    Ok(Json(resource("server", &*server)))
}

async fn set_server(db: &Db, id: u64, apply: impl FnOnce(&mut Server)) -> Result<StatusCode, Failure> {
    let mut panel = db.write().await;
    let server = panel.servers.get_mut(&id).ok_or_else(Failure::not_found)?;
    apply(server);
    Ok(StatusCode::NO_CONTENT)
}

async fn suspend_server(State(db): State<Db>, Path(id): Path<u64>) -> Result<StatusCode, Failure> {
    set_server(&db, id, |s| {
        s.suspended = true;
        s.status = Some("suspended".to_string());
    })
    .await
}

async fn unsuspend_server(State(db): State<Db>, Path(id): Path<u64>) -> Result<StatusCode, Failure> {
    set_server(&db, id, |s| {
        s.suspended = false;
        s.status = None;
    })
    .await
}

async fn reinstall_server(State(db): State<Db>, Path(id): Path<u64>) -> Result<StatusCode, Failure> {
    set_server(&db, id, |s| s.status = Some("installing".to_string())).await
}

async fn delete_server(State(db): State<Db>, Path(id): Path<u64>) -> Result<StatusCode, Failure> {
    let mut panel = db.write().await;
    panel.servers.remove(&id).ok_or_else(Failure::not_found)?;
    for alloc in panel.allocations.values_mut().filter(|a| a.server == Some(id)) {
        alloc.server = None;
        alloc.assigned = false;
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

async fn list_nodes(State(db): State<Db>, Query(q): Params) -> Json<Value> {
    let panel = db.read().await;
    let inc = Includes::from_query(&q);
    let docs = panel.nodes.values().map(|n| panel.node_doc(n, &inc)).collect();
    Json(paginate(docs, &q))
}

async fn get_node(State(db): State<Db>, Path(id): Path<u64>, Query(q): Params) -> Reply {
    let panel = db.read().await;
    let node = panel.nodes.get(&id).ok_or_else(Failure::not_found)?;
    Ok(Json(panel.node_doc(node, &Includes::from_query(&q))))
}

async fn list_node_allocations(State(db): State<Db>, Path(id): Path<u64>, Query(q): Params) -> Reply {
    let panel = db.read().await;
    if !panel.nodes.contains_key(&id) {
        return Err(Failure::not_found());
    }
    let inc = Includes::from_query(&q);
    let docs = panel
        .allocations
        .values()
        .filter(|a| a.node == id)
        .map(|a| panel.allocation_doc(a, &inc))
        .collect();
    Ok(Json(paginate(docs, &q)))
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct LocationInput {
    pub short: Option<String>,
    pub long: Option<String>,
}

async fn list_locations(State(db): State<Db>, Query(q): Params) -> Json<Value> {
    let panel = db.read().await;
    let inc = Includes::from_query(&q);
    let docs = panel.locations.values().map(|l| panel.location_doc(l, &inc)).collect();
    Json(paginate(docs, &q))
}

async fn get_location(State(db): State<Db>, Path(id): Path<u64>, Query(q): Params) -> Reply {
    let panel = db.read().await;
    let location = panel.locations.get(&id).ok_or_else(Failure::not_found)?;
    Ok(Json(panel.location_doc(location, &Includes::from_query(&q))))
}

async fn create_location(
    State(db): State<Db>,
    Json(input): Json<LocationInput>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    let mut panel = db.write().await;
    let short = input
        .short
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Failure::validation("The short field is required."))?;
    let id = panel.next_id();
    let location = Location {
        id,
        short,
        long: input.long,
        created_at: SEEDED_AT.to_string(),
        updated_at: SEEDED_AT.to_string(),
    };
    panel.locations.insert(id, location.clone());
    Ok((StatusCode::CREATED, Json(resource("location", &location))))
}

async fn update_location(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<LocationInput>,
) -> Reply {
    let mut panel = db.write().await;
    let location = panel.locations.get_mut(&id).ok_or_else(Failure::not_found)?;
    if let Some(short) = input.short {
        location.short = short;
    }
    if let Some(long) = input.long {
        location.long = Some(long);
    }
    Ok(Json(resource("location", &*location)))
}

async fn delete_location(State(db): State<Db>, Path(id): Path<u64>) -> Result<StatusCode, Failure> {
    let mut panel = db.write().await;
    if panel.nodes.values().any(|n| n.location_id == id) {
        return Err(Failure {
            status: StatusCode::BAD_REQUEST,
            code: "HasActiveNodesException",
            detail: "Cannot delete a location that has active nodes attached to it.".to_string(),
        });
    }
    panel
        .locations
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(Failure::not_found)
}

// ---------------------------------------------------------------------------
// Nests
// ---------------------------------------------------------------------------

async fn list_nests(State(db): State<Db>, Query(q): Params) -> Json<Value> {
    let panel = db.read().await;
    let inc = Includes::from_query(&q);
    let docs = panel.nests.values().map(|n| panel.nest_doc(n, &inc)).collect();
    Json(paginate(docs, &q))
}

async fn get_nest(State(db): State<Db>, Path(id): Path<u64>, Query(q): Params) -> Reply {
    let panel = db.read().await;
    let nest = panel.nests.get(&id).ok_or_else(Failure::not_found)?;
    Ok(Json(panel.nest_doc(nest, &Includes::from_query(&q))))
}

async fn list_nest_eggs(State(db): State<Db>, Path(id): Path<u64>, Query(q): Params) -> Reply {
    let panel = db.read().await;
    if !panel.nests.contains_key(&id) {
        return Err(Failure::not_found());
    }
    let inc = Includes::from_query(&q);
    let docs = panel
        .eggs
        .values()
        .filter(|e| e.nest == id)
        .map(|e| panel.egg_doc(e, &inc))
        .collect();
    Ok(Json(paginate(docs, &q)))
}

async fn get_egg(
    State(db): State<Db>,
    Path((nest, id)): Path<(u64, u64)>,
    Query(q): Params,
) -> Reply {
    let panel = db.read().await;
    let egg = panel
        .eggs
        .get(&id)
        .filter(|e| e.nest == nest)
        .ok_or_else(Failure::not_found)?;
    Ok(Json(panel.egg_doc(egg, &Includes::from_query(&q))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_split_on_commas() {
        let mut q = HashMap::new();
        q.insert("include".to_string(), "node, location,,egg".to_string());
        let inc = Includes::from_query(&q);
        assert!(inc.has("node"));
        assert!(inc.has("location"));
        assert!(inc.has("egg"));
        assert!(!inc.has("user"));
    }

    #[test]
    fn user_doc_embeds_servers_only_when_included() {
        let panel = Panel::seeded();
        let alice = &panel.users[&2];

        let bare = panel.user_doc(alice, &Includes::default());
        assert!(bare["attributes"].get("relationships").is_none());
        assert_eq!(bare["attributes"]["2fa"], false);

        let full = panel.user_doc(alice, &Includes(vec!["servers".to_string()]));
        let servers = full["attributes"]["relationships"]["servers"]["data"].as_array().unwrap();
        assert_eq!(servers.len(), 2);
        assert!(servers[0]["attributes"].get("relationships").is_none());
    }

    #[test]
    fn unassigned_allocation_renders_null_resource() {
        let panel = Panel::seeded();
        let doc = panel.allocation_doc(&panel.allocations[&4], &Includes(vec!["server".to_string()]));
        assert_eq!(
            doc["attributes"]["relationships"]["server"]["object"],
            "null_resource"
        );
    }

    #[test]
    fn paginate_reports_meta() {
        let items: Vec<Value> = (0..5).map(|i| json!(i)).collect();
        let mut q = HashMap::new();
        q.insert("per_page".to_string(), "2".to_string());
        q.insert("page".to_string(), "3".to_string());
        let doc = paginate(items, &q);
        assert_eq!(doc["data"], json!([4]));
        assert_eq!(doc["meta"]["pagination"]["total_pages"], 3);
        assert_eq!(doc["meta"]["pagination"]["count"], 1);
    }

    #[test]
    fn huge_page_number_yields_an_empty_page() {
        let items: Vec<Value> = (0..3).map(|i| json!(i)).collect();
        let mut q = HashMap::new();
        q.insert("per_page".to_string(), "50".to_string());
        q.insert("page".to_string(), usize::MAX.to_string());
        let doc = paginate(items, &q);
        assert_eq!(doc["data"], json!([]));
        assert_eq!(doc["meta"]["pagination"]["total"], 3);
        assert_eq!(doc["meta"]["pagination"]["count"], 0);
    }

    #[test]
    fn egg_doc_renders_nest_servers_and_empty_variables() {
        let panel = Panel::seeded();
        let inc = Includes(vec![
            "nest".to_string(),
            "servers".to_string(),
            "variables".to_string(),
        ]);
        let doc = panel.egg_doc(&panel.eggs[&1], &inc);
        let rels = &doc["attributes"]["relationships"];
        assert_eq!(rels["nest"]["attributes"]["name"], "Minecraft");
        let servers = rels["servers"]["data"].as_array().unwrap();
        let names: Vec<&str> = servers.iter().map(|s| s["attributes"]["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["lobby", "creative"]);
        assert_eq!(rels["variables"]["data"], json!([]));
    }

    #[test]
    fn failure_renders_panel_error_document() {
        let resp = Failure::not_found().into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn capitalize_first_letter() {
        assert_eq!(capitalize("alice"), "Alice");
        assert_eq!(capitalize(""), "");
    }
}
