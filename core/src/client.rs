//! Stateless HTTP request builder and response parser for the panel's
//! application API.
//!
//! # Design
//! `PanelClient` holds only the API root and key and carries no mutable state
//! between calls. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. The caller executes the actual HTTP round-trip, keeping
//! the core deterministic and free of I/O dependencies.
//!
//! Options are encoded with `options::encode_options` and appended as
//! `?<query>` only when at least one option is set. Responses go through
//! `resolve.rs`, so every entity comes back with its relation fields in a
//! defined state.

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};

use crate::envelope::Resource;
use crate::error::{ApiError, PanelErrorBody};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::options::{encode_options, RequestOptions};
use crate::params::{
    GetEggOptions, GetLocationOptions, GetNestOptions, GetNodeOptions, GetServerOptions,
    GetUserOptions, ListAllocationsOptions, ListDatabasesOptions, ListEggsOptions,
    ListLocationsOptions, ListNestsOptions, ListNodesOptions, ListServersOptions, ListUsersOptions,
};
use crate::resolve::{resolve_list, resolve_one, Entity};
use crate::types::{
    Allocation, CreateAllocations, CreateDatabase, CreateServer, CreateUser, Database,
    DatabasePassword, Egg, Location, LocationDescriptor, Nest, Node, NodeConfiguration,
    NodeDescriptor, Server, UpdateServerBuild, UpdateServerDetails, UpdateServerStartup, UpdateUser,
    User,
};

/// Characters escaped in a single path segment such as an external ID.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'\\');

const USER_AGENT: &str = concat!("panel-core/", env!("CARGO_PKG_VERSION"));

/// Connection settings for a `PanelClient`.
#[derive(Clone, Default)]
pub struct ClientConfig {
    /// Panel root, e.g. `https://panel.example.com`.
    pub base_url: String,
    /// Application API key, sent as a bearer token.
    pub api_key: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Read `PANEL_URL` and `PANEL_API_KEY`. Missing variables yield empty
    /// values, which `PanelClient::new` rejects.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("PANEL_URL").unwrap_or_default(),
            api_key: std::env::var("PANEL_API_KEY").unwrap_or_default(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Synchronous, stateless client for the panel's application API.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network.
#[derive(Clone)]
pub struct PanelClient {
    api_root: String,
    api_key: String,
}

impl fmt::Debug for PanelClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelClient")
            .field("api_root", &self.api_root)
            .finish_non_exhaustive()
    }
}

impl PanelClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let base = config.base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(ApiError::InvalidConfig("a panel url is required".to_string()));
        }
        if config.api_key.trim().is_empty() {
            return Err(ApiError::InvalidConfig(
                "an application api key is required".to_string(),
            ));
        }
        Ok(Self {
            api_root: format!("{base}/api/application"),
            api_key: config.api_key,
        })
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    pub fn build_list_users(&self, opts: &ListUsersOptions) -> HttpRequest {
        self.get("/users", opts)
    }

    pub fn build_get_user(&self, id: u64, opts: &GetUserOptions) -> HttpRequest {
        self.get(&format!("/users/{id}"), opts)
    }

    pub fn build_get_user_external(&self, external_id: &str, opts: &GetUserOptions) -> HttpRequest {
        self.get(&format!("/users/external/{}", segment(external_id)), opts)
    }

    pub fn build_create_user(&self, input: &CreateUser) -> Result<HttpRequest, ApiError> {
        self.with_body(HttpMethod::Post, "/users", input)
    }

    pub fn build_update_user(&self, id: u64, input: &UpdateUser) -> Result<HttpRequest, ApiError> {
        if input.is_empty() {
            return Err(ApiError::MissingFields("user"));
        }
        self.with_body(HttpMethod::Patch, &format!("/users/{id}"), input)
    }

    pub fn build_delete_user(&self, id: u64) -> HttpRequest {
        self.request(HttpMethod::Delete, &format!("/users/{id}"), String::new(), None)
    }

    pub fn parse_list_users(&self, response: HttpResponse) -> Result<Vec<User>, ApiError> {
        parse_list(response)
    }

    pub fn parse_get_user(&self, response: HttpResponse) -> Result<User, ApiError> {
        parse_one(response, 200)
    }

    pub fn parse_create_user(&self, response: HttpResponse) -> Result<User, ApiError> {
        parse_one(response, 201)
    }

    pub fn parse_update_user(&self, response: HttpResponse) -> Result<User, ApiError> {
        parse_one(response, 200)
    }

    pub fn parse_delete_user(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty(response)
    }

    // -----------------------------------------------------------------------
    // Servers
    // -----------------------------------------------------------------------

    pub fn build_list_servers(&self, opts: &ListServersOptions) -> HttpRequest {
        self.get("/servers", opts)
    }

    pub fn build_get_server(&self, id: u64, opts: &GetServerOptions) -> HttpRequest {
        self.get(&format!("/servers/{id}"), opts)
    }

    pub fn build_get_server_external(&self, external_id: &str, opts: &GetServerOptions) -> HttpRequest {
        self.get(&format!("/servers/external/{}", segment(external_id)), opts)
    }

    pub fn build_update_server_details(
        &self,
        id: u64,
        input: &UpdateServerDetails,
    ) -> Result<HttpRequest, ApiError> {
        if input.is_empty() {
            return Err(ApiError::MissingFields("details"));
        }
        self.with_body(HttpMethod::Patch, &format!("/servers/{id}/details"), input)
    }

    /// Fails before building when neither `allocation` nor `deploy` is set.
    pub fn build_create_server(&self, input: &CreateServer) -> Result<HttpRequest, ApiError> {
        if input.allocation.is_none() && input.deploy.is_none() {
            return Err(ApiError::MissingFields("allocation or deploy"));
        }
        self.with_body(HttpMethod::Post, "/servers", input)
    }

    pub fn build_update_server_build(&self, id: u64, input: &UpdateServerBuild) -> Result<HttpRequest, ApiError> {
        if input.is_empty() {
            return Err(ApiError::MissingFields("build"));
        }
        self.with_body(HttpMethod::Patch, &format!("/servers/{id}/build"), input)
    }

    pub fn build_update_server_startup(
        &self,
        id: u64,
        input: &UpdateServerStartup,
    ) -> Result<HttpRequest, ApiError> {
        self.with_body(HttpMethod::Patch, &format!("/servers/{id}/startup"), input)
    }

    pub fn build_suspend_server(&self, id: u64) -> HttpRequest {
        self.request(HttpMethod::Post, &format!("/servers/{id}/suspend"), String::new(), None)
    }

    pub fn build_unsuspend_server(&self, id: u64) -> HttpRequest {
        self.request(HttpMethod::Post, &format!("/servers/{id}/unsuspend"), String::new(), None)
    }

    pub fn build_reinstall_server(&self, id: u64) -> HttpRequest {
        self.request(HttpMethod::Post, &format!("/servers/{id}/reinstall"), String::new(), None)
    }

    /// `force` deletes the server even when the node cannot be reached.
    pub fn build_delete_server(&self, id: u64, force: bool) -> HttpRequest {
        let path = if force {
            format!("/servers/{id}/force")
        } else {
            format!("/servers/{id}")
        };
        self.request(HttpMethod::Delete, &path, String::new(), None)
    }

    pub fn parse_list_servers(&self, response: HttpResponse) -> Result<Vec<Server>, ApiError> {
        parse_list(response)
    }

    pub fn parse_get_server(&self, response: HttpResponse) -> Result<Server, ApiError> {
        parse_one(response, 200)
    }

    pub fn parse_update_server_details(&self, response: HttpResponse) -> Result<Server, ApiError> {
        parse_one(response, 200)
    }

    pub fn parse_create_server(&self, response: HttpResponse) -> Result<Server, ApiError> {
        parse_one(response, 201)
    }

    pub fn parse_update_server_build(&self, response: HttpResponse) -> Result<Server, ApiError> {
        parse_one(response, 200)
    }

    pub fn parse_update_server_startup(&self, response: HttpResponse) -> Result<Server, ApiError> {
        parse_one(response, 200)
    }

    /// Shared by suspend, unsuspend, reinstall and delete.
    pub fn parse_server_action(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty(response)
    }

    // -----------------------------------------------------------------------
    // Nodes and allocations
    // -----------------------------------------------------------------------

    pub fn build_list_nodes(&self, opts: &ListNodesOptions) -> HttpRequest {
        self.get("/nodes", opts)
    }

    pub fn build_get_node(&self, id: u64, opts: &GetNodeOptions) -> HttpRequest {
        self.get(&format!("/nodes/{id}"), opts)
    }

    pub fn build_create_node(&self, input: &NodeDescriptor) -> Result<HttpRequest, ApiError> {
        self.with_body(HttpMethod::Post, "/nodes", input)
    }

    pub fn build_update_node(&self, id: u64, input: &NodeDescriptor) -> Result<HttpRequest, ApiError> {
        self.with_body(HttpMethod::Patch, &format!("/nodes/{id}"), input)
    }

    pub fn build_get_node_configuration(&self, id: u64) -> HttpRequest {
        self.get(&format!("/nodes/{id}/configuration"), &())
    }

    pub fn build_delete_node(&self, id: u64) -> HttpRequest {
        self.request(HttpMethod::Delete, &format!("/nodes/{id}"), String::new(), None)
    }

    pub fn build_create_node_allocations(
        &self,
        node: u64,
        input: &CreateAllocations,
    ) -> Result<HttpRequest, ApiError> {
        if input.ports.is_empty() {
            return Err(ApiError::MissingFields("port"));
        }
        self.with_body(HttpMethod::Post, &format!("/nodes/{node}/allocations"), input)
    }

    pub fn build_list_node_allocations(&self, node: u64, opts: &ListAllocationsOptions) -> HttpRequest {
        self.get(&format!("/nodes/{node}/allocations"), opts)
    }

    pub fn build_delete_node_allocation(&self, node: u64, id: u64) -> HttpRequest {
        self.request(
            HttpMethod::Delete,
            &format!("/nodes/{node}/allocations/{id}"),
            String::new(),
            None,
        )
    }

    pub fn parse_list_nodes(&self, response: HttpResponse) -> Result<Vec<Node>, ApiError> {
        parse_list(response)
    }

    pub fn parse_get_node(&self, response: HttpResponse) -> Result<Node, ApiError> {
        parse_one(response, 200)
    }

    pub fn parse_create_node(&self, response: HttpResponse) -> Result<Node, ApiError> {
        parse_one(response, 201)
    }

    pub fn parse_update_node(&self, response: HttpResponse) -> Result<Node, ApiError> {
        parse_one(response, 200)
    }

    /// The configuration document is bare JSON, not a resource.
    pub fn parse_get_node_configuration(&self, response: HttpResponse) -> Result<NodeConfiguration, ApiError> {
        check_status(&response, 200)?;
        Ok(serde_json::from_str(&response.body)?)
    }

    pub fn parse_delete_node(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty(response)
    }

    pub fn parse_create_node_allocations(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty(response)
    }

    pub fn parse_list_node_allocations(&self, response: HttpResponse) -> Result<Vec<Allocation>, ApiError> {
        parse_list(response)
    }

    pub fn parse_delete_node_allocation(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty(response)
    }

    // -----------------------------------------------------------------------
    // Locations
    // -----------------------------------------------------------------------

    pub fn build_list_locations(&self, opts: &ListLocationsOptions) -> HttpRequest {
        self.get("/locations", opts)
    }

    pub fn build_get_location(&self, id: u64, opts: &GetLocationOptions) -> HttpRequest {
        self.get(&format!("/locations/{id}"), opts)
    }

    pub fn build_create_location(&self, input: &LocationDescriptor) -> Result<HttpRequest, ApiError> {
        self.with_body(HttpMethod::Post, "/locations", input)
    }

    pub fn build_update_location(&self, id: u64, input: &LocationDescriptor) -> Result<HttpRequest, ApiError> {
        self.with_body(HttpMethod::Patch, &format!("/locations/{id}"), input)
    }

    pub fn build_delete_location(&self, id: u64) -> HttpRequest {
        self.request(HttpMethod::Delete, &format!("/locations/{id}"), String::new(), None)
    }

    pub fn parse_list_locations(&self, response: HttpResponse) -> Result<Vec<Location>, ApiError> {
        parse_list(response)
    }

    pub fn parse_get_location(&self, response: HttpResponse) -> Result<Location, ApiError> {
        parse_one(response, 200)
    }

    pub fn parse_create_location(&self, response: HttpResponse) -> Result<Location, ApiError> {
        parse_one(response, 201)
    }

    pub fn parse_update_location(&self, response: HttpResponse) -> Result<Location, ApiError> {
        parse_one(response, 200)
    }

    pub fn parse_delete_location(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty(response)
    }

    // -----------------------------------------------------------------------
    // Nests
    // -----------------------------------------------------------------------

    pub fn build_list_nests(&self, opts: &ListNestsOptions) -> HttpRequest {
        self.get("/nests", opts)
    }

    pub fn build_get_nest(&self, id: u64, opts: &GetNestOptions) -> HttpRequest {
        self.get(&format!("/nests/{id}"), opts)
    }

    pub fn parse_list_nests(&self, response: HttpResponse) -> Result<Vec<Nest>, ApiError> {
        parse_list(response)
    }

    pub fn parse_get_nest(&self, response: HttpResponse) -> Result<Nest, ApiError> {
        parse_one(response, 200)
    }

    pub fn build_list_nest_eggs(&self, nest: u64, opts: &ListEggsOptions) -> HttpRequest {
        self.get(&format!("/nests/{nest}/eggs"), opts)
    }

    pub fn build_get_egg(&self, nest: u64, id: u64, opts: &GetEggOptions) -> HttpRequest {
        self.get(&format!("/nests/{nest}/eggs/{id}"), opts)
    }

    pub fn parse_list_nest_eggs(&self, response: HttpResponse) -> Result<Vec<Egg>, ApiError> {
        parse_list(response)
    }

    pub fn parse_get_egg(&self, response: HttpResponse) -> Result<Egg, ApiError> {
        parse_one(response, 200)
    }

    // -----------------------------------------------------------------------
    // Server databases
    // -----------------------------------------------------------------------

    pub fn build_list_databases(&self, server: u64, opts: &ListDatabasesOptions) -> HttpRequest {
        self.get(&format!("/servers/{server}/databases"), opts)
    }

    pub fn build_get_database(&self, server: u64, id: u64, opts: &ListDatabasesOptions) -> HttpRequest {
        self.get(&format!("/servers/{server}/databases/{id}"), opts)
    }

    pub fn build_create_database(&self, server: u64, input: &CreateDatabase) -> Result<HttpRequest, ApiError> {
        self.with_body(HttpMethod::Post, &format!("/servers/{server}/databases"), input)
    }

    pub fn build_rotate_database_password(&self, server: u64, id: u64) -> HttpRequest {
        self.request(
            HttpMethod::Post,
            &format!("/servers/{server}/databases/{id}/rotate-password"),
            String::new(),
            None,
        )
    }

    pub fn build_delete_database(&self, server: u64, id: u64) -> HttpRequest {
        self.request(
            HttpMethod::Delete,
            &format!("/servers/{server}/databases/{id}"),
            String::new(),
            None,
        )
    }

    pub fn parse_list_databases(&self, response: HttpResponse) -> Result<Vec<Database>, ApiError> {
        parse_list(response)
    }

    pub fn parse_get_database(&self, response: HttpResponse) -> Result<Database, ApiError> {
        parse_one(response, 200)
    }

    pub fn parse_create_database(&self, response: HttpResponse) -> Result<Database, ApiError> {
        parse_one(response, 201)
    }

    /// The new password comes back wrapped as `{"data": {"object", "attributes"}}`.
    pub fn parse_rotate_database_password(&self, response: HttpResponse) -> Result<DatabasePassword, ApiError> {
        check_status(&response, 200)?;
        let doc: Wrapped = serde_json::from_str(&response.body)?;
        DatabasePassword::resolve(doc.data)
    }

    pub fn parse_delete_database(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty(response)
    }

    // -----------------------------------------------------------------------
    // Plumbing
    // -----------------------------------------------------------------------

    fn get<O: RequestOptions + ?Sized>(&self, path: &str, opts: &O) -> HttpRequest {
        self.request(HttpMethod::Get, path, encode_options(opts), None)
    }

    fn with_body<B: Serialize>(&self, method: HttpMethod, path: &str, input: &B) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(self.request(method, path, String::new(), Some(body)))
    }

    fn request(&self, method: HttpMethod, path: &str, query: String, body: Option<String>) -> HttpRequest {
        let mut url = format!("{}{path}", self.api_root);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }

        let mut headers = vec![
            ("User-Agent".to_string(), USER_AGENT.to_string()),
            ("Authorization".to_string(), format!("Bearer {}", self.api_key)),
            ("Accept".to_string(), "application/json".to_string()),
        ];
        if body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        tracing::debug!(method = method.as_str(), %url, "built panel request");

        HttpRequest {
            method,
            url,
            headers,
            body,
        }
    }
}

#[derive(Deserialize)]
struct Wrapped {
    data: Resource,
}

fn segment(s: &str) -> String {
    utf8_percent_encode(s, PATH_SEGMENT).to_string()
}

fn parse_one<T: Entity>(response: HttpResponse, expected: u16) -> Result<T, ApiError> {
    check_status(&response, expected)?;
    resolve_one(&response.body)
}

fn parse_list<T: Entity>(response: HttpResponse) -> Result<Vec<T>, ApiError> {
    check_status(&response, 200)?;
    resolve_list(&response.body)
}

fn parse_empty(response: HttpResponse) -> Result<(), ApiError> {
    check_status(&response, 204)
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    tracing::debug!(status = response.status, expected, "parsing panel response");
    if response.status == expected {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    match serde_json::from_str::<PanelErrorBody>(&response.body) {
        Ok(body) if !body.errors.is_empty() => Err(ApiError::Panel {
            status: response.status,
            errors: body.errors,
        }),
        _ => Err(ApiError::Http {
            status: response.status,
            body: response.body.clone(),
        }),
    }
}
