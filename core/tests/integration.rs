//! End-to-end lifecycle against the live mock panel.
//!
//! # Design
//! Starts the mock panel on a random port, then drives the core client over
//! real HTTP using ureq. Checks that encoded options are understood by the
//! server and that the relationship documents it returns resolve into fully
//! populated entities.

use panel_core::params::{
    GetEggOptions, GetNestOptions, GetServerOptions, GetUserOptions, IncludeEggs, IncludeNests,
    IncludeServers, IncludeUsers, ListAllocationsOptions, ListEggsOptions, ListServersOptions, ListUsersOptions, Pagination, ServerFilters,
    UserFilters, UserSort,
};
use panel_core::{
    ApiError, ClientConfig, CreateUser, HttpMethod, HttpRequest, HttpResponse, LocationDescriptor,
    PanelClient, UpdateServerDetails, UpdateUser,
};

/// Execute an `HttpRequest` using ureq and return an `HttpResponse`.
///
/// Status codes are returned as data so the core decides what an error is.
fn execute(req: HttpRequest) -> HttpResponse {
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();

    let mut response = match req.method {
        HttpMethod::Get => {
            let mut r = agent.get(&req.url);
            for (name, value) in &req.headers {
                r = r.header(name, value);
            }
            r.call()
        }
        HttpMethod::Delete => {
            let mut r = agent.delete(&req.url);
            for (name, value) in &req.headers {
                r = r.header(name, value);
            }
            r.call()
        }
        HttpMethod::Post | HttpMethod::Patch => {
            let mut r = if req.method == HttpMethod::Post {
                agent.post(&req.url)
            } else {
                agent.patch(&req.url)
            };
            for (name, value) in &req.headers {
                r = r.header(name, value);
            }
            match req.body {
                Some(body) => r.send(body.as_bytes()),
                None => r.send_empty(),
            }
        }
    }
    .expect("HTTP transport error");

    let status = response.status().as_u16();
    let body = response.body_mut().read_to_string().unwrap_or_default();

    HttpResponse {
        status,
        headers: Vec::new(),
        body,
    }
}

fn start_mock() -> PanelClient {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_panel::run(listener).await
        })
        .unwrap();
    });

    PanelClient::new(ClientConfig::new(format!("http://{addr}"), "ptla_integration")).unwrap()
}

#[test]
fn user_lifecycle() {
    let client = start_mock();

    // Step 1: list with encoded filters and sort.
    let opts = ListUsersOptions {
        filters: UserFilters {
            username: "alice".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };
    let users = client.parse_list_users(execute(client.build_list_users(&opts))).unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].email, "alice@example.com");
    assert!(users[0].servers.is_empty(), "servers not included must be empty");

    let opts = ListUsersOptions {
        sort: Some(UserSort::IdDesc),
        page: Pagination { page: 1, per_page: 2 },
        ..Default::default()
    };
    let users = client.parse_list_users(execute(client.build_list_users(&opts))).unwrap();
    let ids: Vec<u64> = users.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![3, 2]);

    // Step 2: get with an included plural relation.
    let opts = GetUserOptions {
        include: IncludeUsers { servers: true },
    };
    let alice = client.parse_get_user(execute(client.build_get_user(2, &opts))).unwrap();
    assert_eq!(alice.servers.len(), 2);
    assert_eq!(alice.servers[0].name, "lobby");
    assert!(alice.servers[0].user.is_none(), "nested relations stay unresolved");

    let admin = client
        .parse_get_user(execute(client.build_get_user_external("ext-admin", &GetUserOptions::default())))
        .unwrap();
    assert!(admin.root_admin);

    // Step 3: create.
    let input = CreateUser {
        external_id: Some("ext-carol".to_string()),
        email: "carol@example.com".to_string(),
        username: "carol".to_string(),
        password: None,
        first_name: "Carol".to_string(),
        last_name: "Example".to_string(),
        language: None,
        root_admin: false,
    };
    let created = client
        .parse_create_user(execute(client.build_create_user(&input).unwrap()))
        .unwrap();
    assert_eq!(created.username, "carol");
    assert_eq!(created.full_name(), "Carol Example");

    // Step 4: creating the same email again is a validation error.
    let err = client
        .parse_create_user(execute(client.build_create_user(&input).unwrap()))
        .unwrap_err();
    match err {
        ApiError::Panel { status, errors } => {
            assert_eq!(status, 422);
            assert_eq!(errors[0].code, "ValidationException");
        }
        other => panic!("expected Panel error, got {other:?}"),
    }

    // Step 5: update.
    let patch = UpdateUser {
        last_name: Some("Updated".to_string()),
        ..Default::default()
    };
    let updated = client
        .parse_update_user(execute(client.build_update_user(created.id, &patch).unwrap()))
        .unwrap();
    assert_eq!(updated.last_name, "Updated");
    assert_eq!(updated.first_name, "Carol");

    // Step 6: delete, then get is NotFound.
    client
        .parse_delete_user(execute(client.build_delete_user(created.id)))
        .unwrap();
    let err = client
        .parse_get_user(execute(client.build_get_user(created.id, &GetUserOptions::default())))
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound), "expected NotFound, got {err:?}");
}

#[test]
fn server_relations_and_actions() {
    let client = start_mock();

    // Every requested relation is wired in; the others keep their defaults.
    let opts = GetServerOptions {
        include: IncludeServers {
            allocations: true,
            user: true,
            location: true,
            egg: true,
            ..Default::default()
        },
    };
    let server = client.parse_get_server(execute(client.build_get_server(1, &opts))).unwrap();
    assert_eq!(server.allocations.len(), 1);
    assert_eq!(server.allocations[0].port, 25565);
    assert_eq!(server.user.as_ref().map(|u| u.username.as_str()), Some("alice"));
    assert_eq!(server.location.as_ref().map(|l| l.short.as_str()), Some("eu-west"));
    assert_eq!(server.egg.as_ref().map(|e| e.name.as_str()), Some("Paper"));
    assert!(server.node.is_none());
    assert!(server.nest.is_none());
    assert!(server.databases.is_empty());
    assert!(server.subusers.is_empty());
    assert_eq!(server.limits.memory, 2048);

    let bare = client
        .parse_get_server(execute(client.build_get_server(1, &GetServerOptions::default())))
        .unwrap();
    assert!(bare.user.is_none());
    assert!(bare.allocations.is_empty());
    assert_eq!(bare.user_id, 2);

    // Filters on the list endpoint.
    let opts = ListServersOptions {
        filters: ServerFilters {
            name: "creative".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };
    let servers = client.parse_list_servers(execute(client.build_list_servers(&opts))).unwrap();
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0].id, 3);

    // Suspend is visible on the next read.
    client
        .parse_server_action(execute(client.build_suspend_server(1)))
        .unwrap();
    let server = client
        .parse_get_server(execute(client.build_get_server(1, &GetServerOptions::default())))
        .unwrap();
    assert!(server.suspended);
    client
        .parse_server_action(execute(client.build_unsuspend_server(1)))
        .unwrap();

    // Details update with a user that does not exist.
    let details = UpdateServerDetails {
        user: Some(999),
        ..Default::default()
    };
    let err = client
        .parse_update_server_details(execute(client.build_update_server_details(1, &details).unwrap()))
        .unwrap_err();
    assert!(matches!(err, ApiError::Panel { status: 422, .. }), "got {err:?}");

    let details = UpdateServerDetails {
        name: Some("hub".to_string()),
        ..Default::default()
    };
    let renamed = client
        .parse_update_server_details(execute(client.build_update_server_details(1, &details).unwrap()))
        .unwrap();
    assert_eq!(renamed.name, "hub");

    // Force delete releases the allocation, which then has no server.
    client
        .parse_server_action(execute(client.build_delete_server(3, true)))
        .unwrap();
    let mut opts = ListAllocationsOptions::default();
    opts.include.server = true;
    let allocs = client
        .parse_list_node_allocations(execute(client.build_list_node_allocations(3, &opts)))
        .unwrap();
    assert_eq!(allocs.len(), 1);
    assert!(!allocs[0].assigned);
    assert!(allocs[0].server.is_none());
}

#[test]
fn locations_and_nests() {
    let client = start_mock();

    let input = LocationDescriptor {
        short: "ap-south".to_string(),
        long: "Mumbai".to_string(),
    };
    let created = client
        .parse_create_location(execute(client.build_create_location(&input).unwrap()))
        .unwrap();
    assert_eq!(created.short, "ap-south");
    assert!(created.nodes.is_empty());

    let locations = client
        .parse_list_locations(execute(client.build_list_locations(&Default::default())))
        .unwrap();
    assert_eq!(locations.len(), 3);

    client
        .parse_delete_location(execute(client.build_delete_location(created.id)))
        .unwrap();

    // A location with nodes cannot be deleted.
    let err = client
        .parse_delete_location(execute(client.build_delete_location(1)))
        .unwrap_err();
    match err {
        ApiError::Panel { status, errors } => {
            assert_eq!(status, 400);
            assert_eq!(errors[0].code, "HasActiveNodesException");
        }
        other => panic!("expected Panel error, got {other:?}"),
    }

    let opts = GetNestOptions {
        include: IncludeNests {
            eggs: true,
            ..Default::default()
        },
    };
    let nest = client.parse_get_nest(execute(client.build_get_nest(1, &opts))).unwrap();
    let eggs: Vec<&str> = nest.eggs.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(eggs, vec!["Paper", "Forge"]);
    assert!(nest.servers.is_empty());
}

#[test]
fn eggs_resolve_their_nest_and_servers() {
    let client = start_mock();

    let opts = GetEggOptions {
        include: IncludeEggs {
            nest: true,
            servers: true,
            ..Default::default()
        },
    };
    let egg = client.parse_get_egg(execute(client.build_get_egg(1, 1, &opts))).unwrap();
    assert_eq!(egg.name, "Paper");
    let nest = egg.nest.as_deref().unwrap();
    assert_eq!(nest.name, "Minecraft");
    assert!(nest.eggs.is_empty());
    let servers: Vec<&str> = egg.servers.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(servers, vec!["lobby", "creative"]);
    assert!(egg.variables.is_empty());

    let list = ListEggsOptions {
        include: IncludeEggs {
            variables: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let eggs = client
        .parse_list_nest_eggs(execute(client.build_list_nest_eggs(1, &list)))
        .unwrap();
    assert_eq!(eggs.len(), 2);
    assert!(eggs.iter().all(|e| e.nest.is_none() && e.variables.is_empty()));

    let err = client
        .parse_get_egg(execute(client.build_get_egg(1, 42, &GetEggOptions::default())))
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound));
}

#[test]
fn missing_api_key_is_rejected_by_panel() {
    let client = start_mock();
    let mut req = client.build_list_servers(&ListServersOptions::default());
    req.headers.retain(|(name, _)| name != "Authorization");

    let err = client.parse_list_servers(execute(req)).unwrap_err();
    assert!(matches!(err, ApiError::Panel { status: 401, .. }), "got {err:?}");
}
