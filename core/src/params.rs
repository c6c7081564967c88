//! Per-endpoint request options.
//!
//! Each endpoint family gets an include set, optionally a filter set and sort
//! key, and the shared `Pagination` parameters for list calls. Options are
//! always passed by shared reference; nothing here is mutated on the way to
//! the wire, so the encoded query is exactly what the caller declared.

use crate::field_set;
use crate::options::{RequestOptions, Section};

field_set! {
    /// Free paging parameters accepted by every list endpoint. `0` means
    /// "panel default".
    pub struct Pagination {
        page: u32 => "page",
        per_page: u32 => "per_page",
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

field_set! {
    pub struct IncludeUsers {
        /// Servers owned by the user.
        servers: bool => "servers",
    }
}

field_set! {
    pub struct UserFilters {
        email: String => "email",
        uuid: String => "uuid",
        username: String => "username",
        external_id: String => "external_id",
    }
}

/// Sort orders accepted by the user listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSort {
    IdAsc,
    IdDesc,
    UuidAsc,
    UuidDesc,
}

impl UserSort {
    pub fn as_str(self) -> &'static str {
        match self {
            UserSort::IdAsc => "id",
            UserSort::IdDesc => "-id",
            UserSort::UuidAsc => "uuid",
            UserSort::UuidDesc => "-uuid",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListUsersOptions {
    pub include: IncludeUsers,
    pub filters: UserFilters,
    pub sort: Option<UserSort>,
    pub page: Pagination,
}

impl RequestOptions for ListUsersOptions {
    fn include(&self) -> Option<&dyn Section> {
        Some(&self.include)
    }

    fn filters(&self) -> Option<&dyn Section> {
        Some(&self.filters)
    }

    fn sort(&self) -> Option<&str> {
        self.sort.map(UserSort::as_str)
    }

    fn parameters(&self) -> Option<&dyn Section> {
        Some(&self.page)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetUserOptions {
    pub include: IncludeUsers,
}

impl RequestOptions for GetUserOptions {
    fn include(&self) -> Option<&dyn Section> {
        Some(&self.include)
    }
}

// ---------------------------------------------------------------------------
// Servers
// ---------------------------------------------------------------------------

field_set! {
    pub struct IncludeServers {
        allocations: bool => "allocations",
        /// The owning user.
        user: bool => "user",
        subusers: bool => "subusers",
        nest: bool => "nest",
        egg: bool => "egg",
        variables: bool => "variables",
        /// Location of the server's node.
        location: bool => "location",
        node: bool => "node",
        databases: bool => "databases",
    }
}

field_set! {
    pub struct ServerFilters {
        name: String => "name",
        uuid: String => "uuid",
        external_id: String => "external_id",
        image: String => "image",
    }
}

/// Sort orders accepted by the server listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerSort {
    IdAsc,
    IdDesc,
    UuidAsc,
    UuidDesc,
}

impl ServerSort {
    pub fn as_str(self) -> &'static str {
        match self {
            ServerSort::IdAsc => "id",
            ServerSort::IdDesc => "-id",
            ServerSort::UuidAsc => "uuid",
            ServerSort::UuidDesc => "-uuid",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListServersOptions {
    pub include: IncludeServers,
    pub filters: ServerFilters,
    pub sort: Option<ServerSort>,
    pub page: Pagination,
}

impl RequestOptions for ListServersOptions {
    fn include(&self) -> Option<&dyn Section> {
        Some(&self.include)
    }

    fn filters(&self) -> Option<&dyn Section> {
        Some(&self.filters)
    }

    fn sort(&self) -> Option<&str> {
        self.sort.map(ServerSort::as_str)
    }

    fn parameters(&self) -> Option<&dyn Section> {
        Some(&self.page)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetServerOptions {
    pub include: IncludeServers,
}

impl RequestOptions for GetServerOptions {
    fn include(&self) -> Option<&dyn Section> {
        Some(&self.include)
    }
}

// ---------------------------------------------------------------------------
// Nodes and allocations
// ---------------------------------------------------------------------------

field_set! {
    pub struct IncludeNodes {
        allocations: bool => "allocations",
        location: bool => "location",
        servers: bool => "servers",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListNodesOptions {
    pub include: IncludeNodes,
    pub page: Pagination,
}

impl RequestOptions for ListNodesOptions {
    fn include(&self) -> Option<&dyn Section> {
        Some(&self.include)
    }

    fn parameters(&self) -> Option<&dyn Section> {
        Some(&self.page)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetNodeOptions {
    pub include: IncludeNodes,
}

impl RequestOptions for GetNodeOptions {
    fn include(&self) -> Option<&dyn Section> {
        Some(&self.include)
    }
}

field_set! {
    pub struct IncludeAllocations {
        node: bool => "node",
        server: bool => "server",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListAllocationsOptions {
    pub include: IncludeAllocations,
    pub page: Pagination,
}

impl RequestOptions for ListAllocationsOptions {
    fn include(&self) -> Option<&dyn Section> {
        Some(&self.include)
    }

    fn parameters(&self) -> Option<&dyn Section> {
        Some(&self.page)
    }
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

field_set! {
    pub struct IncludeLocations {
        nodes: bool => "nodes",
        servers: bool => "servers",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListLocationsOptions {
    pub include: IncludeLocations,
    pub page: Pagination,
}

impl RequestOptions for ListLocationsOptions {
    fn include(&self) -> Option<&dyn Section> {
        Some(&self.include)
    }

    fn parameters(&self) -> Option<&dyn Section> {
        Some(&self.page)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetLocationOptions {
    pub include: IncludeLocations,
}

impl RequestOptions for GetLocationOptions {
    fn include(&self) -> Option<&dyn Section> {
        Some(&self.include)
    }
}

// ---------------------------------------------------------------------------
// Nests
// ---------------------------------------------------------------------------

field_set! {
    pub struct IncludeNests {
        servers: bool => "servers",
        eggs: bool => "eggs",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListNestsOptions {
    pub include: IncludeNests,
    pub page: Pagination,
}

impl RequestOptions for ListNestsOptions {
    fn include(&self) -> Option<&dyn Section> {
        Some(&self.include)
    }

    fn parameters(&self) -> Option<&dyn Section> {
        Some(&self.page)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetNestOptions {
    pub include: IncludeNests,
}

impl RequestOptions for GetNestOptions {
    fn include(&self) -> Option<&dyn Section> {
        Some(&self.include)
    }
}

field_set! {
    pub struct IncludeEggs {
        /// The nest the egg belongs to.
        nest: bool => "nest",
        servers: bool => "servers",
        variables: bool => "variables",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListEggsOptions {
    pub include: IncludeEggs,
    pub page: Pagination,
}

impl RequestOptions for ListEggsOptions {
    fn include(&self) -> Option<&dyn Section> {
        Some(&self.include)
    }

    fn parameters(&self) -> Option<&dyn Section> {
        Some(&self.page)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetEggOptions {
    pub include: IncludeEggs,
}

impl RequestOptions for GetEggOptions {
    fn include(&self) -> Option<&dyn Section> {
        Some(&self.include)
    }
}

// ---------------------------------------------------------------------------
// Server databases
// ---------------------------------------------------------------------------

field_set! {
    pub struct IncludeDatabases {
        /// The database host the database lives on.
        host: bool => "host",
        password: bool => "password",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListDatabasesOptions {
    pub include: IncludeDatabases,
}

impl RequestOptions for ListDatabasesOptions {
    fn include(&self) -> Option<&dyn Section> {
        Some(&self.include)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{encode_options, QueryPairs};

    #[test]
    fn list_users_regression_query() {
        let opts = ListUsersOptions {
            include: IncludeUsers { servers: true },
            filters: UserFilters {
                username: "foo".to_string(),
                external_id: "bar".to_string(),
                ..Default::default()
            },
            sort: Some(UserSort::IdDesc),
            ..Default::default()
        };

        assert_eq!(
            encode_options(&opts),
            "filter%5Bexternal_id%5D=bar&filter%5Busername%5D=foo&include=servers&sort=-id"
        );

        let pairs = QueryPairs::from_options(&opts);
        let got: Vec<(&str, &str)> = pairs.iter().collect();
        assert_eq!(
            got,
            vec![
                ("filter[external_id]", "bar"),
                ("filter[username]", "foo"),
                ("include", "servers"),
                ("sort", "-id"),
            ]
        );
    }

    #[test]
    fn default_options_encode_to_nothing() {
        assert_eq!(encode_options(&ListUsersOptions::default()), "");
        assert_eq!(encode_options(&ListServersOptions::default()), "");
        assert_eq!(encode_options(&GetNodeOptions::default()), "");
        assert_eq!(encode_options(&ListDatabasesOptions::default()), "");
    }

    #[test]
    fn server_includes_keep_declared_order() {
        let opts = GetServerOptions {
            include: IncludeServers {
                databases: true,
                node: true,
                allocations: true,
                ..Default::default()
            },
        };
        assert_eq!(
            QueryPairs::from_options(&opts).get("include"),
            Some("allocations,node,databases")
        );
    }

    #[test]
    fn nest_includes_list_servers_before_eggs() {
        let opts = GetNestOptions {
            include: IncludeNests {
                eggs: true,
                servers: true,
            },
        };
        assert_eq!(encode_options(&opts), "include=servers%2Ceggs");
    }

    #[test]
    fn egg_includes_and_paging() {
        let opts = ListEggsOptions {
            include: IncludeEggs {
                variables: true,
                nest: true,
                ..Default::default()
            },
            page: Pagination { page: 0, per_page: 20 },
        };
        assert_eq!(encode_options(&opts), "include=nest%2Cvariables&per_page=20");
        assert_eq!(encode_options(&GetEggOptions::default()), "");
    }

    #[test]
    fn pagination_is_a_bare_parameter() {
        let opts = ListNodesOptions {
            include: IncludeNodes {
                location: true,
                ..Default::default()
            },
            page: Pagination {
                page: 2,
                per_page: 25,
            },
        };
        assert_eq!(
            encode_options(&opts),
            "include=location&page=2&per_page=25"
        );
    }

    #[test]
    fn encoding_does_not_touch_the_options() {
        let opts = GetServerOptions::default();
        let before = opts.clone();
        let _ = encode_options(&opts);
        assert_eq!(opts, before);
    }

    #[test]
    fn sort_names() {
        assert_eq!(UserSort::UuidDesc.as_str(), "-uuid");
        assert_eq!(ServerSort::IdAsc.as_str(), "id");
    }
}
