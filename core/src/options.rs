//! Query-string encoding for per-endpoint request options.
//!
//! # Design
//! Every options type is made of up to four sections: include toggles,
//! filters, a sort key and free parameters. Sections are plain structs whose
//! fields are described once, in declaration order, by a static `Field` table
//! (see the `field_set!` macro). The encoder walks those tables, drops every
//! field holding its zero value, and renders the rest in the panel's query
//! syntax:
//!
//! - `include=<wire>,<wire>`  one key, comma-joined, declared order
//! - `filter[<wire>]=<value>` one key per filter
//! - `sort=<value>`           caller supplies the `-` direction prefix
//! - `<wire>=<value>`         free parameters, no bracket wrapping
//!
//! Keys are emitted sorted by their unencoded text, so a given options value
//! always yields the same string. A zero value (`""`, `false`, `0`, `None`)
//! cannot be sent: it is indistinguishable from "not set".

use std::borrow::Cow;
use std::collections::BTreeMap;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::ApiError;

/// Bytes escaped in query keys and values. Unreserved characters pass
/// through; space is rendered as `+` after escaping.
const QUERY_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// A field value that may be rendered into a query string.
///
/// Returns `None` for the type's zero value.
pub trait QueryValue {
    fn query_value(&self) -> Option<Cow<'_, str>>;
}

impl QueryValue for String {
    fn query_value(&self) -> Option<Cow<'_, str>> {
        self.as_str().query_value()
    }
}

impl QueryValue for str {
    fn query_value(&self) -> Option<Cow<'_, str>> {
        (!self.is_empty()).then_some(Cow::Borrowed(self))
    }
}

impl QueryValue for bool {
    fn query_value(&self) -> Option<Cow<'_, str>> {
        self.then_some(Cow::Borrowed("true"))
    }
}

impl QueryValue for u32 {
    fn query_value(&self) -> Option<Cow<'_, str>> {
        (*self != 0).then(|| Cow::Owned(self.to_string()))
    }
}

impl QueryValue for u64 {
    fn query_value(&self) -> Option<Cow<'_, str>> {
        (*self != 0).then(|| Cow::Owned(self.to_string()))
    }
}

impl<T: QueryValue> QueryValue for Option<T> {
    fn query_value(&self) -> Option<Cow<'_, str>> {
        self.as_ref().and_then(|v| v.query_value())
    }
}

/// One entry of a section's field table: the wire name and an accessor.
pub struct Field<T> {
    pub wire: &'static str,
    pub value: fn(&T) -> &dyn QueryValue,
}

/// A section struct with a static, declared-order field table.
pub trait FieldSet: Sized + 'static {
    const FIELDS: &'static [Field<Self>];
}

/// Object-safe view of a section: the set fields, in declared order.
pub trait Section {
    fn set_fields(&self) -> Vec<(&'static str, Cow<'_, str>)>;
}

impl<T: FieldSet> Section for T {
    fn set_fields(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        T::FIELDS
            .iter()
            .filter_map(|f| (f.value)(self).query_value().map(|v| (f.wire, v)))
            .collect()
    }
}

/// Declare a section struct together with its field table.
///
/// ```
/// panel_core::field_set! {
///     pub struct IncludePets {
///         owner: bool => "owner",
///         toys: bool => "toys",
///     }
/// }
/// use panel_core::options::Section;
/// let inc = IncludePets { owner: false, toys: true };
/// assert_eq!(inc.set_fields().len(), 1);
/// ```
#[macro_export]
macro_rules! field_set {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$fmeta:meta])* $field:ident : $ty:ty => $wire:literal ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        $vis struct $name {
            $( $(#[$fmeta])* pub $field: $ty, )*
        }

        impl $crate::options::FieldSet for $name {
            const FIELDS: &'static [$crate::options::Field<Self>] = &[
                $( $crate::options::Field { wire: $wire, value: |o| &o.$field }, )*
            ];
        }
    };
}

/// The four logical sections of a request's options. Every section is
/// optional; an absent section contributes nothing.
pub trait RequestOptions {
    fn include(&self) -> Option<&dyn Section> {
        None
    }

    fn filters(&self) -> Option<&dyn Section> {
        None
    }

    fn sort(&self) -> Option<&str> {
        None
    }

    fn parameters(&self) -> Option<&dyn Section> {
        None
    }
}

/// No options at all.
impl RequestOptions for () {}

impl<O: RequestOptions> RequestOptions for Option<O> {
    fn include(&self) -> Option<&dyn Section> {
        self.as_ref().and_then(|o| o.include())
    }

    fn filters(&self) -> Option<&dyn Section> {
        self.as_ref().and_then(|o| o.filters())
    }

    fn sort(&self) -> Option<&str> {
        self.as_ref().and_then(|o| o.sort())
    }

    fn parameters(&self) -> Option<&dyn Section> {
        self.as_ref().and_then(|o| o.parameters())
    }
}

/// Decoded query parameters, kept sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPairs {
    pairs: BTreeMap<String, String>,
}

impl QueryPairs {
    /// Collect the set fields of `opts`. When two sections produce the same
    /// key the later section (include, filters, sort, parameters) wins.
    pub fn from_options<O: RequestOptions + ?Sized>(opts: &O) -> Self {
        let mut pairs = BTreeMap::new();

        if let Some(include) = opts.include() {
            let names: Vec<&str> = include.set_fields().into_iter().map(|(wire, _)| wire).collect();
            if !names.is_empty() {
                pairs.insert("include".to_string(), names.join(","));
            }
        }

        if let Some(filters) = opts.filters() {
            for (wire, value) in filters.set_fields() {
                pairs.insert(format!("filter[{wire}]"), value.into_owned());
            }
        }

        if let Some(sort) = opts.sort().filter(|s| !s.is_empty()) {
            pairs.insert("sort".to_string(), sort.to_string());
        }

        if let Some(params) = opts.parameters() {
            for (wire, value) in params.set_fields() {
                pairs.insert(wire.to_string(), value.into_owned());
            }
        }

        Self { pairs }
    }

    /// Decode `a=b&c=d` query text. A leading `?` is ignored; a repeated key
    /// keeps its last value.
    pub fn parse(query: &str) -> Result<Self, ApiError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut pairs = BTreeMap::new();
        for part in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').unwrap_or((part, ""));
            pairs.insert(unescape(key)?, unescape(value)?);
        }
        Ok(Self { pairs })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render as `k=v&k=v` with keys in sorted order.
    pub fn encode(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", escape(k), escape(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Encode `opts` into a query string (without the leading `?`).
pub fn encode_options<O: RequestOptions + ?Sized>(opts: &O) -> String {
    QueryPairs::from_options(opts).encode()
}

fn escape(s: &str) -> String {
    // A literal "%20" in the input is escaped to "%2520", so this only
    // touches encoded spaces.
    utf8_percent_encode(s, QUERY_ESCAPE)
        .to_string()
        .replace("%20", "+")
}

fn unescape(s: &str) -> Result<String, ApiError> {
    let spaced = s.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| ApiError::InvalidQuery(e.to_string()))
}
