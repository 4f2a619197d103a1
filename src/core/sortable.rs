//! Queryset behaviours: fixed ordering, client-selected sorting, relation
//! hints and per-user filtering
//!
//! # Sortable declarations
//!
//! Each accepted ordering is one of:
//!
//! | Declaration                      | `?sort=key`                 | `?sort=-key`                  |
//! |----------------------------------|-----------------------------|-------------------------------|
//! | `"name"`                         | `name`                      | `-name`                       |
//! | `["external", "name"]`           | `name`                      | `-name`                       |
//! | `["namedesc", "-name"]`          | `-name`                     | `name`                        |
//! | `["name", ["last", "first"]]`    | `last, first`               | `-last, -first`               |
//! | `["foo", ["name", "-age"]]`      | `name, -age`                | `-name, age`                  |

use indexmap::IndexMap;
use serde_json::Value;

use super::context::RequestContext;
use super::error::ConfigError;
use super::ordering::{FieldSpec, force_tuple, invert_order_by_tuple, parse_order_by};
use super::queryset::Queryset;

/// Default query parameter carrying the sort key
pub const DEFAULT_SORT_PARAMETER: &str = "sort";

fn reject_bare_string(
    view: &str,
    attribute: &str,
    spec: Option<FieldSpec>,
) -> Result<Vec<String>, ConfigError> {
    match spec {
        None => Err(ConfigError::missing(
            view,
            attribute,
            "This must be a tuple or list.",
        )),
        Some(FieldSpec::Single(s)) => Err(ConfigError::invalid(
            view,
            attribute,
            format!("must be a tuple or list, e.g. [\"{}\"] rather than \"{}\"", s, s),
        )),
        Some(FieldSpec::Many(fields)) => Ok(fields),
    }
}

/// Orders a queryset by a fixed, declared field list
#[derive(Debug, Clone)]
pub struct OrderingMixin {
    ordering: Vec<String>,
}

impl OrderingMixin {
    /// An empty list is accepted and clears the queryset's ordering
    pub fn new(view: &str, ordering: Option<FieldSpec>) -> Result<Self, ConfigError> {
        Ok(Self {
            ordering: reject_bare_string(view, "ordering", ordering)?,
        })
    }

    pub fn get_ordering(&self) -> &[String] {
        &self.ordering
    }

    pub fn apply<Q: Queryset>(&self, queryset: Q) -> Q {
        queryset.order_by(&self.ordering)
    }
}

/// One accepted sort key and the fields it orders by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedOrdering {
    pub key: String,
    pub fields: Vec<String>,
}

impl AcceptedOrdering {
    /// Accept `key` and order by the field of the same name
    pub fn field(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            fields: force_tuple(key.as_str()),
            key,
        }
    }

    /// Accept `key` and order by `fields`
    pub fn mapped(key: impl Into<String>, fields: impl Into<FieldSpec>) -> Self {
        Self {
            key: key.into(),
            fields: force_tuple(fields),
        }
    }

    /// Parse a declared `accepted_orderings` list
    pub fn parse_list(view: &str, value: &Value) -> Result<Vec<Self>, ConfigError> {
        const ATTR: &str = "accepted_orderings";
        let items = match value {
            Value::Null => {
                return Err(ConfigError::missing(view, ATTR, format!("Define {}.{}", view, ATTR)));
            }
            Value::Array(items) => items,
            Value::String(s) => {
                return Err(ConfigError::invalid(
                    view,
                    ATTR,
                    format!("must be a list of orderings, e.g. [\"{}\"] rather than \"{}\"", s, s),
                ));
            }
            _ => return Err(ConfigError::invalid(view, ATTR, "must be a list of orderings")),
        };
        items.iter().map(|item| Self::parse_entry(view, item)).collect()
    }

    fn parse_entry(view: &str, item: &Value) -> Result<Self, ConfigError> {
        let invalid = || {
            ConfigError::invalid(
                view,
                "accepted_orderings",
                format!("entry {} must be a key, [key] or [key, fields]", item),
            )
        };
        match item {
            Value::String(key) => Ok(Self::field(key.clone())),
            Value::Array(parts) => match parts.as_slice() {
                [Value::String(key)] => Ok(Self::field(key.clone())),
                [Value::String(key), fields] => {
                    let spec: FieldSpec =
                        serde_json::from_value(fields.clone()).map_err(|_| invalid())?;
                    Ok(Self::mapped(key.clone(), spec))
                }
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        }
    }
}

/// Orders a queryset by a key the client picks from a declared list
#[derive(Debug, Clone)]
pub struct SortableMixin {
    orderings: IndexMap<String, Vec<String>>,
    default_order_by: Vec<String>,
    sort_parameter: String,
}

impl SortableMixin {
    /// Validate the declarations
    ///
    /// `default_key` may be signed and must name an accepted ordering; when
    /// absent, the first accepted ordering is the default.
    pub fn new(
        view: &str,
        accepted: Vec<AcceptedOrdering>,
        default_key: Option<&str>,
        sort_parameter: Option<&str>,
    ) -> Result<Self, ConfigError> {
        if accepted.is_empty() {
            return Err(ConfigError::missing(
                view,
                "accepted_orderings",
                format!("Define {}.accepted_orderings", view),
            ));
        }

        let mut orderings = IndexMap::with_capacity(accepted.len());
        for entry in accepted {
            orderings.insert(entry.key, entry.fields);
        }

        let default_order_by = match default_key {
            Some(key) => {
                let (bare, descending) = parse_order_by(key);
                let Some(fields) = orderings.get(bare) else {
                    return Err(ConfigError::invalid(
                        view,
                        "default_ordering",
                        format!("'{}' is not one of the accepted orderings", bare),
                    ));
                };
                if descending {
                    invert_order_by_tuple(fields)
                } else {
                    fields.clone()
                }
            }
            None => orderings
                .first()
                .map(|(_, fields)| fields.clone())
                .unwrap_or_default(),
        };

        let sort_parameter = match sort_parameter {
            None => DEFAULT_SORT_PARAMETER.to_string(),
            Some("") => {
                return Err(ConfigError::invalid(view, "sort_parameter", "must not be empty"));
            }
            Some(p) => p.to_string(),
        };

        Ok(Self {
            orderings,
            default_order_by,
            sort_parameter,
        })
    }

    /// Accepted keys in declaration order
    pub fn accepted_keys(&self) -> impl Iterator<Item = &str> {
        self.orderings.keys().map(String::as_str)
    }

    pub fn sort_parameter(&self) -> &str {
        &self.sort_parameter
    }

    pub fn default_order_by(&self) -> &[String] {
        &self.default_order_by
    }

    /// Fields to order by for a requested (possibly signed) key
    ///
    /// Missing or unknown keys fall back to the default.
    pub fn resolve(&self, requested: Option<&str>) -> Vec<String> {
        let Some(requested) = requested.filter(|r| !r.is_empty()) else {
            return self.default_order_by.clone();
        };
        let (key, inverted) = parse_order_by(requested);
        let Some(fields) = self.orderings.get(key) else {
            tracing::debug!(requested, "unknown sort key, using default ordering");
            return self.default_order_by.clone();
        };
        if inverted {
            invert_order_by_tuple(fields)
        } else {
            fields.clone()
        }
    }

    /// Fields to order by for this request
    pub fn get_ordering(&self, ctx: &RequestContext) -> Vec<String> {
        self.resolve(ctx.param(&self.sort_parameter))
    }

    pub fn apply<Q: Queryset>(&self, queryset: Q, ctx: &RequestContext) -> Q {
        queryset.order_by(&self.get_ordering(ctx))
    }
}

/// Joins declared relations eagerly
#[derive(Debug, Clone)]
pub struct SelectRelatedMixin {
    related: Vec<String>,
}

impl SelectRelatedMixin {
    pub fn new(view: &str, related: Option<FieldSpec>) -> Result<Self, ConfigError> {
        Ok(Self {
            related: reject_bare_string(view, "select_related", related)?,
        })
    }

    pub fn apply<Q: Queryset>(&self, queryset: Q) -> Q {
        queryset.select_related(&self.related)
    }
}

/// Fetches declared relations in separate lookups
#[derive(Debug, Clone)]
pub struct PrefetchRelatedMixin {
    related: Vec<String>,
}

impl PrefetchRelatedMixin {
    pub fn new(view: &str, related: Option<FieldSpec>) -> Result<Self, ConfigError> {
        Ok(Self {
            related: reject_bare_string(view, "prefetch_related", related)?,
        })
    }

    pub fn apply<Q: Queryset>(&self, queryset: Q) -> Q {
        queryset.prefetch_related(&self.related)
    }
}

/// Restricts a queryset to records owned by the requesting principal
///
/// Anonymous principals match nothing, so pair this with a login check.
#[derive(Debug, Clone)]
pub struct UserQuerysetMixin {
    pub user_field_name: String,
}

impl Default for UserQuerysetMixin {
    fn default() -> Self {
        Self {
            user_field_name: "user".to_string(),
        }
    }
}

impl UserQuerysetMixin {
    pub fn new(user_field_name: impl Into<String>) -> Self {
        Self {
            user_field_name: user_field_name.into(),
        }
    }

    pub fn apply<Q: Queryset>(&self, queryset: Q, ctx: &RequestContext) -> Q {
        match ctx.principal.id {
            Some(id) => queryset.filter_eq(&self.user_field_name, Value::String(id.to_string())),
            None => queryset.none(),
        }
    }
}
