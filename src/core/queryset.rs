//! Queryset abstraction for the ordering and filtering behaviours
//!
//! The mix-ins in [`crate::core::sortable`] never touch records directly;
//! they compose calls on a [`Queryset`] handle. Storage layers implement the
//! trait by translating the calls into their own query language.
//! [`JsonQueryset`] is a lazy in-memory implementation over JSON records.

use serde_json::Value;
use std::cmp::Ordering;

use super::ordering::parse_order_by;

/// A lazily-evaluated, composable query over a collection of records
///
/// Every method consumes the handle and returns a refined one, so calls
/// chain the way query builders usually do.
pub trait Queryset: Sized {
    /// Replace the ordering; an empty slice clears any ordering
    fn order_by(self, fields: &[String]) -> Self;

    /// Keep only records whose `field` equals `value`
    fn filter_eq(self, field: &str, value: Value) -> Self;

    /// Match no records at all
    fn none(self) -> Self;

    /// Join the given relations eagerly
    fn select_related(self, fields: &[String]) -> Self;

    /// Fetch the given relations in separate lookups
    fn prefetch_related(self, fields: &[String]) -> Self;
}

/// In-memory queryset over JSON objects
///
/// Filters and ordering are recorded and only applied by
/// [`JsonQueryset::evaluate`]. Relation hints are recorded so callers can
/// inspect them; records are already fully materialised.
#[derive(Debug, Clone, Default)]
pub struct JsonQueryset {
    records: Vec<Value>,
    filters: Vec<(String, Value)>,
    empty: bool,
    ordering: Vec<String>,
    select_related: Vec<String>,
    prefetch_related: Vec<String>,
}

impl JsonQueryset {
    pub fn new(records: Vec<Value>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    /// Current ordering, in signed form
    pub fn ordering(&self) -> &[String] {
        &self.ordering
    }

    pub fn selected_related(&self) -> &[String] {
        &self.select_related
    }

    pub fn prefetched_related(&self) -> &[String] {
        &self.prefetch_related
    }

    /// Apply filters and ordering and return the matching records
    pub fn evaluate(&self) -> Vec<Value> {
        if self.empty {
            return Vec::new();
        }
        let mut rows: Vec<Value> = self
            .records
            .iter()
            .filter(|record| {
                self.filters
                    .iter()
                    .all(|(field, expected)| record.get(field) == Some(expected))
            })
            .cloned()
            .collect();

        if !self.ordering.is_empty() {
            rows.sort_by(|a, b| self.compare_records(a, b));
        }

        rows
    }

    fn compare_records(&self, a: &Value, b: &Value) -> Ordering {
        for key in &self.ordering {
            let (field, descending) = parse_order_by(key);
            let ord = compare_values(
                a.get(field).unwrap_or(&Value::Null),
                b.get(field).unwrap_or(&Value::Null),
            );
            let ord = if descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl Queryset for JsonQueryset {
    fn order_by(mut self, fields: &[String]) -> Self {
        self.ordering = fields.to_vec();
        self
    }

    fn filter_eq(mut self, field: &str, value: Value) -> Self {
        self.filters.push((field.to_string(), value));
        self
    }

    fn none(mut self) -> Self {
        self.empty = true;
        self
    }

    fn select_related(mut self, fields: &[String]) -> Self {
        self.select_related.extend(fields.iter().cloned());
        self
    }

    fn prefetch_related(mut self, fields: &[String]) -> Self {
        self.prefetch_related.extend(fields.iter().cloned());
        self
    }
}

/// Total order over JSON scalars; nulls sort first, mixed types by kind
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

fn kind_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
