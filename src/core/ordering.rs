//! Order-by normalisation
//!
//! Sort direction is encoded with a leading `-` on the field name
//! (`"-age"` sorts by `age` descending). These helpers convert between that
//! encoding and an explicit `(field, descending)` pair.

use serde::{Deserialize, Serialize};

/// A field declaration that is either a single name or a sequence of names
///
/// Used wherever a declaration may be written as `"name"` or as
/// `["last_name", "first_name"]`. Deserializes from either YAML/JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSpec {
    /// A bare field name
    Single(String),
    /// An ordered sequence of field names (possibly empty)
    Many(Vec<String>),
}

impl FieldSpec {
    /// Whether the declaration was written as a bare string
    pub fn is_single(&self) -> bool {
        matches!(self, FieldSpec::Single(_))
    }
}

impl From<&str> for FieldSpec {
    fn from(value: &str) -> Self {
        FieldSpec::Single(value.to_string())
    }
}

impl From<String> for FieldSpec {
    fn from(value: String) -> Self {
        FieldSpec::Single(value)
    }
}

impl From<Vec<String>> for FieldSpec {
    fn from(value: Vec<String>) -> Self {
        FieldSpec::Many(value)
    }
}

impl From<Vec<&str>> for FieldSpec {
    fn from(value: Vec<&str>) -> Self {
        FieldSpec::Many(value.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for FieldSpec {
    fn from(value: [&str; N]) -> Self {
        FieldSpec::Many(value.iter().map(|s| s.to_string()).collect())
    }
}

impl From<&[&str]> for FieldSpec {
    fn from(value: &[&str]) -> Self {
        FieldSpec::Many(value.iter().map(|s| s.to_string()).collect())
    }
}

/// Normalise a single-or-many field declaration into a sequence
///
/// ```
/// use viewkit::core::ordering::force_tuple;
///
/// assert_eq!(force_tuple("x"), vec!["x"]);
/// assert_eq!(force_tuple(["a", "b"]), vec!["a", "b"]);
/// ```
pub fn force_tuple(value: impl Into<FieldSpec>) -> Vec<String> {
    match value.into() {
        FieldSpec::Single(field) => vec![field],
        FieldSpec::Many(fields) => fields,
    }
}

/// Split a signed field into its bare name and direction
pub fn parse_order_by(s: &str) -> (&str, bool) {
    match s.strip_prefix('-') {
        Some(field) => (field, true),
        None => (s, false),
    }
}

/// Encode a field and direction back into the signed form
pub fn unparse_order_by(field: &str, descending: bool) -> String {
    if descending {
        format!("-{}", field)
    } else {
        field.to_string()
    }
}

/// Flip the direction of a single signed field
pub fn invert_order_by(s: &str) -> String {
    let (field, descending) = parse_order_by(s);
    unparse_order_by(field, !descending)
}

/// Flip the direction of every field in a sequence
pub fn invert_order_by_tuple<S: AsRef<str>>(fields: &[S]) -> Vec<String> {
    fields.iter().map(|s| invert_order_by(s.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_order_by() {
        assert_eq!(parse_order_by("name"), ("name", false));
        assert_eq!(parse_order_by("-name"), ("name", true));
    }

    #[test]
    fn test_parse_strips_only_one_sign() {
        assert_eq!(parse_order_by("--name"), ("-name", true));
    }

    #[test]
    fn test_unparse_round_trip() {
        for s in ["age", "-age", "last_name", "-created_at"] {
            let (field, desc) = parse_order_by(s);
            let encoded = unparse_order_by(field, desc);
            assert_eq!(parse_order_by(&encoded), parse_order_by(s));
        }
    }

    #[test]
    fn test_invert_order_by() {
        assert_eq!(invert_order_by("name"), "-name");
        assert_eq!(invert_order_by("-name"), "name");
    }

    #[test]
    fn test_invert_tuple_is_involution() {
        let fields = vec!["name".to_string(), "-age".to_string()];
        let inverted = invert_order_by_tuple(&fields);
        assert_eq!(inverted, vec!["-name", "age"]);
        assert_eq!(invert_order_by_tuple(&inverted), fields);
    }

    #[test]
    fn test_invert_empty_tuple() {
        let empty: Vec<String> = Vec::new();
        assert!(invert_order_by_tuple(&empty).is_empty());
    }

    #[test]
    fn test_force_tuple_never_splits_strings() {
        assert_eq!(force_tuple("name"), vec!["name"]);
        assert_eq!(force_tuple(String::from("abc")), vec!["abc"]);
        assert_eq!(force_tuple(vec!["a", "b"]), vec!["a", "b"]);
        assert!(force_tuple(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn test_field_spec_deserializes_both_shapes() {
        let single: FieldSpec = serde_json::from_str(r#""name""#).unwrap();
        assert!(single.is_single());

        let many: FieldSpec = serde_json::from_str(r#"["a", "-b"]"#).unwrap();
        assert_eq!(many, FieldSpec::from(["a", "-b"]));

        let empty: FieldSpec = serde_json::from_str("[]").unwrap();
        assert_eq!(empty, FieldSpec::Many(vec![]));
    }
}
