//! JSON response rendering
//!
//! [`JsonResponseMixin::render_json_response`] ships plain data (maps,
//! lists, scalars, `chrono` timestamps). For domain records use
//! [`JsonResponseMixin::render_json_object_response`], which wraps each record
//! as `{"model": ..., "pk": ..., "fields": {...}}`.

use axum::http::{HeaderValue, header::CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Map, Value};

use super::error::{ConfigError, ViewError};

/// Default content type of JSON responses
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// A domain record the object serializer understands
pub trait Model: Serialize {
    /// Label identifying the record type, e.g. `"blog.article"`
    fn model_label() -> &'static str;

    /// Name of the primary-key field in the serialized form
    fn pk_field() -> &'static str {
        "id"
    }
}

/// Options passed through to the object serializer
#[derive(Debug, Clone, Default)]
pub struct SerializeOptions {
    /// Only include these fields (the primary key is always included)
    pub fields: Option<Vec<String>>,
    /// Pretty-print with this many spaces of indentation
    pub indent: Option<usize>,
}

impl SerializeOptions {
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn indent(mut self, indent: usize) -> Self {
        self.indent = Some(indent);
        self
    }
}

/// Serialize records into the `model`/`pk`/`fields` envelope
pub fn serialize_objects<M: Model>(
    objects: &[M],
    options: &SerializeOptions,
) -> Result<String, ViewError> {
    let mut out = Vec::with_capacity(objects.len());
    for object in objects {
        let Value::Object(mut fields) = serde_json::to_value(object)? else {
            return Err(ViewError::Internal(format!(
                "{} does not serialize to an object",
                M::model_label()
            )));
        };
        let pk = fields.remove(M::pk_field()).unwrap_or(Value::Null);
        if let Some(keep) = &options.fields {
            fields.retain(|name, _| keep.iter().any(|k| k == name));
        }

        let mut entry = Map::new();
        entry.insert("model".into(), Value::String(M::model_label().to_string()));
        entry.insert("pk".into(), pk);
        entry.insert("fields".into(), Value::Object(fields));
        out.push(Value::Object(entry));
    }

    let out = Value::Array(out);
    match options.indent {
        None => Ok(serde_json::to_string(&out)?),
        Some(width) => {
            let indent = vec![b' '; width];
            let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
            let mut buf = Vec::new();
            let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
            out.serialize(&mut ser)?;
            String::from_utf8(buf).map_err(|e| ViewError::Internal(e.to_string()))
        }
    }
}

/// Renders JSON bodies with a configurable content type
#[derive(Debug, Clone)]
pub struct JsonResponseMixin {
    view: String,
    content_type: Option<String>,
}

impl JsonResponseMixin {
    /// Use the default `application/json` content type
    pub fn new(view: impl Into<String>) -> Self {
        Self {
            view: view.into(),
            content_type: Some(DEFAULT_CONTENT_TYPE.to_string()),
        }
    }

    pub fn with_content_type(mut self, content_type: Option<&str>) -> Self {
        self.content_type = content_type.map(String::from);
        self
    }

    pub fn get_content_type(&self) -> Result<&str, ConfigError> {
        match self.content_type.as_deref() {
            Some(ct) if !ct.is_empty() => Ok(ct),
            _ => Err(ConfigError::missing(
                &self.view,
                "content_type",
                format!(
                    "Define {}.content_type, or override {}.get_content_type()",
                    self.view, self.view
                ),
            )),
        }
    }

    fn header_value(&self) -> Result<HeaderValue, ConfigError> {
        let ct = self.get_content_type()?;
        HeaderValue::from_str(ct).map_err(|_| {
            ConfigError::invalid(
                &self.view,
                "content_type",
                format!("'{}' is not a valid header value", ct),
            )
        })
    }

    /// Serialize plain data
    ///
    /// The content type is checked before anything is serialized.
    pub fn render_json_response<T: Serialize + ?Sized>(
        &self,
        payload: &T,
    ) -> Result<Response, ViewError> {
        let content_type = self.header_value()?;
        let body = serde_json::to_string(payload)?;
        Ok(([(CONTENT_TYPE, content_type)], body).into_response())
    }

    /// Serialize domain records with the object serializer
    pub fn render_json_object_response<M: Model>(
        &self,
        objects: &[M],
        options: &SerializeOptions,
    ) -> Result<Response, ViewError> {
        let content_type = self.header_value()?;
        let body = serialize_objects(objects, options)?;
        Ok(([(CONTENT_TYPE, content_type)], body).into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[derive(Serialize)]
    struct Article {
        id: u32,
        title: String,
        body: String,
    }

    impl Model for Article {
        fn model_label() -> &'static str {
            "tests.article"
        }
    }

    fn articles() -> Vec<Article> {
        vec![
            Article {
                id: 1,
                title: "Héllo".into(),
                body: "first".into(),
            },
            Article {
                id: 2,
                title: "World".into(),
                body: "second".into(),
            },
        ]
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_render_plain_data() {
        let mixin = JsonResponseMixin::new("SimpleJson");
        let created = Utc.with_ymd_and_hms(2013, 5, 1, 12, 30, 0).unwrap();
        let response = mixin
            .render_json_response(&json!({"username": "ünïcode", "created": created}))
            .unwrap();

        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let body = body_string(response).await;
        assert!(body.contains("ünïcode"));
        assert!(body.contains("2013-05-01T12:30:00Z"));
    }

    #[tokio::test]
    async fn test_custom_content_type() {
        let mixin = JsonResponseMixin::new("SimpleJson").with_content_type(Some("application/javascript"));
        let response = mixin.render_json_response(&[1, 2, 3]).unwrap();
        assert_eq!(response.headers()[CONTENT_TYPE], "application/javascript");
        assert_eq!(body_string(response).await, "[1,2,3]");
    }

    #[test]
    fn test_missing_content_type_fails_before_serializing() {
        struct Unserializable;
        impl Serialize for Unserializable {
            fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
                panic!("serializer must not run");
            }
        }

        let mixin = JsonResponseMixin::new("SimpleJson").with_content_type(None);
        let err = mixin.render_json_response(&Unserializable).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("SimpleJson is missing the content_type attribute"));
    }

    #[test]
    fn test_serialize_objects_envelope() {
        let body = serialize_objects(&articles(), &SerializeOptions::default()).unwrap();
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            value[0],
            json!({"model": "tests.article", "pk": 1, "fields": {"title": "Héllo", "body": "first"}})
        );
        assert_eq!(value[1]["pk"], 2);
    }

    #[test]
    fn test_serialize_objects_options_pass_through() {
        let options = SerializeOptions::default().fields(["title"]).indent(4);
        let body = serialize_objects(&articles(), &options).unwrap();
        assert!(body.contains("\n    {"));

        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value[0]["fields"], json!({"title": "Héllo"}));
    }

    #[tokio::test]
    async fn test_render_object_response() {
        let mixin = JsonResponseMixin::new("ArticleListJson");
        let response = mixin
            .render_json_object_response(&articles(), &SerializeOptions::default())
            .unwrap();
        let value: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }
}
