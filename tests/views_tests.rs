//! End-to-end tests for the view behaviours behind real routes
//!
//! These tests verify the complete flow from HTTP request to response:
//! sorting, JSON rendering, redirect targets, flash messages and ajax dispatch.

use axum::extract::Path;
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use viewkit::prelude::*;

// =============================================================================
// Test Data
// =============================================================================

fn people() -> Vec<Value> {
    vec![
        json!({"id": 1, "first_name": "Ada", "last_name": "Lovelace", "age": 36}),
        json!({"id": 2, "first_name": "Alan", "last_name": "Turing", "age": 41}),
        json!({"id": 3, "first_name": "Grace", "last_name": "Hopper", "age": 85}),
    ]
}

fn people_sortable() -> SortableMixin {
    SortableMixin::new(
        "PeopleList",
        vec![
            AcceptedOrdering::mapped("name", ["last_name", "first_name"]),
            AcceptedOrdering::mapped("age", ["-age"]),
        ],
        Some("name"),
        None,
    )
    .unwrap()
}

fn last_names(body: &Value) -> Vec<String> {
    body["people"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["last_name"].as_str().unwrap().to_string())
        .collect()
}

// =============================================================================
// Sorting + JSON
// =============================================================================

fn people_server() -> TestServer {
    let sortable = Arc::new(people_sortable());
    let json = Arc::new(JsonResponseMixin::new("PeopleList"));

    let list = get(move |ctx: RequestContext| async move {
        let queryset = sortable.apply(JsonQueryset::new(people()), &ctx);
        json.render_json_response(&json!({
            "ordering": sortable.get_ordering(&ctx),
            "people": queryset.evaluate(),
        }))
    });

    let app = ServerBuilder::new().route("/people/", list).build();
    TestServer::new(app).expect("Failed to create test server")
}

#[tokio::test]
async fn test_default_sort_key() {
    let server = people_server();

    let response = server.get("/people/").await;
    response.assert_status_ok();
    assert_eq!(response.header(CONTENT_TYPE), "application/json");

    let body: Value = response.json();
    assert_eq!(body["ordering"], json!(["last_name", "first_name"]));
    assert_eq!(last_names(&body), ["Hopper", "Lovelace", "Turing"]);
}

#[tokio::test]
async fn test_sort_key_from_query() {
    let server = people_server();

    let body: Value = server.get("/people/").add_query_param("sort", "age").await.json();
    assert_eq!(body["ordering"], json!(["-age"]));
    assert_eq!(last_names(&body), ["Hopper", "Turing", "Lovelace"]);
}

#[tokio::test]
async fn test_reversed_sort_key() {
    let server = people_server();

    let body: Value = server.get("/people/?sort=-age").await.json();
    assert_eq!(body["ordering"], json!(["age"]));
    assert_eq!(last_names(&body), ["Lovelace", "Turing", "Hopper"]);

    let body: Value = server.get("/people/?sort=-name").await.json();
    assert_eq!(body["ordering"], json!(["-last_name", "-first_name"]));
}

#[tokio::test]
async fn test_unknown_sort_key_falls_back() {
    let server = people_server();

    let body: Value = server.get("/people/?sort=bogus").await.json();
    assert_eq!(body["ordering"], json!(["last_name", "first_name"]));
}

// =============================================================================
// Object serialization
// =============================================================================

#[derive(Serialize)]
struct Article {
    id: u32,
    title: String,
}

impl Model for Article {
    fn model_label() -> &'static str {
        "tests.article"
    }
}

#[tokio::test]
async fn test_object_response_with_custom_content_type() {
    let json = Arc::new(
        JsonResponseMixin::new("ArticleListJson").with_content_type(Some("application/javascript")),
    );
    let list = get(move || async move {
        let articles = vec![Article {
            id: 7,
            title: "Hello".into(),
        }];
        json.render_json_object_response(&articles, &SerializeOptions::default())
    });
    let app = ServerBuilder::new().route("/articles/", list).build();
    let server = TestServer::new(app).unwrap();

    let response = server.get("/articles/").await;
    assert_eq!(response.header(CONTENT_TYPE), "application/javascript");
    let body: Value = response.json();
    assert_eq!(
        body,
        json!([{"model": "tests.article", "pk": 7, "fields": {"title": "Hello"}}])
    );
}

#[tokio::test]
async fn test_missing_content_type_is_500_naming_the_view() {
    let json = Arc::new(JsonResponseMixin::new("BrokenJson").with_content_type(None));
    let view = get(move || async move { json.render_json_response(&json!({"a": 1})) });
    let app = ServerBuilder::new().route("/broken/", view).build();
    let server = TestServer::new(app).unwrap();

    let response = server.get("/broken/").await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["code"], "CONFIG_ERROR");
    assert_eq!(body["details"]["view"], "BrokenJson");
    assert_eq!(body["details"]["attribute"], "content_type");
}

// =============================================================================
// Redirects
// =============================================================================

fn redirect_server(next: NextMixin) -> TestServer {
    let next = Arc::new(next);
    let view = post(move |ctx: RequestContext| async move { next.redirect(&ctx) });
    let app = ServerBuilder::new().route("/success_redirect/", view).build();
    TestServer::new(app).unwrap()
}

#[tokio::test]
async fn test_next_from_form_body() {
    let next = NextMixin::builder("SuccessRedirectView")
        .default_success_url(Some("/"))
        .build()
        .unwrap();
    let server = redirect_server(next);

    let response = server
        .post("/success_redirect/")
        .form(&[("next", "/foo/")])
        .await;
    assert_eq!(response.status_code(), StatusCode::FOUND);
    assert_eq!(response.header(LOCATION), "/foo/");
}

#[tokio::test]
async fn test_next_falls_back_to_default() {
    let next = NextMixin::builder("SuccessRedirectView")
        .default_success_url(Some("/"))
        .build()
        .unwrap();
    let server = redirect_server(next);

    let response = server.post("/success_redirect/").await;
    assert_eq!(response.header(LOCATION), "/");

    let response = server
        .post("/success_redirect/?next=https://evil.example/")
        .await;
    assert_eq!(response.header(LOCATION), "/");

    for target in ["\\\\evil.example/", "\\/evil.example/", "/\t/evil.example/"] {
        let response = server
            .post("/success_redirect/")
            .form(&[("next", target)])
            .await;
        assert_eq!(response.header(LOCATION), "/", "{:?}", target);
    }
}

#[tokio::test]
async fn test_create_and_redirect_to_edit() {
    let mut urls = UrlRegistry::new();
    urls.register("edit_article", "/article/{pk}/edit/").unwrap();
    let urls = Arc::new(urls);
    let flow = Arc::new(CreateAndRedirectToEdit::new("CreateArticle", Some("edit_article")).unwrap());

    let view = post(move |Path(pk): Path<u32>| async move { flow.redirect(&urls, &pk) });
    let app = ServerBuilder::new().route("/article/{pk}/create/", view).build();
    let server = TestServer::new(app).unwrap();

    let response = server.post("/article/9/create/").await;
    assert_eq!(response.status_code(), StatusCode::FOUND);
    assert_eq!(response.header(LOCATION), "/article/9/edit/");
}

// =============================================================================
// Messages
// =============================================================================

#[tokio::test]
async fn test_form_messages_over_http() {
    let form = Arc::new(FormMessages::new("Saved.", "Not saved."));
    let view = post(move |ctx: RequestContext| async move {
        let messages = Messages::new(&ctx);
        messages.debug("hidden below the default level");
        let status = match ctx.param("title") {
            Some(_) => form.form_valid(&messages, StatusCode::OK),
            None => form.form_invalid(&messages, StatusCode::UNPROCESSABLE_ENTITY),
        };
        (status, axum::Json(messages.get_messages()))
    });
    let app = ServerBuilder::new().route("/form_messages/", view).build();
    let server = TestServer::new(app).unwrap();

    let response = server
        .post("/form_messages/")
        .form(&[("title", "Hello")])
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, json!([{"level": "success", "message": "Saved."}]));

    let response = server.post("/form_messages/").await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body[0]["message"], "Not saved.");
}

#[tokio::test]
async fn test_messages_do_not_leak_between_requests() {
    let view = get(|ctx: RequestContext| async move {
        let messages = Messages::new(&ctx);
        messages.info("once");
        axum::Json(messages.get_messages().len())
    });
    let app = ServerBuilder::new().route("/info/", view).build();
    let server = TestServer::new(app).unwrap();

    for _ in 0..3 {
        let count: usize = server.get("/info/").await.json();
        assert_eq!(count, 1);
    }
}

// =============================================================================
// Ajax + headline
// =============================================================================

struct ArticleAjax {
    headline: SetHeadline,
}

#[async_trait]
impl AjaxResponse for ArticleAjax {
    async fn get(&self, _ctx: &RequestContext) -> std::result::Result<Response, ViewError> {
        Ok("MIXED".into_response())
    }

    async fn get_ajax(&self, _ctx: &RequestContext) -> std::result::Result<Response, ViewError> {
        let mut context = Map::new();
        self.headline.context_data(&mut context);
        Ok(axum::Json(context).into_response())
    }
}

#[tokio::test]
async fn test_ajax_dispatch_over_http() {
    let view = Arc::new(ArticleAjax {
        headline: SetHeadline::new("ArticleAjax", Some("Test headline")).unwrap(),
    });
    let handler = {
        let view = view.clone();
        move |ctx: RequestContext| async move { view.dispatch(&ctx).await }
    };
    let app = ServerBuilder::new()
        .route("/ajax_response/", get(handler.clone()).post(handler))
        .build();
    let server = TestServer::new(app).unwrap();

    let response = server.get("/ajax_response/").await;
    assert_eq!(response.text(), "MIXED");

    let response = server
        .get("/ajax_response/")
        .add_header(
            HeaderName::from_static("x-requested-with"),
            HeaderValue::from_static("XMLHttpRequest"),
        )
        .await;
    let body: Value = response.json();
    assert_eq!(body, json!({"headline": "Test headline"}));

    let response = server.post("/ajax_response/").await;
    assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED);
}
