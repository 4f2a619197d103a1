//! Article views example
//!
//! Views are declared in `views.yaml`. Run the example, then try:
//! - `GET  /articles/?sort=-title`
//! - `POST /articles/new/` with `Authorization: Bearer editor-token` and a `title` form field
//! - `POST /articles/1/delete/` with `Authorization: Bearer staff-token`
//! - `POST /accounts/login/?next=/articles/`

use axum::extract::Path;
use axum::http::StatusCode;
use chrono::Utc;
use serde_json::{Map, Value, json};
use std::sync::{Arc, RwLock};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use viewkit::prelude::*;

struct ArticleViews {
    urls: UrlRegistry,
    headline: SetHeadline,
    sortable: SortableMixin,
    json: JsonResponseMixin,
    create_messages: FormMessages,
    create_redirect: CreateAndRedirectToEdit,
    delete_messages: DeleteMessages,
    delete_redirect: SuccessUrlRedirectList,
    login_next: NextMixin,
    articles: RwLock<Vec<Value>>,
}

impl ArticleViews {
    fn from_config(config: &ViewsConfig) -> Result<Self> {
        let list = config.view("ArticleList")?;
        let create = config.view("ArticleCreate")?;
        let delete = config.view("ArticleDelete")?;
        let login = config.view("Login")?;

        Ok(Self {
            urls: config.url_registry()?,
            headline: list.headline("ArticleList")?,
            sortable: list.sortable_mixin("ArticleList")?,
            json: list.json_mixin("ArticleList")?,
            create_messages: create.form_messages(),
            create_redirect: create.create_and_redirect_to_edit("ArticleCreate")?,
            delete_messages: delete.delete_messages(),
            delete_redirect: delete.success_list_redirect("ArticleDelete")?,
            login_next: login.next_mixin("Login")?,
            articles: RwLock::new(vec![
                json!({"id": 1, "title": "Hello", "author": "editor", "created": "2024-01-02T10:00:00Z"}),
                json!({"id": 2, "title": "Axum views", "author": "staff", "created": "2024-03-04T10:00:00Z"}),
            ]),
        })
    }

    fn records(&self) -> std::result::Result<Vec<Value>, ViewError> {
        self.articles
            .read()
            .map(|articles| articles.clone())
            .map_err(|_| ViewError::Internal("article store lock poisoned".into()))
    }

    fn list(&self, ctx: &RequestContext) -> std::result::Result<Response, ViewError> {
        let queryset = self.sortable.apply(JsonQueryset::new(self.records()?), ctx);

        let mut body = Map::new();
        self.headline.context_data(&mut body);
        body.insert("sort".into(), json!(self.sortable.get_ordering(ctx)));
        body.insert("articles".into(), Value::Array(queryset.evaluate()));
        self.json.render_json_response(&body)
    }

    fn create(&self, ctx: &RequestContext) -> std::result::Result<Response, ViewError> {
        let messages = Messages::new(ctx);
        let Some(title) = ctx.param("title").filter(|t| !t.is_empty()) else {
            let response = self
                .create_messages
                .form_invalid(&messages, StatusCode::UNPROCESSABLE_ENTITY.into_response());
            log_messages(&messages);
            return Ok(response);
        };

        let pk = {
            let mut articles = self
                .articles
                .write()
                .map_err(|_| ViewError::Internal("article store lock poisoned".into()))?;
            let pk = articles.len() + 1;
            articles.push(json!({
                "id": pk,
                "title": title,
                "author": ctx.principal.username,
                "created": Utc::now(),
            }));
            pk
        };

        let found = self.create_redirect.redirect(&self.urls, &pk)?;
        let response = self.create_messages.form_valid(&messages, found.into_response());
        log_messages(&messages);
        Ok(response)
    }

    fn delete(&self, pk: u64, ctx: &RequestContext) -> std::result::Result<Response, ViewError> {
        self.articles
            .write()
            .map_err(|_| ViewError::Internal("article store lock poisoned".into()))?
            .retain(|article| article["id"].as_u64() != Some(pk));

        let messages = Messages::new(ctx);
        let found = Found(self.delete_redirect.get_success_url(&self.urls)?);
        let response = self.delete_messages.deleted(&messages, found.into_response());
        log_messages(&messages);
        Ok(response)
    }

    fn login_form(&self, ctx: &RequestContext) -> std::result::Result<Response, ViewError> {
        let mut body = Map::new();
        self.login_next.context_data(ctx, &mut body);
        self.json.render_json_response(&body)
    }
}

fn log_messages(messages: &Messages<'_>) {
    for message in messages.get_messages() {
        tracing::info!(level = %message.level, tags = %message.tags(), "{}", message.message);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,viewkit=debug")),
        )
        .init();

    let config = ViewsConfig::from_yaml_str(include_str!("views.yaml"))?;
    let views = Arc::new(ArticleViews::from_config(&config)?);

    let checks = UserChecks::new();
    let create_access = config.view("ArticleCreate")?.access_mixin("ArticleCreate", &checks)?;
    let delete_access = config.view("ArticleDelete")?.access_mixin("ArticleDelete", &checks)?;

    let provider = TokenPrincipalProvider::new()
        .with_token(
            "editor-token",
            Principal::user("editor").with_permissions(["blog.add_article"]),
        )
        .with_token("staff-token", Principal::user("staff").staff());

    let list = {
        let views = views.clone();
        get(move |ctx: RequestContext| async move { views.list(&ctx) })
    };
    let create = {
        let views = views.clone();
        post(move |ctx: RequestContext| async move { views.create(&ctx) })
    };
    let remove = {
        let views = views.clone();
        post(move |Path(pk): Path<u64>, ctx: RequestContext| async move { views.delete(pk, &ctx) })
    };
    let login = {
        let get_views = views.clone();
        let post_views = views.clone();
        get(move |ctx: RequestContext| async move { get_views.login_form(&ctx) })
            .post(move |ctx: RequestContext| async move { post_views.login_next.redirect(&ctx) })
    };

    let app = ServerBuilder::new()
        .with_principal_provider(provider)
        .route("/articles/", list)
        .route("/accounts/login/", login)
        .protected_route("/articles/new/", create, create_access)
        .protected_route("/articles/{pk}/delete/", remove, delete_access)
        .build()
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    tracing::info!("Article views listening on http://127.0.0.1:3000");
    axum::serve(listener, app).await?;

    Ok(())
}
