use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
    routing::get,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::{
    connector::ConnectorInfo,
    views::{HtmlResponse, Renderer},
};

/// Provides the shared state for the app router.
pub struct AppState {
    /// Renders the pages served by the router.
    renderer: Renderer,
}

pub type SharedState = Arc<AppState>;

/// Create the HTTP router that previews every view with sample data.
pub fn make_app_router(renderer: Renderer) -> Router {
    let state: SharedState = Arc::new(AppState { renderer });

    Router::new()
        .route("/", get(handle_index))
        .route("/login", get(handle_login))
        .route("/password", get(handle_password))
        .route("/approval", get(handle_approval))
        .route("/oob", get(handle_oob))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Redirect users that hit the root in a browser to the login page.
async fn handle_index() -> impl IntoResponse {
    Redirect::temporary("/login")
}

#[derive(Deserialize)]
pub struct LoginQuery {
    req: Option<String>,
}

/// Connectors offered on the login preview.
fn preview_connectors(auth_req_id: &str) -> Vec<ConnectorInfo> {
    [("mock", "Example"), ("github", "GitHub"), ("ldap", "LDAP")]
        .into_iter()
        .map(|(id, name)| ConnectorInfo::new(id, name, format!("/auth/{id}?req={auth_req_id}")))
        .collect()
}

/// Renders the connector selection page.
async fn handle_login(
    Query(query): Query<LoginQuery>,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    let auth_req_id = query.req.unwrap_or_else(|| "preview".to_string());

    let mut page = HtmlResponse::new();
    state
        .renderer
        .login(&mut page, preview_connectors(&auth_req_id), &auth_req_id);
    page
}

#[derive(Deserialize)]
pub struct PasswordQuery {
    req: Option<String>,
    username: Option<String>,
    #[serde(default)]
    invalid: bool,
}

/// Renders the username and password form.
async fn handle_password(
    Query(query): Query<PasswordQuery>,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    let auth_req_id = query.req.unwrap_or_else(|| "preview".to_string());
    let post_url = format!("/auth/local?req={auth_req_id}");

    let mut page = HtmlResponse::new();
    state.renderer.password(
        &mut page,
        &auth_req_id,
        &post_url,
        query.username.as_deref().unwrap_or_default(),
        query.invalid,
    );
    page
}

#[derive(Deserialize)]
pub struct ApprovalQuery {
    req: Option<String>,
    user: Option<String>,
    client: Option<String>,
    /// Space separated list of requested scopes.
    scopes: Option<String>,
}

/// Renders the page asking the user to grant a client access.
async fn handle_approval(
    Query(query): Query<ApprovalQuery>,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    let scopes: Vec<&str> = match query.scopes.as_deref() {
        Some(scopes) => scopes.split_whitespace().collect(),
        None => vec!["openid", "email", "profile", "offline_access"],
    };

    let mut page = HtmlResponse::new();
    state.renderer.approval(
        &mut page,
        query.req.as_deref().unwrap_or("preview"),
        query.user.as_deref().unwrap_or("jane@example.com"),
        query.client.as_deref().unwrap_or("Example App"),
        &scopes,
    );
    page
}

#[derive(Deserialize)]
pub struct OobQuery {
    code: Option<String>,
}

/// Renders the page displaying an out-of-band code.
async fn handle_oob(
    Query(query): Query<OobQuery>,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    let mut page = HtmlResponse::new();
    state
        .renderer
        .oob(&mut page, query.code.as_deref().unwrap_or("preview-code"));
    page
}
