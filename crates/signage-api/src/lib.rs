pub mod auth;
pub mod error;
pub mod middleware;
pub mod rotation;
pub mod tables;
pub mod tv;
pub mod users;

use axum::{
    Router, middleware as layers,
    routing::{get, post, put},
};

use auth::AppState;
use middleware::require_auth;

/// Every HTTP route: the public display and login, plus the admin panel
/// behind a session token.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/tv", get(tv::frame))
        .route("/auth/setup", get(auth::setup_status).post(auth::setup_admin))
        .route("/auth/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/admin/tables/{table}", get(tables::get_table).put(tables::save_table))
        .route("/admin/tables/{table}/rows", post(tables::upsert_row))
        .route("/admin/weather_units/geocode", post(tables::geocode_units))
        .route("/admin/init-headers", post(tables::init_headers))
        .route("/admin/cache/clear", post(tables::clear_cache))
        .route("/admin/users", get(users::list_users).post(users::create_user))
        .route("/admin/users/permissions", put(users::save_permissions))
        .route("/admin/users/{username}/password", post(users::reset_password))
        .route("/admin/users/{username}/active", post(users::set_active))
        .layer(layers::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use signage_feeds::{Endpoints, FeedClient};
    use signage_store::schema::KNOWN_TABLES;
    use signage_store::{MemoryBackend, RetryPolicy, Table, TableStore};
    use signage_types::models::{Permissions, User};

    use crate::auth::{AppState, AppStateInner, create_token};
    use crate::rotation::Rotation;

    pub const SECRET: &str = "test-secret";

    pub fn test_state() -> (Arc<MemoryBackend>, AppState) {
        let backend = Arc::new(MemoryBackend::with_worksheets(KNOWN_TABLES));
        let store = TableStore::new(backend.clone()).with_retry(RetryPolicy::immediate(2));
        // Closed port: every feed lookup fails fast.
        let feeds = FeedClient::new(Endpoints::all_at("http://127.0.0.1:9")).unwrap();
        let state = Arc::new(AppStateInner {
            store,
            feeds,
            jwt_secret: SECRET.into(),
            session_days: 1,
            news_rotation_secs: 10,
            rotation: Rotation::new(),
        });
        (backend, state)
    }

    pub fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    pub fn seed_user(backend: &MemoryBackend, user: &User) {
        let table = Table::from_typed(std::slice::from_ref(user));
        backend.seed("users", table.to_grid());
    }

    pub fn token_for(state: &AppState, username: &str, is_admin: bool, perms: Permissions) -> String {
        let user = User {
            username: username.into(),
            is_admin,
            permissions: perms,
            active: true,
            ..Default::default()
        };
        create_token(&state.jwt_secret, &user, 1).unwrap()
    }

    pub async fn call(
        state: &AppState,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let resp = crate::router(state.clone()).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}
