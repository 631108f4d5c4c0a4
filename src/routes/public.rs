use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are reachable without a session: the identity gateway
/// (registration, login) and article reads. The read handlers accept an optional
/// bearer token, so the same routes serve guests, authenticated users, and
/// admins with different visibility scopes.
///
/// Security Mandate:
/// Listing must apply the requester's visibility scope at the repository level,
/// and single-article reads must pass the read-decision check. A guest can never
/// observe a private article through either path.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated endpoint used for monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // POST /register
        // Creates a new account with role USER. Duplicate emails are a 409.
        .route("/register", post(handlers::register_user))
        // POST /login
        // Verifies credentials and issues the signed access token.
        .route("/login", post(handlers::login_user))
        // GET /articles?tags=...&search=...&page=...
        // Lists articles under the requester's visibility scope with filters,
        // sorting, and the pagination envelope.
        .route("/articles", get(handlers::list_articles))
        // GET /articles/{id}
        // Single-article read. Existence is checked before permission, so an
        // unknown id yields 404 and a known-but-private one yields 403.
        .route("/articles/{id}", get(handlers::get_article))
}
