use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Defines the routes accessible to any user who has passed the authentication
/// layer: profile access and the article write operations. Every handler here
/// receives a validated `AuthUser` carrying the user's id and current role,
/// which feeds the ownership checks on update and delete.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // The authenticated user's own profile.
        .route("/me", get(handlers::get_me))
        // GET /me/articles
        // All articles owned by the requester, including private ones.
        .route("/me/articles", get(handlers::get_my_articles))
        // POST /articles
        // Submits a new article. The author is the authenticated user; tag
        // names are reconciled in the same transaction as the insert.
        .route("/articles", post(handlers::create_article))
        // PUT/DELETE /articles/{id}
        // Modify or remove an article. The write rule is enforced in the
        // handler: the author or an admin, nobody else.
        .route(
            "/articles/{id}",
            put(handlers::update_article).delete(handlers::delete_article),
        )
}
