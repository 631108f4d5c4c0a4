use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Defines the routes exclusively accessible to users with the ADMIN role:
/// user management and moderation. The surrounding stack authenticates the
/// request; the ADMIN role check itself runs inside each handler.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/users
        // Lists every registered user.
        .route("/users", get(handlers::list_users))
        // GET/PATCH/DELETE /admin/users/{id}
        // Single-user retrieval and management. PATCH is the only way a role
        // changes; registration always produces USER. DELETE removes the user
        // and, via cascade, their articles.
        .route(
            "/users/{id}",
            get(handlers::get_user_details)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        )
}
