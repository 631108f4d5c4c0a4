use crate::{
    AppState, auth,
    auth::{AuthUser, MaybeAuthUser},
    error::ApiError,
    models::{
        ArticleList, ArticleListQuery, ArticleResponse, CreateArticleRequest, LoginRequest,
        LoginResponse, RegisterRequest, UpdateArticleRequest, UpdateUserRequest, UserResponse,
    },
    policy::{self, Decision, Role},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

// Minimum lengths accepted for article payloads and passwords.
const MIN_TITLE_LEN: usize = 3;
const MIN_CONTENT_LEN: usize = 10;
const MIN_PASSWORD_LEN: usize = 6;

// --- Identity Handlers ---

/// register_user
///
/// [Public Route] Creates a new account with role USER. The password is hashed
/// with Argon2id before it reaches the repository; the plaintext is never stored
/// or logged. A duplicate email surfaces as 409 Conflict.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = UserResponse),
        (status = 409, description = "Email already taken")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    if !payload.email.contains('@') {
        return Err(ApiError::bad_request("A valid email address is required"));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(
            "Password must be at least 6 characters",
        ));
    }

    let password_hash = auth::hash_password(payload.password).await?;
    let user = state.repo.create_user(&payload.email, &password_hash).await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// login_user
///
/// [Public Route] Verifies credentials and issues a signed access token.
/// Unknown email and wrong password produce the same 401 response, so the
/// endpoint does not reveal which accounts exist.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .repo
        .get_user_by_email(&payload.email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    let valid = auth::verify_password(payload.password, user.password_hash.clone()).await?;
    if !valid {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let access_token = auth::issue_token(user.id, &user.role, &state.config.jwt_secret)?;

    Ok(Json(LoginResponse {
        access_token,
        user: user.into(),
    }))
}

/// get_me
///
/// [Authenticated Route] Returns the authenticated user's own profile.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UserResponse))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(user.into()))
}

// --- Article Handlers ---

/// list_articles
///
/// [Public Route, optional auth] Lists articles under the requester's visibility
/// scope with filtering, sorting, and the pagination envelope. Guests see public
/// articles only; authenticated users additionally see their own; admins see all.
/// Every caller filter narrows that scope, never widens it.
#[utoipa::path(
    get,
    path = "/articles",
    params(ArticleListQuery),
    responses((status = 200, description = "Filtered article page", body = ArticleList))
)]
pub async fn list_articles(
    requester: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<ArticleListQuery>,
) -> Result<Json<ArticleList>, ApiError> {
    let scope = policy::visibility_scope(requester.requester().as_ref());

    // Resolve the author filter to an identifier at the boundary. An email with
    // no matching user, or one contradicting an explicit authorId, matches nothing.
    let author_id = match &query.author_email {
        Some(email) => match state.repo.get_user_by_email(email).await? {
            Some(user) if query.author_id.is_none() || query.author_id == Some(user.id) => {
                Some(user.id)
            }
            _ => {
                return Ok(Json(ArticleList::new(
                    vec![],
                    0,
                    query.page(),
                    query.limit(),
                )));
            }
        },
        None => query.author_id,
    };

    let list = state.repo.list_articles(&query, author_id, scope).await?;
    Ok(Json(list))
}

/// get_article
///
/// [Public Route, optional auth] Retrieves a single article by id. Existence is
/// checked before permission, so an unknown id is a 404 and a known-but-private
/// one is a 403. Private articles are readable by their author and by admins.
#[utoipa::path(
    get,
    path = "/articles/{id}",
    params(("id" = Uuid, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Found", body = ArticleResponse),
        (status = 403, description = "Private article"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_article(
    requester: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ArticleResponse>, ApiError> {
    let article = state
        .repo
        .get_article(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;

    match policy::read_decision(
        article.is_public,
        article.author.id,
        requester.requester().as_ref(),
    ) {
        Decision::Allow => Ok(Json(article)),
        Decision::Forbidden => Err(ApiError::forbidden("No permission to view this article")),
    }
}

/// create_article
///
/// [Authenticated Route] Submits a new article. The author is always the
/// authenticated requester; new articles are private unless the payload says
/// otherwise. Tag names are reconciled in the same transaction as the insert.
#[utoipa::path(
    post,
    path = "/articles",
    request_body = CreateArticleRequest,
    responses(
        (status = 201, description = "Created", body = ArticleResponse),
        (status = 409, description = "Lost a concurrent tag-creation race, retry")
    )
)]
pub async fn create_article(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateArticleRequest>,
) -> Result<(StatusCode, Json<ArticleResponse>), ApiError> {
    if payload.title.trim().len() < MIN_TITLE_LEN {
        return Err(ApiError::bad_request(
            "Title must be at least 3 characters",
        ));
    }
    if payload.content.trim().len() < MIN_CONTENT_LEN {
        return Err(ApiError::bad_request(
            "Content must be at least 10 characters",
        ));
    }

    let article = state.repo.create_article(id, payload).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

/// update_article
///
/// [Authenticated Route] Partially updates an article. Authorization follows the
/// write rule: the author or an admin, nobody else. A present tag list fully
/// replaces the association; authorship never changes.
#[utoipa::path(
    put,
    path = "/articles/{id}",
    params(("id" = Uuid, Path, description = "Article ID")),
    request_body = UpdateArticleRequest,
    responses(
        (status = 200, description = "Updated", body = ArticleResponse),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_article(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateArticleRequest>,
) -> Result<Json<ArticleResponse>, ApiError> {
    let article = state
        .repo
        .get_article(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;

    if policy::write_decision(article.author.id, &auth_user.requester()) == Decision::Forbidden {
        return Err(ApiError::forbidden("You can only update your own articles"));
    }

    // The record can disappear between the check and the write; treat that as 404.
    let updated = state
        .repo
        .update_article(id, payload)
        .await?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;
    Ok(Json(updated))
}

/// delete_article
///
/// [Authenticated Route] Permanently deletes an article (hard delete, no
/// tombstone). Same authorization rule as update. Tags referenced by the
/// article are left in place.
#[utoipa::path(
    delete,
    path = "/articles/{id}",
    params(("id" = Uuid, Path, description = "Article ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_article(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let article = state
        .repo
        .get_article(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;

    if policy::write_decision(article.author.id, &auth_user.requester()) == Decision::Forbidden {
        return Err(ApiError::forbidden("You can only delete your own articles"));
    }

    if state.repo.delete_article(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Article not found"))
    }
}

/// get_my_articles
///
/// [Authenticated Route] Lists all articles owned by the requesting user,
/// including private ones.
#[utoipa::path(
    get,
    path = "/me/articles",
    responses((status = 200, description = "My Articles", body = [ArticleResponse]))
)]
pub async fn get_my_articles(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ArticleResponse>>, ApiError> {
    let articles = state.repo.get_articles_by_author(id).await?;
    Ok(Json(articles))
}

// --- Admin Handlers ---

fn require_admin(auth_user: &AuthUser) -> Result<(), ApiError> {
    if auth_user.role != Role::Admin {
        return Err(ApiError::forbidden("Admin role required"));
    }
    Ok(())
}

/// list_users
///
/// [Admin Route] Lists every registered user.
#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "All users", body = [UserResponse]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_users(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    require_admin(&auth_user)?;
    let users = state.repo.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// get_user_details
///
/// [Admin Route] Retrieves a single user by id.
#[utoipa::path(
    get,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = UserResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user_details(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    require_admin(&auth_user)?;
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(user.into()))
}

/// update_user
///
/// [Admin Route] Updates a user's email and/or role. Role values outside
/// {USER, ADMIN} are rejected before the handler runs.
#[utoipa::path(
    patch,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserResponse),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Email already taken")
    )
)]
pub async fn update_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    require_admin(&auth_user)?;
    let user = state
        .repo
        .update_user(id, payload)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(user.into()))
}

/// delete_user
///
/// [Admin Route] Permanently removes a user. Their articles go with them
/// (cascade at the store level).
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_admin(&auth_user)?;
    if state.repo.delete_user(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("User not found"))
    }
}
