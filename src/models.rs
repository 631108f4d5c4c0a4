use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::policy::Role;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Raw database row (internal use). Directly maps to the `users` table, including
/// the Argon2 password hash. This struct deliberately does not implement
/// `Serialize`: the hash never crosses the API boundary. Handlers convert to
/// `UserResponse` before returning anything.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    // Unique, enforced by the store.
    pub email: String,
    pub password_hash: String,
    // Stored as TEXT: 'USER' or 'ADMIN'.
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// UserResponse
///
/// The public shape of a user record. Role is parsed into the typed enum at this
/// boundary so API consumers and the policy layer see the same vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            email: user.email,
            role: Role::from_db(&user.role),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Tag
///
/// A tag record from the `tags` table. Tags are created lazily by reconciliation
/// when an article first references their name, and are never deleted by article
/// operations (orphan tags persist).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Tag {
    pub id: Uuid,
    // Unique, enforced by the store.
    pub name: String,
}

/// AuthorSummary
///
/// The author projection embedded in article responses (never the full user row).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub email: String,
}

/// ArticleRow
///
/// Raw database row (internal use). The flat result of joining `articles` with
/// `users`; the repository groups in the tag list and maps it to `ArticleResponse`.
#[derive(Debug, Clone, FromRow)]
pub struct ArticleRow {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_id: Uuid,
    pub author_email: String,
}

/// ArticleResponse
///
/// The primary article shape returned by every article endpoint: the article row
/// enriched with its author summary and tag set. `author.id` is immutable after
/// creation; the tag set carries no duplicates.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ArticleResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub is_public: bool,
    pub author: AuthorSummary,
    pub tags: Vec<Tag>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl ArticleResponse {
    /// Assembles the response from the flat join row plus the tags fetched for it.
    pub fn from_row(row: ArticleRow, tags: Vec<Tag>) -> Self {
        ArticleResponse {
            id: row.id,
            title: row.title,
            content: row.content,
            is_public: row.is_public,
            author: AuthorSummary {
                id: row.author_id,
                email: row.author_email,
            },
            tags,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// --- List Query & Envelope ---

/// SortBy
///
/// Caller-selectable sort field for article listing. The enum doubles as the
/// whitelist: only these columns can ever reach the ORDER BY clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    CreatedAt,
    UpdatedAt,
    Title,
}

impl SortBy {
    pub fn column(&self) -> &'static str {
        match self {
            SortBy::CreatedAt => "a.created_at",
            SortBy::UpdatedAt => "a.updated_at",
            SortBy::Title => "a.title",
        }
    }
}

/// SortOrder
///
/// Sort direction, default descending (newest first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// ArticleListQuery
///
/// Accepted query parameters for GET /articles. All filters are AND-combined with
/// the requester's visibility scope; none of them can widen it.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ArticleListQuery {
    /// Comma-separated tag names; an article matches if it carries at least one.
    pub tags: Option<String>,
    /// Exact author identifier.
    pub author_id: Option<Uuid>,
    /// Author lookup by email, resolved to an identifier at the boundary.
    pub author_email: Option<String>,
    /// Explicit public flag filter. Narrows visibility, never widens it: a guest
    /// asking for `isPublic=false` gets an empty result set.
    pub is_public: Option<bool>,
    /// Case-insensitive substring match over title OR content.
    pub search: Option<String>,
    /// Inclusive lower bound on creation time (RFC 3339).
    pub created_after: Option<DateTime<Utc>>,
    /// Inclusive upper bound on creation time (RFC 3339).
    pub created_before: Option<DateTime<Utc>>,
    /// 1-based page number, default 1.
    pub page: Option<i64>,
    /// Page size, default 10, capped at 100.
    pub limit: Option<i64>,
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
}

impl ArticleListQuery {
    /// Splits the comma-separated tag parameter, dropping empty fragments.
    pub fn tag_names(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 100)
    }

    pub fn sort_by(&self) -> SortBy {
        self.sort_by.unwrap_or(SortBy::CreatedAt)
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order.unwrap_or(SortOrder::Desc)
    }
}

/// ArticleList
///
/// The pagination envelope for article listing. `total` counts every article
/// matching the filters and visibility scope, not just the returned page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ArticleList {
    pub items: Vec<ArticleResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl ArticleList {
    /// Computes the envelope fields from a fetched page. `limit` must be >= 1
    /// (the query normalization guarantees it).
    pub fn new(items: Vec<ArticleResponse>, total: i64, page: i64, limit: i64) -> Self {
        ArticleList {
            items,
            total,
            page,
            limit,
            total_pages: (total + limit - 1) / limit,
            has_next_page: page * limit < total,
            has_prev_page: page > 1,
        }
    }
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for POST /register. Every new account starts with role USER;
/// promotion to ADMIN is an operator action, not an API parameter.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// LoginRequest
///
/// Input payload for POST /login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// LoginResponse
///
/// Output of a successful login: the signed bearer token plus a user summary.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: UserResponse,
}

/// CreateArticleRequest
///
/// Input payload for POST /articles. The author is always the authenticated
/// requester; it cannot be supplied here. New articles default to private.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateArticleRequest {
    pub title: String,
    pub content: String,
    /// Tag names, reconciled to tag records on write (created when missing).
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

/// UpdateArticleRequest
///
/// Partial update payload for PUT /articles/{id}. Absent fields are left
/// untouched; a present `tags` list fully replaces the association.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateArticleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// UpdateUserRequest
///
/// Admin-only partial update for PATCH /admin/users/{id}. An invalid role value
/// is rejected at deserialization, before any handler runs.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}
