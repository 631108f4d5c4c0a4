use crate::error::ApiError;
use crate::models::{
    ArticleList, ArticleListQuery, ArticleResponse, ArticleRow, CreateArticleRequest, Tag,
    UpdateArticleRequest, UpdateUserRequest, User,
};
use crate::policy::VisibilityScope;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction, query_builder::QueryBuilder};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations, allowing the
/// handlers to interact with the data layer without knowing the specific
/// implementation (Postgres, in-memory mock, etc.). There is no ambient store
/// handle anywhere: the only way to reach the database is through a value of
/// this trait passed in via the application state.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    /// Creates a user with role USER. A duplicate email surfaces as Conflict.
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, ApiError>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError>;
    /// Boundary convenience for login and the author-email list filter.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError>;
    async fn list_users(&self) -> Result<Vec<User>, ApiError>;
    /// Partial update of email and/or role. A duplicate email surfaces as Conflict.
    async fn update_user(&self, id: Uuid, req: UpdateUserRequest)
    -> Result<Option<User>, ApiError>;
    async fn delete_user(&self, id: Uuid) -> Result<bool, ApiError>;

    // --- Articles ---
    /// Creates an article plus its tag links in a single transaction: tag
    /// reconciliation, the article insert, and the link insert either all
    /// commit or none do.
    async fn create_article(
        &self,
        author_id: Uuid,
        req: CreateArticleRequest,
    ) -> Result<ArticleResponse, ApiError>;
    /// Fetches an article with author and tags, with no visibility check. The
    /// caller runs the policy decision on the returned record.
    async fn get_article(&self, id: Uuid) -> Result<Option<ArticleResponse>, ApiError>;
    /// Filtered, paginated, sorted listing. `scope` is the requester's base
    /// visibility clause; every caller filter is ANDed with it. `author_id` is
    /// the already-resolved author filter (id or email lookup happens at the
    /// boundary).
    async fn list_articles(
        &self,
        query: &ArticleListQuery,
        author_id: Option<Uuid>,
        scope: VisibilityScope,
    ) -> Result<ArticleList, ApiError>;
    /// All articles owned by one author, public and private alike.
    async fn get_articles_by_author(
        &self,
        author_id: Uuid,
    ) -> Result<Vec<ArticleResponse>, ApiError>;
    /// Partial update. A present tag list fully replaces the association; the
    /// author reference is never touched.
    async fn update_article(
        &self,
        id: Uuid,
        req: UpdateArticleRequest,
    ) -> Result<Option<ArticleResponse>, ApiError>;
    /// Hard delete. Tag links go with the article; tags themselves persist.
    async fn delete_article(&self, id: Uuid) -> Result<bool, ApiError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Tag Reconciliation Helpers (pure) ---

/// dedupe_tag_names
///
/// Normalizes a caller-supplied tag name list: trims whitespace, drops empty
/// fragments, and removes duplicates while preserving first-occurrence order.
pub fn dedupe_tag_names(names: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let trimmed = name.trim();
        if trimmed.is_empty() || seen.iter().any(|s| s == trimmed) {
            continue;
        }
        seen.push(trimmed.to_string());
    }
    seen
}

/// missing_tag_names
///
/// The subset of `wanted` with no matching record in `existing`. When every
/// wanted name is already persisted this returns empty, which is what makes
/// reconciliation idempotent: the second identical call creates nothing.
pub fn missing_tag_names(wanted: &[String], existing: &[Tag]) -> Vec<String> {
    wanted
        .iter()
        .filter(|name| !existing.iter().any(|tag| &tag.name == *name))
        .cloned()
        .collect()
}

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

const ARTICLE_SELECT: &str = "SELECT a.id, a.title, a.content, a.is_public, a.created_at, \
     a.updated_at, u.id AS author_id, u.email AS author_email \
     FROM articles a JOIN users u ON u.id = a.author_id";

const USER_COLUMNS: &str = "id, email, password_hash, role, created_at, updated_at";

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// tags_for_articles
    ///
    /// Batched tag fetch for a page of articles: one query, grouped by article id.
    async fn tags_for_articles(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Tag>>, ApiError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(Uuid, Uuid, String)> = sqlx::query_as(
            "SELECT l.article_id, t.id, t.name \
             FROM article_tags l JOIN tags t ON t.id = l.tag_id \
             WHERE l.article_id = ANY($1) ORDER BY t.name ASC",
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for (article_id, tag_id, name) in rows {
            grouped
                .entry(article_id)
                .or_default()
                .push(Tag { id: tag_id, name });
        }
        Ok(grouped)
    }

    /// reconcile_tags
    ///
    /// Maps tag names to persisted tag records inside the caller's transaction:
    /// one batched lookup for the deduplicated set, then one insert per missing
    /// name. Idempotent for names that already exist. A concurrent creation of
    /// the same name loses to the unique constraint and surfaces as Conflict,
    /// which the caller may retry.
    async fn reconcile_tags(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        names: &[String],
    ) -> Result<Vec<Tag>, ApiError> {
        let wanted = dedupe_tag_names(names);
        if wanted.is_empty() {
            return Ok(vec![]);
        }

        let mut tags: Vec<Tag> =
            sqlx::query_as("SELECT id, name FROM tags WHERE name = ANY($1)")
                .bind(wanted.clone())
                .fetch_all(&mut **tx)
                .await?;

        for name in missing_tag_names(&wanted, &tags) {
            let tag: Tag =
                sqlx::query_as("INSERT INTO tags (id, name) VALUES ($1, $2) RETURNING id, name")
                    .bind(Uuid::new_v4())
                    .bind(&name)
                    .fetch_one(&mut **tx)
                    .await
                    .map_err(|e| ApiError::db(e, "Tag was created concurrently, retry"))?;
            tags.push(tag);
        }

        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    /// Replaces the tag links of an article with the given set.
    async fn relink_tags(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        article_id: Uuid,
        tags: &[Tag],
    ) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM article_tags WHERE article_id = $1")
            .bind(article_id)
            .execute(&mut **tx)
            .await?;

        if !tags.is_empty() {
            sqlx::query("INSERT INTO article_tags (article_id, tag_id) SELECT $1, unnest($2::uuid[])")
                .bind(article_id)
                .bind(tags.iter().map(|t| t.id).collect::<Vec<_>>())
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }
}

/// push_article_filters
///
/// Appends the WHERE body shared by the listing and count queries, using
/// QueryBuilder bindings throughout so no caller value is ever interpolated.
/// The visibility scope comes first; every caller filter is ANDed after it and
/// can only narrow the result. A guest combining that base clause with an
/// explicit `isPublic=false` filter therefore always gets an empty set.
fn push_article_filters(
    builder: &mut QueryBuilder<Postgres>,
    query: &ArticleListQuery,
    tag_names: &[String],
    author_id: Option<Uuid>,
    scope: VisibilityScope,
) {
    match scope {
        VisibilityScope::All => {
            builder.push("TRUE");
        }
        VisibilityScope::PublicOrAuthor(id) => {
            builder.push("(a.is_public = TRUE OR a.author_id = ");
            builder.push_bind(id);
            builder.push(")");
        }
        VisibilityScope::PublicOnly => {
            builder.push("a.is_public = TRUE");
        }
    }

    // OR semantics across tag names, AND with everything else.
    if !tag_names.is_empty() {
        builder.push(
            " AND EXISTS (SELECT 1 FROM article_tags l JOIN tags t ON t.id = l.tag_id \
             WHERE l.article_id = a.id AND t.name = ANY(",
        );
        builder.push_bind(tag_names.to_vec());
        builder.push("))");
    }

    if let Some(id) = author_id {
        builder.push(" AND a.author_id = ");
        builder.push_bind(id);
    }

    if let Some(flag) = query.is_public {
        builder.push(" AND a.is_public = ");
        builder.push_bind(flag);
    }

    if let Some(search) = &query.search {
        // Case-insensitive search across title and content.
        let pattern = format!("%{}%", search);
        builder.push(" AND (a.title ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR a.content ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    if let Some(after) = query.created_after {
        builder.push(" AND a.created_at >= ");
        builder.push_bind(after);
    }

    if let Some(before) = query.created_before {
        builder.push(" AND a.created_at <= ");
        builder.push_bind(before);
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, ApiError> {
        sqlx::query_as(
            "INSERT INTO users (id, email, password_hash, role, created_at, updated_at) \
             VALUES ($1, $2, $3, 'USER', NOW(), NOW()) \
             RETURNING id, email, password_hash, role, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::db(e, "User with this email already exists"))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        let users = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Uses COALESCE so only the provided fields change; `updated_at` always moves.
    async fn update_user(
        &self,
        id: Uuid,
        req: UpdateUserRequest,
    ) -> Result<Option<User>, ApiError> {
        sqlx::query_as(
            "UPDATE users \
             SET email = COALESCE($2, email), \
                 role = COALESCE($3, role), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING id, email, password_hash, role, created_at, updated_at",
        )
        .bind(id)
        .bind(req.email)
        .bind(req.role.map(|r| r.as_str().to_string()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApiError::db(e, "User with this email already exists"))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- ARTICLES ---

    async fn create_article(
        &self,
        author_id: Uuid,
        req: CreateArticleRequest,
    ) -> Result<ArticleResponse, ApiError> {
        let mut tx = self.pool.begin().await?;

        let tags = self
            .reconcile_tags(&mut tx, req.tags.as_deref().unwrap_or(&[]))
            .await?;

        // CTE so the insert and the author join happen in one round trip.
        let row: ArticleRow = sqlx::query_as(
            "WITH inserted AS ( \
                 INSERT INTO articles (id, author_id, title, content, is_public, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, NOW(), NOW()) \
                 RETURNING id, author_id, title, content, is_public, created_at, updated_at \
             ) \
             SELECT i.id, i.title, i.content, i.is_public, i.created_at, i.updated_at, \
                    u.id AS author_id, u.email AS author_email \
             FROM inserted i JOIN users u ON u.id = i.author_id",
        )
        .bind(Uuid::new_v4())
        .bind(author_id)
        .bind(&req.title)
        .bind(&req.content)
        .bind(req.is_public.unwrap_or(false))
        .fetch_one(&mut *tx)
        .await?;

        if !tags.is_empty() {
            sqlx::query("INSERT INTO article_tags (article_id, tag_id) SELECT $1, unnest($2::uuid[])")
                .bind(row.id)
                .bind(tags.iter().map(|t| t.id).collect::<Vec<_>>())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(ArticleResponse::from_row(row, tags))
    }

    async fn get_article(&self, id: Uuid) -> Result<Option<ArticleResponse>, ApiError> {
        let row: Option<ArticleRow> = sqlx::query_as(&format!("{ARTICLE_SELECT} WHERE a.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let tags = self
            .tags_for_articles(&[row.id])
            .await?
            .remove(&row.id)
            .unwrap_or_default();
        Ok(Some(ArticleResponse::from_row(row, tags)))
    }

    async fn list_articles(
        &self,
        query: &ArticleListQuery,
        author_id: Option<Uuid>,
        scope: VisibilityScope,
    ) -> Result<ArticleList, ApiError> {
        let page = query.page();
        let limit = query.limit();
        let tag_names = query.tag_names();

        // Count over the same WHERE body as the page query.
        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM articles a WHERE ");
        push_article_filters(&mut count_builder, query, &tag_names, author_id, scope);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("{ARTICLE_SELECT} WHERE "));
        push_article_filters(&mut builder, query, &tag_names, author_id, scope);

        // Sort field and direction come from enums, never from raw caller input.
        builder.push(" ORDER BY ");
        builder.push(query.sort_by().column());
        builder.push(" ");
        builder.push(query.sort_order().sql());
        builder.push(" LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind((page - 1) * limit);

        let rows: Vec<ArticleRow> = builder.build_query_as().fetch_all(&self.pool).await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut tag_map = self.tags_for_articles(&ids).await?;
        let items = rows
            .into_iter()
            .map(|row| {
                let tags = tag_map.remove(&row.id).unwrap_or_default();
                ArticleResponse::from_row(row, tags)
            })
            .collect();

        Ok(ArticleList::new(items, total, page, limit))
    }

    async fn get_articles_by_author(
        &self,
        author_id: Uuid,
    ) -> Result<Vec<ArticleResponse>, ApiError> {
        let rows: Vec<ArticleRow> = sqlx::query_as(&format!(
            "{ARTICLE_SELECT} WHERE a.author_id = $1 ORDER BY a.created_at DESC"
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut tag_map = self.tags_for_articles(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let tags = tag_map.remove(&row.id).unwrap_or_default();
                ArticleResponse::from_row(row, tags)
            })
            .collect())
    }

    /// COALESCE keeps absent fields untouched. `author_id` is deliberately not
    /// in the SET list: authorship is immutable after creation.
    async fn update_article(
        &self,
        id: Uuid,
        req: UpdateArticleRequest,
    ) -> Result<Option<ArticleResponse>, ApiError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<ArticleRow> = sqlx::query_as(
            "WITH updated AS ( \
                 UPDATE articles \
                 SET title = COALESCE($2, title), \
                     content = COALESCE($3, content), \
                     is_public = COALESCE($4, is_public), \
                     updated_at = NOW() \
                 WHERE id = $1 \
                 RETURNING id, author_id, title, content, is_public, created_at, updated_at \
             ) \
             SELECT i.id, i.title, i.content, i.is_public, i.created_at, i.updated_at, \
                    u.id AS author_id, u.email AS author_email \
             FROM updated i JOIN users u ON u.id = i.author_id",
        )
        .bind(id)
        .bind(req.title)
        .bind(req.content)
        .bind(req.is_public)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            // Nothing updated; dropping the transaction rolls it back.
            return Ok(None);
        };

        let tags = match req.tags {
            // Replace semantics: clear the old links, connect the new set.
            Some(names) => {
                let tags = self.reconcile_tags(&mut tx, &names).await?;
                self.relink_tags(&mut tx, row.id, &tags).await?;
                tags
            }
            None => {
                sqlx::query_as(
                    "SELECT t.id, t.name \
                     FROM article_tags l JOIN tags t ON t.id = l.tag_id \
                     WHERE l.article_id = $1 ORDER BY t.name ASC",
                )
                .bind(row.id)
                .fetch_all(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;
        Ok(Some(ArticleResponse::from_row(row, tags)))
    }

    async fn delete_article(&self, id: Uuid) -> Result<bool, ApiError> {
        // Links are removed by ON DELETE CASCADE; tags persist.
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
