use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

/// Role
///
/// The RBAC field carried by every authenticated requester. Stored as TEXT in the
/// `users` table ('USER' or 'ADMIN') and parsed into this enum at the auth boundary,
/// so the policy functions below never compare raw strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Parses the stored role column. Unknown values degrade to the least
    /// privileged role.
    pub fn from_db(value: &str) -> Role {
        if value.eq_ignore_ascii_case("ADMIN") {
            Role::Admin
        } else {
            Role::User
        }
    }

    /// The TEXT value persisted in the `users.role` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

/// Requester
///
/// The typed requester context: the (identifier, role) pair resolved from a verified
/// token. Policy functions receive `Option<&Requester>`, where `None` is an
/// unauthenticated guest. Handlers build this value at the boundary; nothing below
/// the boundary ever touches a request object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub id: Uuid,
    pub role: Role,
}

/// Decision
///
/// Outcome of a policy check over an article that is known to exist. Absence is
/// decided by the caller before any permission check, so NOT-FOUND never reaches
/// the evaluator and a missing article is indistinguishable from one the requester
/// was never told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Forbidden,
}

/// read_decision
///
/// Whether the requester may read a single article.
///
/// * Public articles are readable by every requester, including guests.
/// * Private articles are readable by their author and by admins.
///
/// The admin read-bypass is a deliberate rule: an article visible to an admin in a
/// list query must also be readable by id, so the single-article rule and the list
/// scope agree.
pub fn read_decision(is_public: bool, author_id: Uuid, requester: Option<&Requester>) -> Decision {
    if is_public {
        return Decision::Allow;
    }
    match requester {
        Some(r) if r.role == Role::Admin || r.id == author_id => Decision::Allow,
        _ => Decision::Forbidden,
    }
}

/// write_decision
///
/// Whether the requester may update or delete an article. The rule is symmetric
/// for both operations: admins may act on any article, authors on their own.
/// Guests never reach this check (write routes require authentication).
pub fn write_decision(author_id: Uuid, requester: &Requester) -> Decision {
    if requester.role == Role::Admin || requester.id == author_id {
        Decision::Allow
    } else {
        Decision::Forbidden
    }
}

/// VisibilityScope
///
/// The base visibility clause for list queries, derived only from the requester
/// context. The repository translates this into SQL and ANDs every caller-supplied
/// filter with it, so explicit filters narrow but can never widen what a requester
/// is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityScope {
    /// Admins see every article regardless of the public flag.
    All,
    /// Authenticated users see public articles plus their own.
    PublicOrAuthor(Uuid),
    /// Guests see public articles only.
    PublicOnly,
}

/// visibility_scope
///
/// Maps a requester context to its visibility scope.
pub fn visibility_scope(requester: Option<&Requester>) -> VisibilityScope {
    match requester {
        Some(r) if r.role == Role::Admin => VisibilityScope::All,
        Some(r) => VisibilityScope::PublicOrAuthor(r.id),
        None => VisibilityScope::PublicOnly,
    }
}

/// scope_admits
///
/// The visibility predicate evaluated against one article. This is the in-memory
/// twin of the SQL clause the repository builds from the same scope; the two must
/// agree, and the property tests pin both to the matrix in the documentation.
pub fn scope_admits(scope: VisibilityScope, is_public: bool, author_id: Uuid) -> bool {
    match scope {
        VisibilityScope::All => true,
        VisibilityScope::PublicOrAuthor(id) => is_public || author_id == id,
        VisibilityScope::PublicOnly => is_public,
    }
}
