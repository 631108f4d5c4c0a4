use article_portal::models::Tag;
use article_portal::policy::{
    Decision, Requester, Role, VisibilityScope, read_decision, scope_admits, visibility_scope,
    write_decision,
};
use article_portal::repository::{dedupe_tag_names, missing_tag_names};
use uuid::Uuid;

fn requester(id: Uuid, role: Role) -> Requester {
    Requester { id, role }
}

// --- Read decision ---

#[test]
fn public_article_readable_by_everyone() {
    let author = Uuid::new_v4();
    let stranger = requester(Uuid::new_v4(), Role::User);
    let admin = requester(Uuid::new_v4(), Role::Admin);
    let owner = requester(author, Role::User);

    // Guest, stranger, owner, and admin all read a public article.
    assert_eq!(read_decision(true, author, None), Decision::Allow);
    assert_eq!(read_decision(true, author, Some(&stranger)), Decision::Allow);
    assert_eq!(read_decision(true, author, Some(&owner)), Decision::Allow);
    assert_eq!(read_decision(true, author, Some(&admin)), Decision::Allow);
}

#[test]
fn private_article_readable_only_by_owner_and_admin() {
    let author = Uuid::new_v4();
    let owner = requester(author, Role::User);
    let stranger = requester(Uuid::new_v4(), Role::User);
    let admin = requester(Uuid::new_v4(), Role::Admin);

    assert_eq!(read_decision(false, author, Some(&owner)), Decision::Allow);
    assert_eq!(
        read_decision(false, author, Some(&stranger)),
        Decision::Forbidden
    );
    assert_eq!(read_decision(false, author, None), Decision::Forbidden);

    // The admin read-bypass is a pinned rule: reads agree with the list scope.
    assert_eq!(read_decision(false, author, Some(&admin)), Decision::Allow);
}

// --- Write decision ---

#[test]
fn write_allowed_for_owner_and_admin_only() {
    let author = Uuid::new_v4();
    let owner = requester(author, Role::User);
    let stranger = requester(Uuid::new_v4(), Role::User);
    let admin = requester(Uuid::new_v4(), Role::Admin);

    assert_eq!(write_decision(author, &owner), Decision::Allow);
    assert_eq!(write_decision(author, &admin), Decision::Allow);
    assert_eq!(write_decision(author, &stranger), Decision::Forbidden);
}

// --- Visibility scope ---

#[test]
fn scope_follows_requester_context() {
    let id = Uuid::new_v4();
    assert_eq!(visibility_scope(None), VisibilityScope::PublicOnly);
    assert_eq!(
        visibility_scope(Some(&requester(id, Role::User))),
        VisibilityScope::PublicOrAuthor(id)
    );
    assert_eq!(
        visibility_scope(Some(&requester(id, Role::Admin))),
        VisibilityScope::All
    );
}

#[test]
fn scope_admits_matrix() {
    let owner = Uuid::new_v4();
    let other = Uuid::new_v4();

    // Guest: public only.
    assert!(scope_admits(VisibilityScope::PublicOnly, true, owner));
    assert!(!scope_admits(VisibilityScope::PublicOnly, false, owner));

    // Authenticated: public articles plus their own private ones.
    let scope = VisibilityScope::PublicOrAuthor(owner);
    assert!(scope_admits(scope, true, other));
    assert!(scope_admits(scope, false, owner));
    assert!(!scope_admits(scope, false, other));

    // Admin: everything.
    assert!(scope_admits(VisibilityScope::All, false, other));
    assert!(scope_admits(VisibilityScope::All, true, owner));
}

#[test]
fn role_parsing_defaults_to_least_privilege() {
    assert_eq!(Role::from_db("ADMIN"), Role::Admin);
    assert_eq!(Role::from_db("admin"), Role::Admin);
    assert_eq!(Role::from_db("USER"), Role::User);
    // Unknown values must not grant anything.
    assert_eq!(Role::from_db("superuser"), Role::User);
    assert_eq!(Role::from_db(""), Role::User);
}

// --- Tag reconciliation helpers ---

#[test]
fn dedupe_preserves_first_occurrence_order() {
    let names = vec![
        "rust".to_string(),
        "web".to_string(),
        "rust".to_string(),
        "  web  ".to_string(),
        "".to_string(),
        "   ".to_string(),
        "api".to_string(),
    ];
    assert_eq!(dedupe_tag_names(&names), vec!["rust", "web", "api"]);
}

#[test]
fn missing_names_empty_when_all_exist() {
    let wanted = vec!["a".to_string(), "b".to_string()];
    let existing = vec![
        Tag {
            id: Uuid::new_v4(),
            name: "a".to_string(),
        },
        Tag {
            id: Uuid::new_v4(),
            name: "b".to_string(),
        },
    ];

    // Everything already persisted: the second reconciliation creates nothing.
    assert!(missing_tag_names(&wanted, &existing).is_empty());
}

#[test]
fn missing_names_reports_only_the_gap() {
    let wanted = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let existing = vec![Tag {
        id: Uuid::new_v4(),
        name: "b".to_string(),
    }];
    assert_eq!(missing_tag_names(&wanted, &existing), vec!["a", "c"]);
}
