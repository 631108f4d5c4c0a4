use article_portal::models::{
    ArticleList, ArticleListQuery, ArticleResponse, SortBy, SortOrder, UpdateArticleRequest,
    UpdateUserRequest,
};
use article_portal::policy::Role;

// --- Pagination envelope arithmetic ---

#[test]
fn envelope_arithmetic_last_partial_page() {
    // total=25, limit=10, page=3: the documented boundary case.
    let list = ArticleList::new(vec![], 25, 3, 10);
    assert_eq!(list.total_pages, 3);
    assert!(!list.has_next_page);
    assert!(list.has_prev_page);
}

#[test]
fn envelope_arithmetic_first_page() {
    let list = ArticleList::new(vec![], 25, 1, 10);
    assert_eq!(list.total_pages, 3);
    assert!(list.has_next_page);
    assert!(!list.has_prev_page);
}

#[test]
fn envelope_arithmetic_exact_fit_and_empty() {
    // An exact multiple does not produce a phantom page.
    let exact = ArticleList::new(vec![], 20, 2, 10);
    assert_eq!(exact.total_pages, 2);
    assert!(!exact.has_next_page);

    let empty = ArticleList::new(vec![], 0, 1, 10);
    assert_eq!(empty.total_pages, 0);
    assert!(!empty.has_next_page);
    assert!(!empty.has_prev_page);
}

// --- Query parameter normalization ---

#[test]
fn query_defaults_and_clamping() {
    let query = ArticleListQuery::default();
    assert_eq!(query.page(), 1);
    assert_eq!(query.limit(), 10);
    assert_eq!(query.sort_by(), SortBy::CreatedAt);
    assert_eq!(query.sort_order(), SortOrder::Desc);

    let wild = ArticleListQuery {
        page: Some(-3),
        limit: Some(5000),
        ..ArticleListQuery::default()
    };
    assert_eq!(wild.page(), 1);
    assert_eq!(wild.limit(), 100);
}

#[test]
fn tag_parameter_splits_and_drops_empty_fragments() {
    let query = ArticleListQuery {
        tags: Some("rust, web,,rust ,".to_string()),
        ..ArticleListQuery::default()
    };
    assert_eq!(query.tag_names(), vec!["rust", "web", "rust"]);
}

#[test]
fn sort_params_deserialize_from_camel_case() {
    let query: ArticleListQuery =
        serde_json::from_str(r#"{"sortBy": "updatedAt", "sortOrder": "asc"}"#).unwrap();
    assert_eq!(query.sort_by(), SortBy::UpdatedAt);
    assert_eq!(query.sort_order(), SortOrder::Asc);
}

// --- Wire format ---

#[test]
fn article_response_serializes_camel_case() {
    let json = serde_json::to_string(&ArticleResponse::default()).unwrap();
    assert!(json.contains(r#""isPublic""#));
    assert!(json.contains(r#""createdAt""#));
    assert!(!json.contains("is_public"));
}

#[test]
fn envelope_serializes_camel_case() {
    let json = serde_json::to_string(&ArticleList::new(vec![], 25, 3, 10)).unwrap();
    assert!(json.contains(r#""totalPages":3"#));
    assert!(json.contains(r#""hasNextPage":false"#));
    assert!(json.contains(r#""hasPrevPage":true"#));
}

#[test]
fn update_request_omits_absent_fields() {
    let partial = UpdateArticleRequest {
        title: Some("New Title Only".to_string()),
        ..UpdateArticleRequest::default()
    };
    let json = serde_json::to_string(&partial).unwrap();
    assert!(json.contains(r#""title":"New Title Only""#));
    assert!(!json.contains("content"));
    assert!(!json.contains("tags"));
}

#[test]
fn role_round_trips_as_uppercase() {
    assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), r#""ADMIN""#);
    assert_eq!(
        serde_json::from_str::<Role>(r#""USER""#).unwrap(),
        Role::User
    );
}

#[test]
fn invalid_role_is_rejected_at_deserialization() {
    // A bad role value never reaches a handler.
    let result = serde_json::from_str::<UpdateUserRequest>(r#"{"role": "ROOT"}"#);
    assert!(result.is_err());
}
