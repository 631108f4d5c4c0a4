use article_portal::auth::{decode_token, hash_password, issue_token, verify_password};
use article_portal::error::ApiError;
use tokio::test;
use uuid::Uuid;

const SECRET: &str = "super-secure-test-secret-value-local";

// --- Token issue / validation ---

#[test]
async fn issued_token_round_trips() {
    let user_id = Uuid::new_v4();
    let token = issue_token(user_id, "ADMIN", SECRET).expect("token should sign");

    let claims = decode_token(&token, SECRET).expect("token should validate");
    assert_eq!(claims.sub, user_id);
    assert_eq!(claims.role, "ADMIN");
    assert!(claims.exp > claims.iat);
}

#[test]
async fn token_rejected_with_wrong_secret() {
    let token = issue_token(Uuid::new_v4(), "USER", SECRET).unwrap();
    let result = decode_token(&token, "a-completely-different-secret");
    assert!(matches!(result, Err(ApiError::Unauthorized(_))));
}

#[test]
async fn garbage_token_rejected() {
    let result = decode_token("not-a-jwt-at-all", SECRET);
    assert!(matches!(result, Err(ApiError::Unauthorized(_))));
}

// --- Password hashing ---

#[test]
async fn password_hash_verifies_and_rejects() {
    let hash = hash_password("hunter2-but-longer".to_string())
        .await
        .expect("hashing should succeed");

    // The stored value is a PHC string, never the plaintext.
    assert!(hash.starts_with("$argon2"));

    assert!(
        verify_password("hunter2-but-longer".to_string(), hash.clone())
            .await
            .unwrap()
    );
    assert!(
        !verify_password("wrong-password".to_string(), hash)
            .await
            .unwrap()
    );
}

#[test]
async fn corrupt_stored_hash_counts_as_mismatch() {
    let ok = verify_password("whatever".to_string(), "not-a-phc-string".to_string())
        .await
        .unwrap();
    assert!(!ok);
}

#[test]
async fn same_password_hashes_differently() {
    // Fresh salt per hash: equal inputs must not produce equal hashes.
    let first = hash_password("correct horse battery".to_string())
        .await
        .unwrap();
    let second = hash_password("correct horse battery".to_string())
        .await
        .unwrap();
    assert_ne!(first, second);
}
