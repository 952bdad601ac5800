//! Token issuance, expiry and refresh rotation.

mod helpers;

use chrono::Duration;
use helpers::{TestApp, device, email};
use keyward_auth::{CheckOutcome, TokenStatus};
use keyward_core::error::ErrorKind;
use keyward_entity::user::UserRole;

#[tokio::test]
async fn test_issued_pair_verifies_until_expiry() {
    let app = TestApp::new();
    let addr = email("pair");
    let user = app.create_user(&addr, "pw", UserRole::Admin).await;
    let issuer = &app.engine.issuer;

    let pair = issuer.issue(&user).unwrap();
    let claims = issuer.verify_access(&pair.access_token).into_claims().unwrap();
    assert_eq!(claims.sub, user.id);
    assert_eq!(claims.role, UserRole::Admin);
    assert!(issuer.verify_refresh(&pair.refresh_token).is_valid());

    // Each secret signs only its own token type.
    assert_eq!(issuer.verify_refresh(&pair.access_token), TokenStatus::Invalid);
    assert_eq!(issuer.verify_access(&pair.refresh_token), TokenStatus::Invalid);

    app.advance(Duration::minutes(61));
    assert_eq!(issuer.verify_access(&pair.access_token), TokenStatus::Expired);
    assert!(issuer.verify_refresh(&pair.refresh_token).is_valid());

    app.advance(Duration::days(30));
    assert_eq!(issuer.verify_refresh(&pair.refresh_token), TokenStatus::Expired);
}

#[tokio::test]
async fn test_refresh_rotates_and_rejects_replay() {
    let app = TestApp::new();
    let addr = email("rotate");
    app.create_user(&addr, "pw", UserRole::User).await;
    let login = app.login(&addr, "pw", &device("phone")).await;

    let rotated = app.engine.auth.refresh(&login.tokens.refresh_token).await.unwrap();
    assert_eq!(rotated.session.id, login.session.id);
    assert_eq!(rotated.session.refresh_token, rotated.tokens.refresh_token);
    assert!(app.engine.blacklist.is_revoked(&login.tokens.refresh_token).await.unwrap());

    let replay = app.engine.auth.refresh(&login.tokens.refresh_token).await.unwrap_err();
    assert_eq!(replay.kind, ErrorKind::Unauthorized);
    assert_eq!(replay.message, "invalid session");

    assert!(app.engine.auth.refresh(&rotated.tokens.refresh_token).await.is_ok());
}

#[tokio::test]
async fn test_refresh_rejects_garbage_and_expired_tokens() {
    let app = TestApp::new();
    let addr = email("garbage");
    app.create_user(&addr, "pw", UserRole::User).await;
    let login = app.login(&addr, "pw", &device("phone")).await;

    let err = app.engine.auth.refresh("not.a.jwt").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);

    let err = app.engine.auth.refresh(&login.tokens.access_token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);

    app.advance(Duration::days(31));
    let err = app.engine.auth.refresh(&login.tokens.refresh_token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_check_valid_pair_and_rotation_on_expired_access() {
    let app = TestApp::new();
    let addr = email("check");
    app.create_user(&addr, "pw", UserRole::User).await;
    let login = app.login(&addr, "pw", &device("phone")).await;
    let tokens = &login.tokens;

    match app.engine.auth.check(&tokens.access_token, &tokens.refresh_token).await.unwrap() {
        CheckOutcome::Valid(claims) => assert_eq!(claims.sub, login.user.id),
        other => panic!("Expected a valid pair, got {other:?}"),
    }

    app.advance(Duration::minutes(90));
    let rotated = match app
        .engine
        .auth
        .check(&tokens.access_token, &tokens.refresh_token)
        .await
        .unwrap()
    {
        CheckOutcome::Rotated(session) => session,
        other => panic!("Expected rotation, got {other:?}"),
    };
    assert_ne!(rotated.tokens.refresh_token, tokens.refresh_token);

    let err = app
        .engine
        .auth
        .check(&tokens.access_token, &tokens.refresh_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_check_rejects_pair_after_logout() {
    let app = TestApp::new();
    let addr = email("checkout");
    app.create_user(&addr, "pw", UserRole::User).await;
    let login = app.login(&addr, "pw", &device("phone")).await;

    app.engine.auth.logout(&login.tokens.refresh_token).await.unwrap();

    let err = app
        .engine
        .auth
        .check(&login.tokens.access_token, &login.tokens.refresh_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials_uniformly() {
    let app = TestApp::new();
    let addr = email("creds");
    app.create_user(&addr, "right", UserRole::User).await;

    let wrong_password = app
        .engine
        .auth
        .login(&addr, "wrong", &device("phone"))
        .await
        .unwrap_err();
    let unknown_user = app
        .engine
        .auth
        .login("nobody@example.com", "right", &device("phone"))
        .await
        .unwrap_err();

    assert_eq!(wrong_password.kind, ErrorKind::Unauthorized);
    assert_eq!(wrong_password.message, unknown_user.message);
}
