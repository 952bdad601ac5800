//! Emailed one-time code scenarios.

mod helpers;

use std::sync::Arc;

use chrono::Duration;
use helpers::{FlakyCache, TestApp, device, email};
use keyward_auth::LoginOutcome;
use keyward_cache::keys;
use keyward_core::error::ErrorKind;
use keyward_core::traits::CacheProvider;
use uuid::Uuid;

async fn start_login(app: &TestApp, addr: &str) -> Uuid {
    match app.engine.auth.login(addr, "pw", &device("phone")).await.unwrap() {
        LoginOutcome::TwoFactorRequired { user_id, .. } => user_id,
        other => panic!("Expected a code challenge, got {other:?}"),
    }
}

#[tokio::test]
async fn test_login_with_code_creates_session() {
    let app = TestApp::new();
    let addr = email("otp");
    let user = app.create_two_factor_user(&addr, "pw").await;

    let user_id = start_login(&app, &addr).await;
    assert_eq!(user_id, user.id);
    assert_eq!(app.engine.sessions.get_active_sessions_count(user.id).await.unwrap(), 0);

    let code = app.notifier.first_code_for(&addr).await;
    let session = app
        .engine
        .auth
        .complete_two_factor(user_id, &code, &device("phone"))
        .await
        .unwrap();

    assert_eq!(session.user.id, user.id);
    assert_eq!(app.engine.sessions.get_active_sessions_count(user.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_code_is_single_use() {
    let app = TestApp::new();
    let addr = email("once");
    app.create_two_factor_user(&addr, "pw").await;
    let user_id = start_login(&app, &addr).await;
    let code = app.notifier.first_code_for(&addr).await;

    app.engine
        .auth
        .complete_two_factor(user_id, &code, &device("phone"))
        .await
        .unwrap();
    let err = app
        .engine
        .auth
        .complete_two_factor(user_id, &code, &device("phone"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::BadRequest);
}

#[tokio::test]
async fn test_wrong_guesses_lock_out_even_the_right_code() {
    let app = TestApp::new();
    let addr = email("lockout");
    app.create_two_factor_user(&addr, "pw").await;
    let user_id = start_login(&app, &addr).await;
    let code = app.notifier.first_code_for(&addr).await;
    let wrong = if code == "000000" { "111111" } else { "000000" };

    for _ in 0..app.config.two_factor.max_attempts {
        let err = app.engine.two_factor.verify_code(user_id, wrong).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadRequest);
    }

    let err = app.engine.two_factor.verify_code(user_id, &code).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::TooManyRequests);
}

#[tokio::test]
async fn test_expired_code_is_rejected() {
    let app = TestApp::new();
    let addr = email("late");
    app.create_two_factor_user(&addr, "pw").await;
    let user_id = start_login(&app, &addr).await;
    let code = app.notifier.first_code_for(&addr).await;

    app.advance(Duration::minutes(app.config.two_factor.code_ttl_minutes as i64 + 1));

    let err = app
        .engine
        .auth
        .complete_two_factor(user_id, &code, &device("phone"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::BadRequest);
}

#[tokio::test]
async fn test_resend_honours_cooldown() {
    let app = TestApp::new();
    let addr = email("resend");
    app.create_two_factor_user(&addr, "pw").await;
    let user_id = start_login(&app, &addr).await;

    app.engine.auth.resend_two_factor(user_id).await.unwrap();
    let err = app.engine.auth.resend_two_factor(user_id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::TooManyRequests);

    // The resent code replaces the first one.
    let code = app.notifier.nth_code_for(&addr, 2).await;
    assert!(app.engine.auth.complete_two_factor(user_id, &code, &device("phone")).await.is_ok());
}

#[tokio::test]
async fn test_issue_does_not_depend_on_standalone_expire() {
    let cache = Arc::new(FlakyCache::new(0));
    cache.break_expire();
    let app = TestApp::with_cache(cache.clone());
    let addr = email("expire");
    let user = app.create_two_factor_user(&addr, "pw").await;

    let user_id = start_login(&app, &addr).await;
    assert_eq!(user_id, user.id);
    let code = app.notifier.first_code_for(&addr).await;
    assert!(app.engine.auth.complete_two_factor(user_id, &code, &device("phone")).await.is_ok());
}

#[tokio::test]
async fn test_failed_issue_leaves_no_counter_behind() {
    let cache = Arc::new(FlakyCache::new(0));
    let app = TestApp::with_cache(cache.clone());
    let user = app.create_two_factor_user(&email("counter"), "pw").await;
    let counter = keys::two_factor_issued(user.id);

    cache.fail_next(1);
    let err = app.engine.two_factor.issue_code(user.id, None).await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(cache.get(&counter).await.unwrap(), None);

    for _ in 0..app.config.two_factor.max_codes_per_hour {
        app.engine.two_factor.issue_code(user.id, None).await.unwrap();
    }
    let err = app.engine.two_factor.issue_code(user.id, None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::TooManyRequests);
}

#[tokio::test]
async fn test_out_of_range_code_lifetime_is_bad_request() {
    let app = TestApp::new();
    let user = app.create_two_factor_user(&email("ttl"), "pw").await;

    let err = app.engine.two_factor.issue_code(user.id, Some(u64::MAX)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::BadRequest);
    assert!(app.engine.two_factor.issue_code(user.id, Some(5)).await.is_ok());
}
