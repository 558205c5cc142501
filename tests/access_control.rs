//! Black-box tests driving the full router in-process.
//!
//! These cover the properties that hold before any data access: session
//! precedence (401 before 403), role guards, admin-mode resolution, and the
//! login rate limiter. Admin and client scopes resolve without database
//! queries, and every guard runs before a handler touches the pool.

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use fleet_api_rust::access::Role;
use fleet_api_rust::auth::{generate_jwt, Claims, SESSION_COOKIE_NAME};
use fleet_api_rust::routes::app;

fn session_cookie_for(user_id: i64, email: &str, role: Role) -> String {
    let claims = Claims::new(user_id, email.to_string(), role);
    let token = generate_jwt(&claims).expect("token generation");
    format!("{}={}", SESSION_COOKIE_NAME, token)
}

async fn body_json(response: axum::response::Response) -> Result<Value> {
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn missing_session_is_unauthorized_never_forbidden() -> Result<()> {
    // Even on an admin-only endpoint the unauthenticated answer is 401.
    for uri in ["/api/cars", "/api/admin/audit-log", "/api/auth/whoami"] {
        let res = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty())?)
            .await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "uri: {}", uri);

        let body = body_json(res).await?;
        assert_eq!(body["code"], "UNAUTHORIZED");
    }
    Ok(())
}

#[tokio::test]
async fn garbage_token_is_unauthorized() -> Result<()> {
    let res = app()
        .oneshot(
            Request::builder()
                .uri("/api/auth/whoami")
                .header(header::COOKIE, format!("{}=not-a-jwt", SESSION_COOKIE_NAME))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn role_outside_permitted_set_is_forbidden() -> Result<()> {
    let cookie = session_cookie_for(5, "client@example.com", Role::Client);

    let res = app()
        .oneshot(
            Request::builder()
                .uri("/api/admin/audit-log")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let body = body_json(res).await?;
    assert_eq!(body["code"], "FORBIDDEN");
    Ok(())
}

#[tokio::test]
async fn non_admin_enter_company_is_forbidden() -> Result<()> {
    let cookie = session_cookie_for(5, "client@example.com", Role::Client);

    let res = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/admin/enter-company")
                .header(header::COOKIE, &cookie)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"companyId":42}"#))?,
        )
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn admin_mode_params_are_ignored_for_non_admins() -> Result<()> {
    let cookie = session_cookie_for(5, "client@example.com", Role::Client);

    let res = app()
        .oneshot(
            Request::builder()
                .uri("/api/auth/whoami?admin_mode=true&company_id=42")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await?;
    assert_eq!(body["data"]["scope"]["role"], "client");
    assert_eq!(body["data"]["adminMode"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn admin_mode_params_take_effect_for_admins() -> Result<()> {
    let cookie = session_cookie_for(1, "admin@example.com", Role::Admin);

    let res = app()
        .oneshot(
            Request::builder()
                .uri("/api/auth/whoami?admin_mode=true&company_id=42")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await?;
    assert_eq!(body["data"]["adminMode"]["companyId"], 42);
    assert_eq!(body["data"]["user"]["role"], "admin");
    Ok(())
}

#[tokio::test]
async fn admin_without_mode_has_no_company_pinned() -> Result<()> {
    let cookie = session_cookie_for(1, "admin@example.com", Role::Admin);

    let res = app()
        .oneshot(
            Request::builder()
                .uri("/api/auth/whoami")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await?;
    assert_eq!(body["data"]["adminMode"], Value::Null);
    assert_eq!(body["data"]["scope"]["companyId"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn login_rate_limit_trips_with_retry_after() -> Result<()> {
    // Distinct forwarded IP so the window is private to this test.
    let ip = "198.51.100.77";
    let login = |_n: u32| {
        app().oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header("x-forwarded-for", ip)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"email":"admin@example.com","password":"wrong"}"#,
                ))
                .expect("request"),
        )
    };

    // Exhaust the window (10/minute by default). The attempts themselves may
    // fail on credentials or a missing database; only the counter matters.
    for n in 0..10 {
        let res = login(n).await?;
        assert_ne!(
            res.status(),
            StatusCode::TOO_MANY_REQUESTS,
            "attempt {} should not be limited",
            n + 1
        );
    }

    let res = login(10).await?;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

    let retry_after: u64 = res
        .headers()
        .get(header::RETRY_AFTER)
        .expect("Retry-After header")
        .to_str()?
        .parse()?;
    assert!(retry_after > 0);
    assert!(retry_after <= 60);

    let body = body_json(res).await?;
    assert_eq!(body["code"], "TOO_MANY_REQUESTS");
    Ok(())
}

#[tokio::test]
async fn failed_login_report_rate_limit_trips() -> Result<()> {
    let ip = "198.51.100.88";
    let report = || {
        app().oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login-failed")
                .header("x-forwarded-for", ip)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"email":"someone@example.com"}"#))
                .expect("request"),
        )
    };

    // 20 per 5 minutes by default.
    for _ in 0..20 {
        let res = report().await?;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = report().await?;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = res
        .headers()
        .get(header::RETRY_AFTER)
        .expect("Retry-After header")
        .to_str()?
        .parse()?;
    assert!(retry_after > 0);
    Ok(())
}

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let res = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;

    // OK or SERVICE_UNAVAILABLE acceptable as a basic liveness check
    assert!(
        res.status() == StatusCode::OK || res.status() == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status: {}",
        res.status()
    );

    let _body = body_json(res).await?;
    Ok(())
}
