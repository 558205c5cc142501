use axum::{
    middleware::from_fn,
    routing::{delete, get, patch, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{elevated, protected, public};
use crate::middleware::{request_context, session_auth};

/// Assemble the full application router.
///
/// Tiering: public routes carry no session; everything under `/api` passes
/// the session middleware (401) and then the context middleware (scope +
/// admin-mode) before any handler guard (403) runs.
pub fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_auth_routes())
        // Session-protected API
        .merge(protected_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn public_auth_routes() -> Router {
    use public::auth;

    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/login-failed", post(auth::login_failed))
}

fn protected_routes() -> Router {
    Router::new()
        .merge(auth_routes())
        .merge(car_routes())
        .merge(booking_routes())
        .merge(payment_routes())
        .merge(company_routes())
        .merge(location_routes())
        .merge(reference_routes())
        .merge(user_routes())
        .merge(admin_routes())
        // Inner layer runs second: session resolution strictly precedes
        // scope resolution, so Unauthorized always wins over Forbidden.
        .layer(from_fn(request_context))
        .layer(from_fn(session_auth))
}

fn auth_routes() -> Router {
    use protected::auth;

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami))
        .route("/api/auth/logout", post(auth::logout))
}

fn car_routes() -> Router {
    use protected::cars;

    Router::new()
        .route("/api/cars", get(cars::list).post(cars::create))
        .route(
            "/api/cars/:id",
            get(cars::get).put(cars::update).delete(cars::delete),
        )
}

fn booking_routes() -> Router {
    use protected::bookings;

    Router::new()
        .route("/api/bookings", get(bookings::list).post(bookings::create))
        .route(
            "/api/bookings/:id",
            get(bookings::get)
                .put(bookings::update)
                .delete(bookings::delete),
        )
}

fn payment_routes() -> Router {
    use protected::payments;

    Router::new()
        .route("/api/payments", get(payments::list).post(payments::create))
        .route(
            "/api/payments/:id",
            get(payments::get).put(payments::update),
        )
        .route("/api/payments/:id/correct", patch(payments::correct))
}

fn company_routes() -> Router {
    use protected::companies;

    Router::new()
        .route(
            "/api/companies",
            get(companies::list).post(companies::create),
        )
        .route(
            "/api/companies/:id",
            get(companies::get)
                .put(companies::update)
                .delete(companies::delete),
        )
}

fn location_routes() -> Router {
    use protected::locations;

    Router::new()
        .route(
            "/api/locations",
            get(locations::list).post(locations::create),
        )
        .route(
            "/api/locations/:id",
            get(locations::get)
                .put(locations::update)
                .delete(locations::delete),
        )
}

fn reference_routes() -> Router {
    use protected::reference;

    Router::new()
        .route(
            "/api/reference/brands",
            get(reference::list_brands).post(reference::create_brand),
        )
        .route(
            "/api/reference/brands/:id",
            delete(reference::delete_brand),
        )
        .route(
            "/api/reference/currencies",
            get(reference::list_currencies).post(reference::create_currency),
        )
        .route(
            "/api/reference/currencies/:id",
            delete(reference::delete_currency),
        )
}

fn user_routes() -> Router {
    use protected::users;

    Router::new()
        .route("/api/users", get(users::list).post(users::create))
        .route(
            "/api/users/:id",
            get(users::get).put(users::update).delete(users::delete),
        )
}

fn admin_routes() -> Router {
    use elevated::admin;

    Router::new()
        .route("/api/admin/enter-company", post(admin::enter_company))
        .route("/api/admin/exit-company", post(admin::exit_company))
        .route(
            "/api/admin/audit-log",
            get(admin::list_audit_log).delete(admin::clear_audit_log),
        )
        .route("/api/admin/audit-log/:id", get(admin::get_audit_entry))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Fleet API (Rust)",
            "version": version,
            "description": "Car rental fleet management API built with Rust (Axum)",
            "endpoints": {
                "home": "/ (public)",
                "auth": "/auth/login, /auth/login-failed (public), /api/auth/* (protected)",
                "cars": "/api/cars[/:id] (protected)",
                "bookings": "/api/bookings[/:id] (protected)",
                "payments": "/api/payments[/:id][/correct] (protected)",
                "companies": "/api/companies[/:id] (protected)",
                "locations": "/api/locations[/:id] (protected)",
                "reference": "/api/reference/brands, /api/reference/currencies (protected, cached)",
                "users": "/api/users[/:id] (protected)",
                "admin": "/api/admin/* (admin only)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::Database::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
