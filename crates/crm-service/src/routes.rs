//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crm_core::{Company, Contact, Deal, Task};

use crate::handlers::{auth, billing, health, insights, records, super_admin, users};
use crate::state::AppState;

/// Maximum concurrent requests for tenant API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Maximum concurrent requests for platform administration endpoints.
const ADMIN_MAX_CONCURRENT_REQUESTS: usize = 10;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `POST /auth/login` - Exchange a credential for a token
/// - `POST /auth/register` - Sign up a new tenant on the trial plan
///
/// ## Authenticated
/// - `GET /auth/me` - Current user and account
///
/// ## Tenant-scoped (bearer token; super admins select a tenant with `x-account-id`)
/// - `GET /billing/current`, `GET /billing/plans`, `POST /billing/upgrade`
/// - `/companies`, `/contacts`, `/deals`, `/tasks`, `/users` - CRUD, with
///   `GET`/`POST` on the collection and `GET`/`PUT`/`PATCH`/`DELETE` on `/:id`
/// - `GET /deals/pipeline` - Deals by stage
/// - `GET /analytics/summary` - Dashboard numbers
/// - `GET /search?q=` - Search across entities
/// - `GET /contacts/export` - Contacts as CSV
///
/// ## Super admin
/// - `GET|POST /super-admin/companies`
/// - `GET|PATCH|DELETE /super-admin/companies/:id`
/// - `POST /super-admin/companies/:id/unlock`
/// - `GET /super-admin/overview/:entity`
/// - `POST /super-admin/billing/lifecycle`
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let api_routes = Router::new()
        // Auth
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/me", get(auth::me))
        // Billing
        .route("/billing/current", get(billing::get_current))
        .route("/billing/plans", get(billing::list_plans))
        .route("/billing/upgrade", post(billing::upgrade))
        // Companies
        .route(
            "/companies",
            get(records::list::<Company>).post(records::create::<Company>),
        )
        .route(
            "/companies/:id",
            get(records::get::<Company>)
                .put(records::update::<Company>)
                .patch(records::update::<Company>)
                .delete(records::delete::<Company>),
        )
        // Contacts
        .route(
            "/contacts",
            get(records::list::<Contact>).post(records::create::<Contact>),
        )
        .route("/contacts/export", get(insights::export_contacts))
        .route(
            "/contacts/:id",
            get(records::get::<Contact>)
                .put(records::update::<Contact>)
                .patch(records::update::<Contact>)
                .delete(records::delete::<Contact>),
        )
        // Deals
        .route(
            "/deals",
            get(records::list::<Deal>).post(records::create::<Deal>),
        )
        .route("/deals/pipeline", get(insights::pipeline))
        .route(
            "/deals/:id",
            get(records::get::<Deal>)
                .put(records::update::<Deal>)
                .patch(records::update::<Deal>)
                .delete(records::delete::<Deal>),
        )
        // Tasks
        .route(
            "/tasks",
            get(records::list::<Task>).post(records::create::<Task>),
        )
        .route(
            "/tasks/:id",
            get(records::get::<Task>)
                .put(records::update::<Task>)
                .patch(records::update::<Task>)
                .delete(records::delete::<Task>),
        )
        // Users
        .route("/users", get(users::list).post(users::create))
        .route(
            "/users/:id",
            get(users::get)
                .put(users::update)
                .patch(users::update)
                .delete(users::delete),
        )
        // Views
        .route("/analytics/summary", get(insights::analytics_summary))
        .route("/search", get(insights::search))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    let admin_routes = Router::new()
        .route(
            "/companies",
            get(super_admin::list_companies).post(super_admin::create_company),
        )
        .route(
            "/companies/:id",
            get(super_admin::get_company)
                .patch(super_admin::update_company)
                .delete(super_admin::delete_company),
        )
        .route("/companies/:id/unlock", post(super_admin::unlock_company))
        .route("/overview/:entity", get(super_admin::overview))
        .route("/billing/lifecycle", post(super_admin::run_lifecycle))
        .layer(ConcurrencyLimitLayer::new(ADMIN_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        .merge(api_routes)
        .nest("/super-admin", admin_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
