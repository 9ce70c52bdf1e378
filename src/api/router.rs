//! Clinic API router.
//!
//! Returns a composable `Router` with every route nested under `/api/`.
//!
//! Middleware stack on protected routes (outermost → innermost):
//! 1. Rate limiter → 2. Auth validator → 3. Audit logger

use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the clinic API router.
///
/// Middleware reads `ApiContext` from an `Extension` layer; handlers use
/// `State<ApiContext>`.
pub fn clinic_api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

fn build_router(ctx: ApiContext) -> Router {
    // Path params use `:param` syntax (axum 0.7).
    let protected = Router::new()
        .route("/auth/logout", post(endpoints::auth::logout))
        .route("/auth/me", get(endpoints::auth::me))
        .route("/functions/crearUsuario", post(endpoints::users::create))
        .route("/functions/actualizarUsuario", post(endpoints::users::update))
        .route("/users", get(endpoints::users::list))
        .route(
            "/patients",
            get(endpoints::patients::list).post(endpoints::patients::create),
        )
        .route(
            "/patients/:id",
            get(endpoints::patients::get).put(endpoints::patients::update),
        )
        .route("/patients/:id/deactivate", post(endpoints::patients::deactivate))
        .route(
            "/patients/:id/diagnoses",
            get(endpoints::diagnoses::list).post(endpoints::diagnoses::create),
        )
        .route("/diagnoses/:id", delete(endpoints::diagnoses::delete))
        .route(
            "/consultations",
            get(endpoints::consultations::list).post(endpoints::consultations::create),
        )
        .route(
            "/consultations/:id",
            get(endpoints::consultations::get)
                .put(endpoints::consultations::update)
                .delete(endpoints::consultations::delete),
        )
        .route(
            "/consultations/:id/prescription.pdf",
            get(endpoints::consultations::prescription),
        )
        .route(
            "/deliveries",
            get(endpoints::deliveries::list).post(endpoints::deliveries::create),
        )
        .route(
            "/deliveries/:id",
            get(endpoints::deliveries::get)
                .put(endpoints::deliveries::update)
                .delete(endpoints::deliveries::delete),
        )
        .route(
            "/referrals",
            get(endpoints::referrals::list).post(endpoints::referrals::create),
        )
        .route(
            "/referrals/:id",
            get(endpoints::referrals::get).put(endpoints::referrals::update),
        )
        .route("/referrals/:id/status", post(endpoints::referrals::set_status))
        .route(
            "/programs",
            get(endpoints::programs::list).post(endpoints::programs::create),
        )
        .route("/programs/:id", put(endpoints::programs::update))
        .route(
            "/programs/:id/enrollments",
            get(endpoints::programs::list_enrolled).post(endpoints::programs::enroll),
        )
        .route(
            "/enrollments/:id",
            put(endpoints::programs::update_enrolled).delete(endpoints::programs::unenroll),
        )
        .route("/reports/pregnancies", get(endpoints::reports::pregnancies))
        .route("/reports/summary", get(endpoints::reports::summary))
        .with_state(ctx.clone())
        // Innermost first, outermost last
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(axum::Extension(ctx.clone()));

    // Unprotected routes (rate-limited only, no auth required)
    let unprotected = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/login", post(endpoints::auth::login))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(axum::Extension(ctx));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", protected)
        .nest("/api", unprotected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
