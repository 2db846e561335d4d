use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Domain core: entities, visibility and ownership rules, pagination, forms.
pub mod authorization;
pub mod forms;
pub mod models;
pub mod pagination;
pub mod visibility;

// Application services and plumbing.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod repository;
pub mod urls;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// The OpenAPI document, served at `/api-docs/openapi.json` and browsable at
/// `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::blog::index, handlers::blog::category_posts, handlers::blog::profile,
        handlers::blog::edit_profile_form, handlers::blog::edit_profile,
        handlers::blog::post_detail, handlers::blog::create_post_form, handlers::blog::create_post,
        handlers::blog::edit_post_form, handlers::blog::edit_post,
        handlers::blog::delete_post_form, handlers::blog::delete_post,
        handlers::blog::add_comment, handlers::blog::edit_comment_form,
        handlers::blog::edit_comment, handlers::blog::delete_comment,
        handlers::pages::about, handlers::pages::rules,
        handlers::admin::create_user,
        handlers::admin::list_categories, handlers::admin::create_category,
        handlers::admin::update_category, handlers::admin::delete_category,
        handlers::admin::list_locations, handlers::admin::create_location,
        handlers::admin::update_location, handlers::admin::delete_location,
        handlers::admin::list_posts, handlers::admin::update_post_publication,
    ),
    components(
        schemas(
            models::User, models::Category, models::Location, models::Post, models::Comment,
            models::PublicationUpdate, models::PostDetail, models::PostFormPage,
            models::PostDeletePage, models::CommentFormPage, models::ProfileFormPage, models::StaticPage,
            forms::PostForm, forms::CommentForm, forms::ProfileForm, forms::CategoryForm,
            forms::LocationForm, forms::UserForm, forms::FieldErrors,
        )
    ),
    tags(
        (name = "blogicum", description = "Blogicum blogging platform")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single shared application state: the persistence layer and the immutable
/// configuration. Handlers pull the part they need through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Postgres in deployments, in-memory in tests and local runs.
    pub repo: RepositoryState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the `authenticated_routes`. Extracting `AuthUser` either succeeds or
/// rejects with a redirect to the login page, before the handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing table, applies scoped and global middleware, and
/// registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Staff checks happen inside the admin handlers.
        .nest("/admin", admin::admin_routes())
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span: method, uri and the `x-request-id` set by
/// `SetRequestIdLayer`, so every log line of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
