mod home;
mod surveys;
mod upload;
mod videos;
mod webhook;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::session::{session_middleware, SESSION_COOKIE};
use crate::state::AppState;

pub use webhook::SIGNATURE_HEADER;

// Define the OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // General endpoints
        home::root,
        home::health,
        // Survey listing
        surveys::list_surveys,
        // Uploads and removal
        upload::upload_video,
        videos::upload_videos,
        videos::remove_video,
        // Processing callbacks
        webhook::mux_webhook,
    ),
    components(
        schemas(
            home::HealthResponse,
            surveys::SurveyResponse,
            surveys::VideoResponse,
            surveys::GpsTrackResponse,
            crate::services::surveys::UploadStatusFilter,
            upload::UploadResponse,
            videos::FileStatus,
            videos::FileResult,
            videos::BatchUploadResponse,
            videos::RemoveVideoResponse,
            webhook::WebhookAck,
            crate::entities::user::Role,
        )
    ),
    tags(
        (name = "General", description = "General API information"),
        (name = "Surveys", description = "Role-scoped survey listing with filters and pagination"),
        (name = "Upload", description = "Video upload, batch upload and removal"),
        (name = "Webhooks", description = "Video processing notifications")
    ),
    info(
        title = "Survey Dashboard API",
        version = "0.1.0",
        description = "Survey browsing and survey video upload with role-based visibility",
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

// Session cookie issued by the login flow
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Cookie(
                        utoipa::openapi::security::ApiKeyValue::new(SESSION_COOKIE),
                    ),
                ),
            );
        }
    }
}

pub fn create_routes(state: AppState) -> Router {
    // Swagger UI (stateless)
    let swagger_router: Router = SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into();

    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    // Routes that need a session
    let session_routes = Router::new()
        .route("/api/surveys", get(surveys::list_surveys))
        .route("/api/upload", post(upload::upload_video))
        .route("/api/surveys/{id}/videos", post(videos::upload_videos))
        .route("/api/surveys/{id}/video", delete(videos::remove_video))
        .route_layer(body_limit)
        .route_layer(middleware::from_fn_with_state(state.clone(), session_middleware));

    // Public routes and merge all together
    let app_routes = Router::new()
        .route("/", get(home::root))
        .route("/health", get(home::health))
        .route("/api/mux/webhook", post(webhook::mux_webhook))
        .merge(session_routes)
        .with_state(state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Merge Swagger UI (which has no state) with the rest
    Router::new()
        .merge(swagger_router)
        .merge(app_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
