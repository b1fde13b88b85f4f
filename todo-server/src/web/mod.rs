use std::sync::Arc;

use axum::Router;
use axum::response::Json;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::config;
use crate::store::Store;
use crate::todo::{TodoState, api};

#[derive(OpenApi)]
#[openapi(
    paths(
        api::v1::create_todo_handler,
        api::v1::get_todo_handler,
        api::v1::list_todos_handler,
        api::v1::update_todo_handler,
        api::v1::delete_todo_handler,
    ),
    components(schemas(
        api::v1::TodoJson,
        api::v1::TodosResponse,
        api::v1::CreateTodoRequest,
        api::v1::UpdateTodoRequest,
        api::v1::MessageResponse,
        api::v1::ErrorResponse,
    )),
    tags((name = "Todos", description = "Todo record management endpoints"))
)]
struct ApiDoc;

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: config::Config) -> anyhow::Result<()> {
    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let store = Store::connect(&config).await?;
    tracing::info!("Connected to the cluster; keyspace and table are in place");

    let todo_state = Arc::new(TodoState {
        store: Arc::new(store),
    });
    let api_router = api::v1::create_api_router(todo_state);

    let app = Router::new()
        .nest("/api/v1", api_router)
        .route("/health", axum::routing::get(health_check_handler))
        .route(
            "/api-docs/openapi.json",
            axum::routing::get(openapi_handler),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        );

    axum::serve(listener, app).await?;
    Ok(())
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}

/// Serves the OpenAPI document describing the JSON API.
async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
