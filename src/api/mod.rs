//! REST API Server for the retail store
//!
//! Exposes paginated, filtered reads over the eight entity tables plus two
//! fixed analytics queries.

pub mod handlers;
pub mod query;
pub mod repository;
pub mod rows;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::entity::Entity;
use crate::error::Result;

pub use repository::RetailRepository;

/// API State - Shared between handlers
#[derive(Clone)]
pub struct ApiState {
    pub repository: Arc<RetailRepository>,
}

impl ApiState {
    pub fn new(repository: RetailRepository) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }
}

/// Create the API router
pub fn create_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/", get(handlers::root))
        .route("/analytics/sales-by-store", get(handlers::sales_by_store))
        .route("/analytics/top-products", get(handlers::top_products));

    for entity in Entity::ALL {
        router = router
            .route(
                &format!("/{}", entity.table_name()),
                get(
                    move |state: State<ApiState>, params: Query<HashMap<String, String>>| {
                        handlers::list_rows(state, entity, params)
                    },
                ),
            )
            .route(
                &format!("/{}/:id", entity.table_name()),
                get(move |state: State<ApiState>, id: Path<String>| {
                    handlers::get_row(state, entity, id)
                }),
            );
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the API server
pub async fn start_server(config: &ServerConfig, state: ApiState) -> Result<()> {
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Retail API listening on http://{} (schema '{}')", addr, config.schema);

    axum::serve(listener, app).await?;

    Ok(())
}
