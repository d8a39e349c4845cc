mod handlers;
mod middleware;

pub use middleware::SessionToken;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{AuthGate, SessionRegistry};
use crate::notebook::Notebook;

/// Shared state for every handler: the session's notebook, the gate, and the
/// tokens issued by it.
#[derive(Clone)]
pub struct AppState {
    pub notebook: Notebook,
    pub gate: AuthGate,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(notebook: Notebook, gate: AuthGate) -> Self {
        Self {
            notebook,
            gate,
            sessions: SessionRegistry::new(),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/logout", post(handlers::logout))
        // Items
        .route("/items", get(handlers::list_items).post(handlers::create_item))
        .route(
            "/items/{id}",
            get(handlers::get_item).delete(handlers::delete_item),
        )
        .route("/items/{id}/content", put(handlers::update_content))
        .route("/items/{id}/name", put(handlers::rename_item))
        .route("/items/{id}/parent", put(handlers::move_item))
        .route("/items/{id}/select", post(handlers::select_item))
        // Selection
        .route(
            "/selection",
            get(handlers::get_selection).delete(handlers::clear_selection),
        )
        .route("/selection/items", post(handlers::create_here))
        .route("/selection/document", get(handlers::open_document))
        // Views
        .route("/tree", get(handlers::render_tree))
        .route("/save", post(handlers::save))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::require_session,
        ));

    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/status", get(handlers::auth_status))
        .route("/auth/login", post(handlers::login))
        .merge(protected);

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
