//! Declarative route registration for clinical record resources.
//!
//! One route group per configured resource-type name, all backed by the same
//! generic handlers. Watched types additionally get the watch interceptor
//! layered over their group; the mapping of type name to interceptor comes
//! entirely from the server configuration.

use std::sync::Arc;

use axum::extract::Path;
use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use vitalio_core::{UpdateExtractor, UpdateSender};

use crate::config::AppConfig;
use crate::handlers::{self, AppState};
use crate::watch::{self, ResourceWatch, generate_resource_watch};

/// Register the CRUD route group for a single resource type, optionally
/// wrapped by a watch interceptor.
pub fn register_resource(name: &str, state: AppState, watch: Option<ResourceWatch>) -> Router {
    let collection = format!("/{name}");
    let item = format!("/{name}/{{id}}");

    let create = {
        let state = state.clone();
        let ty = name.to_string();
        move |Json(payload): Json<Value>| {
            let state = state.clone();
            let ty = ty.clone();
            async move { handlers::create_record(state, ty, payload).await }
        }
    };
    let read = {
        let state = state.clone();
        let ty = name.to_string();
        move |Path(id): Path<String>| {
            let state = state.clone();
            let ty = ty.clone();
            async move { handlers::read_record(state, ty, id).await }
        }
    };
    let update = {
        let state = state.clone();
        let ty = name.to_string();
        move |Path(id): Path<String>, Json(payload): Json<Value>| {
            let state = state.clone();
            let ty = ty.clone();
            async move { handlers::update_record(state, ty, id, payload).await }
        }
    };
    let remove = {
        let state = state.clone();
        let ty = name.to_string();
        move |Path(id): Path<String>| {
            let state = state.clone();
            let ty = ty.clone();
            async move { handlers::delete_record(state, ty, id).await }
        }
    };

    let mut router = Router::new()
        .route(&collection, post(create))
        .route(&item, get(read).put(update).delete(remove));

    if let Some(watch) = watch {
        router = router.layer(middleware::from_fn_with_state(
            watch,
            watch::observe_mutation,
        ));
    }

    router
}

/// Build the full application router from configuration.
pub fn build_router(
    cfg: &AppConfig,
    state: AppState,
    sender: &UpdateSender,
    extractor: &Arc<UpdateExtractor>,
) -> Router {
    let mut app = Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz));

    for name in &cfg.resources.types {
        let watched = cfg.watch.enabled
            && cfg
                .watch
                .resource_types
                .iter()
                .any(|watched| watched == name);
        let watch = watched.then(|| {
            if !extractor.has_rule(name) {
                tracing::warn!(
                    resource_type = %name,
                    "Watched resource type has no extraction rule; its updates will be skipped"
                );
            }
            generate_resource_watch(sender.clone(), extractor.clone())
        });
        app = app.merge(register_resource(name, state.clone(), watch));
    }

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(axum::extract::DefaultBodyLimit::max(
            cfg.server.body_limit_bytes,
        ))
}
