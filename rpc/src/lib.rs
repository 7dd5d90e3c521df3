//! HTTP REST surface (C8): `axum` server exposing the light-wallet
//! client API over `State<AppState>` + `Json<T>`, the same shape
//! `dxid-rpc::run_rest` uses for its own routes.

pub mod error;
pub mod routes;
pub mod state;

pub use state::AppState;

use axum::routing::post;
use axum::Router;

/// Builds the full router. Body-size enforcement (§6.2: 2 KiB for most
/// routes, 50 KiB for `/submit_raw_tx`) happens inside each handler against
/// `AppState::http`, returning `400` on the limit configured for that
/// route rather than relying on `tower`'s default 413 response — the
/// response-code table only has a place for `400` here.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/login", post(routes::login))
        .route("/get_address_info", post(routes::get_address_info))
        .route("/get_address_txs", post(routes::get_address_txs))
        .route("/get_unspent_outs", post(routes::get_unspent_outs))
        .route("/get_random_outs", post(routes::get_random_outs))
        .route("/import_request", post(routes::import_request))
        .route("/submit_raw_tx", post(routes::submit_raw_tx))
        .with_state(state)
}
