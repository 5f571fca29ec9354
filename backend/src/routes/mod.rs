//! Route definitions for the PoultryMitra API

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes
        .merge(protected_routes(state))
}

/// Everything behind the identity token
fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/users", user_routes())
        .nest("/admin", admin_routes())
        .nest("/rates", rate_routes())
        .nest("/ledger", ledger_routes())
        .nest("/inventory", inventory_routes())
        .nest("/orders", order_routes())
        .nest("/connections", connection_routes())
        .nest("/diagnosis", diagnosis_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Profile routes
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", post(handlers::create_profile))
        .route("/me", get(handlers::get_my_profile))
        .route("/invitations", post(handlers::create_invitation))
        .route("/by-code/:code", get(handlers::lookup_user_by_code))
}

/// Admin back-office routes
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::admin_list_users))
        .route("/users/:user_id", delete(handlers::admin_delete_user))
        .route("/users/:user_id/status", put(handlers::admin_update_user_status))
        .route("/users/:user_id/plan", put(handlers::admin_update_plan))
        .route("/ledger/overview", get(handlers::admin_ledger_overview))
        .route("/rates", post(handlers::publish_rate))
}

/// Market rate routes
fn rate_routes() -> Router<AppState> {
    Router::new().route("/", get(handlers::latest_rates))
}

/// Ledger routes
fn ledger_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/entries",
            get(handlers::list_ledger_entries).post(handlers::add_ledger_entry),
        )
        .route("/balance", get(handlers::get_ledger_balance))
        .route("/summary", get(handlers::get_ledger_summary))
        .route("/verify", get(handlers::verify_ledger))
        .route("/export", get(handlers::export_ledger))
}

/// Inventory routes
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/items",
            get(handlers::list_inventory_items).post(handlers::add_inventory_item),
        )
        .route(
            "/items/:item_id",
            get(handlers::get_inventory_item)
                .put(handlers::update_inventory_item)
                .delete(handlers::delete_inventory_item),
        )
        .route("/purchases", post(handlers::record_purchase))
        .route("/low-stock", get(handlers::list_low_stock))
        .route("/dealers/:dealer_id/catalog", get(handlers::get_dealer_catalog))
}

/// Order routes
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_order))
        .route("/:order_id", get(handlers::get_order))
        .route("/:order_id/status", put(handlers::update_order_status))
}

/// Connection routes
fn connection_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_connections).post(handlers::request_connection),
        )
        .route(
            "/:connection_id/status",
            put(handlers::update_connection_status),
        )
}

/// Diagnosis and assistant routes
fn diagnosis_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::diagnose))
        .route("/history", get(handlers::diagnosis_history))
        .route("/chat", post(handlers::chat))
}
