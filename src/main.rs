// src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod crm;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::middleware::auth::{admin_guard, auth_guard, sales_guard};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).compact().init();

    // If configuration or the database are broken, refuse to start.
    let app_state = AppState::new()
        .await
        .expect("failed to initialize application state");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("failed to run database migrations");

    tracing::info!("database migrations applied");

    let sales_routes = Router::new()
        .route(
            "/leads",
            post(handlers::leads::create_lead).get(handlers::leads::list_leads),
        )
        .route(
            "/leads/{lead_id}",
            get(handlers::leads::get_lead).patch(handlers::leads::update_lead),
        )
        .route("/leads/{lead_id}/status", put(handlers::leads::set_lead_status))
        .route(
            "/leads/{lead_id}/touch-points",
            post(handlers::leads::create_touch_point).get(handlers::leads::list_touch_points),
        )
        .route(
            "/touch-points/{touch_id}",
            delete(handlers::leads::delete_touch_point),
        )
        .route(
            "/me",
            get(handlers::leads::get_me).patch(handlers::leads::update_me),
        )
        .route(
            "/jobtread/customer",
            post(handlers::jobtread::import_customer),
        )
        .route(
            "/jobtread/customer/{customer_id}",
            get(handlers::jobtread::get_customer),
        )
        .route("/jobs", get(handlers::jobtread::rep_jobs))
        .layer(axum_middleware::from_fn(sales_guard))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let admin_routes = Router::new()
        .route("/leads", get(handlers::admin::list_all_leads))
        .route(
            "/leads/{lead_id}/reassign",
            put(handlers::admin::reassign_lead),
        )
        .route(
            "/leads/{lead_id}/touch-points",
            post(handlers::admin::create_touch_point),
        )
        .route("/sales-reps", get(handlers::admin::list_reps))
        .route(
            "/sales-reps/{uid}",
            axum::routing::patch(handlers::admin::update_rep)
                .delete(handlers::admin::deactivate_rep),
        )
        .route("/jobs", get(handlers::jobtread::admin_jobs))
        .route("/events/summary", get(handlers::admin::events_summary))
        .layer(axum_middleware::from_fn(admin_guard))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/events", post(handlers::events::log_event))
        .nest("/api/sales-rep", sales_routes)
        .nest("/api/admin", admin_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state);

    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind TCP listener");
    tracing::info!("server listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.expect("axum server error");
}
