use crate::models::AppState;
use axum::Router;

pub mod admin_user_routes;
pub mod appointment_routes;
pub mod auth_routes;
pub mod catalog_routes;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/auth", auth_routes::router())
        .nest("/api", appointment_routes::router())
        .nest("/api", admin_user_routes::router())
        .nest("/api", catalog_routes::router())
        .with_state(state)
}
