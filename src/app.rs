use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/login", get(handlers::login_page).post(handlers::login))
        .route("/register", get(handlers::register_page).post(handlers::register))
        .route("/logout", get(handlers::logout))
        .route("/new", get(handlers::new_ticket_page).post(handlers::new_ticket))
        .route("/update_status", post(handlers::update_status))
        .route("/assign_ticket", post(handlers::assign_ticket))
        .route("/export/csv", get(handlers::export_tickets_csv))
        .route("/export/xlsx", get(handlers::export_tickets_xlsx))
        .route("/manage_users", get(handlers::manage_users))
        .route("/change_role", post(handlers::change_role))
        .route("/api/counts", get(handlers::get_counts))
        .route("/api/chart", get(handlers::get_chart))
        .route("/static/css/style.css", get(handlers::style_css))
        .route("/static/js/main.js", get(handlers::main_js))
        .route("/static/js/chart.js", get(handlers::chart_js))
        .route("/sw.js", get(handlers::service_worker))
        .with_state(state)
}
