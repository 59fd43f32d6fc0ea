use crate::assets::{render_chart_js, render_main_js, STYLE_CSS};
use crate::auth::{session_cookie, FlashLevel};
use crate::chart::{chart_for_counts, ChartConfig};
use crate::errors::AppError;
use crate::export::{export_csv, export_xlsx, CSV_CONTENT_TYPE, XLSX_CONTENT_TYPE};
use crate::models::{
    AssignTicketForm, ChangeRoleForm, LoginForm, NewTicketForm, NewTicketResponse, RegisterForm, Role,
    TicketCounts, TicketStatus, UpdateStatusForm, UpdateStatusResponse, User,
};
use crate::offline::render_service_worker;
use crate::state::AppState;
use crate::storage::persist_data;
use crate::tickets::{NewTicket, TicketError};
use crate::ui;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use tracing::{info, warn};

async fn current_user(state: &AppState, headers: &HeaderMap) -> Option<User> {
    let id = state.sessions.user_id(headers).await?;
    state.data.lock().await.user(id).cloned()
}

async fn redirect_with_flash(
    state: &AppState,
    headers: &HeaderMap,
    to: &str,
    level: FlashLevel,
    message: &str,
) -> Result<Response, AppError> {
    let new_token = state.sessions.flash(headers, level, message).await?;
    let mut response = Redirect::to(to).into_response();
    if let Some(token) = new_token {
        response
            .headers_mut()
            .insert(header::SET_COOKIE, session_cookie(&token));
    }
    Ok(response)
}

/// The logged-in user, or the redirect to send instead.
async fn require_role(
    state: &AppState,
    headers: &HeaderMap,
    allowed: fn(Role) -> bool,
) -> Result<Result<User, Response>, AppError> {
    let Some(user) = current_user(state, headers).await else {
        let redirect =
            redirect_with_flash(state, headers, "/login", FlashLevel::Warning, "Please log in.").await?;
        return Ok(Err(redirect));
    };
    if !allowed(user.role) {
        let redirect = redirect_with_flash(
            state,
            headers,
            "/",
            FlashLevel::Danger,
            "You do not have permission.",
        )
        .await?;
        return Ok(Err(redirect));
    }
    Ok(Ok(user))
}

/// jQuery marks its AJAX requests with `X-Requested-With`.
fn is_xhr(headers: &HeaderMap) -> bool {
    headers
        .get("x-requested-with")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("XMLHttpRequest"))
}

fn any_role(_: Role) -> bool {
    true
}

fn is_admin(role: Role) -> bool {
    role == Role::Admin
}

fn parse_id(value: &str, what: &str) -> Result<u64, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::bad_request(format!("invalid {what} '{}'", value.trim())))
}

fn parse_optional_id(value: Option<&str>, what: &str) -> Result<Option<u64>, AppError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_id(value, what).map(Some),
    }
}

pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    let user = match require_role(&state, &headers, any_role).await? {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let flashes = state.sessions.take_flashes(&headers).await;
    let data = state.data.lock().await;
    let rows = data.visible_tickets(&user);
    let html = ui::render_dashboard(&user, &flashes, &rows, data.counts(), &data.users);
    Ok(Html(html).into_response())
}

pub async fn login_page(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let flashes = state.sessions.take_flashes(&headers).await;
    Html(ui::render_login(&flashes))
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let user_id = {
        let data = state.data.lock().await;
        data.authenticate(&form.username, &form.password).map(|user| user.id)
    };
    let Some(user_id) = user_id else {
        warn!(username = %form.username.trim(), "failed login");
        return redirect_with_flash(&state, &headers, "/login", FlashLevel::Danger, "Invalid credentials.")
            .await;
    };

    let token = state.sessions.login(&headers, user_id).await?;
    state
        .sessions
        .flash_token(&token, FlashLevel::Success, "Logged in successfully.")
        .await;
    info!(user_id, "logged in");
    let mut response = Redirect::to("/").into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, session_cookie(&token));
    Ok(response)
}

pub async fn register_page(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let flashes = state.sessions.take_flashes(&headers).await;
    Html(ui::render_register(&flashes))
}

pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let outcome = {
        let mut data = state.data.lock().await;
        match data.register_user(&form.username, &form.password) {
            Ok(user) => {
                let id = user.id;
                persist_data(&state.data_path, &data).await?;
                Ok(id)
            }
            Err(err) => Err(err),
        }
    };

    match outcome {
        Ok(user_id) => {
            info!(user_id, "registered user");
            redirect_with_flash(&state, &headers, "/login", FlashLevel::Success, "Registered successfully.")
                .await
        }
        Err(TicketError::Random(reason)) => Err(AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: reason,
        }),
        Err(err) => {
            let level = match err {
                TicketError::MissingCredentials => FlashLevel::Warning,
                _ => FlashLevel::Danger,
            };
            redirect_with_flash(&state, &headers, "/register", level, &err.to_string()).await
        }
    }
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    state.sessions.logout(&headers).await;
    redirect_with_flash(&state, &headers, "/login", FlashLevel::Info, "Logged out.").await
}

pub async fn new_ticket_page(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user = match require_role(&state, &headers, any_role).await? {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let flashes = state.sessions.take_flashes(&headers).await;
    let data = state.data.lock().await;
    Ok(Html(ui::render_new_ticket(&user, &flashes, &data.users)).into_response())
}

pub async fn new_ticket(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<NewTicketForm>,
) -> Result<Response, AppError> {
    let user = match require_role(&state, &headers, any_role).await? {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let ticket = NewTicket {
        title: form.title,
        description: form.description,
        assigned_to: parse_optional_id(form.assigned_to.as_deref(), "assignee")?,
    };

    let ticket_id = {
        let mut data = state.data.lock().await;
        let id = data.create_ticket(user.id, ticket)?.id;
        persist_data(&state.data_path, &data).await?;
        id
    };
    info!(ticket_id, user_id = user.id, "ticket created");
    if is_xhr(&headers) {
        // The page reloads itself; leave the flash queued for that load.
        state
            .sessions
            .flash(&headers, FlashLevel::Success, "Ticket created.")
            .await?;
        let body = NewTicketResponse {
            success: true,
            id: ticket_id,
        };
        return Ok((StatusCode::CREATED, Json(body)).into_response());
    }
    redirect_with_flash(&state, &headers, "/", FlashLevel::Success, "Ticket created.").await
}

fn status_reply(status: StatusCode, error: Option<String>) -> Response {
    let body = UpdateStatusResponse {
        success: error.is_none(),
        error,
    };
    (status, Json(body)).into_response()
}

pub async fn update_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<UpdateStatusForm>,
) -> Result<Response, AppError> {
    let Some(user) = current_user(&state, &headers).await else {
        return Ok(status_reply(StatusCode::UNAUTHORIZED, Some("Login required".to_string())));
    };
    let ticket_id = match parse_id(&form.id, "ticket id") {
        Ok(id) => id,
        Err(err) => return Ok(status_reply(err.status, Some(err.message))),
    };
    let status = match form.status.parse::<TicketStatus>() {
        Ok(status) => status,
        Err(message) => return Ok(status_reply(StatusCode::BAD_REQUEST, Some(message))),
    };

    let mut data = state.data.lock().await;
    match data.update_status(user.id, ticket_id, status) {
        Ok(()) => {
            persist_data(&state.data_path, &data).await?;
            info!(ticket_id, %status, user_id = user.id, "ticket status updated");
            Ok(status_reply(StatusCode::OK, None))
        }
        Err(err) => {
            warn!(ticket_id, user_id = user.id, "status update rejected: {err}");
            let err = AppError::from(err);
            Ok(status_reply(err.status, Some(err.message)))
        }
    }
}

pub async fn assign_ticket(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<AssignTicketForm>,
) -> Result<Response, AppError> {
    let user = match require_role(&state, &headers, Role::is_staff).await? {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let ticket_id = parse_id(&form.ticket_id, "ticket id")?;
    let assignee = parse_optional_id(form.assigned_to.as_deref(), "assignee")?;
    {
        let mut data = state.data.lock().await;
        data.assign_ticket(user.id, ticket_id, assignee)?;
        persist_data(&state.data_path, &data).await?;
    }
    info!(ticket_id, ?assignee, "ticket assigned");
    redirect_with_flash(&state, &headers, "/", FlashLevel::Success, "Ticket assigned.").await
}

pub async fn export_tickets_csv(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Err(redirect) = require_role(&state, &headers, Role::is_staff).await? {
        return Ok(redirect);
    }
    let csv = export_csv(&state.data.lock().await.all_ticket_rows());
    Ok((
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"tickets.csv\""),
        ],
        csv,
    )
        .into_response())
}

pub async fn export_tickets_xlsx(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Err(redirect) = require_role(&state, &headers, Role::is_staff).await? {
        return Ok(redirect);
    }
    let rows = state.data.lock().await.all_ticket_rows();
    let workbook = export_xlsx(&rows)?;
    info!(tickets = rows.len(), bytes = workbook.len(), "exported workbook");
    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"tickets.xlsx\""),
        ],
        workbook,
    )
        .into_response())
}

pub async fn manage_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user = match require_role(&state, &headers, is_admin).await? {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let flashes = state.sessions.take_flashes(&headers).await;
    let data = state.data.lock().await;
    Ok(Html(ui::render_manage_users(&user, &flashes, &data.users)).into_response())
}

pub async fn change_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ChangeRoleForm>,
) -> Result<Response, AppError> {
    let user = match require_role(&state, &headers, is_admin).await? {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    let user_id = parse_id(&form.user_id, "user id")?;
    let role: Role = form.role.parse().map_err(AppError::bad_request)?;
    {
        let mut data = state.data.lock().await;
        data.change_role(user.id, user_id, role)?;
        persist_data(&state.data_path, &data).await?;
    }
    info!(user_id, %role, "role changed");
    redirect_with_flash(&state, &headers, "/manage_users", FlashLevel::Success, "Role updated.").await
}

pub async fn get_counts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TicketCounts>, AppError> {
    if current_user(&state, &headers).await.is_none() {
        return Err(AppError::unauthorized("Login required"));
    }
    Ok(Json(state.data.lock().await.counts()))
}

pub async fn get_chart(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ChartConfig>, AppError> {
    if current_user(&state, &headers).await.is_none() {
        return Err(AppError::unauthorized("Login required"));
    }
    let counts = state.data.lock().await.counts();
    Ok(Json(chart_for_counts(counts)))
}

pub async fn style_css() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLE_CSS)
}

pub async fn main_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        render_main_js(),
    )
}

pub async fn chart_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        render_chart_js(),
    )
}

pub async fn service_worker() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        render_service_worker(),
    )
}
