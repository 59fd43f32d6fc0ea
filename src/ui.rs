use crate::auth::Flash;
use crate::chart::{CANVAS_ID, CLOSED_CLASS, OPEN_CLASS, PROGRESS_CLASS};
use crate::models::{Role, TicketCounts, TicketRow, TicketStatus, User};
use crate::search::SEARCH_CELL_CLASS;

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn render_layout(title: &str, user: Option<&User>, flashes: &[Flash], body: &str) -> String {
    let nav = match user {
        Some(user) => {
            let mut links = String::from(r#"<a class="nav-link" href="/">Dashboard</a>"#);
            links.push_str(r#"<a class="nav-link" href="/new">New ticket</a>"#);
            if user.role.is_staff() {
                links.push_str(r#"<a class="nav-link" href="/export/csv">Export CSV</a>"#);
                links.push_str(r#"<a class="nav-link" href="/export/xlsx">Export Excel</a>"#);
            }
            if user.role == Role::Admin {
                links.push_str(r#"<a class="nav-link" href="/manage_users">Users</a>"#);
            }
            format!(
                r#"{links}<span class="navbar-text mx-3">{name} ({role})</span><a class="nav-link" href="/logout">Log out</a>"#,
                name = escape(&user.username),
                role = user.role,
            )
        }
        None => r#"<a class="nav-link" href="/login">Log in</a><a class="nav-link" href="/register">Register</a>"#
            .to_string(),
    };

    let flashes: String = flashes
        .iter()
        .map(|flash| {
            format!(
                r#"<div class="alert alert-{} alert-dismissible" role="alert">{}</div>"#,
                flash.level.as_str(),
                escape(&flash.message)
            )
        })
        .collect();

    LAYOUT_HTML
        .replace("{{TITLE}}", &escape(title))
        .replace("{{NAV}}", &nav)
        .replace("{{FLASHES}}", &flashes)
        .replace("{{BODY}}", body)
}

fn status_options(selected: TicketStatus) -> String {
    TicketStatus::ALL
        .iter()
        .map(|status| {
            let mark = if *status == selected { " selected" } else { "" };
            format!(r#"<option value="{0}"{mark}>{0}</option>"#, status.label())
        })
        .collect()
}

fn user_options(users: &[User]) -> String {
    let mut out = String::from(r#"<option value="">Unassigned</option>"#);
    for user in users {
        out.push_str(&format!(
            r#"<option value="{}">{}</option>"#,
            user.id,
            escape(&user.username)
        ));
    }
    out
}

pub fn render_dashboard(
    user: &User,
    flashes: &[Flash],
    rows: &[TicketRow],
    counts: TicketCounts,
    users: &[User],
) -> String {
    let staff = user.role.is_staff();
    let table_rows: String = rows
        .iter()
        .map(|row| {
            let assign = if staff {
                format!(
                    r#"<form method="post" action="/assign_ticket" class="d-flex gap-1"><input type="hidden" name="ticket_id" value="{id}"><select name="assigned_to" class="form-select form-select-sm">{options}</select><button class="btn btn-sm btn-outline-secondary" type="submit">Assign</button></form>"#,
                    id = row.id,
                    options = user_options(users),
                )
            } else {
                String::new()
            };
            format!(
                r#"<tr><td class="{cell}">{id}</td><td class="{cell}">{title}</td><td class="{cell}">{description}</td><td class="{cell}">{status}</td><td class="{cell}">{created_by}</td><td class="{cell}">{assigned_to}</td><td class="{cell}">{created_at}</td><td><div class="d-flex gap-1"><select class="form-select form-select-sm status-select" data-id="{id}">{options}</select><button class="btn btn-sm btn-primary update-status" data-id="{id}" type="button">Update</button></div>{assign}</td></tr>"#,
                cell = SEARCH_CELL_CLASS,
                id = row.id,
                title = escape(&row.title),
                description = escape(&row.description),
                status = row.status,
                created_by = escape(row.created_by.as_deref().unwrap_or("-")),
                assigned_to = escape(row.assigned_to.as_deref().unwrap_or("-")),
                created_at = escape(&row.created_at),
                options = status_options(row.status),
            )
        })
        .collect();

    let body = DASHBOARD_HTML
        .replace("{{OPEN}}", &counts.open.to_string())
        .replace("{{PROGRESS}}", &counts.in_progress.to_string())
        .replace("{{CLOSED}}", &counts.closed.to_string())
        .replace("{{OPEN_CLASS}}", OPEN_CLASS)
        .replace("{{PROGRESS_CLASS}}", PROGRESS_CLASS)
        .replace("{{CLOSED_CLASS}}", CLOSED_CLASS)
        .replace("{{CANVAS_ID}}", CANVAS_ID)
        .replace("{{USER_OPTIONS}}", &user_options(users))
        .replace("{{ROWS}}", &table_rows);

    render_layout("Dashboard", Some(user), flashes, &body)
}

pub fn render_login(flashes: &[Flash]) -> String {
    let body = CREDENTIALS_HTML
        .replace("{{HEADING}}", "Log in")
        .replace("{{ACTION}}", "/login")
        .replace("{{ALT}}", r#"No account? <a href="/register">Register</a>"#);
    render_layout("Log in", None, flashes, &body)
}

pub fn render_register(flashes: &[Flash]) -> String {
    let body = CREDENTIALS_HTML
        .replace("{{HEADING}}", "Register")
        .replace("{{ACTION}}", "/register")
        .replace("{{ALT}}", r#"Already registered? <a href="/login">Log in</a>"#);
    render_layout("Register", None, flashes, &body)
}

pub fn render_new_ticket(user: &User, flashes: &[Flash], users: &[User]) -> String {
    let body = format!(
        r#"<h1 class="h3 mb-3">New ticket</h1><form method="post" action="/new" class="card card-body">{fields}<button class="btn btn-primary" type="submit">Create</button></form>"#,
        fields = ticket_fields(users)
    );
    render_layout("New ticket", Some(user), flashes, &body)
}

fn ticket_fields(users: &[User]) -> String {
    TICKET_FIELDS_HTML.replace("{{USER_OPTIONS}}", &user_options(users))
}

pub fn render_manage_users(user: &User, flashes: &[Flash], users: &[User]) -> String {
    let rows: String = users
        .iter()
        .map(|account| {
            let options: String = Role::ALL
                .iter()
                .map(|role| {
                    let mark = if *role == account.role { " selected" } else { "" };
                    format!(r#"<option value="{0}"{mark}>{0}</option>"#, role.as_str())
                })
                .collect();
            format!(
                r#"<tr><td>{id}</td><td>{name}</td><td>{role}</td><td>{created}</td><td><form method="post" action="/change_role" class="d-flex gap-1"><input type="hidden" name="user_id" value="{id}"><select name="role" class="form-select form-select-sm">{options}</select><button class="btn btn-sm btn-outline-primary" type="submit">Save</button></form></td></tr>"#,
                id = account.id,
                name = escape(&account.username),
                role = account.role,
                created = escape(&account.created_at),
            )
        })
        .collect();
    let body = format!(
        r#"<h1 class="h3 mb-3">Users</h1><table class="table"><thead><tr><th>ID</th><th>Username</th><th>Role</th><th>Created</th><th></th></tr></thead><tbody>{rows}</tbody></table>"#
    );
    render_layout("Users", Some(user), flashes, &body)
}

const LAYOUT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en" data-theme="light">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}} · Helpdesk</title>
  <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css" />
  <link rel="stylesheet" href="/static/css/style.css" />
</head>
<body>
  <nav class="navbar navbar-expand border-bottom mb-4 px-3">
    <a class="navbar-brand" href="/">Helpdesk</a>
    <div class="navbar-nav ms-auto align-items-center">
      {{NAV}}
      <button id="themeToggle" type="button" aria-label="Toggle theme"></button>
    </div>
  </nav>
  <main class="container">
    {{FLASHES}}
    <div id="actionError" class="alert alert-danger" role="alert"></div>
    {{BODY}}
  </main>
  <script src="https://code.jquery.com/jquery-3.7.1.min.js"></script>
  <script src="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/js/bootstrap.bundle.min.js"></script>
  <script src="https://cdn.jsdelivr.net/npm/chart.js@4.4.1/dist/chart.umd.min.js"></script>
  <script src="/static/js/main.js"></script>
  <script src="/static/js/chart.js"></script>
</body>
</html>
"#;

const DASHBOARD_HTML: &str = r##"<div class="row g-3 mb-4">
  <div class="col-md-3"><div class="card card-body stat-card"><span class="text-muted-soft">Open</span><span class="display-6 {{OPEN_CLASS}}">{{OPEN}}</span></div></div>
  <div class="col-md-3"><div class="card card-body stat-card"><span class="text-muted-soft">In Progress</span><span class="display-6 {{PROGRESS_CLASS}}">{{PROGRESS}}</span></div></div>
  <div class="col-md-3"><div class="card card-body stat-card"><span class="text-muted-soft">Closed</span><span class="display-6 {{CLOSED_CLASS}}">{{CLOSED}}</span></div></div>
  <div class="col-md-3"><div class="card card-body"><canvas id="{{CANVAS_ID}}"></canvas></div></div>
</div>
<div class="d-flex gap-2 mb-3">
  <input id="searchBox" class="form-control" type="search" placeholder="Search tickets" />
  <button class="btn btn-success" type="button" data-bs-toggle="modal" data-bs-target="#ticketModal">New ticket</button>
</div>
<table id="ticketTable" class="table align-middle">
  <thead><tr><th>ID</th><th>Title</th><th>Description</th><th>Status</th><th>Created by</th><th>Assigned to</th><th>Created</th><th></th></tr></thead>
  <tbody>{{ROWS}}</tbody>
</table>
<div class="modal fade" id="ticketModal" tabindex="-1" aria-hidden="true">
  <div class="modal-dialog">
    <form id="ticketForm" class="modal-content">
      <div class="modal-header"><h2 class="modal-title h5">New ticket</h2></div>
      <div class="modal-body">
        <div class="mb-3"><label class="form-label" for="title">Title</label><input class="form-control" id="title" name="title" required /></div>
        <div class="mb-3"><label class="form-label" for="description">Description</label><textarea class="form-control" id="description" name="description" rows="3"></textarea></div>
        <div class="mb-3"><label class="form-label" for="assigned_to">Assign to</label><select class="form-select" id="assigned_to" name="assigned_to">{{USER_OPTIONS}}</select></div>
      </div>
      <div class="modal-footer"><button class="btn btn-primary" type="submit">Create</button></div>
    </form>
  </div>
</div>
"##;

const TICKET_FIELDS_HTML: &str = r#"<div class="mb-3"><label class="form-label" for="title">Title</label><input class="form-control" id="title" name="title" required /></div>
<div class="mb-3"><label class="form-label" for="description">Description</label><textarea class="form-control" id="description" name="description" rows="4"></textarea></div>
<div class="mb-3"><label class="form-label" for="assigned_to">Assign to</label><select class="form-select" id="assigned_to" name="assigned_to">{{USER_OPTIONS}}</select></div>
"#;

const CREDENTIALS_HTML: &str = r#"<div class="row justify-content-center">
  <div class="col-md-5">
    <h1 class="h3 mb-3">{{HEADING}}</h1>
    <form method="post" action="{{ACTION}}" class="card card-body">
      <div class="mb-3"><label class="form-label" for="username">Username</label><input class="form-control" id="username" name="username" autocomplete="username" required /></div>
      <div class="mb-3"><label class="form-label" for="password">Password</label><input class="form-control" id="password" name="password" type="password" required /></div>
      <button class="btn btn-primary" type="submit">{{HEADING}}</button>
    </form>
    <p class="mt-3">{{ALT}}</p>
  </div>
</div>
"#;
