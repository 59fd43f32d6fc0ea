use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

const ADMIN_PASSWORD: &str = "http-test-admin";

#[derive(Debug, Deserialize)]
struct Counts {
    open: u64,
    in_progress: u64,
    closed: u64,
}

#[derive(Debug, Deserialize)]
struct Created {
    success: bool,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct StatusReply {
    success: bool,
    error: Option<String>,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));
static USER_SEQ: AtomicU32 = AtomicU32::new(0);

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_path() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("helpdesk_http_{}_{}.json", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/login")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let data_path = unique_data_path();
    let child = Command::new(env!("CARGO_BIN_EXE_helpdesk"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", data_path)
        .env("HELPDESK_ADMIN_PASSWORD", ADMIN_PASSWORD)
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

fn session_client() -> Client {
    Client::builder().cookie_store(true).build().unwrap()
}

async fn login(server: &TestServer, username: &str, password: &str) -> Client {
    let client = session_client();
    let resp = client
        .post(format!("{}/login", server.base_url))
        .form(&[("username", username), ("password", password)])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.url().path(), "/", "login as {username} failed");
    client
}

async fn register_and_login(server: &TestServer) -> (Client, String) {
    let username = format!("user{}", USER_SEQ.fetch_add(1, Ordering::SeqCst));
    let resp = session_client()
        .post(format!("{}/register", server.base_url))
        .form(&[("username", username.as_str()), ("password", "pw")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.url().path(), "/login");
    (login(server, &username, "pw").await, username)
}

async fn counts(client: &Client, server: &TestServer) -> Counts {
    client
        .get(format!("{}/api/counts", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn create_ticket(client: &Client, server: &TestServer, title: &str) {
    let resp = client
        .post(format!("{}/new", server.base_url))
        .form(&[("title", title), ("description", "from tests"), ("assigned_to", "")])
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
}

/// Highest ticket id visible on the dashboard.
async fn latest_ticket_id(client: &Client, server: &TestServer) -> u64 {
    let html = client
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    html.split("status-select\" data-id=\"")
        .skip(1)
        .filter_map(|rest| rest.split('"').next()?.parse().ok())
        .max()
        .expect("dashboard lists a ticket")
}

async fn post_status(client: &Client, server: &TestServer, id: &str, status: &str) -> (StatusCode, StatusReply) {
    let resp = client
        .post(format!("{}/update_status", server.base_url))
        .form(&[("id", id), ("status", status)])
        .send()
        .await
        .unwrap();
    let code = resp.status();
    (code, resp.json().await.unwrap())
}

#[tokio::test]
async fn http_anonymous_dashboard_redirects_to_login() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;

    let resp = session_client()
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.url().path(), "/login");
    let html = resp.text().await.unwrap();
    assert!(html.contains("Please log in."));
}

#[tokio::test]
async fn http_ticket_lifecycle_updates_counts() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let admin = login(&server, "admin", ADMIN_PASSWORD).await;

    let before = counts(&admin, &server).await;
    create_ticket(&admin, &server, "VPN down").await;
    let after_create = counts(&admin, &server).await;
    assert_eq!(after_create.open, before.open + 1);

    let id = latest_ticket_id(&admin, &server).await;
    let (code, reply) = post_status(&admin, &server, &id.to_string(), "closed").await;
    assert_eq!(code, StatusCode::OK);
    assert!(reply.success);
    assert!(reply.error.is_none());

    let after_close = counts(&admin, &server).await;
    assert_eq!(after_close.open, before.open);
    assert_eq!(after_close.closed, before.closed + 1);
    assert_eq!(after_close.in_progress, before.in_progress);

    let chart: serde_json::Value = admin
        .get(format!("{}/api/chart", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        chart["data"]["datasets"][0]["data"],
        serde_json::json!([after_close.open, after_close.in_progress, after_close.closed])
    );
}

#[tokio::test]
async fn http_update_status_reports_failures() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let admin = login(&server, "admin", ADMIN_PASSWORD).await;
    create_ticket(&admin, &server, "Printer issue").await;
    let id = latest_ticket_id(&admin, &server).await.to_string();

    let (code, reply) = post_status(&admin, &server, "999999", "closed").await;
    assert_eq!(code, StatusCode::NOT_FOUND);
    assert!(!reply.success);
    assert_eq!(reply.error.as_deref(), Some("Ticket not found"));

    let (code, reply) = post_status(&admin, &server, &id, "pending").await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert!(!reply.success);

    let (user, _) = register_and_login(&server).await;
    let (code, reply) = post_status(&user, &server, &id, "closed").await;
    assert_eq!(code, StatusCode::FORBIDDEN);
    assert_eq!(reply.error.as_deref(), Some("Permission denied"));

    let (code, _) = post_status(&session_client(), &server, &id, "closed").await;
    assert_eq!(code, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn http_users_see_only_their_tickets_and_cannot_export() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let admin = login(&server, "admin", ADMIN_PASSWORD).await;
    create_ticket(&admin, &server, "Admin-only ticket").await;

    let (user, username) = register_and_login(&server).await;
    create_ticket(&user, &server, "Disk full").await;
    let html = user
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("Disk full"));
    assert!(!html.contains("Admin-only ticket"));

    let resp = user
        .get(format!("{}/export/csv", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.url().path(), "/");

    let resp = admin
        .get(format!("{}/export/csv", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "text/csv; charset=utf-8"
    );
    let csv = resp.text().await.unwrap();
    assert!(csv.starts_with("id,title,description,status,created_at,created_by,assigned_to\n"));
    assert!(csv.contains("Disk full,from tests,Open,"));
    assert!(csv.contains(&username));
}

#[tokio::test]
async fn http_staff_export_tickets_as_a_workbook() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let admin = login(&server, "admin", ADMIN_PASSWORD).await;
    create_ticket(&admin, &server, "Monitor flicker").await;

    let (user, _) = register_and_login(&server).await;
    let resp = user
        .get(format!("{}/export/xlsx", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.url().path(), "/");
    assert!(resp.text().await.unwrap().contains("You do not have permission."));

    let resp = admin
        .get(format!("{}/export/xlsx", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    assert_eq!(
        resp.headers()["content-disposition"].to_str().unwrap(),
        "attachment; filename=\"tickets.xlsx\""
    );
    let bytes = resp.bytes().await.unwrap();
    assert!(bytes.starts_with(b"PK\x03\x04"), "workbook is a zip archive");
}

#[tokio::test]
async fn http_ajax_ticket_creation_keeps_the_flash_for_the_reload() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let (user, _) = register_and_login(&server).await;
    // drain the login flash
    user.get(format!("{}/", server.base_url)).send().await.unwrap();

    let resp = user
        .post(format!("{}/new", server.base_url))
        .header("X-Requested-With", "XMLHttpRequest")
        .form(&[("title", "Keyboard sticky"), ("description", "from the modal"), ("assigned_to", "")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(resp.url().path(), "/new");
    let created: Created = resp.json().await.unwrap();
    assert!(created.success);

    let html = user
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("Ticket created."));
    assert!(html.contains(&format!("status-select\" data-id=\"{}\"", created.id)));

    let html = user
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(!html.contains("Ticket created."));
}

#[tokio::test]
async fn http_serves_page_scripts_and_service_worker() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let sw = client
        .get(format!("{}/sw.js", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(sw.status().is_success());
    let sw = sw.text().await.unwrap();
    assert!(sw.contains("caches.open('helpdesk-v1')"));

    for path in ["/static/css/style.css", "/static/js/main.js", "/static/js/chart.js"] {
        let resp = client
            .get(format!("{}{path}", server.base_url))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success(), "{path} not served");
    }
}
