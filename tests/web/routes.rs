use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reposcan::core::cancel::CancelToken;
use reposcan::scanner::api::{
    RepositoryAcquirer, RunLayout, ScanWorkflow, ScannerRunner,
};
use reposcan::scanner::types::ReportFormat;
use reposcan::web::{self, AppState};
use serde_json::Value;
use tempfile::TempDir;

use crate::common::fixtures::*;

const DEFAULT_URL: &str = "https://github.com/django/django.git";

struct TestServer {
    addr: SocketAddr,
    shutdown: CancelToken,
    client: reqwest::Client,
}

impl TestServer {
    async fn start(workflow: ScanWorkflow) -> Self {
        let shutdown = CancelToken::new();
        let state = AppState::new(workflow, DEFAULT_URL, shutdown.clone()).unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server_token = shutdown.clone();
        tokio::spawn(async move { web::serve(listener, state, server_token).await });

        Self {
            addr,
            shutdown,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    async fn scan(&self, repo_url: &str) -> reqwest::Response {
        self.client
            .post(self.url("/scan"))
            .form(&[("repo_url", repo_url)])
            .send()
            .await
            .unwrap()
    }

    async fn state(&self) -> String {
        let body: Value = self.get("/api/status").await.json().await.unwrap();
        body["state"].as_str().unwrap_or_default().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn idle_workflow(root: &std::path::Path) -> ScanWorkflow {
    ScanWorkflow::new(
        RepositoryAcquirer::new(Arc::new(UnreachableClone)),
        ScannerRunner::new("bandit", ReportFormat::Text),
        fixed_layout(root),
    )
}

#[tokio::test]
async fn test_initial_page_and_api() {
    let temp_dir = TempDir::new().unwrap();
    let server = TestServer::start(idle_workflow(temp_dir.path())).await;

    let health = server.get("/health").await;
    assert_eq!(health.status(), 200);
    assert_eq!(health.text().await.unwrap(), "ok");

    let page = server.get("/").await;
    assert_eq!(page.status(), 200);
    let html = page.text().await.unwrap();
    assert!(html.contains("Git Repository Security Scanner"));
    assert!(html.contains("Start Scan"));
    assert!(html.contains("django.git"));

    assert_eq!(server.state().await, "idle");
    assert_eq!(server.get("/api/last").await.status(), 404);
}

#[cfg(unix)]
#[tokio::test]
async fn test_scan_renders_metrics_and_report() {
    let temp_dir = TempDir::new().unwrap();
    let scanner = reporting_scanner(temp_dir.path(), 2);
    let server = TestServer::start(workflow(
        FixtureClone::new(),
        &scanner,
        RunLayout::PerRun {
            root: temp_dir.path().join("runs"),
        },
    ))
    .await;

    let response = server.scan(SAMPLE_URL).await;
    assert_eq!(response.status(), 200);
    let html = response.text().await.unwrap();
    assert!(html.contains("Total Issues"));
    assert!(html.contains("Execution Time"));
    assert!(html.contains(" sec"));
    assert!(html.contains("Detailed Bandit Report"));
    assert!(html.contains("&gt;&gt; Issue: [B101:assert_used]"));

    assert!(html.contains(">displayed<"));
    assert_eq!(server.state().await, "idle");
    let last: Value = server.get("/api/last").await.json().await.unwrap();
    assert_eq!(last["summary"]["total_issues"], 2);
    assert_eq!(last["url"], SAMPLE_URL);
    assert!(last["summary"]["execution_time"]
        .as_str()
        .unwrap()
        .ends_with(" sec"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_locked_directory_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let scanner = reporting_scanner(temp_dir.path(), 1);
    let layout = fixed_layout(temp_dir.path());
    let RunLayout::Fixed(paths) = layout.clone() else {
        unreachable!()
    };
    std::fs::create_dir_all(&paths.clone_dir).unwrap();

    let server = TestServer::start(ScanWorkflow::new(
        RepositoryAcquirer::new(FixtureClone::new()).with_remover(deny_removal),
        ScannerRunner::new(scanner.to_string_lossy(), ReportFormat::Text),
        layout,
    ))
    .await;

    let response = server.scan(SAMPLE_URL).await;
    assert_eq!(response.status(), 423);
    let html = response.text().await.unwrap();
    assert!(html.contains("Make sure no files are in use."));
    assert!(!html.contains("Total Issues"));
    assert!(!paths.report_path.exists());
    assert!(html.contains(">error<"));
    assert_eq!(server.state().await, "idle");
}

#[tokio::test]
async fn test_clone_failure_is_server_error() {
    let temp_dir = TempDir::new().unwrap();
    let server = TestServer::start(idle_workflow(temp_dir.path())).await;

    let response = server.scan(SAMPLE_URL).await;
    assert_eq!(response.status(), 500);
    let html = response.text().await.unwrap();
    assert!(html.contains("could not resolve host"));
    assert_eq!(server.get("/api/last").await.status(), 404);
}

#[cfg(unix)]
#[tokio::test]
async fn test_second_trigger_while_running_conflicts() {
    let temp_dir = TempDir::new().unwrap();
    let scanner = fake_scanner(temp_dir.path(), "sleep 2\necho 'Issue:' > \"$6\"\nexit 1");
    let server = Arc::new(
        TestServer::start(workflow(
            FixtureClone::new(),
            &scanner,
            fixed_layout(temp_dir.path()),
        ))
        .await,
    );

    let first = {
        let server = server.clone();
        tokio::spawn(async move { server.scan(SAMPLE_URL).await.status() })
    };

    let mut waited = Duration::ZERO;
    while server.state().await != "scanning" {
        assert!(waited < Duration::from_secs(5), "scan never started");
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += Duration::from_millis(20);
    }

    let second = server.scan("https://example.com/other.git").await;
    assert_eq!(second.status(), 409);
    assert!(second.text().await.unwrap().contains("already running"));

    assert_eq!(first.await.unwrap(), 200);
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_scan_hides_previous_results() {
    let temp_dir = TempDir::new().unwrap();
    let scanner = reporting_scanner(temp_dir.path(), 3);
    let server = TestServer::start(workflow(
        FixtureClone::new(),
        &scanner,
        RunLayout::PerRun {
            root: temp_dir.path().join("runs"),
        },
    ))
    .await;

    let first = server.scan(SAMPLE_URL).await;
    assert_eq!(first.status(), 200);
    assert!(first.text().await.unwrap().contains("Total Issues"));

    let failed = server.scan("   ").await;
    assert_eq!(failed.status(), 500);
    let html = failed.text().await.unwrap();
    assert!(!html.contains("Total Issues"));
    assert!(!html.contains("Detailed Bandit Report"));
    assert_eq!(server.state().await, "idle");

    let page = server.get("/").await.text().await.unwrap();
    assert!(!page.contains("Total Issues"));

    let last: Value = server.get("/api/last").await.json().await.unwrap();
    assert_eq!(last["summary"]["total_issues"], 3);
}

#[tokio::test]
async fn test_disconnected_client_keeps_run_guarded() {
    let temp_dir = TempDir::new().unwrap();
    let server = TestServer::start(ScanWorkflow::new(
        RepositoryAcquirer::new(Arc::new(SlowClone::new(Duration::from_millis(600)))),
        ScannerRunner::new("bandit", ReportFormat::Text),
        fixed_layout(temp_dir.path()),
    ))
    .await;

    let abandoned = tokio::time::timeout(Duration::from_millis(150), server.scan(SAMPLE_URL)).await;
    assert!(abandoned.is_err(), "scan should still be running");

    let second = server.scan("https://example.com/other.git").await;
    assert_eq!(second.status(), 409);
}
