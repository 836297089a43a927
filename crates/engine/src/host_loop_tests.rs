use super::*;
use crate::sync_pool::SyncServerSpawnConfig;
use magent_config::MANIFEST_FILE_NAME;
use magent_core::SystemClock;
use std::io::Write as _;
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn fake_sync_server_binary(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("fake-sync-server");
    let script = r#"#!/usr/bin/env python3
import socket, sys, time
port = int(sys.argv[sys.argv.index("--port") + 1])
s = socket.socket(socket.AF_INET, socket.SOCK_STREAM)
s.setsockopt(socket.SOL_SOCKET, socket.SO_REUSEADDR, 1)
s.bind(("127.0.0.1", port))
s.listen(5)
time.sleep(60)
"#;
    let mut file = std::fs::File::create(&path).expect("create fixture");
    file.write_all(script.as_bytes()).expect("write fixture");
    let mut perms = file.metadata().expect("metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod");
    path
}

fn test_config(cloud_url: String, hub_roots: Vec<PathBuf>) -> HostLoopConfig {
    HostLoopConfig {
        cloud_url,
        hub_roots,
        user_id: "user-1".to_string(),
        token: "secret".to_string(),
        machine_id: MachineId::new("machine-1"),
        machine_name: "test-machine".to_string(),
        hostname: "test-host".to_string(),
        capabilities: vec!["bridge".to_string()],
        scan_interval: Duration::from_secs(30),
    }
}

fn write_project(hub: &Path, name: &str) -> PathBuf {
    let dir = hub.join(name);
    std::fs::create_dir_all(&dir).expect("mkdir");
    std::fs::write(dir.join(MANIFEST_FILE_NAME), "# project\n").expect("write manifest");
    std::fs::write(dir.join("notes.md"), "hello\n").expect("write doc");
    dir
}

#[test]
fn write_missing_document_creates_file_and_skips_existing() {
    let project = TempDir::new().expect("tempdir");
    write_missing_document(project.path(), "sub/doc", "content").expect("write");
    let path = project.path().join("sub/doc.md");
    assert_eq!(std::fs::read_to_string(&path).expect("read"), "content");

    // A document that already exists locally is never overwritten.
    write_missing_document(project.path(), "sub/doc", "different").expect("write");
    assert_eq!(std::fs::read_to_string(&path).expect("read"), "content");
}

#[tokio::test]
async fn host_project_acquires_a_sync_server_and_records_active_project() {
    let fixtures = TempDir::new().expect("tempdir");
    let tmp = TempDir::new().expect("tempdir");
    let hub = TempDir::new().expect("tempdir");
    let project_dir = write_project(hub.path(), "proj-a");

    let mut spawn_config = SyncServerSpawnConfig::new(fake_sync_server_binary(&fixtures));
    spawn_config.startup_timeout = Duration::from_secs(5);
    let sync_pool = Arc::new(SyncPool::new(tmp.path(), spawn_config, SystemClock));
    let active_projects: ActiveProjects = Arc::new(parking_lot::Mutex::new(HashMap::new()));
    let host_loop = HostLoop::new(test_config("http://127.0.0.1:1".to_string(), vec![hub.path().to_path_buf()]), sync_pool, active_projects.clone());

    let project = ProjectDir { name: "proj-a".to_string(), path: project_dir.clone() };
    host_loop.host_project(&project).await.expect("host project");

    let recorded = active_projects.lock().get("proj-a").cloned().expect("recorded");
    assert_eq!(recorded.dir, std::fs::canonicalize(&project_dir).unwrap_or(project_dir));
    assert!(recorded.sync_port > 0);
}

async fn spawn_http_mock() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else { return };
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let n = stream.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]);
                let first_line = request.lines().next().unwrap_or_default();
                let body = if first_line.contains("/api/sync/documents") {
                    r#"{"documents":[{"docPath":"pulled","content":"from the cloud"}]}"#.to_string()
                } else {
                    r#"{"ok":true,"entries":[]}"#.to_string()
                };
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    port
}

#[tokio::test]
async fn scan_once_pulls_missing_documents_and_pushes_a_best_effort_catalog() {
    let fixtures = TempDir::new().expect("tempdir");
    let tmp = TempDir::new().expect("tempdir");
    let hub = TempDir::new().expect("tempdir");
    let project_dir = write_project(hub.path(), "proj-b");
    let port = spawn_http_mock().await;

    let mut spawn_config = SyncServerSpawnConfig::new(fake_sync_server_binary(&fixtures));
    spawn_config.startup_timeout = Duration::from_secs(5);
    let sync_pool = Arc::new(SyncPool::new(tmp.path(), spawn_config, SystemClock));
    let active_projects: ActiveProjects = Arc::new(parking_lot::Mutex::new(HashMap::new()));
    let host_loop = HostLoop::new(
        test_config(format!("http://127.0.0.1:{port}"), vec![hub.path().to_path_buf()]),
        sync_pool,
        active_projects.clone(),
    );

    host_loop.scan_once().await;

    assert_eq!(
        std::fs::read_to_string(project_dir.join("pulled.md")).expect("pulled doc written"),
        "from the cloud"
    );
    assert!(active_projects.lock().contains_key("proj-b"));
}

#[tokio::test]
async fn stop_releases_every_tracked_project() {
    let fixtures = TempDir::new().expect("tempdir");
    let tmp = TempDir::new().expect("tempdir");
    let hub = TempDir::new().expect("tempdir");
    let project_dir = write_project(hub.path(), "proj-c");

    let mut spawn_config = SyncServerSpawnConfig::new(fake_sync_server_binary(&fixtures));
    spawn_config.startup_timeout = Duration::from_secs(5);
    let sync_pool = Arc::new(SyncPool::new(tmp.path(), spawn_config, SystemClock));
    let active_projects: ActiveProjects = Arc::new(parking_lot::Mutex::new(HashMap::new()));
    let host_loop =
        HostLoop::new(test_config("http://127.0.0.1:1".to_string(), vec![hub.path().to_path_buf()]), Arc::clone(&sync_pool), active_projects.clone());

    let project = ProjectDir { name: "proj-c".to_string(), path: project_dir };
    host_loop.host_project(&project).await.expect("host project");
    assert_eq!(sync_pool.entry_count(), 1);

    host_loop.stop();
    assert_eq!(sync_pool.entry_count(), 0);
    assert!(active_projects.lock().is_empty());
}
