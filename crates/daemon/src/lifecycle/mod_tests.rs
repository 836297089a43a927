use super::*;
use tempfile::TempDir;

fn sample_config(state_dir: &std::path::Path) -> Config {
    Config {
        state_dir: state_dir.to_path_buf(),
        socket_path: state_dir.join("daemon.sock"),
        lock_path: state_dir.join("daemon.pid"),
        log_dir: state_dir.join("logs"),
        sessions_dir: state_dir.join("sessions"),
        cloud_url: "https://relay.example.com".to_string(),
        cloud_ws_url: "wss://relay.example.com".to_string(),
        hub_roots: vec![],
        machine_id: MachineId::new("test-machine"),
        machine_name: "test-machine".to_string(),
        hostname: "localhost".to_string(),
        rescan_interval: std::time::Duration::from_secs(30),
        sync_server_binary: "mrmd-sync-server".into(),
        user_id: "user-1".to_string(),
        token: "tok".to_string(),
    }
}

#[test]
fn config_paths_are_rooted_under_state_dir() {
    let dir = TempDir::new().expect("tempdir");
    let config = sample_config(dir.path());
    assert_eq!(config.socket_path, dir.path().join("daemon.sock"));
    assert_eq!(config.lock_path, dir.path().join("daemon.pid"));
}
