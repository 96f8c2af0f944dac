//! Shared test utilities for slicectl-api integration tests.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use reqwest::{Client, Response as ReqwestResponse};
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::net::TcpListener;

use slicectl_api::auth::hash_password;
use slicectl_api::rest::routes::create_router;
use slicectl_api::state::AppState;
use slicectl_api::store::{SqliteStore, Store};
use slicectl_core::config::Settings;
use slicectl_core::types::Worker;
use slicectl_placement::PlacementEngine;
use slicectl_remote::executor::SshCredential;
use slicectl_remote::RemoteExecutor;

pub const JWT_SECRET: &str = "test-secret";

fn test_settings() -> Settings {
    Settings {
        listen: "0.0.0.0:0".into(),
        database_url: "sqlite::memory:".into(),
        jwt_secret: JWT_SECRET.into(),
        jwt_algorithm: "HS256".into(),
        token_ttl_minutes: 60,
        ssh_user: "test".into(),
        ssh_password: Some("unused".into()),
        ssh_key_path: None,
        gateway_host: Ipv4Addr::new(127, 0, 0, 1),
        // Port 1 is a privileged port nothing in this suite listens on, so
        // every SSH connect attempt fails fast with "connection refused"
        // instead of the default 30s timeout.
        workers: vec![Worker {
            id: 1,
            ip: Ipv4Addr::new(127, 0, 0, 1),
            ssh_port: 1,
        }],
        head_node: "127.0.0.1:9000".into(),
        image_root: std::env::temp_dir().to_string_lossy().into_owned(),
        default_image_path: "/var/lib/slicectl/images/default.qcow2".into(),
        monitoring_tunnel: "127.0.0.1:22".into(),
        monitoring_remote_port: 9090,
        power_idle_default: 100.0,
        power_max_default: 250.0,
        log_filter: "info".into(),
        dev: true,
    }
}

/// A running instance of the API, bound to an OS-assigned port, backed by
/// an in-memory SQLite database seeded with one user.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl TestServer {
    /// Spawn a server with a fresh in-memory database and a single
    /// `alice` / `hunter2` user with the `admin` role.
    pub async fn spawn() -> Self {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("failed to open in-memory database");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("failed to run migrations");

        sqlx::query("INSERT INTO user (username, password_hash, role) VALUES (?, ?, 'admin')")
            .bind("alice")
            .bind(hash_password("hunter2"))
            .execute(&pool)
            .await
            .expect("failed to seed user");
        sqlx::query("INSERT INTO user (username, password_hash, role) VALUES (?, ?, 'user')")
            .bind("bob")
            .bind(hash_password("swordfish"))
            .execute(&pool)
            .await
            .expect("failed to seed user");
        sqlx::query("INSERT INTO flavor (name, cpu, ram_mb, disk_gb) VALUES ('small', 1, 1024, 10)")
            .execute(&pool)
            .await
            .expect("failed to seed flavor");
        sqlx::query(
            "INSERT INTO image (name, path, sha256, size_bytes, reference_count) VALUES ('base', '/tmp/base.qcow2', 'deadbeef', 1024, 0)",
        )
        .execute(&pool)
        .await
        .expect("failed to seed image");

        let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool));
        let settings = Arc::new(test_settings());
        let executor = RemoteExecutor::new(
            settings.gateway_host,
            settings.ssh_user.clone(),
            SshCredential::Password("unused".into()),
        );
        let placement = Arc::new(PlacementEngine::new(42));

        let app_state = AppState::new(store, settings, executor, placement, None);
        let router = create_router(app_state);

        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let listener = TcpListener::bind(addr).await.expect("failed to bind");
        let actual_addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("server error");
        });

        tokio::time::sleep(std::time::Duration::from_millis(30)).await;

        Self {
            addr: actual_addr,
            client: Client::new(),
            shutdown_tx,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Log in as the seeded `alice` user and return a bearer token.
    pub async fn login(&self) -> String {
        self.login_as("alice", "hunter2").await
    }

    /// Log in as the seeded `bob` user and return a bearer token.
    pub async fn login_as_bob(&self) -> String {
        self.login_as("bob", "swordfish").await
    }

    pub async fn login_as(&self, username: &str, password: &str) -> String {
        let resp = self
            .client
            .post(format!("{}/login", self.base_url()))
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .expect("login request failed");
        assert_eq!(resp.status(), 200, "login did not succeed");
        let body: serde_json::Value = resp.json().await.unwrap();
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn get(&self, path: &str, token: &str) -> ReqwestResponse {
        self.client
            .get(format!("{}{}", self.base_url(), path))
            .bearer_auth(token)
            .send()
            .await
            .expect("request failed")
    }

    pub async fn post_json<T: Serialize>(&self, path: &str, token: &str, body: &T) -> ReqwestResponse {
        self.client
            .post(format!("{}{}", self.base_url(), path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("request failed")
    }

    pub async fn upload_image(&self, token: &str, filename: &str, bytes: Vec<u8>) -> ReqwestResponse {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        self.client
            .post(format!("{}/images/upload", self.base_url()))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .expect("request failed")
    }

    pub async fn delete(&self, path: &str, token: &str) -> ReqwestResponse {
        self.client
            .delete(format!("{}{}", self.base_url(), path))
            .bearer_auth(token)
            .send()
            .await
            .expect("request failed")
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}
