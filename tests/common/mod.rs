//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::put;
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use mesh_fixture::config::FixtureConfig;
use mesh_fixture::lifecycle::startup::{self, StartupError};
use mesh_fixture::lifecycle::Shutdown;

/// In-process stand-in for a registry agent.
///
/// Records every register body and deregister ID, and answers with a
/// programmable status. With `hang` set it never answers at all.
#[derive(Clone, Default)]
pub struct MockRegistry {
    state: Arc<MockState>,
}

#[derive(Default)]
struct MockState {
    registrations: Mutex<Vec<Value>>,
    deregistrations: Mutex<Vec<String>>,
    status: AtomicU16,
    hang: AtomicBool,
}

impl MockRegistry {
    pub fn registrations(&self) -> Vec<Value> {
        self.state.registrations.lock().unwrap().clone()
    }

    pub fn deregistrations(&self) -> Vec<String> {
        self.state.deregistrations.lock().unwrap().clone()
    }

    pub fn respond_with(&self, status: u16) {
        self.state.status.store(status, Ordering::SeqCst);
    }

    pub fn hang(&self) {
        self.state.hang.store(true, Ordering::SeqCst);
    }

    async fn reply(&self) -> StatusCode {
        if self.state.hang.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        match self.state.status.load(Ordering::SeqCst) {
            0 => StatusCode::OK,
            code => StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

async fn register(State(mock): State<MockRegistry>, Json(body): Json<Value>) -> StatusCode {
    mock.state.registrations.lock().unwrap().push(body);
    mock.reply().await
}

async fn deregister(State(mock): State<MockRegistry>, Path(id): Path<String>) -> StatusCode {
    mock.state.deregistrations.lock().unwrap().push(id);
    mock.reply().await
}

/// Start a mock registry on an ephemeral local port.
pub async fn start_mock_registry() -> (MockRegistry, SocketAddr) {
    let mock = MockRegistry::default();
    let app = Router::new()
        .route("/v1/agent/service/register", put(register))
        .route("/v1/agent/service/deregister/{id}", put(deregister))
        .with_state(mock.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (mock, addr)
}

/// Fixture config pointed at a registry on `registry`, if any.
pub fn fixture_config(registry: Option<SocketAddr>) -> FixtureConfig {
    let mut config = FixtureConfig::default();
    config.listener.bind_host = "127.0.0.1".into();
    config.service.name = "hello-service".into();
    config.service.container_name = "localhost".into();
    if let Some(addr) = registry {
        config.registry.enabled = true;
        config.registry.host = addr.ip().to_string();
        config.registry.port = addr.port();
    }
    config
}

/// A fixture running in the background on an ephemeral port.
pub struct RunningFixture {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub task: JoinHandle<Result<(), StartupError>>,
}

impl RunningFixture {
    /// Trigger shutdown and wait for the fixture to exit.
    pub async fn stop(self) -> Result<(), StartupError> {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(15), self.task)
            .await
            .expect("fixture did not stop in time")
            .expect("fixture task panicked")
    }
}

pub async fn start_fixture(config: FixtureConfig) -> RunningFixture {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let task = tokio::spawn(startup::serve(config, listener, shutdown.clone()));
    RunningFixture { addr, shutdown, task }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .use_rustls_tls()
        .danger_accept_invalid_certs(true)
        .build()
        .unwrap()
}

/// Poll `url` until it answers 200 or the deadline passes.
pub async fn wait_until_ready(client: &reqwest::Client, url: &str) -> reqwest::Response {
    for _ in 0..100 {
        if let Ok(response) = client.get(url).send().await {
            if response.status().is_success() {
                return response;
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("{url} never became ready");
}
