//! 서버 시작과 핸들
//!
//! [`start`]는 리스너를 바인딩하고 중계 루프를 태스크로 띄운 뒤
//! [`ServerHandle`]을 돌려줍니다. 관찰자는 핸들을 통해 이벤트를 구독하고
//! 저장소 스냅샷을 읽을 뿐, 루프 내부 상태에는 접근하지 않습니다.

use anyhow::{anyhow, Context, Result};
use shared::store::{Account, ActiveSession, LoginRecord, MessengerStore, StoreResult, UsageStats};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::ServerConfig;
use crate::event::{EventPublisher, ServerEvent};
use crate::network::ServerSocket;
use crate::service::ConnectionService;

/// 실행 중인 서버 핸들
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    events: EventPublisher,
    store: Arc<dyn MessengerStore>,
    task: JoinHandle<Result<()>>,
}

/// 기본 설정으로 서버를 시작합니다.
pub async fn start(address: &str, port: u16, store: Arc<dyn MessengerStore>) -> Result<ServerHandle> {
    let config = ServerConfig {
        host: address.to_string(),
        port,
        ..ServerConfig::default()
    };
    start_with_config(&config, store).await
}

/// 설정을 지정해 서버를 시작합니다.
pub async fn start_with_config(
    config: &ServerConfig,
    store: Arc<dyn MessengerStore>,
) -> Result<ServerHandle> {
    let listener = ServerSocket::bind(&config.host, config.port)
        .await
        .with_context(|| format!("리스너 바인드 실패: {}", config.bind_address()))?;
    let local_addr = listener.local_addr().context("바인딩 주소 확인 실패")?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let events = EventPublisher::new();
    let service = ConnectionService::new(
        listener,
        config,
        store.clone(),
        events.clone(),
        shutdown.clone(),
    );
    let task = tokio::spawn(service.run());

    info!("✅ 중계 서버가 {}에서 실행 중입니다", local_addr);
    Ok(ServerHandle {
        local_addr,
        shutdown,
        events,
        store,
        task,
    })
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    /// 종료 플래그 설정. 루프는 현재 반복을 마친 뒤 멈춥니다.
    pub fn shutdown(&self) {
        info!("🛑 중계 서버 종료 요청");
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// 루프가 끝날 때까지 기다립니다.
    pub async fn wait(self) -> Result<()> {
        self.task
            .await
            .map_err(|e| anyhow!("중계 루프 태스크 실패: {}", e))?
    }

    pub async fn active_sessions(&self) -> StoreResult<Vec<ActiveSession>> {
        self.store.active_sessions().await
    }

    pub async fn all_accounts(&self) -> StoreResult<Vec<Account>> {
        self.store.all_accounts().await
    }

    pub async fn usage_stats(&self) -> StoreResult<Vec<UsageStats>> {
        self.store.usage_stats().await
    }

    pub async fn login_history(&self, name: Option<&str>) -> StoreResult<Vec<LoginRecord>> {
        self.store.login_history(name).await
    }
}
