//! 메신저 중계 서버
//!
//! 환경 설정은 .env 파일과 환경변수에서 로드되며, 명령행 인자가 우선합니다.
//!
//! 환경변수:
//! - messenger_host: 수신 주소 (기본값: 모든 인터페이스)
//! - messenger_port: 수신 포트 (기본값: 7777)
//! - messenger_db_url: 저장소 URL (기본값: sqlite://server_base.db3, `memory` 가능)
//! - messenger_poll_timeout_ms: 폴링 타임아웃 (기본값: 50)
//! - messenger_max_package_length: 최대 페이로드 (기본값: 4096)
//! - messenger_max_connections: 최대 연결 수 (기본값: 1000)

use anyhow::{Context, Result};
use clap::Parser;
use shared::config::DbConfig;
use shared::logging::{init_logging, LoggingConfig, ServiceType};
use shared::store::open_store;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use relayserver::console::run_admin_console;
use relayserver::{start_with_config, validate_config, ServerConfig, ServerEvent};

#[derive(Parser, Debug)]
#[command(name = "relayserver", version, about = "메신저 중계 서버")]
struct Args {
    /// 수신 주소 (기본값: 모든 인터페이스)
    #[arg(short, long)]
    address: Option<String>,

    /// 수신 포트
    #[arg(short, long)]
    port: Option<u16>,

    /// 저장소 URL (`memory` 또는 `sqlite://경로`)
    #[arg(long, value_name = "URL")]
    db: Option<String>,

    /// 관리 콘솔 없이 Ctrl+C까지 실행
    #[arg(long)]
    no_console: bool,
}

fn apply_overrides(mut config: ServerConfig, args: &Args) -> ServerConfig {
    if let Some(address) = &args.address {
        config.host = address.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(db) = &args.db {
        config.db = DbConfig::new(db.as_str());
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(ServiceType::RelayServer, &LoggingConfig::default())?;

    let config = apply_overrides(ServerConfig::from_env(), &args);
    validate_config(&config)?;

    info!("=== 중계 서버 설정 ===");
    info!("수신 주소: {}", config.bind_address());
    info!("저장소: {}", config.db.url);
    info!("폴링 타임아웃: {}ms", config.poll_timeout_ms);
    info!("=====================");

    let store = open_store(&config.db)
        .await
        .with_context(|| format!("저장소 열기 실패: {}", config.db.url))?;
    let handle = start_with_config(&config, store).await?;

    let mut events = handle.subscribe();
    let event_logger = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ServerEvent::NewConnection { addr }) => info!("📡 새 연결: {}", addr),
                Ok(ServerEvent::ConnectionLost { addr, user }) => {
                    info!("📴 연결 종료: {} ({})", addr, user.as_deref().unwrap_or("-"))
                }
                Ok(ServerEvent::NewMessage { from, to }) => info!("💬 {} -> {}", from, to),
                Ok(ServerEvent::SessionListChanged) => {}
                Err(RecvError::Lagged(skipped)) => warn!("이벤트 {}개 누락", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    if args.no_console {
        tokio::signal::ctrl_c().await?;
        info!("종료 시그널 수신, 서버를 중지합니다...");
    } else {
        tokio::select! {
            result = run_admin_console(&handle) => {
                if let Err(e) = result {
                    error!("관리 콘솔 오류: {:#}", e);
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("종료 시그널 수신, 서버를 중지합니다...");
            }
        }
    }

    handle.shutdown();
    handle.wait().await?;
    event_logger.abort();

    info!("✅ 중계 서버가 성공적으로 중지되었습니다");
    Ok(())
}
