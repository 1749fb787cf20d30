//! 통합 로깅 시스템
//!
//! `tracing` + `tracing-subscriber` 기반 로깅 초기화를 제공합니다.
//!
//! # 사용 예시
//! ```rust,no_run
//! use shared::logging::{init_logging, LoggingConfig, ServiceType};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(ServiceType::RelayServer, &LoggingConfig::default())?;
//!     tracing::info!("서버 시작");
//!     Ok(())
//! }
//! ```

pub mod config;

pub use config::{LoggingConfig, ServiceType};

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// 로깅 시스템 초기화 함수
///
/// `RUST_LOG` 환경변수가 있으면 그 필터를, 없으면 설정의 기본 필터를 사용합니다.
/// 이미 전역 subscriber가 설치된 경우 에러를 반환합니다.
pub fn init_logging(service_type: ServiceType, config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_filter.as_str()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_ansi(config.ansi)
        .try_init()
        .map_err(|e| anyhow!("로깅 초기화 실패 ({}): {}", service_type.as_str(), e))?;

    tracing::debug!("로깅 시스템 초기화 완료: {}", service_type.as_str());
    Ok(())
}
