//! 중계 서버 환경 설정 모듈
//!
//! `.env` 파일과 환경변수에서 서버 설정을 읽습니다. 명령행 인자는
//! `main`에서 이 값을 덮어씁니다.

use anyhow::Result;
use shared::config::{env_or, env_parse, is_valid_port, load_env_file, DbConfig};
use shared::protocol::codec::DEFAULT_MAX_PACKAGE_LENGTH;
use std::time::Duration;
use tracing::info;

/// 기본 수신 포트
pub const DEFAULT_PORT: u16 = 7777;

/// 기본 폴링 타임아웃 (밀리초)
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 50;

/// 기본 최대 동시 연결 수
pub const DEFAULT_MAX_CONNECTIONS: usize = 1000;

/// 중계 서버 설정 구조체
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// 수신 주소 (빈 문자열이면 모든 인터페이스)
    pub host: String,
    /// 수신 포트
    pub port: u16,
    /// 저장소 설정
    pub db: DbConfig,
    /// 준비 상태 대기 최대 시간 (밀리초)
    pub poll_timeout_ms: u64,
    /// 최대 페이로드 크기 (바이트)
    pub max_package_length: usize,
    /// 최대 동시 연결 수
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            db: DbConfig::default(),
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
            max_package_length: DEFAULT_MAX_PACKAGE_LENGTH,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl ServerConfig {
    /// 환경변수에서 설정을 로드합니다.
    ///
    /// 환경변수:
    /// - messenger_host: 수신 주소 (기본값: 모든 인터페이스)
    /// - messenger_port: 수신 포트 (기본값: 7777)
    /// - messenger_db_url: 저장소 URL (기본값: sqlite://server_base.db3)
    /// - messenger_poll_timeout_ms: 폴링 타임아웃 (기본값: 50)
    /// - messenger_max_package_length: 최대 페이로드 (기본값: 4096)
    /// - messenger_max_connections: 최대 연결 수 (기본값: 1000)
    pub fn from_env() -> Self {
        load_env_file();

        let config = Self {
            host: env_or("messenger_host", ""),
            port: env_parse("messenger_port", DEFAULT_PORT),
            db: DbConfig::from_env(),
            poll_timeout_ms: env_parse("messenger_poll_timeout_ms", DEFAULT_POLL_TIMEOUT_MS),
            max_package_length: env_parse(
                "messenger_max_package_length",
                DEFAULT_MAX_PACKAGE_LENGTH,
            ),
            max_connections: env_parse("messenger_max_connections", DEFAULT_MAX_CONNECTIONS),
        };

        info!("중계 서버 설정 로드 완료: {:?}", config);
        config
    }

    /// 로그 표시용 바인딩 주소
    pub fn bind_address(&self) -> String {
        let host = if self.host.is_empty() { "0.0.0.0" } else { &self.host };
        format!("{}:{}", host, self.port)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

/// 설정 검증 유틸리티
pub fn validate_config(config: &ServerConfig) -> Result<()> {
    if !is_valid_port(config.port) {
        anyhow::bail!(
            "유효하지 않은 포트 번호: {} (1024 < port < 65535)",
            config.port
        );
    }

    if config.poll_timeout_ms == 0 {
        anyhow::bail!("폴링 타임아웃은 0보다 커야 합니다");
    }

    if config.max_package_length == 0 || config.max_package_length > u32::MAX as usize {
        anyhow::bail!(
            "유효하지 않은 최대 페이로드 크기: {}",
            config.max_package_length
        );
    }

    if config.max_connections == 0 {
        anyhow::bail!("최대 연결 수는 0보다 커야 합니다");
    }

    if config.db.url.is_empty() {
        anyhow::bail!("저장소 URL이 비어있습니다");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:7777");
        assert_eq!(config.poll_timeout(), Duration::from_millis(50));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let low_port = ServerConfig {
            port: 1024,
            ..ServerConfig::default()
        };
        assert!(validate_config(&low_port).is_err());

        let no_timeout = ServerConfig {
            poll_timeout_ms: 0,
            ..ServerConfig::default()
        };
        assert!(validate_config(&no_timeout).is_err());

        let no_payload = ServerConfig {
            max_package_length: 0,
            ..ServerConfig::default()
        };
        assert!(validate_config(&no_payload).is_err());

        let host = ServerConfig {
            host: "127.0.0.1".to_string(),
            ..ServerConfig::default()
        };
        assert_eq!(host.bind_address(), "127.0.0.1:7777");
    }
}
