//! 클라이언트 환경 설정 모듈

use anyhow::Result;
use shared::config::{env_or, env_parse, is_valid_port, load_env_file};
use shared::protocol::codec::DEFAULT_MAX_PACKAGE_LENGTH;
use std::time::Duration;
use tracing::info;

/// 기본 서버 포트
pub const DEFAULT_SERVER_PORT: u16 = 7777;

/// 요청 응답 대기 시간 (초)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

/// 클라이언트 설정 구조체
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub server_host: String,
    pub server_port: u16,
    pub user_name: String,
    pub password: String,
    pub max_package_length: usize,
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: DEFAULT_SERVER_PORT,
            user_name: "Guest".to_string(),
            password: String::new(),
            max_package_length: DEFAULT_MAX_PACKAGE_LENGTH,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// 환경변수에서 설정을 로드합니다.
    ///
    /// 환경변수:
    /// - messenger_server_host: 서버 주소 (기본값: "127.0.0.1")
    /// - messenger_server_port: 서버 포트 (기본값: 7777)
    /// - messenger_user: 사용자 이름 (기본값: "Guest")
    /// - messenger_password: 비밀번호 (기본값: 빈 문자열)
    pub fn from_env() -> Self {
        load_env_file();

        let defaults = Self::default();
        let config = Self {
            server_host: env_or("messenger_server_host", &defaults.server_host),
            server_port: env_parse("messenger_server_port", defaults.server_port),
            user_name: env_or("messenger_user", &defaults.user_name),
            password: env_or("messenger_password", ""),
            max_package_length: env_parse(
                "messenger_max_package_length",
                defaults.max_package_length,
            ),
            request_timeout_secs: defaults.request_timeout_secs,
        };

        info!(
            "클라이언트 설정 로드 완료: {}@{}",
            config.user_name,
            config.server_address()
        );
        config
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 설정 검증 유틸리티
pub fn validate_config(config: &ClientConfig) -> Result<()> {
    if config.server_host.is_empty() {
        anyhow::bail!("서버 주소가 비어있습니다");
    }

    if !is_valid_port(config.server_port) {
        anyhow::bail!(
            "유효하지 않은 포트 번호: {} (1024 < port < 65535)",
            config.server_port
        );
    }

    if config.user_name.trim().is_empty() {
        anyhow::bail!("사용자 이름이 비어있습니다");
    }

    if config.max_package_length == 0 {
        anyhow::bail!("최대 페이로드 크기는 0보다 커야 합니다");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_client_config() {
        let config = ClientConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.server_address(), "127.0.0.1:7777");

        let bad_port = ClientConfig {
            server_port: 80,
            ..ClientConfig::default()
        };
        assert!(validate_config(&bad_port).is_err());

        let no_name = ClientConfig {
            user_name: "  ".to_string(),
            ..ClientConfig::default()
        };
        assert!(validate_config(&no_name).is_err());
    }
}
