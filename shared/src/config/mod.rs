//! 환경 설정 공통 모듈
//!
//! `.env` 파일 로드와 환경변수 파싱 헬퍼를 제공합니다.
//! 서버/클라이언트별 설정 구조체는 각 크레이트의 `config` 모듈에 있습니다.

pub mod db;

pub use db::DbConfig;

use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

/// `.env` 파일을 로드합니다.
///
/// 로드 순서:
/// 1. 현재 디렉토리의 .env 파일
/// 2. 상위 디렉토리의 .env 파일 (워크스페이스 멤버에서 실행되는 경우)
/// 3. 상위의 상위 디렉토리
///
/// 찾지 못하면 시스템 환경변수와 기본값만 사용합니다.
pub fn load_env_file() -> bool {
    let env_paths = [".env", "../.env", "../../.env"];

    for path in env_paths {
        if Path::new(path).exists() && dotenv::from_filename(path).is_ok() {
            info!(".env 파일 로드 성공: {}", path);
            return true;
        }
    }

    warn!(".env 파일을 찾을 수 없습니다. 기본값과 시스템 환경변수를 사용합니다.");
    false
}

/// 문자열 환경변수 (없으면 기본값)
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// 파싱 가능한 환경변수 (없거나 파싱 실패 시 기본값)
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} 환경변수 값이 잘못되었습니다: {:?}, 기본값 {} 사용", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

/// 포트 범위 검증 (1024 < port < 65535)
pub fn is_valid_port(port: u16) -> bool {
    port > 1024 && port < 65535
}
