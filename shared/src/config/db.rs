//! 저장소 설정
//!
//! 메신저 서버가 사용할 저장소 URL을 환경변수에서 읽습니다.
//!
//! - `memory` - 프로세스 메모리 (재시작 시 초기화)
//! - `sqlite://<경로>` - SQLite 파일

use tracing::info;

use super::env_or;

/// 기본 저장소 URL
pub const DEFAULT_DB_URL: &str = "sqlite://server_base.db3";

/// 저장소 설정 구조체
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub url: String,
}

impl DbConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// 환경변수 `messenger_db_url`에서 저장소 URL을 읽습니다.
    pub fn from_env() -> Self {
        let url = env_or("messenger_db_url", DEFAULT_DB_URL);
        info!("저장소 설정: {}", url);
        Self { url }
    }

    /// 메모리 저장소인지 확인
    pub fn is_memory(&self) -> bool {
        self.url == "memory" || self.url == "memory://"
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DB_URL)
    }
}
