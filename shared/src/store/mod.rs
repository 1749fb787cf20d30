//! 영속 저장소 인터페이스
//!
//! 서버 코어는 [`MessengerStore`] 트레이트에만 의존합니다. 구현체는
//! 저장 엔진을 자유롭게 선택할 수 있습니다.
//!
//! - [`MemoryStore`] - 프로세스 메모리 (테스트, 임시 실행)
//! - [`SqliteStore`] - SQLite 파일 (`sqlx`)
//!
//! 모든 구현체는 자체적으로 연산을 직렬화해야 합니다. 서버는 단일 제어
//! 흐름에서 순차적으로 호출하지만, 관리 콘솔 같은 관찰자가 스냅샷 조회를
//! 동시에 할 수 있습니다.
//!
//! 존재하지 않는 사용자를 대상으로 한 연락처/메시지 연산은 에러 없이
//! 무시됩니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::DbConfig;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// 저장소 에러
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("비밀번호가 일치하지 않습니다: {login}")]
    InvalidPassword { login: String },

    #[error("지원하지 않는 저장소 URL: {0}")]
    UnsupportedUrl(String),

    #[error("데이터베이스 오류: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// 계정 정보 (비밀번호 제외)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub login: String,
    pub last_login: DateTime<Utc>,
}

/// 현재 접속 중인 세션
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSession {
    pub login: String,
    pub ip: String,
    pub port: u16,
    pub login_time: DateTime<Utc>,
}

/// 접속 이력
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRecord {
    pub login: String,
    pub ip: String,
    pub port: u16,
    pub login_time: DateTime<Utc>,
}

/// 사용자별 메시지 통계
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    pub login: String,
    pub last_login: DateTime<Utc>,
    pub sent: u64,
    pub received: u64,
}

/// 메신저 저장소 트레이트
#[async_trait]
pub trait MessengerStore: Send + Sync {
    /// 로그인 처리
    ///
    /// 계정이 없으면 생성하고, 있으면 비밀번호를 비교한 뒤 마지막 접속
    /// 시간을 갱신합니다. 활성 세션 등록과 접속 이력 기록을 함께 합니다.
    async fn login(&self, name: &str, password: &str, ip: &str, port: u16) -> StoreResult<()>;

    /// 로그아웃 처리 (활성 세션 제거)
    async fn logout(&self, name: &str) -> StoreResult<()>;

    /// 연락처 목록 (추가된 순서)
    async fn contacts(&self, name: &str) -> StoreResult<Vec<String>>;

    /// 연락처 추가 (중복 추가는 무시)
    async fn add_contact(&self, owner: &str, contact: &str) -> StoreResult<()>;

    /// 연락처 삭제 (없는 관계는 무시)
    async fn del_contact(&self, owner: &str, contact: &str) -> StoreResult<()>;

    /// 메시지 전송 통계 갱신 (보낸 사람 sent +1, 받는 사람 received +1)
    async fn record_message(&self, from: &str, to: &str) -> StoreResult<()>;

    /// 활성 세션 스냅샷
    async fn active_sessions(&self) -> StoreResult<Vec<ActiveSession>>;

    /// 전체 계정 스냅샷
    async fn all_accounts(&self) -> StoreResult<Vec<Account>>;

    /// 사용자별 메시지 통계 스냅샷
    async fn usage_stats(&self) -> StoreResult<Vec<UsageStats>>;

    /// 접속 이력 (`name`이 없으면 전체)
    async fn login_history(&self, name: Option<&str>) -> StoreResult<Vec<LoginRecord>>;

    /// 알려진 모든 로그인 이름
    async fn known_users(&self) -> StoreResult<Vec<String>> {
        Ok(self
            .all_accounts()
            .await?
            .into_iter()
            .map(|account| account.login)
            .collect())
    }
}

/// 설정에 맞는 저장소를 엽니다.
pub async fn open_store(config: &DbConfig) -> StoreResult<Arc<dyn MessengerStore>> {
    if config.is_memory() {
        info!("메모리 저장소 사용");
        return Ok(Arc::new(MemoryStore::new()));
    }

    if config.url.starts_with("sqlite:") {
        let store = SqliteStore::connect(&config.url).await?;
        return Ok(Arc::new(store));
    }

    Err(StoreError::UnsupportedUrl(config.url.clone()))
}
