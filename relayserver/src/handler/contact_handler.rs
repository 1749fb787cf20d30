//! 연락처 관리 핸들러
//!
//! 연락처 조회/추가/삭제와 전체 사용자 목록 조회를 저장소에 위임합니다.
//! 존재하지 않는 사용자를 대상으로 한 요청은 저장소에서 조용히 무시됩니다.

use shared::store::MessengerStore;
use std::sync::Arc;
use tracing::{debug, info};

use crate::tool::error::{RelayResult, RelayServerError};

/// 연락처 관리 핸들러
pub struct ContactHandler {
    store: Arc<dyn MessengerStore>,
}

impl ContactHandler {
    pub fn new(store: Arc<dyn MessengerStore>) -> Self {
        Self { store }
    }

    /// 연락처 목록
    pub async fn list(&self, owner: &str) -> RelayResult<Vec<String>> {
        let contacts = self
            .store
            .contacts(owner)
            .await
            .map_err(|e| RelayServerError::store("get_contacts", &e))?;
        debug!("연락처 조회: {} ({}명)", owner, contacts.len());
        Ok(contacts)
    }

    /// 연락처 추가
    pub async fn add(&self, owner: &str, contact: &str) -> RelayResult<()> {
        self.store
            .add_contact(owner, contact)
            .await
            .map_err(|e| RelayServerError::store("add_contact", &e))?;
        info!("연락처 추가: {} -> {}", owner, contact);
        Ok(())
    }

    /// 연락처 삭제
    pub async fn remove(&self, owner: &str, contact: &str) -> RelayResult<()> {
        self.store
            .del_contact(owner, contact)
            .await
            .map_err(|e| RelayServerError::store("del_contact", &e))?;
        info!("연락처 삭제: {} -> {}", owner, contact);
        Ok(())
    }

    /// 알려진 모든 사용자
    pub async fn known_users(&self) -> RelayResult<Vec<String>> {
        self.store
            .known_users()
            .await
            .map_err(|e| RelayServerError::store("get_users", &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::store::MemoryStore;

    #[tokio::test]
    async fn test_contact_cycle() {
        let store = Arc::new(MemoryStore::new());
        for name in ["alice", "bob"] {
            store.login(name, "", "127.0.0.1", 5000).await.expect("Test assertion failed");
        }
        let handler = ContactHandler::new(store);

        handler.add("alice", "bob").await.expect("Test assertion failed");
        assert_eq!(handler.list("alice").await.expect("Test assertion failed"), vec!["bob"]);

        handler.remove("alice", "bob").await.expect("Test assertion failed");
        assert!(handler.list("alice").await.expect("Test assertion failed").is_empty());

        assert_eq!(
            handler.known_users().await.expect("Test assertion failed"),
            vec!["alice", "bob"]
        );

        println!("✅ 연락처 추가/삭제 테스트 통과");
    }
}
