//! 저장소 구현 공통 동작 테스트
//!
//! 메모리 저장소와 SQLite 저장소가 `MessengerStore` 인터페이스에서
//! 같은 결과를 내는지 확인합니다.

use anyhow::Result;
use shared::config::DbConfig;
use shared::store::{open_store, MessengerStore, StoreError};
use std::sync::Arc;
use tempfile::TempDir;

async fn check_contract(store: Arc<dyn MessengerStore>) -> Result<()> {
    store.login("alice", "secret", "10.0.0.1", 7000).await?;
    store.login("bob", "", "10.0.0.2", 7001).await?;

    // 비밀번호 불일치
    let wrong = store.login("alice", "nope", "10.0.0.1", 7002).await;
    assert!(matches!(wrong, Err(StoreError::InvalidPassword { .. })));

    // 연락처: 중복 추가와 없는 사용자는 무시
    store.add_contact("alice", "bob").await?;
    store.add_contact("alice", "bob").await?;
    store.add_contact("alice", "ghost").await?;
    assert_eq!(store.contacts("alice").await?, vec!["bob".to_string()]);
    store.del_contact("alice", "ghost").await?;
    store.del_contact("alice", "bob").await?;
    assert!(store.contacts("alice").await?.is_empty());

    // 사용량: 모르는 사용자가 끼면 기록하지 않음
    store.record_message("alice", "bob").await?;
    store.record_message("alice", "ghost").await?;
    let stats = store.usage_stats().await?;
    let counters: Vec<_> = stats
        .iter()
        .map(|s| (s.login.as_str(), s.sent, s.received))
        .collect();
    assert_eq!(counters, vec![("alice", 1, 0), ("bob", 0, 1)]);

    assert_eq!(store.known_users().await?, vec!["alice", "bob"]);
    assert_eq!(store.login_history(Some("alice")).await?.len(), 1);
    assert_eq!(store.login_history(None).await?.len(), 2);

    store.logout("alice").await?;
    let sessions = store.active_sessions().await?;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].login, "bob");
    assert_eq!(sessions[0].ip, "10.0.0.2");

    Ok(())
}

#[tokio::test]
async fn test_memory_store_contract() -> Result<()> {
    let store = open_store(&DbConfig::new("memory")).await?;
    check_contract(store).await?;
    println!("✅ 메모리 저장소 공통 동작 통과");
    Ok(())
}

#[tokio::test]
async fn test_sqlite_store_contract() -> Result<()> {
    let dir = TempDir::new()?;
    let url = format!("sqlite://{}", dir.path().join("contract.db3").display());
    let store = open_store(&DbConfig::new(url.as_str())).await?;
    check_contract(store).await?;
    println!("✅ SQLite 저장소 공통 동작 통과");
    Ok(())
}
