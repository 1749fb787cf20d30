//! 메모리 저장소
//!
//! 프로세스가 살아 있는 동안만 유지되는 저장소입니다.
//! `parking_lot::Mutex` 하나로 모든 연산을 직렬화합니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

use super::{
    Account, ActiveSession, LoginRecord, MessengerStore, StoreError, StoreResult, UsageStats,
};

#[derive(Debug, Clone)]
struct AccountRow {
    password: String,
    last_login: DateTime<Utc>,
    sent: u64,
    received: u64,
    /// 추가된 순서를 유지하는 연락처 목록
    contacts: Vec<String>,
}

#[derive(Debug, Default)]
struct MemoryState {
    accounts: HashMap<String, AccountRow>,
    active: HashMap<String, ActiveSession>,
    history: Vec<LoginRecord>,
}

/// 메모리 저장소
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessengerStore for MemoryStore {
    async fn login(&self, name: &str, password: &str, ip: &str, port: u16) -> StoreResult<()> {
        let now = Utc::now();
        let mut guard = self.state.lock();
        let state = &mut *guard;

        match state.accounts.get_mut(name) {
            Some(account) => {
                if account.password != password {
                    return Err(StoreError::InvalidPassword {
                        login: name.to_string(),
                    });
                }
                account.last_login = now;
            }
            None => {
                state.accounts.insert(
                    name.to_string(),
                    AccountRow {
                        password: password.to_string(),
                        last_login: now,
                        sent: 0,
                        received: 0,
                        contacts: Vec::new(),
                    },
                );
            }
        }

        state.active.entry(name.to_string()).or_insert_with(|| ActiveSession {
            login: name.to_string(),
            ip: ip.to_string(),
            port,
            login_time: now,
        });

        state.history.push(LoginRecord {
            login: name.to_string(),
            ip: ip.to_string(),
            port,
            login_time: now,
        });

        Ok(())
    }

    async fn logout(&self, name: &str) -> StoreResult<()> {
        self.state.lock().active.remove(name);
        Ok(())
    }

    async fn contacts(&self, name: &str) -> StoreResult<Vec<String>> {
        let state = self.state.lock();
        Ok(state
            .accounts
            .get(name)
            .map(|account| account.contacts.clone())
            .unwrap_or_default())
    }

    async fn add_contact(&self, owner: &str, contact: &str) -> StoreResult<()> {
        let mut state = self.state.lock();
        if !state.accounts.contains_key(contact) {
            return Ok(());
        }

        if let Some(account) = state.accounts.get_mut(owner) {
            if !account.contacts.iter().any(|c| c == contact) {
                account.contacts.push(contact.to_string());
            }
        }
        Ok(())
    }

    async fn del_contact(&self, owner: &str, contact: &str) -> StoreResult<()> {
        if let Some(account) = self.state.lock().accounts.get_mut(owner) {
            account.contacts.retain(|c| c != contact);
        }
        Ok(())
    }

    async fn record_message(&self, from: &str, to: &str) -> StoreResult<()> {
        let mut state = self.state.lock();
        if !state.accounts.contains_key(from) || !state.accounts.contains_key(to) {
            return Ok(());
        }

        if let Some(sender) = state.accounts.get_mut(from) {
            sender.sent += 1;
        }
        if let Some(recipient) = state.accounts.get_mut(to) {
            recipient.received += 1;
        }
        Ok(())
    }

    async fn active_sessions(&self) -> StoreResult<Vec<ActiveSession>> {
        let mut sessions: Vec<_> = self.state.lock().active.values().cloned().collect();
        sessions.sort_by(|a, b| a.login.cmp(&b.login));
        Ok(sessions)
    }

    async fn all_accounts(&self) -> StoreResult<Vec<Account>> {
        let mut accounts: Vec<_> = self
            .state
            .lock()
            .accounts
            .iter()
            .map(|(login, row)| Account {
                login: login.clone(),
                last_login: row.last_login,
            })
            .collect();
        accounts.sort_by(|a, b| a.login.cmp(&b.login));
        Ok(accounts)
    }

    async fn usage_stats(&self) -> StoreResult<Vec<UsageStats>> {
        let mut stats: Vec<_> = self
            .state
            .lock()
            .accounts
            .iter()
            .map(|(login, row)| UsageStats {
                login: login.clone(),
                last_login: row.last_login,
                sent: row.sent,
                received: row.received,
            })
            .collect();
        stats.sort_by(|a, b| a.login.cmp(&b.login));
        Ok(stats)
    }

    async fn login_history(&self, name: Option<&str>) -> StoreResult<Vec<LoginRecord>> {
        let state = self.state.lock();
        Ok(state
            .history
            .iter()
            .filter(|record| name.map_or(true, |n| record.login == n))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats_for<'a>(stats: &'a [UsageStats], login: &str) -> &'a UsageStats {
        stats
            .iter()
            .find(|s| s.login == login)
            .expect("Test assertion failed")
    }

    #[tokio::test]
    async fn test_login_creates_account_and_session() {
        let store = MemoryStore::new();
        store.login("alice", "pw", "10.0.0.1", 7000).await.expect("Test assertion failed");

        let accounts = store.all_accounts().await.expect("Test assertion failed");
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].login, "alice");

        let sessions = store.active_sessions().await.expect("Test assertion failed");
        assert_eq!(sessions[0].ip, "10.0.0.1");
        assert_eq!(sessions[0].port, 7000);

        store.logout("alice").await.expect("Test assertion failed");
        assert!(store.active_sessions().await.expect("Test assertion failed").is_empty());
        assert_eq!(store.all_accounts().await.expect("Test assertion failed").len(), 1);
    }

    #[tokio::test]
    async fn test_password_checked_for_existing_account() {
        let store = MemoryStore::new();
        store.login("alice", "pw", "10.0.0.1", 7000).await.expect("Test assertion failed");
        store.logout("alice").await.expect("Test assertion failed");

        let wrong = store.login("alice", "nope", "10.0.0.1", 7001).await;
        assert!(matches!(wrong, Err(StoreError::InvalidPassword { .. })));
        assert!(store.active_sessions().await.expect("Test assertion failed").is_empty());

        store.login("alice", "pw", "10.0.0.1", 7002).await.expect("Test assertion failed");
        let history = store.login_history(Some("alice")).await.expect("Test assertion failed");
        assert_eq!(history.len(), 2, "실패한 로그인은 기록되지 않아야 함");
    }

    #[tokio::test]
    async fn test_contact_edits_are_idempotent() {
        let store = MemoryStore::new();
        for name in ["alice", "bob"] {
            store.login(name, "", "127.0.0.1", 5000).await.expect("Test assertion failed");
        }

        store.add_contact("alice", "bob").await.expect("Test assertion failed");
        store.add_contact("alice", "bob").await.expect("Test assertion failed");
        store.add_contact("alice", "ghost").await.expect("Test assertion failed");
        assert_eq!(store.contacts("alice").await.expect("Test assertion failed"), vec!["bob"]);
        assert!(store.contacts("bob").await.expect("Test assertion failed").is_empty(), "단방향 관계");

        store.del_contact("alice", "bob").await.expect("Test assertion failed");
        store.del_contact("alice", "bob").await.expect("Test assertion failed");
        assert!(store.contacts("alice").await.expect("Test assertion failed").is_empty());
        assert!(store.contacts("ghost").await.expect("Test assertion failed").is_empty());
    }

    #[tokio::test]
    async fn test_record_message_counters() {
        let store = MemoryStore::new();
        for name in ["alice", "bob"] {
            store.login(name, "", "127.0.0.1", 5000).await.expect("Test assertion failed");
        }

        store.record_message("alice", "bob").await.expect("Test assertion failed");
        store.record_message("alice", "ghost").await.expect("Test assertion failed");

        let stats = store.usage_stats().await.expect("Test assertion failed");
        assert_eq!(stats_for(&stats, "alice").sent, 1);
        assert_eq!(stats_for(&stats, "alice").received, 0);
        assert_eq!(stats_for(&stats, "bob").received, 1);
        assert_eq!(stats_for(&stats, "bob").sent, 0);
    }
}
