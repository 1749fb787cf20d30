//! 세션 레지스트리
//!
//! 사용자 이름 → 연결 ID 매핑. 단일 제어 흐름에서만 접근하므로 잠금이
//! 없습니다.

use std::collections::HashMap;

/// 연결 식별자 (수락 순서대로 증가)
pub type ConnectionId = u64;

/// 등록 실패 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterError {
    /// 이미 다른 연결이 사용 중인 이름
    NameInUse,
    /// 이 연결은 이미 다른 이름으로 등록됨
    AlreadyBound,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    names: HashMap<String, ConnectionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 이름을 연결에 등록합니다. 기존 등록을 덮어쓰지 않습니다.
    pub fn register(&mut self, name: &str, connection: ConnectionId) -> Result<(), RegisterError> {
        if self.names.contains_key(name) {
            return Err(RegisterError::NameInUse);
        }
        if self.names.values().any(|&id| id == connection) {
            return Err(RegisterError::AlreadyBound);
        }

        self.names.insert(name.to_string(), connection);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn lookup(&self, name: &str) -> Option<ConnectionId> {
        self.names.get(name).copied()
    }

    /// 이름이 해당 연결에 묶여 있을 때만 해제합니다.
    pub fn release(&mut self, name: &str, connection: ConnectionId) -> bool {
        match self.names.get(name) {
            Some(&id) if id == connection => {
                self.names.remove(name);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// 정렬된 이름 목록
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.names.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique() {
        let mut registry = SessionRegistry::new();
        assert_eq!(registry.register("alice", 1), Ok(()));
        assert_eq!(registry.register("alice", 2), Err(RegisterError::NameInUse));
        assert_eq!(registry.lookup("alice"), Some(1), "기존 등록이 유지되어야 함");

        assert_eq!(registry.register("bob", 1), Err(RegisterError::AlreadyBound));
        assert_eq!(registry.register("bob", 2), Ok(()));
        assert_eq!(registry.names(), vec!["alice", "bob"]);

        println!("✅ 이름 유일성 테스트 통과");
    }

    #[test]
    fn test_release_only_by_owner() {
        let mut registry = SessionRegistry::new();
        registry.register("alice", 1).expect("Test assertion failed");

        assert!(!registry.release("alice", 2));
        assert!(registry.contains("alice"));

        assert!(registry.release("alice", 1));
        assert!(!registry.release("alice", 1));
        assert!(registry.is_empty());

        assert_eq!(registry.register("alice", 3), Ok(()));
        assert_eq!(registry.len(), 1);
    }
}
