//! 연결 상태 머신
//!
//! `Unauthenticated → Authenticated → Closed`. 인증은 연결당 한 번뿐이며
//! `Closed`는 되돌릴 수 없습니다.

use std::net::SocketAddr;

use super::session_registry::ConnectionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Unauthenticated,
    Authenticated,
    Closed,
}

/// 디스패처가 보는 연결 정보 (소켓 제외)
#[derive(Debug, Clone)]
pub struct ConnectionState {
    pub id: ConnectionId,
    pub addr: SocketAddr,
    phase: ConnectionPhase,
    /// 인증에 사용한 이름 (종료 후에도 보고용으로 유지)
    user: Option<String>,
}

impl ConnectionState {
    pub fn new(id: ConnectionId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            phase: ConnectionPhase::Unauthenticated,
            user: None,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// 레지스트리에 묶여 있는 이름 (인증 상태일 때만)
    pub fn bound_user(&self) -> Option<&str> {
        match self.phase {
            ConnectionPhase::Authenticated => self.user.as_deref(),
            _ => None,
        }
    }

    /// 인증 완료. 이미 인증되었거나 닫힌 연결이면 무시하고 false를 반환합니다.
    pub fn authenticate(&mut self, name: &str) -> bool {
        if self.phase != ConnectionPhase::Unauthenticated {
            return false;
        }
        self.phase = ConnectionPhase::Authenticated;
        self.user = Some(name.to_string());
        true
    }

    pub fn close(&mut self) {
        self.phase = ConnectionPhase::Closed;
    }

    pub fn is_closed(&self) -> bool {
        self.phase == ConnectionPhase::Closed
    }
}
