//! 서버 이벤트 채널
//!
//! 연결 수락, 메시지 중계, 연결 종료, 세션 목록 변경을 관찰자(관리 콘솔,
//! 테스트)에게 알립니다. 코어는 `broadcast` 채널에 보내기만 하며 수신자를
//! 기다리지 않습니다. 느린 수신자는 오래된 이벤트를 잃습니다.

use std::net::SocketAddr;
use tokio::sync::broadcast;
use tracing::trace;

/// 이벤트 채널 용량
pub const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// 서버 이벤트
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// 새 소켓 수락
    NewConnection { addr: SocketAddr },
    /// 채팅 메시지가 중계 큐에 들어감
    NewMessage { from: String, to: String },
    /// 연결이 정리됨 (`user`는 인증된 적이 있으면 그 이름)
    ConnectionLost {
        addr: SocketAddr,
        user: Option<String>,
    },
    /// 등록된 이름 목록이 바뀜
    SessionListChanged,
}

/// 이벤트 발행자
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: broadcast::Sender<ServerEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// 이벤트 발행 (수신자가 없어도 실패하지 않음)
    pub fn publish(&self, event: ServerEvent) {
        trace!("이벤트 발행: {:?}", event);
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
