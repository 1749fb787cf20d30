//! 메신저 중계 서버 라이브러리
//!
//! 클라이언트가 이름을 등록(presence)하고, 서버를 거쳐 다른 사용자에게
//! 텍스트 메시지를 보내고, 연락처를 관리하는 중계 서버입니다.
//!
//! # 아키텍처
//!
//! ```text
//! Relay Server
//! ├── Network (소켓 권한 제한: ServerSocket / PeerSocket)
//! ├── Service Layer
//! │   ├── ConnectionService (단일 태스크 멀티플렉서)
//! │   ├── SessionRegistry (이름 → 연결)
//! │   └── RelayQueue (FIFO 중계 큐)
//! ├── Handler Layer
//! │   ├── MessageHandler (상태별 프로토콜 디스패치)
//! │   └── ContactHandler (연락처 요청)
//! ├── Event (broadcast 이벤트 채널)
//! ├── Server (start / ServerHandle)
//! └── Console (관리 콘솔)
//! ```
//!
//! # 사용 예시
//!
//! ```rust,no_run
//! use relayserver::start;
//! use shared::store::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let handle = start("127.0.0.1", 7777, Arc::new(MemoryStore::new())).await?;
//! let mut events = handle.subscribe();
//! if let Ok(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! handle.shutdown();
//! handle.wait().await?;
//! # Ok(())
//! # }
//! ```

/// 환경 설정 관리
pub mod config;

/// 관리 콘솔
pub mod console;

/// 서버 이벤트 채널
pub mod event;

/// 요청 처리 핸들러 레이어
pub mod handler;

/// 서버 측 소켓 래퍼
pub mod network;

/// 서버 시작과 핸들
pub mod server;

/// 연결 멀티플렉서와 세션 상태
pub mod service;

/// 에러 처리
pub mod tool;

pub use config::{validate_config, ServerConfig};
pub use event::ServerEvent;
pub use server::{start, start_with_config, ServerHandle};
