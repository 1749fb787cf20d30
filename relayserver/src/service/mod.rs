//! 중계 서버 서비스 레이어
//!
//! ```text
//! Service Layer
//! ├── ConnectionService (멀티플렉서 루프)
//! │   ├── 연결 수락 / 준비 상태 대기
//! │   ├── 논블로킹 읽기 + 프레임 디스패치
//! │   ├── 중계 큐 전달 / 출력 flush
//! │   └── 닫힌 연결 정리
//! ├── ConnectionState (연결 상태 머신)
//! ├── SessionRegistry (이름 → 연결)
//! └── RelayQueue (FIFO 중계 큐)
//! ```

pub mod connection_service;
pub mod connection_state;
pub mod relay_queue;
pub mod session_registry;

pub use connection_service::{ClientConnection, ConnectionService};
pub use connection_state::{ConnectionPhase, ConnectionState};
pub use relay_queue::{RelayEntry, RelayQueue};
pub use session_registry::{ConnectionId, RegisterError, SessionRegistry};
