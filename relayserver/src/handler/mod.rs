//! 요청 처리 핸들러 레이어
//!
//! - [`MessageHandler`] - 연결 상태에 따른 프로토콜 디스패치
//! - [`ContactHandler`] - 연락처/사용자 목록 요청

pub mod contact_handler;
pub mod message_handler;

pub use contact_handler::ContactHandler;
pub use message_handler::MessageHandler;
