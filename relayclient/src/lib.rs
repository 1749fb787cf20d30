//! 메신저 클라이언트 라이브러리
//!
//! 서버 접속, 요청/응답 처리, 수신 메시지 이벤트를 제공합니다.

pub mod config;
pub mod console;
pub mod transport;

pub use config::{validate_config, ClientConfig};
pub use transport::{ClientError, ClientEvent, ClientSocket, MessengerClient};
