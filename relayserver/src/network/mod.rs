//! 서버 측 소켓 래퍼
//!
//! 서버 코드가 쓸 수 있는 소켓 연산을 타입으로 제한합니다.
//! 리스너는 bind/accept만, 피어 소켓은 준비 상태 대기와 논블로킹
//! 읽기/쓰기만 제공합니다. 서버에서 connect를 호출할 방법은 없습니다.

pub mod socket;

pub use socket::{PeerSocket, ServerSocket};
