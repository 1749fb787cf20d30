//! 메신저 공통 라이브러리
//!
//! 서버와 클라이언트가 함께 사용하는 모듈입니다.
//!
//! - [`protocol`] - 와이어 프로토콜 메시지와 길이 접두 프레임 코덱
//! - [`store`] - 영속 저장소 트레이트와 구현체 (메모리, SQLite)
//! - [`config`] - `.env`/환경변수 로딩 헬퍼와 저장소 설정
//! - [`logging`] - `tracing` 구독자 초기화
//! - [`tool`] - 시간 관련 유틸리티

pub mod config;
pub mod logging;
pub mod protocol;
pub mod store;
pub mod tool;
