//! 로깅 설정 관리
//!
//! 로깅 시스템의 설정 파라미터와 서비스 타입 정의를 담당합니다.

use serde::{Deserialize, Serialize};

/// 서비스 타입 열거형
///
/// 메신저의 각 실행 파일을 구분합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceType {
    /// 중계 서버
    RelayServer,
    /// 터미널 클라이언트
    RelayClient,
}

impl ServiceType {
    /// 서비스 타입을 문자열로 변환
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::RelayServer => "relayserver",
            ServiceType::RelayClient => "relayclient",
        }
    }
}

/// 로깅 시스템 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `RUST_LOG`가 없을 때 사용할 필터 (기본값: "info")
    pub default_filter: String,

    /// 로그에 모듈 경로 표시 여부 (기본값: true)
    pub with_target: bool,

    /// ANSI 색상 사용 여부 (기본값: true)
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            with_target: true,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    /// 대화형 콘솔과 섞이지 않도록 경고 이상만 출력하는 설정
    pub fn quiet() -> Self {
        Self {
            default_filter: "warn".to_string(),
            with_target: false,
            ..Self::default()
        }
    }
}
