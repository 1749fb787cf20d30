//! 공통 에러 처리 시스템
//!
//! 중계 서버에서 발생하는 에러를 다섯 가지로 분류하고, 각 에러가
//! 클라이언트 응답과 연결 상태에 어떤 영향을 주는지 정의합니다.
//!
//! | 분류 | 응답 | 연결 |
//! |---|---|---|
//! | Decode | 400 | 유지 (크기 초과는 종료) |
//! | ProtocolViolation | 400 | 유지 |
//! | NameConflict | 400 | 종료 |
//! | TransportFailure | 없음 | 즉시 정리 |
//! | StoreFailure | 400 | 유지 |

use shared::protocol::{CodecError, Message};
use shared::store::StoreError;
use std::net::SocketAddr;
use thiserror::Error;
use tracing::{error, info, warn};

/// 잘못된 요청에 대한 기본 오류 문자열
pub const MALFORMED_REQUEST: &str = "malformed request";

/// 이름 중복 오류 문자열
pub const NAME_IN_USE: &str = "name in use";

/// 중계 서버 에러 타입
#[derive(Debug, Clone, Error)]
pub enum RelayServerError {
    /// 프레임 디코딩 실패
    #[error("디코딩 에러 [{addr}]: {message}")]
    Decode {
        addr: SocketAddr,
        message: String,
        /// 스트림 경계를 더 이상 신뢰할 수 없는 경우
        fatal: bool,
    },

    /// 현재 연결 상태에서 허용되지 않는 요청
    #[error("프로토콜 위반 [{addr}] [액션: {action}]: {message}")]
    ProtocolViolation {
        addr: SocketAddr,
        action: String,
        message: String,
    },

    /// 이미 등록된 이름으로 presence 요청
    #[error("이름 충돌 [{addr}]: {user}")]
    NameConflict { addr: SocketAddr, user: String },

    /// 소켓 송수신 실패
    #[error("전송 실패 [{addr}] [작업: {operation}]: {message}")]
    TransportFailure {
        addr: SocketAddr,
        operation: String,
        message: String,
    },

    /// 저장소 연산 실패
    #[error("저장소 에러 [작업: {operation}]: {message}")]
    StoreFailure { operation: String, message: String },
}

impl RelayServerError {
    /// 코덱 에러로부터 디코딩 에러 생성
    pub fn decode(addr: SocketAddr, err: &CodecError) -> Self {
        Self::Decode {
            addr,
            message: err.to_string(),
            fatal: !err.is_recoverable(),
        }
    }

    /// 프로토콜 위반 에러 생성
    pub fn protocol_violation(addr: SocketAddr, action: &str, message: &str) -> Self {
        Self::ProtocolViolation {
            addr,
            action: action.to_string(),
            message: message.to_string(),
        }
    }

    /// 필수 필드가 빠진 요청
    pub fn malformed(addr: SocketAddr, action: &str) -> Self {
        Self::protocol_violation(addr, action, MALFORMED_REQUEST)
    }

    /// 전송 실패 에러 생성
    pub fn transport(addr: SocketAddr, operation: &str, err: &std::io::Error) -> Self {
        Self::TransportFailure {
            addr,
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }

    /// 저장소 에러 변환
    pub fn store(operation: &str, err: &StoreError) -> Self {
        Self::StoreFailure {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }

    /// 에러 심각도
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RelayServerError::Decode { .. } => ErrorSeverity::Warning,
            RelayServerError::ProtocolViolation { .. } => ErrorSeverity::Warning,
            RelayServerError::NameConflict { .. } => ErrorSeverity::Info,
            RelayServerError::TransportFailure { .. } => ErrorSeverity::Error,
            RelayServerError::StoreFailure { .. } => ErrorSeverity::Error,
        }
    }

    /// 클라이언트에게 보낼 응답 (전송 실패는 응답 불가)
    pub fn response(&self) -> Option<Message> {
        match self {
            RelayServerError::Decode { .. } => Some(Message::bad_request(MALFORMED_REQUEST)),
            RelayServerError::ProtocolViolation { message, .. } => {
                Some(Message::bad_request(message))
            }
            RelayServerError::NameConflict { .. } => Some(Message::bad_request(NAME_IN_USE)),
            RelayServerError::TransportFailure { .. } => None,
            RelayServerError::StoreFailure { message, .. } => Some(Message::bad_request(message)),
        }
    }

    /// 응답을 보낸 뒤 연결을 닫아야 하는지 여부
    pub fn closes_connection(&self) -> bool {
        matches!(
            self,
            RelayServerError::Decode { fatal: true, .. }
                | RelayServerError::NameConflict { .. }
                | RelayServerError::TransportFailure { .. }
        )
    }
}

/// 에러 심각도 레벨
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// 정보성 - 정상 동작 중 발생하는 예상 가능한 상황
    Info,
    /// 경고 - 주의가 필요하지만 서비스는 계속 가능
    Warning,
    /// 에러 - 기능에 영향을 주지만 복구 가능
    Error,
}

/// 에러 컨텍스트 정보
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub error: RelayServerError,
    pub severity: ErrorSeverity,
    pub component: String,
    pub operation: String,
}

/// 에러 핸들러
///
/// 모든 에러를 중앙에서 로깅합니다. 어떤 에러도 루프를 멈추지 않습니다.
pub struct ErrorHandler;

impl ErrorHandler {
    /// 에러를 처리하고 로깅합니다.
    ///
    /// # Arguments
    ///
    /// * `error` - 처리할 에러
    /// * `severity` - 에러 심각도
    /// * `component` - 에러가 발생한 컴포넌트
    /// * `operation` - 에러가 발생한 작업
    pub fn handle_error(
        error: RelayServerError,
        severity: ErrorSeverity,
        component: &str,
        operation: &str,
    ) {
        let context = ErrorContext {
            error,
            severity,
            component: component.to_string(),
            operation: operation.to_string(),
        };

        Self::log_error(&context);
    }

    /// 에러 자체의 심각도로 처리합니다.
    pub fn report(error: &RelayServerError, component: &str, operation: &str) {
        Self::handle_error(error.clone(), error.severity(), component, operation);
    }

    fn log_error(context: &ErrorContext) {
        let log_message = format!(
            "[{}] [{}] {}",
            context.component, context.operation, context.error
        );

        match context.severity {
            ErrorSeverity::Info => info!("{}", log_message),
            ErrorSeverity::Warning => warn!("{}", log_message),
            ErrorSeverity::Error => error!("{}", log_message),
        }
    }
}

/// 결과 타입 별칭
pub type RelayResult<T> = Result<T, RelayServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use shared::protocol::RESPONSE_BAD_REQUEST;

    fn addr() -> SocketAddr {
        "127.0.0.1:50000".parse().expect("Test assertion failed")
    }

    #[test]
    fn test_response_mapping() {
        let conflict = RelayServerError::NameConflict {
            addr: addr(),
            user: "alice".to_string(),
        };
        let response = conflict.response().expect("Test assertion failed");
        assert_eq!(response.response, Some(RESPONSE_BAD_REQUEST));
        assert_eq!(response.error.as_deref(), Some(NAME_IN_USE));
        assert!(conflict.closes_connection());

        let store = RelayServerError::StoreFailure {
            operation: "login".to_string(),
            message: "비밀번호가 일치하지 않습니다: alice".to_string(),
        };
        assert!(store.response().is_some());
        assert!(!store.closes_connection());

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let transport = RelayServerError::transport(addr(), "read", &io);
        assert!(transport.response().is_none());
        assert!(transport.closes_connection());

        println!("✅ 에러 응답 매핑 테스트 통과");
    }

    #[test]
    fn test_decode_error_fatality() {
        let garbage = CodecError::NotAnObject;
        let recoverable = RelayServerError::decode(addr(), &garbage);
        assert!(!recoverable.closes_connection());

        let oversized = CodecError::TooLarge { size: 10_000, max: 4096 };
        let fatal = RelayServerError::decode(addr(), &oversized);
        assert!(fatal.closes_connection());
        assert_eq!(
            fatal.response().and_then(|m| m.error),
            Some(MALFORMED_REQUEST.to_string())
        );

        println!("✅ 디코딩 에러 분류 테스트 통과");
    }

    #[test]
    fn test_error_display_and_logging() {
        let error = RelayServerError::malformed(addr(), "presence");
        let display = error.to_string();
        assert!(display.contains("프로토콜 위반"));
        assert!(display.contains("presence"));

        for severity in [
            ErrorSeverity::Info,
            ErrorSeverity::Warning,
            ErrorSeverity::Error,
        ] {
            ErrorHandler::handle_error(error.clone(), severity, "test_component", "test_operation");
        }

        println!("✅ 에러 표시 테스트 통과: {}", display);
    }
}
