//! 메신저 프로토콜 정의
//!
//! 클라이언트와 서버 간 통신에 사용하는 JSON 메시지를 정의합니다.
//!
//! # 프로토콜 구조
//!
//! ```text
//! [4바이트 길이 헤더 (big-endian)][UTF-8 JSON 객체]
//! ```
//!
//! 하나의 메시지는 `action` 태그와 액션별 필드를 가진 JSON 객체입니다.
//! 서버 응답에는 `action`이 없고 `response` 코드가 들어갑니다.
//!
//! # 사용 예시
//!
//! ```rust
//! use shared::protocol::{Message, codec};
//!
//! let presence = Message::presence("alice", "secret");
//! let frame = codec::encode_frame(&presence, codec::DEFAULT_MAX_PACKAGE_LENGTH)?;
//! let decoded = codec::decode_payload(&frame[codec::HEADER_LEN..])?;
//! assert_eq!(decoded, presence);
//! # Ok::<(), shared::protocol::CodecError>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::tool::current_time::unix_time;

pub mod codec;

pub use codec::{CodecError, FrameDecoder};

/// 성공 응답 코드
pub const RESPONSE_OK: u16 = 200;
/// 데이터를 포함한 성공 응답 코드
pub const RESPONSE_ACCEPTED: u16 = 202;
/// 오류 응답 코드
pub const RESPONSE_BAD_REQUEST: u16 = 400;

/// 메시지 액션 태그
///
/// 와이어 상의 문자열은 상호 운용성을 위해 그대로 유지해야 합니다.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// 접속 인사 (이름 등록)
    Presence,
    /// 채팅 메시지 (`msg`는 구버전 클라이언트 호환용 별칭)
    #[serde(alias = "msg")]
    Message,
    /// 접속 종료
    Quit,
    /// 연락처 목록 요청
    GetContacts,
    /// 전체 사용자 목록 요청
    GetUsers,
    /// 연락처 추가
    AddContact,
    /// 연락처 삭제
    DelContact,
    /// 알 수 없는 액션
    ///
    /// 디코딩 실패가 아니라 프로토콜 위반으로 처리하기 위해 따로 받습니다.
    #[serde(other)]
    Unknown,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Presence => "presence",
            Action::Message => "message",
            Action::Quit => "quit",
            Action::GetContacts => "get_contacts",
            Action::GetUsers => "get_users",
            Action::AddContact => "add_contact",
            Action::DelContact => "del_contact",
            Action::Unknown => "unknown",
        }
    }
}

/// presence 메시지의 사용자 정보
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct UserCredentials {
    pub account_name: String,
    #[serde(default)]
    pub password: String,
}

/// 성공 응답 페이로드
///
/// 액션에 따라 문자열 또는 이름 목록이 들어갑니다.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum Alert {
    Text(String),
    List(Vec<String>),
}

/// 프로토콜 메시지
///
/// 모든 필드는 선택적이며, 어떤 필드가 필요한지는 `action`에 따라
/// 디스패처가 검증합니다. 직렬화 시 비어 있는 필드는 생략됩니다.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,

    /// 송신 측 Unix 타임스탬프 (초, 소수점 포함)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,

    /// presence 상태 문자열
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,

    /// 채팅 본문
    #[serde(default, rename = "message", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserCredentials>,

    /// 연락처 추가/삭제 대상 로그인
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_login: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<Alert>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Message {
    /// 특정 액션의 빈 요청 메시지 (현재 시간 포함)
    pub fn request(action: Action) -> Self {
        Self {
            action: Some(action),
            time: Some(unix_time()),
            ..Default::default()
        }
    }

    /// presence 메시지 생성
    pub fn presence(account_name: &str, password: &str) -> Self {
        Self {
            kind: Some("status".to_string()),
            user: Some(UserCredentials {
                account_name: account_name.to_string(),
                password: password.to_string(),
            }),
            ..Self::request(Action::Presence)
        }
    }

    /// 채팅 메시지 생성
    pub fn chat(from: &str, to: &str, text: &str) -> Self {
        Self {
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            text: Some(text.to_string()),
            ..Self::request(Action::Message)
        }
    }

    /// 사용자 기준 요청 (get_contacts, get_users, quit)
    pub fn from_user(action: Action, user_name: &str) -> Self {
        Self {
            from: Some(user_name.to_string()),
            ..Self::request(action)
        }
    }

    /// 연락처 추가/삭제 요청
    pub fn contact_edit(action: Action, user_name: &str, target: &str) -> Self {
        Self {
            user_login: Some(target.to_string()),
            ..Self::from_user(action, user_name)
        }
    }

    /// 200 응답
    pub fn ok(alert: &str) -> Self {
        Self {
            response: Some(RESPONSE_OK),
            time: Some(unix_time()),
            alert: Some(Alert::Text(alert.to_string())),
            ..Default::default()
        }
    }

    /// 202 응답 (목록 페이로드)
    pub fn accepted(items: Vec<String>) -> Self {
        Self {
            response: Some(RESPONSE_ACCEPTED),
            time: Some(unix_time()),
            alert: Some(Alert::List(items)),
            ..Default::default()
        }
    }

    /// 400 응답
    pub fn bad_request(error: &str) -> Self {
        Self {
            response: Some(RESPONSE_BAD_REQUEST),
            time: Some(unix_time()),
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    /// 응답 메시지인지 확인
    pub fn is_response(&self) -> bool {
        self.response.is_some()
    }

    /// presence 메시지의 계정 이름
    pub fn account_name(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.account_name.as_str())
    }

    /// 202 응답의 목록 페이로드
    pub fn alert_list(&self) -> Option<&[String]> {
        match &self.alert {
            Some(Alert::List(items)) => Some(items),
            _ => None,
        }
    }
}
