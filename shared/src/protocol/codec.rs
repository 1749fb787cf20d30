//! 와이어 코덱
//!
//! `[4바이트 길이][JSON 데이터]` 프레임을 인코딩/디코딩합니다.
//!
//! - 서버는 논블로킹 소켓에서 읽은 바이트를 [`FrameDecoder`]에 누적해
//!   완성된 프레임만 꺼냅니다.
//! - 클라이언트는 [`read_frame`] / [`write_frame`] 비동기 헬퍼를 사용합니다.
//!
//! 인코딩은 항상 프레임 전체를 먼저 만든 뒤 소켓에 쓰므로, 상대방이
//! 절반만 쓰인 프레임 뒤에 다른 프레임이 끼어든 상태를 볼 일은 없습니다.

use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::Message;

/// 길이 헤더 크기 (바이트)
pub const HEADER_LEN: usize = 4;

/// 기본 최대 페이로드 크기 (바이트)
pub const DEFAULT_MAX_PACKAGE_LENGTH: usize = 4096;

/// 코덱 에러
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("프레임 크기 초과: {size}바이트 (최대 {max}바이트)")]
    TooLarge { size: usize, max: usize },

    #[error("UTF-8 디코딩 실패: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("JSON 파싱 실패: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("JSON 객체가 아닌 페이로드")]
    NotAnObject,

    #[error("필드 형식 오류: {0}")]
    InvalidFields(#[source] serde_json::Error),

    #[error("직렬화 실패: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("I/O 오류: {0}")]
    Io(#[from] std::io::Error),

    #[error("상대방이 연결을 종료했습니다")]
    ConnectionClosed,
}

impl CodecError {
    /// 프레임 경계가 유지되어 같은 스트림을 계속 읽을 수 있는지 여부
    ///
    /// 페이로드 내용만 잘못된 경우는 해당 프레임을 이미 소비했으므로
    /// 다음 프레임을 그대로 읽을 수 있습니다. 크기 초과나 I/O 오류는
    /// 스트림을 더 이상 신뢰할 수 없습니다.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CodecError::InvalidUtf8(_)
                | CodecError::InvalidJson(_)
                | CodecError::NotAnObject
                | CodecError::InvalidFields(_)
        )
    }
}

/// 메시지를 프레임(헤더 + 페이로드)으로 인코딩합니다.
///
/// # Errors
///
/// * 직렬화 실패 시
/// * 페이로드가 `max_len`을 넘을 때
pub fn encode_frame(message: &Message, max_len: usize) -> Result<Vec<u8>, CodecError> {
    let payload = serde_json::to_vec(message).map_err(CodecError::Serialize)?;
    if payload.len() > max_len {
        return Err(CodecError::TooLarge {
            size: payload.len(),
            max: max_len,
        });
    }

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// 헤더를 제외한 페이로드를 메시지로 디코딩합니다.
///
/// UTF-8 → JSON → 객체 여부 → 필드 형식 순서로 검사합니다.
pub fn decode_payload(payload: &[u8]) -> Result<Message, CodecError> {
    let text = std::str::from_utf8(payload)?;
    let value: serde_json::Value = serde_json::from_str(text).map_err(CodecError::InvalidJson)?;
    if !value.is_object() {
        return Err(CodecError::NotAnObject);
    }
    serde_json::from_value(value).map_err(CodecError::InvalidFields)
}

/// 증분 프레임 디코더
///
/// 논블로킹 읽기로 들어온 바이트를 버퍼에 쌓아 두고, 완성된 프레임이
/// 있을 때만 메시지를 돌려줍니다.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    max_len: usize,
}

impl FrameDecoder {
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// 버퍼에서 프레임 하나를 꺼냅니다.
    ///
    /// * `Ok(None)` - 아직 프레임이 완성되지 않음
    /// * `Ok(Some(_))` - 프레임 하나를 소비하고 디코딩에 성공
    /// * `Err(e)` - `e.is_recoverable()`이면 해당 프레임은 이미 소비됨,
    ///   아니면 버퍼는 그대로 두며 호출자가 연결을 닫아야 함
    pub fn decode(&self, buf: &mut BytesMut) -> Result<Option<Message>, CodecError> {
        if buf.len() < HEADER_LEN {
            return Ok(None);
        }

        let length = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        if length > self.max_len {
            return Err(CodecError::TooLarge {
                size: length,
                max: self.max_len,
            });
        }

        if buf.len() < HEADER_LEN + length {
            buf.reserve(HEADER_LEN + length - buf.len());
            return Ok(None);
        }

        buf.advance(HEADER_LEN);
        let payload = buf.split_to(length);
        decode_payload(&payload).map(Some)
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PACKAGE_LENGTH)
    }
}

/// 비동기 스트림에서 프레임 하나를 읽습니다.
///
/// 헤더를 읽기 전에 스트림이 닫히면 [`CodecError::ConnectionClosed`]를 반환합니다.
pub async fn read_frame<R>(reader: &mut R, max_len: usize) -> Result<Message, CodecError>
where
    R: AsyncRead + Unpin,
{
    let mut length_bytes = [0u8; HEADER_LEN];
    if let Err(e) = reader.read_exact(&mut length_bytes).await {
        return Err(match e.kind() {
            std::io::ErrorKind::UnexpectedEof => CodecError::ConnectionClosed,
            _ => CodecError::Io(e),
        });
    }

    let length = u32::from_be_bytes(length_bytes) as usize;
    if length > max_len {
        return Err(CodecError::TooLarge {
            size: length,
            max: max_len,
        });
    }

    let mut buffer = vec![0u8; length];
    reader.read_exact(&mut buffer).await?;
    decode_payload(&buffer)
}

/// 비동기 스트림에 프레임 하나를 씁니다.
pub async fn write_frame<W>(writer: &mut W, message: &Message, max_len: usize) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(message, max_len)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Action, Alert, UserCredentials};

    fn frame_from_json(json: &str) -> Vec<u8> {
        let mut frame = (json.len() as u32).to_be_bytes().to_vec();
        frame.extend_from_slice(json.as_bytes());
        frame
    }

    /// 액션별 대표 메시지가 필드 그대로 왕복하는지 확인
    #[test]
    fn test_round_trip_every_action() {
        let samples = vec![
            Message {
                action: Some(Action::Presence),
                time: Some(1_700_000_000.25),
                kind: Some("status".to_string()),
                user: Some(UserCredentials {
                    account_name: "alice".to_string(),
                    password: "pw".to_string(),
                }),
                ..Default::default()
            },
            Message::chat("alice", "bob", "안녕"),
            Message::from_user(Action::Quit, "alice"),
            Message::from_user(Action::GetContacts, "alice"),
            Message::from_user(Action::GetUsers, "alice"),
            Message::contact_edit(Action::AddContact, "alice", "bob"),
            Message::contact_edit(Action::DelContact, "alice", "bob"),
            Message::ok("done"),
            Message::accepted(vec!["bob".to_string()]),
            Message::bad_request("malformed request"),
        ];

        let decoder = FrameDecoder::default();
        for original in samples {
            let frame = encode_frame(&original, DEFAULT_MAX_PACKAGE_LENGTH).expect("Test assertion failed");
            let mut buf = BytesMut::from(&frame[..]);
            let decoded = decoder
                .decode(&mut buf)
                .expect("Test assertion failed")
                .expect("Test assertion failed");

            assert_eq!(decoded, original);
            assert!(buf.is_empty(), "프레임 전체가 소비되어야 함");
        }
    }

    #[test]
    fn test_partial_frames_wait_for_more_bytes() {
        let frame = encode_frame(&Message::chat("a", "b", "hello"), DEFAULT_MAX_PACKAGE_LENGTH)
            .expect("Test assertion failed");
        let decoder = FrameDecoder::default();
        let mut buf = BytesMut::new();

        buf.extend_from_slice(&frame[..2]);
        assert!(decoder.decode(&mut buf).expect("Test assertion failed").is_none());

        buf.extend_from_slice(&frame[2..frame.len() - 1]);
        assert!(decoder.decode(&mut buf).expect("Test assertion failed").is_none());

        buf.extend_from_slice(&frame[frame.len() - 1..]);
        let message = decoder.decode(&mut buf).expect("Test assertion failed");
        assert_eq!(message.and_then(|m| m.text), Some("hello".to_string()));
    }

    #[test]
    fn test_two_frames_in_one_read() {
        let mut bytes = encode_frame(&Message::ok("one"), 4096).expect("Test assertion failed");
        bytes.extend(encode_frame(&Message::ok("two"), 4096).expect("Test assertion failed"));
        let mut buf = BytesMut::from(&bytes[..]);
        let decoder = FrameDecoder::default();

        let first = decoder.decode(&mut buf).expect("Test assertion failed");
        let second = decoder.decode(&mut buf).expect("Test assertion failed");
        assert_eq!(first.and_then(|m| m.alert), Some(Alert::Text("one".to_string())));
        assert_eq!(second.and_then(|m| m.alert), Some(Alert::Text("two".to_string())));
        assert!(decoder.decode(&mut buf).expect("Test assertion failed").is_none());
    }

    #[test]
    fn test_non_object_payload_is_recoverable() {
        let mut bytes = frame_from_json("[1,2,3]");
        bytes.extend(frame_from_json(r#"{"action":"quit"}"#));
        let mut buf = BytesMut::from(&bytes[..]);
        let decoder = FrameDecoder::default();

        let err = decoder.decode(&mut buf).expect_err("배열은 거부되어야 함");
        assert!(matches!(err, CodecError::NotAnObject));
        assert!(err.is_recoverable());

        let next = decoder.decode(&mut buf).expect("Test assertion failed");
        assert_eq!(next.and_then(|m| m.action), Some(Action::Quit));
    }

    #[test]
    fn test_garbage_payloads() {
        let decoder = FrameDecoder::default();

        let mut buf = BytesMut::from(&frame_from_json("{not json")[..]);
        assert!(matches!(decoder.decode(&mut buf), Err(CodecError::InvalidJson(_))));

        let mut raw = 2u32.to_be_bytes().to_vec();
        raw.extend_from_slice(&[0xff, 0xfe]);
        let mut buf = BytesMut::from(&raw[..]);
        assert!(matches!(decoder.decode(&mut buf), Err(CodecError::InvalidUtf8(_))));

        let mut buf = BytesMut::from(&frame_from_json(r#"{"time":"yesterday"}"#)[..]);
        let err = decoder.decode(&mut buf).expect_err("잘못된 필드 타입");
        assert!(matches!(err, CodecError::InvalidFields(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_oversized_frames_rejected() {
        let decoder = FrameDecoder::new(16);
        let mut buf = BytesMut::from(&frame_from_json(r#"{"message":"this is far too long"}"#)[..]);

        let err = decoder.decode(&mut buf).expect_err("크기 제한 초과");
        assert!(matches!(err, CodecError::TooLarge { max: 16, .. }));
        assert!(!err.is_recoverable());

        let big = Message::chat("a", "b", &"x".repeat(64));
        assert!(matches!(encode_frame(&big, 16), Err(CodecError::TooLarge { .. })));
    }

    #[tokio::test]
    async fn test_async_stream_helpers() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        write_frame(&mut client, &Message::presence("alice", ""), DEFAULT_MAX_PACKAGE_LENGTH)
            .await
            .expect("Test assertion failed");
        let received = read_frame(&mut server, DEFAULT_MAX_PACKAGE_LENGTH)
            .await
            .expect("Test assertion failed");
        assert_eq!(received.account_name(), Some("alice"));

        drop(client);
        let closed = read_frame(&mut server, DEFAULT_MAX_PACKAGE_LENGTH).await;
        assert!(matches!(closed, Err(CodecError::ConnectionClosed)));

        println!("✅ 비동기 프레임 헬퍼 테스트 통과");
    }
}
