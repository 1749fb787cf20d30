//! 클라이언트 전송 계층
//!
//! # 구조
//!
//! ```text
//! MessengerClient
//! ├── 읽기 태스크 (ClientReceiver 소유)
//! │   ├── 채팅 메시지 → ClientEvent::NewMessage
//! │   └── 응답 → 대기 중인 요청
//! └── 요청 경로 (Mutex<Exchange>)
//!     └── 송신 + 응답 대기를 잠금 안에서 한 번에 처리
//! ```
//!
//! 요청 경로는 송신부터 응답 수신까지 잠금을 유지하므로 요청끼리 섞이지
//! 않습니다. 읽기 태스크는 짧은 타임아웃으로 읽으면서 실행 플래그를 확인합니다.

use bytes::BytesMut;
use shared::protocol::codec::write_frame;
use shared::protocol::{
    Action, CodecError, FrameDecoder, Message, RESPONSE_ACCEPTED, RESPONSE_BAD_REQUEST,
    RESPONSE_OK,
};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;

/// 읽기 태스크가 실행 플래그를 확인하는 주기
pub const READ_POLL: Duration = Duration::from_millis(200);

/// 클라이언트 에러
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O 오류: {0}")]
    Io(#[from] io::Error),

    #[error("프로토콜 오류: {0}")]
    Codec(#[from] CodecError),

    #[error("서버가 접속을 거부했습니다: {0}")]
    Rejected(String),

    #[error("서버 오류 응답: {0}")]
    Server(String),

    #[error("예상하지 못한 응답 코드: {0:?}")]
    UnexpectedResponse(Option<u16>),

    #[error("응답 대기 시간 초과")]
    Timeout,

    #[error("서버와의 연결이 끊어졌습니다")]
    ConnectionLost,
}

/// 사용자에게 전달할 이벤트
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    NewMessage {
        from: String,
        text: String,
        time: Option<f64>,
    },
    ConnectionLost,
}

/// 읽기 절반. 프레임 재조립 버퍼를 가지고 있어 읽기 도중 취소되어도
/// 이미 받은 바이트를 잃지 않습니다.
pub struct ClientReceiver {
    reader: OwnedReadHalf,
    buffer: BytesMut,
    decoder: FrameDecoder,
}

impl ClientReceiver {
    /// 메시지 하나를 기다립니다. `wait` 동안 아무것도 오지 않으면 `Ok(None)`
    pub async fn recv_timeout(&mut self, wait: Duration) -> Result<Option<Message>, CodecError> {
        loop {
            if let Some(message) = self.decoder.decode(&mut self.buffer)? {
                return Ok(Some(message));
            }

            match timeout(wait, self.reader.read_buf(&mut self.buffer)).await {
                Err(_) => return Ok(None),
                Ok(Ok(0)) => return Err(CodecError::ConnectionClosed),
                Ok(Ok(_)) => {}
                Ok(Err(e)) => return Err(CodecError::Io(e)),
            }
        }
    }
}

/// 쓰기 절반
pub struct ClientSender {
    writer: OwnedWriteHalf,
    max_len: usize,
}

impl ClientSender {
    pub async fn send(&mut self, message: &Message) -> Result<(), CodecError> {
        write_frame(&mut self.writer, message, self.max_len).await
    }
}

/// 클라이언트 소켓 (connect + send + recv)
pub struct ClientSocket {
    receiver: ClientReceiver,
    sender: ClientSender,
}

impl ClientSocket {
    pub async fn connect(host: &str, port: u16, max_len: usize) -> io::Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();

        Ok(Self {
            receiver: ClientReceiver {
                reader,
                buffer: BytesMut::new(),
                decoder: FrameDecoder::new(max_len),
            },
            sender: ClientSender { writer, max_len },
        })
    }

    pub async fn send(&mut self, message: &Message) -> Result<(), CodecError> {
        self.sender.send(message).await
    }

    pub async fn recv(&mut self, wait: Duration) -> Result<Option<Message>, CodecError> {
        self.receiver.recv_timeout(wait).await
    }

    pub fn into_split(self) -> (ClientReceiver, ClientSender) {
        (self.receiver, self.sender)
    }
}

struct Exchange {
    sender: ClientSender,
    responses: mpsc::UnboundedReceiver<Message>,
}

/// 메신저 클라이언트
pub struct MessengerClient {
    user_name: String,
    exchange: Mutex<Exchange>,
    running: Arc<AtomicBool>,
    reader_task: JoinHandle<()>,
    request_timeout: Duration,
}

impl MessengerClient {
    /// 서버에 접속해 presence를 보내고 읽기 태스크를 시작합니다.
    ///
    /// 반환되는 수신기로 채팅 메시지와 연결 끊김 이벤트가 들어옵니다.
    pub async fn connect(
        config: &ClientConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ClientEvent>), ClientError> {
        let mut socket = ClientSocket::connect(
            &config.server_host,
            config.server_port,
            config.max_package_length,
        )
        .await?;

        socket
            .send(&Message::presence(&config.user_name, &config.password))
            .await?;
        let response = socket
            .recv(config.request_timeout())
            .await?
            .ok_or(ClientError::Timeout)?;

        match response.response {
            Some(RESPONSE_OK) => {}
            Some(_) => return Err(ClientError::Rejected(response.error.unwrap_or_default())),
            None => return Err(ClientError::UnexpectedResponse(None)),
        }
        info!("✅ 서버 접속 완료: {} ({})", config.server_address(), config.user_name);

        let (receiver, sender) = socket.into_split();
        let running = Arc::new(AtomicBool::new(true));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let reader_task = tokio::spawn(run_reader(receiver, running.clone(), event_tx, response_tx));

        let client = Self {
            user_name: config.user_name.clone(),
            exchange: Mutex::new(Exchange {
                sender,
                responses: response_rx,
            }),
            running,
            reader_task,
            request_timeout: config.request_timeout(),
        };
        Ok((client, event_rx))
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// 채팅 메시지 전송 (응답 없음)
    pub async fn send_message(&self, to: &str, text: &str) -> Result<(), ClientError> {
        if !self.is_running() {
            return Err(ClientError::ConnectionLost);
        }
        let mut exchange = self.exchange.lock().await;
        exchange
            .sender
            .send(&Message::chat(&self.user_name, to, text))
            .await?;
        debug!("메시지 전송: {} -> {}", self.user_name, to);
        Ok(())
    }

    /// 연락처 목록
    pub async fn contacts(&self) -> Result<Vec<String>, ClientError> {
        let response = self
            .request(
                Message::from_user(Action::GetContacts, &self.user_name),
                RESPONSE_ACCEPTED,
            )
            .await?;
        Ok(response.alert_list().map(<[String]>::to_vec).unwrap_or_default())
    }

    /// 전체 사용자 목록
    pub async fn users(&self) -> Result<Vec<String>, ClientError> {
        let response = self
            .request(
                Message::from_user(Action::GetUsers, &self.user_name),
                RESPONSE_ACCEPTED,
            )
            .await?;
        Ok(response.alert_list().map(<[String]>::to_vec).unwrap_or_default())
    }

    pub async fn add_contact(&self, name: &str) -> Result<(), ClientError> {
        self.request(
            Message::contact_edit(Action::AddContact, &self.user_name, name),
            RESPONSE_OK,
        )
        .await?;
        Ok(())
    }

    pub async fn del_contact(&self, name: &str) -> Result<(), ClientError> {
        self.request(
            Message::contact_edit(Action::DelContact, &self.user_name, name),
            RESPONSE_OK,
        )
        .await?;
        Ok(())
    }

    /// 종료 메시지를 보내고 읽기 태스크를 멈춥니다.
    pub async fn quit(&self) -> Result<(), ClientError> {
        let was_running = self.running.swap(false, Ordering::AcqRel);
        if !was_running {
            return Ok(());
        }
        let mut exchange = self.exchange.lock().await;
        exchange
            .sender
            .send(&Message::from_user(Action::Quit, &self.user_name))
            .await?;
        info!("👋 접속 종료: {}", self.user_name);
        Ok(())
    }

    async fn request(&self, message: Message, expected: u16) -> Result<Message, ClientError> {
        if !self.is_running() {
            return Err(ClientError::ConnectionLost);
        }

        let mut guard = self.exchange.lock().await;
        let exchange = &mut *guard;

        // 이전 요청이 시간 초과된 뒤 늦게 도착한 응답 제거
        while exchange.responses.try_recv().is_ok() {}

        exchange.sender.send(&message).await?;
        let response = match timeout(self.request_timeout, exchange.responses.recv()).await {
            Err(_) => return Err(ClientError::Timeout),
            Ok(None) => return Err(ClientError::ConnectionLost),
            Ok(Some(response)) => response,
        };

        match response.response {
            Some(code) if code == expected => Ok(response),
            Some(RESPONSE_BAD_REQUEST) => Err(ClientError::Server(response.error.unwrap_or_default())),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }
}

impl Drop for MessengerClient {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        self.reader_task.abort();
    }
}

async fn run_reader(
    mut receiver: ClientReceiver,
    running: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<ClientEvent>,
    responses: mpsc::UnboundedSender<Message>,
) {
    while running.load(Ordering::Acquire) {
        match receiver.recv_timeout(READ_POLL).await {
            Ok(None) => continue,
            Ok(Some(message)) => route(message, &events, &responses),
            Err(e) if e.is_recoverable() => warn!("잘못된 프레임 무시: {}", e),
            Err(e) => {
                if running.load(Ordering::Acquire) {
                    warn!("서버 연결 끊김: {}", e);
                }
                break;
            }
        }
    }

    if running.swap(false, Ordering::AcqRel) {
        let _ = events.send(ClientEvent::ConnectionLost);
    }
}

fn route(
    message: Message,
    events: &mpsc::UnboundedSender<ClientEvent>,
    responses: &mpsc::UnboundedSender<Message>,
) {
    if message.action == Some(Action::Message) {
        let _ = events.send(ClientEvent::NewMessage {
            from: message.from.unwrap_or_default(),
            text: message.text.unwrap_or_default(),
            time: message.time,
        });
    } else if message.is_response() {
        let _ = responses.send(message);
    } else {
        debug!("처리하지 않는 메시지 무시: {:?}", message.action);
    }
}
