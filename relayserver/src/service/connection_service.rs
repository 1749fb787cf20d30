//! 연결 서비스 (멀티플렉서)
//!
//! 하나의 태스크에서 모든 연결을 처리합니다. 연결마다 태스크나 스레드를
//! 만들지 않으며, 레지스트리와 중계 큐는 이 루프만 소유합니다.
//!
//! # 루프 한 번의 순서
//!
//! 1. 종료 플래그 확인
//! 2. 리스너 수락 / 소켓 준비 / 폴링 타임아웃 중 하나를 대기
//! 3. 모든 소켓에서 논블로킹 읽기 후 완성된 프레임 디스패치
//! 4. 중계 큐 맨 앞부터 전달
//! 5. 출력 버퍼 flush
//! 6. 닫힌 연결 정리 (이름 해제 + 로그아웃은 연결당 정확히 한 번)

use anyhow::Result;
use bytes::{Buf, BytesMut};
use futures::stream::{FuturesUnordered, StreamExt};
use shared::protocol::{FrameDecoder, Message};
use shared::protocol::codec::encode_frame;
use shared::store::MessengerStore;
use std::collections::BTreeMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::Interest;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::event::{EventPublisher, ServerEvent};
use crate::handler::MessageHandler;
use crate::network::{PeerSocket, ServerSocket};
use crate::service::connection_state::{ConnectionPhase, ConnectionState};
use crate::service::relay_queue::RelayQueue;
use crate::service::session_registry::{ConnectionId, SessionRegistry};
use crate::tool::error::{ErrorHandler, RelayServerError};

/// 한 번의 읽기 크기
const READ_CHUNK: usize = 4096;

/// 연결 하나에서 루프 한 번에 읽을 최대 횟수
const MAX_READS_PER_SWEEP: usize = 16;

/// 읽기 결과
enum ReadOutcome {
    Open,
    PeerClosed,
    Failed(io::Error),
}

/// 개별 클라이언트 연결 정보
#[derive(Debug)]
pub struct ClientConnection {
    pub state: ConnectionState,
    socket: PeerSocket,
    read_buf: BytesMut,
    write_buf: BytesMut,
    /// 송수신 실패 또는 상대방 종료. 출력 버퍼와 관계없이 정리 대상
    failed: bool,
    connected_at: Instant,
}

impl ClientConnection {
    fn new(id: ConnectionId, addr: SocketAddr, socket: PeerSocket) -> Self {
        Self {
            state: ConnectionState::new(id, addr),
            socket,
            read_buf: BytesMut::with_capacity(READ_CHUNK),
            write_buf: BytesMut::new(),
            failed: false,
            connected_at: Instant::now(),
        }
    }

    fn is_live(&self) -> bool {
        !self.failed && !self.state.is_closed()
    }

    /// 대기할 준비 상태. 더 기다릴 것이 없으면 `None`
    fn interest(&self) -> Option<Interest> {
        if self.failed {
            return None;
        }
        let pending = !self.write_buf.is_empty();
        match (self.state.is_closed(), pending) {
            (true, false) => None,
            (true, true) => Some(Interest::WRITABLE),
            (false, false) => Some(Interest::READABLE),
            (false, true) => Some(Interest::READABLE | Interest::WRITABLE),
        }
    }

    /// 중계 메시지를 받을 수 있는 상태인지 (인증됨 + 살아 있음 + 출력 버퍼 비어 있음)
    fn can_accept_relay(&self) -> bool {
        self.is_live()
            && self.state.phase() == ConnectionPhase::Authenticated
            && self.write_buf.is_empty()
    }

    fn should_reap(&self) -> bool {
        self.failed || (self.state.is_closed() && self.write_buf.is_empty())
    }

    /// 읽을 수 있는 만큼 읽어 재조립 버퍼에 쌓습니다.
    fn fill_read_buffer(&mut self) -> ReadOutcome {
        let mut chunk = [0u8; READ_CHUNK];
        for _ in 0..MAX_READS_PER_SWEEP {
            match self.socket.try_read(&mut chunk) {
                Ok(0) => return ReadOutcome::PeerClosed,
                Ok(n) => self.read_buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return ReadOutcome::Failed(e),
            }
        }
        ReadOutcome::Open
    }

    /// 프레임 전체를 출력 버퍼에 넣습니다.
    fn queue_message(&mut self, message: &Message, max_len: usize) -> bool {
        match encode_frame(message, max_len) {
            Ok(frame) => {
                self.write_buf.extend_from_slice(&frame);
                true
            }
            Err(e) => {
                warn!("[{}] 메시지 인코딩 실패, 전송 생략: {}", self.state.addr, e);
                false
            }
        }
    }

    /// 출력 버퍼를 가능한 만큼 씁니다. 남은 부분은 다음 루프에서 이어 씁니다.
    fn flush(&mut self) {
        while !self.write_buf.is_empty() && !self.failed {
            match self.socket.try_write(&self.write_buf) {
                Ok(0) => {
                    let err = io::Error::new(io::ErrorKind::WriteZero, "소켓에 쓸 수 없음");
                    self.fail("write", &err);
                }
                Ok(n) => self.write_buf.advance(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => self.fail("write", &e),
            }
        }
    }

    fn fail(&mut self, operation: &str, err: &io::Error) {
        let error = RelayServerError::transport(self.state.addr, operation, err);
        ErrorHandler::report(&error, "ConnectionService", operation);
        self.failed = true;
    }
}

/// 루프가 깨어난 이유
enum Activity {
    Accepted(io::Result<(PeerSocket, SocketAddr)>),
    Ready,
    Idle,
}

/// 연결 서비스
pub struct ConnectionService {
    listener: ServerSocket,
    /// 수락 순서대로 순회하기 위해 BTreeMap 사용
    connections: BTreeMap<ConnectionId, ClientConnection>,
    next_connection_id: ConnectionId,
    registry: SessionRegistry,
    relay_queue: RelayQueue,
    handler: MessageHandler,
    store: Arc<dyn MessengerStore>,
    events: EventPublisher,
    decoder: FrameDecoder,
    poll_timeout: Duration,
    max_connections: usize,
    shutdown: Arc<AtomicBool>,
}

impl ConnectionService {
    /// 새로운 연결 서비스 생성
    pub fn new(
        listener: ServerSocket,
        config: &ServerConfig,
        store: Arc<dyn MessengerStore>,
        events: EventPublisher,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            listener,
            connections: BTreeMap::new(),
            next_connection_id: 1,
            registry: SessionRegistry::new(),
            relay_queue: RelayQueue::new(),
            handler: MessageHandler::new(store.clone(), events.clone()),
            store,
            events,
            decoder: FrameDecoder::new(config.max_package_length),
            poll_timeout: config.poll_timeout(),
            max_connections: config.max_connections,
            shutdown,
        }
    }

    /// 종료 플래그가 설정될 때까지 루프를 실행합니다.
    pub async fn run(mut self) -> Result<()> {
        info!(
            "🚀 중계 루프 시작 (폴링 {}ms, 최대 연결 {})",
            self.poll_timeout.as_millis(),
            self.max_connections
        );

        while !self.shutdown.load(Ordering::Acquire) {
            if let Activity::Accepted(accepted) = self.wait_for_activity().await {
                self.handle_accept(accepted);
            }

            self.sweep_reads().await;
            self.deliver_relay_queue();
            self.flush_writes();
            self.reap_closed().await;
        }

        self.close_all().await;
        info!("🛑 중계 루프 종료");
        Ok(())
    }

    async fn wait_for_activity(&self) -> Activity {
        let mut readiness: FuturesUnordered<_> = self
            .connections
            .values()
            .filter_map(|conn| conn.interest().map(|interest| conn.socket.ready(interest)))
            .collect();

        let any_ready = async move {
            if readiness.is_empty() {
                std::future::pending::<()>().await;
            } else {
                let _ = readiness.next().await;
            }
        };

        tokio::select! {
            accepted = self.listener.accept() => Activity::Accepted(accepted),
            _ = any_ready => Activity::Ready,
            _ = tokio::time::sleep(self.poll_timeout) => Activity::Idle,
        }
    }

    fn handle_accept(&mut self, accepted: io::Result<(PeerSocket, SocketAddr)>) {
        let (socket, addr) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                warn!("연결 수락 실패: {}", e);
                return;
            }
        };

        if self.connections.len() >= self.max_connections {
            warn!(
                "최대 연결 수 초과: {}/{}, {} 연결 거부",
                self.connections.len(),
                self.max_connections,
                addr
            );
            return;
        }

        let id = self.next_connection_id;
        self.next_connection_id += 1;
        self.connections.insert(id, ClientConnection::new(id, addr, socket));
        self.events.publish(ServerEvent::NewConnection { addr });

        info!("새 연결: {} (id={}, 현재 {}개)", addr, id, self.connections.len());
    }

    /// 모든 소켓을 읽고 완성된 프레임을 디스패치합니다.
    async fn sweep_reads(&mut self) {
        let Self {
            connections,
            registry,
            relay_queue,
            handler,
            decoder,
            ..
        } = self;

        for conn in connections.values_mut() {
            if !conn.is_live() {
                continue;
            }

            let outcome = conn.fill_read_buffer();
            Self::process_frames(conn, registry, relay_queue, handler, decoder).await;

            match outcome {
                ReadOutcome::Open => {}
                ReadOutcome::PeerClosed => {
                    debug!("[{}] 상대방이 연결을 닫음", conn.state.addr);
                    conn.failed = true;
                }
                ReadOutcome::Failed(e) => conn.fail("read", &e),
            }
        }
    }

    async fn process_frames(
        conn: &mut ClientConnection,
        registry: &mut SessionRegistry,
        relay_queue: &mut RelayQueue,
        handler: &MessageHandler,
        decoder: &FrameDecoder,
    ) {
        while !conn.state.is_closed() {
            let message = match decoder.decode(&mut conn.read_buf) {
                Ok(Some(message)) => message,
                Ok(None) => break,
                Err(e) => {
                    let error = RelayServerError::decode(conn.state.addr, &e);
                    Self::apply_error(conn, error, decoder.max_len());
                    continue;
                }
            };

            match handler
                .dispatch(&mut conn.state, registry, relay_queue, message)
                .await
            {
                Ok(Some(response)) => {
                    conn.queue_message(&response, decoder.max_len());
                }
                Ok(None) => {}
                Err(error) => Self::apply_error(conn, error, decoder.max_len()),
            }
        }
    }

    /// 에러 응답을 보내고, 필요하면 연결을 닫습니다.
    fn apply_error(conn: &mut ClientConnection, error: RelayServerError, max_len: usize) {
        ErrorHandler::report(&error, "ConnectionService", "dispatch");
        if let Some(response) = error.response() {
            conn.queue_message(&response, max_len);
        }
        if error.closes_connection() {
            conn.state.close();
            conn.read_buf.clear();
        }
    }

    /// 중계 큐 맨 앞부터 전달합니다.
    ///
    /// 맨 앞 항목의 수신자가 아직 받을 수 없으면 거기서 멈춥니다.
    fn deliver_relay_queue(&mut self) {
        while let Some(entry) = self.relay_queue.front() {
            let Some(id) = self.registry.lookup(&entry.recipient) else {
                warn!("알 수 없는 수신자, 메시지 폐기: {}", entry.recipient);
                self.relay_queue.pop_front();
                continue;
            };

            let Some(conn) = self.connections.get_mut(&id) else {
                warn!("수신자 연결 없음, 메시지 폐기: {}", entry.recipient);
                self.relay_queue.pop_front();
                continue;
            };

            if !conn.can_accept_relay() {
                break;
            }

            let Some(entry) = self.relay_queue.pop_front() else {
                break;
            };
            if conn.queue_message(&entry.message, self.decoder.max_len()) {
                conn.flush();
                debug!("메시지 전달: -> {}", entry.recipient);
            }
        }
    }

    fn flush_writes(&mut self) {
        for conn in self.connections.values_mut() {
            if !conn.failed && !conn.write_buf.is_empty() {
                conn.flush();
            }
        }
    }

    async fn reap_closed(&mut self) {
        let doomed: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, conn)| conn.should_reap())
            .map(|(&id, _)| id)
            .collect();

        for id in doomed {
            if let Some(conn) = self.connections.remove(&id) {
                self.release_connection(conn).await;
            }
        }
    }

    /// 연결을 정리합니다. 연결 맵에서 제거된 연결만 전달되므로 연결당 한 번만 실행됩니다.
    ///
    /// 레지스트리가 아직 이 연결을 가리키는 이름만 해제합니다. `quit`으로 이미
    /// 해제된 이름은 건너뛰고, 에러로 닫힌 인증 연결의 이름은 여기서 해제됩니다.
    async fn release_connection(&mut self, conn: ClientConnection) {
        let addr = conn.state.addr;

        let owned = conn
            .state
            .user()
            .filter(|user| self.registry.release(user, conn.state.id));
        if let Some(user) = owned {
            if let Err(e) = self.store.logout(user).await {
                ErrorHandler::report(
                    &RelayServerError::store("logout", &e),
                    "ConnectionService",
                    "release_connection",
                );
            }
            self.events.publish(ServerEvent::SessionListChanged);
        }

        info!(
            "연결 종료: {} (사용자: {}, 유지 시간 {:.1}초)",
            addr,
            conn.state.user().unwrap_or("-"),
            conn.connected_at.elapsed().as_secs_f64()
        );
        self.events.publish(ServerEvent::ConnectionLost {
            addr,
            user: conn.state.user().map(str::to_string),
        });
    }

    async fn close_all(&mut self) {
        let connections = std::mem::take(&mut self.connections);
        if !connections.is_empty() {
            info!("남은 연결 {}개 정리", connections.len());
        }
        for (_, conn) in connections {
            self.release_connection(conn).await;
        }
    }
}
