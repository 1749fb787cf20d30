//! 프로토콜 디스패처
//!
//! 디코딩된 메시지를 연결 상태에 따라 검증하고 처리합니다.
//!
//! # 상태별 허용 액션
//!
//! - 미인증: `presence`만 허용
//! - 인증됨: `message`, `get_contacts`, `get_users`, `add_contact`,
//!   `del_contact`, `quit`
//! - 종료됨: 이후 프레임은 무시
//!
//! 반환값이 `Ok(Some(_))`이면 요청한 연결로 응답을 보내고, `Err(_)`이면
//! 호출자가 에러의 응답과 연결 종료 여부를 적용합니다.

use shared::protocol::{Action, Message};
use shared::store::MessengerStore;
use std::sync::Arc;
use tracing::{debug, info};

use crate::event::{EventPublisher, ServerEvent};
use crate::handler::contact_handler::ContactHandler;
use crate::service::connection_state::{ConnectionPhase, ConnectionState};
use crate::service::relay_queue::RelayQueue;
use crate::service::session_registry::{RegisterError, SessionRegistry};
use crate::tool::error::{ErrorHandler, RelayResult, RelayServerError};

fn action_name(action: Option<Action>) -> &'static str {
    action.map(|a| a.as_str()).unwrap_or("none")
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// 메시지 핸들러
pub struct MessageHandler {
    store: Arc<dyn MessengerStore>,
    contacts: ContactHandler,
    events: EventPublisher,
}

impl MessageHandler {
    pub fn new(store: Arc<dyn MessengerStore>, events: EventPublisher) -> Self {
        Self {
            contacts: ContactHandler::new(store.clone()),
            store,
            events,
        }
    }

    /// 메시지 하나를 처리합니다.
    pub async fn dispatch(
        &self,
        state: &mut ConnectionState,
        registry: &mut SessionRegistry,
        relay_queue: &mut RelayQueue,
        message: Message,
    ) -> RelayResult<Option<Message>> {
        debug!(
            "[{}] 요청 수신: {}",
            state.addr,
            action_name(message.action)
        );

        match state.phase() {
            ConnectionPhase::Unauthenticated => match message.action {
                Some(Action::Presence) => self.handle_presence(state, registry, &message).await,
                other => Err(RelayServerError::malformed(state.addr, action_name(other))),
            },
            ConnectionPhase::Authenticated => {
                self.handle_authenticated(state, registry, relay_queue, message)
                    .await
            }
            ConnectionPhase::Closed => Ok(None),
        }
    }

    async fn handle_presence(
        &self,
        state: &mut ConnectionState,
        registry: &mut SessionRegistry,
        message: &Message,
    ) -> RelayResult<Option<Message>> {
        let addr = state.addr;
        let name = match (message.time, non_empty(message.account_name())) {
            (Some(_), Some(name)) => name.to_string(),
            _ => return Err(RelayServerError::malformed(addr, "presence")),
        };

        if registry.contains(&name) {
            return Err(RelayServerError::NameConflict { addr, user: name });
        }

        let password = message
            .user
            .as_ref()
            .map(|u| u.password.as_str())
            .unwrap_or_default();
        self.store
            .login(&name, password, &addr.ip().to_string(), addr.port())
            .await
            .map_err(|e| RelayServerError::store("login", &e))?;

        match registry.register(&name, state.id) {
            Ok(()) => {}
            Err(RegisterError::NameInUse) => {
                return Err(RelayServerError::NameConflict { addr, user: name });
            }
            Err(RegisterError::AlreadyBound) => {
                return Err(RelayServerError::protocol_violation(
                    addr,
                    "presence",
                    "already authenticated",
                ));
            }
        }
        state.authenticate(&name);
        self.events.publish(ServerEvent::SessionListChanged);

        info!("✅ 사용자 로그인: {} ({})", name, addr);
        Ok(Some(Message::ok("connected")))
    }

    async fn handle_authenticated(
        &self,
        state: &mut ConnectionState,
        registry: &mut SessionRegistry,
        relay_queue: &mut RelayQueue,
        message: Message,
    ) -> RelayResult<Option<Message>> {
        let addr = state.addr;
        let Some(user) = state.bound_user().map(str::to_string) else {
            return Err(RelayServerError::malformed(addr, action_name(message.action)));
        };

        match message.action {
            Some(Action::Message) => self.handle_chat(state, relay_queue, message).await,
            Some(Action::GetContacts) => {
                let contacts = self.contacts.list(&user).await?;
                Ok(Some(Message::accepted(contacts)))
            }
            Some(Action::GetUsers) => {
                let users = self.contacts.known_users().await?;
                Ok(Some(Message::accepted(users)))
            }
            Some(action @ (Action::AddContact | Action::DelContact)) => {
                let target = non_empty(message.user_login.as_deref())
                    .ok_or_else(|| RelayServerError::malformed(addr, action.as_str()))?;
                if action == Action::AddContact {
                    self.contacts.add(&user, target).await?;
                    Ok(Some(Message::ok("contact added")))
                } else {
                    self.contacts.remove(&user, target).await?;
                    Ok(Some(Message::ok("contact deleted")))
                }
            }
            Some(Action::Quit) => {
                self.handle_quit(state, registry, &user).await;
                Ok(None)
            }
            Some(Action::Presence) => Err(RelayServerError::protocol_violation(
                addr,
                "presence",
                "already authenticated",
            )),
            other => Err(RelayServerError::malformed(addr, action_name(other))),
        }
    }

    /// 채팅 메시지를 중계 큐에 넣습니다. 응답은 없습니다.
    async fn handle_chat(
        &self,
        state: &ConnectionState,
        relay_queue: &mut RelayQueue,
        message: Message,
    ) -> RelayResult<Option<Message>> {
        let (from, to) = match (
            message.time,
            non_empty(message.from.as_deref()),
            non_empty(message.to.as_deref()),
            message.text.as_deref(),
        ) {
            (Some(_), Some(from), Some(to), Some(_)) => (from.to_string(), to.to_string()),
            _ => return Err(RelayServerError::malformed(state.addr, "message")),
        };

        self.store
            .record_message(&from, &to)
            .await
            .map_err(|e| RelayServerError::store("record_message", &e))?;

        relay_queue.push(&to, message);
        self.events.publish(ServerEvent::NewMessage {
            from: from.clone(),
            to: to.clone(),
        });

        debug!("메시지 중계 대기: {} -> {} (큐 {}개)", from, to, relay_queue.len());
        Ok(None)
    }

    async fn handle_quit(&self, state: &mut ConnectionState, registry: &mut SessionRegistry, user: &str) {
        registry.release(user, state.id);
        if let Err(e) = self.store.logout(user).await {
            ErrorHandler::report(&RelayServerError::store("logout", &e), "MessageHandler", "quit");
        }
        state.close();
        self.events.publish(ServerEvent::SessionListChanged);

        info!("👋 사용자 종료: {} ({})", user, state.addr);
    }
}
