//! 사용자 입력 콘솔
//!
//! 입력 루프와 출력 태스크가 따로 동작합니다. 출력 태스크는 새 메시지
//! 이벤트를 받아 화면에 표시하고, 입력 루프는 클라이언트가 실행 중인
//! 동안만 명령을 읽습니다.

use anyhow::{Context, Result};
use shared::tool::{format_unix_time, unix_time};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::info;

use crate::transport::{ClientError, ClientEvent, MessengerClient};

/// 입력 대기 중 실행 플래그 확인 주기
const INPUT_POLL: Duration = Duration::from_millis(500);

const HELP: &str = "\
지원 명령:
  m, message <받는사람> <내용>  - 메시지 전송
  c, contacts                   - 연락처 목록
  a, add <이름>                 - 연락처 추가
  d, del <이름>                 - 연락처 삭제
  u, users                      - 전체 사용자 목록
  h, help                       - 도움말
  q, quit                       - 종료";

/// 콘솔 명령
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Message { to: String, text: String },
    Contacts,
    AddContact(String),
    DelContact(String),
    Users,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// 입력 한 줄을 명령으로 해석합니다. 빈 줄은 `None`
    pub fn parse(line: &str) -> Option<Result<Self, String>> {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        if command.is_empty() {
            return None;
        }

        Some(match command {
            "m" | "message" => match rest.split_once(char::is_whitespace) {
                Some((to, text)) if !text.trim().is_empty() => Ok(ConsoleCommand::Message {
                    to: to.to_string(),
                    text: text.trim().to_string(),
                }),
                _ => Err("사용법: m <받는사람> <내용>".to_string()),
            },
            "c" | "contacts" => Ok(ConsoleCommand::Contacts),
            "a" | "add" | "d" | "del" if rest.is_empty() => Err(format!("사용법: {} <이름>", command)),
            "a" | "add" => Ok(ConsoleCommand::AddContact(rest.to_string())),
            "d" | "del" => Ok(ConsoleCommand::DelContact(rest.to_string())),
            "u" | "users" => Ok(ConsoleCommand::Users),
            "h" | "help" => Ok(ConsoleCommand::Help),
            "q" | "quit" => Ok(ConsoleCommand::Quit),
            other => Err(format!("알 수 없는 명령: {} (help 입력)", other)),
        })
    }
}

/// 수신 메시지 표시 형식
pub fn render_incoming(from: &str, text: &str, time: Option<f64>) -> String {
    format!(
        "{} - {}: {}",
        format_unix_time(time.unwrap_or_else(unix_time)),
        from,
        text
    )
}

fn render_list(title: &str, names: &[String]) -> String {
    if names.is_empty() {
        format!("{}: (없음)", title)
    } else {
        format!("{}: {}", title, names.join(", "))
    }
}

async fn execute(client: &MessengerClient, command: ConsoleCommand) -> Result<String, ClientError> {
    let output = match command {
        ConsoleCommand::Message { to, text } => {
            client.send_message(&to, &text).await?;
            String::new()
        }
        ConsoleCommand::Contacts => render_list("연락처", &client.contacts().await?),
        ConsoleCommand::Users => render_list("사용자", &client.users().await?),
        ConsoleCommand::AddContact(name) => {
            client.add_contact(&name).await?;
            format!("{} 연락처 추가됨", name)
        }
        ConsoleCommand::DelContact(name) => {
            client.del_contact(&name).await?;
            format!("{} 연락처 삭제됨", name)
        }
        ConsoleCommand::Help => HELP.to_string(),
        ConsoleCommand::Quit => String::new(),
    };
    Ok(output)
}

/// 이벤트 출력 태스크
pub fn spawn_printer(
    mut events: mpsc::UnboundedReceiver<ClientEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                ClientEvent::NewMessage { from, text, time } => {
                    println!("{}", render_incoming(&from, &text, time));
                }
                ClientEvent::ConnectionLost => {
                    println!("서버와의 연결이 끊어졌습니다. Enter를 눌러 종료하세요.");
                    break;
                }
            }
        }
    })
}

/// 입력 루프. `q`, 입력 종료, 연결 끊김 시 반환합니다.
pub async fn run_console(
    client: Arc<MessengerClient>,
    events: mpsc::UnboundedReceiver<ClientEvent>,
) -> Result<()> {
    let printer = spawn_printer(events);
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while client.is_running() {
        let line = match timeout(INPUT_POLL, lines.next_line()).await {
            Err(_) => continue,
            Ok(result) => match result.context("표준 입력 읽기 실패")? {
                Some(line) => line,
                None => {
                    client.quit().await?;
                    break;
                }
            },
        };

        let command = match ConsoleCommand::parse(&line) {
            None => continue,
            Some(Ok(command)) => command,
            Some(Err(message)) => {
                println!("{}", message);
                continue;
            }
        };

        if command == ConsoleCommand::Quit {
            client.quit().await?;
            break;
        }

        match execute(&client, command).await {
            Ok(output) if output.is_empty() => {}
            Ok(output) => println!("{}", output),
            Err(ClientError::ConnectionLost) => break,
            Err(e) => println!("요청 실패: {}", e),
        }
    }

    printer.abort();
    info!("콘솔 종료");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(ConsoleCommand::parse(""), None);
        assert_eq!(
            ConsoleCommand::parse("m bob hello there"),
            Some(Ok(ConsoleCommand::Message {
                to: "bob".to_string(),
                text: "hello there".to_string(),
            }))
        );
        assert!(matches!(ConsoleCommand::parse("m bob"), Some(Err(_))));
        assert_eq!(
            ConsoleCommand::parse("a carol"),
            Some(Ok(ConsoleCommand::AddContact("carol".to_string())))
        );
        assert!(matches!(ConsoleCommand::parse("del"), Some(Err(_))));
        assert_eq!(ConsoleCommand::parse("c"), Some(Ok(ConsoleCommand::Contacts)));
        assert_eq!(ConsoleCommand::parse("help"), Some(Ok(ConsoleCommand::Help)));
        assert_eq!(ConsoleCommand::parse(" q "), Some(Ok(ConsoleCommand::Quit)));
        assert!(matches!(ConsoleCommand::parse("x"), Some(Err(_))));
    }

    #[test]
    fn test_render_incoming() {
        let line = render_incoming("bob", "hi", Some(0.0));
        assert!(line.ends_with(" - bob: hi"));
        assert_eq!(render_list("연락처", &[]), "연락처: (없음)");
    }
}
