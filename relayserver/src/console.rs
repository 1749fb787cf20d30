//! 관리 콘솔
//!
//! 표준 입력으로 명령을 받아 저장소 스냅샷을 출력합니다. 콘솔은 서버
//! 핸들만 사용하며 루프 내부 상태는 건드리지 않습니다.

use anyhow::{Context, Result};
use shared::store::{ActiveSession, LoginRecord, UsageStats};
use shared::tool::format_datetime;
use std::fmt::Write as _;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::server::ServerHandle;

const HELP: &str = "\
지원 명령:
  u, users             - 전체 사용자 목록
  c, connected         - 접속 중인 사용자
  h, history [이름]    - 접속 이력
  s, stats             - 메시지 통계
  q, quit              - 서버 종료
  help                 - 도움말";

/// 관리 콘솔 명령
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Help,
    Users,
    Connected,
    History(Option<String>),
    Stats,
    Quit,
}

impl AdminCommand {
    /// 입력 한 줄을 명령으로 해석합니다. 빈 줄은 `None`
    pub fn parse(line: &str) -> Option<Result<Self, String>> {
        let mut parts = line.split_whitespace();
        let command = parts.next()?;
        let argument = parts.next().map(str::to_string);

        Some(match command {
            "help" => Ok(AdminCommand::Help),
            "u" | "users" => Ok(AdminCommand::Users),
            "c" | "connected" => Ok(AdminCommand::Connected),
            "h" | "history" => Ok(AdminCommand::History(argument)),
            "s" | "stats" => Ok(AdminCommand::Stats),
            "q" | "quit" => Ok(AdminCommand::Quit),
            other => Err(format!("알 수 없는 명령: {} (help 입력)", other)),
        })
    }
}

pub fn render_users(stats: &[UsageStats]) -> String {
    if stats.is_empty() {
        return "등록된 사용자가 없습니다".to_string();
    }
    let mut out = String::new();
    for user in stats {
        let _ = writeln!(
            out,
            "{}, 마지막 접속: {}",
            user.login,
            format_datetime(&user.last_login)
        );
    }
    out
}

pub fn render_sessions(sessions: &[ActiveSession]) -> String {
    if sessions.is_empty() {
        return "접속 중인 사용자가 없습니다".to_string();
    }
    let mut out = String::new();
    for session in sessions {
        let _ = writeln!(
            out,
            "{}, 주소: {}:{}, 접속 시간: {}",
            session.login,
            session.ip,
            session.port,
            format_datetime(&session.login_time)
        );
    }
    out
}

pub fn render_history(records: &[LoginRecord]) -> String {
    if records.is_empty() {
        return "접속 이력이 없습니다".to_string();
    }
    let mut out = String::new();
    for record in records {
        let _ = writeln!(
            out,
            "{}, 접속 시간: {}, 주소: {}:{}",
            record.login,
            format_datetime(&record.login_time),
            record.ip,
            record.port
        );
    }
    out
}

pub fn render_stats(stats: &[UsageStats]) -> String {
    if stats.is_empty() {
        return "통계가 없습니다".to_string();
    }
    let mut out = String::new();
    for user in stats {
        let _ = writeln!(
            out,
            "{}: 보낸 메시지 {}, 받은 메시지 {}",
            user.login, user.sent, user.received
        );
    }
    out
}

async fn execute(handle: &ServerHandle, command: &AdminCommand) -> Result<String> {
    let output = match command {
        AdminCommand::Help => HELP.to_string(),
        AdminCommand::Users => render_users(&handle.usage_stats().await?),
        AdminCommand::Connected => render_sessions(&handle.active_sessions().await?),
        AdminCommand::History(name) => {
            render_history(&handle.login_history(name.as_deref()).await?)
        }
        AdminCommand::Stats => render_stats(&handle.usage_stats().await?),
        AdminCommand::Quit => String::new(),
    };
    Ok(output)
}

/// 관리 콘솔 루프. `quit` 또는 입력 종료 시 반환합니다.
pub async fn run_admin_console(handle: &ServerHandle) -> Result<()> {
    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("표준 입력 읽기 실패")? {
        let command = match AdminCommand::parse(&line) {
            None => continue,
            Some(Ok(command)) => command,
            Some(Err(message)) => {
                println!("{}", message);
                continue;
            }
        };

        if command == AdminCommand::Quit {
            info!("관리 콘솔에서 종료 요청");
            break;
        }

        match execute(handle, &command).await {
            Ok(output) => println!("{}", output.trim_end()),
            Err(e) => println!("조회 실패: {}", e),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_parse_commands() {
        assert_eq!(AdminCommand::parse("   "), None);
        assert_eq!(AdminCommand::parse("u"), Some(Ok(AdminCommand::Users)));
        assert_eq!(AdminCommand::parse("connected"), Some(Ok(AdminCommand::Connected)));
        assert_eq!(AdminCommand::parse("h"), Some(Ok(AdminCommand::History(None))));
        assert_eq!(
            AdminCommand::parse("history alice"),
            Some(Ok(AdminCommand::History(Some("alice".to_string()))))
        );
        assert_eq!(AdminCommand::parse("q"), Some(Ok(AdminCommand::Quit)));
        assert!(matches!(AdminCommand::parse("dance"), Some(Err(_))));
    }

    #[test]
    fn test_render_snapshots() {
        let now = Utc::now();
        let stats = vec![UsageStats {
            login: "alice".to_string(),
            last_login: now,
            sent: 3,
            received: 1,
        }];
        assert!(render_stats(&stats).contains("보낸 메시지 3, 받은 메시지 1"));
        assert!(render_users(&stats).starts_with("alice"));

        let sessions = vec![ActiveSession {
            login: "bob".to_string(),
            ip: "10.0.0.2".to_string(),
            port: 7001,
            login_time: now,
        }];
        assert!(render_sessions(&sessions).contains("10.0.0.2:7001"));
        assert_eq!(render_history(&[]), "접속 이력이 없습니다");
    }
}
