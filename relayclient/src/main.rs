//! 메신저 클라이언트
//!
//! 환경변수:
//! - messenger_server_host: 서버 주소 (기본값: 127.0.0.1)
//! - messenger_server_port: 서버 포트 (기본값: 7777)
//! - messenger_user: 사용자 이름 (기본값: Guest)
//! - messenger_password: 비밀번호

use anyhow::{Context, Result};
use clap::Parser;
use shared::logging::{init_logging, LoggingConfig, ServiceType};
use std::sync::Arc;

use relayclient::console::run_console;
use relayclient::{validate_config, ClientConfig, MessengerClient};

#[derive(Parser, Debug)]
#[command(name = "relayclient", version, about = "메신저 클라이언트")]
struct Args {
    /// 서버 주소
    address: Option<String>,

    /// 서버 포트
    port: Option<u16>,

    /// 사용자 이름
    #[arg(short, long)]
    name: Option<String>,

    /// 비밀번호
    #[arg(long)]
    password: Option<String>,
}

fn apply_overrides(mut config: ClientConfig, args: Args) -> ClientConfig {
    if let Some(address) = args.address {
        config.server_host = address;
    }
    if let Some(port) = args.port {
        config.server_port = port;
    }
    if let Some(name) = args.name {
        config.user_name = name;
    }
    if let Some(password) = args.password {
        config.password = password;
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(ServiceType::RelayClient, &LoggingConfig::quiet())?;

    let config = apply_overrides(ClientConfig::from_env(), args);
    validate_config(&config)?;

    let (client, events) = MessengerClient::connect(&config)
        .await
        .with_context(|| format!("서버 접속 실패: {}", config.server_address()))?;
    println!("{} 사용자로 {}에 접속했습니다", config.user_name, config.server_address());

    run_console(Arc::new(client), events).await
}
