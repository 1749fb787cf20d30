//! 중계 서버 부하 테스트
//!
//! 여러 클라이언트가 원형으로 이웃에게 메시지를 동시에 보냅니다.
//! 단일 태스크 루프가 모든 연결을 처리하는 동안 송신자별 순서가
//! 유지되고 사용량 카운터가 정확한지 확인합니다.

use anyhow::Result;
use futures::future::try_join_all;
use relayserver::start;
use shared::protocol::codec::{read_frame, write_frame, DEFAULT_MAX_PACKAGE_LENGTH};
use shared::protocol::{Action, Message, RESPONSE_OK};
use shared::store::MemoryStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::timeout;

const CLIENTS: usize = 20;
const MESSAGES_PER_CLIENT: usize = 25;
const WAIT: Duration = Duration::from_secs(10);

fn user_name(index: usize) -> String {
    format!("user{:02}", index)
}

async fn login(addr: std::net::SocketAddr, name: &str) -> Result<TcpStream> {
    let mut stream = TcpStream::connect(addr).await?;
    write_frame(&mut stream, &Message::presence(name, ""), DEFAULT_MAX_PACKAGE_LENGTH).await?;
    let response = timeout(WAIT, read_frame(&mut stream, DEFAULT_MAX_PACKAGE_LENGTH)).await??;
    anyhow::ensure!(response.response == Some(RESPONSE_OK), "{} 로그인 실패", name);
    Ok(stream)
}

/// 이웃에게 보내고 이전 사용자에게서 받은 메시지 순서를 검증합니다.
async fn run_client(mut stream: TcpStream, index: usize) -> Result<usize> {
    let me = user_name(index);
    let next = user_name((index + 1) % CLIENTS);
    let previous = user_name((index + CLIENTS - 1) % CLIENTS);

    let (mut reader, mut writer) = stream.split();
    let send = async {
        for seq in 0..MESSAGES_PER_CLIENT {
            let text = format!("{}-{}", me, seq);
            write_frame(&mut writer, &Message::chat(&me, &next, &text), DEFAULT_MAX_PACKAGE_LENGTH)
                .await?;
        }
        anyhow::Ok(())
    };
    let receive = async {
        let mut received = 0;
        while received < MESSAGES_PER_CLIENT {
            let message =
                timeout(WAIT, read_frame(&mut reader, DEFAULT_MAX_PACKAGE_LENGTH)).await??;
            anyhow::ensure!(message.action == Some(Action::Message), "채팅 메시지가 아님");
            anyhow::ensure!(message.from.as_deref() == Some(previous.as_str()));
            let expected = format!("{}-{}", previous, received);
            anyhow::ensure!(
                message.text.as_deref() == Some(expected.as_str()),
                "순서 오류: {:?} (기대값 {})",
                message.text,
                expected
            );
            received += 1;
        }
        anyhow::Ok(received)
    };

    let ((), received) = tokio::try_join!(send, receive)?;
    Ok(received)
}

#[tokio::test]
async fn test_ring_relay_keeps_per_sender_order() -> Result<()> {
    let handle = start("127.0.0.1", 0, Arc::new(MemoryStore::new())).await?;
    let addr = handle.local_addr();

    let mut streams = Vec::with_capacity(CLIENTS);
    for index in 0..CLIENTS {
        streams.push(login(addr, &user_name(index)).await?);
    }
    assert_eq!(handle.active_sessions().await?.len(), CLIENTS);

    let started = Instant::now();
    let results = try_join_all(
        streams
            .into_iter()
            .enumerate()
            .map(|(index, stream)| run_client(stream, index)),
    )
    .await?;
    let elapsed = started.elapsed();

    let total: usize = results.iter().sum();
    assert_eq!(total, CLIENTS * MESSAGES_PER_CLIENT);

    let stats = handle.usage_stats().await?;
    assert_eq!(stats.len(), CLIENTS);
    for user in &stats {
        assert_eq!(user.sent, MESSAGES_PER_CLIENT as u64, "{} 송신 카운터", user.login);
        assert_eq!(user.received, MESSAGES_PER_CLIENT as u64, "{} 수신 카운터", user.login);
    }

    handle.shutdown();
    timeout(WAIT, handle.wait()).await??;

    println!(
        "✅ 부하 테스트 통과: {}개 메시지, {:.2}초",
        total,
        elapsed.as_secs_f64()
    );
    Ok(())
}
