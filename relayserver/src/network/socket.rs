use std::io;
use std::net::SocketAddr;
use tokio::io::{Interest, Ready};
use tokio::net::{TcpListener, TcpStream};
use tracing::debug;

/// 수신 대기 소켓 (bind + listen + accept)
#[derive(Debug)]
pub struct ServerSocket {
    listener: TcpListener,
}

impl ServerSocket {
    /// 주소와 포트에 바인딩합니다. 빈 주소는 모든 인터페이스를 뜻합니다.
    pub async fn bind(address: &str, port: u16) -> io::Result<Self> {
        let host = if address.is_empty() { "0.0.0.0" } else { address };
        let listener = TcpListener::bind((host, port)).await?;
        debug!("리스너 바인딩: {}", listener.local_addr()?);
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// 대기 중인 연결 하나를 수락합니다.
    ///
    /// 취소해도 연결을 잃지 않으므로 `select!` 분기에서 사용할 수 있습니다.
    pub async fn accept(&self) -> io::Result<(PeerSocket, SocketAddr)> {
        let (stream, addr) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        Ok((PeerSocket { stream }, addr))
    }
}

/// 수락된 피어 소켓 (준비 상태 + 논블로킹 읽기/쓰기)
#[derive(Debug)]
pub struct PeerSocket {
    stream: TcpStream,
}

impl PeerSocket {
    /// 요청한 준비 상태 중 하나가 될 때까지 대기합니다.
    pub async fn ready(&self, interest: Interest) -> io::Result<Ready> {
        self.stream.ready(interest).await
    }

    /// 논블로킹 읽기. 읽을 데이터가 없으면 `WouldBlock`을 반환합니다.
    pub fn try_read(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.try_read(buf)
    }

    /// 논블로킹 쓰기. 커널 버퍼가 가득 차면 `WouldBlock`을 반환합니다.
    pub fn try_write(&self, buf: &[u8]) -> io::Result<usize> {
        self.stream.try_write(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_accept_and_nonblocking_io() {
        let server = ServerSocket::bind("127.0.0.1", 0).await.expect("Test assertion failed");
        let addr = server.local_addr().expect("Test assertion failed");

        let mut client = TcpStream::connect(addr).await.expect("Test assertion failed");
        let (peer, peer_addr) = server.accept().await.expect("Test assertion failed");
        assert_eq!(peer_addr, client.local_addr().expect("Test assertion failed"));

        let mut buf = [0u8; 16];
        let empty = peer.try_read(&mut buf);
        assert!(matches!(empty, Err(ref e) if e.kind() == io::ErrorKind::WouldBlock));

        client.write_all(b"ping").await.expect("Test assertion failed");
        peer.ready(Interest::READABLE).await.expect("Test assertion failed");
        let n = loop {
            match peer.try_read(&mut buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    peer.ready(Interest::READABLE).await.expect("Test assertion failed");
                }
                Err(e) => panic!("읽기 실패: {}", e),
            }
        };
        assert_eq!(&buf[..n], b"ping");

        peer.ready(Interest::WRITABLE).await.expect("Test assertion failed");
        let written = peer.try_write(b"pong").expect("Test assertion failed");
        assert_eq!(written, 4);

        let mut reply = [0u8; 4];
        client.read_exact(&mut reply).await.expect("Test assertion failed");
        assert_eq!(&reply, b"pong");

        println!("✅ 피어 소켓 논블로킹 I/O 테스트 통과");
    }
}
