use tokio::net::TcpStream;
use crate::domain::VmInfoError;

pub async fn connect(host: &str, port: u16) -> Result<TcpStream, VmInfoError> {
    TcpStream::connect((host, port)).await.map_err(|e| {
        let msg = match e.kind() {
            std::io::ErrorKind::ConnectionRefused => format!("connection refused: {}:{}", host, port),
            std::io::ErrorKind::TimedOut => format!("connection timed out: {}:{}", host, port),
            _ => format!("failed to connect to {}:{}: {}", host, port, e),
        };
        VmInfoError::fingerprint(msg)
    })
}
