use std::fmt;
use std::net::SocketAddr;

#[derive(Debug)]
pub enum Error {
    Bind {
        address: SocketAddr,
        error: std::io::Error,
    },
    Tls(String),
    IoError(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bind { address, error } => write!(f, "{} 바인딩 실패: {}", address, error),
            Error::Tls(msg) => write!(f, "TLS 설정 오류: {}", msg),
            Error::IoError(e) => write!(f, "IO Error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Bind { error, .. } => Some(error),
            Error::IoError(e) => Some(e),
            Error::Tls(_) => None,
        }
    }
}
