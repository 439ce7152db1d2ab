//! 동적 설정을 공급하는 프로바이더입니다.
//!
//! 모든 프로바이더는 하나의 공유 채널로 설정을 밀어 넣으며,
//! `None`은 "아직 데이터 없음"을 뜻합니다.

use std::fmt;
use std::path::PathBuf;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::configuration::Configuration;

mod file;

pub use file::FileProvider;

pub type ConfigurationSender = mpsc::Sender<Option<Configuration>>;
pub type ConfigurationReceiver = mpsc::Receiver<Option<Configuration>>;

/// 프로바이더 공용 채널 용량
pub const CONFIGURATION_CHANNEL_CAPACITY: usize = 16;

pub fn configuration_channel() -> (ConfigurationSender, ConfigurationReceiver) {
    mpsc::channel(CONFIGURATION_CHANNEL_CAPACITY)
}

#[derive(Debug)]
pub enum ProviderError {
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
    Parse {
        path: PathBuf,
        message: String,
    },
    Watch(String),
    /// 설정 채널의 수신 측이 닫힘
    ChannelClosed,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Io { path, error } =>
                write!(f, "설정 파일 {} 읽기 실패: {}", path.display(), error),
            ProviderError::Parse { path, message } =>
                write!(f, "설정 파일 {} 파싱 실패: {}", path.display(), message),
            ProviderError::Watch(msg) =>
                write!(f, "파일 감시 오류: {}", msg),
            ProviderError::ChannelClosed =>
                write!(f, "설정 채널이 닫혔습니다"),
        }
    }
}

impl std::error::Error for ProviderError {}

#[async_trait]
pub trait Provider: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// 설정을 0번 이상 채널로 보냅니다. 감시형 프로바이더는 종료되지 않을 수 있습니다.
    async fn provide(&self, tx: ConfigurationSender) -> Result<(), ProviderError>;
}

/// 각 프로바이더를 자기 태스크에서 실행합니다.
pub fn spawn_providers(providers: Vec<Box<dyn Provider>>, tx: ConfigurationSender) -> Vec<JoinHandle<()>> {
    providers
        .into_iter()
        .map(|provider| {
            let tx = tx.clone();
            tokio::spawn(async move {
                info!(provider = %provider.name(), "프로바이더 시작");
                match provider.provide(tx).await {
                    Ok(()) => info!(provider = %provider.name(), "프로바이더 종료"),
                    Err(e) => error!(provider = %provider.name(), error = %e, "프로바이더 실패"),
                }
            })
        })
        .collect()
}
