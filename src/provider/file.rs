use std::path::{Path, PathBuf};
use async_trait::async_trait;
use notify::{Event, RecursiveMode, Result as NotifyResult, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::configuration::Configuration;
use crate::settings::FileProviderSettings;
use super::{ConfigurationSender, Provider, ProviderError};

/// TOML(또는 `.json` 확장자면 JSON) 파일에서 라우트와 백엔드를 읽는 프로바이더입니다.
#[derive(Debug, Clone)]
pub struct FileProvider {
    path: PathBuf,
    watch: bool,
}

impl FileProvider {
    pub fn new(path: impl Into<PathBuf>, watch: bool) -> Self {
        Self {
            path: path.into(),
            watch,
        }
    }

    pub fn from_settings(settings: &FileProviderSettings) -> Option<Self> {
        settings
            .filename
            .as_ref()
            .map(|filename| Self::new(filename.clone(), settings.watch))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 파일을 읽어 설정으로 변환합니다.
    pub async fn load(&self) -> Result<Configuration, ProviderError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| ProviderError::Io {
            path: self.path.clone(),
            error: e,
        })?;

        let is_json = self.path.extension().map_or(false, |ext| ext == "json");
        let parsed = if is_json {
            Configuration::from_json_str(&content)
        } else {
            Configuration::from_toml_str(&content)
        };

        parsed.map_err(|e| ProviderError::Parse {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    // 읽기 실패는 로그만 남기고 이번 변경을 건너뜀
    async fn push(&self, tx: &ConfigurationSender) -> Result<(), ProviderError> {
        match self.load().await {
            Ok(configuration) => {
                debug!(path = %self.path.display(), routes = configuration.routes.len(), "설정 파일 로드");
                tx.send(Some(configuration)).await.map_err(|_| ProviderError::ChannelClosed)
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "설정 파일 로드 실패");
                Ok(())
            }
        }
    }

    fn is_target(&self, changed: &Path) -> bool {
        changed.file_name().is_some() && changed.file_name() == self.path.file_name()
    }
}

#[async_trait]
impl Provider for FileProvider {
    fn name(&self) -> &str {
        "file"
    }

    async fn provide(&self, tx: ConfigurationSender) -> Result<(), ProviderError> {
        self.push(&tx).await?;

        if !self.watch {
            return Ok(());
        }

        let (event_tx, mut event_rx) = mpsc::channel::<PathBuf>(32);

        // notify 이벤트를 경로로 변환하여 채널로 전송하는 핸들러
        let mut watcher = notify::recommended_watcher(move |res: NotifyResult<Event>| {
            match res {
                Ok(event) => {
                    use notify::EventKind::*;
                    if matches!(event.kind, Modify(_) | Create(_)) {
                        for path in event.paths {
                            let _ = event_tx.blocking_send(path);
                        }
                    }
                }
                Err(e) => error!("감시 오류: {}", e),
            }
        }).map_err(|e| ProviderError::Watch(e.to_string()))?;

        // 편집기가 파일을 교체하는 경우가 있어 상위 디렉토리를 감시
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(|e| ProviderError::Watch(e.to_string()))?;
        info!(path = %self.path.display(), "설정 파일 감시 시작");

        while let Some(changed) = event_rx.recv().await {
            if !self.is_target(&changed) {
                continue;
            }
            debug!(path = %changed.display(), "설정 파일 변경 감지");
            self.push(&tx).await?;
        }

        Ok(())
    }
}
