use std::path::{Path, PathBuf};
use serde::Deserialize;
use tracing::debug;

mod server;
pub mod logging;
mod tls;
mod error;
mod providers;

pub use server::ServerSettings;
pub use logging::{LogFormat, LogSettings};
pub use tls::TlsSettings;
pub use providers::FileProviderSettings;
pub use error::SettingsError;

pub type Result<T> = std::result::Result<T, SettingsError>;
pub use server::parse_env_var;

/// 시작 시 한 번 로드되는 프로세스 전역 설정입니다.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    // 서버 설정
    #[serde(default)]
    pub server: ServerSettings,

    // 로깅 설정
    #[serde(default)]
    pub logging: LogSettings,

    // TLS 설정
    #[serde(default)]
    pub tls: TlsSettings,

    /// 파일 프로바이더 (없으면 비활성)
    #[serde(default)]
    pub file: Option<FileProviderSettings>,

    /// 설정을 읽어 온 파일
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Settings {
    /// 파일이 있으면 TOML에서, 없으면 환경 변수에서 설정을 만듭니다.
    ///
    /// `required`가 참이면 파일이 없을 때 에러입니다.
    pub async fn load<P: AsRef<Path>>(path: P, required: bool) -> Result<Self> {
        let path = path.as_ref();
        if required || path.exists() {
            Self::from_toml_file(path).await
        } else {
            debug!(path = %path.display(), "설정 파일 없음, 환경 변수 사용");
            Self::from_env().await
        }
    }

    pub async fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| SettingsError::FileError {
            path: path.to_string_lossy().to_string(),
            error: e,
        })?;

        let mut settings = Self::from_toml_str(&content)?;
        settings.source = Some(path.to_path_buf());

        // 파일 이름이 비어 있으면 전역 설정 파일을 그대로 감시
        if let Some(file) = settings.file.as_mut() {
            if file.filename.as_ref().map_or(true, |f| f.as_os_str().is_empty()) {
                file.filename = Some(path.to_path_buf());
            }
        }

        settings.apply_env_overrides()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SettingsError::ParseError { source: e })
    }

    pub async fn from_env() -> Result<Self> {
        let settings = Self {
            server: ServerSettings::from_env()?,
            logging: LogSettings::from_env()?,
            tls: TlsSettings::from_env()?,
            file: FileProviderSettings::from_env()?,
            source: None,
        };

        // 설정 생성 시점에 바로 검증
        settings.validate()?;
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        self.server.apply_env_overrides()?;
        self.logging.apply_env_overrides()?;
        self.tls.apply_env_overrides();
        if let Some(file) = FileProviderSettings::from_env()? {
            self.file = Some(file);
        }
        Ok(())
    }

    /// 설정 유효성 검증
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.tls.validate()?;
        if let Some(file) = &self.file {
            if file.filename.is_none() {
                return Err(SettingsError::InvalidConfig(
                    "file 프로바이더에 filename이 필요합니다".to_string(),
                ));
            }
        }
        Ok(())
    }
}
