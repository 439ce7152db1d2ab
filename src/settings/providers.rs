use std::env;
use std::path::PathBuf;
use serde::Deserialize;
use super::{server::parse_env_var, SettingsError};

/// 파일 프로바이더 블록
#[derive(Debug, Clone, Deserialize)]
pub struct FileProviderSettings {
    /// 라우트/백엔드 설정 파일. 비어 있으면 전역 설정 파일을 사용합니다.
    #[serde(default)]
    pub filename: Option<PathBuf>,

    /// 파일 변경 감시 여부
    #[serde(default = "default_watch")]
    pub watch: bool,
}

fn default_watch() -> bool {
    true
}

impl Default for FileProviderSettings {
    fn default() -> Self {
        Self {
            filename: None,
            watch: default_watch(),
        }
    }
}

impl FileProviderSettings {
    /// PROXY_FILE_PROVIDER가 지정되어 있을 때만 블록을 만듭니다.
    pub fn from_env() -> Result<Option<Self>, SettingsError> {
        match env::var("PROXY_FILE_PROVIDER") {
            Ok(filename) if !filename.is_empty() => Ok(Some(Self {
                filename: Some(PathBuf::from(filename)),
                watch: parse_env_var("PROXY_FILE_PROVIDER_WATCH", default_watch)?,
            })),
            _ => Ok(None),
        }
    }
}
