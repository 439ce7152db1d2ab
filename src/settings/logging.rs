use serde::{Deserialize, Deserializer};
use std::env;
use std::path::PathBuf;
use tracing::Level;
use super::{server::parse_env_var, SettingsError};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        LogFormat::Text
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub format: LogFormat,
    pub level: Level,
    /// 표준 출력 로깅 여부
    pub stdout: bool,
    /// 로그 파일 경로 (추가 모드로 연다)
    pub file: Option<PathBuf>,
}

impl LogSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let mut settings = Self::default();
        settings.apply_env_overrides()?;
        Ok(settings)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), SettingsError> {
        self.format = parse_env_var("PROXY_LOG_FORMAT", || self.format.clone())?;
        if let Ok(level) = env::var("PROXY_LOG_LEVEL") {
            self.level = parse_log_level(&level).map_err(|reason| SettingsError::EnvVarInvalid {
                var_name: "PROXY_LOG_LEVEL".to_string(),
                value: level.clone(),
                reason,
            })?;
        }
        self.stdout = parse_env_var("PROXY_LOG_STDOUT", || self.stdout)?;
        if let Ok(file) = env::var("PROXY_LOG_FILE") {
            self.file = if file.is_empty() { None } else { Some(PathBuf::from(file)) };
        }
        Ok(())
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: Level::ERROR,
            stdout: true,
            file: None,
        }
    }
}

pub fn parse_log_level(level: &str) -> Result<Level, String> {
    match level.to_lowercase().as_str() {
        "error" => Ok(Level::ERROR),
        "warn" | "warning" => Ok(Level::WARN),
        "info" | "notice" => Ok(Level::INFO),
        "debug" => Ok(Level::DEBUG),
        "trace" => Ok(Level::TRACE),
        _ => Err(format!("유효하지 않은 로그 레벨: {}", level)),
    }
}

impl<'de> Deserialize<'de> for LogSettings {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Helper {
            #[serde(default)]
            format: LogFormat,
            #[serde(default = "default_log_level_string")]
            level: String,
            #[serde(default = "default_stdout")]
            stdout: bool,
            #[serde(default)]
            file: Option<PathBuf>,
        }

        let helper = Helper::deserialize(deserializer)?;
        let level = parse_log_level(&helper.level).map_err(serde::de::Error::custom)?;

        Ok(LogSettings {
            format: helper.format,
            level,
            stdout: helper.stdout,
            file: helper.file,
        })
    }
}

fn default_log_level_string() -> String {
    "error".to_string()
}

fn default_stdout() -> bool {
    true
}
