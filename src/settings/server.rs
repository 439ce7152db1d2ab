use serde::Deserialize;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use super::SettingsError;

#[derive(Clone, Debug, Deserialize)]
pub struct ServerSettings {
    /// 수신 주소 (기본값: 0.0.0.0:8080)
    #[serde(default = "default_address")]
    pub address: SocketAddr,

    /// 드레이닝 서버가 진행 중인 요청을 마칠 수 있는 최대 시간(초)
    #[serde(default = "default_grace_timeout_secs")]
    pub grace_timeout_secs: u64,

    /// 이전 인스턴스 중지 후 새 인스턴스 시작 전 대기 시간(ms)
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

fn default_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}
fn default_grace_timeout_secs() -> u64 { 10 }
fn default_settle_delay_ms() -> u64 { 100 }

pub fn parse_env_var<T: std::str::FromStr, F: FnOnce() -> T>(name: &str, default: F) -> Result<T, SettingsError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val.parse().map_err(|e: T::Err| SettingsError::EnvVarInvalid {
            var_name: name.to_string(),
            value: val,
            reason: e.to_string(),
        }),
        Err(env::VarError::NotPresent) => Ok(default()),
        Err(e) => Err(SettingsError::EnvVarInvalid {
            var_name: name.to_string(),
            value: "".to_string(),
            reason: e.to_string(),
        }),
    }
}

impl ServerSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let settings = Self {
            address: parse_env_var("PROXY_ADDRESS", default_address)?,
            grace_timeout_secs: parse_env_var("PROXY_GRACE_TIMEOUT", default_grace_timeout_secs)?,
            settle_delay_ms: parse_env_var("PROXY_SETTLE_DELAY_MS", default_settle_delay_ms)?,
        };

        settings.validate()?;
        Ok(settings)
    }

    /// 환경 변수가 있으면 값을 덮어씁니다.
    pub fn apply_env_overrides(&mut self) -> Result<(), SettingsError> {
        self.address = parse_env_var("PROXY_ADDRESS", || self.address)?;
        self.grace_timeout_secs = parse_env_var("PROXY_GRACE_TIMEOUT", || self.grace_timeout_secs)?;
        self.settle_delay_ms = parse_env_var("PROXY_SETTLE_DELAY_MS", || self.settle_delay_ms)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.grace_timeout_secs == 0 {
            return Err(SettingsError::InvalidConfig(
                "grace_timeout_secs는 0보다 커야 합니다".to_string(),
            ));
        }
        Ok(())
    }

    pub fn grace_timeout(&self) -> Duration {
        Duration::from_secs(self.grace_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: default_address(),
            grace_timeout_secs: default_grace_timeout_secs(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}
