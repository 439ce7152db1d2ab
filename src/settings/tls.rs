use std::{env, path::{Path, PathBuf}};
use serde::Deserialize;
use super::SettingsError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsSettings {
    /// 인증서 파일 경로
    pub cert_path: Option<PathBuf>,

    /// 개인키 파일 경로
    pub key_path: Option<PathBuf>,
}

impl TlsSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let settings = Self {
            cert_path: env::var("PROXY_TLS_CERT").map(PathBuf::from).ok(),
            key_path: env::var("PROXY_TLS_KEY").map(PathBuf::from).ok(),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(cert) = env::var("PROXY_TLS_CERT") {
            self.cert_path = Some(PathBuf::from(cert));
        }
        if let Ok(key) = env::var("PROXY_TLS_KEY") {
            self.key_path = Some(PathBuf::from(key));
        }
    }

    /// 인증서와 키가 모두 지정된 경우에만 TLS로 서비스합니다.
    pub fn enabled(&self) -> bool {
        self.paths().is_some()
    }

    pub fn paths(&self) -> Option<(&Path, &Path)> {
        match (&self.cert_path, &self.key_path) {
            (Some(cert), Some(key)) => Some((cert.as_path(), key.as_path())),
            _ => None,
        }
    }

    /// TLS 설정이 유효한지 검증
    pub fn validate(&self) -> Result<(), SettingsError> {
        match (&self.cert_path, &self.key_path) {
            (None, None) => Ok(()),
            (Some(_), None) => Err(SettingsError::EnvVarMissing {
                var_name: "tls.key_path".to_string(),
            }),
            (None, Some(_)) => Err(SettingsError::EnvVarMissing {
                var_name: "tls.cert_path".to_string(),
            }),
            (Some(cert), Some(key)) => {
                for path in [cert, key] {
                    if !path.exists() {
                        return Err(SettingsError::FileError {
                            path: path.to_string_lossy().to_string(),
                            error: std::io::Error::new(
                                std::io::ErrorKind::NotFound,
                                "TLS 파일을 찾을 수 없습니다",
                            ),
                        });
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tls_disabled_by_default() {
        let settings = TlsSettings::default();
        assert!(!settings.enabled());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_tls_requires_both_paths() {
        let settings = TlsSettings {
            cert_path: Some(PathBuf::from("cert.pem")),
            key_path: None,
        };
        assert!(!settings.enabled());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_tls_files_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("cert.pem");
        let key = dir.path().join("key.pem");
        std::fs::write(&cert, "test cert").unwrap();

        let settings = TlsSettings {
            cert_path: Some(cert.clone()),
            key_path: Some(key.clone()),
        };
        assert!(settings.validate().is_err());

        std::fs::write(&key, "test key").unwrap();
        assert!(settings.validate().is_ok());
        assert!(settings.enabled());
    }
}
