use reverse_proxy_gateway::settings::{LogFormat, Settings, SettingsError};
use std::path::PathBuf;

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    // 테스트 전후 환경변수 초기화를 위한 헬퍼 함수
    fn cleanup_env() {
        let vars = [
            "PROXY_ADDRESS",
            "PROXY_GRACE_TIMEOUT",
            "PROXY_SETTLE_DELAY_MS",
            "PROXY_TLS_CERT",
            "PROXY_TLS_KEY",
            "PROXY_LOG_LEVEL",
            "PROXY_LOG_FORMAT",
            "PROXY_LOG_STDOUT",
            "PROXY_LOG_FILE",
            "PROXY_FILE_PROVIDER",
            "PROXY_FILE_PROVIDER_WATCH",
        ];
        for var in vars.iter() {
            std::env::remove_var(var);
        }
    }

    // 테스트용 임시 TOML 파일 생성 헬퍼
    fn create_test_toml(content: &str) -> (PathBuf, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("gateway.toml");
        std::fs::write(&file_path, content).unwrap();
        (file_path, dir)
    }

    #[tokio::test]
    #[serial]
    async fn test_env_overrides_file_values() {
        cleanup_env();
        let (path, _dir) = create_test_toml(r#"
            [server]
            address = "127.0.0.1:9000"
            grace_timeout_secs = 5
        "#);

        std::env::set_var("PROXY_GRACE_TIMEOUT", "7");
        std::env::set_var("PROXY_LOG_FORMAT", "json");

        let settings = Settings::from_toml_file(&path).await.unwrap();
        assert_eq!(settings.server.address.port(), 9000);
        assert_eq!(settings.server.grace_timeout_secs, 7);
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.source.as_deref(), Some(path.as_path()));

        cleanup_env();
    }

    #[tokio::test]
    #[serial]
    async fn test_invalid_env_value() {
        cleanup_env();
        std::env::set_var("PROXY_ADDRESS", "not-an-address");

        let result = Settings::from_env().await;
        assert!(matches!(result, Err(SettingsError::EnvVarInvalid { .. })));

        cleanup_env();
    }

    #[tokio::test]
    #[serial]
    async fn test_zero_grace_timeout_is_rejected() {
        cleanup_env();
        let (path, _dir) = create_test_toml("[server]\ngrace_timeout_secs = 0\n");

        let result = Settings::from_toml_file(&path).await;
        assert!(matches!(result, Err(SettingsError::InvalidConfig(_))));

        cleanup_env();
    }

    #[tokio::test]
    #[serial]
    async fn test_file_provider_defaults_to_settings_file() {
        cleanup_env();
        let (path, _dir) = create_test_toml(r#"
            [file]

            [backends.web.servers.s1]
            url = "http://127.0.0.1:9001"

            [routes.main]
            backend = "web"
            rules = [{ category = "PathPrefix", value = "/" }]
        "#);

        let settings = Settings::from_toml_file(&path).await.unwrap();
        let file = settings.file.unwrap();
        assert_eq!(file.filename, Some(path));
        assert!(file.watch);

        cleanup_env();
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_required_file() {
        cleanup_env();
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");

        assert!(matches!(
            Settings::load(&missing, true).await,
            Err(SettingsError::FileError { .. })
        ));

        // 선택적 파일이면 환경 변수 기본값 사용
        let settings = Settings::load(&missing, false).await.unwrap();
        assert_eq!(settings.server.address.port(), 8080);
        assert!(settings.source.is_none());

        cleanup_env();
    }

    #[tokio::test]
    #[serial]
    async fn test_tls_requires_both_paths() {
        cleanup_env();
        let (path, _dir) = create_test_toml("[tls]\ncert_path = \"/tmp/cert.pem\"\n");

        assert!(Settings::from_toml_file(&path).await.is_err());

        cleanup_env();
    }
}
