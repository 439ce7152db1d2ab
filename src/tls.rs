use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tokio_rustls::rustls::{self, Certificate, PrivateKey};
use tokio_rustls::TlsAcceptor;
use tracing::info;

use crate::settings::TlsSettings;

/// TLS 설정이 있으면 acceptor를 만들고, 없으면 평문 서비스를 의미하는 `None`을 돌려줍니다.
pub fn build_acceptor(settings: &TlsSettings) -> Result<Option<TlsAcceptor>, Box<dyn std::error::Error + Send + Sync>> {
    let Some((cert_path, key_path)) = settings.paths() else {
        return Ok(None);
    };

    let tls_config = load_tls_config(cert_path, key_path)?;
    info!(cert = %cert_path.display(), "TLS 활성화");
    Ok(Some(TlsAcceptor::from(Arc::new(tls_config))))
}

fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<rustls::ServerConfig, Box<dyn std::error::Error + Send + Sync>> {
    let cert_file = File::open(cert_path)?;
    let mut cert_reader = BufReader::new(cert_file);
    let certs: Vec<Certificate> = rustls_pemfile::certs(&mut cert_reader)?
        .into_iter()
        .map(Certificate)
        .collect();
    if certs.is_empty() {
        return Err("인증서를 찾을 수 없음".into());
    }

    let key_file = File::open(key_path)?;
    let mut key_reader = BufReader::new(key_file);
    let key = rustls_pemfile::pkcs8_private_keys(&mut key_reader)?
        .into_iter()
        .next()
        .ok_or("개인키를 찾을 수 없음")?;

    let config = rustls::ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_single_cert(certs, PrivateKey(key))?;

    Ok(config)
}
