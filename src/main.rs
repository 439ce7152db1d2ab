use std::path::PathBuf;
use std::process;
use clap::Parser;
use tracing::{error, info};

use reverse_proxy_gateway::logging::init_logging;
use reverse_proxy_gateway::provider::{configuration_channel, spawn_providers, FileProvider, Provider};
use reverse_proxy_gateway::routing::MatcherRegistry;
use reverse_proxy_gateway::server::{
    routing_table_channel, spawn_signal_handler, ConfigurationWatcher, ServerManager, Shutdown,
};
use reverse_proxy_gateway::settings::Settings;

const DEFAULT_CONFIG_FILE: &str = "gateway.toml";

#[derive(Parser, Debug)]
#[command(name = "reverse_proxy_gateway", version, about = "설정 무중단 반영 리버스 프록시")]
struct Cli {
    /// 전역 설정 파일 (TOML)
    #[arg(env = "PROXY_CONFIG_FILE")]
    conf: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let required = cli.conf.is_some();
    let path = cli.conf.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    // 로깅 전이므로 표준 에러로 출력
    let settings = match Settings::load(&path, required).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("설정 로드 실패: {}", e);
            process::exit(1);
        }
    };

    let _guard = match init_logging(&settings.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("로깅 초기화 실패: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run(settings).await {
        error!(error = %e, "서버 실행 실패");
        process::exit(1);
    }
}

async fn run(settings: Settings) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if let Some(source) = &settings.source {
        info!(path = %source.display(), "설정 파일 로드 완료");
    }

    let manager = ServerManager::bind(&settings).await?;

    let (table_tx, table_rx) = routing_table_channel();
    let (config_tx, config_rx) = configuration_channel();

    let watcher = ConfigurationWatcher::new(MatcherRegistry::with_defaults(), table_tx);
    tokio::spawn(watcher.run(config_rx));

    let mut providers: Vec<Box<dyn Provider>> = Vec::new();
    if let Some(provider) = settings.file.as_ref().and_then(FileProvider::from_settings) {
        providers.push(Box::new(provider));
    }
    if providers.is_empty() {
        info!("활성화된 프로바이더가 없습니다, 모든 요청은 404로 응답합니다");
    }
    let _providers = spawn_providers(providers, config_tx.clone());

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    manager.run(table_rx, shutdown.subscribe()).await?;

    // 종료 전까지 감시자가 채널 닫힘으로 멈추지 않도록 유지
    drop(config_tx);
    Ok(())
}
