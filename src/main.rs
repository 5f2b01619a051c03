use anyhow::Result;
use log::{info, warn};
use std::sync::Arc;
use universalis_scanner::scanner::{spawn_scan, MarketScanner};
use universalis_scanner::server::{self, AppState};
use universalis_scanner::{Config, JsonStateStore, ScanCoordinator, UniversalisClient};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    env_logger::init();

    info!("启动 Universalis 扫描器...");

    // 加载环境变量
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    // 创建 API 客户端
    let client = UniversalisClient::new(config.api.clone())?;

    // 读取状态文件
    let store = Arc::new(JsonStateStore::new(&config.state_path));
    let state = MarketScanner::load_state(&*store).await?;
    info!("状态文件: {}", store.path().display());

    let scanner = Arc::new(MarketScanner::new(
        Arc::new(client),
        store,
        state,
        config.scan.clone(),
    ));
    let coordinator = ScanCoordinator::new();

    if config.scan_on_startup {
        match coordinator.try_start() {
            Some(guard) => {
                info!("启动时立即扫描");
                spawn_scan(Arc::clone(&scanner), guard);
            }
            None => warn!("扫描已在运行"),
        }
    }

    let app = AppState::new(scanner, coordinator);
    server::serve(config.bind_addr, app).await?;

    Ok(())
}
