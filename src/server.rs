//! HTTP 接口
//!
//! `/market` 返回最近一次完成扫描的结果，`/time` 返回完成时间，
//! `/start` 触发扫描（同一小时内只触发一次），`/status` 返回扫描状态，
//! 其余路径返回内嵌了结果数据的静态页面。

use crate::coordinator::{ScanCoordinator, ScanStatus};
use crate::error::{Result, ScannerError};
use crate::scanner::{spawn_scan, MarketScanner, SharedState};
use crate::types::{ItemId, ItemSummary};
use axum::extract::State;
use axum::response::{Html, IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;

const INDEX_HTML: &str = include_str!("../static/index.html");
const SHOW_JS: &str = include_str!("../static/show.js");

#[derive(Clone)]
pub struct AppState {
    scanner: Arc<MarketScanner>,
    coordinator: Arc<ScanCoordinator>,
    state: SharedState,
}

impl AppState {
    pub fn new(scanner: Arc<MarketScanner>, coordinator: Arc<ScanCoordinator>) -> Self {
        let state = scanner.state();
        Self {
            scanner,
            coordinator,
            state,
        }
    }
}

/// `/start` 的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
    AlreadyScanned,
}

impl StartOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            StartOutcome::Started => "scan started",
            StartOutcome::AlreadyRunning => "scan already running",
            StartOutcome::AlreadyScanned => "already scanned this period",
        }
    }
}

/// 两个时间的"小时"字段相同即视为同一时段，日期不参与比较。
/// 例如昨天 14:05 与今天 14:50 也算同一时段。
pub fn same_hour_bucket(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.format("%H").to_string() == b.format("%H").to_string()
}

/// 尝试启动一次后台扫描，不等待扫描结束
pub async fn trigger_scan(app: &AppState) -> StartOutcome {
    if app.coordinator.is_running() {
        return StartOutcome::AlreadyRunning;
    }

    let last_scan = app.state.read().await.last_scan_timestamp;
    if let Some(last_scan) = last_scan {
        if same_hour_bucket(last_scan, Utc::now()) {
            return StartOutcome::AlreadyScanned;
        }
    }

    match app.coordinator.try_start() {
        Some(guard) => {
            info!("触发新的扫描");
            spawn_scan(Arc::clone(&app.scanner), guard);
            StartOutcome::Started
        }
        None => StartOutcome::AlreadyRunning,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: ScanStatus,
    #[serde(rename = "lastScannedItemId")]
    pub last_scanned_item_id: Option<ItemId>,
    #[serde(rename = "inProgressCount")]
    pub in_progress_count: usize,
    #[serde(rename = "resultCount")]
    pub result_count: usize,
    #[serde(rename = "lastScanTimestamp")]
    pub last_scan_timestamp: Option<DateTime<Utc>>,
}

pub async fn market(State(app): State<AppState>) -> Json<Vec<ItemSummary>> {
    Json(app.state.read().await.results.clone())
}

pub async fn time(State(app): State<AppState>) -> String {
    app.state
        .read()
        .await
        .last_scan_timestamp
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_default()
}

pub async fn start(State(app): State<AppState>) -> &'static str {
    trigger_scan(&app).await.message()
}

pub async fn status(State(app): State<AppState>) -> Json<StatusResponse> {
    let state = app.state.read().await;
    Json(StatusResponse {
        status: app.coordinator.status(),
        last_scanned_item_id: state.last_scanned_item_id,
        in_progress_count: state.in_progress.len(),
        result_count: state.results.len(),
        last_scan_timestamp: state.last_scan_timestamp,
    })
}

pub async fn index(State(app): State<AppState>) -> impl IntoResponse {
    let results = app.state.read().await.results.clone();
    Html(render_index(&results))
}

/// 静态页面 + 内联的结果数据 + 渲染脚本
pub fn render_index(results: &[ItemSummary]) -> String {
    let data = serde_json::to_string(results)
        .unwrap_or_else(|_| "[]".to_string())
        .replace("</", "<\\/");

    let mut page = String::with_capacity(INDEX_HTML.len() + SHOW_JS.len() + data.len() + 64);
    page.push_str(INDEX_HTML);
    page.push_str("<script>\nconst scanResults = ");
    page.push_str(&data);
    page.push_str(";\n");
    page.push_str(SHOW_JS);
    page.push_str("</script>\n");
    page
}

pub fn router(app: AppState) -> Router {
    Router::new()
        .route("/market", get(market))
        .route("/time", get(time))
        .route("/start", get(start))
        .route("/status", get(status))
        .fallback(index)
        .with_state(app)
}

pub async fn serve(addr: SocketAddr, app: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ScannerError::Server(format!("无法监听 {}: {}", addr, e)))?;

    info!("Server running at http://{}/", addr);
    axum::serve(listener, router(app))
        .await
        .map_err(|e| ScannerError::Server(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::ScanSettings;
    use crate::testing::{summary, FakeMarket, MemoryStore};
    use crate::types::{Listing, ScanState};
    use chrono::{Duration, TimeZone};
    use tokio::sync::RwLock;

    fn app_with(market: FakeMarket, state: ScanState) -> AppState {
        let scanner = MarketScanner::new(
            Arc::new(market),
            Arc::new(MemoryStore::default()),
            Arc::new(RwLock::new(state)),
            ScanSettings::default(),
        );
        AppState::new(Arc::new(scanner), ScanCoordinator::new())
    }

    async fn wait_until_idle(app: &AppState) {
        while app.coordinator.is_running() {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn hour_bucket_ignores_date() {
        let yesterday = Utc.with_ymd_and_hms(2024, 3, 1, 14, 5, 0).unwrap();
        let today = Utc.with_ymd_and_hms(2024, 3, 2, 14, 50, 0).unwrap();
        assert!(same_hour_bucket(yesterday, today));
        assert!(!same_hour_bucket(today, today + Duration::minutes(15)));
    }

    #[tokio::test]
    async fn market_and_time_reflect_completed_scan() {
        let app = app_with(FakeMarket::new(vec![]), ScanState::default());
        assert_eq!(time(State(app.clone())).await, "");

        let completed = Utc.with_ymd_and_hms(2024, 3, 1, 14, 5, 0).unwrap();
        {
            let mut state = app.state.write().await;
            state.results.push(summary(5333));
            state.last_scan_timestamp = Some(completed);
        }

        let Json(results) = market(State(app.clone())).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].item_id, 5333);
        assert_eq!(time(State(app)).await, completed.to_rfc3339());
    }

    #[tokio::test]
    async fn start_twice_runs_one_scan() {
        let market = FakeMarket::new(vec![1, 2]).with_busy_item(1, 12, 500);
        let app = app_with(market.clone(), ScanState::default());

        assert_eq!(start(State(app.clone())).await, StartOutcome::Started.message());
        let second = trigger_scan(&app).await;
        assert_ne!(second, StartOutcome::Started);

        wait_until_idle(&app).await;
        assert_eq!(market.history_requests(), vec![1, 2]);

        // completed just now, so the hour bucket matches
        assert_eq!(trigger_scan(&app).await, StartOutcome::AlreadyScanned);
        assert_eq!(market.history_requests().len(), 2);
    }

    #[tokio::test]
    async fn recent_scan_is_not_repeated() {
        let state = ScanState {
            last_scan_timestamp: Some(Utc::now()),
            ..ScanState::default()
        };
        let app = app_with(FakeMarket::new(vec![1]), state);

        assert_eq!(trigger_scan(&app).await, StartOutcome::AlreadyScanned);
        assert_eq!(app.coordinator.status(), ScanStatus::Idle);
    }

    #[tokio::test]
    async fn status_reports_failed_scan() {
        let app = app_with(FakeMarket::new(vec![1]).failing_on(1), ScanState::default());
        assert_eq!(trigger_scan(&app).await, StartOutcome::Started);
        wait_until_idle(&app).await;

        let Json(body) = status(State(app.clone())).await;
        assert!(matches!(body.status, ScanStatus::Failed { .. }));
        assert_eq!(body.last_scanned_item_id, Some(1));
        assert_eq!(body.result_count, 0);

        // a failed scan does not block the next trigger
        assert_eq!(trigger_scan(&app).await, StartOutcome::Started);
        wait_until_idle(&app).await;
    }

    #[test]
    fn index_embeds_results_safely() {
        let mut item = summary(1);
        item.display_name = "</script><b>".to_string();
        item.cheapest_listing = Listing::empty();

        let page = render_index(&[item]);
        assert!(page.starts_with(INDEX_HTML));
        assert!(page.contains("const scanResults = ["));
        assert!(page.contains("<\\/script><b>"));
        assert_eq!(page.matches("</script>").count(), INDEX_HTML.matches("</script>").count() + 1);
    }
}
