use crate::api::MarketData;
use crate::coordinator::{ScanGuard, ScanReport};
use crate::error::Result;
use crate::stats::{self, ScanSettings};
use crate::storage::StateStore;
use crate::types::{ItemId, ItemSummary, ScanState};
use chrono::Utc;
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

pub type SharedState = Arc<RwLock<ScanState>>;

pub struct MarketScanner {
    client: Arc<dyn MarketData>,
    store: Arc<dyn StateStore>,
    state: SharedState,
    settings: ScanSettings,
    /// 进程启动后的第一次扫描才使用持久化的续扫位置
    resume_pending: AtomicBool,
}

impl MarketScanner {
    pub fn new(
        client: Arc<dyn MarketData>,
        store: Arc<dyn StateStore>,
        state: SharedState,
        settings: ScanSettings,
    ) -> Self {
        Self {
            client,
            store,
            state,
            settings,
            resume_pending: AtomicBool::new(true),
        }
    }

    /// 读取持久化状态；未完成的 inProgress 直接丢弃
    pub async fn load_state(store: &dyn StateStore) -> Result<SharedState> {
        store.init().await?;
        let mut state = store.load().await?.unwrap_or_default();
        if !state.in_progress.is_empty() {
            info!("丢弃上次未完成扫描的 {} 条中间结果", state.in_progress.len());
            state.discard_in_progress();
        }
        Ok(Arc::new(RwLock::new(state)))
    }

    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    /// 完整扫描一遍目录；任何远程调用失败都会中止本次扫描
    pub async fn run_scan(&self) -> Result<ScanReport> {
        let catalog = self.client.list_marketable_item_ids().await?;
        info!("开始扫描，目录共 {} 个物品", catalog.len());

        let items = if self.resume_pending.swap(false, Ordering::SeqCst) {
            let resume_from = self.state.read().await.last_scanned_item_id;
            resume_slice(&catalog, resume_from)
        } else {
            &catalog[..]
        };
        if items.len() < catalog.len() {
            info!("从上次中断处继续，跳过 {} 个物品", catalog.len() - items.len());
        }

        self.state.write().await.in_progress.clear();

        let mut included = 0;
        for &item_id in items {
            if self.scan_item(item_id).await? {
                included += 1;
            }
        }

        let completed_at = Utc::now();
        let snapshot = {
            let mut state = self.state.write().await;
            state.promote(completed_at);
            state.clone()
        };
        self.store.save(&snapshot).await?;

        info!("扫描完成！共处理 {} 个物品，收录 {} 个", items.len(), included);
        Ok(ScanReport {
            completed_at,
            items_scanned: items.len(),
            items_included: included,
        })
    }

    /// 处理单个物品，返回是否被收录
    async fn scan_item(&self, item_id: ItemId) -> Result<bool> {
        self.state.write().await.last_scanned_item_id = Some(item_id);

        let sales = self
            .client
            .fetch_recent_sales(item_id, self.settings.history_entries)
            .await?;
        let now = Utc::now().timestamp();

        let summary = match stats::evaluate(&sales, now, &self.settings) {
            Some(eval) => {
                let display_name = self.client.fetch_display_name(item_id).await?;
                let cheapest_listing = self
                    .client
                    .fetch_cheapest_listing(item_id, eval.only_high_quality)
                    .await?;

                debug!(
                    "收录 [{}] {}: 均价 {}，成交 {} 次",
                    item_id, display_name, eval.totals.average, eval.sale_count
                );
                Some(ItemSummary {
                    item_id,
                    display_name,
                    average_price: eval.totals.average,
                    sale_count: eval.sale_count,
                    total_quantity_sold: eval.totals.quantity,
                    total_amount_sold: eval.totals.amount,
                    cheapest_listing,
                })
            }
            None => {
                debug!("跳过 [{}]: {} 条成交记录未达收录条件", item_id, sales.len());
                None
            }
        };

        let included = summary.is_some();
        let snapshot = {
            let mut state = self.state.write().await;
            if let Some(summary) = summary {
                state.in_progress.push(summary);
            }
            state.clone()
        };
        self.store.save(&snapshot).await?;

        Ok(included)
    }
}

/// 跳过目录中直到（含）`last` 的部分；`last` 不在目录中时从头开始
fn resume_slice(catalog: &[ItemId], last: Option<ItemId>) -> &[ItemId] {
    let Some(last) = last else {
        return catalog;
    };

    match catalog.iter().position(|&id| id == last) {
        Some(index) => &catalog[index + 1..],
        None => {
            warn!("续扫位置 {} 不在目录中，从头扫描", last);
            catalog
        }
    }
}

/// 在后台任务中执行扫描，并把结果汇报给守卫
pub fn spawn_scan(scanner: Arc<MarketScanner>, guard: ScanGuard) -> JoinHandle<()> {
    tokio::spawn(async move {
        match scanner.run_scan().await {
            Ok(report) => guard.mark_done(report),
            Err(e) => {
                if e.is_network() {
                    error!("扫描因远程调用失败而中止: {}", e);
                } else {
                    error!("扫描错误: {}", e);
                }
                guard.mark_failed(e.to_string());
            }
        }
    })
}
