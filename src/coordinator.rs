use chrono::{DateTime, Utc};
use log::warn;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

/// 扫描任务状态
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ScanStatus {
    Idle,
    Running {
        #[serde(rename = "startedAt")]
        started_at: DateTime<Utc>,
    },
    Failed {
        reason: String,
        at: DateTime<Utc>,
    },
    Completed {
        at: DateTime<Utc>,
        #[serde(rename = "itemsScanned")]
        items_scanned: usize,
        #[serde(rename = "itemsIncluded")]
        items_included: usize,
    },
}

impl ScanStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, ScanStatus::Running { .. })
    }
}

/// 一次扫描的结果摘要
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    pub completed_at: DateTime<Utc>,
    pub items_scanned: usize,
    pub items_included: usize,
}

/// 保证同一时间最多只有一个扫描在运行
#[derive(Debug)]
pub struct ScanCoordinator {
    status: Mutex<ScanStatus>,
}

impl Default for ScanCoordinator {
    fn default() -> Self {
        Self {
            status: Mutex::new(ScanStatus::Idle),
        }
    }
}

impl ScanCoordinator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn status(&self) -> ScanStatus {
        self.status.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.status.lock().is_running()
    }

    /// 已在运行时返回 `None`；否则切换为 Running 并返回守卫
    pub fn try_start(self: &Arc<Self>) -> Option<ScanGuard> {
        let mut status = self.status.lock();
        if status.is_running() {
            return None;
        }
        *status = ScanStatus::Running {
            started_at: Utc::now(),
        };

        Some(ScanGuard {
            coordinator: Arc::clone(self),
            finished: false,
        })
    }

    fn finish(&self, next: ScanStatus) {
        *self.status.lock() = next;
    }
}

/// 扫描期间持有；未调用 `mark_done`/`mark_failed` 就被丢弃时记为失败
#[derive(Debug)]
pub struct ScanGuard {
    coordinator: Arc<ScanCoordinator>,
    finished: bool,
}

impl ScanGuard {
    pub fn mark_done(mut self, report: ScanReport) {
        self.finished = true;
        self.coordinator.finish(ScanStatus::Completed {
            at: report.completed_at,
            items_scanned: report.items_scanned,
            items_included: report.items_included,
        });
    }

    pub fn mark_failed(mut self, reason: impl Into<String>) {
        self.finished = true;
        self.coordinator.finish(ScanStatus::Failed {
            reason: reason.into(),
            at: Utc::now(),
        });
    }
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        if !self.finished {
            warn!("扫描任务未正常结束");
            self.coordinator.finish(ScanStatus::Failed {
                reason: "scan aborted".to_string(),
                at: Utc::now(),
            });
        }
    }
}
