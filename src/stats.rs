//! 24 小时成交统计
//!
//! 纯计算，不做任何网络请求。除零情况全部显式处理：
//! 普通品质成交为 0 时按"全部为高品质"判断，成交数量为 0 时不计算均价。

use crate::error::ScannerError;
use crate::types::{SaleCount, SaleRecord};
use std::str::FromStr;

pub const WINDOW_SECS: i64 = 86_400;

/// 收录规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InclusionPolicy {
    /// 只看成交次数
    CountOnly,
    /// 成交次数达标或均价超过高价阈值
    CountOrValue,
}

impl FromStr for InclusionPolicy {
    type Err = ScannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "count-only" => Ok(InclusionPolicy::CountOnly),
            "count-or-value" => Ok(InclusionPolicy::CountOrValue),
            other => Err(ScannerError::Config(format!("未知的 INCLUSION_POLICY: {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanSettings {
    /// 每个物品最多拉取的成交记录数
    pub history_entries: usize,
    pub min_sales: usize,
    pub high_value_price: u64,
    /// HQ 成交数 / NQ 成交数 超过此值时只统计 HQ
    pub hq_ratio: f64,
    pub policy: InclusionPolicy,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            history_entries: 50,
            min_sales: 10,
            high_value_price: 100_000,
            hq_ratio: 2.0,
            policy: InclusionPolicy::CountOrValue,
        }
    }
}

impl InclusionPolicy {
    pub fn includes(&self, sale_count: usize, average_price: u64, settings: &ScanSettings) -> bool {
        let enough_sales = sale_count >= settings.min_sales;
        match self {
            InclusionPolicy::CountOnly => enough_sales,
            InclusionPolicy::CountOrValue => {
                enough_sales || average_price > settings.high_value_price
            }
        }
    }
}

pub fn sales_within_window(sales: &[SaleRecord], now: i64) -> Vec<SaleRecord> {
    let cutoff = now - WINDOW_SECS;
    sales
        .iter()
        .filter(|sale| sale.timestamp > cutoff)
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualitySplit {
    pub hq: usize,
    pub nq: usize,
}

impl QualitySplit {
    pub fn of(sales: &[SaleRecord]) -> Self {
        let hq = sales.iter().filter(|sale| sale.hq).count();
        Self {
            hq,
            nq: sales.len() - hq,
        }
    }

    pub fn prefers_high_quality(&self, ratio: f64) -> bool {
        if self.nq == 0 {
            return self.hq > 0;
        }
        self.hq as f64 / self.nq as f64 > ratio
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleTotals {
    pub quantity: u64,
    pub amount: u64,
    pub average: u64,
}

/// 合计数量与金额；数量为 0 时返回 `None`
pub fn summarize(sales: &[SaleRecord]) -> Option<SaleTotals> {
    let (quantity, amount) = sales.iter().fold((0u64, 0u64), |(qty, amt), sale| {
        (qty + sale.quantity, amt + sale.quantity * sale.price_per_unit)
    });

    if quantity == 0 {
        return None;
    }

    // 四舍五入到整数
    let average = (amount * 2 + quantity) / (quantity * 2);
    Some(SaleTotals {
        quantity,
        amount,
        average,
    })
}

impl SaleCount {
    pub fn from_len(len: usize, cap: usize) -> Self {
        if len == cap {
            SaleCount::AtLeast(len)
        } else {
            SaleCount::Exact(len)
        }
    }
}

/// 单个物品的统计结果（已通过收录判断）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub totals: SaleTotals,
    pub sale_count: SaleCount,
    pub only_high_quality: bool,
}

pub fn evaluate(sales: &[SaleRecord], now: i64, settings: &ScanSettings) -> Option<Evaluation> {
    let windowed = sales_within_window(sales, now);
    let windowed_count = windowed.len();

    let only_high_quality = QualitySplit::of(&windowed).prefers_high_quality(settings.hq_ratio);
    let working: Vec<SaleRecord> = if only_high_quality {
        windowed.into_iter().filter(|sale| sale.hq).collect()
    } else {
        windowed
    };

    let totals = summarize(&working)?;
    if !settings.policy.includes(windowed_count, totals.average, settings) {
        return None;
    }

    Some(Evaluation {
        totals,
        sale_count: SaleCount::from_len(working.len(), settings.history_entries),
        only_high_quality,
    })
}
