use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub type ItemId = u32;

/// 历史成交记录（Universalis history 接口的 entries 元素）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub timestamp: i64,
    pub quantity: u64,
    #[serde(rename = "pricePerUnit")]
    pub price_per_unit: u64,
    pub hq: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    pub entries: Option<Vec<SaleRecord>>,
}

/// 当前挂单
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    #[serde(rename = "worldName", default)]
    pub world_name: String,

    #[serde(rename = "pricePerUnit")]
    pub price_per_unit: i64,

    pub quantity: i64,
}

impl Listing {
    /// 没有挂单时使用的占位值，价格与数量均为 -1
    pub fn empty() -> Self {
        Self {
            world_name: String::new(),
            price_per_unit: -1,
            quantity: -1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.price_per_unit == -1
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingEntry {
    #[serde(rename = "worldName", default)]
    pub world_name: String,

    #[serde(rename = "pricePerUnit")]
    pub price_per_unit: i64,

    pub quantity: i64,

    #[serde(default)]
    pub hq: bool,
}

impl From<ListingEntry> for Listing {
    fn from(entry: ListingEntry) -> Self {
        Self {
            world_name: entry.world_name,
            price_per_unit: entry.price_per_unit,
            quantity: entry.quantity,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingsResponse {
    pub listings: Option<Vec<ListingEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecentlyUpdatedItem {
    #[serde(rename = "itemID")]
    pub item_id: ItemId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecentlyUpdatedResponse {
    pub items: Vec<RecentlyUpdatedItem>,
}

/// 24 小时成交次数。拉取上限被用满时真实次数可能更多，记为 `AtLeast`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleCount {
    Exact(usize),
    AtLeast(usize),
}

impl SaleCount {
    pub fn value(&self) -> usize {
        match self {
            SaleCount::Exact(n) | SaleCount::AtLeast(n) => *n,
        }
    }
}

impl fmt::Display for SaleCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaleCount::Exact(n) => write!(f, "{}", n),
            SaleCount::AtLeast(n) => write!(f, "{}+", n),
        }
    }
}

impl Serialize for SaleCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            SaleCount::Exact(n) => serializer.serialize_u64(*n as u64),
            SaleCount::AtLeast(_) => serializer.serialize_str(&self.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for SaleCount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(usize),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(SaleCount::Exact(n)),
            Raw::Text(text) => text
                .trim_end_matches('+')
                .parse()
                .map(SaleCount::AtLeast)
                .map_err(|_| serde::de::Error::custom(format!("invalid sale count: {}", text))),
        }
    }
}

/// 一次扫描中被收录的物品
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSummary {
    #[serde(rename = "itemId")]
    pub item_id: ItemId,

    #[serde(rename = "displayName")]
    pub display_name: String,

    #[serde(rename = "averagePrice")]
    pub average_price: u64,

    #[serde(rename = "saleCount")]
    pub sale_count: SaleCount,

    #[serde(rename = "totalQuantitySold")]
    pub total_quantity_sold: u64,

    #[serde(rename = "totalAmountSold")]
    pub total_amount_sold: u64,

    #[serde(rename = "cheapestListing")]
    pub cheapest_listing: Listing,
}

/// 持久化的扫描状态（单个 JSON 文档）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanState {
    #[serde(rename = "lastScannedItemId", default)]
    pub last_scanned_item_id: Option<ItemId>,

    #[serde(default)]
    pub results: Vec<ItemSummary>,

    #[serde(rename = "inProgress", default)]
    pub in_progress: Vec<ItemSummary>,

    #[serde(rename = "lastScanTimestamp", default)]
    pub last_scan_timestamp: Option<DateTime<Utc>>,
}

impl ScanState {
    /// 进程重启后未完成的 inProgress 不再合并，只保留续扫位置
    pub fn discard_in_progress(&mut self) {
        self.in_progress.clear();
    }

    /// 扫描完成：inProgress 整体替换 results
    pub fn promote(&mut self, completed_at: DateTime<Utc>) {
        self.results = std::mem::take(&mut self.in_progress);
        self.last_scanned_item_id = None;
        self.last_scan_timestamp = Some(completed_at);
    }
}
