use crate::config::{ApiConfig, CatalogMode};
use crate::error::{Result, ScannerError};
use crate::types::{
    HistoryResponse, ItemId, Listing, ListingsResponse, RecentlyUpdatedResponse, SaleRecord,
};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

const USER_AGENT: &str = concat!("universalis_scanner/", env!("CARGO_PKG_VERSION"));

/// 只要 HQ 挂单时需要拉取足够多的挂单再筛选
const HQ_LISTING_LIMIT: u32 = 999;

/// 市场数据来源
#[async_trait]
pub trait MarketData: Send + Sync {
    /// 可交易物品 ID 列表（按目录顺序）
    async fn list_marketable_item_ids(&self) -> Result<Vec<ItemId>>;

    /// 最近的成交记录，最多 `max_entries` 条
    async fn fetch_recent_sales(&self, item_id: ItemId, max_entries: usize) -> Result<Vec<SaleRecord>>;

    /// 最便宜的挂单；没有挂单时返回 `Listing::empty()`
    async fn fetch_cheapest_listing(&self, item_id: ItemId, high_quality_only: bool) -> Result<Listing>;

    /// 物品的本地化名称
    async fn fetch_display_name(&self, item_id: ItemId) -> Result<String>;
}

pub struct UniversalisClient {
    client: Client,
    config: ApiConfig,
}

impl UniversalisClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client, config })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        debug!("请求: {} {:?}", url, query);

        let response = self.client.get(url).query(query).send().await?;
        let response = check_status(url, response).await?;

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            warn!("JSON 解析错误 [{}]: {}", url, e);
            ScannerError::MalformedResponse(format!("{}: {}", url, e))
        })
    }

    async fn list_full_catalog(&self) -> Result<Vec<ItemId>> {
        let url = format!("{}/api/marketable", self.config.universalis_url);
        self.get_json(&url, &[]).await
    }

    async fn list_least_recently_updated(&self) -> Result<Vec<ItemId>> {
        let url = format!(
            "{}/api/v2/extra/stats/least-recently-updated",
            self.config.universalis_url
        );
        let response: RecentlyUpdatedResponse = self
            .get_json(
                &url,
                &[
                    ("world", self.config.history_world.clone()),
                    ("entries", self.config.catalog_entries.to_string()),
                ],
            )
            .await?;

        Ok(response.items.into_iter().map(|item| item.item_id).collect())
    }
}

async fn check_status(url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    warn!("API 请求失败 [{}] {}: {}", status, url, text);
    Err(ScannerError::HttpStatus {
        url: url.to_string(),
        status: status.as_u16(),
    })
}

/// 从 XIVAPI 的物品数据中取出 `Name_{lang}` 字段
pub fn extract_display_name(item: &Value, language: &str) -> Result<String> {
    let field = format!("Name_{}", language);
    item.get(&field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ScannerError::MalformedResponse(format!("缺少字段 {}", field)))
}

/// 挑出最便宜的挂单（Universalis 已按单价升序返回）
pub fn pick_cheapest(response: ListingsResponse, high_quality_only: bool) -> Result<Listing> {
    let listings = response
        .listings
        .ok_or_else(|| ScannerError::MalformedResponse("缺少 listings 字段".to_string()))?;

    let cheapest = listings
        .into_iter()
        .find(|listing| !high_quality_only || listing.hq);

    Ok(cheapest.map(Listing::from).unwrap_or_else(Listing::empty))
}

#[async_trait]
impl MarketData for UniversalisClient {
    async fn list_marketable_item_ids(&self) -> Result<Vec<ItemId>> {
        let ids = match self.config.catalog_mode {
            CatalogMode::Full => self.list_full_catalog().await?,
            CatalogMode::LeastRecentlyUpdated => self.list_least_recently_updated().await?,
        };

        debug!("成功获取 {} 个可交易物品", ids.len());
        Ok(ids)
    }

    async fn fetch_recent_sales(&self, item_id: ItemId, max_entries: usize) -> Result<Vec<SaleRecord>> {
        let url = format!(
            "{}/api/v2/history/{}/{}",
            self.config.universalis_url, self.config.history_world, item_id
        );
        let history: HistoryResponse = self
            .get_json(&url, &[("entriesToReturn", max_entries.to_string())])
            .await?;

        history
            .entries
            .ok_or_else(|| ScannerError::MalformedResponse(format!("物品 {} 缺少 entries 字段", item_id)))
    }

    async fn fetch_cheapest_listing(&self, item_id: ItemId, high_quality_only: bool) -> Result<Listing> {
        let url = format!(
            "{}/api/v2/{}/{}",
            self.config.universalis_url, self.config.listing_world, item_id
        );
        let limit = if high_quality_only { HQ_LISTING_LIMIT } else { 1 };
        let response: ListingsResponse = self
            .get_json(
                &url,
                &[("listings", limit.to_string()), ("entries", "0".to_string())],
            )
            .await?;

        pick_cheapest(response, high_quality_only)
    }

    async fn fetch_display_name(&self, item_id: ItemId) -> Result<String> {
        let url = format!("{}/item/{}", self.config.xivapi_url, item_id);
        let item: Value = self.get_json(&url, &[]).await?;
        extract_display_name(&item, &self.config.name_language)
    }
}
