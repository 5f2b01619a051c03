use crate::error::{Result, ScannerError};
use crate::stats::ScanSettings;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// 商品目录的获取方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogMode {
    /// `/api/marketable` 全量目录
    Full,
    /// 最久未更新的物品子集
    LeastRecentlyUpdated,
}

impl FromStr for CatalogMode {
    type Err = ScannerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full" => Ok(CatalogMode::Full),
            "least-recently-updated" | "lru" => Ok(CatalogMode::LeastRecentlyUpdated),
            other => Err(ScannerError::Config(format!("未知的 CATALOG_MODE: {}", other))),
        }
    }
}

/// 外部接口相关配置
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub universalis_url: String,
    pub xivapi_url: String,
    /// 查询成交历史的服务器/数据中心
    pub history_world: String,
    /// 查询挂单的服务器/数据中心
    pub listing_world: String,
    /// 物品名称语言，对应 XIVAPI 的 `Name_{lang}` 字段
    pub name_language: String,
    pub catalog_mode: CatalogMode,
    pub catalog_entries: u32,
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            universalis_url: "https://universalis.app".to_string(),
            xivapi_url: "https://xivapi.com".to_string(),
            history_world: "Alexander".to_string(),
            listing_world: "Gaia".to_string(),
            name_language: "ja".to_string(),
            catalog_mode: CatalogMode::Full,
            catalog_entries: 200,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub state_path: PathBuf,
    pub api: ApiConfig,
    pub scan: ScanSettings,
    pub scan_on_startup: bool,
}

impl Config {
    /// 从环境变量读取配置（调用前应先加载 .env）
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_defaults = ApiConfig::default();
        let scan_defaults = ScanSettings::default();

        let api = ApiConfig {
            universalis_url: lookup("UNIVERSALIS_URL").unwrap_or(api_defaults.universalis_url),
            xivapi_url: lookup("XIVAPI_URL").unwrap_or(api_defaults.xivapi_url),
            history_world: lookup("HISTORY_WORLD").unwrap_or(api_defaults.history_world),
            listing_world: lookup("LISTING_WORLD").unwrap_or(api_defaults.listing_world),
            name_language: lookup("NAME_LANGUAGE").unwrap_or(api_defaults.name_language),
            catalog_mode: parse_or(&lookup, "CATALOG_MODE", api_defaults.catalog_mode)?,
            catalog_entries: parse_or(&lookup, "CATALOG_ENTRIES", api_defaults.catalog_entries)?,
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                api_defaults.request_timeout.as_secs(),
            )?),
        };

        let scan = ScanSettings {
            history_entries: parse_or(&lookup, "HISTORY_ENTRIES", scan_defaults.history_entries)?,
            min_sales: parse_or(&lookup, "MIN_SALES", scan_defaults.min_sales)?,
            high_value_price: parse_or(&lookup, "HIGH_VALUE_PRICE", scan_defaults.high_value_price)?,
            hq_ratio: parse_or(&lookup, "HQ_RATIO", scan_defaults.hq_ratio)?,
            policy: parse_or(&lookup, "INCLUSION_POLICY", scan_defaults.policy)?,
        };

        if scan.history_entries == 0 {
            return Err(ScannerError::Config("HISTORY_ENTRIES 必须大于 0".to_string()));
        }

        Ok(Self {
            bind_addr: parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 8080)))?,
            state_path: lookup("STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/db.json")),
            api,
            scan,
            scan_on_startup: parse_or(&lookup, "SCAN_ON_STARTUP", false)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| ScannerError::Config(format!("{} 的值无效 ({}): {}", key, raw, e))),
        _ => Ok(default),
    }
}
