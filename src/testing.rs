//! In-memory stand-ins for the market API and the state file.

use crate::api::MarketData;
use crate::error::{Result, ScannerError};
use crate::storage::StateStore;
use crate::types::{ItemId, ItemSummary, Listing, SaleCount, SaleRecord, ScanState};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Default)]
struct Calls {
    history: Vec<ItemId>,
    listings: Vec<(ItemId, bool)>,
}

#[derive(Clone, Default)]
pub struct FakeMarket {
    catalog: Vec<ItemId>,
    sales: HashMap<ItemId, Vec<SaleRecord>>,
    listings: HashMap<ItemId, Listing>,
    failing: HashSet<ItemId>,
    calls: Arc<Mutex<Calls>>,
}

fn recent_sale(index: usize, price: u64, hq: bool) -> SaleRecord {
    SaleRecord {
        timestamp: Utc::now().timestamp() - 60 * (index as i64 + 1),
        quantity: 1,
        price_per_unit: price,
        hq,
    }
}

impl FakeMarket {
    pub fn new(catalog: Vec<ItemId>) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    /// `count` normal-quality sales of one unit each within the last day
    pub fn with_busy_item(mut self, item_id: ItemId, count: usize, price: u64) -> Self {
        let sales = (0..count).map(|i| recent_sale(i, price, false)).collect();
        self.sales.insert(item_id, sales);
        self
    }

    pub fn with_quality_mix(mut self, item_id: ItemId, hq: usize, nq: usize) -> Self {
        let mut sales: Vec<SaleRecord> = (0..hq).map(|i| recent_sale(i, 2_000, true)).collect();
        sales.extend((0..nq).map(|i| recent_sale(hq + i, 800, false)));
        self.sales.insert(item_id, sales);
        self
    }

    pub fn with_listing(mut self, item_id: ItemId, listing: Listing) -> Self {
        self.listings.insert(item_id, listing);
        self
    }

    pub fn failing_on(mut self, item_id: ItemId) -> Self {
        self.failing.insert(item_id);
        self
    }

    pub fn history_requests(&self) -> Vec<ItemId> {
        self.calls.lock().history.clone()
    }

    pub fn listing_requests(&self) -> Vec<(ItemId, bool)> {
        self.calls.lock().listings.clone()
    }
}

#[async_trait]
impl MarketData for FakeMarket {
    async fn list_marketable_item_ids(&self) -> Result<Vec<ItemId>> {
        Ok(self.catalog.clone())
    }

    async fn fetch_recent_sales(&self, item_id: ItemId, max_entries: usize) -> Result<Vec<SaleRecord>> {
        self.calls.lock().history.push(item_id);
        if self.failing.contains(&item_id) {
            return Err(ScannerError::HttpStatus {
                url: format!("fake://history/{}", item_id),
                status: 503,
            });
        }

        let mut sales = self.sales.get(&item_id).cloned().unwrap_or_default();
        sales.truncate(max_entries);
        Ok(sales)
    }

    async fn fetch_cheapest_listing(&self, item_id: ItemId, high_quality_only: bool) -> Result<Listing> {
        self.calls.lock().listings.push((item_id, high_quality_only));
        Ok(self.listings.get(&item_id).cloned().unwrap_or_else(Listing::empty))
    }

    async fn fetch_display_name(&self, item_id: ItemId) -> Result<String> {
        Ok(format!("item-{}", item_id))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    saved: Mutex<Vec<ScanState>>,
}

impl MemoryStore {
    pub fn save_count(&self) -> usize {
        self.saved.lock().len()
    }

    pub fn last_saved(&self) -> Option<ScanState> {
        self.saved.lock().last().cloned()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn load(&self) -> Result<Option<ScanState>> {
        Ok(self.last_saved())
    }

    async fn save(&self, state: &ScanState) -> Result<()> {
        self.saved.lock().push(state.clone());
        Ok(())
    }
}

pub fn summary(item_id: ItemId) -> ItemSummary {
    ItemSummary {
        item_id,
        display_name: format!("item-{}", item_id),
        average_price: 1_000,
        sale_count: SaleCount::Exact(10),
        total_quantity_sold: 10,
        total_amount_sold: 10_000,
        cheapest_listing: Listing::empty(),
    }
}
