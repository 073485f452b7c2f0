// ==========================================
// 物资供应链报表系统 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合快照加载所需的所有 Repository
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::engine::location_tree::LocationIndex;
use crate::engine::snapshot::SnapshotError;
use crate::repository::{
    LocationRepository, ProductReportRepository, ProductRepository, ProductStockRepository,
    StockTransactionRepository, SupplyPointRepository,
};

/// 报表快照仓储集合
///
/// # 包含的仓储
/// - `location_repo`: 位置树与位置类型
/// - `supply_point_repo`: 站点
/// - `product_repo` / `product_stock_repo`: 产品与站点库存
/// - `report_repo` / `transaction_repo`: 上报事实与余额流水
#[derive(Clone)]
pub struct ReportingRepositories {
    pub location_repo: Arc<LocationRepository>,
    pub supply_point_repo: Arc<SupplyPointRepository>,
    pub product_repo: Arc<ProductRepository>,
    pub product_stock_repo: Arc<ProductStockRepository>,
    pub report_repo: Arc<ProductReportRepository>,
    pub transaction_repo: Arc<StockTransactionRepository>,
}

impl ReportingRepositories {
    /// 基于同一连接创建全部仓储
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            location_repo: Arc::new(LocationRepository::new(conn.clone())),
            supply_point_repo: Arc::new(SupplyPointRepository::new(conn.clone())),
            product_repo: Arc::new(ProductRepository::new(conn.clone())),
            product_stock_repo: Arc::new(ProductStockRepository::new(conn.clone())),
            report_repo: Arc::new(ProductReportRepository::new(conn.clone())),
            transaction_repo: Arc::new(StockTransactionRepository::new(conn)),
        }
    }

    /// 加载完整位置树索引（全部位置与站点）
    pub fn load_location_index(&self) -> Result<LocationIndex, SnapshotError> {
        let types = self.location_repo.list_types()?;
        let locations = self.location_repo.list_all()?;
        let supply_points = self.supply_point_repo.list_all()?;
        Ok(LocationIndex::build(locations, &types, supply_points)?)
    }
}
