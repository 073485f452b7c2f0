// ==========================================
// 物资供应链报表系统 - 主数据维护 API
// ==========================================
// 职责: 站点列表/维护、商品列表/维护/启停
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::{normalize_sms_code, Product, SupplyPoint};
use crate::repository::{
    LocationRepository, ProductRepository, ProductStockRepository, SupplyPointRepository,
};

/// 站点列表行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityListItem {
    pub code: String,
    pub name: String,
    pub location_code: String,
    pub location_name: String,
    pub active: bool,
    pub last_reported: Option<NaiveDateTime>,
}

/// 商品列表行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityListItem {
    pub sms_code: String,
    pub name: String,
    pub type_code: Option<String>,
    pub type_name: Option<String>,
    pub is_active: bool,
}

pub struct CatalogApi {
    location_repo: Arc<LocationRepository>,
    supply_point_repo: Arc<SupplyPointRepository>,
    product_repo: Arc<ProductRepository>,
    product_stock_repo: Arc<ProductStockRepository>,
}

impl CatalogApi {
    pub fn new(
        location_repo: Arc<LocationRepository>,
        supply_point_repo: Arc<SupplyPointRepository>,
        product_repo: Arc<ProductRepository>,
        product_stock_repo: Arc<ProductStockRepository>,
    ) -> Self {
        Self {
            location_repo,
            supply_point_repo,
            product_repo,
            product_stock_repo,
        }
    }

    // ==========================================
    // 站点
    // ==========================================

    /// 站点列表（按位置、名称排序）
    pub fn list_facilities(&self) -> ApiResult<Vec<FacilityListItem>> {
        let location_names: HashMap<String, String> = self
            .location_repo
            .list_all()?
            .into_iter()
            .map(|l| (l.code, l.name))
            .collect();

        Ok(self
            .supply_point_repo
            .list_all()?
            .into_iter()
            .map(|sp| FacilityListItem {
                location_name: location_names
                    .get(&sp.location_code)
                    .cloned()
                    .unwrap_or_default(),
                code: sp.code,
                name: sp.name,
                location_code: sp.location_code,
                active: sp.active,
                last_reported: sp.last_reported,
            })
            .collect())
    }

    /// 新增或更新站点
    ///
    /// # 返回
    /// - ApiError::InvalidInput: 编码或名称为空
    /// - ApiError::NotFound: 所属位置不存在
    #[instrument(skip(self, supply_point), fields(code = %supply_point.code))]
    pub fn save_facility(&self, supply_point: &SupplyPoint) -> ApiResult<()> {
        if supply_point.code.trim().is_empty() || supply_point.name.trim().is_empty() {
            return Err(ApiError::InvalidInput("站点编码和名称不能为空".to_string()));
        }
        if self
            .location_repo
            .find_by_code(&supply_point.location_code)?
            .is_none()
        {
            return Err(ApiError::NotFound(format!(
                "位置(code={})不存在",
                supply_point.location_code
            )));
        }
        self.supply_point_repo.upsert(supply_point)?;
        tracing::info!(location = %supply_point.location_code, "站点已保存");
        Ok(())
    }

    /// 站点启用/停用某商品
    pub fn set_facility_product(
        &self,
        facility_code: &str,
        sms_code: &str,
        active: bool,
        now: NaiveDateTime,
    ) -> ApiResult<()> {
        self.supply_point_repo.get_by_code(facility_code)?;
        let product = self
            .product_repo
            .find_by_code(sms_code)?
            .ok_or_else(|| ApiError::NotFound(format!("商品(code={})不存在", sms_code)))?;
        self.product_stock_repo
            .set_active(facility_code, &product.sms_code, active, now)?;
        Ok(())
    }

    // ==========================================
    // 商品
    // ==========================================

    /// 商品列表（按名称排序）
    pub fn list_commodities(&self) -> ApiResult<Vec<CommodityListItem>> {
        let type_names: HashMap<String, String> = self
            .product_repo
            .list_types()?
            .into_iter()
            .map(|t| (t.code, t.name))
            .collect();

        Ok(self
            .product_repo
            .list_all()?
            .into_iter()
            .map(|p| CommodityListItem {
                type_name: p.type_code.as_ref().and_then(|c| type_names.get(c).cloned()),
                sms_code: p.sms_code,
                name: p.name,
                type_code: p.type_code,
                is_active: p.is_active,
            })
            .collect())
    }

    /// 新增或更新商品（短信代码统一转小写）
    #[instrument(skip(self, product), fields(sms_code = %product.sms_code))]
    pub fn save_commodity(&self, product: &Product) -> ApiResult<()> {
        let sms_code = normalize_sms_code(&product.sms_code);
        if sms_code.is_empty() || sms_code.contains(char::is_whitespace) {
            return Err(ApiError::InvalidInput(format!(
                "短信代码不合法: '{}'",
                product.sms_code
            )));
        }
        if product.name.trim().is_empty() {
            return Err(ApiError::InvalidInput("商品名称不能为空".to_string()));
        }
        if let Some(type_code) = &product.type_code {
            if self.product_repo.find_type(type_code)?.is_none() {
                return Err(ApiError::NotFound(format!("商品类别(code={})不存在", type_code)));
            }
        }
        if let Some(c) = product.average_monthly_consumption {
            if c < 0.0 {
                return Err(ApiError::InvalidInput("月均消耗不能为负数".to_string()));
            }
        }

        self.product_repo.upsert(&Product {
            sms_code,
            ..product.clone()
        })?;
        Ok(())
    }

    pub fn activate_commodity(&self, sms_code: &str) -> ApiResult<()> {
        self.product_repo.set_active(sms_code, true)?;
        tracing::info!(sms_code, "商品已启用");
        Ok(())
    }

    pub fn deactivate_commodity(&self, sms_code: &str) -> ApiResult<()> {
        self.product_repo.set_active(sms_code, false)?;
        tracing::info!(sms_code, "商品已停用");
        Ok(())
    }
}
