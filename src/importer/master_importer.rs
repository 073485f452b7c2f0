// ==========================================
// 物资供应链报表系统 - 主数据导入
// ==========================================
// 类型: 位置类型 / 位置 / 站点 / 产品 / 上报人
// 单行失败记入 ImportSummary.errors 并跳过，不中断整批
// 位置行若因上级尚未导入而失败，延后重试直到不再有进展
// ==========================================

use crate::domain::contact::{Contact, ContactRole};
use crate::domain::location::{Location, LocationType, SupplyPoint};
use crate::domain::product::{normalize_sms_code, Product, ProductType};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::FieldMapper;
use crate::importer::file_parser::{RawRecord, UniversalFileParser};
use crate::repository::{
    ContactRepository, LocationRepository, ProductRepository, ProductStockRepository,
    RepositoryError, SupplyPointRepository,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// 主数据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    LocationTypes,
    Locations,
    SupplyPoints,
    Products,
    Contacts,
}

impl ImportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportKind::LocationTypes => "location_types",
            ImportKind::Locations => "locations",
            ImportKind::SupplyPoints => "supply_points",
            ImportKind::Products => "products",
            ImportKind::Contacts => "contacts",
        }
    }
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportKind {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "location_types" | "location_type" => Ok(ImportKind::LocationTypes),
            "locations" | "location" => Ok(ImportKind::Locations),
            "supply_points" | "supply_point" | "facilities" => Ok(ImportKind::SupplyPoints),
            "products" | "product" | "commodities" => Ok(ImportKind::Products),
            "contacts" | "contact" | "reporters" => Ok(ImportKind::Contacts),
            _ => Err(ImportError::UnknownKind(s.to_string())),
        }
    }
}

/// 单行错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

/// 导入结果汇总
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub batch_id: String,
    pub kind: ImportKind,
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<RowError>,
}

impl ImportSummary {
    fn new(kind: ImportKind) -> Self {
        Self {
            batch_id: Uuid::new_v4().to_string(),
            kind,
            imported: 0,
            skipped: 0,
            errors: Vec::new(),
        }
    }

    fn reject(&mut self, row: usize, err: &ImportError) {
        self.skipped += 1;
        self.errors.push(RowError {
            row,
            message: err.to_string(),
        });
    }
}

pub struct MasterDataImporter {
    location_repo: Arc<LocationRepository>,
    supply_point_repo: Arc<SupplyPointRepository>,
    product_repo: Arc<ProductRepository>,
    product_stock_repo: Arc<ProductStockRepository>,
    contact_repo: Arc<ContactRepository>,
    mapper: FieldMapper,
}

impl MasterDataImporter {
    pub fn new(
        location_repo: Arc<LocationRepository>,
        supply_point_repo: Arc<SupplyPointRepository>,
        product_repo: Arc<ProductRepository>,
        product_stock_repo: Arc<ProductStockRepository>,
        contact_repo: Arc<ContactRepository>,
    ) -> Self {
        Self {
            location_repo,
            supply_point_repo,
            product_repo,
            product_stock_repo,
            contact_repo,
            mapper: FieldMapper,
        }
    }

    /// 从 CSV/Excel 文件导入
    #[instrument(skip(self, file_path), fields(file = %file_path.as_ref().display()))]
    pub fn import_file<P: AsRef<Path>>(
        &self,
        kind: ImportKind,
        file_path: P,
        now: NaiveDateTime,
    ) -> ImportResult<ImportSummary> {
        let records = UniversalFileParser.parse(file_path.as_ref())?;
        Ok(self.import_records(kind, records, now))
    }

    /// 导入已解析的行
    pub fn import_records(
        &self,
        kind: ImportKind,
        records: Vec<RawRecord>,
        now: NaiveDateTime,
    ) -> ImportSummary {
        let mut summary = ImportSummary::new(kind);
        let total = records.len();

        if kind == ImportKind::Locations {
            self.import_locations(&records, now, &mut summary);
        } else {
            for record in &records {
                match self.import_row(kind, record, now) {
                    Ok(()) => summary.imported += 1,
                    Err(e) => summary.reject(record.row_number, &e),
                }
            }
        }

        tracing::info!(
            batch_id = %summary.batch_id,
            kind = %kind,
            total,
            imported = summary.imported,
            skipped = summary.skipped,
            "主数据导入完成"
        );
        summary
    }

    fn write_err(row: usize) -> impl Fn(RepositoryError) -> ImportError {
        move |source| ImportError::RowWriteError { row, source }
    }

    fn import_location_type(&self, record: &RawRecord) -> ImportResult<()> {
        let code = self.mapper.require_string(record, "code")?;
        let location_type = LocationType {
            name: self
                .mapper
                .get_string(record, "name")
                .unwrap_or_else(|| code.clone()),
            code,
            display_order: self.mapper.parse_i32(record, "display_order")?,
        };
        self.location_repo
            .upsert_type(&location_type)
            .map_err(Self::write_err(record.row_number))
    }

    fn import_row(&self, kind: ImportKind, record: &RawRecord, now: NaiveDateTime) -> ImportResult<()> {
        match kind {
            ImportKind::LocationTypes => self.import_location_type(record),
            ImportKind::Locations => self.import_location(record),
            ImportKind::SupplyPoints => self.import_supply_point(record, now),
            ImportKind::Products => self.import_product(record),
            ImportKind::Contacts => self.import_contact(record),
        }
    }

    fn import_location(&self, record: &RawRecord) -> ImportResult<()> {
        let location = Location {
            code: self.mapper.require_string(record, "code")?,
            name: self.mapper.require_string(record, "name")?,
            type_code: self.mapper.require_string(record, "type")?,
            parent_code: self.mapper.get_string(record, "parent"),
        };
        self.location_repo
            .upsert(&location)
            .map_err(Self::write_err(record.row_number))
    }

    /// 上级未就绪（外键失败）的行延后重试
    fn import_locations(&self, records: &[RawRecord], now: NaiveDateTime, summary: &mut ImportSummary) {
        let mut pending: Vec<&RawRecord> = records.iter().collect();
        loop {
            let before = pending.len();
            let mut deferred = Vec::new();

            for record in pending {
                match self.import_row(ImportKind::Locations, record, now) {
                    Ok(()) => summary.imported += 1,
                    Err(ImportError::RowWriteError {
                        source: RepositoryError::ForeignKeyViolation(_),
                        ..
                    }) => deferred.push(record),
                    Err(e) => summary.reject(record.row_number, &e),
                }
            }

            if deferred.is_empty() {
                return;
            }
            if deferred.len() == before {
                for record in deferred {
                    let parent = self.mapper.get_string(record, "parent").unwrap_or_default();
                    let err = ImportError::RowWriteError {
                        row: record.row_number,
                        source: RepositoryError::ForeignKeyViolation(format!(
                            "上级位置或位置类型不存在: {}",
                            parent
                        )),
                    };
                    summary.reject(record.row_number, &err);
                }
                return;
            }
            tracing::debug!(deferred = deferred.len(), "上级位置未就绪，延后重试");
            pending = deferred;
        }
    }

    fn import_supply_point(&self, record: &RawRecord, now: NaiveDateTime) -> ImportResult<()> {
        let row = record.row_number;
        let supply_point = SupplyPoint {
            code: self.mapper.require_string(record, "code")?,
            name: self.mapper.require_string(record, "name")?,
            location_code: self.mapper.require_string(record, "location")?,
            active: self.mapper.parse_bool(record, "active", true)?,
            last_reported: None,
        };
        self.supply_point_repo
            .upsert(&supply_point)
            .map_err(Self::write_err(row))?;

        for product in self.mapper.parse_list(record, "products") {
            self.product_stock_repo
                .set_active(&supply_point.code, &normalize_sms_code(&product), true, now)
                .map_err(Self::write_err(row))?;
        }
        Ok(())
    }

    fn import_product(&self, record: &RawRecord) -> ImportResult<()> {
        let row = record.row_number;
        let sms_code = normalize_sms_code(&self.mapper.require_string(record, "sms_code")?);
        let type_code = self.mapper.get_string(record, "program");

        if let Some(code) = &type_code {
            if self
                .product_repo
                .find_type(code)
                .map_err(Self::write_err(row))?
                .is_none()
            {
                let name = self
                    .mapper
                    .get_string(record, "program_name")
                    .unwrap_or_else(|| code.clone());
                self.product_repo
                    .upsert_type(&ProductType {
                        code: code.clone(),
                        name,
                    })
                    .map_err(Self::write_err(row))?;
            }
        }

        let product = Product {
            name: self.mapper.require_string(record, "name")?,
            sms_code,
            type_code,
            is_active: self.mapper.parse_bool(record, "active", true)?,
            units: self.mapper.get_string(record, "units"),
            average_monthly_consumption: self.mapper.parse_f64(record, "monthly_consumption")?,
        };
        self.product_repo
            .upsert(&product)
            .map_err(Self::write_err(row))
    }

    fn import_contact(&self, record: &RawRecord) -> ImportResult<()> {
        let role = self.mapper.get_string(record, "role").map(|code| ContactRole {
            code,
            responsibilities: self.mapper.parse_list(record, "responsibilities"),
        });
        let contact = Contact {
            id: 0,
            name: self.mapper.require_string(record, "name")?,
            phone: self.mapper.require_string(record, "phone")?,
            supply_point_code: self.mapper.get_string(record, "supply_point"),
            role,
            needs_reminders: self.mapper.parse_bool(record, "needs_reminders", false)?,
            is_active: self.mapper.parse_bool(record, "active", true)?,
        };
        self.contact_repo
            .upsert(&contact)
            .map(|_| ())
            .map_err(Self::write_err(record.row_number))
    }
}
