// ==========================================
// 物资供应链报表系统 - 主数据导入 API
// ==========================================
// 职责: 封装 MasterDataImporter，校验导入类型与文件路径
// ==========================================

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::api::error::{ApiError, ApiResult};
use crate::importer::{ImportKind, ImportSummary, MasterDataImporter};

/// 导入API
pub struct ImportApi {
    importer: Arc<MasterDataImporter>,
}

impl ImportApi {
    pub fn new(importer: Arc<MasterDataImporter>) -> Self {
        Self { importer }
    }

    /// 导入主数据文件
    ///
    /// # 参数
    /// - kind: 导入类型（locations / supply_points / products / contacts / location_types）
    /// - file_path: CSV 或 Excel 文件路径
    /// - now: 导入时间（站点商品启用记录使用）
    ///
    /// # 返回
    /// - Ok(ImportSummary): 行级错误收集在 errors 中
    /// - Err(ApiError): 类型未知或文件无法读取
    pub fn import_file(
        &self,
        kind: &str,
        file_path: &str,
        now: NaiveDateTime,
    ) -> ApiResult<ImportSummary> {
        let kind: ImportKind = kind.parse()?;
        if file_path.trim().is_empty() {
            return Err(ApiError::InvalidInput("文件路径不能为空".to_string()));
        }
        if !Path::new(file_path).exists() {
            return Err(ApiError::NotFound(format!("文件不存在: {}", file_path)));
        }

        let summary = self.importer.import_file(kind, file_path, now)?;
        if !summary.errors.is_empty() {
            tracing::warn!(
                batch_id = %summary.batch_id,
                skipped = summary.skipped,
                "部分行导入失败"
            );
        }
        Ok(summary)
    }
}
