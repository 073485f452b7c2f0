// ==========================================
// 物资供应链报表系统 - 导出 API
// ==========================================
// 职责: 同步 CSV 导出 + 后台导出任务（提交/等待/取回/清理）
// ==========================================

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::export::{ExportKind, ExportRequest, ReportExporter};
use crate::tasks::{Download, ExportTaskRunner};

/// 同步导出结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportApiResponse {
    pub kind: ExportKind,
    pub filename: String,
    /// 数据行数（不含表头）
    pub rows: usize,
}

/// 导出API
pub struct ExportApi {
    exporter: Arc<ReportExporter>,
    config_manager: Arc<ConfigManager>,
    runner: Arc<ExportTaskRunner>,
}

impl ExportApi {
    pub fn new(
        exporter: Arc<ReportExporter>,
        config_manager: Arc<ConfigManager>,
        runner: Arc<ExportTaskRunner>,
    ) -> Self {
        Self {
            exporter,
            config_manager,
            runner,
        }
    }

    /// 短信日志允许不指定位置
    fn check_request(kind: ExportKind, request: &ExportRequest) -> ApiResult<()> {
        if kind != ExportKind::MessageLog && request.location_code.trim().is_empty() {
            return Err(ApiError::InvalidInput("位置编码不能为空".to_string()));
        }
        Ok(())
    }

    /// 导出到文件
    ///
    /// # 参数
    /// - kind: 导出类型
    /// - request: 位置与过滤条件
    /// - path: 目标文件
    /// - today: 周期导出的基准日期
    #[instrument(skip(self, request, path), fields(location = %request.location_code, file = %path.as_ref().display()))]
    pub fn export_to_file<P: AsRef<Path>>(
        &self,
        kind: ExportKind,
        request: &ExportRequest,
        path: P,
        today: NaiveDate,
    ) -> ApiResult<ExportApiResponse> {
        Self::check_request(kind, request)?;
        let config = self
            .config_manager
            .load_reporting_config()
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;

        let file = File::create(path.as_ref())
            .map_err(|e| ApiError::ExportError(format!("无法创建文件: {}", e)))?;
        let rows = self
            .exporter
            .export(kind, request, &config, today, BufWriter::new(file))?;

        tracing::info!(kind = %kind, rows, "导出完成");
        Ok(ExportApiResponse {
            kind,
            filename: kind.filename(),
            rows,
        })
    }

    /// 导出到内存
    pub fn export_to_bytes(
        &self,
        kind: ExportKind,
        request: &ExportRequest,
        today: NaiveDate,
    ) -> ApiResult<Vec<u8>> {
        Self::check_request(kind, request)?;
        let config = self
            .config_manager
            .load_reporting_config()
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        Ok(self.exporter.export_to_bytes(kind, request, &config, today)?)
    }

    // ==========================================
    // 后台导出
    // ==========================================

    /// 提交后台导出，立即返回下载 ID
    pub async fn start_export(&self, kind: ExportKind, request: ExportRequest) -> ApiResult<String> {
        Self::check_request(kind, &request)?;
        Ok(self.runner.spawn(kind, request).await)
    }

    /// 等待后台导出完成；已过期时返回 None
    pub async fn wait_download(&self, download_id: &str) -> ApiResult<Option<Download>> {
        Ok(self.runner.wait(download_id).await?)
    }

    /// 等待一批后台导出；任一失败即返回错误
    pub async fn wait_downloads(&self, download_ids: &[String]) -> ApiResult<Vec<Option<Download>>> {
        self.runner
            .wait_all(download_ids)
            .await
            .into_iter()
            .map(|r| r.map_err(ApiError::from))
            .collect()
    }

    /// 取回已完成的下载
    pub async fn fetch_download(&self, download_id: &str) -> ApiResult<Option<Download>> {
        Ok(self.runner.fetch(download_id).await?)
    }

    pub async fn is_pending(&self, download_id: &str) -> bool {
        self.runner.is_pending(download_id).await
    }

    /// 清理过期下载，返回清理数量
    pub async fn purge_expired(&self) -> ApiResult<usize> {
        Ok(self.runner.purge_expired().await?)
    }
}
