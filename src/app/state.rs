// ==========================================
// 物资供应链报表系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{CatalogApi, ExportApi, ImportApi, ReportingApi, SmsApi};
use crate::config::{ConfigManager, ReportingConfigReader};
use crate::db::{init_schema, open_sqlite_connection, read_schema_version};
use crate::engine::ReportingRepositories;
use crate::export::ReportExporter;
use crate::importer::MasterDataImporter;
use crate::perf::install_sqlite_tracing;
use crate::sms::{SmsContext, SmsRouter};
use crate::tasks::{CachedDownloadBackend, DownloadBackend, ExportTaskRunner, FileDownloadBackend};

/// 下载文件目录的环境变量；未设置时下载保存在内存
pub const DOWNLOAD_DIR_ENV: &str = "LOGISTICS_DOWNLOAD_DIR";

/// 数据库路径的环境变量
pub const DB_PATH_ENV: &str = "LOGISTICS_DB_PATH";

/// 应用状态
///
/// 所有仓储共享同一个连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    pub config_manager: Arc<ConfigManager>,

    /// 报表API
    pub reporting_api: Arc<ReportingApi>,

    /// 主数据维护API
    pub catalog_api: Arc<CatalogApi>,

    /// 导出API
    pub export_api: Arc<ExportApi>,

    /// 主数据导入API
    pub import_api: Arc<ImportApi>,

    /// 短信API
    pub sms_api: Arc<SmsApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    pub fn new(db_path: String) -> Result<Self, String> {
        let backend: Arc<dyn DownloadBackend> = match std::env::var(DOWNLOAD_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => {
                std::fs::create_dir_all(dir.trim())
                    .map_err(|e| format!("无法创建下载目录: {}", e))?;
                Arc::new(FileDownloadBackend::new(dir.trim()))
            }
            _ => Arc::new(CachedDownloadBackend::new()),
        };
        Self::with_download_backend(db_path, backend)
    }

    /// 使用指定的下载存储创建实例
    pub fn with_download_backend(
        db_path: String,
        backend: Arc<dyn DownloadBackend>,
    ) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let mut conn =
            open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        install_sqlite_tracing(&mut conn);
        init_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;
        let schema_version =
            read_schema_version(&conn).map_err(|e| format!("无法读取schema版本: {}", e))?;
        tracing::info!(?schema_version, "数据库就绪");
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let repos = ReportingRepositories::from_connection(conn.clone());
        let sms_ctx = SmsContext::from_connection(conn.clone());

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let config = config_manager
            .load_reporting_config()
            .map_err(|e| format!("无法加载报表配置: {}", e))?;
        crate::i18n::set_locale(&config.locale);

        // ==========================================
        // 初始化API层
        // ==========================================
        let reporting_api = Arc::new(ReportingApi::new(
            repos.clone(),
            sms_ctx.contact_repo.clone(),
            config_manager.clone(),
        ));

        let catalog_api = Arc::new(CatalogApi::new(
            repos.location_repo.clone(),
            repos.supply_point_repo.clone(),
            repos.product_repo.clone(),
            repos.product_stock_repo.clone(),
        ));

        let exporter = Arc::new(ReportExporter::new(
            repos.clone(),
            sms_ctx.message_repo.clone(),
            sms_ctx.contact_repo.clone(),
        ));
        let config_reader: Arc<dyn ReportingConfigReader> = config_manager.clone();
        let runner = Arc::new(ExportTaskRunner::new(
            exporter.clone(),
            config_reader,
            backend,
        ));
        let export_api = Arc::new(ExportApi::new(exporter, config_manager.clone(), runner));

        let importer = Arc::new(MasterDataImporter::new(
            repos.location_repo.clone(),
            repos.supply_point_repo.clone(),
            repos.product_repo.clone(),
            repos.product_stock_repo.clone(),
            sms_ctx.contact_repo.clone(),
        ));
        let import_api = Arc::new(ImportApi::new(importer));

        let sms_api = Arc::new(SmsApi::new(Arc::new(SmsRouter::new(sms_ctx))));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            config_manager,
            reporting_api,
            catalog_api,
            export_api,
            import_api,
            sms_api,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先读取 LOGISTICS_DB_PATH，其次为用户数据目录下的 logistics-reporting/logistics.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./logistics.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("logistics-reporting");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("logistics.db");
        }
    }
    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_initializes_schema() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let db_path = temp.path().to_string_lossy().to_string();

        let state = AppState::with_download_backend(
            db_path.clone(),
            Arc::new(CachedDownloadBackend::new()),
        )
        .unwrap();

        assert_eq!(state.db_path, db_path);
        assert!(state.catalog_api.list_facilities().unwrap().is_empty());
        assert_eq!(state.reporting_api.stock_cutoffs().unwrap().months_maximum, 3.0);
    }
}
