// ==========================================
// 物资供应链报表系统 - 核心库
// ==========================================
// 职责: 上报合规统计、库存水平判定与汇总、周期导出、短信上报
// 技术栈: Rust + SQLite
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 主数据
pub mod importer;

// 导出层 - CSV
pub mod export;

// 后台任务 - 异步导出与下载
pub mod tasks;

// 短信上报
pub mod sms;

// 仪表盘告警
pub mod alerts;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 查询耗时统计
pub mod perf;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域实体
pub use domain::{
    Contact, Location, LocationType, Product, ProductReport, ProductStock, ProductType,
    ReportType, ReportingStatus, StockLevel, StockTransaction, SupplyPoint,
};

// 引擎
pub use engine::{DateSpan, LocationIndex, ReportingBreakdown, ReportingSnapshot, StockCounts};

// API
pub use api::{ApiError, ApiResult, CatalogApi, ExportApi, ImportApi, ReportingApi, SmsApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "物资供应链报表系统";
