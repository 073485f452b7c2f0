// ==========================================
// 物资供应链报表系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod contact;
pub mod location;
pub mod product;
pub mod report;
pub mod types;

// 重导出核心类型
pub use contact::{Contact, ContactRole, Message, REPORTEE_RESPONSIBILITY};
pub use location::{Location, LocationType, SupplyPoint};
pub use product::{normalize_sms_code, Product, ProductStock, ProductType};
pub use report::{BalanceOverflow, NewProductReport, ProductReport, StockTransaction, StockTransfer};
pub use types::{MessageDirection, ReportType, ReportingStatus, StockLevel};
