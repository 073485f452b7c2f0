// ==========================================
// 物资供应链报表系统 - 短信上报
// ==========================================
// 职责: 关键字短信解析、上报写入、回复生成
// ==========================================

pub mod error;
pub mod handlers;
pub mod helper;
pub mod parser;
pub mod router;

use crate::engine::ReportingRepositories;
use crate::repository::{ContactRepository, MessageRepository, StockTransferRepository};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub use error::{SmsError, SmsResult};
pub use handlers::{
    IncomingMessage, KeywordHandler, ReceiptHandler, StatusHandler, StockOnHandHandler,
};
pub use helper::ProductReportsHelper;
pub use parser::parse_product_quantities;
pub use router::{SmsResponse, SmsRouter};

/// 短信处理所需的仓储
#[derive(Clone)]
pub struct SmsContext {
    pub repos: ReportingRepositories,
    pub contact_repo: Arc<ContactRepository>,
    pub message_repo: Arc<MessageRepository>,
    pub transfer_repo: Arc<StockTransferRepository>,
}

impl SmsContext {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            repos: ReportingRepositories::from_connection(conn.clone()),
            contact_repo: Arc::new(ContactRepository::new(conn.clone())),
            message_repo: Arc::new(MessageRepository::new(conn.clone())),
            transfer_repo: Arc::new(StockTransferRepository::new(conn)),
        }
    }
}
