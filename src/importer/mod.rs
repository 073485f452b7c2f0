// ==========================================
// 物资供应链报表系统 - 导入层
// ==========================================
// 职责: 主数据导入（位置树、站点、产品、上报人）
// 支持: Excel, CSV
// ==========================================

pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod master_importer;

pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper;
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawRecord, UniversalFileParser};
pub use master_importer::{ImportKind, ImportSummary, MasterDataImporter, RowError};
