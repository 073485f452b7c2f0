// ==========================================
// 物资供应链报表系统 - CSV 导出
// ==========================================
// 周期导出: 自本周分界星期零点向前按周分段（最近在前）
// 平铺导出: 上报明细（按时间升序）/ 短信日志（最新在前）
// 结果集为空时仍输出表头
// ==========================================

use crate::config::ReportingConfig;
use crate::db::DATETIME_FORMAT;
use crate::domain::types::MessageDirection;
use crate::engine::{
    weekly_buckets, BucketDirection, DateSpan, LocationIndex, ReportingRepositories,
    ReportingSnapshot,
};
use crate::export::error::{ExportError, ExportResult};
use crate::export::request::{ExportKind, ExportRequest};
use crate::perf::QueryTimer;
use crate::repository::{ContactRepository, MessageFilter, MessageRepository, ReportFilter};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tracing::instrument;

pub const PERIODIC_REPORTING_HEADER: [&str; 7] = [
    "start of period",
    "end of period",
    "total num facilities",
    "# reporting",
    "# on time",
    "# late",
    "# non reporting",
];

pub const PERIODIC_STOCK_HEADER: [&str; 7] = [
    "start of period",
    "end of period",
    "total facilities",
    "stock out",
    "low stock",
    "adequate stock",
    "overstock",
];

pub const REPORTING_HEADER: [&str; 9] = [
    "ID",
    "Location Grandparent",
    "Location Parent",
    "Facility",
    "Commodity",
    "Report Type",
    "Quantity",
    "Date",
    "Message",
];

pub const MESSAGE_LOG_HEADER: [&str; 6] = ["ID", "Date", "Direction", "Contact", "Phone", "Text"];

fn fmt_dt(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

// ==========================================
// ReportExporter - CSV 导出器
// ==========================================
pub struct ReportExporter {
    repos: ReportingRepositories,
    message_repo: Arc<MessageRepository>,
    contact_repo: Arc<ContactRepository>,
}

impl ReportExporter {
    pub fn new(
        repos: ReportingRepositories,
        message_repo: Arc<MessageRepository>,
        contact_repo: Arc<ContactRepository>,
    ) -> Self {
        Self {
            repos,
            message_repo,
            contact_repo,
        }
    }

    /// 导出到内存（后台任务使用）
    pub fn export_to_bytes(
        &self,
        kind: ExportKind,
        request: &ExportRequest,
        config: &ReportingConfig,
        today: NaiveDate,
    ) -> ExportResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.export(kind, request, config, today, &mut buf)?;
        Ok(buf)
    }

    /// 按类型分派，返回数据行数（不含表头）
    pub fn export<W: Write>(
        &self,
        kind: ExportKind,
        request: &ExportRequest,
        config: &ReportingConfig,
        today: NaiveDate,
        writer: W,
    ) -> ExportResult<usize> {
        let _timer = QueryTimer::start(kind.timer_label());
        match kind {
            ExportKind::PeriodicReporting => {
                self.export_periodic_reporting(request, config, today, writer)
            }
            ExportKind::PeriodicStock => self.export_periodic_stock(request, config, today, writer),
            ExportKind::Reporting => self.export_reporting(request, writer),
            ExportKind::MessageLog => self.export_message_log(request, writer),
        }
    }

    fn location_index(&self, location_code: &str) -> ExportResult<LocationIndex> {
        let index = self.repos.load_location_index()?;
        if index.location(location_code).is_none() {
            return Err(ExportError::LocationNotFound(location_code.to_string()));
        }
        Ok(index)
    }

    fn periodic_buckets(config: &ReportingConfig, today: NaiveDate) -> Vec<DateSpan> {
        let span = DateSpan::weeks_ending(
            today,
            config.periodic_anchor_weekday,
            config.periodic_export_weeks,
        );
        weekly_buckets(&span, config.periodic_anchor_weekday, BucketDirection::Backward)
            .into_iter()
            .map(|b| b.span)
            .collect()
    }

    /// 周期上报统计
    #[instrument(skip(self, config, writer), fields(location = %request.location_code))]
    pub fn export_periodic_reporting<W: Write>(
        &self,
        request: &ExportRequest,
        config: &ReportingConfig,
        today: NaiveDate,
        writer: W,
    ) -> ExportResult<usize> {
        let snapshot =
            ReportingSnapshot::load(&self.repos, &request.location_code, config.clone())?;
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(PERIODIC_REPORTING_HEADER)?;

        let mut rows = 0;
        for span in Self::periodic_buckets(config, today) {
            let b = snapshot.reporting_breakdown(&request.location_code, span, config.days_for_late);
            wtr.write_record([
                fmt_dt(&span.start),
                fmt_dt(&span.end),
                b.total().to_string(),
                b.reported.len().to_string(),
                b.on_time.len().to_string(),
                b.late.len().to_string(),
                b.non_reporting.len().to_string(),
            ])?;
            rows += 1;
        }
        wtr.flush()?;

        tracing::info!(rows, "周期上报统计导出完成");
        Ok(rows)
    }

    /// 周期库存统计（每段在子树根一次汇总）
    #[instrument(skip(self, config, writer), fields(location = %request.location_code))]
    pub fn export_periodic_stock<W: Write>(
        &self,
        request: &ExportRequest,
        config: &ReportingConfig,
        today: NaiveDate,
        writer: W,
    ) -> ExportResult<usize> {
        let snapshot =
            ReportingSnapshot::load(&self.repos, &request.location_code, config.clone())?;
        let products = snapshot.active_products(&request.product_filter());

        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(PERIODIC_STOCK_HEADER)?;

        let mut rows = 0;
        for span in Self::periodic_buckets(config, today) {
            let (mut total, mut stockout, mut low, mut adequate, mut overstock) = (0, 0, 0, 0, 0);
            for product in &products {
                if let Some(summary) = snapshot.stock_summary(&request.location_code, product, &span)
                {
                    total += summary.total();
                    stockout += summary.stockout_count();
                    low += summary.emergency_plus_low();
                    adequate += summary.good_supply_count();
                    overstock += summary.overstocked_count();
                }
            }
            tracing::debug!(start = %span.start, total, stockout, "周期库存分段完成");
            wtr.write_record([
                fmt_dt(&span.start),
                fmt_dt(&span.end),
                total.to_string(),
                stockout.to_string(),
                low.to_string(),
                adequate.to_string(),
                overstock.to_string(),
            ])?;
            rows += 1;
        }
        wtr.flush()?;

        tracing::info!(rows, products = products.len(), "周期库存统计导出完成");
        Ok(rows)
    }

    /// 上报明细
    #[instrument(skip(self, writer), fields(location = %request.location_code))]
    pub fn export_reporting<W: Write>(&self, request: &ExportRequest, writer: W) -> ExportResult<usize> {
        let index = self.location_index(&request.location_code)?;
        let product_names: HashMap<String, String> = self
            .repos
            .product_repo
            .list_all()?
            .into_iter()
            .map(|p| (p.sms_code, p.name))
            .collect();
        let sp_codes: Vec<String> = index
            .supply_points_under(&request.location_code, false)
            .iter()
            .map(|sp| sp.code.clone())
            .collect();

        let filter = ReportFilter {
            supply_point_codes: Some(sp_codes),
            report_types: Vec::new(),
            since: request.datespan.map(|s| s.start),
            before: request.datespan.map(|s| s.end),
            product_code: request.commodity.clone(),
            product_type_code: request.program.clone(),
        };
        let reports = self.repos.report_repo.list_with_message_text(&filter)?;

        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(REPORTING_HEADER)?;
        for (report, message) in &reports {
            let facility = index
                .supply_point(&report.supply_point_code)
                .map(|sp| sp.name.clone())
                .unwrap_or_default();
            let commodity = product_names
                .get(&report.product_code)
                .cloned()
                .unwrap_or_else(|| report.product_code.clone());
            wtr.write_record([
                report.id.to_string(),
                index
                    .grandparent_name(&report.supply_point_code)
                    .unwrap_or_default()
                    .to_string(),
                index
                    .parent_name(&report.supply_point_code)
                    .unwrap_or_default()
                    .to_string(),
                facility,
                commodity,
                report.report_type.display_name().to_string(),
                report.quantity.to_string(),
                fmt_dt(&report.report_date),
                message.clone().unwrap_or_default(),
            ])?;
        }
        wtr.flush()?;

        tracing::info!(rows = reports.len(), "上报明细导出完成");
        Ok(reports.len())
    }

    /// 短信日志（最新在前）
    #[instrument(skip(self, writer), fields(location = %request.location_code))]
    pub fn export_message_log<W: Write>(
        &self,
        request: &ExportRequest,
        writer: W,
    ) -> ExportResult<usize> {
        let supply_point_codes = if request.location_code.is_empty() {
            None
        } else {
            let index = self.location_index(&request.location_code)?;
            Some(
                index
                    .supply_points_under(&request.location_code, false)
                    .iter()
                    .map(|sp| sp.code.clone())
                    .collect(),
            )
        };

        let messages = self.message_repo.list(&MessageFilter {
            contact_id: request.contact_id,
            supply_point_codes,
            since: request.datespan.map(|s| s.start),
            before: request.datespan.map(|s| s.end),
        })?;

        let mut contact_names: HashMap<i64, String> = HashMap::new();
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(MESSAGE_LOG_HEADER)?;
        for message in &messages {
            let contact = match message.contact_id {
                Some(id) => {
                    if !contact_names.contains_key(&id) {
                        let name = self
                            .contact_repo
                            .find_by_id(id)?
                            .map(|c| c.name)
                            .unwrap_or_default();
                        contact_names.insert(id, name);
                    }
                    contact_names.get(&id).cloned().unwrap_or_default()
                }
                None => String::new(),
            };
            let direction = match message.direction {
                MessageDirection::Incoming => "Incoming",
                MessageDirection::Outgoing => "Outgoing",
            };
            wtr.write_record([
                message.id.to_string(),
                fmt_dt(&message.date),
                direction.to_string(),
                contact,
                message.phone.clone(),
                message.text.clone(),
            ])?;
        }
        wtr.flush()?;

        tracing::info!(rows = messages.len(), "短信日志导出完成");
        Ok(messages.len())
    }
}

