// ==========================================
// 物资供应链报表系统 - 仪表盘告警
// ==========================================
// 三类告警: 长期未上报 / 无提醒对象 / 无上报人
// 无告警时返回 None
// ==========================================

use crate::config::ReportingConfig;
use crate::engine::{
    get_reporting_and_nonreporting_facilities, LocationIndex, ReportingRepositories,
    ReportingSnapshot, SnapshotError,
};
use crate::domain::{Contact, SupplyPoint};
use crate::i18n::t_with_args;
use crate::repository::ContactRepository;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    NonReporting,
    NoReminders,
    NoReporters,
}

/// 告警条目；target 为点击后跳转的位置或站点编码
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub text: String,
    pub target: String,
}

fn non_empty(alerts: Vec<Alert>) -> Option<Vec<Alert>> {
    (!alerts.is_empty()).then_some(alerts)
}

pub struct AlertService {
    repos: ReportingRepositories,
    contact_repo: Arc<ContactRepository>,
}

impl AlertService {
    pub fn new(repos: ReportingRepositories, contact_repo: Arc<ContactRepository>) -> Self {
        Self {
            repos,
            contact_repo,
        }
    }

    /// 截止 now - non_reporting_alert_days 天仍无库存上报的站点（含从未上报）
    pub fn non_reporting_facilities(
        &self,
        location_code: &str,
        now: NaiveDateTime,
        config: &ReportingConfig,
    ) -> Result<Option<Vec<Alert>>, SnapshotError> {
        let snapshot = ReportingSnapshot::load(&self.repos, location_code, config.clone())?;
        let deadline = now - Duration::days(config.non_reporting_alert_days);
        let facilities = snapshot.active_facilities();
        let (_, late) =
            get_reporting_and_nonreporting_facilities(&facilities, snapshot.reports(), deadline);

        tracing::debug!(location = location_code, late = late.len(), "未上报告警");
        Ok(non_empty(
            late.into_iter()
                .map(|sp| Alert {
                    kind: AlertKind::NonReporting,
                    text: t_with_args("alerts.non_reporting", &[("facility", sp.name.as_str())]),
                    target: sp.location_code.clone(),
                })
                .collect(),
        ))
    }

    /// 没有任何需要提醒的上报人的站点
    pub fn facilities_without_reminders(
        &self,
        location_code: &str,
    ) -> Result<Option<Vec<Alert>>, SnapshotError> {
        self.facility_alerts(location_code, AlertKind::NoReminders, "alerts.no_reminders", |cs| {
            !cs.iter().any(|c| c.needs_reminders)
        })
    }

    /// 没有登记上报人的站点
    pub fn facilities_without_reporters(
        &self,
        location_code: &str,
    ) -> Result<Option<Vec<Alert>>, SnapshotError> {
        self.facility_alerts(location_code, AlertKind::NoReporters, "alerts.no_reporters", |cs| {
            cs.is_empty()
        })
    }

    fn facility_alerts<F>(
        &self,
        location_code: &str,
        kind: AlertKind,
        text_key: &str,
        flagged: F,
    ) -> Result<Option<Vec<Alert>>, SnapshotError>
    where
        F: Fn(&[&Contact]) -> bool,
    {
        let index = self.load_index(location_code)?;
        let facilities = index.all_child_facilities(location_code);
        if facilities.is_empty() {
            return Ok(None);
        }

        let codes: Vec<String> = facilities.iter().map(|sp| sp.code.clone()).collect();
        let contacts = self.contact_repo.list_by_supply_points(&codes)?;
        let mut by_facility: HashMap<&str, Vec<&Contact>> = HashMap::new();
        for contact in &contacts {
            if let Some(code) = contact.supply_point_code.as_deref() {
                by_facility.entry(code).or_default().push(contact);
            }
        }

        let alerts = facilities
            .into_iter()
            .filter(|sp: &&SupplyPoint| {
                let reporters = by_facility.get(sp.code.as_str()).map(Vec::as_slice).unwrap_or(&[]);
                flagged(reporters)
            })
            .map(|sp| Alert {
                kind,
                text: t_with_args(text_key, &[("place", sp.name.as_str())]),
                target: sp.code.clone(),
            })
            .collect();
        Ok(non_empty(alerts))
    }

    fn load_index(&self, location_code: &str) -> Result<LocationIndex, SnapshotError> {
        let index = self.repos.load_location_index()?;
        if index.location(location_code).is_none() {
            return Err(SnapshotError::LocationNotFound(location_code.to_string()));
        }
        Ok(index)
    }
}
