// ==========================================
// 物资供应链报表系统 - 后台导出任务
// ==========================================
// spawn 立即返回下载 ID；导出在阻塞线程池上执行，
// 结果写入 DownloadBackend，过期后不可取
// ==========================================

use crate::config::ReportingConfigReader;
use crate::export::{ExportKind, ExportRequest, ReportExporter};
use crate::tasks::download::{Download, DownloadBackend};
use crate::tasks::error::{TaskError, TaskResult};
use chrono::{Duration, NaiveDateTime, Utc};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub struct ExportTaskRunner {
    exporter: Arc<ReportExporter>,
    config_reader: Arc<dyn ReportingConfigReader>,
    backend: Arc<dyn DownloadBackend>,
    pending: Mutex<HashMap<String, JoinHandle<TaskResult<()>>>>,
}

impl ExportTaskRunner {
    pub fn new(
        exporter: Arc<ReportExporter>,
        config_reader: Arc<dyn ReportingConfigReader>,
        backend: Arc<dyn DownloadBackend>,
    ) -> Self {
        Self {
            exporter,
            config_reader,
            backend,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// 提交导出任务，返回下载 ID
    pub async fn spawn(&self, kind: ExportKind, request: ExportRequest) -> String {
        let download_id = Uuid::new_v4().to_string();
        let exporter = self.exporter.clone();
        let reader = self.config_reader.clone();
        let backend = self.backend.clone();
        let id = download_id.clone();

        let handle = tokio::spawn(async move {
            let config = reader
                .read_reporting_config()
                .await
                .map_err(|e| TaskError::Config(e.to_string()))?;
            let expiry_seconds = reader
                .get_export_expiry_seconds()
                .await
                .map_err(|e| TaskError::Config(e.to_string()))?;

            let started = now();
            let today = started.date();
            let data = tokio::task::spawn_blocking(move || {
                exporter.export_to_bytes(kind, &request, &config, today)
            })
            .await
            .map_err(|e| TaskError::Join(e.to_string()))??;

            let size = data.len();
            backend
                .store(Download::csv(
                    &id,
                    &kind.filename(),
                    data,
                    started + Duration::seconds(expiry_seconds),
                ))
                .await?;
            tracing::info!(download_id = %id, kind = %kind, bytes = size, "导出任务完成");
            Ok(())
        });

        tracing::info!(download_id = %download_id, kind = %kind, "导出任务已提交");
        self.pending.lock().await.insert(download_id.clone(), handle);
        download_id
    }

    /// 任务是否仍在执行
    pub async fn is_pending(&self, download_id: &str) -> bool {
        self.pending
            .lock()
            .await
            .get(download_id)
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// 等待任务结束并取回下载
    pub async fn wait(&self, download_id: &str) -> TaskResult<Option<Download>> {
        let handle = self.pending.lock().await.remove(download_id);
        if let Some(handle) = handle {
            let outcome = handle
                .await
                .map_err(|e| TaskError::Join(e.to_string()))?;
            if let Err(e) = outcome {
                tracing::warn!(download_id, error = %e, "导出任务失败");
                return Err(e);
            }
        }
        self.fetch(download_id).await
    }

    pub async fn wait_all(&self, download_ids: &[String]) -> Vec<TaskResult<Option<Download>>> {
        join_all(download_ids.iter().map(|id| self.wait(id))).await
    }

    /// 取回已完成的下载（未完成、未知或已过期时为 None）
    pub async fn fetch(&self, download_id: &str) -> TaskResult<Option<Download>> {
        self.reap_finished().await;
        self.backend.get(download_id, now()).await
    }

    pub async fn purge_expired(&self) -> TaskResult<usize> {
        self.reap_finished().await;
        let purged = self.backend.purge_expired(now()).await?;
        if purged > 0 {
            tracing::info!(purged, "已清理过期下载");
        }
        Ok(purged)
    }
}

impl ExportTaskRunner {
    /// 移除已结束的任务句柄；未经 wait 的失败只记录日志
    async fn reap_finished(&self) {
        let finished: Vec<(String, JoinHandle<TaskResult<()>>)> = {
            let mut pending = self.pending.lock().await;
            let ids: Vec<String> = pending
                .iter()
                .filter(|(_, h)| h.is_finished())
                .map(|(id, _)| id.clone())
                .collect();
            ids.iter().filter_map(|id| pending.remove_entry(id)).collect()
        };

        for (download_id, handle) in finished {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(download_id = %download_id, error = %e, "导出任务失败"),
                Err(e) => tracing::warn!(download_id = %download_id, error = %e, "导出任务异常退出"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigResult, ReportingConfig};
    use crate::db::open_in_memory;
    use crate::domain::location::{Location, LocationType, SupplyPoint};
    use crate::engine::ReportingRepositories;
    use crate::repository::{ContactRepository, MessageRepository};
    use crate::tasks::download::CachedDownloadBackend;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    struct FixedConfig {
        expiry_seconds: i64,
    }

    #[async_trait]
    impl ReportingConfigReader for FixedConfig {
        async fn read_reporting_config(&self) -> ConfigResult<ReportingConfig> {
            Ok(ReportingConfig {
                periodic_export_weeks: 2,
                ..Default::default()
            })
        }

        async fn get_export_expiry_seconds(&self) -> ConfigResult<i64> {
            Ok(self.expiry_seconds)
        }

        async fn is_excel_export_enabled(&self) -> ConfigResult<bool> {
            Ok(true)
        }
    }

    fn runner(expiry_seconds: i64) -> ExportTaskRunner {
        let conn = Arc::new(StdMutex::new(open_in_memory().unwrap()));
        let repos = ReportingRepositories::from_connection(conn.clone());
        repos
            .location_repo
            .upsert_type(&LocationType {
                code: "district".into(),
                name: "District".into(),
                display_order: Some(1),
            })
            .unwrap();
        repos
            .location_repo
            .upsert(&Location::new("D1", "District One", "district", None))
            .unwrap();
        repos
            .supply_point_repo
            .upsert(&SupplyPoint::new("SP1", "Clinic", "D1"))
            .unwrap();

        let exporter = ReportExporter::new(
            repos,
            Arc::new(MessageRepository::new(conn.clone())),
            Arc::new(ContactRepository::new(conn)),
        );
        ExportTaskRunner::new(
            Arc::new(exporter),
            Arc::new(FixedConfig { expiry_seconds }),
            Arc::new(CachedDownloadBackend::new()),
        )
    }

    #[tokio::test]
    async fn test_spawn_and_wait_returns_csv() {
        let runner = runner(3600);
        let id = runner
            .spawn(ExportKind::PeriodicReporting, ExportRequest::for_location("D1"))
            .await;

        let download = runner.wait(&id).await.unwrap().unwrap();
        assert_eq!(download.filename, "periodic_reporting.csv");
        let text = String::from_utf8(download.data).unwrap();
        assert!(text.starts_with("start of period,end of period"));
        assert_eq!(text.lines().count(), 3);
        assert!(!runner.is_pending(&id).await);
    }

    #[tokio::test]
    async fn test_unknown_location_fails_task() {
        let runner = runner(3600);
        let id = runner
            .spawn(ExportKind::Reporting, ExportRequest::for_location("NOPE"))
            .await;
        let err = runner.wait(&id).await.unwrap_err();
        assert!(matches!(err, TaskError::Export(_)));
        assert!(runner.fetch(&id).await.unwrap().is_none());
    }

    async fn wait_until_finished(runner: &ExportTaskRunner, id: &str) {
        while runner.is_pending(id).await {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_polling_releases_finished_handles() {
        let runner = runner(3600);
        let ok = runner
            .spawn(ExportKind::Reporting, ExportRequest::for_location("D1"))
            .await;
        let failed = runner
            .spawn(ExportKind::Reporting, ExportRequest::for_location("NOPE"))
            .await;
        wait_until_finished(&runner, &ok).await;
        wait_until_finished(&runner, &failed).await;
        assert_eq!(runner.pending.lock().await.len(), 2);

        assert!(runner.fetch(&ok).await.unwrap().is_some());
        assert!(runner.pending.lock().await.is_empty());
        assert!(runner.fetch(&failed).await.unwrap().is_none());

        let again = runner
            .spawn(ExportKind::MessageLog, ExportRequest::default())
            .await;
        wait_until_finished(&runner, &again).await;
        runner.purge_expired().await.unwrap();
        assert!(runner.pending.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_expired_download_is_gone() {
        let runner = runner(0);
        let ids = vec![
            runner.spawn(ExportKind::MessageLog, ExportRequest::default()).await,
            runner.spawn(ExportKind::Reporting, ExportRequest::for_location("D1")).await,
        ];
        for result in runner.wait_all(&ids).await {
            assert!(result.unwrap().is_none());
        }
        assert_eq!(runner.purge_expired().await.unwrap(), 2);
    }
}
