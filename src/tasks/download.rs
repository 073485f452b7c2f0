// ==========================================
// 物资供应链报表系统 - 下载存储
// ==========================================
// CachedDownloadBackend: 进程内缓存，过期即不可取
// FileDownloadBackend: 落盘到目录（<id>.json 元数据 + <id>.data 内容）
// ==========================================

use crate::tasks::error::{TaskError, TaskResult};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

pub const CSV_MIMETYPE: &str = "text/csv";

/// 一个可下载的导出结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Download {
    pub download_id: String,
    pub filename: String,
    pub mimetype: String,
    pub content_disposition: String,
    #[serde(skip)]
    pub data: Vec<u8>,
    pub expires_at: NaiveDateTime,
}

impl Download {
    pub fn csv(download_id: &str, filename: &str, data: Vec<u8>, expires_at: NaiveDateTime) -> Self {
        Self {
            download_id: download_id.to_string(),
            filename: filename.to_string(),
            mimetype: CSV_MIMETYPE.to_string(),
            content_disposition: format!("attachment; filename=\"{}\"", filename),
            data,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        now >= self.expires_at
    }
}

#[async_trait]
pub trait DownloadBackend: Send + Sync {
    async fn store(&self, download: Download) -> TaskResult<()>;

    /// 取回下载；不存在或已过期时返回 None
    async fn get(&self, download_id: &str, now: NaiveDateTime) -> TaskResult<Option<Download>>;

    /// 删除全部过期下载，返回删除数量
    async fn purge_expired(&self, now: NaiveDateTime) -> TaskResult<usize>;
}

// ==========================================
// CachedDownloadBackend - 内存缓存
// ==========================================
#[derive(Default)]
pub struct CachedDownloadBackend {
    entries: RwLock<HashMap<String, Download>>,
}

impl CachedDownloadBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl DownloadBackend for CachedDownloadBackend {
    async fn store(&self, download: Download) -> TaskResult<()> {
        self.entries
            .write()
            .await
            .insert(download.download_id.clone(), download);
        Ok(())
    }

    async fn get(&self, download_id: &str, now: NaiveDateTime) -> TaskResult<Option<Download>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(download_id)
            .filter(|d| !d.is_expired(now))
            .cloned())
    }

    async fn purge_expired(&self, now: NaiveDateTime) -> TaskResult<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, d| !d.is_expired(now));
        Ok(before - entries.len())
    }
}

// ==========================================
// FileDownloadBackend - 目录存储
// ==========================================
pub struct FileDownloadBackend {
    dir: PathBuf,
}

impl FileDownloadBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 下载 ID 只允许字母、数字、'-' 和 '_'，路径始终落在下载目录内
    fn checked_id(download_id: &str) -> TaskResult<&str> {
        let valid = !download_id.is_empty()
            && download_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(download_id)
        } else {
            Err(TaskError::Backend(format!("非法下载 ID: {}", download_id)))
        }
    }

    fn meta_path(&self, download_id: &str) -> TaskResult<PathBuf> {
        Ok(self.dir.join(format!("{}.json", Self::checked_id(download_id)?)))
    }

    fn data_path(&self, download_id: &str) -> TaskResult<PathBuf> {
        Ok(self.dir.join(format!("{}.data", Self::checked_id(download_id)?)))
    }

    async fn read_meta(&self, download_id: &str) -> TaskResult<Option<Download>> {
        match tokio::fs::read(self.meta_path(download_id)?).await {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, download_id: &str) -> TaskResult<()> {
        for path in [self.meta_path(download_id)?, self.data_path(download_id)?] {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DownloadBackend for FileDownloadBackend {
    async fn store(&self, download: Download) -> TaskResult<()> {
        let data_path = self.data_path(&download.download_id)?;
        let meta_path = self.meta_path(&download.download_id)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(data_path, &download.data).await?;
        let meta = serde_json::to_vec(&download)?;
        tokio::fs::write(meta_path, meta).await?;
        Ok(())
    }

    async fn get(&self, download_id: &str, now: NaiveDateTime) -> TaskResult<Option<Download>> {
        let mut download = match self.read_meta(download_id).await? {
            Some(d) if !d.is_expired(now) => d,
            _ => return Ok(None),
        };
        download.data = tokio::fs::read(self.data_path(download_id)?).await?;
        Ok(Some(download))
    }

    async fn purge_expired(&self, now: NaiveDateTime) -> TaskResult<usize> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut expired = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.read_meta(id).await {
                Ok(Some(meta)) if meta.is_expired(now) => expired.push(id.to_string()),
                Ok(_) => {}
                Err(e) => tracing::warn!(download_id = id, error = %e, "下载元数据损坏，跳过"),
            }
        }

        for id in &expired {
            self.remove(id).await?;
        }
        Ok(expired.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_cached_backend_hides_expired() {
        let backend = CachedDownloadBackend::new();
        backend
            .store(Download::csv("a", "reporting.csv", b"x".to_vec(), at(10)))
            .await
            .unwrap();

        let found = backend.get("a", at(9)).await.unwrap().unwrap();
        assert_eq!(found.content_disposition, "attachment; filename=\"reporting.csv\"");
        assert!(backend.get("a", at(10)).await.unwrap().is_none());

        assert_eq!(backend.purge_expired(at(11)).await.unwrap(), 1);
        assert_eq!(backend.len().await, 0);
    }

    #[tokio::test]
    async fn test_file_backend_roundtrip_and_purge() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileDownloadBackend::new(dir.path().join("downloads"));

        backend
            .store(Download::csv("keep", "a.csv", b"h1,h2\n".to_vec(), at(20)))
            .await
            .unwrap();
        backend
            .store(Download::csv("old", "b.csv", Vec::new(), at(8)))
            .await
            .unwrap();

        let keep = backend.get("keep", at(9)).await.unwrap().unwrap();
        assert_eq!(keep.data, b"h1,h2\n".to_vec());
        assert_eq!(keep.mimetype, CSV_MIMETYPE);
        assert!(backend.get("missing", at(9)).await.unwrap().is_none());

        assert_eq!(backend.purge_expired(at(9)).await.unwrap(), 1);
        assert!(!dir.path().join("downloads/old.json").exists());
        assert!(dir.path().join("downloads/keep.data").exists());
    }

    #[tokio::test]
    async fn test_file_backend_rejects_ids_outside_directory() {
        let root = tempfile::tempdir().unwrap();
        let backend = FileDownloadBackend::new(root.path().join("downloads"));
        backend
            .store(Download::csv("inside", "a.csv", b"ok".to_vec(), at(20)))
            .await
            .unwrap();

        // 下载目录之外的同名文件不可读取或删除
        let outside = Download::csv("secret", "s.csv", Vec::new(), at(20));
        std::fs::write(root.path().join("secret.json"), serde_json::to_vec(&outside).unwrap())
            .unwrap();
        std::fs::write(root.path().join("secret.data"), b"hidden").unwrap();

        for id in ["../secret", "..\\secret", "/etc/passwd", ".."] {
            let err = backend.get(id, at(9)).await.unwrap_err();
            assert!(matches!(err, TaskError::Backend(_)), "{}", id);
            assert!(backend.remove(id).await.is_err());
        }
        assert!(root.path().join("secret.json").exists());

        let err = backend
            .store(Download::csv("../escape", "e.csv", Vec::new(), at(20)))
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Backend(_)));
        assert!(!root.path().join("escape.data").exists());
        assert!(backend.get("inside", at(9)).await.unwrap().is_some());
    }
}
