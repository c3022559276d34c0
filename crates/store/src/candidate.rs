use crate::atomic_write;
use async_trait::async_trait;
use shouban_core::store::error::StoreError;
use shouban_core::store::port::CandidateStore;
use shouban_core::strategy::entity::CandidateList;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::info;

/// # Summary
/// `CandidateStore` 的 JSON 文件实现。
///
/// 选股任务收盘后写一次，夜间挂单与晨间校验各自重读文件
/// 而不经共享内存传递，避免跨线程共享清单结构。
///
/// # Invariants
/// - 每个日历日一份快照，新快照整体覆盖旧文件。
pub struct JsonCandidateStore {
    path: PathBuf,
}

impl JsonCandidateStore {
    /// 在配置的数据根目录下创建（文件名固定 candidate.json）
    pub fn new() -> Self {
        Self::new_at(crate::config::get_root_dir().join("candidate.json"))
    }

    /// 以显式文件路径创建
    pub fn new_at(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Default for JsonCandidateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CandidateStore for JsonCandidateStore {
    /// # Logic
    /// 1. 序列化为带缩进的 JSON（保持与人工巡检兼容）。
    /// 2. 整文件原子写入。
    async fn save(&self, list: &CandidateList) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(list)?;
        atomic_write(&self.path, &bytes).await?;
        info!(
            "candidate list saved: {} ({} codes)",
            self.path.display(),
            list.count
        );
        Ok(())
    }

    async fn load_latest(&self) -> Result<Option<CandidateList>, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let list: CandidateList = serde_json::from_slice(&raw)?;
        Ok(Some(list))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_roundtrip_preserves_order_and_date() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = JsonCandidateStore::new_at(dir.path().join("candidate.json"));

        let date = NaiveDate::from_ymd_opt(2026, 8, 7).expect("valid date");
        let list = CandidateList::new(
            date,
            vec!["300001.SZ".into(), "000333.SZ".into(), "600519.SH".into()],
            1_765_000_000,
        );
        store.save(&list).await.expect("save");

        let loaded = store.load_latest().await.expect("load").expect("present");
        assert_eq!(loaded, list);
        assert_eq!(loaded.candidates[0], "300001.SZ");
        assert_eq!(loaded.count, 3);
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = JsonCandidateStore::new_at(dir.path().join("absent.json"));
        assert!(store.load_latest().await.expect("load").is_none());
    }

    #[tokio::test]
    async fn test_new_snapshot_supersedes_old() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = JsonCandidateStore::new_at(dir.path().join("candidate.json"));

        let d1 = NaiveDate::from_ymd_opt(2026, 8, 6).expect("valid date");
        let d2 = NaiveDate::from_ymd_opt(2026, 8, 7).expect("valid date");
        store
            .save(&CandidateList::new(d1, vec!["600000.SH".into()], 1))
            .await
            .expect("save");
        store
            .save(&CandidateList::new(d2, vec![], 2))
            .await
            .expect("save");

        let loaded = store.load_latest().await.expect("load").expect("present");
        assert_eq!(loaded.date, d2);
        assert_eq!(loaded.count, 0);
    }
}
