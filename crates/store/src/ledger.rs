use crate::atomic_write;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shouban_core::store::error::StoreError;
use shouban_core::store::port::{LedgerEntry, OrderLedger};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// # Summary
/// `OrderLedger` 的 JSON 文件实现。
///
/// 启动时整体加载，之后每次变更在持有写锁期间回写文件，
/// 使"标记成功但未落盘"的窗口对并发读方不可见。
///
/// # Invariants
/// - 台账是跨进程重启的唯一幂等防线；文件损坏按空台账处理并告警，
///   宁可让晨间校验多对一次账，也不让进程无法启动。
pub struct JsonOrderLedger {
    path: PathBuf,
    entries: RwLock<HashMap<String, LedgerEntry>>,
}

impl JsonOrderLedger {
    /// 在配置的数据根目录下加载（文件名固定 order_cache.json）
    pub async fn load() -> Result<Self, StoreError> {
        Self::load_at(crate::config::get_root_dir().join("order_cache.json")).await
    }

    /// # Summary
    /// 从显式路径加载台账。
    ///
    /// # Logic
    /// 1. 文件缺失 -> 空台账。
    /// 2. 文件损坏 -> 告警并以空台账启动（不中止进程）。
    pub async fn load_at(path: PathBuf) -> Result<Self, StoreError> {
        let entries = match tokio::fs::read(&path).await {
            Ok(raw) => match serde_json::from_slice::<HashMap<String, LedgerEntry>>(&raw) {
                Ok(map) => map,
                Err(e) => {
                    warn!("order ledger corrupt at {}: {}, starting empty", path.display(), e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        info!("order ledger loaded: {} entries", entries.len());
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    async fn flush(&self, entries: &HashMap<String, LedgerEntry>) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        atomic_write(&self.path, &bytes).await
    }
}

#[async_trait]
impl OrderLedger for JsonOrderLedger {
    async fn already_placed(&self, code: &str, date: &str) -> Result<bool, StoreError> {
        Ok(self
            .entries
            .read()
            .await
            .get(code)
            .is_some_and(|e| e.date == date))
    }

    /// # Logic
    /// 1. 持写锁插入 (code, 今日) 记录。
    /// 2. 写锁未释放前完成整文件回写。
    async fn mark_placed(&self, code: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            code.to_string(),
            LedgerEntry {
                timestamp: now.timestamp(),
                date: shouban_core::common::trade_date(now),
            },
        );
        self.flush(&entries).await
    }

    async fn prune(&self, now: DateTime<Utc>, max_age_days: i64) -> Result<usize, StoreError> {
        let cutoff = now.timestamp() - max_age_days * 24 * 3600;
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.timestamp > cutoff);
        let removed = before - entries.len();
        if removed > 0 {
            self.flush(&entries).await?;
            info!("order ledger pruned: {} expired entries removed", removed);
        }
        Ok(removed)
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("valid ts")
    }

    #[tokio::test]
    async fn test_mark_then_query_same_day() {
        let dir = tempfile::tempdir().expect("temp dir");
        let ledger = JsonOrderLedger::load_at(dir.path().join("order_cache.json"))
            .await
            .expect("load");

        let now = Utc.with_ymd_and_hms(2026, 8, 7, 13, 0, 0).single().expect("ts");
        assert!(!ledger.already_placed("600000.SH", "20260807").await.expect("query"));
        ledger.mark_placed("600000.SH", now).await.expect("mark");
        assert!(ledger.already_placed("600000.SH", "20260807").await.expect("query"));
        // 不同日历日不算已挂单
        assert!(!ledger.already_placed("600000.SH", "20260808").await.expect("query"));
    }

    #[tokio::test]
    async fn test_survives_restart() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("order_cache.json");

        let now = Utc.with_ymd_and_hms(2026, 8, 7, 13, 1, 0).single().expect("ts");
        {
            let ledger = JsonOrderLedger::load_at(path.clone()).await.expect("load");
            ledger.mark_placed("300001.SZ", now).await.expect("mark");
        }
        // 重新加载模拟进程重启
        let ledger = JsonOrderLedger::load_at(path).await.expect("reload");
        assert_eq!(ledger.len().await, 1);
        assert!(ledger.already_placed("300001.SZ", "20260807").await.expect("query"));
    }

    #[tokio::test]
    async fn test_prune_keeps_recent_drops_stale() {
        let dir = tempfile::tempdir().expect("temp dir");
        let ledger = JsonOrderLedger::load_at(dir.path().join("order_cache.json"))
            .await
            .expect("load");

        let now = t(1_765_000_000);
        ledger.mark_placed("A", t(1_765_000_000 - 8 * 24 * 3600)).await.expect("mark");
        ledger.mark_placed("B", t(1_765_000_000 - 6 * 24 * 3600)).await.expect("mark");

        let removed = ledger.prune(now, 7).await.expect("prune");
        assert_eq!(removed, 1);
        assert_eq!(ledger.len().await, 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("order_cache.json");
        tokio::fs::write(&path, b"{ not json").await.expect("write");

        let ledger = JsonOrderLedger::load_at(path).await.expect("load");
        assert_eq!(ledger.len().await, 0);
    }
}
