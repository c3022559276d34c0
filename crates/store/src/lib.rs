//! # `shouban-store` - 文件持久化适配层
//!
//! 以 JSON 整文件的形式实现 `shouban-core` 的两个存储端口：
//! - [`candidate::JsonCandidateStore`]：候选清单的按日原子快照
//! - [`ledger::JsonOrderLedger`]：挂单台账（幂等防线），每次变更即回写
//!
//! 订单量级很小，吞吐不是目标；所有写入走"临时文件 + rename"
//! 的整文件替换路径，确保崩溃时不会留下半写状态。

pub mod candidate;
pub mod config;
pub mod ledger;

use shouban_core::store::error::StoreError;
use std::path::Path;

/// # Summary
/// 整文件原子写入：先确保父目录存在，写入同目录临时文件，再 rename 替换。
///
/// # Invariants
/// - rename 在同一文件系统内是原子的，读方要么看到旧文件要么看到新文件。
pub(crate) async fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
