use chrono::{DateTime, Utc};
use std::sync::RwLock;

/// # Summary
/// 时钟供给接口，隔离物理系统时间。
/// 日界判定（台账按日去重、候选清单按日快照）必须通过此接口取时，
/// 使跨日状态机可以在测试中被确定性地驱动。
pub trait Clock: Send + Sync {
    /// 获取当前时间
    fn now(&self) -> DateTime<Utc>;
}

/// # Summary
/// 实盘运行使用的真实时钟，直接返回操作系统当前时间。
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// # Summary
/// 测试专用的可拨动时钟。
///
/// # Invariants
/// - 并发安全：内部以 `RwLock` 保护当前时刻，允许多线程读取与拨动。
pub struct FixedClock {
    current: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    /// 以指定初始时刻创建时钟
    pub fn new(initial: DateTime<Utc>) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    /// 将时钟拨动到新时刻
    pub fn set(&self, t: DateTime<Utc>) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = t;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.read().unwrap_or_else(|e| e.into_inner())
    }
}
