//! # `shouban-select` - 选股决策域
//!
//! 实现"首板"识别与候选清单生成：
//! - [`limit`]：涨停判定（收盘 / 盘中两套容差）与次日涨停价计算
//! - [`drawdown`]：因果滚动峰值口径的最大回撤过滤
//! - [`selector`]：全市场筛选流水线，产出并持久化当日候选快照
//!
//! 全部判定逻辑只消费 `shouban-core` 的规范化实体，
//! 数据源与存储通过端口注入。

pub mod drawdown;
pub mod limit;
pub mod selector;
