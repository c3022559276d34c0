pub mod retry;
pub mod time;

use chrono::{DateTime, Utc};
use chrono_tz::Asia::Shanghai;
use serde::{Deserialize, Serialize};

/// A 股单手股数，委托数量必须是其整数倍。
pub const LOT_SIZE: u32 = 100;

/// # Summary
/// 交易日历日字符串（YYYYMMDD），按交易所本地时区取日。
///
/// 台账去重、委托备注等所有"按日"语义统一走此口径，
/// 避免 UTC 日界与交易日错位（沪市清晨恰是 UTC 前一日深夜）。
pub fn trade_date(now: DateTime<Utc>) -> String {
    now.with_timezone(&Shanghai).format("%Y%m%d").to_string()
}

/// # Summary
/// 交易板块分类，决定该标的适用的每日涨跌幅限制。
///
/// # Invariants
/// - 板块由证券代码前缀推断，是实践上的近似而非权威数据；
///   ST 身份无法从代码前缀得出，只能由证券简称判定。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Board {
    // 沪深主板，涨幅限制 10%
    Main,
    // 创业板 (30) / 科创板 (68)，涨幅限制 20%
    Growth,
    // 北交所 (8 / 4 / 92)，涨幅限制 30%
    Beijing,
    // ST / *ST 风险警示标的，涨幅限制 5%
    St,
}

impl Board {
    /// # Summary
    /// 从证券代码前缀推断板块归属。
    ///
    /// # Logic
    /// 1. 截取代码中交易所后缀之前的数字部分。
    /// 2. 按前缀匹配：30/68 -> Growth；8/4/92 -> Beijing；其余 -> Main。
    ///
    /// # Arguments
    /// * `code`: 交易所限定代码，如 `600000.SH`。
    ///
    /// # Returns
    /// 推断出的板块。不会返回 `St`（需结合简称另行判定）。
    pub fn infer(code: &str) -> Board {
        let digits = code.split('.').next().unwrap_or(code);
        if digits.starts_with("30") || digits.starts_with("68") {
            Board::Growth
        } else if digits.starts_with("92") || digits.starts_with('8') || digits.starts_with('4') {
            Board::Beijing
        } else {
            Board::Main
        }
    }

    /// 该板块的理论涨停幅度（相对昨收的最大涨幅）。
    pub fn limit_ratio(&self) -> f64 {
        match self {
            Board::Main => 0.10,
            Board::Growth => 0.20,
            Board::Beijing => 0.30,
            Board::St => 0.05,
        }
    }
}

/// # Summary
/// 判断证券简称是否带有 ST 风险警示标记。
pub fn is_st_name(name: &str) -> bool {
    name.contains("ST")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_inference() {
        assert_eq!(Board::infer("600000.SH"), Board::Main);
        assert_eq!(Board::infer("000001.SZ"), Board::Main);
        assert_eq!(Board::infer("300001.SZ"), Board::Growth);
        assert_eq!(Board::infer("688001.SH"), Board::Growth);
        assert_eq!(Board::infer("830001.BJ"), Board::Beijing);
        assert_eq!(Board::infer("430001.BJ"), Board::Beijing);
        assert_eq!(Board::infer("920001.BJ"), Board::Beijing);
    }

    #[test]
    fn test_limit_ratio() {
        assert_eq!(Board::Main.limit_ratio(), 0.10);
        assert_eq!(Board::Growth.limit_ratio(), 0.20);
        assert_eq!(Board::Beijing.limit_ratio(), 0.30);
        assert_eq!(Board::St.limit_ratio(), 0.05);
    }

    #[test]
    fn test_st_name() {
        assert!(is_st_name("ST康美"));
        assert!(is_st_name("*ST长生"));
        assert!(!is_st_name("贵州茅台"));
    }
}
