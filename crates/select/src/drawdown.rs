use shouban_core::market::entity::DayBar;

/// # Summary
/// 因果口径的最大回撤：对每个交易日，回撤 = (此前见过的最高价峰值 - 当日最低) / 峰值。
///
/// # Logic
/// 1. 峰值从第一根的 high 起步（第一根只作种子，不产生回撤）。
/// 2. 此后逐根：先以当日 low 对既有峰值计算回撤，再用当日 high 抬升峰值。
///
/// 不是"全局最高之后的全局最低"——价格只可能相对它此前
/// 见过的最高点回落，因而必须逐日因果计算；当日自身的振幅
/// 不构成对当日的回撤。
///
/// # Returns
/// 空窗口返回 None。
pub fn max_drawdown(bars: &[DayBar]) -> Option<f64> {
    let first = bars.first()?;
    let mut rolling_max = first.high;
    let mut worst = 0.0_f64;

    for bar in &bars[1..] {
        if rolling_max > 0.0 {
            let dd = (rolling_max - bar.low) / rolling_max;
            if dd > worst {
                worst = dd;
            }
        }
        if bar.high > rolling_max {
            rolling_max = bar.high;
        }
    }
    Some(worst)
}

/// # Summary
/// 回撤过滤：涨停前 `window` 日最大回撤必须严格小于上限。
///
/// # Logic
/// 1. 剔除最近一根（涨停日本身），其余为回溯窗口。
/// 2. 窗口不足 `window` 根 -> 直接拒绝（风险未知按不合格处理，
///    次新股自然被这一条剔除）。
/// 3. 最大回撤 >= 上限 -> 拒绝；严格小于才通过。
///
/// # Arguments
/// * `history`: 按时间升序的日线，最后一根是涨停日。
/// * `window`: 要求的最小回溯根数（不含涨停日）。
/// * `limit`: 回撤上限。
pub fn passes_drawdown(history: &[DayBar], window: usize, limit: f64) -> bool {
    if history.len() < window + 1 {
        return false;
    }
    let trailing = &history[..history.len() - 1];
    match max_drawdown(trailing) {
        Some(dd) => dd < limit,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(high: f64, low: f64) -> DayBar {
        DayBar {
            open: low,
            high,
            low,
            close: high,
            pre_close: low,
            amount: 1.0e8,
        }
    }

    /// 构造 n 根阶梯上行的日线（每根 low 高于前根 high）
    fn rising(n: usize) -> Vec<DayBar> {
        (0..n)
            .map(|i| {
                let base = 10.0 + i as f64 * 0.1;
                bar(base + 0.05, base)
            })
            .collect()
    }

    #[test]
    fn test_monotonic_rise_has_zero_drawdown() {
        let bars = rising(61);
        assert_eq!(max_drawdown(&bars[..60]), Some(0.0));
        // 任意正阈值下都应通过
        assert!(passes_drawdown(&bars, 60, 0.0001));
        assert!(passes_drawdown(&bars, 60, 0.20));
    }

    #[test]
    fn test_insufficient_history_rejects() {
        let bars = rising(59);
        assert!(!passes_drawdown(&bars, 60, 0.20));
        assert!(!passes_drawdown(&[], 60, 0.20));
    }

    #[test]
    fn test_causal_not_global() {
        // 先回落后创新高：全局最低点之后才出现全局最高点，
        // 因果口径只统计相对此前峰值的回落。
        let bars = vec![
            bar(10.0, 9.9),  // 峰值种子 10
            bar(9.8, 9.0),   // 相对峰值 10 回撤 10%
            bar(12.0, 11.0), // 新峰值 12，回撤为负不计
            bar(12.5, 11.8), // 相对 12 回撤不足 2%
        ];
        let dd = max_drawdown(&bars).unwrap();
        assert!((dd - 0.10).abs() < 1e-9);
    }

    #[test]
    fn test_boundary_is_strict() {
        // 峰值 20 之后低点 16，恰好 20%：等于上限应被拒绝
        let mut bars = rising(59);
        bars.push(bar(20.0, 19.5));
        bars.push(bar(19.0, 16.0));
        bars.push(bar(22.0, 20.5)); // 涨停日（被剔除，不参与计算）
        assert!(!passes_drawdown(&bars, 60, 0.20));
        assert!(passes_drawdown(&bars, 60, 0.2001));
    }

    #[test]
    fn test_limit_up_day_excluded() {
        // 涨停日当天的大振幅不应计入回撤
        let mut bars = rising(61);
        let last = bars.last_mut().unwrap();
        *last = bar(12.0, 6.0); // 深振幅，但它是 T 日
        assert!(passes_drawdown(&bars, 60, 0.05));
    }
}
