use shouban_core::common::Board;
use shouban_core::config::StrategyParams;
use shouban_core::market::entity::{BarState, DayBar, TickSnapshot};

/// 收盘价与最高价的封板判定容差（元）
const SEAL_EPSILON: f64 = 0.01;

/// # Summary
/// 判断一根日线是否为涨停收盘。
///
/// # Logic
/// 1. `pre_close <= 0` 直接判否（数据缺陷按保守处理）。
/// 2. 已收盘的完整日线要求收盘价封在当日最高（|close - high| <= 0.01，
///    即"未炸板"）；盘中快照价格仍在变动，跳过该检查。
/// 3. 涨幅 `(close - pre_close) / pre_close` 达到
///    `板块涨停幅度 - 容差` 即判定涨停。收盘容差较窄，
///    盘中容差放宽以兼容尚未打到理论涨停价（交易所取整）的情形。
///
/// # Invariants
/// - 纯函数：给定 K 线与板块即可判定，无任何 I/O。
///
/// # Arguments
/// * `board`: 标的板块（决定涨停幅度）。
/// * `bar`: 待判定的日线。
/// * `state`: 日线是否已收盘完整。
/// * `params`: 容差等策略参数。
pub fn is_limit_up(board: Board, bar: &DayBar, state: BarState, params: &StrategyParams) -> bool {
    if bar.pre_close <= 0.0 {
        return false;
    }

    if state == BarState::Completed && (bar.close - bar.high).abs() > SEAL_EPSILON {
        return false;
    }

    let tolerance = match state {
        BarState::Completed => params.limit_tolerance_close,
        BarState::Intraday => params.limit_tolerance_intraday,
    };

    let pct = (bar.close - bar.pre_close) / bar.pre_close;
    pct >= board.limit_ratio() - tolerance
}

/// # Summary
/// 计算次日涨停价：昨收 × (1 + 板块涨停幅度)，四舍五入到分。
///
/// 注意这里用完整幅度而非判定用的容差折减值——
/// 挂单价必须打满交易所允许的上限。
pub fn limit_up_price(last_close: f64, board: Board) -> f64 {
    if last_close <= 0.0 {
        return 0.0;
    }
    round2(last_close * (1.0 + board.limit_ratio()))
}

/// # Summary
/// 盘中即时涨停判定：用于止盈时决定"封板继续持有"。
///
/// # Logic
/// 1. 最新价必须仍封在当日最高（未炸板）。
/// 2. 相对昨收的涨幅按盘中容差判定，与 [`is_limit_up`] 同一套板块口径。
pub fn is_limit_up_now(board: Board, tick: &TickSnapshot, params: &StrategyParams) -> bool {
    if tick.pre_close <= 0.0 {
        return false;
    }
    if (tick.last_price - tick.high).abs() > SEAL_EPSILON {
        return false;
    }
    let pct = (tick.last_price - tick.pre_close) / tick.pre_close;
    pct >= board.limit_ratio() - params.limit_tolerance_intraday
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(close: f64, pre_close: f64, high: f64) -> DayBar {
        DayBar {
            open: pre_close,
            high,
            low: pre_close,
            close,
            pre_close,
            amount: 1.0e8,
        }
    }

    fn params() -> StrategyParams {
        StrategyParams::default()
    }

    #[test]
    fn test_invalid_pre_close_fails_closed() {
        let p = params();
        for pre in [0.0, -1.0] {
            let b = bar(11.0, pre, 11.0);
            assert!(!is_limit_up(Board::Main, &b, BarState::Completed, &p));
            assert!(!is_limit_up(Board::Main, &b, BarState::Intraday, &p));
        }
    }

    #[test]
    fn test_exact_limit_boundary_all_boards() {
        let p = params();
        for board in [Board::Main, Board::Growth, Board::Beijing, Board::St] {
            let close = 10.0 * (1.0 + board.limit_ratio());
            let b = bar(close, 10.0, close);
            assert!(
                is_limit_up(board, &b, BarState::Completed, &p),
                "board {:?} should accept exact limit close",
                board
            );
        }
    }

    #[test]
    fn test_broken_seal_rejected_on_completed_bar() {
        let p = params();
        // 涨幅够但尾盘炸板：close 低于当日最高
        let b = bar(11.0, 10.0, 11.08);
        assert!(!is_limit_up(Board::Main, &b, BarState::Completed, &p));
        // 盘中快照跳过封板检查
        assert!(is_limit_up(Board::Main, &b, BarState::Intraday, &p));
    }

    #[test]
    fn test_tolerance_window() {
        let p = params();
        // 主板 10%，收盘容差 1.5%：8.6% 涨幅应通过，8.4% 不通过
        let pass = bar(10.86, 10.0, 10.86);
        let fail = bar(10.84, 10.0, 10.84);
        assert!(is_limit_up(Board::Main, &pass, BarState::Completed, &p));
        assert!(!is_limit_up(Board::Main, &fail, BarState::Completed, &p));
    }

    #[test]
    fn test_chinext_scenario() {
        // 300001.SZ: close=12.0, preClose=10.0, high=12.0 -> 20% 创业板涨停
        let p = params();
        let b = bar(12.0, 10.0, 12.0);
        assert!(is_limit_up(Board::Growth, &b, BarState::Completed, &p));
        assert!(is_limit_up(Board::Growth, &b, BarState::Intraday, &p));
    }

    #[test]
    fn test_limit_up_price_rounding() {
        assert_eq!(limit_up_price(10.0, Board::Main), 11.0);
        assert_eq!(limit_up_price(12.34, Board::Main), 13.57);
        assert_eq!(limit_up_price(10.0, Board::Growth), 12.0);
        assert_eq!(limit_up_price(10.0, Board::Beijing), 13.0);
        assert_eq!(limit_up_price(10.0, Board::St), 10.5);
        assert_eq!(limit_up_price(0.0, Board::Main), 0.0);
    }

    #[test]
    fn test_is_limit_up_now() {
        let p = params();
        let sealed = TickSnapshot {
            last_price: 11.0,
            high: 11.0,
            pre_close: 10.0,
            bid1_price: 11.0,
            bid1_volume: 50_000.0,
            turnover: 2.0e8,
            float_market_cap: None,
        };
        assert!(is_limit_up_now(Board::Main, &sealed, &p));

        // 已回落离开最高价 -> 炸板
        let broken = TickSnapshot {
            last_price: 10.8,
            ..sealed.clone()
        };
        assert!(!is_limit_up_now(Board::Main, &broken, &p));
    }
}
