use rust_decimal::Decimal;
use shouban_core::broker::entity::Position;
use shouban_core::strategy::entity::CandidateList;

/// # Summary
/// 计算候选之外既有持仓占用的资金：Σ(数量 × 持仓均价)。
///
/// 候选清单内的持仓不计入——它们正是本轮要买入的标的，
/// 已成交部分在晨间校验中通过"未成交子集"另行处理。
pub fn non_candidate_value(positions: &[Position], candidates: &CandidateList) -> Decimal {
    positions
        .iter()
        .filter(|p| {
            !candidates.contains(&p.code) && p.volume > Decimal::ZERO && p.avg_cost > Decimal::ZERO
        })
        .map(|p| p.volume * p.avg_cost)
        .sum()
}

/// # Summary
/// 预留安全垫与预估手续费后的可用资金。
///
/// # Logic
/// `usable = (可用资金 - 非候选持仓占用) × (1 - 安全垫比例 - 手续费率)`
///
/// # Returns
/// 可能为负（持仓占用超过可用资金时），调用方据此中止本轮。
pub fn usable_cash(
    available_cash: Decimal,
    held_value: Decimal,
    safety_margin: f64,
    transaction_cost_rate: f64,
) -> Decimal {
    let margin = Decimal::try_from(safety_margin).unwrap_or(Decimal::ZERO);
    let cost = Decimal::try_from(transaction_cost_rate).unwrap_or(Decimal::ZERO);
    (available_cash - held_value) * (Decimal::ONE - margin - cost)
}

/// # Summary
/// 等权分配：可用资金均分给 n 个候选。n 为 0 时返回零。
pub fn per_stock_budget(usable: Decimal, n: usize) -> Decimal {
    match Decimal::from(u64::try_from(n).unwrap_or(0)) {
        d if d.is_zero() => Decimal::ZERO,
        d => usable / d,
    }
}

/// # Summary
/// 预算内按整手（100 股）向下取整的可买数量。
///
/// # Invariants
/// - 返回值恒为 100 的整数倍；预算或价格非正时为零。
pub fn lot_volume(budget: Decimal, price: Decimal) -> Decimal {
    if price <= Decimal::ZERO || budget <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let lot = Decimal::from(shouban_core::common::LOT_SIZE);
    (budget / price / lot).floor() * lot
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pos(code: &str, volume: Decimal, avg_cost: Decimal) -> Position {
        Position {
            code: code.to_string(),
            volume,
            usable_volume: volume,
            avg_cost,
        }
    }

    #[test]
    fn test_reserve_formula() {
        // 可用 100,000，非候选持仓 20,000，安全垫 5% + 手续费 0.3%
        // usable = 80,000 × 0.947 = 75,760
        let usable = usable_cash(dec!(100000), dec!(20000), 0.05, 0.003);
        assert_eq!(usable, dec!(75760.000));

        let per = per_stock_budget(usable, 2);
        assert_eq!(per, dec!(37880.0));
    }

    #[test]
    fn test_allocation_never_exceeds_usable() {
        let usable = usable_cash(dec!(100000), dec!(20000), 0.05, 0.003);
        let per = per_stock_budget(usable, 3);
        assert!(per * dec!(3) <= usable);
    }

    #[test]
    fn test_non_candidate_value_excludes_candidates() {
        let candidates = CandidateList::new(
            chrono::NaiveDate::from_ymd_opt(2026, 8, 7).expect("date"),
            vec!["300001.SZ".into()],
            0,
        );
        let positions = vec![
            pos("300001.SZ", dec!(1000), dec!(10)), // 候选，不计
            pos("600519.SH", dec!(100), dec!(200)), // 非候选，计 20,000
            pos("000001.SZ", dec!(0), dec!(10)),    // 零持仓，不计
        ];
        assert_eq!(non_candidate_value(&positions, &candidates), dec!(20000));
    }

    #[test]
    fn test_lot_volume_rounds_down_to_lot() {
        // 37,880 / 11.0 / 100 = 34.43 手 -> 3400 股
        assert_eq!(lot_volume(dec!(37880), dec!(11.0)), dec!(3400));
        // 预算不足一手 -> 0
        assert_eq!(lot_volume(dec!(500), dec!(11.0)), dec!(0));
        assert_eq!(lot_volume(dec!(37880), dec!(0)), dec!(0));
    }

    #[test]
    fn test_usable_can_go_negative() {
        let usable = usable_cash(dec!(10000), dec!(50000), 0.05, 0.003);
        assert!(usable < Decimal::ZERO);
    }
}
