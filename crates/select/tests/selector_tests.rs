use chrono::{TimeZone, Utc};
use shouban_core::config::StrategyParams;
use shouban_core::market::entity::{DayBar, TickSnapshot};
use shouban_core::store::port::CandidateStore;
use shouban_core::test_utils::{MemoryCandidateStore, StaticMarketData};
use shouban_select::selector::{CandidateSelector, SelectError};
use std::sync::Arc;
use tokio::sync::watch;

fn bar(close: f64, pre_close: f64, high: f64, low: f64) -> DayBar {
    DayBar {
        open: pre_close,
        high,
        low,
        close,
        pre_close,
        amount: 2.0e8,
    }
}

/// 62 根温和上行的历史日线，中段带一次约 10% 的回撤
fn trailing_history() -> Vec<DayBar> {
    let mut bars = Vec::new();
    let mut price = 8.0;
    for i in 0..62 {
        if i == 30 {
            // 回撤段：从峰值回落 10%
            bars.push(bar(price * 0.93, price, price, price * 0.90));
        } else {
            let next = price * 1.003;
            bars.push(bar(next, price, next * 1.001, price * 0.998));
            price = next;
        }
    }
    bars
}

/// 首板标的完整 63 根：62 根历史 + T 日 20% 涨停
fn first_board_bars() -> Vec<DayBar> {
    let mut bars = trailing_history();
    // T-1 未涨停（上一根收盘接近前收）
    // T 日：close=12.0, preClose=10.0, high=12.0 -> 创业板 20% 涨停
    bars.push(bar(12.0, 10.0, 12.0, 10.2));
    bars
}

fn clock() -> Arc<shouban_core::common::time::FixedClock> {
    Arc::new(shouban_core::common::time::FixedClock::new(
        Utc.with_ymd_and_hms(2026, 8, 7, 7, 38, 0).single().unwrap(),
    ))
}

fn no_cancel() -> watch::Receiver<bool> {
    // 发送端析构后 borrow() 仍返回最后的值 false
    let (_tx, rx) = watch::channel(false);
    rx
}

#[tokio::test]
async fn test_first_board_scenario_selects_chinext_candidate() {
    // 600000.SH 平盘，300001.SZ 首板涨停且 60 日回撤约 10% < 20%
    let market = StaticMarketData::new()
        .with_universe(&["600000.SH", "300001.SZ"])
        .with_name("600000.SH", "浦发银行")
        .with_name("300001.SZ", "特锐德")
        .with_bars("300001.SZ", first_board_bars())
        .with_bars(
            "600000.SH",
            vec![
                bar(10.0, 10.0, 10.1, 9.9),
                bar(10.05, 10.0, 10.1, 9.95),
                bar(10.0, 10.05, 10.1, 9.9),
            ],
        );

    let store = Arc::new(MemoryCandidateStore::new());
    let params = StrategyParams {
        // 场景覆盖创业板标的，放开板块剔除
        exclude_gem_board: false,
        ..StrategyParams::default()
    };
    let selector = CandidateSelector::new(Arc::new(market), store.clone(), clock(), params);

    let report = selector.run(&no_cancel()).await.expect("selection runs");
    assert_eq!(report.scanned, 2);
    assert_eq!(report.first_board, 1);
    assert_eq!(report.selected, 1);

    let list = store.load_latest().await.unwrap().expect("snapshot saved");
    assert_eq!(list.candidates, vec!["300001.SZ"]);
    assert_eq!(
        list.date,
        chrono::NaiveDate::from_ymd_opt(2026, 8, 7).unwrap()
    );
}

#[tokio::test]
async fn test_second_board_is_not_a_candidate() {
    // T-1 也涨停 -> 二板，剔除
    let mut bars = trailing_history();
    let n = bars.len();
    bars[n - 1] = bar(10.0, 9.09, 10.0, 9.1); // T-1 主板涨停
    bars.push(bar(11.0, 10.0, 11.0, 10.1)); // T 日再涨停

    let market = StaticMarketData::new()
        .with_universe(&["600001.SH"])
        .with_name("600001.SH", "邯郸钢铁")
        .with_bars("600001.SH", bars);

    let store = Arc::new(MemoryCandidateStore::new());
    let selector = CandidateSelector::new(
        Arc::new(market),
        store.clone(),
        clock(),
        StrategyParams::default(),
    );

    let report = selector.run(&no_cancel()).await.expect("selection runs");
    assert_eq!(report.first_board, 0);
    assert_eq!(report.selected, 0);
}

#[tokio::test]
async fn test_st_and_suspended_excluded() {
    let mut bars = trailing_history();
    bars.push(bar(11.0, 10.0, 11.0, 10.1)); // 主板涨停

    let market = StaticMarketData::new()
        .with_universe(&["600002.SH", "600003.SH"])
        .with_name("600002.SH", "*ST海润")
        .with_name("600003.SH", "东北高速")
        .with_suspended("600003.SH")
        .with_bars("600002.SH", bars.clone())
        .with_bars("600003.SH", bars);

    let store = Arc::new(MemoryCandidateStore::new());
    let selector = CandidateSelector::new(
        Arc::new(market),
        store.clone(),
        clock(),
        StrategyParams::default(),
    );

    let report = selector.run(&no_cancel()).await.expect("selection runs");
    assert_eq!(report.scanned, 0);
    assert_eq!(report.selected, 0);
}

#[tokio::test]
async fn test_excessive_drawdown_rejected() {
    // 历史中段出现 30% 深回撤，超过 20% 上限
    let mut bars = Vec::new();
    let mut price = 10.0;
    for i in 0..62 {
        if i == 40 {
            bars.push(bar(price * 0.75, price, price, price * 0.70));
        } else {
            let next = price * 1.002;
            bars.push(bar(next, price, next, price * 0.999));
            price = next;
        }
    }
    bars.push(bar(11.0, 10.0, 11.0, 10.1));

    let market = StaticMarketData::new()
        .with_universe(&["600004.SH"])
        .with_name("600004.SH", "白云机场")
        .with_bars("600004.SH", bars);

    let store = Arc::new(MemoryCandidateStore::new());
    let selector = CandidateSelector::new(
        Arc::new(market),
        store.clone(),
        clock(),
        StrategyParams::default(),
    );

    let report = selector.run(&no_cancel()).await.expect("selection runs");
    assert_eq!(report.first_board, 1);
    assert_eq!(report.rejected_drawdown, 1);
    assert_eq!(report.selected, 0);
}

#[tokio::test]
async fn test_seal_filter_fails_open_without_tick() {
    let market = StaticMarketData::new()
        .with_universe(&["600005.SH"])
        .with_name("600005.SH", "武钢股份")
        .with_bars("600005.SH", {
            let mut b = trailing_history();
            b.push(bar(11.0, 10.0, 11.0, 10.1));
            b
        });
    // 不配置 tick：封单检查应保留候选

    let store = Arc::new(MemoryCandidateStore::new());
    let params = StrategyParams {
        seal_filter: true,
        ..StrategyParams::default()
    };
    let selector = CandidateSelector::new(Arc::new(market), store.clone(), clock(), params);

    let report = selector.run(&no_cancel()).await.expect("selection runs");
    assert_eq!(report.selected, 1);
    assert_eq!(report.rejected_seal, 0);
}

#[tokio::test]
async fn test_seal_filter_rejects_weak_seal() {
    let market = StaticMarketData::new()
        .with_universe(&["600006.SH"])
        .with_name("600006.SH", "东风汽车")
        .with_bars("600006.SH", {
            let mut b = trailing_history();
            b.push(bar(11.0, 10.0, 11.0, 10.1));
            b
        })
        .with_tick(
            "600006.SH",
            TickSnapshot {
                last_price: 11.0,
                high: 11.0,
                pre_close: 10.0,
                bid1_price: 11.0,
                // 封单 11.0 * 100手 * 100股 = 12.1 万，远小于成交额 2 倍
                bid1_volume: 100.0,
                turnover: 3.0e8,
                float_market_cap: Some(5.0e9),
            },
        );

    let store = Arc::new(MemoryCandidateStore::new());
    let params = StrategyParams {
        seal_filter: true,
        ..StrategyParams::default()
    };
    let selector = CandidateSelector::new(Arc::new(market), store.clone(), clock(), params);

    let report = selector.run(&no_cancel()).await.expect("selection runs");
    assert_eq!(report.rejected_seal, 1);
    assert_eq!(report.selected, 0);
}

#[tokio::test]
async fn test_cancellation_between_instruments() {
    let market = StaticMarketData::new()
        .with_universe(&["600007.SH"])
        .with_name("600007.SH", "中国国贸");
    let store = Arc::new(MemoryCandidateStore::new());
    let selector = CandidateSelector::new(
        Arc::new(market),
        store,
        clock(),
        StrategyParams::default(),
    );

    let (tx, rx) = watch::channel(true);
    let result = selector.run(&rx).await;
    drop(tx);
    assert!(matches!(result, Err(SelectError::Cancelled)));
}
