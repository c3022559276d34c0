use crate::drawdown::passes_drawdown;
use crate::limit::is_limit_up;
use chrono_tz::Asia::Shanghai;
use shouban_core::common::time::Clock;
use shouban_core::common::{Board, LOT_SIZE, is_st_name};
use shouban_core::config::StrategyParams;
use shouban_core::market::entity::BarState;
use shouban_core::market::error::MarketError;
use shouban_core::market::port::MarketDataPort;
use shouban_core::store::error::StoreError;
use shouban_core::store::port::CandidateStore;
use shouban_core::strategy::entity::{CandidateList, SelectionReport};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// 首板判定需要的最短日线窗口：T、T-1、T-2
const FIRST_BOARD_WINDOW: usize = 3;

/// # Summary
/// 选股任务的统一错误类型。
#[derive(Error, Debug)]
pub enum SelectError {
    #[error("Market error: {0}")]
    Market(#[from] MarketError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("selection cancelled")]
    Cancelled,
}

/// # Summary
/// 候选选股器：全市场扫描 -> 首板识别 -> 风险过滤 -> 持久化快照。
///
/// # Invariants
/// - 单标的数据故障只跳过该标的，永不中止整批扫描。
/// - 每轮产出一份按日原子快照，消费方只读。
pub struct CandidateSelector {
    market: Arc<dyn MarketDataPort>,
    store: Arc<dyn CandidateStore>,
    clock: Arc<dyn Clock>,
    params: StrategyParams,
}

impl CandidateSelector {
    pub fn new(
        market: Arc<dyn MarketDataPort>,
        store: Arc<dyn CandidateStore>,
        clock: Arc<dyn Clock>,
        params: StrategyParams,
    ) -> Self {
        Self {
            market,
            store,
            clock,
            params,
        }
    }

    /// # Summary
    /// 执行一轮完整选股并持久化结果。
    ///
    /// # Logic
    /// 1. 基础过滤：剔除创业板/科创板/北交所前缀、ST 简称、停牌标的。
    /// 2. 每标的拉取 3 日日线，判定首板（T 涨停且 T-1 未涨停）。
    /// 3. 可选价格区间过滤。
    /// 4. 拉取 63 日日线做回撤检查（不足 60 日回溯即剔除）。
    /// 5. 可选封单流动性过滤（行情缺失时保留候选，见方法内注释）。
    /// 6. 生成 CandidateList 并整文件原子落盘。
    ///
    /// # Arguments
    /// * `cancel`: 取消信号；在每个标的之间设检查点，
    ///   单标的处理内部不被打断。
    pub async fn run(
        &self,
        cancel: &watch::Receiver<bool>,
    ) -> Result<SelectionReport, SelectError> {
        let started = std::time::Instant::now();
        info!("selection started");

        let basic_pool = self.basic_filter(cancel).await?;
        let mut report = SelectionReport {
            scanned: basic_pool.len(),
            ..SelectionReport::default()
        };
        if basic_pool.is_empty() {
            warn!("empty pool after basic filter, nothing to scan");
            self.persist(Vec::new()).await?;
            return Ok(report);
        }

        // 首板初筛
        let first_board = self.scan_first_board(&basic_pool, cancel).await?;
        report.first_board = first_board.len();
        info!("first-board candidates: {}", report.first_board);

        if first_board.is_empty() {
            info!("no first-board candidates today");
            self.persist(Vec::new()).await?;
            return Ok(report);
        }

        // 回撤 + 封单过滤
        let mut final_list = Vec::new();
        for code in first_board {
            self.checkpoint(cancel)?;

            if !self.check_drawdown(&code).await {
                report.rejected_drawdown += 1;
                continue;
            }
            if self.params.seal_filter && !self.check_seal(&code).await {
                report.rejected_seal += 1;
                continue;
            }
            debug!("{} selected", code);
            final_list.push(code);
        }
        report.selected = final_list.len();

        self.persist(final_list).await?;
        info!(
            "selection finished in {:.2}s: scanned {}, first-board {}, drawdown-rejected {}, seal-rejected {}, selected {}",
            started.elapsed().as_secs_f64(),
            report.scanned,
            report.first_board,
            report.rejected_drawdown,
            report.rejected_seal,
            report.selected
        );
        Ok(report)
    }

    /// 基础过滤：板块前缀、ST 简称、停牌
    async fn basic_filter(
        &self,
        cancel: &watch::Receiver<bool>,
    ) -> Result<Vec<String>, SelectError> {
        let universe = self.market.universe(&self.params.sector).await?;
        info!("universe size: {}", universe.len());

        let by_board: Vec<String> = universe
            .into_iter()
            .filter(|code| match Board::infer(code) {
                Board::Growth => !self.params.exclude_gem_board,
                Board::Beijing => !self.params.exclude_bj_board,
                _ => true,
            })
            .collect();

        self.checkpoint(cancel)?;
        let names = self.market.instrument_names(&by_board).await?;
        let suspended = self.market.suspended(&by_board).await?;

        let filtered: Vec<String> = by_board
            .into_iter()
            .filter(|code| {
                if self.params.exclude_st && names.get(code).is_some_and(|n| is_st_name(n)) {
                    return false;
                }
                if suspended.contains(code) {
                    debug!("{} suspended, excluded", code);
                    return false;
                }
                true
            })
            .collect();

        info!("basic filter kept {} instruments", filtered.len());
        Ok(filtered)
    }

    /// 首板初筛：T 日涨停且 T-1 日未涨停
    async fn scan_first_board(
        &self,
        pool: &[String],
        cancel: &watch::Receiver<bool>,
    ) -> Result<Vec<String>, SelectError> {
        let mut out = Vec::new();
        for code in pool {
            self.checkpoint(cancel)?;

            let bars = match self.market.daily_bars(code, FIRST_BOARD_WINDOW).await {
                Ok(bars) => bars,
                Err(e) => {
                    debug!("{} bars unavailable, skipped: {}", code, e);
                    continue;
                }
            };
            if bars.len() < FIRST_BOARD_WINDOW {
                continue;
            }

            let board = Board::infer(code);
            let bar_t = &bars[bars.len() - 1];
            let bar_prev = &bars[bars.len() - 2];

            if !is_limit_up(board, bar_t, BarState::Completed, &self.params) {
                continue;
            }
            // 已是二板或更高的连板，不是本策略标的
            if is_limit_up(board, bar_prev, BarState::Completed, &self.params) {
                continue;
            }
            if !self.in_price_band(bar_t.close) {
                debug!("{} price {} outside configured band", code, bar_t.close);
                continue;
            }
            out.push(code.clone());
        }
        Ok(out)
    }

    fn in_price_band(&self, price: f64) -> bool {
        if let Some(min) = self.params.min_price
            && price < min
        {
            return false;
        }
        if let Some(max) = self.params.max_price
            && price > max
        {
            return false;
        }
        true
    }

    /// 回撤检查：数据不足或拉取失败按不通过处理（保守）
    async fn check_drawdown(&self, code: &str) -> bool {
        // 多取 3 根冗余，确保剔除涨停日后仍有完整窗口
        let fetch = self.params.drawdown_window + FIRST_BOARD_WINDOW;
        let history = match self.market.daily_bars(code, fetch).await {
            Ok(history) => history,
            Err(e) => {
                warn!("{} drawdown history unavailable, rejected: {}", code, e);
                return false;
            }
        };
        let pass = passes_drawdown(
            &history,
            self.params.drawdown_window,
            self.params.drawdown_limit,
        );
        if !pass {
            info!(
                "{} rejected by drawdown check (window {}, limit {:.1}%)",
                code,
                self.params.drawdown_window,
                self.params.drawdown_limit * 100.0
            );
        }
        pass
    }

    /// # Summary
    /// 封单流动性检查：封单金额须同时覆盖流通市值占比与成交额倍数。
    ///
    /// 行情切片拉不到或字段缺失时**保留**候选（fail-open）：
    /// 这是一个明确的非对称选择——宁可放进一个封单强度未知的候选，
    /// 也不因数据源缺口丢掉可交易标的。
    async fn check_seal(&self, code: &str) -> bool {
        let tick = match self.market.tick(code).await {
            Ok(tick) => tick,
            Err(e) => {
                warn!("{} tick unavailable, seal check skipped (kept): {}", code, e);
                return true;
            }
        };

        let seal_amount = tick.bid1_price * tick.bid1_volume * f64::from(LOT_SIZE);

        if let Some(cap) = tick.float_market_cap
            && cap > 0.0
            && seal_amount < self.params.seal_circ_ratio * cap
        {
            info!(
                "{} rejected by seal/float-cap check ({:.0} < {:.1}% of {:.0})",
                code,
                seal_amount,
                self.params.seal_circ_ratio * 100.0,
                cap
            );
            return false;
        }

        if tick.turnover > 0.0 && seal_amount < self.params.seal_turnover_ratio * tick.turnover {
            info!(
                "{} rejected by seal/turnover check ({:.0} < {}x of {:.0})",
                code, seal_amount, self.params.seal_turnover_ratio, tick.turnover
            );
            return false;
        }
        true
    }

    async fn persist(&self, candidates: Vec<String>) -> Result<(), StoreError> {
        let now = self.clock.now();
        let date = now.with_timezone(&Shanghai).date_naive();
        let list = CandidateList::new(date, candidates, now.timestamp());
        self.store.save(&list).await
    }

    fn checkpoint(&self, cancel: &watch::Receiver<bool>) -> Result<(), SelectError> {
        if *cancel.borrow() {
            warn!("selection cancelled between instruments");
            return Err(SelectError::Cancelled);
        }
        Ok(())
    }
}
