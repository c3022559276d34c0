use crate::TaskError;
use crate::alloc::lot_volume;
use rust_decimal::Decimal;
use shouban_core::broker::entity::OrderSide;
use shouban_core::broker::port::BrokerPort;
use shouban_core::common::Board;
use shouban_core::common::time::Clock;
use shouban_core::market::port::MarketDataPort;
use shouban_core::store::port::OrderLedger;
use shouban_select::limit::limit_up_price;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// 一轮批量挂单的统计结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitStats {
    // 成功提交并记入台账
    pub submitted: usize,
    // 数据缺失、数量为零或券商拒单
    pub failed: usize,
    // 台账命中（当日已挂过单）
    pub skipped: usize,
}

/// # Summary
/// 按次日涨停价为一组标的批量挂限价买单。
/// 夜间挂单与晨间补单共用同一条提交路径，差异只在预算与备注。
///
/// # Logic
/// 逐标的执行：台账闸门 -> 取昨收 -> 算涨停价 -> 整手数量 -> 提交 -> 记台账。
/// 任何单标的失败只累计计数，不中止整批。
///
/// # Invariants
/// - 台账只在拿到券商受理回执之后写入；提交失败的标的保持未标记，
///   晨间校验得以重试（历史上先标记后提交的变体会永久卡死重试，已定为禁止）。
/// - 取消检查点只设在标的之间；"提交 + 记账"二者之间不可被取消拆开。
pub(crate) async fn submit_limit_up_buys(
    broker: &Arc<dyn BrokerPort>,
    market: &Arc<dyn MarketDataPort>,
    ledger: &Arc<dyn OrderLedger>,
    clock: &Arc<dyn Clock>,
    codes: &[String],
    budget_per_stock: Decimal,
    date: &str,
    remark_prefix: &str,
    cancel: &watch::Receiver<bool>,
) -> Result<SubmitStats, TaskError> {
    let mut stats = SubmitStats::default();
    let remark = format!("{}-{}", remark_prefix, date);

    for code in codes {
        if *cancel.borrow() {
            warn!("order batch cancelled between instruments");
            return Err(TaskError::Cancelled);
        }

        if ledger.already_placed(code, date).await? {
            info!("{} skipped: already placed today", code);
            stats.skipped += 1;
            continue;
        }

        let last_close = match market.last_close(code).await {
            Ok(v) if v > 0.0 => v,
            Ok(_) => {
                warn!("{} skipped: invalid last close", code);
                stats.failed += 1;
                continue;
            }
            Err(e) => {
                warn!("{} skipped: last close unavailable: {}", code, e);
                stats.failed += 1;
                continue;
            }
        };

        let price = limit_up_price(last_close, Board::infer(code));
        let price = Decimal::try_from(price).unwrap_or(Decimal::ZERO);
        if price <= Decimal::ZERO {
            warn!("{} skipped: limit price computation failed", code);
            stats.failed += 1;
            continue;
        }

        let volume = lot_volume(budget_per_stock, price);
        if volume.is_zero() {
            warn!(
                "{} skipped: budget {:.2} buys zero lots at {}",
                code, budget_per_stock, price
            );
            stats.failed += 1;
            continue;
        }

        info!(
            "placing order: {} last_close {:.2} limit price {} volume {}",
            code, last_close, price, volume
        );
        match broker
            .submit_limit_order(code, OrderSide::Buy, price, volume, &remark)
            .await
        {
            Ok(ack) => {
                info!("{} order accepted, id {}", code, ack.order_id);
                // 委托已入券商委托簿；记账失败不能撤回事实，
                // 只能告警并依赖晨间以持仓为真相的对账兜底。
                if let Err(e) = ledger.mark_placed(code, clock.now()).await {
                    error!("{} accepted but ledger write failed: {}", code, e);
                }
                stats.submitted += 1;
            }
            Err(e) => {
                warn!("{} order submission failed: {}", code, e);
                stats.failed += 1;
            }
        }
    }

    Ok(stats)
}
