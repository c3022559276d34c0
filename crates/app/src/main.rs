//! # `shouban-app` - 策略守护进程入口
//!
//! 纯粹的 DI 容器与任务编排层：
//! 1. 初始化日志（控制台 + 按日滚动文件）。
//! 2. 加载分层配置（TOML 文件 -> 环境变量）与交易账号。
//! 3. 按 `data_source` 一次性选定行情 / 券商实现并注入各领域服务。
//! 4. 拉起定时任务（选股 / 夜间挂单 / 晨间校验 / 健康检查）、
//!    持仓监控与券商重连监督，等待退出信号后统一收编。

mod scheduler;

use rust_decimal_macros::dec;
use shouban_core::broker::port::BrokerPort;
use shouban_core::common::time::{Clock, SystemClock};
use shouban_core::config::{AppConfig, DataSourceKind, resolve_account_id};
use shouban_core::market::port::MarketDataPort;
use shouban_core::notify::port::Notifier;
use shouban_core::store::port::{CandidateStore, OrderLedger};
use shouban_feed::gateway::GatewayClient;
use shouban_feed::synthetic::{SyntheticBroker, SyntheticMarketData};
use shouban_notify::webhook::WebhookNotifier;
use shouban_select::selector::CandidateSelector;
use shouban_store::candidate::JsonCandidateStore;
use shouban_store::config::set_root_dir;
use shouban_store::ledger::JsonOrderLedger;
use shouban_trade::monitor::PositionMonitor;
use shouban_trade::planner::OvernightPlanner;
use shouban_trade::reconcile::MorningReconciler;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// 挂单台账保留天数
const LEDGER_RETENTION_DAYS: i64 = 7;
/// 候选清单超过该时长未更新视为过期
const CANDIDATE_STALE_SECS: i64 = 24 * 3600;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 日志：stdout + logs/ 下按日滚动文件
    let file_appender = tracing_appender::rolling::daily("logs", "shouban.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stdout.and(file_writer))
        .init();
    info!("Shouban strategy daemon starting...");

    // 2. 分层配置：config/shouban.toml（可缺省）-> SHOUBAN__* 环境变量
    let cfg: AppConfig = match config::Config::builder()
        .add_source(config::File::with_name("config/shouban").required(false))
        .add_source(config::Environment::with_prefix("SHOUBAN").separator("__"))
        .build()
        .and_then(|c| c.try_deserialize())
    {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("config unreadable ({}), falling back to defaults", e);
            AppConfig::default()
        }
    };

    // 3. 存储层
    set_root_dir(PathBuf::from(&cfg.data_dir));
    let candidate_store: Arc<dyn CandidateStore> = Arc::new(JsonCandidateStore::new());
    let ledger: Arc<dyn OrderLedger> = Arc::new(JsonOrderLedger::load().await?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let pruned = ledger.prune(clock.now(), LEDGER_RETENTION_DAYS).await?;
    info!(
        "order ledger ready: {} entries ({} expired pruned)",
        ledger.len().await,
        pruned
    );

    // 4. 交易账号：缺失只禁用交易任务，选股照常运行
    let account_id = resolve_account_id(Path::new("."));
    if account_id.is_none() {
        warn!("no trading account configured; trading disabled, running selection only");
    }

    // 5. 数据源与券商通道（启动时一次性选定，运行中不切换）
    let (market, broker): (Arc<dyn MarketDataPort>, Option<Arc<dyn BrokerPort>>) =
        match cfg.data_source {
            DataSourceKind::Live => {
                let gateway = Arc::new(GatewayClient::new(&cfg.gateway, account_id.clone())?);
                if account_id.is_some() {
                    if let Err(e) = gateway.connect().await {
                        warn!("initial broker connect failed, supervisor will retry: {}", e);
                    }
                    (gateway.clone(), Some(gateway))
                } else {
                    (gateway, None)
                }
            }
            DataSourceKind::Synthetic => {
                info!("synthetic data source selected (drill mode)");
                (
                    Arc::new(SyntheticMarketData::new()),
                    Some(Arc::new(SyntheticBroker::new(dec!(1_000_000)))),
                )
            }
        };

    // 6. 通知通道
    let notifier: Option<Arc<dyn Notifier>> =
        if cfg.notify.enable && !cfg.notify.webhook_url.is_empty() {
            Some(Arc::new(WebhookNotifier::new(cfg.notify.webhook_url.clone())))
        } else {
            None
        };

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    // 7. 盘后选股任务
    let select_at =
        scheduler::parse_hhmm(&cfg.schedule.select_at).ok_or("invalid schedule.select_at")?;
    {
        let selector = Arc::new(CandidateSelector::new(
            market.clone(),
            candidate_store.clone(),
            clock.clone(),
            cfg.strategy.clone(),
        ));
        let notifier = notifier.clone();
        let loop_rx = cancel_rx.clone();
        let job_rx = cancel_rx.clone();
        tasks.push(tokio::spawn(async move {
            scheduler::run_daily("selection", select_at, loop_rx, move || {
                let selector = selector.clone();
                let notifier = notifier.clone();
                let rx = job_rx.clone();
                async move {
                    match selector.run(&rx).await {
                        Ok(report) => {
                            if let Some(notifier) = notifier {
                                let body = format!(
                                    "扫描 {} 只，首板 {}，回撤剔除 {}，封单剔除 {}，入选 {}",
                                    report.scanned,
                                    report.first_board,
                                    report.rejected_drawdown,
                                    report.rejected_seal,
                                    report.selected
                                );
                                if let Err(e) = notifier.notify("选股完成", &body).await {
                                    warn!("selection notification failed: {}", e);
                                }
                            }
                        }
                        Err(e) => error!("selection task failed: {}", e),
                    }
                }
            })
            .await;
        }));
    }

    // 8. 交易类任务（需要券商通道）
    if let Some(broker) = broker.clone() {
        let plan_at =
            scheduler::parse_hhmm(&cfg.schedule.plan_at).ok_or("invalid schedule.plan_at")?;
        let reconcile_at = scheduler::parse_hhmm(&cfg.schedule.reconcile_at)
            .ok_or("invalid schedule.reconcile_at")?;

        // 夜间挂单
        {
            let planner = Arc::new(OvernightPlanner::new(
                broker.clone(),
                market.clone(),
                ledger.clone(),
                clock.clone(),
                cfg.strategy.clone(),
            ));
            let store = candidate_store.clone();
            let ledger = ledger.clone();
            let clock = clock.clone();
            let notifier = notifier.clone();
            let loop_rx = cancel_rx.clone();
            let job_rx = cancel_rx.clone();
            tasks.push(tokio::spawn(async move {
                scheduler::run_daily("overnight-planning", plan_at, loop_rx, move || {
                    let planner = planner.clone();
                    let store = store.clone();
                    let ledger = ledger.clone();
                    let clock = clock.clone();
                    let notifier = notifier.clone();
                    let rx = job_rx.clone();
                    async move {
                        let list = match store.load_latest().await {
                            Ok(Some(list)) => list,
                            Ok(None) => {
                                warn!("no candidate snapshot on disk, skipping overnight planning");
                                return;
                            }
                            Err(e) => {
                                error!("candidate snapshot unreadable: {}", e);
                                return;
                            }
                        };
                        match planner.plan_and_submit(&list, &rx).await {
                            Ok(stats) => {
                                info!(
                                    "overnight planning done: {} submitted, {} failed, {} skipped",
                                    stats.submitted, stats.failed, stats.skipped
                                );
                                if let Some(notifier) = notifier {
                                    let body = format!(
                                        "候选 {} 只：成功 {}，失败 {}，跳过 {}",
                                        list.count, stats.submitted, stats.failed, stats.skipped
                                    );
                                    if let Err(e) = notifier.notify("夜间挂单完成", &body).await {
                                        warn!("planning notification failed: {}", e);
                                    }
                                }
                            }
                            Err(e) => error!("overnight planning failed: {}", e),
                        }
                        if let Err(e) = ledger.prune(clock.now(), LEDGER_RETENTION_DAYS).await {
                            warn!("ledger prune after planning failed: {}", e);
                        }
                    }
                })
                .await;
            }));
        }

        // 晨间校验
        {
            let reconciler = Arc::new(MorningReconciler::new(
                broker.clone(),
                market.clone(),
                ledger.clone(),
                clock.clone(),
                cfg.strategy.clone(),
            ));
            let store = candidate_store.clone();
            let notifier = notifier.clone();
            let loop_rx = cancel_rx.clone();
            let job_rx = cancel_rx.clone();
            tasks.push(tokio::spawn(async move {
                scheduler::run_daily("morning-reconcile", reconcile_at, loop_rx, move || {
                    let reconciler = reconciler.clone();
                    let store = store.clone();
                    let notifier = notifier.clone();
                    let rx = job_rx.clone();
                    async move {
                        let list = match store.load_latest().await {
                            Ok(Some(list)) => list,
                            Ok(None) => {
                                warn!("no candidate snapshot on disk, skipping reconciliation");
                                return;
                            }
                            Err(e) => {
                                error!("candidate snapshot unreadable: {}", e);
                                return;
                            }
                        };
                        match reconciler.reconcile(&list, &rx).await {
                            Ok(outcome) => {
                                info!(
                                    "reconciliation done: {} filled, {} resubmitted, {} failed, {} skipped",
                                    outcome.filled, outcome.resubmitted, outcome.failed, outcome.skipped
                                );
                                if let Some(notifier) = notifier {
                                    let body = format!(
                                        "隔夜成交 {}，补单 {}，失败 {}，跳过 {}",
                                        outcome.filled,
                                        outcome.resubmitted,
                                        outcome.failed,
                                        outcome.skipped
                                    );
                                    if let Err(e) = notifier.notify("晨间校验完成", &body).await {
                                        warn!("reconcile notification failed: {}", e);
                                    }
                                }
                            }
                            Err(e) => error!("reconciliation failed: {}", e),
                        }
                    }
                })
                .await;
            }));
        }

        // 实时持仓监控
        {
            let monitor = PositionMonitor::new(
                broker.clone(),
                market.clone(),
                candidate_store.clone(),
                notifier.clone(),
                cfg.strategy.clone(),
            );
            let rx = cancel_rx.clone();
            tasks.push(tokio::spawn(async move {
                monitor.run(rx).await;
            }));
        }

        // 券商重连监督（真实网关才有断连语义）
        if cfg.data_source == DataSourceKind::Live {
            let rx = cancel_rx.clone();
            let spacing = Duration::from_secs(cfg.gateway.reconnect_interval_secs);
            let broker = broker.clone();
            tasks.push(tokio::spawn(async move {
                scheduler::supervise_connection(broker, spacing, rx).await;
            }));
        }
    }

    // 9. 健康检查：候选快照缺失或超期告警
    {
        let store = candidate_store.clone();
        let clock = clock.clone();
        let rx = cancel_rx.clone();
        let period = Duration::from_secs(cfg.schedule.health_check_minutes.max(1) * 60);
        tasks.push(tokio::spawn(async move {
            scheduler::run_every("health-check", period, rx, move || {
                let store = store.clone();
                let clock = clock.clone();
                async move {
                    match store.load_latest().await {
                        Ok(Some(list)) => {
                            let age = clock.now().timestamp() - list.timestamp;
                            if age > CANDIDATE_STALE_SECS {
                                warn!(
                                    "candidate snapshot stale: {}h since generation",
                                    age / 3600
                                );
                            }
                        }
                        Ok(None) => warn!("candidate snapshot missing"),
                        Err(e) => warn!("health check: candidate snapshot unreadable: {}", e),
                    }
                }
            })
            .await;
        }));
    }

    info!("all tasks scheduled, daemon running");

    // 10. 等待退出信号，统一收编任务
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, stopping tasks...");
    if cancel_tx.send(true).is_err() {
        warn!("all task receivers already gone");
    }
    for task in tasks {
        if let Err(e) = task.await {
            warn!("task join error: {}", e);
        }
    }
    info!("shutdown complete");
    Ok(())
}
