use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use chrono_tz::Asia::Shanghai;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// # Summary
/// 解析 "HH:MM" 时刻字符串。格式非法返回 None。
pub fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}

/// # Summary
/// 距离下一个上海本地时刻 `at` 的等待时长。
///
/// # Logic
/// 1. 把当前 UTC 时间换算到上海时区。
/// 2. 当日该时刻已过则顺延到明天。
/// 3. 返回两时刻之差。夏令时在该时区不存在，换算无歧义。
pub fn until_next(now: DateTime<Utc>, at: NaiveTime) -> Duration {
    let local_now = now.with_timezone(&Shanghai);
    let mut target_date = local_now.date_naive();
    if local_now.time() >= at {
        target_date += ChronoDuration::days(1);
    }
    // Asia/Shanghai 无夏令时，本地时刻构造不会落入空隙
    let target = target_date
        .and_time(at)
        .and_local_timezone(Shanghai)
        .single()
        .unwrap_or(local_now);
    (target.with_timezone(&Utc) - now)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// # Summary
/// 每日定时任务循环：睡到下一个触发时刻，执行一轮，再睡。
///
/// # Invariants
/// - 单轮失败只记录日志，下一个触发时刻照常重试（任务级恢复）。
/// - 关停信号可在睡眠期间即时打断循环。
pub async fn run_daily<F, Fut>(
    name: &'static str,
    at: NaiveTime,
    mut cancel: watch::Receiver<bool>,
    mut job: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    info!("scheduled daily task '{}' at {} (Asia/Shanghai)", name, at);
    loop {
        let delay = until_next(Utc::now(), at);
        info!("'{}' next run in {}s", name, delay.as_secs());
        tokio::select! {
            _ = cancel.changed() => {
                if *cancel.borrow() {
                    info!("'{}' stopped", name);
                    return;
                }
            }
            _ = tokio::time::sleep(delay) => {
                info!("'{}' triggered", name);
                job().await;
            }
        }
    }
}

/// # Summary
/// 固定周期任务循环（健康检查等低频轮询）。
pub async fn run_every<F, Fut>(
    name: &'static str,
    period: Duration,
    mut cancel: watch::Receiver<bool>,
    mut job: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(period);
    // 第一拍立即返回，跳过以免启动即执行
    interval.tick().await;
    loop {
        tokio::select! {
            _ = cancel.changed() => {
                if *cancel.borrow() {
                    info!("'{}' stopped", name);
                    return;
                }
            }
            _ = interval.tick() => job().await,
        }
    }
}

/// # Summary
/// 券商连接监督循环：断连期间按最小间隔发起重连。
///
/// # Logic
/// 1. 每 10 秒检查连接状态。
/// 2. 离线且距上次尝试超过 `min_spacing` 时调用 connect。
/// 3. 重连成功与否都记录；失败等待下一轮（固定间隔退避）。
pub async fn supervise_connection(
    broker: std::sync::Arc<dyn shouban_core::broker::port::BrokerPort>,
    min_spacing: Duration,
    mut cancel: watch::Receiver<bool>,
) {
    let mut last_attempt: Option<tokio::time::Instant> = None;
    let mut interval = tokio::time::interval(Duration::from_secs(10));
    loop {
        tokio::select! {
            _ = cancel.changed() => {
                if *cancel.borrow() {
                    return;
                }
            }
            _ = interval.tick() => {
                if broker.is_connected().await {
                    continue;
                }
                let due = last_attempt
                    .map(|t| t.elapsed() >= min_spacing)
                    .unwrap_or(true);
                if !due {
                    continue;
                }
                last_attempt = Some(tokio::time::Instant::now());
                warn!("broker link down, attempting reconnect");
                match broker.connect().await {
                    Ok(()) => info!("broker reconnected"),
                    Err(e) => warn!("reconnect failed: {}", e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_hhmm() {
        assert_eq!(
            parse_hhmm("15:38"),
            Some(NaiveTime::from_hms_opt(15, 38, 0).unwrap())
        );
        assert!(parse_hhmm("25:00").is_none());
        assert!(parse_hhmm("abc").is_none());
    }

    #[test]
    fn test_until_next_same_day() {
        // 上海 14:00（UTC 06:00），目标 15:38 -> 98 分钟
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 6, 0, 0).single().unwrap();
        let at = NaiveTime::from_hms_opt(15, 38, 0).unwrap();
        assert_eq!(until_next(now, at), Duration::from_secs(98 * 60));
    }

    #[test]
    fn test_until_next_rolls_to_tomorrow() {
        // 上海 21:30（UTC 13:30），目标 21:00 -> 顺延到明晚
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 13, 30, 0).single().unwrap();
        let at = NaiveTime::from_hms_opt(21, 0, 0).unwrap();
        assert_eq!(until_next(now, at), Duration::from_secs(23 * 3600 + 30 * 60));
    }
}
