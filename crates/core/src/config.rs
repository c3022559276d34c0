use serde::{Deserialize, Serialize};
use std::path::Path;

/// 全局应用配置（任一段缺省时取内置默认值）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: String,
    pub data_source: DataSourceKind,
    pub gateway: GatewayConfig,
    pub schedule: ScheduleConfig,
    pub strategy: StrategyParams,
    pub notify: NotifyConfig,
}

/// # Summary
/// 数据源选择。由启动配置一次性决定，运行期间不允许
/// 在业务逻辑内部静默降级切换。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    /// 真实终端网关
    Live,
    /// 合成数据源（演练 / 测试）
    Synthetic,
}

/// 终端网关连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    // 本地网关地址
    pub base_url: String,
    // RPC 首试超时（秒）
    pub timeout_secs: u64,
    // 超时重试限时（秒）
    pub retry_timeout_secs: u64,
    // 断连后重连的最小间隔（秒）
    pub reconnect_interval_secs: u64,
}

/// 定时任务时刻表（Asia/Shanghai 本地时间，HH:MM）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    // 盘后选股
    pub select_at: String,
    // 夜间挂单
    pub plan_at: String,
    // 晨间校验
    pub reconcile_at: String,
    // 健康检查间隔（分钟）
    pub health_check_minutes: u64,
}

/// # Summary
/// 策略参数。历次迭代中容差、回撤边界等常量多次变动，
/// 因此全部落到配置而非硬编码，使歧义显式可测。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    // 股票池板块名称
    pub sector: String,
    // 是否剔除 ST 风险警示标的
    pub exclude_st: bool,
    // 是否剔除创业板 / 科创板
    pub exclude_gem_board: bool,
    // 是否剔除北交所
    pub exclude_bj_board: bool,
    // 收盘日线涨停判定容差
    pub limit_tolerance_close: f64,
    // 盘中快照涨停判定容差（价格仍在变动，放宽）
    pub limit_tolerance_intraday: f64,
    // 回撤计算窗口（交易日）
    pub drawdown_window: usize,
    // 最大回撤上限，达到或超过即剔除
    pub drawdown_limit: f64,
    // 止盈比例
    pub stop_profit: f64,
    // 止损比例（负数）
    pub stop_loss: f64,
    // 资金安全垫比例
    pub safety_margin: f64,
    // 预估交易费率
    pub transaction_cost_rate: f64,
    // 是否启用封单流动性过滤
    pub seal_filter: bool,
    // 封单金额 / 流通市值 下限
    pub seal_circ_ratio: f64,
    // 封单金额 / 当日成交额 下限
    pub seal_turnover_ratio: f64,
    // 候选价格下限（None 则不过滤）
    pub min_price: Option<f64>,
    // 候选价格上限（None 则不过滤）
    pub max_price: Option<f64>,
}

/// 通知配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    // 是否启用通知
    pub enable: bool,
    // 企业微信群机器人 Webhook 地址
    pub webhook_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            data_source: DataSourceKind::Live,
            gateway: GatewayConfig::default(),
            schedule: ScheduleConfig::default(),
            strategy: StrategyParams::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:58610".to_string(),
            timeout_secs: 3,
            retry_timeout_secs: 10,
            reconnect_interval_secs: 30,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            select_at: "15:38".to_string(),
            plan_at: "21:00".to_string(),
            reconcile_at: "09:25".to_string(),
            health_check_minutes: 10,
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enable: false,
            webhook_url: String::new(),
        }
    }
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            sector: "沪深A股".to_string(),
            exclude_st: true,
            exclude_gem_board: true,
            exclude_bj_board: true,
            limit_tolerance_close: 0.015,
            limit_tolerance_intraday: 0.02,
            drawdown_window: 60,
            drawdown_limit: 0.20,
            stop_profit: 0.10,
            stop_loss: -0.02,
            safety_margin: 0.05,
            transaction_cost_rate: 0.003,
            seal_filter: false,
            seal_circ_ratio: 0.03,
            seal_turnover_ratio: 2.0,
            min_price: None,
            max_price: None,
        }
    }
}

/// # Summary
/// 解析交易账号 ID，按优先级逐层回退：
/// `config/trade_config.json` -> `account_id.txt` -> 环境变量 `SHOUBAN_ACCOUNT_ID`。
///
/// # Logic
/// 1. JSON 配置取 `account_id` 或 `account` 字段。
/// 2. 文本文件取去除空白后的整行内容。
/// 3. 环境变量兜底；全部缺失返回 None。
///
/// # Invariants
/// - 账号缺失只禁用交易类任务，选股任务仍可运行；
///   该降级由调用方决定，本函数只负责解析。
pub fn resolve_account_id(base_dir: &Path) -> Option<String> {
    let json_path = base_dir.join("config").join("trade_config.json");
    if let Ok(raw) = std::fs::read_to_string(&json_path)
        && let Ok(value) = serde_json::from_str::<serde_json::Value>(&raw)
    {
        let account = value
            .get("account_id")
            .or_else(|| value.get("account"))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(id) = account {
            tracing::info!("account id loaded from {}", json_path.display());
            return Some(id.to_string());
        }
    }

    let txt_path = base_dir.join("account_id.txt");
    if let Ok(raw) = std::fs::read_to_string(&txt_path) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            tracing::info!("account id loaded from {}", txt_path.display());
            return Some(trimmed.to_string());
        }
    }

    match std::env::var("SHOUBAN_ACCOUNT_ID") {
        Ok(v) if !v.trim().is_empty() => {
            tracing::info!("account id loaded from environment");
            Some(v.trim().to_string())
        }
        _ => None,
    }
}
