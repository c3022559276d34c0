use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use shouban_core::broker::entity::{AccountAsset, OrderAck, OrderSide, Position};
use shouban_core::broker::port::{BrokerPort, TradeError};
use shouban_core::common::retry::with_timeout_retry;
use shouban_core::config::GatewayConfig;
use shouban_core::market::entity::{DayBar, TickSnapshot};
use shouban_core::market::error::MarketError;
use shouban_core::market::port::{MarketDataPort, TickStream};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

/// 行情订阅的轮询周期
const TICK_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// # Summary
/// 量化终端本地 HTTP 网关适配器，同时承担行情与券商两个端口。
///
/// 终端不同版本的响应字段名不一致（如 `can_use_volume` /
/// `available_volume`），全部在本层的 DTO 上用 serde 别名一次性
/// 归一化为核心实体；核心逻辑永远不接触原始载荷。
///
/// # Invariants
/// - 每次 RPC 走"短超时首试 + 长超时重试一次"的标准包装。
/// - 网络失败会将连接状态置为离线，由重连监督循环负责恢复。
#[derive(Clone)]
pub struct GatewayClient {
    client: reqwest::Client,
    base_url: String,
    account_id: Option<String>,
    short: Duration,
    long: Duration,
    connected: Arc<AtomicBool>,
}

// --- 网关响应 DTO（兼容多版本字段名） ---

#[derive(Deserialize, Debug)]
struct BarDto {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(alias = "preClose")]
    pre_close: f64,
    #[serde(default)]
    amount: f64,
}

#[derive(Deserialize, Debug)]
struct TickDto {
    #[serde(alias = "lastPrice")]
    last_price: f64,
    high: f64,
    #[serde(alias = "preClose", alias = "lastClose")]
    pre_close: f64,
    #[serde(alias = "bidPrice1")]
    bid1_price: f64,
    #[serde(alias = "bidVol1")]
    bid1_volume: f64,
    #[serde(alias = "amount")]
    turnover: f64,
    #[serde(default, alias = "floatMarketCap", alias = "circulating_cap")]
    float_market_cap: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct NameDto {
    code: String,
    name: String,
}

#[derive(Deserialize, Debug)]
struct LastCloseDto {
    #[serde(alias = "lastClose")]
    last_close: f64,
}

#[derive(Deserialize, Debug)]
struct PositionDto {
    #[serde(alias = "stock_code")]
    code: String,
    volume: Decimal,
    #[serde(alias = "can_use_volume", alias = "available_volume")]
    usable_volume: Decimal,
    #[serde(alias = "avg_price", alias = "open_price")]
    avg_cost: Decimal,
}

#[derive(Deserialize, Debug)]
struct AssetDto {
    cash: Decimal,
    #[serde(default, alias = "frozen_cash")]
    frozen: Decimal,
    #[serde(alias = "total_asset")]
    total_asset: Decimal,
}

#[derive(Deserialize, Debug)]
struct OrderResultDto {
    order_id: i64,
}

impl From<BarDto> for DayBar {
    fn from(dto: BarDto) -> Self {
        DayBar {
            open: dto.open,
            high: dto.high,
            low: dto.low,
            close: dto.close,
            pre_close: dto.pre_close,
            amount: dto.amount,
        }
    }
}

impl From<TickDto> for TickSnapshot {
    fn from(dto: TickDto) -> Self {
        TickSnapshot {
            last_price: dto.last_price,
            high: dto.high,
            pre_close: dto.pre_close,
            bid1_price: dto.bid1_price,
            bid1_volume: dto.bid1_volume,
            turnover: dto.turnover,
            float_market_cap: dto.float_market_cap,
        }
    }
}

impl GatewayClient {
    /// # Summary
    /// 创建网关客户端。
    ///
    /// # Logic
    /// 1. 以重试限时为客户端总超时构造 reqwest Client。
    /// 2. 交易账号可缺省——缺省时行情功能可用，交易方法报错。
    ///
    /// # Arguments
    /// * `config`: 网关连接配置。
    /// * `account_id`: 交易账号，选股单独运行时可为 None。
    pub fn new(config: &GatewayConfig, account_id: Option<String>) -> Result<Self, MarketError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.retry_timeout_secs.max(1)))
            .build()
            .map_err(|e| MarketError::Unknown(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            account_id,
            short: Duration::from_secs(config.timeout_secs.max(1)),
            long: Duration::from_secs(config.retry_timeout_secs.max(1)),
            connected: Arc::new(AtomicBool::new(false)),
        })
    }

    fn account(&self) -> Result<&str, TradeError> {
        self.account_id
            .as_deref()
            .ok_or_else(|| TradeError::BrokerIntegrationError("trading account not configured".into()))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, MarketError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                self.connected.store(false, Ordering::SeqCst);
                MarketError::Network(e.to_string())
            })?;

        if !resp.status().is_success() {
            if resp.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(MarketError::NotFound);
            }
            return Err(MarketError::Network(format!("HTTP {}", resp.status())));
        }

        resp.json::<T>()
            .await
            .map_err(|e| MarketError::Parse(e.to_string()))
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, TradeError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.post(&url).json(body).send().await.map_err(|e| {
            self.connected.store(false, Ordering::SeqCst);
            TradeError::BrokerIntegrationError(e.to_string())
        })?;

        if !resp.status().is_success() {
            return Err(TradeError::BrokerIntegrationError(format!(
                "HTTP {}",
                resp.status()
            )));
        }

        resp.json::<T>()
            .await
            .map_err(|e| TradeError::BrokerIntegrationError(e.to_string()))
    }

    fn join_codes(codes: &[String]) -> String {
        codes.join(",")
    }
}

#[async_trait]
impl MarketDataPort for GatewayClient {
    async fn universe(&self, sector: &str) -> Result<Vec<String>, MarketError> {
        let query = [("sector", sector.to_string())];
        with_timeout_retry("universe", self.short, self.long, || {
            self.get_json::<Vec<String>>("/universe", &query)
        })
        .await
        .map_err(MarketError::from)
    }

    async fn instrument_names(
        &self,
        codes: &[String],
    ) -> Result<HashMap<String, String>, MarketError> {
        let query = [("codes", Self::join_codes(codes))];
        let list = with_timeout_retry("names", self.short, self.long, || {
            self.get_json::<Vec<NameDto>>("/names", &query)
        })
        .await
        .map_err(MarketError::from)?;
        Ok(list.into_iter().map(|n| (n.code, n.name)).collect())
    }

    async fn suspended(&self, codes: &[String]) -> Result<HashSet<String>, MarketError> {
        let query = [("codes", Self::join_codes(codes))];
        let list = with_timeout_retry("suspended", self.short, self.long, || {
            self.get_json::<Vec<String>>("/suspended", &query)
        })
        .await
        .map_err(MarketError::from)?;
        Ok(list.into_iter().collect())
    }

    async fn daily_bars(&self, code: &str, count: usize) -> Result<Vec<DayBar>, MarketError> {
        let query = [
            ("code", code.to_string()),
            ("period", "1d".to_string()),
            ("count", count.to_string()),
        ];
        let bars = with_timeout_retry("daily_bars", self.short, self.long, || {
            self.get_json::<Vec<BarDto>>("/history", &query)
        })
        .await
        .map_err(MarketError::from)?;
        Ok(bars.into_iter().map(DayBar::from).collect())
    }

    async fn last_close(&self, code: &str) -> Result<f64, MarketError> {
        let query = [("code", code.to_string())];
        let dto = with_timeout_retry("last_close", self.short, self.long, || {
            self.get_json::<LastCloseDto>("/last_close", &query)
        })
        .await
        .map_err(MarketError::from)?;
        Ok(dto.last_close)
    }

    async fn tick(&self, code: &str) -> Result<TickSnapshot, MarketError> {
        let query = [("code", code.to_string())];
        let dto = with_timeout_retry("tick", self.short, self.long, || {
            self.get_json::<TickDto>("/tick", &query)
        })
        .await
        .map_err(MarketError::from)?;
        Ok(dto.into())
    }

    /// # Summary
    /// 以定时轮询模拟推送订阅。
    ///
    /// # Logic
    /// 1. 创建 mpsc 通道并后台起轮询任务。
    /// 2. 每秒逐标的拉取快照推入通道；单标的失败只降级记录。
    /// 3. 接收端析构后发送失败，任务自行退出。
    async fn subscribe_ticks(&self, codes: &[String]) -> Result<TickStream, MarketError> {
        let (tx, rx) = tokio::sync::mpsc::channel(256);
        let provider = self.clone();
        let codes: Vec<String> = codes.to_vec();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_POLL_INTERVAL);
            loop {
                interval.tick().await;
                for code in &codes {
                    match provider.tick(code).await {
                        Ok(snapshot) => {
                            if tx.send((code.clone(), snapshot)).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => debug!("{} tick poll failed: {}", code, e),
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

#[async_trait]
impl BrokerPort for GatewayClient {
    async fn submit_limit_order(
        &self,
        code: &str,
        side: OrderSide,
        price: Decimal,
        volume: Decimal,
        remark: &str,
    ) -> Result<OrderAck, TradeError> {
        let account = self.account()?.to_string();
        let side_str = match side {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        };
        let body = serde_json::json!({
            "account_id": account,
            "code": code,
            "side": side_str,
            "price": price,
            "volume": volume,
            "remark": remark,
        });

        let result = with_timeout_retry("submit_order", self.short, self.long, || {
            self.post_json::<OrderResultDto>("/order", &body)
        })
        .await
        .map_err(TradeError::from)?;

        // 终端约定：order_id <= 0 表示委托被拒
        if result.order_id <= 0 {
            return Err(TradeError::OrderRejected(format!(
                "gateway returned order_id {}",
                result.order_id
            )));
        }
        Ok(OrderAck {
            order_id: result.order_id,
        })
    }

    async fn positions(&self) -> Result<Vec<Position>, TradeError> {
        let account = self.account()?.to_string();
        let list = with_timeout_retry("positions", self.short, self.long, || async {
            self.get_json::<Vec<PositionDto>>("/positions", &[("account_id", account.clone())])
                .await
                .map_err(|e| TradeError::QueryFailed(e.to_string()))
        })
        .await
        .map_err(TradeError::from)?;

        Ok(list
            .into_iter()
            .map(|dto| Position {
                code: dto.code,
                volume: dto.volume,
                usable_volume: dto.usable_volume,
                avg_cost: dto.avg_cost,
            })
            .collect())
    }

    async fn position(&self, code: &str) -> Result<Option<Position>, TradeError> {
        let positions = self.positions().await?;
        Ok(positions.into_iter().find(|p| p.code == code))
    }

    async fn asset(&self) -> Result<AccountAsset, TradeError> {
        let account = self.account()?.to_string();
        let dto = with_timeout_retry("asset", self.short, self.long, || async {
            self.get_json::<AssetDto>("/asset", &[("account_id", account.clone())])
                .await
                .map_err(|e| TradeError::QueryFailed(e.to_string()))
        })
        .await
        .map_err(TradeError::from)?;

        Ok(AccountAsset {
            cash: dto.cash,
            frozen: dto.frozen,
            total_asset: dto.total_asset,
        })
    }

    /// # Logic
    /// 1. POST /connect 重建终端会话并重新订阅账号。
    /// 2. 成功后标记在线。
    async fn connect(&self) -> Result<(), TradeError> {
        let account = self.account()?.to_string();
        let body = serde_json::json!({ "account_id": account });
        match self.post_json::<serde_json::Value>("/connect", &body).await {
            Ok(_) => {
                self.connected.store(true, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                warn!("gateway connect failed: {}", e);
                self.connected.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_dto_field_aliases() {
        // 新版字段名
        let a: PositionDto = serde_json::from_str(
            r#"{"code":"600000.SH","volume":1000,"usable_volume":500,"avg_cost":10.5}"#,
        )
        .expect("parse");
        assert_eq!(a.code, "600000.SH");

        // 旧版终端字段名
        let b: PositionDto = serde_json::from_str(
            r#"{"stock_code":"600000.SH","volume":1000,"can_use_volume":500,"avg_price":10.5}"#,
        )
        .expect("parse");
        assert_eq!(b.usable_volume, Decimal::from(500));
        assert_eq!(a.avg_cost, b.avg_cost);
    }

    #[test]
    fn test_tick_dto_field_aliases() {
        let dto: TickDto = serde_json::from_str(
            r#"{"lastPrice":11.0,"high":11.0,"preClose":10.0,"bidPrice1":11.0,"bidVol1":20000,"amount":1.5e8}"#,
        )
        .expect("parse");
        let tick: TickSnapshot = dto.into();
        assert_eq!(tick.last_price, 11.0);
        assert_eq!(tick.turnover, 1.5e8);
        assert!(tick.float_market_cap.is_none());
    }

    #[test]
    fn test_bar_dto_maps_pre_close() {
        let dto: BarDto = serde_json::from_str(
            r#"{"open":10.0,"high":11.0,"low":9.9,"close":11.0,"preClose":10.0,"amount":2.0e8}"#,
        )
        .expect("parse");
        let bar: DayBar = dto.into();
        assert_eq!(bar.pre_close, 10.0);
    }
}
