use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::data_source::{DailyBarsRequest, MarketDataSource, SourceError};
use crate::domain::calendar::{exchange_date, unix_midnight};
use crate::http_client::{HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient};
use crate::retry::RetryConfig;
use crate::ProviderBar;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const REFERER: &str = "https://finance.yahoo.com/";
const SESSION_TTL: Duration = Duration::from_secs(3600);

// ============================================================================
// Session: cookie + crumb
// ============================================================================

#[derive(Debug, Clone)]
struct CachedCrumb {
    value: String,
    fetched_at: Instant,
}

/// Yahoo's chart API wants a session cookie (kept by the transport's cookie
/// jar) and a matching crumb token passed as a query parameter.
#[derive(Debug, Default)]
pub struct YahooSession {
    crumb: Mutex<Option<CachedCrumb>>,
}

impl YahooSession {
    async fn crumb(
        &self,
        client: &dyn HttpClient,
        base_url: &str,
        timeout_ms: u64,
    ) -> Result<String, SourceError> {
        let mut cached = self.crumb.lock().await;
        if let Some(crumb) = cached.as_ref() {
            if crumb.fetched_at.elapsed() < SESSION_TTL {
                return Ok(crumb.value.clone());
            }
        }

        let value = fetch_crumb(client, base_url, timeout_ms).await?;
        *cached = Some(CachedCrumb {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        Ok(value)
    }

    async fn invalidate(&self) {
        *self.crumb.lock().await = None;
    }
}

async fn fetch_crumb(
    client: &dyn HttpClient,
    base_url: &str,
    timeout_ms: u64,
) -> Result<String, SourceError> {
    // The cookie response itself is usually a 404 page; only the Set-Cookie matters.
    let cookie_request = HttpRequest::get(COOKIE_URL)
        .with_header("referer", REFERER)
        .with_timeout_ms(timeout_ms);
    client.execute(cookie_request).await.map_err(|e| {
        SourceError::unavailable(format!("failed to fetch yahoo cookie: {}", e.message()))
    })?;

    let crumb_request = HttpRequest::get(format!("{base_url}/v1/test/getcrumb"))
        .with_header("referer", REFERER)
        .with_timeout_ms(timeout_ms);
    let response = client.execute(crumb_request).await.map_err(|e| {
        SourceError::unavailable(format!("failed to fetch yahoo crumb: {}", e.message()))
    })?;

    if response.status == 429 || response.body.to_lowercase().contains("too many requests") {
        return Err(SourceError::rate_limited(
            "yahoo rate limited while fetching crumb",
        ));
    }

    let body = response.body.trim();
    let looks_valid = response.is_success()
        && !body.is_empty()
        && body.len() < 100
        && !body.contains(' ')
        && !body.contains('<');
    if !looks_valid {
        return Err(SourceError::unavailable(format!(
            "yahoo crumb endpoint returned status {}",
            response.status
        )));
    }

    Ok(body.to_string())
}

// ============================================================================
// Adapter
// ============================================================================

/// Yahoo Finance daily-bar adapter.
#[derive(Clone)]
pub struct YahooAdapter {
    http_client: Arc<dyn HttpClient>,
    session: Arc<YahooSession>,
    retry: RetryConfig,
    timeout_ms: u64,
    base_url: String,
}

impl Default for YahooAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()))
    }
}

impl YahooAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            session: Arc::new(YahooSession::default()),
            retry: RetryConfig::default(),
            timeout_ms: 10_000,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms.max(1);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn chart_url(&self, req: &DailyBarsRequest, crumb: &str) -> String {
        format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d&events=history&crumb={}",
            self.base_url,
            urlencoding::encode(&req.symbol),
            unix_midnight(req.start),
            unix_midnight(req.end),
            urlencoding::encode(crumb)
        )
    }

    async fn send_chart(&self, url: String) -> Result<HttpResponse, SourceError> {
        let request = HttpRequest::get(url)
            .with_header("referer", REFERER)
            .with_timeout_ms(self.timeout_ms);

        self.retry
            .send(self.http_client.as_ref(), request)
            .await
            .map_err(|e| SourceError::unavailable(format!("yahoo transport error: {}", e.message())))
    }

    async fn fetch_daily_bars(&self, req: &DailyBarsRequest) -> Result<Vec<ProviderBar>, SourceError> {
        let crumb = self
            .session
            .crumb(self.http_client.as_ref(), &self.base_url, self.timeout_ms)
            .await?;
        let mut response = self.send_chart(self.chart_url(req, &crumb)).await?;

        // A stale session shows up as 401/429; refresh the crumb once and retry.
        if response.status == 401 || response.status == 429 {
            debug!(symbol = %req.symbol, status = response.status, "refreshing yahoo session");
            self.session.invalidate().await;
            let crumb = self
                .session
                .crumb(self.http_client.as_ref(), &self.base_url, self.timeout_ms)
                .await?;
            response = self.send_chart(self.chart_url(req, &crumb)).await?;
        }

        match response.status {
            404 => {
                // Unknown or delisted symbol: yahoo answers 404 with a chart error body.
                warn!(symbol = %req.symbol, "yahoo has no chart for symbol");
                Ok(Vec::new())
            }
            429 => Err(SourceError::rate_limited("yahoo rate limited chart request")),
            status if !(200..300).contains(&status) => Err(SourceError::unavailable(format!(
                "yahoo returned status {status}"
            ))),
            _ => {
                let bars = parse_chart(&response.body)?;
                Ok(bars.into_iter().filter(|bar| req.contains(bar.date)).collect())
            }
        }
    }
}

impl MarketDataSource for YahooAdapter {
    fn id(&self) -> &'static str {
        "yahoo"
    }

    fn daily_bars<'a>(
        &'a self,
        req: DailyBarsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ProviderBar>, SourceError>> + Send + 'a>> {
        Box::pin(async move { self.fetch_daily_bars(&req).await })
    }
}

/// Normalize a v8 chart payload into one bar per exchange-local trading day.
///
/// Missing or null entries in the OHLCV arrays become `None`; the day is kept.
/// When the payload repeats a day (yahoo sometimes appends a live bar), the
/// first occurrence wins. Output is sorted by date.
fn parse_chart(body: &str) -> Result<Vec<ProviderBar>, SourceError> {
    let chart: YahooChartResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::internal(format!("failed to parse yahoo chart: {e}")))?;

    if let Some(error) = chart.chart.error {
        return Err(SourceError::unavailable(format!(
            "yahoo chart API error: {} {}",
            error.code,
            error.description.unwrap_or_default()
        )));
    }

    let Some(result) = chart.chart.result.and_then(|mut r| {
        if r.is_empty() {
            None
        } else {
            Some(r.swap_remove(0))
        }
    }) else {
        return Ok(Vec::new());
    };

    let Some(timestamps) = result.timestamp else {
        return Ok(Vec::new());
    };
    let gmt_offset = result.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let mut by_date = BTreeMap::new();
    for (i, ts) in timestamps.into_iter().enumerate() {
        let Some(date) = exchange_date(ts, gmt_offset) else {
            return Err(SourceError::internal(format!("invalid yahoo timestamp {ts}")));
        };
        by_date.entry(date).or_insert_with(|| {
            ProviderBar::new(
                date,
                value_at(&quote.open, i),
                value_at(&quote.high, i),
                value_at(&quote.low, i),
                value_at(&quote.close, i),
                value_at(&quote.volume, i),
            )
        });
    }

    Ok(by_date.into_values().collect())
}

fn value_at(series: &[Option<f64>], index: usize) -> Option<f64> {
    series.get(index).copied().flatten()
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChartData,
}

#[derive(Debug, Deserialize)]
struct YahooChartData {
    #[serde(default)]
    result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    error: Option<YahooChartError>,
}

#[derive(Debug, Deserialize)]
struct YahooChartError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YahooChartResult {
    #[serde(default)]
    meta: Option<YahooChartMeta>,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: YahooChartIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooChartMeta {
    #[serde(default)]
    gmtoffset: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct YahooChartIndicators {
    #[serde(default)]
    quote: Vec<YahooChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct YahooChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}
