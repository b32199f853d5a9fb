use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

use crate::models::basic::{AccountInfo, FeeEstimate, FeeQuery, SentMessage};
use crate::tvm::Address;

pub const DEFAULT_BASE_URL: &str = "https://toncenter.com/api/v3";


#[derive(Debug, Clone)]
pub struct ClientParams {
    /// Per-request timeout in seconds
    pub timeout: Option<u64>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    /// Requests per second; `None` or 0 disables throttling
    pub rps: Option<u64>,
    pub max_retries: Option<u64>,
}

impl Default for ClientParams {
    fn default() -> Self {
        Self {
            timeout: Some(5),
            api_key: None,
            base_url: None,
            rps: Some(10),
            max_retries: Some(5),
        }
    }
}

impl ClientParams {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }
}


/// Raw HTTP access with retries and throttling
#[async_trait]
pub trait BaseClient: Sized {
    fn new(params: Option<ClientParams>) -> Result<Self>;
    async fn get(&self, endpoint: &str, params: Option<HashMap<&str, &str>>) -> Result<reqwest::Response>;
    async fn post<T: Serialize + Sync>(&self, endpoint: &str, body: &T) -> Result<reqwest::Response>;
}


/// Node operations the library needs from a network provider
#[async_trait]
pub trait Transport: Send + Sync {
    /// Submits a serialized BoC; retries resend the same bytes
    async fn send_boc(&self, boc: &[u8]) -> Result<SentMessage>;
    async fn get_address_information(&self, address: &Address) -> Result<AccountInfo>;
    /// Fees the node expects for processing an external message
    async fn estimate_fee(&self, query: &FeeQuery) -> Result<FeeEstimate>;
}


/// Spaces requests at least `1 / rps` seconds apart
#[derive(Debug)]
pub(crate) struct RateLimiter {
    interval: Option<Duration>,
    next: Mutex<Instant>,
}

impl RateLimiter {
    pub(crate) fn new(rps: Option<u64>) -> Self {
        let interval = rps
            .filter(|&rps| rps > 0)
            .map(|rps| Duration::from_secs_f64(1.0 / rps as f64));
        Self {
            interval,
            next: Mutex::new(Instant::now()),
        }
    }

    pub(crate) async fn acquire(&self) {
        let Some(interval) = self.interval else {
            return;
        };
        let mut next = self.next.lock().await;
        let now = Instant::now();
        if *next > now {
            sleep_until(*next).await;
        }
        *next = (*next).max(now) + interval;
    }
}
