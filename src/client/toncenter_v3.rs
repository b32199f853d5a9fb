use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::client::base::{BaseClient, ClientParams, RateLimiter, Transport};
use crate::models::basic::{AccountInfo, FeeEstimate, FeeQuery, SentMessage};
use crate::models::toncenter_v3::{
    ErrorResponse, V2AddressInformation, V2EstimateFeeRequest, V2EstimateFeeResult,
    V2SendMessageRequest, V2SendMessageResult,
};
use crate::tvm::Address;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);


pub struct ToncenterV3Client {
    params: ClientParams,
    client: Client,
    limiter: RateLimiter,
}

impl ToncenterV3Client {
    pub fn params(&self) -> &ClientParams {
        &self.params
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.params.base_url(), endpoint.trim_start_matches('/'))
    }

    fn with_api_key(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.params.api_key {
            Some(api_key) => request.header("X-API-Key", api_key),
            None => request,
        }
    }

    /// Sends the request built by `make`, retrying transport failures,
    /// 429 and 5xx responses up to `max_retries` times
    async fn send_with_retries<F>(&self, what: &str, make: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let max_retries = self.params.max_retries.unwrap_or(0);
        let mut attempt = 0;
        loop {
            self.limiter.acquire().await;
            log::debug!("{} attempt {}", what, attempt + 1);

            let retryable = match make().send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        anyhow!("{} failed with status {}", what, status)
                    } else {
                        return Ok(response);
                    }
                }
                Err(e) if e.is_builder() => return Err(e.into()),
                Err(e) => anyhow::Error::new(e).context(format!("{} request failed", what)),
            };

            if attempt >= max_retries {
                return Err(retryable);
            }
            attempt += 1;
            let delay = RETRY_BASE_DELAY * attempt as u32;
            log::warn!("{:#}; retrying in {:.2}s", retryable, delay.as_secs_f64());
            tokio::time::sleep(delay).await;
        }
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|e| e.message())
            .unwrap_or(text);
        bail!("node API returned {}: {}", status, message);
    }
    serde_json::from_str(&text).with_context(|| format!("unexpected response body: {}", text))
}

#[async_trait]
impl BaseClient for ToncenterV3Client {
    fn new(params: Option<ClientParams>) -> Result<Self> {
        let params = params.unwrap_or_default();
        let mut builder = Client::builder();
        if let Some(timeout) = params.timeout {
            builder = builder.timeout(Duration::from_secs(timeout));
        }
        Ok(Self {
            limiter: RateLimiter::new(params.rps),
            client: builder.build()?,
            params,
        })
    }

    async fn get(&self, endpoint: &str, params: Option<HashMap<&str, &str>>) -> Result<Response> {
        let url = match params {
            Some(params) => Url::parse_with_params(&self.url(endpoint), params)?,
            None => Url::parse(&self.url(endpoint))?,
        };
        self.send_with_retries(endpoint, || self.with_api_key(self.client.get(url.clone())))
            .await
    }

    async fn post<T: Serialize + Sync>(&self, endpoint: &str, body: &T) -> Result<Response> {
        let url = self.url(endpoint);
        // serialized once so every retry carries identical bytes
        let payload = serde_json::to_vec(body)?;
        self.send_with_retries(endpoint, || {
            self.with_api_key(
                self.client
                    .post(&url)
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(payload.clone()),
            )
        })
        .await
    }
}

#[async_trait]
impl Transport for ToncenterV3Client {
    async fn send_boc(&self, boc: &[u8]) -> Result<SentMessage> {
        log::info!("Sending BoC of {} bytes", boc.len());
        let request = V2SendMessageRequest { boc: boc.to_vec() };
        let response = self.post("message", &request).await?;
        let result: V2SendMessageResult = parse_json(response).await?;
        SentMessage::try_from(result)
    }

    async fn get_address_information(&self, address: &Address) -> Result<AccountInfo> {
        let raw = address.to_raw();
        let params = HashMap::from([("address", raw.as_str()), ("use_v2", "true")]);
        let response = self.get("addressInformation", Some(params)).await?;
        let info: V2AddressInformation = parse_json(response)
            .await
            .with_context(|| format!("failed to load account {}", raw))?;
        AccountInfo::try_from(info)
    }

    async fn estimate_fee(&self, query: &FeeQuery) -> Result<FeeEstimate> {
        let request = V2EstimateFeeRequest::from(query);
        let response = self.post("estimateFee", &request).await?;
        let result: V2EstimateFeeResult = parse_json(response)
            .await
            .with_context(|| format!("failed to estimate fee for {}", request.address))?;
        FeeEstimate::try_from(result)
    }
}
