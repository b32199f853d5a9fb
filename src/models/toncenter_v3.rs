use serde::{Deserialize, Serialize};
use serde_with::base64::Base64;
use serde_with::serde_as;

use crate::models::basic::AccountStatus;


#[serde_as]
#[derive(Debug, Serialize, Deserialize)]
pub struct V2SendMessageRequest {
    #[serde_as(as = "Base64")]
    pub(crate) boc: Vec<u8>,
}


#[derive(Debug, Serialize, Deserialize)]
pub struct V2SendMessageResult {
    pub(crate) message_hash: Option<String>,
    pub(crate) message_hash_norm: Option<String>,
}


#[serde_as]
#[derive(Debug, Serialize, Deserialize)]
pub struct V2AddressInformation {
    pub(crate) balance: Option<String>,
    #[serde_as(as = "Option<Base64>")]
    pub(crate) code: Option<Vec<u8>>,
    #[serde_as(as = "Option<Base64>")]
    pub(crate) data: Option<Vec<u8>>,
    pub(crate) frozen_hash: Option<String>,
    pub(crate) last_transaction_hash: Option<String>,
    pub(crate) last_transaction_lt: Option<String>,
    pub(crate) status: Option<AccountStatus>,
}


#[serde_as]
#[derive(Debug, Serialize, Deserialize)]
pub struct V2EstimateFeeRequest {
    pub(crate) address: String,
    #[serde_as(as = "Base64")]
    pub(crate) body: Vec<u8>,
    #[serde_as(as = "Option<Base64>")]
    pub(crate) init_code: Option<Vec<u8>>,
    #[serde_as(as = "Option<Base64>")]
    pub(crate) init_data: Option<Vec<u8>>,
    pub(crate) ignore_chksig: bool,
}


#[derive(Debug, Default, Serialize, Deserialize)]
pub struct V2Fees {
    pub(crate) in_fwd_fee: Option<u64>,
    pub(crate) storage_fee: Option<u64>,
    pub(crate) gas_fee: Option<u64>,
    pub(crate) fwd_fee: Option<u64>,
}


#[derive(Debug, Serialize, Deserialize)]
pub struct V2EstimateFeeResult {
    pub(crate) source_fees: Option<V2Fees>,
    #[serde(default)]
    pub(crate) destination_fees: Vec<V2Fees>,
}


/// Error body returned with non-2xx responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub(crate) error: Option<String>,
    pub(crate) detail: Option<serde_json::Value>,
    pub(crate) code: Option<i64>,
}

impl ErrorResponse {
    pub fn message(&self) -> String {
        match (&self.error, &self.detail) {
            (Some(error), _) => error.clone(),
            (None, Some(detail)) => detail.to_string(),
            (None, None) => "unknown error".to_string(),
        }
    }
}
