use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use num_bigint::BigUint;

use crate::models::basic::{AccountInfo, AccountStatus, FeeEstimate, FeeQuery, Fees, SentMessage};
use crate::models::toncenter_v3::{
    V2AddressInformation, V2EstimateFeeRequest, V2EstimateFeeResult, V2Fees, V2SendMessageResult,
};
use crate::tvm::{Cell, deserialize_boc};


fn parse_cell(field: &str, boc: Option<Vec<u8>>) -> Result<Option<Arc<Cell>>> {
    match boc {
        Some(bytes) if !bytes.is_empty() => {
            let cell = deserialize_boc(&bytes).with_context(|| format!("invalid {} BoC", field))?;
            Ok(Some(cell))
        }
        _ => Ok(None),
    }
}


impl TryFrom<V2AddressInformation> for AccountInfo {
    type Error = anyhow::Error;

    fn try_from(value: V2AddressInformation) -> Result<Self> {
        let balance = match value.balance {
            Some(balance) => balance
                .parse::<BigUint>()
                .with_context(|| format!("invalid balance {:?}", balance))?,
            None => BigUint::default(),
        };
        let last_transaction_lt = value
            .last_transaction_lt
            .map(|lt| lt.parse::<u64>().with_context(|| format!("invalid lt {:?}", lt)))
            .transpose()?;

        Ok(AccountInfo {
            balance,
            code: parse_cell("code", value.code)?,
            data: parse_cell("data", value.data)?,
            frozen_hash: value.frozen_hash.filter(|h| !h.is_empty()),
            last_transaction_hash: value.last_transaction_hash,
            last_transaction_lt,
            status: value.status.unwrap_or(AccountStatus::Nonexist),
        })
    }
}


impl TryFrom<V2SendMessageResult> for SentMessage {
    type Error = anyhow::Error;

    fn try_from(value: V2SendMessageResult) -> Result<Self> {
        let message_hash = value
            .message_hash
            .ok_or_else(|| anyhow!("response has no message hash"))?;
        Ok(SentMessage {
            message_hash,
            message_hash_norm: value.message_hash_norm,
        })
    }
}


impl From<&FeeQuery> for V2EstimateFeeRequest {
    fn from(query: &FeeQuery) -> Self {
        V2EstimateFeeRequest {
            address: query.address.to_raw(),
            body: query.body.clone(),
            init_code: query.init_code.clone(),
            init_data: query.init_data.clone(),
            ignore_chksig: query.ignore_chksig,
        }
    }
}


impl From<V2Fees> for Fees {
    fn from(value: V2Fees) -> Self {
        Fees {
            in_fwd_fee: value.in_fwd_fee.unwrap_or(0),
            storage_fee: value.storage_fee.unwrap_or(0),
            gas_fee: value.gas_fee.unwrap_or(0),
            fwd_fee: value.fwd_fee.unwrap_or(0),
        }
    }
}


impl TryFrom<V2EstimateFeeResult> for FeeEstimate {
    type Error = anyhow::Error;

    fn try_from(value: V2EstimateFeeResult) -> Result<Self> {
        let source = value
            .source_fees
            .ok_or_else(|| anyhow!("response has no source fees"))?;
        Ok(FeeEstimate {
            source: source.into(),
            destination: value.destination_fees.into_iter().map(Fees::from).collect(),
        })
    }
}
