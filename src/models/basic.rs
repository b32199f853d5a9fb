use std::sync::Arc;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::tvm::{Address, Cell};


#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    #[serde(alias = "uninitialized")]
    Uninit,
    Frozen,
    Nonexist,
}


/// Account state as reported by the node API
#[derive(Debug, Clone)]
pub struct AccountInfo {
    pub balance: BigUint,
    pub code: Option<Arc<Cell>>,
    pub data: Option<Arc<Cell>>,
    pub frozen_hash: Option<String>,
    pub last_transaction_hash: Option<String>,
    pub last_transaction_lt: Option<u64>,
    pub status: AccountStatus,
}


/// Acknowledgement of an accepted external message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub message_hash: String,
    pub message_hash_norm: Option<String>,
}


/// Inputs of a fee estimate for an external message
///
/// Every BoC is passed as serialized bytes. `ignore_chksig` lets the node
/// skip signature checks for unsigned messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeQuery {
    pub address: Address,
    pub body: Vec<u8>,
    pub init_code: Option<Vec<u8>>,
    pub init_data: Option<Vec<u8>>,
    pub ignore_chksig: bool,
}


/// Fee components charged on one account, in nanotons
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fees {
    pub in_fwd_fee: u64,
    pub storage_fee: u64,
    pub gas_fee: u64,
    pub fwd_fee: u64,
}

impl Fees {
    pub fn total(&self) -> u64 {
        self.in_fwd_fee
            .saturating_add(self.storage_fee)
            .saturating_add(self.gas_fee)
            .saturating_add(self.fwd_fee)
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeEstimate {
    pub source: Fees,
    pub destination: Vec<Fees>,
}
