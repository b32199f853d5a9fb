//! Cells, Bag of Cells, addresses and message assembly for the TON blockchain,
//! plus a small HTTP transport to a node API.

pub mod cli;
pub mod client;
pub mod contract;
pub mod crc;
pub mod models;
pub mod tvm;
pub mod utils;
