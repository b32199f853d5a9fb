//! HTTP transport to a toncenter-compatible node API

pub mod base;
pub mod toncenter_v3;

pub use base::{BaseClient, ClientParams, Transport};
pub use toncenter_v3::ToncenterV3Client;
