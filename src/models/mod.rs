//! Node API request/response models and their domain counterparts

pub mod basic;
pub mod toncenter_v3;
mod traits;
