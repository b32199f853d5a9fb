//! TVM (TON Virtual Machine) data structures and utilities
//!
//! This module provides implementations of fundamental TON blockchain data structures:
//! - BitString: the fixed-capacity bit buffer behind every cell
//! - Cell: The basic data structure that can store up to 1023 bits and up to 4 references
//! - CellBuilder: the mutable side of a cell, consumed into an immutable `Arc<Cell>`
//! - Slice: A reader for sequentially accessing cell data
//! - BoC: Bag of Cells serialization format for encoding cells into byte arrays
//! - Address: TON address handling (raw and user-friendly forms)
//! - Message: StateInit, message headers and CommonMsgInfo assembly

pub mod address;
pub mod bit_string;
pub mod boc;
pub mod builder;
pub mod cell;
pub mod error;
pub mod message;
pub mod slice;
#[cfg(test)]
mod tests;

pub use address::Address;
pub use bit_string::{BitString, MAX_CELL_BITS};
pub use boc::{
    BocOptions, base64_to_boc, boc_to_base64, boc_to_hex, deserialize_boc, deserialize_boc_roots,
    hex_to_boc, serialize_boc, serialize_boc_roots,
};
pub use builder::CellBuilder;
pub use cell::{Cell, CellRepr, MAX_CELL_DEPTH, MAX_CELL_LEVEL, MAX_CELL_REFS};
pub use error::{Result, TvmError};
pub use message::{
    ExternalMessageHeader, InternalMessageHeader, Reserved, StateInit, TickTock,
    create_common_msg_info, create_external_message_header, create_internal_message_header,
    create_state_init,
};
pub use slice::Slice;
