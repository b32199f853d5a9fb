use crc::{CRC_16_XMODEM, CRC_32_ISCSI, Crc};

/// CRC16/XMODEM, used by the user-friendly address form
pub const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// CRC32C (Castagnoli), used as the BoC trailer
pub const CRC32C: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

#[cfg(test)]
mod tests;
