//! Message building blocks: StateInit, message headers and CommonMsgInfo
//!
//! All layouts are bit-exact TL-B encodings. Headers come out as finished
//! cells and `create_common_msg_info` copies the header into a fresh cell
//! before attaching the optional state init and body.

use std::sync::Arc;

use crate::tvm::address::Address;
use crate::tvm::builder::CellBuilder;
use crate::tvm::cell::Cell;
use crate::tvm::error::{Result, TvmError};
use crate::tvm::slice::Slice;

/// A StateInit field that is always written as absent
///
/// Decoding keeps whatever value was found so it can be reported, but only
/// `Absent` can be encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reserved<T> {
    Absent,
    Unsupported(T),
}

impl<T> Default for Reserved<T> {
    fn default() -> Self {
        Reserved::Absent
    }
}

impl<T> Reserved<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Reserved::Absent)
    }
}

/// `tick` and `tock` flags of a special contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickTock {
    pub tick: bool,
    pub tock: bool,
}

/// Initial code and data of a contract
#[derive(Debug, Clone, Default)]
pub struct StateInit {
    pub split_depth: Reserved<u8>,
    pub special: Reserved<TickTock>,
    pub code: Option<Arc<Cell>>,
    pub data: Option<Arc<Cell>>,
    pub library: Reserved<Arc<Cell>>,
}

impl StateInit {
    pub fn new(code: Option<Arc<Cell>>, data: Option<Arc<Cell>>) -> Self {
        Self {
            code,
            data,
            ..Default::default()
        }
    }

    /// Encodes the state init
    ///
    /// Fails with `UnsupportedField` if any reserved field carries a value.
    pub fn to_cell(&self) -> Result<Arc<Cell>> {
        if !self.split_depth.is_absent() {
            return Err(TvmError::UnsupportedField("split_depth"));
        }
        if !self.special.is_absent() {
            return Err(TvmError::UnsupportedField("special"));
        }
        if !self.library.is_absent() {
            return Err(TvmError::UnsupportedField("library"));
        }

        let mut builder = CellBuilder::new();
        builder
            .store_bit(false)?
            .store_bit(false)?
            .store_bit(self.code.is_some())?
            .store_bit(self.data.is_some())?
            .store_bit(false)?;
        if let Some(code) = &self.code {
            builder.store_ref(code.clone())?;
        }
        if let Some(data) = &self.data {
            builder.store_ref(data.clone())?;
        }
        builder.build()
    }

    /// Decodes a state init, keeping reserved fields as `Unsupported`
    pub fn from_cell(cell: &Arc<Cell>) -> Result<Self> {
        let mut slice = Slice::new(cell.clone());

        let split_depth = if slice.load_bit()? {
            Reserved::Unsupported(slice.load_uint(5)? as u8)
        } else {
            Reserved::Absent
        };
        let special = if slice.load_bit()? {
            Reserved::Unsupported(TickTock {
                tick: slice.load_bit()?,
                tock: slice.load_bit()?,
            })
        } else {
            Reserved::Absent
        };
        let code = slice.load_maybe_ref()?;
        let data = slice.load_maybe_ref()?;
        let library = match slice.load_maybe_ref()? {
            Some(library) => Reserved::Unsupported(library),
            None => Reserved::Absent,
        };

        Ok(Self {
            split_depth,
            special,
            code,
            data,
            library,
        })
    }
}

/// Builds a StateInit cell holding `code` and `data`
pub fn create_state_init(code: Option<Arc<Cell>>, data: Option<Arc<Cell>>) -> Result<Arc<Cell>> {
    StateInit::new(code, data).to_cell()
}

/// `int_msg_info$0` header
#[derive(Debug, Clone)]
pub struct InternalMessageHeader {
    pub ihr_disabled: bool,
    /// `None` follows the destination's bounceable flag
    pub bounce: Option<bool>,
    pub bounced: bool,
    pub src: Option<Address>,
    pub dest: Address,
    pub value: u128,
    pub ihr_fees: u128,
    pub fwd_fees: u128,
    pub created_lt: u64,
    pub created_at: u32,
}

impl InternalMessageHeader {
    pub fn new(dest: Address, value: u128) -> Self {
        Self {
            ihr_disabled: true,
            bounce: None,
            bounced: false,
            src: None,
            dest,
            value,
            ihr_fees: 0,
            fwd_fees: 0,
            created_lt: 0,
            created_at: 0,
        }
    }

    pub fn write_to(&self, builder: &mut CellBuilder) -> Result<()> {
        let bounce = self.bounce.unwrap_or(self.dest.is_bounceable);
        builder
            .store_bit(false)?
            .store_bit(self.ihr_disabled)?
            .store_bit(bounce)?
            .store_bit(self.bounced)?
            .store_address(self.src.as_ref())?
            .store_address(Some(&self.dest))?
            .store_coins(self.value)?
            // extra currencies are not supported
            .store_bit(false)?
            .store_coins(self.ihr_fees)?
            .store_coins(self.fwd_fees)?
            .store_u64(self.created_lt)?
            .store_u32(self.created_at)?;
        Ok(())
    }
}

pub fn create_internal_message_header(header: &InternalMessageHeader) -> Result<Arc<Cell>> {
    let mut builder = CellBuilder::new();
    header.write_to(&mut builder)?;
    builder.build()
}

/// `ext_in_msg_info$10` header
#[derive(Debug, Clone)]
pub struct ExternalMessageHeader {
    pub src: Option<Address>,
    pub dest: Address,
    pub import_fee: u128,
}

impl ExternalMessageHeader {
    pub fn new(dest: Address) -> Self {
        Self {
            src: None,
            dest,
            import_fee: 0,
        }
    }

    pub fn write_to(&self, builder: &mut CellBuilder) -> Result<()> {
        builder
            .store_uint(0b10, 2)?
            .store_address(self.src.as_ref())?
            .store_address(Some(&self.dest))?
            .store_coins(self.import_fee)?;
        Ok(())
    }
}

pub fn create_external_message_header(
    dest: Address,
    src: Option<Address>,
    import_fee: u128,
) -> Result<Arc<Cell>> {
    let header = ExternalMessageHeader {
        src,
        dest,
        import_fee,
    };
    let mut builder = CellBuilder::new();
    header.write_to(&mut builder)?;
    builder.build()
}

/// Appends `init:(Maybe (Either StateInit ^StateInit)) body:(Either X ^X)`
/// to a copy of `header`
///
/// A part is inlined only if its bits and refs fit in what is left of the
/// cell. For the state init that budget also keeps room for the body's
/// `Either` bit and, when a body follows, one reference slot so the body can
/// always spill.
pub fn create_common_msg_info(
    header: &Cell,
    state_init: Option<&Arc<Cell>>,
    body: Option<&Arc<Cell>>,
) -> Result<Arc<Cell>> {
    let mut builder = CellBuilder::new();
    builder.store_cell(header)?;

    match state_init {
        Some(state_init) => {
            builder.store_bit(true)?;
            let reserved_refs = body.is_some() as usize;
            store_either(&mut builder, state_init, 1, reserved_refs)?;
        }
        None => {
            builder.store_bit(false)?;
        }
    }

    match body {
        Some(body) => store_either(&mut builder, body, 0, 0)?,
        None => {
            builder.store_bit(false)?;
        }
    }

    builder.build()
}

fn store_either(
    builder: &mut CellBuilder,
    cell: &Arc<Cell>,
    reserved_bits: usize,
    reserved_refs: usize,
) -> Result<()> {
    let fits = builder.available_bits() >= 1 + cell.bit_len() + reserved_bits
        && builder.available_refs() >= cell.reference_count() + reserved_refs;

    if fits {
        builder.store_bit(false)?.store_cell(cell)?;
    } else {
        builder.store_bit(true)?.store_ref(cell.clone())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::block_on;

    fn filled(bits: usize, refs: usize) -> Arc<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_bits(std::iter::repeat_n(true, bits)).unwrap();
        for _ in 0..refs {
            builder.store_ref(CellBuilder::new().build().unwrap()).unwrap();
        }
        builder.build().unwrap()
    }

    fn dest() -> Address {
        Address::new(0, [0x11; 32])
    }

    #[test]
    fn test_state_init_layout() {
        let code = filled(8, 0);
        let data = filled(16, 0);

        let cell = create_state_init(Some(code.clone()), Some(data.clone())).unwrap();
        assert_eq!(cell.bit_len(), 5);
        assert_eq!(cell.bits().as_bytes(), &[0b0011_0000]);
        assert!(Arc::ptr_eq(cell.reference(0).unwrap(), &code));
        assert!(Arc::ptr_eq(cell.reference(1).unwrap(), &data));

        let only_data = create_state_init(None, Some(data)).unwrap();
        assert_eq!(only_data.bits().as_bytes(), &[0b0001_0000]);
        assert_eq!(only_data.reference_count(), 1);
    }

    #[test]
    fn test_state_init_reserved_fields() {
        let mut state_init = StateInit::new(Some(filled(1, 0)), None);
        state_init.library = Reserved::Unsupported(filled(1, 0));
        assert_eq!(
            state_init.to_cell().unwrap_err(),
            TvmError::UnsupportedField("library")
        );

        state_init.library = Reserved::Absent;
        state_init.split_depth = Reserved::Unsupported(3);
        assert_eq!(
            state_init.to_cell().unwrap_err(),
            TvmError::UnsupportedField("split_depth")
        );
    }

    #[test]
    fn test_state_init_decode() {
        let code = filled(8, 0);
        let cell = create_state_init(Some(code.clone()), None).unwrap();

        let decoded = StateInit::from_cell(&cell).unwrap();
        assert!(decoded.split_depth.is_absent());
        assert!(decoded.special.is_absent());
        assert!(decoded.library.is_absent());
        assert!(decoded.data.is_none());
        assert_eq!(
            block_on(decoded.code.unwrap().hash()),
            block_on(code.hash())
        );
    }

    #[test]
    fn test_internal_header_layout() {
        let header = InternalMessageHeader::new(dest(), 256);
        let cell = create_internal_message_header(&header).unwrap();

        // 4 flag bits, addr_none, 267-bit dest, coins(256) = 4 + 16,
        // no extra currencies, two zero fees, lt, at
        assert_eq!(cell.bit_len(), 4 + 2 + 267 + 20 + 1 + 4 + 4 + 64 + 32);

        let mut slice = Slice::new(cell);
        assert!(!slice.load_bit().unwrap());
        assert!(slice.load_bit().unwrap(), "ihr disabled by default");
        assert!(slice.load_bit().unwrap(), "bounce follows destination");
        assert!(!slice.load_bit().unwrap());
        assert_eq!(slice.load_address().unwrap(), None);
        assert_eq!(slice.load_address().unwrap(), Some(dest()));
        assert_eq!(slice.load_coins().unwrap(), 256);
    }

    #[test]
    fn test_internal_header_bounce_override() {
        let mut header = InternalMessageHeader::new(dest().with_bounceable(false), 1);
        let mut slice = Slice::new(create_internal_message_header(&header).unwrap());
        slice.skip_bits(2).unwrap();
        assert!(!slice.load_bit().unwrap());

        header.bounce = Some(true);
        let mut slice = Slice::new(create_internal_message_header(&header).unwrap());
        slice.skip_bits(2).unwrap();
        assert!(slice.load_bit().unwrap());
    }

    #[test]
    fn test_external_header_layout() {
        let cell = create_external_message_header(dest(), None, 0).unwrap();
        assert_eq!(cell.bit_len(), 2 + 2 + 267 + 4);

        let mut slice = Slice::new(cell);
        assert_eq!(slice.load_uint(2).unwrap(), 0b10);
        assert_eq!(slice.load_address().unwrap(), None);
        assert_eq!(slice.load_address().unwrap(), Some(dest()));
        assert_eq!(slice.load_coins().unwrap(), 0);
    }

    #[test]
    fn test_common_msg_info_inlines_small_parts() {
        let header = create_external_message_header(dest(), None, 0).unwrap();
        let state_init = create_state_init(Some(filled(8, 0)), Some(filled(8, 0))).unwrap();
        let body = filled(32, 0);

        let msg = create_common_msg_info(&header, Some(&state_init), Some(&body)).unwrap();
        // header, maybe bit, either bit, 5 state init bits, either bit, 32 body bits
        assert_eq!(msg.bit_len(), header.bit_len() + 1 + 1 + 5 + 1 + 32);
        assert_eq!(msg.reference_count(), 2);
    }

    #[test]
    fn test_common_msg_info_spills_large_body() {
        let header = create_external_message_header(dest(), None, 0).unwrap();
        let body = filled(1000, 0);

        let msg = create_common_msg_info(&header, None, Some(&body)).unwrap();
        assert_eq!(msg.bit_len(), header.bit_len() + 2);
        assert!(Arc::ptr_eq(msg.reference(0).unwrap(), &body));

        let mut slice = Slice::new(msg);
        slice.skip_bits(header.bit_len()).unwrap();
        assert!(!slice.load_bit().unwrap());
        assert!(slice.load_bit().unwrap(), "body goes by reference");
    }

    #[test]
    fn test_body_fitting_bits_but_not_refs_spills() {
        let header = create_external_message_header(dest(), None, 0).unwrap();
        let state_init = create_state_init(Some(filled(1, 0)), Some(filled(1, 0))).unwrap();
        // 8 bits fit easily but 3 refs do not once the state init took 2
        let body = filled(8, 3);

        let msg = create_common_msg_info(&header, Some(&state_init), Some(&body)).unwrap();
        assert_eq!(msg.reference_count(), 3);
        assert!(Arc::ptr_eq(msg.reference(2).unwrap(), &body));
    }

    #[test]
    fn test_state_init_keeps_ref_for_body() {
        let header = create_external_message_header(dest(), None, 0).unwrap();
        let state_init = filled(5, 4);
        let body = filled(8, 0);

        let msg = create_common_msg_info(&header, Some(&state_init), Some(&body)).unwrap();
        // state init goes by reference, body stays inline
        assert_eq!(msg.reference_count(), 1);
        assert!(Arc::ptr_eq(msg.reference(0).unwrap(), &state_init));
        assert_eq!(msg.bit_len(), header.bit_len() + 1 + 1 + 1 + 8);
    }

    #[test]
    fn test_common_msg_info_overflow() {
        let header = filled(1023, 0);
        let body = filled(1, 0);
        assert!(matches!(
            create_common_msg_info(&header, None, Some(&body)),
            Err(TvmError::Overflow(_))
        ));
    }
}
