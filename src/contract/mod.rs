//! Contract addressing and external message assembly
//!
//! A contract's address is the representation hash of its StateInit cell,
//! paired with the workchain it is deployed to.

use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::client::Transport;
use crate::models::basic::{FeeEstimate, FeeQuery, SentMessage};
use crate::tvm::{
    Address, Cell, CellBuilder, Result, create_common_msg_info, create_external_message_header,
    create_state_init, serialize_boc,
};

/// Initial code and data of a contract plus its target workchain
#[derive(Debug, Clone)]
pub struct ContractSource {
    pub code: Option<Arc<Cell>>,
    pub data: Option<Arc<Cell>>,
    pub workchain: i8,
}

/// Address of the account holding `state_init` in `workchain`
pub async fn cell_to_address(state_init: &Cell, workchain: i8) -> Address {
    Address::new(workchain, state_init.hash().await)
}

/// Deterministic address of a contract built from `source`
pub async fn contract_address(source: &ContractSource) -> Result<Address> {
    let state_init = create_state_init(source.code.clone(), source.data.clone())?;
    Ok(cell_to_address(&state_init, source.workchain).await)
}

/// A deployable state init together with the address it resolves to
#[derive(Debug, Clone)]
pub struct ContractStateInit {
    pub state_init: Arc<Cell>,
    pub address: Address,
    pub code: Option<Arc<Cell>>,
    pub data: Option<Arc<Cell>>,
}

/// Message ready to be serialized and sent to a contract
#[derive(Debug, Clone)]
pub struct ExternalMessage {
    pub address: Address,
    pub message: Arc<Cell>,
    pub body: Arc<Cell>,
    pub signature: Option<Vec<u8>>,
    pub signing_message: Option<Arc<Cell>>,
    pub state_init: Option<Arc<Cell>>,
    pub code: Option<Arc<Cell>>,
    pub data: Option<Arc<Cell>>,
}

impl ExternalMessage {
    /// The full message as a BoC with a CRC32C trailer
    pub fn to_boc(&self) -> Result<Vec<u8>> {
        serialize_boc(&self.message, true)
    }

    /// Fee query for this message; unsigned messages skip the signature check
    pub fn fee_query(&self) -> Result<FeeQuery> {
        let init_code = self.code.as_ref().map(|c| serialize_boc(c, false)).transpose()?;
        let init_data = self.data.as_ref().map(|d| serialize_boc(d, false)).transpose()?;
        Ok(FeeQuery {
            address: self.address,
            body: serialize_boc(&self.body, false)?,
            init_code,
            init_data,
            ignore_chksig: self.signature.is_none(),
        })
    }

    pub async fn send<T: Transport + ?Sized>(&self, transport: &T) -> anyhow::Result<SentMessage> {
        let boc = self.to_boc()?;
        log::debug!("Sending external message to {}", self.address.to_raw());
        transport.send_boc(&boc).await
    }

    pub async fn estimate_fee<T: Transport + ?Sized>(
        &self,
        transport: &T,
    ) -> anyhow::Result<FeeEstimate> {
        transport.estimate_fee(&self.fee_query()?).await
    }
}

/// Contract with a known source; the address is computed once
#[derive(Debug)]
pub struct Contract {
    source: ContractSource,
    address: OnceCell<Address>,
}

impl Contract {
    pub fn new(source: ContractSource) -> Self {
        Self {
            source,
            address: OnceCell::new(),
        }
    }

    /// Contract already deployed at `address`
    pub fn at(source: ContractSource, address: Address) -> Self {
        Self {
            source,
            address: OnceCell::new_with(Some(address)),
        }
    }

    pub fn source(&self) -> &ContractSource {
        &self.source
    }

    pub async fn address(&self) -> Result<Address> {
        self.address
            .get_or_try_init(|| contract_address(&self.source))
            .await
            .copied()
    }

    pub async fn create_state_init(&self) -> Result<ContractStateInit> {
        let state_init = create_state_init(self.source.code.clone(), self.source.data.clone())?;
        let address = cell_to_address(&state_init, self.source.workchain).await;
        log::debug!("State init for {}", address.to_raw());

        Ok(ContractStateInit {
            state_init,
            address,
            code: self.source.code.clone(),
            data: self.source.data.clone(),
        })
    }

    /// Wraps `signing_message` into an external message to this contract
    ///
    /// `signature` is opaque: its bytes go in front of the signing message.
    /// With `deploy` set the state init is attached.
    pub async fn create_external_message(
        &self,
        signing_message: Arc<Cell>,
        signature: Option<Vec<u8>>,
        deploy: bool,
    ) -> Result<ExternalMessage> {
        let address = self.address().await?;
        let init = if deploy {
            Some(self.create_state_init().await?)
        } else {
            None
        };
        create_external_message(address, signing_message, signature, init)
    }
}

/// Assembles an external-in message carrying `signature ++ signing_message`
pub fn create_external_message(
    address: Address,
    signing_message: Arc<Cell>,
    signature: Option<Vec<u8>>,
    init: Option<ContractStateInit>,
) -> Result<ExternalMessage> {
    let mut body = CellBuilder::new();
    if let Some(signature) = &signature {
        body.store_bytes(signature)?;
    }
    body.store_cell(&signing_message)?;
    let body = body.build()?;

    let header = create_external_message_header(address, None, 0)?;
    let state_init = init.as_ref().map(|init| init.state_init.clone());
    let message = create_common_msg_info(&header, state_init.as_ref(), Some(&body))?;

    Ok(ExternalMessage {
        address,
        message,
        body,
        signature,
        signing_message: Some(signing_message),
        state_init,
        code: init.as_ref().and_then(|init| init.code.clone()),
        data: init.and_then(|init| init.data),
    })
}
