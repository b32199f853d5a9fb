use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::fmt::Write;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use crate::client::{BaseClient, ClientParams, ToncenterV3Client, Transport};
use crate::contract::{ContractSource, contract_address};
use crate::tvm::{Address, Cell, StateInit, deserialize_boc_roots};

/// tonkit CLI
#[derive(Parser, Debug)]
#[command(name = "tonkit")]
#[command(about = "TON cells, BoC and addresses from the command line", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub node: NodeArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Node API connection options
#[derive(Args, Debug, Clone)]
pub struct NodeArgs {
    /// Node API base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,
    /// Node API key
    #[arg(long, global = true)]
    pub api_key: Option<String>,
    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
    /// Maximum number of retries
    #[arg(long, global = true)]
    pub retries: Option<u64>,
    /// Requests per second
    #[arg(long, global = true)]
    pub rps: Option<u64>,
}

impl NodeArgs {
    pub fn client_params(&self) -> ClientParams {
        let defaults = ClientParams::default();
        ClientParams {
            timeout: self.timeout.or(defaults.timeout),
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            rps: self.rps.or(defaults.rps),
            max_retries: self.retries.or(defaults.max_retries),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show every textual form of an address
    Address {
        /// Raw (wc:hex) or user-friendly address
        address: String,
    },
    /// Print the cell tree stored in a BoC
    InspectBoc {
        /// BoC as base64 (or hex with --hex)
        boc: String,
        #[arg(long)]
        hex: bool,
    },
    /// Compute a contract address from its code and data
    ContractAddress {
        /// Code BoC (base64)
        #[arg(short = 'c', long)]
        code: String,
        /// Data BoC (base64)
        #[arg(short = 'd', long)]
        data: String,
        #[arg(short = 'w', long, default_value = "0", allow_negative_numbers = true)]
        workchain: i8,
    },
    /// Submit a serialized message
    SendBoc {
        /// BoC (base64)
        boc: String,
    },
    /// Fetch account state
    Account {
        /// Account address
        address: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    fn create_client(&self) -> Result<ToncenterV3Client> {
        ToncenterV3Client::new(Some(self.node.client_params()))
    }

    /// Execute the command
    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Address { address } => self.execute_address(address),
            Commands::InspectBoc { boc, hex } => self.execute_inspect_boc(boc, *hex).await,
            Commands::ContractAddress {
                code,
                data,
                workchain,
            } => self.execute_contract_address(code, data, *workchain).await,
            Commands::SendBoc { boc } => self.execute_send_boc(boc).await,
            Commands::Account { address } => self.execute_account(address).await,
        }
    }

    fn execute_address(&self, address: &str) -> Result<()> {
        let address = Address::from_str(address)?;
        println!("{}", describe_address(&address));
        Ok(())
    }

    async fn execute_inspect_boc(&self, boc: &str, is_hex: bool) -> Result<()> {
        let bytes = decode_boc_arg(boc, is_hex)?;
        let start = Instant::now();
        let roots = deserialize_boc_roots(&bytes)?;
        log::info!("⏱️  parse: {:.3}s", start.elapsed().as_secs_f64());

        for (i, root) in roots.iter().enumerate() {
            println!("root #{}", i);
            print!("{}", render_tree(root).await);
        }
        Ok(())
    }

    async fn execute_contract_address(&self, code: &str, data: &str, workchain: i8) -> Result<()> {
        let source = ContractSource {
            code: Some(parse_single_root(code).context("invalid code BoC")?),
            data: Some(parse_single_root(data).context("invalid data BoC")?),
            workchain,
        };
        let address = contract_address(&source).await?;
        println!("{}", describe_address(&address));
        Ok(())
    }

    async fn execute_send_boc(&self, boc: &str) -> Result<()> {
        let bytes = decode_boc_arg(boc, false)?;
        // reject garbage before it reaches the node
        deserialize_boc_roots(&bytes)?;

        let client = self.create_client()?;
        let start = Instant::now();
        let sent = client.send_boc(&bytes).await?;
        log::info!("⏱️  send_boc: {:.3}s", start.elapsed().as_secs_f64());

        println!("message hash: {}", sent.message_hash);
        if let Some(norm) = sent.message_hash_norm {
            println!("normalized:   {}", norm);
        }
        Ok(())
    }

    async fn execute_account(&self, address: &str) -> Result<()> {
        let address = Address::from_str(address)?;
        let client = self.create_client()?;

        let start = Instant::now();
        let info = client.get_address_information(&address).await?;
        log::info!("⏱️  get_address_information: {:.3}s", start.elapsed().as_secs_f64());

        println!("address: {}", address);
        println!("status:  {:?}", info.status);
        println!("balance: {}", info.balance);
        if let Some(lt) = info.last_transaction_lt {
            println!("last lt: {}", lt);
        }
        if let Some(code) = &info.code {
            println!("code:    {}", hex::encode(code.hash().await));
        }
        if let Some(data) = &info.data {
            println!("data:    {}", hex::encode(data.hash().await));
        }
        if info.code.is_some() || info.data.is_some() {
            let state_init = StateInit::new(info.code.clone(), info.data.clone()).to_cell()?;
            let derived = Address::new(address.workchain, state_init.hash().await);
            if derived != address {
                log::warn!("State init does not hash to the account address");
            }
        }
        Ok(())
    }
}

fn decode_boc_arg(boc: &str, is_hex: bool) -> Result<Vec<u8>> {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    let boc = boc.trim();
    if is_hex {
        Ok(hex::decode(boc).context("invalid hex")?)
    } else {
        Ok(STANDARD.decode(boc).context("invalid base64")?)
    }
}

fn parse_single_root(boc: &str) -> Result<Arc<Cell>> {
    let mut roots = deserialize_boc_roots(&decode_boc_arg(boc, false)?)?;
    if roots.len() != 1 {
        bail!("expected one root, found {}", roots.len());
    }
    Ok(roots.remove(0))
}

fn describe_address(address: &Address) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "raw:                {}", address.to_raw());
    let _ = writeln!(out, "bounceable:         {}", address.to_friendly(true, false, true));
    let _ = writeln!(out, "non-bounceable:     {}", address.to_friendly(false, false, true));
    let _ = writeln!(out, "testnet bounceable: {}", address.to_friendly(true, true, true));
    let _ = write!(out, "testnet non-bounce: {}", address.to_friendly(false, true, true));
    out
}

/// Indented cell tree, one line per reference, shared cells repeated
async fn render_tree(root: &Arc<Cell>) -> String {
    let mut out = String::new();
    let mut stack = vec![(root.clone(), 0usize)];
    while let Some((cell, indent)) = stack.pop() {
        let repr = cell.repr().await;
        let _ = writeln!(
            out,
            "{:indent$}{}{} hash={} depth={}",
            "",
            if cell.is_exotic() { "exotic " } else { "" },
            cell.bits(),
            hex::encode(repr.hash),
            repr.depth,
            indent = indent * 2
        );
        for child in cell.references().iter().rev() {
            stack.push((child.clone(), indent + 1));
        }
    }
    out
}
