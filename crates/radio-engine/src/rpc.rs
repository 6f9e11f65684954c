//! JSON-RPC ledger for EVM nodes
//!
//! Token history comes from ERC-20 `Transfer` logs, balances from
//! `eth_getBalance` and `balanceOf`, and transfers go through
//! `eth_sendTransaction`, so the node must hold the pool's keys. A broadcast
//! resolves only once its receipt is available.

use std::time::{Duration, Instant};

use alloy_primitives::{keccak256, Address, Bytes, B256, U256, U64};
use alloy_rpc_client::{ClientBuilder, RpcClient};
use alloy_rpc_types::BlockNumberOrTag;
use async_trait::async_trait;
use radio_core::{Account, Amount, Asset};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::ledger::{sort_events, BalanceOracle, Broadcaster, ChainEvent, LedgerReader, TxHash};

const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];
const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
const TRANSFER_EVENT: &[u8] = b"Transfer(address,address,uint256)";

#[derive(Debug, Clone)]
pub struct RpcSettings {
    pub url: String,
    pub poll_interval: Duration,
    pub receipt_timeout: Duration,
}

impl RpcSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            poll_interval: Duration::from_secs(1),
            receipt_timeout: Duration::from_secs(120),
        }
    }
}

/// Log entry from eth_getLogs
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
    block_number: Option<U64>,
    log_index: Option<U64>,
    transaction_hash: Option<B256>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    status: Option<U64>,
    block_number: Option<U64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransaction {
    block_number: Option<U64>,
}

pub struct RpcLedger {
    client: RpcClient,
    settings: RpcSettings,
}

impl RpcLedger {
    pub async fn connect(settings: RpcSettings) -> anyhow::Result<Self> {
        let client = ClientBuilder::default().connect(&settings.url).await?;
        info!(url = %settings.url, "Connected to ledger node");
        Ok(Self { client, settings })
    }

    async fn call<Params, Resp>(&self, method: &str, params: Params) -> anyhow::Result<Resp>
    where
        Params: Serialize + Clone + std::fmt::Debug + Send + Sync + Unpin + 'static,
        Resp: DeserializeOwned + std::fmt::Debug + Send + Sync + Unpin + 'static,
    {
        Ok(self.client.request(method.to_string(), params).await?)
    }

    pub async fn block_number(&self) -> anyhow::Result<u64> {
        let block: U64 = self.client.request_noparams("eth_blockNumber").await?;
        Ok(block.to::<u64>())
    }

    async fn token_balance(&self, token: Address, owner: Address) -> anyhow::Result<Amount> {
        let call = json!({
            "to": token,
            "data": Bytes::from(balance_of_calldata(owner)),
        });
        let result: Bytes = self.call("eth_call", (call, BlockNumberOrTag::Latest)).await?;
        Ok(word_to_amount(&result))
    }

    /// Poll until the receipt shows up; a reverted receipt is an error
    async fn wait_for_receipt(&self, tx: TxHash) -> anyhow::Result<u64> {
        let started = Instant::now();
        loop {
            let receipt: Option<RpcReceipt> =
                self.call("eth_getTransactionReceipt", (tx,)).await?;

            if let Some(receipt) = receipt {
                if receipt.status.is_some_and(|status| status.is_zero()) {
                    anyhow::bail!("transaction {tx} reverted");
                }
                if let Some(block) = receipt.block_number {
                    return Ok(block.to::<u64>());
                }
            }

            if started.elapsed() >= self.settings.receipt_timeout {
                anyhow::bail!(
                    "no receipt for {tx} after {}s",
                    self.settings.receipt_timeout.as_secs()
                );
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }
}

#[async_trait]
impl LedgerReader for RpcLedger {
    async fn transfer_events(
        &self,
        tokens: &[Address],
        accounts: &[Address],
        from_block: u64,
    ) -> anyhow::Result<Vec<ChainEvent>> {
        let members: Vec<B256> = accounts.iter().map(|a| a.into_word()).collect();
        let filter = json!({
            "fromBlock": BlockNumberOrTag::Number(from_block),
            "toBlock": BlockNumberOrTag::Latest,
            "address": tokens,
            "topics": [transfer_topic(), members, members],
        });

        let logs: Vec<RpcLog> = self.call("eth_getLogs", (filter,)).await?;
        debug!(logs = logs.len(), from_block, "Fetched transfer logs");

        let mut events: Vec<ChainEvent> = logs.iter().filter_map(decode_log).collect();
        sort_events(&mut events);
        Ok(events)
    }

    async fn transaction_block(&self, tx: TxHash) -> anyhow::Result<Option<u64>> {
        let transaction: Option<RpcTransaction> =
            self.call("eth_getTransactionByHash", (tx,)).await?;
        Ok(transaction
            .and_then(|t| t.block_number)
            .map(|block| block.to::<u64>()))
    }
}

#[async_trait]
impl BalanceOracle for RpcLedger {
    async fn balance(&self, address: Address, asset: Asset) -> anyhow::Result<Amount> {
        match asset {
            Asset::Native => {
                let balance: U256 = self
                    .call("eth_getBalance", (address, BlockNumberOrTag::Latest))
                    .await?;
                Ok(balance.saturating_to::<u128>())
            }
            Asset::Token(token) => self.token_balance(token, address).await,
        }
    }
}

#[async_trait]
impl Broadcaster for RpcLedger {
    async fn send_transfer(
        &self,
        signer: &Account,
        to: Address,
        asset: Asset,
        value: Amount,
    ) -> anyhow::Result<TxHash> {
        let request = match asset {
            Asset::Native => json!({
                "from": signer.address,
                "to": to,
                "value": U256::from(value),
            }),
            Asset::Token(token) => json!({
                "from": signer.address,
                "to": token,
                "data": Bytes::from(transfer_calldata(to, value)),
            }),
        };

        let tx: TxHash = self.call("eth_sendTransaction", (request,)).await?;
        let block = self.wait_for_receipt(tx).await?;
        debug!(%tx, block, "Receipt received");
        Ok(tx)
    }
}

fn transfer_topic() -> B256 {
    keccak256(TRANSFER_EVENT)
}

fn balance_of_calldata(owner: Address) -> Vec<u8> {
    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&BALANCE_OF_SELECTOR);
    data.extend_from_slice(owner.into_word().as_slice());
    data
}

fn transfer_calldata(to: Address, value: Amount) -> Vec<u8> {
    let mut data = Vec::with_capacity(68);
    data.extend_from_slice(&TRANSFER_SELECTOR);
    data.extend_from_slice(to.into_word().as_slice());
    data.extend_from_slice(&U256::from(value).to_be_bytes::<32>());
    data
}

/// First 32-byte word as an amount, saturating at `u128::MAX`
fn word_to_amount(data: &[u8]) -> Amount {
    match data.get(..32) {
        Some(word) => U256::from_be_slice(word).saturating_to::<u128>(),
        None => 0,
    }
}

/// `Transfer(from, to, value)` log as an event; pending or malformed logs are dropped
fn decode_log(log: &RpcLog) -> Option<ChainEvent> {
    if log.topics.len() != 3 || log.topics[0] != transfer_topic() {
        return None;
    }
    Some(ChainEvent {
        from: Address::from_word(log.topics[1]),
        to: Address::from_word(log.topics[2]),
        token: log.address,
        value: word_to_amount(&log.data),
        block_number: log.block_number?.to::<u64>(),
        log_index: log.log_index?.to::<u64>(),
        tx_hash: log.transaction_hash?,
    })
}
