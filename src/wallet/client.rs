// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Circle developer-controlled wallets (W3S REST API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use super::types::{TokenBalance, WalletTransaction};
use crate::format::format_token_amount;
use crate::storage::WalletRef;

pub const DEFAULT_API_BASE_URL: &str = "https://api.circle.com";
/// Name given to the wallet set when the entity has none yet.
pub const WALLET_SET_NAME: &str = "revenant_developer_walletset";
/// Number of transfers shown per wallet.
pub const RECENT_TRANSACTIONS_PAGE_SIZE: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum WalletApiError {
    #[error("wallet API client setup failed: {0}")]
    Setup(String),

    #[error("wallet API request failed: {0}")]
    Request(String),

    #[error("wallet API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("wallet API response was invalid: {0}")]
    InvalidResponse(String),
}

/// Custodial wallet operations used by the app.
#[async_trait]
pub trait WalletApi: Send + Sync {
    /// Id of the first existing wallet set, creating one when none exist.
    async fn wallet_set_id(&self) -> Result<String, WalletApiError>;

    /// Create one smart-contract wallet for `user_id` on `blockchain`.
    async fn create_wallet(
        &self,
        wallet_set_id: &str,
        user_id: &str,
        blockchain: &str,
    ) -> Result<WalletRef, WalletApiError>;

    async fn list_balances(&self, wallet_id: &str) -> Result<Vec<TokenBalance>, WalletApiError>;

    /// Most recent transfers of the wallet, newest first.
    async fn list_recent_transactions(
        &self,
        wallet_id: &str,
    ) -> Result<Vec<WalletTransaction>, WalletApiError>;
}

#[derive(Debug, Clone)]
pub struct CircleConfig {
    pub api_key: String,
    pub entity_secret_ciphertext: String,
    pub api_base_url: String,
}

#[derive(Debug, Clone)]
pub struct CircleClient {
    config: CircleConfig,
    http: Client,
}

impl CircleClient {
    pub fn new(config: CircleConfig) -> Result<Self, WalletApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| WalletApiError::Setup(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    async fn get_data<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, WalletApiError> {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.config.api_key)
            .query(query)
            .send()
            .await
            .map_err(|e| WalletApiError::Request(format!("GET {path} failed: {e}")))?;
        read_data(response, path).await
    }

    async fn post_data<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &Value,
    ) -> Result<T, WalletApiError> {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.config.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| WalletApiError::Request(format!("POST {path} failed: {e}")))?;
        read_data(response, path).await
    }
}

#[async_trait]
impl WalletApi for CircleClient {
    async fn wallet_set_id(&self) -> Result<String, WalletApiError> {
        let existing: WalletSetsData = self.get_data("/v1/w3s/walletSets", &[]).await?;
        if let Some(set) = existing.wallet_sets.into_iter().next() {
            return Ok(set.id);
        }

        let payload = json!({
            "idempotencyKey": Uuid::new_v4().to_string(),
            "name": WALLET_SET_NAME,
            "entitySecretCiphertext": self.config.entity_secret_ciphertext,
        });
        let created: WalletSetData = self
            .post_data("/v1/w3s/developer/walletSets", &payload)
            .await?;
        info!(wallet_set_id = %created.wallet_set.id, "Created wallet set");
        Ok(created.wallet_set.id)
    }

    async fn create_wallet(
        &self,
        wallet_set_id: &str,
        user_id: &str,
        blockchain: &str,
    ) -> Result<WalletRef, WalletApiError> {
        let payload = create_wallet_payload(
            &Uuid::new_v4().to_string(),
            &self.config.entity_secret_ciphertext,
            wallet_set_id,
            user_id,
            blockchain,
        );
        let created: WalletsData = self.post_data("/v1/w3s/developer/wallets", &payload).await?;
        let wallet = created.wallets.into_iter().next().ok_or_else(|| {
            WalletApiError::InvalidResponse("create wallet returned no wallets".to_string())
        })?;
        debug!(wallet_id = %wallet.id, blockchain, "Created wallet");
        Ok(wallet.into())
    }

    async fn list_balances(&self, wallet_id: &str) -> Result<Vec<TokenBalance>, WalletApiError> {
        let data: BalancesData = self
            .get_data(&format!("/v1/w3s/wallets/{wallet_id}/balances"), &[])
            .await?;
        Ok(data.token_balances.into_iter().map(Into::into).collect())
    }

    async fn list_recent_transactions(
        &self,
        wallet_id: &str,
    ) -> Result<Vec<WalletTransaction>, WalletApiError> {
        let query = [
            ("walletIds", wallet_id.to_string()),
            ("operation", "TRANSFER".to_string()),
            ("pageSize", RECENT_TRANSACTIONS_PAGE_SIZE.to_string()),
        ];
        let data: TransactionsData = self.get_data("/v1/w3s/transactions", &query).await?;
        Ok(data.transactions.into_iter().map(Into::into).collect())
    }
}

/// Metadata reference tying a wallet back to its owner.
pub fn wallet_ref_id(user_id: &str, blockchain: &str) -> String {
    format!("revenant:user:{user_id}:{blockchain}")
}

fn create_wallet_payload(
    idempotency_key: &str,
    entity_secret_ciphertext: &str,
    wallet_set_id: &str,
    user_id: &str,
    blockchain: &str,
) -> Value {
    json!({
        "idempotencyKey": idempotency_key,
        "entitySecretCiphertext": entity_secret_ciphertext,
        "accountType": "SCA",
        "blockchains": [blockchain],
        "count": 1,
        "walletSetId": wallet_set_id,
        "metadata": [{ "refId": wallet_ref_id(user_id, blockchain) }],
    })
}

async fn read_data<T: DeserializeOwned>(
    response: reqwest::Response,
    path: &str,
) -> Result<T, WalletApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(WalletApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    let envelope: Envelope<T> = response
        .json()
        .await
        .map_err(|e| WalletApiError::InvalidResponse(format!("{path}: {e}")))?;
    Ok(envelope.data)
}

// Wire format. Circle wraps every payload in `{"data": ...}`.

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletSetsData {
    #[serde(default)]
    wallet_sets: Vec<IdOnly>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletSetData {
    wallet_set: IdOnly,
}

#[derive(Debug, Deserialize)]
struct WalletsData {
    #[serde(default)]
    wallets: Vec<WireWallet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireWallet {
    id: String,
    address: String,
    create_date: String,
}

impl From<WireWallet> for WalletRef {
    fn from(w: WireWallet) -> Self {
        Self {
            wallet_id: w.id,
            address: w.address,
            created_at: w.create_date,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalancesData {
    #[serde(default)]
    token_balances: Vec<WireBalance>,
}

#[derive(Debug, Deserialize)]
struct WireBalance {
    amount: String,
    token: WireToken,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireToken {
    #[serde(default)]
    symbol: String,
    blockchain: String,
    token_address: Option<String>,
}

impl From<WireBalance> for TokenBalance {
    fn from(b: WireBalance) -> Self {
        let display_amount = format_token_amount(&b.token.symbol, &b.amount);
        Self {
            symbol: b.token.symbol,
            amount: b.amount,
            blockchain: b.token.blockchain,
            token_address: b.token.token_address.filter(|a| !a.is_empty()),
            display_amount,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TransactionsData {
    #[serde(default)]
    transactions: Vec<WireTransaction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTransaction {
    id: String,
    #[serde(default)]
    amounts: Vec<String>,
    blockchain: String,
    #[serde(default)]
    operation: String,
    state: String,
    tx_hash: Option<String>,
    create_date: String,
    wallet_id: String,
    #[serde(default)]
    transaction_type: String,
}

impl From<WireTransaction> for WalletTransaction {
    fn from(t: WireTransaction) -> Self {
        Self {
            id: t.id,
            amounts: t.amounts,
            blockchain: t.blockchain,
            operation: t.operation,
            status: t.state,
            tx_hash: t.tx_hash,
            create_date: t.create_date,
            wallet_id: t.wallet_id,
            transaction_type: t.transaction_type,
        }
    }
}
