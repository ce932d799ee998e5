use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use sha2::Sha256;
use std::collections::BTreeMap;

use crate::config::GatewayConfig;

type HmacSha256 = Hmac<Sha256>;

/// What the gateway hands back for a freshly created payment link.
#[derive(Debug, Clone)]
pub struct PaymentLink {
    pub order_code: i64,
    pub checkout_url: String,
    pub qr_code_url: Option<String>,
    pub payment_link_id: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct PayLinkService {
    client: Client,
    config: GatewayConfig,
}

impl PayLinkService {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Without credentials the service issues deterministic local links and
    /// never talks to the network, so checkout still completes end to end in
    /// development setups.
    fn offline(&self) -> bool {
        self.config.client_id.is_empty() || self.config.api_key.is_empty()
    }

    /// Create a hosted checkout link for one order. The amount is charged in
    /// whole currency units as the gateway requires.
    pub async fn create_payment_link(
        &self,
        order_code: i64,
        amount: Decimal,
        description: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PaymentLink> {
        let charge_amount = amount
            .round_dp(0)
            .to_i64()
            .ok_or_else(|| anyhow!("Payment amount {} is not representable", amount))?;

        if self.offline() {
            log::info!(
                "Gateway credentials not configured, issuing local payment link for order {}",
                order_code
            );
            return Ok(PaymentLink {
                order_code,
                checkout_url: format!("{}/web/{}", self.config.base_url, order_code),
                qr_code_url: Some(format!("{}/qr/{}", self.config.base_url, order_code)),
                payment_link_id: format!("local-{}", order_code),
                expires_at,
            });
        }

        let mut params = BTreeMap::new();
        params.insert("amount", charge_amount.to_string());
        params.insert("cancelUrl", self.config.cancel_url.clone());
        params.insert("description", description.to_string());
        params.insert("orderCode", order_code.to_string());
        params.insert("returnUrl", self.config.return_url.clone());
        let signature = self.sign(&join_sorted(&params))?;

        let payload = json!({
            "orderCode": order_code,
            "amount": charge_amount,
            "description": description,
            "cancelUrl": self.config.cancel_url,
            "returnUrl": self.config.return_url,
            "expiredAt": expires_at.timestamp(),
            "signature": signature,
        });

        log::info!("Requesting payment link for order {}", order_code);

        let response = self
            .client
            .post(format!("{}/v2/payment-requests", self.config.base_url))
            .header("x-client-id", &self.config.client_id)
            .header("x-api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(anyhow!("Payment link creation failed: {}", error_text));
        }

        let link_response: Value = response.json().await?;

        let code = link_response["code"].as_str().unwrap_or_default();
        if code != "00" {
            return Err(anyhow!(
                "Gateway declined payment link for order {}: {} ({})",
                order_code,
                link_response["desc"].as_str().unwrap_or("unknown"),
                code
            ));
        }

        let data = &link_response["data"];
        let checkout_url = data["checkoutUrl"]
            .as_str()
            .ok_or_else(|| anyhow!("No checkoutUrl in gateway response"))?;
        let payment_link_id = data["paymentLinkId"]
            .as_str()
            .ok_or_else(|| anyhow!("No paymentLinkId in gateway response"))?;

        log::info!("Payment link {} created for order {}", payment_link_id, order_code);

        Ok(PaymentLink {
            order_code,
            checkout_url: checkout_url.to_string(),
            qr_code_url: data["qrCode"].as_str().map(|s| s.to_string()),
            payment_link_id: payment_link_id.to_string(),
            expires_at,
        })
    }

    /// Best-effort link cancellation. The payment row is already settled by
    /// the time this runs, so a gateway failure is logged and swallowed.
    pub async fn cancel_payment_link(&self, payment_link_id: &str, reason: &str) {
        if self.offline() {
            log::debug!("Skipping gateway cancel for local link {}", payment_link_id);
            return;
        }

        let payload = json!({ "cancellationReason": reason });

        let result = self
            .client
            .post(format!(
                "{}/v2/payment-requests/{}/cancel",
                self.config.base_url, payment_link_id
            ))
            .header("x-client-id", &self.config.client_id)
            .header("x-api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                log::info!("Cancelled payment link {}", payment_link_id);
            }
            Ok(response) => {
                log::warn!(
                    "Gateway refused to cancel link {}: HTTP {}",
                    payment_link_id,
                    response.status()
                );
            }
            Err(err) => {
                log::warn!("Failed to cancel payment link {}: {}", payment_link_id, err);
            }
        }
    }

    /// Validate a webhook signature over the alphabetically sorted
    /// `key=value&...` rendering of the data object. With no checksum key
    /// configured every payload is accepted.
    pub fn verify_webhook_signature(&self, data: &Map<String, Value>, signature: &str) -> bool {
        if self.config.checksum_key.is_empty() {
            return true;
        }

        let expected = match self.sign(&canonical_data_string(data)) {
            Ok(expected) => expected,
            Err(_) => return false,
        };

        expected.eq_ignore_ascii_case(signature)
    }

    fn sign(&self, payload: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.config.checksum_key.as_bytes())
            .map_err(|e| anyhow!("Invalid checksum key: {}", e))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

fn join_sorted(params: &BTreeMap<&str, String>) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

/// Render a webhook data object the way the gateway signs it: keys sorted,
/// null as empty string, scalars in their JSON form without quotes.
fn canonical_data_string(data: &Map<String, Value>) -> String {
    let mut keys: Vec<&String> = data.keys().collect();
    keys.sort();

    keys.into_iter()
        .map(|key| {
            let rendered = match &data[key] {
                Value::Null => String::new(),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}={}", key, rendered)
        })
        .collect::<Vec<_>>()
        .join("&")
}
