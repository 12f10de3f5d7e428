use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::errors::DomainError;
use super::order::OrderStatus;

pub const PROVIDER_PAYU: &str = "PAYU";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    Completed,
    Failed,
    Expired,
    Pending,
    Unknown,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 5] = [
        PaymentStatus::Completed,
        PaymentStatus::Failed,
        PaymentStatus::Expired,
        PaymentStatus::Pending,
        PaymentStatus::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Expired => "EXPIRED",
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::invalid(format!("unknown payment status '{s}'")))
    }
}

/// Result of translating a gateway state code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateOutcome {
    pub payment: PaymentStatus,
    pub order: OrderStatus,
    pub recognised: bool,
}

/// Maps a PayU `state_pol` / `transactionState` code onto our statuses.
pub fn map_state(code: &str) -> StateOutcome {
    let (payment, order, recognised) = match code.trim() {
        "4" => (PaymentStatus::Completed, OrderStatus::Processing, true),
        "6" => (PaymentStatus::Failed, OrderStatus::Cancelled, true),
        "5" => (PaymentStatus::Expired, OrderStatus::Cancelled, true),
        "7" => (PaymentStatus::Pending, OrderStatus::Pending, true),
        _ => (PaymentStatus::Unknown, OrderStatus::Pending, false),
    };
    StateOutcome {
        payment,
        order,
        recognised,
    }
}

/// A confirmation posted by the gateway, with every raw field retained.
#[derive(Debug, Clone)]
pub struct PaymentNotification {
    pub merchant_id: String,
    pub reference_sale: String,
    pub value: String,
    pub currency: String,
    pub state_pol: String,
    pub sign: String,
    pub transaction_id: Option<String>,
    pub raw: HashMap<String, String>,
}

impl PaymentNotification {
    pub fn from_fields(fields: HashMap<String, String>) -> Result<Self, DomainError> {
        let required = |name: &str| {
            fields
                .get(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| DomainError::invalid(format!("missing field '{name}'")))
        };

        Ok(Self {
            merchant_id: required("merchant_id")?,
            reference_sale: required("reference_sale")?,
            value: required("value")?,
            currency: required("currency")?,
            state_pol: required("state_pol")?,
            sign: required("sign")?,
            transaction_id: fields
                .get("transaction_id")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            raw: fields,
        })
    }

    pub fn order_id(&self) -> Result<Uuid, DomainError> {
        Uuid::parse_str(&self.reference_sale).map_err(|_| {
            DomainError::not_found(format!("Order '{}'", self.reference_sale))
        })
    }

    /// The gateway transaction id, or a key derived from the order when the
    /// gateway left it out.
    pub fn payment_key(&self, order_id: Uuid) -> String {
        match &self.transaction_id {
            Some(id) => id.clone(),
            None => format!("order-{order_id}"),
        }
    }

    pub fn amount(&self) -> Result<BigDecimal, DomainError> {
        BigDecimal::from_str(&self.value)
            .map_err(|_| DomainError::invalid(format!("invalid amount '{}'", self.value)))
    }
}

/// Query parameters of the browser return page.
#[derive(Debug, Clone)]
pub struct PaymentReturn {
    pub merchant_id: String,
    pub reference_code: String,
    pub tx_value: String,
    pub currency: String,
    pub transaction_state: String,
    pub signature: String,
}

impl PaymentReturn {
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        let get = |name: &str| fields.get(name).cloned().unwrap_or_default();
        Self {
            merchant_id: get("merchantId"),
            reference_code: get("referenceCode"),
            tx_value: get("TX_VALUE"),
            currency: get("currency"),
            transaction_state: get("transactionState"),
            signature: get("signature"),
        }
    }
}

/// Row written by the webhook, keyed by `transaction_id`.
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub order_id: Uuid,
    pub provider: String,
    pub transaction_id: String,
    pub status: PaymentStatus,
    pub amount: BigDecimal,
    pub currency: String,
    pub metadata: Value,
}

#[derive(Debug, Clone)]
pub struct PaymentView {
    pub id: Uuid,
    pub order_id: Uuid,
    pub provider: String,
    pub transaction_id: String,
    pub status: PaymentStatus,
    pub amount: BigDecimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields the storefront posts to the gateway to start a charge.
#[derive(Debug, Clone)]
pub struct CheckoutForm {
    pub gateway_url: String,
    pub merchant_id: String,
    pub account_id: String,
    pub description: String,
    pub reference_code: String,
    pub amount: String,
    pub tax: String,
    pub tax_return_base: String,
    pub currency: String,
    pub signature: String,
    pub test: bool,
    pub buyer_email: String,
    pub response_url: String,
    pub confirmation_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn known_state_codes_map_to_status_pairs() {
        let approved = map_state("4");
        assert_eq!(approved.payment, PaymentStatus::Completed);
        assert_eq!(approved.order, OrderStatus::Processing);

        let declined = map_state("6");
        assert_eq!(declined.payment, PaymentStatus::Failed);
        assert_eq!(declined.order, OrderStatus::Cancelled);

        let expired = map_state("5");
        assert_eq!(expired.payment, PaymentStatus::Expired);
        assert_eq!(expired.order, OrderStatus::Cancelled);

        let pending = map_state("7");
        assert_eq!(pending.payment, PaymentStatus::Pending);
        assert_eq!(pending.order, OrderStatus::Pending);
        assert!(pending.recognised);
    }

    #[test]
    fn unknown_state_code_maps_to_unknown_and_pending() {
        let outcome = map_state("104");
        assert_eq!(outcome.payment, PaymentStatus::Unknown);
        assert_eq!(outcome.order, OrderStatus::Pending);
        assert!(!outcome.recognised);
    }

    #[test]
    fn notification_requires_signature_fields() {
        let err = PaymentNotification::from_fields(fields(&[
            ("merchant_id", "508029"),
            ("reference_sale", "abc"),
            ("value", "10.00"),
            ("currency", "COP"),
            ("state_pol", "4"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("sign"));
    }

    #[test]
    fn payment_key_falls_back_to_order_id() {
        let order_id = Uuid::new_v4();
        let reference = order_id.to_string();
        let mut notification = PaymentNotification::from_fields(fields(&[
            ("merchant_id", "508029"),
            ("reference_sale", reference.as_str()),
            ("value", "10.00"),
            ("currency", "COP"),
            ("state_pol", "4"),
            ("sign", "00"),
            ("transaction_id", "  "),
        ]))
        .unwrap();
        assert_eq!(notification.order_id().unwrap(), order_id);
        assert_eq!(notification.payment_key(order_id), format!("order-{order_id}"));

        notification.transaction_id = Some("tx-1".to_string());
        assert_eq!(notification.payment_key(order_id), "tx-1");
    }

    #[test]
    fn non_uuid_reference_is_reported_as_missing_order() {
        let notification = PaymentNotification::from_fields(fields(&[
            ("merchant_id", "508029"),
            ("reference_sale", "ORDER-17"),
            ("value", "10.00"),
            ("currency", "COP"),
            ("state_pol", "4"),
            ("sign", "00"),
        ]))
        .unwrap();
        assert!(matches!(notification.order_id(), Err(DomainError::NotFound(_))));
    }
}
