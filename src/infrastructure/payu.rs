//! PayU WebCheckout: signed checkout forms and confirmation verification.

use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::PayuSettings;
use crate::domain::order::OrderView;
use crate::domain::payment::{CheckoutForm, PaymentNotification, PaymentReturn};
use crate::domain::ports::PaymentGateway;

type HmacSha256 = Hmac<Sha256>;

/// Formats an amount the way PayU signs confirmations: rounded half-even to
/// two decimals, with a trailing zero decimal dropped (`150.00` → `150.0`).
pub fn format_new_value(value: &str) -> Option<String> {
    let amount = BigDecimal::from_str(value.trim()).ok()?;
    let formatted = two_decimals(&amount);
    match formatted.strip_suffix('0') {
        Some(one_decimal) => Some(one_decimal.to_string()),
        None => Some(formatted),
    }
}

fn two_decimals(amount: &BigDecimal) -> String {
    amount.with_scale_round(2, RoundingMode::HalfEven).to_string()
}

pub struct PayuGateway {
    settings: PayuSettings,
}

impl PayuGateway {
    pub fn new(settings: PayuSettings) -> Self {
        Self { settings }
    }

    fn mac(&self, parts: &[&str]) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(self.settings.api_key.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(parts.join("~").as_bytes());
        mac
    }

    fn sign(&self, parts: &[&str]) -> String {
        hex::encode(self.mac(parts).finalize().into_bytes())
    }

    /// Constant-time comparison of the supplied hex signature against the
    /// HMAC over `api_key~merchant~reference~new_value~currency~state`.
    fn verify(&self, merchant_id: &str, reference: &str, value: &str, currency: &str, state: &str, supplied: &str) -> bool {
        let Some(new_value) = format_new_value(value) else {
            return false;
        };
        let Ok(supplied) = hex::decode(supplied.trim()) else {
            return false;
        };
        self.mac(&[
            &self.settings.api_key,
            merchant_id,
            reference,
            &new_value,
            currency,
            state,
        ])
        .verify_slice(&supplied)
        .is_ok()
    }
}

impl PaymentGateway for PayuGateway {
    fn verify_confirmation(&self, n: &PaymentNotification) -> bool {
        self.verify(&n.merchant_id, &n.reference_sale, &n.value, &n.currency, &n.state_pol, &n.sign)
    }

    fn verify_return(&self, r: &PaymentReturn) -> bool {
        self.verify(
            &r.merchant_id,
            &r.reference_code,
            &r.tx_value,
            &r.currency,
            &r.transaction_state,
            &r.signature,
        )
    }

    fn checkout_form(&self, order: &OrderView, buyer_email: &str) -> CheckoutForm {
        let s = &self.settings;
        let reference = order.id.to_string();
        let amount = two_decimals(&order.total_amount);
        let signature = self.sign(&[&s.api_key, &s.merchant_id, &reference, &amount, &s.currency]);
        let base = s.public_base_url.trim_end_matches('/');

        CheckoutForm {
            gateway_url: s.checkout_url.clone(),
            merchant_id: s.merchant_id.clone(),
            account_id: s.account_id.clone(),
            description: format!("Apex Labs order {}", reference),
            reference_code: reference,
            amount,
            tax: "0".to_string(),
            tax_return_base: "0".to_string(),
            currency: s.currency.clone(),
            signature,
            test: s.test_mode,
            buyer_email: buyer_email.to_string(),
            response_url: format!("{base}/payments/response"),
            confirmation_url: format!("{base}/payments/confirmation"),
        }
    }
}
