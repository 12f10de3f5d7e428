use std::collections::HashMap;

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::OrderStatus;
use crate::domain::payment::{
    map_state, CheckoutForm, PaymentNotification, PaymentRecord, PaymentReturn, PaymentStatus,
    PaymentView, PROVIDER_PAYU,
};
use crate::domain::ports::{OrderRepository, PaymentGateway, PaymentRepository};
use crate::domain::user::Principal;

/// What a processed confirmation did to the order and its payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationOutcome {
    pub order_id: Uuid,
    pub transaction_id: String,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
}

/// Read-only summary of the browser return page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnOutcome {
    pub reference: String,
    /// Mapped payment status, or `None` when the signature did not verify.
    pub status: Option<PaymentStatus>,
}

pub struct PaymentService<O, P, G> {
    orders: O,
    payments: P,
    gateway: G,
}

impl<O, P, G> PaymentService<O, P, G>
where
    O: OrderRepository,
    P: PaymentRepository,
    G: PaymentGateway,
{
    pub fn new(orders: O, payments: P, gateway: G) -> Self {
        Self {
            orders,
            payments,
            gateway,
        }
    }

    /// Processes a gateway confirmation. Each step must pass before the next
    /// runs; nothing is written unless all checks succeed.
    pub fn handle_confirmation(
        &self,
        notification: PaymentNotification,
    ) -> Result<ConfirmationOutcome, DomainError> {
        if !self.gateway.verify_confirmation(&notification) {
            log::warn!(
                "Rejected payment confirmation with invalid signature (reference {})",
                notification.reference_sale
            );
            return Err(DomainError::InvalidSignature);
        }

        let order_id = notification.order_id()?;
        let Some(order) = self.orders.find_by_id(order_id)? else {
            log::warn!("Payment confirmation for unknown order {}", order_id);
            return Err(DomainError::not_found("Order"));
        };

        let outcome = map_state(&notification.state_pol);
        if !outcome.recognised {
            log::warn!(
                "Unrecognised payment state '{}' for order {}; recording as {}",
                notification.state_pol,
                order_id,
                outcome.payment
            );
        }
        if outcome.order != order.status && !order.status.can_transition_to(outcome.order) {
            log::warn!(
                "Payment confirmation moves order {} from {} to {} (out of lifecycle order)",
                order_id,
                order.status,
                outcome.order
            );
        }

        let record = PaymentRecord {
            order_id,
            provider: PROVIDER_PAYU.to_string(),
            transaction_id: notification.payment_key(order_id),
            status: outcome.payment,
            amount: notification.amount()?,
            currency: notification.currency.clone(),
            metadata: serde_json::to_value(&notification.raw)
                .map_err(|e| DomainError::Internal(e.to_string()))?,
        };
        self.payments.record_confirmation(&record, outcome.order)?;

        log::info!(
            "Payment {} for order {} recorded as {}; order is now {}",
            record.transaction_id,
            order_id,
            outcome.payment,
            outcome.order
        );

        Ok(ConfirmationOutcome {
            order_id,
            transaction_id: record.transaction_id,
            payment_status: outcome.payment,
            order_status: outcome.order,
        })
    }

    /// Builds the signed form for an order that is still awaiting payment.
    pub fn checkout_form(
        &self,
        principal: &Principal,
        order_id: Uuid,
    ) -> Result<CheckoutForm, DomainError> {
        let order = self
            .orders
            .find_by_id(order_id)?
            .ok_or_else(|| DomainError::not_found("Order"))?;
        principal.ensure_can_access(order.user_id)?;
        if order.status != OrderStatus::Pending {
            return Err(DomainError::Conflict(format!(
                "order is {} and cannot be paid",
                order.status
            )));
        }
        Ok(self.gateway.checkout_form(&order, &principal.email))
    }

    /// Interprets the browser return. Never writes: the confirmation webhook
    /// is the only source of truth for payment state.
    pub fn browser_return(&self, fields: &HashMap<String, String>) -> ReturnOutcome {
        let payment_return = PaymentReturn::from_fields(fields);
        let status = if self.gateway.verify_return(&payment_return) {
            Some(map_state(&payment_return.transaction_state).payment)
        } else {
            log::warn!(
                "Browser return with invalid signature (reference {})",
                payment_return.reference_code
            );
            None
        };
        ReturnOutcome {
            reference: payment_return.reference_code,
            status,
        }
    }

    pub fn list_payments(
        &self,
        principal: &Principal,
        order_id: Uuid,
    ) -> Result<Vec<PaymentView>, DomainError> {
        let order = self
            .orders
            .find_by_id(order_id)?
            .ok_or_else(|| DomainError::not_found("Order"))?;
        principal.ensure_can_access(order.user_id)?;
        self.payments.list_for_order(order_id)
    }
}
