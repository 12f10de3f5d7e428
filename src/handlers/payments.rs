use std::collections::HashMap;

use actix_web::http::header;
use actix_web::{web, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::payment_service::{ConfirmationOutcome, ReturnOutcome};
use crate::domain::payment::{CheckoutForm, PaymentNotification, PaymentView};
use crate::errors::AppError;
use crate::handlers::extract::AuthUser;
use crate::handlers::{run_blocking, Payments};

/// Base URL of the storefront the browser return redirects to.
#[derive(Debug, Clone)]
pub struct StorefrontUrl(pub String);

// ── Response DTOs ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutFormResponse {
    /// Where the browser posts the form.
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
    /// `1` in sandbox mode, `0` in production.
    pub test: String,
    pub buyer_email: String,
    pub response_url: String,
    pub confirmation_url: String,
}

impl From<CheckoutForm> for CheckoutFormResponse {
    fn from(f: CheckoutForm) -> Self {
        Self {
            gateway_url: f.gateway_url,
            merchant_id: f.merchant_id,
            account_id: f.account_id,
            description: f.description,
            reference_code: f.reference_code,
            amount: f.amount,
            tax: f.tax,
            tax_return_base: f.tax_return_base,
            currency: f.currency,
            signature: f.signature,
            test: if f.test { "1" } else { "0" }.to_string(),
            buyer_email: f.buyer_email,
            response_url: f.response_url,
            confirmation_url: f.confirmation_url,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfirmationResponse {
    pub order_id: Uuid,
    pub transaction_id: String,
    pub payment_status: String,
    pub order_status: String,
}

impl From<ConfirmationOutcome> for ConfirmationResponse {
    fn from(o: ConfirmationOutcome) -> Self {
        Self {
            order_id: o.order_id,
            transaction_id: o.transaction_id,
            payment_status: o.payment_status.to_string(),
            order_status: o.order_status.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub provider: String,
    pub transaction_id: String,
    pub status: String,
    pub amount: String,
    pub currency: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PaymentView> for PaymentResponse {
    fn from(p: PaymentView) -> Self {
        Self {
            id: p.id,
            order_id: p.order_id,
            provider: p.provider,
            transaction_id: p.transaction_id,
            status: p.status.to_string(),
            amount: p.amount.to_string(),
            currency: p.currency,
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

/// `<storefront>/checkout/result?reference=…&status=…`; status is `INVALID`
/// when the return signature did not verify.
fn result_location(storefront: &str, outcome: &ReturnOutcome) -> Result<String, AppError> {
    let status = outcome.status.map_or("INVALID", |s| s.as_str());
    let query = serde_urlencoded::to_string(vec![
        ("reference", outcome.reference.as_str()),
        ("status", status),
    ])
    .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(format!(
        "{}/checkout/result?{}",
        storefront.trim_end_matches('/'),
        query
    ))
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /payments/checkout/{order_id}
///
/// Signed PayU WebCheckout fields for a PENDING order owned by the caller.
#[utoipa::path(
    get,
    path = "/payments/checkout/{order_id}",
    params(("order_id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Form fields to post to the gateway", body = CheckoutFormResponse),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is no longer awaiting payment"),
    ),
    security(("bearer" = [])),
    tag = "payments"
)]
pub async fn checkout(
    payments: web::Data<Payments>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let form = run_blocking(move || payments.checkout_form(&user.0, order_id)).await?;
    Ok(HttpResponse::Ok().json(CheckoutFormResponse::from(form)))
}

/// POST /payments/confirmation
///
/// Server-to-server confirmation from PayU, posted as
/// `application/x-www-form-urlencoded` with at least `merchant_id`,
/// `reference_sale`, `value`, `currency`, `state_pol` and `sign`. The signature is
/// verified before anything is read from the database; the payment upsert
/// and order status change are committed together.
#[utoipa::path(
    post,
    path = "/payments/confirmation",
    responses(
        (status = 200, description = "Confirmation applied", body = ConfirmationResponse),
        (status = 400, description = "Missing field or invalid signature"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "payments"
)]
pub async fn confirmation(
    payments: web::Data<Payments>,
    form: web::Form<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    let notification = PaymentNotification::from_fields(form.into_inner())?;
    let outcome = run_blocking(move || payments.handle_confirmation(notification)).await?;
    Ok(HttpResponse::Ok().json(ConfirmationResponse::from(outcome)))
}

/// GET /payments/response
///
/// Browser return page. Read-only: redirects to the storefront with the
/// reported status and never changes the order.
#[utoipa::path(
    get,
    path = "/payments/response",
    params(
        ("referenceCode" = Option<String>, Query, description = "Order reference"),
        ("transactionState" = Option<String>, Query, description = "PayU state code"),
        ("TX_VALUE" = Option<String>, Query, description = "Charged amount"),
        ("currency" = Option<String>, Query, description = "Currency code"),
        ("merchantId" = Option<String>, Query, description = "Merchant id"),
        ("signature" = Option<String>, Query, description = "Return signature"),
    ),
    responses((status = 302, description = "Redirect to the storefront result page")),
    tag = "payments"
)]
pub async fn browser_return(
    payments: web::Data<Payments>,
    storefront: web::Data<StorefrontUrl>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    let outcome = payments.browser_return(&query);
    let location = result_location(&storefront.0, &outcome)?;
    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish())
}

/// GET /orders/{id}/payments
#[utoipa::path(
    get,
    path = "/orders/{id}/payments",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Payments recorded for the order", body = [PaymentResponse]),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn list_order_payments(
    payments: web::Data<Payments>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let items = run_blocking(move || payments.list_payments(&user.0, order_id)).await?;
    let body: Vec<PaymentResponse> = items.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}
