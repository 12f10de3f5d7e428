use chrono::Utc;
use diesel::prelude::*;
use diesel::upsert::excluded;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::OrderStatus;
use crate::domain::payment::{PaymentRecord, PaymentView};
use crate::domain::ports::PaymentRepository;
use crate::schema::{orders, payments};

use super::models::{NewPaymentRow, PaymentRow};

pub struct DieselPaymentRepository {
    pool: DbPool,
}

impl DieselPaymentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl PaymentRepository for DieselPaymentRepository {
    fn record_confirmation(
        &self,
        payment: &PaymentRecord,
        order_status: OrderStatus,
    ) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Upsert the payment; redeliveries of one transaction id update in place
            diesel::insert_into(payments::table)
                .values(&NewPaymentRow {
                    id: Uuid::new_v4(),
                    order_id: payment.order_id,
                    provider: &payment.provider,
                    transaction_id: &payment.transaction_id,
                    status: payment.status.as_str(),
                    amount: &payment.amount,
                    currency: &payment.currency,
                    metadata: &payment.metadata,
                })
                .on_conflict(payments::transaction_id)
                .do_update()
                .set((
                    payments::status.eq(excluded(payments::status)),
                    payments::amount.eq(excluded(payments::amount)),
                    payments::currency.eq(excluded(payments::currency)),
                    payments::metadata.eq(excluded(payments::metadata)),
                    payments::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;

            // 2. Move the order along in the same transaction
            let updated = diesel::update(orders::table.find(payment.order_id))
                .set((
                    orders::status.eq(order_status.as_str()),
                    orders::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;
            if updated == 0 {
                return Err(DomainError::not_found("Order"));
            }

            Ok(())
        })
    }

    fn list_for_order(&self, order_id: Uuid) -> Result<Vec<PaymentView>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows: Vec<PaymentRow> = payments::table
            .filter(payments::order_id.eq(order_id))
            .order(payments::created_at.asc())
            .select(PaymentRow::as_select())
            .load(&mut conn)?;

        rows.into_iter()
            .map(|p| {
                Ok(PaymentView {
                    id: p.id,
                    order_id: p.order_id,
                    provider: p.provider,
                    transaction_id: p.transaction_id,
                    status: p.status.parse()?,
                    amount: p.amount,
                    currency: p.currency,
                    created_at: p.created_at,
                    updated_at: p.updated_at,
                })
            })
            .collect()
    }
}
