//! PostgreSQL bill store.

use super::store::{bill_not_found, payment_not_found, BillStore};
use crate::models::{Bill, BillRow, LineItem, NewBill, NewPayment, PaymentLine, PaymentRecord};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::settlement::validate_claims;
use crate::utils::random_code;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct PaymentRow {
    payment_id: String,
    creator: String,
    created_utc: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct PaymentLineRow {
    payment_id: String,
    item_index: i32,
    amount: Decimal,
}

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::DatabaseError(anyhow::anyhow!("{}: {}", context, e))
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    #[instrument(skip(database_url), fields(service = "bill-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn payments_for(
        conn: &mut PgConnection,
        bill_id: Uuid,
    ) -> Result<Vec<PaymentRecord>, AppError> {
        let payments = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT payment_id, creator, created_utc
            FROM payments
            WHERE bill_id = $1
            ORDER BY seq
            "#,
        )
        .bind(bill_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error("Failed to load payments"))?;

        let lines = sqlx::query_as::<_, PaymentLineRow>(
            r#"
            SELECT pli.payment_id, pli.item_index, pli.amount
            FROM payment_line_items pli
            JOIN payments p ON p.payment_id = pli.payment_id
            WHERE p.bill_id = $1
            ORDER BY p.seq, pli.line_no
            "#,
        )
        .bind(bill_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error("Failed to load payment lines"))?;

        let mut lines_by_payment: HashMap<String, Vec<PaymentLine>> = HashMap::new();
        for line in lines {
            lines_by_payment
                .entry(line.payment_id)
                .or_default()
                .push(PaymentLine {
                    line_item_ref: line.item_index,
                    amount: line.amount,
                });
        }

        Ok(payments
            .into_iter()
            .map(|row| PaymentRecord {
                line_items: lines_by_payment.remove(&row.payment_id).unwrap_or_default(),
                id: row.payment_id,
                creator: row.creator,
                created_on: row.created_utc,
            })
            .collect())
    }
}

#[async_trait]
impl BillStore for Database {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    #[instrument(skip(self, bill), fields(share_code = %bill.share_code))]
    async fn create_bill(&self, bill: NewBill) -> Result<Bill, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_bill"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(db_error("Failed to begin transaction"))?;

        let row = sqlx::query_as::<_, BillRow>(
            r#"
            INSERT INTO bills (bill_id, share_code, name, bill_date, currency, service_fee, payment_method)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING bill_id, share_code, name, bill_date, currency, service_fee, payment_method, created_utc, number_of_payments
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&bill.share_code)
        .bind(&bill.name)
        .bind(bill.date)
        .bind(&bill.currency)
        .bind(bill.service_fee)
        .bind(&bill.payment_method)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => AppError::Conflict(
                anyhow::anyhow!("Bill '{}' already exists", bill.share_code),
            ),
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create bill: {}", e)),
        })?;

        for item in &bill.line_items {
            sqlx::query(
                r#"
                INSERT INTO bill_line_items (bill_id, item_index, description, amount, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(row.bill_id)
            .bind(item.index)
            .bind(&item.description)
            .bind(item.amount)
            .bind(item.unit_price)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to insert line item"))?;
        }

        tx.commit().await.map_err(db_error("Failed to commit transaction"))?;
        timer.observe_duration();

        info!(bill_id = %row.bill_id, item_count = bill.line_items.len(), "Bill stored");

        Ok(row.into_bill(bill.line_items, Vec::new()))
    }

    #[instrument(skip(self))]
    async fn load_bill(&self, share_code: &str) -> Result<Bill, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["load_bill"])
            .start_timer();

        // All reads see one snapshot, so a payment removed mid-load never
        // shows up without its lines.
        let mut tx = self.pool.begin().await.map_err(db_error("Failed to begin transaction"))?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to set isolation level"))?;

        let row = sqlx::query_as::<_, BillRow>(
            r#"
            SELECT bill_id, share_code, name, bill_date, currency, service_fee, payment_method, created_utc, number_of_payments
            FROM bills
            WHERE share_code = $1
            "#,
        )
        .bind(share_code)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to load bill"))?
        .ok_or_else(|| bill_not_found(share_code))?;

        let line_items = sqlx::query_as::<_, LineItem>(
            r#"
            SELECT item_index, description, amount, unit_price
            FROM bill_line_items
            WHERE bill_id = $1
            ORDER BY item_index
            "#,
        )
        .bind(row.bill_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error("Failed to load line items"))?;

        let payments = Self::payments_for(&mut tx, row.bill_id).await?;
        tx.commit().await.map_err(db_error("Failed to commit transaction"))?;
        timer.observe_duration();

        Ok(row.into_bill(line_items, payments))
    }

    #[instrument(skip(self, payment), fields(share_code = %share_code, line_count = payment.line_items.len()))]
    async fn append_payment(
        &self,
        share_code: &str,
        payment: NewPayment,
    ) -> Result<PaymentRecord, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["append_payment"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(db_error("Failed to begin transaction"))?;

        // Serializes concurrent claims on the same bill.
        let bill_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT bill_id FROM bills WHERE share_code = $1 FOR UPDATE",
        )
        .bind(share_code)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to lock bill"))?
        .ok_or_else(|| bill_not_found(share_code))?;

        let line_items = sqlx::query_as::<_, LineItem>(
            "SELECT item_index, description, amount, unit_price FROM bill_line_items WHERE bill_id = $1",
        )
        .bind(bill_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error("Failed to load line items"))?;

        let claimed: HashMap<i32, Decimal> = sqlx::query_as::<_, (i32, Decimal)>(
            r#"
            SELECT pli.item_index, SUM(pli.amount)
            FROM payment_line_items pli
            JOIN payments p ON p.payment_id = pli.payment_id
            WHERE p.bill_id = $1
            GROUP BY pli.item_index
            "#,
        )
        .bind(bill_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error("Failed to sum claims"))?
        .into_iter()
        .collect();

        validate_claims(&line_items, &claimed, &payment.line_items)?;

        let payment_id = random_code();
        sqlx::query(
            "INSERT INTO payments (payment_id, bill_id, creator, created_utc) VALUES ($1, $2, $3, $4)",
        )
        .bind(&payment_id)
        .bind(bill_id)
        .bind(&payment.creator)
        .bind(payment.created_on)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to insert payment"))?;

        for (line_no, line) in payment.line_items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO payment_line_items (payment_id, line_no, item_index, amount)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(&payment_id)
            .bind(line_no as i32)
            .bind(line.line_item_ref)
            .bind(line.amount)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to insert payment line"))?;
        }

        sqlx::query("UPDATE bills SET number_of_payments = number_of_payments + 1 WHERE bill_id = $1")
            .bind(bill_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to update payment count"))?;

        tx.commit().await.map_err(db_error("Failed to commit transaction"))?;
        timer.observe_duration();

        info!(payment_id = %payment_id, "Payment appended");

        Ok(PaymentRecord {
            id: payment_id,
            creator: payment.creator,
            created_on: payment.created_on,
            line_items: payment.line_items,
        })
    }

    #[instrument(skip(self))]
    async fn remove_payment(&self, share_code: &str, payment_id: &str) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["remove_payment"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(db_error("Failed to begin transaction"))?;

        let bill_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT bill_id FROM bills WHERE share_code = $1 FOR UPDATE",
        )
        .bind(share_code)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to lock bill"))?
        .ok_or_else(|| bill_not_found(share_code))?;

        let deleted = sqlx::query("DELETE FROM payments WHERE payment_id = $1 AND bill_id = $2")
            .bind(payment_id)
            .bind(bill_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete payment"))?;

        if deleted.rows_affected() == 0 {
            return Err(payment_not_found(payment_id));
        }

        sqlx::query("UPDATE bills SET number_of_payments = number_of_payments - 1 WHERE bill_id = $1")
            .bind(bill_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to update payment count"))?;

        tx.commit().await.map_err(db_error("Failed to commit transaction"))?;
        timer.observe_duration();

        info!("Payment removed");
        Ok(())
    }
}
