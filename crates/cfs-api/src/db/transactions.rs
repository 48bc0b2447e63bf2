//! Write-through persistence for ledger transactions.
//!
//! The in-memory ledger is authoritative during a request; rows are
//! inserted after the in-memory commit and loaded back in log order at
//! startup.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use cfs_core::{InvoiceId, RunId, TransactionId};
use cfs_ledger::{Transaction, TransactionRef, TransactionType};

fn reference_columns(reference: &Option<TransactionRef>) -> (Option<&'static str>, Option<Uuid>) {
    match reference {
        Some(TransactionRef::PayrollRun(id)) => (Some("payroll_run"), Some(*id.as_uuid())),
        Some(TransactionRef::Invoice(id)) => (Some("invoice"), Some(*id.as_uuid())),
        None => (None, None),
    }
}

/// Insert one committed transaction.
pub async fn insert(pool: &PgPool, tx: &Transaction) -> Result<(), sqlx::Error> {
    let (ref_kind, ref_id) = reference_columns(&tx.reference);
    sqlx::query(
        r#"
        INSERT INTO ledger_transactions
            (id, tx_type, amount_cents, category, occurred_at, reference_kind, reference_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(tx.id.as_uuid())
    .bind(tx.tx_type.as_str())
    .bind(tx.amount_cents)
    .bind(&tx.category)
    .bind(tx.timestamp)
    .bind(ref_kind)
    .bind(ref_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Insert a batch of committed transactions.
pub async fn insert_batch(pool: &PgPool, txs: &[Transaction]) -> Result<(), sqlx::Error> {
    for tx in txs {
        insert(pool, tx).await?;
    }
    Ok(())
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    tx_type: String,
    amount_cents: i64,
    category: String,
    occurred_at: DateTime<Utc>,
    reference_kind: Option<String>,
    reference_id: Option<Uuid>,
}

impl TransactionRow {
    fn into_transaction(self) -> Result<Transaction, String> {
        let tx_type = match self.tx_type.as_str() {
            "INCOME" => TransactionType::Income,
            "EXPENSE" => TransactionType::Expense,
            "PAYROLL_DISBURSEMENT" => TransactionType::PayrollDisbursement,
            "INVOICE_SETTLEMENT" => TransactionType::InvoiceSettlement,
            other => return Err(format!("unknown transaction type {other:?}")),
        };
        let reference = match (self.reference_kind.as_deref(), self.reference_id) {
            (Some("payroll_run"), Some(id)) => {
                Some(TransactionRef::PayrollRun(RunId::from_uuid(id)))
            }
            (Some("invoice"), Some(id)) => Some(TransactionRef::Invoice(InvoiceId::from_uuid(id))),
            (None, _) => None,
            (Some(other), _) => return Err(format!("unknown reference kind {other:?}")),
        };
        Ok(Transaction {
            id: TransactionId::from_uuid(self.id),
            tx_type,
            amount_cents: self.amount_cents,
            category: self.category,
            timestamp: self.occurred_at,
            reference,
        })
    }
}

/// Load the full transaction log in append order.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Transaction>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TransactionRow>(
        r#"
        SELECT id, tx_type, amount_cents, category, occurred_at, reference_kind, reference_id
        FROM ledger_transactions
        ORDER BY seq ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            row.into_transaction()
                .map_err(|msg| sqlx::Error::Decode(msg.into()))
        })
        .collect()
}
