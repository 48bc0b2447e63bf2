//! # Invoices
//!
//! Invoice lifecycle: Draft → Issued → PartiallyPaid (repeatable) →
//! Paid, with Voided reachable from Draft and Issued only. Every payment
//! records exactly one Income transaction against the ledger, in the
//! same critical section as the invoice mutation, so `amount_paid` and
//! the ledger can never disagree.
//!
//! `amount_paid` may never exceed `amount_due` — overpayments are
//! rejected before anything is recorded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use cfs_core::InvoiceId;

use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::transaction::{Transaction, TransactionDraft, TransactionRef, TransactionType};

/// Ledger category under which invoice payments are recorded.
const PAYMENT_CATEGORY: &str = "Invoices";

/// Invoice lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    /// Being prepared; not yet payable.
    Draft,
    /// Sent to the payer; payable.
    Issued,
    /// Some, but not all, of the amount due has been paid.
    PartiallyPaid,
    /// Fully paid. Terminal.
    Paid,
    /// Cancelled before any payment. Terminal.
    Voided,
}

impl InvoiceStatus {
    /// String form used in the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Issued => "ISSUED",
            Self::PartiallyPaid => "PARTIALLY_PAID",
            Self::Paid => "PAID",
            Self::Voided => "VOIDED",
        }
    }

    /// Whether no further lifecycle changes are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Voided)
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An invoice and its payment progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique invoice id.
    pub id: InvoiceId,
    /// Current lifecycle status.
    pub status: InvoiceStatus,
    /// Total due in cents.
    pub amount_due_cents: i64,
    /// Paid so far in cents. Never exceeds `amount_due_cents`.
    pub amount_paid_cents: i64,
    /// When the invoice was created.
    pub created_at: DateTime<Utc>,
}

/// All invoices, keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceBook {
    invoices: BTreeMap<InvoiceId, Invoice>,
}

impl InvoiceBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a Draft invoice for `amount_due_cents`.
    pub fn create(
        &mut self,
        amount_due_cents: i64,
        created_at: DateTime<Utc>,
    ) -> Result<InvoiceId, LedgerError> {
        if amount_due_cents <= 0 {
            return Err(LedgerError::InvalidAmount {
                tx_type: TransactionType::Income,
                amount_cents: amount_due_cents,
                reason: "invoice amount due must be positive",
            });
        }
        let id = InvoiceId::new();
        self.invoices.insert(
            id,
            Invoice {
                id,
                status: InvoiceStatus::Draft,
                amount_due_cents,
                amount_paid_cents: 0,
                created_at,
            },
        );
        Ok(id)
    }

    /// Look up an invoice.
    pub fn get(&self, id: InvoiceId) -> Option<&Invoice> {
        self.invoices.get(&id)
    }

    /// List invoices in id order.
    pub fn list(&self) -> impl Iterator<Item = &Invoice> {
        self.invoices.values()
    }

    fn get_mut(&mut self, id: InvoiceId) -> Result<&mut Invoice, LedgerError> {
        self.invoices
            .get_mut(&id)
            .ok_or(LedgerError::InvoiceNotFound { id })
    }

    /// Issue a Draft invoice, making it payable.
    pub fn issue(&mut self, id: InvoiceId) -> Result<&Invoice, LedgerError> {
        let invoice = self.get_mut(id)?;
        if invoice.status != InvoiceStatus::Draft {
            return Err(LedgerError::InvalidInvoiceTransition {
                id,
                operation: "issue",
                status: invoice.status.as_str(),
            });
        }
        invoice.status = InvoiceStatus::Issued;
        Ok(invoice)
    }

    /// Void an invoice. Legal only from Draft or Issued (before any
    /// payment has been accepted).
    pub fn void(&mut self, id: InvoiceId) -> Result<&Invoice, LedgerError> {
        let invoice = self.get_mut(id)?;
        if !matches!(invoice.status, InvoiceStatus::Draft | InvoiceStatus::Issued) {
            return Err(LedgerError::InvalidInvoiceTransition {
                id,
                operation: "void",
                status: invoice.status.as_str(),
            });
        }
        invoice.status = InvoiceStatus::Voided;
        Ok(invoice)
    }

    /// Record a payment of `payment_cents` against an invoice.
    ///
    /// Legal on Issued and PartiallyPaid invoices. Writes exactly one
    /// Income transaction referencing the invoice; if the ledger append
    /// fails the invoice is untouched. A payment completing the amount
    /// due moves the invoice to Paid; anything less, to PartiallyPaid;
    /// anything more fails with [`LedgerError::Overpayment`].
    pub fn record_payment(
        &mut self,
        id: InvoiceId,
        payment_cents: i64,
        paid_at: DateTime<Utc>,
        ledger: &mut Ledger,
    ) -> Result<Transaction, LedgerError> {
        let invoice = self.get_mut(id)?;
        if payment_cents <= 0 {
            return Err(LedgerError::InvalidAmount {
                tx_type: TransactionType::Income,
                amount_cents: payment_cents,
                reason: "payment must be positive",
            });
        }
        if !matches!(
            invoice.status,
            InvoiceStatus::Issued | InvoiceStatus::PartiallyPaid
        ) {
            return Err(LedgerError::InvalidInvoiceTransition {
                id,
                operation: "record a payment",
                status: invoice.status.as_str(),
            });
        }
        let new_paid = invoice
            .amount_paid_cents
            .checked_add(payment_cents)
            .ok_or(LedgerError::ArithmeticOverflow {
                operation: "record_payment",
            })?;
        if new_paid > invoice.amount_due_cents {
            return Err(LedgerError::Overpayment {
                id,
                payment_cents,
                amount_paid_cents: invoice.amount_paid_cents,
                amount_due_cents: invoice.amount_due_cents,
            });
        }

        // Ledger first: if the append fails, the invoice is untouched.
        let transaction = ledger.record(TransactionDraft {
            tx_type: TransactionType::Income,
            amount_cents: payment_cents,
            category: PAYMENT_CATEGORY.to_string(),
            timestamp: paid_at,
            reference: Some(TransactionRef::Invoice(id)),
        })?;

        invoice.amount_paid_cents = new_paid;
        invoice.status = if new_paid == invoice.amount_due_cents {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::PartiallyPaid
        };
        Ok(transaction)
    }
}
