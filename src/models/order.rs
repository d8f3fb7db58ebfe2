use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// An order record handed to the ledger by the upstream parser.
///
/// Only the identity and a handful of descriptive fields are kept; the field
/// names match the upstream report columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Globally unique order identifier
    #[serde(rename = "order-id")]
    pub order_id: String,
    /// When the order was placed, as reported upstream
    #[serde(rename = "purchase-date")]
    pub purchase_date: String,
    /// When the order was paid, as reported upstream
    #[serde(rename = "payments-date")]
    pub payments_date: String,
    /// Buyer name. Required by the store; a missing value is rejected for
    /// that row only.
    #[serde(rename = "buyer-name", default)]
    pub buyer_name: Option<String>,
}

impl OrderRecord {
    pub fn new(
        order_id: impl Into<String>,
        purchase_date: impl Into<String>,
        payments_date: impl Into<String>,
        buyer_name: impl Into<String>,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            purchase_date: purchase_date.into(),
            payments_date: payments_date.into(),
            buyer_name: Some(buyer_name.into()),
        }
    }
}

/// An order row as persisted in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredOrder {
    pub order_id: String,
    pub purchase_date: Option<String>,
    pub payments_date: Option<String>,
    pub buyer_name: String,
    /// Set by the store on write (UTC)
    pub last_update: NaiveDateTime,
    /// Calendar date (`YYYY-MM-DD`) the order was ingested
    pub date_added: String,
    /// Owning run
    pub run_id: i64,
}

/// Outcome of inserting a batch of orders under one run.
///
/// Insertion is best-effort per row, so a batch can partially succeed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InsertSummary {
    pub run_id: i64,
    /// Order ids written, in input order
    pub inserted: Vec<String>,
    /// Rows that were rejected, with the storage error
    pub failed: Vec<FailedInsert>,
}

impl InsertSummary {
    pub fn new(run_id: i64) -> Self {
        Self {
            run_id,
            ..Default::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A row that could not be inserted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedInsert {
    pub order_id: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_upstream_keys() {
        let json = r#"{
            "order-id": "026-1234567-1234567",
            "purchase-date": "2024-01-01T10:00:00+00:00",
            "payments-date": "2024-01-02T10:00:00+00:00",
            "buyer-name": "Bob"
        }"#;
        let order: OrderRecord = serde_json::from_str(json).unwrap();
        assert_eq!(order.order_id, "026-1234567-1234567");
        assert_eq!(order.buyer_name.as_deref(), Some("Bob"));
    }

    #[test]
    fn test_missing_buyer_name_is_none() {
        let json = r#"{"order-id": "A1", "purchase-date": "", "payments-date": ""}"#;
        let order: OrderRecord = serde_json::from_str(json).unwrap();
        assert!(order.buyer_name.is_none());
    }

    #[test]
    fn test_missing_order_id_rejected() {
        let json = r#"{"purchase-date": "", "payments-date": "", "buyer-name": "Bob"}"#;
        assert!(serde_json::from_str::<OrderRecord>(json).is_err());
    }

    #[test]
    fn test_insert_summary_complete() {
        let mut summary = InsertSummary::new(3);
        summary.inserted.push("A1".into());
        assert!(summary.is_complete());

        summary.failed.push(FailedInsert {
            order_id: "A2".into(),
            reason: "UNIQUE constraint failed: orders.order_id".into(),
        });
        assert!(!summary.is_complete());
    }
}
