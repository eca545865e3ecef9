use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// How a sale entered the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleSource {
    /// Rung up on a till cart
    Checkout,
    /// Typed in from the sales page
    ManualEntry,
}

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Sales events
    SaleRecorded {
        sale_id: Uuid,
        date: NaiveDate,
        total_amount: Decimal,
        item_count: usize,
        source: SaleSource,
    },
    CheckoutRejected {
        cart_id: Option<Uuid>,
        reason: String,
    },

    // Menu events
    MenuItemCreated(Uuid),
    MenuItemUpdated(Uuid),
    MenuItemDeactivated(Uuid),

    // Inventory events
    InventoryItemCreated(Uuid),
    InventoryItemUpdated(Uuid),
    InventoryItemDeleted(Uuid),
    InventoryLowStock {
        item_id: Uuid,
        name: String,
        quantity: Decimal,
        reorder_level: Decimal,
    },

    // Expense events
    ExpenseRecorded {
        expense_id: Uuid,
        category: String,
        amount: Decimal,
    },

    PaymentMethodCreated(Uuid),

    ReportExported {
        kind: String,
        from: NaiveDate,
        to: NaiveDate,
        generated_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Creates a sender/receiver pair with the given buffer size
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event; a closed channel is logged and otherwise ignored.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("{}", e);
        }
    }
}

// Drains the channel and logs each event until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::SaleRecorded {
                sale_id,
                total_amount,
                item_count,
                source,
                ..
            } => {
                info!(
                    sale_id = %sale_id,
                    total_amount = %total_amount,
                    item_count,
                    source = ?source,
                    "Sale recorded"
                );
            }
            Event::CheckoutRejected { cart_id, reason } => {
                info!(cart_id = ?cart_id, reason = %reason, "Checkout rejected");
            }
            Event::InventoryLowStock {
                item_id,
                name,
                quantity,
                reorder_level,
            } => {
                warn!(
                    item_id = %item_id,
                    name = %name,
                    quantity = %quantity,
                    reorder_level = %reorder_level,
                    "Inventory item at or below reorder level"
                );
            }
            other => info!("Received event: {:?}", other),
        }
    }

    info!("Event channel closed; event processing loop stopped");
}
