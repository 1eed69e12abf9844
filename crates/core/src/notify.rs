use tokio::sync::broadcast;
use tracing::debug;

/// Outcome notifications consumed by the UI layer.
///
/// `Confirmed` fires at most once per reference. `Failed` carries the
/// gateway's reason verbatim; retrying a failed payment requires a brand-new
/// initiation, never a re-verify of the failed reference. `Pending` exposes
/// the reference so the user can trigger a manual re-verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentNotification {
    Confirmed {
        reference: String,
        appointment_id: String,
    },
    Failed {
        reference: String,
        reason: String,
    },
    Pending {
        reference: String,
    },
}

/// Sink for payment notifications. Injected so tests can assert on the
/// exactly-once contract.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: PaymentNotification);
}

/// Broadcast-backed sink; UI subscribers each get their own receiver.
pub struct BroadcastSink {
    tx: broadcast::Sender<PaymentNotification>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PaymentNotification> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(64)
    }
}

impl NotificationSink for BroadcastSink {
    fn notify(&self, notification: PaymentNotification) {
        debug!(?notification, "payment notification");
        // send only errors when there are no subscribers
        let _ = self.tx.send(notification);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_subscriber() {
        let sink = BroadcastSink::default();
        let mut rx = sink.subscribe();
        sink.notify(PaymentNotification::Pending {
            reference: "R1".to_string(),
        });
        let received = rx.recv().await.unwrap();
        assert_eq!(
            received,
            PaymentNotification::Pending {
                reference: "R1".to_string()
            }
        );
    }
}
