//! Recheck signals that restart the section merge.

use tokio::sync::mpsc;

/// Reason attached to the implicit signal emitted on attach.
pub const INITIAL_RECHECK_REASON: &str = "init";

/// Reason used by [`FormPipeline::check_sections`](crate::FormPipeline::check_sections).
pub const CHECK_SECTIONS_REASON: &str = "check";

/// One request to re-run the merge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecheckSignal {
    /// Opaque reason, used for logging only
    pub reason: String,
}

/// Write side of the recheck channel.
///
/// Cheap to clone and safe to use from any context. Every call is an
/// independent signal; nothing is coalesced.
#[derive(Clone, Debug)]
pub struct RecheckTrigger {
    tx: mpsc::UnboundedSender<RecheckSignal>,
}

/// Read side of the recheck channel, owned by the merge driver.
#[derive(Debug)]
pub struct RecheckSignals {
    rx: mpsc::UnboundedReceiver<RecheckSignal>,
}

impl RecheckTrigger {
    /// Create a channel whose first signal is the implicit `init` signal.
    pub fn channel() -> (RecheckTrigger, RecheckSignals) {
        let (tx, rx) = mpsc::unbounded_channel();
        let trigger = RecheckTrigger { tx };
        trigger.request_recheck(INITIAL_RECHECK_REASON);
        (trigger, RecheckSignals { rx })
    }

    /// Queue a recheck.
    ///
    /// Returns false when the receiving pipeline has been torn down.
    pub fn request_recheck(&self, reason: impl Into<String>) -> bool {
        self.tx
            .send(RecheckSignal {
                reason: reason.into(),
            })
            .is_ok()
    }

    /// Whether the receiving side is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl RecheckSignals {
    /// Next signal, or `None` once every trigger has been dropped.
    pub async fn recv(&mut self) -> Option<RecheckSignal> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_precedes_caller_signals() {
        let (trigger, mut signals) = RecheckTrigger::channel();
        assert!(trigger.request_recheck("check"));
        assert!(trigger.request_recheck("check"));

        assert_eq!(signals.recv().await.unwrap().reason, "init");
        assert_eq!(signals.recv().await.unwrap().reason, "check");
        assert_eq!(signals.recv().await.unwrap().reason, "check");
    }

    #[tokio::test]
    async fn concurrent_writers_lose_nothing() {
        let (trigger, mut signals) = RecheckTrigger::channel();
        let writers: Vec<_> = (0..8)
            .map(|n| {
                let trigger = trigger.clone();
                tokio::spawn(async move {
                    for i in 0..25 {
                        trigger.request_recheck(format!("w{n}-{i}"));
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }
        drop(trigger);

        let mut count = 0;
        while signals.recv().await.is_some() {
            count += 1;
        }
        assert_eq!(count, 1 + 8 * 25);
    }

    #[tokio::test]
    async fn closed_after_signals_dropped() {
        let (trigger, signals) = RecheckTrigger::channel();
        drop(signals);
        assert!(trigger.is_closed());
        assert!(!trigger.request_recheck("late"));
    }
}
