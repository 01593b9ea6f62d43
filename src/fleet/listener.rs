//! Per-agent read loop: one task per UDP socket, one socket per simulated
//! device.
//!
//! Grounded on spec's §4.7 read-loop description ("acquire a buffer, read
//! with a short deadline, dispatch to `HandlePacket`, write the reply
//! synchronously, return the buffer") and on the teacher's `trap::cron`
//! pattern for a task that polls on a timeout and checks a shutdown signal
//! each time it wakes rather than blocking on it directly.

use super::buffer_pool::{BufferPool, BUFFER_SIZE};
use crate::agent::{HandleOutcome, VirtualAgent};
use crate::transport::{AgentTransport, AgentUdpTransport, MAX_DATAGRAM_SIZE};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How long a single read blocks before the loop re-checks `shutdown`.
const READ_DEADLINE: Duration = Duration::from_secs(1);

/// Drive one agent's socket until `shutdown` is cancelled.
///
/// Every iteration: peek the next datagram's length (so oversize reads get
/// a one-off buffer instead of truncating into a pooled one), acquire a
/// buffer of the right size, read the datagram into it, hand it to the
/// agent, and write back any reply on the same socket before returning the
/// buffer to the pool.
pub async fn run(agent: Arc<VirtualAgent>, transport: Arc<AgentUdpTransport>, pool: Arc<BufferPool>, shutdown: CancellationToken) {
    let mut scratch = vec![0u8; MAX_DATAGRAM_SIZE];

    loop {
        if shutdown.is_cancelled() {
            return;
        }

        let len = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return,
            result = transport.peek_len_with_deadline(&mut scratch, READ_DEADLINE) => match result {
                Ok(Some(n)) => n,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(device = agent.device_id(), error = %e, "agent socket read failed");
                    continue;
                }
            },
        };

        let mut buf = if len <= BUFFER_SIZE { pool.acquire() } else { vec![0u8; len] };

        let (n, peer) = match transport.recv_with_deadline(&mut buf, READ_DEADLINE).await {
            Ok(Some(result)) => result,
            Ok(None) => {
                pool.release(buf);
                continue;
            }
            Err(e) => {
                tracing::warn!(device = agent.device_id(), error = %e, "agent socket read failed");
                pool.release(buf);
                continue;
            }
        };

        match agent.handle_packet(&buf[..n], peer).await {
            HandleOutcome::Reply(response) => {
                if let Err(e) = transport.send_to(&response, peer).await {
                    tracing::warn!(device = agent.device_id(), %peer, error = %e, "failed to send reply");
                }
            }
            HandleOutcome::Drop => {}
        }

        pool.release(buf);
    }
}
