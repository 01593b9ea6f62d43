//! Fixed-size datagram buffer pool shared by every agent's read loop.
//!
//! Grounded on the teacher's socket-option setup in `util::bind_udp_socket`
//! for "one small helper, reused by every listener" and on the general
//! free-list shape `v3::engine::EngineCache` uses for its own
//! lock-guarded `Vec` (spec: "lock-free or sync-primitive-backed free
//! list"; a `parking_lot::Mutex<Vec<_>>` is the sync-primitive option and
//! matches every other shared-state guard already in this crate).

use parking_lot::Mutex;

/// Datagrams this size or smaller reuse pooled buffers; anything larger is
/// a one-off allocation that is dropped instead of returned (spec:
/// "buffers larger than the pool size are not returned to the pool").
pub const BUFFER_SIZE: usize = 4096;

/// A free list of reusable 4 KiB read buffers.
pub struct BufferPool {
    free: Mutex<Vec<Vec<u8>>>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self { free: Mutex::new(Vec::new()) }
    }

    /// Take a buffer from the pool, allocating a fresh one if empty.
    pub fn acquire(&self) -> Vec<u8> {
        self.free
            .lock()
            .pop()
            .unwrap_or_else(|| vec![0u8; BUFFER_SIZE])
    }

    /// Return a buffer for reuse. Buffers that grew past [`BUFFER_SIZE`]
    /// (an oversize read reallocated them) are dropped instead of pooled.
    pub fn release(&self, mut buf: Vec<u8>) {
        if buf.capacity() > BUFFER_SIZE {
            return;
        }
        buf.clear();
        buf.resize(BUFFER_SIZE, 0);
        self.free.lock().push(buf);
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_then_release_reuses_buffer() {
        let pool = BufferPool::new();
        let buf = pool.acquire();
        assert_eq!(buf.len(), BUFFER_SIZE);
        pool.release(buf);
        assert_eq!(pool.free.lock().len(), 1);
    }

    #[test]
    fn oversize_buffer_is_not_returned() {
        let pool = BufferPool::new();
        let oversize = vec![0u8; BUFFER_SIZE * 4];
        pool.release(oversize);
        assert_eq!(pool.free.lock().len(), 0);
    }
}
