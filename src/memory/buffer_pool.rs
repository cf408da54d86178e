use std::collections::{HashMap, VecDeque};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

/// Buffer pool for memory reuse. Buffers are handed out as scoped
/// guards so they return to the pool on every exit path.
pub struct BufferPool {
    pools: Mutex<HashMap<usize, BufferQueue>>,
    pub total_memory: AtomicUsize,
    pub memory_limit: usize,
}

struct BufferQueue {
    buffers: VecDeque<Vec<u8>>,
}

const MAX_BUFFERS_PER_CLASS: usize = 100;

impl BufferPool {
    pub fn new(memory_limit: usize) -> Self {
        let mut pools = HashMap::new();

        // Pre-seed common buffer sizes
        for size in [256, 1024, 4096, 16384, 65536] {
            pools.insert(
                size,
                BufferQueue {
                    buffers: VecDeque::new(),
                },
            );
        }

        BufferPool {
            pools: Mutex::new(pools),
            total_memory: AtomicUsize::new(0),
            memory_limit,
        }
    }

    /// Acquire a zeroed buffer of at least `size` bytes.
    pub fn acquire(&self, size: usize) -> PooledBuffer<'_> {
        let size_class = size.next_power_of_two();

        let reused = {
            let mut pools = self.pools.lock();
            pools
                .get_mut(&size_class)
                .and_then(|queue| queue.buffers.pop_front())
        };

        let mut buf = match reused {
            Some(buf) => {
                self.total_memory.fetch_sub(size_class, Ordering::Relaxed);
                buf
            }
            None => Vec::with_capacity(size_class),
        };
        buf.clear();
        buf.resize(size, 0);

        PooledBuffer {
            pool: self,
            buf: Some(buf),
        }
    }

    fn release(&self, mut buf: Vec<u8>) {
        let size_class = buf.capacity().next_power_of_two();
        if self.total_memory.load(Ordering::Relaxed) + size_class > self.memory_limit {
            return; // over budget, let it drop
        }
        buf.clear();

        let mut pools = self.pools.lock();
        let queue = pools.entry(size_class).or_insert_with(|| BufferQueue {
            buffers: VecDeque::new(),
        });
        if queue.buffers.len() < MAX_BUFFERS_PER_CLASS {
            queue.buffers.push_back(buf);
            self.total_memory.fetch_add(size_class, Ordering::Relaxed);
        }
    }
}

/// Scoped buffer handle; returns its storage to the pool on drop.
pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buf: Option<Vec<u8>>,
}

impl PooledBuffer<'_> {
    /// Detach the buffer from the pool, keeping its contents.
    pub fn into_vec(mut self) -> Vec<u8> {
        self.buf.take().unwrap_or_default()
    }
}

impl Deref for PooledBuffer<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        self.buf.as_ref().expect("buffer already released")
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        self.buf.as_mut().expect("buffer already released")
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.release(buf);
        }
    }
}
