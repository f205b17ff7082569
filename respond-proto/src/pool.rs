use std::ops::Deref;
use std::ops::DerefMut;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::sync::PoisonError;

/// Initial capacity of a buffer rented from the [global](BufferPool::global) pool.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;

/// Maximum number of idle buffers kept by the [global](BufferPool::global) pool.
pub const DEFAULT_MAX_RETAINED: usize = 256;

/// A pool of reusable byte buffers.
///
/// This is a cheap handle: clones share the same pool.
#[derive(Clone)]
pub struct BufferPool(Arc<PoolInner>);

struct PoolInner {
    idle: Mutex<Vec<Vec<u8>>>,
    buffer_capacity: usize,
    max_retained: usize,
    rented: AtomicUsize,
    released: AtomicUsize,
}

impl BufferPool {
    /// Creates a new pool.
    ///
    /// Fresh buffers are allocated with `buffer_capacity` bytes; at most
    /// `max_retained` released buffers are kept for reuse.
    pub fn new(buffer_capacity: usize, max_retained: usize) -> Self {
        Self(Arc::new(PoolInner {
            idle: Mutex::new(Vec::new()),
            buffer_capacity,
            max_retained,
            rented: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        }))
    }

    /// Returns the process-wide pool.
    pub fn global() -> &'static BufferPool {
        static GLOBAL: OnceLock<BufferPool> = OnceLock::new();
        GLOBAL.get_or_init(|| BufferPool::new(DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_RETAINED))
    }

    /// Rents an empty buffer.
    ///
    /// The buffer goes back to the pool when the returned [`PooledBuffer`]
    /// is released or dropped.
    pub fn rent(&self) -> PooledBuffer {
        let buffer = self
            .0
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(self.0.buffer_capacity));

        debug_assert!(buffer.is_empty());

        self.0.rented.fetch_add(1, Ordering::Relaxed);

        PooledBuffer {
            buffer,
            pool: self.clone(),
        }
    }

    /// Total number of rents since creation.
    #[inline(always)]
    pub fn rented(&self) -> usize {
        self.0.rented.load(Ordering::Relaxed)
    }

    /// Total number of releases since creation.
    #[inline(always)]
    pub fn released(&self) -> usize {
        self.0.released.load(Ordering::Relaxed)
    }

    /// Number of buffers currently rented and not yet released.
    #[inline(always)]
    pub fn outstanding(&self) -> usize {
        self.rented().saturating_sub(self.released())
    }

    /// Number of idle buffers ready for reuse.
    pub fn idle(&self) -> usize {
        self.0
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn give_back(&self, mut buffer: Vec<u8>) {
        buffer.clear();

        let mut idle = self.0.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.0.max_retained {
            idle.push(buffer);
        }
        drop(idle);

        self.0.released.fetch_add(1, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("rented", &self.rented())
            .field("released", &self.released())
            .finish()
    }
}

/// A buffer rented from a [`BufferPool`].
///
/// It is given back exactly once: either by [`PooledBuffer::release`] or on drop.
pub struct PooledBuffer {
    buffer: Vec<u8>,
    pool: BufferPool,
}

impl PooledBuffer {
    /// Gives the buffer back to its pool.
    #[inline(always)]
    pub fn release(self) {
        drop(self)
    }
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        self.pool.give_back(std::mem::take(&mut self.buffer));
    }
}
