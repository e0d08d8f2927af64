// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Lock-free work-stealing deque.
//!
//! One owner thread pushes and pops at the bottom; any number of stealers pop
//! at the top. The only synchronisation on the hot path is a single
//! compare-and-swap on `top`, taken by stealers and by the owner when it races
//! for the last element.
//!
//! # Storage
//!
//! Elements are single machine words (see [`Word`]). The backing ring grows by
//! doubling: the owner allocates the next, larger level, copies the live range
//! `[top, bottom)` into it and publishes the new level. Earlier levels are
//! never written again and live as long as the deque, so a stealer that
//! captured an older level before a resize still reads the value it raced for.
//!
//! # Ownership
//!
//! [`deque`] returns a [`Worker`] (owner handle, `Send` but not `Sync`) and a
//! [`Stealer`] (`Clone + Send + Sync`). The type system therefore enforces that
//! `push_bottom`/`pop_bottom` are never concurrent with themselves.

use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::atomic::{fence, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::DequeError;

/// Capacity of a freshly created deque.
pub const INITIAL_CAPACITY: usize = 32;

/// Number of times the ring may double before growth fails.
const MAX_GROWTHS: usize = 26;

/// Values that travel through the deque as one atomic word.
pub trait Word: Copy + Send + 'static {
    /// Encodes the value.
    fn into_word(self) -> u64;
    /// Decodes a value produced by [`Word::into_word`].
    fn from_word(word: u64) -> Self;
}

impl Word for u64 {
    fn into_word(self) -> u64 {
        self
    }

    fn from_word(word: u64) -> Self {
        word
    }
}

impl Word for usize {
    fn into_word(self) -> u64 {
        self as u64
    }

    fn from_word(word: u64) -> Self {
        word as Self
    }
}

impl Word for u32 {
    fn into_word(self) -> u64 {
        u64::from(self)
    }

    fn from_word(word: u64) -> Self {
        word as Self
    }
}

/// Power-of-two ring of atomic words addressed modulo its capacity.
#[derive(Debug)]
struct Ring {
    slots: Box<[AtomicU64]>,
    mask: usize,
}

impl Ring {
    fn with_capacity(capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two());
        Self {
            slots: (0..capacity).map(|_| AtomicU64::new(0)).collect(),
            mask: capacity - 1,
        }
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn get(&self, index: i64) -> u64 {
        self.slots[index as usize & self.mask].load(Ordering::Relaxed)
    }

    fn put(&self, index: i64, word: u64) {
        self.slots[index as usize & self.mask].store(word, Ordering::Relaxed);
    }

    /// Copies the live range into a ring of twice the capacity.
    fn grown(&self, top: i64, bottom: i64) -> Self {
        let next = Self::with_capacity(self.capacity() * 2);
        for index in top..bottom {
            next.put(index, self.get(index));
        }
        next
    }
}

#[derive(Debug)]
struct Inner {
    /// Next index a stealer takes. Only ever incremented, always by CAS.
    top: AtomicI64,
    /// Next free index. Written by the owner only; read by stealers.
    bottom: AtomicI64,
    /// Index of the active ring: 0 is `base`, `n > 0` is `grown[n - 1]`.
    level: AtomicUsize,
    base: Ring,
    grown: [OnceLock<Ring>; MAX_GROWTHS],
}

impl Inner {
    fn new() -> Self {
        Self {
            top: AtomicI64::new(0),
            bottom: AtomicI64::new(0),
            level: AtomicUsize::new(0),
            base: Ring::with_capacity(INITIAL_CAPACITY),
            grown: std::array::from_fn(|_| OnceLock::new()),
        }
    }

    fn ring(&self, level: usize) -> &Ring {
        // A level is published only after its ring has been initialised.
        level
            .checked_sub(1)
            .and_then(|i| self.grown[i].get())
            .unwrap_or(&self.base)
    }

    fn max_capacity() -> usize {
        INITIAL_CAPACITY << MAX_GROWTHS
    }

    /// Owner only: doubles the active ring and publishes the new level.
    fn grow(&self, level: usize, top: i64, bottom: i64) -> Result<usize, DequeError> {
        let slot = self
            .grown
            .get(level)
            .ok_or(DequeError::CapacityExhausted {
                max_capacity: Self::max_capacity(),
            })?;
        let current = self.ring(level);
        slot.get_or_init(|| current.grown(top, bottom));
        let next = level + 1;
        self.level.store(next, Ordering::Release);
        Ok(next)
    }
}

/// Owner handle: pushes and pops at the bottom.
#[derive(Debug)]
pub struct Worker<T> {
    inner: Arc<Inner>,
    _marker: PhantomData<(T, Cell<()>)>,
}

/// Shared handle: steals from the top.
#[derive(Debug)]
pub struct Stealer<T> {
    inner: Arc<Inner>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Stealer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _marker: PhantomData,
        }
    }
}

/// Creates an empty deque and returns its owner and stealer handles.
pub fn deque<T: Word>() -> (Worker<T>, Stealer<T>) {
    let inner = Arc::new(Inner::new());
    let stealer = Stealer {
        inner: Arc::clone(&inner),
        _marker: PhantomData,
    };
    (
        Worker {
            inner,
            _marker: PhantomData,
        },
        stealer,
    )
}

impl<T: Word> Worker<T> {
    /// Returns another stealer for this deque.
    pub fn stealer(&self) -> Stealer<T> {
        Stealer {
            inner: Arc::clone(&self.inner),
            _marker: PhantomData,
        }
    }

    /// Pushes `item` at the bottom, doubling the ring when it is nearly full.
    pub fn push_bottom(&self, item: T) -> Result<(), DequeError> {
        let inner = &*self.inner;
        let bottom = inner.bottom.load(Ordering::Relaxed);
        let top = inner.top.load(Ordering::Acquire);
        let mut level = inner.level.load(Ordering::Relaxed);

        if bottom - top >= inner.ring(level).capacity() as i64 - 1 {
            level = inner.grow(level, top, bottom)?;
        }

        inner.ring(level).put(bottom, item.into_word());
        inner.bottom.store(bottom + 1, Ordering::Release);
        Ok(())
    }

    /// Pops the most recently pushed item.
    ///
    /// Returns `None` when the deque is empty or a stealer won the race for
    /// the last remaining item.
    pub fn pop_bottom(&self) -> Option<T> {
        let inner = &*self.inner;
        let bottom = inner.bottom.load(Ordering::Relaxed) - 1;
        let ring = inner.ring(inner.level.load(Ordering::Relaxed));
        inner.bottom.store(bottom, Ordering::Relaxed);
        // The bottom write must be visible before top is read.
        fence(Ordering::SeqCst);
        let top = inner.top.load(Ordering::Relaxed);

        let size = bottom - top;
        if size < 0 {
            inner.bottom.store(top, Ordering::Relaxed);
            return None;
        }

        let word = ring.get(bottom);
        if size > 0 {
            return Some(T::from_word(word));
        }

        // Last element: race the stealers for it.
        let won = inner
            .top
            .compare_exchange(top, top + 1, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok();
        inner.bottom.store(top + 1, Ordering::Relaxed);
        won.then(|| T::from_word(word))
    }

    /// Best-effort emptiness snapshot.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Best-effort element count.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Current ring capacity.
    pub fn capacity(&self) -> usize {
        self.inner
            .ring(self.inner.level.load(Ordering::Relaxed))
            .capacity()
    }
}

impl<T: Word> Stealer<T> {
    /// Steals the oldest item.
    ///
    /// Returns `None` when the deque looks empty or this call lost a race to
    /// another stealer or to the owner; callers retry or pick another victim.
    pub fn pop_top(&self) -> Option<T> {
        let inner = &*self.inner;
        let top = inner.top.load(Ordering::Acquire);
        fence(Ordering::SeqCst);
        let bottom = inner.bottom.load(Ordering::Acquire);
        if bottom - top <= 0 {
            return None;
        }

        let word = inner.ring(inner.level.load(Ordering::Acquire)).get(top);
        inner
            .top
            .compare_exchange(top, top + 1, Ordering::SeqCst, Ordering::Relaxed)
            .ok()
            .map(|_| T::from_word(word))
    }

    /// Best-effort emptiness snapshot.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Inner {
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn len(&self) -> usize {
        let bottom = self.bottom.load(Ordering::Acquire);
        let top = self.top.load(Ordering::Acquire);
        (bottom - top).max(0) as usize
    }
}
