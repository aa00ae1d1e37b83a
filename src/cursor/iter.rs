//! Pull-based document sequences and the skip/limit decorators.
//!
//! Decorators count with an advance-and-compare atomic so that concurrent
//! pullers against one instance still observe the exact bound. Ordering
//! among concurrent pullers is unspecified.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::document::Document;
use crate::errors::DbError;

/// A lazily produced, closable sequence of documents.
pub trait DocIter: Send + Sync {
    /// Pulls the next document; `Ok(None)` once exhausted.
    ///
    /// # Errors
    /// Whatever the underlying source reports.
    fn next_doc(&self) -> Result<Option<Document>, DbError>;

    /// Releases the sequence. Idempotent; later pulls return `Ok(None)`.
    fn close(&self);
}

pub type BoxedIter = Box<dyn DocIter>;

/// In-memory sequence over already materialized documents.
pub struct VecIter {
    docs: Mutex<VecDeque<Document>>,
    closed: AtomicBool,
}

impl VecIter {
    #[must_use]
    pub fn new(docs: Vec<Document>) -> Self {
        Self { docs: Mutex::new(docs.into()), closed: AtomicBool::new(false) }
    }

    #[must_use]
    pub fn boxed(docs: Vec<Document>) -> BoxedIter {
        Box::new(Self::new(docs))
    }
}

impl DocIter for VecIter {
    fn next_doc(&self) -> Result<Option<Document>, DbError> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(None);
        }
        Ok(self.docs.lock().pop_front())
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.docs.lock().clear();
        }
    }
}

/// Discards the first `n` documents of `base`.
pub struct SkipIter {
    base: BoxedIter,
    n: u64,
    pos: AtomicU64,
    closed: AtomicBool,
}

impl DocIter for SkipIter {
    fn next_doc(&self) -> Result<Option<Document>, DbError> {
        loop {
            if self.closed.load(Ordering::Acquire) {
                return Ok(None);
            }
            let Some(doc) = self.base.next_doc()? else {
                return Ok(None);
            };
            if self.pos.fetch_add(1, Ordering::AcqRel) >= self.n {
                return Ok(Some(doc));
            }
        }
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.base.close();
        }
    }
}

/// Yields at most `n` documents of `base`, then reports exhaustion forever.
pub struct LimitIter {
    base: BoxedIter,
    n: u64,
    pos: AtomicU64,
    done: AtomicBool,
    closed: AtomicBool,
}

impl DocIter for LimitIter {
    fn next_doc(&self) -> Result<Option<Document>, DbError> {
        if self.done.load(Ordering::Acquire) {
            return Ok(None);
        }
        if self.pos.fetch_add(1, Ordering::AcqRel) >= self.n {
            self.done.store(true, Ordering::Release);
            return Ok(None);
        }
        let next = self.base.next_doc()?;
        if next.is_none() {
            self.done.store(true, Ordering::Release);
        }
        Ok(next)
    }

    fn close(&self) {
        self.done.store(true, Ordering::Release);
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.base.close();
        }
    }
}

/// Wraps `base` so its first `n` documents are discarded. `n == 0` returns
/// `base` itself.
///
/// # Panics
/// If `n` is negative; callers validate user input before reaching here.
#[must_use]
pub fn skip(base: BoxedIter, n: i64) -> BoxedIter {
    assert!(n >= 0, "skip must be non-negative, got {n}");
    let n = n.unsigned_abs();
    if n == 0 {
        return base;
    }
    Box::new(SkipIter { base, n, pos: AtomicU64::new(0), closed: AtomicBool::new(false) })
}

/// Wraps `base` so at most `n` documents are produced. `n == 0` means
/// unlimited and returns `base` itself.
///
/// # Panics
/// If `n` is negative.
#[must_use]
pub fn limit(base: BoxedIter, n: i64) -> BoxedIter {
    assert!(n >= 0, "limit must be non-negative, got {n}");
    let n = n.unsigned_abs();
    if n == 0 {
        return base;
    }
    Box::new(LimitIter {
        base,
        n,
        pos: AtomicU64::new(0),
        done: AtomicBool::new(false),
        closed: AtomicBool::new(false),
    })
}

/// Pulls up to `n` documents. The flag is true when the sequence ran out
/// before `n` documents were produced.
///
/// # Errors
/// Propagates the sequence's error.
pub fn take_batch(iter: &dyn DocIter, n: usize) -> Result<(Vec<Document>, bool), DbError> {
    let mut out = Vec::with_capacity(n.min(1024));
    while out.len() < n {
        match iter.next_doc()? {
            Some(d) => out.push(d),
            None => return Ok((out, true)),
        }
    }
    Ok((out, false))
}

/// Drains the sequence.
///
/// # Errors
/// Propagates the sequence's error.
pub fn collect_all(iter: &dyn DocIter) -> Result<Vec<Document>, DbError> {
    let mut out = Vec::new();
    while let Some(d) = iter.next_doc()? {
        out.push(d);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    fn docs(n: i32) -> Vec<Document> {
        (0..n)
            .map(|i| {
                let mut d = Document::new();
                d.insert("i", i);
                d
            })
            .collect()
    }

    struct CountingClose {
        inner: VecIter,
        closes: Arc<AtomicUsize>,
    }

    impl DocIter for CountingClose {
        fn next_doc(&self) -> Result<Option<Document>, DbError> {
            self.inner.next_doc()
        }

        fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
            self.inner.close();
        }
    }

    #[test]
    fn skip_then_limit_matches_slice() {
        let it = limit(skip(VecIter::boxed(docs(10)), 3), 4);
        let got = collect_all(it.as_ref()).unwrap();
        assert_eq!(got, docs(10)[3..7].to_vec());
    }

    #[test]
    fn limit_stays_exhausted() {
        let it = limit(VecIter::boxed(docs(5)), 2);
        assert_eq!(collect_all(it.as_ref()).unwrap().len(), 2);
        assert!(it.next_doc().unwrap().is_none());
    }

    #[test]
    fn close_propagates_exactly_once() {
        let closes = Arc::new(AtomicUsize::new(0));
        let base: BoxedIter = Box::new(CountingClose { inner: VecIter::new(docs(3)), closes: closes.clone() });
        let it = limit(skip(base, 1), 5);
        it.close();
        it.close();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(it.next_doc().unwrap().is_none());
    }

    #[test]
    #[should_panic(expected = "skip must be non-negative")]
    fn negative_skip_panics() {
        let _ = skip(VecIter::boxed(Vec::new()), -1);
    }

    #[test]
    fn concurrent_pullers_respect_limit() {
        let it: Arc<BoxedIter> = Arc::new(limit(VecIter::boxed(docs(1000)), 100));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let it = it.clone();
                std::thread::spawn(move || {
                    let mut n = 0;
                    while it.next_doc().unwrap().is_some() {
                        n += 1;
                    }
                    n
                })
            })
            .collect();
        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn take_batch_reports_exhaustion() {
        let it = VecIter::new(docs(3));
        let (b, done) = take_batch(&it, 2).unwrap();
        assert_eq!((b.len(), done), (2, false));
        let (b, done) = take_batch(&it, 2).unwrap();
        assert_eq!((b.len(), done), (1, true));
    }
}
