use core::task::Waker;
use heapless::Vec;

const MAX_WAKERS: usize = 4;

/// Utility struct to register and wake a set of wakers.
#[derive(Debug)]
pub struct WakerRegistration {
    wakers: Vec<Waker, MAX_WAKERS>,
}

impl Drop for WakerRegistration {
    fn drop(&mut self) {
        self.wake_all()
    }
}

impl WakerRegistration {
    pub const fn new() -> Self {
        Self { wakers: Vec::new() }
    }

    /// Register a waker. Overwrites the previous wakers, if any.
    pub fn register(&mut self, w: &Waker) {
        match self.wakers.as_slice() {
            // Same task as the one already registered, keep it and skip the clone.
            [w2] if w2.will_wake(w) => {}
            _ => {
                self.wakers.clear();
                // cannot fail, the vec was just emptied
                let _ = self.wakers.push(w.clone());
            }
        }
    }

    /// Add a waker next to the registered ones.
    ///
    /// When all slots are taken the registered wakers are woken early to
    /// make room.
    pub fn add(&mut self, w: &Waker) {
        if self.wakers.iter().any(|w2| w2.will_wake(w)) {
            return;
        }
        if self.wakers.is_full() {
            self.wake_all();
        }
        let _ = self.wakers.push(w.clone());
    }

    /// Wake all registered wakers, if any.
    pub fn wake_all(&mut self) {
        while let Some(w) = self.wakers.pop() {
            w.wake();
        }
    }

    /// Forget the registered wakers without waking them.
    pub fn clear(&mut self) {
        self.wakers.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.wakers.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::task::Wake;

    struct CountingWaker(AtomicUsize);

    impl Wake for CountingWaker {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting() -> (Arc<CountingWaker>, Waker) {
        let count = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let waker = Waker::from(count.clone());
        (count, waker)
    }

    #[test]
    fn test_register_overwrites() {
        let (a, wa) = counting();
        let (b, wb) = counting();
        let mut reg = WakerRegistration::new();
        reg.register(&wa);
        reg.register(&wb);
        reg.wake_all();
        assert_eq!(a.0.load(Ordering::SeqCst), 0);
        assert_eq!(b.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_add_wakes_all_once() {
        let (a, wa) = counting();
        let (b, wb) = counting();
        let mut reg = WakerRegistration::new();
        reg.add(&wa);
        reg.add(&wb);
        reg.add(&wb);
        assert_eq!(reg.len(), 2);
        reg.wake_all();
        reg.wake_all();
        assert_eq!(a.0.load(Ordering::SeqCst), 1);
        assert_eq!(b.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_does_not_wake() {
        let (a, wa) = counting();
        let mut reg = WakerRegistration::new();
        reg.register(&wa);
        reg.clear();
        drop(reg);
        assert_eq!(a.0.load(Ordering::SeqCst), 0);
    }
}
