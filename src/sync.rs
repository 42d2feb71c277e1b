#[cfg(feature = "loom")]
pub use loom::cell::Cell;
#[cfg(not(feature = "loom"))]
pub use std::cell::Cell;

#[cfg(feature = "loom")]
pub use loom::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
#[cfg(not(feature = "loom"))]
pub use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[cfg(feature = "loom")]
pub use loom::sync::Arc;
#[cfg(not(feature = "loom"))]
pub use std::sync::Arc;

#[cfg(feature = "loom")]
pub use loom::thread::yield_now;
#[cfg(not(feature = "loom"))]
pub use std::thread::yield_now;

#[cfg(not(feature = "loom"))]
pub use antidote::MutexGuard;

#[cfg(feature = "loom")]
pub use loom::sync::MutexGuard;

#[cfg(not(feature = "loom"))]
#[derive(Debug)]
pub struct Mutex<T>(antidote::Mutex<T>);

#[cfg(not(feature = "loom"))]
impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(not(feature = "loom"))]
impl<T> Mutex<T> {
    pub fn new(t: T) -> Self {
        Self(antidote::Mutex::new(t))
    }

    pub fn lock(&self) -> antidote::MutexGuard<'_, T> {
        self.0.lock()
    }

    pub fn try_lock(&self) -> Option<antidote::MutexGuard<'_, T>> {
        self.0.try_lock().ok()
    }
}

#[cfg(feature = "loom")]
#[derive(Debug, Default)]
pub struct Mutex<T>(loom::sync::Mutex<T>);

#[cfg(feature = "loom")]
impl<T> Mutex<T> {
    pub fn new(t: T) -> Self {
        Self(loom::sync::Mutex::new(t))
    }

    pub fn lock(&self) -> loom::sync::MutexGuard<'_, T> {
        self.0.lock().unwrap()
    }

    pub fn try_lock(&self) -> Option<loom::sync::MutexGuard<'_, T>> {
        self.0.try_lock().ok()
    }
}
