use crate::sync::{AtomicUsize, Ordering};

/// A counter isolated on its own cache line to avoid false sharing.
/// 隔离在自己缓存行上的计数器，以避免伪共享。
#[derive(Debug)]
#[repr(align(64))]
pub(crate) struct PaddedCounter {
    value: AtomicUsize,
}

impl PaddedCounter {
    pub(crate) fn new(value: usize) -> Self {
        Self {
            value: AtomicUsize::new(value),
        }
    }

    #[inline]
    pub(crate) fn load(&self, order: Ordering) -> usize {
        self.value.load(order)
    }

    #[inline]
    pub(crate) fn store(&self, value: usize, order: Ordering) {
        self.value.store(value, order)
    }

    /// Advance the counter and return the new value.
    ///
    /// `SeqCst` makes this a full fence: everything the caller did before
    /// the bump is ordered before everything it loads afterwards. The
    /// initiator's visibility argument depends on this.
    ///
    /// 推进计数器并返回新值。
    /// `SeqCst` 使其成为完整的内存栅栏：调用者在推进之前做的一切都排序在
    /// 它之后的所有加载之前。发起者的可见性论证依赖于此。
    #[inline]
    pub(crate) fn bump(&self) -> usize {
        self.value.fetch_add(1, Ordering::SeqCst) + 1
    }

    #[inline]
    pub(crate) fn compare_exchange(&self, current: usize, new: usize) -> Result<usize, usize> {
        self.value
            .compare_exchange(current, new, Ordering::AcqRel, Ordering::Acquire)
    }
}

/// Wrap-aware strict ordering: is `a` logically before `b`?
///
/// Interprets the unsigned difference `a - b` modulo the counter width;
/// a difference above half the range means `a` is the older value. Two
/// live counters never drift more than half the range apart, because the
/// reset rewinds them long before that (see `reset`).
///
/// `frontier_precedes(a, a)` is `false`.
///
/// 回绕感知的严格排序：`a` 在逻辑上是否早于 `b`？
/// 将无符号差值 `a - b` 按计数器位宽取模解释；差值超过范围的一半意味着
/// `a` 是较旧的值。两个存活计数器的漂移绝不会超过范围的一半，因为重置
/// 会在远早于那之前回拨它们。
/// `frontier_precedes(a, a)` 为 `false`。
#[inline]
pub(crate) fn frontier_precedes(a: usize, b: usize) -> bool {
    a.wrapping_sub(b) > usize::MAX / 2
}

/// `a` has reached `b` in the wrap-aware order (`a >= b`).
/// 在回绕感知排序中 `a` 已到达 `b`（`a >= b`）。
#[inline]
pub(crate) fn frontier_reaches(a: usize, b: usize) -> bool {
    !frontier_precedes(a, b)
}

/// Raise the global frontier to `observed` if it is currently behind.
///
/// A single CAS attempt; a lost race means another thread raised the
/// frontier concurrently, which is also progress.
///
/// 如果全局边界当前落后，则将其提升到 `observed`。
/// 只尝试一次 CAS；竞争失败意味着另一个线程并发地提升了边界，这同样是进展。
#[inline]
pub(crate) fn try_raise_frontier(frontier: &PaddedCounter, observed: usize) {
    let current = frontier.load(Ordering::Acquire);
    if frontier_precedes(current, observed) {
        let _ = frontier.compare_exchange(current, observed);
    }
}
