use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::time::Duration;

/// Synchronization counters owned by one refinement worker.
///
/// A fast synchronization completed within `synchronize()`; a deferred
/// one timed out or yielded. Workers keep one value per phase and report
/// deltas, which is what the subtraction operators are for.
///
/// 由单个细化工作线程持有的同步统计。
/// 快速同步在 `synchronize()` 内完成；延迟同步则超时或让步了。
/// 工作线程按阶段各保留一份并汇报差值，减法运算符即为此准备。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    fast_syncs: usize,
    deferred_syncs: usize,
    fast_sync_time: Duration,
    deferred_sync_time: Duration,
}

impl SyncStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fast_syncs(&self) -> usize {
        self.fast_syncs
    }

    pub fn deferred_syncs(&self) -> usize {
        self.deferred_syncs
    }

    pub fn fast_sync_time(&self) -> Duration {
        self.fast_sync_time
    }

    pub fn deferred_sync_time(&self) -> Duration {
        self.deferred_sync_time
    }

    pub(crate) fn record_fast(&mut self, elapsed: Duration) {
        self.fast_syncs += 1;
        self.fast_sync_time += elapsed;
    }

    pub(crate) fn record_deferred(&mut self, elapsed: Duration) {
        self.deferred_syncs += 1;
        self.deferred_sync_time += elapsed;
    }
}

impl AddAssign for SyncStats {
    fn add_assign(&mut self, other: Self) {
        self.fast_syncs += other.fast_syncs;
        self.deferred_syncs += other.deferred_syncs;
        self.fast_sync_time += other.fast_sync_time;
        self.deferred_sync_time += other.deferred_sync_time;
    }
}

impl SubAssign for SyncStats {
    fn sub_assign(&mut self, other: Self) {
        self.fast_syncs -= other.fast_syncs;
        self.deferred_syncs -= other.deferred_syncs;
        self.fast_sync_time -= other.fast_sync_time;
        self.deferred_sync_time -= other.deferred_sync_time;
    }
}

impl Add for SyncStats {
    type Output = SyncStats;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

impl Sub for SyncStats {
    type Output = SyncStats;

    fn sub(mut self, other: Self) -> Self {
        self -= other;
        self
    }
}
