use crate::epoch::PaddedCounter;
use crate::sync::{Arc, AtomicBool, AtomicUsize, Mutex};
use std::time::Duration;
use std::vec::Vec;

/// Spin-wait bound for `Synchronizer::synchronize()`.
///
/// Debug builds use a near-zero bound so the deferred path is exercised
/// constantly by the test suite.
///
/// `Synchronizer::synchronize()` 的自旋等待上限。
/// Debug 构建使用接近零的上限，使测试套件持续地走到延迟路径。
pub(crate) const SYNCHRONIZE_WAIT: Duration = if cfg!(debug_assertions) {
    Duration::from_nanos(3)
} else {
    Duration::from_millis(3)
};

/// Default high-water mark for scheduling an epoch reset.
/// Must stay well below half the counter range for the wrap-aware
/// comparison to remain meaningful.
///
/// 调度纪元重置的默认高水位线。
/// 必须远低于计数器范围的一半，回绕感知比较才能保持有意义。
pub(crate) const EPOCH_RESET_THRESHOLD: usize = usize::MAX / 8;

/// Sentinel epoch published by a retiring mutator's final release store.
/// Observing it carries the release-acquire edge for every store the
/// thread made in its lifetime; the slot is then excluded from scans.
///
/// 退出中的 mutator 以最后一次 release 存储发布的哨兵纪元。
/// 观察到它即承载了该线程一生中所有存储的 release-acquire 边；
/// 此后该槽位被排除在扫描之外。
pub(crate) const EXITED_EPOCH: usize = usize::MAX;

/// The mutator is executing managed code and will reach its own
/// synchronization points (polls, state transitions).
/// mutator 正在执行受管代码，并会到达它自己的同步点（轮询、状态转换）。
pub(crate) const MANAGED: usize = 0;

/// The mutator is parked in a blocking call and cannot poll; remote
/// threads may process its pending work on its behalf.
/// mutator 停靠在阻塞调用中、无法轮询；远程线程可以代表它处理待处理的工作。
pub(crate) const PARKED: usize = 1;

/// Tunables fixed at domain construction.
/// 在域构造时固定下来的可调参数。
#[derive(Debug, Clone)]
pub(crate) struct SyncConfig {
    pub(crate) wait_timeout: Duration,
    pub(crate) reset_threshold: usize,
    pub(crate) stress_reset: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            wait_timeout: SYNCHRONIZE_WAIT,
            reset_threshold: EPOCH_RESET_THRESHOLD,
            stress_reset: false,
        }
    }
}

/// Per-mutator shared slot, readable by any thread.
///
/// Cache-aligned to prevent false sharing between mutators. The epoch is
/// written only by the owning thread, or by a remote thread holding the
/// slot's handshake lock while the owner is parked.
///
/// 每个 mutator 的共享槽位，任何线程都可读取。
/// 缓存对齐以防止 mutator 之间的伪共享。纪元只能由拥有线程写入，
/// 或者由在所有者停靠期间持有该槽位握手锁的远程线程写入。
#[derive(Debug)]
#[repr(align(64))]
pub(crate) struct MutatorSlot {
    /// The last global epoch this mutator copied into its slot.
    /// 该 mutator 最后一次复制到其槽位中的全局纪元。
    pub(crate) local_epoch: AtomicUsize,
    /// `MANAGED` or `PARKED`.
    pub(crate) thread_state: AtomicUsize,
    /// Armed safepoint poll: the owner's next `poll()` takes the slow path.
    /// 已武装的安全点轮询：所有者的下一次 `poll()` 走慢路径。
    pub(crate) poll_armed: AtomicBool,
    /// Handshake-processing lock. Grantable to a remote thread only while
    /// the owner is parked; transitions out of `PARKED` take it too, so a
    /// delegate update and an unpark cannot interleave.
    /// 握手处理锁。只有在所有者停靠时才能授予远程线程；离开 `PARKED`
    /// 的转换也会获取它，因此代理更新和取消停靠不会交错。
    pub(crate) handshake_lock: Mutex<()>,
}

impl MutatorSlot {
    pub(crate) fn new() -> Self {
        Self {
            local_epoch: AtomicUsize::new(0),
            thread_state: AtomicUsize::new(MANAGED),
            poll_armed: AtomicBool::new(false),
            handshake_lock: Mutex::new(()),
        }
    }
}

/// Process-wide state of the synchronization protocol, shared by every
/// handle cloned from one domain.
///
/// 同步协议的进程级状态，由从一个域克隆出的所有句柄共享。
#[derive(Debug)]
pub(crate) struct SharedState {
    /// The global epoch every mutator copies at its sync points.
    /// 每个 mutator 在其同步点复制的全局纪元。
    pub(crate) global_epoch: PaddedCounter,
    /// The largest value all mutator epochs were once observed to reach.
    /// `global_epoch >= global_frontier` always holds between resets.
    /// 所有 mutator 纪元曾被观察到达到的最大值。
    /// 在两次重置之间恒有 `global_epoch >= global_frontier`。
    pub(crate) global_frontier: PaddedCounter,
    /// A reset is queued for the next safepoint.
    pub(crate) reset_scheduled: AtomicBool,
    /// A safepoint wants mutators parked; initiators should yield.
    pub(crate) safepoint_requested: AtomicBool,
    /// All mutators are quiesced; only the safepoint holder runs protocol code.
    pub(crate) safepoint_active: AtomicBool,
    /// Live initiators that have not observed completion. Debug builds only.
    /// 尚未观察到完成的存活发起者计数。仅 debug 构建。
    #[cfg(debug_assertions)]
    pub(crate) pending_sync: AtomicUsize,
    /// All registered mutator slots. Iterated under the lock.
    /// 所有已注册的 mutator 槽位。在锁的保护下迭代。
    pub(crate) mutators: Mutex<Vec<Arc<MutatorSlot>>>,
    pub(crate) config: SyncConfig,
}

impl SharedState {
    pub(crate) fn new(config: SyncConfig) -> Self {
        Self {
            global_epoch: PaddedCounter::new(0),
            global_frontier: PaddedCounter::new(0),
            reset_scheduled: AtomicBool::new(false),
            safepoint_requested: AtomicBool::new(false),
            safepoint_active: AtomicBool::new(false),
            #[cfg(debug_assertions)]
            pending_sync: AtomicUsize::new(0),
            mutators: Mutex::new(Vec::new()),
            config,
        }
    }

    #[inline]
    pub(crate) fn inc_pending_sync(&self) {
        #[cfg(debug_assertions)]
        self.pending_sync
            .fetch_add(1, crate::sync::Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn dec_pending_sync(&self) {
        #[cfg(debug_assertions)]
        {
            let prev = self
                .pending_sync
                .fetch_sub(1, crate::sync::Ordering::Relaxed);
            debug_assert!(
                prev > 0,
                "BUG: pending_sync underflow; an initiator completed twice"
            );
        }
    }
}
