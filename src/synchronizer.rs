use crate::epoch::{frontier_reaches, try_raise_frontier};
use crate::mutator::MutatorEpoch;
use crate::reset::maybe_schedule_reset;
use crate::scan::{scan_mutators, ScanMode};
use crate::state::SharedState;
use crate::stats::SyncStats;
use crate::sync::{Arc, Cell, Ordering};
use crossbeam_utils::Backoff;
use std::time::Instant;
use tracing::{debug, trace};

/// Result of `Synchronizer::synchronize()`.
/// `Synchronizer::synchronize()` 的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Every mutator epoch reached the required frontier: all mutator
    /// stores issued before the initiation are now visible to the caller.
    /// 每个 mutator 纪元都到达了所需边界：发起之前 mutator 发出的所有
    /// 存储现在对调用者可见。
    Complete,
    /// The wait timed out, or a safepoint asked the caller to yield.
    /// Not an error: retry `check_synchronized()` later, or push the
    /// initiator onto the `DeferredQueue` the reset knows to reconcile.
    /// 等待超时，或安全点要求调用者让步。这不是错误：稍后重试
    /// `check_synchronized()`，或将发起者放入重置会进行核对的
    /// `DeferredQueue`。
    Deferred,
}

/// One epoch synchronization, initiated by a refinement worker (or a
/// mutator refining from its own write barrier).
///
/// Construction with `start_sync = true` advances the global epoch with
/// a full fence and captures the new value as the required frontier;
/// the protocol completes once every live mutator has been observed at
/// or past that frontier. Construction with `start_sync = false` yields
/// a trivially synchronized value.
///
/// `Synchronizer` is `!Sync` (due to `Cell`); one thread drives it. The
/// initiating thread must drive it to completion, or hand it to the
/// deferred queue so the safepoint reset can account for it.
///
/// **Example**:
/// ```
/// use refine_epoch::{EpochSyncDomain, SyncOutcome};
///
/// let domain = EpochSyncDomain::new();
/// let syncer = domain.synchronizer(true);
/// // ... work that does not depend on the synchronization ...
/// match syncer.synchronize() {
///     SyncOutcome::Complete => { /* refine: all prior mutator stores visible */ }
///     SyncOutcome::Deferred => { /* queue the work; recheck later */ }
/// }
/// # let _ = syncer.check_synchronized();
/// ```
///
/// 一次纪元同步，由细化工作线程（或从自身写屏障做细化的 mutator）发起。
/// 以 `start_sync = true` 构造会带着完整栅栏推进全局纪元，并将新值记为
/// 所需边界；一旦观察到每个存活的 mutator 都到达或越过该边界，协议即告
/// 完成。以 `start_sync = false` 构造得到一个平凡同步的值。
/// `Synchronizer` 是 `!Sync` 的（因为 `Cell`）；由单个线程驱动。发起线程
/// 必须将其驱动到完成，或将其交给延迟队列，以便安全点重置能够核对它。
pub struct Synchronizer {
    pub(crate) shared: Arc<SharedState>,
    pub(crate) required_frontier: Cell<usize>,
    pub(crate) completed: Cell<bool>,
}

impl Synchronizer {
    pub(crate) fn new(shared: Arc<SharedState>, start_sync: bool) -> Self {
        let required_frontier = if start_sync {
            start_synchronizing(&shared)
        } else {
            0
        };

        Synchronizer {
            shared,
            required_frontier: Cell::new(required_frontier),
            completed: Cell::new(!start_sync),
        }
    }

    /// The frontier every mutator epoch must reach.
    /// 每个 mutator 纪元必须到达的边界。
    #[inline]
    pub fn required_frontier(&self) -> usize {
        self.required_frontier.get()
    }

    /// Rewritten by the safepoint reset for entries parked in the
    /// deferred queue: against zeroed counters, frontier 0 holds
    /// trivially.
    /// 由安全点重置为停留在延迟队列中的条目改写：相对清零后的计数器，
    /// 边界 0 平凡成立。
    pub(crate) fn reset_frontier(&self) {
        self.required_frontier.set(0);
    }

    /// The fast probe: has the synchronization completed?
    ///
    /// Checks the memoized global frontier first; only on a miss does it
    /// scan the mutator list, raising the global frontier when the scan
    /// proves a new minimum so that later initiators skip their scans.
    /// Idempotent: after the first `true`, further calls are no-ops.
    ///
    /// 快速探测：同步是否已完成？
    /// 先检查备忘的全局边界；只有未命中时才扫描 mutator 列表，并在扫描
    /// 证明了新的最小值时提升全局边界，使后来的发起者跳过扫描。
    /// 幂等：第一次返回 `true` 之后，再次调用是空操作。
    pub fn check_synchronized(&self) -> bool {
        self.check_and_complete(None)
    }

    /// `check_synchronized` for a mutator-side caller, which satisfies
    /// the protocol for itself by publishing its own epoch first.
    ///
    /// mutator 侧调用者使用的 `check_synchronized`，它先发布自己的纪元，
    /// 从而使协议对自身成立。
    pub fn check_synchronized_mutator(&self, mutator: &MutatorEpoch) -> bool {
        self.check_and_complete(Some(mutator))
    }

    /// Drive the synchronization: fast check, then escalation, then a
    /// bounded spin.
    ///
    /// Escalation arms the safepoint poll of every straggler and updates
    /// parked stragglers on their behalf; running stragglers satisfy the
    /// armed poll at their next synchronization point. The spin is
    /// bounded by the configured wait timeout and aborts early when a
    /// safepoint is requested, returning `Deferred` in either case.
    ///
    /// 驱动同步：快速检查，然后升级，然后有界自旋。
    /// 升级会武装每个落后者的安全点轮询，并代表停靠的落后者更新纪元；
    /// 运行中的落后者会在它们的下一个同步点满足已武装的轮询。自旋受
    /// 配置的等待超时约束，并在请求安全点时提前中止，两种情况都返回
    /// `Deferred`。
    pub fn synchronize(&self) -> SyncOutcome {
        self.synchronize_inner(None)
    }

    /// `synchronize` for a mutator-side caller.
    /// mutator 侧调用者使用的 `synchronize`。
    pub fn synchronize_mutator(&self, mutator: &MutatorEpoch) -> SyncOutcome {
        self.synchronize_inner(Some(mutator))
    }

    /// `synchronize`, recording the elapsed time and the outcome into
    /// the worker's statistics.
    /// 执行 `synchronize`，并把耗时与结果记录到工作线程的统计中。
    pub fn synchronize_timed(&self, stats: &mut SyncStats) -> SyncOutcome {
        let start = Instant::now();
        let outcome = self.synchronize();
        match outcome {
            SyncOutcome::Complete => stats.record_fast(start.elapsed()),
            SyncOutcome::Deferred => stats.record_deferred(start.elapsed()),
        }
        outcome
    }

    fn synchronize_inner(&self, me: Option<&MutatorEpoch>) -> SyncOutcome {
        if self.check_and_complete(me) {
            return SyncOutcome::Complete;
        }

        let required_frontier = self.required_frontier.get();
        let outcome = scan_mutators(
            &self.shared,
            required_frontier,
            ScanMode::ArmPolls,
            me.map(|m| &m.slot),
        );

        // Parked stragglers were updated in-scope during the arming
        // traversal; if nothing is left lagging, the protocol is done.
        if outcome.reaches(required_frontier) {
            if let Some(min) = outcome.min_epoch {
                try_raise_frontier(&self.shared.global_frontier, min);
            }
            self.mark_complete();
            return SyncOutcome::Complete;
        }

        debug!(
            target: "gc-refine",
            armed = outcome.armed,
            required_frontier,
            "armed straggler polls"
        );

        let start = Instant::now();
        let backoff = Backoff::new();
        loop {
            if self.check_and_complete(me) {
                return SyncOutcome::Complete;
            }
            if start.elapsed() > self.shared.config.wait_timeout
                || self.shared.safepoint_requested.load(Ordering::Acquire)
            {
                let thread = std::thread::current();
                trace!(
                    target: "gc-refine",
                    thread = thread.name().unwrap_or("<unnamed>"),
                    required_frontier,
                    "synchronization deferred"
                );
                return SyncOutcome::Deferred;
            }
            backoff.snooze();
        }
    }

    fn check_and_complete(&self, me: Option<&MutatorEpoch>) -> bool {
        if self.completed.get() {
            return true;
        }
        if self.check_inner(me) {
            self.mark_complete();
            return true;
        }
        false
    }

    fn check_inner(&self, me: Option<&MutatorEpoch>) -> bool {
        debug_assert!(
            !self.shared.safepoint_active.load(Ordering::Relaxed),
            "BUG: synchronization checked inside a safepoint"
        );

        // A mutator-side caller satisfies the protocol for itself here.
        if let Some(me) = me {
            me.update_epoch();
        }

        let required_frontier = self.required_frontier.get();
        let global_frontier = self.shared.global_frontier.load(Ordering::Acquire);
        if frontier_reaches(global_frontier, required_frontier) {
            return true;
        }

        let outcome = scan_mutators(
            &self.shared,
            required_frontier,
            ScanMode::Observe,
            me.map(|m| &m.slot),
        );
        match outcome.min_epoch {
            // No live mutators: nothing to order against.
            None => true,
            Some(min) => {
                if frontier_reaches(min, required_frontier) {
                    let thread = std::thread::current();
                    trace!(
                        target: "gc-refine",
                        thread = thread.name().unwrap_or("<unnamed>"),
                        observed = min,
                        required_frontier,
                        "frontier synced"
                    );
                    try_raise_frontier(&self.shared.global_frontier, min);
                    true
                } else {
                    false
                }
            }
        }
    }

    fn mark_complete(&self) {
        if !self.completed.get() {
            self.completed.set(true);
            self.shared.dec_pending_sync();
        }
    }
}

fn start_synchronizing(shared: &SharedState) -> usize {
    debug_assert!(
        !shared.safepoint_active.load(Ordering::Relaxed),
        "BUG: synchronization started inside a safepoint"
    );

    shared.inc_pending_sync();
    let required_frontier = shared.global_epoch.bump();
    maybe_schedule_reset(shared, required_frontier);

    let thread = std::thread::current();
    trace!(
        target: "gc-refine",
        thread = thread.name().unwrap_or("<unnamed>"),
        required_frontier,
        "start synchronizing"
    );
    required_frontier
}
