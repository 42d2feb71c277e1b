use crate::epoch::frontier_precedes;
use crate::state::{SharedState, EXITED_EPOCH, PARKED};
use crate::sync::{yield_now, Arc, Ordering};
use crate::synchronizer::Synchronizer;
use std::vec::Vec;
use tracing::{debug, info};

/// Request a global epoch reset at the next safepoint once the frontier
/// crosses the threshold.
///
/// Single-shot: the CAS ensures exactly one initiator logs and schedules
/// per reset cycle. Execution happens when the collector next runs
/// `SafepointScope::reset_all_epochs`.
///
/// 一旦边界越过阈值，就请求在下一个安全点进行全局纪元重置。
/// 单次触发：CAS 确保每个重置周期只有一个发起者记录并调度。
/// 实际执行发生在收集器下次运行 `SafepointScope::reset_all_epochs` 时。
pub(crate) fn maybe_schedule_reset(shared: &SharedState, required_frontier: usize) {
    let due = shared.config.stress_reset
        || frontier_precedes(shared.config.reset_threshold, required_frontier);
    if !due {
        return;
    }

    if !shared.reset_scheduled.load(Ordering::Relaxed)
        && shared
            .reset_scheduled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    {
        let thread = std::thread::current();
        info!(
            target: "gc-refine",
            thread = thread.name().unwrap_or("<unnamed>"),
            required_frontier,
            "requesting global epoch reset"
        );
    }
}

/// Buffer of initiators whose `synchronize()` was deferred, together
/// with the work that depends on them.
///
/// This is the one place deferred initiators are allowed to live across
/// a safepoint: the epoch reset rewrites the frontiers of everything in
/// here and asserts nothing else is pending. The collector drains the
/// buffer by rechecking entries before (or after) a pause.
///
/// 其 `synchronize()` 被延迟的发起者的缓冲区，连同依赖它们的工作。
/// 这是延迟的发起者被允许跨越安全点存活的唯一地方：纪元重置会改写
/// 这里所有条目的边界，并断言没有其他挂起的同步。收集器在暂停前
/// （或暂停后）通过重新检查条目来排空缓冲区。
#[derive(Default)]
pub struct DeferredQueue {
    entries: Vec<Synchronizer>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Park a deferred initiator until a later recheck.
    /// 存放一个被延迟的发起者，等待之后的重新检查。
    pub fn push(&mut self, synchronizer: Synchronizer) {
        self.entries.push(synchronizer);
    }

    /// Recheck every entry and drop the ones whose synchronization now
    /// holds; returns how many completed.
    /// 重新检查每个条目并移除同步已成立的那些；返回完成的数量。
    pub fn drain_completed(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| !entry.check_synchronized());
        before - self.entries.len()
    }

    /// Safepoint-reset hook: rewrite every entry against the zeroed
    /// counters and report the count for the `pending_sync` reconciliation.
    /// 安全点重置钩子：将每个条目改写为相对清零后的计数器成立，
    /// 并报告数量用于 `pending_sync` 核对。
    pub(crate) fn reset_frontiers(&mut self) -> usize {
        for entry in &self.entries {
            entry.reset_frontier();
        }
        self.entries.len()
    }
}

/// A stop-the-world scope: every live mutator is parked for as long as
/// the scope lives.
///
/// Entering raises the request flag (initiators yield out of their spin
/// loops), then waits until every live mutator slot reads `PARKED`.
/// Dropping the scope resumes the world. The epoch reset may only run
/// through a value of this type, which is the "at a safepoint" proof.
///
/// 一个 stop-the-world 作用域：在作用域存活期间，每个存活的 mutator
/// 都保持停靠。进入时先升起请求标志（发起者会从自旋循环中让步），
/// 然后等待每个存活的 mutator 槽位都读到 `PARKED`。drop 作用域即恢复
/// 世界。纪元重置只能通过此类型的值运行，这就是"处于安全点"的证明。
pub struct SafepointScope {
    shared: Arc<SharedState>,
}

impl SafepointScope {
    pub(crate) fn enter(shared: Arc<SharedState>) -> Self {
        shared.safepoint_requested.store(true, Ordering::Release);

        loop {
            let all_parked = shared.mutators.lock().iter().all(|slot| {
                slot.local_epoch.load(Ordering::Acquire) == EXITED_EPOCH
                    || slot.thread_state.load(Ordering::Acquire) == PARKED
            });
            if all_parked {
                break;
            }
            yield_now();
        }

        shared.safepoint_active.store(true, Ordering::Release);
        debug!(target: "gc-refine", "safepoint reached, world stopped");

        SafepointScope { shared }
    }

    /// Reset the epoch machinery to zero while the world is stopped.
    ///
    /// Order matters: globals first, then the deferred entries, then
    /// every mutator slot (safe: their owners are parked), and only then
    /// is the schedule flag cleared. Exited mutators' slots are removed
    /// here, the one moment the list is known quiescent. Any pending
    /// synchronization that is not in `deferred` indicates a caller that
    /// failed to retry or defer before the pause, and would otherwise be
    /// left waiting for a frontier that no longer exists.
    ///
    /// 在世界停止期间将纪元机制清零。
    /// 顺序很重要：先是全局计数器，然后是延迟条目，再是每个 mutator
    /// 槽位（安全：其所有者都已停靠），最后才清除调度标志。已退出
    /// mutator 的槽位在此移除，这是列表已知静止的唯一时刻。任何不在
    /// `deferred` 中的挂起同步都表明有调用者未能在暂停前重试或延迟，
    /// 否则它将等待一个不复存在的边界。
    pub fn reset_all_epochs(&self, deferred: &mut DeferredQueue) {
        let shared = &self.shared;
        debug_assert!(
            shared.safepoint_active.load(Ordering::Relaxed),
            "BUG: epoch reset outside a safepoint"
        );

        info!(
            target: "gc-refine",
            global_epoch = shared.global_epoch.load(Ordering::Acquire),
            "resetting global epoch"
        );

        shared.global_epoch.store(0, Ordering::Release);
        shared.global_frontier.store(0, Ordering::Release);

        let deferred_sync = deferred.reset_frontiers();

        {
            let mut mutators = shared.mutators.lock();
            mutators
                .retain(|slot| slot.local_epoch.load(Ordering::Acquire) != EXITED_EPOCH);
            for slot in mutators.iter() {
                slot.local_epoch.store(0, Ordering::Release);
            }
        }

        shared.reset_scheduled.store(false, Ordering::Release);

        #[cfg(debug_assertions)]
        {
            let pending = shared.pending_sync.load(Ordering::Relaxed);
            assert_eq!(
                pending, deferred_sync,
                "pending_sync({}) != deferred_sync({}): a live initiator was \
                 neither completed nor deferred before the safepoint",
                pending, deferred_sync
            );
        }
        #[cfg(not(debug_assertions))]
        let _ = deferred_sync;
    }
}

impl Drop for SafepointScope {
    fn drop(&mut self) {
        self.shared.safepoint_active.store(false, Ordering::Release);
        self.shared.safepoint_requested.store(false, Ordering::Release);
        debug!(target: "gc-refine", "safepoint released, world resumed");
    }
}
