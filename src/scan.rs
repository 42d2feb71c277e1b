use crate::epoch::{frontier_precedes, frontier_reaches};
use crate::mutator::HandshakeScope;
use crate::state::{MutatorSlot, SharedState, EXITED_EPOCH, PARKED};
use crate::sync::{Arc, Ordering};

/// What a traversal of the mutator list should do besides computing the
/// minimum observed epoch.
/// 除了计算观察到的最小纪元之外，一次 mutator 列表遍历还应做什么。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanMode {
    /// Read epochs only.
    Observe,
    /// Arm the safepoint poll of every straggler, and update parked
    /// stragglers in-scope on their behalf.
    /// 武装每个落后者的安全点轮询，并在作用域内代表停靠的落后者更新纪元。
    ArmPolls,
}

pub(crate) struct ScanOutcome {
    /// Wrap-aware minimum of the observed epochs; `None` if no live
    /// mutator was seen, in which case the synchronization holds vacuously.
    /// 观察到的纪元的回绕感知最小值；若没有看到存活的 mutator 则为
    /// `None`，此时同步空洞地成立。
    pub(crate) min_epoch: Option<usize>,
    /// Stragglers whose poll was armed and that still need to act.
    /// 已武装轮询、仍需自行行动的落后者数量。
    pub(crate) armed: usize,
}

impl ScanOutcome {
    #[inline]
    pub(crate) fn reaches(&self, required_frontier: usize) -> bool {
        self.min_epoch
            .map_or(true, |min| frontier_reaches(min, required_frontier))
    }
}

/// Visit every registered mutator once.
///
/// Slots publishing the exited sentinel belong to retired threads and
/// are skipped. In `ArmPolls` mode a lagging mutator gets its poll
/// armed; if it is parked and its handshake scope can be taken, the
/// epoch update runs right here on its behalf and the slot stops
/// lagging within this same traversal.
///
/// 访问每个已注册的 mutator 一次。
/// 发布了退出哨兵的槽位属于已退役的线程，直接跳过。在 `ArmPolls`
/// 模式下，落后的 mutator 的轮询会被武装；如果它处于停靠状态且其握手
/// 作用域可以获取，纪元更新就在此处代表它执行，该槽位在同一次遍历内
/// 即不再落后。
pub(crate) fn scan_mutators(
    shared: &SharedState,
    required_frontier: usize,
    mode: ScanMode,
    caller: Option<&Arc<MutatorSlot>>,
) -> ScanOutcome {
    let mutators = shared.mutators.lock();

    let mut min_epoch: Option<usize> = None;
    let mut armed = 0;

    for slot in mutators.iter() {
        let mut epoch = slot.local_epoch.load(Ordering::Acquire);

        // A retired slot: the acquire above read the owner's final
        // release publication, so its stores are already visible and
        // there is nothing left to wait for.
        // 已退役的槽位：上面的 acquire 读到了所有者的最后一次 release
        // 发布，它的存储已经可见，没有什么可等待的了。
        if epoch == EXITED_EPOCH {
            continue;
        }

        if mode == ScanMode::ArmPolls && frontier_precedes(epoch, required_frontier) {
            // A mutator-side caller updated its own epoch during the
            // fast check, so it can never show up as a straggler here.
            debug_assert!(
                caller.map_or(true, |own| !Arc::ptr_eq(own, slot)),
                "BUG: the initiating mutator lags its own required frontier"
            );

            slot.poll_armed.store(true, Ordering::Release);
            armed += 1;

            if slot.thread_state.load(Ordering::Acquire) == PARKED {
                if let Some(scope) = HandshakeScope::try_acquire(slot) {
                    scope.process(shared);
                    epoch = slot.local_epoch.load(Ordering::Acquire);
                    // Handled in-scope; nothing left pending on this slot.
                    armed -= 1;
                }
            }
        }

        min_epoch = Some(match min_epoch {
            Some(min) if frontier_precedes(epoch, min) => epoch,
            Some(min) => min,
            None => epoch,
        });
    }

    ScanOutcome { min_epoch, armed }
}
