use crate::epoch::frontier_reaches;
use crate::state::{MutatorSlot, SharedState, EXITED_EPOCH, MANAGED, PARKED};
use crate::sync::{Arc, Cell, MutexGuard, Ordering};
use tracing::trace;

/// Copy the current global epoch into `slot`.
///
/// Release-ordered against the acquire load performed by scanning
/// initiators: any remote thread that observes the stored epoch also
/// observes every store the owner issued before this call. Must never
/// run inside a safepoint, where the reset rewrites the same slots.
///
/// 将当前全局纪元复制到 `slot` 中。
/// 与扫描发起者执行的 acquire 加载构成 release 排序：任何观察到所存纪元
/// 的远程线程，同时也观察到所有者在本次调用之前发出的全部存储。
/// 绝不能在安全点内运行，因为重置会改写同一批槽位。
#[inline]
pub(crate) fn update_slot(shared: &SharedState, slot: &MutatorSlot) {
    debug_assert!(
        !shared.safepoint_active.load(Ordering::Relaxed),
        "BUG: epoch update inside a safepoint races the epoch reset"
    );
    let global = shared.global_epoch.load(Ordering::Acquire);
    debug_assert!(
        frontier_reaches(global, slot.local_epoch.load(Ordering::Acquire)),
        "BUG: local epoch ahead of the global epoch"
    );
    slot.local_epoch.store(global, Ordering::Release);
}

/// A mutator thread's registration in the synchronization domain.
///
/// Each mutator thread creates exactly one `MutatorEpoch` via
/// `EpochSyncDomain::register_mutator()`. It is `!Sync` (due to `Cell`)
/// and must be used by only one thread.
///
/// The handle is the mutator side of the protocol: the thread calls
/// `update_epoch()` at its synchronization points (or lets `poll()`,
/// `park()` and unparking do so), and initiators read the published
/// epoch remotely.
///
/// mutator 线程在同步域中的注册句柄。
/// 每个 mutator 线程应该通过 `EpochSyncDomain::register_mutator()` 创建
/// 恰好一个 `MutatorEpoch`。它是 `!Sync` 的（因为 `Cell`），必须仅由
/// 一个线程使用。
/// 该句柄是协议的 mutator 侧：线程在其同步点调用 `update_epoch()`
/// （或者由 `poll()`、`park()` 和取消停靠代为调用），发起者则远程读取
/// 已发布的纪元。
pub struct MutatorEpoch {
    pub(crate) slot: Arc<MutatorSlot>,
    pub(crate) shared: Arc<SharedState>,
    park_count: Cell<usize>,
}

impl MutatorEpoch {
    pub(crate) fn new(shared: Arc<SharedState>) -> Self {
        let slot = Arc::new(MutatorSlot::new());

        // Register the mutator immediately in the shared slot list
        shared.mutators.lock().push(Arc::clone(&slot));

        MutatorEpoch {
            slot,
            shared,
            park_count: Cell::new(0),
        }
    }

    /// Publish the current global epoch from a pre-existing
    /// synchronization point of the calling thread.
    ///
    /// This is the entire mutator-side cost of the protocol: one acquire
    /// load and one release store. It must not be called while parked
    /// (a remote delegate may own the slot then) nor inside a safepoint.
    ///
    /// 从调用线程已有的同步点发布当前全局纪元。
    /// 这就是协议在 mutator 侧的全部开销：一次 acquire 加载和一次
    /// release 存储。不得在停靠期间调用（此时远程代理可能拥有该槽位），
    /// 也不得在安全点内调用。
    #[inline]
    pub fn update_epoch(&self) {
        debug_assert!(
            self.slot.thread_state.load(Ordering::Relaxed) == MANAGED,
            "BUG: epoch update from a parked mutator races delegate processing"
        );
        update_slot(&self.shared, &self.slot);
    }

    /// The safepoint poll: a cheap check on the fast path, and handshake
    /// processing on the slow path when an initiator armed the poll.
    ///
    /// 安全点轮询：快路径上是一次廉价检查；当发起者武装了轮询时，
    /// 慢路径执行握手处理。
    #[inline]
    pub fn poll(&self) {
        if self.slot.poll_armed.load(Ordering::Acquire) {
            self.poll_slow();
        }
    }

    fn poll_slow(&self) {
        if self.slot.poll_armed.swap(false, Ordering::AcqRel) {
            let thread = std::thread::current();
            trace!(
                target: "gc-refine",
                thread = thread.name().unwrap_or("<unnamed>"),
                "processing armed poll"
            );
            update_slot(&self.shared, &self.slot);
        }
    }

    /// Enter the parked state (a blocking native call, a wait, ...).
    ///
    /// The transition itself is a synchronization point, so the epoch is
    /// published on the way in; while the guard lives, initiators may
    /// update this mutator's epoch on its behalf instead of waiting for
    /// a poll that will not come.
    ///
    /// This method is reentrant: nested calls (or cloned guards) keep
    /// the thread parked until the last guard is dropped.
    ///
    /// 进入停靠状态（阻塞的本地调用、等待等）。
    /// 转换本身就是一个同步点，因此进入时会发布纪元；在守卫存活期间，
    /// 发起者可以代表该 mutator 更新其纪元，而不是等待一次不会到来的轮询。
    /// 此方法是可重入的：嵌套调用（或克隆的守卫）使线程保持停靠，
    /// 直到最后一个守卫被 drop。
    pub fn park(&self) -> ParkGuard<'_> {
        let park_count = self.park_count.get();

        if park_count == 0 {
            update_slot(&self.shared, &self.slot);
            self.slot.thread_state.store(PARKED, Ordering::Release);
        }

        self.park_count.set(park_count + 1);

        ParkGuard { mutator: self }
    }
}

impl Drop for MutatorEpoch {
    /// Retire the slot with a final release publication.
    ///
    /// The sentinel both excludes the slot from future scans and hands
    /// any initiator that reads it the release-acquire edge for every
    /// store this thread ever made. The slot itself stays in the list
    /// until a safepoint reset sweeps it out.
    ///
    /// 以最后一次 release 发布让槽位退役。
    /// 该哨兵既把槽位排除在后续扫描之外，又把此线程曾经做过的所有存储的
    /// release-acquire 边交给任何读到它的发起者。槽位本身会留在列表中，
    /// 直到某次安全点重置将其清除。
    fn drop(&mut self) {
        self.slot
            .local_epoch
            .store(EXITED_EPOCH, Ordering::Release);
    }
}

/// A guard that keeps the current mutator in the parked state.
///
/// Obtained from `MutatorEpoch::park()`. Dropping the last guard
/// reacquires the slot's handshake lock (closing the window in which a
/// remote delegate may be processing this thread), leaves the parked
/// state, and publishes the epoch again, since leaving a blocked state
/// is itself a synchronization point.
///
/// 保持当前 mutator 处于停靠状态的守卫。
/// 通过 `MutatorEpoch::park()` 获得。drop 最后一个守卫时会重新获取该
/// 槽位的握手锁（关闭远程代理可能正在处理此线程的窗口）、离开停靠状态，
/// 并再次发布纪元，因为离开阻塞状态本身就是一个同步点。
#[must_use]
pub struct ParkGuard<'a> {
    mutator: &'a MutatorEpoch,
}

impl<'a> Clone for ParkGuard<'a> {
    #[inline]
    fn clone(&self) -> Self {
        let park_count = self.mutator.park_count.get();

        assert!(
            park_count > 0,
            "BUG: Cloning a ParkGuard in an unparked state (park_count = 0). \
             This indicates incorrect API usage or a library bug."
        );

        self.mutator.park_count.set(park_count + 1);

        ParkGuard {
            mutator: self.mutator,
        }
    }
}

impl<'a> Drop for ParkGuard<'a> {
    fn drop(&mut self) {
        let park_count = self.mutator.park_count.get();

        assert!(
            park_count > 0,
            "BUG: Dropping a ParkGuard in an unparked state (park_count = 0). \
             This indicates incorrect API usage or a library bug."
        );

        if park_count == 1 {
            // A thread leaving the blocked state stays blocked for as
            // long as a safepoint is in progress.
            // 离开阻塞状态的线程在安全点进行期间保持阻塞。
            while self
                .mutator
                .shared
                .safepoint_requested
                .load(Ordering::Acquire)
            {
                crate::sync::yield_now();
            }

            let slot = &self.mutator.slot;
            {
                let _scope = slot.handshake_lock.lock();
                slot.thread_state.store(MANAGED, Ordering::Release);
            }
            // Any poll armed while parked has been satisfied by the
            // delegate or is satisfied by the update below.
            slot.poll_armed.store(false, Ordering::Release);
            update_slot(&self.mutator.shared, slot);
        }

        self.mutator.park_count.set(park_count - 1);
    }
}

/// A handshake-processing scope on a parked mutator.
///
/// Holding the scope proves the target cannot leave the parked state
/// (unparking takes the same lock), so the holder may run the epoch
/// update on the target's behalf. Released on every exit path.
///
/// 停靠 mutator 上的握手处理作用域。
/// 持有该作用域证明目标无法离开停靠状态（取消停靠需要同一把锁），
/// 因此持有者可以代表目标执行纪元更新。任何退出路径上都会释放。
pub(crate) struct HandshakeScope<'a> {
    slot: &'a MutatorSlot,
    _guard: MutexGuard<'a, ()>,
}

impl<'a> HandshakeScope<'a> {
    /// Attempt to open a delegate-processing scope on `slot`.
    ///
    /// Fails if the target is not parked, or is mid-transition with the
    /// lock held. Failure is not an error: the target will process its
    /// armed poll at its own next synchronization point.
    ///
    /// 尝试在 `slot` 上打开代理处理作用域。
    /// 如果目标未停靠，或正处于持锁转换中，则失败。失败不是错误：
    /// 目标会在它自己的下一个同步点处理已武装的轮询。
    pub(crate) fn try_acquire(slot: &'a MutatorSlot) -> Option<Self> {
        let guard = slot.handshake_lock.try_lock()?;
        // Re-check under the lock; an unpark may have won the race.
        if slot.thread_state.load(Ordering::Acquire) == PARKED {
            Some(HandshakeScope { slot, _guard: guard })
        } else {
            None
        }
    }

    /// Run the epoch update on the parked target's behalf and consume
    /// its armed poll.
    ///
    /// 代表停靠的目标执行纪元更新，并消耗其已武装的轮询。
    pub(crate) fn process(&self, shared: &SharedState) {
        let thread = std::thread::current();
        trace!(
            target: "gc-refine",
            thread = thread.name().unwrap_or("<unnamed>"),
            "delegate epoch update for parked mutator"
        );
        update_slot(shared, self.slot);
        self.slot.poll_armed.store(false, Ordering::Release);
    }
}
