use crate::mutator::MutatorEpoch;
use crate::reset::SafepointScope;
use crate::state::{SharedState, SyncConfig};
use crate::sync::{Arc, Ordering};
use crate::synchronizer::Synchronizer;
use std::time::Duration;

/// Builder for configuring an `EpochSyncDomain`.
///
/// Use this builder to customize the protocol's escalation behavior:
/// - `wait_timeout`: bound on the initiator's spin wait before deferring
/// - `reset_threshold`: epoch high-water mark that schedules a reset
/// - `stress_reset`: request a reset on every initiation (testing)
///
/// # Example
/// ```
/// use refine_epoch::EpochSyncDomain;
/// use std::time::Duration;
///
/// let domain = EpochSyncDomain::builder()
///     .wait_timeout(Duration::from_millis(1))
///     .reset_threshold(1 << 20)
///     .build();
/// ```
///
/// 用于配置 `EpochSyncDomain` 的构建器。
pub struct EpochSyncDomainBuilder {
    config: SyncConfig,
}

impl EpochSyncDomainBuilder {
    /// Create a new builder with default settings.
    /// 创建一个带有默认设置的新构建器。
    #[inline]
    pub fn new() -> Self {
        Self {
            config: SyncConfig::default(),
        }
    }

    /// Set the spin-wait bound of `Synchronizer::synchronize()`.
    ///
    /// Past this bound the initiator stops waiting and reports
    /// `Deferred`. Default: 3 ms in release builds, 3 ns in debug builds
    /// so the deferred path is exercised constantly under test.
    ///
    /// 设置 `Synchronizer::synchronize()` 的自旋等待上限。
    /// 超过该上限后发起者停止等待并报告 `Deferred`。默认值：release
    /// 构建为 3 毫秒，debug 构建为 3 纳秒，使延迟路径在测试下被持续走到。
    #[inline]
    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.config.wait_timeout = timeout;
        self
    }

    /// Set the epoch value past which a reset is scheduled.
    ///
    /// Must stay well below half the counter range; the wrap-aware
    /// comparison tolerates modest lag, not unbounded drift.
    ///
    /// 设置调度重置所越过的纪元值。
    /// 必须远低于计数器范围的一半；回绕感知比较容忍适度落后，
    /// 但不容忍无界漂移。
    #[inline]
    pub fn reset_threshold(mut self, threshold: usize) -> Self {
        self.config.reset_threshold = threshold;
        self
    }

    /// Request a reset on every initiation, regardless of the threshold.
    /// Exercises the reset path in tests.
    ///
    /// 无论阈值如何，每次发起都请求一次重置。用于在测试中走到重置路径。
    #[inline]
    pub fn stress_reset(mut self, stress: bool) -> Self {
        self.config.stress_reset = stress;
        self
    }

    /// Build the `EpochSyncDomain` with the configured settings.
    /// 使用配置的设置构建 `EpochSyncDomain`。
    #[inline]
    pub fn build(self) -> EpochSyncDomain {
        EpochSyncDomain {
            shared: Arc::new(SharedState::new(self.config)),
        }
    }
}

impl Default for EpochSyncDomainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An asymmetric epoch synchronization domain.
///
/// `EpochSyncDomain` is the entry point for the protocol. It owns:
/// - The global epoch and the memoized global frontier.
/// - Registration of mutator threads.
/// - Construction of initiators (`Synchronizer`) and safepoint scopes.
///
/// `EpochSyncDomain` is `Clone` and can be safely shared across threads.
/// Typically, you create one domain at startup and clone it to threads
/// that need it.
///
/// **Typical usage**:
/// ```
/// use refine_epoch::EpochSyncDomain;
///
/// let domain = EpochSyncDomain::new();
///
/// // Mutator threads: register once, then publish at sync points
/// let mutator = domain.register_mutator();
/// mutator.update_epoch();
///
/// // Refinement worker: initiate, then synchronize before reading
/// let syncer = domain.synchronizer(true);
/// let outcome = syncer.synchronize();
/// # let _ = (outcome, syncer.check_synchronized());
/// ```
///
/// 非对称纪元同步域。
/// `EpochSyncDomain` 是协议的入口点。它拥有：
/// - 全局纪元与备忘的全局边界。
/// - mutator 线程的注册。
/// - 发起者（`Synchronizer`）与安全点作用域的构造。
/// `EpochSyncDomain` 是 `Clone` 的，可以安全地在线程间共享。
/// 通常，你在启动时创建一个域并将其克隆到需要它的线程。
#[derive(Clone)]
pub struct EpochSyncDomain {
    pub(crate) shared: Arc<SharedState>,
}

impl EpochSyncDomain {
    /// Create a new domain with default settings.
    /// 创建一个带有默认设置的新域。
    #[inline]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for configuring the domain.
    /// 创建一个用于配置域的构建器。
    #[inline]
    pub fn builder() -> EpochSyncDomainBuilder {
        EpochSyncDomainBuilder::new()
    }

    /// Register the current thread as a mutator.
    ///
    /// Returns a `MutatorEpoch` that should be stored per-thread. The
    /// caller is responsible for ensuring that each `MutatorEpoch` is
    /// used by only one thread.
    ///
    /// 将当前线程注册为 mutator。
    /// 返回一个应该按线程存储的 `MutatorEpoch`。调用者有责任确保每个
    /// `MutatorEpoch` 仅由一个线程使用。
    #[inline]
    pub fn register_mutator(&self) -> MutatorEpoch {
        MutatorEpoch::new(Arc::clone(&self.shared))
    }

    /// Construct an initiator.
    ///
    /// With `start_sync = true` this advances the global epoch (a full
    /// fence) and captures the required frontier; with `false` the value
    /// is trivially synchronized and touches no shared state.
    ///
    /// 构造一个发起者。
    /// `start_sync = true` 时推进全局纪元（完整栅栏）并记下所需边界；
    /// `false` 时该值平凡同步，不触碰任何共享状态。
    #[inline]
    pub fn synchronizer(&self, start_sync: bool) -> Synchronizer {
        Synchronizer::new(Arc::clone(&self.shared), start_sync)
    }

    /// The current global epoch, for debugging and logging.
    /// 当前全局纪元，用于调试与日志。
    #[inline]
    pub fn global_epoch(&self) -> usize {
        self.shared.global_epoch.load(Ordering::Acquire)
    }

    /// Has an epoch reset been scheduled for the next safepoint?
    /// 是否已为下一个安全点调度了纪元重置？
    #[inline]
    pub fn reset_pending(&self) -> bool {
        self.shared.reset_scheduled.load(Ordering::Acquire)
    }

    /// Stop the world: wait until every live mutator is parked, then
    /// hold them parked for the lifetime of the returned scope.
    ///
    /// 停止世界：等待每个存活的 mutator 停靠，然后在返回的作用域
    /// 存活期间保持它们停靠。
    pub fn safepoint(&self) -> SafepointScope {
        SafepointScope::enter(Arc::clone(&self.shared))
    }

    /// Check the `pending_sync` bookkeeping against the deferred buffer
    /// on entry to a collection pause, then clear it. Debug builds only.
    ///
    /// 在进入收集暂停时，将 `pending_sync` 记账与延迟缓冲区核对，
    /// 然后将其清零。仅 debug 构建。
    #[cfg(debug_assertions)]
    pub fn verify_before_collection_pause(&self, deferred_length: usize) {
        let pending = self.shared.pending_sync.load(Ordering::Relaxed);
        assert_eq!(
            pending, deferred_length,
            "pending_sync({}) != deferred_sync({}): a live initiator was \
             neither completed nor deferred before the pause",
            pending, deferred_length
        );
        self.shared.pending_sync.store(0, Ordering::Relaxed);
    }
}

impl Default for EpochSyncDomain {
    fn default() -> Self {
        Self::new()
    }
}
