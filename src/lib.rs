//! Asymmetric epoch synchronization between mutator threads and
//! concurrent refinement workers.
//!
//! A refinement worker reading heap metadata that mutators write needs a
//! one-way guarantee: after the protocol completes, every store a
//! mutator issued before the protocol started is visible to the worker.
//! The usual answer is a store-load fence on the mutator's write path;
//! this crate avoids that cost by piggybacking on synchronization points
//! the mutator runtime already has (polls, thread-state transitions).
//!
//! The machinery is a global epoch counter, a per-mutator local epoch
//! published at those pre-existing points, and a memoized global
//! frontier. An initiator bumps the global epoch (a full fence), then
//! waits until every mutator's local epoch has been observed at or past
//! the bumped value; the release/acquire pairing on the local epochs
//! carries the visibility. Stragglers are escalated by arming their
//! polls, parked threads are updated on their behalf, and a bounded wait
//! turns into a `Deferred` outcome rather than blocking, so a collector
//! operation is never held hostage by an unresponsive mutator. A
//! stop-the-world reset rewinds the counters before they can drift
//! anywhere near the wrap-aware comparison's limit.
//!
//! mutator 线程与并发细化工作线程之间的非对称纪元同步。
//!
//! 读取 mutator 所写堆元数据的细化工作线程需要一个单向保证：协议完成后，
//! mutator 在协议开始之前发出的每个存储都对工作线程可见。通常的做法是在
//! mutator 的写路径上加 store-load 栅栏；本 crate 通过搭载 mutator 运行时
//! 已有的同步点（轮询、线程状态转换）来避免这一开销。
//!
//! 机制由全局纪元计数器、在这些既有同步点发布的每 mutator 本地纪元、以及
//! 备忘的全局边界构成。发起者推进全局纪元（完整栅栏），然后等待直到观察
//! 到每个 mutator 的本地纪元到达或越过推进后的值；本地纪元上的
//! release/acquire 配对承载了可见性。落后者通过武装其轮询来升级，停靠的
//! 线程由他人代为更新，有界等待则转化为 `Deferred` 结果而非阻塞，因此
//! 收集器操作绝不会被无响应的 mutator 挟持。一次 stop-the-world 重置会在
//! 计数器漂移到接近回绕感知比较的极限之前将其回拨。

mod domain;
mod epoch;
mod mutator;
mod reset;
mod scan;
mod state;
mod stats;
mod sync;
mod synchronizer;

pub use domain::{EpochSyncDomain, EpochSyncDomainBuilder};
pub use mutator::{MutatorEpoch, ParkGuard};
pub use reset::{DeferredQueue, SafepointScope};
pub use stats::SyncStats;
pub use synchronizer::{SyncOutcome, Synchronizer};

#[cfg(test)]
mod tests;
