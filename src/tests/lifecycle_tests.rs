//! 生命周期测试模块
//! 测试句柄生命周期、槽位清理、跨线程交接与完整场景

use crate::sync::Ordering;
use crate::{DeferredQueue, EpochSyncDomain, SyncOutcome, SyncStats};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// 测试1: 域克隆共享同一份全局状态
#[test]
fn test_domain_clone_shares_state() {
    let domain = EpochSyncDomain::new();
    let clone = domain.clone();

    let _syncer = domain.synchronizer(true);
    assert_eq!(clone.global_epoch(), 1);

    let mutator = clone.register_mutator();
    mutator.update_epoch();
    assert!(_syncer.check_synchronized());
}

/// 测试2: mutator 句柄可以移交给它的目标线程
#[test]
fn test_mutator_handle_moves_to_thread() {
    let domain = EpochSyncDomain::builder()
        .wait_timeout(Duration::from_secs(5))
        .build();

    // 在主线程注册，然后把句柄移交给 mutator 线程使用
    let mutator = domain.register_mutator();
    let stop = Arc::new(AtomicBool::new(false));
    let stop_clone = stop.clone();

    let handle = thread::spawn(move || {
        while !stop_clone.load(std::sync::atomic::Ordering::Relaxed) {
            mutator.update_epoch();
            mutator.poll();
            thread::yield_now();
        }
    });

    let syncer = domain.synchronizer(true);
    assert_eq!(syncer.synchronize(), SyncOutcome::Complete);

    stop.store(true, std::sync::atomic::Ordering::Relaxed);
    handle.join().unwrap();
}

/// 测试3: 落后者中途退出，同步仍能完成
#[test]
fn test_straggler_exit_unblocks_sync() {
    let domain = EpochSyncDomain::new();

    let live = domain.register_mutator();
    let doomed = domain.register_mutator();

    let syncer = domain.synchronizer(true);
    live.update_epoch();

    // doomed 从未更新，同步被挡住
    assert!(!syncer.check_synchronized());

    // 线程退出（句柄消亡）后其槽位不再被计入
    drop(doomed);
    assert!(syncer.check_synchronized());
}

/// 测试4: 安全点重置清理已退出线程的槽位
#[test]
fn test_reset_cleans_dead_slots() {
    let domain = EpochSyncDomain::new();

    let keep = domain.register_mutator();
    for _ in 0..3 {
        let transient = domain.register_mutator();
        drop(transient);
    }
    assert_eq!(domain.shared.mutators.lock().len(), 4);

    let mut deferred = DeferredQueue::new();
    let guard = keep.park();
    {
        let scope = domain.safepoint();
        scope.reset_all_epochs(&mut deferred);
    }
    drop(guard);

    // 只剩存活的槽位
    assert_eq!(domain.shared.mutators.lock().len(), 1);
}

/// 测试5: 安全点作用域 drop 后世界恢复
#[test]
fn test_world_resumes_after_safepoint() {
    let domain = EpochSyncDomain::new();
    let mutator = domain.register_mutator();

    let guard = mutator.park();
    {
        let _scope = domain.safepoint();
        assert!(domain.shared.safepoint_active.load(Ordering::Acquire));
    }
    assert!(!domain.shared.safepoint_active.load(Ordering::Acquire));
    assert!(!domain.shared.safepoint_requested.load(Ordering::Acquire));

    // 取消停靠照常进行
    drop(guard);
    mutator.update_epoch();
}

/// 测试6: 延迟队列的基本簿记
#[test]
fn test_deferred_queue_bookkeeping() {
    let domain = EpochSyncDomain::builder()
        .wait_timeout(Duration::from_nanos(3))
        .build();

    let mut deferred = DeferredQueue::new();
    assert!(deferred.is_empty());
    assert_eq!(deferred.len(), 0);
    assert_eq!(deferred.drain_completed(), 0);

    let straggler = domain.register_mutator();

    let first = domain.synchronizer(true);
    assert_eq!(first.synchronize(), SyncOutcome::Deferred);
    deferred.push(first);

    let second = domain.synchronizer(true);
    assert_eq!(second.synchronize(), SyncOutcome::Deferred);
    deferred.push(second);

    assert_eq!(deferred.len(), 2);

    // 落后者尚未走到同步点：什么都排不掉
    assert_eq!(deferred.drain_completed(), 0);
    assert_eq!(deferred.len(), 2);

    // 一次轮询同时满足两个条目
    straggler.poll();
    assert_eq!(deferred.drain_completed(), 2);
    assert!(deferred.is_empty());

    #[cfg(debug_assertions)]
    assert_eq!(domain.shared.pending_sync.load(Ordering::Relaxed), 0);
}

/// 测试7: 安全点等待运行中的 mutator 停靠
#[test]
fn test_safepoint_waits_for_park() {
    let domain = EpochSyncDomain::new();
    let mutator = domain.register_mutator();

    let reached = Arc::new(AtomicBool::new(false));
    let reached_clone = reached.clone();
    let domain_clone = domain.clone();

    let vm_thread = thread::spawn(move || {
        let scope = domain_clone.safepoint();
        reached_clone.store(true, std::sync::atomic::Ordering::Release);
        drop(scope);
    });

    // mutator 还在运行：安全点不可能达成
    thread::sleep(Duration::from_millis(10));
    assert!(!reached.load(std::sync::atomic::Ordering::Acquire));

    // 停靠让世界停下
    let guard = mutator.park();
    vm_thread.join().unwrap();
    assert!(reached.load(std::sync::atomic::Ordering::Acquire));
    drop(guard);
}

/// 测试8: 完整场景——轮询、停靠、延迟、重置、统计
#[test]
fn test_full_lifecycle() {
    let domain = EpochSyncDomain::builder()
        .wait_timeout(Duration::from_millis(100))
        .reset_threshold(8)
        .build();

    let stop = Arc::new(AtomicBool::new(false));
    let mut handles = vec![];

    for _ in 0..3 {
        let domain_clone = domain.clone();
        let stop_clone = stop.clone();
        handles.push(thread::spawn(move || {
            let mutator = domain_clone.register_mutator();
            while !stop_clone.load(std::sync::atomic::Ordering::Relaxed) {
                mutator.update_epoch();
                mutator.poll();
                {
                    // 偶尔停靠一下，给代为更新的路径机会
                    let _guard = mutator.park();
                }
                thread::yield_now();
            }
        }));
    }

    thread::sleep(Duration::from_millis(10));

    let mut stats = SyncStats::new();
    let mut deferred = DeferredQueue::new();

    for _ in 0..10 {
        let syncer = domain.synchronizer(true);
        if syncer.synchronize_timed(&mut stats) == SyncOutcome::Deferred {
            deferred.push(syncer);
        }
        while deferred.drain_completed() > 0 {}
        if deferred.is_empty() {
            continue;
        }
        // 给落后者一点时间再排空
        thread::sleep(Duration::from_millis(1));
        deferred.drain_completed();
    }

    // 收尾：停掉 mutator，排空余下的延迟条目
    stop.store(true, std::sync::atomic::Ordering::Relaxed);
    for handle in handles {
        handle.join().unwrap();
    }
    deferred.drain_completed();
    assert!(deferred.is_empty());

    assert_eq!(stats.fast_syncs() + stats.deferred_syncs(), 10);

    // 所有 mutator 已退出：安全点立即达成，重置照常执行
    {
        let scope = domain.safepoint();
        scope.reset_all_epochs(&mut deferred);
    }
    assert_eq!(domain.global_epoch(), 0);
    assert_eq!(domain.shared.mutators.lock().len(), 0);
}
