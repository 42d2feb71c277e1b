//! 基础测试模块
//! 测试核心功能的正确性

use crate::sync::Ordering;
use crate::{EpochSyncDomain, SyncOutcome};

/// 测试1: 创建域并注册 mutator
#[test]
fn test_create_domain_and_register_mutator() {
    let domain = EpochSyncDomain::new();
    let mutator = domain.register_mutator();

    // 初始时全局纪元和本地纪元都为 0
    assert_eq!(domain.global_epoch(), 0);
    assert_eq!(mutator.slot.local_epoch.load(Ordering::Acquire), 0);
}

/// 测试2: start_sync = false 的发起者立即同步（场景5）
#[test]
fn test_no_op_construction() {
    let domain = EpochSyncDomain::new();
    let _mutator = domain.register_mutator();

    let syncer = domain.synchronizer(false);

    assert_eq!(syncer.required_frontier(), 0);
    assert!(syncer.check_synchronized());

    // pending_sync 不受影响
    #[cfg(debug_assertions)]
    assert_eq!(domain.shared.pending_sync.load(Ordering::Relaxed), 0);
}

/// 测试3: 快速路径（场景1）
/// 全局纪元 5、三个 mutator 都在 5；发起后每个 mutator 走一次同步点
#[test]
fn test_fast_path_three_mutators() {
    let domain = EpochSyncDomain::new();
    domain.shared.global_epoch.store(5, Ordering::Release);

    let m1 = domain.register_mutator();
    let m2 = domain.register_mutator();
    let m3 = domain.register_mutator();
    m1.update_epoch();
    m2.update_epoch();
    m3.update_epoch();

    let syncer = domain.synchronizer(true);
    assert_eq!(syncer.required_frontier(), 6);

    // 尚未有 mutator 越过边界
    assert!(!syncer.check_synchronized());

    m1.update_epoch();
    m2.update_epoch();
    m3.update_epoch();

    assert_eq!(syncer.synchronize(), SyncOutcome::Complete);
    assert_eq!(
        domain.shared.global_frontier.load(Ordering::Acquire),
        6
    );
}

/// 测试4: 单个落后者阻止同步，更新后放行
#[test]
fn test_single_straggler_blocks_then_releases() {
    let domain = EpochSyncDomain::new();
    let fast = domain.register_mutator();
    let slow = domain.register_mutator();

    let syncer = domain.synchronizer(true);

    fast.update_epoch();
    assert!(!syncer.check_synchronized());

    slow.update_epoch();
    assert!(syncer.check_synchronized());
}

/// 测试5: 全局边界的备忘效应（场景6）
/// 后构造的发起者命中已提升的边界，无需扫描即可返回
#[test]
fn test_frontier_memoization() {
    let domain = EpochSyncDomain::new();
    let mutator = domain.register_mutator();

    let first = domain.synchronizer(true);
    let second = domain.synchronizer(true);

    // 一次更新同时满足两个发起者，且把边界提升到两者之上
    mutator.update_epoch();
    assert!(second.check_synchronized());
    assert!(first.check_synchronized());
    assert_eq!(
        domain.shared.global_frontier.load(Ordering::Acquire),
        2
    );

    // 注册一个纪元为 0 的新 mutator：对边界 2 的扫描会失败，而命中
    // 已备忘边界的发起者无需扫描即可成功，证明扫描被跳过了
    let _late = domain.register_mutator();
    let third = domain.synchronizer(true);
    third.required_frontier.set(2);
    assert!(third.check_synchronized());
}

/// 测试6: 停靠的落后者由升级扫描代为更新（场景2）
#[test]
fn test_parked_straggler_updated_in_scope() {
    let domain = EpochSyncDomain::new();
    let running = domain.register_mutator();
    let parked = domain.register_mutator();

    let guard = parked.park();

    let syncer = domain.synchronizer(true);
    running.update_epoch();

    // 停靠者落后，快速检查失败；升级会在作用域内代表它更新
    assert_eq!(syncer.synchronize(), SyncOutcome::Complete);
    assert_eq!(
        parked.slot.local_epoch.load(Ordering::Acquire),
        syncer.required_frontier()
    );

    drop(guard);
}

/// 测试7: global_epoch() 访问器反映推进
#[test]
fn test_global_epoch_accessor() {
    let domain = EpochSyncDomain::new();
    assert_eq!(domain.global_epoch(), 0);

    let s1 = domain.synchronizer(true);
    assert_eq!(domain.global_epoch(), 1);
    let s2 = domain.synchronizer(true);
    assert_eq!(domain.global_epoch(), 2);

    // 清理：完成两个发起者
    let m = domain.register_mutator();
    m.update_epoch();
    assert!(s1.check_synchronized());
    assert!(s2.check_synchronized());
}

/// 测试8: 未武装的轮询是空操作
#[test]
fn test_poll_without_armed_flag_is_noop() {
    let domain = EpochSyncDomain::new();
    domain.shared.global_epoch.store(3, Ordering::Release);

    let mutator = domain.register_mutator();
    assert_eq!(mutator.slot.local_epoch.load(Ordering::Acquire), 0);

    // 轮询未武装：不发布纪元
    mutator.poll();
    assert_eq!(mutator.slot.local_epoch.load(Ordering::Acquire), 0);
}

/// 测试9: 武装后的轮询走慢路径并发布纪元
#[test]
fn test_armed_poll_publishes_epoch() {
    let domain = EpochSyncDomain::new();
    let running = domain.register_mutator();

    let syncer = domain.synchronizer(true);

    // 升级武装了落后者的轮询（3 纳秒的 debug 超时会让它延迟）
    let outcome = syncer.synchronize();
    assert_eq!(outcome, SyncOutcome::Deferred);
    assert!(running.slot.poll_armed.load(Ordering::Acquire));

    // mutator 的下一次轮询处理握手
    running.poll();
    assert!(!running.slot.poll_armed.load(Ordering::Acquire));
    assert!(syncer.check_synchronized());
}

/// 测试10: 多个域互相独立
#[test]
fn test_domains_are_independent() {
    let domain_a = EpochSyncDomain::new();
    let domain_b = EpochSyncDomain::new();

    let mutator_a = domain_a.register_mutator();

    let syncer_a = domain_a.synchronizer(true);
    assert_eq!(domain_a.global_epoch(), 1);
    assert_eq!(domain_b.global_epoch(), 0);

    // B 域没有 mutator，空洞地同步
    let syncer_b = domain_b.synchronizer(true);
    assert!(syncer_b.check_synchronized());
    assert!(!syncer_a.check_synchronized());

    mutator_a.update_epoch();
    assert!(syncer_a.check_synchronized());
}
