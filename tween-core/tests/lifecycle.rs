//! # 补间生命周期集成测试
//!
//! 测试 TweenSystem → Heartbeat → Tween → Registry 的完整链路，
//! 包括延迟、暂停恢复、批量移除、目标失效与回调重入。

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::Vec3;
use tween_core::{
    Ease, SceneNode, TransformTarget, TweenEvent, TweenOptions, TweenState, TweenSystem,
};

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

fn node(name: &str) -> Rc<SceneNode> {
    Rc::new(SceneNode::new(name))
}

/// 延迟期间进度为 0 且不写入目标
#[test]
fn test_delay_holds_target_until_elapsed() {
    let system = TweenSystem::default();
    let n = node("n");
    let tween = system.move_x(&n, 10.0, 1.0, TweenOptions::new().with_delay(0.5));

    // 构造之后外部修改位置，延迟期间不应被覆盖
    n.set_local_position(Vec3::new(7.0, 0.0, 0.0));

    system.advance(0.2);
    system.advance(0.2);
    assert_eq!(n.local_position().x, 7.0);
    assert_eq!(tween.normalized_progress(), 0.0);

    system.advance(0.2);
    assert!(approx(n.local_position().x, 1.0), "{:?}", n.local_position());
    assert!(approx(tween.normalized_progress(), 0.1));
}

/// 暂停期间目标不变，恢复后从已到达的时间继续
#[test]
fn test_stop_and_resume() {
    let system = TweenSystem::default();
    let owner = node("owner");
    let value = system.value_to(&owner, 0.0, 100.0, 1.0, None);

    system.advance(0.25);
    assert_eq!(value.value(), 25.0);

    value.stop();
    assert_eq!(value.state(), TweenState::Stopped);
    for _ in 0..3 {
        system.advance(0.25);
    }
    assert_eq!(value.value(), 25.0);
    assert!(system.registry().contains(&value));

    value.start();
    system.advance(0.25);
    assert_eq!(value.value(), 50.0);
    assert_eq!(value.state(), TweenState::Running);
}

/// 移除一个目标上的补间不影响其他目标
#[test]
fn test_remove_all_is_isolated_per_target() {
    let system = TweenSystem::default();
    let a = node("a");
    let b = node("b");

    let a1 = system.move_x(&a, 10.0, 1.0, None);
    let a2 = system.scale_to(&a, Vec3::splat(2.0), 1.0, None);
    let b1 = system.move_x(&b, 10.0, 1.0, None);
    assert_eq!(system.tweens_on(&a).len(), 2);

    system.remove_all_on(&a);

    assert!(!system.has_tweens_on(&a));
    assert!(a1.is_destroyed() && a2.is_destroyed());
    assert_eq!(system.tweens_on(&b), vec![b1.clone()]);
    assert_eq!(b1.state(), TweenState::Running);

    system.advance(0.5);
    assert_eq!(a.local_position().x, 0.0);
    assert_eq!(b.local_position().x, 5.0);
}

/// 停止所有补间后保持注册，可以逐个恢复
#[test]
fn test_stop_all_keeps_registration() {
    let system = TweenSystem::default();
    let a = node("a");
    let t1 = system.move_x(&a, 10.0, 1.0, None);
    let t2 = system.move_y(&a, 10.0, 1.0, None);

    system.stop_all_on(&a);

    assert_eq!(t1.state(), TweenState::Stopped);
    assert_eq!(t2.state(), TweenState::Stopped);
    assert_eq!(system.tweens_on(&a).len(), 2);
    assert_eq!(system.running_count(), 0);

    t2.start();
    system.advance(0.5);
    assert_eq!(a.local_position(), Vec3::new(0.0, 5.0, 0.0));
}

/// 目标释放后下一帧取消，不触发完成回调
#[test]
fn test_dropped_target_cancels_without_completion() {
    let system = TweenSystem::default();
    let n = node("n");
    let completed = Rc::new(Cell::new(false));

    let tween = system.move_to(&n, Vec3::ONE, 0.5, None);
    let c = completed.clone();
    tween.on_complete(move || c.set(true));

    system.advance(0.1);
    drop(n);
    let events = system.advance(0.1);

    assert_eq!(events, vec![TweenEvent::Cancelled(tween.id())]);
    assert!(tween.is_destroyed());
    assert!(!tween.is_target_alive());
    assert!(!completed.get());
    assert_eq!(system.active_count(), 0);
    assert_eq!(system.heartbeat().subscriber_count(), 0);

    system.advance(1.0);
    assert!(!completed.get());
}

/// 同一目标上的两个补间互不影响
#[test]
fn test_two_tweens_on_one_target_are_independent() {
    let system = TweenSystem::default();
    let n = node("n");
    let mover = system.move_x(&n, 10.0, 1.0, None);
    let scaler = system.scale_to(&n, Vec3::splat(3.0), 1.0, None);

    mover.stop();
    system.advance(0.5);

    assert_eq!(mover.state(), TweenState::Stopped);
    assert_eq!(scaler.state(), TweenState::Running);
    assert_eq!(n.local_position().x, 0.0);
    assert_eq!(n.local_scale(), Vec3::splat(2.0));
}

/// 标量 0 -> 100，四帧 0.25 秒，回调顺序与次数
#[test]
fn test_scalar_tween_end_to_end() {
    let system = TweenSystem::default();
    let owner = node("owner");
    let log = Rc::new(RefCell::new(Vec::<String>::new()));

    let value = system.value_to(&owner, 0.0, 100.0, 1.0, TweenOptions::from(Ease::Linear));
    let l = log.clone();
    value.on_start(move || l.borrow_mut().push("start".to_string()));
    let l = log.clone();
    let handle = value.clone();
    value.on_update(move |_, progress| {
        l.borrow_mut()
            .push(format!("update p={progress} v={}", handle.value()));
    });
    let l = log.clone();
    value.on_complete(move || l.borrow_mut().push("complete".to_string()));
    let l = log.clone();
    value.on_complete_with_self(move |tween| {
        l.borrow_mut()
            .push(format!("complete_with_self {}", tween.id()));
    });

    let mut events = Vec::new();
    for _ in 0..4 {
        events.extend(system.advance(0.25));
    }
    // 完成后继续推进不再有回调
    events.extend(system.advance(0.25));

    let log = log.borrow().clone();
    insta::assert_debug_snapshot!(log, @r#"
    [
        "start",
        "update p=0.25 v=25",
        "update p=0.5 v=50",
        "update p=0.75 v=75",
        "update p=1 v=100",
        "complete",
        "complete_with_self Tween(1)",
    ]
    "#);

    assert_eq!(
        events,
        vec![
            TweenEvent::Started(value.id()),
            TweenEvent::Completed(value.id())
        ]
    );
    assert_eq!(value.state(), TweenState::Done);
    assert_eq!(value.value(), 100.0);
    assert!(!system.registry().contains(&value));
    assert!(!system.has_tweens_on(&owner));
}

/// 在逐帧回调中销毁自身
#[test]
fn test_destroy_self_inside_update() {
    let system = TweenSystem::default();
    let n = node("n");
    let updates = Rc::new(Cell::new(0));
    let completed = Rc::new(Cell::new(false));

    let tween = system.move_x(&n, 10.0, 1.0, None);
    let u = updates.clone();
    tween.on_update(move |tween, _| {
        u.set(u.get() + 1);
        tween.destroy();
    });
    let c = completed.clone();
    tween.on_complete(move || c.set(true));

    let events = system.advance(0.5);
    system.advance(0.5);
    system.advance(0.5);

    assert_eq!(updates.get(), 1);
    assert!(!completed.get());
    assert_eq!(
        events,
        vec![
            TweenEvent::Started(tween.id()),
            TweenEvent::Cancelled(tween.id())
        ]
    );
    assert_eq!(n.local_position().x, 5.0);
    assert_eq!(system.active_count(), 0);
}

/// 回调中移除另一个目标的补间，本帧内不会再推进它
#[test]
fn test_remove_all_from_callback_mid_frame() {
    let system = TweenSystem::default();
    let a = node("a");
    let b = node("b");

    let killer = system.run_for(&a, 1.0, None);
    let victim = system.move_x(&b, 10.0, 1.0, None);

    let sys = system.clone();
    let other = b.clone();
    killer.on_update(move |_, _| sys.remove_all_on(&other));

    system.advance(0.5);

    assert!(victim.is_destroyed());
    assert_eq!(b.local_position().x, 0.0);
    assert_eq!(killer.state(), TweenState::Running);
    killer.destroy();
}

/// 完成回调中停止同一目标上排在后面的补间
#[test]
fn test_stop_all_from_completion_callback() {
    let system = TweenSystem::default();
    let n = node("n");

    let first = system.run_for(&n, 0.5, None);
    let second = system.move_x(&n, 10.0, 1.0, None);

    let sys = system.clone();
    let target = Rc::downgrade(&n);
    first.on_complete(move || {
        if let Some(target) = target.upgrade() {
            sys.stop_all_on(&target);
        }
    });

    system.advance(0.5);

    assert_eq!(first.state(), TweenState::Done);
    assert_eq!(second.state(), TweenState::Stopped);
    assert_eq!(n.local_position().x, 0.0);
    assert_eq!(system.tweens_on(&n), vec![second.clone()]);
}

/// 完成回调中启动的新补间从下一帧开始推进
#[test]
fn test_chained_tween_starts_next_frame() {
    let system = TweenSystem::default();
    let n = node("n");
    let chained = Rc::new(RefCell::new(None));

    let first = system.move_x(&n, 10.0, 0.5, None);
    let sys = system.clone();
    let target = Rc::downgrade(&n);
    let slot = chained.clone();
    first.on_complete(move || {
        if let Some(target) = target.upgrade() {
            *slot.borrow_mut() = Some(sys.move_y(&target, 10.0, 0.5, None));
        }
    });

    system.advance(0.5);
    let next = chained.borrow().clone();
    let Some(next) = next else {
        panic!("完成回调没有启动新补间");
    };
    assert_eq!(next.elapsed(), 0.0);
    assert_eq!(n.local_position(), Vec3::new(10.0, 0.0, 0.0));

    system.advance(0.25);
    assert_eq!(n.local_position(), Vec3::new(10.0, 5.0, 0.0));
}

/// 暂停发生在最后一帧的逐帧回调中时，完成被推迟到恢复之后
#[test]
fn test_stop_on_final_update_defers_completion() {
    let system = TweenSystem::default();
    let owner = node("owner");
    let completed = Rc::new(Cell::new(0));

    let value = system.value_to(&owner, 0.0, 1.0, 0.5, None);
    value.on_update(|tween, progress| {
        if progress >= 1.0 {
            tween.stop();
        }
    });
    let c = completed.clone();
    value.on_complete(move || c.set(c.get() + 1));

    system.advance(0.5);
    assert_eq!(value.state(), TweenState::Stopped);
    assert_eq!(completed.get(), 0);

    value.clear_callbacks();
    let c = completed.clone();
    value.on_complete(move || c.set(c.get() + 1));
    value.start();
    system.advance(0.1);

    assert_eq!(value.state(), TweenState::Done);
    assert_eq!(completed.get(), 1);
}

/// 完成回调移除自身目标上的全部补间：同目标的后续补间被取消，带自身的完成回调不再触发
#[test]
fn test_remove_all_on_own_target_from_completion() {
    let system = TweenSystem::default();
    let n = node("n");
    let with_self = Rc::new(Cell::new(0));

    let first = system.run_for(&n, 0.5, None);
    let second = system.move_x(&n, 10.0, 1.0, None);

    let sys = system.clone();
    let target = Rc::downgrade(&n);
    first.on_complete(move || {
        if let Some(target) = target.upgrade() {
            sys.remove_all_on(&target);
        }
    });
    let count = with_self.clone();
    first.on_complete_with_self(move |_| count.set(count.get() + 1));

    let events = system.advance(0.5);

    assert_eq!(
        events,
        vec![
            TweenEvent::Started(first.id()),
            TweenEvent::Completed(first.id()),
            TweenEvent::Cancelled(second.id()),
        ]
    );
    assert!(first.is_destroyed());
    assert!(second.is_destroyed());
    assert_eq!(with_self.get(), 0);
    assert_eq!(system.active_count(), 0);
    assert_eq!(n.local_position().x, 0.0);
}

/// 同一帧内被暂停又恢复的补间不会丢掉这一帧
#[test]
fn test_stop_and_start_in_same_frame_keeps_tick() {
    let system = TweenSystem::default();
    let a = node("a");
    let b = node("b");

    let driver = system.run_for(&a, 1.0, None);
    let restarted = system.value_to(&b, 0.0, 100.0, 1.0, None);

    let handle = (*restarted).clone();
    let done = Cell::new(false);
    driver.on_update(move |_, _| {
        if !done.replace(true) {
            handle.stop();
            handle.start();
        }
    });

    system.advance(0.25);
    assert_eq!(restarted.elapsed(), 0.25);
    assert_eq!(restarted.value(), 25.0);

    system.advance(0.25);
    assert_eq!(restarted.elapsed(), 0.5);
    driver.destroy();
}
