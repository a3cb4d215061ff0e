//! # System 模块
//!
//! 补间系统：持有心跳与注册表，提供各属性族的构造接口与批量控制。
//!
//! ```rust,ignore
//! let system = TweenSystem::default();
//! let node = Rc::new(SceneNode::new("box"));
//! system
//!     .move_to(&node, Vec3::new(10.0, 0.0, 0.0), 0.5, TweenOptions::from(Ease::OutQuad))
//!     .on_complete(|| println!("到达"));
//!
//! // 每帧
//! let events = system.advance(dt);
//! ```

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use glam::{Quat, Vec2, Vec3};
use tracing::debug;

use crate::config::TweenConfig;
use crate::heartbeat::Heartbeat;
use crate::property::{
    ColorProperty, RotationProperty, RunProperty, ValueProperty, ValueTween, Vec2Property,
    Vec3Property,
};
use crate::registry::{Registry, TargetKey};
use crate::target::{Axis, Color, ColorTarget, RectTarget, Space, TransformTarget};
use crate::tween::{Tween, TweenEvent, TweenId, TweenOptions, TweenProperty, TweenState};

/// 系统内部共享状态，补间以弱引用持有
pub(crate) struct SystemShared {
    pub(crate) heartbeat: Heartbeat,
    pub(crate) registry: Registry,
    pub(crate) events: RefCell<Vec<TweenEvent>>,
    next_id: Cell<u64>,
    config: TweenConfig,
}

/// 补间系统
///
/// 克隆得到的是同一个系统的句柄。系统释放后，
/// 尚存的补间句柄仍可查询，但不会再被心跳推进。
#[derive(Clone)]
pub struct TweenSystem {
    shared: Rc<SystemShared>,
}

impl Default for TweenSystem {
    fn default() -> Self {
        Self::new(TweenConfig::default())
    }
}

impl fmt::Debug for TweenSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TweenSystem")
            .field("tweens", &self.shared.registry.len())
            .field("running", &self.running_count())
            .field("frame", &self.shared.heartbeat.frame())
            .finish()
    }
}

type Vec3Accessors<T> = (fn(&T) -> Vec3, fn(&T, Vec3), &'static str);
type QuatAccessors<T> = (fn(&T) -> Quat, fn(&T, Quat), &'static str);

fn position_accessors<T: TransformTarget>(space: Space) -> Vec3Accessors<T> {
    match space {
        Space::Local => (
            T::local_position as fn(&T) -> Vec3,
            T::set_local_position as fn(&T, Vec3),
            "local_position",
        ),
        Space::World => (
            T::position as fn(&T) -> Vec3,
            T::set_position as fn(&T, Vec3),
            "position",
        ),
    }
}

fn rotation_accessors<T: TransformTarget>(space: Space) -> QuatAccessors<T> {
    match space {
        Space::Local => (
            T::local_rotation as fn(&T) -> Quat,
            T::set_local_rotation as fn(&T, Quat),
            "local_rotation",
        ),
        Space::World => (
            T::rotation as fn(&T) -> Quat,
            T::set_rotation as fn(&T, Quat),
            "rotation",
        ),
    }
}

impl TweenSystem {
    /// 创建补间系统
    pub fn new(config: TweenConfig) -> Self {
        Self {
            shared: Rc::new(SystemShared {
                heartbeat: Heartbeat::new(),
                registry: Registry::new(),
                events: RefCell::new(Vec::new()),
                next_id: Cell::new(1),
                config,
            }),
        }
    }

    pub fn config(&self) -> &TweenConfig {
        &self.shared.config
    }

    /// 驱动补间的心跳
    ///
    /// 通常通过 [`advance`](Self::advance) 推进。直接推进心跳时不会应用时间缩放，
    /// 也不会取出事件队列，见 [`drain_events`](Self::drain_events)。
    pub fn heartbeat(&self) -> &Heartbeat {
        &self.shared.heartbeat
    }

    /// 目标注册表
    pub fn registry(&self) -> &Registry {
        &self.shared.registry
    }

    /// 按配置生成的默认选项
    pub fn default_options(&self) -> TweenOptions {
        self.shared.config.default_options()
    }

    /// 推进一帧
    ///
    /// 帧间隔先经过配置的时间缩放与上限处理；推进后清理目标已释放的
    /// 未运行补间。返回本帧产生的生命周期事件。
    pub fn advance(&self, delta_time: f32) -> Vec<TweenEvent> {
        let delta_time = self.shared.config.frame_delta(delta_time);
        self.shared.heartbeat.advance(delta_time);
        self.shared.registry.prune_dead();
        self.drain_events()
    }

    /// 取出尚未读取的生命周期事件
    ///
    /// 事件在队列中累积直到被取出。`advance` 每帧自动取出；
    /// 直接驱动 [`heartbeat`](Self::heartbeat) 的宿主必须自己定期调用本方法，
    /// 同时负责调用 [`Registry::prune_dead`]。
    pub fn drain_events(&self) -> Vec<TweenEvent> {
        std::mem::take(&mut *self.shared.events.borrow_mut())
    }

    fn next_id(&self) -> TweenId {
        let id = self.shared.next_id.get();
        self.shared.next_id.set(id + 1);
        TweenId::new(id)
    }

    fn resolve(&self, options: impl Into<Option<TweenOptions>>) -> TweenOptions {
        options
            .into()
            .unwrap_or_else(|| self.shared.config.default_options())
    }

    // ========== 构造 ==========

    /// 用自定义属性策略创建补间
    ///
    /// 返回的补间处于 `Ready` 状态并已注册，需要调用 `start`。
    pub fn build<T: 'static>(
        &self,
        target: &Rc<T>,
        property: impl TweenProperty,
        duration: f32,
        options: &TweenOptions,
    ) -> Tween {
        let id = self.next_id();
        let anchor: Rc<dyn Any> = target.clone();
        let tween = Tween::new(
            id,
            Rc::downgrade(&anchor),
            Box::new(property),
            duration,
            options,
            Rc::downgrade(&self.shared),
        );
        self.shared.registry.register(&tween);
        debug!(
            tween = %id,
            property = tween.label(),
            duration,
            delay = tween.delay(),
            ease = %tween.ease(),
            "创建补间"
        );
        tween
    }

    /// 创建并立即启动
    pub fn spawn<T: 'static>(
        &self,
        target: &Rc<T>,
        property: impl TweenProperty,
        duration: f32,
        options: &TweenOptions,
    ) -> Tween {
        let tween = self.build(target, property, duration, options);
        tween.start();
        tween
    }

    /// 移动到指定位置
    ///
    /// `options.space` 决定使用本地坐标还是世界坐标。
    pub fn move_to<T: TransformTarget>(
        &self,
        target: &Rc<T>,
        end: Vec3,
        duration: f32,
        options: impl Into<Option<TweenOptions>>,
    ) -> Tween {
        let options = self.resolve(options);
        let (read, write, label) = position_accessors::<T>(options.space);
        let property = Vec3Property::new(target, read, write, end, label);
        self.spawn(target, property, duration, &options)
    }

    /// 沿单轴移动，其他分量不受影响
    pub fn move_axis<T: TransformTarget>(
        &self,
        target: &Rc<T>,
        axis: Axis,
        end: f32,
        duration: f32,
        options: impl Into<Option<TweenOptions>>,
    ) -> Tween {
        let options = self.resolve(options);
        let (read, write, label) = position_accessors::<T>(options.space);
        let property = Vec3Property::single_axis(target, read, write, axis, end, label);
        self.spawn(target, property, duration, &options)
    }

    pub fn move_x<T: TransformTarget>(
        &self,
        target: &Rc<T>,
        end: f32,
        duration: f32,
        options: impl Into<Option<TweenOptions>>,
    ) -> Tween {
        self.move_axis(target, Axis::X, end, duration, options)
    }

    pub fn move_y<T: TransformTarget>(
        &self,
        target: &Rc<T>,
        end: f32,
        duration: f32,
        options: impl Into<Option<TweenOptions>>,
    ) -> Tween {
        self.move_axis(target, Axis::Y, end, duration, options)
    }

    pub fn move_z<T: TransformTarget>(
        &self,
        target: &Rc<T>,
        end: f32,
        duration: f32,
        options: impl Into<Option<TweenOptions>>,
    ) -> Tween {
        self.move_axis(target, Axis::Z, end, duration, options)
    }

    /// 移动界面元素的锚点位置
    pub fn move_anchored<T: RectTarget>(
        &self,
        target: &Rc<T>,
        end: Vec2,
        duration: f32,
        options: impl Into<Option<TweenOptions>>,
    ) -> Tween {
        let options = self.resolve(options);
        let property = Vec2Property::new(
            target,
            T::anchored_position,
            T::set_anchored_position,
            end,
            "anchored_position",
        );
        self.spawn(target, property, duration, &options)
    }

    /// 缩放到指定本地缩放
    pub fn scale_to<T: TransformTarget>(
        &self,
        target: &Rc<T>,
        end: Vec3,
        duration: f32,
        options: impl Into<Option<TweenOptions>>,
    ) -> Tween {
        let options = self.resolve(options);
        let property = Vec3Property::new(
            target,
            T::local_scale,
            T::set_local_scale,
            end,
            "local_scale",
        );
        self.spawn(target, property, duration, &options)
    }

    /// 沿单轴缩放
    pub fn scale_axis<T: TransformTarget>(
        &self,
        target: &Rc<T>,
        axis: Axis,
        end: f32,
        duration: f32,
        options: impl Into<Option<TweenOptions>>,
    ) -> Tween {
        let options = self.resolve(options);
        let property = Vec3Property::single_axis(
            target,
            T::local_scale,
            T::set_local_scale,
            axis,
            end,
            "local_scale",
        );
        self.spawn(target, property, duration, &options)
    }

    pub fn scale_x<T: TransformTarget>(
        &self,
        target: &Rc<T>,
        end: f32,
        duration: f32,
        options: impl Into<Option<TweenOptions>>,
    ) -> Tween {
        self.scale_axis(target, Axis::X, end, duration, options)
    }

    pub fn scale_y<T: TransformTarget>(
        &self,
        target: &Rc<T>,
        end: f32,
        duration: f32,
        options: impl Into<Option<TweenOptions>>,
    ) -> Tween {
        self.scale_axis(target, Axis::Y, end, duration, options)
    }

    pub fn scale_z<T: TransformTarget>(
        &self,
        target: &Rc<T>,
        end: f32,
        duration: f32,
        options: impl Into<Option<TweenOptions>>,
    ) -> Tween {
        self.scale_axis(target, Axis::Z, end, duration, options)
    }

    /// 旋转到指定欧拉角（度）
    pub fn rotate_to<T: TransformTarget>(
        &self,
        target: &Rc<T>,
        end: Vec3,
        duration: f32,
        options: impl Into<Option<TweenOptions>>,
    ) -> Tween {
        let options = self.resolve(options);
        let (read, write, label) = rotation_accessors::<T>(options.space);
        let property = RotationProperty::new(target, read, write, end, label);
        self.spawn(target, property, duration, &options)
    }

    /// 改变界面元素尺寸
    pub fn size_to<T: RectTarget>(
        &self,
        target: &Rc<T>,
        end: Vec2,
        duration: f32,
        options: impl Into<Option<TweenOptions>>,
    ) -> Tween {
        let options = self.resolve(options);
        let property =
            Vec2Property::new(target, T::size_delta, T::set_size_delta, end, "size_delta");
        self.spawn(target, property, duration, &options)
    }

    /// 从当前颜色过渡到 `to`
    pub fn color_to<T: ColorTarget>(
        &self,
        target: &Rc<T>,
        to: Color,
        duration: f32,
        options: impl Into<Option<TweenOptions>>,
    ) -> Tween {
        let options = self.resolve(options);
        self.spawn(target, ColorProperty::new(target, to), duration, &options)
    }

    /// 从 `from` 过渡到 `to`
    pub fn color_from_to<T: ColorTarget>(
        &self,
        target: &Rc<T>,
        from: Color,
        to: Color,
        duration: f32,
        options: impl Into<Option<TweenOptions>>,
    ) -> Tween {
        let options = self.resolve(options);
        let property = ColorProperty::between(target, from, to);
        self.spawn(target, property, duration, &options)
    }

    /// 标量补间，不写目标
    ///
    /// 目标只用于生命周期绑定与批量控制。
    pub fn value_to<T: 'static>(
        &self,
        target: &Rc<T>,
        from: f32,
        to: f32,
        duration: f32,
        options: impl Into<Option<TweenOptions>>,
    ) -> ValueTween {
        let options = self.resolve(options);
        let property = ValueProperty::new(from, to);
        let value = property.value_handle();
        let tween = self.spawn(target, property, duration, &options);
        ValueTween::new(tween, value)
    }

    /// 纯计时补间，只驱动回调
    pub fn run_for<T: 'static>(
        &self,
        target: &Rc<T>,
        duration: f32,
        options: impl Into<Option<TweenOptions>>,
    ) -> Tween {
        let options = self.resolve(options);
        self.spawn(target, RunProperty, duration, &options)
    }

    // ========== 批量控制 ==========

    /// 停止目标上的所有补间
    pub fn stop_all_on<T: ?Sized>(&self, target: &Rc<T>) {
        self.shared.registry.stop_all(TargetKey::of(target));
    }

    /// 停止并销毁目标上的所有补间
    pub fn remove_all_on<T: ?Sized>(&self, target: &Rc<T>) {
        self.shared.registry.remove_all(TargetKey::of(target));
    }

    /// 目标上所有补间的快照
    pub fn tweens_on<T: ?Sized>(&self, target: &Rc<T>) -> Vec<Tween> {
        self.shared.registry.tweens_for(TargetKey::of(target))
    }

    /// 目标上是否还有补间
    pub fn has_tweens_on<T: ?Sized>(&self, target: &Rc<T>) -> bool {
        self.shared.registry.count_for(TargetKey::of(target)) > 0
    }

    /// 已注册（未完成、未销毁）的补间数量
    pub fn active_count(&self) -> usize {
        self.shared.registry.len()
    }

    /// 正在运行的补间数量
    pub fn running_count(&self) -> usize {
        self.shared
            .registry
            .snapshot()
            .iter()
            .filter(|tween| tween.state() == TweenState::Running)
            .count()
    }

    /// 销毁所有补间并清空事件队列
    pub fn reset(&self) {
        debug!(tweens = self.shared.registry.len(), "重置补间系统");
        self.shared.registry.clear();
        self.shared.events.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::Ease;
    use crate::target::SceneNode;

    #[test]
    fn test_constructors_start_and_register() {
        let system = TweenSystem::default();
        let node = Rc::new(SceneNode::new("n"));

        let tween = system.move_to(&node, Vec3::X, 1.0, None);
        assert_eq!(tween.state(), TweenState::Running);
        assert!(system.has_tweens_on(&node));
        assert_eq!(system.tweens_on(&node), vec![tween.clone()]);
        assert_eq!(system.running_count(), 1);
        assert_eq!(tween.target::<SceneNode>().map(|n| n.name()), Some("n".to_string()));
    }

    #[test]
    fn test_config_default_ease_applies_when_options_omitted() {
        let config = TweenConfig {
            default_ease: Ease::InQuad,
            ..TweenConfig::default()
        };
        let system = TweenSystem::new(config);
        let node = Rc::new(SceneNode::new("n"));

        let implicit = system.scale_to(&node, Vec3::splat(2.0), 1.0, None);
        let explicit = system.scale_to(&node, Vec3::splat(2.0), 1.0, TweenOptions::new());

        assert_eq!(implicit.ease(), Ease::InQuad);
        assert_eq!(explicit.ease(), Ease::Linear);
    }

    #[test]
    fn test_time_scale_and_frame_clamp() {
        let config = TweenConfig {
            time_scale: 0.5,
            max_frame_delta: Some(0.1),
            ..TweenConfig::default()
        };
        let system = TweenSystem::new(config);
        let node = Rc::new(SceneNode::new("n"));
        let tween = system.value_to(&node, 0.0, 1.0, 1.0, None);

        system.advance(0.1);
        assert!((tween.elapsed() - 0.05).abs() < 1e-6);

        // 卡顿帧被截断到 0.1
        system.advance(10.0);
        assert!((tween.elapsed() - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_world_space_move() {
        let system = TweenSystem::default();
        let node = Rc::new(SceneNode::new("n"));
        node.set_parent_position(Vec3::new(100.0, 0.0, 0.0));

        system.move_to(&node, Vec3::new(110.0, 0.0, 0.0), 1.0, TweenOptions::new().world());
        system.advance(1.0);

        assert_eq!(node.position(), Vec3::new(110.0, 0.0, 0.0));
        assert_eq!(node.local_position(), Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn test_reset_destroys_everything() {
        let system = TweenSystem::default();
        let a = Rc::new(SceneNode::new("a"));
        let b = Rc::new(SceneNode::new("b"));
        let ta = system.move_x(&a, 5.0, 1.0, None);
        let tb = system.run_for(&b, 1.0, None);

        system.reset();

        assert_eq!(system.active_count(), 0);
        assert!(ta.is_destroyed() && tb.is_destroyed());
        assert_eq!(system.heartbeat().subscriber_count(), 0);
        assert!(system.drain_events().is_empty());
    }

    #[test]
    fn test_handles_outlive_system() {
        let node = Rc::new(SceneNode::new("n"));
        let tween = {
            let system = TweenSystem::default();
            system.move_x(&node, 5.0, 1.0, None)
        };
        assert_eq!(tween.state(), TweenState::Running);

        // 心跳已随系统释放，手动推进仍然有效
        tween.tick(1.0);
        assert_eq!(node.local_position().x, 5.0);
        assert_eq!(tween.state(), TweenState::Done);
        assert!(tween.is_destroyed());
    }

    #[test]
    fn test_idle_tweens_on_dropped_targets_are_pruned() {
        let system = TweenSystem::default();
        let mut stopped = Vec::new();
        for i in 0..10 {
            let node = Rc::new(SceneNode::new(format!("n{i}")));
            let tween = system.move_x(&node, 1.0, 1.0, None);
            tween.stop();
            stopped.push(tween);
        }
        let owner = Rc::new(SceneNode::new("ready"));
        let ready = system.build(&owner, RunProperty, 1.0, &TweenOptions::new());
        drop(owner);
        assert_eq!(system.active_count(), 11);

        let events = system.advance(0.1);

        assert_eq!(system.active_count(), 0);
        assert_eq!(system.registry().target_count(), 0);
        assert_eq!(events.len(), 11);
        assert!(events.iter().all(|e| matches!(e, TweenEvent::Cancelled(_))));
        assert!(stopped.iter().all(Tween::is_destroyed));
        assert!(ready.is_destroyed());
    }

    #[test]
    fn test_prune_keeps_live_targets() {
        let system = TweenSystem::default();
        let node = Rc::new(SceneNode::new("n"));
        let tween = system.move_x(&node, 1.0, 1.0, None);
        tween.stop();

        assert_eq!(system.registry().prune_dead(), 0);
        system.advance(0.1);
        assert_eq!(system.tweens_on(&node), vec![tween]);
    }

    #[test]
    fn test_direct_heartbeat_drive_queues_events_until_drained() {
        let system = TweenSystem::default();
        let node = Rc::new(SceneNode::new("n"));
        let timer = system.run_for(&node, 0.1, None);

        system.heartbeat().advance(0.1);

        assert_eq!(
            system.drain_events(),
            vec![
                TweenEvent::Started(timer.id()),
                TweenEvent::Completed(timer.id())
            ]
        );
        assert!(system.drain_events().is_empty());
    }
}
