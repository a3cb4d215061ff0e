//! # Tween 模块
//!
//! 补间实体与状态机。
//!
//! ## 状态流转
//!
//! ```text
//! Ready ──start──▶ Running ──stop──▶ Stopped ──start──▶ Running
//!                     │
//!                     └── elapsed >= duration ──▶ Done（终态）
//! ```
//!
//! - 计时从 `-delay` 开始，延迟期间不写入目标
//! - 目标被释放后的下一帧，补间静默销毁，不触发完成回调
//! - 完成顺序：`on_complete` → `on_complete_with_self` → 销毁
//!
//! 回调执行期间会被临时取出，回调内部可以停止、销毁自身或其他补间，
//! 也可以替换自己的回调。

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::easing::Ease;
use crate::heartbeat::{Heartbeat, SubscriptionId, TickHandler};
use crate::registry::TargetKey;
use crate::system::SystemShared;
use crate::target::Space;

/// 补间唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TweenId(u64);

impl TweenId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// 获取原始值
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TweenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tween({})", self.0)
    }
}

/// 补间状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TweenState {
    /// 已创建，尚未启动
    #[default]
    Ready,
    /// 正在运行
    Running,
    /// 已暂停（可恢复）
    Stopped,
    /// 已完成（终态）
    Done,
}

/// 补间生命周期事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweenEvent {
    /// 延迟结束，第一次写入目标
    Started(TweenId),
    /// 正常完成
    Completed(TweenId),
    /// 未完成即被销毁（手动销毁或目标失效）
    Cancelled(TweenId),
}

impl TweenEvent {
    /// 事件所属的补间
    pub fn tween_id(&self) -> TweenId {
        match self {
            TweenEvent::Started(id) | TweenEvent::Completed(id) | TweenEvent::Cancelled(id) => {
                *id
            }
        }
    }
}

/// 补间构造选项
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TweenOptions {
    /// 缓动函数
    pub ease: Ease,
    /// 坐标空间（仅对位置、旋转有效）
    pub space: Space,
    /// 启动延迟（秒）
    pub delay: f32,
}

impl TweenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置缓动函数
    pub fn with_ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    /// 设置延迟
    pub fn with_delay(mut self, delay: f32) -> Self {
        self.delay = delay;
        self
    }

    /// 使用世界坐标
    pub fn world(mut self) -> Self {
        self.space = Space::World;
        self
    }

    /// 使用本地坐标
    pub fn local(mut self) -> Self {
        self.space = Space::Local;
        self
    }
}

impl From<Ease> for TweenOptions {
    fn from(ease: Ease) -> Self {
        Self::default().with_ease(ease)
    }
}

/// 属性驱动策略
///
/// 每种属性族（位置、旋转、缩放、颜色……）实现一次。
/// 构造时记录起始值与变化量，`apply` 按缓动写回目标。
pub trait TweenProperty: 'static {
    /// 按 `(elapsed, duration)` 计算并写入当前值
    fn apply(&mut self, ease: Ease, elapsed: f32, duration: f32);

    /// 属性名称，用于日志
    fn label(&self) -> &'static str;
}

type Callback = Box<dyn FnMut()>;
type TweenCallback = Box<dyn FnMut(&Tween)>;
type UpdateCallback = Box<dyn FnMut(&Tween, f32)>;

#[derive(Default)]
struct Callbacks {
    on_start: Option<Callback>,
    on_complete: Option<Callback>,
    on_complete_with_self: Option<TweenCallback>,
    on_update: Option<UpdateCallback>,
}

pub(crate) struct TweenInner {
    id: TweenId,
    target: Weak<dyn Any>,
    target_key: TargetKey,
    duration: f32,
    delay: f32,
    ease: Ease,
    elapsed: Cell<f32>,
    state: Cell<TweenState>,
    started: Cell<bool>,
    destroyed: Cell<bool>,
    subscription: Cell<Option<SubscriptionId>>,
    /// 暂停前的订阅，恢复时优先沿用以保留分发位置
    parked: Cell<Option<SubscriptionId>>,
    property: RefCell<Box<dyn TweenProperty>>,
    callbacks: RefCell<Callbacks>,
    /// 每次清空回调时递增，正在执行的回调据此判断是否还应放回
    callback_epoch: Cell<u64>,
    system: Weak<SystemShared>,
    this: Weak<TweenInner>,
}

impl TickHandler for TweenInner {
    fn on_heartbeat(&self, heartbeat: &Heartbeat) {
        if let Some(inner) = self.this.upgrade() {
            Tween { inner }.tick(heartbeat.delta_time());
        }
    }
}

/// 补间句柄
///
/// 克隆得到的是同一个补间。注册表持有强引用，
/// 补间完成或销毁后，丢弃所有句柄即释放。
#[derive(Clone)]
pub struct Tween {
    inner: Rc<TweenInner>,
}

impl PartialEq for Tween {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Tween {}

impl fmt::Debug for Tween {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = &self.inner;
        let mut s = f.debug_struct("Tween");
        s.field("id", &inner.id)
            .field("state", &inner.state.get())
            .field("elapsed", &inner.elapsed.get())
            .field("duration", &inner.duration)
            .field("ease", &inner.ease);
        if let Ok(property) = inner.property.try_borrow() {
            s.field("property", &property.label());
        }
        s.finish()
    }
}

impl Tween {
    /// 创建补间（状态为 `Ready`，尚未注册）
    pub(crate) fn new(
        id: TweenId,
        target: Weak<dyn Any>,
        property: Box<dyn TweenProperty>,
        duration: f32,
        options: &TweenOptions,
        system: Weak<SystemShared>,
    ) -> Self {
        let delay = options.delay.max(0.0);
        let target_key = TargetKey::of_weak(&target);
        let inner = Rc::new_cyclic(|this| TweenInner {
            id,
            target,
            target_key,
            duration: duration.max(0.0),
            delay,
            ease: options.ease,
            elapsed: Cell::new(-delay),
            state: Cell::new(TweenState::Ready),
            started: Cell::new(false),
            destroyed: Cell::new(false),
            subscription: Cell::new(None),
            parked: Cell::new(None),
            property: RefCell::new(property),
            callbacks: RefCell::new(Callbacks::default()),
            callback_epoch: Cell::new(0),
            system,
            this: this.clone(),
        });
        Self { inner }
    }

    // ========== 生命周期 ==========

    /// 启动或恢复补间
    ///
    /// 运行中、已完成或已销毁时是空操作。
    pub fn start(&self) -> &Self {
        let inner = &self.inner;
        if inner.destroyed.get() {
            return self;
        }
        match inner.state.get() {
            TweenState::Running | TweenState::Done => return self,
            TweenState::Ready | TweenState::Stopped => {}
        }
        let Some(system) = inner.system.upgrade() else {
            return self;
        };

        inner.state.set(TweenState::Running);
        let handler: Weak<dyn TickHandler> = inner.this.clone();
        let id = match inner.parked.take() {
            Some(id) => system.heartbeat.resume(id, handler),
            None => system.heartbeat.subscribe(handler),
        };
        inner.subscription.set(Some(id));
        debug!(tween = %inner.id, elapsed = inner.elapsed.get(), "启动补间");
        self
    }

    /// 暂停补间
    ///
    /// 仅对运行中的补间有效；保留回调与注册，可以再次 `start`。
    pub fn stop(&self) -> &Self {
        let inner = &self.inner;
        if inner.destroyed.get() || inner.state.get() != TweenState::Running {
            return self;
        }
        inner.state.set(TweenState::Stopped);
        inner.parked.set(self.unsubscribe());
        debug!(tween = %inner.id, elapsed = inner.elapsed.get(), "暂停补间");
        self
    }

    /// 推进一帧
    ///
    /// 通常由心跳调用；非运行状态是空操作。
    pub fn tick(&self, delta_time: f32) {
        let inner = &self.inner;
        if !self.is_running() {
            return;
        }
        if !self.is_target_alive() {
            debug!(tween = %inner.id, "目标已失效，取消补间");
            self.destroy();
            return;
        }

        let elapsed = (inner.elapsed.get() + delta_time).min(inner.duration);
        inner.elapsed.set(elapsed);
        if elapsed < 0.0 {
            return;
        }

        if !inner.started.replace(true) {
            self.push_event(TweenEvent::Started(inner.id));
            self.fire_start();
            if !self.is_running() {
                return;
            }
        }

        // 零时长直接取曲线终点
        let (t, d) = if inner.duration > 0.0 {
            (elapsed, inner.duration)
        } else {
            (1.0, 1.0)
        };
        inner.property.borrow_mut().apply(inner.ease, t, d);

        self.fire_update(self.normalized_progress());
        if !self.is_running() {
            return;
        }

        if elapsed >= inner.duration {
            self.finish();
        }
    }

    /// 销毁补间
    ///
    /// 退订心跳、从注册表移除、清空回调。可重复调用，可在回调中调用。
    pub fn destroy(&self) {
        let inner = &self.inner;
        if inner.destroyed.replace(true) {
            return;
        }
        self.unsubscribe();

        if inner.state.get() != TweenState::Done {
            inner.state.set(TweenState::Stopped);
            self.push_event(TweenEvent::Cancelled(inner.id));
            debug!(tween = %inner.id, "销毁补间");
        }

        if let Some(system) = inner.system.upgrade() {
            system.registry.unregister(self);
        }

        inner.callback_epoch.set(inner.callback_epoch.get() + 1);
        let callbacks = std::mem::take(&mut *inner.callbacks.borrow_mut());
        drop(callbacks);
    }

    fn finish(&self) {
        let inner = &self.inner;
        inner.state.set(TweenState::Done);
        self.unsubscribe();
        debug!(tween = %inner.id, "补间完成");
        self.push_event(TweenEvent::Completed(inner.id));

        if let Some(mut callback) = self.take_callback(|c| &mut c.on_complete) {
            callback();
        }
        if let Some(mut callback) = self.take_callback(|c| &mut c.on_complete_with_self) {
            callback(self);
        }
        self.destroy();
    }

    /// 退订心跳，返回被退订的订阅
    fn unsubscribe(&self) -> Option<SubscriptionId> {
        self.inner.parked.set(None);
        let id = self.inner.subscription.take()?;
        if let Some(system) = self.inner.system.upgrade() {
            system.heartbeat.unsubscribe(id);
        }
        Some(id)
    }

    fn push_event(&self, event: TweenEvent) {
        if let Some(system) = self.inner.system.upgrade() {
            system.events.borrow_mut().push(event);
        }
    }

    // ========== 回调 ==========

    /// 设置启动回调（延迟结束后第一帧触发一次）
    pub fn on_start(&self, callback: impl FnMut() + 'static) -> &Self {
        self.set_callback(|c| &mut c.on_start, Box::new(callback) as Callback);
        self
    }

    /// 设置完成回调
    pub fn on_complete(&self, callback: impl FnMut() + 'static) -> &Self {
        self.set_callback(|c| &mut c.on_complete, Box::new(callback) as Callback);
        self
    }

    /// 设置带自身句柄的完成回调（在 `on_complete` 之后触发）
    pub fn on_complete_with_self(&self, callback: impl FnMut(&Tween) + 'static) -> &Self {
        self.set_callback(
            |c| &mut c.on_complete_with_self,
            Box::new(callback) as TweenCallback,
        );
        self
    }

    /// 设置逐帧回调，参数为归一化进度 `[0, 1]`
    pub fn on_update(&self, callback: impl FnMut(&Tween, f32) + 'static) -> &Self {
        self.set_callback(|c| &mut c.on_update, Box::new(callback) as UpdateCallback);
        self
    }

    /// 清空所有回调
    pub fn clear_callbacks(&self) {
        self.inner
            .callback_epoch
            .set(self.inner.callback_epoch.get() + 1);
        let callbacks = std::mem::take(&mut *self.inner.callbacks.borrow_mut());
        drop(callbacks);
    }

    fn set_callback<C>(&self, slot: impl FnOnce(&mut Callbacks) -> &mut Option<C>, callback: C) {
        if self.inner.destroyed.get() {
            return;
        }
        let previous = slot(&mut *self.inner.callbacks.borrow_mut()).replace(callback);
        drop(previous);
    }

    fn take_callback<C>(&self, slot: impl FnOnce(&mut Callbacks) -> &mut Option<C>) -> Option<C> {
        slot(&mut *self.inner.callbacks.borrow_mut()).take()
    }

    /// 放回执行完的回调
    ///
    /// 回调执行期间补间被销毁、回调被清空或被替换时不放回。
    fn restore_callback<C>(
        &self,
        slot: impl FnOnce(&mut Callbacks) -> &mut Option<C>,
        callback: C,
        epoch: u64,
    ) {
        if self.inner.destroyed.get() || self.inner.callback_epoch.get() != epoch {
            return;
        }
        let leftover = {
            let mut callbacks = self.inner.callbacks.borrow_mut();
            let slot = slot(&mut callbacks);
            if slot.is_none() {
                *slot = Some(callback);
                None
            } else {
                Some(callback)
            }
        };
        drop(leftover);
    }

    fn fire_start(&self) {
        let epoch = self.inner.callback_epoch.get();
        if let Some(mut callback) = self.take_callback(|c| &mut c.on_start) {
            callback();
            self.restore_callback(|c| &mut c.on_start, callback, epoch);
        }
    }

    fn fire_update(&self, progress: f32) {
        let epoch = self.inner.callback_epoch.get();
        if let Some(mut callback) = self.take_callback(|c| &mut c.on_update) {
            callback(self, progress);
            self.restore_callback(|c| &mut c.on_update, callback, epoch);
        }
    }

    // ========== 查询 ==========

    /// 唯一标识
    pub fn id(&self) -> TweenId {
        self.inner.id
    }

    /// 当前状态
    pub fn state(&self) -> TweenState {
        self.inner.state.get()
    }

    /// 是否正在运行（未销毁且状态为 `Running`）
    pub fn is_running(&self) -> bool {
        !self.inner.destroyed.get() && self.inner.state.get() == TweenState::Running
    }

    /// 是否已销毁
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// 目标是否仍然存在
    pub fn is_target_alive(&self) -> bool {
        self.inner.target.strong_count() > 0
    }

    /// 归一化进度 `[0, 1]`
    ///
    /// 延迟期间为 0；零时长补间在第一次写入后为 1。
    pub fn normalized_progress(&self) -> f32 {
        let inner = &self.inner;
        if inner.duration <= 0.0 {
            return if inner.started.get() { 1.0 } else { 0.0 };
        }
        (inner.elapsed.get() / inner.duration).clamp(0.0, 1.0)
    }

    /// 已经过的时间（延迟期间为负）
    pub fn elapsed(&self) -> f32 {
        self.inner.elapsed.get()
    }

    /// 总时长（秒）
    pub fn duration(&self) -> f32 {
        self.inner.duration
    }

    /// 启动延迟（秒）
    pub fn delay(&self) -> f32 {
        self.inner.delay
    }

    /// 缓动函数
    pub fn ease(&self) -> Ease {
        self.inner.ease
    }

    /// 目标身份
    pub fn target_key(&self) -> TargetKey {
        self.inner.target_key
    }

    /// 目标的强引用；目标已释放或类型不符时为 `None`
    pub fn target<T: 'static>(&self) -> Option<Rc<T>> {
        self.inner.target.upgrade()?.downcast::<T>().ok()
    }

    /// 属性名称
    pub fn label(&self) -> &'static str {
        self.inner
            .property
            .try_borrow()
            .map_or("busy", |property| property.label())
    }
}
