//! # Property 模块
//!
//! 各属性族的驱动策略。
//!
//! 构造时从目标读取起始值、计算 `终值 - 起始值`，
//! 每帧对每个分量用同一个 `(elapsed, duration)` 独立求缓动，再写回目标。
//! 目标只以弱引用持有。

use std::cell::Cell;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use glam::{Quat, Vec2, Vec3, Vec4};

use crate::easing::Ease;
use crate::target::{Axis, Color, ColorTarget, euler_degrees, quat_from_euler_degrees};
use crate::tween::{Tween, TweenProperty};

/// 三维向量属性（位置、缩放）
///
/// 单轴模式下每帧重新读取其他分量，
/// 同一目标上不同轴的补间可以叠加。
pub struct Vec3Property<T> {
    target: Weak<T>,
    read: fn(&T) -> Vec3,
    write: fn(&T, Vec3),
    start: Vec3,
    delta: Vec3,
    axis: Option<Axis>,
    label: &'static str,
}

impl<T: 'static> Vec3Property<T> {
    /// 驱动整个向量
    pub fn new(
        target: &Rc<T>,
        read: fn(&T) -> Vec3,
        write: fn(&T, Vec3),
        end: Vec3,
        label: &'static str,
    ) -> Self {
        let start = read(target);
        Self {
            target: Rc::downgrade(target),
            read,
            write,
            start,
            delta: end - start,
            axis: None,
            label,
        }
    }

    /// 只驱动一个分量
    pub fn single_axis(
        target: &Rc<T>,
        read: fn(&T) -> Vec3,
        write: fn(&T, Vec3),
        axis: Axis,
        end: f32,
        label: &'static str,
    ) -> Self {
        let start = read(target);
        Self {
            target: Rc::downgrade(target),
            read,
            write,
            start,
            delta: axis.with(Vec3::ZERO, end - axis.get(start)),
            axis: Some(axis),
            label,
        }
    }

    pub fn start(&self) -> Vec3 {
        self.start
    }

    pub fn delta(&self) -> Vec3 {
        self.delta
    }
}

impl<T: 'static> TweenProperty for Vec3Property<T> {
    fn apply(&mut self, ease: Ease, elapsed: f32, duration: f32) {
        let Some(target) = self.target.upgrade() else {
            return;
        };
        let value = match self.axis {
            None => Vec3::new(
                ease.evaluate(elapsed, self.start.x, self.delta.x, duration),
                ease.evaluate(elapsed, self.start.y, self.delta.y, duration),
                ease.evaluate(elapsed, self.start.z, self.delta.z, duration),
            ),
            Some(axis) => {
                let current = (self.read)(&target);
                let channel =
                    ease.evaluate(elapsed, axis.get(self.start), axis.get(self.delta), duration);
                axis.with(current, channel)
            }
        };
        (self.write)(&target, value);
    }

    fn label(&self) -> &'static str {
        self.label
    }
}

/// 二维向量属性（锚点位置、矩形尺寸）
pub struct Vec2Property<T> {
    target: Weak<T>,
    write: fn(&T, Vec2),
    start: Vec2,
    delta: Vec2,
    label: &'static str,
}

impl<T: 'static> Vec2Property<T> {
    pub fn new(
        target: &Rc<T>,
        read: fn(&T) -> Vec2,
        write: fn(&T, Vec2),
        end: Vec2,
        label: &'static str,
    ) -> Self {
        let start = read(target);
        Self {
            target: Rc::downgrade(target),
            write,
            start,
            delta: end - start,
            label,
        }
    }
}

impl<T: 'static> TweenProperty for Vec2Property<T> {
    fn apply(&mut self, ease: Ease, elapsed: f32, duration: f32) {
        let Some(target) = self.target.upgrade() else {
            return;
        };
        let value = Vec2::new(
            ease.evaluate(elapsed, self.start.x, self.delta.x, duration),
            ease.evaluate(elapsed, self.start.y, self.delta.y, duration),
        );
        (self.write)(&target, value);
    }

    fn label(&self) -> &'static str {
        self.label
    }
}

/// 旋转属性
///
/// 在欧拉角（度）上逐分量插值，再合成四元数。
/// 不做球面插值，大角度变化时可能出现万向节现象。
pub struct RotationProperty<T> {
    target: Weak<T>,
    write: fn(&T, Quat),
    start: Vec3,
    delta: Vec3,
    label: &'static str,
}

impl<T: 'static> RotationProperty<T> {
    /// `end` 为目标欧拉角（度）
    pub fn new(
        target: &Rc<T>,
        read: fn(&T) -> Quat,
        write: fn(&T, Quat),
        end: Vec3,
        label: &'static str,
    ) -> Self {
        let start = euler_degrees(read(target));
        Self {
            target: Rc::downgrade(target),
            write,
            start,
            delta: end - start,
            label,
        }
    }

    /// 起始欧拉角（度）
    pub fn start(&self) -> Vec3 {
        self.start
    }
}

impl<T: 'static> TweenProperty for RotationProperty<T> {
    fn apply(&mut self, ease: Ease, elapsed: f32, duration: f32) {
        let Some(target) = self.target.upgrade() else {
            return;
        };
        let euler = Vec3::new(
            ease.evaluate(elapsed, self.start.x, self.delta.x, duration),
            ease.evaluate(elapsed, self.start.y, self.delta.y, duration),
            ease.evaluate(elapsed, self.start.z, self.delta.z, duration),
        );
        (self.write)(&target, quat_from_euler_degrees(euler));
    }

    fn label(&self) -> &'static str {
        self.label
    }
}

/// 颜色属性（四个分量）
pub struct ColorProperty<T> {
    target: Weak<T>,
    start: Vec4,
    delta: Vec4,
}

impl<T: ColorTarget> ColorProperty<T> {
    /// 从目标当前颜色过渡到 `to`
    pub fn new(target: &Rc<T>, to: Color) -> Self {
        Self::between(target, target.color(), to)
    }

    /// 从 `from` 过渡到 `to`，忽略目标当前颜色
    pub fn between(target: &Rc<T>, from: Color, to: Color) -> Self {
        let start = from.to_vec4();
        Self {
            target: Rc::downgrade(target),
            start,
            delta: to.to_vec4() - start,
        }
    }
}

impl<T: ColorTarget> TweenProperty for ColorProperty<T> {
    fn apply(&mut self, ease: Ease, elapsed: f32, duration: f32) {
        let Some(target) = self.target.upgrade() else {
            return;
        };
        let value = Vec4::new(
            ease.evaluate(elapsed, self.start.x, self.delta.x, duration),
            ease.evaluate(elapsed, self.start.y, self.delta.y, duration),
            ease.evaluate(elapsed, self.start.z, self.delta.z, duration),
            ease.evaluate(elapsed, self.start.w, self.delta.w, duration),
        );
        target.set_color(Color::from_vec4(value));
    }

    fn label(&self) -> &'static str {
        "color"
    }
}

/// 标量属性：不写目标，只对外暴露当前值
pub struct ValueProperty {
    from: f32,
    delta: f32,
    value: Rc<Cell<f32>>,
}

impl ValueProperty {
    pub fn new(from: f32, to: f32) -> Self {
        Self {
            from,
            delta: to - from,
            value: Rc::new(Cell::new(from)),
        }
    }

    /// 当前值的共享句柄
    pub fn value_handle(&self) -> Rc<Cell<f32>> {
        self.value.clone()
    }
}

impl TweenProperty for ValueProperty {
    fn apply(&mut self, ease: Ease, elapsed: f32, duration: f32) {
        self.value
            .set(ease.evaluate(elapsed, self.from, self.delta, duration));
    }

    fn label(&self) -> &'static str {
        "value"
    }
}

/// 纯计时：不修改任何属性，只驱动回调
pub struct RunProperty;

impl TweenProperty for RunProperty {
    fn apply(&mut self, _ease: Ease, _elapsed: f32, _duration: f32) {}

    fn label(&self) -> &'static str {
        "run"
    }
}

/// 标量补间句柄
///
/// 解引用为 [`Tween`]，额外提供当前插值结果。
#[derive(Debug, Clone)]
pub struct ValueTween {
    tween: Tween,
    value: Rc<Cell<f32>>,
}

impl ValueTween {
    pub(crate) fn new(tween: Tween, value: Rc<Cell<f32>>) -> Self {
        Self { tween, value }
    }

    /// 当前插值结果（延迟期间为起始值）
    pub fn value(&self) -> f32 {
        self.value.get()
    }

    /// 取出底层补间句柄
    pub fn into_tween(self) -> Tween {
        self.tween
    }
}

impl Deref for ValueTween {
    type Target = Tween;

    fn deref(&self) -> &Tween {
        &self.tween
    }
}
