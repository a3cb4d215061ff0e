//! # Target 模块
//!
//! 补间目标的属性访问接口。
//!
//! 目标自己负责内部可变性（setter 只取 `&self`），
//! 补间只持有目标的弱引用，目标释放后补间在下一帧自动取消。
//!
//! `SceneNode` 是一个最小的参考实现，供测试与命令行工具使用。

use std::cell::RefCell;

use glam::{EulerRot, Quat, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// 坐标空间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Space {
    /// 相对父节点
    #[default]
    Local,
    /// 世界坐标
    World,
}

/// 单轴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// 读取向量在该轴上的分量
    pub fn get(self, v: Vec3) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }

    /// 返回替换了该轴分量的新向量
    pub fn with(self, mut v: Vec3, value: f32) -> Vec3 {
        match self {
            Axis::X => v.x = value,
            Axis::Y => v.y = value,
            Axis::Z => v.z = value,
        }
        v
    }
}

/// RGBA 颜色，分量范围通常为 `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_vec4(self) -> Vec4 {
        Vec4::new(self.r, self.g, self.b, self.a)
    }

    pub fn from_vec4(v: Vec4) -> Self {
        Self::rgba(v.x, v.y, v.z, v.w)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// 欧拉角（度）转四元数
///
/// 组合顺序为 Y、X、Z（先绕 Z，再绕 X，最后绕 Y）。
pub fn quat_from_euler_degrees(euler: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        euler.y.to_radians(),
        euler.x.to_radians(),
        euler.z.to_radians(),
    )
}

/// 四元数转欧拉角（度），与 [`quat_from_euler_degrees`] 互逆
pub fn euler_degrees(rotation: Quat) -> Vec3 {
    let (y, x, z) = rotation.to_euler(EulerRot::YXZ);
    Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
}

/// 变换目标：位置、旋转、缩放
pub trait TransformTarget: 'static {
    fn local_position(&self) -> Vec3;
    fn set_local_position(&self, position: Vec3);

    /// 世界坐标位置
    fn position(&self) -> Vec3;
    fn set_position(&self, position: Vec3);

    fn local_rotation(&self) -> Quat;
    fn set_local_rotation(&self, rotation: Quat);

    /// 世界坐标旋转
    fn rotation(&self) -> Quat;
    fn set_rotation(&self, rotation: Quat);

    fn local_scale(&self) -> Vec3;
    fn set_local_scale(&self, scale: Vec3);
}

/// 界面矩形目标：锚点位置与尺寸
pub trait RectTarget: 'static {
    fn anchored_position(&self) -> Vec2;
    fn set_anchored_position(&self, position: Vec2);

    fn size_delta(&self) -> Vec2;
    fn set_size_delta(&self, size: Vec2);
}

/// 颜色目标
pub trait ColorTarget: 'static {
    fn color(&self) -> Color;
    fn set_color(&self, color: Color);
}

/// 场景节点状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeState {
    /// 节点名称
    pub name: String,
    /// 父节点的世界坐标（节点世界位置 = 父节点位置 + 本地位置）
    pub parent_position: Vec3,
    pub local_position: Vec3,
    pub local_rotation: Quat,
    pub local_scale: Vec3,
    pub anchored_position: Vec2,
    pub size_delta: Vec2,
    pub color: Color,
}

impl Default for NodeState {
    fn default() -> Self {
        Self {
            name: String::new(),
            parent_position: Vec3::ZERO,
            local_position: Vec3::ZERO,
            local_rotation: Quat::IDENTITY,
            local_scale: Vec3::ONE,
            anchored_position: Vec2::ZERO,
            size_delta: Vec2::ZERO,
            color: Color::WHITE,
        }
    }
}

/// 参考场景节点
///
/// 父节点只提供平移，不参与旋转与缩放。
#[derive(Debug, Default)]
pub struct SceneNode {
    state: RefCell<NodeState>,
}

impl SceneNode {
    /// 创建具名节点
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_state(NodeState {
            name: name.into(),
            ..NodeState::default()
        })
    }

    /// 从状态创建节点
    pub fn from_state(state: NodeState) -> Self {
        Self {
            state: RefCell::new(state),
        }
    }

    pub fn name(&self) -> String {
        self.state.borrow().name.clone()
    }

    /// 当前状态的快照
    pub fn snapshot(&self) -> NodeState {
        self.state.borrow().clone()
    }

    /// 设置父节点位置
    pub fn set_parent_position(&self, position: Vec3) {
        self.state.borrow_mut().parent_position = position;
    }

    /// 本地欧拉角（度）
    pub fn local_euler_angles(&self) -> Vec3 {
        euler_degrees(self.state.borrow().local_rotation)
    }
}

impl TransformTarget for SceneNode {
    fn local_position(&self) -> Vec3 {
        self.state.borrow().local_position
    }

    fn set_local_position(&self, position: Vec3) {
        self.state.borrow_mut().local_position = position;
    }

    fn position(&self) -> Vec3 {
        let state = self.state.borrow();
        state.parent_position + state.local_position
    }

    fn set_position(&self, position: Vec3) {
        let mut state = self.state.borrow_mut();
        state.local_position = position - state.parent_position;
    }

    fn local_rotation(&self) -> Quat {
        self.state.borrow().local_rotation
    }

    fn set_local_rotation(&self, rotation: Quat) {
        self.state.borrow_mut().local_rotation = rotation;
    }

    fn rotation(&self) -> Quat {
        self.local_rotation()
    }

    fn set_rotation(&self, rotation: Quat) {
        self.set_local_rotation(rotation);
    }

    fn local_scale(&self) -> Vec3 {
        self.state.borrow().local_scale
    }

    fn set_local_scale(&self, scale: Vec3) {
        self.state.borrow_mut().local_scale = scale;
    }
}

impl RectTarget for SceneNode {
    fn anchored_position(&self) -> Vec2 {
        self.state.borrow().anchored_position
    }

    fn set_anchored_position(&self, position: Vec2) {
        self.state.borrow_mut().anchored_position = position;
    }

    fn size_delta(&self) -> Vec2 {
        self.state.borrow().size_delta
    }

    fn set_size_delta(&self, size: Vec2) {
        self.state.borrow_mut().size_delta = size;
    }
}

impl ColorTarget for SceneNode {
    fn color(&self) -> Color {
        self.state.borrow().color
    }

    fn set_color(&self, color: Color) {
        self.state.borrow_mut().color = color;
    }
}
