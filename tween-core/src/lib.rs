//! # tween-core
//!
//! 逐帧补间调度与插值引擎。
//!
//! 给定目标、时长、可选延迟与缓动函数，在每一帧把目标的某个属性
//! 从起始值推进到终值，并在过程中触发生命周期回调。
//!
//! ## 模块
//!
//! - [`easing`]: 缓动函数库
//! - [`tween`]: 补间实体与状态机
//! - [`property`]: 各属性族的驱动策略
//! - [`registry`]: 目标 -> 补间的注册表，支持批量停止与移除
//! - [`heartbeat`]: 逐帧心跳与订阅
//! - [`system`]: 补间系统与构造接口
//! - [`target`]: 目标属性访问接口与参考场景节点
//! - [`wait`]: 事件等待
//! - [`config`]: 系统配置
//!
//! ## 线程模型
//!
//! 单线程、协作式、逐帧驱动。所有句柄基于 `Rc`，不能跨线程传递。

pub mod config;
pub mod easing;
pub mod error;
pub mod heartbeat;
pub mod property;
pub mod registry;
pub mod system;
pub mod target;
pub mod tween;
pub mod wait;

pub use config::TweenConfig;
pub use easing::{Ease, EaseFn};
pub use error::{ConfigError, TweenError};
pub use heartbeat::{Heartbeat, SubscriptionId, TickHandler};
pub use property::{
    ColorProperty, RotationProperty, RunProperty, ValueProperty, ValueTween, Vec2Property,
    Vec3Property,
};
pub use registry::{Registry, TargetKey};
pub use system::TweenSystem;
pub use target::{
    Axis, Color, ColorTarget, NodeState, RectTarget, SceneNode, Space, TransformTarget,
};
pub use tween::{Tween, TweenEvent, TweenId, TweenOptions, TweenProperty, TweenState};
pub use wait::EventWaiter;
