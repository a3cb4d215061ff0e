//! # Easing 模块
//!
//! 缓动函数库，用于补间的时间插值。
//!
//! 所有曲线统一签名 `(t, b, c, d) -> f32`：
//! - `t`: 已经过的时间
//! - `b`: 起始值
//! - `c`: 变化量（终值 - 起始值）
//! - `d`: 总时长
//!
//! 连续曲线满足 `f(0) = b`、`f(d) = b + c`。例外：
//! - `DecayingSine` 在 `t = 0` 处不等于 `b`
//! - `Bezier` 的端点为 `b + c * p0` 与 `b + c * p3`
//! - `Power` 需要 `exponent > 0` 才有 `f(0) = b`
//!
//! 所有曲线都除以 `d`，零时长由补间层处理。

use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TweenError;

const PI_M2: f32 = PI * 2.0;
const PI_D2: f32 = PI / 2.0;

/// 回弹曲线的过冲系数
const BACK_OVERSHOOT: f32 = 1.70158;

/// 缓动函数指针
pub type EaseFn = fn(f32, f32, f32, f32) -> f32;

/// 缓动类型
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ease {
    /// 线性（匀速）
    #[default]
    Linear,
    /// 正弦缓入
    InSine,
    /// 正弦缓出
    OutSine,
    /// 正弦缓入缓出
    InOutSine,
    /// 二次缓入
    InQuad,
    /// 二次缓出
    OutQuad,
    /// 二次缓入缓出
    InOutQuad,
    /// 三次缓入
    InCubic,
    /// 三次缓出
    OutCubic,
    /// 三次缓入缓出
    InOutCubic,
    /// 四次缓入
    InQuart,
    /// 四次缓出
    OutQuart,
    /// 四次缓入缓出
    InOutQuart,
    /// 五次缓入
    InQuint,
    /// 五次缓出
    OutQuint,
    /// 五次缓入缓出
    InOutQuint,
    /// 指数缓入
    InExpo,
    /// 指数缓出
    OutExpo,
    /// 指数缓入缓出
    InOutExpo,
    /// 圆弧缓入
    InCircular,
    /// 圆弧缓出
    OutCircular,
    /// 圆弧缓入缓出
    InOutCircular,
    /// 回弹缓入（先反向后前进）
    InBack,
    /// 回弹缓出（冲过终点后返回）
    OutBack,
    /// 回弹缓入缓出
    InOutBack,
    /// 弹跳缓入
    InBounce,
    /// 弹跳缓出
    OutBounce,
    /// 弹跳缓入缓出
    InOutBounce,
    /// 弹性缓入
    InElastic,
    /// 弹性缓出
    OutElastic,
    /// 弹性缓入缓出
    InOutElastic,
    /// 线性叠加逐渐衰减的抖动
    Jiggle,
    /// 平滑阶跃 `3t² - 2t³`
    SmoothStep,
    /// 衰减正弦
    DecayingSine,
    /// 任意幂次 `t^exponent`
    Power { exponent: f32 },
    /// 三次贝塞尔（四个控制点纵坐标）
    Bezier { points: [f32; 4] },
}

impl Ease {
    /// 所有无参数的缓动类型
    pub const ALL: [Ease; 34] = [
        Ease::Linear,
        Ease::InSine,
        Ease::OutSine,
        Ease::InOutSine,
        Ease::InQuad,
        Ease::OutQuad,
        Ease::InOutQuad,
        Ease::InCubic,
        Ease::OutCubic,
        Ease::InOutCubic,
        Ease::InQuart,
        Ease::OutQuart,
        Ease::InOutQuart,
        Ease::InQuint,
        Ease::OutQuint,
        Ease::InOutQuint,
        Ease::InExpo,
        Ease::OutExpo,
        Ease::InOutExpo,
        Ease::InCircular,
        Ease::OutCircular,
        Ease::InOutCircular,
        Ease::InBack,
        Ease::OutBack,
        Ease::InOutBack,
        Ease::InBounce,
        Ease::OutBounce,
        Ease::InOutBounce,
        Ease::InElastic,
        Ease::OutElastic,
        Ease::InOutElastic,
        Ease::Jiggle,
        Ease::SmoothStep,
        Ease::DecayingSine,
    ];

    /// 获取对应的缓动函数
    ///
    /// 参数化的 `Power` 与 `Bezier` 没有固定签名的函数，返回 `None`。
    pub fn function(self) -> Option<EaseFn> {
        let f: EaseFn = match self {
            Ease::Linear => ease_linear,
            Ease::InSine => ease_in_sine,
            Ease::OutSine => ease_out_sine,
            Ease::InOutSine => ease_in_out_sine,
            Ease::InQuad => ease_in_quad,
            Ease::OutQuad => ease_out_quad,
            Ease::InOutQuad => ease_in_out_quad,
            Ease::InCubic => ease_in_cubic,
            Ease::OutCubic => ease_out_cubic,
            Ease::InOutCubic => ease_in_out_cubic,
            Ease::InQuart => ease_in_quart,
            Ease::OutQuart => ease_out_quart,
            Ease::InOutQuart => ease_in_out_quart,
            Ease::InQuint => ease_in_quint,
            Ease::OutQuint => ease_out_quint,
            Ease::InOutQuint => ease_in_out_quint,
            Ease::InExpo => ease_in_expo,
            Ease::OutExpo => ease_out_expo,
            Ease::InOutExpo => ease_in_out_expo,
            Ease::InCircular => ease_in_circular,
            Ease::OutCircular => ease_out_circular,
            Ease::InOutCircular => ease_in_out_circular,
            Ease::InBack => ease_in_back,
            Ease::OutBack => ease_out_back,
            Ease::InOutBack => ease_in_out_back,
            Ease::InBounce => ease_in_bounce,
            Ease::OutBounce => ease_out_bounce,
            Ease::InOutBounce => ease_in_out_bounce,
            Ease::InElastic => ease_in_elastic,
            Ease::OutElastic => ease_out_elastic,
            Ease::InOutElastic => ease_in_out_elastic,
            Ease::Jiggle => ease_jiggle,
            Ease::SmoothStep => ease_smooth_step,
            Ease::DecayingSine => ease_decaying_sine,
            Ease::Power { .. } | Ease::Bezier { .. } => return None,
        };
        Some(f)
    }

    /// 计算缓动值
    ///
    /// # 参数
    /// - `t`: 已经过的时间
    /// - `b`: 起始值
    /// - `c`: 变化量
    /// - `d`: 总时长
    pub fn evaluate(self, t: f32, b: f32, c: f32, d: f32) -> f32 {
        match self {
            Ease::Power { exponent } => ease_power(t, b, c, d, exponent),
            Ease::Bezier { points } => ease_bezier(t, b, c, d, points),
            fixed => fixed.function().map_or(b, |f| f(t, b, c, d)),
        }
    }

    /// 缓动名称（snake_case，与序列化名一致）
    pub fn name(self) -> &'static str {
        match self {
            Ease::Linear => "linear",
            Ease::InSine => "in_sine",
            Ease::OutSine => "out_sine",
            Ease::InOutSine => "in_out_sine",
            Ease::InQuad => "in_quad",
            Ease::OutQuad => "out_quad",
            Ease::InOutQuad => "in_out_quad",
            Ease::InCubic => "in_cubic",
            Ease::OutCubic => "out_cubic",
            Ease::InOutCubic => "in_out_cubic",
            Ease::InQuart => "in_quart",
            Ease::OutQuart => "out_quart",
            Ease::InOutQuart => "in_out_quart",
            Ease::InQuint => "in_quint",
            Ease::OutQuint => "out_quint",
            Ease::InOutQuint => "in_out_quint",
            Ease::InExpo => "in_expo",
            Ease::OutExpo => "out_expo",
            Ease::InOutExpo => "in_out_expo",
            Ease::InCircular => "in_circular",
            Ease::OutCircular => "out_circular",
            Ease::InOutCircular => "in_out_circular",
            Ease::InBack => "in_back",
            Ease::OutBack => "out_back",
            Ease::InOutBack => "in_out_back",
            Ease::InBounce => "in_bounce",
            Ease::OutBounce => "out_bounce",
            Ease::InOutBounce => "in_out_bounce",
            Ease::InElastic => "in_elastic",
            Ease::OutElastic => "out_elastic",
            Ease::InOutElastic => "in_out_elastic",
            Ease::Jiggle => "jiggle",
            Ease::SmoothStep => "smooth_step",
            Ease::DecayingSine => "decaying_sine",
            Ease::Power { .. } => "power",
            Ease::Bezier { .. } => "bezier",
        }
    }
}

impl fmt::Display for Ease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ease::Power { exponent } => write!(f, "power:{exponent}"),
            Ease::Bezier { points: [p0, p1, p2, p3] } => {
                write!(f, "bezier:{p0},{p1},{p2},{p3}")
            }
            fixed => f.write_str(fixed.name()),
        }
    }
}

impl FromStr for Ease {
    type Err = TweenError;

    /// 解析缓动名称
    ///
    /// 接受 `name()` 返回的名称（忽略大小写），以及参数化形式
    /// `power:<exponent>`、`bezier:<p0>,<p1>,<p2>,<p3>`。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let lower = input.to_ascii_lowercase();

        if let Some(arg) = lower.strip_prefix("power:") {
            let exponent = parse_parameter(input, arg)?;
            if exponent <= 0.0 {
                return Err(TweenError::InvalidEaseParameter {
                    input: input.to_string(),
                    message: "幂次必须大于 0".to_string(),
                });
            }
            return Ok(Ease::Power { exponent });
        }

        if let Some(args) = lower.strip_prefix("bezier:") {
            let values = args
                .split(',')
                .map(|arg| parse_parameter(input, arg))
                .collect::<Result<Vec<_>, _>>()?;
            let points: [f32; 4] =
                values
                    .try_into()
                    .map_err(|_| TweenError::InvalidEaseParameter {
                        input: input.to_string(),
                        message: "贝塞尔缓动需要 4 个控制点".to_string(),
                    })?;
            return Ok(Ease::Bezier { points });
        }

        Ease::ALL
            .into_iter()
            .find(|ease| ease.name() == lower)
            .ok_or_else(|| TweenError::UnknownEase {
                name: input.to_string(),
            })
    }
}

fn parse_parameter(input: &str, arg: &str) -> Result<f32, TweenError> {
    let value: f32 = arg
        .trim()
        .parse()
        .map_err(|_| TweenError::InvalidEaseParameter {
            input: input.to_string(),
            message: format!("无法解析数值 '{}'", arg.trim()),
        })?;
    if !value.is_finite() {
        return Err(TweenError::InvalidEaseParameter {
            input: input.to_string(),
            message: "参数必须是有限数值".to_string(),
        });
    }
    Ok(value)
}

// ========== 线性 ==========

pub fn ease_linear(t: f32, b: f32, c: f32, d: f32) -> f32 {
    c * t / d + b
}

// ========== 正弦 ==========

pub fn ease_in_sine(t: f32, b: f32, c: f32, d: f32) -> f32 {
    -c * (t / d * PI_D2).cos() + c + b
}

pub fn ease_out_sine(t: f32, b: f32, c: f32, d: f32) -> f32 {
    c * (t / d * PI_D2).sin() + b
}

pub fn ease_in_out_sine(t: f32, b: f32, c: f32, d: f32) -> f32 {
    -c / 2.0 * ((PI * t / d).cos() - 1.0) + b
}

// ========== 二次 ==========

pub fn ease_in_quad(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / d;
    c * t * t + b
}

pub fn ease_out_quad(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / d;
    -c * t * (t - 2.0) + b
}

pub fn ease_in_out_quad(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / (d / 2.0);
    if t < 1.0 {
        return c / 2.0 * t * t + b;
    }
    let t = t - 1.0;
    -c / 2.0 * (t * (t - 2.0) - 1.0) + b
}

// ========== 三次 ==========

pub fn ease_in_cubic(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / d;
    c * t * t * t + b
}

pub fn ease_out_cubic(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / d - 1.0;
    c * (t * t * t + 1.0) + b
}

pub fn ease_in_out_cubic(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / (d / 2.0);
    if t < 1.0 {
        return c / 2.0 * t * t * t + b;
    }
    let t = t - 2.0;
    c / 2.0 * (t * t * t + 2.0) + b
}

// ========== 四次 ==========

pub fn ease_in_quart(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / d;
    c * t * t * t * t + b
}

pub fn ease_out_quart(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / d - 1.0;
    -c * (t * t * t * t - 1.0) + b
}

pub fn ease_in_out_quart(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / (d / 2.0);
    if t < 1.0 {
        return c / 2.0 * t * t * t * t + b;
    }
    let t = t - 2.0;
    -c / 2.0 * (t * t * t * t - 2.0) + b
}

// ========== 五次 ==========

pub fn ease_in_quint(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / d;
    c * t * t * t * t * t + b
}

pub fn ease_out_quint(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / d - 1.0;
    c * (t * t * t * t * t + 1.0) + b
}

pub fn ease_in_out_quint(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / (d / 2.0);
    if t < 1.0 {
        return c / 2.0 * t * t * t * t * t + b;
    }
    let t = t - 2.0;
    c / 2.0 * (t * t * t * t * t + 2.0) + b
}

// ========== 指数 ==========

pub fn ease_in_expo(t: f32, b: f32, c: f32, d: f32) -> f32 {
    if t == 0.0 {
        return b;
    }
    c * 2f32.powf(10.0 * (t / d - 1.0)) + b
}

pub fn ease_out_expo(t: f32, b: f32, c: f32, d: f32) -> f32 {
    if t == d {
        return b + c;
    }
    c * (-(2f32.powf(-10.0 * t / d)) + 1.0) + b
}

pub fn ease_in_out_expo(t: f32, b: f32, c: f32, d: f32) -> f32 {
    if t == 0.0 {
        return b;
    }
    if t == d {
        return b + c;
    }
    let t = t / (d / 2.0);
    if t < 1.0 {
        return c / 2.0 * 2f32.powf(10.0 * (t - 1.0)) + b;
    }
    let t = t - 1.0;
    c / 2.0 * (-(2f32.powf(-10.0 * t)) + 2.0) + b
}

// ========== 圆弧 ==========

pub fn ease_in_circular(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / d;
    -c * ((1.0 - t * t).sqrt() - 1.0) + b
}

pub fn ease_out_circular(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / d - 1.0;
    c * (1.0 - t * t).sqrt() + b
}

pub fn ease_in_out_circular(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / (d / 2.0);
    if t < 1.0 {
        return -c / 2.0 * ((1.0 - t * t).sqrt() - 1.0) + b;
    }
    let t = t - 2.0;
    c / 2.0 * ((1.0 - t * t).sqrt() + 1.0) + b
}

// ========== 回弹 ==========

pub fn ease_in_back(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let s = BACK_OVERSHOOT;
    let t = t / d;
    c * t * t * ((s + 1.0) * t - s) + b
}

pub fn ease_out_back(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let s = BACK_OVERSHOOT;
    let t = t / d - 1.0;
    c * (t * t * ((s + 1.0) * t + s) + 1.0) + b
}

pub fn ease_in_out_back(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let s = BACK_OVERSHOOT * 1.525;
    let t = t / (d / 2.0);
    if t < 1.0 {
        return c / 2.0 * (t * t * ((s + 1.0) * t - s)) + b;
    }
    let t = t - 2.0;
    c / 2.0 * (t * t * ((s + 1.0) * t + s) + 2.0) + b
}

// ========== 弹跳 ==========

pub fn ease_in_bounce(t: f32, b: f32, c: f32, d: f32) -> f32 {
    c - ease_out_bounce(d - t, 0.0, c, d) + b
}

pub fn ease_out_bounce(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / d;
    if t < 1.0 / 2.75 {
        c * (7.5625 * t * t) + b
    } else if t < 2.0 / 2.75 {
        let t = t - 1.5 / 2.75;
        c * (7.5625 * t * t + 0.75) + b
    } else if t < 2.5 / 2.75 {
        let t = t - 2.25 / 2.75;
        c * (7.5625 * t * t + 0.9375) + b
    } else {
        let t = t - 2.625 / 2.75;
        c * (7.5625 * t * t + 0.984375) + b
    }
}

pub fn ease_in_out_bounce(t: f32, b: f32, c: f32, d: f32) -> f32 {
    if t < d / 2.0 {
        ease_in_bounce(t * 2.0, 0.0, c, d) * 0.5 + b
    } else {
        ease_out_bounce(t * 2.0 - d, 0.0, c, d) * 0.5 + c * 0.5 + b
    }
}

// ========== 弹性 ==========
//
// 振幅取 `c`，相位偏移 `s = p / 4`。

pub fn ease_in_elastic(t: f32, b: f32, c: f32, d: f32) -> f32 {
    if t == 0.0 {
        return b;
    }
    let t = t / d;
    if t == 1.0 {
        return b + c;
    }
    let p = d * 0.3;
    let (a, s) = (c, p / 4.0);
    let t = t - 1.0;
    -(a * 2f32.powf(10.0 * t) * ((t * d - s) * PI_M2 / p).sin()) + b
}

pub fn ease_out_elastic(t: f32, b: f32, c: f32, d: f32) -> f32 {
    if t == 0.0 {
        return b;
    }
    let t = t / d;
    if t == 1.0 {
        return b + c;
    }
    let p = d * 0.3;
    let (a, s) = (c, p / 4.0);
    a * 2f32.powf(-10.0 * t) * ((t * d - s) * PI_M2 / p).sin() + c + b
}

/// 弹性缓入缓出
///
/// 以半程归一化后等于 2（即 `t == d`）时精确返回 `b + c`。
pub fn ease_in_out_elastic(t: f32, b: f32, c: f32, d: f32) -> f32 {
    if t == 0.0 {
        return b;
    }
    let t = t / (d / 2.0);
    if t == 2.0 {
        return b + c;
    }
    let p = d * (0.3 * 1.5);
    let (a, s) = (c, p / 4.0);
    let t = t - 1.0;
    let wave = ((t * d - s) * PI_M2 / p).sin();
    if t < 0.0 {
        -0.5 * (a * 2f32.powf(10.0 * t) * wave) + b
    } else {
        a * 2f32.powf(-10.0 * t) * wave * 0.5 + c + b
    }
}

// ========== 其他 ==========

/// 线性插值叠加一个随进度衰减的正弦抖动
pub fn ease_jiggle(t: f32, b: f32, c: f32, d: f32) -> f32 {
    const JIGGLE_FACTOR: f32 = 0.1;
    let linear = c * t / d + b;
    linear + (t * 20.0).sin() * (1.0 - t / d) * JIGGLE_FACTOR
}

pub fn ease_smooth_step(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / d;
    c * t * t * (3.0 - 2.0 * t) + b
}

/// 衰减正弦
///
/// 起点不等于 `b`，终点收敛到 `b + c`。
pub fn ease_decaying_sine(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / d;
    -c * 2f32.powf(-10.0 * t) * ((t - 0.3) * PI_M2 / 0.7).sin() + c + b
}

pub fn ease_power(t: f32, b: f32, c: f32, d: f32, exponent: f32) -> f32 {
    let t = t / d;
    c * t.powf(exponent) + b
}

/// 三次贝塞尔缓动
///
/// `points` 为四个控制点的纵坐标，横坐标等距。
pub fn ease_bezier(t: f32, b: f32, c: f32, d: f32, points: [f32; 4]) -> f32 {
    let [p0, p1, p2, p3] = points;
    let t = t / d;
    let t2 = t * t;
    let t3 = t2 * t;
    let mt = 1.0 - t;
    let mt2 = mt * mt;
    let mt3 = mt2 * mt;
    b + c * (mt3 * p0 + 3.0 * mt2 * t * p1 + 3.0 * mt * t2 * p2 + t3 * p3)
}
