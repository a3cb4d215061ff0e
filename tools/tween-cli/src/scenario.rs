//! 场景文件：节点初始状态 + 补间列表，用于无头回放。

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, bail};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tween_core::{
    Axis, Color, NodeState, SceneNode, Tween, TweenConfig, TweenEvent, TweenOptions, TweenSystem,
    ValueTween,
};

/// 场景描述
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: TweenConfig,
    #[serde(default)]
    pub nodes: Vec<NodeState>,
    #[serde(default)]
    pub tweens: Vec<TweenEntry>,
}

/// 单个补间
#[derive(Debug, Clone, Deserialize)]
pub struct TweenEntry {
    /// 目标节点名
    pub node: String,
    pub action: Action,
    pub duration: f32,
    /// 省略时使用配置中的默认值
    #[serde(default)]
    pub options: Option<TweenOptions>,
    /// 标量补间在报告中的名称
    #[serde(default)]
    pub label: Option<String>,
}

/// 补间动作
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Move { to: Vec3 },
    MoveAxis { axis: Axis, to: f32 },
    MoveAnchored { to: Vec2 },
    Scale { to: Vec3 },
    ScaleAxis { axis: Axis, to: f32 },
    Rotate { to: Vec3 },
    Size { to: Vec2 },
    Color {
        to: Color,
        #[serde(default)]
        from: Option<Color>,
    },
    Value { from: f32, to: f32 },
    Run,
}

/// 回放结果
#[derive(Debug, Serialize)]
pub struct Report {
    /// 实际推进的帧数
    pub frames: u64,
    /// 是否在帧数上限之前全部完成
    pub idle: bool,
    pub completed: usize,
    pub cancelled: usize,
    pub nodes: Vec<NodeState>,
    pub values: BTreeMap<String, f32>,
}

impl Scenario {
    /// 读取并解析场景文件
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取场景文件失败: {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("场景文件无效: {}", path.display()))
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let scenario: Self = serde_json::from_str(content)?;
        scenario.config.validate()?;
        Ok(scenario)
    }
}

/// 已构建的场景
pub struct Playback {
    system: TweenSystem,
    nodes: Vec<Rc<SceneNode>>,
    values: Vec<(String, ValueTween)>,
}

impl Playback {
    /// 创建节点并启动场景中的所有补间
    pub fn build(scenario: &Scenario) -> anyhow::Result<Self> {
        let system = TweenSystem::new(scenario.config.clone());

        let mut by_name: HashMap<&str, Rc<SceneNode>> = HashMap::new();
        let mut nodes = Vec::new();
        for state in &scenario.nodes {
            if by_name.contains_key(state.name.as_str()) {
                bail!("节点名重复: {}", state.name);
            }
            let node = Rc::new(SceneNode::from_state(state.clone()));
            by_name.insert(state.name.as_str(), node.clone());
            nodes.push(node);
        }

        let mut values = Vec::new();
        for (index, entry) in scenario.tweens.iter().enumerate() {
            let Some(node) = by_name.get(entry.node.as_str()) else {
                bail!("第 {index} 个补间引用了不存在的节点: {}", entry.node);
            };
            let tween = match entry.action {
                Action::Value { from, to } => {
                    let name = entry
                        .label
                        .clone()
                        .unwrap_or_else(|| format!("{}#{index}", entry.node));
                    let value = system.value_to(node, from, to, entry.duration, entry.options);
                    let tween = (*value).clone();
                    values.push((name, value));
                    tween
                }
                _ => spawn(&system, node, entry),
            };
            debug!(tween = %tween.id(), node = %entry.node, "场景补间已启动");
        }

        Ok(Self {
            system,
            nodes,
            values,
        })
    }

    /// 以固定帧间隔推进，直到没有运行中的补间或达到帧数上限
    pub fn run(&self, frame_delta: f32, max_frames: u64) -> Report {
        let mut frames = 0;
        let mut completed = 0;
        let mut cancelled = 0;

        while self.system.running_count() > 0 && frames < max_frames {
            frames += 1;
            for event in self.system.advance(frame_delta) {
                match event {
                    TweenEvent::Started(id) => debug!(frame = frames, tween = %id, "开始"),
                    TweenEvent::Completed(id) => {
                        completed += 1;
                        info!(frame = frames, tween = %id, "完成");
                    }
                    TweenEvent::Cancelled(id) => {
                        cancelled += 1;
                        info!(frame = frames, tween = %id, "取消");
                    }
                }
            }
        }

        let idle = self.system.running_count() == 0;
        info!(frames, idle, completed, cancelled, "回放结束");

        Report {
            frames,
            idle,
            completed,
            cancelled,
            nodes: self.nodes.iter().map(|node| node.snapshot()).collect(),
            values: self
                .values
                .iter()
                .map(|(name, value)| (name.clone(), value.value()))
                .collect(),
        }
    }
}

fn spawn(system: &TweenSystem, node: &Rc<SceneNode>, entry: &TweenEntry) -> Tween {
    let options = entry.options;
    let duration = entry.duration;
    match entry.action {
        Action::Move { to } => system.move_to(node, to, duration, options),
        Action::MoveAxis { axis, to } => system.move_axis(node, axis, to, duration, options),
        Action::MoveAnchored { to } => system.move_anchored(node, to, duration, options),
        Action::Scale { to } => system.scale_to(node, to, duration, options),
        Action::ScaleAxis { axis, to } => system.scale_axis(node, axis, to, duration, options),
        Action::Rotate { to } => system.rotate_to(node, to, duration, options),
        Action::Size { to } => system.size_to(node, to, duration, options),
        Action::Color { to, from: Some(from) } => {
            system.color_from_to(node, from, to, duration, options)
        }
        Action::Color { to, from: None } => system.color_to(node, to, duration, options),
        Action::Run => system.run_for(node, duration, options),
        Action::Value { from, to } => system.value_to(node, from, to, duration, options).into_tween(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"{
        "nodes": [
            { "name": "box", "local_position": [0.0, 0.0, 0.0] },
            { "name": "label", "color": { "r": 1.0, "g": 1.0, "b": 1.0, "a": 1.0 } }
        ],
        "tweens": [
            { "node": "box", "action": { "type": "move", "to": [10.0, 0.0, 0.0] }, "duration": 0.5 },
            { "node": "box", "action": { "type": "scale_axis", "axis": "y", "to": 2.0 },
              "duration": 0.5, "options": { "ease": "out_quad", "delay": 0.25 } },
            { "node": "label", "action": { "type": "color", "to": { "r": 0.0, "g": 0.0, "b": 0.0, "a": 0.0 } },
              "duration": 0.25 },
            { "node": "label", "action": { "type": "value", "from": 0.0, "to": 3.0 },
              "duration": 0.5, "label": "counter" }
        ]
    }"#;

    #[test]
    fn test_playback_runs_to_completion() {
        let scenario = Scenario::from_json(SCENARIO).unwrap();
        let playback = Playback::build(&scenario).unwrap();
        let report = playback.run(0.125, 100);

        assert!(report.idle);
        assert_eq!(report.frames, 6);
        assert_eq!(report.completed, 4);
        assert_eq!(report.cancelled, 0);
        assert_eq!(report.nodes[0].local_position, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(report.nodes[0].local_scale, Vec3::new(1.0, 2.0, 1.0));
        assert_eq!(report.nodes[1].color, Color::TRANSPARENT);
        assert_eq!(report.values.get("counter"), Some(&3.0));
    }

    #[test]
    fn test_frame_limit_stops_playback() {
        let scenario = Scenario::from_json(SCENARIO).unwrap();
        let playback = Playback::build(&scenario).unwrap();
        let report = playback.run(0.125, 2);

        assert!(!report.idle);
        assert_eq!(report.frames, 2);
    }

    #[test]
    fn test_unknown_node_is_rejected() {
        let scenario = Scenario::from_json(
            r#"{ "tweens": [ { "node": "ghost", "action": { "type": "run" }, "duration": 1.0 } ] }"#,
        )
        .unwrap();
        let error = Playback::build(&scenario).err().unwrap();
        assert!(error.to_string().contains("ghost"));
    }

    #[test]
    fn test_bundled_demo_plays_to_idle() {
        let scenario = Scenario::from_json(include_str!("../scenarios/demo.json")).unwrap();
        let report = Playback::build(&scenario).unwrap().run(1.0 / 60.0, 1_000);

        assert!(report.idle);
        assert_eq!(report.cancelled, 0);
        assert_eq!(report.completed, scenario.tweens.len());
        assert_eq!(report.values.get("progress"), Some(&100.0));
        // 世界空间 y 轴补间在父节点偏移下换算为局部坐标
        let hero = &report.nodes[0];
        assert!(hero.local_position.abs_diff_eq(Vec3::new(4.0, 3.0, 0.0), 1e-4));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(Scenario::from_json(r#"{ "config": { "time_scale": -1.0 } }"#).is_err());
    }
}
