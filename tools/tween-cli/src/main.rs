//! # Tween CLI
//!
//! 补间工具 - 列出缓动函数、采样缓动曲线、无头回放场景文件。
//!
//! ## 用法
//!
//! ```bash
//! cargo run -p tween-cli -- eases
//! cargo run -p tween-cli -- curves -e out_bounce -e power:3 --samples 20
//! cargo run -p tween-cli -- play tools/tween-cli/scenarios/demo.json --fps 30
//!
//! # 或安装后直接使用
//! cargo install --path tools/tween-cli
//! tween -v play demo.json
//! ```

mod scenario;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::Level;
use tween_core::Ease;

use crate::scenario::{Playback, Scenario};

/// 参数化缓动的写法，`eases` 子命令列在固定缓动之后
const PARAMETRIC_EASES: [&str; 2] = ["power:<exponent>", "bezier:<p0>,<p1>,<p2>,<p3>"];

#[derive(Parser)]
#[command(name = "tween")]
#[command(about = "补间工具 - 缓动曲线采样与无头场景回放")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 列出所有缓动函数
    Eases,

    /// 在 [0, 1] 上等距采样缓动曲线
    Curves {
        /// 缓动名称，可重复（默认：全部）
        #[arg(short, long = "ease")]
        eases: Vec<String>,

        /// 采样段数（默认：10）
        #[arg(short, long, default_value_t = 10)]
        samples: usize,
    },

    /// 回放场景文件，输出节点最终状态（JSON）
    Play {
        /// 场景文件路径
        scenario: PathBuf,

        /// 帧率（默认：60）
        #[arg(long, default_value_t = 60.0)]
        fps: f32,

        /// 最大帧数（默认：100000）
        #[arg(long, default_value_t = 100_000)]
        max_frames: u64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = real_main(cli) {
        eprintln!("tween error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn real_main(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Eases => {
            for ease in Ease::ALL {
                println!("{ease}");
            }
            for form in PARAMETRIC_EASES {
                println!("{form}");
            }
            Ok(())
        }
        Commands::Curves { eases, samples } => curves(&eases, samples),
        Commands::Play {
            scenario,
            fps,
            max_frames,
        } => play(&scenario, fps, max_frames),
    }
}

fn curves(names: &[String], samples: usize) -> anyhow::Result<()> {
    if samples == 0 {
        bail!("采样段数必须大于 0");
    }

    let eases: Vec<Ease> = if names.is_empty() {
        Ease::ALL.to_vec()
    } else {
        names
            .iter()
            .map(|name| name.parse::<Ease>())
            .collect::<Result<_, _>>()?
    };

    for ease in eases {
        let values: Vec<String> = (0..=samples)
            .map(|i| {
                let t = i as f32 / samples as f32;
                format!("{:.4}", ease.evaluate(t, 0.0, 1.0, 1.0))
            })
            .collect();
        println!("{:<18} {}", ease.to_string(), values.join(" "));
    }
    Ok(())
}

fn play(path: &Path, fps: f32, max_frames: u64) -> anyhow::Result<()> {
    if !fps.is_finite() || fps <= 0.0 {
        bail!("帧率必须是正数: {fps}");
    }

    let scenario = Scenario::load(path)?;
    tracing::info!(
        path = %path.display(),
        nodes = scenario.nodes.len(),
        tweens = scenario.tweens.len(),
        "加载场景"
    );

    let playback = Playback::build(&scenario)?;
    let report = playback.run(1.0 / fps, max_frames);
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.idle {
        bail!("达到最大帧数 {max_frames} 时仍有补间在运行");
    }
    Ok(())
}
