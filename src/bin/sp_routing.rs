//! 最短路径控制器
//!
//! 两种模式：
//! - 默认：在仿真 fat-tree 上启动控制器并做 pingall；
//! - `--events`：从 JSON 文件回放控制器事件，把产生的指令以 JSON 打印。
//!   每个事件可带 `at_ms`（缺省 0），按时间顺序投递；`--until-ms` 截断回放。

use clap::Parser;
use fattree_sdn::config::ControllerConfig;
use fattree_sdn::ctrl::{ControllerEvent, Directive, RoutingEngine};
use fattree_sdn::emu::Fabric;
use fattree_sdn::sim::{EventLoop, SimTime};
use fattree_sdn::topo::fat_tree::build_fat_tree;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(
    name = "sp-routing",
    about = "Shortest-path SDN controller for fat-tree topologies"
)]
struct Args {
    /// Port count (even); overrides the config file
    #[arg(long)]
    k: Option<usize>,

    /// Controller config (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Replay controller events from a JSON array instead of running pingall
    #[arg(long)]
    events: Option<PathBuf>,

    /// Stop the replay after this time (ms); later events are not delivered
    #[arg(long)]
    until_ms: Option<u64>,

    /// Number of pingall rounds (IPv4 in later rounds is forwarded by installed rules)
    #[arg(long, default_value_t = 1)]
    rounds: usize,
}

/// 回放文件中的一项：事件本身加可选的投递时间
#[derive(Debug, Deserialize)]
struct TimedEvent {
    #[serde(default)]
    at_ms: u64,
    #[serde(flatten)]
    event: ControllerEvent,
}

fn replay(
    cfg: ControllerConfig,
    path: &Path,
    until_ms: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = fs::read_to_string(path)?;
    let events: Vec<TimedEvent> = serde_json::from_str(&raw)?;
    info!(events = events.len(), "📼 回放事件");

    let mut engine = RoutingEngine::new(cfg);
    let mut ev_loop = EventLoop::default();
    for te in events {
        ev_loop.schedule(SimTime::from_millis(te.at_ms), te.event);
    }
    let mut out: Vec<Directive> = Vec::new();
    let handled = match until_ms {
        Some(ms) => ev_loop.run_until(SimTime::from_millis(ms), &mut engine, &mut out),
        None => ev_loop.run(&mut engine, &mut out),
    };
    if !ev_loop.is_empty() {
        info!(handled, pending = ev_loop.len(), "回放截止，剩余事件未投递");
    }

    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn pingall(cfg: ControllerConfig, rounds: usize) -> Result<(), Box<dyn std::error::Error>> {
    let ft = build_fat_tree(cfg.k)?;
    let mut fabric = Fabric::from_fat_tree(&ft, &cfg.addressing, cfg.max_hops)?;
    let mut engine = RoutingEngine::new(cfg);
    fabric.bring_up(&mut engine);

    let mut failed_total = 0usize;
    for round in 1..=rounds {
        let (mut ok, mut failed) = (0usize, 0usize);
        for &a in &ft.hosts {
            for &b in &ft.hosts {
                if a == b {
                    continue;
                }
                if fabric.ping(&mut engine, a, b)? {
                    ok += 1;
                } else {
                    warn!(?a, ?b, "ping 失败");
                    failed += 1;
                }
            }
        }
        println!(
            "pingall round={} pairs={} ok={} failed={} learned_hosts={}",
            round,
            ok + failed,
            ok,
            failed,
            engine.locations().len()
        );
        failed_total += failed;
    }

    if failed_total > 0 {
        return Err(format!("{failed_total} ping(s) failed").into());
    }
    Ok(())
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut cfg = match &args.config {
        Some(path) => ControllerConfig::from_json_file(path)?,
        None => ControllerConfig::default(),
    };
    if let Some(k) = args.k {
        cfg.k = k;
    }
    match &args.events {
        Some(path) => replay(cfg, path, args.until_ms),
        None => pingall(cfg, args.rounds),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "控制器运行失败");
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}
