//! 生成 fat-tree 拓扑并导出 JSON
//!
//! 输出节点（含 dpid / 主机地址）与无向链路，供仿真工具实例化网络。

use clap::Parser;
use fattree_sdn::config::ControllerConfig;
use fattree_sdn::net::NodeKind;
use fattree_sdn::topo::fat_tree::build_fat_tree;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "fat-tree", about = "Generate a fat-tree topology and export it as JSON")]
struct Args {
    /// Port count (even); overrides the config file
    #[arg(long)]
    k: Option<usize>,

    /// Controller config (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the topology JSON to this file ("-" for stdout)
    #[arg(long)]
    json: Option<PathBuf>,
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut cfg = match &args.config {
        Some(path) => ControllerConfig::from_json_file(path)?,
        None => ControllerConfig::default(),
    };
    if let Some(k) = args.k {
        cfg.k = k;
    }

    let ft = build_fat_tree(cfg.k)?;
    let g = ft.graph();
    println!(
        "fat_tree k={} cores={} aggs={} edges={} hosts={} links={}",
        ft.k,
        g.nodes_of_kind(NodeKind::Core).count(),
        g.nodes_of_kind(NodeKind::Aggregation).count(),
        g.nodes_of_kind(NodeKind::Edge).count(),
        g.nodes_of_kind(NodeKind::Host).count(),
        g.edge_count(),
    );

    if let Some(path) = &args.json {
        let raw = serde_json::to_string_pretty(&ft.export(&cfg.addressing))?;
        if path.as_os_str() == "-" {
            println!("{raw}");
        } else {
            fs::write(path, raw)?;
            info!(path = %path.display(), "📝 拓扑 JSON 已写出");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fat-tree 生成失败");
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}
