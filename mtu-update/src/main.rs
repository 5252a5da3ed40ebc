mod config;
mod error;
mod lock;

use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use netns_mtu::{
    CiliumCli, EndpointFile, EndpointSource, IP_BINARY, IpRoute2, MtuConfig, ProcNamespaces,
    Reconciler, check_prerequisites,
};
use tracing::{Level, info};
use tracing_subscriber::fmt::time::FormatTime;

use crate::config::{FileConfig, Inventory, Overrides};
use crate::error::UpdateResult;

struct Elapsed(Instant);

impl FormatTime for Elapsed {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let d = self.0.elapsed();
        let total_secs = d.as_secs();
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        let millis = d.subsec_millis();
        write!(w, "[{mins:02}:{secs:02}:{millis:03}]")
    }
}

/// Set one MTU on every network namespace and managed host device.
#[derive(Parser)]
#[command(name = "mtu-update", version)]
struct Cli {
    /// Device MTU [default: 1500]. 0 requests autodetection, which is not supported.
    #[arg(short, long, env = "MTU_UPDATE_MTU")]
    mtu: Option<u32>,

    /// Bytes reserved for tunnel encapsulation on routes [default: 50]
    #[arg(short, long, env = "MTU_UPDATE_TUNNEL_OVERHEAD")]
    tunnel_overhead: Option<u32>,

    /// Log per-item decisions
    #[arg(short, long)]
    verbose: bool,

    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read endpoints from a JSON snapshot instead of the agent CLI
    #[arg(long)]
    endpoints_file: Option<PathBuf>,

    /// Agent CLI used to list endpoints [default: cilium]
    #[arg(long)]
    cilium_bin: Option<String>,

    /// Process filesystem used for namespace discovery [default: /proc]
    #[arg(long)]
    proc_root: Option<PathBuf>,

    /// Run lock [default: /run/mtu-update.lock]
    #[arg(long)]
    lock_file: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            mtu: self.mtu,
            tunnel_overhead: self.tunnel_overhead,
            proc_root: self.proc_root.clone(),
            lock_file: self.lock_file.clone(),
            cilium_bin: self.cilium_bin.clone(),
            endpoints_file: self.endpoints_file.clone(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_timer(Elapsed(Instant::now()))
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> UpdateResult<()> {
    let file = match &cli.config {
        Some(path) => config::load(path)?,
        None => FileConfig::default(),
    };
    let settings = config::resolve(cli.overrides(), file);

    let mtu = MtuConfig::sanitize(settings.mtu, settings.tunnel_overhead)?;

    let source: Box<dyn EndpointSource> = match &settings.inventory {
        Inventory::Cilium(bin) => {
            check_prerequisites(IP_BINARY, Some(bin))?;
            Box::new(CiliumCli::new(bin.clone()))
        }
        Inventory::File(path) => {
            check_prerequisites(IP_BINARY, None)?;
            Box::new(EndpointFile::new(path.clone()))
        }
    };

    let _lock = lock::acquire(&settings.lock_file)?;

    let namespaces = ProcNamespaces::new(settings.proc_root.clone());
    let links = IpRoute2::default();
    let report = Reconciler::new(&namespaces, &links, mtu).run(source.as_ref())?;

    info!(
        namespaces_updated = report.namespaces.updated,
        namespaces_failed = report.namespaces.failed,
        host_links_updated = report.host_links.updated,
        host_links_failed = report.host_links.failed,
        "MTU update complete"
    );
    Ok(())
}
