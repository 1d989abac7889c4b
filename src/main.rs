use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use anyhow::Context;
use clap::{Parser, Subcommand};
use contextual::{Config, LayerName, LayerRuntime, Layered};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Context-oriented method layering demo
#[derive(Parser)]
#[command(name = "contextual")]
#[command(about = "Run the layering demo and inspect configuration", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CONTEXTUAL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call `test` on a probe with the given layers active
    Demo(DemoArgs),

    /// Print the effective configuration as TOML
    Config,

    /// Run the demo once and print the collected metrics
    Metrics(DemoArgs),
}

#[derive(clap::Args)]
struct DemoArgs {
    /// Layer to activate, in order (l1, l2)
    #[arg(short, long = "activate")]
    activate: Vec<String>,

    /// Activate globally instead of on the probe instance
    #[arg(short, long)]
    global: bool,

    /// Make l1 return without proceeding
    #[arg(long)]
    l1_stops: bool,
}

/// Which implementations ran, in call order.
#[derive(Default)]
struct Probe {
    executed: Mutex<Vec<String>>,
}

impl Probe {
    fn record(&self, step: &str) {
        self.executed.lock().unwrap_or_else(PoisonError::into_inner).push(step.to_string());
    }

    fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[derive(Serialize)]
struct DemoReport {
    activated: Vec<LayerName>,
    scope: &'static str,
    chain: Vec<LayerName>,
    executed: Vec<String>,
    result: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load().context("Failed to load configuration")?,
    };

    init_tracing(&config);

    match cli.command {
        Commands::Demo(args) => {
            let runtime = LayerRuntime::init_global(config);
            let report = run_demo(runtime, &args)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
        }
        Commands::Metrics(args) => {
            let runtime = LayerRuntime::init_global(config);
            run_demo(runtime, &args)?;
            print!("{}", runtime.metrics().render()?);
        }
    }

    Ok(())
}

fn init_tracing(config: &Config) {
    let fallback = config.logging.filter.as_str();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json {
        registry.with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)).init();
    }
}

fn run_demo(runtime: &LayerRuntime, args: &DemoArgs) -> anyhow::Result<DemoReport> {
    let class = runtime.define_class::<Probe>("Probe")?;
    let test = class.declare_base("test", |frame, ()| {
        frame.target().record("base");
        Ok("base".to_string())
    })?;

    let l1_stops = args.l1_stops;
    class.attach_layer(&test, "l1", move |frame, ()| {
        frame.target().record("l1");
        if l1_stops { Ok("l1".to_string()) } else { frame.proceed(()) }
    })?;
    class.attach_layer(&test, "l2", |frame, ()| {
        frame.target().record("l2");
        frame.proceed(())
    })?;

    let probe: Layered<Probe> = class.instantiate(Probe::default());
    for layer in &args.activate {
        if args.global {
            runtime.activate(layer.as_str())?;
        } else {
            probe.activate(layer.as_str())?;
        }
    }

    let chain = probe.chain_for(&test)?;
    let result = probe.call(&test, ())?;

    Ok(DemoReport {
        activated: args.activate.iter().map(|layer| LayerName::from(layer.as_str())).collect(),
        scope: if args.global { "global" } else { "instance" },
        chain,
        executed: probe.executed(),
        result,
    })
}
