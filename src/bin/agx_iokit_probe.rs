//! AGX IOKit probe
//!
//! Inspect how this machine's AGX user client is laid out.
//!
//! Usage:
//!   agx_iokit_probe [OPTIONS] <COMMAND>
//!
//! Commands:
//!   version     Print the detected interface revision
//!   selectors   Print the selector table
//!   lookup      Map a raw selector to its method
//!   decode      Normalize a hex-encoded ALLOCATE_MEM reply

use clap::{Parser, Subcommand};
use serde_json::json;

use agx_iokit::resource::expected_size;
use agx_iokit::selector::table_for;
use agx_iokit::{
    selector_label, try_allocate_resource_resp, AbiError, AgxVersion, FixedVersionSource,
    SelectorLabel, SysctlVersionSource, VersionOracle, VersionSource,
};

#[derive(Parser, Debug)]
#[command(name = "agx_iokit_probe", about = "Inspect the AGX IOKit interface revision")]
struct Args {
    /// Use this product version instead of kern.osproductversion (e.g. "26.0")
    #[arg(long, global = true)]
    macos_version: Option<String>,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the detected interface revision
    Version,
    /// Print the selector table
    Selectors {
        /// Show every known revision, not just the active one
        #[arg(long)]
        all: bool,
    },
    /// Map a raw selector (decimal or 0x-prefixed hex) to its method
    Lookup { selector: String },
    /// Normalize a hex-encoded ALLOCATE_MEM reply
    Decode { hex: String },
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let result = match &args.macos_version {
        Some(version) => run(&args, VersionOracle::new(FixedVersionSource::new(version.clone()))),
        None => run(&args, VersionOracle::<SysctlVersionSource>::system()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run<S: VersionSource>(args: &Args, oracle: VersionOracle<S>) -> Result<(), String> {
    match &args.command {
        Command::Version => {
            let version = oracle.try_version().map_err(|e| e.to_string())?;
            if args.json {
                println!(
                    "{}",
                    json!({
                        "revision": version.to_string(),
                        "allocate_resp_size": expected_size(version),
                    })
                );
            } else {
                println!("{}", version);
            }
        }
        Command::Selectors { all } => {
            let versions = if *all {
                AgxVersion::ALL.to_vec()
            } else {
                vec![oracle.try_version().map_err(|e| e.to_string())?]
            };
            print_selectors(&versions, args.json);
        }
        Command::Lookup { selector } => {
            let version = oracle.try_version().map_err(|e| e.to_string())?;
            let code = parse_selector(selector)?;
            let label = selector_label(version, code);
            let valid = label != SelectorLabel::Invalid;
            if args.json {
                println!(
                    "{}",
                    json!({ "selector": code, "label": label.name(), "valid": valid })
                );
            } else {
                println!("0x{:x} -> {}", code, label);
            }
        }
        Command::Decode { hex: input } => {
            let version = oracle.try_version().map_err(|e| e.to_string())?;
            let bytes = hex::decode(input.trim()).map_err(|e| format!("Invalid hex: {}", e))?;
            let resp = try_allocate_resource_resp(version, &bytes).map_err(|e: AbiError| e.to_string())?;
            if args.json {
                println!(
                    "{}",
                    json!({
                        "gpu_va": resp.gpu_va,
                        "cpu": resp.cpu,
                        "handle": resp.handle,
                        "sub_size": resp.sub_size,
                    })
                );
            } else {
                println!("gpu_va   = 0x{:x}", resp.gpu_va);
                println!("cpu      = 0x{:x}", resp.cpu);
                println!("handle   = {}", resp.handle);
                println!("sub_size = 0x{:x}", resp.sub_size);
            }
        }
    }
    Ok(())
}

fn print_selectors(versions: &[AgxVersion], as_json: bool) {
    if as_json {
        let tables: Vec<_> = versions
            .iter()
            .map(|&version| {
                let entries: Vec<_> = table_for(version)
                    .iter()
                    .map(|e| {
                        json!({
                            "label": e.label.name(),
                            "selector": e.selector,
                            "status": e.status.name(),
                        })
                    })
                    .collect();
                json!({ "revision": version.to_string(), "selectors": entries })
            })
            .collect();
        println!("{}", serde_json::Value::Array(tables));
        return;
    }

    for version in versions {
        println!("{}:", version);
        for e in table_for(*version) {
            let code = if e.selector == agx_iokit::SELECTOR_INVALID {
                "-".to_string()
            } else {
                format!("0x{:x}", e.selector)
            };
            println!("  {:<26} {:>6}  {}", e.label.name(), code, e.status.name());
        }
    }
}

fn parse_selector(text: &str) -> Result<u32, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(digits) => u32::from_str_radix(digits, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("Invalid selector {:?}: {}", text, e))
}
