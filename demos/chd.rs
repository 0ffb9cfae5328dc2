use chdmap::ChdMap;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::fs::File;
use std::io::{Error, ErrorKind, Result};
use std::path::PathBuf;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Info(args) => run_info(args),
        Command::Dump(args) => run_dump(args),
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "chd utility for inspecting CHD minimal perfect hash map files",
    subcommand_required = true,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect a CHD map file and print basic information
    Info(InfoArgs),
    /// Print every entry of a CHD map file as JSON
    Dump(DumpArgs),
}

#[derive(clap::Args)]
struct InfoArgs {
    /// Path to the CHD map file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Byte offset of the map within the file
    #[arg(long, value_name = "BYTES", default_value_t = 0)]
    offset: u64,

    /// Optional key to resolve
    #[arg(short, long)]
    key: Option<String>,

    /// Optional slot to inspect
    #[arg(short, long)]
    slot: Option<u64>,
}

#[derive(clap::Args)]
struct DumpArgs {
    /// Path to the CHD map file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Byte offset of the map within the file
    #[arg(long, value_name = "BYTES", default_value_t = 0)]
    offset: u64,
}

fn run_info(args: InfoArgs) -> Result<()> {
    let file = File::open(&args.input)?;
    let map = ChdMap::load_at(&file, args.offset)?;
    print_json(&map.info())?;

    if let Some(key) = args.key {
        if map.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "cannot resolve a key in an empty map",
            ));
        }
        let slot = map.resolve_slot(&key);
        let stored = map.key_at(slot).unwrap_or_default();
        print_json(&json!({
            "key": key,
            "slot": slot,
            "stored_key": lossy(stored),
            "value": lossy(map.get(&key)),
            "matches": stored == key.as_bytes(),
        }))?;
    }

    if let Some(slot) = args.slot {
        let (key, value) = map.entry(slot).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("Slot {} out of range >= {}", slot, map.table_size()),
            )
        })?;
        print_json(&entry_json(slot, key, value))?;
    }

    Ok(())
}

fn run_dump(args: DumpArgs) -> Result<()> {
    let file = File::open(&args.input)?;
    let map = ChdMap::load_at(&file, args.offset)?;
    let entries: Vec<Value> = map
        .iter()
        .enumerate()
        .map(|(slot, (key, value))| entry_json(slot as u64, key, value))
        .collect();
    print_json(&entries)
}

fn entry_json(slot: u64, key: &[u8], value: &[u8]) -> Value {
    json!({ "slot": slot, "key": lossy(key), "value": lossy(value) })
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| Error::other(format!("Failed to format JSON: {e}")))?;
    println!("{}", json);
    Ok(())
}
