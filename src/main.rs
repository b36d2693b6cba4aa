// GeoLog: place the contacts of an ADIF log on a map
//
// Reads the log, resolves every contacted callsign against a cty.dat prefix
// table and prints one JSON placement per contact.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;

use geolog_lib::adif::Reader;
use geolog_lib::cty::{wpx_prefix, Catalogue};
use geolog_lib::locate::place;

#[derive(Parser, Debug)]
#[command(name = "geolog", version, about = "Place the contacts of an ADIF log on a map")]
struct Args {
    /// ADIF log file
    log: PathBuf,

    /// cty.dat prefix table
    #[arg(long, env = "GEOLOG_CTY")]
    cty: PathBuf,

    /// Write JSON lines here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Add each contact's WPX prefix to its properties
    #[arg(long)]
    wpx: bool,
}

fn main() {
    // Initialize logging - default to info level for our crate
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("geolog=info"),
    )
    .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), String> {
    let catalogue = Catalogue::from_path(&args.cty)
        .map_err(|e| format!("Failed to load prefix table {:?}: {}", args.cty, e))?;

    let file = File::open(&args.log)
        .map_err(|e| format!("Failed to open log {:?}: {}", args.log, e))?;
    let mut reader =
        Reader::new(file).map_err(|e| format!("Failed to read ADIF header: {}", e))?;
    match reader.adif_ver() {
        Some(ver) => log::info!("Opened ADIF log {:?} (version {})", args.log, ver),
        None => log::info!("Opened ADIF log {:?}", args.log),
    }

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).map_err(|e| format!("Failed to create {:?}: {}", path, e))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut placed = 0usize;
    let mut skipped = 0usize;

    for (idx, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Skipping record {}: {}", idx + 1, e);
                skipped += 1;
                continue;
            }
        };

        if let Some(Err(e)) = record.datetime_on() {
            log::warn!("Record {}: {}", idx + 1, e);
        }

        let mut placement = match place(&record, &catalogue) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Record {} ({}): {}", idx + 1, record.call().unwrap_or("-"), e);
                skipped += 1;
                continue;
            }
        };

        if args.wpx {
            if let Some(call) = record.call() {
                match wpx_prefix(call) {
                    Ok(prefix) => placement.set_property("wpx", prefix),
                    Err(e) => log::debug!("No WPX prefix for {}: {}", call, e),
                }
            }
        }

        serde_json::to_writer(&mut out, &placement)
            .map_err(|e| format!("Failed to write placement: {}", e))?;
        writeln!(out).map_err(|e| format!("Failed to write placement: {}", e))?;
        placed += 1;
    }

    out.flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    log::info!("Placed {} contacts, skipped {}", placed, skipped);
    Ok(())
}
