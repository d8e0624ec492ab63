use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use flight_docket::aircraft::{self, AircraftRepository};
use flight_docket::config::Config;
use flight_docket::flight::FlightMetadata;
use flight_docket::pipeline;
use flight_docket::repo::DocketRepository;
use flight_docket::resolver::SlotSources;
use flight_docket::slots::Slot;
use flight_docket::staged::StagedStore;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fdocket", version, about = "Flight docket assembly and provenance pipeline")]
struct Cli {
    /// Path to a JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the storage root (uploads/dockets/generated/aip/... live under it)
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[allow(clippy::large_enum_variant)]
enum Commands {
    /// Assemble a docket from uploads, staged fetches, and cached charts
    Assemble(AssembleArgs),
    /// Stage a fetched artifact and print its single-use key
    Stage(StageArgs),
    /// Print one docket manifest by ID
    Show(ShowArgs),
    /// List recent docket manifests
    List(ListArgs),
    /// Manage stored aircraft configurations
    Aircraft(AircraftArgs),
}

#[derive(Parser, Debug)]
struct AssembleArgs {
    /// Aircraft type, e.g. C172
    #[arg(long)]
    aircraft_type: String,

    /// Registration, e.g. G-ABCD
    #[arg(long)]
    registration: String,

    /// Optional radio callsign
    #[arg(long, default_value = "")]
    callsign: String,

    /// Departure ICAO code
    #[arg(long)]
    departure: String,

    /// Destination ICAO code
    #[arg(long)]
    destination: String,

    /// Comma-separated alternate ICAO codes (max 5)
    #[arg(long, default_value = "")]
    alternates: String,

    /// Local estimated time of departure
    #[arg(long, default_value = "")]
    etd: String,

    /// Accepted flight plan PDF (required slot)
    #[arg(long, value_name = "PATH")]
    flight_plan: Option<PathBuf>,

    /// Operational flight plan PDF
    #[arg(long, value_name = "PATH")]
    operational_flight_plan: Option<PathBuf>,

    /// Mass & balance PDF (required slot)
    #[arg(long, value_name = "PATH")]
    mass_balance: Option<PathBuf>,

    /// Performance PDF (required slot)
    #[arg(long, value_name = "PATH")]
    performance: Option<PathBuf>,

    /// NOTAM briefing PDF (required slot)
    #[arg(long, value_name = "PATH")]
    notams: Option<PathBuf>,

    /// SIGWX chart PDF
    #[arg(long, value_name = "PATH")]
    sigwx: Option<PathBuf>,

    /// Wind chart PDF
    #[arg(long, value_name = "PATH")]
    winds: Option<PathBuf>,

    /// METAR & TAF briefing PDF
    #[arg(long, value_name = "PATH")]
    metar_taf: Option<PathBuf>,

    /// Staged-fetch reference, slot=key (repeatable)
    #[arg(long, value_name = "SLOT=KEY")]
    staged: Vec<String>,
}

#[derive(Parser, Debug)]
struct StageArgs {
    /// File to stage for a later assemble run
    #[arg(long)]
    file: PathBuf,
}

#[derive(Parser, Debug)]
struct ShowArgs {
    /// Docket ID, e.g. DOCKET-20260827-101530-AB12CD
    #[arg(long)]
    id: String,
}

#[derive(Parser, Debug)]
struct ListArgs {
    /// Maximum number of manifests (clamped to 1..=100)
    #[arg(long, default_value_t = 25)]
    limit: usize,
}

#[derive(Parser, Debug)]
struct AircraftArgs {
    #[command(subcommand)]
    command: AircraftCommands,
}

#[derive(Subcommand, Debug)]
enum AircraftCommands {
    /// Store an aircraft configuration from a JSON file
    Add {
        /// JSON object with at least a "name" field
        #[arg(long)]
        file: PathBuf,
        /// Update an existing ID instead of generating one
        #[arg(long)]
        id: Option<String>,
    },
    /// List stored aircraft configurations
    List,
    /// Delete one aircraft configuration
    Delete {
        #[arg(long)]
        id: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::resolve(cli.config.as_deref(), cli.storage.as_deref())?;

    match cli.command {
        Commands::Assemble(args) => cmd_assemble(&config, args),
        Commands::Stage(args) => cmd_stage(&config, args),
        Commands::Show(args) => cmd_show(&config, &args),
        Commands::List(args) => cmd_list(&config, &args),
        Commands::Aircraft(args) => cmd_aircraft(&config, args),
    }
}

fn cmd_assemble(config: &Config, args: AssembleArgs) -> Result<()> {
    let flight = FlightMetadata::new(
        &args.aircraft_type,
        &args.registration,
        &args.callsign,
        &args.departure,
        &args.destination,
        &args.alternates,
        &args.etd,
    )?;

    let mut sources = SlotSources::default();
    let uploads = [
        (Slot::AcceptedFlightPlan, args.flight_plan),
        (Slot::OperationalFlightPlan, args.operational_flight_plan),
        (Slot::MassBalance, args.mass_balance),
        (Slot::Performance, args.performance),
        (Slot::Notams, args.notams),
        (Slot::Sigwx, args.sigwx),
        (Slot::Winds, args.winds),
        (Slot::MetarTaf, args.metar_taf),
    ];
    for (slot, path) in uploads {
        if let Some(path) = path {
            sources.uploads.insert(slot, path);
        }
    }
    for pair in &args.staged {
        let (slot_key, key) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("--staged expects slot=key, got {pair}"))?;
        let slot = Slot::from_key(slot_key)
            .ok_or_else(|| anyhow!("unknown slot in --staged: {slot_key}"))?;
        sources.staged.insert(slot, key.to_string());
    }

    let staged_store = StagedStore::open(&config.paths.staging)?;
    let outcome = pipeline::assemble(config, &staged_store, flight, &sources)?;
    println!("{}", outcome.record.id);
    println!("{}", outcome.record.generated_pdf.display());
    Ok(())
}

fn cmd_stage(config: &Config, args: StageArgs) -> Result<()> {
    let staged_store = StagedStore::open(&config.paths.staging)?;
    let key = staged_store.stage(&args.file)?;
    println!("{key}");
    Ok(())
}

fn cmd_show(config: &Config, args: &ShowArgs) -> Result<()> {
    let repository = DocketRepository::new(config.paths.dockets.clone());
    match repository.load_by_id(&args.id) {
        Some(record) => {
            let json = serde_json::to_string_pretty(&record).context("encode docket JSON")?;
            println!("{json}");
            Ok(())
        }
        None => Err(anyhow!("docket not found")),
    }
}

fn cmd_list(config: &Config, args: &ListArgs) -> Result<()> {
    let repository = DocketRepository::new(config.paths.dockets.clone());
    for record in repository.list_recent(args.limit) {
        println!(
            "{}  {}  {} -> {}",
            record.id, record.created_at, record.flight.departure, record.flight.destination
        );
    }
    Ok(())
}

fn cmd_aircraft(config: &Config, args: AircraftArgs) -> Result<()> {
    let repository = AircraftRepository::new(config.paths.aircraft.clone());
    match args.command {
        AircraftCommands::Add { file, id } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("read {}", file.display()))?;
            let data: serde_json::Value =
                serde_json::from_slice(&bytes).context("parse aircraft JSON")?;
            let id = id.unwrap_or_else(aircraft::new_aircraft_id);
            repository.save(&id, data)?;
            println!("{id}");
            Ok(())
        }
        AircraftCommands::List => {
            for entry in repository.list_all() {
                let id = entry.get("id").and_then(|v| v.as_str()).unwrap_or("?");
                let name = entry.get("name").and_then(|v| v.as_str()).unwrap_or("?");
                println!("{id}  {name}");
            }
            Ok(())
        }
        AircraftCommands::Delete { id } => {
            if repository.delete(&id) {
                Ok(())
            } else {
                Err(anyhow!("aircraft not found"))
            }
        }
    }
}
