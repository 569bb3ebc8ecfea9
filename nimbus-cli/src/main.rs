use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;

use nimbus_core::provider::parse_import_id;
use nimbus_core::resource::ResourceAddress;
use nimbus_core::resource_id::{ParsedId, ShapeRegistry};
use nimbus_provider_azurerm::builtin_registry;
use nimbus_provider_azurerm::resources::resource_types;
use nimbus_state::{LocalBackend, ResourceState, StateBackend, StateFile};

const PROVIDER_NAME: &str = "azurerm";

#[derive(Parser)]
#[command(name = "nimbus")]
#[command(about = "Azure resource ID tooling and state management", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resource ID tools
    Id {
        #[command(subcommand)]
        command: IdCommands,
    },
    /// Record an existing resource in the state
    Import {
        /// Resource type (e.g., network_manager)
        resource_type: String,
        /// Name of the resource in configuration
        name: String,
        /// Resource ID of the existing resource
        id: String,

        /// Path to the state file
        #[arg(long, default_value = LocalBackend::DEFAULT_STATE_FILE)]
        state: PathBuf,
    },
    /// State inspection commands
    State {
        #[command(subcommand)]
        command: StateCommands,
    },
}

#[derive(Subcommand)]
enum IdCommands {
    /// Parse a resource ID and print its fields
    Parse {
        input: String,

        /// Shape to parse with (default: every known shape)
        #[arg(long)]
        shape: Option<String>,

        /// Accept literal segments in any casing
        #[arg(long)]
        insensitive: bool,
    },
    /// Format a resource ID from field values in declared order
    Format {
        shape: String,
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// List known resource ID shapes
    Shapes,
}

#[derive(Subcommand)]
enum StateCommands {
    /// List resources in the state
    List {
        /// Path to the state file
        #[arg(long, default_value = LocalBackend::DEFAULT_STATE_FILE)]
        state: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let result = match cli.command {
        Commands::Id { command } => run_id_command(command),
        Commands::Import {
            resource_type,
            name,
            id,
            state,
        } => run_import(&resource_type, &name, &id, &state).await,
        Commands::State { command } => run_state_command(command).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn registry() -> Result<ShapeRegistry, String> {
    builtin_registry().map_err(|e| format!("Failed to build shape registry: {}", e))
}

// =============================================================================
// id
// =============================================================================

fn run_id_command(command: IdCommands) -> Result<(), String> {
    let registry = registry()?;
    match command {
        IdCommands::Parse {
            input,
            shape,
            insensitive,
        } => {
            for parsed in parse_id(&registry, &input, shape.as_deref(), insensitive)? {
                print_parsed(&parsed);
            }
            Ok(())
        }
        IdCommands::Format { shape, values } => {
            let id = registry.format(&shape, values.as_slice()).map_err(|e| e.to_string())?;
            println!("{}", id);
            Ok(())
        }
        IdCommands::Shapes => {
            for shape in registry.iter() {
                println!("{} {}", format!("{:<40}", shape.name).bold(), shape.template().dimmed());
            }
            Ok(())
        }
    }
}

/// Parse `input` with one shape, or with every shape that accepts it
fn parse_id(
    registry: &ShapeRegistry,
    input: &str,
    shape: Option<&str>,
    insensitive: bool,
) -> Result<Vec<ParsedId>, String> {
    if let Some(name) = shape {
        let shape = registry
            .get(name)
            .ok_or_else(|| format!("Unknown shape: {}", name))?;
        let parsed = if insensitive {
            shape.parse_insensitively(input)
        } else {
            shape.parse(input)
        };
        return parsed.map(|p| vec![p]).map_err(|e| e.to_string());
    }

    let matches: Vec<ParsedId> = if insensitive {
        registry
            .iter()
            .filter_map(|shape| shape.parse_insensitively(input).ok())
            .collect()
    } else {
        registry.identify(input)
    };
    if matches.is_empty() {
        return Err(format!("No known resource ID shape accepts {:?}", input));
    }
    Ok(matches)
}

fn print_parsed(parsed: &ParsedId) {
    let shape = parsed.shape();
    println!(
        "{} {}",
        shape.description.green().bold(),
        format!("({})", shape.name).dimmed()
    );
    let width = parsed.fields().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, value) in parsed.fields() {
        println!("  {:<width$} = {}", name, value, width = width);
    }
    println!("  {}", parsed.id().cyan());
}

// =============================================================================
// import
// =============================================================================

async fn run_import(
    resource_type: &str,
    name: &str,
    id: &str,
    state_path: &Path,
) -> Result<(), String> {
    let parsed =
        parse_import_id(&resource_types(), resource_type, id).map_err(|e| e.to_string())?;
    let address = ResourceAddress::new(resource_type, name);
    log::debug!("Importing {} as {}", parsed.id(), address);

    let backend = LocalBackend::with_path(state_path.to_path_buf());
    backend.init().await.map_err(|e| e.to_string())?;
    let lock = backend
        .acquire_lock("import")
        .await
        .map_err(|e| e.to_string())?;

    let result = record_import(&backend, &address, &parsed).await;
    let released = backend.release_lock(&lock).await.map_err(|e| e.to_string());
    result?;
    released?;

    println!(
        "{} {} imported as {}",
        "✓".green(),
        address.to_string().bold(),
        parsed.id()
    );
    Ok(())
}

async fn record_import(
    backend: &LocalBackend,
    address: &ResourceAddress,
    parsed: &ParsedId,
) -> Result<(), String> {
    let mut state = backend
        .read_state()
        .await
        .map_err(|e| e.to_string())?
        .unwrap_or_default();

    let id = parsed.id();
    if let Some(existing) = state.find_by_id(&id) {
        return Err(format!(
            "{} is already managed as {}",
            id,
            existing.address()
        ));
    }
    if let Some(existing) = state.find_resource(&address.resource_type, &address.name) {
        return Err(format!(
            "{} already tracks {} - remove it from the state before importing",
            address, existing.id
        ));
    }

    state.upsert_resource(ResourceState::new(id, address, PROVIDER_NAME));
    state.increment_serial();
    backend.write_state(&state).await.map_err(|e| e.to_string())
}

// =============================================================================
// state
// =============================================================================

async fn run_state_command(command: StateCommands) -> Result<(), String> {
    match command {
        StateCommands::List { state } => run_state_list(&state).await,
    }
}

async fn run_state_list(state_path: &Path) -> Result<(), String> {
    let backend = LocalBackend::with_path(state_path.to_path_buf());
    let state = backend.read_state().await.map_err(|e| e.to_string())?;

    match state {
        Some(state) if !state.resources.is_empty() => {
            print_state(&state);
            Ok(())
        }
        _ => {
            println!("{}", "No resources in state.".yellow());
            Ok(())
        }
    }
}

fn print_state(state: &StateFile) {
    println!(
        "{}",
        format!("Serial {} (lineage {})", state.serial, state.lineage).dimmed()
    );
    for resource in &state.resources {
        let marker = if resource.protected { " [protected]" } else { "" };
        println!(
            "  • {}{}  {}",
            resource.address().to_string().bold(),
            marker.yellow(),
            resource.id
        );
    }
}
