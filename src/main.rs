// src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use depot::charge::format_charge;
use depot::models::{ParcelRecord, RecipientRecord};
use depot::{CollectionReceipt, Depot, DepotPaths};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "depot")]
#[command(author, version, about = "Parcel depot tracker with crash-safe flat-file records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the depot's record files
    Init {
        /// Depot directory (default: current directory)
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
    /// Process the collection of a parcel by its queued recipient
    Process {
        /// Package identifier
        package_id: String,
        /// Depot directory (default: current directory)
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
    /// Queue a recipient for a parcel
    AddRecipient {
        /// Recipient surname
        surname: String,
        /// Package identifier
        package_id: String,
        /// Depot directory (default: current directory)
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
    /// Register a new parcel
    AddParcel {
        /// Package identifier
        package_id: String,
        /// Mass in kilograms
        mass: String,
        /// Dimensions as LxWxH
        dimensions: String,
        /// Depot directory (default: current directory)
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
    /// Remove a recipient whose parcel has left the depot
    RemoveRecipient {
        /// Recipient surname
        surname: String,
        /// Package identifier
        package_id: String,
        /// Depot directory (default: current directory)
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
    /// Remove a collected parcel
    RemoveParcel {
        /// Package identifier
        package_id: String,
        /// Depot directory (default: current directory)
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
    /// Show the recipient queue
    Queue {
        /// Print as JSON
        #[arg(long)]
        json: bool,
        /// Depot directory (default: current directory)
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
    /// Show the parcel inventory
    Inventory {
        /// Print as JSON
        #[arg(long)]
        json: bool,
        /// Depot directory (default: current directory)
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
    /// Show the event log
    Log {
        /// Depot directory (default: current directory)
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
    /// Show the released-items ledger
    Released {
        /// Depot directory (default: current directory)
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
    /// Run commands from standard input against one open depot
    ///
    /// Collected parcels and storage durations only live in memory, so
    /// removals after collection and storage charges need a session.
    Session {
        /// Depot directory (default: current directory)
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
}

/// One line of input in a session
#[derive(Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct SessionLine {
    #[command(subcommand)]
    command: SessionCommand,
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Process the collection of a parcel by its queued recipient
    Process { package_id: String },
    /// Queue a recipient for a parcel
    AddRecipient { surname: String, package_id: String },
    /// Register a new parcel
    AddParcel {
        package_id: String,
        mass: String,
        /// Dimensions as LxWxH or L W H
        #[arg(num_args = 1.., required = true)]
        dimensions: Vec<String>,
    },
    /// Remove a recipient whose parcel has left the depot
    RemoveRecipient { surname: String, package_id: String },
    /// Remove a collected parcel
    RemoveParcel { package_id: String },
    /// Advance the storage duration of every waiting parcel
    Age,
    /// Show the recipient queue
    Queue,
    /// Show the parcel inventory
    Inventory,
    /// Show the event log
    Log,
    /// Show the released-items ledger
    Released,
    /// End the session
    #[command(alias = "exit")]
    Quit,
}

/// Open the depot in `dir`, surfacing any rows skipped during loading
fn open_depot(dir: PathBuf) -> Result<Depot> {
    let depot = Depot::open(DepotPaths::in_dir(dir))?;
    for skipped in &depot.load_report().skipped {
        warn!("{}", skipped);
    }
    Ok(depot)
}

fn render_receipt(receipt: &CollectionReceipt) -> String {
    let mut out = format!(
        "Processed: {} collected package {}. Charge: {}",
        receipt.surname,
        receipt.package_id,
        format_charge(receipt.charge)
    );
    for d in &receipt.divergences {
        out.push_str(&format!(
            "\n  WARNING: {} is out of step and needs manual reconciliation: {}",
            d.file.display(),
            d.reason
        ));
    }
    out
}

fn render_inventory(parcels: &[ParcelRecord]) -> String {
    let mut out = String::from("Current Inventory Status:");
    for parcel in parcels {
        out.push_str(&format!("\n  {}", parcel));
    }
    out.push_str(&format!("\n\nTotal: {} package(s)", parcels.len()));
    out
}

fn render_queue(recipients: &[RecipientRecord]) -> String {
    let mut out = String::from("Current Recipients Queue:");
    for recipient in recipients {
        out.push_str(&format!("\n  {}", recipient));
    }
    out.push_str(&format!("\n\nTotal: {} recipient(s)", recipients.len()));
    out
}

fn render_released(lines: &[String]) -> String {
    if lines.is_empty() {
        return "No parcels released yet.".to_string();
    }
    let mut out = String::from("Processed Parcels:");
    for line in lines {
        out.push_str(&format!("\n  {}", line));
    }
    out.push_str(&format!("\n\nTotal: {} release(s)", lines.len()));
    out
}

/// Run one session command. Returns `None` when the session should end.
fn execute(depot: &mut Depot, command: SessionCommand) -> depot::Result<Option<String>> {
    let out = match command {
        SessionCommand::Process { package_id } => {
            render_receipt(&depot.process_collection(&package_id)?)
        }
        SessionCommand::AddRecipient {
            surname,
            package_id,
        } => {
            let recipient = depot.register_recipient(&surname, &package_id)?;
            format!(
                "Added recipient: {} with parcel: {} (sequence {})",
                recipient.surname, recipient.package_id, recipient.sequence
            )
        }
        SessionCommand::AddParcel {
            package_id,
            mass,
            dimensions,
        } => {
            let parcel = depot.register_parcel(&package_id, &mass, &dimensions.join(" "))?;
            format!("Added parcel: {}", parcel)
        }
        SessionCommand::RemoveRecipient {
            surname,
            package_id,
        } => {
            depot.deregister_recipient(&surname, &package_id)?;
            format!("Removed recipient: {}", surname)
        }
        SessionCommand::RemoveParcel { package_id } => {
            let parcel = depot.remove_parcel(&package_id)?;
            format!("Removed parcel: {}", parcel.id)
        }
        SessionCommand::Age => {
            format!("Storage duration advanced for {} package(s)", depot.age_inventory())
        }
        SessionCommand::Queue => render_queue(&depot.list_recipients()),
        SessionCommand::Inventory => render_inventory(&depot.list_inventory()),
        SessionCommand::Log => format!("System Event History:\n{}", depot.event_history()),
        SessionCommand::Released => render_released(&depot.released_items()?),
        SessionCommand::Quit => return Ok(None),
    };
    Ok(Some(out))
}

/// Read commands line by line until `quit` or end of input. Failed
/// commands are reported and the session carries on.
fn run_session<R: BufRead, W: Write>(depot: &mut Depot, input: R, mut output: W) -> Result<()> {
    write!(output, "depot> ")?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        let words: Vec<&str> = line.split_whitespace().collect();
        if !words.is_empty() {
            match SessionLine::try_parse_from(words) {
                Ok(parsed) => match execute(depot, parsed.command) {
                    Ok(Some(out)) => writeln!(output, "{}", out)?,
                    Ok(None) => return Ok(()),
                    Err(e) => writeln!(output, "Error: {}", e)?,
                },
                Err(e) => write!(output, "{}", e)?,
            }
        }
        write!(output, "depot> ")?;
        output.flush()?;
    }

    debug!("Session input closed");
    writeln!(output)?;
    Ok(())
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { dir }) => {
            info!("Initializing depot at: {}", dir.display());
            Depot::init(&DepotPaths::in_dir(&dir))?;
            println!("Depot initialized successfully at: {}", dir.display());
            Ok(())
        }
        Some(Commands::Process { package_id, dir }) => {
            let mut depot = open_depot(dir)?;
            let receipt = depot.process_collection(&package_id)?;
            println!("{}", render_receipt(&receipt));
            Ok(())
        }
        Some(Commands::AddRecipient {
            surname,
            package_id,
            dir,
        }) => {
            let mut depot = open_depot(dir)?;
            let recipient = depot.register_recipient(&surname, &package_id)?;
            println!(
                "Added recipient: {} with parcel: {} (sequence {})",
                recipient.surname, recipient.package_id, recipient.sequence
            );
            Ok(())
        }
        Some(Commands::AddParcel {
            package_id,
            mass,
            dimensions,
            dir,
        }) => {
            let mut depot = open_depot(dir)?;
            let parcel = depot.register_parcel(&package_id, &mass, &dimensions)?;
            println!("Added parcel: {}", parcel);
            Ok(())
        }
        Some(Commands::RemoveRecipient {
            surname,
            package_id,
            dir,
        }) => {
            let mut depot = open_depot(dir)?;
            depot.deregister_recipient(&surname, &package_id)?;
            println!("Removed recipient: {}", surname);
            Ok(())
        }
        Some(Commands::RemoveParcel { package_id, dir }) => {
            let mut depot = open_depot(dir)?;
            let parcel = depot.remove_parcel(&package_id)?;
            println!("Removed parcel: {}", parcel.id);
            Ok(())
        }
        Some(Commands::Queue { json, dir }) => {
            let depot = open_depot(dir)?;
            let recipients = depot.list_recipients();
            if json {
                println!("{}", serde_json::to_string_pretty(&recipients)?);
            } else {
                println!("{}", render_queue(&recipients));
            }
            Ok(())
        }
        Some(Commands::Inventory { json, dir }) => {
            let depot = open_depot(dir)?;
            let parcels = depot.list_inventory();
            if json {
                println!("{}", serde_json::to_string_pretty(&parcels)?);
            } else {
                println!("{}", render_inventory(&parcels));
            }
            Ok(())
        }
        Some(Commands::Log { dir }) => {
            let depot = open_depot(dir)?;
            println!("System Event History:");
            print!("{}", depot.event_history());
            Ok(())
        }
        Some(Commands::Released { dir }) => {
            let depot = open_depot(dir)?;
            println!("{}", render_released(&depot.released_items()?));
            Ok(())
        }
        Some(Commands::Session { dir }) => {
            let mut depot = open_depot(dir)?;
            info!("Session started");
            run_session(&mut depot, io::stdin().lock(), io::stdout().lock())
        }
        None => {
            // No command provided, show help
            println!("Depot v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'depot --help' for usage information");
            Ok(())
        }
    }
}
