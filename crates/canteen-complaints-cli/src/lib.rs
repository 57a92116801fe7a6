//! Command surface for the canteen complaint tracker.
//!
//! Hosts can embed the tracker through:
//! - [`run_cli`] for full parsed CLI execution.
//! - [`run_with_data_dir`] for a single [`Command`] against a data directory.
//! - [`run_command`] for execution against an existing [`ComplaintDesk`].
//!
//! Interactive front ends should hold a [`ComplaintDesk`] directly and
//! subscribe to its change events; listeners read back through the
//! [`DeskView`] they are handed.

pub mod desk;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use canteen_complaints_core::{
    CanteenSummary, Complaint, ComplaintFilter, ComplaintListing, ComplaintStatus, Response,
    StallSummary,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

pub use desk::{ChangeNotifier, ComplaintDesk, DeskView, Listener};

#[derive(Debug, Parser)]
#[command(name = "canteen")]
#[command(about = "Canteen food-stall complaint tracker")]
pub struct Cli {
    #[arg(long, env = "CANTEEN_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List canteens in stored order.
    Canteens,
    /// List stalls, optionally for one canteen.
    Stalls(StallsArgs),
    Summary {
        #[command(subcommand)]
        command: SummaryCommand,
    },
    Complaints {
        #[command(subcommand)]
        command: Box<ComplaintsCommand>,
    },
    /// Record a staff response; the complaint becomes resolved.
    Respond(RespondArgs),
}

#[derive(Debug, Args)]
pub struct StallsArgs {
    #[arg(long)]
    canteen: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum SummaryCommand {
    Stalls(JsonArgs),
    Canteens(JsonArgs),
}

#[derive(Debug, Args)]
pub struct JsonArgs {
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Subcommand)]
pub enum ComplaintsCommand {
    List(ListArgs),
    Show(ShowArgs),
    Create(CreateArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long, conflicts_with = "status")]
    stall: Option<String>,
    #[arg(long)]
    status: Option<StatusArg>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    #[arg(long)]
    id: String,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    #[arg(long)]
    stall: String,
    #[arg(long)]
    problem_type: String,
    #[arg(long)]
    description: String,
}

#[derive(Debug, Args)]
pub struct RespondArgs {
    #[arg(long)]
    complaint: String,
    #[arg(long)]
    text: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Pending,
    Resolved,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplaintDetailPayload {
    contract_version: String,
    complaint: Complaint,
    stall_name: String,
    responses: Vec<Response>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedPayload {
    contract_version: String,
    id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowsPayload<T>
where
    T: Serialize,
{
    contract_version: String,
    rows: Vec<T>,
}

/// Executes the parsed top-level CLI command.
///
/// # Errors
/// Returns an error when the data directory cannot be loaded or the command
/// fails.
pub fn run_cli(cli: Cli) -> Result<()> {
    run_with_data_dir(&cli.data_dir, cli.command)
}

/// Loads the data directory and executes one command against it.
///
/// # Errors
/// Returns an error when loading or the command fails.
pub fn run_with_data_dir(data_dir: &Path, command: Command) -> Result<()> {
    let mut desk = ComplaintDesk::open_dir(data_dir)?;
    run_command(command, &mut desk)
}

/// Executes a parsed command against an existing desk.
///
/// # Errors
/// Returns an error when a read needs ordering over malformed stored dates,
/// when a lookup misses, or when a mutation fails to persist.
pub fn run_command(command: Command, desk: &mut ComplaintDesk) -> Result<()> {
    match command {
        Command::Canteens => {
            println!("{}", serde_json::to_string_pretty(&desk.canteens())?);
            Ok(())
        }
        Command::Stalls(args) => {
            let stalls = match args.canteen {
                Some(canteen_id) => desk.stalls_for_canteen(&canteen_id),
                None => desk.stalls(),
            };
            println!("{}", serde_json::to_string_pretty(&stalls)?);
            Ok(())
        }
        Command::Summary { command } => run_summary(&command, desk),
        Command::Complaints { command } => run_complaints(*command, desk),
        Command::Respond(args) => {
            let response_id = desk.submit_response(&args.complaint, &args.text)?;
            let payload = CreatedPayload {
                contract_version: "response_created.v1".to_string(),
                id: response_id,
            };
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(())
        }
    }
}

fn run_summary(command: &SummaryCommand, desk: &ComplaintDesk) -> Result<()> {
    match command {
        SummaryCommand::Stalls(args) => {
            let rows = desk.stall_summaries();
            if args.json {
                let payload = RowsPayload {
                    contract_version: "stall_summary.v1".to_string(),
                    rows,
                };
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                print_stall_summary_table(&rows);
            }
            Ok(())
        }
        SummaryCommand::Canteens(args) => {
            let rows = desk.canteen_summaries();
            if args.json {
                let payload = RowsPayload {
                    contract_version: "canteen_summary.v1".to_string(),
                    rows,
                };
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                print_canteen_summary_table(&rows);
            }
            Ok(())
        }
    }
}

fn run_complaints(command: ComplaintsCommand, desk: &mut ComplaintDesk) -> Result<()> {
    match command {
        ComplaintsCommand::List(args) => {
            let filter = build_filter(args.stall, args.status);
            let payload = build_complaint_list_payload(desk, &filter)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                print_complaint_table(&payload.rows);
            }
            Ok(())
        }
        ComplaintsCommand::Show(args) => {
            let payload = build_complaint_detail_payload(desk, &args.id)?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(())
        }
        ComplaintsCommand::Create(args) => {
            let complaint_id =
                desk.create_complaint(&args.stall, &args.problem_type, &args.description)?;
            let payload = CreatedPayload {
                contract_version: "complaint_created.v1".to_string(),
                id: complaint_id,
            };
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(())
        }
    }
}

fn build_filter(stall: Option<String>, status: Option<StatusArg>) -> ComplaintFilter {
    match (stall, status) {
        (Some(stall_id), _) => ComplaintFilter::Stall(stall_id),
        (None, Some(status)) => ComplaintFilter::Status(map_status(status)),
        (None, None) => ComplaintFilter::All,
    }
}

fn map_status(value: StatusArg) -> ComplaintStatus {
    match value {
        StatusArg::Pending => ComplaintStatus::Pending,
        StatusArg::Resolved => ComplaintStatus::Resolved,
    }
}

fn build_complaint_list_payload(
    desk: &ComplaintDesk,
    filter: &ComplaintFilter,
) -> Result<RowsPayload<ComplaintListing>> {
    Ok(RowsPayload {
        contract_version: "complaint_list.v1".to_string(),
        rows: desk.complaint_listing(filter)?,
    })
}

fn build_complaint_detail_payload(
    desk: &ComplaintDesk,
    complaint_id: &str,
) -> Result<ComplaintDetailPayload> {
    let complaint = desk
        .complaint_detail(complaint_id)
        .ok_or_else(|| anyhow!("complaint not found: {complaint_id}"))?;
    let responses = desk.complaint_responses(complaint_id)?;
    let stall_name = desk.stall_name(&complaint.stall_id);

    Ok(ComplaintDetailPayload {
        contract_version: "complaint_detail.v1".to_string(),
        complaint,
        stall_name,
        responses,
    })
}

fn print_complaint_table(rows: &[ComplaintListing]) {
    println!(
        "{:<8} {:<24} {:<10} {:<20} status",
        "id", "stall", "date", "problem"
    );
    println!("{}", "-".repeat(80));
    for row in rows {
        println!(
            "{:<8} {:<24} {:<10} {:<20} {}",
            row.complaint_id, row.stall_name, row.complaint_date, row.problem_type, row.status
        );
    }
}

fn print_stall_summary_table(rows: &[StallSummary]) {
    println!(
        "{:<8} {:<24} {:>5} {:>7} {:>8}",
        "stall", "name", "total", "pending", "resolved"
    );
    println!("{}", "-".repeat(56));
    for row in rows {
        println!(
            "{:<8} {:<24} {:>5} {:>7} {:>8}",
            row.stall_id, row.stall_name, row.total_count, row.pending_count, row.resolved_count
        );
    }
}

fn print_canteen_summary_table(rows: &[CanteenSummary]) {
    println!(
        "{:<8} {:<24} {:<16} {:>5}",
        "canteen", "name", "location", "total"
    );
    println!("{}", "-".repeat(56));
    for row in rows {
        println!(
            "{:<8} {:<24} {:<16} {:>5}",
            row.canteen_id, row.canteen_name, row.location, row.total_count
        );
    }
}
