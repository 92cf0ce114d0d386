//! fete-admin CLI tool
//!
//! Talks to a running fete-node over its admin socket.
//!
//! Usage:
//!   fete-admin report
//!   fete-admin registrants
//!   fete-admin quote [code]
//!   fete-admin reset --yes
//!   fete-admin ping

use fete_registry::admin_socket::{default_socket_path, AdminCommand, AdminResponse};
use fete_seating::SeatingReport;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

fn print_usage() {
    eprintln!("fete-admin - Inspect and manage event seating");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  fete-admin report          Seat usage per tier");
    eprintln!("  fete-admin registrants     List admitted registrants");
    eprintln!("  fete-admin quote [code]    Where a code would be seated now");
    eprintln!("  fete-admin reset --yes     Delete every admission");
    eprintln!("  fete-admin ping            Check if daemon is running");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  FETE_SOCKET  Path to admin socket (default: ./fete-data/admin.sock)");
}

fn get_socket_path() -> PathBuf {
    std::env::var("FETE_SOCKET")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_socket_path())
}

fn send_command(cmd: AdminCommand) -> Result<AdminResponse, String> {
    let socket_path = get_socket_path();

    let mut stream = UnixStream::connect(&socket_path).map_err(|e| {
        format!(
            "Failed to connect to fete-node at {:?}: {}\n\
             Is the fete-node running?",
            socket_path, e
        )
    })?;

    // Send command
    let cmd_json = serde_json::to_string(&cmd).map_err(|e| e.to_string())?;
    writeln!(stream, "{}", cmd_json).map_err(|e| e.to_string())?;

    // Read response
    let mut reader = BufReader::new(&stream);
    let mut response_line = String::new();
    reader
        .read_line(&mut response_line)
        .map_err(|e| e.to_string())?;

    serde_json::from_str(&response_line).map_err(|e| format!("Invalid response: {}", e))
}

fn print_report(report: &SeatingReport) {
    println!(
        "{:<16} {:>8} {:>9} {:>9} {:>6} {:>12}",
        "TIER", "SEATED", "CAPACITY", "REQUESTED", "FULL", "CUMULATIVE"
    );
    for tier in &report.tiers {
        println!(
            "{:<16} {:>8} {:>9} {:>9} {:>5}% {:>5}/{:<6}",
            format!("{} ({})", tier.name, tier.level),
            tier.effective_count,
            tier.capacity,
            tier.requested_count,
            tier.percentage_full,
            tier.cumulative_effective_count,
            tier.cumulative_capacity,
        );
    }
    println!();
    println!(
        "Admitted {} of {} seats, {} available",
        report.total_admitted, report.total_capacity, report.total_available
    );
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let cmd = match args[1].as_str() {
        "report" => AdminCommand::Report,
        "registrants" => AdminCommand::Registrants,
        "quote" => AdminCommand::Quote {
            code: args.get(2).cloned(),
        },
        "reset" => {
            if args.get(2).map(String::as_str) != Some("--yes") {
                eprintln!("Error: reset deletes every admission; pass --yes to confirm");
                std::process::exit(1);
            }
            AdminCommand::Reset
        }
        "ping" => AdminCommand::Ping,
        "-h" | "--help" | "help" => {
            print_usage();
            std::process::exit(0);
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(1);
        }
    };

    match send_command(cmd) {
        Ok(response) => match response {
            AdminResponse::Ok { message } => {
                println!("{}", message);
            }
            AdminResponse::Error { error } => {
                eprintln!("Error: {}", error);
                std::process::exit(1);
            }
            AdminResponse::Report { report } => print_report(&report),
            AdminResponse::List { items } => {
                if items.is_empty() {
                    println!("(none)");
                } else {
                    for item in items {
                        println!("{}", item);
                    }
                }
            }
            AdminResponse::Quote {
                requested,
                placement,
            } => match placement {
                Some(tier) if tier == requested => println!("{}", tier),
                Some(tier) => println!("{} (requested {})", tier, requested),
                None => {
                    println!("fully booked from {} down", requested);
                    std::process::exit(1);
                }
            },
            AdminResponse::Pong => {
                println!("pong - fete-node is running");
            }
        },
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
