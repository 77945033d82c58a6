pub mod commands;

use clap::{Parser, Subcommand};
use clarity_core::Intent;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "clarity",
    about = "Campaign Clarity operator CLI",
    long_about = "Analyze Salesforce campaigns, inspect chat routing, and check runtime readiness.",
    after_help = "Examples:\n  clarity analyze 701Hr000001L82yIAC --intent basic_info\n  clarity classify \"what about that campaign\"\n  clarity doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Analyze one campaign through the agent and return structured output")]
    Analyze {
        #[arg(help = "Salesforce campaign id (15 or 18 characters, starting with 701)")]
        campaign_id: String,
        #[arg(long, help = "basic_info, ai_description, or full_analysis; omit for the full analysis")]
        intent: Option<Intent>,
    },
    #[command(about = "Show how the bot would route a chat message, without calling any service")]
    Classify {
        #[arg(help = "Message text as typed in chat, without the bot mention")]
        text: String,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, field mappings, and client readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Analyze { campaign_id, intent } => commands::analyze::run(&campaign_id, intent),
        Command::Classify { text } => commands::classify::run(&text),
        Command::Config => commands::CommandResult::plain(commands::config::run()),
        Command::Doctor { json } => commands::CommandResult::plain(commands::doctor::run(json)),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
