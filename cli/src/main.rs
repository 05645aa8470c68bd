//! Coachdesk CLI
//!
//! Command-line interface for the coachdesk marketing module.
//!
//! # Usage
//!
//! ```bash
//! coachdesk campaign show 6650f1c2a9
//! coachdesk stage insert 6650f1c2a9 --at 1 --name "Seguimiento"
//! coachdesk email add 6650f1c2a9 s2 --subject "Hola" --body "Hola " --var nombre
//! coachdesk segment move-in seg-vip c1 c2
//! coachdesk campaign stats 6650f1c2a9 --format json
//! ```

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

#[derive(Parser)]
#[command(name = "coachdesk")]
#[command(author = "Coachdesk")]
#[command(version)]
#[command(about = "Coachdesk marketing command line interface", long_about = None)]
struct Cli {
    /// Backend API URL
    #[arg(long, env = "COACHDESK_API_URL")]
    api_url: Option<String>,

    /// Bearer token; read from the config file on every request when unset
    #[arg(long, env = "COACHDESK_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Output format
    #[arg(long, short)]
    format: Option<output::OutputFormat>,

    /// Profile name from config file
    #[arg(long, short)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and create campaigns
    Campaign {
        #[command(subcommand)]
        action: CampaignCommands,
    },
    /// Edit pipeline stages
    Stage {
        #[command(subcommand)]
        action: StageCommands,
    },
    /// Manage stage email units
    Email {
        #[command(subcommand)]
        action: EmailCommands,
    },
    /// Manage segments and their members
    Segment {
        #[command(subcommand)]
        action: SegmentCommands,
    },
    /// Browse the service catalog
    Services {
        #[command(subcommand)]
        action: ServiceCommands,
    },
    /// AI-assisted email drafts
    Draft {
        #[command(subcommand)]
        action: DraftCommands,
    },
    /// Configure CLI
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum CampaignCommands {
    /// Show a campaign with its pipeline
    Show { id: String },
    /// Funnel percentages, campaign-wide and per stage
    Stats { id: String },
    /// Refetch email statuses and merge them forward
    Refresh { id: String },
    /// Create a new campaign
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
}

#[derive(Subcommand)]
enum StageCommands {
    /// Insert a stage at a position
    Insert {
        campaign: String,
        #[arg(long)]
        at: usize,
        #[arg(long)]
        name: String,
    },
    /// Rename a stage
    Rename {
        campaign: String,
        stage: String,
        name: String,
    },
    /// Remove a stage
    Remove { campaign: String, stage: String },
    /// Move a stage to a new position
    Move {
        campaign: String,
        stage: String,
        #[arg(long)]
        to: usize,
    },
    /// Link a service to a stage
    Service {
        campaign: String,
        stage: String,
        #[arg(long, conflicts_with = "clear", required_unless_present = "clear")]
        service: Option<String>,
        #[arg(long)]
        clear: bool,
    },
    /// Require a purchase of the linked service to advance
    Gate {
        campaign: String,
        stage: String,
        #[arg(long, action = clap::ArgAction::Set)]
        required: bool,
    },
}

#[derive(Subcommand)]
enum EmailCommands {
    /// Add an email unit to a stage
    Add {
        campaign: String,
        stage: String,
        #[arg(long)]
        subject: String,
        #[arg(long, default_value = "")]
        body: String,
        /// Personalization variables appended to the body in order
        #[arg(long = "var")]
        variables: Vec<String>,
    },
    /// Remove an email unit from a stage
    Remove {
        campaign: String,
        stage: String,
        email: String,
    },
}

#[derive(Subcommand)]
enum SegmentCommands {
    /// List segments
    List {
        #[arg(long)]
        campaign: Option<String>,
    },
    /// Show segment members and stage counts
    Show {
        id: String,
        /// Campaign whose pipeline seeds the stage snapshot
        #[arg(long)]
        campaign: Option<String>,
    },
    /// Create a segment
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        campaign: Option<String>,
        /// Segment variable as key=value
        #[arg(long = "var")]
        variables: Vec<String>,
    },
    /// Delete a segment
    Delete { id: String },
    /// Move contacts from the other pool into the segment
    MoveIn {
        id: String,
        #[arg(required = true)]
        contacts: Vec<String>,
    },
    /// Move contacts out of the segment
    MoveOut {
        id: String,
        #[arg(required = true)]
        contacts: Vec<String>,
    },
    /// Assign a member to a stage
    Assign {
        id: String,
        contact: String,
        stage: String,
        #[arg(long)]
        campaign: Option<String>,
    },
    /// Remove a member's stage assignment
    Unassign { id: String, contact: String },
}

#[derive(Subcommand)]
enum ServiceCommands {
    /// List services
    List,
}

#[derive(Subcommand)]
enum DraftCommands {
    /// Generate an email body
    Generate {
        #[arg(long)]
        topic: String,
        #[arg(long, default_value = "profesional")]
        tone: String,
        #[arg(long, default_value = "")]
        instructions: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set configuration value
    Set { key: String, value: String },
    /// Get configuration value
    Get { key: String },
    /// List all configuration
    List,
    /// Initialize configuration
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Config { action } => commands::config::handle(action, cli.profile.as_deref()),
        command => match commands::Context::build(
            cli.api_url,
            cli.token,
            cli.format,
            cli.profile.as_deref(),
        ) {
            Ok(ctx) => dispatch(command, &ctx).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn dispatch(command: Commands, ctx: &commands::Context) -> Result<(), String> {
    match command {
        Commands::Campaign { action } => commands::campaign::handle(action, ctx).await,
        Commands::Stage { action } => commands::stage::handle(action, ctx).await,
        Commands::Email { action } => commands::email::handle(action, ctx).await,
        Commands::Segment { action } => commands::segment::handle(action, ctx).await,
        Commands::Services { action } => commands::catalog::services(action, ctx).await,
        Commands::Draft { action } => commands::catalog::draft(action, ctx).await,
        Commands::Config { .. } => Ok(()),
    }
}
