use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "dawnlock", version, about = "Puzzle-gated alarm clock")]
struct Cli {
    /// Log level for dawnlock crates when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the alarm loop in the foreground
    Run(commands::run::RunArgs),
    /// Show when the alarm fires next
    Next {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the morning dashboard
    Dashboard(commands::dashboard::DashboardArgs),
    /// Reminders and notes shown on the dashboard
    Reminder {
        #[command(subcommand)]
        action: commands::reminder::ReminderAction,
    },
    /// Refresh weather/news now
    Refresh(commands::refresh::RefreshArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Report whether a runner is alive (non-zero exit when stale)
    Status {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Try out puzzles
    Puzzle {
        #[command(subcommand)]
        action: commands::puzzle::PuzzleAction,
    },
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dawnlock={log_level},warn")));

    // stdout is reserved for command output.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Next { json } => commands::next::run(json),
        Commands::Dashboard(args) => commands::dashboard::run(args),
        Commands::Reminder { action } => commands::reminder::run(action),
        Commands::Refresh(args) => commands::refresh::run(args),
        Commands::Config { action } => commands::config::run(action),
        Commands::Status { json } => commands::status::run(json),
        Commands::Puzzle { action } => commands::puzzle::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
