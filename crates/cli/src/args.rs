use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "halberd")]
#[command(version)]
#[command(about = "A credential-verification scanner", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Attempt logins against one or more targets
    Scan(ScanArgs),
}

#[derive(Args)]
pub struct ScanArgs {
    /// Targets: IP, CIDR, range, or hostname (comma-separated)
    #[arg(short = 't', long, required = true)]
    pub targets: String,

    /// Service port
    #[arg(short, long, default_value = "3306")]
    pub port: u16,

    /// Protocol connector to use
    #[arg(long, default_value = "mysql", value_parser = ["mysql"])]
    pub protocol: String,

    /// Usernames (comma-separated)
    #[arg(short = 'u', long)]
    pub users: Option<String>,

    /// File with one username per line
    #[arg(long)]
    pub user_file: Option<PathBuf>,

    /// Passwords (comma-separated)
    #[arg(short = 'P', long)]
    pub passwords: Option<String>,

    /// File with one password per line
    #[arg(long)]
    pub pass_file: Option<PathBuf>,

    /// File with operator-supplied "user:password" pairs, one per line
    #[arg(long)]
    pub pair_file: Option<PathBuf>,

    /// Authentication realm/domain attached to every credential
    #[arg(long)]
    pub realm: Option<String>,

    /// Connect timeout in milliseconds
    #[arg(long, default_value = "5000")]
    pub connect_timeout: u64,

    /// Read timeout in milliseconds
    #[arg(long, default_value = "10000")]
    pub read_timeout: u64,

    /// Consecutive connection errors before a target is locked out
    #[arg(long, default_value = "3")]
    pub max_conn_errors: u32,

    /// Keep enumerating credentials after the first valid one
    #[arg(long, default_value_t = false)]
    pub continue_on_success: bool,

    /// Max targets scanned concurrently
    #[arg(short, long, default_value = "16")]
    pub concurrency: usize,

    /// Attempts per second across the whole scan
    #[arg(short = 'r', long)]
    pub rate_limit: Option<u64>,

    /// Output format: text, json
    #[arg(short, long, default_value = "text")]
    pub output_format: String,
}
