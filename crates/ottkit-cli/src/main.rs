//! ottkit CLI - provision keys and issue one-time tokens for a CA.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use zeroize::Zeroizing;

use ottkit_core::{KeyAlgorithm, ProvisionerRecord};
use ottkit_provisioner::{Directory, DirectoryConfig};

/// ottkit - one-time token issuance for certificate requests
#[derive(Parser)]
#[command(name = "ottkit")]
#[command(about = "Provision keys and issue one-time tokens for a CA", long_about = None)]
struct Cli {
    /// Configuration store root (defaults to $OTTKIT_PATH, then ~/.ottkit)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue a one-time token for a subject
    Token {
        /// Subject the certificate will cover
        subject: String,

        #[command(flatten)]
        select: Selector,

        /// Base URL of the CA
        #[arg(long)]
        ca_url: String,

        /// Path to the CA root certificate
        #[arg(long)]
        root_cert: PathBuf,

        /// Additional subject alternative names; the subject is always included (repeatable)
        #[arg(long = "san")]
        sans: Vec<String>,

        /// Token lifetime in seconds
        #[arg(long, default_value_t = 300)]
        lifetime: u64,

        /// File holding the provisioner password
        #[arg(long)]
        password_file: PathBuf,
    },

    /// Manage configured provisioners
    #[command(subcommand)]
    Provisioner(ProvisionerCommands),
}

#[derive(Subcommand)]
enum ProvisionerCommands {
    /// Generate and store a new password-protected provisioner key
    Add {
        /// Provisioner name (may be empty)
        #[arg(default_value = "")]
        name: String,

        /// Key algorithm: ES256 or EdDSA
        #[arg(long, default_value = "ES256")]
        alg: KeyAlgorithm,

        /// File holding the password to seal the key with
        #[arg(long)]
        password_file: PathBuf,
    },

    /// List configured provisioners
    List,

    /// Remove a provisioner by name or kid
    Remove {
        /// Name or kid
        key: String,
    },

    /// Print a provisioner's public key as JWK
    Jwk {
        #[command(flatten)]
        select: Selector,

        /// File holding the provisioner password
        #[arg(long)]
        password_file: PathBuf,
    },
}

#[derive(Args)]
struct Selector {
    /// Provisioner name
    #[arg(long, default_value = "")]
    name: String,

    /// Provisioner key id (takes precedence over --name)
    #[arg(long, default_value = "")]
    kid: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for command output
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match cli.root {
        Some(root) => DirectoryConfig::new(root),
        None => DirectoryConfig::from_env()?,
    };
    debug!(root = %config.root.display(), "Using configuration store");

    match cli.command {
        Commands::Token {
            subject,
            select,
            ca_url,
            root_cert,
            sans,
            lifetime,
            password_file,
        } => {
            let config = config.with_token_lifetime(Duration::from_secs(lifetime));
            let directory = Directory::new(config)?;
            let password = read_password(&password_file)?;
            let provisioner =
                directory.resolve(&select.name, &select.kid, &ca_url, &root_cert, &password)?;
            let token = provisioner.issue_token_with_sans(&subject, &sans)?;
            println!("{}", token);
        }
        Commands::Provisioner(cmd) => {
            let directory = Directory::new(config)?;
            match cmd {
                ProvisionerCommands::Add {
                    name,
                    alg,
                    password_file,
                } => {
                    let password = read_password(&password_file)?;
                    let record = directory.add(&name, alg, &password)?;
                    println!("Provisioner added:");
                    print_record(&record);
                }
                ProvisionerCommands::List => list_provisioners(&directory)?,
                ProvisionerCommands::Remove { key } => {
                    let record = directory.remove(&key)?;
                    println!("Provisioner removed:");
                    print_record(&record);
                }
                ProvisionerCommands::Jwk {
                    select,
                    password_file,
                } => {
                    let password = read_password(&password_file)?;
                    let provisioner =
                        directory.resolve(&select.name, &select.kid, "", "", &password)?;
                    let jwk = provisioner
                        .public_jwk()
                        .ok_or("resolved provisioner has no signing key")?;
                    println!("{}", serde_json::to_string_pretty(&jwk)?);
                }
            }
        }
    }

    Ok(())
}

/// Read a password file, dropping one trailing newline.
fn read_password(path: &Path) -> Result<Zeroizing<Vec<u8>>, Box<dyn std::error::Error>> {
    let mut data = Zeroizing::new(
        std::fs::read(path)
            .map_err(|e| format!("Failed to read password file '{}': {}", path.display(), e))?,
    );
    if data.last() == Some(&b'\n') {
        data.pop();
        if data.last() == Some(&b'\r') {
            data.pop();
        }
    }
    Ok(data)
}

fn list_provisioners(directory: &Directory) -> Result<(), Box<dyn std::error::Error>> {
    let records = directory.list()?;

    println!("Provisioners ({}):", records.len());
    println!("{:<20}  {:<6}  {:<43}  {}", "NAME", "ALG", "KID", "CREATED");
    println!("{}", "-".repeat(96));

    for record in records {
        let name = if record.name.is_empty() {
            "(anonymous)"
        } else {
            record.name.as_str()
        };
        println!(
            "{:<20}  {:<6}  {:<43}  {}",
            name,
            record.alg.as_str(),
            record.kid.as_str(),
            format_created(&record)
        );
    }

    Ok(())
}

fn print_record(record: &ProvisionerRecord) {
    println!("  Name:       {}", record.name);
    println!("  Kid:        {}", record.kid);
    println!("  Algorithm:  {}", record.alg);
    println!("  Created:    {}", format_created(record));
}

fn format_created(record: &ProvisionerRecord) -> String {
    record
        .created_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}
