use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use interop_mediator::auth::password::{hash_password, HashAlgorithm};
use interop_mediator::config::{build_registry, load_config};

#[derive(Parser)]
#[command(name = "mediator-cli")]
#[command(about = "Management CLI for the interop mediator", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:5002")]
    url: String,

    #[arg(short, long, env = "MEDIATOR_ADMIN_KEY", default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check mediator status
    Status,
    /// List channels in matching order
    Channels,
    /// Show one recorded transaction
    Transaction { id: String },
    /// Validate a configuration file without starting the mediator
    Check { path: std::path::PathBuf },
    /// Produce the password_hash value for a client record
    HashPassword {
        password: String,
        #[arg(long, default_value = "")]
        salt: String,
        #[arg(long, value_enum, default_value = "sha512")]
        algorithm: Algorithm,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Algorithm {
    Sha256,
    Sha512,
}

impl From<Algorithm> for HashAlgorithm {
    fn from(value: Algorithm) -> Self {
        match value {
            Algorithm::Sha256 => HashAlgorithm::Sha256,
            Algorithm::Sha512 => HashAlgorithm::Sha512,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let path = match cli.command {
        Commands::Status => "/admin/status".to_string(),
        Commands::Channels => "/admin/channels".to_string(),
        Commands::Transaction { id } => format!("/admin/transactions/{}", id),
        Commands::Check { path } => {
            let config = load_config(&path)?;
            let registry = build_registry(&config)?;
            println!(
                "{}: ok ({} channels, {} clients)",
                path.display(),
                registry.channel_count(),
                registry.client_count()
            );
            return Ok(());
        }
        Commands::HashPassword {
            password,
            salt,
            algorithm,
        } => {
            println!("{}", hash_password(algorithm.into(), &password, &salt));
            return Ok(());
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", cli.key))?);

    let client = reqwest::Client::new();
    let res = client
        .get(format!("{}{}", cli.url.trim_end_matches('/'), path))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
