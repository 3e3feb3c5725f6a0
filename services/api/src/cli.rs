use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use listings::config::AppConfig;
use listings::error::AppError;
use listings::identity::{JwtIdentityVerifier, VerifiedIdentity};

#[derive(Parser, Debug)]
#[command(
    name = "Urban Nest Listings",
    about = "Run the property listing marketplace API or exercise it from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Seed an in-memory marketplace and walk through search, favorites, and price changes
    Demo(DemoArgs),
    /// Mint a development bearer token signed with the configured secret
    IssueToken(IssueTokenArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct IssueTokenArgs {
    /// Identity provider subject the token is issued for
    #[arg(long)]
    pub(crate) subject: String,
    /// Display name claim used when registering without a profile
    #[arg(long)]
    pub(crate) name: Option<String>,
    /// E-mail claim
    #[arg(long)]
    pub(crate) email: Option<String>,
    /// Token lifetime in minutes
    #[arg(long, default_value_t = 60)]
    pub(crate) ttl_minutes: i64,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args).await,
        Command::IssueToken(args) => issue_token(args),
    }
}

fn issue_token(args: IssueTokenArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let verifier = JwtIdentityVerifier::new(&config.auth.jwt_secret, config.auth.jwt_issuer);
    let identity = VerifiedIdentity {
        subject: args.subject,
        name: args.name,
        email: args.email,
        phone: None,
        picture: None,
    };

    let token = verifier.issue(&identity, chrono::Duration::minutes(args.ttl_minutes))?;
    println!("{token}");
    Ok(())
}
