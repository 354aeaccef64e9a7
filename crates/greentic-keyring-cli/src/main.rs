use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use greentic_keyring_aws_sm::{AwsClientConfig, build_repository_with};
use greentic_keyring_core::telemetry;
use greentic_keyring_spec::{KeyDocument, PersistOptions, XmlRepository};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "greentic-keyring",
    version,
    about = "Greentic data-protection keyring CLI"
)]
struct Cli {
    #[command(flatten)]
    keyring: KeyringArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct KeyringArgs {
    /// Namespace prefix shared by every key in the keyring.
    #[arg(long, global = true, env = "GREENTIC_KEYRING_PREFIX")]
    prefix: Option<String>,
    #[arg(long, global = true, env = "GREENTIC_KEYRING_KMS_KEY_ID")]
    kms_key_id: Option<String>,
    #[arg(long, global = true, env = "GREENTIC_KEYRING_REPLICATION_REGION")]
    replication_region: Option<String>,
    #[arg(long, global = true, env = "GREENTIC_KEYRING_REPLICA_KMS_KEY_ID")]
    replica_kms_key_id: Option<String>,
    #[arg(long, global = true, env = "GREENTIC_AWS_REGION")]
    region: Option<String>,
    /// Alternative Secrets Manager endpoint, e.g. a localstack URL.
    #[arg(long, global = true, env = "GREENTIC_AWS_SM_ENDPOINT")]
    endpoint: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Print every key document stored under the prefix.
    List,
    /// Store a key document read from a file (`-` for stdin).
    Store(StoreArgs),
}

#[derive(Args)]
struct StoreArgs {
    #[arg(short = 'f', long)]
    file: PathBuf,
    /// Secret name suffix; defaults to the document's `id` attribute.
    #[arg(long)]
    name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init()?;
    let cli = Cli::parse();

    let prefix = cli
        .keyring
        .prefix
        .clone()
        .context("--prefix or GREENTIC_KEYRING_PREFIX is required")?;
    let options = PersistOptions {
        kms_key_id: cli.keyring.kms_key_id.clone(),
        replication_region: cli.keyring.replication_region.clone(),
        replica_region_kms_key_id: cli.keyring.replica_kms_key_id.clone(),
    };
    let client_config = AwsClientConfig {
        region: cli.keyring.region.clone(),
        endpoint: cli.keyring.endpoint.clone(),
    };
    let repository =
        build_repository_with(&client_config, &prefix, move |opts| *opts = options).await?;

    let result = match cli.command {
        Command::List => list(&repository),
        Command::Store(args) => store(&repository, args),
    };
    repository.dispose();
    result
}

fn list(repository: &impl XmlRepository) -> Result<()> {
    let documents = repository
        .get_all_elements()
        .context("failed to load keyring")?;
    let mut stdout = io::stdout().lock();
    for document in &documents {
        let text = document
            .to_xml_string()
            .with_context(|| format!("failed to render key {}", document.id().unwrap_or("<unnamed>")))?;
        writeln!(stdout, "{text}")?;
    }
    Ok(())
}

fn store(repository: &impl XmlRepository, args: StoreArgs) -> Result<()> {
    let text = if args.file.as_os_str() == "-" {
        io::read_to_string(io::stdin()).context("failed to read key document from stdin")?
    } else {
        fs::read_to_string(&args.file)
            .with_context(|| format!("failed to read {}", args.file.display()))?
    };
    let document = KeyDocument::parse(&text).context("input is not a key document")?;
    repository
        .store_element(&document, args.name.as_deref())
        .context("failed to store key document")?;
    info!(id = ?document.id(), "key document stored");
    Ok(())
}
