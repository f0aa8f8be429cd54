use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use cloud_store::{load_settings, CloudStoreBackend, ResourceType, SetOutcome};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cloud-store")]
#[command(about = "Inspect and edit resources stored in the cloud API", long_about = None)]
struct Cli {
    /// YAML file with base_url, access_token, organization_id, timeout_secs
    #[arg(short, long, env = "CLOUD_STORE_SETTINGS")]
    config: Option<PathBuf>,

    /// Resource type, e.g. checkpoint or EXPECTATION_SUITE
    #[arg(short = 't', long, required_unless_present = "resource_name")]
    resource_type: Option<ResourceType>,

    /// Collection name, e.g. expectation_suites
    #[arg(long)]
    resource_name: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct KeyArgs {
    /// Resource id
    #[arg(long)]
    id: Option<String>,

    /// Resource name, looked up through the collection
    #[arg(long, conflicts_with = "id")]
    name: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List ids and names of every resource
    List,
    /// Print the stored JSON envelope
    Get(KeyArgs),
    /// Exit with status 1 when the resource does not exist
    Has(KeyArgs),
    /// Print the resource URL without calling the API
    Url(KeyArgs),
    /// Soft-delete a resource
    Delete {
        #[arg(long)]
        id: String,
    },
    /// Create a resource, or replace it when --id is given
    Put {
        #[arg(long)]
        id: Option<String>,

        /// JSON file holding the resource payload
        #[arg(long)]
        file: PathBuf,

        /// Extra top-level attribute, as key=value
        #[arg(long = "attr", value_parser = parse_attribute)]
        attributes: Vec<(String, String)>,
    },
}

fn parse_attribute(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got {:?}", raw)),
    }
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cloud_store=info,store_cli=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json(value: &Value) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to render JSON")?
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;

    let mut options = settings.options();
    options.resource_type = cli.resource_type;
    options.resource_name = cli.resource_name;
    let store = CloudStoreBackend::connect(&settings, options).context("Failed to set up store")?;

    match cli.command {
        Command::List => {
            let keys = store.list_keys(None).await?;
            info!(count = keys.len(), "Listed keys");
            print_json(&serde_json::to_value(&keys)?)?;
        }
        Command::Get(key) => {
            let key = store.build_key(key.id, key.name);
            print_json(&store.get(&key).await?)?;
        }
        Command::Has(key) => {
            let key = store.build_key(key.id, key.name);
            let exists = store.has_key(&key).await?;
            println!("{}", exists);
            if !exists {
                std::process::exit(1);
            }
        }
        Command::Url(key) => {
            let key = store.build_key(key.id, key.name);
            println!("{}", store.url_for_key(&key));
        }
        Command::Delete { id } => {
            store.remove_key(&store.build_key(Some(id), None)).await?;
        }
        Command::Put {
            id,
            file,
            attributes,
        } => {
            let raw = fs::read_to_string(&file)
                .context(format!("Failed to read payload: {:?}", file))?;
            let value: Value = serde_json::from_str(&raw).context("Payload is not valid JSON")?;
            let extra: Map<String, Value> = attributes
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect();

            match store.set(&store.build_key(id, None), value, extra).await? {
                SetOutcome::Updated => print_json(&json!({"updated": true}))?,
                SetOutcome::Created(created) => {
                    print_json(&json!({"id": created.id, "url": created.url}))?
                }
            }
        }
    }

    Ok(())
}
