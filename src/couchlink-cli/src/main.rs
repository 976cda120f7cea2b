use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use couchlink_rs::{Client, ClientConfig, DecodePolicy};
use serde_json::Value;

mod telemetry;

#[derive(Debug, Parser)]
#[command(name = "couchlink", version, about = "Talk to a CouchDB server over HTTP")]
struct Cli {
    /// JSON configuration file; defaults are used when it is missing
    #[arg(long, default_value = "couchlink.json")]
    config: String,

    /// Protocol prefix, e.g. `http://`
    #[arg(long)]
    protocol: Option<String>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    user: Option<String>,

    #[arg(long)]
    password: Option<String>,

    /// Report empty or malformed responses as errors
    #[arg(long)]
    strict: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Authenticate and print the session
    Session,
    /// List all databases
    Dbs,
    /// Fetch a document
    Get {
        db: String,
        uri: String,
        /// Query parameter as key=value, repeatable
        #[arg(short, long = "query", value_name = "KEY=VALUE")]
        query: Vec<String>,
    },
    /// Insert a new document
    Insert { db: String, json: String },
    /// Create or replace a document
    Update { db: String, uri: String, json: String },
    /// Delete a document revision
    Delete { db: String, uri: String, rev: String },
}

impl Cli {
    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::load(&self.config).unwrap_or_else(|e| {
            tracing::warn!("Failed to load {}, using defaults: {}", self.config, e);
            ClientConfig::default()
        });

        if let Some(protocol) = &self.protocol {
            config.protocol = protocol.clone();
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(user) = &self.user {
            config.username = user.clone();
        }
        if let Some(password) = &self.password {
            config.password = password.clone();
        }
        if self.strict {
            config.decode_policy = DecodePolicy::Strict;
        }
        config
    }
}

fn parse_query(pairs: &[String]) -> Result<Vec<(&str, &str)>> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .with_context(|| format!("query parameter '{pair}' is not KEY=VALUE"))
        })
        .collect()
}

fn parse_body(raw: &str) -> Result<Value> {
    let body: Value = serde_json::from_str(raw).context("document body is not valid JSON")?;
    if !body.is_object() {
        bail!("document body must be a JSON object");
    }
    Ok(body)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.client_config();
    let client = Client::new(config);
    tracing::debug!("Using server {}", client.base_url());

    match &cli.command {
        Command::Session => {
            let session = client.ensure_authenticated().await?;
            print_json(&session.auth)?;
        }
        Command::Dbs => {
            print_json(&client.list_databases().await?)?;
        }
        Command::Get { db, uri, query } => {
            let query = parse_query(query)?;
            let response = client.get(db, uri, &query).await?;
            let status = response.status();
            let text = response.text().await?;
            if !status.is_success() {
                bail!("server returned {status}: {}", text.trim());
            }
            match serde_json::from_str::<Value>(&text) {
                Ok(value) => print_json(&value)?,
                Err(_) => println!("{text}"),
            }
        }
        Command::Insert { db, json } => {
            let result = client.insert(db, &parse_body(json)?).await?;
            print_json(&result)?;
        }
        Command::Update { db, uri, json } => {
            let result = client.update(db, uri, &parse_body(json)?).await?;
            print_json(&result)?;
        }
        Command::Delete { db, uri, rev } => {
            let result = client.delete(db, uri, rev).await?;
            print_json(&result)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = telemetry::init_telemetry(cli.verbose, cli.log_json)?;

    run(cli).await
}
