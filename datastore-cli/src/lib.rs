//! Command-line access to Cloud Datastore through the facade.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use datastore_client::{DEFAULT_TIMEOUT_SECS, DatastoreOptions};
use datastore_emulator::{DEFAULT_PAGE_SIZE, EmulatorManager, EmulatorServer};
use datastore_service::{CloudDatastoreModule, CloudDatastoreService, Providers};
use datastore_types::{Entity, Fields, Identifier, Value};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "datastore-cli")]
#[command(about = "Read and write Cloud Datastore entities")]
pub struct Cli {
    #[command(flatten)]
    pub connection: Connection,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Where and how to reach the store.
#[derive(Args, Debug, Clone)]
pub struct Connection {
    /// Project id
    #[arg(long, env = "DATASTORE_PROJECT_ID", global = true)]
    pub project: Option<String>,

    /// Emulator `host:port`
    #[arg(long, env = "DATASTORE_EMULATOR_HOST", global = true)]
    pub emulator_host: Option<String>,

    /// API endpoint override; takes precedence over the emulator host
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    #[arg(long, global = true)]
    pub namespace: Option<String>,

    /// Bearer token for the Google endpoint
    #[arg(long, env = "DATASTORE_ACCESS_TOKEN", hide_env_values = true, global = true)]
    pub access_token: Option<String>,

    /// Service-account key file, used for the project id
    #[arg(long, global = true)]
    pub key_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    pub timeout: u64,
}

impl Connection {
    pub fn options(&self) -> DatastoreOptions {
        DatastoreOptions {
            project_id: self.project.clone(),
            key_file: self.key_file.clone(),
            api_endpoint: self.endpoint.clone().or_else(|| self.emulator_host.clone()),
            namespace: self.namespace.clone(),
            access_token: self.access_token.clone(),
            timeout_secs: self.timeout,
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Look an entity up by key
    Get {
        kind: String,
        id: String,
        /// Treat the identifier as a name even if it is numeric
        #[arg(long)]
        name: bool,
    },

    /// Find entities whose field equals a value
    Find {
        kind: String,
        field: String,
        /// JSON scalar (`5`, `true`, `"5"`); anything else is a string
        value: String,
        /// Print every match instead of the first one
        #[arg(long)]
        all: bool,
    },

    /// Upsert an entity from a flat JSON object
    Save {
        kind: String,
        fields: String,
        /// Identifier; the store allocates one when omitted
        #[arg(long)]
        id: Option<String>,
        #[arg(long, requires = "id")]
        name: bool,
    },

    /// Empty the emulator
    Reset,

    /// Run a local emulator until interrupted
    Serve {
        #[arg(short, long, default_value = "8081")]
        port: u16,

        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,
    },
}

/// Numeric unless `force_name` or the text is not an integer.
pub fn parse_identifier(raw: &str, force_name: bool) -> Identifier {
    if force_name {
        return Identifier::Name(raw.to_string());
    }
    raw.parse::<i64>()
        .map_or_else(|_| Identifier::Name(raw.to_string()), Identifier::Id)
}

/// JSON scalars keep their type; anything else is taken as a plain string.
/// Integers outside the `i64` range are an error rather than a rounded double.
pub fn parse_value(raw: &str) -> Result<Value> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json @ serde_json::Value::Number(_)) => Value::from_json(&json)
            .with_context(|| format!("`{raw}` does not fit in a 64-bit signed integer")),
        Ok(json) => Ok(Value::from_json(&json).unwrap_or_else(|| Value::String(raw.to_string()))),
        Err(_) => Ok(Value::String(raw.to_string())),
    }
}

pub fn parse_fields(raw: &str) -> Result<Fields> {
    let json: serde_json::Value =
        serde_json::from_str(raw).context("fields must be a JSON object")?;
    Ok(Fields::from_serialize(&json)?)
}

fn facade(connection: &Connection) -> CloudDatastoreService {
    CloudDatastoreModule::for_root(connection.options()).build(Providers::new())
}

fn print_entity(out: &mut impl Write, entity: &Entity) -> Result<()> {
    serde_json::to_writer(&mut *out, entity)?;
    writeln!(out)?;
    Ok(())
}

pub async fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    let connection = cli.connection;
    match cli.command {
        Command::Get { kind, id, name } => {
            let found = facade(&connection)
                .find_one_by_key(&kind, parse_identifier(&id, name))
                .await?;
            match found {
                Some(entity) => print_entity(out, &entity)?,
                None => writeln!(out, "null")?,
            }
        }
        Command::Find {
            kind,
            field,
            value,
            all,
        } => {
            let service = facade(&connection);
            let value = parse_value(&value)?;
            if all {
                for entity in service.find_all_by_field(&kind, &field, value).await? {
                    print_entity(out, &entity)?;
                }
            } else {
                match service.find_one_by_field(&kind, &field, value).await? {
                    Some(entity) => print_entity(out, &entity)?,
                    None => writeln!(out, "null")?,
                }
            }
        }
        Command::Save {
            kind,
            fields,
            id,
            name,
        } => {
            let fields = parse_fields(&fields)?;
            let identifier = id.map(|id| parse_identifier(&id, name));
            let key = facade(&connection).save(&kind, identifier, fields).await?;
            writeln!(out, "{}", serde_json::to_string(&key)?)?;
        }
        Command::Reset => {
            let host = connection
                .emulator_host
                .context("reset needs --emulator-host or DATASTORE_EMULATOR_HOST")?;
            let project = connection.project.unwrap_or_else(|| "local".to_string());
            EmulatorManager::new(host, project)?.reset().await?;
            writeln!(out, "reset")?;
        }
        Command::Serve { port, page_size } => {
            let server =
                EmulatorServer::bind(SocketAddr::from(([127, 0, 0, 1], port)), page_size).await?;
            writeln!(out, "{}", server.host())?;
            out.flush()?;
            info!("Serving until interrupted");
            server.join().await?;
        }
    }
    Ok(())
}
