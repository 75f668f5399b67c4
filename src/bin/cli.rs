//! Holonet CLI - GraphQL over a Neo4j character graph.
//!
//! Usage:
//!   holonet serve                      # Serve against Neo4j
//!   holonet serve --memory             # Serve against in-memory sample data
//!   holonet schema                     # Print the GraphQL SDL
//!   holonet query '<document>'         # Send a GraphQL document to the server
//!   holonet update <name> --mass 80    # Partially update a character
//!   holonet ping                       # Check the server is up
//!   holonet shutdown                   # Stop the server

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use holonet::daemon::{send_request, start_server, Request, Response};
use holonet::{build_schema, Config, GraphStore, MemoryStore, Neo4jStore, UpdateService};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "holonet")]
#[command(about = "Holonet - GraphQL over a Neo4j character graph", long_about = None)]
struct Cli {
    /// Config file (missing file = defaults + environment)
    #[arg(short, long, default_value = holonet::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Server address for client commands (default: server.listen)
    #[arg(long)]
    addr: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the GraphQL server
    Serve {
        /// Use an in-memory store seeded with sample characters
        #[arg(long)]
        memory: bool,
    },

    /// Print the GraphQL schema (SDL)
    Schema {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Send a GraphQL document to a running server
    Query {
        /// GraphQL document
        document: String,

        /// Variables as a JSON object
        #[arg(long)]
        variables: Option<String>,
    },

    /// Update scalar fields of a character by name
    Update {
        /// Character name
        name: String,

        #[arg(long)]
        mass: Option<i64>,

        #[arg(long)]
        gender: Option<String>,

        #[arg(long)]
        birth_year: Option<String>,

        /// Remove a field (repeatable)
        #[arg(long, value_enum)]
        clear: Vec<Field>,
    },

    /// Check if the server is alive
    Ping,

    /// Stop a running server
    Shutdown,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Field {
    Mass,
    Gender,
    BirthYear,
}

impl Field {
    fn arg_name(self) -> &'static str {
        match self {
            Field::Mass => "mass",
            Field::Gender => "gender",
            Field::BirthYear => "birth_year",
        }
    }

    fn graphql_type(self) -> &'static str {
        match self {
            Field::Mass => "Int",
            Field::Gender | Field::BirthYear => "String",
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load_with_env(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    init_tracing(&config);

    let addr = cli.addr.unwrap_or_else(|| config.server.listen.clone());

    match cli.command {
        Commands::Serve { memory } => {
            let store: Arc<dyn GraphStore> = if memory {
                Arc::new(MemoryStore::with_sample_data())
            } else {
                Arc::new(Neo4jStore::connect(&config.store).await?)
            };
            start_server(&config, store).await?;
        }

        Commands::Schema { out } => {
            let service = UpdateService::new(
                Arc::new(MemoryStore::new()),
                config.server.query_timeout(),
            );
            let sdl = build_schema(Arc::new(service)).sdl();
            match out {
                Some(path) => {
                    std::fs::write(&path, &sdl)?;
                    eprintln!("Schema written to {} ({} bytes)", path.display(), sdl.len());
                }
                None => print!("{}", sdl),
            }
        }

        Commands::Query { document, variables } => {
            let variables = variables
                .map(|v| serde_json::from_str::<Value>(&v))
                .transpose()
                .context("--variables must be JSON")?;
            let request = Request::Graphql {
                query: document,
                variables,
                operation_name: None,
            };
            print_response(send_request(&addr, &request).await?)?;
        }

        Commands::Update {
            name,
            mass,
            gender,
            birth_year,
            clear,
        } => {
            let mut values: Vec<(Field, Value)> = Vec::new();
            if let Some(mass) = mass {
                values.push((Field::Mass, json!(mass)));
            }
            if let Some(gender) = gender {
                values.push((Field::Gender, json!(gender)));
            }
            if let Some(birth_year) = birth_year {
                values.push((Field::BirthYear, json!(birth_year)));
            }
            for field in clear {
                if values.iter().any(|(f, _)| *f == field) {
                    bail!("--clear {} conflicts with a value for the same field", field.arg_name());
                }
                values.push((field, Value::Null));
            }

            let request = update_request(&name, &values);
            print_response(send_request(&addr, &request).await?)?;
        }

        Commands::Ping => match send_request(&addr, &Request::Ping).await? {
            Response::Pong => println!("pong"),
            other => bail!("unexpected response: {:?}", other),
        },

        Commands::Shutdown => match send_request(&addr, &Request::Shutdown).await? {
            Response::Goodbye => println!("server stopped"),
            other => bail!("unexpected response: {:?}", other),
        },
    }

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Build an `updateCharacter` request that only mentions the given fields,
/// so omitted fields stay untouched on the server.
fn update_request(name: &str, values: &[(Field, Value)]) -> Request {
    let mut params = vec!["$name: String!".to_string()];
    let mut args = vec!["name: $name".to_string()];
    let mut variables = Map::new();
    variables.insert("name".to_string(), json!(name));

    for (field, value) in values {
        let arg = field.arg_name();
        params.push(format!("${}: {}", arg, field.graphql_type()));
        args.push(format!("{}: ${}", arg, arg));
        variables.insert(arg.to_string(), value.clone());
    }

    let query = format!(
        "mutation UpdateCharacter({}) {{ updateCharacter({}) {{ id name height mass skin_colors hair_colors eye_colors birth_year gender }} }}",
        params.join(", "),
        args.join(", ")
    );

    Request::Graphql {
        query,
        variables: Some(Value::Object(variables)),
        operation_name: Some("UpdateCharacter".to_string()),
    }
}

fn print_response(response: Response) -> Result<()> {
    match response {
        Response::Ok { data } => {
            println!("{}", serde_json::to_string_pretty(&data)?);
            Ok(())
        }
        Response::Error { message } => bail!("server error: {}", message),
        other => bail!("unexpected response: {:?}", other),
    }
}
