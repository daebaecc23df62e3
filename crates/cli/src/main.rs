use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use network_service::{
    NetworkService, OperationHandle, PrimitiveParams, ServiceConfig, DEFAULT_USER,
};
use serde_json::{json, Value};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_TIMEOUT_SECS: u64 = 600;

#[derive(Parser)]
#[command(name = "osm-ns")]
#[command(about = "Run primitives on the VNF applications of a network service", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    connection: ConnectionArgs,
}

#[derive(Args)]
struct ConnectionArgs {
    /// Controller API address. Read from the hook environment when omitted.
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Model holding the VNF applications.
    #[arg(long, global = true)]
    model: Option<String>,

    #[arg(long, global = true, env = "JUJU_USER", default_value = DEFAULT_USER)]
    user: String,

    #[arg(long, global = true, env = "JUJU_SECRET", hide_env_values = true, default_value = "")]
    secret: String,

    /// PEM file with the controller CA certificate.
    #[arg(long, global = true)]
    cacert: Option<std::path::PathBuf>,

    /// Unit this client acts for, used to derive application names.
    #[arg(long, global = true, env = "JUJU_UNIT_NAME")]
    unit_name: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the application name of a VNF member.
    AppName {
        member_index: String,
        #[arg(long)]
        unit_id: Option<String>,
    },
    /// List the applications in the model.
    Applications,
    /// Print the status of an application.
    AppStatus { application: String },
    /// Dispatch a primitive and print its handle.
    Exec(PrimitiveArgs),
    /// Print the status of a dispatched primitive.
    Status { handle: String },
    /// Print the output of a dispatched primitive.
    Output { handle: String },
    /// Dispatch a primitive, wait for it and print its output.
    Run {
        #[command(flatten)]
        primitive: PrimitiveArgs,
        /// Seconds to wait before giving up.
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout: u64,
    },
}

#[derive(Args)]
struct PrimitiveArgs {
    application: String,
    primitive: String,
    /// Primitive parameter as key=value; may be repeated.
    #[arg(short, long = "param", value_parser = parse_param)]
    params: Vec<(String, Value)>,
}

impl PrimitiveArgs {
    fn params(&self) -> PrimitiveParams {
        self.params.iter().cloned().collect()
    }
}

/// `key=value`, where value is read as a JSON scalar and otherwise kept as a string.
fn parse_param(raw: &str) -> std::result::Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    if key.is_empty() {
        return Err(format!("missing parameter name in '{}'", raw));
    }

    let value = match serde_json::from_str::<Value>(value) {
        Ok(parsed) if !parsed.is_array() && !parsed.is_object() => parsed,
        _ => Value::String(value.to_string()),
    };
    Ok((key.to_string(), value))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Commands::AppName {
        member_index,
        unit_id,
    } = &cli.command
    {
        let unit_name = cli
            .connection
            .unit_name
            .as_deref()
            .context("--unit-name or JUJU_UNIT_NAME is required")?;
        let name = ns_core::application_name(unit_name, member_index, unit_id.as_deref())?;
        println!("{}", name);
        return Ok(());
    }

    let config = load_config(&cli.connection).await?;
    let mut service = NetworkService::new(config);
    let result = run_command(&mut service, cli.command).await;

    if let Err(e) = service.logout().await {
        tracing::warn!(error = %e, "Logout failed");
    }
    result
}

async fn load_config(args: &ConnectionArgs) -> Result<ServiceConfig> {
    let mut config = match (&args.endpoint, &args.model) {
        (Some(endpoint), Some(model)) => {
            ServiceConfig::new(endpoint, model, &args.user, &args.secret)
        }
        _ => ServiceConfig::from_env(&args.user, &args.secret)
            .await
            .context("Failed to read controller settings from the environment")?,
    };

    if let Some(path) = &args.cacert {
        let pem = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        config = config.with_cacert(pem);
    }
    if let Some(unit_name) = &args.unit_name {
        config = config.with_unit_name(unit_name);
    }

    Ok(config)
}

async fn run_command(service: &mut NetworkService, command: Commands) -> Result<()> {
    match command {
        Commands::AppName { .. } => unreachable!("handled before connecting"),
        Commands::Applications => {
            for name in service.get_applications().await? {
                println!("{}", name);
            }
        }
        Commands::AppStatus { application } => {
            println!("{}", service.get_application_status(&application).await?);
        }
        Commands::Exec(args) => {
            let handle = service
                .execute_primitive(&args.application, &args.primitive, &args.params())
                .await?;
            println!("{}", handle);
        }
        Commands::Status { handle } => {
            let status = service
                .get_primitive_status(&OperationHandle::new(handle))
                .await?;
            println!("{}", status);
        }
        Commands::Output { handle } => {
            let output = service
                .get_primitive_output(&OperationHandle::new(handle))
                .await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Run { primitive, timeout } => {
            let run = service
                .run_primitive(
                    &primitive.application,
                    &primitive.primitive,
                    &primitive.params(),
                    Duration::from_secs(timeout),
                )
                .await?;

            let report = json!({
                "handle": run.handle,
                "state": run.state.as_str(),
                "status": run.status.map(|s| s.as_str()),
                "polls": run.polls,
                "output": run.output,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);

            if run.timed_out() {
                bail!("primitive {} did not finish within {}s", run.handle, timeout);
            }
        }
    }
    Ok(())
}
