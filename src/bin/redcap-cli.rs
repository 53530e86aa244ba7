use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use redcap_client::{ClientOptions, RedcapClient, Response, operations};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "redcap-cli",
    version,
    about = "Small async CLI for calling the REDCap API"
)]
struct Cli {
    /// REDCap API endpoint, for example `https://redcap.example.org/api/`.
    #[arg(long, env = "REDCAP_API_URL")]
    url: Option<String>,

    /// Project API token, sent as the `token` body field.
    #[arg(long, env = "REDCAP_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Skip TLS certificate verification.
    #[arg(long)]
    insecure: bool,

    /// Fail on non-success statuses and unrecognized response bodies.
    #[arg(long)]
    strict: bool,

    /// Emit compact JSON instead of pretty-printed output.
    #[arg(long)]
    compact: bool,

    /// Override a request field, in form key=value. Repeat as needed.
    #[arg(long = "set", value_name = "KEY=VALUE", global = true)]
    overrides: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List supported operations and the fields each one lets you override.
    Operations,
    /// Export events.
    ExportEvents,
    /// Export the data dictionary.
    ExportMetadata,
    /// Export a survey link for one record.
    ExportSurveyLink {
        #[arg(long)]
        instrument: String,
        #[arg(long)]
        event: String,
        #[arg(long)]
        record: String,
    },
    /// Export the participant list of a survey.
    ExportSurveyParticipants {
        #[arg(long)]
        instrument: String,
        #[arg(long)]
        event: String,
    },
    /// Export records.
    ExportRecords,
    /// Import records.
    ImportRecords(DataInput),
    /// Delete one record.
    DeleteRecord {
        record: String,
    },
    /// Delete the file stored in a field of a repeating form instance.
    DeleteFormField {
        #[command(flatten)]
        target: FieldTarget,
        #[arg(long)]
        repeat_instance: u32,
    },
    /// Upload a local file into a file-upload field.
    ImportFile {
        #[command(flatten)]
        target: FieldTarget,
        /// Local file to upload.
        #[arg(long, value_name = "PATH")]
        file: PathBuf,
        /// One-based repeat instance.
        #[arg(long)]
        repeat_instance: Option<u32>,
    },
    /// Delete the file stored in a file-upload field.
    DeleteFile {
        #[command(flatten)]
        target: FieldTarget,
        /// One-based repeat instance.
        #[arg(long)]
        repeat_instance: Option<u32>,
    },
}

#[derive(Debug, Args)]
struct FieldTarget {
    #[arg(long)]
    record: String,
    #[arg(long)]
    field: String,
    #[arg(long)]
    event: String,
}

#[derive(Debug, Args)]
struct DataInput {
    /// Inline payload.
    #[arg(long, conflicts_with = "data_file")]
    data: Option<String>,

    /// Path to a file containing the payload.
    #[arg(long, value_name = "PATH", conflicts_with = "data")]
    data_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // `operations` is metadata-only; it does not require credentials.
    if let Command::Operations = cli.command {
        print_operations();
        return Ok(());
    }

    let Some(url) = cli.url.as_deref() else {
        bail!("missing API URL: pass --url or set REDCAP_API_URL");
    };
    let Some(token) = cli.token.as_deref() else {
        bail!("missing API token: pass --token or set REDCAP_API_TOKEN");
    };
    let options = ClientOptions {
        verify_ssl: !cli.insecure,
        strict_errors: cli.strict,
    };
    let client = RedcapClient::with_options(url, token, options)
        .with_context(|| format!("failed to create client for '{url}'"))?;

    let owned = parse_pairs(&cli.overrides).context("failed to parse --set arguments")?;
    let overrides: Vec<(&str, &str)> = owned
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();

    let response = run(&client, &cli.command, &overrides).await?;
    print_response(response, cli.compact).context("failed to print response")?;
    Ok(())
}

async fn run(
    client: &RedcapClient,
    command: &Command,
    overrides: &[(&str, &str)],
) -> Result<Response> {
    let response = match command {
        Command::Operations => unreachable!("handled before the client is built"),
        Command::ExportEvents => client.export_events(overrides).await,
        Command::ExportMetadata => client.export_metadata(overrides).await,
        Command::ExportSurveyLink {
            instrument,
            event,
            record,
        } => {
            client
                .export_survey_link(instrument, event, record, overrides)
                .await
        }
        Command::ExportSurveyParticipants { instrument, event } => {
            client
                .export_survey_participants(instrument, event, overrides)
                .await
        }
        Command::ExportRecords => client.export_records(overrides).await,
        Command::ImportRecords(input) => {
            let data = read_data(input).context("failed to read import payload")?;
            client.import_records(&data, overrides).await
        }
        Command::DeleteRecord { record } => client.delete_record(record, overrides).await,
        Command::DeleteFormField {
            target,
            repeat_instance,
        } => {
            client
                .delete_form_field(
                    &target.record,
                    &target.field,
                    &target.event,
                    *repeat_instance,
                    overrides,
                )
                .await
        }
        Command::ImportFile {
            target,
            file,
            repeat_instance,
        } => {
            client
                .import_file(
                    &target.record,
                    &target.field,
                    &target.event,
                    file,
                    *repeat_instance,
                    overrides,
                )
                .await
        }
        Command::DeleteFile {
            target,
            repeat_instance,
        } => {
            client
                .delete_file(
                    &target.record,
                    &target.field,
                    &target.event,
                    *repeat_instance,
                    overrides,
                )
                .await
        }
    };
    response.context("REDCap request failed")
}

fn print_operations() {
    let width = operations()
        .iter()
        .map(|definition| definition.name.len())
        .max()
        .unwrap_or_default();

    for definition in operations() {
        println!(
            "{:<width$}  {}",
            definition.name,
            definition.allowed_overrides.join(",")
        );
    }
}

/// Parses repeated `key=value` arguments into owned key/value pairs.
fn parse_pairs(values: &[String]) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::with_capacity(values.len());
    for item in values {
        let Some((key, value)) = item.split_once('=') else {
            bail!("invalid --set value '{item}': expected key=value");
        };
        if key.is_empty() {
            bail!("invalid --set value '{item}': empty key");
        }
        pairs.push((key.to_owned(), value.to_owned()));
    }
    Ok(pairs)
}

fn read_data(input: &DataInput) -> Result<String> {
    match (&input.data, &input.data_file) {
        (Some(raw), None) => Ok(raw.clone()),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("failed to read --data-file '{}'", path.display())),
        (None, None) => bail!("one of --data or --data-file is required"),
        (Some(_), Some(_)) => bail!("use only one of --data or --data-file"),
    }
}

/// Prints JSON responses as JSON and every other response as plain text.
fn print_response(response: Response, compact: bool) -> Result<()> {
    match response {
        Response::Json(value) if compact => println!("{}", serde_json::to_string(&value)?),
        Response::Json(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        other => println!("{other}"),
    }
    Ok(())
}
