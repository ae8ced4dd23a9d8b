//! nestkey CLI - Command-line tool for hierarchical iteration paths
//!
//! This binary provides command-line interfaces for:
//! - pack: pack a JSON data store through a schema document
//! - fields: list the fields a definition tree generates
//! - resume: continue a repeater from a previously generated field name
//! - decode: show the levels, repeat indices and iteration state of a field name

mod config;

use clap::{Parser, Subcommand, ValueEnum};
use config::{CliConfig, Overrides};
use nestkey_codec::{
    pack, parse_definitions, parse_schema, ContinuationRequest, FieldGenerator, GeneratedField,
    PackContext, PathEncoder, PathKey,
};
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nestkey")]
#[command(about = "Hierarchical iteration-path and schema packing CLI tool")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log filter such as "debug" or "nestkey_codec=trace" (default: RUST_LOG, then "warn")
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Iteration state width in bits (8, 16, 32, 64)
    #[arg(long, global = true)]
    architecture: Option<u32>,
    /// Maximum nesting depth
    #[arg(long, global = true)]
    levels: Option<u32>,
    /// Prefix segment, repeatable; replaces the configured prefix
    #[arg(long = "prefix", global = true)]
    prefix: Vec<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack a data store through a schema document
    ///
    /// Examples:
    ///   nestkey pack schema.json --data store.json
    ///   nestkey pack schema.json --data - --pretty < store.json
    Pack {
        /// Schema document (JSON)
        schema: PathBuf,
        /// Data store (JSON, "-" for stdin); defaults to an empty object
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pretty-print the packed value
        #[arg(long)]
        pretty: bool,
    },
    /// List the fields generated from a definition tree
    ///
    /// Examples:
    ///   nestkey fields form.json --prefix form
    ///   nestkey fields form.json --data values.json --format ndjson
    Fields {
        /// Field definitions (JSON array)
        definitions: PathBuf,
        /// Stored values (JSON, "-" for stdin)
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = FieldsFormat::Names)]
        format: FieldsFormat,
    },
    /// Generate further repetitions of a repeater
    ///
    /// Examples:
    ///   nestkey resume form.json --path "form[rows][4][cell]" --previous 5 --additional 3
    Resume {
        /// Field definitions (JSON array)
        definitions: PathBuf,
        /// Stored values (JSON, "-" for stdin)
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// A field name inside the repeater
        #[arg(long)]
        path: String,
        /// Repetitions already rendered (default 1)
        #[arg(long)]
        previous: Option<String>,
        /// Repetitions to add (default 0)
        #[arg(long)]
        additional: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value_t = FieldsFormat::Names)]
        format: FieldsFormat,
    },
    /// Decode a field name into levels, repeat indices and iteration state
    ///
    /// Examples:
    ///   nestkey decode "NS[a][b][2][c]" --prefix-depth 1
    ///   nestkey decode "form[rows][3][cell]" --prefix form --format json
    Decode {
        /// Bracketed field name
        path: String,
        /// Number of leading segments that form the prefix (default: configured prefix depth)
        #[arg(long)]
        prefix_depth: Option<usize>,
        /// Output format
        #[arg(long, value_enum, default_value_t = DecodeFormat::Table)]
        format: DecodeFormat,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum FieldsFormat {
    /// One field name per line
    Names,
    /// One JSON object per field
    Ndjson,
    /// A JSON array of fields
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum DecodeFormat {
    Table,
    Json,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref())?;

    let config = match &cli.config {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            CliConfig::load(path)?
        }
        None => CliConfig::default(),
    };
    let overrides = Overrides {
        architecture: cli.architecture,
        levels: cli.levels,
        prefix: (!cli.prefix.is_empty()).then(|| cli.prefix.clone()),
    };
    let context = config.to_context(&overrides)?;

    match cli.command {
        Commands::Pack {
            schema,
            data,
            output,
            pretty,
        } => handle_pack(&context, &schema, data.as_deref(), output.as_deref(), pretty)?,
        Commands::Fields {
            definitions,
            data,
            format,
        } => handle_fields(&context, &definitions, data.as_deref(), format)?,
        Commands::Resume {
            definitions,
            data,
            path,
            previous,
            additional,
            format,
        } => {
            let mut params = vec![("path", path.as_str())];
            if let Some(previous) = previous.as_deref() {
                params.push(("previous", previous));
            }
            if let Some(additional) = additional.as_deref() {
                params.push(("additional", additional));
            }
            let request = ContinuationRequest::from_params(params)?;
            handle_resume(&context, &definitions, data.as_deref(), &request, format)?
        }
        Commands::Decode {
            path,
            prefix_depth,
            format,
        } => handle_decode(
            &context,
            &path,
            prefix_depth.unwrap_or(context.prefix.depth()),
            format,
        )?,
    }

    Ok(())
}

fn init_logging(level: Option<&str>) -> Result<(), Box<dyn Error>> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

fn handle_pack(
    context: &PackContext,
    schema_path: &Path,
    data: Option<&Path>,
    output: Option<&Path>,
    pretty: bool,
) -> Result<(), Box<dyn Error>> {
    let schema = parse_schema(&read_text(schema_path)?)?;
    let store = read_store(data)?;
    info!(schema = %schema_path.display(), "packing");

    let packed = pack(&schema, &store, context)?;

    let mut writer = open_output(output)?;
    if pretty {
        serde_json::to_writer_pretty(&mut writer, &packed)?;
    } else {
        serde_json::to_writer(&mut writer, &packed)?;
    }
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn handle_fields(
    context: &PackContext,
    definitions_path: &Path,
    data: Option<&Path>,
    format: FieldsFormat,
) -> Result<(), Box<dyn Error>> {
    let definitions = parse_definitions(&read_text(definitions_path)?)?;
    let store = read_store(data)?;
    let fields = FieldGenerator::new(&definitions, &store, context)?.generate()?;
    info!(count = fields.len(), "generated fields");
    write_fields(&mut open_output(None)?, &fields, format)
}

fn handle_resume(
    context: &PackContext,
    definitions_path: &Path,
    data: Option<&Path>,
    request: &ContinuationRequest,
    format: FieldsFormat,
) -> Result<(), Box<dyn Error>> {
    let definitions = parse_definitions(&read_text(definitions_path)?)?;
    let store = read_store(data)?;
    let fields = FieldGenerator::new(&definitions, &store, context)?.resume(request)?;
    info!(
        path = %request.caller_path,
        previous = request.previous_count,
        additional = request.additional_count,
        count = fields.len(),
        "resumed repeater"
    );
    write_fields(&mut open_output(None)?, &fields, format)
}

fn handle_decode(
    context: &PackContext,
    path: &str,
    prefix_depth: usize,
    format: DecodeFormat,
) -> Result<(), Box<dyn Error>> {
    let encoder = PathEncoder::parse_continuation(context.geometry, path, prefix_depth)?;
    let report = DecodeReport::from_encoder(path, &encoder);

    let mut writer = open_output(None)?;
    match format {
        DecodeFormat::Table => print_decode_table(&mut writer, &report)?,
        DecodeFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, &report)?;
            writer.write_all(b"\n")?;
        }
    }
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct DecodeReport {
    path: String,
    prefix: Vec<String>,
    depth: u32,
    state: u64,
    levels: Vec<LevelReport>,
    keys: Vec<PathKey>,
}

#[derive(Debug, Serialize)]
struct LevelReport {
    name: String,
    index: u64,
}

impl DecodeReport {
    fn from_encoder(path: &str, encoder: &PathEncoder) -> Self {
        Self {
            path: path.to_string(),
            prefix: encoder.prefix().segments().to_vec(),
            depth: encoder.current_level(),
            state: encoder.state().raw(),
            levels: encoder
                .names()
                .iter()
                .zip(encoder.indices())
                .map(|(name, index)| LevelReport {
                    name: name.clone(),
                    index,
                })
                .collect(),
            keys: encoder.to_keys(),
        }
    }
}

fn print_decode_table(writer: &mut dyn Write, report: &DecodeReport) -> io::Result<()> {
    writeln!(writer, "path:   {}", report.path)?;
    writeln!(writer, "prefix: {}", report.prefix.join(" / "))?;
    writeln!(writer, "depth:  {}", report.depth)?;
    writeln!(writer, "state:  {:#x}", report.state)?;
    if report.levels.is_empty() {
        return Ok(());
    }

    let width = report
        .levels
        .iter()
        .map(|level| level.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());
    writeln!(writer)?;
    writeln!(writer, "{:<5}  {:<width$}  INDEX", "LEVEL", "NAME", width = width)?;
    for (position, level) in report.levels.iter().enumerate() {
        writeln!(
            writer,
            "{:<5}  {:<width$}  {}",
            position + 1,
            level.name,
            level.index,
            width = width
        )?;
    }
    Ok(())
}

fn write_fields(
    writer: &mut dyn Write,
    fields: &[GeneratedField],
    format: FieldsFormat,
) -> Result<(), Box<dyn Error>> {
    match format {
        FieldsFormat::Names => {
            for field in fields {
                writeln!(writer, "{}", field.name)?;
            }
        }
        FieldsFormat::Ndjson => {
            for field in fields {
                serde_json::to_writer(&mut *writer, field)?;
                writer.write_all(b"\n")?;
            }
        }
        FieldsFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, fields)?;
            writer.write_all(b"\n")?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn read_text(path: &Path) -> Result<String, Box<dyn Error>> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    fs::read_to_string(path).map_err(|err| format!("Failed to read {}: {}", path.display(), err).into())
}

fn read_store(path: Option<&Path>) -> Result<Value, Box<dyn Error>> {
    match path {
        Some(path) => Ok(serde_json::from_str(&read_text(path)?)?),
        None => Ok(Value::Object(Default::default())),
    }
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>, Box<dyn Error>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}
