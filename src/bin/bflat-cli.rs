//! CLI для сообщений BFlat
//!
//! Печатает содержимое сообщения, проверяет его целостность и собирает новые
//! сообщения из описаний полей в командной строке.

use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{anyhow, bail, Context, Result};
use bflat::{
    init_logging, BflatResult, DecodeError, Deserializer, HeapBuffer, Record, Scalar,
    Serializer, Settings, StackError, StatusCode, Value, ValueType,
};
use bflat_error::ensure;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info, warn};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT"),
    ", built ",
    env!("BUILD_TIME"),
    ")"
);

#[derive(Parser)]
#[command(name = "bflat-cli")]
#[command(version = VERSION)]
#[command(about = "Inspect, validate and build BFlat messages", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Путь к файлу настроек (по умолчанию `bflat.toml`, если он есть)
    #[arg(long, global = true, env = "BFLAT_CONFIG")]
    config: Option<PathBuf>,
    /// Подробный вывод (debug)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Только предупреждения и ошибки
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Напечатать все записи сообщения
    Dump {
        file: PathBuf,
        #[arg(long, value_enum, default_value = "pretty")]
        output: OutputFormat,
    },
    /// Проверить сообщение до конца
    Validate { file: PathBuf },
    /// Собрать сообщение из описаний полей `tag:type=value` или
    /// `tag:type[]=v1,v2`
    Encode {
        out: PathBuf,
        #[arg(required = true)]
        fields: Vec<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// Смещение, тег, тип и значение на строку
    Pretty,
    /// Один JSON-объект на запись
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            match e.downcast_ref::<StackError>() {
                Some(stack) => {
                    debug!(tags = ?stack.root().metrics_tags(), "Command failed");
                    ExitCode::from(stack.exit_code())
                }
                None => ExitCode::FAILURE,
            }
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let mut settings = Settings::load(cli.config.as_deref()).context("Loading settings")?;
    if cli.verbose {
        settings.logging.level = "debug".to_string();
    } else if cli.quiet {
        settings.logging.level = "warn".to_string();
    }
    init_logging(&settings.logging).context("Initializing logging")?;
    debug!(?settings, "Settings loaded");

    match &cli.command {
        Commands::Dump { file, output } => {
            let data = read_input(file, settings.max_input_bytes)?;
            dump(&data, *output, settings.preview_bytes)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate { file } => {
            let data = read_input(file, settings.max_input_bytes)?;
            match validate(&data) {
                Ok(count) => {
                    println!("ok: {count} records, {} bytes", data.len());
                    Ok(ExitCode::SUCCESS)
                }
                Err((count, e)) => {
                    warn!(offset = e.offset(), records = count, "Message is corrupt");
                    println!("invalid: {e} (after {count} records)");
                    Ok(ExitCode::from(StackError::from(e).exit_code()))
                }
            }
        }
        Commands::Encode { out, fields } => {
            let message = encode(fields)?;
            fs::write(out, &message).with_context(|| format!("Writing {}", out.display()))?;
            info!(bytes = message.len(), path = %out.display(), "Message written");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn read_input(
    path: &Path,
    limit: u64,
) -> BflatResult<Vec<u8>> {
    let size = fs::metadata(path)
        .map_err(|e| StackError::from(e).context(format!("reading {}", path.display())))?
        .len();
    ensure!(
        size <= limit,
        StatusCode::SizeLimit,
        "{} is {} bytes, larger than max_input_bytes ({})",
        path.display(),
        size,
        limit
    );
    fs::read(path).map_err(|e| StackError::from(e).context(format!("reading {}", path.display())))
}

////////////////////////////////////////////////////////////////////////////////
// dump / validate
////////////////////////////////////////////////////////////////////////////////

fn dump(
    data: &[u8],
    output: OutputFormat,
    preview_bytes: usize,
) -> Result<()> {
    for (index, record) in Deserializer::new(data).enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                let err = StackError::from(e).context(format!("record {index}"));
                if let OutputFormat::Json = output {
                    println!("{}", serde_json::json!({ "error": err.to_report() }));
                }
                return Err(err.into());
            }
        };
        match output {
            OutputFormat::Pretty => println!("{}", render_record(&record, preview_bytes)),
            OutputFormat::Json => println!("{}", serde_json::to_string(&record)?),
        }
    }
    Ok(())
}

/// Количество записей до чистого конца сообщения.
fn validate(data: &[u8]) -> Result<usize, (usize, DecodeError)> {
    let mut reader = Deserializer::new(data);
    let mut count = 0usize;
    loop {
        match reader.next_record() {
            Ok(Some(_)) => count += 1,
            Ok(None) => return Ok(count),
            Err(e) => return Err((count, e)),
        }
    }
}

fn render_record(
    record: &Record<'_>,
    preview_bytes: usize,
) -> String {
    let value = match record.value() {
        Value::Scalar(scalar) => render_scalar(&scalar, preview_bytes),
        Value::Array(array) if array.element_type() == ValueType::Null => array.to_string(),
        Value::Array(array) => {
            let items: Vec<String> = array
                .elements()
                .map(|e| match e {
                    Ok(scalar) => render_scalar(&scalar, preview_bytes),
                    Err(e) => format!("<{e}>"),
                })
                .collect();
            format!("[{}]", items.join(", "))
        }
    };
    let suffix = if record.is_array() { "[]" } else { "" };
    format!(
        "{:>8}  {}:{}{} = {}",
        record.offset(),
        record.tag(),
        record.value_type(),
        suffix,
        value
    )
}

fn render_scalar(
    scalar: &Scalar<'_>,
    preview_bytes: usize,
) -> String {
    match scalar {
        Scalar::Binary(bytes) => {
            let shown = bytes.len().min(preview_bytes);
            let mut hex = to_hex(&bytes[..shown]);
            if shown < bytes.len() {
                hex.push_str(&format!("... ({} bytes)", bytes.len()));
            }
            format!("0x{hex}")
        }
        other => other.to_string(),
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

////////////////////////////////////////////////////////////////////////////////
// encode
////////////////////////////////////////////////////////////////////////////////

/// Разобранное описание поля.
#[derive(Debug, PartialEq)]
struct FieldSpec<'a> {
    tag: &'a str,
    value_type: ValueType,
    is_array: bool,
    value: Option<&'a str>,
}

fn parse_field(spec: &str) -> Result<FieldSpec<'_>> {
    let (head, value) = match spec.split_once('=') {
        Some((head, value)) => (head, Some(value)),
        None => (spec, None),
    };
    let (tag, type_name) = head
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("field '{spec}' must look like tag:type=value"))?;
    let (type_name, is_array) = match type_name.strip_suffix("[]") {
        Some(name) => (name, true),
        None => (type_name, false),
    };
    let value_type = ValueType::from_name(type_name)
        .ok_or_else(|| anyhow!("unknown type '{type_name}' in field '{spec}'"))?;
    if value.is_none() && !(value_type == ValueType::Null && !is_array) {
        bail!("field '{spec}' has no value");
    }
    Ok(FieldSpec {
        tag,
        value_type,
        is_array,
        value,
    })
}

fn encode(fields: &[String]) -> Result<Vec<u8>> {
    let mut s: Serializer<HeapBuffer> = Serializer::new();
    for field in fields {
        let spec = parse_field(field)?;
        append_field(&mut s, &spec).with_context(|| format!("Encoding field '{field}'"))?;
    }
    let (buffer, length) = s.into_parts();
    let mut bytes = buffer.into_vec();
    bytes.truncate(length);
    Ok(bytes)
}

fn append_field(
    s: &mut Serializer<HeapBuffer>,
    spec: &FieldSpec<'_>,
) -> Result<()> {
    let raw = spec.value.unwrap_or_default();
    if !spec.is_array {
        let value = OwnedScalar::parse(spec.value_type, raw)?;
        s.append_scalar(spec.tag, &value.as_scalar())?;
        return Ok(());
    }

    // null[]=N задаёт только количество
    if spec.value_type == ValueType::Null {
        let count: usize = raw
            .trim()
            .parse()
            .with_context(|| format!("null array count '{raw}'"))?;
        s.append_null_array(spec.tag, count)?;
        return Ok(());
    }

    let items: Vec<&str> = if raw.is_empty() {
        Vec::new()
    } else {
        raw.split(',').collect()
    };
    s.append_array_tag(spec.tag, spec.value_type, items.len())?;
    for item in items {
        let value = OwnedScalar::parse(spec.value_type, item)?;
        s.push_scalar(&value.as_scalar())?;
    }
    Ok(())
}

/// Значение из командной строки; строки и бинарные данные владеют байтами.
enum OwnedScalar {
    Bytes(ValueType, Vec<u8>),
    Int(ValueType, i64),
    Double(f64),
    Null,
}

impl OwnedScalar {
    fn parse(
        value_type: ValueType,
        raw: &str,
    ) -> Result<Self> {
        let value = match value_type {
            ValueType::Null => Self::Null,
            ValueType::String => Self::Bytes(value_type, raw.as_bytes().to_vec()),
            ValueType::Binary => Self::Bytes(value_type, parse_hex(raw)?),
            ValueType::Double => Self::Double(
                raw.trim()
                    .parse()
                    .with_context(|| format!("invalid double '{raw}'"))?,
            ),
            ValueType::Int8 => Self::Int(value_type, parse_int::<i8>(raw)?.into()),
            ValueType::Int16 => Self::Int(value_type, parse_int::<i16>(raw)?.into()),
            ValueType::Int32 => Self::Int(value_type, parse_int::<i32>(raw)?.into()),
            ValueType::Int64 | ValueType::DateTime | ValueType::LebInt => {
                Self::Int(value_type, parse_int::<i64>(raw)?)
            }
        };
        Ok(value)
    }

    fn as_scalar(&self) -> Scalar<'_> {
        match *self {
            Self::Null => Scalar::Null,
            Self::Double(v) => Scalar::Double(v),
            Self::Bytes(ValueType::Binary, ref b) => Scalar::Binary(b),
            Self::Bytes(_, ref b) => Scalar::String(b),
            // Значения уже проверены на диапазон в `parse`
            Self::Int(ValueType::Int8, v) => Scalar::Int8(v as i8),
            Self::Int(ValueType::Int16, v) => Scalar::Int16(v as i16),
            Self::Int(ValueType::Int32, v) => Scalar::Int32(v as i32),
            Self::Int(ValueType::DateTime, v) => Scalar::DateTime(v),
            Self::Int(ValueType::LebInt, v) => Scalar::LebInt(v),
            Self::Int(_, v) => Scalar::Int64(v),
        }
    }
}

fn parse_int<T: std::str::FromStr>(raw: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("invalid integer '{raw}'"))
}

fn parse_hex(raw: &str) -> Result<Vec<u8>> {
    let digits = raw.trim();
    let digits = digits.strip_prefix("0x").unwrap_or(digits);
    if digits.len() % 2 != 0 {
        bail!("hex value '{raw}' has an odd number of digits");
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| anyhow!("invalid hex value '{raw}'"))
        })
        .collect()
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
