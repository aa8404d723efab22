//! Gauge unit server
//!
//! One JSON request per line on stdin, one response per line on stdout:
//!
//! ```text
//! {"id": 1, "method": "convert", "params": {"value": 1.5, "from": "km", "to": "m"}}
//! {"id":1,"result":{"value":1500.0}}
//! ```
//!
//! Methods:
//! - convert: Convert a value (or a list of values) between two unit expressions
//! - parse: Parse a unit expression and print it back
//! - compatible: Whether two unit expressions are convertible
//! - lookup: Find a unit by exact name or symbol
//! - list: Registered names and symbols
//! - info: Server version and unit database source
//!
//! The unit database is taken from `--units <path>`, then `GAUGE_UNITS_PATH`,
//! then the built-in SI table.

use gauge_core::Diagnostic;
use gauge_units::{Converter, FormatOptions, Unit, UnitSystem, UnitType};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const SERVER_NAME: &str = "gauge";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Option<JsonValue>,
    method: String,
    #[serde(default)]
    params: Option<JsonValue>,
}

#[derive(Debug, Serialize)]
struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Diagnostic>,
}

impl Response {
    fn reply(id: Option<JsonValue>, outcome: Result<JsonValue, Diagnostic>) -> Self {
        match outcome {
            Ok(result) => Response {
                id,
                result: Some(result),
                error: None,
            },
            Err(error) => Response {
                id,
                result: None,
                error: Some(error),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConvertParams {
    from: String,
    to: String,
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    values: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct ParseParams {
    expr: String,
    #[serde(flatten)]
    options: FormatOptions,
}

#[derive(Debug, Deserialize)]
struct PairParams {
    from: String,
    to: String,
}

#[derive(Debug, Deserialize)]
struct LookupParams {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Value of `--units <path>`, if given
fn database_argument(args: impl IntoIterator<Item = String>) -> Option<PathBuf> {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--units" {
            return args.next().map(PathBuf::from);
        }
        if let Some(path) = arg.strip_prefix("--units=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}

fn main() {
    init_logging();

    let path = database_argument(env::args().skip(1));
    let system = UnitSystem::load_database(path.as_deref());
    if !system.is_valid() {
        let diagnostic =
            Diagnostic::from_status(system.status(), system.error_message().unwrap_or_default());
        error!(%diagnostic, "unit database unavailable");
        std::process::exit(1);
    }

    info!(
        version = SERVER_VERSION,
        origin = ?system.database_origin(),
        path = ?system.database_path(),
        units = system.names().len(),
        "{} server started",
        SERVER_NAME
    );

    let stdin = io::stdin();
    let mut reader = io::BufReader::new(stdin.lock());

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => {
                info!("client disconnected (EOF)");
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let response = match serde_json::from_str::<Request>(line) {
                    Ok(request) => {
                        debug!(method = %request.method, "processing request");
                        let response = handle_request(&system, &request);
                        // Notifications get no reply
                        if request.id.is_none() {
                            continue;
                        }
                        response
                    }
                    Err(e) => {
                        warn!(error = %e, "malformed request");
                        Response::reply(None, Err(Diagnostic::bad_request(e.to_string())))
                    }
                };
                if let Err(e) = write_response(&mut io::stdout().lock(), &response) {
                    error!(error = %e, "can't write response");
                    break;
                }
            }
            Err(e) => {
                error!(error = %e, "can't read input");
                break;
            }
        }
    }

    info!("server shutting down");
}

fn write_response(out: &mut impl Write, response: &Response) -> io::Result<()> {
    serde_json::to_writer(&mut *out, response)?;
    writeln!(out)?;
    out.flush()
}

fn handle_request(system: &UnitSystem, request: &Request) -> Response {
    let outcome = match request.method.as_str() {
        "convert" => handle_convert(system, &request.params),
        "parse" => handle_parse(system, &request.params),
        "compatible" => handle_compatible(system, &request.params),
        "lookup" => handle_lookup(system, &request.params),
        "list" => Ok(json!({
            "names": system.names(),
            "symbols": system.symbols(),
        })),
        "info" => Ok(json!({
            "name": SERVER_NAME,
            "version": SERVER_VERSION,
            "origin": system.database_origin(),
            "path": system.database_path().map(|p| p.display().to_string()),
        })),
        _ => Err(Diagnostic::bad_request(format!("unknown method '{}'", request.method))
            .with_suggestion("Use one of: convert, parse, compatible, lookup, list, info")),
    };
    if let Err(ref diagnostic) = outcome {
        debug!(method = %request.method, %diagnostic, "request failed");
    }
    Response::reply(request.id.clone(), outcome)
}

fn parse_params<T: DeserializeOwned>(params: &Option<JsonValue>) -> Result<T, Diagnostic> {
    let value = params.clone().unwrap_or_else(|| json!({}));
    serde_json::from_value(value).map_err(|e| Diagnostic::bad_request(e.to_string()))
}

fn parse_unit(system: &UnitSystem, text: &str) -> Result<Unit, Diagnostic> {
    let unit = system.unit_from_string(text);
    if unit.is_valid() {
        Ok(unit)
    } else {
        Err(Diagnostic::from_status(unit.status(), text))
    }
}

fn type_name(unit_type: UnitType) -> &'static str {
    match unit_type {
        UnitType::Invalid => "invalid",
        UnitType::Basic => "basic",
        UnitType::Product => "product",
        UnitType::Galilean => "galilean",
        UnitType::Timestamp => "timestamp",
        UnitType::Logarithmic => "logarithmic",
    }
}

fn describe(unit: &Unit) -> JsonValue {
    let dimension = unit.dimension();
    json!({
        "name": unit.to_string(),
        "symbol": unit.format(FormatOptions::default()),
        "definition": unit.format(FormatOptions::default().definition()),
        "type": type_name(unit.unit_type()),
        "dimension": dimension.as_ref().map(|d| d.exponents().to_vec()),
        "quantity": dimension.as_ref().and_then(|d| d.name()),
    })
}

fn handle_convert(system: &UnitSystem, params: &Option<JsonValue>) -> Result<JsonValue, Diagnostic> {
    let params: ConvertParams = parse_params(params)?;
    let from = parse_unit(system, &params.from)?;
    let to = parse_unit(system, &params.to)?;
    let converter = Converter::new(&from, &to);
    if !converter.is_valid() {
        return Err(Diagnostic::not_convertible(&params.from, &params.to));
    }
    match (params.value, params.values) {
        (Some(value), None) => Ok(json!({ "value": converter.convert(value) })),
        (None, Some(values)) => Ok(json!({ "values": converter.convert_slice(&values) })),
        _ => Err(Diagnostic::bad_request("expected exactly one of 'value' or 'values'")),
    }
}

fn handle_parse(system: &UnitSystem, params: &Option<JsonValue>) -> Result<JsonValue, Diagnostic> {
    let params: ParseParams = parse_params(params)?;
    let unit = parse_unit(system, &params.expr)?;
    let text = unit
        .try_format(params.options)
        .map_err(|status| Diagnostic::from_status(status, &params.expr))?;
    let mut result = describe(&unit);
    result["text"] = json!(text);
    Ok(result)
}

fn handle_compatible(system: &UnitSystem, params: &Option<JsonValue>) -> Result<JsonValue, Diagnostic> {
    let params: PairParams = parse_params(params)?;
    let from = parse_unit(system, &params.from)?;
    let to = parse_unit(system, &params.to)?;
    let converter = Converter::new(&from, &to);
    Ok(json!({
        "compatible": converter.is_valid(),
        "affine": converter.affine().map(|(multiplier, offset)| json!({
            "multiplier": multiplier,
            "offset": offset,
        })),
    }))
}

fn handle_lookup(system: &UnitSystem, params: &Option<JsonValue>) -> Result<JsonValue, Diagnostic> {
    let params: LookupParams = parse_params(params)?;
    let (unit, key) = match (&params.name, &params.symbol) {
        (Some(name), None) => (system.unit_by_name(name), name),
        (None, Some(symbol)) => (system.unit_by_symbol(symbol), symbol),
        _ => return Err(Diagnostic::bad_request("expected exactly one of 'name' or 'symbol'")),
    };
    if !unit.is_valid() {
        return Err(Diagnostic::from_status(unit.status(), key));
    }
    Ok(describe(&unit))
}
