//! # vfd CLI - Customer Display Control
//!
//! Command-line interface for inspecting code page selection and driving
//! serial VFD customer displays.

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::io::{self, BufRead, Write};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use anyhow::{Context, Result};
#[cfg(feature = "cli")]
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
#[cfg(feature = "cli")]
use serde::Serialize;

#[cfg(feature = "cli")]
use vfd_display::detection;
#[cfg(feature = "cli")]
use vfd_display::encoder::{AdaptiveEncoder, EncodeOutcome, EncodeStrategy};
#[cfg(feature = "cli")]
use vfd_display::model::{self, SerialOverrides};
#[cfg(feature = "cli")]
use vfd_display::{CodePage, Display, display, protocol};

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI features disabled. Enable with --features cli");
    std::process::exit(1);
}

/// vfd: drive serial VFD customer displays
#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "vfd")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output format (text, json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Show which code page a text needs
    Classify(ClassifyArgs),

    /// Encode text the way the display driver would
    Encode(EncodeArgs),

    /// Decode code page bytes back to text
    Decode(DecodeArgs),

    /// List supported code pages
    List,

    /// Display detailed information about a code page
    Info(InfoArgs),

    /// List supported display models
    Models,

    /// List supported command protocols
    Protocols,

    /// Write text to a display and exit
    Write(WriteArgs),

    /// Interactive session with a display
    Shell(ShellArgs),
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct ClassifyArgs {
    /// Text to classify
    text: String,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct EncodeArgs {
    /// Text to encode
    text: String,

    /// Code page active before encoding
    #[arg(short, long, default_value = "CP437")]
    page: CodePageArg,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct DecodeArgs {
    /// Hex bytes, e.g. "D5 31 39" or "d53139"
    hex: String,

    /// Code page of the bytes
    #[arg(short, long, default_value = "CP437")]
    page: CodePageArg,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct InfoArgs {
    /// Code page to describe
    page: CodePageArg,

    /// Show the characters of the upper half
    #[arg(long)]
    samples: bool,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct ConnectionArgs {
    /// Serial port, e.g. /dev/ttyUSB0 or COM3
    #[arg(short, long)]
    port: String,

    /// Display model
    #[arg(short, long, default_value = "EPSON_DM_D110")]
    model: String,

    /// JSON file with serial option overrides
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override baud rate
    #[arg(long)]
    baud: Option<u32>,

    /// Override number of columns
    #[arg(long)]
    columns: Option<u16>,

    /// Override number of rows
    #[arg(long)]
    rows: Option<u16>,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct WriteArgs {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Initialize the display before writing
    #[arg(long)]
    clear: bool,

    /// Text to write
    text: String,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct ShellArgs {
    #[command(flatten)]
    connection: ConnectionArgs,
}

#[cfg(feature = "cli")]
#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[cfg(feature = "cli")]
#[derive(Clone, Copy, Debug)]
struct CodePageArg(CodePage);

#[cfg(feature = "cli")]
impl std::str::FromStr for CodePageArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let page = match s.to_uppercase().as_str() {
            "CP437" | "PC437" | "DOS437" | "437" => CodePage::CP_437,
            "CP850" | "PC850" | "DOS850" | "850" => CodePage::CP_850,
            "CP860" | "PC860" | "DOS860" | "860" => CodePage::CP_860,
            "CP858" | "PC858" | "DOS858" | "858" => CodePage::CP_858,
            _ => anyhow::bail!("Unknown code page: {}", s),
        };

        Ok(CodePageArg(page))
    }
}

#[cfg(feature = "cli")]
#[derive(Serialize)]
struct EncodeReport {
    input: String,
    start_page: CodePage,
    final_page: CodePage,
    strategy: String,
    bytes: String,
    length: usize,
}

#[cfg(feature = "cli")]
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Classify(ref args) => classify_command(args, &cli)?,
        Commands::Encode(ref args) => encode_command(args, &cli)?,
        Commands::Decode(ref args) => decode_command(args, &cli)?,
        Commands::List => list_command(&cli)?,
        Commands::Info(ref args) => info_command(args, &cli)?,
        Commands::Models => models_command(&cli)?,
        Commands::Protocols => protocols_command(&cli)?,
        Commands::Write(ref args) => write_command(args, &cli)?,
        Commands::Shell(ref args) => shell_command(args)?,
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn classify_command(args: &ClassifyArgs, cli: &Cli) -> Result<()> {
    let result = detection::detect(&args.text);

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => {
            println!(
                "Best code page: {} ({})",
                result.page,
                result.page.description()
            );
            println!("Portuguese markers: {}", yes_no(result.has_portuguese));
            println!("Euro sign: {}", yes_no(result.has_euro));
            println!("Latin-1 accented letters: {}", yes_no(result.has_latin_extended));
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn encode_command(args: &EncodeArgs, cli: &Cli) -> Result<()> {
    let CodePageArg(start_page) = args.page;
    let mut encoder = AdaptiveEncoder::with_page(start_page);
    let outcome = encoder.encode_text(&args.text);

    match cli.format {
        OutputFormat::Json => {
            let report = EncodeReport {
                input: args.text.clone(),
                start_page,
                final_page: outcome.page,
                strategy: strategy_name(outcome.strategy).to_string(),
                bytes: hex_string(&outcome.bytes),
                length: outcome.bytes.len(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("Bytes: {}", hex_string(&outcome.bytes));
            println!("Code page: {} -> {}", start_page, outcome.page);
            println!("Strategy: {}", strategy_name(outcome.strategy));
            if !outcome.is_exact() {
                eprintln!("warning: no supported code page can show this text exactly");
            }
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn decode_command(args: &DecodeArgs, cli: &Cli) -> Result<()> {
    let CodePageArg(page) = args.page;
    let bytes = parse_hex(&args.hex)?;
    let text = page.table().decode(&bytes);

    match cli.format {
        OutputFormat::Json => {
            let result = serde_json::json!({
                "page": page,
                "bytes": hex_string(&bytes),
                "text": text,
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => println!("{}", text),
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn list_command(cli: &Cli) -> Result<()> {
    match cli.format {
        OutputFormat::Json => {
            let pages: Vec<_> = CodePage::ALL
                .iter()
                .map(|page| {
                    serde_json::json!({
                        "name": page.name(),
                        "description": page.description(),
                        "device_table": page.device_table(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&pages)?);
        }
        OutputFormat::Text => {
            println!("Supported Code Pages ({} total):", CodePage::ALL.len());
            println!();
            for page in CodePage::ALL {
                println!(
                    "{:8} {:10} {}",
                    page.name(),
                    format!("[ESC t {}]", page.device_table()),
                    page.description()
                );
            }
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn info_command(args: &InfoArgs, cli: &Cli) -> Result<()> {
    let CodePageArg(page) = args.page;
    let table = page.table();
    let upper_half: String = (0x80..=0xFFu8).map(|byte| table.decode_byte(byte)).collect();

    match cli.format {
        OutputFormat::Json => {
            let info = serde_json::json!({
                "name": page.name(),
                "description": page.description(),
                "device_table": page.device_table(),
                "euro": table.can_encode("€"),
                "upper_half": upper_half,
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        OutputFormat::Text => {
            println!("Code Page Information: {}", page.name());
            println!("Description: {}", page.description());
            println!("Device table: ESC t {}", page.device_table());
            println!("Euro sign: {}", yes_no(table.can_encode("€")));

            if args.samples {
                println!("\nUpper half:");
                for row in (0x80..=0xFFu8).step_by(16) {
                    let chars: String = (row..=row + 15)
                        .map(|byte| table.decode_byte(byte))
                        .map(|ch| if ch.is_whitespace() || ch.is_control() { '.' } else { ch })
                        .collect();
                    println!("  0x{:02X}  {}", row, chars);
                }
            }
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn models_command(cli: &Cli) -> Result<()> {
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(model::models())?),
        OutputFormat::Text => {
            println!("Supported VFD models:");
            for profile in model::models() {
                println!(
                    "  {} - {} ({}x{}, {} baud, {})",
                    profile.id,
                    profile.name,
                    profile.columns,
                    profile.rows,
                    profile.baud_rate,
                    profile.protocol
                );
            }
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn protocols_command(cli: &Cli) -> Result<()> {
    match cli.format {
        OutputFormat::Json => {
            let protocols: Vec<_> = protocol::protocols()
                .iter()
                .map(|p| serde_json::json!({ "name": p.name(), "description": p.description() }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&protocols)?);
        }
        OutputFormat::Text => {
            println!("Supported command protocols:");
            for p in protocol::protocols() {
                println!("  {} - {}", p.name(), p.description());
            }
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn write_command(args: &WriteArgs, cli: &Cli) -> Result<()> {
    let mut display = open_display(&args.connection)?;

    if args.clear {
        display.clear().context("Failed to initialize display")?;
    }
    let outcome = display
        .write_text(&args.text)
        .context("Failed to write text")?;

    match cli.format {
        OutputFormat::Json => {
            let result = serde_json::json!({
                "page": outcome.page,
                "strategy": strategy_name(outcome.strategy),
                "bytes_written": outcome.bytes.len(),
                "switch_error": outcome.switch_error.as_ref().map(ToString::to_string),
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => report_outcome(&outcome),
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn open_display(args: &ConnectionArgs) -> Result<Display<Box<dyn serialport::SerialPort>>> {
    let overrides = load_overrides(args)?;
    display::open_model(&args.port, &args.model, Some(&overrides))
        .with_context(|| format!("Failed to open {} on {}", args.model, args.port))
}

/// Config file values first, then command line flags on top
#[cfg(feature = "cli")]
fn load_overrides(args: &ConnectionArgs) -> Result<SerialOverrides> {
    let from_file = match args.config {
        Some(ref path) => {
            let data = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&data)
                .with_context(|| format!("Invalid config file: {}", path.display()))?
        }
        None => SerialOverrides::default(),
    };

    let from_flags = SerialOverrides {
        baud_rate: args.baud,
        columns: args.columns,
        rows: args.rows,
        ..Default::default()
    };

    Ok(from_file.merge(&from_flags))
}

#[cfg(feature = "cli")]
fn shell_command(args: &ShellArgs) -> Result<()> {
    let mut display = open_display(&args.connection)?;
    println!("{}", session_banner(&args.connection.port, &display));
    println!("Type 'help' for commands.");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read from stdin")?;

        let command = match ShellCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(usage) => {
                println!("{}", usage);
                continue;
            }
        };
        if command == ShellCommand::Quit {
            println!("Bye.");
            break;
        }
        if let Err(e) = run_shell_command(&mut display, &command) {
            println!("Error: {}", e);
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn session_banner<W: Write>(port: &str, display: &Display<W>) -> String {
    match display.profile() {
        Some(profile) => format!("Connected to {} using {} profile", port, profile.name),
        None => format!("Connected to {} using {}", port, display.protocol().name()),
    }
}

/// One line of shell input
#[cfg(feature = "cli")]
#[derive(Debug, Clone, PartialEq, Eq)]
enum ShellCommand {
    Quit,
    Help,
    Clear,
    FormFeed,
    Position { column: u16, row: u16 },
    Cursor,
    Text(String),
    Brightness(u8),
    GetBrightness,
    Dimensions,
    Blink(u32),
    Charset(u8),
    Page,
    SelfTest,
    Models,
    Protocols,
    Info,
}

#[cfg(feature = "cli")]
impl ShellCommand {
    /// `Ok(None)` for blank lines, `Err` holds a usage message
    fn parse(line: &str) -> std::result::Result<Option<Self>, String> {
        let line = line.trim();
        let mut parts = line.split_whitespace();
        let Some(cmd) = parts.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = parts.collect();

        let command = match cmd.to_lowercase().as_str() {
            "quit" | "exit" => ShellCommand::Quit,
            "help" => ShellCommand::Help,
            "clear" => ShellCommand::Clear,
            "clr" => ShellCommand::FormFeed,
            "pos" => match args.as_slice() {
                [column, row] => match (column.parse(), row.parse()) {
                    (Ok(column), Ok(row)) => ShellCommand::Position { column, row },
                    _ => return Err("Usage: pos <col> <row>".to_string()),
                },
                _ => return Err("Usage: pos <col> <row>".to_string()),
            },
            "cur" => ShellCommand::Cursor,
            "text" => {
                // Keep the spacing of the message as typed
                let message = line[cmd.len()..].trim_start();
                if message.is_empty() {
                    return Err("Usage: text <message>".to_string());
                }
                ShellCommand::Text(message.to_string())
            }
            "bright" => match args.as_slice() {
                [level] => ShellCommand::Brightness(
                    level.parse().map_err(|_| "Usage: bright <1-4>".to_string())?,
                ),
                _ => return Err("Usage: bright <1-4>".to_string()),
            },
            "getbright" => ShellCommand::GetBrightness,
            "getdims" => ShellCommand::Dimensions,
            "blink" => match args.as_slice() {
                [ms] => ShellCommand::Blink(
                    ms.parse().map_err(|_| "Usage: blink <ms> (0=off)".to_string())?,
                ),
                _ => return Err("Usage: blink <ms> (0=off)".to_string()),
            },
            "charset" => match args.as_slice() {
                [table] => ShellCommand::Charset(
                    table
                        .parse()
                        .map_err(|_| "Page must be a number between 0-255".to_string())?,
                ),
                _ => {
                    return Err("Usage: charset <page> (0-255)\n\
                         Common pages: 0=PC437, 2=PC850, 3=PC860, 19=PC858"
                        .to_string());
                }
            },
            "page" => ShellCommand::Page,
            "selftest" | "test" => ShellCommand::SelfTest,
            "models" => ShellCommand::Models,
            "protocols" => ShellCommand::Protocols,
            "info" => ShellCommand::Info,
            _ => return Err("Unknown command. Type 'help'.".to_string()),
        };

        Ok(Some(command))
    }
}

#[cfg(feature = "cli")]
fn run_shell_command<W: Write>(display: &mut Display<W>, command: &ShellCommand) -> Result<()> {
    match command {
        ShellCommand::Quit => {}
        ShellCommand::Help => print_shell_help(),
        ShellCommand::Clear => {
            display.clear()?;
            println!("Display cleared.");
        }
        ShellCommand::FormFeed => {
            display.form_feed()?;
            println!("Screen cleared.");
        }
        ShellCommand::Position { column, row } => {
            display.set_cursor(*column, *row)?;
            println!("Moved to col={} row={}", column, row);
        }
        ShellCommand::Cursor => match display.cursor() {
            Some((column, row)) => println!("Cursor at col={} row={}", column, row),
            None => println!("Cursor position unknown."),
        },
        ShellCommand::Text(message) => {
            let outcome = display.write_text(message)?;
            report_outcome(&outcome);
        }
        ShellCommand::Brightness(level) => {
            display.set_brightness(*level)?;
            println!("Brightness set to {}", level);
        }
        ShellCommand::GetBrightness => match display.brightness() {
            Some(level) => println!("Current brightness (last set): {}", level),
            None => println!("Brightness not set in this session."),
        },
        ShellCommand::Dimensions => match display.dimensions() {
            (0, _) | (_, 0) => println!("Dimensions not set."),
            (columns, rows) => println!("Dimensions: {}x{} (cols x rows)", columns, rows),
        },
        ShellCommand::Blink(ms) => {
            display.set_blink(*ms)?;
            let applied = display.blink_ms().unwrap_or_default();
            println!(
                "Blink set to {} ms (steps={})",
                applied,
                applied / protocol::BLINK_STEP_MS
            );
        }
        ShellCommand::Charset(table) => {
            display.set_character_code_table(*table)?;
            println!("Character code table set to page {}", table);
        }
        ShellCommand::Page => println!(
            "Encoder code page: {} (device table: {})",
            display.code_page(),
            display
                .active_table()
                .map_or_else(|| "unknown".to_string(), |t| t.to_string())
        ),
        ShellCommand::SelfTest => {
            display.self_test()?;
            println!("Self-test executed.");
        }
        ShellCommand::Models => {
            println!("Supported VFD models:");
            for profile in model::models() {
                println!(
                    "  {} - {} ({}x{}, {} baud, {})",
                    profile.id,
                    profile.name,
                    profile.columns,
                    profile.rows,
                    profile.baud_rate,
                    profile.protocol
                );
            }
        }
        ShellCommand::Protocols => {
            println!("Supported command protocols:");
            for p in protocol::protocols() {
                println!("  {} - {}", p.name(), p.description());
            }
        }
        ShellCommand::Info => match display.profile() {
            Some(profile) => print_profile(profile),
            None => println!("No model profile for this session."),
        },
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn print_shell_help() {
    println!("Commands:");
    println!("  clear                         - ESC @ (initialize)");
    println!("  clr                           - Form feed (0x0C)");
    println!("  pos <col> <row>               - Move cursor (1-based)");
    println!("  cur                           - Show current cursor (1-based)");
    println!("  text <message>                - Send text to display at current cursor");
    println!("  bright <1-4>                  - Set brightness");
    println!("  getbright                     - Show last set brightness");
    println!("  getdims                       - Show display dimensions");
    println!("  blink <ms>                    - Set cursor blink period in ms (0=off)");
    println!("  charset <page>                - Set character code table page (0-255)");
    println!("  page                          - Show active code page");
    println!("  selftest, test                - Execute display self-test (US @)");
    println!("  models                        - List all supported VFD models");
    println!("  protocols                     - List all supported command protocols");
    println!("  info                          - Show current display model information");
    println!("  exit, quit                    - Exit program");
}

#[cfg(feature = "cli")]
fn print_profile(profile: &model::ModelProfile) {
    println!("Current Display Model: {}", profile.name);
    println!("  Manufacturer: {}", profile.manufacturer);
    println!("  Model: {}", profile.model);
    println!("  Dimensions: {} columns x {} rows", profile.columns, profile.rows);
    println!("  Default Baud Rate: {}", profile.baud_rate);
    println!("  Command Protocol: {}", profile.protocol);
    println!(
        "  Brightness Levels: {} (1-{})",
        profile.brightness_levels, profile.brightness_levels
    );

    let mut features = Vec::new();
    if profile.supports_brightness {
        features.push("Brightness");
    }
    if profile.supports_cursor_blink {
        features.push("Cursor Blink");
    }
    if profile.supports_charset_table {
        features.push("Character Sets");
    }
    if profile.supports_self_test {
        features.push("Self Test");
    }
    println!("  Supports: {}", features.join(", "));
    if !profile.documentation_url.is_empty() {
        println!("  Documentation: {}", profile.documentation_url);
    }
}

#[cfg(feature = "cli")]
fn report_outcome(outcome: &EncodeOutcome) {
    match outcome.strategy {
        EncodeStrategy::RawFallback => {
            println!("Text sent as raw bytes (no code page fits).");
            if let Some(ref err) = outcome.switch_error {
                println!("  Code page switch failed: {}", err);
            }
        }
        _ => println!("Text sent ({} bytes, {}).", outcome.bytes.len(), outcome.page),
    }
}

#[cfg(feature = "cli")]
fn strategy_name(strategy: EncodeStrategy) -> &'static str {
    match strategy {
        EncodeStrategy::PassThrough => "pass-through",
        EncodeStrategy::CurrentPage => "current-page",
        EncodeStrategy::Switched => "switched",
        EncodeStrategy::RawFallback => "raw-fallback",
    }
}

#[cfg(feature = "cli")]
fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

#[cfg(feature = "cli")]
fn hex_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(feature = "cli")]
fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let digits: String = input
        .chars()
        .filter(|ch| !ch.is_whitespace() && *ch != ',')
        .collect();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(&digits);
    if let Some(bad) = digits.chars().find(|ch| !ch.is_ascii_hexdigit()) {
        anyhow::bail!("Invalid hex digit: {}", bad);
    }
    if digits.len() % 2 != 0 {
        anyhow::bail!("Hex input must have an even number of digits");
    }

    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).context("Invalid hex input")?;
            u8::from_str_radix(pair, 16).with_context(|| format!("Invalid hex byte: {}", pair))
        })
        .collect()
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_code_page_arg() {
        let CodePageArg(page) = "pc858".parse().unwrap();
        assert_eq!(page, CodePage::CP_858);
        let CodePageArg(page) = "860".parse().unwrap();
        assert_eq!(page, CodePage::CP_860);
        assert!("CP1252".parse::<CodePageArg>().is_err());
    }

    #[test]
    fn test_parse_shell_commands() {
        assert_eq!(ShellCommand::parse("   ").unwrap(), None);
        assert_eq!(
            ShellCommand::parse("pos 3 2").unwrap(),
            Some(ShellCommand::Position { column: 3, row: 2 })
        );
        assert_eq!(
            ShellCommand::parse("text  Olá  mundo").unwrap(),
            Some(ShellCommand::Text("Olá  mundo".to_string()))
        );
        assert_eq!(
            ShellCommand::parse("EXIT").unwrap(),
            Some(ShellCommand::Quit)
        );
        assert!(ShellCommand::parse("pos 3").is_err());
        assert!(ShellCommand::parse("charset 300").is_err());
        assert!(ShellCommand::parse("bogus").is_err());
    }

    #[test]
    fn test_shell_runs_against_any_sink() {
        let mut display = Display::for_model(Vec::new(), &model::EPSON_DM_D110).unwrap();
        run_shell_command(&mut display, &ShellCommand::Text("€1".to_string())).unwrap();
        run_shell_command(&mut display, &ShellCommand::Brightness(2)).unwrap();
        assert!(run_shell_command(&mut display, &ShellCommand::Brightness(9)).is_err());
        assert_eq!(
            display.get_ref(),
            &[0x1B, 0x74, 19, 0xD5, b'1', 0x1F, 0x58, 2]
        );
    }

    #[test]
    fn test_session_banner_uses_opened_profile() {
        let display = Display::for_model(Vec::new(), &model::EPSON_DM_D110).unwrap();
        assert_eq!(
            session_banner("COM3", &display),
            "Connected to COM3 using Epson DM-D110 profile"
        );
        let display = Display::new(Vec::new());
        assert_eq!(session_banner("COM3", &display), "Connected to COM3 using ESC/POS");
    }

    #[test]
    fn test_hex_round_trip() {
        assert_eq!(parse_hex("D5 31 39").unwrap(), vec![0xD5, 0x31, 0x39]);
        assert_eq!(parse_hex("0xd53139").unwrap(), vec![0xD5, 0x31, 0x39]);
        assert!(parse_hex("D5 3").is_err());
        assert!(parse_hex("ZZ").is_err());
        assert_eq!(parse_hex("0XD5").unwrap(), vec![0xD5]);
        // Multi-byte characters are rejected, not sliced
        assert!(parse_hex("aéb").is_err());
        assert!(parse_hex("€€").is_err());
        assert_eq!(hex_string(&[0x1B, 0x74, 0x13]), "1B 74 13");
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = std::env::temp_dir().join("vfd-cli-config-test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("serial.json");
        fs::write(&path, r#"{"baud_rate": 19200, "columns": 40}"#).unwrap();

        let args = ConnectionArgs {
            port: "COM3".to_string(),
            model: "EPSON_DM_D110".to_string(),
            config: Some(path),
            baud: Some(115200),
            columns: None,
            rows: None,
        };
        let overrides = load_overrides(&args).unwrap();
        assert_eq!(overrides.baud_rate, Some(115200));
        assert_eq!(overrides.columns, Some(40));
        assert_eq!(overrides.rows, None);
    }
}
