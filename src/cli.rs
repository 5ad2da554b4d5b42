//! Command-line interface for reinet.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::net::IpAddr;
use std::path::PathBuf;

/// Command-line arguments.
///
/// Unset options leave the environment and config file values in place.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Host address to bind to.
    pub host: Option<IpAddr>,
    /// Port to listen on.
    pub port: Option<u16>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Session cookie name.
    pub cookie_name: Option<String>,
    /// Session lifetime in seconds.
    pub session_lifetime: Option<u64>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('H') | Long("host") => {
                let value: String = parser.value()?.parse()?;
                result.host = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("host", value))?,
                );
            }
            Short('p') | Long("port") => {
                let value: String = parser.value()?.parse()?;
                result.port = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("port", value))?,
                );
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Long("cookie-name") => {
                let value: String = parser.value()?.parse()?;
                if value.is_empty() {
                    return Err(ArgsError::InvalidValue("cookie-name", value));
                }
                result.cookie_name = Some(value);
            }
            Long("session-lifetime") => {
                let value: String = parser.value()?.parse()?;
                result.session_lifetime = match value.parse() {
                    Ok(secs) if secs > 0 => Some(secs),
                    _ => return Err(ArgsError::InvalidValue("session-lifetime", value)),
                };
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"reinet {version}
Minimal HTTP dispatcher with cookie sessions

USAGE:
    reinet [OPTIONS]

OPTIONS:
    -H, --host <ADDR>              Host address to bind [default: 127.0.0.1]
    -p, --port <PORT>              Port to listen on [default: 3000]
    -c, --config <FILE>            Path to configuration file (JSON)
    -l, --log-level <LVL>          Log level (error, warn, info, debug, trace)
        --cookie-name <NAME>       Session cookie name [default: reinetSessionID]
        --session-lifetime <SECS>  Idle seconds before a session expires [default: 3600]
    -h, --help                     Print help
    -V, --version                  Print version

ENVIRONMENT VARIABLES:
    REINET_HOST                Host address (overrides config)
    REINET_PORT                Port number (overrides config)
    REINET_COOKIE_NAME         Session cookie name (overrides config)
    REINET_SESSION_LIFETIME    Session lifetime in seconds (overrides config)
    REINET_LOG_LEVEL           Log level (overrides config)
    RUST_LOG                   Alternative log level setting

EXAMPLES:
    # Start with defaults (localhost:3000)
    reinet

    # Start on all interfaces with short-lived sessions
    reinet -H 0.0.0.0 -p 8080 --session-lifetime 300

    # Start with config file
    reinet -c /etc/reinet/config.json
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("reinet {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
