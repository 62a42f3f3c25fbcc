use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use clap::{Args, Command, FromArgMatches as _};

use crate::config::{ContextConfigExt, PointWeights};
use crate::context::Context;
use crate::error::ZssnError;
use crate::incidence::ContextIncidenceExt;
use crate::log::{set_log_level, LevelFilter};
use crate::web_api::ContextWebApiExt;
use crate::info;

/// File name of the incidence output inside `--output-dir`.
pub const INCIDENCE_FILE_NAME: &str = "incidence.csv";

/// Default cli arguments for the ledger server
#[derive(Args, Debug)]
pub struct BaseArgs {
    /// Optional path to a JSON config file holding the point weights. Without it the weights
    /// are read from PTS_WATER, PTS_FOOD, PTS_MEDS and PTS_AMMO
    #[arg(short, long, default_value = "")]
    pub config: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8000)]
    pub port: u16,

    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1")]
    pub bind: IpAddr,

    /// Optional directory for the incidence output
    #[arg(short, long, default_value = "")]
    pub output_dir: String,

    /// Enable logging at the given level (off, error, warn, info, debug, trace)
    #[arg(short, long, value_parser = parse_level_filter)]
    pub log_level: Option<LevelFilter>,
}

fn parse_level_filter(raw: &str) -> Result<LevelFilter, String> {
    raw.parse()
        .map_err(|_| format!("expected one of off, error, warn, info, debug, trace; got {raw:?}"))
}

fn create_zssn_cli() -> Command {
    let cli = Command::new("zssn").about("Survivor ledger server");
    BaseArgs::augment_args(cli)
}

/// Builds a `Context` from parsed arguments: logging, point weights and incidence output.
///
/// # Errors
/// Returns a `ZssnError` if the configuration cannot be loaded or the output cannot be created.
pub fn prepare_context(args: &BaseArgs) -> Result<Context, ZssnError> {
    if let Some(level) = args.log_level {
        set_log_level(level);
    }

    let mut context = Context::new();

    if args.config.is_empty() {
        context.set_point_weights(PointWeights::from_env()?)?;
    } else {
        info!("Loading configuration from: {}", args.config);
        context.load_config(Path::new(&args.config))?;
    }

    // Optionally record infections
    if !args.output_dir.is_empty() {
        let path = PathBuf::from(&args.output_dir).join(INCIDENCE_FILE_NAME);
        context.add_incidence_output(&path)?;
        info!("Recording infections to {}", path.display());
    }

    Ok(context)
}

/// Parses the command line, starts the web API and serves requests until the server stops.
///
/// # Errors
/// Returns an error if argument parsing, configuration or the web API fails
pub fn run_with_args() -> Result<(), Box<dyn std::error::Error>> {
    let matches = create_zssn_cli().get_matches();
    let args = BaseArgs::from_arg_matches(&matches)?;

    let mut context = prepare_context(&args)?;
    let addr = context.setup_web_api(SocketAddr::new(args.bind, args.port))?;
    println!("Serving the survivor ledger on http://{addr}");
    context.run_web_api()?;
    Ok(())
}
