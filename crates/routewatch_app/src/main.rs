mod config;
mod effects;
mod logging;
mod runner;

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use routewatch_engine::{system_clock, EngineHandle, FileJobStore, JobStore, ReqwestApi};
use routewatch_logging::rw_info;

use crate::config::{AppConfig, DEFAULT_CONFIG_FILE, TOKEN_ENV};
use crate::runner::Runner;

const USAGE: &str = "usage: routewatch [--config <file>] [<csv> | --stop | --fetch <endpoint>]";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Resume the persisted job, or submit the CSV when given.
    Track(Option<PathBuf>),
    Stop,
    Fetch(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Cli {
    config: PathBuf,
    command: Command,
}

impl Cli {
    /// Paths are taken as given by the OS; only flags and the fetch
    /// endpoint must be valid UTF-8.
    fn parse(args: impl IntoIterator<Item = OsString>) -> anyhow::Result<Self> {
        let mut config = PathBuf::from(DEFAULT_CONFIG_FILE);
        let mut command = None;
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let next = match arg.to_str() {
                Some("--config") => match args.next() {
                    Some(path) => {
                        config = PathBuf::from(path);
                        continue;
                    }
                    None => bail!("--config needs a file\n{USAGE}"),
                },
                Some("--stop") => Command::Stop,
                Some("--fetch") => match args.next().map(OsString::into_string) {
                    Some(Ok(endpoint)) => Command::Fetch(endpoint),
                    Some(Err(raw)) => bail!("endpoint {raw:?} is not valid UTF-8\n{USAGE}"),
                    None => bail!("--fetch needs an endpoint\n{USAGE}"),
                },
                Some("-h" | "--help") => bail!("{USAGE}"),
                Some(flag) if flag.starts_with("--") => bail!("unknown option {flag}\n{USAGE}"),
                _ => Command::Track(Some(PathBuf::from(arg))),
            };
            if command.replace(next).is_some() {
                bail!("only one of <csv>, --stop or --fetch may be given\n{USAGE}");
            }
        }
        Ok(Self {
            config,
            command: command.unwrap_or(Command::Track(None)),
        })
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse(std::env::args_os().skip(1))?;
    let config = AppConfig::load(&cli.config)?;
    logging::initialize(config.log_destination, routewatch_logging::default_level());
    let config = config.with_token_override(std::env::var(TOKEN_ENV).ok());
    rw_info!("Using backend {}", config.api.base_url);

    let clock = system_clock();
    let api = ReqwestApi::new(config.api_settings())?;
    let engine = EngineHandle::new(Arc::new(api));
    let store: Arc<dyn JobStore> =
        Arc::new(FileJobStore::new(config.state_dir.clone()).with_clock(clock.clone()));
    let mut app = Runner::new(engine, store, clock);

    match cli.command {
        Command::Track(csv) => {
            let view = app.track(csv.as_deref(), config.options.clone())?;
            app.export_results(&view, &config.export_dir)?;
            runner::outcome(&view)
        }
        Command::Stop => {
            let view = app.stop()?;
            runner::outcome(&view)
        }
        Command::Fetch(endpoint) => {
            let summary = app.fetch(&endpoint, &config.export_dir)?;
            println!("{}", summary.output_path.display());
            Ok(())
        }
    }
}
