use clap::Parser;
use ghostlink_cli::args::{Cli, Commands, DecodeArgs, EncodeArgs, InputMode};
use ghostlink_cli::server::{self, hex, AppState};
use ghostlink_core::{decode_wav, encode_bytes_to_wav, EncodeRequest, JsonDedupStore};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(2)
        }
    }
}

fn run(command: Commands) -> CliResult<()> {
    match command {
        Commands::Encode {
            mode,
            input,
            outdir,
            out_name,
            history,
            params,
        } => encode_command(mode, input, &outdir, out_name.as_deref(), &history, &params),
        Commands::Decode { wav, params } => decode_command(&wav, &params),
        Commands::Serve { addr, history } => serve_command(addr, history),
    }
}

fn encode_command(
    mode: InputMode,
    input: String,
    outdir: &Path,
    out_name: Option<&str>,
    history: &Path,
    params: &EncodeArgs,
) -> CliResult<()> {
    let config = params.to_config()?;
    let source = mode.source(input);
    source.validate()?;
    if out_name.is_some() && !source.allows_out_name() {
        return Err("--out-name cannot be used with dir mode".into());
    }

    let store = JsonDedupStore::open(history)?;
    let items = source.items();
    info!("Encoding {} payload(s) from {} input", items.len(), source.mode());
    if items.is_empty() {
        return Err("nothing to encode".into());
    }

    let (mut created, mut skipped) = (0usize, 0usize);
    for item in &items {
        let request = EncodeRequest {
            payload: &item.bytes,
            name_hint: &item.name_hint,
            out_dir: outdir,
            out_name,
        };
        match encode_bytes_to_wav(&request, &config, &store) {
            Ok(outcome) if outcome.skipped => {
                skipped += 1;
                println!("Skipped (already encoded): {}", outcome.path.display());
            }
            Ok(outcome) => {
                created += 1;
                println!("Wrote {}", outcome.path.display());
            }
            // one bad file does not stop a directory batch
            Err(e) if mode == InputMode::Dir => error!("Failed to encode '{}': {}", item.name_hint, e),
            Err(e) => return Err(e.into()),
        }
    }

    println!("Done. Created: {}, Skipped: {}", created, skipped);
    Ok(())
}

fn decode_command(wav: &Path, params: &DecodeArgs) -> CliResult<()> {
    let config = params.to_config()?;
    let payload = decode_wav(wav, &config)?;

    match std::str::from_utf8(&payload) {
        Ok(text) => println!("{}", text),
        Err(_) => {
            info!("Payload is not UTF-8, printing hex");
            println!("{}", hex(&payload));
        }
    }
    Ok(())
}

fn serve_command(addr: SocketAddr, history: PathBuf) -> CliResult<()> {
    let store = JsonDedupStore::open(history)?;
    let state = AppState::new(store, std::env::temp_dir().join("ghostlink-uploads"));

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::serve(addr, state))?;
    Ok(())
}
