mod cli;
mod dirsink;

use clap::Parser;

use cli::{Cli, Commands};
use dirsink::{DirInboundSink, DirOutboundScan};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let cancel = binkp::CancelToken::new();
    let cancel_for_handler = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        log::info!("received interrupt, cancelling the session");
        cancel_for_handler.cancel();
    }) {
        log::warn!("failed to install Ctrl-C handler: {e}");
    }

    let scan = DirOutboundScan {
        dir: cli.outbound_dir.clone(),
    };
    let mut sink = DirInboundSink {
        dir: cli.inbound_dir.clone(),
    };

    let result = match &cli.command {
        Commands::Dial { host, port } => {
            let config = cli.make_config(host.clone(), port.unwrap_or(binkp_transport::DEFAULT_PORT));
            binkp::dial(&config, &scan, &mut sink, &cancel)
        }
        Commands::Listen { bind, port } => {
            run_listener(&cli, bind, port.unwrap_or(binkp_transport::DEFAULT_PORT), &scan, &mut sink, &cancel)
        }
    };

    match result {
        Ok(binkp::Outcome::Done(stats)) => {
            log::info!(
                "session done: {} sent, {} received, {} bytes up, {} bytes down",
                stats.files_sent,
                stats.files_received,
                stats.bytes_sent,
                stats.bytes_received
            );
        }
        Ok(binkp::Outcome::Busy) => log::info!("remote is busy"),
        Err(e) => {
            log::error!("session failed: {e}");
            std::process::exit(1);
        }
    }
}

fn run_listener(
    cli: &Cli,
    bind: &str,
    port: u16,
    scan: &dyn binkp::OutboundScan,
    sink: &mut dyn binkp::InboundSink,
    cancel: &binkp::CancelToken,
) -> binkp::Result<binkp::Outcome> {
    let listener = binkp_transport::listen(bind, port)?;
    loop {
        if cancel.is_cancelled() {
            return Ok(binkp::Outcome::Done(Default::default()));
        }
        let (mut stream, peer) = match binkp_transport::accept(&listener) {
            Ok(accepted) => accepted,
            Err(e) => {
                log::warn!("accept failed: {e}");
                continue;
            }
        };
        log::info!("accepted connection from {peer}");
        let config = cli.make_config(String::new(), 0);
        match binkp::serve(&mut stream, &config, scan, sink, cancel, None) {
            Ok(outcome) => log::info!("session with {peer} finished: {outcome:?}"),
            Err(e) => log::warn!("session with {peer} failed: {e}"),
        }
    }
}
