//! A SOCKS4/4A/5 proxy server implemented in Rust
//!
//! Wicketd is a SOCKS proxy daemon built on the wicket crate.
//!
use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::*;

use wicket as wk;

#[derive(Parser, Debug)]
#[command(name = "wicket")]
struct Opt {
    /// Set path to configuration file (format: yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Set port to listen on
    #[arg(short, long, default_value = "1080")]
    port: u16,

    /// Set ipaddress to listen on
    #[arg(short, long, default_value = "0.0.0.0")]
    ip: IpAddr,

    /// Set local address outbound connections are sourced from
    #[arg(short, long)]
    bind: Option<String>,
}

fn run(opt: Opt) -> anyhow::Result<()> {
    let mut config = match opt.config {
        Some(ref path) => wk::ServerConfig::with_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => wk::ServerConfig::new(vec![format!("{}:{}", opt.ip, opt.port)], None),
    };
    if opt.bind.is_some() {
        config.bind = opt.bind;
    }
    debug!("config: {:?}", config);

    let server = wk::SocksServer::new(&config).context("creating server")?;
    for addr in config.listen_addrs()? {
        let listener = wk::binder::bind(addr).with_context(|| format!("listening on {}", addr))?;
        info!("listening on {}", addr);
        server.serve(listener)?;
    }

    use signal_hook::consts::signal::*;
    let mut signals = signal_hook::iterator::Signals::new([SIGINT, SIGTERM, SIGQUIT])
        .context("setting signal handler")?;
    if let Some(signal) = signals.forever().next() {
        info!("caught signal {}, shutting down", signal);
    }

    server.close()?;
    Ok(())
}

fn main() {
    env_logger::init();

    println!("wicketd");
    let opt = Opt::parse();
    debug!("option: {:?}", opt);

    if let Err(err) = run(opt) {
        error!("server error: {:?}", err);
        std::process::exit(1);
    }
}
