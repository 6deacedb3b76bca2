mod cmdline;
mod error;
mod ports;
mod tcp;

use std::net::TcpListener;

use cmdline::Cmdline;
use error::Result;
use portwire::{Session, SlaveConfig};
use structopt::StructOpt;
use tcp::TcpTransport;

fn main() {
    let cmdline = Cmdline::from_args();
    env_logger::init();
    let res = match cmdline {
        Cmdline::Listen {
            addr,
            name,
            idle_timeout_ms,
        } => listen_loop(&addr, &name, idle_timeout_ms),
    };
    if let Err(e) = res {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn listen_loop(addr: &str, name: &str, idle_timeout_ms: u32) -> Result<()> {
    let listener = TcpListener::bind(addr)?;
    log::info!("listening on {}", addr);

    for stream in listener.incoming() {
        let stream = stream?;
        log::info!("master connected from {:?}", stream.peer_addr());

        let mut registry = ports::demo_registry()?;
        let mut transport = TcpTransport::new(stream)?;
        let config = SlaveConfig::new(name, idle_timeout_ms);
        let mut session = Session::new(config, &mut registry, &mut transport);

        match session.run() {
            Ok(end) => log::info!("session ended: {:?}", end),
            Err(e) => log::warn!("session error: {}", e),
        }
    }
    Ok(())
}
