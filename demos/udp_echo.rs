use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::filter::EnvFilter;
use clap::Parser;
use xsocket::{Endpoint, EndpointError, Role, Transport};

fn init_env_filter(env_filter: EnvFilter) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_level(true)
        .with_target(true);

    let subscriber = subscriber.finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn serve(args: &Args) -> xsocket::Result<()> {
    let mut server = Endpoint::new(true);
    server.create(Transport::Udp)?;
    server.set_receive_timeout(Some(Duration::from_secs(5)))?;
    server.finalize(Role::Server, args.port, None)?;
    info!("Echoing datagrams on port {}", args.port);

    let mut buf = [0u8; 1500];
    loop {
        match server.recv_from(&mut buf) {
            Ok((n, from)) => {
                info!("{n} bytes from {from}");
                server.send_to(&buf[..n], from)?;
            }
            Err(EndpointError::ReceiveTimeout) => warn!("Nothing received yet"),
            Err(e) => return Err(e),
        }
    }
}

fn ping(args: &Args, address: &str) -> xsocket::Result<()> {
    let mut client = Endpoint::new(true);
    client.create(Transport::Udp)?;
    client.set_receive_timeout(Some(Duration::from_secs(1)))?;
    client.finalize(Role::Client, args.port, Some(address))?;

    let mut buf = [0u8; 1500];
    for i in 0..args.count {
        let msg = format!("ping {i}");
        client.send(msg.as_bytes())?;
        match client.recv(&mut buf) {
            Ok((n, from)) => println!("{} from {from}", String::from_utf8_lossy(&buf[..n])),
            Err(EndpointError::ReceiveTimeout) => println!("ping {i} lost"),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn main() -> xsocket::Result<()> {
    tracing_log::LogTracer::init().expect("Failed to set logger");

    if let Ok(env_filter) = EnvFilter::try_from_default_env() {
        init_env_filter(env_filter);
    }

    let args = Args::parse();
    match &args.connect {
        Some(address) => ping(&args, address),
        None => serve(&args),
    }
}

/// A Udp echo server, or a client pinging one when `--connect` is given.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The IPv4 address of the echo server; runs the server when absent
    #[arg(short, long)]
    connect: Option<String>,
    /// The port to serve on or send to
    #[arg(short, long, default_value = "20001")]
    port: u16,
    /// Number of pings to send
    #[arg(short = 'n', long, default_value = "4")]
    count: u32,
}
