use std::time::Duration;
use tracing_subscriber::filter::EnvFilter;
use clap::Parser;
use xsocket::{Endpoint, Role, Transport};

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

fn main() -> xsocket::Result<()> {
    // Initialize log bridge to capture log crate messages - MUST be first!
    tracing_log::LogTracer::init().expect("Failed to set logger");

    if let Ok(env_filter) = EnvFilter::try_from_default_env() {
        init_env_filter(env_filter);
    }

    let args = Args::parse();
    println!("Starting Tcp server on port {}", args.port);

    let mut server = Endpoint::new(true);
    server.create(Transport::Tcp)?;
    server.set_reuse_address(true)?;
    server.finalize(Role::Server, args.port, None)?;

    let mut client = Endpoint::new(true);
    client.create(Transport::Tcp)?;
    client.finalize(Role::Client, args.port, Some("127.0.0.1"))?;

    std::thread::scope(|s| -> xsocket::Result<()> {
        let accepted = s.spawn(|| server.accept());

        client.connect(Duration::from_millis(args.timeout_ms))?;
        println!("Client connected");

        let peer = accepted.join().expect("accept thread panicked")?;
        println!("Accepted connection from: {}", peer.addr());

        let n = client.write(args.message.as_bytes())?;
        println!("Wrote {n} bytes");

        let mut buf = vec![0u8; n];
        let mut got = 0;
        while got < n {
            let m = server.read_peer(&peer, &mut buf[got..])?;
            if m == 0 {
                break;
            }
            got += m;
        }
        println!("Server read: {}", String::from_utf8_lossy(&buf[..got]));
        Ok(())
    })
}

/// Runs a Tcp server and client in one process and passes a message between them.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The port the server listens on
    #[arg(short, long, default_value = "20000")]
    port: u16,
    /// The connect timeout in milliseconds
    #[arg(short, long, default_value = "1000")]
    timeout_ms: u64,
    /// The message sent from client to server
    #[arg(short, long, default_value = "Hello over loopback")]
    message: String,
}
