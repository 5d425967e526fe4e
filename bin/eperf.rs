use clap::{Parser, ValueEnum};
use std::time::{Duration, Instant};
use tracing_subscriber::filter::EnvFilter;
use xsocket::{Endpoint, EndpointOptions, Role, Transport};

fn report(cid: usize, total_recv: usize, start: &mut Instant, sampling_period: Duration) -> usize {
    let delta = start.elapsed();
    if delta >= sampling_period {
        let throughput = ((total_recv * 8) as f32 / delta.as_secs_f32()) / (10u64.pow(6) as f32);
        println!("[{cid}]: {throughput} Mbps");
        *start = Instant::now();
        return 0;
    }
    total_recv
}

fn run_client_mode(args: Args) -> xsocket::Result<()> {
    let opts = args.options();
    let mut client = Endpoint::new(args.verbose);
    client.create(args.proto.into())?;
    client.apply(&opts)?;
    client.finalize(Role::Client, args.port, Some(args.addr.as_str()))?;

    let buf = vec![42u8; args.size];
    match args.proto {
        Proto::Tcp => {
            client.connect_with(&opts)?;
            println!("Connected successfully to {}:{}", args.addr, args.port);
            loop {
                let n = client.write(&buf)?;
                if n == 0 {
                    println!("Connection closed by remote peer");
                    return Ok(());
                }
            }
        }
        Proto::Udp => loop {
            client.send(&buf)?;
        },
    }
}

fn run_server_mode(args: Args) -> xsocket::Result<()> {
    let opts = args.options();
    let mut server = Endpoint::new(args.verbose);
    server.create(args.proto.into())?;
    server.apply(&opts)?;
    server.finalize(Role::Server, args.port, None)?;
    println!("Listening on {}", server.local_addr()?);

    let mut buf = vec![0u8; args.size];
    let sampling_period = Duration::from_secs(args.period);
    match args.proto {
        Proto::Tcp => {
            let mut sid = 0;
            loop {
                let peer = match server.accept() {
                    Ok(peer) => peer,
                    Err(e) => {
                        println!("Failed to accept connection: {e}");
                        continue;
                    }
                };
                println!("Accepted connection from: {}", peer.addr());
                let mut start = Instant::now();
                let mut total_recv = 0;
                loop {
                    let n = server.read_peer(&peer, &mut buf)?;
                    if n == 0 {
                        println!("Socket close from remote party...");
                        break;
                    }
                    total_recv = report(sid, total_recv + n, &mut start, sampling_period);
                }
                sid += 1;
            }
        }
        Proto::Udp => {
            let mut start = Instant::now();
            let mut total_recv = 0;
            loop {
                match server.recv_from(&mut buf) {
                    Ok((n, _)) => total_recv = report(0, total_recv + n, &mut start, sampling_period),
                    Err(xsocket::EndpointError::ReceiveTimeout) => {
                        total_recv = report(0, total_recv, &mut start, sampling_period)
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }
}

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

fn main() {
    tracing_log::LogTracer::init().expect("Failed to set logger");

    if let Ok(env_filter) = EnvFilter::try_from_default_env() {
        init_env_filter(env_filter);
    }

    let args = Args::parse();
    let result = if args.client {
        run_client_mode(args)
    } else {
        run_server_mode(args)
    };
    if let Err(e) = result {
        eprintln!("eperf: {e}");
        std::process::exit(1);
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Proto {
    Tcp,
    Udp,
}

impl From<Proto> for Transport {
    fn from(proto: Proto) -> Self {
        match proto {
            Proto::Tcp => Transport::Tcp,
            Proto::Udp => Transport::Udp,
        }
    }
}

/// The throughput benchmarking application for xsocket endpoints
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Set the client mode for the application
    #[arg(short, long)]
    client: bool,
    /// The transport to use
    #[arg(long, value_enum, default_value = "tcp")]
    proto: Proto,
    /// The IPv4 address to connect to (client mode only)
    #[arg(short, long, default_value = "127.0.0.1")]
    addr: String,
    /// The port to listen on or connect to, depending on the mode
    #[arg(short = 'P', long)]
    port: u16,
    /// The read/write buffer size
    #[arg(short, long)]
    size: usize,
    /// The sampling period in seconds
    #[arg(short, long, default_value = "1")]
    period: u64,
    /// The connect timeout in milliseconds
    #[arg(short, long, default_value = "1000")]
    timeout_ms: u64,
    /// Disable Nagle's algorithm on Tcp sockets
    #[arg(long)]
    no_delay: bool,
    /// Log every socket failure
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn options(&self) -> EndpointOptions {
        let mut opts = EndpointOptions::new()
            .with_reuse_address(true)
            .with_connect_timeout(Duration::from_millis(self.timeout_ms));
        if self.no_delay && matches!(self.proto, Proto::Tcp) {
            opts = opts.with_no_delay(true);
        }
        if matches!(self.proto, Proto::Udp) && !self.client {
            opts = opts.with_receive_timeout(Duration::from_secs(self.period.max(1)));
        }
        opts
    }
}
