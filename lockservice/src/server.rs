use std::net::SocketAddr;

use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(name = "lockservice-server")]
struct Opt {
    /// Index of this server into the peer list
    #[structopt(short = "i", long = "id")]
    id: usize,

    /// Address to listen on for client requests
    #[structopt(short = "a", long = "addr")]
    addr: SocketAddr,

    /// Timeout between servers (in milliseconds)
    #[structopt(short = "t", long = "timeout", default_value = "1000")]
    timeout: u64,

    /// Verbosity (-v, -vv, -vvv)
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: u8,

    /// Peer-to-peer addresses of every server, in the same order everywhere
    #[structopt(name = "PEER", required = true)]
    peers: Vec<SocketAddr>,
}

#[tokio::main]
async fn main() {
    let opt = Opt::from_args();

    if let Err(error) = lockservice::logging::init(opt.verbose) {
        eprintln!("[ERROR]: could not initialize logger: {}", error);
    }

    if opt.id >= opt.peers.len() {
        eprintln!("[ERROR]: id {} out of range for {} peers", opt.id, opt.peers.len());
        std::process::exit(1);
    }

    let config = paxos::Config::new(opt.peers, opt.id)
        .with_timeout(std::time::Duration::from_millis(opt.timeout));

    let service = match lockservice::LockService::run(config, opt.addr).await {
    | Ok(service) => service,
    | Err(error) => {
        eprintln!("[ERROR]: could not start server: {}", error);
        std::process::exit(1);
    }
    };

    if let Err(error) = tokio::signal::ctrl_c().await {
        eprintln!("[ERROR]: could not listen for shutdown: {}", error);
    }
    service.kill();
}
