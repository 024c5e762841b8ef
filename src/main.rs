use rand::Rng;
use structopt::StructOpt;

use snapshot::{Config, Directory, Transfer};

#[derive(StructOpt)]
#[structopt(name = "snapshot-peer")]
struct Opt {
    /// Unique process ID
    #[structopt(short = "i", long = "id")]
    id: usize,

    /// JSON peer directory (defaults to processes 1-3 on localhost:5001-5003)
    #[structopt(short = "d", long = "directory", parse(from_os_str))]
    directory: Option<std::path::PathBuf>,

    /// How long to run (in seconds)
    #[structopt(short = "t", long = "duration", default_value = "5")]
    duration: u64,

    /// Time between simulated events (in milliseconds)
    #[structopt(short = "n", long = "interval", default_value = "250")]
    interval: u64,

    /// Initiate a snapshot from this process
    #[structopt(short = "s", long = "initiate")]
    initiate: bool,

    /// Delay before initiating (in milliseconds)
    #[structopt(long = "delay", default_value = "1000")]
    delay: u64,

    /// Logging verbosity (-v debug, -vv trace)
    #[structopt(short = "v", parse(from_occurrences))]
    verbose: u8,
}

fn logger(verbose: u8) -> Result<(), fern::InitError> {
    let level = match verbose {
    | 0 => log::LevelFilter::Info,
    | 1 => log::LevelFilter::Debug,
    | _ => log::LevelFilter::Trace,
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("{:<5} {}", record.level(), message))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}

async fn run(opt: Opt) -> snapshot::Result<()> {
    let directory = match &opt.directory {
    | Some(path) => Directory::load(path)?,
    | None => Directory::localhost(&[5001, 5002, 5003]),
    };

    let config = Config::new(opt.id, directory)?;
    let peers = config.peers().map(|(id, _)| id).collect::<Vec<_>>();
    let mut process = config.start(Transfer).await?;

    let start = std::time::Instant::now();
    let duration = std::time::Duration::from_secs(opt.duration);
    let delay = std::time::Duration::from_millis(opt.delay);
    let mut interval = tokio::time::interval(std::time::Duration::from_millis(opt.interval));
    let mut initiated = !opt.initiate;

    while start.elapsed() < duration {
        tokio::select! {
            _ = interval.tick() => (),
            Some(snapshot) = process.next_snapshot() => {
                println!("{}", snapshot);
                continue
            }
        }

        if !initiated && start.elapsed() >= delay {
            if !process.start_snapshot() {
                log::info!("snapshot already in progress, not initiating another");
            }
            initiated = true;
        }

        let mut rng = rand::thread_rng();
        if peers.is_empty() || rng.gen_bool(0.5) {
            process.internal_event();
        } else {
            let to = peers[rng.gen_range(0..peers.len())];
            let amount = rng.gen_range(1..=10);
            if let Err(error) = process.transfer(to, amount) {
                log::warn!("{}", error);
            }
        }
    }

    while let Some(snapshot) = process.try_snapshot() {
        println!("{}", snapshot);
    }
    process.shutdown();
    Ok(())
}

#[tokio::main]
async fn main() {
    let opt = Opt::from_args();

    if let Err(error) = logger(opt.verbose) {
        eprintln!("failed to initialize logging: {}", error);
    }

    if let Err(error) = run(opt).await {
        eprintln!("{}", error);
        std::process::exit(1);
    }
}
