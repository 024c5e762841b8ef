use std::collections::BTreeMap as Map;

use structopt::StructOpt;

use snapshot::{Config, Kind, Process, Snapshot, Transfer};

mod command;

use crate::command::{Command, Execution};

#[derive(StructOpt)]
#[structopt(name = "harness")]
struct Opt {
    /// JSON execution script
    #[structopt(short = "f", long = "file", parse(from_os_str))]
    file: std::path::PathBuf,

    /// Show process logs
    #[structopt(short = "v")]
    verbose: bool,
}

type Error = Box<dyn std::error::Error>;

fn in_transit(snapshot: &Snapshot) -> i64 {
    snapshot.channels
        .values()
        .flatten()
        .filter_map(|message| match &message.kind {
            Kind::Application(kind) => Transfer::amount(kind, &message.payload),
            Kind::Marker => None,
        })
        .sum()
}

fn running(processes: &Map<usize, Process<Transfer>>, id: usize) -> Result<&Process<Transfer>, Error> {
    processes.get(&id)
        .ok_or_else(|| format!("process {} is not running", id).into())
}

async fn collect(processes: &mut Map<usize, Process<Transfer>>, ms: u64) {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_millis(ms);
    let mut snapshots = Vec::new();

    for (id, process) in processes.iter_mut() {
        match tokio::time::timeout_at(deadline, process.next_snapshot()).await {
        | Ok(Some(snapshot)) => snapshots.push(snapshot),
        | _ => println!("Process {} did not finalize a snapshot", id),
        }
    }

    let mut total = 0;
    for snapshot in &snapshots {
        match serde_json::to_string(snapshot) {
        | Ok(json) => println!("{}", json),
        | Err(error) => println!("{}: {}", snapshot, error),
        }
        total += snapshot.state + in_transit(snapshot);
    }
    println!("Global total across {} snapshots: {}", snapshots.len(), total);
}

async fn run(opt: Opt) -> Result<(), Error> {
    // Test execution
    let execution: Execution = serde_json::from_reader(std::fs::File::open(&opt.file)?)?;

    // Running processes
    let mut processes: Map<usize, Process<Transfer>> = Map::default();

    for command in execution.commands {
        println!("Executing command {:?}", command);
        match command {
        | Command::Start { id } => {
            let process = Config::new(id, execution.directory.clone())?
                .start(Transfer)
                .await?;
            processes.insert(id, process);
        }
        | Command::Internal { id } => {
            running(&processes, id)?.internal_event();
        }
        | Command::Transfer { from, to, amount } => {
            running(&processes, from)?.transfer(to, amount)?;
        }
        | Command::Snapshot { id } => {
            if !running(&processes, id)?.start_snapshot() {
                println!("Process {} is already capturing", id);
            }
        }
        | Command::Crash { id } => {
            if let Some(process) = processes.remove(&id) {
                process.shutdown();
            }
        }
        | Command::Sleep { ms } => {
            tokio::time::sleep(std::time::Duration::from_millis(ms)).await
        }
        | Command::Collect { ms } => {
            collect(&mut processes, ms).await
        }
        }
    }

    for (id, process) in processes {
        println!("Process {} final state {} at clock {}", id, process.local_state(), process.clock());
        process.shutdown();
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let opt = Opt::from_args();

    if opt.verbose {
        let logger = fern::Dispatch::new()
            .level(log::LevelFilter::Info)
            .chain(std::io::stderr())
            .apply();
        if let Err(error) = logger {
            eprintln!("failed to initialize logging: {}", error);
        }
    }

    if let Err(error) = run(opt).await {
        eprintln!("[HARNESS ERROR]: {}", error);
        std::process::exit(1);
    }
}
