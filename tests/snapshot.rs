use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use snapshot::{Address, Config, Directory, Kind, Process, Snapshot, Transfer};

const WAIT: Duration = Duration::from_secs(5);

async fn listeners(count: usize) -> (Directory, Vec<TcpListener>) {
    let mut listeners = Vec::new();
    for _ in 0..count {
        listeners.push(TcpListener::bind("127.0.0.1:0").await.unwrap());
    }
    let directory = listeners.iter()
        .enumerate()
        .map(|(index, listener)| {
            let port = listener.local_addr().unwrap().port();
            (index + 1, Address::new("127.0.0.1", port))
        })
        .collect();
    (directory, listeners)
}

async fn cluster(count: usize) -> Vec<Process<Transfer>> {
    let (directory, listeners) = listeners(count).await;
    listeners.into_iter()
        .enumerate()
        .map(|(index, listener)| {
            Config::new(index + 1, directory.clone())
                .unwrap()
                .start_on(listener, Transfer)
                .unwrap()
        })
        .collect()
}

async fn wait_until<F: Fn() -> bool>(condition: F) {
    timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

async fn collect(processes: &mut [Process<Transfer>]) -> Vec<Snapshot> {
    let mut snapshots = Vec::new();
    for process in processes.iter_mut() {
        let snapshot = timeout(WAIT, process.next_snapshot())
            .await
            .expect("snapshot not finalized in time")
            .expect("snapshot channel closed");
        snapshots.push(snapshot);
    }
    snapshots
}

fn in_transit_total(snapshot: &Snapshot) -> i64 {
    snapshot.channels
        .values()
        .flatten()
        .map(|message| match &message.kind {
            Kind::Application(kind) => Transfer::amount(kind, &message.payload).unwrap_or(0),
            Kind::Marker => panic!("marker recorded as in transit"),
        })
        .sum()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn three_process_snapshot_closes_once() {
    let mut processes = cluster(3).await;
    processes[0].internal_event();
    processes[0].internal_event();
    processes[1].internal_event();

    assert!(processes[0].start_snapshot());
    let snapshots = collect(&mut processes).await;

    assert_eq!(snapshots.iter().map(|s| s.process).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(snapshots.iter().map(|s| s.state).collect::<Vec<_>>(), vec![2, 1, 0]);
    assert!(!snapshots[0].initiated_by_marker);
    assert!(snapshots[1].initiated_by_marker);
    assert!(snapshots[2].initiated_by_marker);
    for snapshot in &snapshots {
        assert_eq!(snapshot.channels.len(), 2);
        assert_eq!(snapshot.in_transit(), 0);
    }

    for process in processes.iter_mut() {
        assert!(!process.is_capturing());
        assert!(timeout(Duration::from_millis(300), process.next_snapshot()).await.is_err());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_transfers_are_conserved() {
    let mut processes = cluster(3).await;

    for round in 0..20 {
        processes[0].transfer(2, 5).unwrap();
        processes[1].transfer(3, 3).unwrap();
        processes[2].transfer(1, 1).unwrap();
        processes[1].transfer(1, 2).unwrap();
        if round == 10 {
            assert!(processes[0].start_snapshot());
        }
        tokio::task::yield_now().await;
    }

    let snapshots = collect(&mut processes).await;
    let captured: i64 = snapshots.iter().map(|s| s.state).sum();
    let in_flight: i64 = snapshots.iter().map(in_transit_total).sum();
    assert_eq!(captured + in_flight, 0);

    wait_until(|| {
        processes[0].local_state() == 20 * (1 + 2 - 5)
            && processes[1].local_state() == 20 * (5 - 3 - 2)
            && processes[2].local_state() == 20 * (3 - 1)
    }).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn fifo_delivery_advances_receiver_clock() {
    let processes = cluster(2).await;
    for _ in 0..50 {
        processes[0].transfer(2, 1).unwrap();
    }
    let sent_at = processes[0].clock();

    wait_until(|| processes[1].local_state() == 50).await;
    assert!(processes[1].clock() > sent_at);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_frame_does_not_close_connection() {
    let processes = cluster(2).await;
    let mut stream = TcpStream::connect(processes[0].local_addr()).await.unwrap();

    stream.write_all(b"abc:1:APPLICATION\n").await.unwrap();
    stream.write_all(b"40:2:TRANSFER:7\n").await.unwrap();

    wait_until(|| processes[0].local_state() == 7).await;
    assert_eq!(processes[0].clock(), 41);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_peer_never_completes_snapshot() {
    let (mut directory, mut listeners) = listeners(1).await;
    let vacant = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = vacant.local_addr().unwrap().port();
    drop(vacant);
    directory.insert(2, Address::new("127.0.0.1", port));

    let mut process = Config::new(1, directory)
        .unwrap()
        .start_on(listeners.remove(0), Transfer)
        .unwrap();

    process.transfer(2, 4).unwrap();
    assert_eq!(process.local_state(), -4);
    assert!(process.start_snapshot());

    assert!(timeout(Duration::from_millis(300), process.next_snapshot()).await.is_err());
    assert!(process.is_capturing());
    assert!(!process.start_snapshot());
}

#[tokio::test]
async fn unknown_process_id_fails_fast() {
    let directory = Directory::localhost(&[5001, 5002, 5003]);
    assert!(matches!(Config::new(9, directory), Err(snapshot::Error::UnknownProcessId(9))));
}
