use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

use super::forward::spawn_forward_loop;
use super::server::BridgeServer;
use crate::clock::ClockSync;
use crate::error::BridgeError;
use crate::link::ProbeLink;
use crate::testing::MockLink;
use crate::types::BridgeConfig;

const WAIT: Duration = Duration::from_secs(5);

/// Route bridge tracing through the test harness when RUST_LOG is set.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn start_bridge(
    link: &Arc<MockLink>,
) -> (
    SocketAddr,
    watch::Sender<bool>,
    JoinHandle<Result<(), BridgeError>>,
) {
    init_tracing();
    let sync = ClockSync::new(Arc::clone(link) as Arc<dyn ProbeLink>);
    let config = BridgeConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
    };
    let server = BridgeServer::bind(sync, &config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(server.run(shutdown_rx));
    (addr, shutdown_tx, task)
}

async fn connect(addr: SocketAddr) -> (tokio::io::Lines<BufReader<OwnedReadHalf>>, impl AsyncWriteExt + Unpin) {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, write_half) = stream.into_split();
    (BufReader::new(read_half).lines(), write_half)
}

async fn next_line(lines: &mut tokio::io::Lines<BufReader<OwnedReadHalf>>) -> Option<String> {
    timeout(WAIT, lines.next_line()).await.unwrap().unwrap()
}

#[tokio::test]
async fn test_probe_lines_are_forwarded_to_client() {
    let link = Arc::new(MockLink::new());
    let (addr, shutdown, task) = start_bridge(&link).await;
    let (mut lines, _writer) = connect(addr).await;

    // Let the accept loop register the client before the probe speaks.
    sleep(Duration::from_millis(100)).await;
    link.push_line("G L 100000 1 1");

    assert_eq!(next_line(&mut lines).await.unwrap(), "G L 100000 1 1");

    shutdown.send(true).unwrap();
    timeout(WAIT, task).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_client_bytes_reach_the_probe_verbatim() {
    let link = Arc::new(MockLink::new());
    let (addr, shutdown, _task) = start_bridge(&link).await;
    let (mut lines, mut writer) = connect(addr).await;
    sleep(Duration::from_millis(100)).await;

    writer.write_all(b"Q").await.unwrap();

    // The mock answers the sample command; its reply flows back out.
    assert_eq!(next_line(&mut lines).await.unwrap(), "q 512 300 17");
    assert!(link.writes().iter().any(|w| w.as_slice() == b"Q"));

    shutdown.send(true).unwrap();
}

#[tokio::test]
async fn test_bridge_sync_replies_with_normalized_clock_window() {
    let link = Arc::new(MockLink::new());
    link.set_clock_skew_us(-20_000);
    let (addr, shutdown, _task) = start_bridge(&link).await;
    let (mut lines, mut writer) = connect(addr).await;
    sleep(Duration::from_millis(100)).await;

    writer.write_all(b"bridge sync\n").await.unwrap();

    let reply = next_line(&mut lines).await.unwrap();
    let fields: Vec<&str> = reply.split_whitespace().collect();
    assert_eq!(fields[0], "clock", "reply {reply:?}");
    assert_eq!(fields.len(), 4);
    let base_us: i64 = fields[1].parse().unwrap();
    let min_us: i64 = fields[2].parse().unwrap();
    let max_us: i64 = fields[3].parse().unwrap();
    assert!(base_us > 0);
    // `sync` normalizes the window to start at zero.
    assert_eq!(min_us, 0);
    assert!(max_us >= min_us);

    // Forwarding resumes and the client stream stayed clean: the next
    // line is the trigger, not a leftover sync-readout or ping reply.
    link.push_line("G L 900000 0 1");
    assert_eq!(next_line(&mut lines).await.unwrap(), "G L 900000 0 1");

    shutdown.send(true).unwrap();
}

#[tokio::test]
async fn test_sync_readout_lines_never_reach_the_client() {
    let link = Arc::new(MockLink::new());
    let (addr, shutdown, _task) = start_bridge(&link).await;
    let (mut lines, mut writer) = connect(addr).await;
    sleep(Duration::from_millis(100)).await;

    writer.write_all(b"bridge sync\n").await.unwrap();
    let first = next_line(&mut lines).await.unwrap();
    assert!(
        first.starts_with("clock "),
        "client saw {first:?} before the clock reply"
    );

    shutdown.send(true).unwrap();
}

#[tokio::test]
async fn test_plain_bridge_without_zero_ends_the_session_only() {
    let link = Arc::new(MockLink::new());
    let (addr, shutdown, _task) = start_bridge(&link).await;

    // Plain `bridge` needs an established reference; without one the
    // session errors out and the socket closes.
    let (mut lines, mut writer) = connect(addr).await;
    sleep(Duration::from_millis(100)).await;
    writer.write_all(b"bridge\n").await.unwrap();
    assert_eq!(next_line(&mut lines).await, None);

    // The server keeps listening; the next client can sync.
    let (mut lines, mut writer) = connect(addr).await;
    sleep(Duration::from_millis(100)).await;
    writer.write_all(b"bridge sync\n").await.unwrap();
    let reply = next_line(&mut lines).await.unwrap();
    assert!(reply.starts_with("clock "));

    shutdown.send(true).unwrap();
}

#[tokio::test]
async fn test_forward_loop_pause_resume_handshake() {
    let link = Arc::new(MockLink::new());
    let dyn_link: Arc<dyn ProbeLink> = Arc::clone(&link) as Arc<dyn ProbeLink>;
    let slot = Arc::new(tokio::sync::Mutex::new(None));
    let (client_tx, mut client_rx) = mpsc::channel::<String>(16);
    *slot.lock().await = Some(client_tx);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = spawn_forward_loop(Arc::clone(&dyn_link), Arc::clone(&slot), shutdown_rx);
    // Let the loop park inside its blocking read.
    sleep(Duration::from_millis(100)).await;

    // Pause: the ping reply breaks the read and is discarded, the ack
    // arrives once the loop stops reading.
    timeout(WAIT, handle.pause(&dyn_link)).await.unwrap().unwrap();

    // Lines arriving while paused are not consumed, let alone forwarded.
    link.push_line("G L 1000 1 1");
    link.push_line("G L 2000 0 1");
    sleep(Duration::from_millis(100)).await;
    assert!(client_rx.try_recv().is_err());

    // Resume: the queued lines flow again, in order, with no ping reply
    // in front of them.
    timeout(WAIT, handle.resume()).await.unwrap().unwrap();
    assert_eq!(
        timeout(WAIT, client_rx.recv()).await.unwrap().unwrap(),
        "G L 1000 1 1\n"
    );
    assert_eq!(
        timeout(WAIT, client_rx.recv()).await.unwrap().unwrap(),
        "G L 2000 0 1\n"
    );
}
