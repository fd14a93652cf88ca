//! End-to-end sessions over loopback `TcpStream` pairs: one thread runs
//! the originator, the main thread runs the answerer, and they meet in
//! the middle over a real (if local) socket.

use std::fs;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use binkp::{AcceptDecision, Address, CancelToken, Config, InboundSink, OutboundFile, OutboundScan};

struct FixedOutbound {
    files: Vec<OutboundFile>,
}

impl OutboundScan for FixedOutbound {
    fn scan(&self, _network: &str) -> std::io::Result<Vec<OutboundFile>> {
        Ok(self.files.clone())
    }
}

struct NoOutbound;

impl OutboundScan for NoOutbound {
    fn scan(&self, _network: &str) -> std::io::Result<Vec<OutboundFile>> {
        Ok(Vec::new())
    }
}

struct RecordingInbound {
    dir: PathBuf,
    decision: AcceptDecision,
    committed: Vec<(String, u64)>,
}

impl RecordingInbound {
    fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            decision: AcceptDecision::Accept,
            committed: Vec::new(),
        }
    }
}

impl InboundSink for RecordingInbound {
    fn accept(&mut self, _name: &str, _size: u64, _timestamp: u64) -> AcceptDecision {
        self.decision.clone()
    }

    fn commit(
        &mut self,
        name: &str,
        temp_path: &Path,
        size: u64,
        _timestamp: u64,
        _remote_addresses: &[Address],
    ) -> std::io::Result<()> {
        let dest = self.dir.join(name);
        fs::rename(temp_path, &dest)?;
        self.committed.push((name.to_string(), size));
        Ok(())
    }
}

static TEST_ID: AtomicU64 = AtomicU64::new(0);

fn scratch_dir(label: &str) -> PathBuf {
    let id = TEST_ID.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("binkp-test-{label}-{id}-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn base_config(staging_dir: PathBuf) -> Config {
    Config {
        staging_dir,
        frame_timeout: Duration::from_secs(2),
        session_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// Runs `originator_config`/`answerer_config` against each other over a
/// loopback socket, returning (originator outcome, answerer outcome).
fn run_pair(
    originator_config: Config,
    originator_scan: impl OutboundScan + Send + 'static,
    mut originator_sink: impl InboundSink + Send + 'static,
    answerer_config: Config,
    answerer_scan: impl OutboundScan + Send + 'static,
    mut answerer_sink: impl InboundSink + Send + 'static,
) -> (binkp::Result<binkp::Outcome>, binkp::Result<binkp::Outcome>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let mut originator_config = originator_config;
    originator_config.remote_host = "127.0.0.1".to_string();
    originator_config.remote_port = port;

    let answerer_handle = thread::spawn(move || {
        let (mut stream, _peer) = listener.accept().unwrap();
        let cancel = CancelToken::new();
        binkp::serve(&mut stream, &answerer_config, &answerer_scan, &mut answerer_sink, &cancel, None)
    });

    let cancel = CancelToken::new();
    let originator_result = binkp::dial(&originator_config, &originator_scan, &mut originator_sink, &cancel);
    let answerer_result = answerer_handle.join().unwrap();

    (originator_result, answerer_result)
}

#[test]
fn happy_path_transfers_a_file_each_way_without_auth_or_compression() {
    let originator_out = scratch_dir("happy-orig-out");
    let originator_in = scratch_dir("happy-orig-in");
    let answerer_out = scratch_dir("happy-ans-out");
    let answerer_in = scratch_dir("happy-ans-in");

    let orig_path = write_file(&originator_out, "hello.txt", b"hello from the originator");
    let ans_path = write_file(&answerer_out, "world.txt", b"hello from the answerer");

    let mut originator_config = base_config(originator_in.clone());
    originator_config.plz_mode = binkp::PlzMode::None;
    let mut answerer_config = base_config(answerer_in.clone());
    answerer_config.plz_mode = binkp::PlzMode::None;

    let originator_scan = FixedOutbound {
        files: vec![OutboundFile {
            name: "hello.txt".to_string(),
            local_path: orig_path,
            size: 26,
            timestamp: 0,
        }],
    };
    let answerer_scan = FixedOutbound {
        files: vec![OutboundFile {
            name: "world.txt".to_string(),
            local_path: ans_path,
            size: 23,
            timestamp: 0,
        }],
    };

    let (originator_result, answerer_result) = run_pair(
        originator_config,
        originator_scan,
        RecordingInbound::new(originator_in.clone()),
        answerer_config,
        answerer_scan,
        RecordingInbound::new(answerer_in.clone()),
    );

    let originator_outcome = originator_result.unwrap();
    let answerer_outcome = answerer_result.unwrap();

    match originator_outcome {
        binkp::Outcome::Done(stats) => {
            assert_eq!(stats.files_sent, 1);
            assert_eq!(stats.files_received, 1);
        }
        binkp::Outcome::Busy => panic!("expected a completed session"),
    }
    match answerer_outcome {
        binkp::Outcome::Done(stats) => {
            assert_eq!(stats.files_sent, 1);
            assert_eq!(stats.files_received, 1);
        }
        binkp::Outcome::Busy => panic!("expected a completed session"),
    }

    assert_eq!(
        fs::read(originator_in.join("world.txt")).unwrap(),
        b"hello from the answerer"
    );
    assert_eq!(
        fs::read(answerer_in.join("hello.txt")).unwrap(),
        b"hello from the originator"
    );
}

#[test]
fn plaintext_password_mismatch_fails_the_session() {
    let originator_in = scratch_dir("pwd-bad-orig-in");
    let answerer_in = scratch_dir("pwd-bad-ans-in");

    let mut originator_config = base_config(originator_in.clone());
    originator_config.password = Some("wrong".to_string());
    originator_config.use_cram = false;
    let mut answerer_config = base_config(answerer_in.clone());
    answerer_config.password = Some("correct".to_string());
    answerer_config.use_cram = false;

    let (originator_result, answerer_result) = run_pair(
        originator_config,
        NoOutbound,
        RecordingInbound::new(originator_in),
        answerer_config,
        NoOutbound,
        RecordingInbound::new(answerer_in),
    );

    assert!(originator_result.is_err());
    assert!(answerer_result.is_err());
}

#[test]
fn plaintext_password_match_completes_the_session() {
    let originator_in = scratch_dir("pwd-ok-orig-in");
    let answerer_in = scratch_dir("pwd-ok-ans-in");

    let mut originator_config = base_config(originator_in.clone());
    originator_config.password = Some("shared-secret".to_string());
    originator_config.use_cram = false;
    let mut answerer_config = base_config(answerer_in.clone());
    answerer_config.password = Some("shared-secret".to_string());
    answerer_config.use_cram = false;

    let (originator_result, answerer_result) = run_pair(
        originator_config,
        NoOutbound,
        RecordingInbound::new(originator_in),
        answerer_config,
        NoOutbound,
        RecordingInbound::new(answerer_in),
    );

    assert!(matches!(originator_result.unwrap(), binkp::Outcome::Done(_)));
    assert!(matches!(answerer_result.unwrap(), binkp::Outcome::Done(_)));
}

#[test]
fn cram_md5_challenge_authenticates_without_the_password_on_the_wire() {
    let originator_in = scratch_dir("cram-orig-in");
    let answerer_in = scratch_dir("cram-ans-in");

    let mut originator_config = base_config(originator_in.clone());
    originator_config.password = Some("shared-secret".to_string());
    let mut answerer_config = base_config(answerer_in.clone());
    answerer_config.password = Some("shared-secret".to_string());
    answerer_config.use_cram = true;

    let (originator_result, answerer_result) = run_pair(
        originator_config,
        NoOutbound,
        RecordingInbound::new(originator_in),
        answerer_config,
        NoOutbound,
        RecordingInbound::new(answerer_in),
    );

    match answerer_result.unwrap() {
        binkp::Outcome::Done(_) => {}
        binkp::Outcome::Busy => panic!("expected a completed session"),
    }
    assert!(matches!(originator_result.unwrap(), binkp::Outcome::Done(_)));
}

#[test]
fn skip_decision_leaves_the_file_unreceived() {
    let originator_out = scratch_dir("skip-orig-out");
    let originator_in = scratch_dir("skip-orig-in");
    let answerer_in = scratch_dir("skip-ans-in");

    let path = write_file(&originator_out, "offered.bin", b"some payload bytes");

    let originator_config = base_config(originator_in.clone());
    let answerer_config = base_config(answerer_in.clone());

    let originator_scan = FixedOutbound {
        files: vec![OutboundFile {
            name: "offered.bin".to_string(),
            local_path: path,
            size: 18,
            timestamp: 0,
        }],
    };

    let mut answerer_sink = RecordingInbound::new(answerer_in.clone());
    answerer_sink.decision = AcceptDecision::Skip;

    let (originator_result, answerer_result) = run_pair(
        originator_config,
        originator_scan,
        RecordingInbound::new(originator_in),
        answerer_config,
        NoOutbound,
        answerer_sink,
    );

    match originator_result.unwrap() {
        binkp::Outcome::Done(stats) => assert_eq!(stats.files_skipped_remote, 1),
        binkp::Outcome::Busy => panic!("expected a completed session"),
    }
    assert!(matches!(answerer_result.unwrap(), binkp::Outcome::Done(_)));
    assert!(!answerer_in.join("offered.bin").exists());
}

#[test]
fn resume_continues_from_a_partial_staged_file() {
    let originator_out = scratch_dir("resume-orig-out");
    let originator_in = scratch_dir("resume-orig-in");
    let answerer_in = scratch_dir("resume-ans-in");

    let full_contents = b"0123456789abcdefghijklmnopqrstuvwxyz".to_vec();
    let path = write_file(&originator_out, "partial.dat", &full_contents);

    // Pre-stage the first half under the engine's deterministic temp path,
    // matching the convention AcceptDecision::Resume documents.
    let staged_prefix = &full_contents[..16];
    fs::write(answerer_in.join("partial.dat.binkp-tmp"), staged_prefix).unwrap();

    let mut originator_config = base_config(originator_in.clone());
    originator_config.use_crc = true;
    let mut answerer_config = base_config(answerer_in.clone());
    answerer_config.use_crc = true;

    let originator_scan = FixedOutbound {
        files: vec![OutboundFile {
            name: "partial.dat".to_string(),
            local_path: path,
            size: full_contents.len() as u64,
            timestamp: 0,
        }],
    };

    let mut answerer_sink = RecordingInbound::new(answerer_in.clone());
    answerer_sink.decision = AcceptDecision::Resume(16);

    let (originator_result, answerer_result) = run_pair(
        originator_config,
        originator_scan,
        RecordingInbound::new(originator_in),
        answerer_config,
        NoOutbound,
        answerer_sink,
    );

    assert!(matches!(originator_result.unwrap(), binkp::Outcome::Done(_)));
    assert!(matches!(answerer_result.unwrap(), binkp::Outcome::Done(_)));
    assert_eq!(fs::read(answerer_in.join("partial.dat")).unwrap(), full_contents);
}

#[test]
fn frame_timeout_surfaces_as_a_timeout_error_rather_than_hanging() {
    let answerer_in = scratch_dir("timeout-ans-in");
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let accepting = thread::spawn(move || listener.accept().unwrap());
    // Kept alive (not dropped) for the duration of the call below: a
    // dropped socket sends a FIN, which would surface as a clean
    // connection-closed error instead of the timeout this test wants.
    let mut connecting = std::net::TcpStream::connect(("127.0.0.1", port)).unwrap();
    let (mut stream, _peer) = accepting.join().unwrap();

    let mut config = base_config(answerer_in.clone());
    config.frame_timeout = Duration::from_millis(200);
    config.session_timeout = Duration::from_secs(3);

    let cancel = CancelToken::new();
    let mut sink = RecordingInbound::new(answerer_in);
    // The originator never sends M_ADR; the answerer blocks in R1 until
    // the frame timeout trips.
    let result = binkp::serve(&mut stream, &config, &NoOutbound, &mut sink, &cancel, None);

    assert!(matches!(result, Err(binkp::Error::Frame(_))));

    // The answerer must have written an M_ERR frame to the peer on its way
    // out, best-effort, before returning the error above.
    connecting
        .set_read_timeout(Some(Duration::from_secs(1)))
        .unwrap();
    let deadline = binkp_types::Deadline::after(Duration::from_secs(1));
    let frame = binkp_msg::decode_from(&mut connecting, deadline).unwrap();
    let payload = match frame {
        binkp_msg::Frame::Command(payload) => payload,
        binkp_msg::Frame::Data(_) => panic!("expected a command frame carrying M_ERR"),
    };
    let cmd = binkp_msg::Command::from_payload(&payload).unwrap();
    assert!(matches!(cmd, binkp_msg::Command::Err(_)));
}
