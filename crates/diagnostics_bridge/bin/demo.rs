//! # Diagnostics Bridge Demo
//!
//! Runs the whole relay in one process:
//!
//! 1. A local collector thread listens on an ephemeral port and decodes the
//!    length-delimited span messages it receives.
//! 2. A harness argument file pointing at that port is written beneath a
//!    scratch storage root.
//! 3. Several "test process" threads insert serialized spans through the
//!    provider surface, racing on the first insert.
//! 4. The bridge is shut down, the collector drains, and a summary is printed.
//!
//! ## Running
//!
//! ```bash
//! cargo run -p diagnostics_bridge --bin demo
//!
//! # More producers and spans, with debug logging
//! RUST_LOG=debug cargo run -p diagnostics_bridge --bin demo -- --producers 8 --spans 50
//! ```

use anyhow::{bail, Context};
use diagnostics_bridge::wire::WireStatus;
use diagnostics_bridge::{
    AttributeValue, BridgeConfig, ContentValues, DiagnosticsBridge, DiagnosticsProvider, SpanKind, SpanMessage,
    SpanRecord, SpanStatus, TcpStrategy, TcpStrategyConfig, TestArguments, SERVER_PORT_ARG, SPAN_PAYLOAD_KEY,
};
use prost::Message;
use rand::Rng;
use std::io::Read;
use std::net::TcpListener;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const OPERATIONS: &[(&str, SpanKind)] = &[
    ("ActivityScenario.launch", SpanKind::Internal),
    ("onView.perform", SpanKind::Internal),
    ("GET /api/session", SpanKind::Client),
    ("db.query", SpanKind::Client),
    ("TestRunner.runTest", SpanKind::Server),
];

struct DemoArgs {
    producers: usize,
    spans_per_producer: u64,
}

impl DemoArgs {
    fn parse() -> anyhow::Result<Self> {
        let mut args = Self {
            producers: 4,
            spans_per_producer: 25,
        };
        let mut iter = std::env::args().skip(1);
        while let Some(flag) = iter.next() {
            let value = iter.next().with_context(|| format!("missing value for {flag}"))?;
            match flag.as_str() {
                "--producers" => args.producers = value.parse().context("--producers")?,
                "--spans" => args.spans_per_producer = value.parse().context("--spans")?,
                other => bail!("unknown flag {other}"),
            }
        }
        Ok(args)
    }
}

fn random_span(rng: &mut impl Rng, trace_id: u128, span_id: u64) -> SpanRecord {
    let (name, kind) = OPERATIONS[rng.gen_range(0..OPERATIONS.len())];
    let mut span = SpanRecord::new(trace_id, span_id, 0, name.to_string(), kind);
    span.set_attribute("test.class", AttributeValue::String("com.example.LoginTest".to_string()));
    span.set_attribute("attempt", AttributeValue::Int(rng.gen_range(1..4)));

    let failed = rng.gen_bool(0.1);
    if failed {
        span.set_attribute("error", AttributeValue::Bool(true));
    }
    span.end_time = span.start_time + rng.gen_range(50_000..5_000_000);
    span.status = if failed { SpanStatus::Error } else { SpanStatus::Ok };
    span
}

fn spawn_collector() -> anyhow::Result<(u16, thread::JoinHandle<anyhow::Result<Vec<SpanMessage>>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").context("binding collector")?;
    let port = listener.local_addr()?.port();

    let handle = thread::spawn(move || {
        let (mut socket, peer) = listener.accept().context("accepting bridge connection")?;
        tracing::info!(%peer, "collector accepted connection");

        let mut bytes = Vec::new();
        socket.read_to_end(&mut bytes)?;
        let mut buf = bytes.as_slice();
        let mut messages = Vec::new();
        while !buf.is_empty() {
            messages.push(SpanMessage::decode_length_delimited(&mut buf).context("decoding frame")?);
        }
        Ok(messages)
    });

    Ok((port, handle))
}

fn write_harness_args(storage_root: &Path, port: u16) -> anyhow::Result<()> {
    let path = BridgeConfig::default().with_storage_root(storage_root).args_file_path();
    let parent = path.parent().context("argument file has no parent directory")?;
    std::fs::create_dir_all(parent)?;
    TestArguments::from_pairs([
        ("class", "com.example.LoginTest".to_string()),
        (SERVER_PORT_ARG, port.to_string()),
    ])
    .write_to(&path)
    .with_context(|| format!("writing {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = DemoArgs::parse()?;
    let storage_root = std::env::temp_dir().join(format!("diagnostics-bridge-demo-{}", std::process::id()));

    let (port, collector) = spawn_collector()?;
    write_harness_args(&storage_root, port)?;
    println!("collector listening on 127.0.0.1:{port}");

    let config = BridgeConfig::default()
        .with_storage_root(&storage_root)
        .with_send_timeout(Duration::from_secs(2));
    let bridge = Arc::new(DiagnosticsBridge::new(
        config,
        TcpStrategy::factory(TcpStrategyConfig::default().with_channel_capacity(64)),
    )?);
    let provider = Arc::new(DiagnosticsProvider::new(Arc::clone(&bridge)));

    let start = Instant::now();
    let producers: Vec<_> = (0..args.producers)
        .map(|producer_id| {
            let provider = Arc::clone(&provider);
            let spans = args.spans_per_producer;
            thread::spawn(move || -> anyhow::Result<()> {
                let mut rng = rand::thread_rng();
                let trace_id: u128 = rng.gen();
                for seq in 0..spans {
                    let span = random_span(&mut rng, trace_id, (producer_id as u64) << 48 | seq);
                    let values = ContentValues::from([(SPAN_PAYLOAD_KEY.to_string(), span.to_payload()?)]);
                    provider.insert("content://diagnostics/span", &values)?;
                }
                Ok(())
            })
        })
        .collect();

    for producer in producers {
        producer
            .join()
            .map_err(|_| anyhow::anyhow!("producer thread panicked"))??;
    }
    let elapsed = start.elapsed();

    let metrics = Arc::clone(bridge.metrics());
    drop(provider);
    let bridge = Arc::try_unwrap(bridge).map_err(|_| anyhow::anyhow!("bridge still shared"))?;
    bridge.shutdown();

    let received = collector
        .join()
        .map_err(|_| anyhow::anyhow!("collector thread panicked"))??;
    let errors = received.iter().filter(|m| m.status() == WireStatus::Error).count();

    println!();
    println!("=== Diagnostics Bridge Summary ===");
    println!("spans received by bridge : {}", metrics.spans_received());
    println!("spans forwarded          : {}", metrics.spans_forwarded());
    println!("forward errors           : {}", metrics.forward_errors());
    println!("port resolutions         : {}", metrics.port_resolutions());
    println!("strategies started       : {}", metrics.strategies_started());
    println!("spans at collector       : {} ({} with error status)", received.len(), errors);
    println!(
        "ingest throughput        : {:.0} spans/s",
        metrics.spans_received() as f64 / elapsed.as_secs_f64()
    );

    if let Err(e) = std::fs::remove_dir_all(&storage_root) {
        tracing::debug!(error = %e, "could not remove scratch storage");
    }
    Ok(())
}
