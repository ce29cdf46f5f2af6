//! Triangle demo
//!
//! Plays the role of daemon B in a fully meshed A-B-C triangle. An
//! attachment on A is reachable directly and through C; when A leaves the
//! bus, B must retire its virtual endpoint instead of believing A is still
//! reachable through C.
//!
//! Run with: cargo run --example triangle -- --sessions 3 --debug

use anyhow::{Context, Result};
use busroute::config::{load_config, RouterConfig};
use busroute::link::{Guid128, LinkHandle};
use busroute::message::Message;
use busroute::routing::{RouteEvent, RouterBuilder};
use busroute::session::{SessionId, SessionLostReason};
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "triangle")]
#[command(about = "Simulate link loss in a three-daemon mesh", long_about = None)]
struct Args {
    /// Number of sessions to bind to the remote attachment
    #[arg(short, long, default_value_t = 2)]
    sessions: u32,

    /// Optional router configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

/// Drain a link's queue the way a transport writer would
fn spawn_writer(name: &'static str, mut rx: mpsc::Receiver<Message>) -> tokio::task::JoinHandle<usize> {
    tokio::spawn(async move {
        let mut written = 0;
        while let Some(msg) = rx.recv().await {
            info!(link = name, serial = msg.serial(), "wrote message");
            written += 1;
        }
        written
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => RouterConfig::default(),
    };
    if args.debug {
        config = config.with_log_filter("busroute=trace,triangle=debug");
    }
    tracing_subscriber::fmt()
        .with_env_filter(config.log_filter.as_str())
        .init();

    let router = RouterBuilder::new().config(config).build()?;
    router.events().subscribe(|event| match event {
        RouteEvent::EndpointRetired { name } => info!(endpoint = %name, "endpoint retired"),
        RouteEvent::SessionLost {
            endpoint,
            session_id,
            reason,
        } => info!(endpoint = %endpoint, session = %session_id, ?reason, "session lost"),
    });

    let guid_a = Guid128::random();
    let guid_c = Guid128::random();
    let (to_a, rx_a) = router.open_queue_link(":a.1", guid_a);
    let (to_c, rx_c) = router.open_queue_link(":c.1", guid_c);
    let to_a: LinkHandle = to_a;
    let to_c: LinkHandle = to_c;
    let writer_a = spawn_writer(":a.1", rx_a);
    let writer_c = spawn_writer(":c.1", rx_c);

    // The attachment ":a.5" lives on A; B hears about it from A and from C
    router.add_virtual_endpoint(":a.5", LinkHandle::clone(&to_a));
    router.add_virtual_endpoint(":a.5", LinkHandle::clone(&to_c));

    for id in 1..=args.sessions {
        let link = router.bind_session(":a.5", SessionId::new(id), None)?;
        info!(session = id, link = link.unique_name(), "session bound");
        let msg = Message::method_call(id, ":b.1", ":a.5", "Hello")
            .with_session(SessionId::new(id));
        router.route(":a.5", &msg)?;
    }

    info!(
        unreachable = ?router.unreachable_without(guid_a),
        "endpoints depending on A"
    );

    let report = router.link_lost(&to_a, SessionLostReason::RemoteEndClosedAbruptly);
    info!(
        retired = ?report.retired,
        lost_sessions = report.lost_sessions.len(),
        "A left the bus"
    );

    let msg = Message::method_call(100, ":b.1", ":a.5", "Hello");
    match router.route(":a.5", &msg) {
        Ok(delivery) => info!(link = delivery.link.unique_name(), "still routable"),
        Err(e) => info!(error = %e, "no route, as expected"),
    }

    // Closing the links ends the writers
    drop(to_a);
    drop(to_c);
    drop(router);
    let written_a = writer_a.await?;
    let written_c = writer_c.await?;
    info!(written_a, written_c, "writers finished");

    Ok(())
}
