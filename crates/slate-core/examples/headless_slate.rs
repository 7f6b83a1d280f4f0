//! Headless slate: build a small board, run it for a simulated minute and
//! print the pool.
//!
//! Run with `cargo run --example headless_slate -- [config.toml]`.
//! Set `RUST_LOG=debug` to see scheduler internals, `info` shows each bosun
//! passing the print node.

use slate_core::config::EngineConfig;
use slate_core::engine::Engine;
use slate_core::id::PortSide;
use slate_core::node::Node;
use slate_core::slot::SlotKind;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    info!(?config, "starting headless slate");

    let mut engine = Engine::new(config)?;
    engine
        .pool_mut()
        .create_slot(SlotKind::Resource, "Gold", 500, 0)?;

    let well = engine.add_node(
        Node::with_ports("Infinity Well", "emit", 0, 1)?.with_icon("well"),
        0,
        0,
    );
    let dock = engine.add_node(Node::with_ports("Dock", "print", 1, 2)?, 96, 0);
    let mut sorter = Node::with_ports("Sorter", "smart_split", 1, 2)?;
    sorter.set_port_label(PortSide::Output, 0, "Gold")?;
    sorter.set_port_label(PortSide::Output, 1, "*")?;
    let sorter = engine.add_node(sorter, 192, 0);
    let vault = engine.add_node(Node::with_ports("Vault", "collect", 1, 0)?, 288, -64);
    let barracks = engine.add_node(Node::with_ports("Barracks", "collect", 2, 0)?, 288, 64);

    engine.add_link(well, 0, dock, 0)?;
    engine.add_link(dock, 0, sorter, 0)?;
    engine.add_link(dock, 1, barracks, 1)?;
    engine.add_link(sorter, 0, vault, 0)?;
    engine.add_link(sorter, 1, barracks, 0)?;

    engine.start();
    let mut processed = 0;
    for _ in 0..60 {
        for step in engine.advance(Duration::from_secs(1)) {
            processed += step.tick.agents_processed();
        }
    }
    engine.stop();

    let summary = engine.scheduler_summary();
    info!(ticks = summary.tick_count, processed, "run finished");
    let pool = engine.pool_summary();
    println!(
        "agents: {}/{}",
        pool.agent_slot.quantity(),
        pool.agent_slot.cap()
    );
    for (key, slot) in &pool.resource_slots {
        println!("{key}: {}/{}", slot.quantity(), slot.cap());
    }

    let snapshot = engine.serialize()?;
    info!(bytes = snapshot.len(), "snapshot taken");
    Ok(())
}
