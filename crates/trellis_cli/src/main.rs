// SPDX-License-Identifier: MIT OR Apache-2.0
//! Headless Trellis session.
//!
//! Builds a small graph with in-memory views, edits it through the undo
//! stack and prints the resulting node data as JSON.
//!
//! Usage: `trellis [graph-config.ron]`

use std::error::Error;
use std::path::PathBuf;
use trellis_graph::{
    GraphConfig, HeadlessView, Node, NodeGraph, NodeType, PropertyOptions, PropertyType,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const NODE_NAMESPACE: &str = "trellis.demo";

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("trellis_graph=debug,trellis=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Trellis v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    match run(config_path) {
        Ok(output) => println!("{output}"),
        Err(e) => {
            tracing::error!("Session failed: {e}");
            std::process::exit(1);
        }
    }
}

fn run(config_path: Option<PathBuf>) -> Result<String, Box<dyn Error>> {
    let config = match config_path {
        Some(path) => GraphConfig::load(&path)?,
        None => GraphConfig::default(),
    };
    let graph = NodeGraph::with_config(&config);

    let source_type = NodeType::new(NODE_NAMESPACE, "Constant").with_name("constant");
    let constants = [
        Node::new(&source_type, HeadlessView::new()),
        Node::new(&source_type, HeadlessView::new()),
    ];
    for (node, value) in constants.iter().zip([0.25, 0.75]) {
        node.create_property("value", value, PropertyOptions::default().with_range(0.0, 1.0))?;
        node.add_output("out", true, true)?;
        graph.add_node(node)?;
    }

    let mix = Node::new(&NodeType::new(NODE_NAMESPACE, "Mix").with_name("mix"), HeadlessView::new());
    mix.add_input("a", false, true)?;
    mix.add_input("b", false, true)?;
    mix.add_output("result", true, true)?;
    mix.add_combo_menu("mode", "Mode", &["add".to_string(), "multiply".to_string()])?;
    mix.create_property("note", "", PropertyOptions::of_type(PropertyType::Text))?;
    graph.add_node(&mix)?;

    let backdrop = Node::backdrop(HeadlessView::new())?;
    graph.add_node(&backdrop)?;

    let [first, second] = &constants;
    mix.set_input(0, &first.output(0).ok_or("constant has no output")?)?;
    mix.set_input(1, &second.output(0).ok_or("constant has no output")?)?;
    // Replaces the link from `second`
    mix.set_input(1, &first.output(0).ok_or("constant has no output")?)?;

    mix.set_property("mode", "multiply")?;
    second.set_property("value", 0.5)?;
    backdrop.set_size(400.0, 240.0)?;
    backdrop.set_text("mixing stage")?;

    let undone = graph.undo()?;
    tracing::info!("Undid {undone:?}");
    let redone = graph.redo()?;
    tracing::info!("Redid {redone:?}");

    let history = graph.undo_stack().stats();
    let summary = serde_json::json!({
        "undo_limit": config.undo_limit,
        "undo_count": history.undo_count,
        "next_undo": graph.undo_text(),
        "nodes": graph.serialize(),
    });
    Ok(serde_json::to_string_pretty(&summary)?)
}
