//! Asset manifest preview
//!
//! Loads a JSON asset manifest, drives the asset server until ready, and
//! prints what was loaded.
//!
//! Usage: cargo run -p asset-preview <manifest.json>

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use vitrine_asset::prelude::*;
use vitrine_asset::{AssetView, DiskSource};

fn main() {
    env_logger::init();

    let manifest_path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("usage: asset-preview <manifest.json>");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(&manifest_path) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(manifest_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(manifest_path)?;
    let manifest = AssetManifest::from_json(&json)?;

    // Asset paths resolve against the manifest's directory
    let root = Path::new(manifest_path)
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    let (source, settlements) = DiskSource::spawn(root);
    let mut server = AssetServer::new(manifest, source, settlements, AssetServerConfig::default());

    server.on_progress(|settled, total| {
        let percent = if total == 0 {
            100
        } else {
            settled * 100 / total
        };
        println!("loading: {:>3}% ({}/{})", percent, settled, total);
    });

    let ready = Rc::new(Cell::new(false));
    let ready_flag = Rc::clone(&ready);
    server.on_ready(move || ready_flag.set(true));

    server.load(Instant::now());
    while !ready.get() {
        server.update(Instant::now());
        std::thread::sleep(Duration::from_millis(16));
    }

    println!("ready");
    for tag in [
        AssetKindTag::Texture,
        AssetKindTag::Environment,
        AssetKindTag::Model,
        AssetKindTag::Material,
    ] {
        let names: Vec<String> = server
            .item_names_of_kind(tag)
            .into_iter()
            .map(str::to_string)
            .collect();
        for name in names {
            match server.get_item(&name) {
                Some(view) => println!("  {:<24} {}", name, describe(&view)),
                None => println!("  {:<24} (failed)", name),
            }
        }
    }

    server.destroy();
    Ok(())
}

fn describe(view: &AssetView<'_>) -> String {
    match view {
        AssetView::Texture(t) | AssetView::Environment(t) => {
            format!("texture {}x{} ({:?})", t.width, t.height, t.format)
        }
        AssetView::Model(m) => format!(
            "model: {} meshes, {} materials, {} nodes",
            m.meshes.len(),
            m.materials.len(),
            m.nodes.len()
        ),
        AssetView::Material(m) => format!("material: {} channels", m.channels.len()),
        AssetView::ModelMaterial(m) => format!("material \"{}\" (from model)", m.name),
    }
}
