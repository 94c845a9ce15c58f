//! End-to-end orchestration scenarios: settlement permutations, timeout
//! triggers, partial failures, and teardown.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;
use std::time::{Duration, Instant};
use vitrine_asset::prelude::*;
use vitrine_asset::{AssetView, MaterialChannel, Settlement, UnitId};

/// Source that records begun fetches and settles nothing on its own;
/// tests push settlements through the sender in whatever order they
/// want to exercise.
struct ManualSource {
    begun: Rc<RefCell<Vec<(UnitId, String)>>>,
}

impl ManualSource {
    fn new() -> (Self, Rc<RefCell<Vec<(UnitId, String)>>>, Sender<Settlement>, Receiver<Settlement>) {
        let begun = Rc::new(RefCell::new(Vec::new()));
        let (tx, rx) = unbounded();
        (
            Self {
                begun: Rc::clone(&begun),
            },
            begun,
            tx,
            rx,
        )
    }
}

impl FetchSource for ManualSource {
    fn begin(&mut self, unit: UnitId, path: &str) {
        self.begun.borrow_mut().push((unit, path.to_string()));
    }
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([50, 60, 70, 255]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

const SHOWCASE_MANIFEST: &str = r#"[
    {"name": "logo", "type": "texture", "path": "img/logo.png"},
    {"name": "wood", "type": "material", "path": "materials/wood", "channels": {
        "base_color": {"map": "wood_bc.png"},
        "normal": "wood_n.png",
        "roughness": "wood_r.png"
    }}
]"#;

struct Harness {
    server: AssetServer,
    begun: Rc<RefCell<Vec<(UnitId, String)>>>,
    settle: Sender<Settlement>,
    progress_seen: Rc<RefCell<Vec<(usize, usize)>>>,
    ready_count: Rc<RefCell<usize>>,
}

impl Harness {
    fn new(manifest_json: &str) -> Self {
        let manifest = AssetManifest::from_json(manifest_json).unwrap();
        let (source, begun, settle, settlements) = ManualSource::new();
        let mut server = AssetServer::new(
            manifest,
            source,
            settlements,
            AssetServerConfig::default(),
        );

        let progress_seen = Rc::new(RefCell::new(Vec::new()));
        let progress = Rc::clone(&progress_seen);
        server.on_progress(move |settled, total| progress.borrow_mut().push((settled, total)));

        let ready_count = Rc::new(RefCell::new(0));
        let ready = Rc::clone(&ready_count);
        server.on_ready(move || *ready.borrow_mut() += 1);

        Self {
            server,
            begun,
            settle,
            progress_seen,
            ready_count,
        }
    }

    /// Unit ids in dispatch order, with the paths they fetch
    fn units(&self) -> Vec<(UnitId, String)> {
        self.begun.borrow().clone()
    }

    /// Settle one unit with bytes chosen by the test
    fn settle_ok(&self, unit: UnitId, bytes: Vec<u8>) {
        self.settle
            .send(Settlement {
                unit,
                bytes: Ok(bytes),
            })
            .unwrap();
    }

    fn settle_err(&self, unit: UnitId) {
        self.settle
            .send(Settlement {
                unit,
                bytes: Err(vitrine_asset::FetchError::NotFound("gone".to_string())),
            })
            .unwrap();
    }
}

fn assert_wood_material(server: &AssetServer, failed_channel: Option<&str>) {
    match server.get_item("wood") {
        Some(AssetView::Material(material)) => {
            for channel in ["normal", "roughness"] {
                let texture = material.texture(channel, None);
                if failed_channel == Some(channel) {
                    assert!(texture.is_none(), "channel {} should be empty", channel);
                    assert!(matches!(
                        material.channel(channel),
                        Some(MaterialChannel::Texture(None))
                    ));
                } else {
                    assert!(texture.is_some(), "channel {} should be loaded", channel);
                }
            }
            let base = material.texture("base_color", Some("map"));
            if failed_channel == Some("base_color") {
                assert!(base.is_none());
            } else {
                assert!(base.is_some());
            }
        }
        other => panic!("expected material view, got {:?}", other),
    }
}

#[test]
fn natural_completion_in_dispatch_order() {
    let t0 = Instant::now();
    let mut harness = Harness::new(SHOWCASE_MANIFEST);
    harness.server.load(t0);

    let units = harness.units();
    assert_eq!(units.len(), 4); // one texture + three material channels

    for (unit, _) in &units {
        harness.settle_ok(*unit, png_bytes());
    }
    harness.server.update(t0);

    assert_eq!(
        &*harness.progress_seen.borrow(),
        &[(1, 4), (2, 4), (3, 4), (4, 4)]
    );
    assert_eq!(*harness.ready_count.borrow(), 1);
    assert!(harness.server.is_ready());

    assert!(matches!(
        harness.server.get_item("logo"),
        Some(AssetView::Texture(_))
    ));
    assert_wood_material(&harness.server, None);
}

#[test]
fn settlement_order_does_not_change_outcome() {
    // Same manifest, same per-unit outcomes, opposite arrival orders:
    // the store must end up identical.
    for reversed in [false, true] {
        let t0 = Instant::now();
        let mut harness = Harness::new(SHOWCASE_MANIFEST);
        harness.server.load(t0);

        let mut units = harness.units();
        if reversed {
            units.reverse();
        }

        for (unit, path) in &units {
            if path.ends_with("wood_n.png") {
                harness.settle_err(*unit);
            } else {
                harness.settle_ok(*unit, png_bytes());
            }
        }
        harness.server.update(t0);

        assert!(harness.server.is_ready(), "reversed={}", reversed);
        assert_eq!(*harness.ready_count.borrow(), 1);
        assert!(harness.server.get_item("logo").is_some());
        assert_wood_material(&harness.server, Some("normal"));
    }
}

#[test]
fn zero_manifest_ready_is_asynchronous() {
    let t0 = Instant::now();
    let mut harness = Harness::new("[]");
    harness.server.load(t0);

    harness.server.update(t0);
    assert!(!harness.server.is_ready(), "ready must not fire with load");

    harness.server.update(t0 + Duration::from_millis(999));
    assert!(!harness.server.is_ready());

    harness.server.update(t0 + Duration::from_secs(1));
    assert!(harness.server.is_ready());
    assert_eq!(*harness.ready_count.borrow(), 1);
    assert!(harness.progress_seen.borrow().is_empty());
}

#[test]
fn safety_timeout_with_stuck_fetch() {
    let t0 = Instant::now();
    let mut harness = Harness::new(SHOWCASE_MANIFEST);
    harness.server.load(t0);

    let units = harness.units();
    // Every unit settles except the first material channel
    for (unit, path) in &units {
        if !path.ends_with("wood_bc.png") {
            harness.settle_ok(*unit, png_bytes());
        }
    }
    harness.server.update(t0 + Duration::from_secs(1));
    assert!(!harness.server.is_ready());
    assert_eq!(harness.server.progress(), (3, 4));

    harness.server.update(t0 + Duration::from_secs(29));
    assert!(!harness.server.is_ready());

    harness.server.update(t0 + Duration::from_secs(30));
    assert!(harness.server.is_ready());
    let (settled, total) = harness.server.progress();
    assert!(settled < total);

    // The straggler still runs to settlement: tolerated, joined into the
    // store, but no second ready and no further progress events.
    let events_before = harness.progress_seen.borrow().len();
    for (unit, path) in &units {
        if path.ends_with("wood_bc.png") {
            harness.settle_ok(*unit, png_bytes());
        }
    }
    harness.server.update(t0 + Duration::from_secs(31));

    assert_eq!(*harness.ready_count.borrow(), 1);
    assert_eq!(harness.progress_seen.borrow().len(), events_before);
    assert_eq!(harness.server.progress(), (4, 4));
    assert_wood_material(&harness.server, None);
}

#[test]
fn duplicate_settlements_are_ignored() {
    let t0 = Instant::now();
    let mut harness = Harness::new(SHOWCASE_MANIFEST);
    harness.server.load(t0);

    let units = harness.units();
    let first = units[0].0;
    harness.settle_ok(first, png_bytes());
    harness.settle_ok(first, png_bytes());
    harness.server.update(t0);
    assert_eq!(harness.server.progress(), (1, 4));

    for (unit, _) in &units[1..] {
        harness.settle_ok(*unit, png_bytes());
    }
    harness.server.update(t0);

    assert_eq!(harness.server.progress(), (4, 4));
    assert_eq!(*harness.ready_count.borrow(), 1);
    assert_eq!(
        &*harness.progress_seen.borrow(),
        &[(1, 4), (2, 4), (3, 4), (4, 4)]
    );
}

#[test]
fn ready_fires_once_across_triggers() {
    let t0 = Instant::now();
    let mut harness = Harness::new(SHOWCASE_MANIFEST);
    harness.server.load(t0);

    for (unit, _) in &harness.units() {
        harness.settle_ok(*unit, png_bytes());
    }
    harness.server.update(t0 + Duration::from_secs(5));
    assert!(harness.server.is_ready());

    // Drive the clock past every timeout; nothing fires again
    harness.server.update(t0 + Duration::from_secs(60));
    assert_eq!(*harness.ready_count.borrow(), 1);
}

#[test]
fn fetch_and_decode_failures_degrade_to_placeholders() {
    const MIXED_MANIFEST: &str = r#"[
        {"name": "sky", "type": "environment", "path": "env/sky.hdr", "format": "hdr"},
        {"name": "logo", "type": "texture", "path": "img/logo.png"}
    ]"#;

    let t0 = Instant::now();
    let mut harness = Harness::new(MIXED_MANIFEST);
    harness.server.load(t0);

    for (unit, path) in &harness.units() {
        if path.ends_with("sky.hdr") {
            // Fetch succeeds but the payload is not a decodable image
            harness.settle_ok(*unit, b"corrupt".to_vec());
        } else {
            harness.settle_ok(*unit, png_bytes());
        }
    }
    harness.server.update(t0);

    assert!(harness.server.is_ready());
    assert!(harness.server.get_item("sky").is_none());
    assert!(harness.server.get_item("logo").is_some());
}

#[test]
fn query_surface_reflects_manifest_order() {
    let t0 = Instant::now();
    let mut harness = Harness::new(SHOWCASE_MANIFEST);
    harness.server.load(t0);

    assert_eq!(
        harness.server.item_names_of_kind(AssetKindTag::Texture),
        vec!["logo"]
    );
    assert_eq!(
        harness.server.item_names_of_kind(AssetKindTag::Material),
        vec!["wood"]
    );
    assert!(harness
        .server
        .item_names_of_kind(AssetKindTag::Model)
        .is_empty());
}

#[test]
fn destroyed_server_observes_nothing() {
    let t0 = Instant::now();
    let mut harness = Harness::new(SHOWCASE_MANIFEST);
    harness.server.load(t0);

    let units = harness.units();
    harness.settle_ok(units[0].0, png_bytes());
    harness.server.update(t0);
    assert_eq!(*harness.progress_seen.borrow(), vec![(1, 4)]);

    harness.server.destroy();
    for (unit, _) in &units[1..] {
        let _ = harness.settle.send(Settlement {
            unit: *unit,
            bytes: Ok(png_bytes()),
        });
    }
    harness.server.update(t0 + Duration::from_secs(60));

    assert!(!harness.server.is_ready());
    assert_eq!(*harness.ready_count.borrow(), 0);
    assert_eq!(*harness.progress_seen.borrow(), vec![(1, 4)]);
    assert!(harness.server.get_item("logo").is_none());
}
