use anyhow::{Context, Result};
use clap::Parser;
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use parking_lot::Mutex;
use polyviz::cli::{default_layout, Cli, OBSTACLES_TOPIC, PATH_TOPIC};
use polyviz_core::{
    Color, DisplayContext, PropertyValue, RecordingScene, SharedScene, StatusLevel, TopicBus,
    VisualizationManager, ViewerConfig,
};
use polyviz_library::displays::builtin_registry;
use polyviz_library::messages::{Point2, Point3, Polygon, PolygonalMap, Polyline};
use polyviz_library::tf::{timestamp_now, SharedTfTree};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match &cli.config {
        Some(path) => ViewerConfig::load(path)
            .with_context(|| format!("loading viewer configuration {}", path.display()))?,
        None => default_layout(),
    };

    info!("Starting polyviz {}", polyviz::version());
    info!(
        fixed_frame = %config.fixed_frame,
        displays = config.displays.len(),
        "viewer configuration"
    );

    let recording = Arc::new(Mutex::new(RecordingScene::new()));
    let scene: SharedScene = recording.clone();
    let tf = SharedTfTree::new("map");
    tf.add_static_transform("map", "odom", Isometry3::translation(0.5, 0.0, 0.0))
        .context("building transform tree")?;
    let bus = Arc::new(TopicBus::new());
    let context = DisplayContext::new(
        scene,
        Arc::new(tf.clone()),
        Arc::clone(&bus),
        &config.fixed_frame,
    );

    let mut manager = VisualizationManager::from_config(context, builtin_registry(), &config)
        .context("creating displays")?;
    manager.set_property_observer(Some(Arc::new(|property: &str, value: &PropertyValue| {
        debug!(property, %value, "property changed");
    })));

    let running = Arc::new(AtomicBool::new(true));
    let workers = vec![
        spawn_broadcaster(tf.clone(), Arc::clone(&running)),
        spawn_publisher(Arc::clone(&bus), cli.publish_rate, Arc::clone(&running)),
    ];

    let rate = cli.rate.unwrap_or(manager.update_rate_hz()).max(1.0);
    let period = Duration::from_secs_f64(1.0 / rate);
    let deadline = Instant::now() + run_duration(cli.duration);
    let mut last_tick = Instant::now();
    let mut renders = 0u64;

    info!(rate_hz = rate, duration_s = cli.duration, "running");
    while Instant::now() < deadline {
        thread::sleep(period);
        let now = Instant::now();
        manager.update(now.duration_since(last_tick).as_secs_f64());
        last_tick = now;
        if manager.take_render_request() {
            renders += 1;
        }
    }

    running.store(false, Ordering::Release);
    for worker in workers {
        if worker.join().is_err() {
            warn!("worker thread panicked");
        }
    }

    for (name, status) in manager.display_statuses() {
        match status.level {
            StatusLevel::Ok => info!(display = %name, "status ok"),
            _ => warn!(display = %name, %status, "display status"),
        }
    }
    for topic in bus.topics() {
        if let Some(metrics) = bus.metrics(&topic) {
            info!(
                topic = %topic,
                published = metrics.messages_published,
                delivered = metrics.messages_delivered,
                "topic summary"
            );
        }
    }
    let (nodes, primitives) = {
        let scene = recording.lock();
        (scene.node_count(), scene.primitive_count())
    };
    info!(ticks = manager.tick_count(), renders, nodes, primitives, "finished");

    if let Some(path) = &cli.save {
        manager
            .to_config()
            .save(path)
            .with_context(|| format!("saving viewer configuration {}", path.display()))?;
        info!(path = %path.display(), "layout saved");
    }

    Ok(())
}

/// Longest run the runner accepts; larger or non-finite durations are capped
const MAX_RUN: Duration = Duration::from_secs(365 * 24 * 3600);

/// Transform history kept for dynamic frames
const TF_HISTORY: Duration = Duration::from_secs(10);

fn run_duration(seconds: f64) -> Duration {
    if seconds.is_nan() || seconds <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(seconds)
        .unwrap_or(MAX_RUN)
        .min(MAX_RUN)
}

/// Moves `base_link` around a circle in `odom`
fn spawn_broadcaster(tf: SharedTfTree, running: Arc<AtomicBool>) -> JoinHandle<()> {
    thread::spawn(move || {
        let start = Instant::now();
        let history = TF_HISTORY.as_nanos() as u64;
        while running.load(Ordering::Acquire) {
            let t = start.elapsed().as_secs_f64();
            let pose = Isometry3::from_parts(
                Translation3::new(t.cos(), t.sin(), 0.0),
                UnitQuaternion::from_axis_angle(
                    &Vector3::z_axis(),
                    t + std::f64::consts::FRAC_PI_2,
                ),
            );
            let now = timestamp_now();
            if let Err(e) = tf.add_transform("odom", "base_link", pose, now) {
                warn!(error = %e, "transform broadcast failed");
                return;
            }
            tf.prune_before(now.saturating_sub(history));
            thread::sleep(Duration::from_millis(20));
        }
    })
}

/// Publishes a rotating square obstacle field and a closed path
fn spawn_publisher(bus: Arc<TopicBus>, rate_hz: f64, running: Arc<AtomicBool>) -> JoinHandle<()> {
    let period = Duration::from_secs_f64(1.0 / rate_hz.max(0.1));
    thread::spawn(move || {
        let mut seq = 0u32;
        while running.load(Ordering::Acquire) {
            let angle = seq as f32 * 0.1;
            let result = bus
                .publish(OBSTACLES_TOPIC, obstacle_field(angle))
                .and_then(|_| bus.publish(PATH_TOPIC, patrol_path(angle)));
            if let Err(e) = result {
                warn!(error = %e, "publish failed");
                return;
            }
            seq = seq.wrapping_add(1);
            thread::sleep(period);
        }
    })
}

fn obstacle_field(angle: f32) -> PolygonalMap {
    let palette = [Color::RED, Color::GREEN, Color::BLUE];
    let polygons = palette
        .iter()
        .enumerate()
        .map(|(i, color)| {
            let center = (i as f32 * 2.0 - 2.0, 1.5);
            let corners = (0..4).map(|k| {
                let a = angle + k as f32 * std::f32::consts::FRAC_PI_2;
                Point3::new(center.0 + 0.5 * a.cos(), center.1 + 0.5 * a.sin(), 0.0)
            });
            Polygon::new(corners.collect()).with_color(*color)
        })
        .collect();
    PolygonalMap::new(polygons)
}

fn patrol_path(angle: f32) -> Polyline {
    let radius = 1.0 + 0.25 * angle.sin();
    let points = (0..6)
        .map(|k| {
            let a = k as f32 * std::f32::consts::TAU / 6.0;
            Point2::new(radius * a.cos(), radius * a.sin())
        })
        .collect();
    Polyline::new(points)
}
