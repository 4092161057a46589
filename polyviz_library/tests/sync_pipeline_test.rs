//! End-to-end tests of the message -> slot -> geometry -> scene pipeline

use approx::assert_relative_eq;
use nalgebra::{Isometry3, Point3 as P3, Vector3};
use parking_lot::Mutex;
use polyviz_core::{
    Color, Display, DisplayContext, NodeId, PropertyValue, RecordedNode, RecordingScene,
    SharedScene, StatusLevel, TopicBus, VizError,
};
use polyviz_library::displays::{PolygonalMapDisplay, PolylineDisplay, SyncOutcome};
use polyviz_library::messages::{Point2, Point3, Polygon, PolygonalMap, Polyline};
use polyviz_library::tf::SharedTfTree;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

struct Fixture {
    recording: Arc<Mutex<RecordingScene>>,
    tf: SharedTfTree,
    bus: Arc<TopicBus>,
    ctx: DisplayContext,
}

impl Fixture {
    fn new() -> Self {
        let recording = Arc::new(Mutex::new(RecordingScene::new()));
        let scene: SharedScene = recording.clone();
        let tf = SharedTfTree::new("map");
        let bus = Arc::new(TopicBus::new());
        let ctx = DisplayContext::new(scene, Arc::new(tf.clone()), Arc::clone(&bus), "map");
        Self {
            recording,
            tf,
            bus,
            ctx,
        }
    }

    fn node(&self, id: NodeId) -> RecordedNode {
        self.recording
            .lock()
            .node(id)
            .cloned()
            .expect("node should exist")
    }

    /// An enabled polygonal map display subscribed to `topic`
    fn map_display(&self, topic: &str) -> PolygonalMapDisplay {
        let mut display = PolygonalMapDisplay::new("polygons", &self.ctx).unwrap();
        display
            .set_property("Topic", PropertyValue::String(topic.to_string()))
            .unwrap();
        display.on_enable().unwrap();
        display
    }
}

fn two_segments() -> PolygonalMap {
    PolygonalMap::new(vec![
        Polygon::new(vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)])
            .with_color(Color::RED),
        Polygon::new(vec![Point3::new(0.0, 1.0, 0.0), Point3::new(0.0, 2.0, 0.0)])
            .with_color(Color::BLUE),
    ])
}

fn single_polygon(color: Color, points: usize) -> PolygonalMap {
    PolygonalMap::new(vec![Polygon::new(
        (0..points).map(|i| Point3::new(i as f32, 0.0, 0.0)).collect(),
    )
    .with_color(color)])
}

#[test]
fn test_lines_example() {
    let fx = Fixture::new();
    let mut display = fx.map_display("polygons");
    display
        .set_property("Alpha", PropertyValue::Float(0.5))
        .unwrap();

    fx.bus.publish("polygons", two_segments()).unwrap();
    display.update(0.03);

    let node = fx.node(display.controller().node());
    assert_eq!(node.line_strips.len(), 2);
    let strip0: Vec<_> = node.line_strips[0].iter().map(|v| (v.position, v.color)).collect();
    assert_eq!(
        strip0,
        vec![
            (P3::new(0.0, 0.0, 0.0), Color::RED.with_alpha(0.5)),
            (P3::new(1.0, 0.0, 0.0), Color::RED.with_alpha(0.5)),
        ]
    );
    let strip1: Vec<_> = node.line_strips[1].iter().map(|v| (v.position, v.color)).collect();
    assert_eq!(
        strip1,
        vec![
            (P3::new(0.0, 1.0, 0.0), Color::BLUE.with_alpha(0.5)),
            (P3::new(0.0, 2.0, 0.0), Color::BLUE.with_alpha(0.5)),
        ]
    );
    assert!(node.points.is_empty());
    assert!(node.vertex_estimates.ends_with(&[2, 2]));
    assert!(display.status().is_ok());
}

#[test]
fn test_points_example() {
    let fx = Fixture::new();
    let mut display = fx.map_display("polygons");
    display
        .set_property("Render Operation", PropertyValue::Enum("Points".to_string()))
        .unwrap();
    display
        .set_property("Override Color", PropertyValue::Bool(true))
        .unwrap();
    display
        .set_property("Color", PropertyValue::Color(Color::GREEN))
        .unwrap();

    fx.bus.publish("polygons", two_segments()).unwrap();
    display.update(0.03);

    let node = fx.node(display.controller().node());
    assert!(node.line_strips.is_empty());
    assert_eq!(node.point_size, 0.05);
    let positions: Vec<_> = node.points.iter().map(|v| v.position).collect();
    assert_eq!(
        positions,
        vec![
            P3::new(0.0, 0.0, 0.0),
            P3::new(1.0, 0.0, 0.0),
            P3::new(0.0, 1.0, 0.0),
            P3::new(0.0, 2.0, 0.0),
        ]
    );
    assert!(node
        .points
        .iter()
        .all(|v| v.color == Color::GREEN.with_alpha(1.0)));
}

#[test]
fn test_no_message_is_a_noop() {
    let fx = Fixture::new();
    let mut display = fx.map_display("polygons");
    let before = fx.node(display.controller().node());

    let outcome = display.controller_mut().synchronize().unwrap();
    assert_eq!(outcome, SyncOutcome::NoMessage);
    assert_eq!(fx.node(display.controller().node()), before);
    assert_eq!(display.controller().pass_count(), 0);
}

#[test]
fn test_latest_message_wins() {
    let fx = Fixture::new();
    let mut display = fx.map_display("polygons");

    fx.bus.publish("polygons", single_polygon(Color::RED, 2)).unwrap();
    fx.bus.publish("polygons", single_polygon(Color::GREEN, 3)).unwrap();
    fx.bus.publish("polygons", single_polygon(Color::BLUE, 4)).unwrap();
    display.update(0.03);

    let slot = display.controller().slot();
    assert_eq!(slot.delivered(), 3);
    assert_eq!(slot.overwritten(), 2);
    assert!(!slot.has_pending());

    let node = fx.node(display.controller().node());
    assert_eq!(node.line_strips.len(), 1);
    assert_eq!(node.line_strips[0].len(), 4);
    assert!(node.line_strips[0].iter().all(|v| v.color.rgb() == Color::BLUE));
    assert_eq!(display.controller().pass_count(), 1);
}

#[test]
fn test_tick_without_new_data_does_not_recommit() {
    let fx = Fixture::new();
    let mut display = fx.map_display("polygons");
    fx.bus.publish("polygons", two_segments()).unwrap();

    display.update(0.03);
    display.update(0.03);
    display.update(0.03);
    assert_eq!(display.controller().pass_count(), 1);
}

#[test]
fn test_synchronize_is_idempotent() {
    let fx = Fixture::new();
    let mut display = fx.map_display("polygons");
    fx.bus.publish("polygons", two_segments()).unwrap();

    display.controller_mut().synchronize().unwrap();
    let first = fx.node(display.controller().node());
    display.controller_mut().synchronize().unwrap();
    let second = fx.node(display.controller().node());

    assert_eq!(first.line_strips, second.line_strips);
    assert_eq!(first.points, second.points);
    assert_eq!(first.position, second.position);
    assert_eq!(first.orientation, second.orientation);
}

#[test]
fn test_property_edit_recomputes_immediately() {
    let fx = Fixture::new();
    let mut display = fx.map_display("polygons");
    fx.bus.publish("polygons", two_segments()).unwrap();
    display.update(0.03);
    fx.ctx.take_render_request();

    display
        .set_property("Alpha", PropertyValue::Float(0.25))
        .unwrap();

    let node = fx.node(display.controller().node());
    assert!(node.strip_vertices().all(|v| v.color.a == 0.25));
    assert!(fx.ctx.take_render_request());
}

#[test]
fn test_edits_while_disabled_are_deferred() {
    let fx = Fixture::new();
    let mut display = PolygonalMapDisplay::new("polygons", &fx.ctx).unwrap();
    display
        .set_property("Topic", PropertyValue::String("polygons".to_string()))
        .unwrap();
    display
        .set_property("Z Position", PropertyValue::Float(2.0))
        .unwrap();

    assert_eq!(fx.bus.subscriber_count("polygons"), 0);
    assert_eq!(display.controller().pass_count(), 0);

    display.on_enable().unwrap();
    fx.bus.publish("polygons", two_segments()).unwrap();
    display.update(0.03);

    let node = fx.node(display.controller().node());
    assert_relative_eq!(node.position, Vector3::new(0.0, 0.0, 2.0), epsilon = 1e-6);
}

#[test]
fn test_disable_clears_and_unsubscribes() {
    let fx = Fixture::new();
    let mut display = fx.map_display("polygons");
    fx.bus.publish("polygons", two_segments()).unwrap();
    display.update(0.03);
    let id = display.controller().node();
    assert!(!fx.node(id).is_empty());

    display.on_disable();
    let node = fx.node(id);
    assert!(node.is_empty());
    assert!(!node.visible);
    assert_eq!(fx.bus.subscriber_count("polygons"), 0);

    // Messages published while disabled are never seen
    fx.bus.publish("polygons", two_segments()).unwrap();
    display.on_enable().unwrap();
    display.update(0.03);
    assert!(fx.node(id).is_empty());
    assert!(fx.node(id).visible);

    fx.bus.publish("polygons", two_segments()).unwrap();
    display.update(0.03);
    assert_eq!(fx.node(id).line_strips.len(), 2);
}

#[test]
fn test_missing_transform_falls_back_to_identity() {
    let fx = Fixture::new();
    fx.ctx.set_fixed_frame("odom");
    let mut display = fx.map_display("polygons");
    display
        .set_property("Z Position", PropertyValue::Float(0.5))
        .unwrap();

    fx.bus.publish("polygons", two_segments()).unwrap();
    display.update(0.03);

    let node = fx.node(display.controller().node());
    assert_eq!(node.line_strips.len(), 2);
    assert_relative_eq!(node.position, Vector3::new(0.0, 0.0, 0.5), epsilon = 1e-6);
    assert_eq!(node.orientation, nalgebra::UnitQuaternion::identity());

    let status = display.status();
    assert_eq!(status.level, StatusLevel::Warn);
    assert!(status.message.contains("odom"));
}

#[test]
fn test_resolved_transform_places_geometry() {
    let fx = Fixture::new();
    fx.tf
        .add_static_transform("map", "odom", Isometry3::translation(1.0, 0.0, 0.0))
        .unwrap();
    fx.ctx.set_fixed_frame("odom");
    let mut display = fx.map_display("polygons");
    display
        .set_property("Z Position", PropertyValue::Float(0.5))
        .unwrap();

    fx.bus.publish("polygons", two_segments()).unwrap();
    let outcome = display.controller_mut().synchronize().unwrap();
    assert_eq!(
        outcome,
        SyncOutcome::Committed {
            transform_resolved: true
        }
    );

    let node = fx.node(display.controller().node());
    assert_relative_eq!(node.position, Vector3::new(-1.0, 0.0, 0.5), epsilon = 1e-6);
    assert!(display.status().is_ok());
}

#[test]
fn test_status_recovers_once_transform_appears() {
    let fx = Fixture::new();
    fx.ctx.set_fixed_frame("odom");
    let mut display = fx.map_display("polygons");
    fx.bus.publish("polygons", two_segments()).unwrap();
    display.update(0.03);
    assert_eq!(display.status().level, StatusLevel::Warn);

    fx.tf
        .add_static_transform("map", "odom", Isometry3::translation(0.0, 3.0, 0.0))
        .unwrap();
    display.controller_mut().synchronize().unwrap();
    assert!(display.status().is_ok());
    let node = fx.node(display.controller().node());
    assert_relative_eq!(node.position, Vector3::new(0.0, -3.0, 0.0), epsilon = 1e-6);
}

#[test]
fn test_malformed_message_keeps_previous_geometry() {
    let fx = Fixture::new();
    let mut display = fx.map_display("polygons");
    fx.bus.publish("polygons", two_segments()).unwrap();
    display.update(0.03);
    let good = fx.node(display.controller().node());

    let broken = PolygonalMap::new(vec![Polygon::new(vec![Point3::new(
        f32::NAN,
        0.0,
        0.0,
    )])]);
    fx.bus.publish("polygons", broken).unwrap();
    display.update(0.03);

    let node = fx.node(display.controller().node());
    assert_eq!(node.line_strips, good.line_strips);
    assert_eq!(display.status().level, StatusLevel::Error);
    assert!(!display.controller().slot().has_pending());

    fx.bus.publish("polygons", two_segments()).unwrap();
    display.update(0.03);
    assert!(display.status().is_ok());
}

#[test]
fn test_topic_change_resubscribes_and_clears() {
    let fx = Fixture::new();
    let mut display = fx.map_display("a");
    fx.bus.publish("a", two_segments()).unwrap();
    display.update(0.03);
    let id = display.controller().node();
    assert!(!fx.node(id).is_empty());

    display
        .set_property("Topic", PropertyValue::String("b".to_string()))
        .unwrap();
    assert!(fx.node(id).is_empty());
    assert_eq!(fx.bus.subscriber_count("a"), 0);
    assert_eq!(fx.bus.subscriber_count("b"), 1);

    fx.bus.publish("a", two_segments()).unwrap();
    display.update(0.03);
    assert!(fx.node(id).is_empty());

    fx.bus.publish("b", single_polygon(Color::WHITE, 3)).unwrap();
    display.update(0.03);
    assert_eq!(fx.node(id).line_strips.len(), 1);
}

#[test]
fn test_empty_topic_is_not_subscribed() {
    let fx = Fixture::new();
    let mut display = PolygonalMapDisplay::new("polygons", &fx.ctx).unwrap();
    display.on_enable().unwrap();

    assert!(display.is_enabled());
    assert!(!display.controller().is_subscribed());
    assert!(fx.bus.topics().is_empty());
}

#[test]
fn test_topic_type_mismatch_is_reported() {
    let fx = Fixture::new();
    fx.bus
        .publish("line", Polyline::new(vec![Point2::new(0.0, 0.0)]))
        .unwrap();

    let mut display = fx.map_display("");
    let err = display
        .set_property("Topic", PropertyValue::String("line".to_string()))
        .unwrap_err();
    assert!(matches!(err, VizError::TopicTypeMismatch { .. }));
    assert_eq!(display.status().level, StatusLevel::Error);
}

#[test]
fn test_node_allocation_failure_is_fatal() {
    let fx = Fixture::new();
    fx.recording.lock().set_fail_node_creation(true);
    let err = PolygonalMapDisplay::new("polygons", &fx.ctx).err().unwrap();
    assert!(matches!(err, VizError::Scene(_)));
}

#[test]
fn test_drop_releases_everything() {
    let fx = Fixture::new();
    let display = fx.map_display("polygons");
    let id = display.controller().node();
    assert_eq!(fx.bus.subscriber_count("polygons"), 1);

    drop(display);
    assert_eq!(fx.bus.subscriber_count("polygons"), 0);
    assert!(fx.recording.lock().destroyed().contains(&id));
    assert!(fx.recording.lock().node(id).is_none());
}

#[test]
fn test_fixed_frame_change_clears_geometry() {
    let fx = Fixture::new();
    let mut display = fx.map_display("polygons");
    fx.bus.publish("polygons", two_segments()).unwrap();
    display.update(0.03);

    fx.ctx.set_fixed_frame("odom");
    display.fixed_frame_changed();
    let id = display.controller().node();
    assert!(fx.node(id).is_empty());
    assert!(fx.ctx.take_render_request());

    // The tick does not redraw the old message on its own
    display.update(0.03);
    assert!(fx.node(id).is_empty());

    // A property edit redraws the retained message in the new frame
    display
        .set_property("Alpha", PropertyValue::Float(0.5))
        .unwrap();
    assert_eq!(fx.node(id).line_strips.len(), 2);
    assert_eq!(display.status().level, StatusLevel::Warn);
}

#[test]
fn test_in_flight_delivery_does_not_survive_disable() {
    let fx = Fixture::new();
    let entered = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));

    // Registered ahead of the display so a publish reaches it first and
    // holds the display's already-collected callback in flight.
    {
        let entered = Arc::clone(&entered);
        let release = Arc::clone(&release);
        let armed = Arc::new(AtomicBool::new(true));
        fx.bus
            .subscribe::<PolygonalMap, _>("polygons", move |_| {
                if armed.swap(false, Ordering::AcqRel) {
                    entered.wait();
                    release.wait();
                }
            })
            .unwrap();
    }

    let mut display = fx.map_display("polygons");
    let id = display.controller().node();
    let producer = {
        let bus = Arc::clone(&fx.bus);
        thread::spawn(move || {
            bus.publish("polygons", two_segments()).unwrap();
        })
    };

    entered.wait();
    display.on_disable();
    release.wait();
    producer.join().unwrap();

    assert!(display.controller().slot().is_empty());
    assert!(!display.controller().slot().has_pending());

    display.on_enable().unwrap();
    assert!(fx.node(id).is_empty());
    assert_eq!(
        display.controller_mut().synchronize().unwrap(),
        SyncOutcome::NoMessage
    );
    assert!(fx.node(id).is_empty());
}

#[test]
fn test_polyline_loop_in_lines_mode_only() {
    let fx = Fixture::new();
    let mut display = PolylineDisplay::new("path", &fx.ctx).unwrap();
    display
        .set_property("Topic", PropertyValue::String("path".to_string()))
        .unwrap();
    display.set_property("Loop", PropertyValue::Bool(true)).unwrap();
    display.on_enable().unwrap();

    let line = Polyline::new(vec![
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(1.0, 1.0),
    ])
    .with_color(Color::RED);
    fx.bus.publish("path", line).unwrap();
    display.update(0.03);

    let id = display.controller().node();
    let strip = &fx.node(id).line_strips[0];
    assert_eq!(strip.len(), 4);
    assert_eq!(strip[3].position, strip[0].position);

    display
        .set_property("Render Operation", PropertyValue::Enum("Points".to_string()))
        .unwrap();
    assert_eq!(fx.node(id).points.len(), 3);
}

#[test]
fn test_concurrent_producer_never_tears() {
    let fx = Fixture::new();
    let mut display = fx.map_display("polygons");
    let palette = [Color::RED, Color::GREEN, Color::BLUE, Color::WHITE];
    let total = 200;

    let bus = Arc::clone(&fx.bus);
    let producer = thread::spawn(move || {
        for i in 0..total {
            let color = palette[i % palette.len()];
            let polygons = (0..(i % 5) + 1)
                .map(|_| Polygon::new(vec![Point3::default(), Point3::new(1.0, 1.0, 0.0)]).with_color(color))
                .collect();
            bus.publish("polygons", PolygonalMap::new(polygons)).unwrap();
        }
    });

    let id = display.controller().node();
    while !producer.is_finished() {
        display.update(0.001);
        let node = fx.node(id);
        // Every committed batch comes from exactly one message
        let first = node.strip_vertices().next().map(|v| v.color);
        if let Some(color) = first {
            assert!(node.strip_vertices().all(|v| v.color == color));
        }
    }
    producer.join().unwrap();
    display.update(0.001);

    let node = fx.node(id);
    assert_eq!(node.line_strips.len(), ((total - 1) % 5) + 1);
    assert!(node
        .strip_vertices()
        .all(|v| v.color.rgb() == palette[(total - 1) % palette.len()]));
    assert_eq!(display.controller().slot().delivered(), total as u64);
}
