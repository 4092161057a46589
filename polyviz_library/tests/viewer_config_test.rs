//! Viewer configuration driving the built-in displays through the manager

use parking_lot::Mutex;
use polyviz_core::{
    Color, DisplayContext, PropertyValue, RecordingScene, SharedScene, TopicBus,
    VisualizationManager, ViewerConfig, VizError,
};
use polyviz_library::displays::builtin_registry;
use polyviz_library::messages::{Point3, Polygon, PolygonalMap};
use polyviz_library::tf::SharedTfTree;
use std::sync::Arc;
use tempfile::tempdir;

const LAYOUT: &str = r#"
fixed_frame: map
update_rate_hz: 20.0
displays:
  - type: PolygonalMap
    name: obstacles
    properties:
      Topic: obstacles
      Color: [1.0, 0.0, 0.0]
      Render Operation: Points
      Alpha: 0.5
  - type: Polyline
    name: path
    enabled: false
    properties:
      Topic: path
      Loop: true
  - type: Axes
    name: origin
    properties:
      Length: 2.0
"#;

fn context() -> (Arc<Mutex<RecordingScene>>, Arc<TopicBus>, DisplayContext) {
    let recording = Arc::new(Mutex::new(RecordingScene::new()));
    let scene: SharedScene = recording.clone();
    let bus = Arc::new(TopicBus::new());
    let ctx = DisplayContext::new(
        scene,
        Arc::new(SharedTfTree::new("map")),
        Arc::clone(&bus),
        "map",
    );
    (recording, bus, ctx)
}

fn manager_from(yaml: &str) -> (Arc<Mutex<RecordingScene>>, Arc<TopicBus>, VisualizationManager) {
    let (recording, bus, ctx) = context();
    let config = ViewerConfig::from_yaml_str(yaml).unwrap();
    let manager = VisualizationManager::from_config(ctx, builtin_registry(), &config).unwrap();
    (recording, bus, manager)
}

#[test]
fn test_layout_is_applied() {
    let (recording, bus, manager) = manager_from(LAYOUT);

    assert_eq!(manager.display_names(), vec!["obstacles", "path", "origin"]);
    assert_eq!(manager.update_rate_hz(), 20.0);
    assert_eq!(recording.lock().node_count(), 3);

    assert_eq!(
        manager.get_property("obstacles", "Render Operation").unwrap(),
        PropertyValue::Enum("Points".to_string())
    );
    assert_eq!(
        manager.get_property("obstacles", "Color").unwrap(),
        PropertyValue::Color(Color::RED)
    );
    assert_eq!(
        manager.get_property("path", "Loop").unwrap(),
        PropertyValue::Bool(true)
    );
    assert_eq!(
        manager.get_property("origin", "Length").unwrap(),
        PropertyValue::Float(2.0)
    );

    assert!(manager.display("obstacles").unwrap().is_enabled());
    assert!(!manager.display("path").unwrap().is_enabled());
    assert_eq!(bus.subscriber_count("obstacles"), 1);
    assert_eq!(bus.subscriber_count("path"), 0);
}

#[test]
fn test_published_map_reaches_scene() {
    let (recording, bus, mut manager) = manager_from(LAYOUT);
    manager.take_render_request();

    let map = PolygonalMap::new(vec![Polygon::new(vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
    ])]);
    bus.publish("obstacles", map).unwrap();
    manager.update(0.05);

    assert!(manager.take_render_request());
    let scene = recording.lock();
    let points: Vec<_> = scene
        .nodes()
        .flat_map(|(_, node)| node.points.iter())
        .collect();
    assert_eq!(points.len(), 3);
    assert!(points.iter().all(|v| v.color == Color::RED.with_alpha(0.5)));
    assert!(manager.display_statuses().iter().all(|(_, s)| s.is_ok()));
}

#[test]
fn test_round_trip_through_file() {
    let (_recording, _bus, manager) = manager_from(LAYOUT);
    let exported = manager.to_config();

    let dir = tempdir().unwrap();
    let path = dir.path().join("layouts").join("viewer.yaml");
    exported.save(&path).unwrap();
    let loaded = ViewerConfig::load(&path).unwrap();
    assert_eq!(loaded, exported);

    let (_recording, _bus, rebuilt) = manager_from(&loaded.to_yaml_string().unwrap());
    for name in manager.display_names() {
        let display = manager.display(&name).unwrap();
        for descriptor in display.property_descriptors() {
            assert_eq!(
                rebuilt.get_property(&name, descriptor.name).unwrap(),
                display.get_property(descriptor.name).unwrap(),
                "{}.{}",
                name,
                descriptor.name
            );
        }
    }
}

#[test]
fn test_unknown_display_type() {
    let (_recording, _bus, ctx) = context();
    let config = ViewerConfig::from_yaml_str("displays:\n  - type: Marker\n    name: m\n").unwrap();
    let err = VisualizationManager::from_config(ctx, builtin_registry(), &config)
        .err()
        .unwrap();
    assert!(matches!(err, VizError::UnknownDisplayType(ref t) if t == "Marker"));
}

#[test]
fn test_bad_property_value() {
    let (_recording, _bus, ctx) = context();
    let yaml = "displays:\n  - type: PolygonalMap\n    name: m\n    properties:\n      Alpha: high\n";
    let config = ViewerConfig::from_yaml_str(yaml).unwrap();
    let err = VisualizationManager::from_config(ctx, builtin_registry(), &config)
        .err()
        .unwrap();
    assert!(matches!(err, VizError::PropertyType { ref property, .. } if property == "Alpha"));
}

#[test]
fn test_missing_file() {
    let dir = tempdir().unwrap();
    let err = ViewerConfig::load(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, VizError::Io(_)));
}
