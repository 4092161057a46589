//! Visualization manager
//!
//! Owns every display of a viewer as a `Box<dyn Display>` and drives their
//! lifecycle: enable/disable, fixed-frame changes, reset and the periodic
//! update tick. Display kinds are instantiated by name through a
//! [`DisplayRegistry`].

use crate::core::{
    Display, DisplayContext, DisplayStatus, PropertyObserver, PropertyValue,
};
use crate::error::{VizError, VizResult};
use crate::params::{DisplayEntry, ViewerConfig};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Constructor for one display kind: `(instance name, context) -> display`
pub type DisplayFactory =
    Box<dyn Fn(&str, &DisplayContext) -> VizResult<Box<dyn Display>> + Send + Sync>;

struct RegisteredKind {
    description: &'static str,
    factory: DisplayFactory,
}

/// Display kinds known to a viewer, keyed by type name
#[derive(Default)]
pub struct DisplayRegistry {
    kinds: BTreeMap<String, RegisteredKind>,
}

impl fmt::Debug for DisplayRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds.keys()).finish()
    }
}

impl DisplayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a display kind
    pub fn register<F>(&mut self, type_name: &str, description: &'static str, factory: F)
    where
        F: Fn(&str, &DisplayContext) -> VizResult<Box<dyn Display>> + Send + Sync + 'static,
    {
        self.kinds.insert(
            type_name.to_string(),
            RegisteredKind {
                description,
                factory: Box::new(factory),
            },
        );
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.kinds.contains_key(type_name)
    }

    /// Registered type names, sorted
    pub fn types(&self) -> Vec<&str> {
        self.kinds.keys().map(String::as_str).collect()
    }

    pub fn description(&self, type_name: &str) -> Option<&'static str> {
        self.kinds.get(type_name).map(|k| k.description)
    }

    pub fn create(
        &self,
        type_name: &str,
        name: &str,
        context: &DisplayContext,
    ) -> VizResult<Box<dyn Display>> {
        let kind = self
            .kinds
            .get(type_name)
            .ok_or_else(|| VizError::UnknownDisplayType(type_name.to_string()))?;
        (kind.factory)(name, context)
    }
}

/// Host driver holding the displays of one viewer in insertion order
pub struct VisualizationManager {
    context: DisplayContext,
    registry: DisplayRegistry,
    displays: Vec<Box<dyn Display>>,
    observer: Option<PropertyObserver>,
    update_rate_hz: f64,
    ticks: u64,
}

impl VisualizationManager {
    pub fn new(context: DisplayContext, registry: DisplayRegistry) -> Self {
        Self {
            context,
            registry,
            displays: Vec::new(),
            observer: None,
            update_rate_hz: 30.0,
            ticks: 0,
        }
    }

    /// Build a manager and every display named in `config`
    pub fn from_config(
        context: DisplayContext,
        registry: DisplayRegistry,
        config: &ViewerConfig,
    ) -> VizResult<Self> {
        let mut manager = Self::new(context, registry);
        manager.apply_config(config)?;
        Ok(manager)
    }

    pub fn context(&self) -> &DisplayContext {
        &self.context
    }

    pub fn registry(&self) -> &DisplayRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DisplayRegistry {
        &mut self.registry
    }

    pub fn update_rate_hz(&self) -> f64 {
        self.update_rate_hz
    }

    /// Number of update ticks driven so far
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Observer receiving `"<display>.<property>"` for every property change
    pub fn set_property_observer(&mut self, observer: Option<PropertyObserver>) {
        self.observer = observer;
        for display in self.displays.iter_mut() {
            let scoped = scoped_observer(self.observer.as_ref(), display.name());
            display.set_property_observer(scoped);
        }
    }

    /// Take ownership of an already constructed display
    pub fn add_display(&mut self, mut display: Box<dyn Display>) -> VizResult<()> {
        if self.display(display.name()).is_some() {
            return Err(VizError::DuplicateDisplay(display.name().to_string()));
        }
        let scoped = scoped_observer(self.observer.as_ref(), display.name());
        display.set_property_observer(scoped);
        let name = display.name();
        let kind = display.type_name();
        info!(display = name, kind, "display added");
        self.displays.push(display);
        Ok(())
    }

    /// Instantiate a registered display kind and add it (disabled)
    pub fn create_display(&mut self, type_name: &str, name: &str) -> VizResult<()> {
        if self.display(name).is_some() {
            return Err(VizError::DuplicateDisplay(name.to_string()));
        }
        let display = self.registry.create(type_name, name, &self.context)?;
        self.add_display(display)
    }

    /// Disable and drop a display
    pub fn remove_display(&mut self, name: &str) -> VizResult<()> {
        let index = self.index_of(name)?;
        let mut display = self.displays.remove(index);
        if display.is_enabled() {
            display.on_disable();
        }
        info!(display = name, "display removed");
        drop(display);
        self.context.request_render();
        Ok(())
    }

    pub fn display(&self, name: &str) -> Option<&dyn Display> {
        self.displays
            .iter()
            .find(|d| d.name() == name)
            .map(|d| d.as_ref())
    }

    pub fn display_mut(&mut self, name: &str) -> Option<&mut (dyn Display + 'static)> {
        self.displays
            .iter_mut()
            .find(|d| d.name() == name)
            .map(|d| d.as_mut())
    }

    /// Display names in insertion order
    pub fn display_names(&self) -> Vec<String> {
        self.displays.iter().map(|d| d.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.displays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.displays.is_empty()
    }

    fn index_of(&self, name: &str) -> VizResult<usize> {
        self.displays
            .iter()
            .position(|d| d.name() == name)
            .ok_or_else(|| VizError::DisplayNotFound(name.to_string()))
    }

    pub fn set_display_enabled(&mut self, name: &str, enabled: bool) -> VizResult<()> {
        let index = self.index_of(name)?;
        let display = &mut self.displays[index];
        if display.is_enabled() == enabled {
            return Ok(());
        }
        if enabled {
            display.on_enable()?;
        } else {
            display.on_disable();
        }
        info!(display = name, enabled, "display toggled");
        self.context.request_render();
        Ok(())
    }

    pub fn fixed_frame(&self) -> String {
        self.context.fixed_frame()
    }

    /// Change the viewer's fixed frame and notify every display
    pub fn set_fixed_frame(&mut self, frame: &str) {
        if self.context.fixed_frame() == frame {
            return;
        }
        self.context.set_fixed_frame(frame);
        info!(fixed_frame = frame, "fixed frame changed");
        for display in &mut self.displays {
            display.fixed_frame_changed();
        }
        self.context.request_render();
    }

    /// Periodic tick for every enabled display
    pub fn update(&mut self, dt: f64) {
        self.ticks += 1;
        for display in self.displays.iter_mut().filter(|d| d.is_enabled()) {
            display.update(dt);
        }
    }

    /// Reset every display
    pub fn reset(&mut self) {
        debug!(displays = self.displays.len(), "resetting displays");
        for display in &mut self.displays {
            display.reset();
        }
        self.context.request_render();
    }

    pub fn get_property(&self, display: &str, property: &str) -> VizResult<PropertyValue> {
        self.display(display)
            .ok_or_else(|| VizError::DisplayNotFound(display.to_string()))?
            .get_property(property)
    }

    pub fn set_property(
        &mut self,
        display: &str,
        property: &str,
        value: PropertyValue,
    ) -> VizResult<()> {
        self.display_mut(display)
            .ok_or_else(|| VizError::DisplayNotFound(display.to_string()))?
            .set_property(property, value)
    }

    /// Consume the "render owed" flag raised by passes and edits
    pub fn take_render_request(&self) -> bool {
        self.context.take_render_request()
    }

    /// `(name, status)` for every display in insertion order
    pub fn display_statuses(&self) -> Vec<(String, DisplayStatus)> {
        self.displays
            .iter()
            .map(|d| (d.name().to_string(), d.status()))
            .collect()
    }

    /// Create the displays of `config`, apply their properties, then enable them
    pub fn apply_config(&mut self, config: &ViewerConfig) -> VizResult<()> {
        self.set_fixed_frame(&config.fixed_frame);
        self.update_rate_hz = config.update_rate_hz;

        for entry in &config.displays {
            self.create_display(&entry.kind, &entry.name)?;
            self.apply_entry_properties(entry)?;
            if entry.enabled {
                self.set_display_enabled(&entry.name, true)?;
            }
        }
        Ok(())
    }

    fn apply_entry_properties(&mut self, entry: &DisplayEntry) -> VizResult<()> {
        let display = self
            .display_mut(&entry.name)
            .ok_or_else(|| VizError::DisplayNotFound(entry.name.clone()))?;
        let descriptors = display.property_descriptors();

        for (name, raw) in &entry.properties {
            let descriptor = descriptors
                .iter()
                .find(|d| d.name == name.as_str())
                .ok_or_else(|| VizError::UnknownProperty(name.clone()))?;
            let value = PropertyValue::from_json(name, &descriptor.kind, raw)?;
            display.set_property(name, value)?;
        }
        Ok(())
    }

    /// Snapshot the current layout, including every property value
    pub fn to_config(&self) -> ViewerConfig {
        let displays = self
            .displays
            .iter()
            .map(|display| {
                let mut entry = DisplayEntry::new(display.type_name(), display.name());
                entry.enabled = display.is_enabled();
                for descriptor in display.property_descriptors() {
                    match display.get_property(descriptor.name) {
                        Ok(value) => {
                            entry
                                .properties
                                .insert(descriptor.name.to_string(), value.to_json());
                        }
                        Err(e) => {
                            let name = display.name();
                            warn!(display = name, error = %e, "property not exported");
                        }
                    }
                }
                entry
            })
            .collect();

        ViewerConfig {
            fixed_frame: self.context.fixed_frame(),
            update_rate_hz: self.update_rate_hz,
            displays,
        }
    }
}

impl Drop for VisualizationManager {
    fn drop(&mut self) {
        for display in self.displays.iter_mut().filter(|d| d.is_enabled()) {
            display.on_disable();
        }
    }
}

fn scoped_observer(observer: Option<&PropertyObserver>, display: &str) -> Option<PropertyObserver> {
    let observer = Arc::clone(observer?);
    let display = display.to_string();
    Some(Arc::new(move |property: &str, value: &PropertyValue| {
        observer(&format!("{}.{}", display, property), value)
    }))
}
