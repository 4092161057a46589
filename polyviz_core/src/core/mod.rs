//! # Core display abstractions
//!
//! - **Display**: the capability trait every display kind implements
//! - **DisplayContext**: scene, frame service, bus and fixed frame shared by displays
//! - **PropertyTable**: declarative getter/setter table behind each display's properties

pub mod display;
pub mod property;

pub use display::{Display, DisplayContext, DisplayStatus, LogSummary, StatusLevel};
pub use property::{
    PropertyDescriptor, PropertyKind, PropertyObserver, PropertyTable, PropertyValue,
};
