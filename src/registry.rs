//! Process-wide setting-type registry
//!
//! Maps setting type names to their type identity, sort priority, error
//! domain, and factories. Built-in types are registered the first time the
//! registry is touched; external variants register through
//! [`register_setting`] before any connection work begins. After that the
//! registry is read-only and safe for concurrent reads.
//!
//! A setting's priority roughly follows the OSI layer model, and controls
//! which settings get asked for secrets first: things that must be working
//! first, like hardware, come before things which layer on top. A GSM PIN
//! unlocks the device before PPP can even start, so gsm sorts before ppp.
//!
//! Priority classes:
//! - 0: reserved for the 'connection' meta-setting
//! - 1: hardware-related base types (ethernet, wifi, gsm); valid in the
//!   'type' property of the meta-setting
//! - 2: hardware auxiliary settings (wifi security)
//! - 3: settings required before IP connectivity (ppp, pppoe)
//! - 4: IP-level settings
//!
//! PPPoE is a historical oddity: it is base-eligible even though it is not
//! priority 1, because its secrets must be requested after lower-level
//! settings like wifi security.

use crate::error::{ErrorDomain, SettingError};
use crate::setting::{PropertyMap, Setting};
use crate::settings;
use once_cell::sync::Lazy;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::RwLock;

/// Priority reported for setting types that were never registered; sorts
/// last in any priority ordering.
pub const UNKNOWN_SETTING_PRIORITY: u32 = u32::MAX;

/// Registration record for one setting type.
pub struct SettingDescriptor {
    /// Unique setting type name, e.g. `"802-3-ethernet"`.
    pub name: &'static str,
    /// Concrete type identity of the implementing struct.
    pub type_id: TypeId,
    /// Sort priority, 0..=4.
    pub priority: u32,
    /// Error domain reported by the type's verification failures.
    pub error_domain: ErrorDomain,
    /// Factory for a default-constructed instance.
    pub new_setting: fn() -> Box<dyn Setting>,
    /// Factory from a serialized property map.
    pub from_map: fn(&PropertyMap) -> Result<Box<dyn Setting>, SettingError>,
}

static REGISTRY: Lazy<RwLock<HashMap<&'static str, SettingDescriptor>>> = Lazy::new(|| {
    let registry = RwLock::new(HashMap::new());
    for descriptor in settings::builtin_descriptors() {
        register_into(&registry, descriptor);
    }
    registry
});

fn register_into(
    registry: &RwLock<HashMap<&'static str, SettingDescriptor>>,
    descriptor: SettingDescriptor,
) {
    assert!(
        descriptor.priority <= 4,
        "setting priority {} out of range 0..=4",
        descriptor.priority
    );
    // Priority 0 is reserved for the single meta-setting type.
    if descriptor.priority == 0 {
        assert_eq!(
            descriptor.name,
            settings::CONNECTION_SETTING_NAME,
            "priority 0 is reserved for the '{}' setting",
            settings::CONNECTION_SETTING_NAME
        );
    }

    let mut map = registry.write().expect("setting registry poisoned");
    if map.contains_key(descriptor.name) {
        // First registration wins.
        return;
    }
    tracing::debug!(name = descriptor.name, priority = descriptor.priority, "registered setting type");
    map.insert(descriptor.name, descriptor);
}

/// Register a setting type. The first registration for a given name wins;
/// later ones are silently ignored.
///
/// # Panics
///
/// Registration misuse is a startup-time programming error: panics when the
/// priority is outside 0..=4, or when priority 0 is used for any name other
/// than the reserved meta-setting name.
pub fn register_setting(descriptor: SettingDescriptor) {
    register_into(&REGISTRY, descriptor);
}

/// The type identity registered for a setting name.
pub fn lookup_setting_type(name: &str) -> Option<TypeId> {
    let map = REGISTRY.read().expect("setting registry poisoned");
    map.get(name).map(|info| info.type_id)
}

/// Maps a validation error's domain back to the setting type it originated
/// from. The registry is small and fixed after startup, so a linear scan is
/// fine.
pub fn lookup_setting_type_by_error_domain(domain: ErrorDomain) -> Option<TypeId> {
    let map = REGISTRY.read().expect("setting registry poisoned");
    map.values()
        .find(|info| info.error_domain == domain)
        .map(|info| info.type_id)
}

/// The registered name for a setting type identity.
pub fn setting_name(type_id: TypeId) -> Option<&'static str> {
    let map = REGISTRY.read().expect("setting registry poisoned");
    map.values()
        .find(|info| info.type_id == type_id)
        .map(|info| info.name)
}

/// The sort priority of a setting type, or [`UNKNOWN_SETTING_PRIORITY`] when
/// the type was never registered.
pub fn setting_priority(type_id: TypeId) -> u32 {
    let map = REGISTRY.read().expect("setting registry poisoned");
    map.values()
        .find(|info| info.type_id == type_id)
        .map_or(UNKNOWN_SETTING_PRIORITY, |info| info.priority)
}

/// Whether the setting type is eligible as a connection's declared type:
/// priority 1, or the pppoe exception.
pub fn is_base_setting_type(type_id: TypeId) -> bool {
    let map = REGISTRY.read().expect("setting registry poisoned");
    map.values()
        .find(|info| info.type_id == type_id)
        .is_some_and(|info| info.priority == 1 || info.name == settings::PPPOE_SETTING_NAME)
}

/// Create a default-constructed setting for a registered name.
pub fn create_setting(name: &str) -> Option<Box<dyn Setting>> {
    let map = REGISTRY.read().expect("setting registry poisoned");
    map.get(name).map(|info| (info.new_setting)())
}

/// Create a setting for a registered name from a serialized property map.
/// `None` when the name is unknown.
pub fn setting_from_map(
    name: &str,
    properties: &PropertyMap,
) -> Option<Result<Box<dyn Setting>, SettingError>> {
    let map = REGISTRY.read().expect("setting registry poisoned");
    map.get(name).map(|info| (info.from_map)(properties))
}
