//! The connection aggregate: setting storage, cross-setting validation,
//! symmetric diff/compare, secrets coordination, and bulk serialization
//!
//! A `Connection` describes all the settings and configuration values
//! necessary to configure a network device for operation on a specific
//! network. It holds at most one setting per concrete type, referenced by
//! type ([`Connection::setting`]) or by registered name
//! ([`Connection::get_setting_by_name`]).

use crate::error::{ConnectionError, ConnectionResult};
use crate::registry;
use crate::setting::{
    setting_type_id, CompareFlags, DiffResult, PropertyMap, SecretFilter, SerializeFlags, Setting,
};
use crate::settings::{ConnectionSetting, CONNECTION_SETTING_NAME};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// The bulk wire format: setting name to property map. Produced by
/// [`Connection::to_map`] and consumed by [`Connection::from_map`].
pub type ConnectionMap = HashMap<String, PropertyMap>;

/// Differences between two connections: setting name to property name to
/// [`DiffResult`] bitfield.
pub type SettingsDiff = HashMap<String, HashMap<String, DiffResult>>;

type SecretsUpdatedObserver = Box<dyn Fn(Option<&str>) + Send>;
type SecretsClearedObserver = Box<dyn Fn() + Send>;

/// A network connection profile: an owned collection of settings plus an
/// opaque path handle.
///
/// Not internally synchronized; concurrent mutation requires external
/// locking. Secrets notifications are delivered synchronously on the
/// caller's thread.
#[derive(Default)]
pub struct Connection {
    settings: HashMap<TypeId, Box<dyn Setting>>,
    /// Opaque handle for the caller's use (e.g. an object path under which
    /// a settings service exposes the profile). Never part of identity,
    /// comparison, diffing, or serialization.
    path: Option<String>,
    secrets_updated: Vec<SecretsUpdatedObserver>,
    secrets_cleared: Vec<SecretsClearedObserver>,
}

impl Connection {
    /// Create a connection with no settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a connection from a bulk map. The result has been verified.
    pub fn from_map(map: &ConnectionMap) -> ConnectionResult<Self> {
        let mut connection = Self::new();
        connection.replace_settings(map)?;
        Ok(connection)
    }

    /// Add a setting, replacing and discarding any previous setting of the
    /// same concrete type.
    pub fn add_setting(&mut self, setting: Box<dyn Setting>) {
        self.settings.insert(setting_type_id(setting.as_ref()), setting);
    }

    /// Remove and return the setting with the given type identity.
    pub fn remove_setting(&mut self, type_id: TypeId) -> Option<Box<dyn Setting>> {
        self.settings.remove(&type_id)
    }

    /// The setting with the given type identity, if held.
    pub fn get_setting(&self, type_id: TypeId) -> Option<&dyn Setting> {
        self.settings.get(&type_id).map(|s| s.as_ref())
    }

    /// The setting of concrete type `T`, if held.
    pub fn setting<T: Setting>(&self) -> Option<&T> {
        self.settings
            .get(&TypeId::of::<T>())
            .and_then(|s| s.as_any().downcast_ref::<T>())
    }

    /// Mutable access to the setting of concrete type `T`, if held.
    pub fn setting_mut<T: Setting>(&mut self) -> Option<&mut T> {
        self.settings
            .get_mut(&TypeId::of::<T>())
            .and_then(|s| s.as_any_mut().downcast_mut::<T>())
    }

    /// The setting whose registered name is `name`, if held.
    pub fn get_setting_by_name(&self, name: &str) -> Option<&dyn Setting> {
        registry::lookup_setting_type(name).and_then(|type_id| self.get_setting(type_id))
    }

    fn get_setting_by_name_mut(&mut self, name: &str) -> Option<&mut dyn Setting> {
        let type_id = registry::lookup_setting_type(name)?;
        self.settings.get_mut(&type_id).map(|s| s.as_mut())
    }

    /// The opaque path handle.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Set the opaque path handle. For the caller's reference only.
    pub fn set_path(&mut self, path: Option<String>) {
        self.path = path;
    }

    /// Deep-copy every held setting (via its own duplicate capability) and
    /// the path into an independent connection. Observers are not copied.
    pub fn duplicate(&self) -> Connection {
        let mut dup = Connection::new();
        dup.path = self.path.clone();
        for setting in self.settings.values() {
            dup.add_setting(setting.duplicate());
        }
        dup
    }

    /// Shortcut to the profile ID from the meta-setting.
    pub fn id(&self) -> Option<&str> {
        self.setting::<ConnectionSetting>().map(|s| s.id.as_str())
    }

    /// Shortcut to the profile UUID from the meta-setting.
    pub fn uuid(&self) -> Option<&str> {
        self.setting::<ConnectionSetting>().map(|s| s.uuid.as_str())
    }

    /// Shortcut to the declared connection type from the meta-setting.
    pub fn connection_type(&self) -> Option<&str> {
        self.setting::<ConnectionSetting>()
            .map(|s| s.connection_type.as_str())
    }

    /// Whether the declared connection type matches `type_name`.
    pub fn is_type(&self, type_name: &str) -> bool {
        self.connection_type() == Some(type_name)
    }

    /// Name of the virtual kernel interface the base setting configures, if
    /// the connection is of a virtual type.
    pub fn virtual_iface_name(&self) -> Option<&str> {
        let base = self.get_setting_by_name(self.connection_type()?)?;
        base.virtual_iface_name()
    }

    /// Invoke `visit` once per property of every held setting, with the
    /// setting name, property name, and value.
    pub fn for_each_setting_value(
        &self,
        visit: &mut dyn FnMut(&str, &str, &serde_json::Value),
    ) {
        for setting in self.settings.values() {
            let name = setting.name();
            setting.enumerate(&mut |prop, value| visit(name, prop, value));
        }
    }

    /// Human-readable dump for debugging only; the format is not stable.
    pub fn dump(&self) -> String {
        serde_json::to_string_pretty(&self.to_map(SerializeFlags::All))
            .unwrap_or_default()
    }

    /// Validate the connection and all its settings.
    ///
    /// Fails with [`ConnectionError::ConnectionSettingNotFound`] when the
    /// meta-setting is missing. Otherwise runs every setting's verify with
    /// the full sibling list (order unspecified), surfacing the first
    /// failure with its originating error domain. Only after all of those
    /// succeed, the declared connection type must resolve to a held,
    /// base-eligible setting, else
    /// [`ConnectionError::ConnectionTypeInvalid`].
    pub fn verify(&self) -> ConnectionResult<()> {
        let meta = self
            .setting::<ConnectionSetting>()
            .ok_or(ConnectionError::ConnectionSettingNotFound)?;

        let siblings: Vec<&dyn Setting> = self.settings.values().map(|s| s.as_ref()).collect();
        for setting in self.settings.values() {
            setting.verify(&siblings)?;
        }

        // The declared type must actually be usable as the base setting of
        // the connection. Can't have type=ppp for example.
        let ctype = meta.connection_type.as_str();
        if ctype.is_empty() {
            return Err(ConnectionError::ConnectionTypeInvalid(
                "connection type missing".to_string(),
            ));
        }
        let base = self.get_setting_by_name(ctype).ok_or_else(|| {
            ConnectionError::ConnectionTypeInvalid(format!("base setting '{}' not found", ctype))
        })?;
        if !registry::is_base_setting_type(setting_type_id(base)) {
            return Err(ConnectionError::ConnectionTypeInvalid(format!(
                "connection type '{}' is not a base type",
                ctype
            )));
        }
        Ok(())
    }

    /// Compare two connections for similarity under `flags`. Every setting
    /// in A must have a compare-equal counterpart of the same type in B,
    /// and B must not hold extra setting types.
    pub fn compare(a: Option<&Connection>, b: Option<&Connection>, flags: CompareFlags) -> bool {
        let (a, b) = match (a, b) {
            (None, None) => return true,
            (Some(a), Some(b)) => (a, b),
            _ => return false,
        };

        for (type_id, setting) in &a.settings {
            match b.settings.get(type_id) {
                Some(other) if setting.compare(other.as_ref(), flags) => {}
                _ => return false,
            }
        }
        // Settings present only in B would slip past the loop over A.
        a.settings.len() == b.settings.len()
    }

    /// Diff two connections. `None` means they contain the same values;
    /// otherwise the returned map lists, per setting name, the property
    /// names that differ with a [`DiffResult`] bitfield each.
    ///
    /// Runs two passes (A against B, then B against A to capture settings
    /// and properties only in B) and merges per-property flags by union.
    pub fn diff(&self, other: Option<&Connection>, flags: CompareFlags) -> Option<SettingsDiff> {
        if let Some(other) = other {
            if std::ptr::eq(self, other) {
                return None;
            }
        }

        let mut diffs = SettingsDiff::new();
        self.diff_one(other, flags, false, &mut diffs);
        if let Some(other) = other {
            other.diff_one(Some(self), flags, true, &mut diffs);
        }

        if diffs.is_empty() {
            None
        } else {
            Some(diffs)
        }
    }

    fn diff_one(
        &self,
        other: Option<&Connection>,
        flags: CompareFlags,
        invert: bool,
        diffs: &mut SettingsDiff,
    ) {
        for (type_id, setting) in &self.settings {
            let counterpart = other
                .and_then(|o| o.settings.get(type_id))
                .map(|s| s.as_ref());
            let results = setting.diff(counterpart, flags, invert);
            if results.is_empty() {
                continue;
            }
            let merged = diffs.entry(setting.name().to_string()).or_default();
            for (prop, result) in results {
                let entry = merged.entry(prop).or_insert(DiffResult::NONE);
                *entry = *entry | result;
            }
        }
    }

    /// Ask each held setting, in ascending registry-priority order (ties
    /// broken by setting name), whether it needs secrets; return the first
    /// setting name with its hint list. Lower-layer secrets come first: a
    /// GSM PIN must be available before PPP on top of it can authenticate.
    pub fn need_secrets(&self) -> Option<(&'static str, Vec<String>)> {
        let mut ordered: Vec<&dyn Setting> = self.settings.values().map(|s| s.as_ref()).collect();
        ordered.sort_by_key(|s| (registry::setting_priority(setting_type_id(*s)), s.name()));

        for setting in ordered {
            let hints = setting.need_secrets();
            if !hints.is_empty() {
                return Some((setting.name(), hints));
            }
        }
        None
    }

    /// Update secrets from a blob.
    ///
    /// With a `setting_name`, the blob is either that setting's flat
    /// property-to-secret map or a fully nested connection blob; nesting is
    /// detected by `setting_name` keying into the blob, in which case the
    /// inner map is extracted. With no `setting_name`, the blob must be
    /// fully nested: every key must name a held setting, failing fast with
    /// [`ConnectionError::SettingNotFound`] otherwise, and each inner map
    /// is applied to its setting (entries whose value is not a map are
    /// ignored). Settings updated before a failure point are not rolled
    /// back.
    ///
    /// Emits `secrets-updated` on success, carrying the setting name or
    /// none meaning all.
    pub fn update_secrets(
        &mut self,
        setting_name: Option<&str>,
        secrets: &PropertyMap,
    ) -> ConnectionResult<()> {
        match setting_name {
            Some(name) => {
                // A nested blob (full serialized connection) keys the
                // setting name; unwrap it before applying.
                let nested = secrets
                    .get(name)
                    .and_then(|v| v.as_object())
                    .map(|obj| {
                        obj.iter()
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect::<PropertyMap>()
                    });
                let Some(setting) = self.get_setting_by_name_mut(name) else {
                    return Err(ConnectionError::SettingNotFound(name.to_string()));
                };
                match &nested {
                    Some(inner) => setting.update_secrets(inner)?,
                    None => setting.update_secrets(secrets)?,
                }
            }
            None => {
                // Sorted for a deterministic failure point. Every key must
                // name a held setting, even when its value is not a map;
                // non-map values for held settings are skipped.
                let mut names: Vec<&String> = secrets.keys().collect();
                names.sort();
                for name in names {
                    let Some(setting) = self.get_setting_by_name_mut(name) else {
                        return Err(ConnectionError::SettingNotFound(name.clone()));
                    };
                    let Some(inner) = secrets[name].as_object() else {
                        continue;
                    };
                    let inner: PropertyMap = inner
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect();
                    setting.update_secrets(&inner)?;
                }
            }
        }
        self.emit_secrets_updated(setting_name);
        Ok(())
    }

    /// Clear every secret held by every setting. Emits `secrets-cleared`
    /// exactly once, whether or not any secret existed.
    pub fn clear_secrets(&mut self) {
        self.clear_secrets_inner(None);
    }

    /// Clear secrets selected by `filter` (setting name, property, secret
    /// flags; returning `true` clears). Emits `secrets-cleared` exactly
    /// once, whether or not any secret was cleared.
    pub fn clear_secrets_with_filter(&mut self, filter: &SecretFilter<'_>) {
        self.clear_secrets_inner(Some(filter));
    }

    fn clear_secrets_inner(&mut self, filter: Option<&SecretFilter<'_>>) {
        for setting in self.settings.values_mut() {
            setting.clear_secrets(filter);
        }
        self.emit_secrets_cleared();
    }

    /// Register an observer for `secrets-updated`. The argument is the
    /// setting name the update applied to, or none meaning all settings.
    pub fn connect_secrets_updated(
        &mut self,
        observer: impl Fn(Option<&str>) + Send + 'static,
    ) {
        self.secrets_updated.push(Box::new(observer));
    }

    /// Register an observer for `secrets-cleared`.
    pub fn connect_secrets_cleared(&mut self, observer: impl Fn() + Send + 'static) {
        self.secrets_cleared.push(Box::new(observer));
    }

    fn emit_secrets_updated(&self, setting_name: Option<&str>) {
        for observer in &self.secrets_updated {
            observer(setting_name);
        }
    }

    fn emit_secrets_cleared(&self) {
        for observer in &self.secrets_cleared {
            observer();
        }
    }

    /// Serialize to the bulk wire format. Settings serializing to an empty
    /// property map are omitted; `None` is returned instead of an empty
    /// outer map so callers never transmit empty payloads. The path is
    /// never serialized.
    pub fn to_map(&self, flags: SerializeFlags) -> Option<ConnectionMap> {
        let mut map = ConnectionMap::new();
        for setting in self.settings.values() {
            let properties = setting.to_map(flags);
            if !properties.is_empty() {
                map.insert(setting.name().to_string(), properties);
            }
        }
        if map.is_empty() {
            None
        } else {
            Some(map)
        }
    }

    /// Replace every held setting with settings built from a bulk map, then
    /// verify.
    ///
    /// The meta-setting's permissions entry, when present in the map, must
    /// have the expected list-of-strings shape; this is checked before any
    /// mutation. Entries whose names do not resolve in the registry are
    /// skipped with a warning, not errors. Not atomic: when verification
    /// fails the connection keeps the new, invalid settings.
    pub fn replace_settings(&mut self, map: &ConnectionMap) -> ConnectionResult<()> {
        Self::validate_permissions(map)?;

        self.settings.clear();
        for (name, properties) in map {
            match registry::setting_from_map(name, properties) {
                Some(Ok(setting)) => self.add_setting(setting),
                Some(Err(e)) => {
                    warn!(setting = name.as_str(), error = %e, "skipping malformed setting");
                }
                None => {
                    warn!(setting = name.as_str(), "skipping unknown setting");
                }
            }
        }
        self.verify()
    }

    /// Ensure the meta-setting's permissions item, if present, has the
    /// correct shape before it is applied.
    fn validate_permissions(map: &ConnectionMap) -> ConnectionResult<()> {
        let Some(meta) = map.get(CONNECTION_SETTING_NAME) else {
            return Ok(());
        };
        let Some(permissions) = meta.get("permissions") else {
            return Ok(());
        };
        let well_formed = permissions
            .as_array()
            .is_some_and(|entries| entries.iter().all(|v| v.is_string()));
        if !well_formed {
            return Err(ConnectionError::PropertyTypeMismatch(
                "wrong permissions property type; should be a list of strings".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.settings.values().map(|s| s.name()).collect();
        names.sort_unstable();
        f.debug_struct("Connection")
            .field("settings", &names)
            .field("path", &self.path)
            .finish()
    }
}
