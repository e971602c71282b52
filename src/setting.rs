//! The setting capability contract implemented by every setting variant
//!
//! A setting is a named, typed bundle of configuration properties. Variants
//! are open-ended: third parties implement [`Setting`] and register a
//! descriptor with the [`registry`](crate::registry) without touching the
//! [`Connection`](crate::Connection) aggregate.

use crate::error::{ErrorDomain, SettingError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::ops::BitOr;

/// A setting's properties, serialized. Keys are kebab-case property names.
pub type PropertyMap = HashMap<String, serde_json::Value>;

/// Flags modifying [`Setting::compare`] and [`Setting::diff`] behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompareFlags(u32);

impl CompareFlags {
    /// Match all properties exactly.
    pub const EXACT: Self = Self(0);
    /// Ignore every secret property.
    pub const IGNORE_SECRETS: Self = Self(1 << 0);
    /// Ignore secrets whose flags mark them agent-owned.
    pub const IGNORE_AGENT_OWNED_SECRETS: Self = Self(1 << 1);
    /// Ignore secrets whose flags mark them never-saved.
    pub const IGNORE_NOT_SAVED_SECRETS: Self = Self(1 << 2);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for CompareFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Secrets handling for [`Setting::to_map`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SerializeFlags {
    /// Serialize all properties, secrets included.
    #[default]
    All,
    /// Omit secret properties.
    NoSecrets,
    /// Serialize only secret properties.
    OnlySecrets,
}

/// Per-property outcome of a diff, as a bitfield describing the nature and
/// direction of the difference. Flags from the two diff passes are combined
/// by union, never overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiffResult(u32);

impl DiffResult {
    pub const NONE: Self = Self(0);
    /// The property is present in A and missing or different in B.
    pub const IN_A: Self = Self(1 << 0);
    /// The property is present in B and missing or different in A.
    pub const IN_B: Self = Self(1 << 1);
    /// A's value additionally differs from the setting type's default.
    pub const IN_A_DEFAULT: Self = Self(1 << 2);
    /// B's value additionally differs from the setting type's default.
    pub const IN_B_DEFAULT: Self = Self(1 << 3);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for DiffResult {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Storage/ownership flags attached to an individual secret property.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize,
)]
pub struct SecretFlags(u32);

impl SecretFlags {
    /// The system stores and provides the secret.
    pub const NONE: Self = Self(0);
    /// A user agent stores the secret; the system does not.
    pub const AGENT_OWNED: Self = Self(1 << 0);
    /// The secret is never saved and must be requested each time.
    pub const NOT_SAVED: Self = Self(1 << 1);
    /// The secret is not required and should not be requested.
    pub const NOT_REQUIRED: Self = Self(1 << 2);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SecretFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Predicate deciding whether an individual secret should be cleared.
/// Arguments: setting name, property name, the secret's flags. Returning
/// `true` clears the secret.
pub type SecretFilter<'a> = dyn Fn(&str, &str, SecretFlags) -> bool + 'a;

/// The capability contract every setting variant implements.
pub trait Setting: Any + Send + fmt::Debug {
    /// The setting type name, e.g. `"802-3-ethernet"`.
    fn name(&self) -> &'static str;

    /// The error domain registered for this setting type.
    fn error_domain(&self) -> ErrorDomain;

    /// Verify this setting's properties. `siblings` is the full list of
    /// settings held by the connection (this setting included), enabling
    /// cross-setting checks.
    fn verify(&self, _siblings: &[&dyn Setting]) -> Result<(), SettingError> {
        Ok(())
    }

    /// Serialize to a property map, possibly empty.
    fn to_map(&self, flags: SerializeFlags) -> PropertyMap;

    /// The property map of a default-constructed instance of this type.
    fn default_map(&self) -> PropertyMap;

    /// Independent deep copy.
    fn duplicate(&self) -> Box<dyn Setting>;

    /// Names of this setting's secret properties.
    fn secret_properties(&self) -> &'static [&'static str] {
        &[]
    }

    /// Flags attached to the named secret property.
    fn secret_flags(&self, _property: &str) -> SecretFlags {
        SecretFlags::NONE
    }

    /// Property names of secrets that are missing but likely required.
    /// Empty when the setting is satisfied.
    fn need_secrets(&self) -> Vec<String> {
        Vec::new()
    }

    /// Apply secret values from a property map. Unknown keys are ignored.
    fn update_secrets(&mut self, _secrets: &PropertyMap) -> Result<(), SettingError> {
        Ok(())
    }

    /// Clear secrets, optionally filtered per property.
    fn clear_secrets(&mut self, _filter: Option<&SecretFilter<'_>>) {}

    /// Name of the virtual kernel interface this setting configures, if any.
    fn virtual_iface_name(&self) -> Option<&str> {
        None
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Compare against another setting of the same concrete type. Secret
    /// properties are skipped according to `flags`.
    fn compare(&self, other: &dyn Setting, flags: CompareFlags) -> bool {
        if self.as_any().type_id() != other.as_any().type_id() {
            return false;
        }
        let mut a = self.to_map(SerializeFlags::All);
        let mut b = other.to_map(SerializeFlags::All);
        for prop in self.secret_properties() {
            if secret_ignored(self.secret_flags(prop), flags) {
                a.remove(*prop);
                b.remove(*prop);
            }
        }
        a == b
    }

    /// Diff this setting against an optional counterpart, returning a map of
    /// differing property names. Each pass only reports flags for its own
    /// side (`invert` selects the side), so two-pass results merge by union.
    /// A missing counterpart yields presence-only results for every
    /// serialized property.
    fn diff(
        &self,
        other: Option<&dyn Setting>,
        flags: CompareFlags,
        invert: bool,
    ) -> HashMap<String, DiffResult> {
        let (in_self, self_default) = if invert {
            (DiffResult::IN_B, DiffResult::IN_B_DEFAULT)
        } else {
            (DiffResult::IN_A, DiffResult::IN_A_DEFAULT)
        };

        let mut a = self.to_map(SerializeFlags::All);
        let mut b = other.map(|o| o.to_map(SerializeFlags::All));
        for prop in self.secret_properties() {
            if secret_ignored(self.secret_flags(prop), flags) {
                a.remove(*prop);
                if let Some(b) = b.as_mut() {
                    b.remove(*prop);
                }
            }
        }
        let defaults = self.default_map();

        let mut results = HashMap::new();
        for (prop, value) in &a {
            let same = b
                .as_ref()
                .and_then(|m| m.get(prop))
                .is_some_and(|other_value| other_value == value);
            if same {
                continue;
            }
            let mut result = in_self;
            if defaults.get(prop) != Some(value) {
                result = result | self_default;
            }
            results.insert(prop.clone(), result);
        }
        results
    }

    /// Invoke `visit` once per serialized property.
    fn enumerate(&self, visit: &mut dyn FnMut(&str, &serde_json::Value)) {
        for (prop, value) in self.to_map(SerializeFlags::All) {
            visit(&prop, &value);
        }
    }
}

/// The concrete type identity of a setting trait object.
pub fn setting_type_id(setting: &dyn Setting) -> TypeId {
    setting.as_any().type_id()
}

fn secret_ignored(secret: SecretFlags, flags: CompareFlags) -> bool {
    flags.contains(CompareFlags::IGNORE_SECRETS)
        || (flags.contains(CompareFlags::IGNORE_AGENT_OWNED_SECRETS)
            && secret.contains(SecretFlags::AGENT_OWNED))
        || (flags.contains(CompareFlags::IGNORE_NOT_SAVED_SECRETS)
            && secret.contains(SecretFlags::NOT_SAVED))
}

/// Serialize a setting struct to a property map, applying secrets filtering.
pub fn serialize_setting<T: Serialize>(
    setting: &T,
    secrets: &'static [&'static str],
    flags: SerializeFlags,
) -> PropertyMap {
    let mut map = to_property_map(setting);
    match flags {
        SerializeFlags::All => {}
        SerializeFlags::NoSecrets => {
            for prop in secrets {
                map.remove(*prop);
            }
        }
        SerializeFlags::OnlySecrets => {
            map.retain(|prop, _| secrets.contains(&prop.as_str()));
        }
    }
    map
}

/// Serialize any `Serialize` value to a property map. Non-object values
/// produce an empty map.
pub fn to_property_map<T: Serialize>(value: &T) -> PropertyMap {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
        _ => PropertyMap::new(),
    }
}

/// Deserialize a setting struct from a property map.
pub fn from_property_map<T: DeserializeOwned>(map: &PropertyMap) -> Result<T, serde_json::Error> {
    let object: serde_json::Map<String, serde_json::Value> =
        map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    serde_json::from_value(serde_json::Value::Object(object))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_flags_contains() {
        let flags = CompareFlags::IGNORE_SECRETS | CompareFlags::IGNORE_NOT_SAVED_SECRETS;
        assert!(flags.contains(CompareFlags::IGNORE_SECRETS));
        assert!(flags.contains(CompareFlags::IGNORE_NOT_SAVED_SECRETS));
        assert!(!flags.contains(CompareFlags::IGNORE_AGENT_OWNED_SECRETS));
    }

    #[test]
    fn test_diff_result_union() {
        let merged = DiffResult::IN_A | DiffResult::IN_B;
        assert!(merged.contains(DiffResult::IN_A));
        assert!(merged.contains(DiffResult::IN_B));
        assert!(!merged.contains(DiffResult::IN_A_DEFAULT));
    }

    #[test]
    fn test_secret_ignored() {
        assert!(secret_ignored(
            SecretFlags::NONE,
            CompareFlags::IGNORE_SECRETS
        ));
        assert!(secret_ignored(
            SecretFlags::AGENT_OWNED,
            CompareFlags::IGNORE_AGENT_OWNED_SECRETS
        ));
        assert!(!secret_ignored(
            SecretFlags::NONE,
            CompareFlags::IGNORE_AGENT_OWNED_SECRETS
        ));
        assert!(!secret_ignored(SecretFlags::NOT_SAVED, CompareFlags::EXACT));
    }
}
