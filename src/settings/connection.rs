//! The 'connection' meta-setting: profile identity and declared type

use crate::error::{ErrorDomain, SettingError};
use crate::registry::SettingDescriptor;
use crate::setting::{
    from_property_map, serialize_setting, to_property_map, PropertyMap, SerializeFlags, Setting,
};
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use uuid::Uuid;

pub const CONNECTION_SETTING_NAME: &str = "connection";
pub const CONNECTION_SETTING_ERROR_DOMAIN: ErrorDomain = ErrorDomain("connection-setting-error");

/// General identity and behavior of a connection profile: its ID and UUID,
/// the name of the base setting carrying the hardware-specific configuration
/// (the 'type' property), and activation hints. Exactly one instance is
/// required in every valid connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ConnectionSetting {
    /// Human-readable profile name.
    pub id: String,
    /// Stable unique identifier for the profile.
    pub uuid: String,
    /// Name of the base setting type, e.g. "802-3-ethernet".
    #[serde(rename = "type")]
    pub connection_type: String,
    /// Bind the profile to a specific kernel interface.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface_name: Option<String>,
    pub autoconnect: bool,
    /// Unix time of the last successful activation.
    pub timestamp: u64,
    /// Users allowed to activate the profile; empty means everyone.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
}

impl Default for ConnectionSetting {
    fn default() -> Self {
        Self {
            id: String::new(),
            uuid: String::new(),
            connection_type: String::new(),
            interface_name: None,
            autoconnect: true,
            timestamp: 0,
            permissions: Vec::new(),
        }
    }
}

impl ConnectionSetting {
    /// Create a meta-setting with a fresh UUID.
    pub fn new(id: impl Into<String>, connection_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uuid: Uuid::new_v4().to_string(),
            connection_type: connection_type.into(),
            ..Self::default()
        }
    }
}

impl Setting for ConnectionSetting {
    fn name(&self) -> &'static str {
        CONNECTION_SETTING_NAME
    }

    fn error_domain(&self) -> ErrorDomain {
        CONNECTION_SETTING_ERROR_DOMAIN
    }

    fn verify(&self, _siblings: &[&dyn Setting]) -> Result<(), SettingError> {
        if self.id.is_empty() {
            return Err(SettingError::new(
                CONNECTION_SETTING_ERROR_DOMAIN,
                "connection id cannot be empty",
            ));
        }
        if self.uuid.is_empty() {
            return Err(SettingError::new(
                CONNECTION_SETTING_ERROR_DOMAIN,
                "connection uuid cannot be empty",
            ));
        }
        if Uuid::parse_str(&self.uuid).is_err() {
            return Err(SettingError::new(
                CONNECTION_SETTING_ERROR_DOMAIN,
                format!("'{}' is not a valid UUID", self.uuid),
            ));
        }
        if self.connection_type.is_empty() {
            return Err(SettingError::new(
                CONNECTION_SETTING_ERROR_DOMAIN,
                "connection type cannot be empty",
            ));
        }
        Ok(())
    }

    fn to_map(&self, flags: SerializeFlags) -> PropertyMap {
        serialize_setting(self, &[], flags)
    }

    fn default_map(&self) -> PropertyMap {
        to_property_map(&Self::default())
    }

    fn duplicate(&self) -> Box<dyn Setting> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub(crate) fn descriptor() -> SettingDescriptor {
    SettingDescriptor {
        name: CONNECTION_SETTING_NAME,
        type_id: TypeId::of::<ConnectionSetting>(),
        priority: 0,
        error_domain: CONNECTION_SETTING_ERROR_DOMAIN,
        new_setting: || Box::new(ConnectionSetting::default()),
        from_map: |map| {
            from_property_map::<ConnectionSetting>(map)
                .map(|s| Box::new(s) as Box<dyn Setting>)
                .map_err(|e| SettingError::new(CONNECTION_SETTING_ERROR_DOMAIN, e.to_string()))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_requires_identity() {
        let mut s_con = ConnectionSetting::new("Office", "802-3-ethernet");
        assert!(s_con.verify(&[]).is_ok());

        s_con.id.clear();
        assert!(s_con.verify(&[]).is_err());

        let mut s_con = ConnectionSetting::new("Office", "802-3-ethernet");
        s_con.uuid = "not-a-uuid".to_string();
        assert!(s_con.verify(&[]).is_err());

        let mut s_con = ConnectionSetting::new("Office", "802-3-ethernet");
        s_con.connection_type.clear();
        assert!(s_con.verify(&[]).is_err());
    }

    #[test]
    fn test_serialized_type_property_name() {
        let s_con = ConnectionSetting::new("Office", "802-3-ethernet");
        let map = s_con.to_map(SerializeFlags::All);
        assert_eq!(
            map.get("type").and_then(|v| v.as_str()),
            Some("802-3-ethernet")
        );
        // The opaque path never appears; permissions only when non-empty.
        assert!(!map.contains_key("permissions"));
    }
}
