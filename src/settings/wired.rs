//! Wired Ethernet setting

use crate::error::{ErrorDomain, SettingError};
use crate::registry::SettingDescriptor;
use crate::setting::{
    from_property_map, serialize_setting, to_property_map, PropertyMap, SerializeFlags, Setting,
};
use crate::validation;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};

pub const WIRED_SETTING_NAME: &str = "802-3-ethernet";
pub const WIRED_SETTING_ERROR_DOMAIN: ErrorDomain = ErrorDomain("wired-setting-error");

const VALID_PORTS: &[&str] = &["tp", "aui", "bnc", "mii"];
const VALID_DUPLEX: &[&str] = &["half", "full"];

/// Wired Ethernet hardware configuration. A base type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct WiredSetting {
    /// Port type (tp, aui, bnc, mii)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    /// Speed in Mb/s
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<u32>,
    /// Duplex mode (half, full)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplex: Option<String>,
    pub auto_negotiate: bool,
    /// Lock the profile to a device with this MAC address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
}

impl Default for WiredSetting {
    fn default() -> Self {
        Self {
            port: None,
            speed: None,
            duplex: None,
            auto_negotiate: true,
            mac_address: None,
            mtu: None,
        }
    }
}

impl Setting for WiredSetting {
    fn name(&self) -> &'static str {
        WIRED_SETTING_NAME
    }

    fn error_domain(&self) -> ErrorDomain {
        WIRED_SETTING_ERROR_DOMAIN
    }

    fn verify(&self, _siblings: &[&dyn Setting]) -> Result<(), SettingError> {
        if let Some(port) = &self.port {
            if !VALID_PORTS.contains(&port.as_str()) {
                return Err(SettingError::new(
                    WIRED_SETTING_ERROR_DOMAIN,
                    format!("invalid port '{}'", port),
                ));
            }
        }
        if let Some(duplex) = &self.duplex {
            if !VALID_DUPLEX.contains(&duplex.as_str()) {
                return Err(SettingError::new(
                    WIRED_SETTING_ERROR_DOMAIN,
                    format!("invalid duplex '{}'", duplex),
                ));
            }
        }
        if let Some(mac) = &self.mac_address {
            validation::validate_mac_address(mac)
                .map_err(|e| SettingError::new(WIRED_SETTING_ERROR_DOMAIN, e))?;
        }
        if let Some(mtu) = self.mtu {
            validation::validate_mtu(mtu)
                .map_err(|e| SettingError::new(WIRED_SETTING_ERROR_DOMAIN, e))?;
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
        name: WIRED_SETTING_NAME,
        type_id: TypeId::of::<WiredSetting>(),
        priority: 1,
        error_domain: WIRED_SETTING_ERROR_DOMAIN,
        new_setting: || Box::new(WiredSetting::default()),
        from_map: |map| {
            from_property_map::<WiredSetting>(map)
                .map(|s| Box::new(s) as Box<dyn Setting>)
                .map_err(|e| SettingError::new(WIRED_SETTING_ERROR_DOMAIN, e.to_string()))
        },
    }
}
