//! Wireless (802.11) setting and its companion security setting

use crate::error::{ErrorDomain, SettingError};
use crate::registry::SettingDescriptor;
use crate::setting::{
    from_property_map, serialize_setting, to_property_map, PropertyMap, SecretFilter, SecretFlags,
    SerializeFlags, Setting,
};
use crate::validation;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};

pub const WIRELESS_SETTING_NAME: &str = "802-11-wireless";
pub const WIRELESS_SETTING_ERROR_DOMAIN: ErrorDomain = ErrorDomain("wireless-setting-error");

pub const WIRELESS_SECURITY_SETTING_NAME: &str = "802-11-wireless-security";
pub const WIRELESS_SECURITY_SETTING_ERROR_DOMAIN: ErrorDomain =
    ErrorDomain("wireless-security-setting-error");

const VALID_MODES: &[&str] = &["infrastructure", "adhoc", "ap"];
const VALID_BANDS: &[&str] = &["a", "bg"];
const VALID_KEY_MGMT: &[&str] = &["none", "ieee8021x", "wpa-psk", "wpa-eap", "sae"];
const VALID_AUTH_ALG: &[&str] = &["open", "shared", "leap"];

/// Wireless hardware configuration. A base type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct WirelessSetting {
    pub ssid: String,
    /// Operating mode (infrastructure, adhoc, ap)
    pub mode: String,
    /// Frequency band (a, bg)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<u32>,
    /// Lock to a specific access point
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bssid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
    pub hidden: bool,
    /// Name of the companion security setting, when the network is secured.
    /// The named setting must be present in the same connection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,
}

impl Default for WirelessSetting {
    fn default() -> Self {
        Self {
            ssid: String::new(),
            mode: "infrastructure".to_string(),
            band: None,
            channel: None,
            bssid: None,
            mac_address: None,
            mtu: None,
            hidden: false,
            security: None,
        }
    }
}

impl Setting for WirelessSetting {
    fn name(&self) -> &'static str {
        WIRELESS_SETTING_NAME
    }

    fn error_domain(&self) -> ErrorDomain {
        WIRELESS_SETTING_ERROR_DOMAIN
    }

    fn verify(&self, siblings: &[&dyn Setting]) -> Result<(), SettingError> {
        validation::validate_ssid(&self.ssid)
            .map_err(|e| SettingError::new(WIRELESS_SETTING_ERROR_DOMAIN, e))?;

        if !VALID_MODES.contains(&self.mode.as_str()) {
            return Err(SettingError::new(
                WIRELESS_SETTING_ERROR_DOMAIN,
                format!("invalid mode '{}'", self.mode),
            ));
        }
        if let Some(band) = &self.band {
            if !VALID_BANDS.contains(&band.as_str()) {
                return Err(SettingError::new(
                    WIRELESS_SETTING_ERROR_DOMAIN,
                    format!("invalid band '{}'", band),
                ));
            }
        }
        // A fixed channel is meaningless without a band.
        if self.channel.is_some() && self.band.is_none() {
            return Err(SettingError::new(
                WIRELESS_SETTING_ERROR_DOMAIN,
                "channel requires band",
            ));
        }
        if let Some(bssid) = &self.bssid {
            validation::validate_mac_address(bssid)
                .map_err(|e| SettingError::new(WIRELESS_SETTING_ERROR_DOMAIN, e))?;
        }
        if let Some(mac) = &self.mac_address {
            validation::validate_mac_address(mac)
                .map_err(|e| SettingError::new(WIRELESS_SETTING_ERROR_DOMAIN, e))?;
        }
        if let Some(mtu) = self.mtu {
            validation::validate_mtu(mtu)
                .map_err(|e| SettingError::new(WIRELESS_SETTING_ERROR_DOMAIN, e))?;
        }
        if let Some(security) = &self.security {
            if security != WIRELESS_SECURITY_SETTING_NAME {
                return Err(SettingError::new(
                    WIRELESS_SETTING_ERROR_DOMAIN,
                    format!("invalid security setting name '{}'", security),
                ));
            }
            if !siblings.iter().any(|s| s.name() == security.as_str()) {
                return Err(SettingError::new(
                    WIRELESS_SETTING_ERROR_DOMAIN,
                    format!("security setting '{}' is required but missing", security),
                ));
            }
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

/// Security parameters for a secured wireless network.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct WirelessSecuritySetting {
    /// Key management (none, ieee8021x, wpa-psk, wpa-eap, sae)
    pub key_mgmt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_alg: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub proto: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pairwise: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub group: Vec<String>,
    /// WPA pre-shared key (secret)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psk: Option<String>,
    pub psk_flags: SecretFlags,
    /// Static WEP key (secret)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wep_key0: Option<String>,
    pub wep_key_flags: SecretFlags,
}

impl Default for WirelessSecuritySetting {
    fn default() -> Self {
        Self {
            key_mgmt: "wpa-psk".to_string(),
            auth_alg: None,
            proto: Vec::new(),
            pairwise: Vec::new(),
            group: Vec::new(),
            psk: None,
            psk_flags: SecretFlags::NONE,
            wep_key0: None,
            wep_key_flags: SecretFlags::NONE,
        }
    }
}

impl WirelessSecuritySetting {
    fn psk_needed(&self) -> bool {
        matches!(self.key_mgmt.as_str(), "wpa-psk" | "sae")
            && self.psk.as_deref().is_none_or(str::is_empty)
            && !self.psk_flags.contains(SecretFlags::NOT_REQUIRED)
    }

    fn wep_key_needed(&self) -> bool {
        self.key_mgmt == "none"
            && self.wep_key0.as_deref().is_none_or(str::is_empty)
            && !self.wep_key_flags.contains(SecretFlags::NOT_REQUIRED)
    }
}

impl Setting for WirelessSecuritySetting {
    fn name(&self) -> &'static str {
        WIRELESS_SECURITY_SETTING_NAME
    }

    fn error_domain(&self) -> ErrorDomain {
        WIRELESS_SECURITY_SETTING_ERROR_DOMAIN
    }

    fn verify(&self, _siblings: &[&dyn Setting]) -> Result<(), SettingError> {
        if !VALID_KEY_MGMT.contains(&self.key_mgmt.as_str()) {
            return Err(SettingError::new(
                WIRELESS_SECURITY_SETTING_ERROR_DOMAIN,
                format!("invalid key-mgmt '{}'", self.key_mgmt),
            ));
        }
        if let Some(auth_alg) = &self.auth_alg {
            if !VALID_AUTH_ALG.contains(&auth_alg.as_str()) {
                return Err(SettingError::new(
                    WIRELESS_SECURITY_SETTING_ERROR_DOMAIN,
                    format!("invalid auth-alg '{}'", auth_alg),
                ));
            }
        }
        if let Some(psk) = &self.psk {
            let hex64 = psk.len() == 64 && psk.chars().all(|c| c.is_ascii_hexdigit());
            let passphrase = (8..=63).contains(&psk.len()) && psk.is_ascii();
            if !hex64 && !passphrase {
                return Err(SettingError::new(
                    WIRELESS_SECURITY_SETTING_ERROR_DOMAIN,
                    "psk must be a 8-63 character passphrase or 64 hex digits",
                ));
            }
        }
        Ok(())
    }

    fn to_map(&self, flags: SerializeFlags) -> PropertyMap {
        serialize_setting(self, self.secret_properties(), flags)
    }

    fn default_map(&self) -> PropertyMap {
        to_property_map(&Self::default())
    }

    fn duplicate(&self) -> Box<dyn Setting> {
        Box::new(self.clone())
    }

    fn secret_properties(&self) -> &'static [&'static str] {
        &["psk", "wep-key0"]
    }

    fn secret_flags(&self, property: &str) -> SecretFlags {
        match property {
            "psk" => self.psk_flags,
            "wep-key0" => self.wep_key_flags,
            _ => SecretFlags::NONE,
        }
    }

    fn need_secrets(&self) -> Vec<String> {
        if self.psk_needed() {
            vec!["psk".to_string()]
        } else if self.wep_key_needed() {
            vec!["wep-key0".to_string()]
        } else {
            Vec::new()
        }
    }

    fn update_secrets(&mut self, secrets: &PropertyMap) -> Result<(), SettingError> {
        for prop in ["psk", "wep-key0"] {
            if let Some(value) = secrets.get(prop) {
                let value = value.as_str().ok_or_else(|| {
                    SettingError::new(
                        WIRELESS_SECURITY_SETTING_ERROR_DOMAIN,
                        format!("secret '{}' must be a string", prop),
                    )
                })?;
                match prop {
                    "psk" => self.psk = Some(value.to_string()),
                    _ => self.wep_key0 = Some(value.to_string()),
                }
            }
        }
        Ok(())
    }

    fn clear_secrets(&mut self, filter: Option<&SecretFilter<'_>>) {
        let clear = |prop: &str, flags: SecretFlags| {
            filter.is_none_or(|f| f(WIRELESS_SECURITY_SETTING_NAME, prop, flags))
        };
        if clear("psk", self.psk_flags) {
            self.psk = None;
        }
        if clear("wep-key0", self.wep_key_flags) {
            self.wep_key0 = None;
        }
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
        name: WIRELESS_SETTING_NAME,
        type_id: TypeId::of::<WirelessSetting>(),
        priority: 1,
        error_domain: WIRELESS_SETTING_ERROR_DOMAIN,
        new_setting: || Box::new(WirelessSetting::default()),
        from_map: |map| {
            from_property_map::<WirelessSetting>(map)
                .map(|s| Box::new(s) as Box<dyn Setting>)
                .map_err(|e| SettingError::new(WIRELESS_SETTING_ERROR_DOMAIN, e.to_string()))
        },
    }
}

pub(crate) fn security_descriptor() -> SettingDescriptor {
    SettingDescriptor {
        name: WIRELESS_SECURITY_SETTING_NAME,
        type_id: TypeId::of::<WirelessSecuritySetting>(),
        priority: 2,
        error_domain: WIRELESS_SECURITY_SETTING_ERROR_DOMAIN,
        new_setting: || Box::new(WirelessSecuritySetting::default()),
        from_map: |map| {
            from_property_map::<WirelessSecuritySetting>(map)
                .map(|s| Box::new(s) as Box<dyn Setting>)
                .map_err(|e| {
                    SettingError::new(WIRELESS_SECURITY_SETTING_ERROR_DOMAIN, e.to_string())
                })
        },
    }
}
