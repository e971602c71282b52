//! PPP and PPPoE settings

use crate::error::{ErrorDomain, SettingError};
use crate::registry::SettingDescriptor;
use crate::setting::{
    from_property_map, serialize_setting, to_property_map, PropertyMap, SecretFilter, SecretFlags,
    SerializeFlags, Setting,
};
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};

pub const PPP_SETTING_NAME: &str = "ppp";
pub const PPP_SETTING_ERROR_DOMAIN: ErrorDomain = ErrorDomain("ppp-setting-error");

pub const PPPOE_SETTING_NAME: &str = "pppoe";
pub const PPPOE_SETTING_ERROR_DOMAIN: ErrorDomain = ErrorDomain("pppoe-setting-error");

/// Point-to-point protocol options, layered on top of a base setting such as
/// gsm or pppoe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PppSetting {
    pub noauth: bool,
    pub refuse_eap: bool,
    pub refuse_pap: bool,
    pub refuse_chap: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mru: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
    pub lcp_echo_failure: u32,
    pub lcp_echo_interval: u32,
}

impl Default for PppSetting {
    fn default() -> Self {
        Self {
            noauth: true,
            refuse_eap: false,
            refuse_pap: false,
            refuse_chap: false,
            mru: None,
            mtu: None,
            lcp_echo_failure: 0,
            lcp_echo_interval: 0,
        }
    }
}

impl Setting for PppSetting {
    fn name(&self) -> &'static str {
        PPP_SETTING_NAME
    }

    fn error_domain(&self) -> ErrorDomain {
        PPP_SETTING_ERROR_DOMAIN
    }

    fn verify(&self, _siblings: &[&dyn Setting]) -> Result<(), SettingError> {
        if let Some(mru) = self.mru {
            if !(128..=16384).contains(&mru) {
                return Err(SettingError::new(
                    PPP_SETTING_ERROR_DOMAIN,
                    format!("mru {} out of range 128..=16384", mru),
                ));
            }
        }
        if self.lcp_echo_failure > 0 && self.lcp_echo_interval == 0 {
            return Err(SettingError::new(
                PPP_SETTING_ERROR_DOMAIN,
                "lcp-echo-failure requires lcp-echo-interval",
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

/// PPP-over-Ethernet session configuration. Base-eligible despite not being
/// a hardware setting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PppoeSetting {
    /// Access concentrator service name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    pub username: String,
    /// Session password (secret)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub password_flags: SecretFlags,
}

impl Setting for PppoeSetting {
    fn name(&self) -> &'static str {
        PPPOE_SETTING_NAME
    }

    fn error_domain(&self) -> ErrorDomain {
        PPPOE_SETTING_ERROR_DOMAIN
    }

    fn verify(&self, _siblings: &[&dyn Setting]) -> Result<(), SettingError> {
        if self.username.is_empty() {
            return Err(SettingError::new(
                PPPOE_SETTING_ERROR_DOMAIN,
                "username cannot be empty",
            ));
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
        &["password"]
    }

    fn secret_flags(&self, property: &str) -> SecretFlags {
        match property {
            "password" => self.password_flags,
            _ => SecretFlags::NONE,
        }
    }

    fn need_secrets(&self) -> Vec<String> {
        if self.password.as_deref().is_none_or(str::is_empty)
            && !self.password_flags.contains(SecretFlags::NOT_REQUIRED)
        {
            vec!["password".to_string()]
        } else {
            Vec::new()
        }
    }

    fn update_secrets(&mut self, secrets: &PropertyMap) -> Result<(), SettingError> {
        if let Some(value) = secrets.get("password") {
            let value = value.as_str().ok_or_else(|| {
                SettingError::new(
                    PPPOE_SETTING_ERROR_DOMAIN,
                    "secret 'password' must be a string",
                )
            })?;
            self.password = Some(value.to_string());
        }
        Ok(())
    }

    fn clear_secrets(&mut self, filter: Option<&SecretFilter<'_>>) {
        if filter.is_none_or(|f| f(PPPOE_SETTING_NAME, "password", self.password_flags)) {
            self.password = None;
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
        name: PPP_SETTING_NAME,
        type_id: TypeId::of::<PppSetting>(),
        priority: 3,
        error_domain: PPP_SETTING_ERROR_DOMAIN,
        new_setting: || Box::new(PppSetting::default()),
        from_map: |map| {
            from_property_map::<PppSetting>(map)
                .map(|s| Box::new(s) as Box<dyn Setting>)
                .map_err(|e| SettingError::new(PPP_SETTING_ERROR_DOMAIN, e.to_string()))
        },
    }
}

pub(crate) fn pppoe_descriptor() -> SettingDescriptor {
    SettingDescriptor {
        name: PPPOE_SETTING_NAME,
        type_id: TypeId::of::<PppoeSetting>(),
        priority: 3,
        error_domain: PPPOE_SETTING_ERROR_DOMAIN,
        new_setting: || Box::new(PppoeSetting::default()),
        from_map: |map| {
            from_property_map::<PppoeSetting>(map)
                .map(|s| Box::new(s) as Box<dyn Setting>)
                .map_err(|e| SettingError::new(PPPOE_SETTING_ERROR_DOMAIN, e.to_string()))
        },
    }
}
