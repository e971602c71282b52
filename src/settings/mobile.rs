//! GSM mobile broadband setting

use crate::error::{ErrorDomain, SettingError};
use crate::registry::SettingDescriptor;
use crate::setting::{
    from_property_map, serialize_setting, to_property_map, PropertyMap, SecretFilter, SecretFlags,
    SerializeFlags, Setting,
};
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};

pub const GSM_SETTING_NAME: &str = "gsm";
pub const GSM_SETTING_ERROR_DOMAIN: ErrorDomain = ErrorDomain("gsm-setting-error");

const MAX_APN_LEN: usize = 64;

/// GSM/UMTS modem configuration. A base type; its PIN and password must be
/// resolved before the PPP layer on top of it can start.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GsmSetting {
    /// Number to dial
    pub number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Provider password (secret)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub password_flags: SecretFlags,
    /// Access point name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apn: Option<String>,
    /// SIM unlock PIN (secret)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    pub pin_flags: SecretFlags,
}

impl Default for GsmSetting {
    fn default() -> Self {
        Self {
            number: "*99#".to_string(),
            username: None,
            password: None,
            password_flags: SecretFlags::NONE,
            apn: None,
            pin: None,
            pin_flags: SecretFlags::NONE,
        }
    }
}

impl Setting for GsmSetting {
    fn name(&self) -> &'static str {
        GSM_SETTING_NAME
    }

    fn error_domain(&self) -> ErrorDomain {
        GSM_SETTING_ERROR_DOMAIN
    }

    fn verify(&self, _siblings: &[&dyn Setting]) -> Result<(), SettingError> {
        if self.number.is_empty() {
            return Err(SettingError::new(
                GSM_SETTING_ERROR_DOMAIN,
                "number cannot be empty",
            ));
        }
        if let Some(apn) = &self.apn {
            if apn.len() > MAX_APN_LEN {
                return Err(SettingError::new(
                    GSM_SETTING_ERROR_DOMAIN,
                    format!("apn too long (max {} characters)", MAX_APN_LEN),
                ));
            }
            if !apn
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
            {
                return Err(SettingError::new(
                    GSM_SETTING_ERROR_DOMAIN,
                    format!("invalid apn '{}'", apn),
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
        &["password", "pin"]
    }

    fn secret_flags(&self, property: &str) -> SecretFlags {
        match property {
            "password" => self.password_flags,
            "pin" => self.pin_flags,
            _ => SecretFlags::NONE,
        }
    }

    fn need_secrets(&self) -> Vec<String> {
        let mut hints = Vec::new();
        if self.password.as_deref().is_none_or(str::is_empty)
            && !self.password_flags.contains(SecretFlags::NOT_REQUIRED)
        {
            hints.push("password".to_string());
        }
        if self.pin.as_deref().is_none_or(str::is_empty)
            && !self.pin_flags.contains(SecretFlags::NOT_REQUIRED)
        {
            hints.push("pin".to_string());
        }
        hints
    }

    fn update_secrets(&mut self, secrets: &PropertyMap) -> Result<(), SettingError> {
        for prop in ["password", "pin"] {
            if let Some(value) = secrets.get(prop) {
                let value = value.as_str().ok_or_else(|| {
                    SettingError::new(
                        GSM_SETTING_ERROR_DOMAIN,
                        format!("secret '{}' must be a string", prop),
                    )
                })?;
                match prop {
                    "password" => self.password = Some(value.to_string()),
                    _ => self.pin = Some(value.to_string()),
                }
            }
        }
        Ok(())
    }

    fn clear_secrets(&mut self, filter: Option<&SecretFilter<'_>>) {
        let clear =
            |prop: &str, flags: SecretFlags| filter.is_none_or(|f| f(GSM_SETTING_NAME, prop, flags));
        if clear("password", self.password_flags) {
            self.password = None;
        }
        if clear("pin", self.pin_flags) {
            self.pin = None;
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
        name: GSM_SETTING_NAME,
        type_id: TypeId::of::<GsmSetting>(),
        priority: 1,
        error_domain: GSM_SETTING_ERROR_DOMAIN,
        new_setting: || Box::new(GsmSetting::default()),
        from_map: |map| {
            from_property_map::<GsmSetting>(map)
                .map(|s| Box::new(s) as Box<dyn Setting>)
                .map_err(|e| SettingError::new(GSM_SETTING_ERROR_DOMAIN, e.to_string()))
        },
    }
}
