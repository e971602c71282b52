//! IPv4 and IPv6 configuration settings

use crate::error::{ErrorDomain, SettingError};
use crate::registry::SettingDescriptor;
use crate::setting::{
    from_property_map, serialize_setting, to_property_map, PropertyMap, SerializeFlags, Setting,
};
use crate::validation;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};

pub const IP4_SETTING_NAME: &str = "ipv4";
pub const IP4_SETTING_ERROR_DOMAIN: ErrorDomain = ErrorDomain("ip4-setting-error");

pub const IP6_SETTING_NAME: &str = "ipv6";
pub const IP6_SETTING_ERROR_DOMAIN: ErrorDomain = ErrorDomain("ip6-setting-error");

const VALID_IP4_METHODS: &[&str] = &["auto", "link-local", "manual", "shared", "disabled"];
const VALID_IP6_METHODS: &[&str] = &[
    "auto",
    "dhcp",
    "link-local",
    "manual",
    "shared",
    "ignore",
    "disabled",
];

/// A static address with prefix length
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpAddress {
    pub address: String,
    pub prefix: u32,
}

/// A static route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IpRoute {
    pub dest: String,
    pub prefix: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_hop: Option<String>,
    pub metric: i64,
}

/// Address configuration shared by the IPv4 and IPv6 settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct IpConfig {
    /// Addressing method
    pub method: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns_search: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<IpAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<IpRoute>,
    pub ignore_auto_routes: bool,
    pub ignore_auto_dns: bool,
    pub never_default: bool,
    pub may_fail: bool,
}

impl Default for IpConfig {
    fn default() -> Self {
        Self {
            method: "auto".to_string(),
            dns: Vec::new(),
            dns_search: Vec::new(),
            addresses: Vec::new(),
            gateway: None,
            routes: Vec::new(),
            ignore_auto_routes: false,
            ignore_auto_dns: false,
            never_default: false,
            may_fail: true,
        }
    }
}

impl IpConfig {
    fn verify(&self, domain: ErrorDomain, is_ipv6: bool) -> Result<(), SettingError> {
        let methods = if is_ipv6 {
            VALID_IP6_METHODS
        } else {
            VALID_IP4_METHODS
        };
        if !methods.contains(&self.method.as_str()) {
            return Err(SettingError::new(
                domain,
                format!("invalid method '{}'", self.method),
            ));
        }
        if self.method == "manual" && self.addresses.is_empty() {
            return Err(SettingError::new(
                domain,
                "manual method requires at least one address",
            ));
        }

        for addr in &self.addresses {
            let parsed = validation::validate_ip_address(&addr.address)
                .map_err(|e| SettingError::new(domain, e))?;
            if parsed.is_ipv6() != is_ipv6 {
                return Err(SettingError::new(
                    domain,
                    format!("address '{}' has the wrong family", addr.address),
                ));
            }
            validation::validate_prefix_len(addr.prefix, is_ipv6)
                .map_err(|e| SettingError::new(domain, e))?;
        }
        for server in &self.dns {
            validation::validate_ip_address(server).map_err(|e| SettingError::new(domain, e))?;
        }
        if let Some(gateway) = &self.gateway {
            validation::validate_ip_address(gateway).map_err(|e| SettingError::new(domain, e))?;
        }
        for route in &self.routes {
            validation::validate_ip_address(&route.dest)
                .map_err(|e| SettingError::new(domain, e))?;
            validation::validate_prefix_len(route.prefix, is_ipv6)
                .map_err(|e| SettingError::new(domain, e))?;
            if let Some(next_hop) = &route.next_hop {
                validation::validate_ip_address(next_hop)
                    .map_err(|e| SettingError::new(domain, e))?;
            }
        }
        Ok(())
    }
}

/// IPv4 addressing configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ip4Setting(pub IpConfig);

impl Setting for Ip4Setting {
    fn name(&self) -> &'static str {
        IP4_SETTING_NAME
    }

    fn error_domain(&self) -> ErrorDomain {
        IP4_SETTING_ERROR_DOMAIN
    }

    fn verify(&self, _siblings: &[&dyn Setting]) -> Result<(), SettingError> {
        self.0.verify(IP4_SETTING_ERROR_DOMAIN, false)
    }

    fn to_map(&self, flags: SerializeFlags) -> PropertyMap {
        serialize_setting(&self.0, &[], flags)
    }

    fn default_map(&self) -> PropertyMap {
        to_property_map(&IpConfig::default())
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

/// IPv6 addressing configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ip6Setting(pub IpConfig);

impl Setting for Ip6Setting {
    fn name(&self) -> &'static str {
        IP6_SETTING_NAME
    }

    fn error_domain(&self) -> ErrorDomain {
        IP6_SETTING_ERROR_DOMAIN
    }

    fn verify(&self, _siblings: &[&dyn Setting]) -> Result<(), SettingError> {
        self.0.verify(IP6_SETTING_ERROR_DOMAIN, true)
    }

    fn to_map(&self, flags: SerializeFlags) -> PropertyMap {
        serialize_setting(&self.0, &[], flags)
    }

    fn default_map(&self) -> PropertyMap {
        to_property_map(&IpConfig::default())
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

pub(crate) fn ip4_descriptor() -> SettingDescriptor {
    SettingDescriptor {
        name: IP4_SETTING_NAME,
        type_id: TypeId::of::<Ip4Setting>(),
        priority: 4,
        error_domain: IP4_SETTING_ERROR_DOMAIN,
        new_setting: || Box::new(Ip4Setting::default()),
        from_map: |map| {
            from_property_map::<Ip4Setting>(map)
                .map(|s| Box::new(s) as Box<dyn Setting>)
                .map_err(|e| SettingError::new(IP4_SETTING_ERROR_DOMAIN, e.to_string()))
        },
    }
}

pub(crate) fn ip6_descriptor() -> SettingDescriptor {
    SettingDescriptor {
        name: IP6_SETTING_NAME,
        type_id: TypeId::of::<Ip6Setting>(),
        priority: 4,
        error_domain: IP6_SETTING_ERROR_DOMAIN,
        new_setting: || Box::new(Ip6Setting::default()),
        from_map: |map| {
            from_property_map::<Ip6Setting>(map)
                .map(|s| Box::new(s) as Box<dyn Setting>)
                .map_err(|e| SettingError::new(IP6_SETTING_ERROR_DOMAIN, e.to_string()))
        },
    }
}
