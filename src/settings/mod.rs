//! Built-in setting variants
//!
//! Each variant implements the [`Setting`](crate::Setting) capability
//! contract and ships a registry descriptor. Third-party variants follow the
//! same pattern and register themselves with
//! [`register_setting`](crate::registry::register_setting).

use crate::registry::SettingDescriptor;

pub mod connection;
pub mod ip;
pub mod mobile;
pub mod ppp;
pub mod wired;
pub mod wireless;

pub use connection::{ConnectionSetting, CONNECTION_SETTING_NAME};
pub use ip::{Ip4Setting, Ip6Setting, IpAddress, IpConfig, IpRoute, IP4_SETTING_NAME, IP6_SETTING_NAME};
pub use mobile::{GsmSetting, GSM_SETTING_NAME};
pub use ppp::{PppSetting, PppoeSetting, PPPOE_SETTING_NAME, PPP_SETTING_NAME};
pub use wired::{WiredSetting, WIRED_SETTING_NAME};
pub use wireless::{
    WirelessSecuritySetting, WirelessSetting, WIRELESS_SECURITY_SETTING_NAME,
    WIRELESS_SETTING_NAME,
};

pub(crate) fn builtin_descriptors() -> Vec<SettingDescriptor> {
    vec![
        connection::descriptor(),
        wired::descriptor(),
        wireless::descriptor(),
        wireless::security_descriptor(),
        mobile::descriptor(),
        ppp::descriptor(),
        ppp::pppoe_descriptor(),
        ip::ip4_descriptor(),
        ip::ip6_descriptor(),
    ]
}
