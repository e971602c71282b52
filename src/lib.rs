//! netprofile - network connection profile model
//!
//! A connection profile ([`Connection`]) bundles the settings needed to
//! configure a network device: a `connection` meta-setting carrying
//! identity, a base setting describing the hardware or session layer, and
//! optional layered settings (security, PPP, IP configuration). Setting
//! types are open for extension: implement [`Setting`] and register a
//! descriptor with [`registry::register_setting`], and the new type takes
//! part in lookup, validation, diffing, secrets handling, and bulk
//! serialization like the built-ins.
//!
//! ```
//! use netprofile::settings::{ConnectionSetting, WiredSetting, WIRED_SETTING_NAME};
//! use netprofile::Connection;
//!
//! let mut connection = Connection::new();
//! connection.add_setting(Box::new(ConnectionSetting::new("Office", WIRED_SETTING_NAME)));
//! connection.add_setting(Box::new(WiredSetting::default()));
//! assert!(connection.verify().is_ok());
//! ```

pub mod connection;
pub mod error;
pub mod registry;
pub mod setting;
pub mod settings;
pub mod validation;

pub use connection::{Connection, ConnectionMap, SettingsDiff};
pub use error::{ConnectionError, ConnectionResult, ErrorDomain, SettingError};
pub use setting::{
    setting_type_id, CompareFlags, DiffResult, PropertyMap, SecretFilter, SecretFlags,
    SerializeFlags, Setting,
};
