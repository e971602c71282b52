//! End-to-end tests for the connection aggregate: validation, comparison,
//! diffing, secrets handling, and bulk serialization.

use netprofile::settings::{
    ConnectionSetting, GsmSetting, Ip4Setting, PppSetting, PppoeSetting, WiredSetting,
    WirelessSecuritySetting, WirelessSetting, GSM_SETTING_NAME, PPPOE_SETTING_NAME,
    PPP_SETTING_NAME, WIRED_SETTING_NAME, WIRELESS_SECURITY_SETTING_NAME, WIRELESS_SETTING_NAME,
};
use netprofile::{
    CompareFlags, Connection, ConnectionError, DiffResult, PropertyMap, SerializeFlags, Setting,
};
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn wired_connection() -> Connection {
    let mut connection = Connection::new();
    connection.add_setting(Box::new(ConnectionSetting::new("Office", WIRED_SETTING_NAME)));
    connection.add_setting(Box::new(WiredSetting::default()));
    connection
}

fn wifi_connection() -> Connection {
    let mut connection = Connection::new();
    connection.add_setting(Box::new(ConnectionSetting::new(
        "HomeNet",
        WIRELESS_SETTING_NAME,
    )));
    connection.add_setting(Box::new(WirelessSetting {
        ssid: "HomeNet".to_string(),
        security: Some(WIRELESS_SECURITY_SETTING_NAME.to_string()),
        ..WirelessSetting::default()
    }));
    connection.add_setting(Box::new(WirelessSecuritySetting {
        psk: Some("correct horse battery staple".to_string()),
        ..WirelessSecuritySetting::default()
    }));
    connection
}

#[test]
fn test_verify_requires_meta_setting() {
    let mut connection = Connection::new();
    assert_eq!(
        connection.verify(),
        Err(ConnectionError::ConnectionSettingNotFound)
    );

    // A base setting alone does not help.
    connection.add_setting(Box::new(WiredSetting::default()));
    assert_eq!(
        connection.verify(),
        Err(ConnectionError::ConnectionSettingNotFound)
    );
}

#[test]
fn test_verify_rejects_non_base_type() {
    let mut connection = Connection::new();
    connection.add_setting(Box::new(ConnectionSetting::new("Dialup", PPP_SETTING_NAME)));
    connection.add_setting(Box::new(PppSetting::default()));

    assert!(matches!(
        connection.verify(),
        Err(ConnectionError::ConnectionTypeInvalid(_))
    ));
}

#[test]
fn test_verify_requires_declared_setting_present() {
    let mut connection = Connection::new();
    connection.add_setting(Box::new(ConnectionSetting::new("Office", WIRED_SETTING_NAME)));

    // The type resolves in the registry but the setting is not held.
    assert!(matches!(
        connection.verify(),
        Err(ConnectionError::ConnectionTypeInvalid(_))
    ));
}

#[test]
fn test_verify_wired_and_wifi() {
    assert!(wired_connection().verify().is_ok());
    assert!(wifi_connection().verify().is_ok());
}

#[test]
fn test_verify_pppoe_as_base_type() {
    let mut connection = Connection::new();
    connection.add_setting(Box::new(ConnectionSetting::new("DSL", PPPOE_SETTING_NAME)));
    connection.add_setting(Box::new(PppoeSetting {
        username: "subscriber@isp".to_string(),
        ..PppoeSetting::default()
    }));

    assert!(connection.verify().is_ok());
}

#[test]
fn test_verify_cross_setting_failure_surfaces_domain() {
    let mut connection = wifi_connection();
    connection.remove_setting(std::any::TypeId::of::<WirelessSecuritySetting>());

    // The wifi setting references a security sibling that is now gone.
    match connection.verify() {
        Err(ConnectionError::Setting(e)) => assert_eq!(e.domain.0, "wireless-setting-error"),
        other => panic!("expected setting error, got {:?}", other),
    }
}

#[test]
fn test_compare_none_handling() {
    let connection = wired_connection();
    assert!(Connection::compare(None, None, CompareFlags::EXACT));
    assert!(!Connection::compare(
        Some(&connection),
        None,
        CompareFlags::EXACT
    ));
    assert!(!Connection::compare(
        None,
        Some(&connection),
        CompareFlags::EXACT
    ));
}

#[test]
fn test_compare_detects_extra_setting_in_either_side() {
    let a = wired_connection();
    let mut b = a.duplicate();
    assert!(Connection::compare(Some(&a), Some(&b), CompareFlags::EXACT));

    b.add_setting(Box::new(Ip4Setting::default()));
    assert!(!Connection::compare(Some(&a), Some(&b), CompareFlags::EXACT));
    assert!(!Connection::compare(Some(&b), Some(&a), CompareFlags::EXACT));
}

#[test]
fn test_compare_ignore_secrets() {
    let a = wifi_connection();
    let mut b = a.duplicate();
    b.setting_mut::<WirelessSecuritySetting>().unwrap().psk =
        Some("a different passphrase".to_string());

    assert!(!Connection::compare(Some(&a), Some(&b), CompareFlags::EXACT));
    assert!(Connection::compare(
        Some(&a),
        Some(&b),
        CompareFlags::IGNORE_SECRETS
    ));
}

#[test]
fn test_diff_equal_connections_is_none() {
    let a = wired_connection();
    let b = a.duplicate();
    assert!(a.diff(Some(&a), CompareFlags::EXACT).is_none());
    assert!(a.diff(Some(&b), CompareFlags::EXACT).is_none());
    assert!(a.diff(None, CompareFlags::EXACT).is_some());
}

#[test]
fn test_diff_setting_only_in_one_side() {
    let mut a = wired_connection();
    a.add_setting(Box::new(Ip4Setting::default()));
    let b = wired_connection();

    // ipv4 exists only in A; all its properties carry IN_A and no IN_B.
    let diffs = a.diff(Some(&b), CompareFlags::EXACT).unwrap();
    let ip4 = diffs.get("ipv4").unwrap();
    assert!(!ip4.is_empty());
    for result in ip4.values() {
        assert!(result.contains(DiffResult::IN_A));
        assert!(!result.contains(DiffResult::IN_B));
    }

    // Same comparison from the other direction reports IN_B.
    let diffs = b.diff(Some(&a), CompareFlags::EXACT).unwrap();
    let ip4 = diffs.get("ipv4").unwrap();
    for result in ip4.values() {
        assert!(result.contains(DiffResult::IN_B));
        assert!(!result.contains(DiffResult::IN_A));
    }
}

#[test]
fn test_diff_value_difference_reports_both_sides() {
    let a = wired_connection();
    let mut b = a.duplicate();
    b.setting_mut::<WiredSetting>().unwrap().auto_negotiate = false;

    let diffs = a.diff(Some(&b), CompareFlags::EXACT).unwrap();
    let wired = diffs.get(WIRED_SETTING_NAME).unwrap();
    let result = wired.get("auto-negotiate").unwrap();
    assert!(result.contains(DiffResult::IN_A | DiffResult::IN_B));
    // Only B's value deviates from the type default.
    assert!(result.contains(DiffResult::IN_B_DEFAULT));
    assert!(!result.contains(DiffResult::IN_A_DEFAULT));
}

#[test]
fn test_diff_optional_property_set_on_one_side() {
    let a = wired_connection();
    let mut b = a.duplicate();
    b.setting_mut::<WiredSetting>().unwrap().mtu = Some(9000);

    // mtu is unset in A and never serialized there, so only B reports it.
    let diffs = a.diff(Some(&b), CompareFlags::EXACT).unwrap();
    let wired = diffs.get(WIRED_SETTING_NAME).unwrap();
    let mtu = wired.get("mtu").unwrap();
    assert!(mtu.contains(DiffResult::IN_B | DiffResult::IN_B_DEFAULT));
    assert!(!mtu.contains(DiffResult::IN_A));
}

#[test]
fn test_need_secrets_lower_layers_first() {
    // GSM (base, priority 1) is asked before PPP layered on top.
    let mut connection = Connection::new();
    connection.add_setting(Box::new(ConnectionSetting::new("Mobile", GSM_SETTING_NAME)));
    connection.add_setting(Box::new(GsmSetting::default()));
    connection.add_setting(Box::new(PppSetting::default()));

    let (name, hints) = connection.need_secrets().unwrap();
    assert_eq!(name, GSM_SETTING_NAME);
    assert_eq!(hints, vec!["password".to_string(), "pin".to_string()]);

    // Wifi security (priority 2) is asked before pppoe (priority 3).
    let mut connection = Connection::new();
    connection.add_setting(Box::new(WirelessSecuritySetting::default()));
    connection.add_setting(Box::new(PppoeSetting {
        username: "subscriber@isp".to_string(),
        ..PppoeSetting::default()
    }));

    let (name, hints) = connection.need_secrets().unwrap();
    assert_eq!(name, WIRELESS_SECURITY_SETTING_NAME);
    assert_eq!(hints, vec!["psk".to_string()]);
}

#[test]
fn test_need_secrets_none_when_satisfied() {
    assert!(wired_connection().need_secrets().is_none());
    assert!(wifi_connection().need_secrets().is_none());
}

#[test]
fn test_update_secrets_named_flat_and_nested() {
    let mut connection = wifi_connection();
    let mut flat = PropertyMap::new();
    flat.insert("psk".to_string(), json!("updated passphrase"));
    connection
        .update_secrets(Some(WIRELESS_SECURITY_SETTING_NAME), &flat)
        .unwrap();
    assert_eq!(
        connection
            .setting::<WirelessSecuritySetting>()
            .unwrap()
            .psk
            .as_deref(),
        Some("updated passphrase")
    );

    // The same update wrapped in a full connection blob is unwrapped.
    let mut nested = PropertyMap::new();
    nested.insert(
        WIRELESS_SECURITY_SETTING_NAME.to_string(),
        json!({"psk": "nested passphrase"}),
    );
    connection
        .update_secrets(Some(WIRELESS_SECURITY_SETTING_NAME), &nested)
        .unwrap();
    assert_eq!(
        connection
            .setting::<WirelessSecuritySetting>()
            .unwrap()
            .psk
            .as_deref(),
        Some("nested passphrase")
    );
}

#[test]
fn test_update_secrets_unnamed_applies_all() {
    let mut connection = Connection::new();
    connection.add_setting(Box::new(GsmSetting::default()));
    connection.add_setting(Box::new(PppoeSetting {
        username: "subscriber@isp".to_string(),
        ..PppoeSetting::default()
    }));

    let mut blob = PropertyMap::new();
    blob.insert(GSM_SETTING_NAME.to_string(), json!({"pin": "1234"}));
    blob.insert(PPPOE_SETTING_NAME.to_string(), json!({"password": "hunter2"}));
    connection.update_secrets(None, &blob).unwrap();

    assert_eq!(
        connection.setting::<GsmSetting>().unwrap().pin.as_deref(),
        Some("1234")
    );
    assert_eq!(
        connection
            .setting::<PppoeSetting>()
            .unwrap()
            .password
            .as_deref(),
        Some("hunter2")
    );
}

#[test]
fn test_update_secrets_unknown_setting_fails_without_rollback() {
    let mut connection = Connection::new();
    connection.add_setting(Box::new(GsmSetting::default()));

    // Blob entries are applied in name order, so "gsm" lands before the
    // unknown "zzz-vpn" entry fails the operation.
    let mut blob = PropertyMap::new();
    blob.insert(GSM_SETTING_NAME.to_string(), json!({"password": "hunter2"}));
    blob.insert("zzz-vpn".to_string(), json!({"password": "other"}));

    assert_eq!(
        connection.update_secrets(None, &blob),
        Err(ConnectionError::SettingNotFound("zzz-vpn".to_string()))
    );
    assert_eq!(
        connection
            .setting::<GsmSetting>()
            .unwrap()
            .password
            .as_deref(),
        Some("hunter2")
    );
}

#[test]
fn test_update_secrets_unnamed_checks_names_before_shape() {
    let mut connection = Connection::new();
    connection.add_setting(Box::new(GsmSetting::default()));

    // An unknown name fails even when its value is not a settings map.
    let mut blob = PropertyMap::new();
    blob.insert("zzz-vpn".to_string(), json!(42));
    assert_eq!(
        connection.update_secrets(None, &blob),
        Err(ConnectionError::SettingNotFound("zzz-vpn".to_string()))
    );

    // A non-map value for a held setting is skipped, not an error.
    let mut blob = PropertyMap::new();
    blob.insert(GSM_SETTING_NAME.to_string(), json!(42));
    connection.update_secrets(None, &blob).unwrap();
    assert!(connection.setting::<GsmSetting>().unwrap().password.is_none());
}

#[test]
fn test_update_secrets_named_unknown_setting() {
    let mut connection = wired_connection();
    let mut blob = PropertyMap::new();
    blob.insert("psk".to_string(), json!("whatever"));

    assert_eq!(
        connection.update_secrets(Some(WIRELESS_SECURITY_SETTING_NAME), &blob),
        Err(ConnectionError::SettingNotFound(
            WIRELESS_SECURITY_SETTING_NAME.to_string()
        ))
    );
}

#[test]
fn test_to_map_omits_empty_settings() {
    let connection = wifi_connection();

    // Only the security setting holds secrets; everything else serializes
    // empty under OnlySecrets and is omitted.
    let map = connection.to_map(SerializeFlags::OnlySecrets).unwrap();
    assert_eq!(map.len(), 1);
    assert!(map.contains_key(WIRELESS_SECURITY_SETTING_NAME));

    // No secrets anywhere means no map at all.
    assert!(wired_connection().to_map(SerializeFlags::OnlySecrets).is_none());
    assert!(Connection::new().to_map(SerializeFlags::All).is_none());
}

#[test]
fn test_to_map_no_secrets_strips_secret_properties() {
    let connection = wifi_connection();
    let map = connection.to_map(SerializeFlags::NoSecrets).unwrap();
    let security = map.get(WIRELESS_SECURITY_SETTING_NAME).unwrap();
    assert!(!security.contains_key("psk"));
    assert!(security.contains_key("key-mgmt"));
}

#[test]
fn test_bulk_round_trip() {
    let original = wifi_connection();
    let map = original.to_map(SerializeFlags::All).unwrap();

    let restored = Connection::from_map(&map).unwrap();
    assert!(Connection::compare(
        Some(&original),
        Some(&restored),
        CompareFlags::EXACT
    ));
    assert_eq!(restored.id(), original.id());
    assert_eq!(restored.uuid(), original.uuid());
}

#[test]
fn test_from_map_skips_unknown_settings() {
    init_tracing();
    let mut map = wired_connection().to_map(SerializeFlags::All).unwrap();
    let mut bogus = PropertyMap::new();
    bogus.insert("anything".to_string(), json!(42));
    map.insert("bogus-setting".to_string(), bogus);

    let connection = Connection::from_map(&map).unwrap();
    assert!(connection.get_setting_by_name("bogus-setting").is_none());
    assert!(connection.verify().is_ok());
}

#[test]
fn test_from_map_rejects_malformed_permissions() {
    let mut map = wired_connection().to_map(SerializeFlags::All).unwrap();
    map.get_mut("connection")
        .unwrap()
        .insert("permissions".to_string(), json!([1, 2, 3]));

    assert!(matches!(
        Connection::from_map(&map),
        Err(ConnectionError::PropertyTypeMismatch(_))
    ));
}

#[test]
fn test_replace_settings_permissions_checked_before_mutation() {
    let mut connection = wired_connection();
    let mut map = wifi_connection().to_map(SerializeFlags::All).unwrap();
    map.get_mut("connection")
        .unwrap()
        .insert("permissions".to_string(), json!("not-a-list"));

    assert!(matches!(
        connection.replace_settings(&map),
        Err(ConnectionError::PropertyTypeMismatch(_))
    ));
    // The shape check fires before any setting is touched.
    assert!(connection.setting::<WiredSetting>().is_some());
    assert!(connection.setting::<WirelessSetting>().is_none());
}

#[test]
fn test_replace_settings_not_atomic_on_verify_failure() {
    let mut connection = wired_connection();

    // A map with no base setting fails verification, but the old settings
    // are already gone.
    let mut map = netprofile::ConnectionMap::new();
    map.insert(
        "connection".to_string(),
        ConnectionSetting::new("Broken", WIRED_SETTING_NAME).to_map(SerializeFlags::All),
    );

    assert!(matches!(
        connection.replace_settings(&map),
        Err(ConnectionError::ConnectionTypeInvalid(_))
    ));
    assert!(connection.setting::<WiredSetting>().is_none());
    assert_eq!(connection.id(), Some("Broken"));
}

#[test]
fn test_connection_type_helpers() {
    let connection = wired_connection();
    assert_eq!(connection.connection_type(), Some(WIRED_SETTING_NAME));
    assert!(connection.is_type(WIRED_SETTING_NAME));
    assert!(!connection.is_type(WIRELESS_SETTING_NAME));
    assert!(connection.virtual_iface_name().is_none());
}
