//! Configuration handed to the engine at construction and on updates.
mod common;

use std::time::{Duration, SystemTime};

use anyhow::Result;

use common::{MockEngine, init_log};
use rtc_peer::peer_connection::RTCPeerConnection;
use rtc_peer::peer_connection::certificate::RTCCertificate;
use rtc_peer::peer_connection::configuration::{
    RTCBundlePolicy, RTCConfiguration, RTCConfigurationBuilder, RTCIceTransportPolicy,
};
use rtc_peer::peer_connection::transport::RTCIceServer;
use rtc_peer::shared::error::{Error, ErrorKind};

const PEM: &str = "-----BEGIN CERTIFICATE-----\n\
MIIBdDCCARmgAwIBAgIUQ2vYw3xX1ZtQJ8g7N7o8sR3fS0QwCgYIKoZIzj0EAwIw\n\
-----END CERTIFICATE-----\n";

fn stun_server(url: &str) -> RTCIceServer {
    RTCIceServer {
        urls: vec![url.to_owned()],
        ..Default::default()
    }
}

#[test]
fn test_engine_receives_normalized_servers() -> Result<()> {
    init_log();
    let engine = MockEngine::new();
    let config = RTCConfigurationBuilder::new()
        .with_ice_servers(vec![stun_server(
            "stun:global.stun.twilio.com:3478?transport=udp",
        )])
        .with_ice_candidate_pool_size(3)
        .build();
    let pc = RTCPeerConnection::new(engine.clone(), config.clone())?;

    let state = engine.state.lock().unwrap();
    assert_eq!(state.init_configs.len(), 1);
    let handed = &state.init_configs[0];
    assert_eq!(
        handed.ice_servers()[0].urls,
        vec!["stun:global.stun.twilio.com:3478".to_owned()]
    );
    assert_eq!(handed.ice_candidate_pool_size(), 3);

    // the connection keeps what the application passed
    assert_eq!(pc.get_configuration(), config);
    Ok(())
}

#[test]
fn test_configuration_from_json() -> Result<()> {
    init_log();
    let json = r#"{
        "iceServers": [
            {"urls": ["stun:stun.l.google.com:19302"]},
            {"urls": ["turn:turn.example.org:3478"], "username": "jch", "credential": "topsecret"}
        ],
        "iceTransportPolicy": "relay",
        "bundlePolicy": "max-bundle"
    }"#;
    let config: RTCConfiguration = serde_json::from_str(json)?;
    assert_eq!(config.ice_servers().len(), 2);
    assert_eq!(config.ice_transport_policy(), RTCIceTransportPolicy::Relay);
    assert_eq!(config.bundle_policy(), RTCBundlePolicy::MaxBundle);

    let engine = MockEngine::new();
    let pc = RTCPeerConnection::new(engine, config.clone())?;
    assert_eq!(pc.get_configuration(), config);
    Ok(())
}

#[test]
fn test_set_configuration() -> Result<()> {
    init_log();
    let engine = MockEngine::new();
    let cert = RTCCertificate::from_pem(PEM, SystemTime::now() + Duration::from_secs(3600))?;
    let pc = RTCPeerConnection::new(
        engine.clone(),
        RTCConfigurationBuilder::new()
            .with_peer_identity("alice".to_owned())
            .with_certificates(vec![cert.clone()])
            .build(),
    )?;

    // identity and certificates left empty keep their current values
    let update = RTCConfigurationBuilder::new()
        .with_ice_servers(vec![stun_server("stun:stun.example.org?transport=tcp")])
        .with_ice_transport_policy(RTCIceTransportPolicy::Relay)
        .build();
    pc.set_configuration(update)?;

    let current = pc.get_configuration();
    assert_eq!(current.peer_identity(), "alice");
    assert_eq!(current.certificates(), &[cert]);
    assert_eq!(current.ice_transport_policy(), RTCIceTransportPolicy::Relay);
    assert_eq!(
        current.ice_servers()[0].urls,
        vec!["stun:stun.example.org?transport=tcp".to_owned()]
    );

    let state = engine.state.lock().unwrap();
    assert_eq!(state.updated_configs.len(), 1);
    assert_eq!(
        state.updated_configs[0].ice_servers()[0].urls,
        vec!["stun:stun.example.org".to_owned()]
    );
    Ok(())
}

#[test]
fn test_set_configuration_rejects_fixed_fields() -> Result<()> {
    init_log();
    let engine = MockEngine::new();
    let pc = RTCPeerConnection::new(
        engine.clone(),
        RTCConfigurationBuilder::new()
            .with_peer_identity("alice".to_owned())
            .build(),
    )?;
    let before = pc.get_configuration();

    let tests = vec![
        (
            RTCConfigurationBuilder::new()
                .with_peer_identity("mallory".to_owned())
                .build(),
            Error::ErrModifyingPeerIdentity,
        ),
        (
            RTCConfigurationBuilder::new()
                .with_bundle_policy(RTCBundlePolicy::MaxCompat)
                .build(),
            Error::ErrModifyingBundlePolicy,
        ),
        (
            RTCConfigurationBuilder::new()
                .with_ice_servers(vec![stun_server("http://stun.example.org")])
                .build(),
            Error::ErrInvalidIceServerUrl {
                url: "http://stun.example.org".to_owned(),
                reason: "unknown scheme http".to_owned(),
            },
        ),
    ];

    for (update, expected) in tests {
        let err = pc.set_configuration(update).unwrap_err();
        assert_eq!(err, expected);
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
    }
    assert_eq!(pc.get_configuration(), before);
    assert!(engine.state.lock().unwrap().updated_configs.is_empty());
    Ok(())
}

#[test]
fn test_expired_certificate_rejected() -> Result<()> {
    init_log();
    let engine = MockEngine::new();
    let expired = RTCCertificate::from_pem(PEM, SystemTime::UNIX_EPOCH)?;
    let config = RTCConfigurationBuilder::new()
        .with_certificates(vec![expired])
        .build();

    assert_eq!(
        RTCPeerConnection::new(engine.clone(), config).unwrap_err(),
        Error::ErrCertificateExpired
    );
    assert!(engine.state.lock().unwrap().init_configs.is_empty());
    Ok(())
}
