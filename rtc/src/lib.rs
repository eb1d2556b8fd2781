//! # RTC Peer - WebRTC negotiation core
//!
//! The part of a [W3C WebRTC](https://www.w3.org/TR/webrtc/) peer connection that sits above
//! the network: the offer/answer state machine, trickle ICE candidate bookkeeping, data
//! channel id allocation, and ordered delivery of connection events.
//!
//! Candidate gathering, connectivity checks, DTLS and SCTP are performed by a
//! **transport engine** you plug in through the [`engine::TransportEngine`] trait. The
//! engine reports what it observes through an [`engine::EngineNotifier`]; the connection
//! turns those reports into state transitions and events.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use rtc_peer::engine::TransportEngine;
//! use rtc_peer::peer_connection::RTCPeerConnection;
//! use rtc_peer::peer_connection::configuration::RTCConfigurationBuilder;
//! use rtc_peer::peer_connection::event::RTCPeerConnectionEvent;
//! use rtc_peer::peer_connection::sdp::RTCSessionDescription;
//! use rtc_peer::peer_connection::transport::RTCIceServer;
//!
//! # fn my_engine() -> Arc<dyn TransportEngine> { unimplemented!() }
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // 1. Create a peer connection with ICE servers
//! let config = RTCConfigurationBuilder::new()
//!     .with_ice_servers(vec![RTCIceServer {
//!         urls: vec!["stun:stun.l.google.com:19302".to_string()],
//!         ..Default::default()
//!     }])
//!     .build();
//! let pc = RTCPeerConnection::new(my_engine(), config)?;
//! let mut events = pc.subscribe();
//!
//! // 2. Create an offer and apply it
//! let offer = pc.create_offer(None)?.wait()?;
//! pc.set_local_description(offer.clone())?;
//! // signaling.send(offer.to_json()?)?;
//!
//! // 3. Apply the remote answer
//! # let answer_json = String::new();
//! let answer = RTCSessionDescription::from_json(&answer_json)?;
//! pc.set_remote_description(answer)?;
//!
//! // 4. Trickle local candidates to the remote peer
//! while let Some(event) = events.blocking_recv() {
//!     if let RTCPeerConnectionEvent::OnIceCandidateEvent(e) = event {
//!         match e.candidate {
//!             Some(candidate) => { /* signaling.send(candidate.to_json()) */ }
//!             None => break,
//!         }
//!     }
//! }
//!
//! pc.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! Every [`peer_connection::RTCPeerConnection`] method takes `&self` and the connection is
//! `Send + Sync`. State changes of one connection are serialized on a single lock. Events,
//! whether raised by a call or by the engine, enter one queue and are delivered in order on
//! a dedicated thread per connection, so handlers never run on engine threads.
//!
//! `create_offer` and `create_answer` return a [`peer_connection::PendingDescription`]:
//! `.await` it or call `wait()`. Closing the connection resolves every pending request
//! with [`shared::error::Error::ErrOperationAborted`].
//!
//! ## Specification Compliance
//!
//! - [W3C WebRTC 1.0] - Main WebRTC API specification
//! - [RFC 8829] - JSEP: JavaScript Session Establishment Protocol
//! - [RFC 8866] - SDP: Session Description Protocol
//! - [RFC 8838] - Trickle ICE
//! - [RFC 8839] - SDP Offer/Answer Procedures for ICE
//! - [RFC 8832] - WebRTC Data Channel Establishment Protocol
//!
//! [W3C WebRTC 1.0]: https://www.w3.org/TR/webrtc/
//! [RFC 8829]: https://datatracker.ietf.org/doc/html/rfc8829
//! [RFC 8866]: https://datatracker.ietf.org/doc/html/rfc8866
//! [RFC 8838]: https://datatracker.ietf.org/doc/html/rfc8838
//! [RFC 8839]: https://datatracker.ietf.org/doc/html/rfc8839
//! [RFC 8832]: https://datatracker.ietf.org/doc/html/rfc8832

#![doc(
    html_logo_url = "https://raw.githubusercontent.com/webrtc-rs/webrtc-rs.github.io/master/res/rtc.png"
)]
#![warn(rust_2018_idioms)]

pub use {sdp, shared};

pub mod data_channel;
pub mod engine;
pub mod peer_connection;
