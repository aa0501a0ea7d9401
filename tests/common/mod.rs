//! Shared helpers: a software authenticator and a router driver.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use ciborium::Value as Cbor;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use rand::rngs::OsRng;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tower::ServiceExt;
use url::Url;

use passkey_rp_server::create_router;
use passkey_rp_server::state::AppState;
use passkey_rp_server::webauthn::relying_party::RelyingParty;
use passkey_rp_server::webauthn::{encoding, user_handle};

pub const RP_ID: &str = "localhost";
pub const ORIGIN: &str = "http://localhost:8080";

const FLAG_UP: u8 = 0x01;
const FLAG_UV: u8 = 0x04;
const FLAG_AT: u8 = 0x40;

pub fn relying_party() -> RelyingParty {
    RelyingParty::new(RP_ID, "Test RP", vec![Url::parse(ORIGIN).unwrap()])
}

pub fn test_state() -> AppState {
    AppState::in_memory(relying_party()).unwrap()
}

/// POST `body` to `path`, returning the status and JSON body.
pub async fn post_json(app: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn get_json(app: &Router, path: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub fn app(state: AppState) -> Router {
    create_router(state)
}

/// Attestation statement the authenticator attaches at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attestation {
    None,
    /// `packed` self attestation, signed with the credential key.
    PackedSelf,
    /// `packed` self attestation whose signature was altered in transit.
    PackedSelfTampered,
}

/// A platform authenticator holding one ES256 credential.
///
/// `rp_id` and `origin` are what it claims in its responses; tests change
/// them to impersonate a foreign site.
pub struct SoftAuthenticator {
    key: SigningKey,
    pub credential_id: Vec<u8>,
    pub sign_count: u32,
    pub rp_id: String,
    pub origin: String,
}

impl SoftAuthenticator {
    pub fn new() -> Self {
        let mut credential_id = vec![0u8; 16];
        rand::RngCore::fill_bytes(&mut OsRng, &mut credential_id);
        Self {
            key: SigningKey::random(&mut OsRng),
            credential_id,
            sign_count: 0,
            rp_id: RP_ID.to_string(),
            origin: ORIGIN.to_string(),
        }
    }

    pub fn cose_key(&self) -> Vec<u8> {
        let point = self.key.verifying_key().to_encoded_point(false);
        let map = Cbor::Map(vec![
            (Cbor::Integer(1.into()), Cbor::Integer(2.into())),
            (Cbor::Integer(3.into()), Cbor::Integer((-7).into())),
            (Cbor::Integer((-1).into()), Cbor::Integer(1.into())),
            (Cbor::Integer((-2).into()), Cbor::Bytes(point.x().unwrap().to_vec())),
            (Cbor::Integer((-3).into()), Cbor::Bytes(point.y().unwrap().to_vec())),
        ]);
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&map, &mut bytes).unwrap();
        bytes
    }

    fn auth_data(&self, flags: u8, attested: bool) -> Vec<u8> {
        let mut data = Sha256::digest(self.rp_id.as_bytes()).to_vec();
        data.push(if attested { flags | FLAG_AT } else { flags });
        data.extend_from_slice(&self.sign_count.to_be_bytes());
        if attested {
            data.extend_from_slice(&[0u8; 16]);
            data.extend_from_slice(&(self.credential_id.len() as u16).to_be_bytes());
            data.extend_from_slice(&self.credential_id);
            data.extend_from_slice(&self.cose_key());
        }
        data
    }

    fn client_data(&self, type_: &str, challenge: &str) -> Vec<u8> {
        json!({
            "type": type_,
            "challenge": challenge,
            "origin": self.origin,
            "crossOrigin": false
        })
        .to_string()
        .into_bytes()
    }

    /// `navigator.credentials.create()` against registration options.
    pub fn register(&self, options: &Value) -> Value {
        let challenge = options["challenge"].as_str().unwrap();
        self.register_with_challenge(challenge)
    }

    pub fn register_with_challenge(&self, challenge: &str) -> Value {
        self.register_attested(challenge, Attestation::None)
    }

    pub fn register_attested(&self, challenge: &str, attestation: Attestation) -> Value {
        let auth_data = self.auth_data(FLAG_UP | FLAG_UV, true);
        let client_data = self.client_data("webauthn.create", challenge);

        let (fmt, statement) = match attestation {
            Attestation::None => ("none", Cbor::Map(vec![])),
            Attestation::PackedSelf | Attestation::PackedSelfTampered => {
                let mut signed = auth_data.clone();
                signed.extend_from_slice(&Sha256::digest(&client_data));
                let signature: Signature = self.key.sign(&signed);
                let mut sig = signature.to_der().as_bytes().to_vec();
                if attestation == Attestation::PackedSelfTampered {
                    if let Some(last) = sig.last_mut() {
                        *last ^= 0x01;
                    }
                }
                (
                    "packed",
                    Cbor::Map(vec![
                        (Cbor::Text("alg".into()), Cbor::Integer((-7).into())),
                        (Cbor::Text("sig".into()), Cbor::Bytes(sig)),
                    ]),
                )
            }
        };

        credential_json(
            &self.credential_id,
            &client_data,
            attestation_object(fmt, statement, auth_data),
        )
    }

    /// `navigator.credentials.get()` against authentication options.
    /// Bumps the signature counter first, as real authenticators do.
    pub fn login(&mut self, options: &Value, username: &str) -> Value {
        self.sign_count += 1;
        let challenge = options["challenge"].as_str().unwrap();
        self.assert_with_challenge(challenge, username)
    }

    pub fn assert_with_challenge(&self, challenge: &str, username: &str) -> Value {
        let auth_data = self.auth_data(FLAG_UP | FLAG_UV, false);
        let client_data = self.client_data("webauthn.get", challenge);

        let mut signed = auth_data.clone();
        signed.extend_from_slice(&Sha256::digest(&client_data));
        let signature: Signature = self.key.sign(&signed);

        let id = encoding::encode(&self.credential_id);
        json!({
            "id": id,
            "rawId": id,
            "type": "public-key",
            "response": {
                "clientDataJSON": encoding::encode(client_data),
                "authenticatorData": encoding::encode(auth_data),
                "signature": encoding::encode(signature.to_der().as_bytes()),
                "userHandle": encoding::encode(user_handle(username).as_bytes())
            },
            "extensions": {}
        })
    }

    /// Same credential id, different private key.
    pub fn impostor(&self) -> Self {
        Self {
            key: SigningKey::random(&mut OsRng),
            credential_id: self.credential_id.clone(),
            sign_count: self.sign_count,
            rp_id: self.rp_id.clone(),
            origin: self.origin.clone(),
        }
    }
}

fn attestation_object(fmt: &str, statement: Cbor, auth_data: Vec<u8>) -> Vec<u8> {
    let attestation = Cbor::Map(vec![
        (Cbor::Text("fmt".into()), Cbor::Text(fmt.into())),
        (Cbor::Text("attStmt".into()), statement),
        (Cbor::Text("authData".into()), Cbor::Bytes(auth_data)),
    ]);
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(&attestation, &mut bytes).unwrap();
    bytes
}

fn credential_json(credential_id: &[u8], client_data: &[u8], attestation_object: Vec<u8>) -> Value {
    let id = encoding::encode(credential_id);
    json!({
        "id": id,
        "rawId": id,
        "type": "public-key",
        "authenticatorAttachment": "platform",
        "response": {
            "clientDataJSON": encoding::encode(client_data),
            "attestationObject": encoding::encode(attestation_object),
            "transports": ["internal", "hybrid"]
        },
        "extensions": {}
    })
}

/// Registration response from an authenticator holding an Ed25519
/// (COSE alg -8) credential instead of ES256.
pub fn ed25519_registration(challenge: &str) -> Value {
    let key = ed25519_dalek::SigningKey::from_bytes(&[7u8; 32]);
    let credential_id = vec![0x25u8; 16];

    let cose_key = Cbor::Map(vec![
        (Cbor::Integer(1.into()), Cbor::Integer(1.into())),
        (Cbor::Integer(3.into()), Cbor::Integer((-8).into())),
        (Cbor::Integer((-1).into()), Cbor::Integer(6.into())),
        (
            Cbor::Integer((-2).into()),
            Cbor::Bytes(key.verifying_key().to_bytes().to_vec()),
        ),
    ]);
    let mut cose_bytes = Vec::new();
    ciborium::ser::into_writer(&cose_key, &mut cose_bytes).unwrap();

    let mut auth_data = Sha256::digest(RP_ID.as_bytes()).to_vec();
    auth_data.push(FLAG_UP | FLAG_UV | FLAG_AT);
    auth_data.extend_from_slice(&0u32.to_be_bytes());
    auth_data.extend_from_slice(&[0u8; 16]);
    auth_data.extend_from_slice(&(credential_id.len() as u16).to_be_bytes());
    auth_data.extend_from_slice(&credential_id);
    auth_data.extend_from_slice(&cose_bytes);

    let client_data = json!({
        "type": "webauthn.create",
        "challenge": challenge,
        "origin": ORIGIN,
        "crossOrigin": false
    })
    .to_string()
    .into_bytes();

    credential_json(
        &credential_id,
        &client_data,
        attestation_object("none", Cbor::Map(vec![]), auth_data),
    )
}

/// Body of a finish call; `data` is sent JSON-encoded, as browsers do.
pub fn finish_body(username: &str, credential: &Value) -> Value {
    json!({ "username": username, "data": credential.to_string() })
}

/// Register `username` end to end, returning the authenticator.
pub async fn register(app: &Router, username: &str) -> SoftAuthenticator {
    let authenticator = SoftAuthenticator::new();
    let (status, options) =
        post_json(app, "/register/start", json!({ "username": username })).await;
    assert_eq!(status, StatusCode::OK);

    let credential = authenticator.register(&options);
    let (status, body) =
        post_json(app, "/register/finish", finish_body(username, &credential)).await;
    assert_eq!(status, StatusCode::OK, "registration failed: {}", body);
    assert_eq!(body["status"], true);

    authenticator
}
