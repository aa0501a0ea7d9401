//! base64url helpers for log fields and challenge transport. Never pads,
//! matching what `webauthn-rs` puts in the ceremony options.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}
