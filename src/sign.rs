//! Outbound request signing.
//!
//! Signatures let the upstream verify origin and freshness without the relay leaking the
//! caller's own credentials: the digest is an HMAC-SHA256 over `"{timestamp}.{payload}"`
//! keyed by a shared secret, carried in [`TIMESTAMP_HEADER`] and [`SIGNATURE_HEADER`].
//! The payload is the serialized JSON body, or the empty string for body-less calls.

// crates.io
use hmac::{Hmac, Mac};
use sha2::Sha256;
// self
use crate::_prelude::*;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex-encoded request signature.
pub const SIGNATURE_HEADER: &str = "x-relay-signature";
/// Header carrying the signing timestamp (unix milliseconds as a string).
pub const TIMESTAMP_HEADER: &str = "x-relay-timestamp";

/// Signs outbound requests with a shared HMAC-SHA256 secret.
#[derive(Clone)]
pub struct RequestSigner {
	secret: String,
}
impl RequestSigner {
	/// Creates a signer for the provided shared secret.
	pub fn new(secret: impl Into<String>) -> Self {
		Self { secret: secret.into() }
	}

	/// Computes the lowercase hex digest over `"{timestamp}.{payload}"`.
	pub fn sign(&self, timestamp: &str, payload: &str) -> String {
		let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
			.expect("HMAC-SHA256 accepts keys of any length.");

		mac.update(timestamp.as_bytes());
		mac.update(b".");
		mac.update(payload.as_bytes());

		hex::encode(mac.finalize().into_bytes())
	}

	/// Produces the signature header pair for `payload` at the given instant.
	///
	/// Retried attempts call this again so every attempt carries a fresh timestamp.
	pub fn signed_headers_at(&self, payload: &str, now: OffsetDateTime) -> SignedHeaders {
		let timestamp = (now.unix_timestamp_nanos() / 1_000_000).to_string();
		let signature = self.sign(&timestamp, payload);

		SignedHeaders { timestamp, signature }
	}
}
impl Debug for RequestSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("RequestSigner(..)")
	}
}

/// Header values produced for one signed attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedHeaders {
	/// Unix-millisecond timestamp the signature covers.
	pub timestamp: String,
	/// Hex-encoded HMAC-SHA256 digest.
	pub signature: String,
}
