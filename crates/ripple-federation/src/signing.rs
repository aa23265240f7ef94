use crate::inbox::SignatureVerifier;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use ripple_models::SignatureEnvelope;

/// DER prefix of an ed25519 SubjectPublicKeyInfo; the raw 32-byte key
/// follows immediately after it.
const ED25519_SPKI_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];

/// Production signature verifier: ed25519 over the envelope's signing
/// string, with the public key carried as PEM (SPKI) and the signature
/// base64-encoded. Every decode failure collapses to "does not verify";
/// hostile input must not distinguish a broken key from a broken signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, envelope: &SignatureEnvelope, public_key_pem: &str) -> bool {
        if !matches!(envelope.algorithm.as_str(), "ed25519" | "hs2019") {
            return false;
        }
        let Some(key) = decode_public_key_pem(public_key_pem) else {
            return false;
        };
        let Ok(signature_bytes) = BASE64.decode(&envelope.signature) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(&signature_bytes) else {
            return false;
        };
        key.verify(envelope.signing_string.as_bytes(), &signature)
            .is_ok()
    }
}

/// Parse a PEM public key into a verifying key. Accepts both a bare 32-byte
/// body and the SPKI wrapping produced by common tooling.
pub fn decode_public_key_pem(pem: &str) -> Option<VerifyingKey> {
    let body: String = pem
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .map(str::trim)
        .collect();
    let der = BASE64.decode(body.as_bytes()).ok()?;
    let raw: [u8; 32] = match der.len() {
        32 => der.as_slice().try_into().ok()?,
        44 if der[..12] == ED25519_SPKI_PREFIX => der[12..].try_into().ok()?,
        _ => return None,
    };
    VerifyingKey::from_bytes(&raw).ok()
}

pub fn encode_public_key_pem(key: &VerifyingKey) -> String {
    let mut der = Vec::with_capacity(44);
    der.extend_from_slice(&ED25519_SPKI_PREFIX);
    der.extend_from_slice(&key.to_bytes());
    let body = BASE64.encode(der);
    let mut out = String::from("-----BEGIN PUBLIC KEY-----\n");
    let mut rest = body.as_str();
    while rest.len() > 64 {
        let (line, tail) = rest.split_at(64);
        out.push_str(line);
        out.push('\n');
        rest = tail;
    }
    out.push_str(rest);
    out.push_str("\n-----END PUBLIC KEY-----\n");
    out
}

/// Sign a signing string, returning the base64 signature. Counterpart of
/// `Ed25519Verifier`; used by outbound delivery and by tests.
pub fn sign_signing_string(key: &SigningKey, signing_string: &str) -> String {
    BASE64.encode(key.sign(signing_string.as_bytes()).to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_envelope(key: &SigningKey, signing_string: &str) -> SignatureEnvelope {
        SignatureEnvelope {
            key_id: "https://remote.example/users/alice#main-key".into(),
            algorithm: "ed25519".into(),
            signing_string: signing_string.into(),
            signature: sign_signing_string(key, signing_string),
        }
    }

    #[test]
    fn pem_round_trip() {
        let key = SigningKey::from_bytes(&[7u8; 32]);
        let pem = encode_public_key_pem(&key.verifying_key());
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
        let decoded = decode_public_key_pem(&pem).expect("pem should decode");
        assert_eq!(decoded, key.verifying_key());
    }

    #[test]
    fn valid_signature_verifies() {
        let key = SigningKey::from_bytes(&[7u8; 32]);
        let pem = encode_public_key_pem(&key.verifying_key());
        let envelope = signed_envelope(&key, "(request-target): post /inbox\ndate: now");
        assert!(Ed25519Verifier.verify(&envelope, &pem));
    }

    #[test]
    fn wrong_key_does_not_verify() {
        let signer = SigningKey::from_bytes(&[7u8; 32]);
        let other = SigningKey::from_bytes(&[8u8; 32]);
        let pem = encode_public_key_pem(&other.verifying_key());
        let envelope = signed_envelope(&signer, "(request-target): post /inbox");
        assert!(!Ed25519Verifier.verify(&envelope, &pem));
    }

    #[test]
    fn tampered_signing_string_does_not_verify() {
        let key = SigningKey::from_bytes(&[7u8; 32]);
        let pem = encode_public_key_pem(&key.verifying_key());
        let mut envelope = signed_envelope(&key, "(request-target): post /inbox");
        envelope.signing_string.push_str("\nhost: evil.example");
        assert!(!Ed25519Verifier.verify(&envelope, &pem));
    }

    #[test]
    fn garbage_key_material_does_not_verify() {
        let key = SigningKey::from_bytes(&[7u8; 32]);
        let envelope = signed_envelope(&key, "data");
        assert!(!Ed25519Verifier.verify(&envelope, "not a pem at all"));
        assert!(!Ed25519Verifier.verify(
            &envelope,
            "-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----\n"
        ));
    }

    #[test]
    fn unsupported_algorithm_does_not_verify() {
        let key = SigningKey::from_bytes(&[7u8; 32]);
        let pem = encode_public_key_pem(&key.verifying_key());
        let mut envelope = signed_envelope(&key, "data");
        envelope.algorithm = "rsa-sha256".into();
        assert!(!Ed25519Verifier.verify(&envelope, &pem));
    }
}
