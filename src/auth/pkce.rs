use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

pub struct PkcePair {
    pub code_verifier: String,
    pub code_challenge: String,
}

/// Draws 32 bytes from the thread-local CSPRNG and derives the S256
/// challenge. The verifier lives only as long as the authorization attempt.
pub fn generate_pkce_pair() -> PkcePair {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);

    let code_verifier = URL_SAFE_NO_PAD.encode(bytes);
    let code_challenge = code_challenge_s256(&code_verifier);

    PkcePair {
        code_verifier,
        code_challenge,
    }
}

/// SHA-256 over the verifier's UTF-8 bytes, base64url without padding.
pub fn code_challenge_s256(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// CSRF state token carried across the authorization redirect.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_url_safe(s: &str) -> bool {
        s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    #[test]
    fn verifier_length_and_alphabet_conform_to_rfc_7636() {
        let pair = generate_pkce_pair();
        assert!(pair.code_verifier.len() >= 43);
        assert!(pair.code_verifier.len() <= 128);
        assert!(is_url_safe(&pair.code_verifier));
        assert!(is_url_safe(&pair.code_challenge));
    }

    #[test]
    fn challenge_is_deterministic() {
        let pair = generate_pkce_pair();
        assert_eq!(
            code_challenge_s256(&pair.code_verifier),
            pair.code_challenge
        );
    }

    #[test]
    fn challenge_matches_rfc_7636_appendix_b_vector() {
        let challenge = code_challenge_s256("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn verifiers_are_unique() {
        let a = generate_pkce_pair();
        let b = generate_pkce_pair();
        assert_ne!(a.code_verifier, b.code_verifier);
    }

    #[test]
    fn state_is_long_enough_and_url_safe() {
        let state = generate_state();
        assert!(state.len() >= 16);
        assert!(is_url_safe(&state));
        assert_ne!(state, generate_state());
    }
}
