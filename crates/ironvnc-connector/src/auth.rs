use des::cipher::generic_array::GenericArray;
use des::cipher::{BlockEncrypt as _, KeyInit as _};
use des::Des;

use ironvnc_pdu::handshake::{SecurityChallenge, SecurityResponse};

/// Computes the VNC authentication response for a challenge.
///
/// The DES key is the password truncated or zero-padded to 8 bytes, with the
/// bits of each byte reversed (a quirk of the original VNC implementation
/// every server reproduces). The two 8-byte halves of the challenge are
/// encrypted independently in ECB mode.
pub fn encrypt_challenge(challenge: SecurityChallenge, password: &str) -> SecurityResponse {
    let mut key = [0u8; 8];

    for (dst, src) in key.iter_mut().zip(password.bytes()) {
        *dst = src.reverse_bits();
    }

    let cipher = Des::new(GenericArray::from_slice(&key));

    let mut response = challenge.0;

    for half in response.chunks_exact_mut(8) {
        cipher.encrypt_block(GenericArray::from_mut_slice(half));
    }

    SecurityResponse(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    // DES with an all-zero key over an all-zero block.
    const ZERO_KEY_CIPHERTEXT: [u8; 8] = [0x8c, 0xa6, 0x4d, 0xe9, 0xc1, 0xb1, 0x23, 0xa7];

    #[test]
    fn empty_password_zero_challenge() {
        let response = encrypt_challenge(SecurityChallenge([0; 16]), "");

        assert_eq!(response.0[..8], ZERO_KEY_CIPHERTEXT);
        assert_eq!(response.0[8..], ZERO_KEY_CIPHERTEXT);
    }

    #[test]
    fn response_is_deterministic() {
        let challenge = SecurityChallenge([0x5a; 16]);

        let a = encrypt_challenge(challenge, "secret");
        let b = encrypt_challenge(challenge, "secret");

        assert_eq!(a, b);
    }

    #[test]
    fn password_is_truncated_to_eight_bytes() {
        let challenge = SecurityChallenge([0x12; 16]);

        let short = encrypt_challenge(challenge, "12345678");
        let long = encrypt_challenge(challenge, "123456789");

        assert_eq!(short, long);
    }

    #[test]
    fn challenge_halves_are_independent() {
        let mut challenge = [0u8; 16];
        challenge[8..].fill(0xff);

        let response = encrypt_challenge(SecurityChallenge(challenge), "secret");
        let first_half_only = encrypt_challenge(SecurityChallenge([0u8; 16]), "secret");

        assert_eq!(response.0[..8], first_half_only.0[..8]);
        assert_ne!(response.0[8..], first_half_only.0[8..]);
    }
}
