use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Number of characters in a generated state value.
pub const STATE_LEN: usize = 32;

/// Generate a fresh anti-CSRF state value for one authorization attempt.
pub fn generate_state() -> String {
    // 24 random bytes encode to exactly STATE_LEN base64url characters.
    let mut buf = [0u8; STATE_LEN / 4 * 3];
    rand::Rng::fill_bytes(&mut rand::rng(), &mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_has_fixed_length() {
        for _ in 0..16 {
            assert_eq!(generate_state().len(), STATE_LEN);
        }
    }

    #[test]
    fn state_is_url_safe() {
        let state = generate_state();
        for ch in state.chars() {
            assert!(
                ch.is_ascii_alphanumeric() || ch == '-' || ch == '_',
                "Invalid char in state: '{ch}'"
            );
        }
    }

    #[test]
    fn states_are_unique() {
        assert_ne!(generate_state(), generate_state());
    }
}
