//! Secret fields whose plaintext the service never returns
//!
//! The service stores a secret encrypted and only hands back ciphertext.
//! To keep refreshes stable the declared plaintext is kept in the recorded
//! inputs and the ciphertext in the recorded outputs. On read, the two are
//! reconciled in one of three modes:
//!
//! - [`SecretMode::Create`]: a fresh plaintext and no stored ciphertext yet
//! - [`SecretMode::Merge`]: both are known; if the service still holds the
//!   ciphertext we stored, the plaintext is still correct
//! - [`SecretMode::Import`]: no plaintext at all; a placeholder stands in
//!   until the user supplies the real value

use crate::value::{PropertyMap, Value};

/// Plaintext shown for a secret imported without its value
pub const IMPORT_PLACEHOLDER: &str = "<REPLACE WITH ACTUAL SECRET VALUE>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretMode {
    Create,
    Merge,
    Import,
}

/// One secret field's reconciliation inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretMerge<'a> {
    plaintext: Option<&'a str>,
    stored_ciphertext: Option<&'a str>,
}

impl<'a> SecretMerge<'a> {
    pub const fn new(plaintext: Option<&'a str>, stored_ciphertext: Option<&'a str>) -> Self {
        Self {
            plaintext,
            stored_ciphertext,
        }
    }

    /// Reconcile one field from recorded inputs and recorded outputs
    pub fn from_state(
        inputs: &'a PropertyMap,
        input_key: &str,
        state: &'a PropertyMap,
        ciphertext_key: &str,
    ) -> Self {
        Self::new(inputs.get_str(input_key), state.get_str(ciphertext_key))
    }

    pub const fn mode(&self) -> SecretMode {
        match (self.plaintext, self.stored_ciphertext) {
            (Some(_), None) => SecretMode::Create,
            (Some(_), Some(_)) => SecretMode::Merge,
            (None, _) => SecretMode::Import,
        }
    }

    /// Plaintext to record as input, given what the service now returns
    ///
    /// In merge mode a changed ciphertext means the secret was rotated out
    /// of band; the recorded plaintext is cleared so the next diff shows
    /// the declared value as a change.
    pub fn input_value(&self, current_ciphertext: &str) -> Value {
        let plaintext = match (self.mode(), self.plaintext) {
            (SecretMode::Create, Some(plaintext)) => plaintext,
            (SecretMode::Merge, Some(plaintext))
                if self.stored_ciphertext == Some(current_ciphertext) =>
            {
                plaintext
            }
            (SecretMode::Merge, _) => "",
            _ => IMPORT_PLACEHOLDER,
        };
        Value::secret(plaintext)
    }

    /// Record both sides of the field
    ///
    /// The plaintext goes to `inputs[input_key]` as a secret; the ciphertext
    /// goes to `outputs[ciphertext_key]`.
    pub fn apply(
        &self,
        inputs: &mut PropertyMap,
        input_key: &str,
        outputs: &mut PropertyMap,
        ciphertext_key: &str,
        current_ciphertext: &str,
    ) {
        inputs.insert(input_key, self.input_value(current_ciphertext));
        outputs.insert(ciphertext_key, current_ciphertext);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modes() {
        assert_eq!(SecretMerge::new(Some("p"), None).mode(), SecretMode::Create);
        assert_eq!(
            SecretMerge::new(Some("p"), Some("c")).mode(),
            SecretMode::Merge
        );
        assert_eq!(SecretMerge::new(None, Some("c")).mode(), SecretMode::Import);
        assert_eq!(SecretMerge::new(None, None).mode(), SecretMode::Import);
    }

    #[test]
    fn test_create_keeps_plaintext() {
        let merge = SecretMerge::new(Some("hunter2"), None);
        let value = merge.input_value("cipher-1");
        assert!(value.is_secret());
        assert_eq!(value.as_str(), Some("hunter2"));
    }

    #[test]
    fn test_merge_unchanged_ciphertext_keeps_plaintext() {
        let merge = SecretMerge::new(Some("hunter2"), Some("cipher-1"));
        assert_eq!(merge.input_value("cipher-1").as_str(), Some("hunter2"));
    }

    #[test]
    fn test_merge_rotated_ciphertext_clears_plaintext() {
        let merge = SecretMerge::new(Some("hunter2"), Some("cipher-1"));
        assert_eq!(merge.input_value("cipher-2").as_str(), Some(""));
    }

    #[test]
    fn test_import_uses_placeholder() {
        let merge = SecretMerge::new(None, None);
        assert_eq!(merge.input_value("cipher").as_str(), Some(IMPORT_PLACEHOLDER));
    }

    #[test]
    fn test_apply_never_leaks_plaintext_into_outputs() {
        let inputs = PropertyMap::new().with("secret", Value::secret("hunter2"));
        let state = PropertyMap::new().with("secretCiphertext", "cipher-1");
        let merge = SecretMerge::from_state(&inputs, "secret", &state, "secretCiphertext");

        let mut new_inputs = PropertyMap::new();
        let mut outputs = PropertyMap::new();
        merge.apply(&mut new_inputs, "secret", &mut outputs, "secretCiphertext", "cipher-1");

        assert_eq!(outputs.get_str("secretCiphertext"), Some("cipher-1"));
        assert!(!outputs.to_string().contains("hunter2"));
        assert!(new_inputs.get("secret").unwrap().is_secret());
        assert_eq!(new_inputs.get_str("secret"), Some("hunter2"));
    }
}
