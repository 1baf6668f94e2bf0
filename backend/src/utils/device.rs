//! Device fingerprint hashing.
//!
//! Clients collect stable display/platform signals and hash them into an id
//! used for soft device binding. This is not a security boundary.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use validator::Validate;

/// Signals collected by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DeviceTraits {
    pub screen_width: u32,
    pub screen_height: u32,
    pub color_depth: u32,
    pub pixel_ratio: f64,
    #[validate(length(max = 100))]
    pub timezone: String,
    #[validate(length(max = 100))]
    pub platform: String,
    #[validate(length(max = 50))]
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub hardware_concurrency: u32,
    #[validate(length(max = 300))]
    #[serde(default)]
    pub webgl_renderer: String,
}

impl DeviceTraits {
    /// Fixed-order `|`-joined form hashed by both id functions.
    pub fn canonical(&self) -> String {
        format!(
            "{}x{}|{}|{}|{}|{}|{}|{}|{}",
            self.screen_width,
            self.screen_height,
            self.color_depth,
            self.pixel_ratio,
            self.timezone,
            self.platform,
            self.language,
            self.hardware_concurrency,
            self.webgl_renderer
        )
    }

    /// Lowercase hex SHA-256 of the canonical string.
    pub fn device_id(&self) -> String {
        hex::encode(Sha256::digest(self.canonical().as_bytes()))
    }

    /// Id produced by clients without WebCrypto: a wrapping `h * 31 + c`
    /// string hash over UTF-16 code units, as `fb-` plus 8 hex digits.
    pub fn fallback_device_id(&self) -> String {
        let hash = self
            .canonical()
            .encode_utf16()
            .fold(0u32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as u32));
        format!("fb-{:08x}", hash)
    }
}

/// Accepts a 64-char hex SHA-256 id or a `fb-` fallback id.
pub fn is_valid_device_id(id: &str) -> bool {
    let is_hex = |s: &str| s.chars().all(|c| c.is_ascii_hexdigit());
    match id.strip_prefix("fb-") {
        Some(rest) => rest.len() == 8 && is_hex(rest),
        None => id.len() == 64 && is_hex(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn laptop() -> DeviceTraits {
        DeviceTraits {
            screen_width: 1920,
            screen_height: 1080,
            color_depth: 24,
            pixel_ratio: 1.25,
            timezone: "Africa/Cairo".to_string(),
            platform: "Win32".to_string(),
            language: "ar-EG".to_string(),
            hardware_concurrency: 8,
            webgl_renderer: "ANGLE (Intel, Intel(R) UHD Graphics 620)".to_string(),
        }
    }

    #[test]
    fn hashing_is_deterministic() {
        assert_eq!(laptop().device_id(), laptop().device_id());
        assert_eq!(laptop().fallback_device_id(), laptop().fallback_device_id());
    }

    #[test]
    fn different_signals_give_different_ids() {
        let mut phone = laptop();
        phone.screen_width = 390;
        assert_ne!(laptop().device_id(), phone.device_id());
    }

    #[test]
    fn ids_have_expected_shape() {
        let id = laptop().device_id();
        assert_eq!(id.len(), 64);
        assert!(is_valid_device_id(&id));

        let fallback = laptop().fallback_device_id();
        assert!(fallback.starts_with("fb-"));
        assert!(is_valid_device_id(&fallback));
    }

    #[test]
    fn fallback_hash_matches_known_value() {
        let traits = DeviceTraits {
            screen_width: 1,
            screen_height: 1,
            color_depth: 0,
            pixel_ratio: 1.0,
            timezone: String::new(),
            platform: String::new(),
            language: String::new(),
            hardware_concurrency: 0,
            webgl_renderer: String::new(),
        };
        assert_eq!(traits.canonical(), "1x1|0|1||||0|");
        // Same value as the browser's `h = (h * 31 + c) | 0` loop.
        assert_eq!(traits.fallback_device_id(), "fb-2e512e1f");
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(!is_valid_device_id(""));
        assert!(!is_valid_device_id("fb-xyz"));
        assert!(!is_valid_device_id(&"g".repeat(64)));
    }
}
