//! WiFi network credentials

use std::fmt;

use crate::PayloadError;

/// Security label meaning "no password required"
pub const NO_PASSWORD_LABEL: &str = "nopass";

/// Credentials for one WiFi network.
///
/// Immutable once built. The SSID is never empty.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential {
    ssid: String,
    secret: Option<String>,
    security_label: Option<String>,
}

impl Credential {
    /// Create credentials for an open network
    pub fn new(ssid: impl Into<String>) -> Result<Self, PayloadError> {
        let ssid = ssid.into();
        if ssid.is_empty() {
            return Err(PayloadError::MissingSsid);
        }
        Ok(Credential {
            ssid,
            secret: None,
            security_label: None,
        })
    }

    /// Set the password; an empty password counts as none
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        self.secret = (!secret.is_empty()).then_some(secret);
        self
    }

    /// Set the security label verbatim
    pub fn with_security_label(mut self, label: impl Into<String>) -> Self {
        self.security_label = Some(label.into());
        self
    }

    /// Network name, never empty
    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    /// Password, if one was given.
    ///
    /// Never `Some("")`: an empty password is stored as `None`.
    ///
    /// ```
    /// use wifiqr_core::Credential;
    ///
    /// let open = Credential::new("Cafe").unwrap().with_secret("");
    /// assert_eq!(open.secret(), None);
    ///
    /// let home: Credential = "WIFI:S:Home;T:WPA;P:pw;;".parse().unwrap();
    /// assert_eq!(home.secret(), Some("pw"));
    /// assert_eq!(home.security_label(), Some("WPA"));
    /// ```
    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    /// Security label as written in the payload, e.g. `WPA` or `nopass`
    pub fn security_label(&self) -> Option<&str> {
        self.security_label.as_deref()
    }

    /// Whether the security label demands a password.
    ///
    /// True when a label is present, non-empty, and not `nopass`.
    pub fn requires_secret(&self) -> bool {
        matches!(
            self.security_label.as_deref(),
            Some(label) if !label.is_empty() && label != NO_PASSWORD_LABEL
        )
    }

    /// Password required by the label but absent
    pub fn is_missing_secret(&self) -> bool {
        self.requires_secret() && self.secret.is_none()
    }

    /// Network details shown to the user before connecting
    pub fn summary(&self, reveal_secret: bool) -> String {
        let mut message = format!("SSID: {}", self.ssid);

        if let Some(secret) = &self.secret {
            if reveal_secret {
                message.push_str(&format!("\nPassword: {}", secret));
            } else {
                message.push_str(&format!("\nPassword: {}", "*".repeat(secret.chars().count())));
            }
        } else if self.security_label.as_deref() == Some(NO_PASSWORD_LABEL) {
            message.push_str("\nPassword: None (Open Network)");
        }

        match &self.security_label {
            Some(label) => message.push_str(&format!("\nSecurity: {}", label)),
            None => message.push_str("\nSecurity: Unknown"),
        }

        message
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("ssid", &self.ssid)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("security_label", &self.security_label)
            .finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ssid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ssid_rejected() {
        assert_eq!(Credential::new(""), Err(PayloadError::MissingSsid));
    }

    #[test]
    fn test_requires_secret() {
        let open = Credential::new("Cafe").unwrap();
        assert!(!open.requires_secret());

        let nopass = Credential::new("Cafe").unwrap().with_security_label("nopass");
        assert!(!nopass.requires_secret());

        let empty_label = Credential::new("Cafe").unwrap().with_security_label("");
        assert!(!empty_label.requires_secret());

        let wpa = Credential::new("Home").unwrap().with_security_label("WPA");
        assert!(wpa.requires_secret());
        assert!(wpa.is_missing_secret());
        assert!(!wpa.with_secret("hunter22").is_missing_secret());
    }

    #[test]
    fn test_empty_secret_is_none() {
        let cred = Credential::new("Home").unwrap().with_secret("");
        assert_eq!(cred.secret(), None);
    }

    #[test]
    fn test_summary() {
        let cred = Credential::new("Home")
            .unwrap()
            .with_secret("abc")
            .with_security_label("WPA");
        assert_eq!(cred.summary(true), "SSID: Home\nPassword: abc\nSecurity: WPA");
        assert_eq!(cred.summary(false), "SSID: Home\nPassword: ***\nSecurity: WPA");

        let open = Credential::new("Cafe").unwrap().with_security_label("nopass");
        assert_eq!(
            open.summary(false),
            "SSID: Cafe\nPassword: None (Open Network)\nSecurity: nopass"
        );

        let bare = Credential::new("Lab").unwrap();
        assert_eq!(bare.summary(false), "SSID: Lab\nSecurity: Unknown");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let cred = Credential::new("Home").unwrap().with_secret("topsecret");
        let debug = format!("{:?}", cred);
        assert!(!debug.contains("topsecret"));
        assert!(debug.contains("<redacted>"));
        assert_eq!(cred.to_string(), "Home");
    }
}
