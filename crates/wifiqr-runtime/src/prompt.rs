//! Permission prompt
//!
//! When authorization is still missing after a request, the user chooses
//! between opening the settings panel (the attempt is deferred) and
//! declining (the attempt fails).

use wifiqr_core::Credential;

/// The user's answer to the permission prompt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SettingsChoice {
    OpenSettings,
    Decline,
}

/// Presents the permission prompt
#[trait_variant::make(Send)]
pub trait SettingsPrompt: Sync + 'static {
    async fn choose(&self, credential: &Credential) -> SettingsChoice;
}

/// Answers every prompt the same way
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedChoice(pub SettingsChoice);

impl SettingsPrompt for FixedChoice {
    async fn choose(&self, _credential: &Credential) -> SettingsChoice {
        self.0
    }
}
