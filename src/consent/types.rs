use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tag_manager::error::{invalid_argument, GtmError};

/// Consent mode applied to a single storage category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentMode {
    Granted,
    Denied,
}

impl ConsentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentMode::Granted => "granted",
            ConsentMode::Denied => "denied",
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, ConsentMode::Granted)
    }
}

impl fmt::Display for ConsentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsentMode {
    type Err = GtmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "granted" => Ok(ConsentMode::Granted),
            "denied" => Ok(ConsentMode::Denied),
            other => Err(invalid_argument(format!("unknown consent mode `{other}`"))),
        }
    }
}

/// Consent categories recognised by Google consent mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentType {
    AnalyticsStorage,
    AdStorage,
    AdUserData,
    AdPersonalization,
    FunctionalityStorage,
    SecurityStorage,
}

impl ConsentType {
    pub const ALL: [ConsentType; 6] = [
        ConsentType::AnalyticsStorage,
        ConsentType::AdStorage,
        ConsentType::AdUserData,
        ConsentType::AdPersonalization,
        ConsentType::FunctionalityStorage,
        ConsentType::SecurityStorage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentType::AnalyticsStorage => "analytics_storage",
            ConsentType::AdStorage => "ad_storage",
            ConsentType::AdUserData => "ad_user_data",
            ConsentType::AdPersonalization => "ad_personalization",
            ConsentType::FunctionalityStorage => "functionality_storage",
            ConsentType::SecurityStorage => "security_storage",
        }
    }

    /// Necessary categories stay granted even when the user rejects tracking.
    pub fn is_necessary(&self) -> bool {
        matches!(
            self,
            ConsentType::FunctionalityStorage | ConsentType::SecurityStorage
        )
    }
}

impl fmt::Display for ConsentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsentType {
    type Err = GtmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        ConsentType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == key)
            .ok_or_else(|| invalid_argument(format!("unknown consent type `{key}`")))
    }
}

/// Whether (and how) the visitor has answered the consent prompt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
    Partial,
}

impl ConsentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentStatus::Pending => "pending",
            ConsentStatus::Accepted => "accepted",
            ConsentStatus::Rejected => "rejected",
            ConsentStatus::Partial => "partial",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ConsentStatus::Pending)
    }
}

impl fmt::Display for ConsentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete consent state: every category always carries a mode.
///
/// Deserialization requires all six categories, so a persisted record that lost a
/// field is rejected instead of silently widening or narrowing consent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsentSettings {
    pub analytics_storage: ConsentMode,
    pub ad_storage: ConsentMode,
    pub ad_user_data: ConsentMode,
    pub ad_personalization: ConsentMode,
    pub functionality_storage: ConsentMode,
    pub security_storage: ConsentMode,
}

impl Default for ConsentSettings {
    fn default() -> Self {
        Self::necessary_only()
    }
}

impl ConsentSettings {
    /// Every category set to `mode`.
    pub fn uniform(mode: ConsentMode) -> Self {
        Self {
            analytics_storage: mode,
            ad_storage: mode,
            ad_user_data: mode,
            ad_personalization: mode,
            functionality_storage: mode,
            security_storage: mode,
        }
    }

    pub fn all_granted() -> Self {
        Self::uniform(ConsentMode::Granted)
    }

    /// Tracking denied, necessary categories granted. This is also the default.
    pub fn necessary_only() -> Self {
        let mut settings = Self::uniform(ConsentMode::Denied);
        settings.functionality_storage = ConsentMode::Granted;
        settings.security_storage = ConsentMode::Granted;
        settings
    }

    pub fn get(&self, ty: ConsentType) -> ConsentMode {
        match ty {
            ConsentType::AnalyticsStorage => self.analytics_storage,
            ConsentType::AdStorage => self.ad_storage,
            ConsentType::AdUserData => self.ad_user_data,
            ConsentType::AdPersonalization => self.ad_personalization,
            ConsentType::FunctionalityStorage => self.functionality_storage,
            ConsentType::SecurityStorage => self.security_storage,
        }
    }

    pub fn set(&mut self, ty: ConsentType, mode: ConsentMode) {
        let slot = match ty {
            ConsentType::AnalyticsStorage => &mut self.analytics_storage,
            ConsentType::AdStorage => &mut self.ad_storage,
            ConsentType::AdUserData => &mut self.ad_user_data,
            ConsentType::AdPersonalization => &mut self.ad_personalization,
            ConsentType::FunctionalityStorage => &mut self.functionality_storage,
            ConsentType::SecurityStorage => &mut self.security_storage,
        };
        *slot = mode;
    }

    pub fn with(mut self, ty: ConsentType, mode: ConsentMode) -> Self {
        self.set(ty, mode);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConsentType, ConsentMode)> + '_ {
        ConsentType::ALL.into_iter().map(|ty| (ty, self.get(ty)))
    }

    /// Returns a copy where every category named in `partial` is overridden.
    pub fn merge(&self, partial: &PartialConsent) -> Self {
        let mut merged = *self;
        for (ty, mode) in partial.iter() {
            merged.set(ty, mode);
        }
        merged
    }

    /// JSON object keyed by the consent-mode wire names, as handed to `gtag('consent', ...)`.
    pub fn to_json_map(&self) -> Map<String, Value> {
        self.iter()
            .map(|(ty, mode)| (ty.as_str().to_string(), Value::String(mode.as_str().into())))
            .collect()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.to_json_map())
    }
}

/// A subset of categories used for granular updates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartialConsent {
    entries: BTreeMap<ConsentType, ConsentMode>,
}

impl PartialConsent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, ty: ConsentType, mode: ConsentMode) -> Self {
        self.entries.insert(ty, mode);
        self
    }

    pub fn insert(&mut self, ty: ConsentType, mode: ConsentMode) -> Option<ConsentMode> {
        self.entries.insert(ty, mode)
    }

    pub fn get(&self, ty: ConsentType) -> Option<ConsentMode> {
        self.entries.get(&ty).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConsentType, ConsentMode)> + '_ {
        self.entries.iter().map(|(ty, mode)| (*ty, *mode))
    }
}

impl FromIterator<(ConsentType, ConsentMode)> for PartialConsent {
    fn from_iter<I: IntoIterator<Item = (ConsentType, ConsentMode)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_grant_only_necessary_categories() {
        let settings = ConsentSettings::default();
        for (ty, mode) in settings.iter() {
            assert_eq!(mode.is_granted(), ty.is_necessary(), "{ty}");
        }
    }

    #[test]
    fn merge_overrides_only_named_categories() {
        let partial = PartialConsent::new()
            .with(ConsentType::AnalyticsStorage, ConsentMode::Granted)
            .with(ConsentType::SecurityStorage, ConsentMode::Denied);
        let merged = ConsentSettings::default().merge(&partial);

        assert_eq!(merged.analytics_storage, ConsentMode::Granted);
        assert_eq!(merged.security_storage, ConsentMode::Denied);
        assert_eq!(merged.ad_storage, ConsentMode::Denied);
        assert_eq!(merged.functionality_storage, ConsentMode::Granted);
    }

    #[test]
    fn json_map_uses_wire_names() {
        let value = ConsentSettings::all_granted()
            .with(ConsentType::AdUserData, ConsentMode::Denied)
            .to_json();
        assert_eq!(
            value,
            json!({
                "analytics_storage": "granted",
                "ad_storage": "granted",
                "ad_user_data": "denied",
                "ad_personalization": "granted",
                "functionality_storage": "granted",
                "security_storage": "granted"
            })
        );
    }

    #[test]
    fn deserialization_rejects_missing_categories() {
        let raw = r#"{"analytics_storage":"granted","ad_storage":"granted"}"#;
        assert!(serde_json::from_str::<ConsentSettings>(raw).is_err());
    }

    #[test]
    fn partial_consent_serializes_as_plain_map() {
        let partial = PartialConsent::new().with(ConsentType::AdStorage, ConsentMode::Granted);
        assert_eq!(
            serde_json::to_value(&partial).unwrap(),
            json!({"ad_storage": "granted"})
        );
    }

    #[test]
    fn parses_types_and_modes() {
        assert_eq!(
            "ad_personalization".parse::<ConsentType>().unwrap(),
            ConsentType::AdPersonalization
        );
        assert_eq!(" Granted ".parse::<ConsentMode>().unwrap(), ConsentMode::Granted);
        assert_eq!(
            "cookies".parse::<ConsentType>().unwrap_err().code_str(),
            "gtm/invalid-argument"
        );
    }
}
