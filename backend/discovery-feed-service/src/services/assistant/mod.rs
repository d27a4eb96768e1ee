// Preference summary handed to the stylist assistant. The assistant's reply is
// not our concern; we only seed its request context.

use crate::services::profile_builder::PreferenceProfile;
use serde::Serialize;

const EMPTY_PROFILE_SUMMARY: &str = "exploring new styles";

/// Read-only snapshot of the user's strongest tags
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StylistContext {
    pub top_tags: Vec<String>,
}

impl StylistContext {
    pub fn from_profile(profile: &PreferenceProfile, n: usize) -> Self {
        Self {
            top_tags: profile.top_tags(n),
        }
    }

    /// "Summer, Casual, Bold", or a neutral phrase for a cold-start user
    pub fn summary(&self) -> String {
        if self.top_tags.is_empty() {
            EMPTY_PROFILE_SUMMARY.to_string()
        } else {
            self.top_tags.join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lists_top_tags() {
        let profile: PreferenceProfile = [
            ("Summer", 4.0),
            ("Casual", 2.0),
            ("Bold", 1.0),
            ("Winter", 0.5),
        ]
        .into_iter()
        .collect();

        let context = StylistContext::from_profile(&profile, 3);
        assert_eq!(context.top_tags, vec!["Summer", "Casual", "Bold"]);
        assert_eq!(context.summary(), "Summer, Casual, Bold");
    }

    #[test]
    fn test_cold_start_summary() {
        let context = StylistContext::from_profile(&PreferenceProfile::new(), 3);
        assert!(context.top_tags.is_empty());
        assert_eq!(context.summary(), "exploring new styles");
    }
}
