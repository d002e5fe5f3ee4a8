//! Questionnaire answers used to shape a plan.

use serde::{Deserialize, Serialize};

/// Frequency used when the answer has no leading integer.
pub const DEFAULT_FREQUENCY: u32 = 3;

/// Upper bound on training days per week.
pub const MAX_FREQUENCY: u32 = 7;

/// Free-text answers from the questionnaire. Every field is optional and
/// unvalidated; blank strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub age: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub injuries: Option<String>,
    /// Training days per week, e.g. `"3"` or `"5 days/week"`.
    pub frequency: Option<String>,
    pub goal: Option<String>,
    pub level: Option<String>,
    pub restrictions: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Borrowed view of a profile with a default substituted for every absent
/// field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedProfile<'a> {
    pub age: &'a str,
    pub height: &'a str,
    pub weight: &'a str,
    pub injuries: &'a str,
    pub frequency: &'a str,
    pub goal: &'a str,
    pub level: &'a str,
    pub restrictions: &'a str,
}

impl ResolvedProfile<'static> {
    /// Placeholders written into AI prompts.
    pub const PROMPT_PLACEHOLDERS: Self = Self {
        age: "Not specified",
        height: "Not specified",
        weight: "Not specified",
        injuries: "None",
        frequency: "3",
        goal: "General fitness",
        level: "Beginner",
        restrictions: "None",
    };

    /// Values the HTTP endpoint assumes for a sparse request.
    pub const HTTP_DEFAULTS: Self = Self {
        age: "25",
        height: "170cm",
        weight: "70kg",
        injuries: "None",
        frequency: "3",
        goal: "General fitness",
        level: "Beginner",
        restrictions: "None",
    };
}

impl UserProfile {
    /// Fill absent fields from `defaults` without allocating.
    pub fn resolve<'a>(&'a self, defaults: &ResolvedProfile<'a>) -> ResolvedProfile<'a> {
        ResolvedProfile {
            age: present(&self.age).unwrap_or(defaults.age),
            height: present(&self.height).unwrap_or(defaults.height),
            weight: present(&self.weight).unwrap_or(defaults.weight),
            injuries: present(&self.injuries).unwrap_or(defaults.injuries),
            frequency: present(&self.frequency).unwrap_or(defaults.frequency),
            goal: present(&self.goal).unwrap_or(defaults.goal),
            level: present(&self.level).unwrap_or(defaults.level),
            restrictions: present(&self.restrictions).unwrap_or(defaults.restrictions),
        }
    }

    /// Return an owned profile with every absent field set from `defaults`.
    pub fn with_defaults(&self, defaults: &ResolvedProfile<'_>) -> UserProfile {
        let r = self.resolve(defaults);
        UserProfile {
            age: Some(r.age.to_owned()),
            height: Some(r.height.to_owned()),
            weight: Some(r.weight.to_owned()),
            injuries: Some(r.injuries.to_owned()),
            frequency: Some(r.frequency.to_owned()),
            goal: Some(r.goal.to_owned()),
            level: Some(r.level.to_owned()),
            restrictions: Some(r.restrictions.to_owned()),
        }
    }

    /// Goal text if one was given.
    pub fn goal(&self) -> Option<&str> {
        present(&self.goal)
    }

    /// Parsed training days per week, see [`parse_frequency`].
    pub fn training_days(&self) -> u32 {
        parse_frequency(present(&self.frequency))
    }
}

/// Read the leading integer of a frequency answer.
///
/// `"5"`, `"5 days"` and `"5days/week"` all give 5. Answers without a
/// leading integer give [`DEFAULT_FREQUENCY`]. The result is clamped to
/// `1..=MAX_FREQUENCY`.
pub fn parse_frequency(raw: Option<&str>) -> u32 {
    let Some(raw) = raw else {
        return DEFAULT_FREQUENCY;
    };
    let trimmed = raw.trim();
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let digits = &trimmed[..digits_end];
    if digits.is_empty() {
        return DEFAULT_FREQUENCY;
    }
    // Overflow means a very large number, which clamps to the maximum anyway.
    let n = digits.parse::<u32>().unwrap_or(u32::MAX);
    n.clamp(1, MAX_FREQUENCY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_reads_leading_integer() {
        assert_eq!(parse_frequency(Some("5")), 5);
        assert_eq!(parse_frequency(Some("5 days")), 5);
        assert_eq!(parse_frequency(Some("4 days/week")), 4);
        assert_eq!(parse_frequency(Some("  2days")), 2);
    }

    #[test]
    fn frequency_defaults_without_leading_integer() {
        assert_eq!(parse_frequency(None), 3);
        assert_eq!(parse_frequency(Some("")), 3);
        assert_eq!(parse_frequency(Some("often")), 3);
        assert_eq!(parse_frequency(Some("-2")), 3);
    }

    #[test]
    fn frequency_is_clamped() {
        assert_eq!(parse_frequency(Some("0")), 1);
        assert_eq!(parse_frequency(Some("9 days")), 7);
        assert_eq!(parse_frequency(Some("99999999999999")), 7);
    }

    #[test]
    fn resolve_uses_placeholders_for_blank_fields() {
        let profile = UserProfile {
            age: Some("31".to_owned()),
            goal: Some("   ".to_owned()),
            ..UserProfile::default()
        };
        let r = profile.resolve(&ResolvedProfile::PROMPT_PLACEHOLDERS);
        assert_eq!(r.age, "31");
        assert_eq!(r.goal, "General fitness");
        assert_eq!(r.height, "Not specified");
        assert_eq!(r.injuries, "None");
    }

    #[test]
    fn with_http_defaults_fills_everything() {
        let profile = UserProfile {
            level: Some("Advanced".to_owned()),
            ..UserProfile::default()
        };
        let filled = profile.with_defaults(&ResolvedProfile::HTTP_DEFAULTS);
        assert_eq!(filled.age.as_deref(), Some("25"));
        assert_eq!(filled.height.as_deref(), Some("170cm"));
        assert_eq!(filled.weight.as_deref(), Some("70kg"));
        assert_eq!(filled.level.as_deref(), Some("Advanced"));
        assert_eq!(filled.training_days(), 3);
    }

    #[test]
    fn goal_ignores_blank() {
        let profile = UserProfile {
            goal: Some(" ".to_owned()),
            ..UserProfile::default()
        };
        assert_eq!(profile.goal(), None);
    }
}
