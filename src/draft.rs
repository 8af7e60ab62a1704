//! The per-conversation draft — every field the wizard has collected so far,
//! plus the step the conversation is currently waiting on.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::classify::Candidate;

/// The steps of the intake wizard.
///
/// Progresses linearly: Name → NationalId → Phone → AwaitPhoto →
/// AwaitConfirm → AwaitQty → AwaitCep → AwaitNumber → AwaitDay → AwaitTime.
/// Completing the last step (or cancelling) resets the draft to `Name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Name,
    NationalId,
    Phone,
    AwaitPhoto,
    AwaitConfirm,
    AwaitQty,
    AwaitCep,
    AwaitNumber,
    AwaitDay,
    AwaitTime,
}

impl Step {
    /// Position in the fixed ordering. The engine only ever moves this
    /// forward, or back to `Name` on cancel/completion/photo rejection.
    pub fn ordinal(&self) -> usize {
        match self {
            Self::Name => 0,
            Self::NationalId => 1,
            Self::Phone => 2,
            Self::AwaitPhoto => 3,
            Self::AwaitConfirm => 4,
            Self::AwaitQty => 5,
            Self::AwaitCep => 6,
            Self::AwaitNumber => 7,
            Self::AwaitDay => 8,
            Self::AwaitTime => 9,
        }
    }

    /// Whether the identity profile is still being collected. Media arriving
    /// during these steps is stashed rather than classified.
    pub fn in_profile(&self) -> bool {
        matches!(self, Self::Name | Self::NationalId | Self::Phone)
    }
}

impl Default for Step {
    fn default() -> Self {
        Self::Name
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Name => "name",
            Self::NationalId => "national_id",
            Self::Phone => "phone",
            Self::AwaitPhoto => "await_photo",
            Self::AwaitConfirm => "await_confirm",
            Self::AwaitQty => "await_qty",
            Self::AwaitCep => "await_cep",
            Self::AwaitNumber => "await_number",
            Self::AwaitDay => "await_day",
            Self::AwaitTime => "await_time",
        };
        write!(f, "{s}")
    }
}

/// Identity fields, each filled once and never rewritten within a draft.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl UserProfile {
    /// All three identity fields collected.
    pub fn is_complete(&self) -> bool {
        self.name.is_some() && self.national_id.is_some() && self.phone.is_some()
    }
}

/// The chosen pickup day and slot. `time` stays absent between the day
/// selection and the slot selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub day: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

/// Accumulating record of one conversation. Always JSON-serializable;
/// unset fields are omitted from the encoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    #[serde(default)]
    pub step: Step,

    #[serde(default)]
    pub user: UserProfile,

    /// Set only after a successful classification; cleared when the user
    /// rejects the guess.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Candidate>,

    /// Ranked candidates awaiting a manual pick (top-k policy only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<Candidate>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub qty: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,

    /// Media reference received before the profile was complete;
    /// classified automatically once the phone number validates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_media: Option<String>,
}

impl Draft {
    /// Reset to a fresh initial draft (cancellation or completion).
    pub fn reset(&mut self) {
        *self = Draft::default();
    }

    /// Everything the confirmation summary needs is present.
    pub fn is_complete(&self) -> bool {
        self.user.is_complete()
            && self.item.is_some()
            && self.qty.is_some()
            && self.address.is_some()
            && self
                .schedule
                .as_ref()
                .is_some_and(|s| s.time.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_ordering_is_strictly_increasing() {
        let steps = [
            Step::Name,
            Step::NationalId,
            Step::Phone,
            Step::AwaitPhoto,
            Step::AwaitConfirm,
            Step::AwaitQty,
            Step::AwaitCep,
            Step::AwaitNumber,
            Step::AwaitDay,
            Step::AwaitTime,
        ];
        for pair in steps.windows(2) {
            assert!(pair[0].ordinal() < pair[1].ordinal());
        }
    }

    #[test]
    fn profile_steps_stash_media() {
        assert!(Step::Name.in_profile());
        assert!(Step::NationalId.in_profile());
        assert!(Step::Phone.in_profile());
        assert!(!Step::AwaitPhoto.in_profile());
        assert!(!Step::AwaitTime.in_profile());
    }

    #[test]
    fn display_matches_serde() {
        let steps = [Step::Name, Step::AwaitPhoto, Step::AwaitCep, Step::AwaitTime];
        for step in steps {
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(json, format!("\"{step}\""));
        }
    }

    #[test]
    fn empty_draft_serializes_without_optional_fields() {
        let json = serde_json::to_value(Draft::default()).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.get("step").unwrap(), "name");
        assert!(!obj.contains_key("item"));
        assert!(!obj.contains_key("qty"));
        assert!(!obj.contains_key("address"));
        assert!(!obj.contains_key("schedule"));
        assert!(!obj.contains_key("pending_media"));
    }

    #[test]
    fn draft_serde_roundtrip() {
        let mut draft = Draft::default();
        draft.step = Step::AwaitDay;
        draft.user = UserProfile {
            name: Some("Maria Silva".into()),
            national_id: Some("52998224725".into()),
            phone: Some("11987654321".into()),
        };
        draft.item = Some(Candidate {
            label: "Battery".into(),
            score: 0.91,
        });
        draft.qty = Some(3);

        let json = serde_json::to_string(&draft).unwrap();
        let parsed: Draft = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, draft);
    }

    #[test]
    fn completeness_requires_all_groups() {
        let mut draft = Draft::default();
        assert!(!draft.is_complete());

        draft.user = UserProfile {
            name: Some("Maria Silva".into()),
            national_id: Some("52998224725".into()),
            phone: Some("11987654321".into()),
        };
        draft.item = Some(Candidate {
            label: "Battery".into(),
            score: 0.91,
        });
        draft.qty = Some(3);
        draft.address = Some(Address::default());
        draft.schedule = Some(Schedule {
            day: NaiveDate::from_ymd_opt(2026, 8, 28).unwrap(),
            time: None,
        });
        // Slot not chosen yet
        assert!(!draft.is_complete());

        draft.schedule.as_mut().unwrap().time = Some("09:00".into());
        assert!(draft.is_complete());
    }

    #[test]
    fn reset_returns_to_initial_state() {
        let mut draft = Draft::default();
        draft.step = Step::AwaitQty;
        draft.qty = Some(5);
        draft.pending_media = Some("file-123".into());

        draft.reset();
        assert_eq!(draft, Draft::default());
        assert_eq!(draft.step, Step::Name);
    }
}
