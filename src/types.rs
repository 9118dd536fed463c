use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An `{id, value}` pair the API uses for enumerations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labelled {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebLinks {
    #[serde(default)]
    pub details: String,
}

/// A bug-bounty program owned by the company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: String,
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub company_id: String,
    #[serde(default)]
    pub company_handle: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    pub name: String,
    #[serde(default)]
    pub status: Labelled,
    #[serde(default)]
    pub confidentiality_level: Labelled,
    #[serde(default)]
    pub web_links: WebLinks,
    #[serde(default, rename = "type")]
    pub program_type: Labelled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Originators {
    #[serde(default)]
    pub program_id: String,
    #[serde(default)]
    pub pentest_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalReference {
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Severity {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub vector: Option<String>,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateInfo {
    #[serde(default)]
    pub parent_submission_code: Option<String>,
    #[serde(default)]
    pub child_submission_codes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionState {
    #[serde(default)]
    pub status: Labelled,
    #[serde(default)]
    pub close_reason: Option<Labelled>,
    #[serde(default)]
    pub duplicate_info: Option<DuplicateInfo>,
    #[serde(default, with = "opt_ts_seconds")]
    pub validated_at: Option<DateTime<Utc>>,
    #[serde(default, with = "opt_ts_seconds")]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(default, with = "opt_ts_seconds")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, with = "opt_ts_seconds")]
    pub archived_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Money {
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub currency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    #[serde(default)]
    pub total_payout: Option<Money>,
    #[serde(default)]
    pub total_bounty_payout: Option<Money>,
    #[serde(default)]
    pub total_bonus_payout: Option<Money>,
    #[serde(default)]
    pub possible_bounty: Option<Money>,
}

/// A platform user attached to a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranking {
    #[serde(default)]
    pub rank: i64,
    #[serde(default)]
    pub reputation: i64,
    #[serde(default)]
    pub streak: Option<Labelled>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submitter {
    #[serde(flatten)]
    pub user: UserRef,
    #[serde(default)]
    pub ranking: Option<Ranking>,
    #[serde(default)]
    pub identity_checked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastUpdated {
    #[serde(default)]
    pub last_updater: Option<UserRef>,
    #[serde(default, with = "opt_ts_seconds")]
    pub last_updated_at: Option<DateTime<Utc>>,
}

/// A vulnerability report submitted to one of the company's programs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub code: String,
    #[serde(default)]
    pub originators: Originators,
    #[serde(default)]
    pub internal_reference: Option<InternalReference>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub state: SubmissionState,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub awaiting_feedback: bool,
    #[serde(default)]
    pub reward: Reward,
    #[serde(default, with = "opt_ts_seconds")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assignee: Option<UserRef>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub submitter: Submitter,
    #[serde(default)]
    pub last_updated: LastUpdated,
    #[serde(default)]
    pub attachment_count: u32,
    #[serde(default)]
    pub web_links: WebLinks,
    #[serde(default)]
    pub integration_count: u32,
}

impl Submission {
    /// A submission is closed once it carries a close reason.
    pub fn is_closed(&self) -> bool {
        self.state
            .close_reason
            .as_ref()
            .is_some_and(|r| !r.value.is_empty())
    }

    /// Whether the submission still needs work from the company.
    pub fn is_active(&self) -> bool {
        !matches!(
            self.state.status.value.to_lowercase().as_str(),
            "triage" | "closed" | "accepted" | "archived"
        )
    }
}

/// Selects submissions from a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionFilter {
    /// Keep only submissions of this program.
    pub program_id: Option<String>,
    /// Keep only active submissions.
    pub active_only: bool,
}

impl SubmissionFilter {
    pub fn matches(&self, submission: &Submission) -> bool {
        if let Some(program_id) = &self.program_id {
            if &submission.originators.program_id != program_id {
                return false;
            }
        }
        !self.active_only || submission.is_active()
    }
}

pub fn filter_submissions(submissions: Vec<Submission>, filter: &SubmissionFilter) -> Vec<Submission> {
    submissions.into_iter().filter(|s| filter.matches(s)).collect()
}

/// Response of the IP lookup endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpLookup {
    #[serde(default)]
    pub exists: bool,
}

/// Optional Unix-seconds timestamps; `null` and `0` both mean unset.
mod opt_ts_seconds {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => s.serialize_some(&dt.timestamp()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<i64>::deserialize(d)? {
            None | Some(0) => Ok(None),
            Some(secs) => DateTime::from_timestamp(secs, 0)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {secs}"))),
        }
    }
}
