use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::StoreError;

/// Status of a donation record.
///
/// `Rejected` and `Claimed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    Pending,
    Approved,
    Rejected,
    Claimed,
}

impl DonationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationStatus::Pending => "pending",
            DonationStatus::Approved => "approved",
            DonationStatus::Rejected => "rejected",
            DonationStatus::Claimed => "claimed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DonationStatus::Rejected | DonationStatus::Claimed)
    }

    /// The full transition table of the donation lifecycle.
    pub fn can_transition_to(self, next: DonationStatus) -> bool {
        matches!(
            (self, next),
            (DonationStatus::Pending, DonationStatus::Approved)
                | (DonationStatus::Pending, DonationStatus::Rejected)
                | (DonationStatus::Approved, DonationStatus::Claimed)
        )
    }
}

impl fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DonationStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(DonationStatus::Pending),
            "approved" => Ok(DonationStatus::Approved),
            "rejected" => Ok(DonationStatus::Rejected),
            "claimed" => Ok(DonationStatus::Claimed),
            other => Err(StoreError::Decode(format!("unknown donation status '{other}'"))),
        }
    }
}

/// A donor-submitted item record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donation {
    pub id: String,
    pub donor_id: String,
    pub item_name: String,
    pub quantity: u32,
    pub expiry_date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub status: DonationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Donation {
    /// Source text for matching: item name followed by the description.
    pub fn matching_text(&self) -> String {
        match self.description.as_deref() {
            Some(desc) if !desc.trim().is_empty() => format!("{} {}", self.item_name, desc),
            _ => self.item_name.clone(),
        }
    }
}

/// One discrete requirement statement of a recipient organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementEntry {
    pub id: String,
    pub text: String,
}

impl RequirementEntry {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
        }
    }
}

/// Canonical, ordered requirement list of a recipient profile.
///
/// Older profiles stored a single free-text blob; newer ones store a JSON
/// array of entries, sometimes as a string column. All three shapes are
/// accepted on the way in and normalized here, so nothing downstream has
/// to care which one it was.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Requirements(Vec<RequirementEntry>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RequirementsWire {
    Entries(Vec<RequirementEntry>),
    Text(String),
}

impl<'de> Deserialize<'de> for Requirements {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<RequirementsWire>::deserialize(deserializer)? {
            Some(RequirementsWire::Entries(entries)) => Requirements(entries),
            Some(RequirementsWire::Text(raw)) => Requirements::parse(&raw),
            None => Requirements::default(),
        })
    }
}

impl Requirements {
    pub fn new(entries: Vec<RequirementEntry>) -> Self {
        Self(entries)
    }

    /// Parse a stored requirements column.
    ///
    /// A JSON array of `{id, text}` objects is taken as-is. Anything else
    /// non-blank is legacy plain text and becomes a single entry.
    pub fn parse(raw: &str) -> Self {
        if let Ok(entries) = serde_json::from_str::<Vec<RequirementEntry>>(raw) {
            return Self(entries);
        }
        let text = raw.trim();
        if text.is_empty() {
            Self::default()
        } else {
            Self(vec![RequirementEntry::new(text)])
        }
    }

    pub fn entries(&self) -> &[RequirementEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a new entry and return it.
    pub fn add(&mut self, text: impl Into<String>) -> RequirementEntry {
        let entry = RequirementEntry::new(text);
        self.0.push(entry.clone());
        entry
    }

    /// Replace the text of an entry. Returns `None` when the id is unknown.
    pub fn edit(&mut self, id: &str, text: impl Into<String>) -> Option<RequirementEntry> {
        let entry = self.0.iter_mut().find(|e| e.id == id)?;
        entry.text = text.into();
        Some(entry.clone())
    }

    /// Remove an entry. Returns `false` when the id is unknown.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|e| e.id != id);
        self.0.len() != before
    }

    /// All entry texts joined by a space, in order.
    pub fn joined_text(&self) -> String {
        self.0
            .iter()
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A recipient organization (e.g. an NGO).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipientProfile {
    pub id: String,
    /// Owning user account, when the profile belongs to a login.
    #[serde(default)]
    pub user_id: Option<String>,
    pub organization_name: String,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub requirements: Requirements,
    pub created_at: DateTime<Utc>,
}

impl RecipientProfile {
    /// Target text for matching: description followed by all requirements.
    pub fn matching_text(&self) -> String {
        let requirements = self.requirements.joined_text();
        match self.description.as_deref() {
            Some(desc) if !desc.trim().is_empty() => format!("{desc} {requirements}"),
            _ => requirements,
        }
    }
}

/// Binding of one donation to one recipient. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: String,
    pub donation_id: String,
    pub recipient_id: String,
    /// User who performed the claim.
    pub claimed_by: String,
    pub claimed_at: DateTime<Utc>,
}

/// Advisory scored suggestion linking a donation to a recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
    pub id: String,
    pub donation_id: String,
    pub recipient_id: String,
    /// Similarity in `[0, 100]`.
    pub score: f64,
    pub created_at: DateTime<Utc>,
}

/// Fixed-window invocation counter for one `(actor, operation)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitWindow {
    pub actor_id: String,
    pub operation: String,
    pub window_start: DateTime<Utc>,
    pub count: u32,
}

impl RateLimitWindow {
    pub fn open(actor_id: &str, operation: &str, now: DateTime<Utc>) -> Self {
        Self {
            actor_id: actor_id.to_string(),
            operation: operation.to_string(),
            window_start: now,
            count: 0,
        }
    }

    /// Count one invocation at `now`, restarting the window once
    /// `now > window_start + window`.
    pub fn register_hit(&mut self, now: DateTime<Utc>, window: Duration) {
        if now > self.window_start + window {
            self.window_start = now;
            self.count = 0;
        }
        self.count = self.count.saturating_add(1);
    }

    pub fn decision(&self, max_requests: u32, window: Duration) -> RateLimitDecision {
        RateLimitDecision {
            allowed: self.count <= max_requests,
            count: self.count,
            window_start: self.window_start,
            resets_at: self.window_start + window,
        }
    }
}

/// Outcome of one atomic rate-limit increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Count after this increment.
    pub count: u32,
    pub window_start: DateTime<Utc>,
    pub resets_at: DateTime<Utc>,
}

/// Result of a write that only applies when the donation is in an expected state.
#[derive(Debug, Clone, PartialEq)]
pub enum Conditional<T> {
    /// The condition held and the write committed.
    Applied(T),
    /// The donation exists but was in this status; nothing was written.
    StatusMismatch(DonationStatus),
    /// No donation with that id.
    Missing,
}

/// Selection criteria for listing donations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DonationFilter {
    /// Empty means any status.
    pub statuses: Vec<DonationStatus>,
    pub donor_id: Option<String>,
}

impl DonationFilter {
    pub fn with_status(mut self, status: DonationStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn with_donor(mut self, donor_id: impl Into<String>) -> Self {
        self.donor_id = Some(donor_id.into());
        self
    }

    pub fn matches(&self, donation: &Donation) -> bool {
        let status_ok = self.statuses.is_empty() || self.statuses.contains(&donation.status);
        let donor_ok = self
            .donor_id
            .as_deref()
            .is_none_or(|donor| donation.donor_id == donor);
        status_ok && donor_ok
    }
}

/// Newest first, id as tie-break.
pub(crate) fn sort_newest_first(donations: &mut [Donation]) {
    donations.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Oldest first, id as tie-break. This is the candidate order ranking
/// tie-breaks on, so it must be stable across backends.
pub(crate) fn sort_recipients(recipients: &mut [RecipientProfile]) {
    recipients.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
