use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use troth_shared::types::account::AccountStatus;

use crate::lifecycle::{self, InterestStatus, ProposalAnswer};
use crate::schema::{favorites, interests, matches, profiles, proposals};

// --- Profile ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub display_name: String,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub religion: Option<String>,
    pub mother_tongue: Option<String>,
    pub marital_status: Option<String>,
    pub height_cm: Option<i32>,
    pub education: Option<String>,
    pub occupation: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub looking_for: Option<String>,
    pub is_hidden: bool,
    pub account_status: String,
    pub trust_score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn status(&self) -> AccountStatus {
        self.account_status.parse().unwrap_or(AccountStatus::Limited)
    }

    /// Whether other members may see this profile.
    pub fn is_discoverable(&self) -> bool {
        !self.is_hidden && !self.status().is_banned()
    }

    /// Name used in notifications, never empty.
    pub fn label(&self) -> String {
        let name = self.display_name.trim();
        if name.is_empty() { "A member".to_string() } else { name.to_string() }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profiles)]
pub struct NewProfile {
    pub user_id: Uuid,
    pub display_name: String,
}

#[derive(Debug, AsChangeset, Deserialize, Validate, Default)]
#[diesel(table_name = profiles)]
pub struct UpdateProfile {
    #[validate(length(min = 2, max = 60, message = "display name must be 2-60 characters"))]
    pub display_name: Option<String>,
    #[validate(custom = "validate_gender")]
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    #[validate(length(max = 60))]
    pub religion: Option<String>,
    #[validate(length(max = 60))]
    pub mother_tongue: Option<String>,
    #[validate(length(max = 30))]
    pub marital_status: Option<String>,
    #[validate(range(min = 100, max = 250, message = "height must be between 100 and 250 cm"))]
    pub height_cm: Option<i32>,
    #[validate(length(max = 120))]
    pub education: Option<String>,
    #[validate(length(max = 120))]
    pub occupation: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(min = 2, max = 3, message = "country must be an ISO code"))]
    pub country: Option<String>,
    #[validate(length(max = 2000, message = "bio must be at most 2000 characters"))]
    pub bio: Option<String>,
    #[validate(length(max = 2000))]
    pub looking_for: Option<String>,
    pub is_hidden: Option<bool>,
}

pub const GENDERS: [&str; 3] = ["male", "female", "other"];

fn validate_gender(gender: &str) -> Result<(), validator::ValidationError> {
    if GENDERS.contains(&gender) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("gender must be male, female or other"))
    }
}

/// Public view of a profile shown in lists.
#[derive(Debug, Serialize, Clone)]
pub struct ProfileCard {
    pub user_id: Uuid,
    pub display_name: String,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub religion: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub photo_url: Option<String>,
    pub account_status: String,
    pub trust_score: i32,
}

impl ProfileCard {
    pub fn from_profile(profile: &Profile, today: NaiveDate) -> Self {
        Self {
            user_id: profile.user_id,
            display_name: profile.label(),
            age: profile.birth_date.map(|b| lifecycle::age_on(b, today)),
            gender: profile.gender.clone(),
            religion: profile.religion.clone(),
            city: profile.city.clone(),
            country: profile.country.clone(),
            photo_url: profile.photo_url.clone(),
            account_status: profile.account_status.clone(),
            trust_score: profile.trust_score,
        }
    }
}

// --- Favorite ---

#[derive(Debug, Queryable, Identifiable, Serialize)]
#[diesel(table_name = favorites)]
pub struct Favorite {
    pub id: Uuid,
    pub user_id: Uuid,
    pub favorite_user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = favorites)]
pub struct NewFavorite {
    pub user_id: Uuid,
    pub favorite_user_id: Uuid,
}

// --- Interest ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = interests)]
pub struct Interest {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub status: String,
    pub message: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Interest {
    pub fn status(&self) -> InterestStatus {
        self.status.parse().unwrap_or(InterestStatus::Pending)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = interests)]
pub struct NewInterest {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub message: Option<String>,
}

// --- Match ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = matches)]
pub struct Match {
    pub id: Uuid,
    pub user_a_id: Uuid,
    pub user_b_id: Uuid,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl Match {
    pub fn partner_of(&self, me: Uuid) -> Option<Uuid> {
        lifecycle::partner_of(self.user_a_id, self.user_b_id, me)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = matches)]
pub struct NewMatch {
    pub user_a_id: Uuid,
    pub user_b_id: Uuid,
    pub source: String,
}

// --- Proposal ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = proposals)]
pub struct Proposal {
    pub id: Uuid,
    pub match_id: Uuid,
    pub proposer_id: Uuid,
    pub recipient_id: Uuid,
    pub message: Option<String>,
    pub answer: String,
    pub admin_notified: bool,
    pub answered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    pub fn answer(&self) -> ProposalAnswer {
        self.answer.parse().unwrap_or(ProposalAnswer::Pending)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = proposals)]
pub struct NewProposal {
    pub match_id: Uuid,
    pub proposer_id: Uuid,
    pub recipient_id: Uuid,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(status: &str, hidden: bool) -> Profile {
        let now = Utc::now();
        Profile {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            display_name: "  ".into(),
            gender: Some("female".into()),
            birth_date: NaiveDate::from_ymd_opt(1996, 2, 29),
            religion: None,
            mother_tongue: None,
            marital_status: None,
            height_cm: None,
            education: None,
            occupation: None,
            city: Some("Pune".into()),
            country: Some("IN".into()),
            bio: None,
            photo_url: None,
            looking_for: None,
            is_hidden: hidden,
            account_status: status.into(),
            trust_score: 40,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn banned_and_hidden_profiles_are_not_discoverable() {
        assert!(profile("LIMITED", false).is_discoverable());
        assert!(!profile("BANNED", false).is_discoverable());
        assert!(!profile("VERIFIED", true).is_discoverable());
    }

    #[test]
    fn blank_display_name_gets_a_label() {
        assert_eq!(profile("LIMITED", false).label(), "A member");
    }

    #[test]
    fn card_computes_age() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let card = ProfileCard::from_profile(&profile("VERIFIED", false), today);
        assert_eq!(card.age, Some(30));
        assert_eq!(card.city.as_deref(), Some("Pune"));
    }

    #[test]
    fn profile_update_validation() {
        let ok = UpdateProfile { gender: Some("female".into()), height_cm: Some(165), ..Default::default() };
        assert!(ok.validate().is_ok());

        let bad_gender = UpdateProfile { gender: Some("robot".into()), ..Default::default() };
        assert!(bad_gender.validate().is_err());

        let bad_height = UpdateProfile { height_cm: Some(20), ..Default::default() };
        assert!(bad_height.validate().is_err());
    }
}
