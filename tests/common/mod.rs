#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use medbridge::{
    BackendConfig, Caller, Donation, DonationStore, Engine, EngineConfig, Identity, ManualClock,
    NewDonation, Role,
};

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap()
}

pub fn engine_with(config: EngineConfig) -> (Arc<Engine>, Arc<ManualClock>) {
    let store = BackendConfig::in_memory().build().unwrap();
    engine_on(store, config)
}

pub fn engine_on(
    store: Arc<dyn DonationStore>,
    config: EngineConfig,
) -> (Arc<Engine>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start()));
    let engine = Engine::new(store, &config, clock.clone()).unwrap();
    (Arc::new(engine), clock)
}

pub fn engine() -> (Arc<Engine>, Arc<ManualClock>) {
    engine_with(EngineConfig::default())
}

pub fn admin(id: &str) -> Identity {
    Caller::new(id).with_role(Role::Admin).into()
}

pub fn donor(id: &str) -> Identity {
    Caller::new(id).with_role(Role::Donor).into()
}

pub fn recipient(id: &str, organization: &str) -> Identity {
    Caller::new(id)
        .with_role(Role::Recipient)
        .with_organization(organization)
        .into()
}

pub fn submission(name: &str, description: Option<&str>) -> NewDonation {
    NewDonation {
        item_name: name.into(),
        quantity: 10,
        expiry_date: NaiveDate::from_ymd_opt(2027, 1, 31).unwrap(),
        description: description.map(str::to_string),
        image_url: None,
    }
}

/// Submit as a donor and leave the donation `pending`.
pub fn pending_donation(engine: &Engine, name: &str, description: Option<&str>) -> Donation {
    engine
        .donations()
        .submit(&donor("donor-1"), submission(name, description))
        .unwrap()
}

/// Register a recipient whose requirements are `requirements`, one entry.
pub fn register_recipient(engine: &Engine, user_id: &str, requirements: &str) -> String {
    let identity = recipient(user_id, &format!("Org of {user_id}"));
    engine
        .recipients()
        .add_requirement(&identity, requirements)
        .unwrap();
    engine.recipients().ensure_profile(&identity).unwrap().id
}
