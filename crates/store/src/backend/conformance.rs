//! Behaviour every `DonationStore` backend must share.

use crate::model::{
    Claim, Conditional, Donation, DonationFilter, DonationStatus, Mapping, RecipientProfile,
    Requirements,
};
use crate::DonationStore;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use std::sync::{Arc, Barrier};
use std::thread;

fn at(minute: i64) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute)
}

pub(crate) fn donation(id: &str, donor: &str, status: DonationStatus, minute: i64) -> Donation {
    Donation {
        id: id.into(),
        donor_id: donor.into(),
        item_name: "Paracetamol".into(),
        quantity: 10,
        expiry_date: NaiveDate::from_ymd_opt(2027, 6, 30).unwrap(),
        description: Some("pain relief tablets".into()),
        image_url: None,
        status,
        created_at: at(minute),
        updated_at: at(minute),
    }
}

fn recipient(id: &str, user: Option<&str>, minute: i64) -> RecipientProfile {
    RecipientProfile {
        id: id.into(),
        user_id: user.map(str::to_string),
        organization_name: format!("Org {id}"),
        contact_email: None,
        description: None,
        requirements: Requirements::parse("pain relief"),
        created_at: at(minute),
    }
}

fn claim(id: &str, donation_id: &str, recipient_id: &str) -> Claim {
    Claim {
        id: id.into(),
        donation_id: donation_id.into(),
        recipient_id: recipient_id.into(),
        claimed_by: format!("user-{recipient_id}"),
        claimed_at: at(30),
    }
}

fn mapping(donation_id: &str, recipient_id: &str, score: f64) -> Mapping {
    Mapping {
        id: format!("{donation_id}:{recipient_id}:{score}"),
        donation_id: donation_id.into(),
        recipient_id: recipient_id.into(),
        score,
        created_at: at(40),
    }
}

pub(crate) fn run_all(store: &dyn DonationStore) {
    donations_roundtrip_and_filter(store);
    transition_is_compare_and_set(store);
    claim_is_all_or_nothing(store);
    recipients_are_ordered_and_provisioned_once(store);
    recipient_modify_applies_or_keeps(store);
    mappings_are_replaced_not_accumulated(store);
    rate_limit_window_counts_and_resets(store);
}

fn donations_roundtrip_and_filter(store: &dyn DonationStore) {
    store
        .insert_donation(&donation("d-old", "donor-a", DonationStatus::Pending, 0))
        .unwrap();
    store
        .insert_donation(&donation("d-new", "donor-a", DonationStatus::Approved, 5))
        .unwrap();
    store
        .insert_donation(&donation("d-other", "donor-b", DonationStatus::Pending, 3))
        .unwrap();

    assert_eq!(store.get_donation("d-old").unwrap().unwrap().donor_id, "donor-a");
    assert!(store.get_donation("nope").unwrap().is_none());

    let mine = store
        .list_donations(&DonationFilter::default().with_donor("donor-a"))
        .unwrap();
    let ids: Vec<&str> = mine.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["d-new", "d-old"]);

    let pending = store
        .list_donations(&DonationFilter::default().with_status(DonationStatus::Pending))
        .unwrap();
    let ids: Vec<&str> = pending.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["d-other", "d-old"]);
}

fn transition_is_compare_and_set(store: &dyn DonationStore) {
    store
        .insert_donation(&donation("t-1", "donor-a", DonationStatus::Pending, 0))
        .unwrap();

    let applied = store
        .transition_status("t-1", DonationStatus::Pending, DonationStatus::Approved, at(1))
        .unwrap();
    match applied {
        Conditional::Applied(d) => {
            assert_eq!(d.status, DonationStatus::Approved);
            assert_eq!(d.updated_at, at(1));
        }
        other => panic!("expected applied, got {other:?}"),
    }

    let again = store
        .transition_status("t-1", DonationStatus::Pending, DonationStatus::Rejected, at(2))
        .unwrap();
    assert_eq!(again, Conditional::StatusMismatch(DonationStatus::Approved));
    assert_eq!(
        store.get_donation("t-1").unwrap().unwrap().status,
        DonationStatus::Approved
    );

    let missing = store
        .transition_status("ghost", DonationStatus::Pending, DonationStatus::Approved, at(2))
        .unwrap();
    assert_eq!(missing, Conditional::Missing);
}

fn claim_is_all_or_nothing(store: &dyn DonationStore) {
    store
        .insert_donation(&donation("c-pending", "donor-a", DonationStatus::Pending, 0))
        .unwrap();
    store
        .insert_donation(&donation("c-approved", "donor-a", DonationStatus::Approved, 0))
        .unwrap();

    let not_yet = store.claim_donation(&claim("k0", "c-pending", "r1")).unwrap();
    assert_eq!(not_yet, Conditional::StatusMismatch(DonationStatus::Pending));
    assert!(store.claim_for_donation("c-pending").unwrap().is_none());

    let first = store.claim_donation(&claim("k1", "c-approved", "r1")).unwrap();
    assert!(matches!(first, Conditional::Applied(ref c) if c.id == "k1"));

    let second = store.claim_donation(&claim("k2", "c-approved", "r2")).unwrap();
    assert_eq!(second, Conditional::StatusMismatch(DonationStatus::Claimed));

    let stored = store.claim_for_donation("c-approved").unwrap().unwrap();
    assert_eq!(stored.id, "k1");
    assert_eq!(
        store.get_donation("c-approved").unwrap().unwrap().status,
        DonationStatus::Claimed
    );
    assert_eq!(store.claims_for_recipient("r1").unwrap().len(), 1);
    assert!(store.claims_for_recipient("r2").unwrap().is_empty());

    let ghost = store.claim_donation(&claim("k3", "ghost", "r1")).unwrap();
    assert_eq!(ghost, Conditional::Missing);
}

fn recipients_are_ordered_and_provisioned_once(store: &dyn DonationStore) {
    store.upsert_recipient(&recipient("r-b", None, 2)).unwrap();
    store.upsert_recipient(&recipient("r-a", Some("user-a"), 1)).unwrap();
    store.upsert_recipient(&recipient("r-c", None, 2)).unwrap();

    let ids: Vec<String> = store
        .list_recipients()
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec!["r-a", "r-b", "r-c"]);

    assert_eq!(store.recipient_for_user("user-a").unwrap().unwrap().id, "r-a");
    assert!(store.recipient_for_user("user-z").unwrap().is_none());

    let existing = store
        .provision_recipient(&recipient("r-dup", Some("user-a"), 9))
        .unwrap();
    assert_eq!(existing.id, "r-a");
    assert!(store.get_recipient("r-dup").unwrap().is_none());

    let fresh = store
        .provision_recipient(&recipient("r-new", Some("user-n"), 9))
        .unwrap();
    assert_eq!(fresh.id, "r-new");
    let again = store
        .provision_recipient(&recipient("r-new-2", Some("user-n"), 10))
        .unwrap();
    assert_eq!(again.id, "r-new");
}

fn recipient_modify_applies_or_keeps(store: &dyn DonationStore) {
    store.upsert_recipient(&recipient("r-mod", Some("user-mod"), 3)).unwrap();

    let updated = store
        .modify_recipient("r-mod", &mut |p| {
            p.requirements.add("insulin");
            true
        })
        .unwrap()
        .unwrap();
    assert_eq!(updated.requirements.len(), 2);
    assert_eq!(store.get_recipient("r-mod").unwrap().unwrap(), updated);

    let kept = store
        .modify_recipient("r-mod", &mut |p| {
            p.organization_name = "discarded".into();
            false
        })
        .unwrap()
        .unwrap();
    assert_eq!(kept.organization_name, "Org r-mod");
    assert_eq!(
        store.get_recipient("r-mod").unwrap().unwrap().organization_name,
        "Org r-mod"
    );
    assert_eq!(store.recipient_for_user("user-mod").unwrap().unwrap().id, "r-mod");

    let mut called = false;
    let missing = store
        .modify_recipient("ghost", &mut |_| {
            called = true;
            true
        })
        .unwrap();
    assert!(missing.is_none());
    assert!(!called);
}

fn mappings_are_replaced_not_accumulated(store: &dyn DonationStore) {
    store
        .replace_mappings(
            "m-1",
            &[mapping("m-1", "r-a", 80.0), mapping("m-1", "r-b", 40.0)],
        )
        .unwrap();
    store
        .replace_mappings(
            "m-1",
            &[mapping("m-1", "r-c", 50.0), mapping("m-1", "r-a", 75.0)],
        )
        .unwrap();
    store
        .replace_mappings("m-2", &[mapping("m-2", "r-a", 90.0)])
        .unwrap();

    let current = store.mappings_for_donation("m-1").unwrap();
    let pairs: Vec<(&str, f64)> = current
        .iter()
        .map(|m| (m.recipient_id.as_str(), m.score))
        .collect();
    assert_eq!(pairs, vec![("r-a", 75.0), ("r-c", 50.0)]);

    let for_a = store.mappings_for_recipient("r-a").unwrap();
    let donations: Vec<&str> = for_a.iter().map(|m| m.donation_id.as_str()).collect();
    assert_eq!(donations, vec!["m-2", "m-1"]);
    assert!(store.mappings_for_recipient("r-b").unwrap().is_empty());

    store.replace_mappings("m-2", &[]).unwrap();
    assert!(store.mappings_for_donation("m-2").unwrap().is_empty());
}

fn rate_limit_window_counts_and_resets(store: &dyn DonationStore) {
    let window = Duration::minutes(5);
    for i in 1..=3 {
        let d = store
            .hit_rate_limit("admin-1", "map-donation", 3, window, at(i))
            .unwrap();
        assert!(d.allowed, "call {i} should pass");
        assert_eq!(d.count, i as u32);
    }
    let fourth = store
        .hit_rate_limit("admin-1", "map-donation", 3, window, at(4))
        .unwrap();
    assert!(!fourth.allowed);
    assert_eq!(fourth.count, 4);

    let other_op = store
        .hit_rate_limit("admin-1", "other-op", 3, window, at(4))
        .unwrap();
    assert!(other_op.allowed);

    let later = store
        .hit_rate_limit("admin-1", "map-donation", 3, window, at(7))
        .unwrap();
    assert!(later.allowed);
    assert_eq!(later.count, 1);
    assert_eq!(later.window_start, at(7));
}

pub(crate) fn concurrent_claims(store: Arc<dyn DonationStore>) {
    const CONTENDERS: usize = 16;
    store
        .insert_donation(&donation("hot", "donor-a", DonationStatus::Approved, 0))
        .unwrap();

    let barrier = Arc::new(Barrier::new(CONTENDERS));
    let handles: Vec<_> = (0..CONTENDERS)
        .map(|i| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store
                    .claim_donation(&claim(&format!("k{i}"), "hot", &format!("r{i}")))
                    .unwrap()
            })
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners: Vec<&Claim> = outcomes
        .iter()
        .filter_map(|o| match o {
            Conditional::Applied(c) => Some(c),
            _ => None,
        })
        .collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| **o == Conditional::StatusMismatch(DonationStatus::Claimed))
            .count(),
        CONTENDERS - 1
    );

    let stored = store.claim_for_donation("hot").unwrap().unwrap();
    assert_eq!(stored.id, winners[0].id);
    assert_eq!(
        store.get_donation("hot").unwrap().unwrap().status,
        DonationStatus::Claimed
    );
}

pub(crate) fn concurrent_rate_limit(store: Arc<dyn DonationStore>) {
    const CALLERS: usize = 12;
    const MAX: u32 = 5;
    let barrier = Arc::new(Barrier::new(CALLERS));
    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store
                    .hit_rate_limit("admin-x", "map-donation", MAX, Duration::minutes(5), at(0))
                    .unwrap()
            })
        })
        .collect();

    let decisions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(decisions.iter().filter(|d| d.allowed).count(), MAX as usize);

    let mut counts: Vec<u32> = decisions.iter().map(|d| d.count).collect();
    counts.sort_unstable();
    assert_eq!(counts, (1..=CALLERS as u32).collect::<Vec<_>>());
}

pub(crate) fn concurrent_recipient_edits(store: Arc<dyn DonationStore>) {
    const WRITERS: usize = 8;
    const ROUNDS: usize = 10;
    store.upsert_recipient(&recipient("busy", Some("user-busy"), 0)).unwrap();

    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|w| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for round in 0..ROUNDS {
                    store
                        .modify_recipient("busy", &mut |p| {
                            p.requirements.add(format!("item-{w}-{round}"));
                            true
                        })
                        .unwrap()
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stored = store.get_recipient("busy").unwrap().unwrap();
    // One seeded entry plus every acknowledged add.
    assert_eq!(stored.requirements.len(), 1 + WRITERS * ROUNDS);
}
