mod common;

use common::{admin, engine, pending_donation, recipient, register_recipient};
use medbridge::{DonationStatus, EngineError, MatchingOutcome};

#[test]
fn paracetamol_matches_only_the_pain_relief_recipient() {
    let (engine, clock) = engine();
    let pain = register_recipient(&engine, "ngo-pain", "need pain relief medication");
    clock.advance(chrono::Duration::seconds(1));
    let gloves = register_recipient(&engine, "ngo-gloves", "need surgical gloves");

    let donation = pending_donation(&engine, "Paracetamol", Some("pain relief tablets"));
    let report = engine
        .lifecycle()
        .approve(&donation.id, &admin("admin-1"))
        .unwrap();

    let MatchingOutcome::Matched(summary) = report.matching else {
        panic!("matching should succeed");
    };
    assert_eq!(summary.match_count, 1);
    let top = summary.top_match.expect("one top match");
    assert_eq!(top.recipient_id, pain);
    assert!(top.score > 0.0);

    let stored = engine
        .matching()
        .mappings(&donation.id, &admin("admin-1"))
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].recipient_id, pain);
    assert!(stored.iter().all(|m| m.recipient_id != gloves));

    let available = engine
        .recipients()
        .available_donations(&recipient("ngo-pain", "Org of ngo-pain"))
        .unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].donation.id, donation.id);
    assert!(
        engine
            .recipients()
            .available_donations(&recipient("ngo-gloves", "Org of ngo-gloves"))
            .unwrap()
            .is_empty()
    );
}

#[test]
fn full_journey_from_submission_to_claim() {
    let (engine, _) = engine();
    let ngo = recipient("ngo-1", "Clinic One");
    register_recipient(&engine, "ngo-1", "antibiotics amoxicillin capsules");

    let donation = pending_donation(&engine, "Amoxicillin", Some("500mg capsules"));
    assert_eq!(
        engine.claims().claim_as_caller(&donation.id, &ngo),
        Err(EngineError::NotApproved {
            donation_id: donation.id.clone(),
            status: DonationStatus::Pending,
        })
    );

    engine
        .lifecycle()
        .approve(&donation.id, &admin("admin-1"))
        .unwrap();
    let claim = engine.claims().claim_as_caller(&donation.id, &ngo).unwrap();

    let claimed = engine.recipients().claimed_donations(&ngo).unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].claim.id, claim.id);
    assert_eq!(claimed[0].donation.status, DonationStatus::Claimed);

    // Claimed donations drop out of the suggestions.
    assert!(engine.recipients().available_donations(&ngo).unwrap().is_empty());

    let inventory = engine.donations().inventory(&admin("admin-1")).unwrap();
    assert_eq!(inventory.len(), 1);
    assert_eq!(inventory[0].status, DonationStatus::Claimed);
}

#[test]
fn rerunning_matching_replaces_the_previous_batch() {
    let (engine, clock) = engine();
    for i in 0..5 {
        register_recipient(&engine, &format!("ngo-{i}"), "insulin pens needed urgently");
        clock.advance(chrono::Duration::seconds(1));
    }
    let donation = pending_donation(&engine, "Insulin", Some("pens refrigerated"));
    engine
        .lifecycle()
        .approve(&donation.id, &admin("admin-1"))
        .unwrap();

    for _ in 0..3 {
        let summary = engine
            .matching()
            .run_matching(&donation.id, &admin("admin-1"))
            .unwrap();
        assert_eq!(summary.match_count, 3);
    }
    let visible = engine
        .matching()
        .mappings(&donation.id, &admin("admin-1"))
        .unwrap();
    assert_eq!(visible.len(), 3);
}
