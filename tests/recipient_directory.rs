mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use common::{admin, engine, pending_donation, recipient};
use medbridge::{
    Caller, DEFAULT_ORGANIZATION_NAME, EngineError, Identity, ProfileUpdate, Role,
};

#[test]
fn provisioning_picks_the_best_available_name_and_is_idempotent() {
    let (engine, _) = engine();

    let with_org = recipient("u-org", "Red Crescent");
    let first = engine.recipients().ensure_profile(&with_org).unwrap();
    let again = engine.recipients().ensure_profile(&with_org).unwrap();
    assert_eq!(first.id, again.id);
    assert_eq!(first.organization_name, "Red Crescent");
    assert_eq!(first.user_id.as_deref(), Some("u-org"));

    let named: Identity = Caller::new("u-named")
        .with_role(Role::Recipient)
        .with_name("Dana")
        .with_email("dana@example.org")
        .into();
    let profile = engine.recipients().ensure_profile(&named).unwrap();
    assert_eq!(profile.organization_name, "Dana");
    assert_eq!(profile.contact_email.as_deref(), Some("dana@example.org"));

    let bare: Identity = Caller::new("u-bare").with_role(Role::Recipient).into();
    assert_eq!(
        engine
            .recipients()
            .ensure_profile(&bare)
            .unwrap()
            .organization_name,
        DEFAULT_ORGANIZATION_NAME
    );

    assert_eq!(engine.recipients().list(&admin("admin-1")).unwrap().len(), 3);
}

#[test]
fn requirement_entries_are_edited_independently() {
    let (engine, _) = engine();
    let ngo = recipient("ngo-1", "Clinic");
    let directory = engine.recipients();

    let insulin = directory.add_requirement(&ngo, "insulin pens").unwrap();
    let gloves = directory.add_requirement(&ngo, "  nitrile gloves  ").unwrap();
    assert_eq!(gloves.text, "nitrile gloves");

    let edited = directory
        .edit_requirement(&ngo, &insulin.id, "insulin vials")
        .unwrap();
    assert_eq!(edited.id, insulin.id);
    directory.delete_requirement(&ngo, &gloves.id).unwrap();

    let profile = directory.ensure_profile(&ngo).unwrap();
    let texts: Vec<&str> = profile
        .requirements
        .entries()
        .iter()
        .map(|e| e.text.as_str())
        .collect();
    assert_eq!(texts, vec!["insulin vials"]);

    assert!(matches!(
        directory.add_requirement(&ngo, "   "),
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        directory.edit_requirement(&ngo, "nope", "x-ray film"),
        Err(EngineError::NotFound(_))
    ));
    assert!(matches!(
        directory.delete_requirement(&ngo, &gloves.id),
        Err(EngineError::NotFound(_))
    ));
}

#[test]
fn profile_description_feeds_matching() {
    let (engine, _) = engine();
    let ngo = recipient("ngo-1", "Clinic");
    engine
        .recipients()
        .update_profile(
            &ngo,
            ProfileUpdate {
                description: Some("rural clinic treating diabetes".into()),
                ..ProfileUpdate::default()
            },
        )
        .unwrap();

    let donation = pending_donation(&engine, "Metformin", Some("diabetes tablets"));
    let report = engine
        .lifecycle()
        .approve(&donation.id, &admin("admin-1"))
        .unwrap();
    let medbridge::MatchingOutcome::Matched(summary) = report.matching else {
        panic!("matching should succeed");
    };
    assert_eq!(summary.match_count, 1);

    assert!(matches!(
        engine.recipients().update_profile(
            &ngo,
            ProfileUpdate {
                organization_name: Some(" ".into()),
                ..ProfileUpdate::default()
            }
        ),
        Err(EngineError::Validation(_))
    ));
}

#[test]
fn donors_have_no_recipient_profile() {
    let (engine, _) = engine();
    assert!(matches!(
        engine.recipients().ensure_profile(&common::donor("donor-1")),
        Err(EngineError::Forbidden(_))
    ));
    assert_eq!(
        engine.recipients().ensure_profile(&Identity::Anonymous),
        Err(EngineError::Unauthorized)
    );
}

#[test]
fn concurrent_requirement_edits_are_all_kept() {
    const WRITERS: usize = 16;
    const ROUNDS: usize = 20;
    let (engine, _) = engine();
    let ngo = recipient("ngo-busy", "Field Hospital");
    let seed = engine
        .recipients()
        .add_requirement(&ngo, "oral rehydration salts")
        .unwrap();

    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|w| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            let ngo = ngo.clone();
            thread::spawn(move || {
                barrier.wait();
                for round in 0..ROUNDS {
                    engine
                        .recipients()
                        .add_requirement(&ngo, &format!("supply {w}-{round}"))
                        .unwrap();
                }
            })
        })
        .collect();

    // An edit racing with the adds must survive them as well.
    engine
        .recipients()
        .edit_requirement(&ngo, &seed.id, "rehydration salts")
        .unwrap();
    for handle in handles {
        handle.join().unwrap();
    }

    let profile = engine.recipients().ensure_profile(&ngo).unwrap();
    assert_eq!(profile.requirements.len(), 1 + WRITERS * ROUNDS);
    let seeded = profile
        .requirements
        .entries()
        .iter()
        .find(|e| e.id == seed.id)
        .unwrap();
    assert_eq!(seeded.text, "rehydration salts");
}

#[test]
fn rejected_edit_leaves_profile_untouched() {
    let (engine, _) = engine();
    let ngo = recipient("ngo-2", "Clinic");
    let directory = engine.recipients();
    directory.add_requirement(&ngo, "syringes").unwrap();
    let before = directory.ensure_profile(&ngo).unwrap();

    assert!(matches!(
        directory.update_profile(
            &ngo,
            ProfileUpdate {
                organization_name: Some("".into()),
                description: Some("should not land".into()),
                ..ProfileUpdate::default()
            }
        ),
        Err(EngineError::Validation(_))
    ));
    assert!(directory.delete_requirement(&ngo, "missing").is_err());
    assert_eq!(directory.ensure_profile(&ngo).unwrap(), before);
}
