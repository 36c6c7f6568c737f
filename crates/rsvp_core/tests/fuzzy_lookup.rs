use rsvp_core::{DataService, FuzzyMatchService, Response, UnitOfWork, MINIMUM_SCORE};

fn seeded() -> (UnitOfWork, Vec<Response>) {
    let uow = UnitOfWork::open_in_memory().unwrap();
    let service = DataService::<Response>::new(&uow);
    service
        .add_range(vec![
            Response::new("John", "Smith", "john@example.com", true),
            Response::new("Jane", "Doe", "jane@example.com", false),
        ])
        .unwrap();
    service.save_changes().unwrap();
    let stored = service.get_all().unwrap();
    (uow, stored)
}

#[test]
fn lookup_over_stored_responses_finds_misspelled_name() {
    let (_uow, stored) = seeded();
    let matcher = FuzzyMatchService::new();

    let exact = matcher
        .find_best_match(&stored, Some("John"), Some("Smith"))
        .unwrap();
    assert_eq!(exact.email, "john@example.com");
    assert!(matcher.score(exact, Some("John"), Some("Smith")) >= MINIMUM_SCORE);

    let misspelled = matcher
        .find_best_match(&stored, Some("Jon"), Some("Smith"))
        .unwrap();
    assert_eq!(misspelled.id, exact.id);

    let by_last_name = matcher.find_best_match(&stored, None, Some("Doe")).unwrap();
    assert_eq!(by_last_name.email, "jane@example.com");
}

#[test]
fn lookup_without_plausible_match_returns_none() {
    let (_uow, stored) = seeded();
    let matcher = FuzzyMatchService::new();

    assert!(matcher
        .find_best_match(&stored, Some("Xavier"), Some("Unknown"))
        .is_none());
    assert!(matcher.find_best_match(&stored, Some(""), Some(" ")).is_none());
}

#[test]
fn lookup_does_not_modify_the_store() {
    let (uow, stored) = seeded();
    FuzzyMatchService::new().find_best_match(&stored, Some("John"), Some("Smith"));

    assert_eq!(uow.pending_changes(), 0);
    assert_eq!(DataService::<Response>::new(&uow).get_all().unwrap(), stored);
}
