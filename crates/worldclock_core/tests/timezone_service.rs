use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use worldclock_core::{
    default_zones, Observable, PreferenceStore, Preferences, SqlitePreferenceStore, StoreError,
    StoreResult, TimezoneService, ZoneId, HOME_TIMEZONE_KEY, SELECTED_TIMEZONES_KEY,
};

fn setup() -> TimezoneService<SqlitePreferenceStore> {
    TimezoneService::new(Arc::new(SqlitePreferenceStore::open_in_memory().unwrap()))
}

fn zone(name: &str) -> ZoneId {
    ZoneId::new(name).unwrap()
}

fn zones(names: &[&str]) -> Vec<ZoneId> {
    names.iter().map(|name| zone(name)).collect()
}

fn seed(service: &TimezoneService<SqlitePreferenceStore>, names: &[&str]) {
    for name in names {
        service.add(&zone(name)).unwrap();
    }
    for default in default_zones() {
        if !names.contains(&default.as_str()) {
            service.remove(&default).unwrap();
        }
    }
    assert_eq!(service.list().unwrap(), zones(names));
}

#[test]
fn empty_store_lists_default_zones() {
    let service = setup();
    assert_eq!(
        service.list().unwrap(),
        zones(&["America/New_York", "Europe/London", "Asia/Tokyo", "Australia/Sydney"])
    );
    assert_eq!(service.home().unwrap(), None);
}

#[test]
fn add_appends_to_defaults_and_remove_keeps_relative_order() {
    let service = setup();

    let after_add = service.add(&zone("Asia/Kolkata")).unwrap();
    assert_eq!(
        after_add,
        zones(&[
            "America/New_York",
            "Europe/London",
            "Asia/Tokyo",
            "Australia/Sydney",
            "Asia/Kolkata",
        ])
    );

    let after_remove = service.remove(&zone("Europe/London")).unwrap();
    assert_eq!(
        after_remove,
        zones(&["America/New_York", "Asia/Tokyo", "Australia/Sydney", "Asia/Kolkata"])
    );
    assert_eq!(service.list().unwrap(), after_remove);
}

#[test]
fn add_is_idempotent() {
    let service = setup();
    let once = service.add(&zone("Europe/Berlin")).unwrap();
    let twice = service.add(&zone("Europe/Berlin")).unwrap();
    assert_eq!(once, twice);
    assert_eq!(service.list().unwrap(), once);
}

#[test]
fn adding_a_default_zone_before_any_write_persists_nothing() {
    let service = setup();
    service.add(&zone("Asia/Tokyo")).unwrap();

    let prefs = service.store().read().unwrap();
    assert_eq!(prefs.get(SELECTED_TIMEZONES_KEY), None);
}

#[test]
fn remove_absent_zone_is_noop() {
    let service = setup();
    let before = service.list().unwrap();
    let after = service.remove(&zone("Africa/Cairo")).unwrap();
    assert_eq!(before, after);
    assert!(service.store().read().unwrap().is_empty());
}

#[test]
fn removing_every_zone_leaves_an_empty_list() {
    let service = setup();
    for default in default_zones() {
        service.remove(&default).unwrap();
    }
    assert!(service.list().unwrap().is_empty());
}

#[test]
fn reorder_moves_element_and_shifts_others() {
    let service = setup();
    seed(&service, &["A/A", "B/B", "C/C"]);

    let reordered = service.reorder(0, 2).unwrap();
    assert_eq!(reordered, zones(&["B/B", "C/C", "A/A"]));

    let back = service.reorder(2, 0).unwrap();
    assert_eq!(back, zones(&["A/A", "B/B", "C/C"]));
}

#[test]
fn reorder_same_index_or_out_of_range_is_noop() {
    let service = setup();
    let defaults = default_zones();

    assert_eq!(service.reorder(1, 1).unwrap(), defaults);
    assert_eq!(service.reorder(0, 4).unwrap(), defaults);
    assert_eq!(service.reorder(7, 0).unwrap(), defaults);
    assert!(service.store().read().unwrap().is_empty());
}

#[test]
fn reorder_from_defaults_persists_new_order() {
    let service = setup();
    service.reorder(3, 0).unwrap();
    assert_eq!(
        service.list().unwrap(),
        zones(&["Australia/Sydney", "America/New_York", "Europe/London", "Asia/Tokyo"])
    );
}

#[test]
fn set_home_toggles_and_clear_home_is_unconditional() {
    let service = setup();
    let tokyo = zone("Asia/Tokyo");

    assert_eq!(service.set_home(&tokyo).unwrap(), Some(tokyo.clone()));
    assert_eq!(service.home().unwrap(), Some(tokyo.clone()));

    assert_eq!(service.set_home(&tokyo).unwrap(), None);
    assert_eq!(service.home().unwrap(), None);

    service.set_home(&tokyo).unwrap();
    let london = zone("Europe/London");
    assert_eq!(service.set_home(&london).unwrap(), Some(london));

    assert_eq!(service.clear_home().unwrap(), None);
    assert_eq!(service.clear_home().unwrap(), None);
    assert_eq!(service.store().read().unwrap().get(HOME_TIMEZONE_KEY), None);
}

#[test]
fn removing_home_zone_from_list_keeps_home_reference() {
    let service = setup();
    let sydney = zone("Australia/Sydney");
    service.set_home(&sydney).unwrap();

    service.remove(&sydney).unwrap();

    assert!(!service.list().unwrap().contains(&sydney));
    assert_eq!(service.home().unwrap(), Some(sydney));
}

#[test]
fn legacy_delimited_value_is_read_and_rewritten_as_json() {
    let service = setup();
    service
        .store()
        .edit(&mut |prefs: &mut Preferences| {
            prefs.set(SELECTED_TIMEZONES_KEY, "Europe/Paris|||Asia/Dubai");
        })
        .unwrap();
    assert_eq!(service.list().unwrap(), zones(&["Europe/Paris", "Asia/Dubai"]));

    service.add(&zone("Asia/Seoul")).unwrap();

    let prefs = service.store().read().unwrap();
    let raw = prefs.get(SELECTED_TIMEZONES_KEY).unwrap();
    let stored: Vec<String> = serde_json::from_str(raw).unwrap();
    assert_eq!(stored, ["Europe/Paris", "Asia/Dubai", "Asia/Seoul"]);
}

#[test]
fn corrupt_list_value_is_reported_and_not_overwritten() {
    let service = setup();
    service
        .store()
        .edit(&mut |prefs: &mut Preferences| {
            prefs.set(SELECTED_TIMEZONES_KEY, "[\"Europe/Paris\"");
        })
        .unwrap();

    assert!(service.list().is_err());
    assert!(service.add(&zone("Asia/Seoul")).is_err());
    assert_eq!(
        service.store().read().unwrap().get(SELECTED_TIMEZONES_KEY),
        Some("[\"Europe/Paris\"")
    );
}

#[test]
fn subscribers_get_current_value_then_each_committed_change() {
    let service = setup();
    let list = service.subscribe_list();
    let home = service.subscribe_home();

    assert_eq!(list.try_recv(), Some(default_zones()));
    assert_eq!(home.try_recv(), Some(None));

    let added = service.add(&zone("Asia/Kolkata")).unwrap();
    assert_eq!(list.try_recv(), Some(added));

    service.set_home(&zone("Asia/Kolkata")).unwrap();
    assert_eq!(home.try_recv(), Some(Some(zone("Asia/Kolkata"))));
    // Home-only change does not re-emit an equal list.
    assert_eq!(list.try_recv(), None);

    service.add(&zone("Asia/Kolkata")).unwrap();
    assert_eq!(list.try_recv(), None);
}

#[test]
fn late_subscriber_sees_latest_committed_list() {
    let service = setup();
    service.remove(&zone("Asia/Tokyo")).unwrap();

    let list = service.subscribe_list();
    assert_eq!(
        list.try_recv(),
        Some(zones(&["America/New_York", "Europe/London", "Australia/Sydney"]))
    );
}

#[test]
fn dropping_a_subscription_does_not_cancel_writes() {
    let service = setup();
    let list = service.subscribe_list();
    drop(list);

    service.add(&zone("Pacific/Auckland")).unwrap();
    assert!(service.list().unwrap().contains(&zone("Pacific/Auckland")));
}

#[test]
fn concurrent_adds_are_serialized_without_duplicates() {
    let service = setup();
    let names = ["Asia/Kolkata", "Europe/Berlin", "Africa/Lagos", "America/Chicago"];

    let workers = (0..8)
        .map(|worker| {
            let service = service.clone();
            thread::spawn(move || {
                for offset in 0..names.len() {
                    let name = names[(worker + offset) % names.len()];
                    service.add(&zone(name)).unwrap();
                }
            })
        })
        .collect::<Vec<_>>();
    for worker in workers {
        worker.join().unwrap();
    }

    let list = service.list().unwrap();
    assert_eq!(list.len(), default_zones().len() + names.len());
    assert_eq!(list.iter().collect::<HashSet<_>>().len(), list.len());
}

struct FlakyStore {
    inner: SqlitePreferenceStore,
    fail_edits: AtomicBool,
}

impl PreferenceStore for FlakyStore {
    fn read(&self) -> StoreResult<Preferences> {
        self.inner.read()
    }

    fn edit(&self, transform: &mut dyn FnMut(&mut Preferences)) -> StoreResult<Preferences> {
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(StoreError::Poisoned);
        }
        self.inner.edit(transform)
    }

    fn changes(&self) -> &Observable<Preferences> {
        self.inner.changes()
    }
}

#[test]
fn failed_transaction_leaves_stored_and_observed_state_intact() {
    let store = Arc::new(FlakyStore {
        inner: SqlitePreferenceStore::open_in_memory().unwrap(),
        fail_edits: AtomicBool::new(false),
    });
    let service = TimezoneService::new(Arc::clone(&store));
    service.add(&zone("Asia/Kolkata")).unwrap();
    let committed = service.list().unwrap();
    let list = service.subscribe_list();
    assert_eq!(list.try_recv(), Some(committed.clone()));

    store.fail_edits.store(true, Ordering::SeqCst);
    let err = service.remove(&zone("Asia/Kolkata")).unwrap_err();
    assert!(err.to_string().contains("poisoned"));
    assert!(service.set_home(&zone("Asia/Kolkata")).is_err());

    assert_eq!(service.list().unwrap(), committed);
    assert_eq!(service.home().unwrap(), None);
    assert_eq!(list.try_recv(), None);
}
