use std::cell::RefCell;
use std::rc::Rc;

use navigation_host::{
    encode_hash, ActivePane, AutoProvider, BrowserHistoryProvider, HashRouterProvider,
    MemoryHistoryEnvironment, MemoryNativeNavigation, MemoryNavigationProvider,
    MemoryRouterProvider, NavigationApiProvider, NavigationProvider, NavigationRoute,
    NavigationState, Panes, WebNavigationProvider,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
struct Home {
    #[serde(rename = "userId")]
    user_id: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
struct Settings {
    section: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
struct Unit {}

type AppPanes = Panes<Unit, Home, Settings, Unit>;
type Seen = Rc<RefCell<Vec<NavigationState<AppPanes>>>>;

fn home_state() -> NavigationState<AppPanes> {
    NavigationState::new(NavigationRoute::new(
        0,
        ActivePane::List,
        Panes {
            rail: Unit {},
            list: Home {
                user_id: "123".to_string(),
            },
            detail: Settings::default(),
            tail: Unit {},
        },
    ))
}

fn settings_state(from: &NavigationState<AppPanes>) -> NavigationState<AppPanes> {
    let mut panes = from.route.panes.clone();
    panes.detail.section = Some("privacy".to_string());
    from.navigated(ActivePane::Detail, panes)
}

fn recorder() -> (Seen, Rc<dyn Fn(NavigationState<AppPanes>)>) {
    let seen: Seen = Rc::default();
    let sink = seen.clone();
    (seen, Rc::new(move |state: NavigationState<AppPanes>| sink.borrow_mut().push(state)))
}

/// Writes must round-trip through `current_state` and teardown must tolerate repeats.
fn assert_round_trip(provider: &dyn NavigationProvider<AppPanes>) {
    let home = home_state();
    let settings = settings_state(&home);

    provider.replace_state(&home);
    provider.push_state(&settings);

    let current = provider.current_state().expect("current state after push");
    assert_eq!(current.route.active_pane, ActivePane::Detail);
    assert_eq!(current.route.panes, settings.route.panes);

    provider.destroy();
    provider.destroy();
}

#[test]
fn every_provider_round_trips_pushed_state() {
    let (_, on_change) = recorder();
    let providers: Vec<Box<dyn NavigationProvider<AppPanes>>> = vec![
        Box::new(MemoryRouterProvider::new(&home_state(), on_change.clone())),
        Box::new(BrowserHistoryProvider::new(
            MemoryHistoryEnvironment::new("/app"),
            None,
            on_change.clone(),
        )),
        Box::new(HashRouterProvider::new(
            MemoryHistoryEnvironment::new("/app"),
            on_change.clone(),
        )),
        Box::new(NavigationApiProvider::new(
            MemoryNativeNavigation::new("/app"),
            None,
            on_change.clone(),
        )),
        Box::new(AutoProvider::new(
            MemoryNativeNavigation::unavailable(),
            MemoryHistoryEnvironment::new("/app"),
            None,
            on_change,
        )),
        Box::new(MemoryNavigationProvider::new("/app", Some(home_state()))),
        Box::new(WebNavigationProvider::<NavigationState<AppPanes>, _>::new(
            MemoryHistoryEnvironment::new("/app"),
        )),
    ];
    for provider in &providers {
        assert_round_trip(provider.as_ref());
    }
}

#[test]
fn memory_router_reports_push_and_tracks_navigation_bounds() {
    let (seen, on_change) = recorder();
    let router = MemoryRouterProvider::new(&home_state(), on_change);

    router.push_state(&settings_state(&home_state()));

    assert_eq!(seen.borrow().len(), 1);
    assert_eq!(seen.borrow()[0].route.active_pane, ActivePane::Detail);
    assert!(router.can_go_back());
    assert!(!router.can_go_forward());
}

#[test]
fn url_providers_only_report_externally_originated_navigation() {
    let env = MemoryHistoryEnvironment::new("/app");
    let (seen, on_change) = recorder();
    let browser = BrowserHistoryProvider::new(env.clone(), None, on_change);
    let home = home_state();

    browser.replace_state(&home);
    browser.push_state(&settings_state(&home));
    assert!(seen.borrow().is_empty());

    env.back();
    assert_eq!(*seen.borrow(), vec![home]);
    browser.destroy();
}

#[test]
fn hash_router_push_waits_for_hashchange_but_replace_reports_immediately() {
    let env = MemoryHistoryEnvironment::new("/app");
    let (seen, on_change) = recorder();
    let hash = HashRouterProvider::new(env.clone(), on_change);
    let home = home_state();

    hash.push_state(&settings_state(&home));
    assert!(seen.borrow().is_empty());
    env.flush_events();
    assert_eq!(seen.borrow().len(), 1);

    hash.replace_state(&home);
    assert_eq!(seen.borrow().len(), 2);
    assert_eq!(seen.borrow()[1], home);
}

#[test]
fn url_recovery_rebuilds_single_entry_history() {
    let settings = settings_state(&home_state());
    let hash = encode_hash(&settings.route).expect("encode hash");
    let env = MemoryHistoryEnvironment::new(&format!("/app{hash}"));
    let (_, on_change) = recorder();
    let provider = HashRouterProvider::new(env, on_change);

    let recovered = provider.current_state().expect("recovered state");
    assert_eq!(recovered.route.panes, settings.route.panes);
    assert_eq!(recovered.route.index, 0);
    assert_eq!(recovered.history, vec![recovered.route.clone()]);
}

#[test]
fn seeded_start_entry_is_reported_when_traversed_back_to() {
    let home = home_state();

    let env = MemoryHistoryEnvironment::new("/app");
    let (seen, on_change) = recorder();
    let browser = BrowserHistoryProvider::new(env.clone(), None, on_change);
    assert_eq!(browser.current_state(), None);
    assert_eq!(browser.restore_or_seed(&home), home);
    browser.push_state(&settings_state(&home));
    env.back();
    assert_eq!(*seen.borrow(), vec![home.clone()]);
    browser.destroy();

    let env = MemoryHistoryEnvironment::new("/app");
    let (seen, on_change) = recorder();
    let hash = HashRouterProvider::new(env.clone(), on_change);
    assert_eq!(hash.restore_or_seed(&home), home);
    hash.push_state(&settings_state(&home));
    env.flush_events();
    env.back();
    assert_eq!(seen.borrow().last(), Some(&home));
    hash.destroy();

    let native = MemoryNativeNavigation::new("/app");
    let (seen, on_change) = recorder();
    let api = NavigationApiProvider::new(native.clone(), None, on_change);
    assert_eq!(api.restore_or_seed(&home), home);
    api.push_state(&settings_state(&home));
    assert!(native.traverse(-1));
    assert_eq!(seen.borrow().len(), 1);
    assert_eq!(seen.borrow()[0].route, home.route);
    api.destroy();
}

#[test]
fn stored_state_wins_over_the_seed() {
    let settings = settings_state(&home_state());
    let hash = encode_hash(&settings.route).expect("encode hash");
    let env = MemoryHistoryEnvironment::new(&format!("/app{hash}"));
    let (seen, on_change) = recorder();
    let provider = HashRouterProvider::new(env, on_change);

    let restored = provider.restore_or_seed(&home_state());

    assert_eq!(restored.route.panes, settings.route.panes);
    assert!(seen.borrow().is_empty());
}
