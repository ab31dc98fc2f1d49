//! Cancellation and timeout behaviour of suspending steps.

mod common;

use std::time::Duration;

use common::{
    Call, FakeBackend, FakeIdentityProvider, Hang, Harness, conflict, github, github_credential,
    google, google_credential,
};
use linkforge_core::{Outcome, ResolverConfig, Stage};
use tokio_util::sync::CancellationToken;

async fn cancel_after(token: CancellationToken, after: Duration) {
    tokio::time::sleep(after).await;
    token.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_linking_popup_aborts() {
    let harness = Harness::new(
        FakeIdentityProvider::new()
            .with_methods(&["github.com"])
            .with_hang(Hang::Popup),
        FakeBackend::new(),
    );
    let resolver = harness.resolver();
    let cancel = CancellationToken::new();

    let provider = google();
    let (outcome, _) = tokio::join!(
        resolver.resolve_conflict(
            &provider,
            conflict(Some("b@x.com"), Some(google_credential())),
            &cancel,
        ),
        cancel_after(cancel.clone(), Duration::from_secs(30)),
    );

    assert_eq!(outcome, Outcome::Aborted { stage: Stage::LinkingPopup });
    assert!(outcome.user_message().is_none());
    assert_eq!(harness.identity.count(|c| matches!(c, Call::Link { .. })), 0);
    assert_eq!(harness.sessions.save_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_already_cancelled_token_stops_before_lookup() {
    let harness = Harness::new(FakeIdentityProvider::new(), FakeBackend::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = harness
        .resolver()
        .resolve_conflict(
            &google(),
            conflict(Some("b@x.com"), Some(google_credential())),
            &cancel,
        )
        .await;

    assert_eq!(outcome, Outcome::Aborted { stage: Stage::MethodLookup });
    assert_eq!(harness.identity.count(|c| matches!(c, Call::ListMethods(_))), 0);
}

#[tokio::test(start_paused = true)]
async fn test_method_lookup_timeout() {
    let harness = Harness::new(
        FakeIdentityProvider::new().with_hang(Hang::ListMethods),
        FakeBackend::new(),
    );
    let resolver = harness.resolver_with(ResolverConfig {
        network_timeout_secs: Some(10),
        ..Default::default()
    });

    let outcome = resolver
        .resolve_conflict(
            &google(),
            conflict(Some("b@x.com"), Some(google_credential())),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome, Outcome::TimedOut { stage: Stage::MethodLookup });
    assert!(outcome.user_message().unwrap().contains("method_lookup"));
}

#[tokio::test(start_paused = true)]
async fn test_exchange_timeout_falls_through_to_popup() {
    let harness = Harness::new(
        FakeIdentityProvider::new()
            .with_methods(&["google.com"])
            .with_popup("google.com", "uid-google"),
        FakeBackend::new().with_hanging_exchange(),
    );
    let resolver = harness.resolver_with(ResolverConfig {
        network_timeout_secs: Some(5),
        ..Default::default()
    });

    let outcome = resolver
        .resolve_conflict(
            &github(),
            conflict(Some("a@x.com"), Some(github_credential("tok"))),
            &CancellationToken::new(),
        )
        .await;

    assert!(outcome.is_success(), "{:?}", outcome);
    assert_eq!(harness.identity.popup_calls(), vec!["google.com".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_exchange_aborts_without_fallthrough() {
    let harness = Harness::new(
        FakeIdentityProvider::new()
            .with_methods(&["google.com"])
            .with_popup("google.com", "uid-google"),
        FakeBackend::new().with_hanging_exchange(),
    );
    let resolver = harness.resolver();
    let cancel = CancellationToken::new();

    let provider = github();
    let (outcome, _) = tokio::join!(
        resolver.resolve_conflict(
            &provider,
            conflict(Some("a@x.com"), Some(github_credential("tok"))),
            &cancel,
        ),
        cancel_after(cancel.clone(), Duration::from_secs(2)),
    );

    assert_eq!(outcome, Outcome::Aborted { stage: Stage::TokenExchange });
    assert!(harness.identity.popup_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_interaction_timeout_does_not_limit_network_steps() {
    let harness = Harness::new(
        FakeIdentityProvider::new()
            .with_methods(&["github.com"])
            .with_hang(Hang::Popup),
        FakeBackend::new(),
    );
    let resolver = harness.resolver_with(ResolverConfig {
        interaction_timeout_secs: Some(120),
        ..Default::default()
    });

    let outcome = resolver
        .resolve_conflict(
            &google(),
            conflict(Some("b@x.com"), Some(google_credential())),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome, Outcome::TimedOut { stage: Stage::LinkingPopup });
    assert_eq!(harness.identity.count(|c| matches!(c, Call::ListMethods(_))), 1);
}

#[tokio::test(start_paused = true)]
async fn test_attempts_are_serialised() {
    let harness = Harness::new(
        FakeIdentityProvider::new()
            .with_methods(&["github.com"])
            .with_popup("github.com", "uid-gh"),
        FakeBackend::new(),
    );
    let resolver = harness.resolver();
    let cancel = CancellationToken::new();

    let provider = google();
    let (first, second) = tokio::join!(
        resolver.resolve_conflict(&provider, conflict(Some("b@x.com"), Some(google_credential())), &cancel),
        resolver.resolve_conflict(&provider, conflict(Some("b@x.com"), Some(google_credential())), &cancel),
    );

    assert!(first.is_success());
    assert!(second.is_success());

    // The second attempt's lookup only starts after the first attempt's link.
    let calls = harness.identity.calls();
    let first_link = calls.iter().position(|c| matches!(c, Call::Link { .. })).unwrap();
    let second_lookup = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, Call::ListMethods(_)))
        .nth(1)
        .map(|(i, _)| i)
        .unwrap();
    assert!(first_link < second_lookup);
}
