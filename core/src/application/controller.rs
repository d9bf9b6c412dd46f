//! Resilience controller: resolve, select and tunnel, retrying on failure.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::resolver::TargetResolver;
use super::selector::{SelectionMode, TargetSelector};
use super::session::TunnelSession;
use crate::domain::{ForwardOptions, Target, TunnelEvent};
use crate::error::{Error, Result, SessionError};
use crate::ports::{PortForwarder, Prompter, TargetLister, TunnelNotifier};

/// Default retry cap.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default wait between attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Bounded retry budget with a fixed backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

/// How a controller run ended without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerOutcome {
    /// The operator stopped the tunnel.
    Succeeded,
    /// The operator quit a prompt.
    Cancelled,
}

#[derive(Debug)]
enum ControllerState {
    Attempting,
    Backoff(Error),
    Succeeded,
    Exhausted(Error),
    Cancelled,
}

/// Orchestrates resolve, select and tunnel until a clean stop or the retry
/// budget runs out.
///
/// Every attempt re-resolves and re-selects from scratch, so a replaced pod
/// is picked up on the next attempt. The local port never changes.
pub struct ResilienceController<L, F, P, N>
where
    L: TargetLister,
    F: PortForwarder,
    P: Prompter,
    N: TunnelNotifier,
{
    resolver: TargetResolver<L>,
    selector: TargetSelector<P>,
    forwarder: F,
    notifier: N,
    policy: RetryPolicy,
}

impl<L, F, P, N> ResilienceController<L, F, P, N>
where
    L: TargetLister,
    F: PortForwarder,
    P: Prompter,
    N: TunnelNotifier,
{
    pub fn new(lister: L, forwarder: F, prompter: P, notifier: N) -> Self {
        Self {
            resolver: TargetResolver::new(lister),
            selector: TargetSelector::new(prompter),
            forwarder,
            notifier,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn lister(&self) -> &L {
        self.resolver.lister()
    }

    pub fn selector(&self) -> &TargetSelector<P> {
        &self.selector
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Resolve once before the first attempt. Errors here are not retried.
    ///
    /// An empty result from a direct selector is reported as `NoTargets`.
    pub async fn preflight(&self, options: &ForwardOptions) -> Result<Vec<Target>> {
        let targets = self.resolver.resolve(&options.selector).await?;
        if targets.is_empty() && !options.selector.is_service() {
            return Err(Error::NoTargets {
                selector: options.selector.to_string(),
            });
        }
        Ok(targets)
    }

    /// Keep a tunnel up for `options` until `shutdown` is cancelled.
    ///
    /// Returns `Error::RetriesExhausted` once more than `max_retries`
    /// consecutive attempts have failed.
    pub async fn run(
        &self,
        options: &ForwardOptions,
        shutdown: &CancellationToken,
    ) -> Result<ControllerOutcome> {
        let mut retries: u32 = 0;
        let mut state = ControllerState::Attempting;

        loop {
            state = match state {
                ControllerState::Attempting => {
                    debug!(attempt = retries + 1, selector = %options.selector, "starting attempt");
                    match self.attempt(options, shutdown).await {
                        Ok(()) => ControllerState::Succeeded,
                        Err(err) if err.is_cancelled() => ControllerState::Cancelled,
                        Err(err) => {
                            retries += 1;
                            if retries > self.policy.max_retries {
                                ControllerState::Exhausted(err)
                            } else {
                                ControllerState::Backoff(err)
                            }
                        }
                    }
                }

                ControllerState::Backoff(reason) => {
                    warn!(
                        attempt = retries,
                        max_retries = self.policy.max_retries,
                        error = %reason,
                        "attempt failed, retrying"
                    );
                    self.notifier.notify(TunnelEvent::Retrying {
                        attempt: retries,
                        max_retries: self.policy.max_retries,
                        delay: self.policy.interval,
                        reason: reason.to_string(),
                    });

                    tokio::select! {
                        biased;

                        _ = shutdown.cancelled() => ControllerState::Succeeded,
                        _ = tokio::time::sleep(self.policy.interval) => ControllerState::Attempting,
                    }
                }

                ControllerState::Succeeded => {
                    info!("tunnel stopped");
                    self.notifier.notify(TunnelEvent::Stopped);
                    return Ok(ControllerOutcome::Succeeded);
                }

                ControllerState::Cancelled => {
                    info!("selection cancelled");
                    return Ok(ControllerOutcome::Cancelled);
                }

                ControllerState::Exhausted(last) => {
                    warn!(max_retries = self.policy.max_retries, error = %last, "retries exhausted");
                    return Err(Error::RetriesExhausted {
                        max_retries: self.policy.max_retries,
                        source: Box::new(last),
                    });
                }
            };
        }
    }

    /// One resolve, select and tunnel pass. `Ok(())` means a clean stop.
    async fn attempt(&self, options: &ForwardOptions, shutdown: &CancellationToken) -> Result<()> {
        let target = tokio::select! {
            biased;

            _ = shutdown.cancelled() => return Ok(()),
            target = self.resolve_and_select(options) => target?,
        };

        self.notifier.notify(TunnelEvent::TargetSelected {
            target: target.clone(),
        });

        let spec = options.for_target(target);
        let forward_loop = self
            .forwarder
            .prepare(&spec)
            .map_err(SessionError::NeverReady)?;

        match TunnelSession::new(spec)
            .run(forward_loop, shutdown, &self.notifier)
            .await
            .into_error()
        {
            None => Ok(()),
            Some(err) => Err(err.into()),
        }
    }

    async fn resolve_and_select(&self, options: &ForwardOptions) -> Result<Target> {
        let candidates = self.resolver.resolve(&options.selector).await?;

        let mode = if options.selector.is_service() {
            SelectionMode::FirstRunning
        } else {
            SelectionMode::Interactive
        };

        let target = self
            .selector
            .select(candidates, mode, &options.selector.to_string())
            .await?;
        debug!(pod = %target.id(), "selected target");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::resolver::tests::{pod, service, MockLister};
    use crate::application::selector::tests::ScriptedPrompter;
    use crate::application::session::tests::{RecordingNotifier, Script, ScriptedLoop};
    use crate::domain::{ForwardSpec, Label, SelectorSpec, TargetPhase};
    use crate::error::TransportError;
    use crate::kubernetes::KubectlError;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use tokio::time::Instant;
    use tokio_test::{assert_err, assert_ok};

    /// Forwarder that hands out scripted loops and records every prepared spec.
    #[derive(Default)]
    struct MockForwarder {
        scripts: Mutex<VecDeque<Script>>,
        prepared: Mutex<Vec<ForwardSpec>>,
    }

    impl MockForwarder {
        fn new(scripts: Vec<Script>) -> Self {
            Self {
                scripts: Mutex::new(scripts.into()),
                prepared: Mutex::new(Vec::new()),
            }
        }

        fn prepared_count(&self) -> usize {
            self.prepared.lock().len()
        }
    }

    impl PortForwarder for MockForwarder {
        type Loop = ScriptedLoop;

        fn prepare(&self, spec: &ForwardSpec) -> std::result::Result<Self::Loop, TransportError> {
            self.prepared.lock().push(spec.clone());
            let script = self
                .scripts
                .lock()
                .pop_front()
                .unwrap_or(Script::ReadyUntilStopped);
            Ok(ScriptedLoop(script))
        }
    }

    type TestController =
        ResilienceController<MockLister, MockForwarder, ScriptedPrompter, RecordingNotifier>;

    fn running_web(times: usize) -> Vec<std::result::Result<Vec<Target>, KubectlError>> {
        (0..times)
            .map(|_| Ok(vec![pod("web-0", TargetPhase::Running)]))
            .collect()
    }

    fn label_options() -> ForwardOptions {
        ForwardOptions::new(
            SelectorSpec::labels("default", vec![Label::new("app", "web")]),
            43121,
            80,
        )
    }

    fn controller(
        lister: MockLister,
        forwarder: MockForwarder,
        prompter: ScriptedPrompter,
        shutdown: &CancellationToken,
    ) -> TestController {
        ResilienceController::new(
            lister,
            forwarder,
            prompter,
            RecordingNotifier::stopping(shutdown),
        )
    }

    fn count(events: &[&str], kind: &str) -> usize {
        events.iter().filter(|e| **e == kind).count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_failures() {
        for failures in [0usize, 1, 3, 5] {
            let shutdown = CancellationToken::new();
            let mut scripts = vec![Script::FailBeforeReady; failures];
            scripts.push(Script::ReadyUntilStopped);

            let lister = MockLister::with_responses(running_web(failures + 1));
            let controller = controller(
                lister,
                MockForwarder::new(scripts),
                ScriptedPrompter::default(),
                &shutdown,
            );

            let start = Instant::now();
            let outcome = controller.run(&label_options(), &shutdown).await;
            let elapsed = start.elapsed();

            assert_eq!(assert_ok!(outcome), ControllerOutcome::Succeeded);
            assert_eq!(controller.lister().list_calls(), failures + 1);
            assert_eq!(controller.forwarder.prepared_count(), failures + 1);

            let events = controller.notifier().event_types();
            assert_eq!(count(&events, "retrying"), failures);
            assert_eq!(count(&events, "target_selected"), failures + 1);
            assert_eq!(count(&events, "ready"), 1);
            assert_eq!(events.last(), Some(&"stopped"));

            let expected = DEFAULT_RETRY_INTERVAL * failures as u32;
            assert!(elapsed >= expected, "{failures} failures took {elapsed:?}");
            assert!(elapsed < expected + Duration::from_secs(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cluster_error_during_resolution_is_retried() {
        let shutdown = CancellationToken::new();
        let lister = MockLister::with_responses(vec![
            Err(KubectlError::ClusterNotConnected("connection refused".to_string())),
            Ok(vec![pod("web-0", TargetPhase::Running)]),
        ]);
        let controller = controller(
            lister,
            MockForwarder::default(),
            ScriptedPrompter::default(),
            &shutdown,
        );

        let start = Instant::now();
        let outcome = controller.run(&label_options(), &shutdown).await;

        assert_eq!(assert_ok!(outcome), ControllerOutcome::Succeeded);
        assert!(start.elapsed() >= DEFAULT_RETRY_INTERVAL);
        assert_eq!(controller.lister().list_calls(), 2);
        assert_eq!(controller.forwarder.prepared_count(), 1);

        let events = controller.notifier().event_types();
        assert_eq!(
            events,
            ["retrying", "target_selected", "ready", "stopped"]
        );
        let retry_reason = match &controller.notifier().events.lock()[0] {
            TunnelEvent::Retrying { reason, .. } => reason.clone(),
            other => panic!("unexpected event: {other:?}"),
        };
        assert!(retry_reason.contains("connection refused"), "{retry_reason}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_tunnel_is_reestablished() {
        let shutdown = CancellationToken::new();
        let controller = ResilienceController::new(
            MockLister::with_responses(running_web(2)),
            MockForwarder::new(vec![Script::ReadyThenFail, Script::ReadyUntilStopped]),
            ScriptedPrompter::default(),
            RecordingNotifier::stopping_after(&shutdown, 2),
        );

        let outcome = controller.run(&label_options(), &shutdown).await;

        assert_eq!(assert_ok!(outcome), ControllerOutcome::Succeeded);
        assert_eq!(controller.lister().list_calls(), 2);
        assert_eq!(controller.forwarder.prepared_count(), 2);

        let events = controller.notifier().event_types();
        assert_eq!(
            events,
            [
                "target_selected",
                "ready",
                "retrying",
                "target_selected",
                "ready",
                "stopped"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let shutdown = CancellationToken::new();
        let attempts = DEFAULT_MAX_RETRIES as usize + 1;

        let lister = MockLister::with_responses(running_web(attempts + 1));
        let controller = controller(
            lister,
            MockForwarder::new(vec![Script::FailBeforeReady; attempts + 1]),
            ScriptedPrompter::default(),
            &shutdown,
        );

        let err = assert_err!(controller.run(&label_options(), &shutdown).await);

        match err {
            Error::RetriesExhausted {
                max_retries,
                source,
            } => {
                assert_eq!(max_retries, DEFAULT_MAX_RETRIES);
                assert!(matches!(*source, Error::Session(SessionError::NeverReady(_))));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(controller.forwarder.prepared_count(), attempts);
        assert_eq!(controller.lister().list_calls(), attempts);

        let events = controller.notifier().event_types();
        assert_eq!(count(&events, "retrying"), DEFAULT_MAX_RETRIES as usize);
        assert_eq!(count(&events, "stopped"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_second_selection() {
        let shutdown = CancellationToken::new();
        let two_running = || {
            Ok(vec![
                pod("web-0", TargetPhase::Running),
                pod("web-1", TargetPhase::Running),
            ])
        };

        let controller = controller(
            MockLister::with_responses(vec![two_running(), two_running(), two_running()]),
            MockForwarder::new(vec![Script::FailBeforeReady]),
            ScriptedPrompter::new(vec![Some(1), None]),
            &shutdown,
        );

        let outcome = controller.run(&label_options(), &shutdown).await.unwrap();

        assert_eq!(outcome, ControllerOutcome::Cancelled);
        assert_eq!(controller.selector().prompter().prompt_count(), 2);
        assert_eq!(controller.lister().list_calls(), 2);

        let prepared = controller.forwarder.prepared.lock();
        assert_eq!(prepared.len(), 1);
        assert_eq!(prepared[0].target.name, "web-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_running_targets_never_opens_session() {
        let shutdown = CancellationToken::new();
        let pending = || Ok(vec![pod("web-0", TargetPhase::Pending)]);

        let controller = controller(
            MockLister::with_responses(vec![pending(), pending()]),
            MockForwarder::default(),
            ScriptedPrompter::default(),
            &shutdown,
        )
        .with_policy(RetryPolicy {
            max_retries: 1,
            interval: Duration::from_secs(1),
        });

        let err = controller.run(&label_options(), &shutdown).await.unwrap_err();

        assert!(matches!(
            err,
            Error::RetriesExhausted { ref source, .. } if matches!(**source, Error::NoRunningTargets { .. })
        ));
        assert_eq!(controller.forwarder.prepared_count(), 0);
        assert_eq!(controller.selector().prompter().prompt_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_backoff_is_clean() {
        let shutdown = CancellationToken::new();
        let controller = ResilienceController::new(
            MockLister::with_responses(running_web(1)),
            MockForwarder::new(vec![Script::FailBeforeReady]),
            ScriptedPrompter::default(),
            RecordingNotifier::default(),
        );

        let canceller = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(2)).await;
                shutdown.cancel();
            })
        };

        let outcome = controller.run(&label_options(), &shutdown).await.unwrap();
        canceller.await.unwrap();

        assert_eq!(outcome, ControllerOutcome::Succeeded);
        assert_eq!(controller.forwarder.prepared_count(), 1);
        assert_eq!(controller.notifier().event_types(), ["target_selected", "retrying", "stopped"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_service_mode_takes_first_running_pod() {
        let shutdown = CancellationToken::new();
        let mut lister = MockLister::with_responses(vec![Ok(vec![
            pod("foo-0", TargetPhase::Pending),
            pod("foo-1", TargetPhase::Running),
            pod("foo-2", TargetPhase::Terminated),
        ])]);
        lister.services = vec![service("foo", &[("app", "foo")], vec![])];

        let controller = controller(
            lister,
            MockForwarder::default(),
            ScriptedPrompter::default(),
            &shutdown,
        );
        let options = ForwardOptions::new(SelectorSpec::service("default", "foo"), 43121, 8080);

        let outcome = controller.run(&options, &shutdown).await.unwrap();

        assert_eq!(outcome, ControllerOutcome::Succeeded);
        assert_eq!(controller.selector().prompter().prompt_count(), 0);
        let prepared = controller.forwarder.prepared.lock();
        assert_eq!(prepared[0].target.name, "foo-1");
        assert_eq!(prepared[0].port_mapping(), "43121:8080");
    }

    #[tokio::test]
    async fn test_preflight_reports_empty_direct_selection() {
        let shutdown = CancellationToken::new();
        let controller = controller(
            MockLister::with_responses(vec![Ok(vec![])]),
            MockForwarder::default(),
            ScriptedPrompter::default(),
            &shutdown,
        );

        let err = controller.preflight(&label_options()).await.unwrap_err();
        assert!(matches!(err, Error::NoTargets { selector } if selector.contains("app=web")));
        assert_eq!(controller.forwarder.prepared_count(), 0);
    }
}
