//! Before / after hook runner for connected samples.
//!
//! A sample implements [`ConnectedSample::action`]; [`SampleRunner`]
//! wraps it with exactly one `connect` before and, once connected,
//! exactly one `disconnect` after, whatever the action does.

use crate::error::{VmwareError, VmwareErrorKind};
use crate::lifecycle::SessionLifecycle;

use futures::FutureExt;
use std::panic::AssertUnwindSafe;

/// Work that needs a live session.
#[async_trait::async_trait]
pub trait ConnectedSample: Send {
    fn name(&self) -> &str;

    async fn action(&mut self, session: &SessionLifecycle) -> crate::error::VmwareResult<()>;
}

/// Exit codes the top level reports for each outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitPolicy {
    /// Reported when no session could be opened.
    pub connect_failure_code: i32,
    /// Reported when the action or teardown failed.
    pub failure_code: i32,
}

impl Default for ExitPolicy {
    /// Connect failures exit with 0, matching the long-standing
    /// behaviour of the sample suite.
    fn default() -> Self {
        Self {
            connect_failure_code: 0,
            failure_code: 1,
        }
    }
}

impl ExitPolicy {
    /// Every failure is non-zero.
    pub fn strict() -> Self {
        Self {
            connect_failure_code: 1,
            failure_code: 1,
        }
    }
}

#[derive(Debug)]
pub enum SampleOutcome {
    Completed,
    /// The before-hook failed; the action never ran.
    ConnectFailed(VmwareError),
    ActionFailed(VmwareError),
    /// Teardown failed, possibly after a failed action as well.
    DisconnectFailed {
        action: Option<VmwareError>,
        error: VmwareError,
    },
}

impl SampleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn exit_code(&self, policy: &ExitPolicy) -> i32 {
        match self {
            Self::Completed => 0,
            Self::ConnectFailed(_) => policy.connect_failure_code,
            Self::ActionFailed(_) | Self::DisconnectFailed { .. } => policy.failure_code,
        }
    }
}

pub struct SampleRunner {
    policy: ExitPolicy,
}

impl Default for SampleRunner {
    fn default() -> Self {
        Self::new(ExitPolicy::default())
    }
}

impl SampleRunner {
    pub fn new(policy: ExitPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ExitPolicy {
        &self.policy
    }

    /// Run `sample` inside a session.
    pub async fn run(
        &self,
        session: &mut SessionLifecycle,
        sample: &mut dyn ConnectedSample,
    ) -> SampleOutcome {
        log::info!("Running sample '{}'", sample.name());

        if let Some(e) = session.connect().await.err() {
            log::error!("No valid connection available. Exiting now.");
            return SampleOutcome::ConnectFailed(e);
        }

        let action = match AssertUnwindSafe(sample.action(session)).catch_unwind().await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(_) => Some(VmwareError::new(
                VmwareErrorKind::Other,
                format!("Sample '{}' panicked", sample.name()),
            )),
        };
        if let Some(ref e) = action {
            log::error!("Sample '{}' failed: {}", sample.name(), e);
        }

        match session.disconnect().await.err() {
            None => match action {
                None => SampleOutcome::Completed,
                Some(e) => SampleOutcome::ActionFailed(e),
            },
            Some(error) => SampleOutcome::DisconnectFailed { action, error },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{SimulatedConnection, SimulatedFailure, SimulatedProbe};
    use crate::types::ConnectionConfig;
    use std::sync::Arc;

    enum Behaviour {
        Succeed,
        Fail,
        Panic,
    }

    struct Probe {
        behaviour: Behaviour,
        saw_connected: Option<bool>,
    }

    impl Probe {
        fn new(behaviour: Behaviour) -> Self {
            Self { behaviour, saw_connected: None }
        }
    }

    #[async_trait::async_trait]
    impl ConnectedSample for Probe {
        fn name(&self) -> &str {
            "probe"
        }

        async fn action(&mut self, session: &SessionLifecycle) -> crate::error::VmwareResult<()> {
            self.saw_connected = Some(session.is_connected());
            match self.behaviour {
                Behaviour::Succeed => Ok(()),
                Behaviour::Fail => Err(VmwareError::not_found("vm 'web01' not found")),
                Behaviour::Panic => panic!("sample bug"),
            }
        }
    }

    fn session(probe: &Arc<SimulatedProbe>) -> SessionLifecycle {
        SessionLifecycle::new().with_connection(Box::new(SimulatedConnection::new(
            ConnectionConfig::new("https://vc.sim/sdk", "administrator@vsphere.local", "pw"),
            Arc::clone(probe),
        )))
    }

    #[tokio::test]
    async fn hooks_wrap_the_action_once() {
        let conn_probe = SimulatedProbe::new();
        let mut s = session(&conn_probe);
        let mut sample = Probe::new(Behaviour::Succeed);

        let outcome = SampleRunner::default().run(&mut s, &mut sample).await;
        assert!(outcome.is_success());
        assert_eq!(sample.saw_connected, Some(true));
        assert_eq!(conn_probe.connect_calls(), 1);
        assert_eq!(conn_probe.disconnect_calls(), 1);
        assert_eq!(outcome.exit_code(&ExitPolicy::default()), 0);
    }

    #[tokio::test]
    async fn connect_failure_skips_action_and_exits_zero_by_default() {
        let conn_probe = SimulatedProbe::new();
        conn_probe.fail_connect(SimulatedFailure::Error(VmwareError::auth("Invalid credentials")));
        let mut s = session(&conn_probe);
        let mut sample = Probe::new(Behaviour::Succeed);

        let outcome = SampleRunner::default().run(&mut s, &mut sample).await;
        assert!(matches!(outcome, SampleOutcome::ConnectFailed(_)));
        assert_eq!(sample.saw_connected, None);
        assert_eq!(conn_probe.disconnect_calls(), 0);
        assert_eq!(outcome.exit_code(&ExitPolicy::default()), 0);
        assert_eq!(outcome.exit_code(&ExitPolicy::strict()), 1);
    }

    #[tokio::test]
    async fn failed_action_still_disconnects() {
        let conn_probe = SimulatedProbe::new();
        let mut s = session(&conn_probe);
        let mut sample = Probe::new(Behaviour::Fail);

        let outcome = SampleRunner::default().run(&mut s, &mut sample).await;
        assert!(matches!(outcome, SampleOutcome::ActionFailed(_)));
        assert_eq!(conn_probe.disconnect_calls(), 1);
        assert_eq!(outcome.exit_code(&ExitPolicy::default()), 1);
    }

    #[tokio::test]
    async fn panicking_action_still_disconnects() {
        let conn_probe = SimulatedProbe::new();
        let mut s = session(&conn_probe);
        let mut sample = Probe::new(Behaviour::Panic);

        let outcome = SampleRunner::default().run(&mut s, &mut sample).await;
        assert!(matches!(outcome, SampleOutcome::ActionFailed(_)));
        assert_eq!(conn_probe.disconnect_calls(), 1);
    }

    #[tokio::test]
    async fn disconnect_failure_is_reported() {
        let conn_probe = SimulatedProbe::new();
        conn_probe.fail_disconnect(SimulatedFailure::Error(VmwareError::api(500, "boom")));
        let mut s = session(&conn_probe);
        let mut sample = Probe::new(Behaviour::Fail);

        match SampleRunner::default().run(&mut s, &mut sample).await {
            SampleOutcome::DisconnectFailed { action, error } => {
                assert!(action.is_some());
                assert!(error.is_connection());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
