//! Built-in connected samples.

use crate::error::VmwareResult;
use crate::lifecycle::SessionLifecycle;
use crate::sample::ConnectedSample;

use std::io::Write;

/// Smallest possible sample: report that a session is open.
pub struct ConnectSample<W> {
    out: W,
}

impl<W: Write + Send> ConnectSample<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait::async_trait]
impl<W: Write + Send> ConnectedSample for ConnectSample<W> {
    fn name(&self) -> &str {
        "connect"
    }

    async fn action(&mut self, session: &SessionLifecycle) -> VmwareResult<()> {
        writeln!(self.out, "currently connected: {}", session.is_connected())?;
        if let Some(info) = session.session_info() {
            writeln!(self.out, "endpoint: {} ({:?})", info.url, info.kind)?;
            writeln!(self.out, "user: {}", info.username)?;
        }
        let about = &session.service_content()?.about;
        writeln!(self.out, "server: {} [{:?}]", about.full_name, about.api_type)?;
        writeln!(self.out, "root folder: {}", session.root_ref()?)?;
        Ok(())
    }
}

/// Print the server clock.
pub struct CurrentTimeSample<W> {
    out: W,
}

impl<W: Write + Send> CurrentTimeSample<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait::async_trait]
impl<W: Write + Send> ConnectedSample for CurrentTimeSample<W> {
    fn name(&self) -> &str {
        "current-time"
    }

    async fn action(&mut self, session: &SessionLifecycle) -> VmwareResult<()> {
        let time = session.vim_port()?.current_time().await?;
        writeln!(
            self.out,
            "Server current time: {} {} ({})",
            time.date, time.time, time.timezone
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{SimulatedConnection, SimulatedProbe};
    use crate::sample::SampleRunner;
    use crate::types::ConnectionConfig;

    fn session() -> SessionLifecycle {
        SessionLifecycle::new().with_connection(Box::new(
            SimulatedConnection::new(
                ConnectionConfig::new("https://esx01.sim", "root", "pw"),
                SimulatedProbe::new(),
            )
            .as_host(),
        ))
    }

    #[tokio::test]
    async fn connect_sample_reports_session() {
        let mut s = session();
        let mut sample = ConnectSample::new(Vec::new());

        let outcome = SampleRunner::default().run(&mut s, &mut sample).await;
        assert!(outcome.is_success());

        let text = String::from_utf8(sample.into_inner()).unwrap();
        assert!(text.contains("currently connected: true"));
        assert!(text.contains("root folder: Folder:ha-folder-root"));
        assert!(text.contains("HostAgent"));
    }

    #[tokio::test]
    async fn sample_outside_session_fails() {
        let s = session();
        let mut sample = CurrentTimeSample::new(Vec::new());
        assert!(sample.action(&s).await.is_err());
        assert!(sample.into_inner().is_empty());
    }
}
