use std::collections::VecDeque;
use std::fmt;
use std::thread;

use kld7_frame::{AckError, CommandWriter, FrameError, ResponseReader, Target};
use kld7_transport::{SensorLink, TransportError};
use serde::Serialize;

use crate::cancel::Cancellation;
use crate::capture::Capture;
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::state::{transition, Command, Effect, Event, SessionState};

/// Why a streaming cycle produced nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleMiss {
    /// `GNFD` was not acknowledged.
    Ack(AckError),
    /// The detection header stopped short.
    Header { got: usize },
    /// The target payload stopped short.
    Payload { got: usize },
}

impl fmt::Display for CycleMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleMiss::Ack(err) => write!(f, "{err}"),
            CycleMiss::Header { got } => write!(f, "truncated header ({got} of 8 bytes)"),
            CycleMiss::Payload { got } => write!(f, "truncated target ({got} of 8 bytes)"),
        }
    }
}

/// Result of one streaming cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Target(Capture),
    NoTarget,
    Missed(CycleMiss),
}

/// Counters kept while streaming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub cycles: u64,
    pub targets: u64,
    pub misses: u64,
    pub consecutive_misses: u32,
}

/// What a finished session hands back.
#[derive(Debug)]
pub struct SessionReport {
    pub final_state: SessionState,
    pub outcome: Result<()>,
    pub captures: Vec<Capture>,
    pub reached_streaming: bool,
    pub stats: SessionStats,
}

/// A connection to one sensor.
///
/// The session owns its link for its whole life. Setup, streaming and
/// shutdown go through [`transition`]; this type carries out the effects and
/// keeps the captures.
pub struct SensorSession<L: SensorLink> {
    link: Option<L>,
    state: SessionState,
    config: SessionConfig,
    baud_rate: u32,
    captures: Vec<Capture>,
    reached_streaming: bool,
    init_failure: Option<AckError>,
    stats: SessionStats,
}

impl<L: SensorLink> SensorSession<L> {
    /// Wrap an already opened link. Nothing is sent until [`initialize`].
    ///
    /// [`initialize`]: SensorSession::initialize
    pub fn new(link: L, config: SessionConfig) -> Self {
        let baud_rate = link.baud_rate();
        Self {
            link: Some(link),
            state: SessionState::Disconnected,
            config,
            baud_rate,
            captures: Vec::new(),
            reached_streaming: false,
            init_failure: None,
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current line rate of the link.
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn captures(&self) -> &[Capture] {
        &self.captures
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Send `INIT`, switch rates and apply the presets.
    ///
    /// On success the session is `Streaming`. A failed `INIT` closes the link
    /// without a goodbye and returns `InitializationFailed`.
    pub fn initialize(&mut self) -> Result<()> {
        self.step(Event::Connect)?;
        if let Some(err) = self.init_failure.take() {
            return Err(SessionError::InitializationFailed(err));
        }
        Ok(())
    }

    /// Run one streaming cycle.
    ///
    /// Missed cycles are reported, not raised; only errors that end the
    /// session are returned.
    pub fn poll(&mut self) -> Result<PollOutcome> {
        let outcome = self
            .step(Event::Poll)?
            .unwrap_or(PollOutcome::NoTarget);

        self.stats.cycles += 1;
        match &outcome {
            PollOutcome::Target(_) => {
                self.stats.targets += 1;
                self.stats.consecutive_misses = 0;
            }
            PollOutcome::NoTarget => self.stats.consecutive_misses = 0,
            PollOutcome::Missed(_) => {
                self.stats.misses += 1;
                self.stats.consecutive_misses += 1;
            }
        }
        Ok(outcome)
    }

    /// Poll until cancelled or a configured limit is hit, then shut down.
    ///
    /// `on_cycle` sees every outcome as it happens. Reaching the cycle limit
    /// ends the run normally; reaching the consecutive-miss limit shuts down
    /// and returns `MissedCycleLimit`.
    pub fn run<F>(&mut self, cancel: &Cancellation, mut on_cycle: F) -> Result<()>
    where
        F: FnMut(&PollOutcome),
    {
        match self.stream(cancel, &mut on_cycle) {
            Ok(()) => self.shutdown(),
            Err(err) => {
                if self.state == SessionState::Streaming {
                    self.abort(&err);
                }
                Err(err)
            }
        }
    }

    fn stream<F>(&mut self, cancel: &Cancellation, on_cycle: &mut F) -> Result<()>
    where
        F: FnMut(&PollOutcome),
    {
        loop {
            if cancel.is_cancelled() {
                tracing::info!(cycles = self.stats.cycles, "stop requested");
                return Ok(());
            }
            if let Some(max) = self.config.max_cycles {
                if self.stats.cycles >= max {
                    tracing::info!(cycles = max, "cycle limit reached");
                    return Ok(());
                }
            }

            let outcome = self.poll()?;
            on_cycle(&outcome);

            if let Some(limit) = self.config.max_consecutive_misses {
                if self.stats.consecutive_misses >= limit {
                    return Err(SessionError::MissedCycleLimit {
                        count: self.stats.consecutive_misses,
                    });
                }
            }

            if !self.config.pace.is_zero() {
                thread::sleep(self.config.pace);
            }
        }
    }

    /// Say goodbye (if streaming) and close the link. Goodbye failures are
    /// ignored.
    pub fn shutdown(&mut self) -> Result<()> {
        match self.state {
            SessionState::Streaming => self.step(Event::Cancel).map(|_| ()),
            SessionState::Disconnected => {
                self.close_link();
                Ok(())
            }
            state => Err(SessionError::InvalidTransition {
                state,
                event: Event::Cancel.name(),
            }),
        }
    }

    /// Shut down if needed and hand back everything collected.
    ///
    /// `outcome` is the result of the caller's last session call and ends up
    /// in the report unchanged.
    pub fn finish(mut self, outcome: Result<()>) -> SessionReport {
        if let Err(err) = self.shutdown() {
            tracing::warn!(error = %err, "shutdown during finish failed");
        }
        SessionReport {
            final_state: self.state,
            outcome,
            captures: std::mem::take(&mut self.captures),
            reached_streaming: self.reached_streaming,
            stats: self.stats,
        }
    }

    /// Drive an event and abort on a fatal error.
    fn step(&mut self, event: Event) -> Result<Option<PollOutcome>> {
        match self.drive(event) {
            Ok(outcome) => Ok(outcome),
            Err(err @ SessionError::InvalidTransition { .. }) => Err(err),
            Err(err) => {
                self.abort(&err);
                Err(err)
            }
        }
    }

    /// Tear down after a fatal error. A goodbye is attempted only if the link
    /// still works.
    fn abort(&mut self, err: &SessionError) {
        let link_usable = err.link_usable();
        tracing::error!(state = %self.state, error = %err, link_usable, "session aborted");
        if let Err(abort_err) = self.drive(Event::Fault { link_usable }) {
            tracing::debug!(error = %abort_err, "abort fell back to closing the link");
            self.close_link();
            self.state = SessionState::Disconnected;
        }
    }

    /// Apply an event and every event its effects produce.
    fn drive(&mut self, event: Event) -> Result<Option<PollOutcome>> {
        let mut pending = VecDeque::from([event]);
        let mut outcome = None;

        while let Some(event) = pending.pop_front() {
            let step = transition(self.state, event)?;
            if step.next != self.state {
                tracing::debug!(from = %self.state, to = %step.next, event = event.name(), "state change");
            }
            self.state = step.next;
            if self.state == SessionState::Streaming && !self.reached_streaming {
                self.reached_streaming = true;
                tracing::info!(baud_rate = self.baud_rate, "streaming");
            }

            for effect in step.effects {
                match effect {
                    Effect::Send(command) => pending.push_back(self.send(command)?),
                    Effect::RaiseBaudRate => self.raise_baud_rate()?,
                    Effect::ReadDetection => outcome = Some(self.read_detection()?),
                    Effect::Warn(command, err) => {
                        tracing::warn!(?command, error = %err, "command failed, continuing");
                        if command == Command::NextFrame {
                            outcome = Some(PollOutcome::Missed(CycleMiss::Ack(err)));
                        }
                    }
                    Effect::FailInitialization(err) => {
                        tracing::error!(error = %err, "sensor did not acknowledge INIT");
                        self.init_failure = Some(err);
                    }
                    Effect::Close => self.close_link(),
                }
            }
        }

        Ok(outcome)
    }

    /// Send a command and turn its acknowledgment into the next event.
    fn send(&mut self, command: Command) -> Result<Event> {
        match self.exchange(command) {
            Ok(()) => Ok(Event::Acked),
            Err(FrameError::Ack(err)) => Ok(Event::Rejected(err)),
            Err(err) if command == Command::Goodbye => {
                tracing::debug!(error = %err, "goodbye exchange failed");
                Ok(Event::Fault { link_usable: false })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn exchange(&mut self, command: Command) -> std::result::Result<(), FrameError> {
        let frame = self.config.frame_for(command);
        let link = self.link.as_mut().ok_or(FrameError::ConnectionClosed)?;
        CommandWriter::new(&mut *link).write_frame(&frame)?;
        ResponseReader::new(link).read_ack()
    }

    fn raise_baud_rate(&mut self) -> Result<()> {
        if !self.config.settle_delay.is_zero() {
            thread::sleep(self.config.settle_delay);
        }

        let rate = self.config.baud_rate.bits_per_second();
        let link = self.link.as_mut().ok_or(TransportError::Closed)?;
        link.set_baud_rate(rate)?;
        if let Some(timeout) = self.config.streaming_timeout {
            link.set_read_timeout(timeout)?;
        }
        self.baud_rate = rate;
        tracing::info!(
            baud_rate = rate,
            read_timeout = ?link.read_timeout(),
            "link switched to negotiated rate"
        );
        Ok(())
    }

    fn read_detection(&mut self) -> Result<PollOutcome> {
        let link = self.link.as_mut().ok_or(FrameError::ConnectionClosed)?;
        let detection = ResponseReader::new(link).read_detection();
        let outcome = match detection {
            Ok(Some(target)) => PollOutcome::Target(self.record(target)),
            Ok(None) => PollOutcome::NoTarget,
            Err(FrameError::TruncatedHeader { got }) => {
                tracing::warn!(got, "truncated detection header");
                PollOutcome::Missed(CycleMiss::Header { got })
            }
            Err(FrameError::TruncatedPayload { got, .. }) => {
                tracing::warn!(got, "truncated target payload");
                PollOutcome::Missed(CycleMiss::Payload { got })
            }
            Err(err) => return Err(err.into()),
        };
        Ok(outcome)
    }

    fn record(&mut self, target: Target) -> Capture {
        let capture = Capture::now(target);
        tracing::debug!(
            distance_cm = target.distance_cm,
            speed_kmh = target.speed_kmh,
            angle_deg = target.angle_deg,
            "target"
        );
        self.captures.push(capture);
        capture
    }

    fn close_link(&mut self) {
        if let Some(mut link) = self.link.take() {
            if let Err(err) = link.close() {
                tracing::warn!(error = %err, "failed to close link");
            }
            tracing::info!("link closed");
        }
    }
}

impl<L: SensorLink> fmt::Debug for SensorSession<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorSession")
            .field("state", &self.state)
            .field("baud_rate", &self.baud_rate)
            .field("open", &self.link.is_some())
            .field("captures", &self.captures.len())
            .field("stats", &self.stats)
            .finish()
    }
}

/// Initialize, stream until `cancel` fires or a limit is hit, then shut
/// down. The link must already be open.
pub fn run_session<L, F>(
    link: L,
    config: SessionConfig,
    cancel: &Cancellation,
    on_cycle: F,
) -> SessionReport
where
    L: SensorLink,
    F: FnMut(&PollOutcome),
{
    let mut session = SensorSession::new(link, config);
    let outcome = session
        .initialize()
        .and_then(|()| session.run(cancel, on_cycle));
    session.finish(outcome)
}
