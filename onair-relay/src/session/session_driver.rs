use crate::config::{ConfigError, RelayConfig};
use crate::directory::RoleDirectory;
use crate::orchestrator::{LinkEvent, Orchestrator, OrchestratorContext};
use crate::pipeline::{RetentionSweeper, SignalDeduplicator, SignalPoller};
use crate::session::{SessionCommand, SessionHandle};
use crate::store::SignalStore;
use crate::transport::{
    LocalAudioTrack, RemoteAudioPacket, TransportFactory, WebRtcTransportFactory,
};
use futures::future::join_all;
use onair_core::{Clock, ParticipantId, SessionId, SystemClock};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

/// What one participant needs to join the relay.
pub struct SessionParams {
    pub session_id: SessionId,
    /// Identity of the local participant. Its role is looked up in the
    /// directory by this id.
    pub local_id: ParticipantId,
    pub config: RelayConfig,
    pub store: Arc<dyn SignalStore>,
    pub directory: Arc<dyn RoleDirectory>,
    pub transports: Arc<dyn TransportFactory>,
    pub clock: Arc<dyn Clock>,
}

/// Audio ends of a WebRTC session.
#[derive(Clone, Default)]
pub struct AudioRouting {
    /// Sent on every outbound link while the microphone is on.
    pub microphone: Option<LocalAudioTrack>,
    /// Receives audio from every speaker this participant listens to.
    pub playback: Option<broadcast::Sender<RemoteAudioPacket>>,
}

impl SessionParams {
    /// A session on real WebRTC links using the ICE servers of
    /// `config.transport` and the system clock.
    pub fn webrtc(
        session_id: SessionId,
        local_id: ParticipantId,
        config: RelayConfig,
        store: Arc<dyn SignalStore>,
        directory: Arc<dyn RoleDirectory>,
        audio: AudioRouting,
    ) -> Self {
        let mut factory = WebRtcTransportFactory::new(config.transport.clone());
        if let Some(track) = audio.microphone {
            factory = factory.with_local_audio(track);
        }
        if let Some(sink) = audio.playback {
            factory = factory.with_remote_audio_sink(sink);
        }

        Self {
            session_id,
            local_id,
            config,
            store,
            directory,
            transports: Arc::new(factory),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// The session task. Owns the orchestrator and drives poll, sweep and
/// directory refresh from its own timers.
pub struct SessionDriver {
    session_id: SessionId,
    config: RelayConfig,
    directory: Arc<dyn RoleDirectory>,

    orchestrator: Orchestrator,
    link_events: mpsc::UnboundedReceiver<LinkEvent>,

    poller: SignalPoller,
    dedup: SignalDeduplicator,
    sweeper: RetentionSweeper,

    commands: mpsc::UnboundedReceiver<SessionCommand>,
}

impl SessionDriver {
    pub fn new(params: SessionParams) -> Result<(Self, SessionHandle), ConfigError> {
        params.config.validate()?;

        let (orchestrator, link_events) = Orchestrator::new(OrchestratorContext {
            session_id: params.session_id,
            local_id: params.local_id,
            store: params.store.clone(),
            transports: params.transports,
            disconnect_grace: params.config.disconnect_grace,
        });

        let poller = SignalPoller::new(
            params.store.clone(),
            params.session_id,
            params.local_id,
            params.config.poll_window,
            params.clock.clone(),
        );
        let sweeper = RetentionSweeper::new(
            params.store,
            params.session_id,
            params.config.purge_cutoff,
            params.clock,
        );

        let (commands_tx, commands) = mpsc::unbounded_channel();
        let handle = SessionHandle::new(
            params.session_id,
            params.local_id,
            commands_tx,
            orchestrator.status(),
        );

        let driver = Self {
            session_id: params.session_id,
            config: params.config,
            directory: params.directory,
            orchestrator,
            link_events,
            poller,
            dedup: SignalDeduplicator::new(),
            sweeper,
            commands,
        };
        Ok((driver, handle))
    }

    /// Event loop. Returns after a shutdown command or once every handle is
    /// dropped.
    pub async fn run(mut self) {
        info!(
            "Session {} started for {}",
            self.session_id,
            self.orchestrator.local_id()
        );

        let mut poll_tick = interval(self.config.poll_interval);
        poll_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sweep_tick = interval(self.config.sweep_interval);
        sweep_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut refresh_tick = interval(self.config.directory_refresh_interval);
        refresh_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut directory_rx = self.directory.subscribe(&self.session_id);
        let mut directory_push = true;
        let mut sweep_task: Option<JoinHandle<()>> = None;

        loop {
            tokio::select! {
                cmd = self.commands.recv() => {
                    match cmd {
                        Some(SessionCommand::SetMicrophone(live)) => {
                            self.orchestrator.set_local_track_live(live);
                        }
                        Some(SessionCommand::Reconcile) => self.refresh_directory().await,
                        Some(SessionCommand::Shutdown(done)) => {
                            self.shutdown(sweep_task.take()).await;
                            let _ = done.send(());
                            return;
                        }
                        None => {
                            info!("All session handles dropped");
                            break;
                        }
                    }
                }

                Some(event) = self.link_events.recv() => {
                    self.orchestrator.handle_link_event(event);
                }

                _ = poll_tick.tick() => self.poll_once().await,

                _ = refresh_tick.tick() => self.refresh_directory().await,

                changed = directory_rx.changed(), if directory_push => {
                    match changed {
                        Ok(()) => self.refresh_directory().await,
                        Err(_) => {
                            debug!("Directory has no change feed; relying on refresh");
                            directory_push = false;
                        }
                    }
                }

                _ = sweep_tick.tick() => {
                    // The purge runs off the signaling path; skip a cycle if
                    // the previous one is still going.
                    if sweep_task.as_ref().is_none_or(JoinHandle::is_finished) {
                        let sweeper = self.sweeper.clone();
                        sweep_task = Some(tokio::spawn(async move {
                            match sweeper.sweep().await {
                                Ok(deleted) if deleted > 0 => info!("Purged {} old signals", deleted),
                                Ok(_) => {}
                                Err(e) => warn!("Retention sweep failed: {}", e),
                            }
                        }));
                    }
                }
            }
        }

        self.shutdown(sweep_task).await;
    }

    async fn poll_once(&mut self) {
        match self.poller.poll().await {
            Ok(signals) => {
                for signal in signals {
                    if self.dedup.admit(&signal) {
                        self.orchestrator.handle_signal(signal);
                    }
                }
            }
            Err(e) => warn!("Signal poll failed: {}", e),
        }

        let cutoff = self.poller.window_start();
        self.dedup.evict_older_than(cutoff);
        self.orchestrator.evict_expired(cutoff);
    }

    async fn refresh_directory(&mut self) {
        match self.directory.list_active_participants(&self.session_id).await {
            Ok(participants) => self.orchestrator.reconcile(&participants),
            Err(e) => warn!("Directory refresh failed: {}", e),
        }
    }

    async fn shutdown(&mut self, sweep_task: Option<JoinHandle<()>>) {
        if let Some(task) = sweep_task {
            task.abort();
        }

        let workers = self.orchestrator.shutdown();
        for result in join_all(workers).await {
            if let Err(e) = result {
                if !e.is_cancelled() {
                    error!("Link worker panicked: {}", e);
                }
            }
        }
        info!("Session {} stopped", self.session_id);
    }
}

/// Spawn a session task and return its handle.
pub fn spawn_session(params: SessionParams) -> Result<SessionHandle, ConfigError> {
    let (driver, handle) = SessionDriver::new(params)?;
    tokio::spawn(driver.run());
    Ok(handle)
}
