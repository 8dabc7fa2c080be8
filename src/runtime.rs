// Runtime Module - Executes console effects on tokio and feeds the outcomes back as events
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::config::ConsoleConfig;
use crate::controller::{Effect, Event};
use crate::error::Result;
use crate::host::HostAddress;

pub struct Runtime {
    handle: Handle,
    client: ApiClient,
    base_path: String,
    timeout: Duration,
    events: UnboundedSender<Event>,
    status_poll: Option<JoinHandle<()>>,
    mode_poll: Option<JoinHandle<()>>,
}

impl Runtime {
    pub fn new(handle: Handle, host: &HostAddress, config: &ConsoleConfig) -> Result<(Self, UnboundedReceiver<Event>)> {
        let (events, rx) = mpsc::unbounded_channel();
        let client = ApiClient::new(host, &config.base_path, config.request_timeout())?;
        let runtime = Runtime {
            handle,
            client,
            base_path: config.base_path.clone(),
            timeout: config.request_timeout(),
            events,
            status_poll: None,
            mode_poll: None,
        };
        Ok((runtime, rx))
    }

    /// Sender for events produced outside the runtime (config watcher)
    pub fn sender(&self) -> UnboundedSender<Event> {
        self.events.clone()
    }

    /// Pick up base path and timeout of a reloaded config for the next reconnect
    pub fn update_settings(&mut self, config: &ConsoleConfig) {
        let changed = self.base_path != config.base_path || self.timeout != config.request_timeout();
        self.base_path = config.base_path.clone();
        self.timeout = config.request_timeout();
        if changed {
            match config.host_address() {
                Ok(host) => self.reconnect(&host),
                Err(e) => warn!("keeping current client: {}", e),
            }
        }
    }

    fn spawn_ticker(&self, period: Duration, tick: fn() -> Event) -> JoinHandle<()> {
        let events = self.events.clone();
        self.handle.spawn(async move {
            // First tick one period from now; the initial fetch is issued by the caller
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if events.send(tick()).is_err() {
                    break;
                }
            }
        })
    }

    pub fn start_status_poll(&mut self, period: Duration) {
        if let Some(handle) = self.status_poll.take() {
            handle.abort();
        }
        debug!("status poll every {:?}", period);
        self.status_poll = Some(self.spawn_ticker(period, || Event::StatusTick));
    }

    pub fn is_mode_polling(&self) -> bool {
        self.mode_poll.is_some()
    }

    fn stop_mode_poll(&mut self) {
        if let Some(handle) = self.mode_poll.take() {
            debug!("mode poll cancelled");
            handle.abort();
        }
    }

    fn reconnect(&mut self, host: &HostAddress) {
        match ApiClient::new(host, &self.base_path, self.timeout) {
            Ok(client) => {
                info!("using {}", client.base_url());
                self.client = client;
            }
            Err(e) => warn!("could not switch to {}: {}", host, e),
        }
    }

    /// Run effects in order; network calls are spawned and never awaited here
    pub fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::FetchStatus { seq } => {
                    let client = self.client.clone();
                    let events = self.events.clone();
                    self.handle.spawn(async move {
                        let result = client.fetch_status().await;
                        let _ = events.send(Event::Status { seq, result });
                    });
                }
                Effect::FetchDocument { seq, url } => {
                    let client = self.client.clone();
                    let events = self.events.clone();
                    self.handle.spawn(async move {
                        let result = client.get_data(&url).await;
                        let _ = events.send(Event::Document { seq, url, result });
                    });
                }
                Effect::SetMode { mode } => {
                    let client = self.client.clone();
                    let events = self.events.clone();
                    self.handle.spawn(async move {
                        let result = client.set_mode(mode).await;
                        let _ = events.send(Event::ModeSet { mode, result });
                    });
                }
                Effect::Invoke { action } => {
                    let client = self.client.clone();
                    let events = self.events.clone();
                    self.handle.spawn(async move {
                        let result = client.invoke(&action).await;
                        let _ = events.send(Event::ActionDone {
                            label: action.routine.label,
                            target: action.target,
                            result,
                        });
                    });
                }
                Effect::StopModePoll => self.stop_mode_poll(),
                Effect::StartModePoll { interval } => {
                    self.stop_mode_poll();
                    debug!("mode poll every {:?}", interval);
                    self.mode_poll = Some(self.spawn_ticker(interval, || Event::ModeTick));
                }
                Effect::RestartStatusPoll { interval } => self.start_status_poll(interval),
                Effect::Reconnect { host } => self.reconnect(&host),
            }
        }
    }

    pub fn shutdown(&mut self) {
        self.stop_mode_poll();
        if let Some(handle) = self.status_poll.take() {
            handle.abort();
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
