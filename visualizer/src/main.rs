use anyhow::Context;
use clap::Parser;
use config::VisualizerConfig;
use iced::{
    event, time,
    widget::{
        button, canvas::{self, Canvas}, column, image, row, scrollable, text, text_input, Column,
        Container,
    },
    window, Alignment, Element, Event, Length, Subscription, Task, Theme,
};
use map_canvas::MapCanvas;
use std::{path::PathBuf, sync::Arc, time::Instant};
use tokio::sync::broadcast::{self, error::TryRecvError};
use trackcore::{
    device::DeviceReading,
    generation::Generation,
    plan::{DecodeOutcome, MapBundle},
    telemetry::{LogChannel, MetricsRecorder},
    viewport::{ViewportCommand, ViewportController},
    DecodeError, MapScene,
};

mod backend;
mod config;
mod map_canvas;

#[derive(Parser)]
#[command(author, version, about = "Live floor-plan map of positioning devices")]
struct Args {
    /// Load settings from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Base URL of the positioning backend
    #[arg(long)]
    server: Option<String>,
    /// Device poll interval in milliseconds
    #[arg(long)]
    poll_ms: Option<u64>,
    /// INI map to load on startup
    #[arg(long)]
    map: Option<PathBuf>,
    /// Send the start signal on launch
    #[arg(long, default_value_t = false)]
    start: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => VisualizerConfig::load(path)?,
        None => VisualizerConfig::default(),
    };
    if let Some(server) = args.server {
        config.server = server;
    }
    if let Some(poll_ms) = args.poll_ms {
        config.poll_ms = poll_ms;
    }
    let client = config.http_client()?;
    let map = args.map;
    let start = args.start;

    iced::application(
        move || Visualizer::boot(config.clone(), client.clone(), map.clone(), start),
        Visualizer::update,
        Visualizer::view,
    )
    .title(application_title)
    .subscription(application_subscription)
    .theme(application_theme)
    .run()
    .context("running visualizer")
}

fn application_title(_: &Visualizer) -> String {
    "Indoor Positioning Map".into()
}

fn application_subscription(state: &Visualizer) -> Subscription<Message> {
    Subscription::batch([
        time::every(state.config.poll_interval()).map(|_| Message::Tick),
        event::listen_with(dropped_file),
    ])
}

fn application_theme(_: &Visualizer) -> Theme {
    Theme::Dark
}

fn dropped_file(event: Event, _status: event::Status, _window: window::Id) -> Option<Message> {
    match event {
        Event::Window(window::Event::FileDropped(path)) => Some(Message::MapDropped(path)),
        _ => None,
    }
}

struct Visualizer {
    config: VisualizerConfig,
    client: reqwest::Client,
    scene: MapScene,
    viewport: Option<ViewportController>,
    plan_handle: Option<image::Handle>,
    cache: canvas::Cache,
    log: LogChannel,
    log_feed: broadcast::Receiver<String>,
    history: Vec<String>,
    status: String,
    map_path: String,
    recording: bool,
    polls_in_flight: usize,
}

#[derive(Debug, Clone)]
pub enum Message {
    Tick,
    DevicesFetched(Generation, Result<Vec<DeviceReading>, String>),
    Viewport(Vec<ViewportCommand>),
    StartSession,
    ToggleRecording,
    SignalSent(Result<String, String>),
    MapPathChanged(String),
    LoadMap,
    MapDropped(PathBuf),
    MapParsed(Result<MapBundle, String>),
    PlanDecoded(DecodeOutcome),
}

impl Visualizer {
    fn boot(
        config: VisualizerConfig,
        client: reqwest::Client,
        map: Option<PathBuf>,
        start: bool,
    ) -> (Self, Task<Message>) {
        let log = LogChannel::default();
        let log_feed = log.subscribe();
        let scene = MapScene::new(log.clone(), Arc::new(MetricsRecorder::new()));

        let mut tasks = Vec::new();
        if let Some(path) = &map {
            tasks.push(Task::done(Message::MapDropped(path.clone())));
        }
        if start {
            tasks.push(Task::done(Message::StartSession));
        }

        (
            Visualizer {
                config,
                client,
                scene,
                viewport: None,
                plan_handle: None,
                cache: canvas::Cache::new(),
                log,
                log_feed,
                history: Vec::new(),
                status: "Waiting for devices...".into(),
                map_path: map
                    .map(|path| path.display().to_string())
                    .unwrap_or_default(),
                recording: false,
                polls_in_flight: 0,
            },
            Task::batch(tasks),
        )
    }

    fn update(state: &mut Self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                state.drain_log();
                if let Some(controller) = state.viewport.as_mut() {
                    if controller.flush(Instant::now()) {
                        state.cache.clear();
                    }
                }
                if state.polls_in_flight >= state.config.max_in_flight {
                    return Task::none();
                }
                state.polls_in_flight += 1;
                let ticket = state.scene.begin_poll();
                Task::perform(
                    backend::fetch_devices(state.client.clone(), state.config.endpoint("devices")),
                    move |result| Message::DevicesFetched(ticket, result),
                )
            }
            Message::DevicesFetched(ticket, Ok(readings)) => {
                state.polls_in_flight = state.polls_in_flight.saturating_sub(1);
                if state.scene.apply_poll(ticket, &readings) {
                    state.cache.clear();
                    state.status = format!("Tracking {} devices", state.scene.devices().len());
                }
                Task::none()
            }
            Message::DevicesFetched(ticket, Err(err)) => {
                state.polls_in_flight = state.polls_in_flight.saturating_sub(1);
                state.scene.fail_poll(ticket, &err);
                state.status = format!("Backend unreachable: {err}");
                Task::none()
            }
            Message::Viewport(commands) => {
                let now = Instant::now();
                let mut changed = false;
                for command in commands {
                    changed |= state.apply_viewport(command, now);
                }
                if changed {
                    state.cache.clear();
                }
                Task::none()
            }
            Message::StartSession => {
                state.log.record("starting positioning session");
                Task::perform(
                    backend::post_signal(state.client.clone(), state.config.endpoint("start")),
                    Message::SignalSent,
                )
            }
            Message::ToggleRecording => {
                state.recording = !state.recording;
                let path = if state.recording {
                    "record/start"
                } else {
                    "record/stop"
                };
                state.log.record(if state.recording {
                    "recording started"
                } else {
                    "recording stopped"
                });
                Task::perform(
                    backend::post_signal(state.client.clone(), state.config.endpoint(path)),
                    Message::SignalSent,
                )
            }
            Message::SignalSent(Ok(message)) => {
                log::debug!("{message}");
                Task::none()
            }
            Message::SignalSent(Err(err)) => {
                state.log.warn(&format!("signal failed: {err}"));
                Task::none()
            }
            Message::MapPathChanged(value) => {
                state.map_path = value;
                Task::none()
            }
            Message::LoadMap => {
                let path = state.map_path.trim();
                if path.is_empty() {
                    return Task::none();
                }
                Task::perform(backend::read_map(PathBuf::from(path)), Message::MapParsed)
            }
            Message::MapDropped(path) => {
                state.map_path = path.display().to_string();
                Task::perform(backend::read_map(path), Message::MapParsed)
            }
            Message::MapParsed(Ok(bundle)) => match state.scene.begin_map_load(bundle) {
                Some(decode) => {
                    state.status = "Decoding floor plan...".into();
                    Task::perform(decode, Message::PlanDecoded)
                }
                None => {
                    state.plan_handle = None;
                    state.cache.clear();
                    Task::none()
                }
            },
            Message::MapParsed(Err(err)) => {
                state.log.warn(&format!("failed to parse map file: {err}"));
                Task::none()
            }
            Message::PlanDecoded(outcome) => {
                match state.scene.complete_map_load(outcome) {
                    Ok(()) => {
                        state.plan_handle = state.scene.plan().map(|plan| {
                            image::Handle::from_rgba(
                                plan.image.width,
                                plan.image.height,
                                plan.image.pixels.to_vec(),
                            )
                        });
                        state.cache.clear();
                        state.status = format!("Map loaded: {}", state.map_path);
                    }
                    Err(DecodeError::StaleDecode(_)) => {}
                    Err(err) => state.status = format!("Floor plan unavailable: {err}"),
                }
                Task::none()
            }
        }
    }

    fn view(state: &Self) -> Element<'_, Message> {
        let metrics = state.scene.metrics().snapshot();
        let record_label = if state.recording {
            "Stop recording"
        } else {
            "Start recording"
        };

        let device_entries = if state.scene.devices().is_empty() {
            Column::new().push(text("No devices yet").size(12))
        } else {
            state.scene.devices().iter().take(12).fold(
                Column::new().spacing(4),
                |col, device| {
                    col.push(
                        text(format!(
                            "#{} {:?}: ({:.2}, {:.2}) q{}",
                            device.id,
                            device.role,
                            device.position.x,
                            device.position.y,
                            device.quality
                        ))
                        .size(12),
                    )
                },
            )
        };

        let history_list = if state.history.is_empty() {
            Column::new().push(text("No activity yet").size(12))
        } else {
            state
                .history
                .iter()
                .rev()
                .fold(Column::new().spacing(4), |col, entry| {
                    col.push(text(entry.clone()).size(12))
                })
        };

        let controls = column![
            text("Positioning").size(26),
            row![
                button("Start").on_press(Message::StartSession).padding(10),
                button(record_label)
                    .on_press(Message::ToggleRecording)
                    .padding(10),
            ]
            .spacing(10),
            text_input("Map file (.ini)", &state.map_path)
                .on_input(Message::MapPathChanged)
                .on_submit(Message::LoadMap)
                .padding(6),
            button("Load map").on_press(Message::LoadMap).padding(10),
            text(state.status.as_str()).size(14),
            text(format!(
                "polls {} (changed {}, superseded {}, failed {}) | plans {} (failed {}, stale {})",
                metrics.polls_applied,
                metrics.polls_changed,
                metrics.polls_superseded,
                metrics.poll_errors,
                metrics.decodes_applied,
                metrics.decodes_failed,
                metrics.decodes_stale
            ))
            .size(11),
            text("Devices").size(16),
            Container::new(device_entries).padding(6),
            text("Activity log").size(16),
            Container::new(scrollable(history_list).height(Length::Fixed(160.0))).padding(6),
        ]
        .spacing(10)
        .padding(16)
        .width(Length::Fixed(340.0));

        let plan = state.scene.plan().zip(state.plan_handle.as_ref());
        let map = Canvas::new(MapCanvas {
            devices: state.scene.devices(),
            plan,
            viewport: state.viewport.as_ref(),
            view_config: &state.config.view,
            cache: &state.cache,
        })
        .width(Length::Fill)
        .height(Length::Fill);

        let layout = row![controls, map]
            .spacing(20)
            .align_y(Alignment::Start)
            .padding(20);

        Container::new(layout)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn apply_viewport(&mut self, command: ViewportCommand, now: Instant) -> bool {
        if let Some(controller) = self.viewport.as_mut() {
            return controller.dispatch(command, now);
        }
        match command {
            ViewportCommand::Resize { width, height } => {
                self.viewport = Some(ViewportController::mount(
                    self.config.view.clone(),
                    width,
                    height,
                ));
                true
            }
            _ => false,
        }
    }

    fn drain_log(&mut self) {
        loop {
            match self.log_feed.try_recv() {
                Ok(message) => self.push_history(message),
                Err(TryRecvError::Lagged(skipped)) => {
                    self.push_history(format!("({skipped} messages dropped)"));
                }
                Err(_) => break,
            }
        }
    }

    fn push_history(&mut self, entry: String) {
        self.history.push(entry);
        if self.history.len() > self.config.history_len {
            self.history.remove(0);
        }
    }
}
