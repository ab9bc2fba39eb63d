//! `watch`: follow the live stream and print every change.
//!
//! The store is the only source of truth here. Three selector
//! subscriptions (events, connection flag, notification) forward value
//! changes into a channel; the loop diffs event lists and prints one line
//! per added/updated/removed event.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use owo_colors::Style;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use calsync_core::{
    AppState, CalendarEvent, EntityId, LiveSync, Notification, Store, Subscription,
};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output::{self, paint};

use super::{stream_error, wait_finished};

// ── Store → feed ─────────────────────────────────────────────────────

/// A projection change reported by a store subscription.
#[derive(Debug, Clone)]
enum Change {
    Events(Arc<Vec<CalendarEvent>>),
    Connected(bool),
    Notification(Notification),
}

/// One printed line of the feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedItem {
    Connection { connected: bool },
    Added { event: CalendarEvent },
    Updated { event: CalendarEvent },
    Removed { event: CalendarEvent },
    Notification(Notification),
}

impl FeedItem {
    fn is_event_change(&self) -> bool {
        matches!(
            self,
            Self::Added { .. } | Self::Updated { .. } | Self::Removed { .. }
        )
    }
}

/// Compare two event lists by id.
///
/// Added and updated items come in `next` order, removed ones in `prev`
/// order after them.
pub fn diff_events(prev: &[CalendarEvent], next: &[CalendarEvent]) -> Vec<FeedItem> {
    let before: HashMap<&EntityId, &CalendarEvent> = prev.iter().map(|e| (&e.id, e)).collect();
    let after: HashMap<&EntityId, &CalendarEvent> = next.iter().map(|e| (&e.id, e)).collect();

    let mut items = Vec::new();
    for event in next {
        match before.get(&event.id) {
            None => items.push(FeedItem::Added {
                event: event.clone(),
            }),
            Some(old) if *old != event => items.push(FeedItem::Updated {
                event: event.clone(),
            }),
            Some(_) => {}
        }
    }
    for event in prev {
        if !after.contains_key(&event.id) {
            items.push(FeedItem::Removed {
                event: event.clone(),
            });
        }
    }
    items
}

#[derive(Debug, Default)]
struct Feed {
    events: Arc<Vec<CalendarEvent>>,
}

impl Feed {
    fn apply(&mut self, change: Change) -> Vec<FeedItem> {
        match change {
            Change::Events(next) => {
                let items = diff_events(&self.events, &next);
                self.events = next;
                items
            }
            Change::Connected(connected) => vec![FeedItem::Connection { connected }],
            Change::Notification(n) => vec![FeedItem::Notification(n)],
        }
    }
}

fn subscribe(
    store: &Store<AppState>,
    tx: &mpsc::UnboundedSender<Change>,
    notifications: bool,
) -> Vec<Subscription> {
    let mut subscriptions = Vec::with_capacity(3);

    let events = tx.clone();
    subscriptions.push(store.subscribe_selected(
        |s| Arc::clone(&s.events),
        move |list| {
            let _ = events.send(Change::Events(Arc::clone(list)));
        },
    ));

    let connected = tx.clone();
    subscriptions.push(store.subscribe_selected(
        |s| s.connected,
        move |flag| {
            let _ = connected.send(Change::Connected(*flag));
        },
    ));

    if notifications {
        let toasts = tx.clone();
        subscriptions.push(store.subscribe_selected(
            |s| s.notification.clone(),
            move |n: &Option<Notification>| {
                if let Some(n) = n {
                    let _ = toasts.send(Change::Notification(n.clone()));
                }
            },
        ));
    }

    subscriptions
}

// ── Rendering ────────────────────────────────────────────────────────

/// Render one feed item in the chosen format.
pub fn render_item(item: &FeedItem, format: OutputFormat, color: bool) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => Ok(text_line(item, color)),
        OutputFormat::Plain => Ok(plain_line(item)),
        OutputFormat::Json => output::render_json(item, false),
        OutputFormat::JsonCompact => output::render_json(item, true),
        OutputFormat::Yaml => Ok(format!("---\n{}", output::render_yaml(item)?)),
    }
}

fn text_line(item: &FeedItem, color: bool) -> String {
    let dim = Style::new().dimmed();
    let event_line = |sign: &str, style: Style, event: &CalendarEvent| {
        format!(
            "{} {}  {}  {}",
            paint(sign, style, color),
            event.start.format("%Y-%m-%d %H:%M"),
            event.title,
            paint(&format!("({})", event.id), dim, color)
        )
    };

    match item {
        FeedItem::Connection { connected: true } => {
            paint("● connected", Style::new().green().bold(), color)
        }
        FeedItem::Connection { connected: false } => {
            paint("○ disconnected", Style::new().yellow().bold(), color)
        }
        FeedItem::Added { event } => event_line("+", Style::new().green(), event),
        FeedItem::Updated { event } => event_line("~", Style::new().yellow(), event),
        FeedItem::Removed { event } => event_line("-", Style::new().red(), event),
        FeedItem::Notification(n) => format!(
            "{} {}",
            paint(
                &format!("[{}]", n.severity),
                output::severity_style(n.severity),
                color
            ),
            n.message
        ),
    }
}

fn plain_line(item: &FeedItem) -> String {
    match item {
        FeedItem::Connection { connected } => format!("connection\t{connected}"),
        FeedItem::Added { event } => format!("added\t{}", output::event_line(event)),
        FeedItem::Updated { event } => format!("updated\t{}", output::event_line(event)),
        FeedItem::Removed { event } => format!("removed\t{}", output::event_line(event)),
        FeedItem::Notification(n) => format!("notification\t{}\t{}", n.severity, n.message),
    }
}

/// Prints feed items and tracks the `--count` budget.
struct Printer {
    format: OutputFormat,
    color: bool,
    quiet: bool,
    remaining: Option<usize>,
}

impl Printer {
    /// Print `items`; returns `true` once the count budget is spent.
    fn emit(&mut self, items: &[FeedItem]) -> Result<bool, CliError> {
        for item in items {
            output::print_output(&render_item(item, self.format, self.color)?, self.quiet);
            if item.is_event_change() {
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining = remaining.saturating_sub(1);
                }
            }
            if self.done() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn done(&self) -> bool {
        self.remaining == Some(0)
    }
}

// ── Handler ──────────────────────────────────────────────────────────

pub async fn handle(
    sync: &LiveSync,
    profile: &str,
    args: &WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _subscriptions = subscribe(sync.store(), &tx, !args.no_notifications);
    drop(tx);

    let mut feed = Feed::default();
    let mut printer = Printer {
        format: global.output,
        color: output::should_color(global.color),
        quiet: global.quiet,
        remaining: args.count,
    };
    if printer.done() {
        return Ok(());
    }

    let mut state = sync.connection_state();
    sync.start().await.map_err(|e| stream_error(e, profile))?;
    info!(url = %sync.config().url, "watching event stream");

    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                sync.stop().await;
                return Ok(());
            }
            Some(change) = rx.recv() => {
                if printer.emit(&feed.apply(change))? {
                    sync.stop().await;
                    return Ok(());
                }
            }
            () = wait_finished(&mut state) => {
                // Joining the bridge guarantees every store write reached the channel.
                sync.stop().await;
                while let Ok(change) = rx.try_recv() {
                    if printer.emit(&feed.apply(change))? {
                        return Ok(());
                    }
                }

                let failure = sync.last_error();
                if !args.reconnect {
                    return failure.map_or(Ok(()), |e| Err(stream_error(e, profile)));
                }
                match failure {
                    Some(e) => warn!(error = %e, delay = args.reconnect_delay, "event stream failed; reconnecting"),
                    None => info!(delay = args.reconnect_delay, "event stream closed; reconnecting"),
                }
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => return Ok(()),
                    () = tokio::time::sleep(Duration::from_secs(args.reconnect_delay)) => {}
                }
                sync.start().await.map_err(|e| stream_error(e, profile))?;
            }
        }
    }
}
