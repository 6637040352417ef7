//! Line-oriented node runtime.
//!
//! One task, one [`ChatService`], one `select!` loop over four sources:
//!
//! - inbound events from the transport subscription
//! - finished hardware scans (scans run on a spawned task)
//! - input lines
//! - a tick from the environment that expires typing indicators
//!
//! All engine state lives on this loop, so nothing is locked. Inbound events
//! are polled first so a burst of input cannot starve the network.

use std::{sync::Arc, time::Duration};

use bluechat_core::{ChatService, CoreError, Environment, ScanError, Scanner, Storage, Transport};
use bluechat_proto::{Device, DeliveryStatus, PeerId, WireEvent};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};
use tracing::{debug, info, warn};

use crate::{
    command::{Command, HELP},
    error::NodeError,
};

/// Messages shown when a conversation is opened.
const HISTORY_LINES: usize = 10;

type ScanResult = Result<Option<Device>, ScanError>;

/// Drives a [`ChatService`] from text input and renders what happens.
pub struct Runtime<E, S, T, Sc>
where
    E: Environment,
    S: Storage,
    T: Transport,
    Sc: Scanner,
{
    service: ChatService<E, S, T>,
    env: E,
    scanner: Arc<Sc>,
    tick_interval: Duration,
    scanning: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

impl<E, S, T, Sc> Runtime<E, S, T, Sc>
where
    E: Environment,
    S: Storage,
    T: Transport,
    Sc: Scanner,
{
    /// Wrap a started service.
    pub fn new(service: ChatService<E, S, T>, env: E, scanner: Sc, tick_interval: Duration) -> Self {
        Self { service, env, scanner: Arc::new(scanner), tick_interval, scanning: false }
    }

    /// Run until input ends, `/quit`, or the transport closes.
    ///
    /// Shuts the service down before returning it.
    ///
    /// # Errors
    ///
    /// Reading input or writing output failed.
    pub async fn run<R, W>(mut self, input: R, mut output: W) -> Result<ChatService<E, S, T>, NodeError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        let (scan_tx, mut scan_rx) = mpsc::unbounded_channel::<ScanResult>();

        let identity = self.service.identity();
        let banner = format!("{} ({}) ready; /help for commands", identity.name, identity.phone_handle);
        say(&mut output, &banner).await?;
        info!(peer = %identity.id, "runtime started");

        loop {
            tokio::select! {
                biased;

                event = self.service.next_event() => {
                    let Some(event) = event else {
                        warn!("transport closed");
                        break;
                    };
                    self.on_event(event, &mut output).await?;
                },
                Some(result) = scan_rx.recv() => {
                    self.scanning = false;
                    self.on_scan(result, &mut output).await?;
                },
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        debug!("input closed");
                        break;
                    };
                    if self.on_line(&line, &mut output, &scan_tx).await? == Flow::Quit {
                        break;
                    }
                },
                () = self.env.sleep(self.tick_interval) => {},
            }

            self.service.tick();
        }

        self.service.shutdown();
        output.flush().await?;
        Ok(self.service)
    }

    async fn on_event<W: AsyncWrite + Unpin>(&mut self, event: WireEvent, out: &mut W) -> Result<(), NodeError> {
        let nearby_before = self.service.nearby().len();
        let rendered = event.clone();

        if let Err(err) = self.service.handle_event(event) {
            warn!(%err, "failed to apply inbound event");
            return say(out, &format!("! {err}")).await;
        }

        match rendered {
            WireEvent::Presence { peer } if self.service.nearby().len() > nearby_before => {
                let n = self.service.nearby().len();
                say(out, &format!("* found {} nearby ({n}: /connect {n})", peer.name)).await?;
            },
            WireEvent::Chat { message, destination } if destination == self.service.identity().id => {
                let sender = message.sender_id;
                if self.service.active() == Some(sender) {
                    say(out, &format!("{}: {}", self.name_of(sender), message.text)).await?;
                } else if let Some(session) = self.service.session(sender) {
                    let line = format!("* new message from {} ({} unread)", session.peer_name, session.unread_count);
                    say(out, &line).await?;
                }
            },
            WireEvent::Typing { from, is_typing: true } if self.service.active() == Some(from) => {
                say(out, &format!("* {} is typing...", self.name_of(from))).await?;
            },
            _ => {},
        }
        Ok(())
    }

    async fn on_scan<W: AsyncWrite + Unpin>(&mut self, result: ScanResult, out: &mut W) -> Result<(), NodeError> {
        let found = result.as_ref().ok().and_then(Option::as_ref).map(|d| d.name.clone());
        match self.service.apply_scan_result(result) {
            Ok(true) => {
                let n = self.service.nearby().len();
                let name = found.unwrap_or_default();
                say(out, &format!("* scan found {name} ({n}: /connect {n})")).await
            },
            Ok(false) => Ok(()),
            Err(err) => say(out, &format!("! {err}")).await,
        }
    }

    async fn on_line<W: AsyncWrite + Unpin>(
        &mut self,
        line: &str,
        out: &mut W,
        scan_tx: &mpsc::UnboundedSender<ScanResult>,
    ) -> Result<Flow, NodeError> {
        let command = match Command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(Flow::Continue),
            Err(err) => {
                say(out, &format!("! {err}")).await?;
                return Ok(Flow::Continue);
            },
        };

        let result = match command {
            Command::Quit => return Ok(Flow::Quit),
            Command::Help => say(out, HELP).await,
            Command::WhoAmI => {
                let me = self.service.identity();
                say(out, &format!("{} {} [{}]", me.name, me.phone_handle, me.id)).await
            },
            Command::Radio(on) => {
                self.service.set_radio(on);
                say(out, if on { "* radio on" } else { "* radio off" }).await
            },
            Command::Scan => self.scan(out, scan_tx).await,
            Command::Peers => self.list_peers(out).await,
            Command::Sessions => self.list_sessions(out).await,
            Command::Connect(n) => match n.checked_sub(1).and_then(|i| self.service.nearby().get(i)).map(|d| d.id) {
                Some(peer) => self.open(peer, out).await,
                None => say(out, &format!("! no peer #{n}; see /peers")).await,
            },
            Command::Open(peer) => self.open(peer, out).await,
            Command::Back => match self.service.set_active(None) {
                Ok(()) => say(out, "* back to conversations").await,
                Err(err) => say(out, &format!("! {err}")).await,
            },
            Command::Type => match self.service.active() {
                Some(peer) => {
                    self.service.keystroke(peer);
                    Ok(())
                },
                None => say(out, &format!("! {}", CoreError::NoActiveSession)).await,
            },
            Command::Say(text) => match self.service.send_to_active(&text) {
                Ok(_) => say(out, &format!("you: {text}")).await,
                Err(err) => say(out, &format!("! {err}")).await,
            },
        };
        result.map(|()| Flow::Continue)
    }

    async fn scan<W: AsyncWrite + Unpin>(
        &mut self,
        out: &mut W,
        scan_tx: &mpsc::UnboundedSender<ScanResult>,
    ) -> Result<(), NodeError> {
        if let Err(err) = self.service.scan_nearby() {
            return say(out, &format!("! {err}")).await;
        }
        if !self.scanning {
            self.scanning = true;
            let scanner = Arc::clone(&self.scanner);
            let tx = scan_tx.clone();
            tokio::spawn(async move {
                let _ = tx.send(scanner.scan().await);
            });
        }
        say(out, "* scanning...").await
    }

    async fn open<W: AsyncWrite + Unpin>(&mut self, peer: PeerId, out: &mut W) -> Result<(), NodeError> {
        if let Err(err) = self.service.connect(peer) {
            return say(out, &format!("! {err}")).await;
        }

        let Some(session) = self.service.session(peer) else {
            return Ok(());
        };
        let me = self.service.identity().id;
        let mut lines = vec![format!("* chatting with {}", session.peer_name)];
        let skip = session.messages.len().saturating_sub(HISTORY_LINES);
        for message in &session.messages[skip..] {
            let who = if message.sender_id == me { "you" } else { session.peer_name.as_str() };
            let mark = match message.status {
                DeliveryStatus::Sent if message.sender_id == me => " (sent)",
                DeliveryStatus::Delivered if message.sender_id == me => " (delivered)",
                DeliveryStatus::Read if message.sender_id == me => " (read)",
                _ => "",
            };
            lines.push(format!("{who}: {}{mark}", message.text));
        }
        say(out, &lines.join("\n")).await
    }

    async fn list_peers<W: AsyncWrite + Unpin>(&self, out: &mut W) -> Result<(), NodeError> {
        let nearby = self.service.nearby();
        if nearby.is_empty() {
            return say(out, "* no peers nearby; try /scan").await;
        }
        let lines: Vec<String> = nearby
            .iter()
            .enumerate()
            .map(|(i, d)| match d.signal_strength {
                Some(rssi) => format!("{:>3}. {} [{}] {rssi} dBm", i + 1, d.name, d.id),
                None => format!("{:>3}. {} [{}]", i + 1, d.name, d.id),
            })
            .collect();
        say(out, &lines.join("\n")).await
    }

    async fn list_sessions<W: AsyncWrite + Unpin>(&self, out: &mut W) -> Result<(), NodeError> {
        let sessions = self.service.sessions();
        if sessions.is_empty() {
            return say(out, "* no conversations yet").await;
        }
        let lines: Vec<String> = sessions
            .iter()
            .map(|s| {
                let unread = if s.unread_count > 0 { format!(" ({} unread)", s.unread_count) } else { String::new() };
                let last = s.last_message.as_deref().unwrap_or("");
                format!("  {} [{}]{unread}  {last}", s.peer_name, s.peer_id)
            })
            .collect();
        say(out, &lines.join("\n")).await
    }

    fn name_of(&self, peer: PeerId) -> String {
        self.service.session(peer).map_or_else(|| peer.to_string(), |s| s.peer_name.clone())
    }
}

async fn say<W: AsyncWrite + Unpin>(out: &mut W, line: &str) -> Result<(), NodeError> {
    out.write_all(line.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(())
}
