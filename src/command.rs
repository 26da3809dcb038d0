//! Commands posted from other threads to the render thread.
//!
//! GPU objects never leave the render thread. Producers such as the
//! interactive shell push [`Command`]s onto a bounded queue; the viewer
//! drains it once per frame and answers each command on a one-shot reply
//! channel.

use std::sync::Arc;

use crossbeam_channel as xchan;
use parking_lot::RwLock;
use thiserror::Error;

use crate::colormap::Colormap;
use crate::image::{ConfigDelta, Origin};
use crate::shader::Interpolation;

/// Outcome reported back to the sender.
pub type Reply = std::result::Result<String, String>;

type Waker = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone)]
pub enum Command {
    Configure { panel: String, delta: ConfigDelta },
    /// Sets both bounds at once; `None` means auto.
    SetRange {
        panel: String,
        vmin: Option<f32>,
        vmax: Option<f32>,
    },
    Update { panel: String },
    Redraw,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("command queue is closed")]
    Closed,
    #[error("render thread dropped the command without replying")]
    NoReply,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ParseError(String);

fn bad(msg: impl Into<String>) -> ParseError {
    ParseError(msg.into())
}

struct Envelope {
    command: Command,
    reply: Option<xchan::Sender<Reply>>,
}

pub struct CommandQueue;

impl CommandQueue {
    pub fn bounded(capacity: usize) -> (CommandSender, CommandReceiver) {
        let (tx, rx) = xchan::bounded(capacity.max(1));
        let waker = Arc::new(RwLock::new(None));
        (
            CommandSender {
                tx,
                waker: Arc::clone(&waker),
            },
            CommandReceiver { rx, waker },
        )
    }
}

#[derive(Clone)]
pub struct CommandSender {
    tx: xchan::Sender<Envelope>,
    waker: Arc<RwLock<Option<Waker>>>,
}

impl CommandSender {
    fn push(&self, envelope: Envelope) -> Result<(), QueueError> {
        self.tx.send(envelope).map_err(|_| QueueError::Closed)?;
        if let Some(wake) = self.waker.read().as_ref() {
            wake();
        }
        Ok(())
    }

    /// Enqueues without waiting for the render thread.
    pub fn post(&self, command: Command) -> Result<(), QueueError> {
        self.push(Envelope {
            command,
            reply: None,
        })
    }

    /// Enqueues and blocks until the render thread has handled the command.
    pub fn send(&self, command: Command) -> Result<Reply, QueueError> {
        let (reply_tx, reply_rx) = xchan::bounded(1);
        self.push(Envelope {
            command,
            reply: Some(reply_tx),
        })?;
        reply_rx.recv().map_err(|_| QueueError::NoReply)
    }
}

pub struct CommandReceiver {
    rx: xchan::Receiver<Envelope>,
    waker: Arc<RwLock<Option<Waker>>>,
}

impl CommandReceiver {
    /// Called after every enqueue, typically to wake the event loop.
    pub fn set_waker(&self, wake: impl Fn() + Send + Sync + 'static) {
        *self.waker.write() = Some(Arc::new(wake));
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Handles at most `max` queued commands and returns how many ran.
    pub fn drain(&self, max: usize, mut handler: impl FnMut(Command) -> Reply) -> usize {
        let mut handled = 0;
        while handled < max {
            let Ok(envelope) = self.rx.try_recv() else {
                break;
            };
            let reply = handler(envelope.command);
            if let Some(tx) = envelope.reply {
                // Fire-and-forget senders may already be gone.
                let _ = tx.send(reply);
            }
            handled += 1;
        }
        handled
    }
}

impl Command {
    /// Parses one shell line, resolving colormaps among the built-ins.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        Self::parse_with(line, |name| Colormap::by_name(name).map(Arc::new))
    }

    /// Parses one shell line with a custom colormap resolver.
    pub fn parse_with(
        line: &str,
        colormap: impl Fn(&str) -> Option<Arc<Colormap>>,
    ) -> Result<Self, ParseError> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&verb, args)) = words.split_first() else {
            return Err(bad("empty command"));
        };
        match (verb, args) {
            ("quit" | "exit", []) => Ok(Command::Quit),
            ("redraw", []) => Ok(Command::Redraw),
            ("update", [panel]) => Ok(Command::Update {
                panel: panel.to_string(),
            }),
            ("set", [panel, bound, value]) => {
                let value = parse_bound(value)?;
                let mut delta = ConfigDelta::default();
                match *bound {
                    "vmin" => delta.vmin = Some(value),
                    "vmax" => delta.vmax = Some(value),
                    other => return Err(bad(format!("unknown bound `{other}`"))),
                }
                Ok(configure(panel, delta))
            }
            ("range", [panel, vmin, vmax]) => Ok(Command::SetRange {
                panel: panel.to_string(),
                vmin: parse_bound(vmin)?,
                vmax: parse_bound(vmax)?,
            }),
            ("interp", [panel, mode]) => {
                let mode: Interpolation = mode.parse().map_err(bad)?;
                Ok(configure(
                    panel,
                    ConfigDelta {
                        interpolation: Some(mode),
                        ..Default::default()
                    },
                ))
            }
            ("cmap", [panel, name]) => {
                let map = if name.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(colormap(name).ok_or_else(|| bad(format!("unknown colormap `{name}`")))?)
                };
                Ok(configure(
                    panel,
                    ConfigDelta {
                        colormap: Some(map),
                        ..Default::default()
                    },
                ))
            }
            ("grid", [panel, x, y, z]) => Ok(configure(
                panel,
                ConfigDelta {
                    gridsize: Some([parse_f32(x)?, parse_f32(y)?, parse_f32(z)?]),
                    ..Default::default()
                },
            )),
            ("light", [panel, state]) => {
                let on = match *state {
                    "on" => true,
                    "off" => false,
                    other => return Err(bad(format!("expected on|off, got `{other}`"))),
                };
                Ok(configure(
                    panel,
                    ConfigDelta {
                        lighted: Some(on),
                        ..Default::default()
                    },
                ))
            }
            ("elevation", [panel, value]) => Ok(configure(
                panel,
                ConfigDelta {
                    elevation: Some(parse_f32(value)?),
                    ..Default::default()
                },
            )),
            ("origin", [panel, origin]) => {
                let origin: Origin = origin.parse().map_err(bad)?;
                Ok(configure(
                    panel,
                    ConfigDelta {
                        origin: Some(origin),
                        ..Default::default()
                    },
                ))
            }
            _ => Err(bad(format!("cannot parse `{}`", line.trim()))),
        }
    }
}

fn configure(panel: &str, delta: ConfigDelta) -> Command {
    Command::Configure {
        panel: panel.to_string(),
        delta,
    }
}

fn parse_f32(word: &str) -> Result<f32, ParseError> {
    word.parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| bad(format!("`{word}` is not a number")))
}

fn parse_bound(word: &str) -> Result<Option<f32>, ParseError> {
    if word.eq_ignore_ascii_case("auto") {
        Ok(None)
    } else {
        parse_f32(word).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_auto_clears_bound() {
        let Command::Configure { panel, delta } = Command::parse("set left vmin auto").unwrap()
        else {
            panic!("expected configure");
        };
        assert_eq!(panel, "left");
        assert_eq!(delta.vmin, Some(None));
        assert!(delta.vmax.is_none());
    }

    #[test]
    fn unknown_colormap_is_rejected() {
        assert!(Command::parse("cmap left viridis").is_err());
        assert!(Command::parse("cmap left none").is_ok());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(Command::parse("").is_err());
        assert!(Command::parse("grid left 1 2").is_err());
        assert!(Command::parse("elevation left NaN").is_err());
    }

    #[test]
    fn drain_respects_limit() {
        let (tx, rx) = CommandQueue::bounded(8);
        for _ in 0..3 {
            tx.post(Command::Redraw).unwrap();
        }
        assert_eq!(rx.drain(2, |_| Ok(String::new())), 2);
        assert_eq!(rx.drain(10, |_| Ok(String::new())), 1);
        assert!(rx.is_empty());
    }
}
