//! Operator console input
//!
//! A reader thread splits stdin into lines and forwards them to the
//! executor. The console task reads them through [`ChannelLineSource`],
//! which suspends while no line is pending.

use std::convert::Infallible;
use std::io::{self, BufRead};
use std::thread;

use embassy_futures::block_on;

use valverig_hal::{Line, LineSource, MAX_LINE_LEN};

use crate::channels::ConsoleChannel;

/// Trim the terminator and cap a raw line to [`MAX_LINE_LEN`] bytes
pub fn to_line(raw: &str) -> Line {
    let mut line = Line::new();
    for c in raw.trim_end_matches(['\r', '\n']).chars() {
        if line.push(c).is_err() {
            break;
        }
    }
    line
}

/// Forward every line of `input` into `channel`, then signal end of input
pub fn forward_lines<R: BufRead>(input: R, channel: &ConsoleChannel) {
    for raw in input.lines() {
        match raw {
            Ok(raw) => {
                if raw.len() > MAX_LINE_LEN {
                    log::warn!("console line longer than {} bytes truncated", MAX_LINE_LEN);
                }
                block_on(channel.send(Some(to_line(&raw))));
            }
            Err(e) => {
                log::warn!("console read failed: {}", e);
                break;
            }
        }
    }
    block_on(channel.send(None));
}

/// Start the stdin reader thread
pub fn spawn_stdin_reader(channel: &'static ConsoleChannel) -> io::Result<()> {
    thread::Builder::new()
        .name("console".into())
        .spawn(move || forward_lines(io::stdin().lock(), channel))?;
    Ok(())
}

/// [`LineSource`] fed by the console channel
pub struct ChannelLineSource {
    channel: &'static ConsoleChannel,
    closed: bool,
}

impl ChannelLineSource {
    /// Read from `channel`
    pub fn new(channel: &'static ConsoleChannel) -> Self {
        Self {
            channel,
            closed: false,
        }
    }
}

impl LineSource for ChannelLineSource {
    type Error = Infallible;

    async fn read_line(&mut self) -> Result<Option<Line>, Self::Error> {
        if self.closed {
            return Ok(None);
        }
        let line = self.channel.receive().await;
        self.closed = line.is_none();
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::channel::Channel;
    use static_cell::StaticCell;

    #[test]
    fn test_to_line_strips_terminator_and_caps_length() {
        assert_eq!(to_line("42\r\n").as_str(), "42");
        let long = "x".repeat(MAX_LINE_LEN + 10);
        assert_eq!(to_line(&long).len(), MAX_LINE_LEN);
    }

    #[test]
    fn test_lines_then_end_of_input() {
        static CHANNEL: StaticCell<ConsoleChannel> = StaticCell::new();
        let channel: &'static ConsoleChannel = CHANNEL.init(Channel::new());

        forward_lines(&b"50\nq\n"[..], channel);

        let mut source = ChannelLineSource::new(channel);
        block_on(async {
            assert_eq!(source.read_line().await.unwrap().as_deref(), Some("50"));
            assert_eq!(source.read_line().await.unwrap().as_deref(), Some("q"));
            assert_eq!(source.read_line().await.unwrap(), None);
            // Stays closed without touching the channel again
            assert_eq!(source.read_line().await.unwrap(), None);
        });
    }
}
