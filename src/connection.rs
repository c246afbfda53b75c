//! Channel to a launched application.
//!
//! The transport itself lives outside this crate; a handle only needs to send
//! control messages and to close the channel when it is disposed.

use std::io::{self, Write};

use crate::protocol::Message;

/// Control channel owned by exactly one [`AppHandle`](crate::AppHandle).
pub trait Connection: Send {
    /// Send a control message.
    fn send(&mut self, message: &Message) -> io::Result<()>;

    /// Close the channel. Called at most once, by the owning handle.
    fn close(&mut self) -> io::Result<()>;
}

/// Connection writing JSON lines to any byte sink (socket, pipe, buffer).
#[derive(Debug)]
pub struct WriterConnection<W> {
    writer: Option<W>,
}

impl<W: Write + Send> WriterConnection<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }
}

impl<W: Write + Send> Connection for WriterConnection<W> {
    fn send(&mut self, message: &Message) -> io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection closed"))?;
        let line = message
            .to_json_line()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writer.write_all(line.as_bytes())?;
        writer.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        match self.writer.take() {
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        }
    }
}
