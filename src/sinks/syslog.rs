//! Syslog sink
//!
//! Sends RFC 3164 style frames (`<PRI>TAG: message`) with facility LOCAL0
//! to the local syslog socket or to a remote daemon over UDP or TCP.

use crate::core::{
    AppendEvent, Formatter, FormatterSlot, Level, LoggerError, MessageFormatter, Result, Sink,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs, UdpSocket};
#[cfg(unix)]
use std::os::unix::net::UnixDatagram;
use std::sync::Arc;
use std::time::Duration;

/// Facility LOCAL0
pub const FACILITY_LOCAL0: u8 = 16;

/// Sockets tried, in order, by [`SyslogSink::local`]
#[cfg(unix)]
pub const LOCAL_SOCKETS: [&str; 3] = ["/dev/log", "/var/run/syslog", "/var/run/log"];

const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Syslog severities, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Severity {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Info = 6,
    Debug = 7,
}

/// TRACE and DEBUG map to debug, INFO to info, WARN to warning, ERROR to
/// err and CRITICAL to crit.
pub fn default_level_map() -> HashMap<Level, Severity> {
    HashMap::from([
        (Level::Trace, Severity::Debug),
        (Level::Debug, Severity::Debug),
        (Level::Info, Severity::Info),
        (Level::Warn, Severity::Warning),
        (Level::Error, Severity::Error),
        (Level::Critical, Severity::Critical),
    ])
}

enum Transport {
    #[cfg(unix)]
    Unix(UnixDatagram),
    Udp(UdpSocket),
    Tcp { address: String, stream: Option<TcpStream> },
}

impl Transport {
    fn connect_tcp(address: &str) -> std::io::Result<TcpStream> {
        let stream = TcpStream::connect(address)?;
        stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn send(&mut self, frame: &[u8]) -> std::io::Result<()> {
        match self {
            #[cfg(unix)]
            Transport::Unix(socket) => socket.send(frame).map(|_| ()),
            Transport::Udp(socket) => socket.send(frame).map(|_| ()),
            Transport::Tcp { address, stream } => {
                // Octet stream framing: one frame per line
                let mut line = Vec::with_capacity(frame.len() + 1);
                line.extend_from_slice(frame);
                line.push(b'\n');

                if let Some(connected) = stream.as_mut() {
                    if connected.write_all(&line).is_ok() {
                        return Ok(());
                    }
                }
                // Connection lost; reconnect once and resend
                *stream = None;
                let mut fresh = Self::connect_tcp(address)?;
                fresh.write_all(&line)?;
                *stream = Some(fresh);
                Ok(())
            }
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Transport::Tcp {
                stream: Some(stream),
                ..
            } => stream.flush(),
            _ => Ok(()),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            #[cfg(unix)]
            Transport::Unix(_) => "unix",
            Transport::Udp(_) => "udp",
            Transport::Tcp { .. } => "tcp",
        }
    }
}

/// Writes each event to syslog at the severity its level maps to.
///
/// The default formatter is [`MessageFormatter`], since the daemon adds
/// its own timestamp and host.
///
/// ```no_run
/// use hierlog::sinks::SyslogSink;
///
/// let sink = SyslogSink::udp("127.0.0.1:514", "myapp")?;
/// # Ok::<(), hierlog::LoggerError>(())
/// ```
pub struct SyslogSink {
    tag: String,
    transport: Mutex<Transport>,
    level_map: HashMap<Level, Severity>,
    formatter: FormatterSlot,
}

impl SyslogSink {
    fn with_transport(transport: Transport, tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            transport: Mutex::new(transport),
            level_map: default_level_map(),
            formatter: FormatterSlot::new(Arc::new(MessageFormatter)),
        }
    }

    /// Connects to the local syslog daemon's datagram socket.
    #[cfg(unix)]
    pub fn local(tag: &str) -> Result<Self> {
        let socket = UnixDatagram::unbound()?;
        let mut last_error = None;
        for path in LOCAL_SOCKETS {
            match socket.connect(path) {
                Ok(()) => return Ok(Self::with_transport(Transport::Unix(socket), tag)),
                Err(e) => last_error = Some(e),
            }
        }
        let message = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no local syslog socket".to_string());
        Err(LoggerError::sink("syslog", message))
    }

    pub fn udp(address: impl ToSocketAddrs, tag: &str) -> Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        socket.connect(address)?;
        Ok(Self::with_transport(Transport::Udp(socket), tag))
    }

    pub fn tcp(address: &str, tag: &str) -> Result<Self> {
        let stream = Transport::connect_tcp(address).map_err(|e| {
            LoggerError::io_operation("connecting to syslog", format!("{}: {}", address, e), e)
        })?;
        let transport = Transport::Tcp {
            address: address.to_string(),
            stream: Some(stream),
        };
        Ok(Self::with_transport(transport, tag))
    }

    /// Replaces the level to severity map. Levels missing from `map` are
    /// sent at [`Severity::Info`].
    #[must_use]
    pub fn with_level_map(mut self, map: HashMap<Level, Severity>) -> Self {
        self.level_map = map;
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn severity_for(&self, level: Level) -> Severity {
        self.level_map.get(&level).copied().unwrap_or(Severity::Info)
    }

    fn frame(&self, event: &AppendEvent<'_>) -> String {
        let priority = FACILITY_LOCAL0 * 8 + self.severity_for(event.level) as u8;
        let message = event.text.trim_end_matches(['\r', '\n']);
        format!("<{}>{}: {}", priority, self.tag, message)
    }
}

impl Sink for SyslogSink {
    fn append(&self, event: &AppendEvent<'_>) -> Result<()> {
        let frame = self.frame(event);
        let mut transport = self.transport.lock();
        transport.send(frame.as_bytes()).map_err(|e| {
            LoggerError::io_operation(
                format!("sending to syslog over {}", transport.kind()),
                e.to_string(),
                e,
            )
        })
    }

    fn formatter(&self) -> Arc<dyn Formatter> {
        self.formatter.get()
    }

    fn set_formatter(&self, formatter: Arc<dyn Formatter>) {
        self.formatter.set(formatter);
    }

    fn flush(&self) -> Result<()> {
        self.transport.lock().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "syslog"
    }
}

impl fmt::Debug for SyslogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyslogSink")
            .field("tag", &self.tag)
            .field("transport", &self.transport.lock().kind())
            .finish()
    }
}
