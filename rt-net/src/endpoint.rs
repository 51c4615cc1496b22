use std::io::{ErrorKind as IoErrorKind, Read, Write};
use std::net::SocketAddr;
use std::time::Duration;

use byteorder::{BigEndian, ByteOrder};
use indexmap::IndexSet;
use mio::net::{TcpListener, TcpStream, UdpSocket};
use mio::{Events, Interest, Poll, Token};
use rt_proto::Packet;
use slog::{debug, o, warn, Logger};

use crate::error::{ErrorKind, NetworkError};
use crate::link::Link;

const LISTENER_TOKEN: Token = Token(0);
const UDP_TOKEN: Token = Token(1);
const TOKEN_OFFSET: usize = 2;

const MAX_FRAME_SIZE: usize = 4 * 1024 * 1024;
/// Sized well above the largest UDP payload a single IPv4 datagram can carry (65 507 bytes), so a
/// `recv_from` into this buffer never silently truncates; it only ever holds a whole datagram.
const UDP_RECV_BUF: usize = 4 * 1024 * 1024;

pub type SessionId = u32;

/// Which transport a packet arrived on, or should be sent on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Stream,
    Datagram,
}

/// Something the simulation layer needs to react to: a new reliable connection, a loss of one,
/// or a fully-framed packet (from either transport) ready for dispatch.
#[derive(Debug)]
pub enum NetEvent {
    Connected(SessionId),
    Disconnected(SessionId),
    Packet(SessionId, Packet, Channel),
}

/// A write the simulation thread hands back to the I/O thread, which owns every socket.
#[derive(Debug)]
pub enum Outbound {
    Send(SessionId, Packet, Channel),
    Close(SessionId),
}

/// Outcome of trying to pull one frame out of a link's read buffer.
enum FrameResult {
    Frame(Vec<u8>),
    Incomplete,
    /// The length prefix exceeds [`MAX_FRAME_SIZE`]; the session must be closed.
    Violation(usize),
}

fn tcp_token(id: SessionId) -> Token {
    Token(TOKEN_OFFSET + id as usize)
}

fn session_of(token: Token) -> Option<SessionId> {
    token.0.checked_sub(TOKEN_OFFSET).map(|i| i as SessionId)
}

/// Owns the listening TCP socket, the one shared UDP socket, and every live connection's state.
/// Runs entirely on one thread: `service` never blocks beyond its poll timeout.
pub struct Endpoint {
    poll: Poll,
    events: Events,
    listener: TcpListener,
    udp: UdpSocket,
    links: Vec<Option<Link>>,
    free: Vec<SessionId>,
    live: IndexSet<SessionId>,
    udp_buf: Vec<u8>,
    log: Logger,
}

impl Endpoint {
    pub fn bind(tcp_addr: SocketAddr, udp_addr: SocketAddr, log: Logger) -> Result<Endpoint, NetworkError> {
        let mut listener = TcpListener::bind(tcp_addr).map_err(ErrorKind::SocketBindFailed)?;
        let mut udp = UdpSocket::bind(udp_addr).map_err(ErrorKind::SocketBindFailed)?;

        let poll = Poll::new().map_err(ErrorKind::Io)?;
        poll.registry()
            .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)
            .map_err(ErrorKind::Io)?;
        poll.registry()
            .register(&mut udp, UDP_TOKEN, Interest::READABLE)
            .map_err(ErrorKind::Io)?;

        Ok(Endpoint {
            poll,
            events: Events::with_capacity(256),
            listener,
            udp,
            links: Vec::new(),
            free: Vec::new(),
            live: IndexSet::new(),
            udp_buf: vec![0u8; UDP_RECV_BUF],
            log: log.new(o!("component" => "rt-net::endpoint")),
        })
    }

    /// The TCP listener's bound address; useful when binding to port 0 for tests.
    pub fn tcp_local_addr(&self) -> Result<SocketAddr, NetworkError> {
        self.listener.local_addr().map_err(ErrorKind::Io).map_err(NetworkError::Fatal)
    }

    /// The UDP socket's bound address; useful when binding to port 0 for tests.
    pub fn udp_local_addr(&self) -> Result<SocketAddr, NetworkError> {
        self.udp.local_addr().map_err(ErrorKind::Io).map_err(NetworkError::Fatal)
    }

    fn allocate_slot(&mut self) -> SessionId {
        if let Some(id) = self.free.pop() {
            id
        } else {
            let id = self.links.len() as SessionId;
            self.links.push(None);
            id
        }
    }

    /// Polls for readiness, drains every ready source until it would block, and returns the
    /// events accumulated along the way. `timeout` bounds how long this call may block.
    pub fn service(&mut self, timeout: Option<Duration>) -> Result<Vec<NetEvent>, NetworkError> {
        self.poll.poll(&mut self.events, timeout).map_err(ErrorKind::Io)?;
        let mut out = Vec::new();

        let tokens: Vec<Token> = self.events.iter().map(|e| e.token()).collect();
        for token in tokens {
            match token {
                LISTENER_TOKEN => self.accept_all(&mut out)?,
                UDP_TOKEN => self.drain_udp(&mut out),
                other => {
                    if let Some(id) = session_of(other) {
                        self.drain_tcp(id, &mut out);
                    }
                }
            }
        }

        Ok(out)
    }

    fn accept_all(&mut self, out: &mut Vec<NetEvent>) -> Result<(), NetworkError> {
        loop {
            match self.listener.accept() {
                Ok((mut stream, addr)) => {
                    let id = self.allocate_slot();
                    if let Err(e) = self.poll.registry().register(&mut stream, tcp_token(id), Interest::READABLE) {
                        warn!(self.log, "failed to register accepted stream"; "error" => %e);
                        self.free.push(id);
                        continue;
                    }
                    self.links[id as usize] = Some(Link::new(stream, addr.ip()));
                    self.live.insert(id);
                    debug!(self.log, "accepted connection"; "session" => id, "addr" => %addr);
                    out.push(NetEvent::Connected(id));
                }
                Err(e) if e.kind() == IoErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(NetworkError::Fatal(ErrorKind::SocketAcceptFailed(e))),
            }
        }
    }

    fn drain_udp(&mut self, out: &mut Vec<NetEvent>) {
        loop {
            match self.udp.recv_from(&mut self.udp_buf) {
                Ok((n, from)) => {
                    if let Some(id) = self.bind_udp_peer_if_unset(from) {
                        match Packet::deserialize(&self.udp_buf[..n]) {
                            Ok(packet) => out.push(NetEvent::Packet(id, packet, Channel::Datagram)),
                            Err(e) => warn!(self.log, "dropping malformed datagram"; "session" => id, "error" => %e),
                        }
                    }
                }
                Err(e) if e.kind() == IoErrorKind::WouldBlock => return,
                Err(e) => {
                    warn!(self.log, "udp recv failed"; "error" => %e);
                    return;
                }
            }
        }
    }

    /// Finds the session whose TCP peer IP matches `from`'s and, if it has no UDP peer bound
    /// yet, binds it. Datagrams from unrecognized sources are dropped.
    fn bind_udp_peer_if_unset(&mut self, from: SocketAddr) -> Option<SessionId> {
        for &id in self.live.iter() {
            if let Some(link) = &mut self.links[id as usize] {
                if link.udp_peer == Some(from) {
                    return Some(id);
                }
            }
        }
        for &id in self.live.iter() {
            if let Some(link) = &mut self.links[id as usize] {
                if link.udp_peer.is_none() && link.peer_ip == from.ip() {
                    link.udp_peer = Some(from);
                    return Some(id);
                }
            }
        }
        None
    }

    fn drain_tcp(&mut self, id: SessionId, out: &mut Vec<NetEvent>) {
        let mut disconnect = false;
        if let Some(link) = self.links.get_mut(id as usize).and_then(|l| l.as_mut()) {
            loop {
                let mut chunk = [0u8; 4096];
                match link.stream.read(&mut chunk) {
                    Ok(0) => {
                        disconnect = true;
                        break;
                    }
                    Ok(n) => link.read_buf.extend_from_slice(&chunk[..n]),
                    Err(e) if e.kind() == IoErrorKind::WouldBlock => break,
                    Err(_) => {
                        disconnect = true;
                        break;
                    }
                }
            }
        }

        loop {
            match self.take_frame(id) {
                FrameResult::Frame(frame) => match Packet::deserialize(&frame) {
                    Ok(packet) => out.push(NetEvent::Packet(id, packet, Channel::Stream)),
                    Err(e) => warn!(self.log, "dropping malformed tcp frame"; "session" => id, "error" => %e),
                },
                FrameResult::Incomplete => break,
                FrameResult::Violation(len) => {
                    warn!(self.log, "closing session: frame length exceeds the protocol limit";
                        "session" => id, "len" => len, "limit" => MAX_FRAME_SIZE);
                    disconnect = true;
                    break;
                }
            }
        }

        if disconnect {
            self.close(id);
            out.push(NetEvent::Disconnected(id));
        }
    }

    /// Pulls one length-prefixed frame (4-byte big-endian length, then body) out of a link's
    /// read buffer. A length prefix over [`MAX_FRAME_SIZE`] is a protocol violation: the caller
    /// must close the session rather than wait for more bytes that will never complete a frame.
    fn take_frame(&mut self, id: SessionId) -> FrameResult {
        let Some(link) = self.links.get_mut(id as usize).and_then(|l| l.as_mut()) else {
            return FrameResult::Incomplete;
        };
        if link.read_buf.len() < 4 {
            return FrameResult::Incomplete;
        }
        let len = BigEndian::read_u32(&link.read_buf[0..4]) as usize;
        if len > MAX_FRAME_SIZE {
            return FrameResult::Violation(len);
        }
        if link.read_buf.len() < 4 + len {
            return FrameResult::Incomplete;
        }
        let frame = link.read_buf[4..4 + len].to_vec();
        link.read_buf.drain(0..4 + len);
        FrameResult::Frame(frame)
    }

    /// Queues `packet` on the reliable (TCP) channel, length-prefixed. Write happens inline;
    /// a `WouldBlock` leaves the remainder buffered for the next writable event.
    pub fn send_reliable(&mut self, id: SessionId, packet: &Packet) -> Result<(), NetworkError> {
        let link = self
            .links
            .get_mut(id as usize)
            .and_then(|l| l.as_mut())
            .ok_or(NetworkError::Fatal(ErrorKind::SessionNotFound(id)))?;

        let body = packet.serialize();
        let mut framed = Vec::with_capacity(4 + body.len());
        framed.extend_from_slice(&(body.len() as u32).to_be_bytes());
        framed.extend_from_slice(&body);
        link.write_buf.extend(framed);

        Self::flush_link(link);
        Ok(())
    }

    fn flush_link(link: &mut Link) {
        while !link.write_buf.is_empty() {
            let contiguous = link.write_buf.make_contiguous();
            match link.stream.write(contiguous) {
                Ok(0) => break,
                Ok(n) => {
                    link.write_buf.drain(0..n);
                }
                Err(e) if e.kind() == IoErrorKind::WouldBlock => break,
                Err(_) => break,
            }
        }
    }

    /// Sends `packet` over UDP to the session's bound peer. Silently dropped if no datagram has
    /// been received from that peer yet (unreliable channel: no retransmission, no queuing).
    pub fn send_unreliable(&mut self, id: SessionId, packet: &Packet) -> Result<(), NetworkError> {
        let link = self
            .links
            .get(id as usize)
            .and_then(|l| l.as_ref())
            .ok_or(NetworkError::Fatal(ErrorKind::SessionNotFound(id)))?;

        let Some(peer) = link.udp_peer else {
            return Ok(());
        };
        let body = packet.serialize();
        match self.udp.send_to(&body, peer) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(NetworkError::Fatal(ErrorKind::Io(e))),
        }
    }

    pub fn close(&mut self, id: SessionId) {
        if let Some(mut link) = self.links.get_mut(id as usize).and_then(|l| l.take()) {
            let _ = self.poll.registry().deregister(&mut link.stream);
        }
        self.live.shift_remove(&id);
        self.free.push(id);
    }

    /// Applies one outbound instruction from the simulation thread.
    pub fn apply(&mut self, outbound: Outbound) -> Result<(), NetworkError> {
        match outbound {
            Outbound::Send(id, packet, Channel::Stream) => self.send_reliable(id, &packet),
            Outbound::Send(id, packet, Channel::Datagram) => self.send_unreliable(id, &packet),
            Outbound::Close(id) => {
                self.close(id);
                Ok(())
            }
        }
    }
}
