use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};

use mio::net::TcpStream;

pub(crate) const READ_BUF_SIZE: usize = 64 * 1024;

/// A live reliable-channel connection. Sockets carry no application-level timeout — a link lives
/// until its TCP stream disconnects at the OS level or the simulation layer closes it.
pub(crate) struct Link {
    pub stream: TcpStream,
    pub peer_ip: IpAddr,
    pub read_buf: Vec<u8>,
    pub write_buf: VecDeque<u8>,
    /// Learned the first time a UDP datagram arrives from a matching source IP.
    pub udp_peer: Option<SocketAddr>,
}

impl Link {
    pub fn new(stream: TcpStream, peer_ip: IpAddr) -> Link {
        Link { stream, peer_ip, read_buf: Vec::with_capacity(READ_BUF_SIZE), write_buf: VecDeque::new(), udp_peer: None }
    }
}
