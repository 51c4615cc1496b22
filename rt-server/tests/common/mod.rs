use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rt_proto::{OpCode, Packet, Payload};
use rt_server::config::GameConfig;

/// A running `rt-server` bound to ephemeral ports, plus the handle needed to stop it.
pub struct TestServer {
    pub tcp_addr: SocketAddr,
    pub udp_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    pub fn spawn() -> TestServer {
        Self::spawn_with_credentials(temp_credentials_path())
    }

    pub fn spawn_with_credentials(credentials_path: std::path::PathBuf) -> TestServer {
        let mut config = GameConfig::default();
        config.server.tcp_address = "127.0.0.1:0".to_string();
        config.server.udp_address = "127.0.0.1:0".to_string();
        config.game.credentials_path = credentials_path.display().to_string();

        let log = rt_server::logging::init("error");
        let shutdown = Arc::new(AtomicBool::new(false));
        let run_shutdown = shutdown.clone();

        let (bound_tx, bound_rx) = crossbeam_channel::bounded(1);
        let handle = thread::spawn(move || {
            rt_server::server::run(config, log, run_shutdown, Some(bound_tx)).expect("server run failed");
        });

        let (tcp_addr, udp_addr) =
            bound_rx.recv_timeout(Duration::from_secs(2)).expect("server never reported its bound address");

        TestServer { tcp_addr, udp_addr, shutdown, handle: Some(handle) }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

fn temp_credentials_path() -> std::path::PathBuf {
    static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("rt-server-test-creds-{}-{}-{}.txt", std::process::id(), n, now_nanos()))
}

fn now_nanos() -> u128 {
    Instant::now().elapsed().as_nanos()
}

/// A loopback client speaking the TCP framing (4-byte BE length prefix + packet body) and raw
/// UDP datagrams (one packet per datagram), matching `rt_net::Endpoint`'s wire format.
pub struct TestClient {
    tcp: TcpStream,
    udp: UdpSocket,
    server_udp_addr: SocketAddr,
}

impl TestClient {
    pub fn connect(server: &TestServer) -> TestClient {
        let tcp = TcpStream::connect(server.tcp_addr).expect("tcp connect failed");
        tcp.set_nodelay(true).unwrap();
        tcp.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

        let udp = UdpSocket::bind("127.0.0.1:0").expect("udp bind failed");
        udp.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

        TestClient { tcp, udp, server_udp_addr: server.udp_addr }
    }

    pub fn send_tcp(&mut self, packet: &Packet) {
        let body = packet.serialize();
        let mut framed = Vec::with_capacity(4 + body.len());
        framed.extend_from_slice(&(body.len() as u32).to_be_bytes());
        framed.extend_from_slice(&body);
        self.tcp.write_all(&framed).expect("tcp write failed");
    }

    pub fn recv_tcp(&mut self) -> Packet {
        let mut len_buf = [0u8; 4];
        self.tcp.read_exact(&mut len_buf).expect("tcp read (length) failed");
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut body = vec![0u8; len];
        self.tcp.read_exact(&mut body).expect("tcp read (body) failed");
        Packet::deserialize(&body).expect("malformed tcp frame")
    }

    /// Reads TCP frames until one with the given opcode arrives, discarding the rest. Useful when
    /// a broadcast (e.g. a room snapshot) can interleave with the reply being waited on.
    pub fn recv_tcp_matching(&mut self, op: OpCode) -> Packet {
        loop {
            let packet = self.recv_tcp();
            if packet.header.op_code == op {
                return packet;
            }
        }
    }

    pub fn send_udp(&self, packet: &Packet) {
        self.udp.send_to(&packet.serialize(), self.server_udp_addr).expect("udp send failed");
    }

    pub fn recv_udp(&self) -> Packet {
        let mut buf = [0u8; 1500];
        let (n, _) = self.udp.recv_from(&mut buf).expect("udp recv failed");
        Packet::deserialize(&buf[..n]).expect("malformed udp datagram")
    }

    /// Sends a `Ping` over UDP and waits for the `Pong`, which is what binds this socket's address
    /// to the session on the server side (see `Endpoint::bind_udp_peer_if_unset`).
    pub fn bind_udp(&mut self) {
        let mut packet = Packet::new(OpCode::Ping);
        rt_proto::PingPayload { client_time_ms: 0 }.encode(&mut packet).unwrap();
        self.send_udp(&packet);
        let _ = self.recv_udp();
    }
}

pub fn packet_with<P: Payload>(op: OpCode, payload: P) -> Packet {
    let mut packet = Packet::new(op);
    payload.encode(&mut packet).expect("encode failed");
    packet
}
