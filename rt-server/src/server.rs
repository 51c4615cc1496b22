use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use slog::{o, warn, Logger};

use rt_net::{Endpoint, NetEvent};
use rt_session::CredentialStore;
use rt_sim::Simulation;

use crate::config::GameConfig;
use crate::error::ServerError;

/// Binds the transport, spawns the I/O thread, and runs the fixed-timestep simulation loop on
/// the calling thread until `shutdown` is set. Returns once the I/O thread has joined.
///
/// `bound` is notified with the actual bound TCP/UDP addresses once the endpoint is listening
/// (useful for tests that bind to port 0); production callers can pass `None`.
pub fn run(
    config: GameConfig,
    log: Logger,
    shutdown: Arc<AtomicBool>,
    bound: Option<crossbeam_channel::Sender<(SocketAddr, SocketAddr)>>,
) -> Result<(), ServerError> {
    let tcp_addr: SocketAddr = config.server.tcp_address.parse()?;
    let udp_addr: SocketAddr = config.server.udp_address.parse()?;

    let (inbound_tx, inbound_rx) = crossbeam_channel::unbounded::<NetEvent>();
    let (outbound_tx, outbound_rx) = crossbeam_channel::unbounded();

    let io_log = log.new(o!("thread" => "io"));
    let endpoint = Endpoint::bind(tcp_addr, udp_addr, io_log.clone())?;
    if let Some(tx) = bound {
        let _ = tx.send((endpoint.tcp_local_addr()?, endpoint.udp_local_addr()?));
    }
    let mut endpoint = endpoint;

    let io_shutdown = shutdown.clone();
    let io_thread = thread::spawn(move || {
        while !io_shutdown.load(Ordering::Relaxed) {
            match endpoint.service(Some(Duration::from_millis(5))) {
                Ok(events) => {
                    for event in events {
                        let _ = inbound_tx.send(event);
                    }
                }
                Err(e) => warn!(io_log, "endpoint poll failed"; "error" => %e),
            }

            while let Ok(outbound) = outbound_rx.try_recv() {
                if let Err(e) = endpoint.apply(outbound) {
                    warn!(io_log, "failed to apply outbound packet"; "error" => %e);
                }
            }
        }
    });

    let credentials = CredentialStore::new(&config.game.credentials_path);
    let mut simulation = Simulation::new(credentials, outbound_tx, log.new(o!("thread" => "sim")));
    let tick_interval = config.tick_interval();

    while !shutdown.load(Ordering::Relaxed) {
        let tick_start = Instant::now();

        while let Ok(event) = inbound_rx.try_recv() {
            simulation.handle_event(event);
        }
        simulation.tick(tick_interval.as_secs_f32());

        let elapsed = tick_start.elapsed();
        if elapsed < tick_interval {
            thread::sleep(tick_interval - elapsed);
        }
    }

    io_thread.join().expect("io thread panicked");
    Ok(())
}
