//! Lifecycle object for the SSH tunnel to the monitoring gateway.
//!
//! Owned by the service, created once at startup and torn down at
//! shutdown, so the Monitoring Adapter itself stays unit-testable against
//! a plain `local_port`.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ssh2::Session;
use tracing::{debug, error, info};

use crate::executor::SshCredential;

/// A persistent local TCP forward to a remote `host:port`, established
/// over SSH and held open for the process lifetime.
pub struct MonitoringTunnel {
    local_port: u16,
    stop: Arc<AtomicBool>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl MonitoringTunnel {
    /// Open the tunnel: connects to `gateway`, authenticates, binds an
    /// ephemeral local port, and starts forwarding every accepted
    /// connection to `remote_host:remote_port` on the far side.
    pub fn open(
        gateway: std::net::SocketAddr,
        user: &str,
        credential: &SshCredential,
        remote_host: &str,
        remote_port: u16,
    ) -> Result<Self, String> {
        let tcp = TcpStream::connect(gateway).map_err(|e| format!("tunnel connect failed: {e}"))?;
        let mut session = Session::new().map_err(|e| format!("ssh init failed: {e}"))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| format!("tunnel handshake failed: {e}"))?;

        match credential {
            SshCredential::Password(password) => session
                .userauth_password(user, password)
                .map_err(|e| format!("tunnel auth failed: {e}"))?,
            SshCredential::KeyFile(path) => session
                .userauth_pubkey_file(user, None, path, None)
                .map_err(|e| format!("tunnel auth failed: {e}"))?,
        }

        let listener =
            TcpListener::bind("127.0.0.1:0").map_err(|e| format!("local bind failed: {e}"))?;
        let local_port = listener
            .local_addr()
            .map_err(|e| format!("local addr failed: {e}"))?
            .port();

        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = stop.clone();
        let remote_host = remote_host.to_string();

        listener
            .set_nonblocking(true)
            .map_err(|e| format!("listener setup failed: {e}"))?;
        // Handshake and auth above ran blocking; switch to non-blocking now
        // so channel reads/writes surface WouldBlock instead of stalling.
        session.set_blocking(false);

        let worker = std::thread::spawn(move || {
            info!(local_port, "monitoring tunnel listening");
            while !stop_for_thread.load(Ordering::Relaxed) {
                match listener.accept() {
                    Ok((local_conn, _)) => {
                        let channel = session.channel_direct_tcpip(
                            &remote_host,
                            remote_port,
                            None,
                        );
                        match channel {
                            Ok(channel) => {
                                std::thread::spawn(move || pump_connection(local_conn, channel));
                            }
                            Err(e) => error!(error = %e, "tunnel channel open failed"),
                        }
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        std::thread::sleep(std::time::Duration::from_millis(50));
                    }
                    Err(e) => {
                        error!(error = %e, "tunnel accept failed");
                        break;
                    }
                }
            }
            debug!("monitoring tunnel worker exiting");
        });

        Ok(Self {
            local_port,
            stop,
            worker: Some(worker),
        })
    }

    /// Local port queries should be sent to; forwards transparently to the
    /// remote monitoring endpoint.
    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Tear the tunnel down: signal the worker thread and join it.
    pub fn close(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MonitoringTunnel {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Copy bytes between the accepted local connection and the SSH channel
/// until either side closes. Both sides are set non-blocking so a single
/// thread can alternate between them without a dedicated reactor.
fn pump_connection(mut local: TcpStream, mut channel: ssh2::Channel) {
    if local.set_nonblocking(true).is_err() {
        return;
    }

    let mut buf = [0u8; 8192];
    loop {
        let mut made_progress = false;

        match local.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                made_progress = true;
                if channel.write_all(&buf[..n]).is_err() {
                    break;
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(_) => break,
        }

        match channel.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                made_progress = true;
                if local.write_all(&buf[..n]).is_err() {
                    break;
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(_) => break,
        }

        if channel.eof() {
            break;
        }
        if !made_progress {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
    }
    let _ = channel.send_eof();
    let _ = channel.wait_close();
}
