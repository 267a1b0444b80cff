use crate::DriverError;
use burrow_config::ChannelEndpoint;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::os::unix::net::UnixStream;
use std::time::Duration;
use tracing::debug;

const POWERDOWN_DIRECTIVE: &[u8] = b"system_powerdown\n";
const TCP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Ask the running instance to shut down gracefully over its monitor
/// channel. Fire-and-forget: the directive is written, the write side is
/// half-closed, and the response is drained and discarded. The caller
/// must re-query instance state to observe the actual exit.
pub fn send_powerdown(endpoint: &ChannelEndpoint) -> Result<(), DriverError> {
    debug!("sending system_powerdown to {endpoint}");
    match endpoint {
        ChannelEndpoint::Tcp { port } => {
            let stream = connect_localhost(*port).map_err(|source| DriverError::Control {
                endpoint: endpoint.to_string(),
                source,
            })?;
            drive(stream, |s| s.shutdown(Shutdown::Write))
        }
        ChannelEndpoint::Unix { path } => {
            let stream = UnixStream::connect(path).map_err(|source| DriverError::Control {
                endpoint: endpoint.to_string(),
                source,
            })?;
            drive(stream, |s| s.shutdown(Shutdown::Write))
        }
    }
    .map_err(|source| DriverError::Control {
        endpoint: endpoint.to_string(),
        source,
    })
}

fn connect_localhost(port: u16) -> std::io::Result<TcpStream> {
    let mut last_err = None;
    for addr in ("localhost", port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, TCP_CONNECT_TIMEOUT) {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "localhost did not resolve",
        )
    }))
}

fn drive<S, F>(mut stream: S, half_close: F) -> std::io::Result<()>
where
    S: Read + Write,
    F: FnOnce(&S) -> std::io::Result<()>,
{
    stream.write_all(POWERDOWN_DIRECTIVE)?;
    half_close(&stream)?;
    // Read until the peer closes its side; the monitor banner and command
    // echo are of no interest here.
    let mut discard = Vec::new();
    stream.read_to_end(&mut discard)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::os::unix::net::UnixListener;
    use std::thread;

    #[test]
    fn powerdown_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            // connection drops here, closing the client's read side
            line
        });

        send_powerdown(&ChannelEndpoint::Tcp { port }).unwrap();
        assert_eq!(server.join().unwrap(), "system_powerdown\n");
    }

    #[test]
    fn powerdown_over_unix_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qemu_socket");
        let listener = UnixListener::bind(&path).unwrap();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            stream.read_to_end(&mut buf).unwrap();
            // respond before closing; the client discards this
            let _ = stream.write_all(b"(qemu) ok\n");
            buf
        });

        send_powerdown(&ChannelEndpoint::Unix { path }).unwrap();
        assert_eq!(server.join().unwrap(), b"system_powerdown\n");
    }

    #[test]
    fn connect_failure_is_control_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = send_powerdown(&ChannelEndpoint::Unix {
            path: dir.path().join("no_socket"),
        })
        .unwrap_err();
        assert!(matches!(err, DriverError::Control { .. }));
    }
}
