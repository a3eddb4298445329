//! Byte-stream duplex to the editor backend.
//!
//! Two variants: a stream socket at a filesystem path, or a child
//! process started with the backend's embed flag whose stdin/stdout
//! form the duplex. Both are switched to non-blocking after open so the
//! I/O thread can spin on reads without parking.

use std::io::{self, Read, Write};
use std::os::unix::io::AsRawFd;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// Read half of the duplex; owned exclusively by the I/O thread.
pub enum TransportReader {
    Socket(UnixStream),
    Child(ChildStdout),
}

/// Write half of the duplex. Shared behind a mutex so keyboard input can
/// bypass the outbound queue.
pub enum TransportWriter {
    Socket(UnixStream),
    Child(ChildStdin),
}

/// An open duplex plus the child process when running embedded.
pub struct Transport {
    pub reader: TransportReader,
    pub writer: TransportWriter,
    pub child: Option<Child>,
}

impl Transport {
    /// Connects to a backend listening on a Unix stream socket.
    pub fn connect_socket(path: &Path) -> io::Result<Transport> {
        let stream = UnixStream::connect(path)?;
        stream.set_nonblocking(true)?;
        let reader = stream.try_clone()?;

        log::info!("connected to backend socket at {}", path.display());

        Ok(Transport {
            reader: TransportReader::Socket(reader),
            writer: TransportWriter::Socket(stream),
            child: None,
        })
    }

    /// Spawns `program --embed` and speaks RPC over its stdio. Stderr is
    /// inherited so backend diagnostics reach the terminal.
    pub fn spawn_embedded(program: &str) -> io::Result<Transport> {
        let mut child = Command::new(program)
            .arg("--embed")
            .current_dir(std::env::current_dir()?)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;

        log::info!("spawned backend process at PID {}", child.id());

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "child stdin not piped"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "child stdout not piped"))?;

        set_nonblocking(stdout.as_raw_fd())?;

        Ok(Transport {
            reader: TransportReader::Child(stdout),
            writer: TransportWriter::Child(stdin),
            child: Some(child),
        })
    }
}

impl TransportReader {
    /// Reads whatever bytes are available. `WouldBlock` is surfaced
    /// unchanged; the caller spins.
    pub fn read_available(&mut self, chunk: &mut [u8]) -> io::Result<usize> {
        match self {
            TransportReader::Socket(stream) => stream.read(chunk),
            TransportReader::Child(stdout) => stdout.read(chunk),
        }
    }
}

impl TransportWriter {
    /// Writes the whole frame, spinning through `WouldBlock` on the
    /// non-blocking descriptor.
    pub fn write_frame(&mut self, mut frame: &[u8]) -> io::Result<()> {
        while !frame.is_empty() {
            let written = match self {
                TransportWriter::Socket(stream) => stream.write(frame),
                TransportWriter::Child(stdin) => stdin.write(frame),
            };

            match written {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "backend closed the transport",
                    ))
                }
                Ok(n) => frame = &frame[n..],
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    std::hint::spin_loop();
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }

        match self {
            TransportWriter::Socket(stream) => stream.flush(),
            TransportWriter::Child(stdin) => stdin.flush(),
        }
    }
}

fn set_nonblocking(fd: libc::c_int) -> io::Result<()> {
    // Child pipes have no set_nonblocking; toggle O_NONBLOCK directly.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn socket_pair_round_trips_frames() {
        let (a, b) = UnixStream::pair().unwrap();
        a.set_nonblocking(true).unwrap();
        b.set_nonblocking(true).unwrap();

        let mut writer = TransportWriter::Socket(a);
        let mut reader = TransportReader::Socket(b);

        writer.write_frame(b"\x93\x02\xa6redraw").unwrap();

        let mut chunk = [0u8; 64];
        let n = loop {
            match reader.read_available(&mut chunk) {
                Ok(n) => break n,
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => continue,
                Err(e) => panic!("read failed: {}", e),
            }
        };
        assert_eq!(&chunk[..n], b"\x93\x02\xa6redraw");
    }

    #[test]
    fn empty_socket_reports_would_block() {
        let (a, _b) = UnixStream::pair().unwrap();
        a.set_nonblocking(true).unwrap();

        let mut reader = TransportReader::Socket(a);
        let mut chunk = [0u8; 16];
        let err = reader.read_available(&mut chunk).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WouldBlock);
    }
}
