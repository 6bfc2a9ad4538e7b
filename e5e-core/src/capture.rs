//! Process-wide stdout capture
//!
//! While a [`StdoutCapture`] is alive, file descriptor 1 points at the write
//! end of a pipe. A background thread drains the read end so that writers
//! never block on a full pipe. Once fd 1 is restored, the thread is told to
//! stop: it takes whatever is still buffered in the pipe and hands the
//! collected bytes back. It does not wait for end-of-stream, since child
//! processes started by the entrypoint may still hold the write end.

use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use os_pipe::{PipeReader, PipeWriter};
use tracing::{debug, warn};

/// Held for as long as fd 1 is redirected; one capture window at a time.
static CAPTURE_WINDOW: Mutex<()> = Mutex::new(());

const CHUNK_SIZE: usize = 64 * 1024;

pub struct StdoutCapture {
    /// Close-on-exec duplicate of the original fd 1. `None` once restored.
    saved: Option<OwnedFd>,
    /// Dropping this tells the drain thread to stop.
    stop: Option<PipeWriter>,
    drain: Option<JoinHandle<()>>,
    captured: Receiver<io::Result<Vec<u8>>>,
    _window: MutexGuard<'static, ()>,
}

impl StdoutCapture {
    /// Redirect fd 1 into a fresh pipe and start draining it.
    pub fn begin() -> io::Result<Self> {
        let window = CAPTURE_WINDOW
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Anything buffered so far belongs to the real stdout
        io::stdout().flush()?;

        let (reader, writer) = os_pipe::pipe()?;
        let (stop_reader, stop) = os_pipe::pipe()?;
        let saved = io::stdout().as_fd().try_clone_to_owned()?;
        redirect(writer.as_raw_fd(), libc::STDOUT_FILENO)?;
        // fd 1 is now the only write end in this process
        drop(writer);

        let (sender, captured) = crossbeam_channel::bounded(1);
        let drain = thread::Builder::new()
            .name("stdout-drain".to_string())
            .spawn(move || {
                // Ignore errors, the receiver is gone if the capture was abandoned.
                let _ = sender.send(drain(reader, stop_reader));
            });

        let drain = match drain {
            Ok(handle) => handle,
            Err(e) => {
                redirect(saved.as_raw_fd(), libc::STDOUT_FILENO)?;
                return Err(e);
            }
        };

        debug!("Capturing stdout");
        Ok(Self {
            saved: Some(saved),
            stop: Some(stop),
            drain: Some(drain),
            captured,
            _window: window,
        })
    }

    /// Restore fd 1 and return everything written in the meantime.
    pub fn finish(mut self) -> io::Result<String> {
        self.restore()?;
        self.stop = None;

        let bytes = self.captured.recv().map_err(|_| {
            io::Error::new(io::ErrorKind::Other, "stdout drain thread exited early")
        })??;
        if let Some(drain) = self.drain.take() {
            let _ = drain.join();
        }

        debug!("Captured {} bytes of stdout", bytes.len());
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn restore(&mut self) -> io::Result<()> {
        let Some(saved) = &self.saved else {
            return Ok(());
        };

        // Push out what the entrypoint left in Rust's stdout buffer
        let flushed = io::stdout().flush();
        redirect(saved.as_raw_fd(), libc::STDOUT_FILENO)?;
        self.saved = None;
        flushed
    }
}

impl Drop for StdoutCapture {
    fn drop(&mut self) {
        // The drain thread only stops promptly once fd 1 no longer feeds it
        if self.restore().is_ok() {
            self.stop = None;
            if let Some(drain) = self.drain.take() {
                let _ = drain.join();
            }
        }
    }
}

/// Collect the pipe's contents until end-of-stream or a stop request.
///
/// On a stop request only the bytes already buffered in the pipe are taken.
fn drain(mut reader: PipeReader, stop: PipeReader) -> io::Result<Vec<u8>> {
    let mut captured = Vec::new();
    let mut chunk = vec![0; CHUNK_SIZE];

    loop {
        let (readable, stopped) = wait(reader.as_fd(), stop.as_fd())?;

        if readable {
            match reader.read(&mut chunk) {
                Ok(0) => return Ok(captured),
                Ok(n) => captured.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!("Failed to drain captured stdout: {}", e);
                    return Err(e);
                }
            }
        }

        if stopped {
            let mut rest = vec![0; pending(reader.as_fd())?];
            reader.read_exact(&mut rest)?;
            captured.extend_from_slice(&rest);
            return Ok(captured);
        }
    }
}

/// Block until `data` is readable or `stop` signals, reporting which.
fn wait(data: BorrowedFd<'_>, stop: BorrowedFd<'_>) -> io::Result<(bool, bool)> {
    let mut fds = [
        libc::pollfd {
            fd: data.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        },
        libc::pollfd {
            fd: stop.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        },
    ];

    loop {
        // SAFETY: `fds` is a valid array of `fds.len()` pollfd entries whose
        // descriptors stay open for the duration of the call.
        let ready = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
        if ready >= 0 {
            break;
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }

    Ok((fds[0].revents != 0, fds[1].revents != 0))
}

/// Number of bytes buffered in the pipe behind `fd`.
fn pending(fd: BorrowedFd<'_>) -> io::Result<usize> {
    let mut count: libc::c_int = 0;
    // SAFETY: FIONREAD writes a single c_int through the pointer, which
    // points at a live local.
    if unsafe { libc::ioctl(fd.as_raw_fd(), libc::FIONREAD, &mut count as *mut libc::c_int) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(usize::try_from(count).unwrap_or(0))
}

fn redirect(from: RawFd, to: RawFd) -> io::Result<()> {
    loop {
        // SAFETY: dup2 only operates on descriptor numbers; `from` is kept
        // open by its owner for the duration of the call.
        if unsafe { libc::dup2(from, to) } != -1 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}
