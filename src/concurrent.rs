use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Instant;

type Job<T, U> = (T, Box<dyn FnOnce(T) -> U + Send>, Sender<U>);

/// A background thread that runs the closures it is handed, one at a time,
/// and sends each answer back on a private channel.
pub struct ConcurrentCalc<T, U> {
  sender: Sender<Job<T, U>>,
}

/// Why a pending answer never arrived.
#[derive(Debug, PartialEq, Eq)]
pub enum Undelivered {
  /// The worker went away (panicked or was shut down) without answering.
  Disconnected,
  TimedOut,
}

/// Answer to one `calculate` call, waiting on its channel.
pub struct Pending<U> {
  recv: Receiver<U>,
}

impl<U> Pending<U> {
  /// Blocks until the worker answers.
  pub fn wait(self) -> Result<U, Undelivered> {
    self.recv.recv().map_err(|_| Undelivered::Disconnected)
  }

  /// Blocks until the worker answers or `deadline` passes.
  pub fn wait_until(self, deadline: Instant) -> Result<U, Undelivered> {
    let timeout = deadline.saturating_duration_since(Instant::now());
    self.recv.recv_timeout(timeout).map_err(|e| match e {
      RecvTimeoutError::Timeout => Undelivered::TimedOut,
      RecvTimeoutError::Disconnected => Undelivered::Disconnected,
    })
  }
}

impl<T: Send + 'static, U: Send + 'static> ConcurrentCalc<T, U> {
  pub fn new(name: String) -> std::io::Result<ConcurrentCalc<T, U>> {
    let (send, recv) = channel::<Job<T, U>>();
    thread::Builder::new().name(name).spawn(move || {
      for (data, f, s) in recv.iter() {
        // The caller may have given up waiting; nothing to do about it here.
        let _ = s.send(f(data));
      }
    })?;
    Ok(ConcurrentCalc { sender: send })
  }

  pub fn calculate<F: FnOnce(T) -> U + Send + 'static>(&self, data: T, f: F) -> Pending<U> {
    let (send, recv) = channel();
    // If the thread is gone the job (and its reply sender) is dropped, which
    // surfaces as `Undelivered::Disconnected` on the pending side.
    let _ = self.sender.send((data, Box::new(f), send));
    Pending { recv }
  }
}
