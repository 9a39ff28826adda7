use std::{
    collections::HashMap,
    fmt::Debug,
    hash::Hash,
    thread,
    time::Instant,
};

use flume::{Receiver, RecvTimeoutError, Sender};
use log::{error, trace};

enum TimerCommand<K> {
    Schedule { key: K, deadline: Instant, token: u64 },
    Cancel(K),
}

/// Calls a function when deadlines pass, with at most one deadline pending per key.
///
/// Scheduling a deadline for a key replaces whatever was pending for that key.
pub struct ExpiryTimer<K> {
    sender: Sender<TimerCommand<K>>,
}

impl<K> ExpiryTimer<K>
where
    K: Eq + Hash + Copy + Debug + Send + 'static,
{
    /// Starts a timer thread that calls `on_expire` with the key and token of every deadline that passes.
    ///
    /// The thread stops once the timer is dropped.
    pub fn start<F>(name: &str, on_expire: F) -> ExpiryTimer<K>
    where
        F: Fn(K, u64) + Send + 'static,
    {
        let (sender, receiver) = flume::unbounded();

        if let Err(e) = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run(receiver, on_expire))
        {
            error!("Failed to spawn timer thread {name}: {e}");
        }

        ExpiryTimer { sender }
    }

    /// Sets the deadline for the provided key, replacing any pending one.
    pub fn schedule(&self, key: K, deadline: Instant, token: u64) {
        self.send(TimerCommand::Schedule {
            key,
            deadline,
            token,
        });
    }

    /// Removes the pending deadline for the provided key, if there is one.
    pub fn cancel(&self, key: K) {
        self.send(TimerCommand::Cancel(key));
    }

    fn send(&self, command: TimerCommand<K>) {
        if self.sender.send(command).is_err() {
            error!("Timer thread is gone; deadline dropped");
        }
    }
}

fn run<K, F>(receiver: Receiver<TimerCommand<K>>, on_expire: F)
where
    K: Eq + Hash + Copy + Debug,
    F: Fn(K, u64),
{
    let mut pending: HashMap<K, (Instant, u64)> = HashMap::new();

    loop {
        let next = pending
            .iter()
            .min_by_key(|(_, (deadline, _))| *deadline)
            .map(|(key, (deadline, token))| (*key, *deadline, *token));

        let command = match next {
            Some((key, deadline, token)) => {
                let now = Instant::now();
                if deadline <= now {
                    pending.remove(&key);
                    trace!("Deadline for {key:?} passed");
                    on_expire(key, token);
                    continue;
                }
                receiver.recv_timeout(deadline - now)
            }
            None => receiver
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected),
        };

        match command {
            Ok(TimerCommand::Schedule {
                key,
                deadline,
                token,
            }) => {
                pending.insert(key, (deadline, token));
            }
            Ok(TimerCommand::Cancel(key)) => {
                pending.remove(&key);
            }
            Err(RecvTimeoutError::Timeout) => (),
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
