use super::command::Command;
use super::event::Event;
use super::io::IoEntry;
use super::poller::platform::sys_close;
use super::poller::{Poller, Waker as PollerWaker};
use super::timer::{self, TimerEntry};
use crate::time::Clock;

use std::collections::{BinaryHeap, HashMap};
use std::io;
use std::os::fd::RawFd;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, Receiver, SendError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

/// Cloneable handle used by tasks to talk to the reactor thread.
///
/// Every command is followed by a poller wake-up so the reactor never
/// sleeps on a stale view of its registrations.
#[derive(Clone)]
pub(crate) struct ReactorHandle {
    sender: Sender<Command>,
    waker: Arc<PollerWaker>,
    clock: Arc<dyn Clock>,
}

impl ReactorHandle {
    /// Sends a command to the reactor and interrupts its poll.
    pub(crate) fn send(&self, command: Command) -> Result<(), SendError<Command>> {
        self.sender.send(command)?;
        self.waker.wake();
        Ok(())
    }

    /// Returns the clock the reactor measures deadlines against.
    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

/// The reactor: owns the poller, the timer heap and the I/O waiters.
///
/// Runs on its own thread and only reacts to commands, readiness
/// events and expired timers. It never polls a task itself; it wakes
/// them and lets the executor do the rest.
pub(crate) struct Reactor {
    receiver: Receiver<Command>,

    poller: Poller,
    events: Vec<Event>,

    timers: BinaryHeap<TimerEntry>,
    next_timer: u64,

    /// Heap size at which cancelled timers are swept out.
    compact_at: usize,

    /// Waiters keyed by file descriptor; the descriptor doubles as the
    /// poller token.
    io: HashMap<RawFd, IoEntry>,

    clock: Arc<dyn Clock>,
}

impl Reactor {
    /// Starts the reactor on a dedicated thread.
    pub(crate) fn start(clock: Arc<dyn Clock>) -> io::Result<(ReactorHandle, JoinHandle<()>)> {
        let poller = Poller::new()?;
        let waker = poller.waker();
        let (sender, receiver) = mpsc::channel();

        let hook_waker = waker.clone();
        clock.on_advance(Box::new(move || hook_waker.wake()));

        let mut reactor = Reactor {
            receiver,
            poller,
            events: Vec::with_capacity(64),
            timers: BinaryHeap::new(),
            next_timer: 0,
            compact_at: timer::COMPACT_MIN,
            io: HashMap::new(),
            clock: clock.clone(),
        };

        let thread = thread::Builder::new()
            .name("courier-reactor".into())
            .spawn(move || reactor.run())?;

        Ok((
            ReactorHandle {
                sender,
                waker,
                clock,
            },
            thread,
        ))
    }

    fn run(&mut self) {
        tracing::debug!("reactor started");

        loop {
            loop {
                match self.receiver.try_recv() {
                    Ok(Command::Shutdown) | Err(TryRecvError::Disconnected) => {
                        self.shutdown();
                        return;
                    }
                    Ok(command) => self.handle_command(command),
                    Err(TryRecvError::Empty) => break,
                }
            }

            self.fire_timers();

            let timeout = self
                .timers
                .peek()
                .map(|t| t.deadline.saturating_duration_since(self.clock.now()));

            if let Err(err) = self.poller.poll(&mut self.events, timeout) {
                tracing::error!(error = %err, "reactor poll failed");
                self.shutdown();
                return;
            }

            let events = std::mem::take(&mut self.events);
            for event in &events {
                self.handle_event(event);
            }
            self.events = events;
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Register {
                fd,
                interest,
                waker,
            } => {
                let existed = self.io.contains_key(&fd);
                let entry = self.io.entry(fd).or_default();
                entry.set(interest, waker);
                let interest = entry.interest();

                let result = if existed {
                    self.poller.reregister(fd, fd as usize, interest)
                } else {
                    self.poller.register(fd, fd as usize, interest)
                };

                if let Err(err) = result {
                    // The waiter retries its syscall and reports the real error.
                    tracing::trace!(fd, error = %err, "registration failed");
                    if let Some(entry) = self.io.remove(&fd) {
                        entry.wake_all();
                    }
                } else {
                    tracing::trace!(fd, ?interest, "registered");
                }
            }

            Command::Deregister { fd, interest } => {
                if let Some(entry) = self.io.get_mut(&fd) {
                    entry.clear(interest);
                    self.refresh(fd);
                }
            }

            Command::Close { fd } => {
                if let Some(entry) = self.io.remove(&fd) {
                    self.poller.deregister(fd);
                    entry.wake_all();
                }

                tracing::trace!(fd, "closed");
                sys_close(fd);
            }

            Command::SetTimer {
                deadline,
                waker,
                cancelled,
            } => {
                let seq = self.next_timer;
                self.next_timer += 1;

                self.timers.push(TimerEntry {
                    deadline,
                    seq,
                    waker,
                    cancelled,
                });

                if self.timers.len() >= self.compact_at {
                    let purged = timer::purge_cancelled(&mut self.timers);
                    self.compact_at = (self.timers.len() * 2).max(timer::COMPACT_MIN);
                    tracing::trace!(purged, live = self.timers.len(), "timer heap compacted");
                }
            }

            Command::Shutdown => unreachable!("shutdown is handled by the run loop"),
        }
    }

    fn handle_event(&mut self, event: &Event) {
        let fd = event.token as RawFd;

        let Some(entry) = self.io.get_mut(&fd) else {
            return;
        };

        if event.readable {
            if let Some(waker) = entry.reader.take() {
                waker.wake();
            }
        }

        if event.writable {
            if let Some(waker) = entry.writer.take() {
                waker.wake();
            }
        }

        self.refresh(fd);
    }

    /// Brings the poller registration of `fd` in line with its waiters.
    fn refresh(&mut self, fd: RawFd) {
        let Some(entry) = self.io.get(&fd) else {
            return;
        };

        let interest = entry.interest();

        if interest.is_empty() {
            self.io.remove(&fd);
            self.poller.deregister(fd);
            tracing::trace!(fd, "deregistered");
        } else if let Err(err) = self.poller.reregister(fd, fd as usize, interest) {
            tracing::trace!(fd, error = %err, "reregistration failed");
            if let Some(entry) = self.io.remove(&fd) {
                entry.wake_all();
            }
        }
    }

    fn fire_timers(&mut self) {
        let now = self.clock.now();

        while let Some(timer) = self.timers.peek() {
            let cancelled = timer.cancelled.load(Ordering::Acquire);

            if !cancelled && timer.deadline > now {
                break;
            }

            if let Some(timer) = self.timers.pop() {
                if !cancelled {
                    timer.waker.wake();
                }
            }
        }
    }

    fn shutdown(&mut self) {
        // Descriptors handed over for closing must not leak with the thread.
        while let Ok(command) = self.receiver.try_recv() {
            if let Command::Close { fd } = command {
                self.poller.deregister(fd);
                sys_close(fd);
            }
        }

        for (fd, entry) in self.io.drain() {
            self.poller.deregister(fd);
            entry.wake_all();
        }

        for timer in self.timers.drain() {
            timer.waker.wake();
        }

        tracing::debug!("reactor stopped");
    }
}
