use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout_at;
use tokio::time::Instant;

/// EventStatus is the lifecycle of a QuorumEvent.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventStatus {
    Init,
    /// Someone is blocked in `wait()`.
    Waiting,
    /// The outcome is known but the waiter has not picked it up yet.
    Ready,
    Done,
    TimedOut,
}

/// Vote is what one peer contributes to a round.
#[derive(Debug)]
pub enum Vote<R> {
    Yes(R),
    No(R),
    /// The peer could not be reached. Counted as a no.
    Unreachable,
}

/// QuorumEvent collects yes/no votes of one broadcast round.
///
/// Peers deliver votes through the sender returned by `new()`; the issuing replica adds its own
/// vote with `vote_self()`. A fast path can be enabled so that replies classified as identical
/// are counted separately.
///
/// `yes()` is `n_yes >= quorum`, `no()` is `n_no > n_total - quorum`: once `no()` holds a
/// quorum can never be reached.
pub struct QuorumEvent<R> {
    pub n_total: usize,
    pub quorum: usize,

    fast_quorum: Option<usize>,
    is_identical: fn(&R) -> bool,

    n_yes: usize,
    n_no: usize,
    n_identical: usize,

    /// Replies of peers, yes and no alike, in arrival order.
    pub replies: Vec<R>,

    status: EventStatus,
    rx: mpsc::UnboundedReceiver<Vote<R>>,
}

fn never_identical<R>(_: &R) -> bool {
    false
}

impl<R> QuorumEvent<R> {
    pub fn new(n_total: usize, quorum: usize) -> (QuorumEvent<R>, mpsc::UnboundedSender<Vote<R>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let ev = QuorumEvent {
            n_total,
            quorum,
            fast_quorum: None,
            is_identical: never_identical,
            n_yes: 0,
            n_no: 0,
            n_identical: 0,
            replies: Vec::with_capacity(n_total),
            status: EventStatus::Init,
            rx,
        };
        (ev, tx)
    }

    /// with_fast_path makes the event also complete when `fast_quorum` identical yes votes
    /// arrived.
    pub fn with_fast_path(mut self, fast_quorum: usize, is_identical: fn(&R) -> bool) -> Self {
        self.fast_quorum = Some(fast_quorum);
        self.is_identical = is_identical;
        self
    }

    /// vote_self counts the issuing replica: a yes that agrees with itself.
    pub fn vote_self(&mut self) {
        self.n_yes += 1;
        self.n_identical += 1;
    }

    pub fn vote(&mut self, v: Vote<R>) {
        match v {
            Vote::Yes(r) => {
                self.n_yes += 1;
                if (self.is_identical)(&r) {
                    self.n_identical += 1;
                }
                self.replies.push(r);
            }
            Vote::No(r) => {
                self.n_no += 1;
                self.replies.push(r);
            }
            Vote::Unreachable => {
                self.n_no += 1;
            }
        }
    }

    pub fn n_yes(&self) -> usize {
        self.n_yes
    }

    pub fn n_no(&self) -> usize {
        self.n_no
    }

    pub fn n_voted(&self) -> usize {
        self.n_yes + self.n_no
    }

    pub fn yes(&self) -> bool {
        self.n_yes >= self.quorum
    }

    pub fn no(&self) -> bool {
        self.n_no + self.quorum > self.n_total
    }

    /// fast returns true if the fast path is enabled and reached.
    pub fn fast(&self) -> bool {
        match self.fast_quorum {
            Some(fq) => self.n_identical >= fq,
            None => false,
        }
    }

    fn fast_possible(&self) -> bool {
        match self.fast_quorum {
            Some(fq) => self.n_identical + self.n_total.saturating_sub(self.n_voted()) >= fq,
            None => false,
        }
    }

    /// is_ready returns true if more votes can not change the outcome any more, or the outcome
    /// is good enough.
    pub fn is_ready(&self) -> bool {
        if self.fast() || self.no() || self.n_voted() >= self.n_total {
            return true;
        }
        self.yes() && !self.fast_possible()
    }

    pub fn status(&self) -> EventStatus {
        self.status
    }

    /// test consumes votes already delivered without blocking and returns whether the event is
    /// ready.
    pub fn test(&mut self) -> bool {
        while let Ok(v) = self.rx.try_recv() {
            self.vote(v);
        }

        if self.is_ready() {
            self.status = match self.status {
                EventStatus::Waiting => EventStatus::Ready,
                EventStatus::Init => EventStatus::Done,
                s => s,
            };
            return true;
        }
        false
    }

    /// wait blocks until the event is ready or `timeout` elapses.
    /// Votes arriving after it returned are discarded.
    pub async fn wait(&mut self, timeout: Duration) -> EventStatus {
        if self.test() {
            self.status = EventStatus::Done;
            return self.status;
        }

        self.status = EventStatus::Waiting;
        let deadline = Instant::now() + timeout;

        loop {
            match timeout_at(deadline, self.rx.recv()).await {
                Ok(Some(v)) => {
                    self.vote(v);
                    if self.is_ready() {
                        self.status = EventStatus::Done;
                        break;
                    }
                }
                Ok(None) => {
                    // every sender is gone, no more votes will come
                    self.status = EventStatus::Done;
                    break;
                }
                Err(_) => {
                    self.status = EventStatus::TimedOut;
                    break;
                }
            }
        }

        self.rx.close();
        self.status
    }
}
