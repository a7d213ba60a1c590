//! Blocking question/answer rendezvous with the owning thread.
//!
//! Interactive answers (which partition to open, whether to replace an
//! existing item) can only be produced on the thread that owns the user
//! interface. Code running elsewhere holds a [`Relay`]: [`Relay::ask`] queues
//! the question and blocks until the owner answers it through its [`Desk`].
//! The owner drains the desk from its event loop, the same way it drains any
//! other background channel.
//!
//! Code that may run on either side holds a [`Marshalled`] answerer instead:
//! on the owning thread it answers locally, anywhere else it goes through the
//! relay.

use std::sync::mpsc as std_mpsc;
use std::thread::{self, ThreadId};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

struct Request<Q, A> {
    question: Q,
    reply: std_mpsc::SyncSender<A>,
}

/// The asking side. Cheap to clone and `Send` whenever `Q` and `A` are.
pub struct Relay<Q, A> {
    tx: UnboundedSender<Request<Q, A>>,
    owner: ThreadId,
}

impl<Q, A> Clone for Relay<Q, A> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            owner: self.owner,
        }
    }
}

/// The answering side, owned by the thread that created the channel.
pub struct Desk<Q, A> {
    rx: UnboundedReceiver<Request<Q, A>>,
}

/// Creates a relay/desk pair owned by the calling thread.
pub fn channel<Q, A>() -> (Relay<Q, A>, Desk<Q, A>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let relay = Relay {
        tx,
        owner: thread::current().id(),
    };
    (relay, Desk { rx })
}

impl<Q, A> Relay<Q, A> {
    /// Asks the owner and waits for the answer.
    ///
    /// Returns `None` if the desk is gone, or if called on the owning thread
    /// itself (the owner cannot wait on its own desk; it should answer
    /// directly instead).
    pub fn ask(&self, question: Q) -> Option<A> {
        if thread::current().id() == self.owner {
            tracing::error!("rendezvous asked on its owning thread; answering with none");
            return None;
        }
        let (reply, answer) = std_mpsc::sync_channel(1);
        self.tx.send(Request { question, reply }).ok()?;
        answer.recv().ok()
    }

    /// Returns `true` if the current thread is the owner.
    pub fn on_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }
}

/// Answers locally on the owning thread and through a [`Relay`] elsewhere.
pub struct Marshalled<F, Q, A> {
    local: F,
    relay: Relay<Q, A>,
}

impl<F, Q, A> Marshalled<F, Q, A> {
    pub fn new(local: F, relay: Relay<Q, A>) -> Self {
        Self { local, relay }
    }

    /// Runs `here` with the local answerer on the owning thread, otherwise
    /// asks the owner with `question()`.
    pub fn answer<R>(
        &self,
        here: impl FnOnce(&F) -> R,
        question: impl FnOnce() -> Q,
        relayed: impl FnOnce(Option<A>) -> R,
    ) -> R {
        if self.relay.on_owner_thread() {
            here(&self.local)
        } else {
            relayed(self.relay.ask(question()))
        }
    }
}

impl<Q, A> Desk<Q, A> {
    /// Answers every question that is already waiting. Returns how many were
    /// answered.
    pub fn serve_pending(&mut self, mut answer: impl FnMut(&Q) -> A) -> usize {
        let mut served = 0;
        while let Ok(request) = self.rx.try_recv() {
            let _ = request.reply.send(answer(&request.question));
            served += 1;
        }
        served
    }

    /// Waits for the next question and answers it. Returns `false` once
    /// every relay has been dropped.
    pub async fn serve_next(&mut self, answer: impl FnOnce(&Q) -> A) -> bool {
        match self.rx.recv().await {
            Some(request) => {
                let _ = request.reply.send(answer(&request.question));
                true
            }
            None => false,
        }
    }
}
