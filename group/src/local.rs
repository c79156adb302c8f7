//! An in-process group for tests and harnesses: N members on N threads,
//! wired with crossbeam channels.
//!
//! Only available with the `dev-context-only-utils` feature.

use {
    crate::{error::GroupError, ProcessGroup},
    crossbeam_channel::{unbounded, Receiver, Sender},
    std::{collections::VecDeque, sync::Mutex},
};

type Msg = (usize, Vec<u8>);

/// One member of an in-process group. [`LocalGroup::split`] hands one of
/// these to each simulated process; members must issue their collectives in
/// the same order, like any process group.
pub struct LocalGroup {
    rank: usize,
    size: usize,
    senders: Vec<Sender<Msg>>,
    receiver: Receiver<Msg>,
    /// Messages from a later collective that arrived while this one was
    /// still filling its slots.
    stashed: Mutex<VecDeque<Msg>>,
}

impl LocalGroup {
    /// Creates a group of `size` members. Each member is `Send` and is
    /// meant to move onto its own thread.
    pub fn split(size: usize) -> Vec<LocalGroup> {
        assert!(size > 0, "a group needs at least one member");

        let (senders, receivers): (Vec<Sender<Msg>>, Vec<Receiver<Msg>>) =
            (0..size).map(|_| unbounded()).unzip();

        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, receiver)| LocalGroup {
                rank,
                size,
                senders: senders.clone(),
                receiver,
                stashed: Mutex::new(VecDeque::new()),
            })
            .collect()
    }
}

impl ProcessGroup for LocalGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn all_gather(&self, payload: &[u8]) -> Result<Vec<Vec<u8>>, GroupError> {
        for sender in &self.senders {
            sender
                .send((self.rank, payload.to_vec()))
                .map_err(|_| GroupError::Comm("group member disconnected".to_string()))?;
        }

        let mut pending = {
            let mut stashed = self
                .stashed
                .lock()
                .map_err(|_| GroupError::Comm("stash lock poisoned".to_string()))?;
            std::mem::take(&mut *stashed)
        };

        let mut slots: Vec<Option<Vec<u8>>> = vec![None; self.size];
        let mut filled = 0;
        // Messages that belong to a later collective, in arrival order.
        let mut overflow: Vec<Msg> = Vec::new();

        while filled < self.size {
            let (from, data) = match pending.pop_front() {
                Some(msg) => msg,
                None => self
                    .receiver
                    .recv()
                    .map_err(|_| GroupError::Comm("group member disconnected".to_string()))?,
            };
            if from >= self.size {
                return Err(GroupError::Comm(format!("message from unknown rank {from}")));
            }
            if slots[from].is_none() {
                slots[from] = Some(data);
                filled += 1;
            } else {
                // A second message from `from` means it has already moved
                // on to its next collective.
                overflow.push((from, data));
            }
        }

        if !overflow.is_empty() || !pending.is_empty() {
            let mut stashed = self
                .stashed
                .lock()
                .map_err(|_| GroupError::Comm("stash lock poisoned".to_string()))?;
            stashed.extend(overflow);
            stashed.extend(pending);
        }

        Ok(slots.into_iter().flatten().collect())
    }

    fn barrier(&self) -> Result<(), GroupError> {
        self.all_gather(&[]).map(|_| ())
    }
}
