//! Per-peer misbehavior scores.
//!
//! Scores only ever grow. The node's ban policy reads them; nothing in this
//! crate disconnects or bans a peer.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::time::SystemTime;

use serde::Serialize;
use tracing::debug;
use tracing::warn;

use super::sanction::MisbehaviorReason;
use crate::p2p::error::LedgerError;

pub type PeerId = u64;

#[derive(Debug, Clone, Default, Serialize)]
pub struct PeerMisbehavior {
    pub score: u32,
    pub reasons: BTreeSet<MisbehaviorReason>,
    pub latest_punishment: Option<(MisbehaviorReason, SystemTime)>,
}

/// Shared handle to one peer's ledger entry.
///
/// A connection keeps its handle for its whole lifetime, so penalties land
/// without touching the ledger's peer map.
#[derive(Debug, Clone)]
pub struct PeerStandingHandle {
    peer_id: PeerId,
    entry: Arc<Mutex<PeerMisbehavior>>,
}

impl PeerStandingHandle {
    fn new(peer_id: PeerId) -> Self {
        Self {
            peer_id,
            entry: Arc::new(Mutex::new(PeerMisbehavior::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PeerMisbehavior> {
        self.entry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// Add `amount` to the score and return the new score. Saturates at
    /// `u32::MAX`.
    pub fn increase_penalty(&self, amount: u32, reason: MisbehaviorReason) -> u32 {
        let mut entry = self.lock();
        entry.score = entry.score.saturating_add(amount);
        entry.reasons.insert(reason);
        entry.latest_punishment = Some((reason, SystemTime::now()));
        let score = entry.score;
        drop(entry);

        warn!(
            "Punishing peer {} for {reason}, new score: {score}",
            self.peer_id
        );
        score
    }

    pub fn score(&self) -> u32 {
        self.lock().score
    }

    pub fn reasons(&self) -> BTreeSet<MisbehaviorReason> {
        self.lock().reasons.clone()
    }

    /// `true` once the score has reached `tolerance`.
    pub fn has_reached(&self, tolerance: u32) -> bool {
        self.score() >= tolerance
    }

    pub fn snapshot(&self) -> PeerMisbehavior {
        self.lock().clone()
    }
}

/// Misbehavior entries of all connected peers.
///
/// The peer map is only locked for writing on register and remove. Penalties
/// go through the per-peer mutex, so increments for different peers never
/// contend and increments for one peer are applied one at a time.
#[derive(Debug, Default)]
pub struct MisbehaviorLedger {
    entries: RwLock<HashMap<PeerId, PeerStandingHandle>>,
}

impl MisbehaviorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the entry for `peer_id`, or return the existing one.
    pub fn register(&self, peer_id: PeerId) -> PeerStandingHandle {
        if let Some(handle) = self.standing(peer_id) {
            return handle;
        }

        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        entries
            .entry(peer_id)
            .or_insert_with(|| {
                debug!("Registering misbehavior entry for peer {peer_id}");
                PeerStandingHandle::new(peer_id)
            })
            .clone()
    }

    /// Drop the entry of a disconnected peer, returning its final state.
    pub fn remove(&self, peer_id: PeerId) -> Option<PeerMisbehavior> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&peer_id)
            .map(|handle| handle.snapshot())
    }

    pub fn standing(&self, peer_id: PeerId) -> Option<PeerStandingHandle> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&peer_id)
            .cloned()
    }

    pub fn increase_penalty(
        &self,
        peer_id: PeerId,
        amount: u32,
        reason: MisbehaviorReason,
    ) -> Result<u32, LedgerError> {
        self.standing(peer_id)
            .map(|handle| handle.increase_penalty(amount, reason))
            .ok_or(LedgerError::UnknownPeer(peer_id))
    }

    pub fn get_score(&self, peer_id: PeerId) -> Option<u32> {
        self.standing(peer_id).map(|handle| handle.score())
    }

    pub fn reasons(&self, peer_id: PeerId) -> Option<BTreeSet<MisbehaviorReason>> {
        self.standing(peer_id).map(|handle| handle.reasons())
    }

    pub fn snapshot(&self) -> BTreeMap<PeerId, PeerMisbehavior> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(peer_id, handle)| (*peer_id, handle.snapshot()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
