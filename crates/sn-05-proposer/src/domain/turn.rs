//! # Turn Progression
//!
//! A version-3 event at frame `f` sees the incoming sync state
//! `(turn t, frame g, block b)`, the join of its parents' states seeded with
//! `(0, 0, epoch_start_block)`.
//!
//! ```text
//!   frames g+1 ..= g+8   attempt 0
//!   frames g+9 ..= g+16  attempt 1
//!   ...
//! ```
//!
//! The elected proposer of `(b + 1, attempt)` may claim turn `t + 1` at frame
//! `f`. A claim always advances the block by exactly one.

use super::election::get_proposer;
use crate::error::{Result, TurnError};
use shared_types::{BlockNumber, Frame, ProposalSyncState, ValidatorId, Validators};

/// Frames an elected proposer has before the election moves on.
pub const TURN_TIMEOUT_IN_FRAMES: Frame = 8;

/// Sync state an event inherits from its parents.
pub fn incoming_state<'a, I>(epoch_start_block: BlockNumber, parents: I) -> ProposalSyncState
where
    I: IntoIterator<Item = &'a ProposalSyncState>,
{
    let base = ProposalSyncState {
        last_seen_proposal_turn: 0,
        last_seen_proposal_frame: 0,
        last_seen_proposed_block: epoch_start_block,
    };
    ProposalSyncState::join_all(base, parents)
}

/// Election attempt at `frame`, or `None` if no frame has elapsed since the
/// last turn.
pub fn attempt_at(incoming: &ProposalSyncState, frame: Frame) -> Option<u32> {
    let elapsed = frame.checked_sub(incoming.last_seen_proposal_frame)?;
    if elapsed == 0 {
        return None;
    }
    Some((elapsed - 1) / TURN_TIMEOUT_IN_FRAMES)
}

/// Proposer entitled to claim the next turn at `frame`.
pub fn proposer_at(
    validators: &Validators,
    incoming: &ProposalSyncState,
    frame: Frame,
) -> Result<Option<ValidatorId>> {
    match attempt_at(incoming, frame) {
        Some(attempt) => {
            get_proposer(validators, incoming.last_seen_proposed_block + 1, attempt).map(Some)
        }
        None => Ok(None),
    }
}

/// True if `validator` should propose at `frame`.
///
/// Besides winning the election, the local chain must have caught up with
/// the last seen proposal; proposing on top of a block that is not yet known
/// would produce a stale parent hash.
pub fn is_allowed_to_propose(
    validator: ValidatorId,
    validators: &Validators,
    incoming: &ProposalSyncState,
    frame: Frame,
    latest_block: BlockNumber,
) -> Result<bool> {
    if latest_block != incoming.last_seen_proposed_block {
        return Ok(false);
    }
    Ok(proposer_at(validators, incoming, frame)? == Some(validator))
}

/// Sync state after claiming the next turn at `frame`.
pub fn advance(incoming: &ProposalSyncState, frame: Frame) -> ProposalSyncState {
    ProposalSyncState {
        last_seen_proposal_turn: incoming.last_seen_proposal_turn + 1,
        last_seen_proposal_frame: frame,
        last_seen_proposed_block: incoming.last_seen_proposed_block + 1,
    }
}

/// Check that `claimed` is the valid turn `creator` may take at `frame`.
pub fn validate_turn(
    validators: &Validators,
    incoming: &ProposalSyncState,
    claimed: &ProposalSyncState,
    frame: Frame,
    creator: ValidatorId,
) -> Result<()> {
    if frame <= incoming.last_seen_proposal_frame {
        return Err(TurnError::FrameNotAdvanced {
            frame,
            last: incoming.last_seen_proposal_frame,
        });
    }
    if claimed.last_seen_proposal_turn != incoming.last_seen_proposal_turn + 1 {
        return Err(TurnError::WrongTurn {
            claimed: claimed.last_seen_proposal_turn,
            incoming: incoming.last_seen_proposal_turn,
        });
    }
    if claimed.last_seen_proposal_frame != frame {
        return Err(TurnError::WrongTurnFrame {
            claimed: claimed.last_seen_proposal_frame,
            frame,
        });
    }
    if claimed.last_seen_proposed_block != incoming.last_seen_proposed_block + 1 {
        return Err(TurnError::WrongBlock {
            claimed: claimed.last_seen_proposed_block,
            incoming: incoming.last_seen_proposed_block,
        });
    }
    match proposer_at(validators, incoming, frame)? {
        Some(expected) if expected == creator => Ok(()),
        Some(expected) => Err(TurnError::NotProposer { creator, expected }),
        None => Err(TurnError::FrameNotAdvanced {
            frame,
            last: incoming.last_seen_proposal_frame,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn state(turn: u32, frame: Frame, block: BlockNumber) -> ProposalSyncState {
        ProposalSyncState {
            last_seen_proposal_turn: turn,
            last_seen_proposal_frame: frame,
            last_seen_proposed_block: block,
        }
    }

    fn validators() -> Validators {
        Validators::equal(&[1, 2, 3, 4], 10)
    }

    #[test]
    fn test_incoming_state_seeded_with_epoch_start() {
        let s = incoming_state(17, std::iter::empty());
        assert_eq!(s, state(0, 0, 17));
        let parents = [state(3, 9, 20), state(4, 7, 19)];
        assert_eq!(incoming_state(17, parents.iter()), state(4, 9, 20));
    }

    #[test]
    fn test_attempt_windows() {
        let s = state(1, 10, 5);
        assert_eq!(attempt_at(&s, 9), None);
        assert_eq!(attempt_at(&s, 10), None);
        assert_eq!(attempt_at(&s, 11), Some(0));
        assert_eq!(attempt_at(&s, 18), Some(0));
        assert_eq!(attempt_at(&s, 19), Some(1));
        assert_eq!(attempt_at(&s, 27), Some(2));
    }

    #[test]
    fn test_valid_claim_accepted() {
        let v = validators();
        let incoming = state(2, 4, 10);
        let frame = 6;
        let proposer = proposer_at(&v, &incoming, frame).unwrap().unwrap();
        let claimed = advance(&incoming, frame);
        assert_eq!(claimed, state(3, 6, 11));
        assert_eq!(validate_turn(&v, &incoming, &claimed, frame, proposer), Ok(()));
    }

    #[test]
    fn test_non_proposer_rejected() {
        let v = validators();
        let incoming = state(0, 0, 0);
        let proposer = proposer_at(&v, &incoming, 1).unwrap().unwrap();
        let other = v.sorted_ids().iter().copied().find(|id| *id != proposer).unwrap();
        let claimed = advance(&incoming, 1);
        assert!(matches!(
            validate_turn(&v, &incoming, &claimed, 1, other),
            Err(TurnError::NotProposer { .. })
        ));
    }

    #[test]
    fn test_claim_shape_rejections() {
        let v = validators();
        let incoming = state(2, 4, 10);
        let proposer = proposer_at(&v, &incoming, 5).unwrap().unwrap();

        let stale = validate_turn(&v, &incoming, &advance(&incoming, 4), 4, proposer);
        assert!(matches!(stale, Err(TurnError::FrameNotAdvanced { .. })));

        let skip_turn = state(4, 5, 11);
        assert!(matches!(
            validate_turn(&v, &incoming, &skip_turn, 5, proposer),
            Err(TurnError::WrongTurn { .. })
        ));

        let wrong_frame = state(3, 6, 11);
        assert!(matches!(
            validate_turn(&v, &incoming, &wrong_frame, 5, proposer),
            Err(TurnError::WrongTurnFrame { .. })
        ));

        let wrong_block = state(3, 5, 12);
        assert!(matches!(
            validate_turn(&v, &incoming, &wrong_block, 5, proposer),
            Err(TurnError::WrongBlock { .. })
        ));
    }

    #[test]
    fn test_pending_block_blocks_proposal() {
        let v = Validators::equal(&[1], 1);
        let incoming = state(1, 3, 8);
        assert!(is_allowed_to_propose(1, &v, &incoming, 4, 8).unwrap());
        assert!(!is_allowed_to_propose(1, &v, &incoming, 4, 7).unwrap());
        assert!(!is_allowed_to_propose(1, &v, &incoming, 3, 8).unwrap());
    }

    #[test]
    fn test_timeout_elects_new_proposer() {
        let v = validators();
        let incoming = state(0, 0, 0);
        let proposers: std::collections::HashSet<_> = (0..40)
            .map(|k| proposer_at(&v, &incoming, 1 + k * TURN_TIMEOUT_IN_FRAMES).unwrap().unwrap())
            .collect();
        assert!(proposers.len() > 1);
    }

    fn arb_state() -> impl Strategy<Value = ProposalSyncState> {
        (any::<u32>(), any::<u32>(), any::<u64>()).prop_map(|(t, f, b)| state(t, f, b))
    }

    proptest! {
        #[test]
        fn prop_join_is_a_semilattice(a in arb_state(), b in arb_state(), c in arb_state()) {
            prop_assert_eq!(a.join(&a), a);
            prop_assert_eq!(a.join(&b), b.join(&a));
            prop_assert_eq!(a.join(&b).join(&c), a.join(&b.join(&c)));
            let j = a.join(&b);
            prop_assert!(j.last_seen_proposal_turn >= a.last_seen_proposal_turn);
            prop_assert!(j.last_seen_proposal_frame >= a.last_seen_proposal_frame);
            prop_assert!(j.last_seen_proposed_block >= a.last_seen_proposed_block);
        }
    }
}
