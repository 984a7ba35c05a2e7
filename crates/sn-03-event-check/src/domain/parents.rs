//! # Parents Check
//!
//! Consistency of an event with its (already known) parents: self-parent
//! placement, seq, lamport, creation time and frame.

use super::frame::calc_frame;
use crate::error::ParentsError;
use shared_types::{EventHeader, Validators};

/// Validate `event` against the headers of its parents, in parent order.
pub fn validate(
    event: &EventHeader,
    parents: &[&EventHeader],
    validators: &Validators,
) -> Result<(), ParentsError> {
    let self_parent = match parents.first() {
        Some(p) if p.creator == event.creator => Some(*p),
        _ => None,
    };
    if parents.iter().skip(1).any(|p| p.creator == event.creator) {
        return Err(ParentsError::WrongSelfParent);
    }
    match self_parent {
        Some(sp) => {
            if event.seq != sp.seq + 1 {
                return Err(ParentsError::WrongSeq {
                    got: event.seq,
                    expected: sp.seq + 1,
                });
            }
            if event.creation_time <= sp.creation_time {
                return Err(ParentsError::PastTime);
            }
        }
        None if event.seq != 1 => return Err(ParentsError::WrongSelfParent),
        None => {}
    }

    let expected = parents.iter().map(|p| p.lamport).max().unwrap_or(0) + 1;
    if event.lamport != expected {
        return Err(ParentsError::WrongLamport {
            got: event.lamport,
            expected,
        });
    }

    let expected = calc_frame(parents.iter().copied(), validators);
    if event.frame != expected {
        return Err(ParentsError::WrongFrame {
            got: event.frame,
            expected,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(creator: u32, seq: u32, lamport: u32, frame: u32, time: u64) -> EventHeader {
        EventHeader {
            creator,
            seq,
            lamport,
            frame,
            creation_time: time,
            ..Default::default()
        }
    }

    fn validators() -> Validators {
        Validators::equal(&[1, 2, 3], 1)
    }

    #[test]
    fn test_valid_child() {
        let sp = header(1, 1, 1, 1, 10);
        let other = header(2, 1, 3, 1, 5);
        let e = header(1, 2, 4, 1, 11);
        assert_eq!(validate(&e, &[&sp, &other], &validators()), Ok(()));
    }

    #[test]
    fn test_self_parent_must_be_first() {
        let sp = header(1, 1, 1, 1, 10);
        let other = header(2, 1, 1, 1, 5);
        let e = header(1, 2, 2, 1, 11);
        assert_eq!(
            validate(&e, &[&other, &sp], &validators()),
            Err(ParentsError::WrongSelfParent)
        );
        let orphan = header(1, 2, 2, 1, 11);
        assert_eq!(
            validate(&orphan, &[&other], &validators()),
            Err(ParentsError::WrongSelfParent)
        );
    }

    #[test]
    fn test_seq_time_lamport_frame() {
        let sp = header(1, 3, 7, 2, 10);
        let v = validators();
        assert!(matches!(
            validate(&header(1, 5, 8, 2, 11), &[&sp], &v),
            Err(ParentsError::WrongSeq { .. })
        ));
        assert_eq!(
            validate(&header(1, 4, 8, 2, 10), &[&sp], &v),
            Err(ParentsError::PastTime)
        );
        assert!(matches!(
            validate(&header(1, 4, 9, 2, 11), &[&sp], &v),
            Err(ParentsError::WrongLamport { got: 9, expected: 8 })
        ));
        assert!(matches!(
            validate(&header(1, 4, 8, 3, 11), &[&sp], &v),
            Err(ParentsError::WrongFrame { got: 3, expected: 2 })
        ));
    }
}
