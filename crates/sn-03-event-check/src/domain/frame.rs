//! Frame calculator.
//!
//! An event's frame is the highest parent frame, plus one if parents from a
//! quorum of stake sit at that frame. An event without parents opens frame 1.

use shared_types::{EventHeader, Frame, Validators};
use std::collections::BTreeSet;

/// Frame of an event with `parents`.
pub fn calc_frame<'a, I>(parents: I, validators: &Validators) -> Frame
where
    I: IntoIterator<Item = &'a EventHeader>,
{
    let parents: Vec<&EventHeader> = parents.into_iter().collect();
    let Some(max_frame) = parents.iter().map(|p| p.frame).max() else {
        return 1;
    };
    let creators: BTreeSet<_> = parents
        .iter()
        .filter(|p| p.frame == max_frame)
        .map(|p| p.creator)
        .collect();
    let weight: u64 = creators
        .iter()
        .map(|c| u64::from(validators.get_weight_by_id(*c)))
        .sum();
    if weight >= validators.quorum() {
        max_frame + 1
    } else {
        max_frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(creator: u32, frame: Frame) -> EventHeader {
        EventHeader {
            creator,
            frame,
            ..Default::default()
        }
    }

    #[test]
    fn test_no_parents_opens_frame_one() {
        assert_eq!(calc_frame(std::iter::empty(), &Validators::equal(&[1], 1)), 1);
    }

    #[test]
    fn test_solo_validator_advances_every_event() {
        let v = Validators::equal(&[1], 1);
        assert_eq!(calc_frame([&at(1, 4)], &v), 5);
    }

    #[test]
    fn test_quorum_required() {
        let v = Validators::equal(&[1, 2, 3, 4], 1);
        let (a, b, c) = (at(1, 3), at(2, 3), at(3, 3));
        assert_eq!(calc_frame([&a, &b], &v), 3);
        assert_eq!(calc_frame([&a, &b, &c], &v), 4);
        // Lower-frame parents do not count toward the quorum.
        assert_eq!(calc_frame([&a, &b, &at(3, 2)], &v), 3);
    }
}
