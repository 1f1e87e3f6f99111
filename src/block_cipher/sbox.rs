use std::sync::LazyLock;

/// Number of cipher rounds, one table stack per round.
pub(crate) const ROUNDS: usize = 32;

/// One 4-bit box per nibble of a 128-bit block.
const BOXES_PER_ROUND: usize = 32;

type RoundTables = [[u8; 16]; BOXES_PER_ROUND];

/// The 32 rows of the eight DES S-boxes, each a permutation of `0..16`.
const REFERENCE_BOXES: RoundTables = [
    [14, 4, 13, 1, 2, 15, 11, 8, 3, 10, 6, 12, 5, 9, 0, 7],
    [0, 15, 7, 4, 14, 2, 13, 1, 10, 6, 12, 11, 9, 5, 3, 8],
    [4, 1, 14, 8, 13, 6, 2, 11, 15, 12, 9, 7, 3, 10, 5, 0],
    [15, 12, 8, 2, 4, 9, 1, 7, 5, 11, 3, 14, 10, 0, 6, 13],
    [15, 1, 8, 14, 6, 11, 3, 4, 9, 7, 2, 13, 12, 0, 5, 10],
    [3, 13, 4, 7, 15, 2, 8, 14, 12, 0, 1, 10, 6, 9, 11, 5],
    [0, 14, 7, 11, 10, 4, 13, 1, 5, 8, 12, 6, 9, 3, 2, 15],
    [13, 8, 10, 1, 3, 15, 4, 2, 11, 6, 7, 12, 0, 5, 14, 9],
    [10, 0, 9, 14, 6, 3, 15, 5, 1, 13, 12, 7, 11, 4, 2, 8],
    [13, 7, 0, 9, 3, 4, 6, 10, 2, 8, 5, 14, 12, 11, 15, 1],
    [13, 6, 4, 9, 8, 15, 3, 0, 11, 1, 2, 12, 5, 10, 14, 7],
    [1, 10, 13, 0, 6, 9, 8, 7, 4, 15, 14, 3, 11, 5, 2, 12],
    [7, 13, 14, 3, 0, 6, 9, 10, 1, 2, 8, 5, 11, 12, 4, 15],
    [13, 8, 11, 5, 6, 15, 0, 3, 4, 7, 2, 12, 1, 10, 14, 9],
    [10, 6, 9, 0, 12, 11, 7, 13, 15, 1, 3, 14, 5, 2, 8, 4],
    [3, 15, 0, 6, 10, 1, 13, 8, 9, 4, 5, 11, 12, 7, 2, 14],
    [2, 12, 4, 1, 7, 10, 11, 6, 8, 5, 3, 15, 13, 0, 14, 9],
    [14, 11, 2, 12, 4, 7, 13, 1, 5, 0, 15, 10, 3, 9, 8, 6],
    [4, 2, 1, 11, 10, 13, 7, 8, 15, 9, 12, 5, 6, 3, 0, 14],
    [11, 8, 12, 7, 1, 14, 2, 13, 6, 15, 0, 9, 10, 4, 5, 3],
    [12, 1, 10, 15, 9, 2, 6, 8, 0, 13, 3, 4, 14, 7, 5, 11],
    [10, 15, 4, 2, 7, 12, 9, 5, 6, 1, 13, 14, 0, 11, 3, 8],
    [9, 14, 15, 5, 2, 8, 12, 3, 7, 0, 4, 10, 1, 13, 11, 6],
    [4, 3, 2, 12, 9, 5, 15, 10, 11, 14, 1, 7, 6, 0, 8, 13],
    [4, 11, 2, 14, 15, 0, 8, 13, 3, 12, 9, 7, 5, 10, 6, 1],
    [13, 0, 11, 7, 4, 9, 1, 10, 14, 3, 5, 12, 2, 15, 8, 6],
    [1, 4, 11, 13, 12, 3, 7, 14, 10, 15, 6, 8, 0, 5, 9, 2],
    [6, 11, 13, 8, 1, 4, 10, 7, 9, 5, 0, 15, 14, 2, 3, 12],
    [13, 2, 8, 4, 6, 15, 11, 1, 10, 9, 3, 14, 5, 0, 12, 7],
    [1, 15, 13, 8, 10, 3, 7, 4, 12, 5, 6, 11, 0, 14, 9, 2],
    [7, 11, 4, 1, 9, 12, 14, 2, 0, 6, 10, 13, 15, 3, 5, 8],
    [2, 1, 14, 7, 4, 10, 8, 13, 15, 12, 9, 0, 3, 5, 6, 11],
];

/// Round tables shared by every cipher instance. They do not depend on the key.
pub(crate) static SUBSTITUTION_BOXES: LazyLock<SubstitutionBoxes> =
    LazyLock::new(SubstitutionBoxes::derive);

/// Forward and inverse 4-bit substitution tables for all rounds.
pub(crate) struct SubstitutionBoxes {
    forward: Box<[RoundTables; ROUNDS]>,
    inverse: Box<[RoundTables; ROUNDS]>,
}

impl SubstitutionBoxes {
    /// Round 0 uses the reference rows verbatim. Each later round starts from the
    /// previous round's tables and swaps entries within every row, steered by the
    /// table contents, so each row stays a permutation.
    fn derive() -> Self {
        let mut forward = Box::new([[[0u8; 16]; BOXES_PER_ROUND]; ROUNDS]);
        forward[0] = REFERENCE_BOXES;

        for round in 1..ROUNDS {
            let mut current = forward[round - 1];
            for row in 0..BOXES_PER_ROUND {
                for column in 0..16 {
                    let pivot = column + usize::from(current[row][column]);
                    let target = usize::from(current[pivot][column]);
                    current[row].swap(column, target);
                }
            }
            forward[round] = current;
        }

        let mut inverse = Box::new([[[0u8; 16]; BOXES_PER_ROUND]; ROUNDS]);
        for (round_inverse, round_forward) in inverse.iter_mut().zip(forward.iter()) {
            for (row_inverse, row_forward) in round_inverse.iter_mut().zip(round_forward) {
                for (input, &output) in row_forward.iter().enumerate() {
                    row_inverse[usize::from(output)] = input as u8;
                }
            }
        }

        Self { forward, inverse }
    }

    /// Replaces every nibble `i` of `block` through box `i` of `round`.
    pub(crate) fn substitute(&self, round: usize, block: u128) -> u128 {
        Self::apply(&self.forward[round], block)
    }

    /// Undoes [`Self::substitute`] for the same round.
    pub(crate) fn invert(&self, round: usize, block: u128) -> u128 {
        Self::apply(&self.inverse[round], block)
    }

    fn apply(tables: &RoundTables, block: u128) -> u128 {
        let mut output = 0u128;
        for (index, table) in tables.iter().enumerate() {
            let offset = 124 - 4 * index;
            let nibble = ((block >> offset) & 0xf) as usize;
            output |= u128::from(table[nibble]) << offset;
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_row_is_a_permutation() {
        let boxes = &*SUBSTITUTION_BOXES;
        for round in boxes.forward.iter().chain(boxes.inverse.iter()) {
            for row in round {
                let mut sorted = *row;
                sorted.sort_unstable();
                assert_eq!(sorted, core::array::from_fn::<u8, 16, _>(|i| i as u8));
            }
        }
    }

    #[test]
    fn test_rounds_are_distinct() {
        let distinct: HashSet<_> = SUBSTITUTION_BOXES.forward.iter().collect();
        assert_eq!(distinct.len(), ROUNDS);
    }

    #[test]
    fn test_cascade_regression() {
        let boxes = &*SUBSTITUTION_BOXES;
        assert_eq!(boxes.forward[0], REFERENCE_BOXES);
        assert_eq!(
            boxes.forward[1][0],
            [13, 9, 1, 5, 14, 6, 10, 12, 2, 7, 11, 3, 0, 8, 15, 4]
        );
        assert_eq!(
            boxes.forward[31][0],
            [8, 14, 4, 10, 3, 2, 1, 9, 5, 7, 13, 11, 6, 15, 12, 0]
        );
    }

    #[test]
    fn test_substitution_is_invertible() {
        let boxes = &*SUBSTITUTION_BOXES;
        let block = 0x0123_4567_89ab_cdef_fedc_ba98_7654_3210u128;
        for round in 0..ROUNDS {
            let substituted = boxes.substitute(round, block);
            assert_ne!(substituted, block);
            assert_eq!(boxes.invert(round, substituted), block);
        }
    }
}
