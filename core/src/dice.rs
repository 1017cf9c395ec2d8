//! Dice values: `NdS` as data.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::rng::GameRng;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Encode, Decode, Serialize, Deserialize,
)]
pub struct Dice {
    pub num: u8,
    pub sides: u8,
}

impl Dice {
    pub const fn new(num: u8, sides: u8) -> Self {
        Dice { num, sides }
    }

    pub fn roll(&self, rng: &mut GameRng) -> i32 {
        rng.damroll(self.num as i32, self.sides as i32)
    }

    pub fn max(&self) -> i32 {
        self.num as i32 * self.sides as i32
    }

    pub fn avg(&self) -> i32 {
        (self.num as i32 * (self.sides as i32 + 1)) / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roll_within_bounds() {
        let d = Dice::new(3, 6);
        let mut rng = GameRng::seeded(1);
        for _ in 0..200 {
            let v = d.roll(&mut rng);
            assert!((3..=18).contains(&v));
        }
        assert_eq!(d.max(), 18);
        assert_eq!(d.avg(), 10);
    }
}
