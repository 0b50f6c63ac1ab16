use rand::Rng;

use crate::hand::RANK_COUNT;
use crate::Card;

/// A deck that never runs out: every draw is a uniform pick over the 13 ranks,
/// independent of everything dealt before.
#[derive(Debug, Clone)]
pub struct InfiniteDeck<R: Rng> {
    rng: R,
}

impl<R: Rng> InfiniteDeck<R> {
    pub fn new(rng: R) -> InfiniteDeck<R> {
        InfiniteDeck { rng }
    }

    pub fn deal_card(&mut self) -> crate::Result<Card> {
        Card::try_from(self.rng.gen_range(0..RANK_COUNT))
    }

    /// The generator behind the deck, lent to strategies for their coin flips.
    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }
}
