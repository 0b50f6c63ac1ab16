use std::collections::BTreeSet;

use strum::IntoEnumIterator;
use strum_macros::EnumIter;

use crate::BlackjackError;

/// Any total greater than or equal to this busts.
pub const BUST_FROM: u32 = 22;
pub const RANK_COUNT: u8 = 13;

static CARD_VALUES: [&[u32]; RANK_COUNT as usize] = [
    &[2],
    &[3],
    &[4],
    &[5],
    &[6],
    &[7],
    &[8],
    &[9],
    &[10],
    &[10],
    &[10],
    &[10],
    &[1, 11],
];

/// A card rank. Suits play no part in this game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter)]
pub enum Card {
    Two = 0,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Card {
    /// All values this card may count as.
    pub fn values(&self) -> &'static [u32] {
        CARD_VALUES[*self as usize]
    }

    /// The largest value of the card. It is unique to the rank group, so an ace gives 11.
    pub fn max_value(&self) -> u32 {
        self.values().iter().copied().max().unwrap_or(0)
    }
}

impl TryFrom<u8> for Card {
    type Error = BlackjackError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Card::iter()
            .nth(value as usize)
            .ok_or(BlackjackError::UnknownCard(value))
    }
}

impl std::fmt::Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Card::Two => '2',
            Card::Three => '3',
            Card::Four => '4',
            Card::Five => '5',
            Card::Six => '6',
            Card::Seven => '7',
            Card::Eight => '8',
            Card::Nine => '9',
            Card::Ten => 'T',
            Card::Jack => 'J',
            Card::Queen => 'Q',
            Card::King => 'K',
            Card::Ace => 'A',
        };
        write!(f, "{}", symbol)
    }
}

/// Extends a set of partial totals by one card. Totals reaching `limit` are dropped.
fn extend_totals(totals: &BTreeSet<u32>, card: Card, limit: Option<u32>) -> BTreeSet<u32> {
    totals
        .iter()
        .flat_map(|total| card.values().iter().map(move |value| total + value))
        .filter(|total| limit.map_or(true, |limit| *total < limit))
        .collect()
}

/// Every total the cards can add up to. An empty hand gives {0}.
pub fn all_values(cards: &[Card]) -> BTreeSet<u32> {
    cards
        .iter()
        .fold(BTreeSet::from([0]), |totals, card| extend_totals(&totals, *card, None))
}

/// Totals that do not bust. Busting partial sums are discarded as soon as they appear,
/// which gives the same set as filtering `all_values` since card values are positive.
pub fn nonbusting_values(cards: &[Card]) -> BTreeSet<u32> {
    cards.iter().fold(BTreeSet::from([0]), |totals, card| {
        extend_totals(&totals, *card, Some(BUST_FROM))
    })
}

pub fn is_bust(cards: &[Card]) -> bool {
    nonbusting_values(cards).is_empty()
}

/// The cards of one side. Totals are kept up to date as cards are received, so no
/// evaluation ever walks the whole hand again.
#[derive(Debug, Clone, PartialEq)]
pub struct Hand {
    cards: Vec<Card>,
    totals: BTreeSet<u32>,
    nonbusting_totals: BTreeSet<u32>,
}

impl Hand {
    pub fn new() -> Hand {
        Hand {
            cards: Vec::with_capacity(6),
            totals: BTreeSet::from([0]),
            nonbusting_totals: BTreeSet::from([0]),
        }
    }

    pub fn from_cards(cards: &[Card]) -> Hand {
        let mut hand = Hand::new();
        for card in cards {
            hand.receive_card(*card);
        }
        hand
    }

    pub fn receive_card(&mut self, card: Card) {
        self.cards.push(card);
        self.totals = extend_totals(&self.totals, card, None);
        self.nonbusting_totals = extend_totals(&self.nonbusting_totals, card, Some(BUST_FROM));
    }

    pub fn get_cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn all_values(&self) -> &BTreeSet<u32> {
        &self.totals
    }

    pub fn nonbusting_values(&self) -> &BTreeSet<u32> {
        &self.nonbusting_totals
    }

    pub fn is_bust(&self) -> bool {
        self.nonbusting_totals.is_empty()
    }

    /// The largest total that does not bust, or None for a bust hand.
    pub fn best_total(&self) -> Option<u32> {
        self.nonbusting_totals.last().copied()
    }

    /// True when an ace can still count as 11 without busting.
    pub fn is_soft(&self) -> bool {
        self.nonbusting_totals.len() > 1
    }

    pub fn clear(&mut self) {
        *self = Hand::new();
    }
}

impl Default for Hand {
    fn default() -> Self {
        Hand::new()
    }
}

impl std::fmt::Display for Hand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cards: Vec<String> = self.cards.iter().map(|card| card.to_string()).collect();
        write!(f, "{}", cards.join(" "))
    }
}
