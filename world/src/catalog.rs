//! Card and key catalogs referenced by identifier throughout a match.

use keybound_core::{
    patterns::{SPAWNABLE_CARDS, STANDARD_LIBRARY},
    Card, CardId, KeyColor, MovementPattern, PatternError,
};
use thiserror::Error;

/// Failures raised while assembling a card catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A card pattern failed validation.
    #[error("card `{name}` has an invalid movement pattern")]
    Pattern {
        /// Offending card name.
        name: String,
        /// Validation failure.
        #[source]
        source: PatternError,
    },
    /// Two cards share a name.
    #[error("card `{0}` is declared twice")]
    DuplicateCard(String),
    /// A spawnable card is missing from the catalog.
    #[error("spawnable card `{0}` is not in the catalog")]
    UnknownSpawnable(String),
    /// The catalog holds more cards than identifiers can address.
    #[error("catalog holds too many cards")]
    TooManyCards,
}

/// Ordered set of card definitions addressed by [`CardId`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardCatalog {
    cards: Vec<Card>,
    spawnable: Vec<CardId>,
}

impl CardCatalog {
    /// Builds a catalog from cards and the names of those allowed to spawn on the board.
    pub fn new(cards: Vec<Card>, spawnable: &[&str]) -> Result<Self, CatalogError> {
        if u16::try_from(cards.len()).is_err() {
            return Err(CatalogError::TooManyCards);
        }
        for (index, card) in cards.iter().enumerate() {
            if cards[..index].iter().any(|other| other.name() == card.name()) {
                return Err(CatalogError::DuplicateCard(card.name().to_owned()));
            }
        }

        let mut catalog = Self {
            cards,
            spawnable: Vec::new(),
        };
        for name in spawnable {
            let id = catalog
                .find(name)
                .ok_or_else(|| CatalogError::UnknownSpawnable((*name).to_owned()))?;
            catalog.spawnable.push(id);
        }
        Ok(catalog)
    }

    /// Catalog holding the built-in card library.
    pub fn standard() -> Result<Self, CatalogError> {
        let mut cards = Vec::with_capacity(STANDARD_LIBRARY.len());
        for (name, rows) in STANDARD_LIBRARY {
            let pattern =
                MovementPattern::from_static(rows).map_err(|source| CatalogError::Pattern {
                    name: name.to_owned(),
                    source,
                })?;
            cards.push(Card::new(name, pattern));
        }
        Self::new(cards, &SPAWNABLE_CARDS)
    }

    /// Retrieves a card definition.
    #[must_use]
    pub fn get(&self, id: CardId) -> Option<&Card> {
        self.cards.get(usize::from(id.get()))
    }

    /// Name of a card, if the identifier is known.
    #[must_use]
    pub fn name(&self, id: CardId) -> Option<&str> {
        self.get(id).map(Card::name)
    }

    /// Looks a card up by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<CardId> {
        self.cards
            .iter()
            .position(|card| card.name() == name)
            .and_then(|index| u16::try_from(index).ok())
            .map(CardId::new)
    }

    /// Cards that may be scattered on the board.
    #[must_use]
    pub fn spawnable(&self) -> &[CardId] {
        &self.spawnable
    }

    /// Number of cards in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Reports whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Ordered key colours in the order keys are assigned to spawn groups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyCatalog {
    keys: Vec<KeyColor>,
}

impl KeyCatalog {
    /// Catalog holding the four standard key colours.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            keys: KeyColor::ALL.to_vec(),
        }
    }

    /// Key colours in assignment order.
    #[must_use]
    pub fn keys(&self) -> &[KeyColor] {
        &self.keys
    }

    /// Looks a key up by its display name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<KeyColor> {
        self.keys.iter().copied().find(|key| key.name() == name)
    }
}

impl Default for KeyCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
