#![forbid(unsafe_code)]

//! Cards swiped away, owned by the stack rather than by any group.
//!
//! Entries outlive the group they came from. The list only grows until
//! [`History::clear`]; undoing a swipe does not remove the entry.

use crate::card::{Card, CardId};

#[derive(Debug, Default)]
pub struct History {
    cards: Vec<Card>,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, card: Card) {
        tracing::trace!(target: "cardstack.stack", card = %card.id(), len = self.cards.len() + 1, "history push");
        self.cards.push(card);
    }

    /// Entries newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter().rev()
    }

    #[must_use]
    pub fn newest(&self) -> Option<&Card> {
        self.cards.last()
    }

    #[must_use]
    pub fn get(&self, id: CardId) -> Option<&Card> {
        self.cards.iter().rev().find(|c| c.id() == id)
    }

    #[must_use]
    pub fn contains(&self, card: &Card) -> bool {
        self.cards.contains(card)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Bitmap, CardContent, CardState, ChangeListener};
    use crate::config::LayoutConfig;
    use cardstack_core::Rect;
    use std::rc::Rc;

    struct Blank;

    impl CardContent for Blank {
        fn capture(&self, _region: Rect) -> Option<Bitmap> {
            None
        }

        fn set_change_listener(&self, _listener: Option<ChangeListener>) {}
    }

    #[test]
    fn newest_first_and_clear() {
        let cards: Vec<Card> = (0..3)
            .map(|_| Card::new(Rc::new(Blank), CardState::Stack, LayoutConfig::default()))
            .collect();
        let mut history = History::new();
        for c in &cards {
            history.push(c.clone());
        }
        let ids: Vec<_> = history.iter().map(Card::id).collect();
        assert_eq!(ids, vec![cards[2].id(), cards[1].id(), cards[0].id()]);
        assert_eq!(history.newest(), Some(&cards[2]));
        assert_eq!(history.get(cards[0].id()), Some(&cards[0]));

        history.clear();
        assert!(history.is_empty());
        assert!(!history.contains(&cards[0]));
    }

    #[test]
    fn entries_outlive_their_owner() {
        let mut history = History::new();
        let id = {
            let card = Card::new(Rc::new(Blank), CardState::Stack, LayoutConfig::default());
            history.push(card.clone());
            card.id()
        };
        assert!(history.get(id).is_some());
    }
}
