use std::collections::HashSet;

use crate::error::CoreError;
use crate::ids::ItemId;
use crate::name::PositionalName;

/// One photo in a collection. Its position is derived from where it sits in
/// the owning [`Sequence`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub name: PositionalName,
}

impl Item {
    pub fn new(name: PositionalName) -> Self {
        Self {
            id: ItemId::new(),
            name,
        }
    }
}

/// Ordered items of one collection, in effective order.
///
/// Positions are 1-based and always contiguous. Storage names strictly
/// increase by number along the sequence, but the numbers themselves may
/// have gaps; the numbers held by the current items are the collection's
/// *slots*. Mutators are pure: they return a new sequence in which items have
/// been reordered and re-slotted so that name order matches position order
/// again, each item keeping its own extension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sequence {
    items: Vec<Item>,
}

impl Sequence {
    pub fn new(items: Vec<Item>) -> Result<Self, CoreError> {
        let mut ids = HashSet::with_capacity(items.len());
        for item in &items {
            if !ids.insert(item.id) {
                return Err(CoreError::InvalidSequence(format!("duplicate item {}", item.id)));
            }
        }
        for pair in items.windows(2) {
            if pair[0].name.number() >= pair[1].name.number() {
                return Err(CoreError::InvalidSequence(format!(
                    "{} does not sort before {}",
                    pair[0].name, pair[1].name
                )));
            }
        }
        Ok(Self { items })
    }

    /// Build from names already in effective order, minting fresh identities.
    pub fn from_names(names: impl IntoIterator<Item = PositionalName>) -> Result<Self, CoreError> {
        Self::new(names.into_iter().map(Item::new).collect())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn names(&self) -> Vec<PositionalName> {
        self.items.iter().map(|item| item.name.clone()).collect()
    }

    pub fn item_at(&self, position: usize) -> Option<&Item> {
        position.checked_sub(1).and_then(|idx| self.items.get(idx))
    }

    pub fn position_of(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id).map(|idx| idx + 1)
    }

    pub fn slot_numbers(&self) -> Vec<u32> {
        self.items.iter().map(|item| item.name.number()).collect()
    }

    /// The name `item` would carry if it sat at `position`.
    pub fn slot_name(&self, position: usize, item: &Item) -> Option<PositionalName> {
        self.item_at(position)
            .map(|occupant| item.name.with_number(occupant.name.number()))
    }

    pub fn swap(&self, a: ItemId, b: ItemId) -> Result<Sequence, CoreError> {
        let pos_a = self.require(a)?;
        let pos_b = self.require(b)?;
        let mut order = self.items.clone();
        order.swap(pos_a - 1, pos_b - 1);
        Ok(Self::reslot(order, &self.slot_numbers()))
    }

    /// Take the item out and reinsert it at `to`, shifting everything between.
    pub fn move_item(&self, id: ItemId, to: usize) -> Result<Sequence, CoreError> {
        let from = self.require(id)?;
        if to == 0 || to > self.items.len() {
            return Err(CoreError::InvalidOperation(format!(
                "target position {to} outside 1..={}",
                self.items.len()
            )));
        }
        let mut order = self.items.clone();
        let item = order.remove(from - 1);
        order.insert(to - 1, item);
        Ok(Self::reslot(order, &self.slot_numbers()))
    }

    /// Drop the item; everything after it moves up one slot.
    pub fn remove_and_compact(&self, id: ItemId) -> Result<Sequence, CoreError> {
        let position = self.require(id)?;
        let mut order = self.items.clone();
        order.remove(position - 1);
        Ok(Self::reslot(order, &self.slot_numbers()))
    }

    fn require(&self, id: ItemId) -> Result<usize, CoreError> {
        self.position_of(id)
            .ok_or_else(|| CoreError::InvalidOperation(format!("item {id} is not in the sequence")))
    }

    // `slots` is sorted and at least as long as `order`; leftover slots stay vacant.
    fn reslot(order: Vec<Item>, slots: &[u32]) -> Sequence {
        let items = order
            .into_iter()
            .zip(slots)
            .map(|(item, &number)| Item {
                name: item.name.with_number(number),
                id: item.id,
            })
            .collect();
        Sequence { items }
    }
}
