//! Store item model: a closed set of item variants sharing a typed
//! two-layer attribute overlay (committed base + staged changes).

use std::fmt::Debug;

use serde::Serialize;

use crate::crypto::key::Key;
use crate::domain::certificate::Certificate;
use super::identity::Identity;
use super::password::{GenericPassword, InternetPassword};

/// Handle to an arena slot in a keychain. The generation changes whenever
/// the slot is freed, so handles to deleted items go stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ItemId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ItemId {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Lifecycle of an item relative to its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemState {
    /// Not stored anywhere yet.
    New,
    /// Stored, no pending changes.
    Clean,
    /// Stored, with staged changes not yet saved.
    Dirty,
    /// Removed from its store.
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ItemClass {
    Certificate,
    Key,
    GenericPassword,
    InternetPassword,
    Identity,
}

/// Typed attribute record of one item class.
pub trait Attributes: Clone + Default + Debug {
    /// Staged modifications; every field `None` means "unchanged".
    type Changes: Clone + Default + Debug;

    fn apply(&mut self, changes: &Self::Changes);
}

/// Base attributes overlaid by pending changes.
#[derive(Debug, Clone)]
pub struct Overlay<A: Attributes> {
    base: A,
    pending: A::Changes,
    state: ItemState,
    id: Option<ItemId>,
}

impl<A: Attributes> Overlay<A> {
    pub fn new(base: A) -> Self {
        Self {
            base,
            pending: A::Changes::default(),
            state: ItemState::New,
            id: None,
        }
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    pub fn id(&self) -> Option<ItemId> {
        self.id
    }

    pub fn is_stored(&self) -> bool {
        self.id.is_some() && matches!(self.state, ItemState::Clean | ItemState::Dirty)
    }

    pub fn base(&self) -> &A {
        &self.base
    }

    pub fn pending(&self) -> &A::Changes {
        &self.pending
    }

    /// Read a field, preferring the staged value.
    pub fn read<'a, T: ?Sized>(
        &'a self,
        pending: impl FnOnce(&'a A::Changes) -> Option<&'a T>,
        base: impl FnOnce(&'a A) -> Option<&'a T>,
    ) -> Option<&'a T> {
        pending(&self.pending).or_else(|| base(&self.base))
    }

    /// Effective attributes: base with pending changes applied.
    pub fn current(&self) -> A {
        let mut attrs = self.base.clone();
        attrs.apply(&self.pending);
        attrs
    }

    pub fn stage(&mut self, change: impl FnOnce(&mut A::Changes)) {
        change(&mut self.pending);
        if self.state == ItemState::Clean {
            self.state = ItemState::Dirty;
        }
    }

    /// Discard staged changes.
    pub fn revert(&mut self) {
        self.pending = A::Changes::default();
        if self.state == ItemState::Dirty {
            self.state = ItemState::Clean;
        }
    }

    /// Fold staged changes into the base and bind to a store slot.
    pub(crate) fn commit(&mut self, id: ItemId) {
        self.base.apply(&self.pending);
        self.pending = A::Changes::default();
        self.state = ItemState::Clean;
        self.id = Some(id);
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.pending = A::Changes::default();
        self.state = ItemState::Deleted;
        self.id = None;
    }
}

/// Behaviour shared by every item variant.
pub trait KeychainItem: Clone + Sized {
    type Attributes: Attributes;
    const CLASS: ItemClass;

    fn overlay(&self) -> &Overlay<Self::Attributes>;
    fn overlay_mut(&mut self) -> &mut Overlay<Self::Attributes>;
    fn into_item(self) -> Item;
    fn from_item(item: Item) -> Option<Self>;

    fn state(&self) -> ItemState {
        self.overlay().state()
    }

    fn item_id(&self) -> Option<ItemId> {
        self.overlay().id()
    }

    fn revert(&mut self) {
        self.overlay_mut().revert()
    }
}

/// Any item a keychain can hold.
#[derive(Debug, Clone)]
pub enum Item {
    Certificate(Certificate),
    Key(Key),
    GenericPassword(GenericPassword),
    InternetPassword(InternetPassword),
    Identity(Identity),
}

impl Item {
    pub fn class(&self) -> ItemClass {
        match self {
            Item::Certificate(_) => ItemClass::Certificate,
            Item::Key(_) => ItemClass::Key,
            Item::GenericPassword(_) => ItemClass::GenericPassword,
            Item::InternetPassword(_) => ItemClass::InternetPassword,
            Item::Identity(_) => ItemClass::Identity,
        }
    }

    pub fn state(&self) -> ItemState {
        match self {
            Item::Certificate(i) => i.state(),
            Item::Key(i) => i.state(),
            Item::GenericPassword(i) => i.state(),
            Item::InternetPassword(i) => i.state(),
            Item::Identity(i) => i.state(),
        }
    }

    pub fn item_id(&self) -> Option<ItemId> {
        match self {
            Item::Certificate(i) => i.item_id(),
            Item::Key(i) => i.item_id(),
            Item::GenericPassword(i) => i.item_id(),
            Item::InternetPassword(i) => i.item_id(),
            Item::Identity(i) => i.item_id(),
        }
    }

    /// Certificate whose subject indexes this item, if any.
    pub(crate) fn certificate(&self) -> Option<&Certificate> {
        match self {
            Item::Certificate(c) => Some(c),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default)]
    struct Note {
        title: Option<String>,
    }

    #[derive(Debug, Clone, Default)]
    struct NoteChanges {
        title: Option<String>,
    }

    impl Attributes for Note {
        type Changes = NoteChanges;
        fn apply(&mut self, changes: &NoteChanges) {
            if let Some(t) = &changes.title {
                self.title = Some(t.clone());
            }
        }
    }

    fn id() -> ItemId {
        ItemId { index: 0, generation: 1 }
    }

    #[test]
    fn staging_on_stored_item_marks_dirty_and_revert_restores() {
        let mut o = Overlay::new(Note { title: Some("a".into()) });
        o.commit(id());
        assert_eq!(o.state(), ItemState::Clean);

        o.stage(|c| c.title = Some("b".into()));
        assert_eq!(o.state(), ItemState::Dirty);
        assert_eq!(o.read(|c| c.title.as_deref(), |b| b.title.as_deref()), Some("b"));
        assert_eq!(o.base().title.as_deref(), Some("a"));

        o.revert();
        assert_eq!(o.state(), ItemState::Clean);
        assert_eq!(o.read(|c| c.title.as_deref(), |b| b.title.as_deref()), Some("a"));
    }

    #[test]
    fn staging_on_new_item_keeps_new() {
        let mut o = Overlay::new(Note::default());
        o.stage(|c| c.title = Some("x".into()));
        assert_eq!(o.state(), ItemState::New);
        assert_eq!(o.current().title.as_deref(), Some("x"));
    }

    #[test]
    fn commit_folds_pending_into_base() {
        let mut o = Overlay::new(Note::default());
        o.stage(|c| c.title = Some("x".into()));
        o.commit(id());
        assert_eq!(o.base().title.as_deref(), Some("x"));
        assert!(o.pending().title.is_none());
        assert!(o.is_stored());

        o.mark_deleted();
        assert_eq!(o.state(), ItemState::Deleted);
        assert!(!o.is_stored());
    }
}
