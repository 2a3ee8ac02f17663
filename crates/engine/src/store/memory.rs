//! In-process keychain: an arena of item slots with generation markers and a
//! subject index for certificate lookup.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::certificate::{Certificate, CertificateIdentity};
use crate::domain::error::{EngineError, EngineResult};

use super::item::{Item, ItemClass, ItemId, ItemState, KeychainItem};
use super::keychain::Keychain;

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    item: Option<Item>,
}

#[derive(Debug, Default)]
struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_subject: HashMap<Vec<u8>, Vec<u32>>,
    by_identity: HashMap<CertificateIdentity, u32>,
}

impl Arena {
    fn allocate(&mut self) -> ItemId {
        match self.free.pop() {
            Some(index) => ItemId {
                index,
                generation: self.slots[index as usize].generation,
            },
            None => {
                self.slots.push(Slot::default());
                ItemId {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        }
    }

    fn check(&self, id: ItemId) -> EngineResult<()> {
        let slot = self.slots.get(id.index as usize).ok_or(EngineError::NotPersisted)?;
        if slot.generation != id.generation || slot.item.is_none() {
            return Err(EngineError::StaleItem {
                index: id.index,
                current: slot.generation,
                held: id.generation,
            });
        }
        Ok(())
    }

    fn store(&mut self, id: ItemId, item: Item) {
        if let Some(cert) = item.certificate() {
            let entry = self.by_subject.entry(cert.subject().to_vec()).or_default();
            if !entry.contains(&id.index) {
                entry.push(id.index);
            }
            self.by_identity.insert(cert.identity(), id.index);
        }
        self.slots[id.index as usize].item = Some(item);
    }

    fn release(&mut self, id: ItemId) {
        let slot = &mut self.slots[id.index as usize];
        if let Some(cert) = slot.item.take().as_ref().and_then(Item::certificate) {
            if let Some(entry) = self.by_subject.get_mut(cert.subject()) {
                entry.retain(|i| *i != id.index);
            }
            self.by_identity.remove(&cert.identity());
        }
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
    }
}

/// A keychain held entirely in memory.
#[derive(Debug)]
pub struct MemoryKeychain {
    name: String,
    arena: RwLock<Arena>,
}

impl MemoryKeychain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arena: RwLock::new(Arena::default()),
        }
    }

    pub fn with_certificates(
        name: impl Into<String>,
        certificates: impl IntoIterator<Item = Certificate>,
    ) -> EngineResult<Self> {
        let keychain = Self::new(name);
        for mut cert in certificates {
            keychain.add(&mut cert)?;
        }
        Ok(keychain)
    }

    fn read(&self) -> EngineResult<RwLockReadGuard<'_, Arena>> {
        self.arena
            .read()
            .map_err(|_| EngineError::Panic("keychain lock poisoned".into()))
    }

    fn write(&self) -> EngineResult<RwLockWriteGuard<'_, Arena>> {
        self.arena
            .write()
            .map_err(|_| EngineError::Panic("keychain lock poisoned".into()))
    }

    /// Insert a new item. Certificates without a label get their subject summary;
    /// a certificate whose identity is already stored is rejected.
    pub fn add<I: KeychainItem>(&self, item: &mut I) -> EngineResult<ItemId> {
        if item.state() != ItemState::New {
            return Err(EngineError::MalformedInput(format!(
                "cannot add an item in state {:?}",
                item.state()
            )));
        }
        let mut arena = self.write()?;
        if let Some(cert) = item.clone().into_item().certificate() {
            if arena.by_identity.contains_key(&cert.identity()) {
                return Err(EngineError::DuplicateItem {
                    store: self.name.clone(),
                    item: cert.subject_summary(),
                });
            }
        }
        let id = arena.allocate();
        item.overlay_mut().commit(id);
        let mut stored = item.clone().into_item();
        if let Item::Certificate(cert) = &mut stored {
            if cert.label().is_none() {
                let summary = cert.subject_summary();
                cert.set_label(summary)?;
                cert.overlay_mut().commit(id);
                *item = I::from_item(stored.clone()).ok_or(EngineError::NotPersisted)?;
            }
        }
        arena.store(id, stored);
        tracing::debug!(keychain = %self.name, index = id.index, class = ?I::CLASS, "Item added");
        Ok(id)
    }

    /// Load a fresh copy of a stored item.
    pub fn load<I: KeychainItem>(&self, id: ItemId) -> EngineResult<I> {
        let arena = self.read()?;
        arena.check(id)?;
        let item = arena.slots[id.index as usize]
            .item
            .clone()
            .ok_or(EngineError::NotPersisted)?;
        I::from_item(item).ok_or_else(|| {
            EngineError::MalformedInput(format!("item {} is not a {:?}", id.index, I::CLASS))
        })
    }

    /// Persist staged changes. New items are added.
    pub fn save<I: KeychainItem>(&self, item: &mut I) -> EngineResult<()> {
        match item.state() {
            ItemState::New => self.add(item).map(|_| ()),
            ItemState::Clean => Ok(()),
            ItemState::Deleted => Err(EngineError::NotPersisted),
            ItemState::Dirty => {
                let id = item.item_id().ok_or(EngineError::NotPersisted)?;
                let mut arena = self.write()?;
                arena.check(id)?;
                item.overlay_mut().commit(id);
                arena.store(id, item.clone().into_item());
                Ok(())
            }
        }
    }

    pub fn delete<I: KeychainItem>(&self, item: &mut I) -> EngineResult<()> {
        let id = item.item_id().ok_or(EngineError::NotPersisted)?;
        let mut arena = self.write()?;
        arena.check(id)?;
        arena.release(id);
        item.overlay_mut().mark_deleted();
        tracing::debug!(keychain = %self.name, index = id.index, "Item deleted");
        Ok(())
    }

    pub fn items(&self, class: ItemClass) -> EngineResult<Vec<Item>> {
        let arena = self.read()?;
        Ok(arena
            .slots
            .iter()
            .filter_map(|s| s.item.as_ref())
            .filter(|i| i.class() == class)
            .cloned()
            .collect())
    }

    pub fn len(&self) -> usize {
        self.read()
            .map(|a| a.slots.iter().filter(|s| s.item.is_some()).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Keychain for MemoryKeychain {
    fn name(&self) -> &str {
        &self.name
    }

    fn certificates(&self) -> EngineResult<Vec<Certificate>> {
        Ok(self
            .items(ItemClass::Certificate)?
            .into_iter()
            .filter_map(Certificate::from_item)
            .collect())
    }

    fn find_certificate(&self, subject: &[u8]) -> EngineResult<Option<Certificate>> {
        let arena = self.read()?;
        let found = arena
            .by_subject
            .get(subject)
            .into_iter()
            .flatten()
            .filter_map(|i| arena.slots[*i as usize].item.as_ref())
            .find_map(|item| item.certificate().cloned());
        Ok(found)
    }
}
