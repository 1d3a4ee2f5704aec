use std::sync::{Arc, Mutex};

use slotstore_core::{NewUser, SlotStore, User, UserPatch};
use slotstore_relay::RelayClient;

use crate::gateway::error::Result;

/// The five store operations as seen by a gateway.
///
/// Cluster front-ends implement this by relaying to their store owner;
/// standalone mode calls a [`SlotStore`] directly.
pub trait UserService: Send + Sync {
    fn get_all(&self) -> Result<Vec<User>>;
    fn get(&self, id: &str) -> Result<Option<User>>;
    fn create(&self, fields: NewUser) -> Result<User>;
    fn update(&self, id: &str, patch: UserPatch) -> Result<Option<User>>;
    fn delete(&self, id: &str) -> Result<bool>;
}

impl<T: UserService + ?Sized> UserService for Arc<T> {
    fn get_all(&self) -> Result<Vec<User>> {
        (**self).get_all()
    }

    fn get(&self, id: &str) -> Result<Option<User>> {
        (**self).get(id)
    }

    fn create(&self, fields: NewUser) -> Result<User> {
        (**self).create(fields)
    }

    fn update(&self, id: &str, patch: UserPatch) -> Result<Option<User>> {
        (**self).update(id, patch)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        (**self).delete(id)
    }
}

impl UserService for RelayClient {
    fn get_all(&self) -> Result<Vec<User>> {
        Ok(RelayClient::get_all(self)?)
    }

    fn get(&self, id: &str) -> Result<Option<User>> {
        Ok(RelayClient::get(self, id)?)
    }

    fn create(&self, fields: NewUser) -> Result<User> {
        Ok(RelayClient::create(self, fields)?)
    }

    fn update(&self, id: &str, patch: UserPatch) -> Result<Option<User>> {
        Ok(RelayClient::update(self, id, patch)?)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        Ok(RelayClient::delete(self, id)?)
    }
}

/// In-process store access for standalone mode.
///
/// The mutex plays the part of the store owner: one operation at a time.
pub struct LocalService {
    store: Mutex<SlotStore>,
}

impl LocalService {
    pub fn new(store: SlotStore) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    fn with_store<T>(&self, op: impl FnOnce(&mut SlotStore) -> T) -> T {
        let mut store = self
            .store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        op(&mut store)
    }
}

impl UserService for LocalService {
    fn get_all(&self) -> Result<Vec<User>> {
        Ok(self.with_store(|store| store.get_all()))
    }

    fn get(&self, id: &str) -> Result<Option<User>> {
        Ok(self.with_store(|store| store.get(id)))
    }

    fn create(&self, fields: NewUser) -> Result<User> {
        Ok(self.with_store(|store| store.create(fields))?)
    }

    fn update(&self, id: &str, patch: UserPatch) -> Result<Option<User>> {
        Ok(self.with_store(|store| store.update(id, patch))?)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.with_store(|store| store.delete(id)))
    }
}
