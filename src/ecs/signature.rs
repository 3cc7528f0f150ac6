//! Component signatures and the per-registry component type table

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::ops::BitOr;

use super::{Component, EcsError};

/// Maximum number of distinct component types a registry can track.
pub const MAX_COMPONENTS: usize = 32;

/// Dense id of a component type, also its bit position in a [`Signature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(u8);

impl ComponentId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    fn mask(self) -> u32 {
        1 << self.0
    }
}

/// Fixed-width bitset: bit `i` set means component type `i` is present
/// (on an entity) or required (by a system).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Signature(u32);

impl Signature {
    pub const EMPTY: Signature = Signature(0);

    pub fn set(&mut self, id: ComponentId) {
        self.0 |= id.mask();
    }

    pub fn unset(&mut self, id: ComponentId) {
        self.0 &= !id.mask();
    }

    pub fn test(self, id: ComponentId) -> bool {
        self.0 & id.mask() != 0
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }

    /// Subset test used for system matching: `(self & required) == required`.
    pub fn contains(self, required: Signature) -> bool {
        self.0 & required.0 == required.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl From<ComponentId> for Signature {
    fn from(id: ComponentId) -> Self {
        Signature(id.mask())
    }
}

impl BitOr for Signature {
    type Output = Signature;

    fn bitor(self, rhs: Signature) -> Signature {
        Signature(self.0 | rhs.0)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$b}", self.0, width = MAX_COMPONENTS)
    }
}

/// Assigns component ids in first-use order.
///
/// One table lives inside each registry; ids are stable for that registry's
/// lifetime and mean nothing outside of it.
#[derive(Debug, Default)]
pub struct ComponentTypes {
    ids: HashMap<TypeId, ComponentId>,
    names: Vec<&'static str>,
}

impl ComponentTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `T`, assigning the next free one on first use.
    pub fn register<T: Component>(&mut self) -> Result<ComponentId, EcsError> {
        if let Some(id) = self.ids.get(&TypeId::of::<T>()) {
            return Ok(*id);
        }
        if self.names.len() >= MAX_COMPONENTS {
            return Err(EcsError::ComponentLimit(type_name::<T>()));
        }
        let id = ComponentId(self.names.len() as u8);
        self.ids.insert(TypeId::of::<T>(), id);
        self.names.push(type_name::<T>());
        log::trace!("component `{}` assigned id {}", type_name::<T>(), id.0);
        Ok(id)
    }

    /// Looks `T` up without assigning an id.
    pub fn id_of<T: Component>(&self) -> Option<ComponentId> {
        self.ids.get(&TypeId::of::<T>()).copied()
    }

    pub fn name(&self, id: ComponentId) -> Option<&'static str> {
        self.names.get(id.index()).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Collects the components a system needs, handed to
/// [`System::requirements`](super::System::requirements) at registration.
pub struct Requirements<'a> {
    types: &'a mut ComponentTypes,
    signature: Signature,
    error: Option<EcsError>,
}

impl<'a> Requirements<'a> {
    pub(crate) fn new(types: &'a mut ComponentTypes) -> Self {
        Self {
            types,
            signature: Signature::EMPTY,
            error: None,
        }
    }

    pub fn with<T: Component>(&mut self) -> &mut Self {
        match self.types.register::<T>() {
            Ok(id) => self.signature.set(id),
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }

    pub fn signature(&self) -> Signature {
        self.signature
    }

    pub(crate) fn finish(self) -> Result<Signature, EcsError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.signature),
        }
    }
}
