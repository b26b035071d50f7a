//! Entity host interface
//!
//! The runtime does not own entities. It asks the host which entities
//! declare a behavior and records which instance is attached to each.
//! [`EntityTable`] is a small in-memory host for tools and tests.

use void_script::EntityRef;

use crate::instance::InstanceId;

/// What the runtime needs from the entity world
pub trait EntityHost {
    /// Every live entity that declares a behavior, with the declared name
    fn declared_behaviors(&self) -> Vec<(EntityRef, String)>;

    fn is_alive(&self, entity: EntityRef) -> bool;

    /// Behavior name declared on `entity`
    fn declared(&self, entity: EntityRef) -> Option<String>;

    /// Instance currently attached to `entity`
    fn attachment(&self, entity: EntityRef) -> Option<InstanceId>;

    /// Declare `type_name` on `entity` and attach `instance`
    ///
    /// Returns false when the entity is not alive.
    fn attach(&mut self, entity: EntityRef, type_name: &str, instance: InstanceId) -> bool;

    /// Drop the attached instance handle, keeping the declaration
    fn detach(&mut self, entity: EntityRef) -> Option<InstanceId>;

    /// Clear the declaration and the attachment
    fn remove(&mut self, entity: EntityRef) -> Option<String>;
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    alive: bool,
    behavior: Option<String>,
    instance: Option<InstanceId>,
}

/// In-memory entity world with generational handles
#[derive(Debug, Default)]
pub struct EntityTable {
    slots: Vec<Slot>,
    free_list: Vec<usize>,
    alive_count: usize,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an entity with no behavior
    pub fn spawn(&mut self) -> EntityRef {
        self.alive_count += 1;

        let index = match self.free_list.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                self.slots.len() - 1
            }
        };
        let slot = &mut self.slots[index];
        slot.alive = true;
        EntityRef::new(index as u64, slot.generation)
    }

    /// Allocate an entity declaring `behavior`
    pub fn spawn_with(&mut self, behavior: impl Into<String>) -> EntityRef {
        let entity = self.spawn();
        self.declare(entity, behavior);
        entity
    }

    /// Free an entity; later handles to its slot carry a newer generation
    pub fn despawn(&mut self, entity: EntityRef) -> bool {
        let Some(slot) = self.slot_mut(entity) else {
            return false;
        };
        slot.alive = false;
        slot.generation = slot.generation.wrapping_add(1);
        slot.behavior = None;
        slot.instance = None;

        self.free_list.push(entity.id as usize);
        self.alive_count -= 1;
        true
    }

    /// Set the declared behavior without attaching anything
    pub fn declare(&mut self, entity: EntityRef, behavior: impl Into<String>) -> bool {
        match self.slot_mut(entity) {
            Some(slot) => {
                slot.behavior = Some(behavior.into());
                true
            }
            None => false,
        }
    }

    /// Clear the declared behavior; the runtime destroys the instance on its next tick
    pub fn undeclare(&mut self, entity: EntityRef) -> Option<String> {
        self.slot_mut(entity)?.behavior.take()
    }

    pub fn len(&self) -> usize {
        self.alive_count
    }

    pub fn is_empty(&self) -> bool {
        self.alive_count == 0
    }

    fn slot(&self, entity: EntityRef) -> Option<&Slot> {
        self.slots
            .get(entity.id as usize)
            .filter(|slot| slot.alive && slot.generation == entity.generation)
    }

    fn slot_mut(&mut self, entity: EntityRef) -> Option<&mut Slot> {
        self.slots
            .get_mut(entity.id as usize)
            .filter(|slot| slot.alive && slot.generation == entity.generation)
    }
}

impl EntityHost for EntityTable {
    fn declared_behaviors(&self) -> Vec<(EntityRef, String)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.alive)
            .filter_map(|(index, slot)| {
                let behavior = slot.behavior.clone()?;
                Some((EntityRef::new(index as u64, slot.generation), behavior))
            })
            .collect()
    }

    fn is_alive(&self, entity: EntityRef) -> bool {
        self.slot(entity).is_some()
    }

    fn declared(&self, entity: EntityRef) -> Option<String> {
        self.slot(entity)?.behavior.clone()
    }

    fn attachment(&self, entity: EntityRef) -> Option<InstanceId> {
        self.slot(entity)?.instance
    }

    fn attach(&mut self, entity: EntityRef, type_name: &str, instance: InstanceId) -> bool {
        match self.slot_mut(entity) {
            Some(slot) => {
                slot.behavior = Some(type_name.to_string());
                slot.instance = Some(instance);
                true
            }
            None => false,
        }
    }

    fn detach(&mut self, entity: EntityRef) -> Option<InstanceId> {
        self.slot_mut(entity)?.instance.take()
    }

    fn remove(&mut self, entity: EntityRef) -> Option<String> {
        let slot = self.slot_mut(entity)?;
        slot.instance = None;
        slot.behavior.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_and_despawn() {
        let mut table = EntityTable::new();
        let a = table.spawn();
        let b = table.spawn_with("Mover");
        assert_eq!(table.len(), 2);
        assert_eq!(table.declared_behaviors(), vec![(b, "Mover".to_string())]);

        assert!(table.despawn(a));
        assert!(!table.despawn(a));
        assert!(!table.is_alive(a));

        // Slot reuse bumps the generation
        let c = table.spawn();
        assert_eq!(c.id, a.id);
        assert_ne!(c.generation, a.generation);
        assert!(table.declare(c, "Spinner"));
        assert!(!table.declare(a, "Spinner"));
        assert_eq!(table.declared(c).as_deref(), Some("Spinner"));
    }

    #[test]
    fn test_attach_detach_remove() {
        let mut table = EntityTable::new();
        let e = table.spawn();
        let id = InstanceId::new(9);

        assert!(table.attach(e, "Mover", id));
        assert_eq!(table.declared(e).as_deref(), Some("Mover"));
        assert_eq!(table.attachment(e), Some(id));

        // Detach keeps the declaration
        assert_eq!(table.detach(e), Some(id));
        assert_eq!(table.attachment(e), None);
        assert_eq!(table.declared(e).as_deref(), Some("Mover"));

        table.attach(e, "Mover", id);
        assert_eq!(table.remove(e).as_deref(), Some("Mover"));
        assert_eq!(table.attachment(e), None);
        assert!(table.declared_behaviors().is_empty());
    }

    #[test]
    fn test_stale_handles_are_rejected() {
        let mut table = EntityTable::new();
        let e = table.spawn_with("Mover");
        table.despawn(e);
        assert!(!table.attach(e, "Mover", InstanceId::new(1)));
        assert_eq!(table.declared(e), None);
        assert!(table.is_empty());
    }
}
