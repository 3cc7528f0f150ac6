use std::any::Any;

use anyhow::Result;

use crate::components::{BoxCollider, Transform, Vec2};
use crate::ecs::{Entity, Registry, Requirements, System, UpdateContext};
use crate::events::CollisionEvent;

/// Axis-aligned overlap test; touching edges do not count.
pub fn aabb_overlap(a_pos: Vec2, a_size: Vec2, b_pos: Vec2, b_size: Vec2) -> bool {
    a_pos.x < b_pos.x + b_size.x
        && a_pos.x + a_size.x > b_pos.x
        && a_pos.y < b_pos.y + b_size.y
        && a_pos.y + a_size.y > b_pos.y
}

/// Pairwise AABB check over every collider. Each overlapping pair is
/// published once per frame as a [`CollisionEvent`], earlier entity first.
#[derive(Debug, Default)]
pub struct CollisionSystem {
    collisions_last_frame: usize,
}

impl CollisionSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collisions_last_frame(&self) -> usize {
        self.collisions_last_frame
    }
}

impl System for CollisionSystem {
    fn name(&self) -> &str {
        "collision"
    }

    fn requirements(&self, req: &mut Requirements<'_>) {
        req.with::<Transform>().with::<BoxCollider>();
    }

    fn update(
        &mut self,
        entities: &[Entity],
        registry: &mut Registry,
        ctx: &mut UpdateContext<'_>,
    ) -> Result<()> {
        let boxes: Vec<_> = entities
            .iter()
            .filter_map(|&entity| {
                let transform = registry.get_component::<Transform>(entity).ok()?;
                let collider = registry.get_component::<BoxCollider>(entity).ok()?;
                Some((entity, collider.bounds(transform)))
            })
            .collect();

        self.collisions_last_frame = 0;
        for (i, &(a, (a_pos, a_size))) in boxes.iter().enumerate() {
            for &(b, (b_pos, b_size)) in &boxes[i + 1..] {
                if aabb_overlap(a_pos, a_size, b_pos, b_size) {
                    self.collisions_last_frame += 1;
                    log::trace!("{a} collides with {b}");
                    ctx.events.publish(registry, CollisionEvent { a, b })?;
                }
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::systems::tests::Harness;

    #[test]
    fn test_overlap_excludes_touching_edges() {
        let size = Vec2::new(10.0, 10.0);
        assert!(aabb_overlap(Vec2::ZERO, size, Vec2::new(5.0, 5.0), size));
        assert!(!aabb_overlap(Vec2::ZERO, size, Vec2::new(10.0, 0.0), size));
        assert!(!aabb_overlap(Vec2::ZERO, size, Vec2::new(0.0, 30.0), size));
    }

    #[test]
    fn test_each_overlapping_pair_is_published_once() {
        let mut harness = Harness::with_system(CollisionSystem::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        harness.events.subscribe::<CollisionEvent, _>(move |event, _| {
            sink.borrow_mut().push((event.a, event.b));
            Ok(())
        });

        let mut spawn = |x: f64| {
            let e = harness.registry.create_entity();
            harness.registry.add_component(e, Transform::at(x, 0.0)).unwrap();
            harness
                .registry
                .add_component(e, BoxCollider::new(32, 32))
                .unwrap();
            e
        };
        let p = spawn(0.0);
        let q = spawn(16.0);
        let _far = spawn(500.0);

        harness.step(0.016);

        assert_eq!(*seen.borrow(), vec![(p, q)]);
        assert_eq!(
            harness
                .registry
                .get_system::<CollisionSystem>()
                .unwrap()
                .collisions_last_frame(),
            1
        );
    }
}
