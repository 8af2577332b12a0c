#![allow(dead_code)]

use std::sync::Once;

use component_archive::prelude::*;

pub const AGENTS_SMALL: usize = 100_000;
pub const AGENTS_MED: usize = 1_000_000;

#[derive(Clone, Copy, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Default)]
pub struct Wealth {
    pub value: f32,
}

#[derive(Clone, Copy, Default)]
pub struct Productivity {
    pub rate: f32,
}

static INIT: Once = Once::new();

pub fn init_components() {
    INIT.call_once(|| {
        register_component::<Position>().unwrap();
        register_component::<Wealth>().unwrap();
        register_component::<Productivity>().unwrap();
    });
}

pub fn populate(archive: &mut ComponentArchive, agent_count: usize) -> Vec<Entity> {
    let mut entities = Vec::with_capacity(agent_count);
    for index in 0..agent_count {
        let entity = generate_entity();
        archive.attach_default::<Position>(entity).unwrap();
        archive.attach_default::<Wealth>(entity).unwrap();
        if index % 2 == 0 {
            archive.attach_default::<Productivity>(entity).unwrap();
        }
        entities.push(entity);
    }
    entities
}
