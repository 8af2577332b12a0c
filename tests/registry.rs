use std::ptr::NonNull;

use component_archive::{
    elf_hash, register_component, register_info, ComponentInfo, RegistryError,
};

unsafe fn noop(_target: NonNull<u8>) {}

fn info(id: u32, name: &'static str, size: usize) -> ComponentInfo {
    ComponentInfo {
        id,
        name,
        size,
        align: 8,
        default_construct: noop,
        drop: noop,
    }
}

#[derive(Default)]
struct Mass {
    _kilograms: f64,
}

#[derive(Default)]
struct Ghost;

#[test]
fn hash_is_deterministic_and_non_zero() {
    assert_eq!(elf_hash("Transform"), elf_hash("Transform"));
    assert_ne!(elf_hash("Transform"), elf_hash("transform"));
    assert_ne!(elf_hash("Transform"), 0);
    assert_eq!(elf_hash(""), 0, "the empty name maps to the invalid id");
}

#[test]
fn typed_registration_is_idempotent() {
    let first = register_component::<Mass>().unwrap();
    let second = register_component::<Mass>().unwrap();
    assert_eq!(first, second);
    assert_ne!(first, 0);
}

#[test]
fn colliding_names_are_rejected() {
    let id = elf_hash("registry_probe_alpha");
    register_info(info(id, "registry_probe_alpha", 16)).unwrap();

    // Same name again: last writer wins.
    register_info(info(id, "registry_probe_alpha", 16)).unwrap();

    // A different name on an occupied id must be surfaced.
    let error = register_info(info(id, "registry_probe_beta", 16)).unwrap_err();
    assert_eq!(
        error,
        RegistryError::Collision {
            id,
            existing: "registry_probe_alpha",
            incoming: "registry_probe_beta",
        }
    );
}

#[test]
fn zero_sized_kinds_are_rejected() {
    assert!(matches!(
        register_component::<Ghost>(),
        Err(RegistryError::ZeroSized { .. })
    ));

    assert!(matches!(
        register_info(info(0x51AB, "registry_probe_empty", 0)),
        Err(RegistryError::ZeroSized { .. })
    ));
}

#[test]
fn the_invalid_id_is_rejected() {
    assert!(matches!(
        register_info(info(0, "registry_probe_null", 8)),
        Err(RegistryError::NullId { .. })
    ));
}
