//! System specification files: YAML/JSON loading and resolution into a
//! validated [`powerfolio_core::EnergySystem`].

pub mod spec;

pub use spec::{
    load_spec_from_path, load_system, resolve_system, validate, HorizonSpec, ProfileSpec,
    ResolvedSystem, SystemSpec,
};
