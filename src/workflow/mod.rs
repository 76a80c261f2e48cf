/// Injectable time source for entry timestamps.
pub mod clock;
/// Community gate that waits on every owned plant.
pub mod cross_entity;
pub mod gate;
/// Phase catalogs and the registry built from configuration.
pub mod phase;
pub mod store;
pub mod types;
