// Lian Li Galahad II pump lighting
// Wire codec, ring layout, canvas sampling and the per-connection session

pub mod detect;
pub mod layout;
pub mod profile;
pub mod protocol;
pub mod sampler;
pub mod session;
pub mod timeline;
pub mod transport;
pub mod validate;
