pub mod rng;

pub use rng::{channel_seed, derive, Channel, Draw, EnvStreams, RngBank, RngStream};
