// Waveform module
// Three-component seismogram container and channel selection

pub mod stream;

pub use stream::{Component, InputShapeError, Trace, Waveform};
