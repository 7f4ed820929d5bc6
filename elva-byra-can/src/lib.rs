//! These are the internal components used by [elva-byra-can](../elva_byra_can/index.html) to read a weight
//! frame from a serial-attached scale and republish it on a CAN bus. See the binary for setup & settings.
pub mod bridge;
pub mod can_channel;
pub mod error;
pub mod output_writer;
pub mod scale_frame;
pub mod serial_channel;
pub mod service;
