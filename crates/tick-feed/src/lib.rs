//! Synthetic market-data tick emitter.
//!
//! Pulls ticks from a [`TickSource`], encodes them with `tick-proto` and
//! fans each datagram out over UDP to every configured [`Destination`],
//! sleeping a fixed pacing interval between packets.

pub mod destination;
pub mod emitter;
pub mod error;
pub mod listener;
pub mod sink;
pub mod source;
pub mod stop;

pub use destination::Destination;
pub use emitter::{DestinationReport, DestinationStats, EmitReport, Emitter, EmitterConfig};
pub use error::{EmitError, EmitterState};
pub use listener::TickListener;
pub use sink::{DatagramSink, SocketOptions, SocketPool};
pub use source::{InstrumentIds, RandomSourceConfig, RandomTickSource, TickSource};
pub use stop::{CancelToken, StopCondition};
