//! program-pointer: program-pointer event sources for ABB robot controllers
//!
//! The controller publishes its currently executing RAPID line through an OPC UA
//! node. This crate models the values that node delivers, decodes them on a
//! best-effort basis into [`LineEvent`]s, and defines the [`PointerSource`] seam
//! that concrete transports implement. The default build enables a `mock` source
//! that replays a scripted pick-and-place program and a `replay` source that
//! reads recorded values from a JSON lines file.

mod types;
pub use types::{DecodedPointer, LineEvent, LineValue, PointerRecord, RawPointerValue};

mod error;
pub use error::{DecodeError, Result, SourceError};

mod decode;
pub use decode::{coerce_line, decode_pointer};

mod traits;
pub use traits::{PointerSource, SourceStatus};

#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "mock")]
pub use mock::{pick_and_place_script, MockSource};

#[cfg(feature = "replay")]
mod replay;
#[cfg(feature = "replay")]
pub use replay::ReplaySource;

/// Endpoint of the ABB IoT gateway on the cell PC.
pub const DEFAULT_ENDPOINT: &str = "opc.tcp://desktop-j8ae1eh:61510/ABB.IoTGateway";

/// Program pointer node of the first motion task.
pub const PROGRAM_POINTER_NODE_ID: &str = "ns=3;s=_isac/RAPID/T_ROB1/ProgramPointer";

/// Subscription publishing interval used by the gateway client.
pub const DEFAULT_PUBLISHING_INTERVAL_MS: u64 = 500;
