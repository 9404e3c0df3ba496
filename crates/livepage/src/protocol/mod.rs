//! Wire protocol: inbound opcode frames and outbound callback frames.
//!
//! Every frame is a JSON array serialized to text whose first element is
//! an integer discriminant. Inbound frames carry a fixed number of
//! operands per opcode (MODIFY_DOM carries a variable-length mutation
//! batch); outbound frames carry an optional argument string and an
//! optional structured payload.

pub mod inbound;
pub mod outbound;

pub use inbound::{decode_frame, Command, DomOp, LocationKind};
pub use outbound::{encode_callback, Callback};
