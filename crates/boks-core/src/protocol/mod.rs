//! Protocol module containing the frame codec, opcode table, commands, and notifications.

pub mod codec;
pub mod commands;
pub mod notifications;
pub mod opcodes;

pub use codec::{checksum, decode_frame, encode_command, format_hex, DecodeError, EncodeError, Frame};
pub use commands::{CodeType, Command, ReplyKind};
pub use notifications::{classify_frame, decode_notification, BoksEvent, RejectionReason};
pub use opcodes::{is_history_opcode, lookup, name_of, Direction, OpcodeInfo};
