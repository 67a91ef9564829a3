//! Program-load commands sent to the machine over raw TCP.

pub mod encoder;
pub mod sender;

pub use encoder::encode;
pub use sender::CommandSender;
