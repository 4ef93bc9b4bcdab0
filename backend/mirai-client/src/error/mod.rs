pub mod call;
pub mod connect;
pub mod packet;

pub use call::CallError;
pub use connect::ConnectError;
pub use packet::PacketError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Connect(#[from] connect::ConnectError),

    #[error(transparent)]
    Call(#[from] call::CallError),

    #[error(transparent)]
    Packet(#[from] packet::PacketError),
}
