use std::io;

/// Fatal machine conditions, propagated out of [`crate::cpu::Cpu::step`]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Stack overflow: call depth exceeds {depth} frames", depth = crate::cpu::regfile::STACK_DEPTH)]
    StackOverflow,

    #[error("Stack underflow: attempted to return with an empty call stack")]
    StackUnderflow,

    #[error("Memory access out of bounds at address {address:#06X}")]
    AddressOutOfRange { address: usize },

    #[error("Stack pointer {0} is outside the call stack")]
    InvalidStackPointer(u8),

    #[error("Timers are already driven by another timer task")]
    TimerBusy,

    #[error("Failed to spawn timer thread")]
    TimerSpawn(#[source] io::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
