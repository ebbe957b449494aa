//! Synchronization between tasks.
//!
//! Tasks share nothing by default and talk through [`Channel`]s. A task
//! that cannot complete a channel operation is suspended, never the
//! worker thread it runs on.

mod channel;

pub use channel::{
    Channel, CloseError, Iter, ReceiveFuture, Receiver, SendError, SendFuture, Sender,
    TryReceiveError, TrySendError,
};
