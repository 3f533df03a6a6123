pub mod daemon;
pub mod dispatch;
pub mod normalizer;
pub mod source;
pub mod vocabulary;

pub use daemon::{Daemon, ShutdownHandle};
pub use dispatch::{Args, Callback, Dispatcher};
pub use normalizer::Normalizer;
pub use source::{DbusSignalSource, SignalSource};
pub use vocabulary::Vocabulary;
