#![deny(clippy::all)]
#![warn(clippy::nursery)]

pub mod channel;
pub mod error;
pub mod lookup;
pub mod model;
pub mod resolver;

pub use channel::{BodyStream, ChannelConfig, DownloadChannel};
pub use error::{NetworkError, UsageError};
pub use lookup::{Environment, Lookup, Settings};
pub use model::{BootstrapperOptions, DownloadArguments};
pub use resolver::{resolve, resolve_in, USAGE};
