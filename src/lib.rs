#[macro_use] extern crate derivative;
#[macro_use] extern crate log;

mod clock;
mod config;
mod error;
mod internal;
mod message;
mod process;
mod shared;
mod snapshot;
mod socket;
mod state;
mod thread;

pub use crate::clock::Clock;
pub use crate::config::{Address, Config, Directory};
pub use crate::error::{Error, Result};
pub use crate::message::{Kind, Message, ProcessID};
pub use crate::process::Process;
pub use crate::snapshot::Snapshot;
pub use crate::state::{Application, Passive, Transfer};
