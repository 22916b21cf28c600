//! # Core Module
//!
//! Small building blocks shared by the rest of the engine.
//!
//! ## Key Components
//! - `StResource`: Single-threaded reference-counted resource with interior mutability
//! - `ChangeChannel` / `Subscription`: Typed publish/subscribe queues drained once per frame
//!
//! ## Usage
//! ```rust
//! use blockscape::core::{ChangeChannel, StResource};
//!
//! let counter = StResource::new(0);
//! *counter.get_mut() += 1;
//! assert_eq!(*counter.get(), 1);
//!
//! let mut channel = ChangeChannel::new();
//! let subscription = channel.subscribe();
//! channel.notify(7u32);
//! assert_eq!(subscription.drain(), vec![7]);
//! ```

pub mod change_channel;
pub mod st_resource;

pub use change_channel::{ChangeChannel, Subscription};
pub use st_resource::StResource;
