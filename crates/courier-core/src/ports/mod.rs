//! Ports - 外部との境界
//!
//! - **Publisher**: publish-back of derived continuations
//! - **Broker / Delivery**: inbound messages and their acknowledgement
//! - **Clock / IdGenerator**: time and ids, swappable in tests

pub mod broker;
pub mod clock;
pub mod id_generator;
pub mod publisher;

pub use self::broker::{Broker, Delivery};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::publisher::Publisher;
