//! Test doubles for the transport layer.
//!
//! Only compiled with the `testkit` feature; the crate's own integration
//! tests enable it through the dev-dependency on itself.

mod transport;

pub use transport::{fake_transport, FakeTransport, FakeTransportHandle};
