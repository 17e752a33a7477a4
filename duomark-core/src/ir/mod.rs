//! Intermediate representation shared by parsers and inspectors.
//!
//!     Parsers never build [`crate::schema::Node`] trees directly. They emit a flat
//!     stream of [`events::Event`]s, and the common builder in
//!     [`crate::common::flat_to_nested`] turns the stream into a validated document.
//!     The reverse direction ([`crate::common::nested_to_flat`]) is used for inspection
//!     and for checking that a tree survives the event round trip.

pub mod events;
