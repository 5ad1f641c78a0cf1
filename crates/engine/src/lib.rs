//! Block grid substrate: block ids, positions, chunked storage and region
//! geometry. Nothing in here knows about sessions, ranks or block semantics.

pub mod world;
