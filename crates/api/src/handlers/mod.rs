//! HTTP handlers, grouped per resource.

pub mod zones;
