//! Bindings for a sample of the Telegram schema, generated at build time by
//! the `rust` target of `tlc`.

include!(concat!(env!("OUT_DIR"), "/telegram.rs"));
