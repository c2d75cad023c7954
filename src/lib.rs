//! Prime counting below a bound N with a segmented, bit-packed sieve spread
//! over two levels: nodes that only exchange messages, and worker threads
//! inside each node.

pub mod base_primes;
pub mod bitset;
pub mod cluster;
pub mod config;
pub mod error;
pub mod message;
pub mod partition;
pub mod pool;
pub mod report;
pub mod result;
pub mod segment;
pub mod transport;
pub mod trial;
