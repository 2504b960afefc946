pub mod seen_signatures;

pub use seen_signatures::SeenSignatures;
