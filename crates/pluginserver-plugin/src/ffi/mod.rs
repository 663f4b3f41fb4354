//! C ABI shared between the server and dynamically loaded plugins.

pub mod abi;
pub mod safety;
