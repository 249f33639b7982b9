pub mod fits;
pub mod storage;

pub use fits::{read_healpix_map, write_healpix_map};
pub use storage::LocalStorage;
