// Domain layer: sky map model and ports (interfaces).

pub mod model;
pub mod ports;
