#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use ts_ecs as ecs;
pub use ts_utils as utils;

pub mod prelude {
    pub use ts_ecs::prelude::*;
}
