pub mod bias;
pub mod selector;
pub mod volume;
