pub mod compare;
pub mod inspect_tensor;
pub mod show;
pub mod split_mixtral;
