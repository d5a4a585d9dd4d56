pub(crate) mod ai;
pub(crate) mod follow_up;
pub(crate) mod quiz;
pub(crate) mod text;
