pub(crate) mod assignments;
pub(crate) mod reports;
pub(crate) mod resources;
pub(crate) mod rubrics;
pub(crate) mod submissions;
pub(crate) mod users;
